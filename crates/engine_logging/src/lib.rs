#![deny(missing_docs)]
//! Shared logging utilities for the harvester workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase,
//! a per-thread "run scope" label that the macros prefix onto every message,
//! and a minimal test initializer for the global logger.

use std::cell::RefCell;

thread_local! {
    /// Thread-local label describing what the harvester is working on.
    static RUN_SCOPE: RefCell<String> = const { RefCell::new(String::new()) };
}

/// Sets the run scope for the current thread, e.g. `window 2022-01-01..2022-05-01 page 3`.
///
/// The harvest loop is sequential, so a thread-local label is enough to
/// attribute every log line to the window and page being processed.
pub fn set_scope(scope: impl Into<String>) {
    let scope = scope.into();
    RUN_SCOPE.with(|s| *s.borrow_mut() = scope);
}

/// Clears the run scope for the current thread.
pub fn clear_scope() {
    RUN_SCOPE.with(|s| s.borrow_mut().clear());
}

/// Returns the run scope for the current thread, or an empty string if unset.
pub fn scope() -> String {
    RUN_SCOPE.with(|s| s.borrow().clone())
}

#[doc(hidden)]
pub use log;

/// Emits one record through the `log` facade with the run scope prefixed.
#[doc(hidden)]
pub fn __log(level: log::Level, target: &str, args: std::fmt::Arguments<'_>) {
    RUN_SCOPE.with(|s| {
        let scope = s.borrow();
        if scope.is_empty() {
            log::log!(target: target, level, "{}", args);
        } else {
            log::log!(target: target, level, "[{}] {}", scope, args);
        }
    });
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        $crate::__log($crate::log::Level::Trace, module_path!(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        $crate::__log($crate::log::Level::Info, module_path!(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        $crate::__log($crate::log::Level::Debug, module_path!(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        $crate::__log($crate::log::Level::Warn, module_path!(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        $crate::__log($crate::log::Level::Error, module_path!(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

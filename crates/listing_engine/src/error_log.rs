use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::persist::PersistError;

pub const ERROR_LOG_FILENAME: &str = "errors.txt";

/// Append-only list of listings that could not be persisted, kept across runs.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    /// Opens (creating if needed) `{root}/errors.txt`.
    pub fn open(root: &Path) -> Result<Self, PersistError> {
        let path = root.join(ERROR_LOG_FILENAME);
        OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record_listing_failure(&self, title: Option<&str>) -> Result<(), PersistError> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(
            file,
            "Failed to process listing: {}",
            title.unwrap_or("<untitled>")
        )?;
        Ok(())
    }
}

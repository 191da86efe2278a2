use std::sync::Arc;

use engine_logging::{engine_error, engine_info, engine_warn};
use listing_core::{DateWindow, ListingRecord};

use crate::error_log::ErrorLog;
use crate::parse::{PageParser, SellerListParser};
use crate::source::ListingSource;
use crate::store::{PersistOutcome, PersistenceEngine};
use crate::transport::ListingTransport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestOptions {
    /// Fetch and parse pages but write nothing.
    pub dry_run: bool,
    /// First page requested in every window.
    pub start_page: u32,
    /// Request only `start_page` of each window.
    pub single_page: bool,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            start_page: 1,
            single_page: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub windows: usize,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub listings_seen: usize,
    pub persisted: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Normalized titles stored under more than one directory.
    pub collisions: Vec<(String, usize)>,
}

/// Drives windows -> pages -> listings -> persistence, strictly in order.
///
/// A failing page or listing is logged and skipped; nothing below the run
/// level aborts the run.
pub struct Harvester {
    transport: Arc<dyn ListingTransport>,
    parser: Arc<dyn PageParser>,
    engine: PersistenceEngine,
    error_log: ErrorLog,
    options: HarvestOptions,
}

impl Harvester {
    pub fn new(
        transport: Arc<dyn ListingTransport>,
        engine: PersistenceEngine,
        error_log: ErrorLog,
        options: HarvestOptions,
    ) -> Self {
        Self {
            transport,
            parser: Arc::new(SellerListParser),
            engine,
            error_log,
            options,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn PageParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn engine(&self) -> &PersistenceEngine {
        &self.engine
    }

    pub async fn run<I>(&mut self, windows: I) -> RunSummary
    where
        I: IntoIterator<Item = DateWindow>,
    {
        let mut summary = RunSummary::default();
        for window in windows {
            summary.windows += 1;
            engine_logging::set_scope(format!("window {window}"));
            engine_info!("Current date range: {} - {}", window.start, window.end);
            self.harvest_window(window, &mut summary).await;
        }
        engine_logging::clear_scope();

        summary.collisions = self.engine.collisions();
        for (title, count) in &summary.collisions {
            engine_info!("Title: {title} Count: {count}");
        }
        engine_info!(
            "Run finished: {} windows, {} pages ({} failed), {} listings: {} persisted, {} skipped, {} failed",
            summary.windows,
            summary.pages_fetched + summary.pages_failed,
            summary.pages_failed,
            summary.listings_seen,
            summary.persisted,
            summary.skipped,
            summary.failed
        );
        summary
    }

    async fn harvest_window(&mut self, window: DateWindow, summary: &mut RunSummary) {
        let transport = Arc::clone(&self.transport);
        let parser = Arc::clone(&self.parser);
        let mut source = if self.options.single_page {
            ListingSource::single_page(
                transport.as_ref(),
                parser.as_ref(),
                window,
                self.options.start_page,
            )
        } else {
            ListingSource::new(
                transport.as_ref(),
                parser.as_ref(),
                window,
                self.options.start_page,
            )
        };

        while let Some(page) = source.next_page().await {
            engine_logging::set_scope(format!("window {window} page {}", page.page));
            match page.listings {
                Ok(listings) => {
                    summary.pages_fetched += 1;
                    engine_info!(
                        "Extracting {} listings from page {} of {}",
                        listings.len(),
                        page.page,
                        source.total_pages().unwrap_or(page.page)
                    );
                    for (index, listing) in listings.iter().enumerate() {
                        engine_info!("Processing listing {index} of page {}", page.page);
                        self.process_listing(listing, summary).await;
                    }
                }
                Err(err) => {
                    summary.pages_failed += 1;
                    engine_warn!("Error with request on page {}: {err}", page.page);
                }
            }
        }
    }

    async fn process_listing(&mut self, listing: &ListingRecord, summary: &mut RunSummary) {
        summary.listings_seen += 1;
        let title = listing.title().unwrap_or("<untitled>");
        if self.options.dry_run {
            engine_info!("Dry run, not persisting: {title}");
            return;
        }

        match self.engine.persist(listing).await {
            Ok(PersistOutcome::Persisted {
                directory,
                images_saved,
                images_reused,
                images_failed,
            }) => {
                summary.persisted += 1;
                engine_info!(
                    "Persisted {title} to {} (images: {images_saved} saved, {images_reused} reused, {images_failed} failed)",
                    directory.display()
                );
            }
            Ok(PersistOutcome::Skipped { .. }) => summary.skipped += 1,
            Ok(PersistOutcome::Failed(reason)) => self.record_failure(listing, &reason, summary),
            Err(err) => self.record_failure(listing, &err.to_string(), summary),
        }
    }

    fn record_failure(&self, listing: &ListingRecord, reason: &str, summary: &mut RunSummary) {
        summary.failed += 1;
        engine_error!(
            "Failed to process listing {}: {reason}",
            listing.title().unwrap_or("<untitled>")
        );
        if let Err(err) = self.error_log.record_listing_failure(listing.title()) {
            engine_error!(
                "Could not append to {}: {err}",
                self.error_log.path().display()
            );
        }
    }
}

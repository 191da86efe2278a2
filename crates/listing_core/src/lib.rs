//! Listing core: pure date windowing, listing records and dedup bookkeeping.
mod dedup;
mod normalize;
mod record;
mod window;

pub use dedup::{DedupIndex, Resolution};
pub use normalize::{normalize_category, normalize_title};
pub use record::{ListingRecord, Metadata, MetadataField};
pub use window::{
    parse_date, DateError, DateWindow, DateWindower, DEFAULT_INCREMENT_DAYS, INPUT_DATE_FORMAT,
};

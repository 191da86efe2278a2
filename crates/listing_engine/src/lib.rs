//! Listing engine: remote paging, parsing, persistence and the harvest loop.
mod error_log;
mod fetch;
mod harvest;
mod images;
mod parse;
mod persist;
mod source;
mod store;
mod transport;
mod types;

pub use error_log::{ErrorLog, ERROR_LOG_FILENAME};
pub use fetch::{FetchSettings, ImageFetcher, ReqwestImageFetcher};
pub use harvest::{HarvestOptions, Harvester, RunSummary};
pub use images::{encode_png, ImageError};
pub use parse::{PageParser, ParseError, ParsedPage, SellerListParser};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use source::{ListingSource, PageResult, SourceError};
pub use store::{PersistOutcome, PersistenceEngine, METADATA_FILENAME};
pub use transport::{
    api_time_range, build_request_body, ApiCredentials, ApiSettings, ListingTransport,
    PageRequest, TradingApiTransport, API_NAMESPACE, DEFAULT_API_URL,
};
pub use types::{FailureKind, FetchError};

use listing_core::{DateWindow, ListingRecord};

use crate::parse::{PageParser, ParseError, ParsedPage};
use crate::transport::{ListingTransport, PageRequest};
use crate::FetchError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("transport error: {0}")]
    Transport(#[from] FetchError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Outcome of fetching one page. An error here concerns this page only.
#[derive(Debug)]
pub struct PageResult {
    pub page: u32,
    pub listings: Result<Vec<ListingRecord>, SourceError>,
}

/// Lazily paginates one date window.
///
/// The page count comes from the first page fetched, which must carry it.
/// Later pages may omit it. Later pages that fail are reported and skipped; a
/// failed first page ends the window because the page count is unknown.
pub struct ListingSource<'a> {
    transport: &'a dyn ListingTransport,
    parser: &'a dyn PageParser,
    window: DateWindow,
    next_page: u32,
    last_page: Option<u32>,
    single_page: bool,
    done: bool,
}

impl<'a> ListingSource<'a> {
    pub fn new(
        transport: &'a dyn ListingTransport,
        parser: &'a dyn PageParser,
        window: DateWindow,
        start_page: u32,
    ) -> Self {
        Self {
            transport,
            parser,
            window,
            next_page: start_page.max(1),
            last_page: None,
            single_page: false,
            done: false,
        }
    }

    /// Fetch only `page` of `window`.
    pub fn single_page(
        transport: &'a dyn ListingTransport,
        parser: &'a dyn PageParser,
        window: DateWindow,
        page: u32,
    ) -> Self {
        Self {
            single_page: true,
            ..Self::new(transport, parser, window, page)
        }
    }

    pub fn window(&self) -> DateWindow {
        self.window
    }

    /// Known after the first page was fetched successfully.
    pub fn total_pages(&self) -> Option<u32> {
        self.last_page
    }

    pub async fn next_page(&mut self) -> Option<PageResult> {
        if self.done {
            return None;
        }
        let page = self.next_page;
        if self.last_page.is_some_and(|last| page > last) {
            self.done = true;
            return None;
        }

        let mut result = self.fetch(page).await;
        if self.last_page.is_none() {
            result = result.and_then(|parsed| match parsed.total_pages {
                Some(total) => {
                    self.last_page = Some(total);
                    Ok(parsed)
                }
                None => Err(SourceError::Parse(ParseError::MissingElement(
                    "PaginationResult/TotalNumberOfPages",
                ))),
            });
            if result.is_err() {
                self.done = true;
            }
        }
        if self.single_page {
            self.done = true;
        }
        match page.checked_add(1) {
            Some(next) => self.next_page = next,
            None => self.done = true,
        }

        Some(PageResult {
            page,
            listings: result.map(|parsed| parsed.listings),
        })
    }

    async fn fetch(&self, page: u32) -> Result<ParsedPage, SourceError> {
        let request = PageRequest {
            window: self.window,
            page,
        };
        let body = self.transport.fetch_page(&request).await?;
        Ok(self.parser.parse(&body)?)
    }
}

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use listing_core::DateWindow;
use reqwest::header::CONTENT_TYPE;

use crate::fetch::{build_client, map_reqwest_error, parse_url, read_body, FetchSettings};
use crate::{FailureKind, FetchError};

pub const DEFAULT_API_URL: &str = "https://api.ebay.com/ws/api.dll";
pub const API_NAMESPACE: &str = "urn:ebay:apis:eBLBaseComponents";
const CALL_NAME: &str = "GetSellerList";

/// One page of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub window: DateWindow,
    pub page: u32,
}

#[derive(Clone)]
pub struct ApiCredentials {
    pub user_id: String,
    pub auth_token: String,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("user_id", &self.user_id)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub endpoint: String,
    pub site_id: String,
    pub compatibility_level: String,
    pub entries_per_page: u32,
    pub fetch: FetchSettings,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_API_URL.to_string(),
            site_id: "15".to_string(),
            compatibility_level: "967".to_string(),
            entries_per_page: 20,
            fetch: FetchSettings::for_api(),
        }
    }
}

/// Request/response only: turns a page request into the raw response body.
#[async_trait::async_trait]
pub trait ListingTransport: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<String, FetchError>;
}

/// `GetSellerList` over HTTPS POST.
#[derive(Debug, Clone)]
pub struct TradingApiTransport {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    settings: ApiSettings,
    credentials: ApiCredentials,
}

impl TradingApiTransport {
    pub fn new(settings: ApiSettings, credentials: ApiCredentials) -> Result<Self, FetchError> {
        let endpoint = parse_url(&settings.endpoint)?;
        let client = build_client(&settings.fetch)?;
        Ok(Self {
            client,
            endpoint,
            settings,
            credentials,
        })
    }

    pub fn request_body(&self, request: &PageRequest) -> String {
        build_request_body(&self.credentials, self.settings.entries_per_page, request)
    }
}

#[async_trait::async_trait]
impl ListingTransport for TradingApiTransport {
    async fn fetch_page(&self, request: &PageRequest) -> Result<String, FetchError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("X-EBAY-API-SITEID", &self.settings.site_id)
            .header(
                "X-EBAY-API-COMPATIBILITY-LEVEL",
                &self.settings.compatibility_level,
            )
            .header("X-EBAY-API-CALL-NAME", CALL_NAME)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(self.request_body(request))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let bytes = read_body(response, &self.settings.fetch).await?;
        String::from_utf8(bytes)
            .map_err(|err| FetchError::new(FailureKind::InvalidBody, err.to_string()))
    }
}

/// Build the `GetSellerListRequest` document for one page.
pub fn build_request_body(
    credentials: &ApiCredentials,
    entries_per_page: u32,
    request: &PageRequest,
) -> String {
    let (from, to) = api_time_range(&request.window);
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<GetSellerListRequest xmlns="{API_NAMESPACE}">
  <RequesterCredentials>
    <eBayAuthToken>{token}</eBayAuthToken>
  </RequesterCredentials>
  <ErrorLanguage>en_US</ErrorLanguage>
  <WarningLevel>High</WarningLevel>
  <DetailLevel>ReturnAll</DetailLevel>
  <StartTimeFrom>{from}</StartTimeFrom>
  <StartTimeTo>{to}</StartTimeTo>
  <UserID>{user_id}</UserID>
  <IncludeWatchCount>true</IncludeWatchCount>
  <Pagination>
    <EntriesPerPage>{entries_per_page}</EntriesPerPage>
    <PageNumber>{page}</PageNumber>
  </Pagination>
</GetSellerListRequest>
"#,
        token = html_escape::encode_text(&credentials.auth_token),
        user_id = html_escape::encode_text(&credentials.user_id),
        page = request.page,
    )
}

/// Half-open window on the wire: `[start 00:00:00.000, end 00:00:00.000 - 1ms]`.
pub fn api_time_range(window: &DateWindow) -> (String, String) {
    let from = midnight(window.start);
    let to = midnight(window.end) - TimeDelta::milliseconds(1);
    (format_api_time(from), format_api_time(to))
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn format_api_time(time: NaiveDateTime) -> String {
    time.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

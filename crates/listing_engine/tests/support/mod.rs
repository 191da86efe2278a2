#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use listing_engine::{FailureKind, FetchError, ImageFetcher, ListingTransport, PageRequest};

/// Serves canned page bodies by page number, for every window.
#[derive(Default)]
pub struct ScriptedTransport {
    pages: HashMap<u32, Result<String, FetchError>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32, body: String) -> Self {
        self.pages.insert(page, Ok(body));
        self
    }

    pub fn failing(mut self, page: u32) -> Self {
        self.pages.insert(
            page,
            Err(FetchError {
                kind: FailureKind::Network,
                message: "connection reset".to_string(),
            }),
        );
        self
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ListingTransport for ScriptedTransport {
    async fn fetch_page(&self, request: &PageRequest) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(*request);
        self.pages.get(&request.page).cloned().unwrap_or_else(|| {
            Err(FetchError {
                kind: FailureKind::HttpStatus(500),
                message: "no such page".to_string(),
            })
        })
    }
}

/// Returns a tiny PNG for every URL except those listed as broken.
#[derive(Default)]
pub struct StaticImages {
    broken: Vec<String>,
    calls: AtomicUsize,
}

impl StaticImages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_broken(url: &str) -> Self {
        Self {
            broken: vec![url.to_string()],
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ImageFetcher for StaticImages {
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.broken.iter().any(|broken| broken == url) {
            return Err(FetchError {
                kind: FailureKind::HttpStatus(404),
                message: "404 Not Found".to_string(),
            });
        }
        Ok(png_bytes(url.len() as u8))
    }
}

pub fn png_bytes(shade: u8) -> Vec<u8> {
    let pixels = image::RgbImage::from_pixel(2, 2, image::Rgb([shade, 0, 0]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(pixels)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn item_xml(title: &str, category: &str, price: &str, pictures: &[&str]) -> String {
    let pictures: String = pictures
        .iter()
        .map(|url| format!("<PictureURL>{url}</PictureURL>"))
        .collect();
    let title = html_escape::encode_text(title);
    let category = html_escape::encode_text(category);
    format!(
        "<Item>\
           <Title>{title}</Title>\
           <PrimaryCategory><CategoryID>1</CategoryID><CategoryName>{category}</CategoryName></PrimaryCategory>\
           <StartPrice currencyID=\"GBP\">{price}</StartPrice>\
           <Quantity>1</Quantity>\
           <SellingStatus><QuantitySold>0</QuantitySold></SellingStatus>\
           <PictureDetails>{pictures}</PictureDetails>\
         </Item>"
    )
}

pub fn page_xml(total_pages: u32, items: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<GetSellerListResponse xmlns="urn:ebay:apis:eBLBaseComponents">
  <Timestamp>2025-01-01T00:00:00.000Z</Timestamp>
  <Ack>Success</Ack>
  <PaginationResult>
    <TotalNumberOfPages>{total_pages}</TotalNumberOfPages>
    <TotalNumberOfEntries>{}</TotalNumberOfEntries>
  </PaginationResult>
  <ItemArray>{}</ItemArray>
</GetSellerListResponse>"#,
        items.len(),
        items.concat()
    )
}

/// Every file below `root` with its bytes, keyed by relative path.
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let bytes = std::fs::read(&path).unwrap();
                files.insert(path.strip_prefix(root).unwrap().to_path_buf(), bytes);
            }
        }
    }
    files
}

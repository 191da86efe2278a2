use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use sha2::{Digest, Sha256};

/// Recognized listing fields. Declaration order is the order used in `metadata.txt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataField {
    Title,
    Description,
    CategoryName,
    StartPrice,
    MinimumBestOfferPrice,
    ConditionDisplayName,
    ConditionDescription,
    Quantity,
    QuantitySold,
}

impl MetadataField {
    pub const ALL: [MetadataField; 9] = [
        MetadataField::Title,
        MetadataField::Description,
        MetadataField::CategoryName,
        MetadataField::StartPrice,
        MetadataField::MinimumBestOfferPrice,
        MetadataField::ConditionDisplayName,
        MetadataField::ConditionDescription,
        MetadataField::Quantity,
        MetadataField::QuantitySold,
    ];

    /// Key written to `metadata.txt`.
    pub fn key(self) -> &'static str {
        match self {
            MetadataField::Title => "Title",
            MetadataField::Description => "Description",
            MetadataField::CategoryName => "CategoryName",
            MetadataField::StartPrice => "StartPrice",
            MetadataField::MinimumBestOfferPrice => "MinimumBestOfferPrice",
            MetadataField::ConditionDisplayName => "ConditionDisplayName",
            MetadataField::ConditionDescription => "ConditionDescription",
            MetadataField::Quantity => "Quantity",
            MetadataField::QuantitySold => "QuantitySold",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Field values keyed by field; iteration follows the fixed field order.
pub type Metadata = BTreeMap<MetadataField, String>;

/// One parsed listing. Equality and hashing consider the metadata only:
/// two fetches of the same listing may return re-hosted or re-ordered image URLs.
#[derive(Debug, Clone, Default)]
pub struct ListingRecord {
    metadata: Metadata,
    image_urls: Vec<String>,
}

impl ListingRecord {
    /// Values are trimmed; empty values and empty URLs are dropped.
    pub fn new<I, V>(fields: I, image_urls: Vec<String>) -> Self
    where
        I: IntoIterator<Item = (MetadataField, V)>,
        V: Into<String>,
    {
        let metadata = fields
            .into_iter()
            .filter_map(|(field, value)| {
                let value = value.into();
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some((field, trimmed.to_string()))
                }
            })
            .collect();
        let image_urls = image_urls
            .into_iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();
        Self {
            metadata,
            image_urls,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn image_urls(&self) -> &[String] {
        &self.image_urls
    }

    pub fn get(&self, field: MetadataField) -> Option<&str> {
        self.metadata.get(&field).map(String::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.get(MetadataField::Title)
    }

    /// Render `metadata.txt`: one `Key: value` line per present field.
    pub fn to_metadata_text(&self) -> String {
        let mut text = String::new();
        for (field, value) in &self.metadata {
            text.push_str(field.key());
            text.push_str(": ");
            text.push_str(value);
            text.push('\n');
        }
        text
    }

    /// Read back a `metadata.txt`. Lines that do not start with a known key
    /// continue the previous value (multi-line descriptions).
    pub fn from_metadata_text(text: &str) -> Self {
        let mut fields: Vec<(MetadataField, String)> = Vec::new();
        for line in text.lines() {
            let known = line
                .split_once(": ")
                .and_then(|(key, value)| MetadataField::from_key(key).map(|f| (f, value)));
            match (known, fields.last_mut()) {
                (Some((field, value)), _) => fields.push((field, value.to_string())),
                (None, Some((_, value))) => {
                    value.push('\n');
                    value.push_str(line);
                }
                (None, None) => {}
            }
        }
        Self::new(fields, Vec::new())
    }

    /// Hex SHA-256 of the rendered metadata; stable across runs.
    pub fn content_digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_metadata_text().as_bytes());
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(64);
        for byte in digest.iter() {
            use std::fmt::Write;
            let _ = write!(&mut hex, "{byte:02x}");
        }
        hex
    }
}

impl PartialEq for ListingRecord {
    fn eq(&self, other: &Self) -> bool {
        self.metadata == other.metadata
    }
}

impl Eq for ListingRecord {}

impl Hash for ListingRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.metadata.hash(state);
    }
}

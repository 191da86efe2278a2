use listing_core::{ListingRecord, MetadataField};
use roxmltree::{Document, Node};
use scraper::{Html, Node as HtmlNode};

/// Element path (below `Item`) of each recognized field.
const FIELD_PATHS: [(MetadataField, &[&str]); 9] = [
    (MetadataField::Title, &["Title"]),
    (MetadataField::Description, &["Description"]),
    (MetadataField::CategoryName, &["PrimaryCategory", "CategoryName"]),
    (MetadataField::StartPrice, &["StartPrice"]),
    (
        MetadataField::MinimumBestOfferPrice,
        &["ListingDetails", "MinimumBestOfferPrice"],
    ),
    (MetadataField::ConditionDisplayName, &["ConditionDisplayName"]),
    (MetadataField::ConditionDescription, &["ConditionDescription"]),
    (MetadataField::Quantity, &["Quantity"]),
    (MetadataField::QuantitySold, &["SellingStatus", "QuantitySold"]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    /// `None` when the response carries no pagination block.
    pub total_pages: Option<u32>,
    pub listings: Vec<ListingRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("malformed xml: {0}")]
    Xml(String),
    #[error("response is missing {0}")]
    MissingElement(&'static str),
    #[error("invalid page count {0:?}")]
    InvalidPageCount(String),
    #[error("api call failed: {0}")]
    ApiFailure(String),
}

/// Wire format to listing records.
pub trait PageParser: Send + Sync {
    fn parse(&self, body: &str) -> Result<ParsedPage, ParseError>;
}

/// Parser for `GetSellerListResponse` documents.
///
/// Elements are matched by local name, so the default namespace declared by
/// the API (or its absence in hand-written fixtures) makes no difference.
#[derive(Debug, Default, Clone, Copy)]
pub struct SellerListParser;

impl PageParser for SellerListParser {
    fn parse(&self, body: &str) -> Result<ParsedPage, ParseError> {
        let doc = Document::parse(body).map_err(|err| ParseError::Xml(err.to_string()))?;
        let root = doc.root_element();

        if child(root, "Ack").is_some_and(|ack| element_text(ack).trim() == "Failure") {
            return Err(ParseError::ApiFailure(api_error_message(root)));
        }

        let total_pages = root
            .descendants()
            .find(|node| is_element(*node, "PaginationResult"))
            .and_then(|pagination| child(pagination, "TotalNumberOfPages"))
            .map(element_text)
            .map(|count| {
                count
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| ParseError::InvalidPageCount(count.clone()))
            })
            .transpose()?;

        let listings = root
            .descendants()
            .filter(|node| is_element(*node, "Item"))
            .map(parse_item)
            .collect();

        Ok(ParsedPage {
            total_pages,
            listings,
        })
    }
}

fn parse_item(item: Node<'_, '_>) -> ListingRecord {
    let fields = FIELD_PATHS.iter().filter_map(|(field, path)| {
        path.iter()
            .try_fold(item, |node, name| child(node, name))
            .map(|node| (*field, strip_markup(&element_text(node))))
    });
    let image_urls = child(item, "PictureDetails")
        .map(|details| {
            details
                .children()
                .filter(|node| is_element(*node, "PictureURL"))
                .map(element_text)
                .collect()
        })
        .unwrap_or_default();
    ListingRecord::new(fields, image_urls)
}

fn api_error_message(root: Node<'_, '_>) -> String {
    let errors = root.children().find(|node| is_element(*node, "Errors"));
    errors
        .and_then(|errors| child(errors, "LongMessage").or_else(|| child(errors, "ShortMessage")))
        .map(element_text)
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| "unspecified error".to_string())
}

fn is_element(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| is_element(*c, name))
}

/// Concatenated text of the element and all of its descendants.
fn element_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|d| d.is_text())
        .filter_map(|d| d.text())
        .collect()
}

/// Descriptions carry seller HTML; keep only the visible text.
fn strip_markup(text: &str) -> String {
    if !text.contains('<') && !text.contains('&') {
        return text.trim().to_string();
    }
    let fragment = Html::parse_fragment(text);
    let mut visible = String::with_capacity(text.len());
    for node in fragment.root_element().descendants() {
        let HtmlNode::Text(content) = node.value() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|el| el.name()))
            .is_some_and(|name| matches!(name, "script" | "style"));
        if !hidden {
            visible.push_str(content);
        }
    }
    visible.trim().to_string()
}

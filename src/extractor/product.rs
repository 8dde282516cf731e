use std::collections::BTreeMap;
use std::time::Duration;
use chrono::Utc;
use tracing::debug;

use crate::cli::config::ExtractorSettings;
use crate::crawler::task::ExtractionResult;
use crate::extractor::document::{normalize_label, non_empty, Document, RowCells};
use crate::extractor::strategy::SelectorChain;

/// Alternative containers holding the "about this item" list
const BULLET_CONTAINERS: [&str; 2] = ["#feature-bullets", "#productFactsDesktopExpander"];

/// Label identifying the sales rank entry in the details table
const BSR_LABEL: &str = "best sellers rank";

/// A row-based markup shape for the details region
#[derive(Debug, Clone)]
pub struct TableShape {
    pub rows: &'static str,
    pub key: &'static str,
    pub value: &'static str,
}

/// Entry list: bold key span followed by its value span.
///
/// The wrapper also holds the sibling list carrying the sales rank.
pub const DETAIL_BULLETS: TableShape = TableShape {
    rows: "#detailBulletsWrapper_feature_div li, #detailBullets_feature_div li",
    key: "span.a-text-bold",
    value: "span.a-text-bold + span",
};

const TABLE_ROWS: &str =
    "#productDetails_techSpec_section_1 tr, #productDetails_detailBullets_sections1 tr, #prodDetails tr";

/// Two-column key/value table with header key cells
pub const DETAIL_TABLE: TableShape = TableShape {
    rows: TABLE_ROWS,
    key: "th",
    value: "td",
};

/// Older two-column table with plain data cells on both sides
pub const DETAIL_TABLE_CELLS: TableShape = TableShape {
    rows: TABLE_ROWS,
    key: "td:first-child",
    value: "td:nth-child(2)",
};

/// Details shapes in order of preference; the first one yielding entries wins
const DETAIL_SHAPES: [&TableShape; 3] = [&DETAIL_BULLETS, &DETAIL_TABLE, &DETAIL_TABLE_CELLS];

/// Resolves every product field from a loaded page
#[derive(Debug)]
pub struct ProductExtractor {
    title: SelectorChain,
    price: SelectorChain,
    rating: SelectorChain,
    review_count: SelectorChain,
    image: SelectorChain,
    availability: SelectorChain,
    description: SelectorChain,
    list_wait: Duration,
    poll_interval: Duration,
}

impl ProductExtractor {
    pub fn new(settings: &ExtractorSettings) -> Self {
        Self {
            title: SelectorChain::new("title")
                .text("#productTitle")
                .text("#titleSection #title")
                .text("#ebooksProductTitle")
                .text("h1.a-size-large.a-spacing-none"),
            price: SelectorChain::new("price")
                .text("#priceblock_ourprice")
                .text("#priceblock_dealprice")
                .text("span.a-size-medium.a-color-price.offer-price.a-text-normal")
                .text("span.a-price > span.a-offscreen")
                .text("#corePriceDisplay_desktop_feature_div .a-offscreen"),
            rating: SelectorChain::new("rating")
                .text("span#acrPopover")
                .text("span[data-hook=\"rating-out-of-text\"]")
                .text("i.a-icon-star span"),
            review_count: SelectorChain::new("review_count")
                .text("#acrCustomerReviewText")
                .text("span[data-hook=\"total-review-count\"]")
                .text("#reviewsMedley .a-size-base"),
            image: SelectorChain::new("image")
                .attr("#landingImage", "src")
                .attr("#imgTagWrapperId img", "src")
                .attr("#imgTagWrapperId img", "data-old-hires"),
            availability: SelectorChain::new("availability")
                .text("#availability .a-color-state")
                .text("#availability .a-color-success")
                .text("#availability"),
            description: SelectorChain::new("product_description")
                .text("#productDescription")
                .text("#bookDescription_feature_div")
                .text("#productDescription_feature_div"),
            list_wait: Duration::from_millis(settings.list_wait_ms),
            poll_interval: Duration::from_millis(settings.poll_interval_ms.max(1)),
        }
    }

    /// Extract every field. Missing fields are `None`; this never fails.
    pub async fn extract(&self, doc: &dyn Document, identifier: &str, url: &str) -> ExtractionResult {
        let title = self.title.resolve(doc).await;
        let price = self.price.resolve(doc).await;
        let rating = self.rating.resolve(doc).await;
        let review_count = self.review_count.resolve(doc).await;
        let image = self.image.resolve(doc).await;
        let availability = self.availability.resolve(doc).await;
        let product_description = self.description.resolve(doc).await;
        let bullet_points = self.bullet_points(doc).await;

        if let Err(e) = doc.scroll_viewport().await {
            debug!("Scroll before details failed for {}: {}", identifier, e);
        }
        let entries = attribute_entries(doc).await;
        let best_seller_rank = best_seller_rank(&entries);

        let attribute_table = if entries.is_empty() {
            None
        } else {
            let mut table = BTreeMap::new();
            for (key, value) in entries {
                table.entry(key).or_insert(value);
            }
            Some(table)
        };

        ExtractionResult {
            identifier: identifier.to_string(),
            canonical_url: url.to_string(),
            title,
            price,
            rating,
            review_count,
            image,
            availability,
            best_seller_rank,
            product_description,
            bullet_points,
            attribute_table,
            timestamp: Utc::now(),
            error_message: None,
        }
    }

    /// Items of whichever bullet container shows up within the wait budget
    pub async fn bullet_points(&self, doc: &dyn Document) -> Option<Vec<String>> {
        let found = match doc
            .wait_for_any(&BULLET_CONTAINERS, self.list_wait, self.poll_interval)
            .await
        {
            Ok(found) => found?,
            Err(e) => {
                debug!("bullet_points: container lookup failed: {}", e);
                return None;
            }
        };

        let items = match doc.all_texts(&format!("{} li", BULLET_CONTAINERS[found])).await {
            Ok(items) => items,
            Err(e) => {
                debug!("bullet_points: reading items failed: {}", e);
                return None;
            }
        };

        let bullets: Vec<String> = items.iter().filter_map(|item| non_empty(item)).collect();
        if bullets.is_empty() {
            None
        } else {
            Some(bullets)
        }
    }
}

/// Normalized key/value pair for one details row
fn entry_from_row(row: &RowCells) -> Option<(String, String)> {
    let key = normalize_label(row.key.as_deref()?);
    if key.is_empty() {
        return None;
    }

    let value = match row.value.as_deref().map(normalize_label) {
        Some(value) if !value.is_empty() => value,
        _ => {
            // Value not wrapped in its own element: take the row text after the key
            let text = normalize_label(&row.text);
            let rest = text.strip_prefix(key.as_str()).unwrap_or("");
            normalize_label(rest.trim_start_matches(|c: char| c == ':' || c.is_whitespace()))
        }
    };

    Some((key, value))
}

async fn scan_shape(doc: &dyn Document, shape: &TableShape) -> Vec<(String, String)> {
    match doc.rows(shape.rows, shape.key, shape.value).await {
        Ok(rows) => rows.iter().filter_map(entry_from_row).collect(),
        Err(e) => {
            debug!("attribute_table: scanning '{}' failed: {}", shape.rows, e);
            Vec::new()
        }
    }
}

/// Details entries in document order, entry list first, tables as fallback
pub async fn attribute_entries(doc: &dyn Document) -> Vec<(String, String)> {
    for shape in DETAIL_SHAPES {
        let entries = scan_shape(doc, shape).await;
        if !entries.is_empty() {
            return entries;
        }
    }
    Vec::new()
}

/// Sales rank derived from the first details entry labelled with it
pub fn best_seller_rank(entries: &[(String, String)]) -> Option<String> {
    let (key, value) = entries
        .iter()
        .find(|(key, _)| key.to_lowercase().contains(BSR_LABEL))?;

    // Rank text may sit in the key itself, with a placeholder value beside it
    let key_has_rank = !key
        .to_lowercase()
        .replacen(BSR_LABEL, "", 1)
        .trim_matches(|c: char| c == ':' || c.is_whitespace())
        .is_empty();
    let value_has_rank = value.chars().any(|c| c == '#' || c.is_ascii_digit());

    let source = if value_has_rank && !key_has_rank {
        value.clone()
    } else {
        format!("{} {}", key, value)
    };
    let rank = match source.find('(') {
        Some(idx) => &source[..idx],
        None => source.as_str(),
    };

    non_empty(rank)
}

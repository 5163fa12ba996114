//! Hand-off to the structured-record extractor
//!
//! The scrape phase may pass each retrieved page to a `RecordExtractor`
//! (typically backed by a language model). The extractor sees the page's
//! cleaned text as a lazy sequence of bounded chunks and returns whatever
//! domain records it finds. Extraction is best-effort: a failure is logged
//! and the page simply has no records.

mod chunks;

pub use chunks::{page_text, TextChunks};

use crate::url::CanonicalUrl;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Turns page text into structured domain records
///
/// Implementations are shared by every worker and may be called
/// concurrently. Called once per retrieved page, on a blocking thread, so a
/// synchronous model client is fine here. A panic costs only that page's
/// records.
pub trait RecordExtractor: Send + Sync {
    fn extract(&self, url: &CanonicalUrl, chunks: TextChunks<'_>) -> anyhow::Result<Vec<Value>>;
}

/// Records extracted from one retrieved page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecords {
    pub url: CanonicalUrl,
    pub crawl_index: usize,
    pub records: Vec<Value>,
}

/// Runs the extractor over one page body, swallowing failures
///
/// # Returns
///
/// * `Some(records)` - The extractor succeeded (possibly with no records)
/// * `None` - The extractor failed; the failure has been logged
pub fn extract_records(
    extractor: &dyn RecordExtractor,
    url: &CanonicalUrl,
    html: &str,
    chunk_size: usize,
) -> Option<Vec<Value>> {
    let text = page_text(html);
    match extractor.extract(url, TextChunks::new(&text, chunk_size)) {
        Ok(records) => {
            debug!("Extracted {} records from {}", records.len(), url);
            Some(records)
        }
        Err(e) => {
            warn!("Record extraction failed for {}: {:#}", url, e);
            None
        }
    }
}

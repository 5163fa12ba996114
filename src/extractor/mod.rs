//! Link extraction for fetched pages
//!
//! A page is handed to a fixed set of independent strategies, each a pure
//! function that turns the page into candidate raw URL strings:
//! - `anchor`: `<a href>` and `<area href>`
//! - `script`: URL-looking strings in inline scripts and `on*` handlers
//! - `meta`: refresh, Open Graph/Twitter URLs, canonical/alternate/pagination links
//! - `form`: form actions
//! - `data_attr`: `data-href`, `data-url`, `data-link`, `data-src`
//! - `css`: `url(...)` and `@import` in style blocks and attributes
//! - `json_ld`: URL-valued keys in `application/ld+json` blocks
//! - `microdata`: `itemprop` URLs and `itemid`
//! - `header`: `Link`, `Location`, `Content-Location` and `Refresh` headers
//! - `comment`: URLs left behind in HTML comments
//!
//! A failing strategy is logged and skipped; the page's other strategies
//! still contribute. URLs come back raw, normalization happens at the call
//! site against the page URL.

mod headers;
mod markup;
mod text;

use crate::url::CanonicalUrl;
use reqwest::header::HeaderMap;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised inside a single extraction strategy
///
/// These never escape the extractor: the strategy's findings are dropped and
/// the remaining strategies run as usual.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid selector '{0}'")]
    Selector(String),

    #[error("malformed JSON-LD block: {0}")]
    JsonLd(#[from] serde_json::Error),
}

/// How a link was found
///
/// The declaration order doubles as precedence: when several strategies
/// produce the same canonical URL on one page, the lowest variant is kept.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    Anchor,
    Script,
    Meta,
    Form,
    DataAttr,
    Css,
    JsonLd,
    Microdata,
    Header,
    Comment,
    /// The page the run started from
    Seed,
}

impl DiscoveryMethod {
    /// Every method a page strategy can report, in precedence order
    pub const STRATEGIES: [DiscoveryMethod; 10] = [
        Self::Anchor,
        Self::Script,
        Self::Meta,
        Self::Form,
        Self::DataAttr,
        Self::Css,
        Self::JsonLd,
        Self::Microdata,
        Self::Header,
        Self::Comment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anchor => "anchor",
            Self::Script => "script",
            Self::Meta => "meta",
            Self::Form => "form",
            Self::DataAttr => "data_attr",
            Self::Css => "css",
            Self::JsonLd => "json_ld",
            Self::Microdata => "microdata",
            Self::Header => "header",
            Self::Comment => "comment",
            Self::Seed => "seed",
        }
    }
}

impl fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscoveryMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anchor" => Ok(Self::Anchor),
            "script" => Ok(Self::Script),
            "meta" => Ok(Self::Meta),
            "form" => Ok(Self::Form),
            "data_attr" => Ok(Self::DataAttr),
            "css" => Ok(Self::Css),
            "json_ld" => Ok(Self::JsonLd),
            "microdata" => Ok(Self::Microdata),
            "header" => Ok(Self::Header),
            "comment" => Ok(Self::Comment),
            "seed" => Ok(Self::Seed),
            other => Err(format!("unknown discovery method '{}'", other)),
        }
    }
}

/// A candidate URL exactly as it appeared on the page, tagged with its origin
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawLink {
    pub url: String,
    pub method: DiscoveryMethod,
}

/// Everything a strategy may look at for one page
pub(crate) struct PageContext<'a> {
    pub document: &'a Html,
    pub page_url: &'a CanonicalUrl,
    pub headers: &'a HeaderMap,
}

type Strategy = fn(&PageContext<'_>) -> Result<Vec<String>, ExtractError>;

const PAGE_STRATEGIES: &[(DiscoveryMethod, Strategy)] = &[
    (DiscoveryMethod::Anchor, markup::anchors),
    (DiscoveryMethod::Script, text::scripts),
    (DiscoveryMethod::Meta, markup::meta),
    (DiscoveryMethod::Form, markup::forms),
    (DiscoveryMethod::DataAttr, markup::data_attributes),
    (DiscoveryMethod::Css, text::css),
    (DiscoveryMethod::JsonLd, markup::json_ld),
    (DiscoveryMethod::Microdata, markup::microdata),
    (DiscoveryMethod::Header, headers::headers),
    (DiscoveryMethod::Comment, text::comments),
];

/// Composes the page strategies, minus any the configuration disabled
#[derive(Debug, Clone, Default)]
pub struct LinkExtractor {
    disabled: HashSet<DiscoveryMethod>,
}

impl LinkExtractor {
    /// Creates an extractor running every strategy
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an extractor that skips the given strategies
    pub fn with_disabled<I>(disabled: I) -> Self
    where
        I: IntoIterator<Item = DiscoveryMethod>,
    {
        Self {
            disabled: disabled.into_iter().collect(),
        }
    }

    /// Returns true if the strategy will run
    pub fn is_enabled(&self, method: DiscoveryMethod) -> bool {
        !self.disabled.contains(&method)
    }

    /// Runs every enabled strategy over one page
    ///
    /// # Arguments
    ///
    /// * `html` - The page body (may be empty, e.g. for redirects)
    /// * `page_url` - Canonical URL of the page, for strategy-local context
    /// * `headers` - The HTTP response headers
    ///
    /// # Returns
    ///
    /// The union of all findings, each tagged with the strategy that found it
    pub fn extract(
        &self,
        html: &str,
        page_url: &CanonicalUrl,
        headers: &HeaderMap,
    ) -> BTreeSet<RawLink> {
        let document = Html::parse_document(html);
        let context = PageContext {
            document: &document,
            page_url,
            headers,
        };

        let mut links = BTreeSet::new();
        for (method, strategy) in PAGE_STRATEGIES {
            if !self.is_enabled(*method) {
                continue;
            }
            match strategy(&context) {
                Ok(found) => {
                    tracing::trace!("{} strategy found {} candidates on {}", method, found.len(), page_url);
                    links.extend(
                        found
                            .into_iter()
                            .filter_map(clean_candidate)
                            .map(|url| RawLink {
                                url,
                                method: *method,
                            }),
                    );
                }
                Err(e) => {
                    tracing::debug!("{} strategy failed on {}: {}", method, page_url, e);
                }
            }
        }

        links
    }
}

/// Extracts candidate links from a page with every strategy enabled
///
/// # Example
///
/// ```
/// use crawl_ledger::extractor::{extract_links, DiscoveryMethod};
/// use crawl_ledger::url::CanonicalUrl;
/// use reqwest::header::HeaderMap;
///
/// let html = r#"<a href="/menu">Menu</a>"#;
/// let page = CanonicalUrl::parse("https://cafe.test/");
/// let links = extract_links(html, &page, &HeaderMap::new());
/// assert!(links
///     .iter()
///     .any(|l| l.url == "/menu" && l.method == DiscoveryMethod::Anchor));
/// ```
pub fn extract_links(html: &str, page_url: &CanonicalUrl, headers: &HeaderMap) -> BTreeSet<RawLink> {
    LinkExtractor::new().extract(html, page_url, headers)
}

/// Trims a candidate and drops values that can never name a page
fn clean_candidate(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let lower = trimmed.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    if trimmed.len() == raw.len() {
        Some(raw)
    } else {
        Some(trimmed.to_string())
    }
}

/// Parses a CSS selector, mapping the borrowed error into an owned one
pub(crate) fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector(format!("{}: {:?}", css, e)))
}

use serde::{Deserialize, Serialize};
use std::fmt;
use url::form_urlencoded;
use url::Url;

/// Prefix of the sentinel form produced for input that cannot be parsed
const INVALID_PREFIX: &str = "invalid:";

/// Tracking query parameters removed during normalization (matched case-insensitively)
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "utm_id",
    "fbclid",
    "gclid",
    "dclid",
    "msclkid",
    "mc_cid",
    "mc_eid",
    "_ga",
    "_gl",
    "igshid",
    "yclid",
    "ref",
    "ref_src",
];

/// A normalized, deduplication-safe URL identity
///
/// Two URLs that point at the same page normalize to the same `CanonicalUrl`.
/// Construction never fails: unparseable input becomes an `invalid:` sentinel
/// that the scope classifier always rejects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    /// Normalizes an absolute URL string
    ///
    /// Relative input has nothing to resolve against and yields the invalid
    /// sentinel.
    ///
    /// # Examples
    ///
    /// ```
    /// use crawl_ledger::url::CanonicalUrl;
    ///
    /// let url = CanonicalUrl::parse("HTTPS://Example.COM/menu/?b=2&a=1#top");
    /// assert_eq!(url.as_str(), "https://example.com/menu?a=1&b=2");
    /// ```
    pub fn parse(raw: &str) -> Self {
        canonicalize(raw, None)
    }

    /// Returns the canonical string form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns false for the sentinel produced from unparseable input
    pub fn is_valid(&self) -> bool {
        !self.0.starts_with(INVALID_PREFIX)
    }

    /// Parses the canonical form back into a `Url`
    pub fn to_url(&self) -> Option<Url> {
        if !self.is_valid() {
            return None;
        }
        Url::parse(&self.0).ok()
    }

    /// Returns the lowercase host, if the URL has one
    pub fn host(&self) -> Option<String> {
        self.to_url()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
    }

    fn invalid(raw: &str) -> Self {
        Self(format!("{}{}", INVALID_PREFIX, raw.trim()))
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalizes a raw URL found on a page into its canonical form
///
/// # Normalization Steps
///
/// 1. Resolve the reference against `base` (absolute input ignores the base)
/// 2. Lowercase scheme and host, drop default ports, remove dot segments
/// 3. Collapse repeated slashes and drop a trailing slash (except for root /)
/// 4. Remove the fragment
/// 5. Remove tracking query parameters
/// 6. Sort remaining query parameters and drop an empty query string
///
/// Unparseable input maps to the `invalid:` sentinel instead of failing.
///
/// # Examples
///
/// ```
/// use crawl_ledger::url::{normalize, CanonicalUrl};
///
/// let base = CanonicalUrl::parse("https://Example.com");
/// let a = normalize("/a/b?utm_source=x&z=1&a=2", &base);
/// let b = normalize("https://example.com/a/b?a=2&z=1", &base);
/// assert_eq!(a, b);
/// ```
pub fn normalize(raw_url: &str, base_url: &CanonicalUrl) -> CanonicalUrl {
    canonicalize(raw_url, base_url.to_url().as_ref())
}

fn canonicalize(raw: &str, base: Option<&Url>) -> CanonicalUrl {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CanonicalUrl::invalid(raw);
    }

    let parsed = match base {
        Some(base) => base.join(trimmed),
        None => Url::parse(trimmed),
    };
    let mut url = match parsed {
        Ok(url) => url,
        Err(e) => {
            tracing::trace!("Could not parse URL {:?}: {}", trimmed, e);
            return CanonicalUrl::invalid(trimmed);
        }
    };

    url.set_fragment(None);

    // Opaque URLs (mailto:, tel:, ...) keep their parsed form; scope rejects them
    if url.cannot_be_a_base() {
        return CanonicalUrl(url.to_string());
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .finish();
            url.set_query(Some(&query));
        }
    }

    CanonicalUrl(url.to_string())
}

/// Collapses repeated slashes and removes a trailing slash
fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }
    format!("/{}", segments.join("/"))
}

/// Filters out tracking parameters and sorts the rest by key, then value
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !key.is_empty() && !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}

/// Checks if a query parameter is a known tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS
        .iter()
        .any(|param| param.eq_ignore_ascii_case(key))
}

use crate::url::matcher::host_matches;
use crate::url::CanonicalUrl;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Path extensions that never lead to a crawlable document
const NON_DOCUMENT_EXTENSIONS: &[&str] = &[
    // images
    "jpg", "jpeg", "png", "gif", "webp", "svg", "ico", "bmp", "tif", "tiff", "avif", "heic",
    // stylesheets and scripts
    "css", "js", "mjs", "map",
    // fonts
    "woff", "woff2", "ttf", "otf", "eot",
    // archives
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar",
    // executables and packages
    "exe", "msi", "dmg", "pkg", "deb", "rpm", "apk", "bin", "iso",
    // media
    "mp3", "mp4", "m4a", "m4v", "wav", "ogg", "webm", "avi", "mov", "mkv", "flac",
    // office documents and feeds
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "xml",
];

/// Whether a link stays on the seed site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Internal,
    External,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Switches that widen the crawl scope beyond the seed host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeOptions {
    /// Treat subdomains of the seed host as internal
    pub include_subdomains: bool,

    /// Keep external links in scope
    pub follow_external: bool,
}

/// Outcome of classifying one canonical URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub link_type: LinkType,
    pub in_scope: bool,
}

/// Classifies a canonical URL relative to the seed host
///
/// `link_type` is internal iff the host equals `seed_host` (or is one of its
/// subdomains when `include_subdomains` is set). The URL is out of scope when
/// it is the invalid sentinel, its scheme is not http/https, its path ends in
/// a non-document extension, or it is external and external following is off.
///
/// # Examples
///
/// ```
/// use crawl_ledger::url::{classify, CanonicalUrl, LinkType, ScopeOptions};
///
/// let url = CanonicalUrl::parse("https://cdn.example.com/page");
/// let result = classify(&url, "example.com", &ScopeOptions::default());
/// assert_eq!(result.link_type, LinkType::External);
/// assert!(!result.in_scope);
/// ```
pub fn classify(url: &CanonicalUrl, seed_host: &str, options: &ScopeOptions) -> Classification {
    let parsed = match url.to_url() {
        Some(parsed) => parsed,
        None => {
            return Classification {
                link_type: LinkType::External,
                in_scope: false,
            }
        }
    };

    let host = parsed.host_str().map(|h| h.to_ascii_lowercase());
    let seed_host = seed_host.to_ascii_lowercase();
    let link_type = match host {
        Some(ref host) if host_matches(&seed_host, host, options.include_subdomains) => {
            LinkType::Internal
        }
        _ => LinkType::External,
    };

    let scheme_ok = matches!(parsed.scheme(), "http" | "https");
    let in_scope = scheme_ok
        && !has_non_document_extension(parsed.path())
        && (link_type == LinkType::Internal || options.follow_external);

    Classification {
        link_type,
        in_scope,
    }
}

/// Checks the last path segment against the non-document extension list
fn has_non_document_extension(path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or("");
    match last.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            NON_DOCUMENT_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}

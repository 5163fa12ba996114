use crate::extractor::DiscoveryMethod;
use crate::state::{FetchState, Termination};
use crate::url::{CanonicalUrl, LinkType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Curation status of a ledger entry
///
/// Owned by the curator: discovery only ever writes `Pending`, and only when
/// the entry is new.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    #[default]
    Pending,
    Keep,
    Skip,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Keep => "keep",
            Self::Skip => "skip",
        }
    }

    /// Returns all statuses in display order
    pub fn all() -> [LinkStatus; 3] {
        [Self::Pending, Self::Keep, Self::Skip]
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "keep" => Ok(Self::Keep),
            "skip" => Ok(Self::Skip),
            other => Err(format!(
                "unknown status '{}' (expected pending, keep or skip)",
                other
            )),
        }
    }
}

/// One entry in a site's ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredLink {
    /// Unique key within the ledger
    pub url: CanonicalUrl,

    /// Page the link was first found on
    pub source_page: CanonicalUrl,

    /// Strategy that first found the link
    pub discovery_method: DiscoveryMethod,

    pub link_type: LinkType,

    #[serde(default)]
    pub status: LinkStatus,

    /// Free-text curator annotation
    #[serde(default)]
    pub notes: String,
}

impl DiscoveredLink {
    /// Creates a pending entry with empty notes
    pub fn new(
        url: CanonicalUrl,
        source_page: CanonicalUrl,
        discovery_method: DiscoveryMethod,
        link_type: LinkType,
    ) -> Self {
        Self {
            url,
            source_page,
            discovery_method,
            link_type,
            status: LinkStatus::Pending,
            notes: String::new(),
        }
    }
}

/// A page the latest run could not fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFetch {
    pub url: CanonicalUrl,
    pub outcome: FetchState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub attempts: u32,
}

/// Discovery metadata kept at the head of a ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMetadata {
    pub site_id: String,
    pub seed_url: CanonicalUrl,

    /// Timestamp of the latest discovery run
    pub run_timestamp: DateTime<Utc>,

    /// Timestamp of the first discovery run
    pub first_run: DateTime<Utc>,

    /// Number of discovery runs merged into this ledger
    pub runs: u32,

    /// Pages fetched by the latest run
    pub pages_scanned: usize,

    /// Distinct in-scope links found by the latest run
    pub links_found: usize,

    /// Entries in the ledger after the latest merge
    pub total_links: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination: Option<Termination>,

    /// Hash of the configuration file that drove the latest run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
}

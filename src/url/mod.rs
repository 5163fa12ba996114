//! URL handling module for Crawl-Ledger
//!
//! This module provides URL canonicalization, host extraction, subdomain
//! matching, and the scope classifier that decides which discovered links
//! are recorded and followed.

mod domain;
mod matcher;
mod normalize;
mod scope;

// Re-export main functions
pub use domain::{extract_domain, resolve_site_id, site_id};
pub use matcher::host_matches;
pub use normalize::{normalize, CanonicalUrl};
pub use scope::{classify, Classification, LinkType, ScopeOptions};

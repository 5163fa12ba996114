//! Output module for curator-facing reports
//!
//! This module handles:
//! - Computing ledger statistics (by status, type and discovery method)
//! - Printing statistics to the terminal
//! - Rendering a Markdown review sheet grouped by curation status

mod markdown;
pub mod stats;

pub use markdown::{format_review_sheet, write_review_sheet};
pub use stats::{ledger_statistics, print_statistics, LedgerStatistics};

//! State module for tracking crawl progress
//!
//! This module provides the small state types shared by the frontier, the
//! scheduler and the fetch pool.
//!
//! # Components
//!
//! - `FrontierState`: Lifecycle of one crawl run's frontier (idle, running, exhausted, ...)
//! - `HostState`: Per-host politeness bookkeeping (last fetch time, request count)
//! - `FetchState`: Classification of one HTTP fetch outcome

mod fetch_state;
mod frontier_state;
mod host_state;

// Re-export main types
pub use fetch_state::FetchState;
pub use frontier_state::{FrontierState, Termination};
pub use host_state::HostState;

//! Integration tests for Crawl-Ledger
//!
//! These tests use wiremock to serve small sites and drive the discovery
//! and scrape phases end-to-end over real HTTP.

mod common;
mod discovery_tests;
mod scrape_tests;

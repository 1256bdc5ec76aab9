//! Integration tests for sumi-crawler
//!
//! These tests run the reqwest transports and the crawler roles against a
//! local mock server and store the results in a temporary SQLite database.

mod common;
mod config_tests;
mod crawl_tests;
mod transport_tests;

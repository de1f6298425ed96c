//! Integration tests for crawl-digest
//!
//! These tests use wiremock to stand up mock sites and drive the crawler,
//! sessions and jobs end-to-end against the in-memory and SQLite stores.

mod crawl_tests;
mod digest_tests;

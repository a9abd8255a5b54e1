//! Integration tests for the enrichment pipeline
//!
//! These tests use wiremock to stand in for the websites being enriched and
//! stub every other data source, then drive the full pipeline end-to-end.

mod common;
mod pipeline_tests;
mod scenarios;

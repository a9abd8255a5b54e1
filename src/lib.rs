//! Outreach-Enrich: opportunity enrichment for backlink outreach
//!
//! This crate takes candidate websites ("opportunities"), decides whether they
//! are legitimate and how valuable they are, and discovers how to contact their
//! owners. All outbound traffic is paced per root domain and retried with
//! backoff; every result is merged additively into the stored opportunity.

pub mod config;
pub mod contact;
pub mod discovery;
pub mod fetcher;
pub mod lookup;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod store;
pub mod throttle;
pub mod url;
pub mod validator;

use thiserror::Error;

/// Main error type for Outreach-Enrich operations
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] store::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTML parse error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("Opportunity not found: {0}")]
    OpportunityNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Outreach-Enrich operations
pub type Result<T> = std::result::Result<T, EnrichError>;

// Re-export commonly used types
pub use config::Config;
pub use contact::{ContactExtractor, ContactRecord};
pub use fetcher::{FetchOutcome, Fetcher, RetryBudget};
pub use lookup::Lookup;
pub use pipeline::{BatchSummary, CandidateSelector, Pipeline};
pub use store::{Opportunity, OpportunityStatus, OpportunityStore, SqliteStore};
pub use throttle::DomainThrottle;
pub use url::{extract_domain, normalize_url, root_domain};
pub use validator::{DomainValidator, ValidationReport};

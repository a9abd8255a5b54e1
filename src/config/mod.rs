//! Configuration module for Outreach-Enrich
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use outreach_enrich::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("enrich.toml")).unwrap();
//! println!("Throttle interval: {}ms", config.throttle.min_interval_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BatchConfig, Config, DiscoveryConfig, ExtractorConfig, FetcherConfig, MetricsConfig,
    PremiumThresholds, StandardThresholds, StorageConfig, ThrottleConfig, ValidatorConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;

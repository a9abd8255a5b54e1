//! Batch pipeline
//!
//! Ties validation, extraction and the opportunity store together.
//!
//! # Example
//!
//! ```no_run
//! use outreach_enrich::config::load_config_with_hash;
//! use outreach_enrich::pipeline::{CandidateSelector, Pipeline};
//! use outreach_enrich::store::open_store;
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let (config, hash) = load_config_with_hash(Path::new("enrich.toml"))?;
//! let store = open_store(Path::new(&config.storage.database_path))?;
//! let pipeline = Pipeline::new(&config, hash, store)?;
//!
//! let summary = pipeline.run_batch(&CandidateSelector::default(), 0).await?;
//! println!("{} passing of {}", summary.passing, summary.processed);
//! # Ok(())
//! # }
//! ```

mod orchestrator;

pub use crate::store::CandidateSelector;
pub use orchestrator::{BatchSummary, Pipeline, Sources, MAX_CONCURRENCY};

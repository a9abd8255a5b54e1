//! URL handling module for Outreach-Enrich
//!
//! This module provides URL normalization, domain extraction and root-domain
//! computation. Root domains key the request throttle and decide which links
//! count as "same site" during contact page discovery.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{
    extract_domain, parse_target, root_domain, root_domain_of, same_root_domain,
};
pub use normalize::{dedup_key, normalize_url};

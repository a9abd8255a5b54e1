//! Contact page discovery
//!
//! Produces a short, deduplicated list of pages on the same site that are
//! likely to carry contact details. Candidates come from two sources, in
//! order:
//!
//! 1. A table of conventional paths (`/contact`, `/about`, ...)
//! 2. Homepage anchors whose text or href mentions contact intent
//!
//! Discovery never goes deeper than the homepage's own links.

use crate::config::DiscoveryConfig;
use crate::fetcher::{FetchOutcome, Fetcher, RetryBudget};
use crate::parser::parse_page;
use crate::url::{dedup_key, normalize_url, parse_target, same_root_domain};
use std::collections::HashSet;
use url::Url;

/// Finds candidate contact pages for a site
#[derive(Debug, Clone)]
pub struct ContactPageDiscoverer {
    fetcher: Fetcher,
    paths: Vec<String>,
    max_candidates: usize,
}

impl ContactPageDiscoverer {
    pub fn new(fetcher: Fetcher, config: &DiscoveryConfig) -> Self {
        Self {
            fetcher,
            paths: config.paths.clone(),
            max_candidates: config.max_candidates,
        }
    }

    /// Fetches the homepage of `domain` and returns its candidate pages
    ///
    /// When the homepage cannot be fetched only the conventional paths are
    /// returned.
    pub async fn discover(&self, domain: &str, budget: &RetryBudget) -> Vec<Url> {
        let homepage = match parse_target(domain) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Cannot discover contact pages for {}: {}", domain, e);
                return Vec::new();
            }
        };

        match self.fetcher.fetch(homepage.as_str(), budget).await {
            FetchOutcome::Page(page) => self.candidates(&page.final_url, Some(&page.body)),
            other => {
                tracing::debug!("Homepage of {} unavailable for discovery: {:?}", domain, other);
                self.candidates(&homepage, None)
            }
        }
    }

    /// Builds the candidate list for a site without any I/O
    ///
    /// # Arguments
    ///
    /// * `base` - Any URL on the site; its origin is the homepage
    /// * `homepage_html` - Homepage body, if it was fetched
    pub fn candidates(&self, base: &Url, homepage_html: Option<&str>) -> Vec<Url> {
        let mut homepage = base.clone();
        homepage.set_path("/");
        homepage.set_query(None);
        homepage.set_fragment(None);

        let mut seen = HashSet::new();
        if let Ok(normalized) = normalize_url(homepage.as_str()) {
            seen.insert(dedup_key(&normalized));
        }

        let mut candidates = Vec::new();
        let mut push = |url: Url, candidates: &mut Vec<Url>| {
            if candidates.len() >= self.max_candidates {
                return;
            }
            let normalized = match normalize_url(url.as_str()) {
                Ok(normalized) => normalized,
                Err(_) => return,
            };
            if seen.insert(dedup_key(&normalized)) {
                candidates.push(normalized);
            }
        };

        for path in &self.paths {
            if let Ok(url) = homepage.join(path) {
                push(url, &mut candidates);
            }
        }

        if let Some(html) = homepage_html {
            match parse_page(html, base) {
                Ok(parsed) => {
                    for anchor in parsed.contact_anchors {
                        if same_root_domain(&anchor, base) {
                            push(anchor, &mut candidates);
                        }
                    }
                }
                Err(e) => tracing::debug!("Skipping homepage anchors of {}: {}", base, e),
            }
        }

        candidates
    }
}

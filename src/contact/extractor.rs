//! Multi-source contact extraction
//!
//! Sources are tried from most to least trustworthy and each one only runs
//! while the earlier ones came up short:
//!
//! 1. The homepage
//! 2. Discovered contact pages, one at a time through the throttle
//! 3. The registration record of the root domain
//! 4. Conventional addresses at the root domain, if it accepts mail
//!
//! Whatever is found is merged into the opportunity's existing record, so a
//! run can add data but never remove it.

use crate::config::ExtractorConfig;
use crate::contact::{ContactRecord, ContactSource};
use crate::discovery::ContactPageDiscoverer;
use crate::fetcher::{FetchOutcome, FetchedPage, Fetcher, RetryBudget};
use crate::lookup::{registrant_emails, DnsLookup, Lookup, RegistrationLookup};
use crate::parser::parse_page;
use crate::store::Opportunity;
use crate::url::{parse_target, root_domain};
use chrono::Utc;
use std::sync::Arc;
use url::Url;

/// Cascading contact extractor
#[derive(Clone)]
pub struct ContactExtractor {
    fetcher: Fetcher,
    discoverer: ContactPageDiscoverer,
    dns: Arc<dyn DnsLookup>,
    registration: Arc<dyn RegistrationLookup>,
    config: ExtractorConfig,
}

impl std::fmt::Debug for ContactExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactExtractor")
            .field("discoverer", &self.discoverer)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ContactExtractor {
    pub fn new(
        fetcher: Fetcher,
        discoverer: ContactPageDiscoverer,
        dns: Arc<dyn DnsLookup>,
        registration: Arc<dyn RegistrationLookup>,
        config: ExtractorConfig,
    ) -> Self {
        Self {
            fetcher,
            discoverer,
            dns,
            registration,
            config,
        }
    }

    /// Extracts contact details for an opportunity
    ///
    /// Returns the existing record untouched when it is already satisfied or
    /// when this run finds nothing new.
    pub async fn extract(&self, opportunity: &Opportunity, budget: &RetryBudget) -> ContactRecord {
        self.extract_with_homepage(opportunity, None, budget).await
    }

    /// Like [`extract`](Self::extract), reusing an already fetched homepage
    pub async fn extract_with_homepage(
        &self,
        opportunity: &Opportunity,
        homepage: Option<&FetchedPage>,
        budget: &RetryBudget,
    ) -> ContactRecord {
        let existing = opportunity.contact_info.clone().unwrap_or_default();
        if existing.is_satisfied() {
            tracing::debug!(
                "Opportunity {} already has contact details, skipping extraction",
                opportunity.id
            );
            return existing;
        }

        let target = parse_target(&opportunity.url).or_else(|_| parse_target(&opportunity.domain));
        let homepage_url = match target {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(
                    "Opportunity {} has no usable URL ({}), skipping extraction",
                    opportunity.id,
                    e
                );
                return existing;
            }
        };

        let found = self.collect(&homepage_url, homepage, budget).await;
        let merged = existing.merge(&found);

        if merged.same_content(&existing) {
            tracing::debug!("No new contact details for opportunity {}", opportunity.id);
            return existing;
        }

        let mut merged = merged;
        merged.extraction_details.last_updated = Utc::now();
        tracing::info!(
            "Opportunity {}: {} emails, {} profiles, {} forms (source: {})",
            opportunity.id,
            merged.emails.len(),
            merged.social_profiles.len(),
            merged.contact_forms.len(),
            merged.extraction_details.source
        );
        merged
    }

    /// Runs the cascade and returns only what this run found
    async fn collect(
        &self,
        homepage_url: &Url,
        prefetched: Option<&FetchedPage>,
        budget: &RetryBudget,
    ) -> ContactRecord {
        let mut record = ContactRecord::empty();

        let homepage = match prefetched {
            Some(page) if !page.body.is_empty() => Some(page.clone()),
            _ => self.fetch_page(homepage_url, budget).await,
        };

        if let Some(page) = &homepage {
            match parse_page(&page.body, &page.final_url) {
                Ok(parsed) => record.absorb_page(&parsed, ContactSource::Homepage),
                Err(e) => tracing::debug!("Skipping homepage {}: {}", page.final_url, e),
            }
        }

        // Relative anchors resolve against where the homepage actually landed
        let base = homepage.as_ref().map_or(homepage_url, |p| &p.final_url);
        let candidates = self
            .discoverer
            .candidates(base, homepage.as_ref().map(|p| p.body.as_str()));

        for candidate in candidates {
            if !record.emails.is_empty() && !record.contact_forms.is_empty() {
                tracing::debug!("Found emails and a contact form, stopping page scan");
                break;
            }

            let Some(page) = self.fetch_page(&candidate, budget).await else {
                continue;
            };
            match parse_page(&page.body, &page.final_url) {
                Ok(parsed) => record.absorb_page(&parsed, ContactSource::ContactPages),
                Err(e) => tracing::debug!("Skipping {}: {}", candidate, e),
            }
        }

        let root = homepage_url.host_str().map(root_domain).unwrap_or_default();
        if root.is_empty() {
            return record;
        }

        if record.emails.is_empty() && self.config.registration_lookup {
            match self.registration.lookup(&root).await {
                Lookup::Found(text) => {
                    let emails = registrant_emails(&text);
                    tracing::debug!("Registration record of {} lists {} emails", root, emails.len());
                    record.add_emails(&emails, ContactSource::RegistrationRecord);
                }
                Lookup::Unavailable(reason) => {
                    tracing::debug!("Registration record of {} unavailable: {}", root, reason);
                }
            }
        }

        if record.emails.is_empty() && self.config.generate_addresses {
            match self.dns.has_mail_exchange(&root).await {
                Lookup::Found(true) => {
                    let generated: Vec<String> = self
                        .config
                        .generated_local_parts
                        .iter()
                        .map(|local| format!("{}@{}", local.trim(), root))
                        .collect();
                    record.add_generated(&generated);
                }
                Lookup::Found(false) => {
                    tracing::debug!("{} has no mail exchange, not generating addresses", root);
                }
                Lookup::Unavailable(reason) => {
                    tracing::debug!("Mail exchange lookup for {} unavailable: {}", root, reason);
                }
            }
        }

        record
    }

    async fn fetch_page(&self, url: &Url, budget: &RetryBudget) -> Option<FetchedPage> {
        match self.fetcher.fetch(url.as_str(), budget).await {
            FetchOutcome::Page(page) => Some(page),
            other => {
                tracing::debug!("No page at {}: {:?}", url, other);
                None
            }
        }
    }
}

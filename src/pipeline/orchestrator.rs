//! Batch orchestration
//!
//! A batch pulls opportunities from the store into a shared queue and drains
//! it with a fixed number of worker tasks. Each opportunity is validated,
//! then (unless rejected or inconclusive) has its contacts extracted, and
//! finally gets exactly one store update carrying every changed field.

use crate::config::Config;
use crate::contact::ContactExtractor;
use crate::discovery::ContactPageDiscoverer;
use crate::fetcher::{Fetcher, RetryBudget};
use crate::lookup::{DnsLookup, HickoryDns, RegistrationLookup, WhoisCommand};
use crate::store::{
    CandidateSelector, Opportunity, OpportunityStatus, OpportunityStore, OpportunityUpdate,
};
use crate::throttle::DomainThrottle;
use crate::url::{extract_domain, normalize_url};
use crate::validator::{
    DomainValidator, HeuristicTrafficEstimator, HttpMetricsProvider, MetricsProvider,
    TrafficEstimator, ValidationReport,
};
use crate::{ContactRecord, EnrichError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Upper bound on concurrent workers
pub const MAX_CONCURRENCY: usize = 32;

/// Counts reported at the end of a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Opportunities taken from the queue
    pub processed: u64,
    /// Validated or premium
    pub passing: u64,
    pub premium: u64,
    /// Inconclusive, store errors and crashed tasks
    pub failed: u64,
}

impl BatchSummary {
    fn record(&mut self, outcome: Outcome) {
        self.processed += 1;
        match outcome {
            Outcome::Passing { premium } => {
                self.passing += 1;
                if premium {
                    self.premium += 1;
                }
            }
            Outcome::Rejected => {}
            Outcome::Failed => self.failed += 1,
        }
    }

    fn absorb(&mut self, other: BatchSummary) {
        self.processed += other.processed;
        self.passing += other.passing;
        self.premium += other.premium;
        self.failed += other.failed;
    }
}

/// What happened to one opportunity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Passing { premium: bool },
    Rejected,
    Failed,
}

/// Optional data sources used by validation and extraction
#[derive(Clone)]
pub struct Sources {
    pub dns: Arc<dyn DnsLookup>,
    pub registration: Arc<dyn RegistrationLookup>,
    pub metrics: Arc<dyn MetricsProvider>,
    pub traffic: Arc<dyn TrafficEstimator>,
}

impl Sources {
    /// The production sources: system DNS, the `whois` binary, the HTTP
    /// metrics provider and the homepage traffic heuristic
    pub fn from_config(config: &Config) -> Result<Self, EnrichError> {
        Ok(Self {
            dns: Arc::new(HickoryDns::new()),
            registration: Arc::new(WhoisCommand::new(Duration::from_secs(
                config.extractor.whois_timeout_secs,
            ))),
            metrics: Arc::new(HttpMetricsProvider::from_config(&config.metrics)?),
            traffic: Arc::new(HeuristicTrafficEstimator),
        })
    }
}

/// State shared by every worker of a pipeline
struct Shared<S> {
    store: Mutex<S>,
    validator: DomainValidator,
    extractor: ContactExtractor,
    retry_budget: u32,
}

impl<S: OpportunityStore> Shared<S> {
    fn store(&self) -> MutexGuard<'_, S> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Validates, extracts and writes back one opportunity
    async fn process(&self, opportunity: Opportunity) -> Outcome {
        let budget = RetryBudget::new(self.retry_budget);
        let target = if opportunity.url.is_empty() {
            opportunity.domain.as_str()
        } else {
            opportunity.url.as_str()
        };

        let report = self
            .validator
            .validate(target, opportunity.contact_info.as_ref(), &budget)
            .await;

        let (update, outcome) = self.plan_update(&opportunity, &report, &budget).await;

        tracing::debug!(
            "Opportunity {} used {} retries",
            opportunity.id,
            budget.spent()
        );

        match self.store().update_opportunity(opportunity.id, &update) {
            Ok(()) => outcome,
            Err(e) => {
                tracing::error!("Failed to store opportunity {}: {}", opportunity.id, e);
                Outcome::Failed
            }
        }
    }

    async fn plan_update(
        &self,
        opportunity: &Opportunity,
        report: &ValidationReport,
        budget: &RetryBudget,
    ) -> (OpportunityUpdate, Outcome) {
        let mut update = OpportunityUpdate {
            validation_data: Some(report.to_validation_data()),
            ..Default::default()
        };

        let status = match report.status {
            Some(status) => status,
            None => {
                tracing::warn!(
                    "Opportunity {} left as {}: {}",
                    opportunity.id,
                    opportunity.status,
                    report.fail_reason.as_deref().unwrap_or("inconclusive")
                );
                return (update, Outcome::Failed);
            }
        };

        update.status = Some(status);
        update.is_premium = Some(report.is_premium);
        update.domain_authority = report.metrics.domain_authority;
        update.spam_score = report.metrics.spam_score;

        if status == OpportunityStatus::Rejected {
            return (update, Outcome::Rejected);
        }

        let contacts = self
            .extractor
            .extract_with_homepage(opportunity, report.homepage.as_ref(), budget)
            .await;
        if opportunity.contact_info.as_ref() != Some(&contacts) {
            update.contact_info = Some(contacts);
        }

        (
            update,
            Outcome::Passing {
                premium: report.is_premium,
            },
        )
    }
}

/// Enrichment pipeline over an opportunity store
pub struct Pipeline<S> {
    shared: Arc<Shared<S>>,
    config_hash: String,
    batch_size: usize,
    default_concurrency: usize,
}

impl<S: OpportunityStore + 'static> Pipeline<S> {
    /// Builds a pipeline with the production data sources
    pub fn new(config: &Config, config_hash: String, store: S) -> Result<Self, EnrichError> {
        let sources = Sources::from_config(config)?;
        Self::with_sources(config, config_hash, store, sources)
    }

    /// Builds a pipeline around the given data sources
    ///
    /// Validation and extraction share one fetcher, and with it one
    /// throttle, so running both never doubles the rate against a domain.
    pub fn with_sources(
        config: &Config,
        config_hash: String,
        store: S,
        sources: Sources,
    ) -> Result<Self, EnrichError> {
        let throttle = DomainThrottle::from_config(&config.throttle);
        let fetcher = Fetcher::from_config(&config.fetcher, throttle)?;

        let validator = DomainValidator::new(
            fetcher.clone(),
            sources.dns.clone(),
            sources.registration.clone(),
            sources.traffic,
            sources.metrics,
            config.validator.clone(),
        );
        let discoverer = ContactPageDiscoverer::new(fetcher.clone(), &config.discovery);
        let extractor = ContactExtractor::new(
            fetcher,
            discoverer,
            sources.dns,
            sources.registration,
            config.extractor.clone(),
        );

        Ok(Self {
            shared: Arc::new(Shared {
                store: Mutex::new(store),
                validator,
                extractor,
                retry_budget: config.fetcher.retry_budget,
            }),
            config_hash,
            batch_size: config.batch.batch_size,
            default_concurrency: config.batch.concurrency,
        })
    }

    /// Runs `f` with exclusive access to the store
    pub fn with_store<T>(&self, f: impl FnOnce(&mut S) -> T) -> T {
        f(&mut self.shared.store())
    }

    /// Adds a website to the store, or returns the ID it already has
    pub fn enroll(&self, url: &str) -> Result<i64, EnrichError> {
        let target = crate::url::parse_target(url)?;
        let normalized = normalize_url(target.as_str())?;
        let domain = extract_domain(&normalized).ok_or(crate::UrlError::MissingDomain)?;

        let id = self
            .shared
            .store()
            .insert_opportunity(normalized.as_str(), &domain)?;
        tracing::info!("Enrolled {} as opportunity {}", normalized, id);
        Ok(id)
    }

    /// Processes one batch of opportunities
    ///
    /// Per-opportunity failures are counted, never propagated; only a store
    /// failure before any work starts aborts the batch.
    ///
    /// # Arguments
    ///
    /// * `selector` - Which opportunities to take; its `limit` overrides the
    ///   configured batch size
    /// * `concurrency` - Worker count, clamped to `1..=32`; 0 uses the
    ///   configured default
    pub async fn run_batch(
        &self,
        selector: &CandidateSelector,
        concurrency: usize,
    ) -> Result<BatchSummary, EnrichError> {
        let limit = selector.limit.unwrap_or(self.batch_size);
        let concurrency = match concurrency {
            0 => self.default_concurrency,
            n => n,
        }
        .clamp(1, MAX_CONCURRENCY);

        let (candidates, run_id) = {
            let mut store = self.shared.store();
            let candidates = store.list_unprocessed(selector, limit)?;
            let run_id = store.create_run(&self.config_hash)?;
            (candidates, run_id)
        };

        tracing::info!(
            "Batch run {}: {} opportunities, {} workers",
            run_id,
            candidates.len(),
            concurrency
        );

        let queue = Arc::new(Mutex::new(VecDeque::from(candidates)));
        let workers = concurrency.min(queue_len(&queue)).max(1);

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let queue = Arc::clone(&queue);
            let shared = Arc::clone(&self.shared);
            handles.push(tokio::spawn(async move {
                work(worker_id, queue, shared).await
            }));
        }

        let mut summary = BatchSummary::default();
        for handle in handles {
            match handle.await {
                Ok(worker_summary) => summary.absorb(worker_summary),
                Err(e) => tracing::error!("Batch worker failed: {}", e),
            }
        }

        // Anything left behind by a dead worker still counts
        let abandoned = queue_len(&queue) as u64;
        if abandoned > 0 {
            summary.processed += abandoned;
            summary.failed += abandoned;
        }

        let recorded = if summary.processed > 0 && summary.failed == summary.processed {
            tracing::warn!("Batch run {}: every opportunity failed", run_id);
            self.shared.store().fail_run(run_id, &summary)
        } else {
            self.shared.store().complete_run(run_id, &summary)
        };
        if let Err(e) = recorded {
            tracing::error!("Failed to record batch run {}: {}", run_id, e);
        }

        tracing::info!(
            "Batch run {} finished: {} processed, {} passing, {} premium, {} failed",
            run_id,
            summary.processed,
            summary.passing,
            summary.premium,
            summary.failed
        );
        Ok(summary)
    }

    /// Runs contact extraction alone for one opportunity and stores the result
    pub async fn extract_contacts(&self, id: i64) -> Result<ContactRecord, EnrichError> {
        let opportunity = self.get_opportunity(id)?;
        let budget = RetryBudget::new(self.shared.retry_budget);

        let contacts = self.shared.extractor.extract(&opportunity, &budget).await;
        if opportunity.contact_info.as_ref() != Some(&contacts) {
            let update = OpportunityUpdate {
                contact_info: Some(contacts.clone()),
                ..Default::default()
            };
            self.shared.store().update_opportunity(id, &update)?;
        }
        Ok(contacts)
    }

    /// Validates a domain without touching the store
    pub async fn validate_domain(&self, domain: &str) -> ValidationReport {
        let budget = RetryBudget::new(self.shared.retry_budget);
        self.shared.validator.validate(domain, None, &budget).await
    }

    fn get_opportunity(&self, id: i64) -> Result<Opportunity, EnrichError> {
        match self.shared.store().get_opportunity(id) {
            Ok(opportunity) => Ok(opportunity),
            Err(crate::store::StorageError::OpportunityNotFound(id)) => {
                Err(EnrichError::OpportunityNotFound(id))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn queue_len(queue: &Mutex<VecDeque<Opportunity>>) -> usize {
    queue.lock().unwrap_or_else(|e| e.into_inner()).len()
}

/// One worker: pops until the queue is empty
///
/// Each opportunity runs in its own task so a panic costs that opportunity
/// only.
async fn work<S: OpportunityStore + 'static>(
    worker_id: usize,
    queue: Arc<Mutex<VecDeque<Opportunity>>>,
    shared: Arc<Shared<S>>,
) -> BatchSummary {
    let mut summary = BatchSummary::default();

    loop {
        let next = queue.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        let Some(opportunity) = next else {
            break;
        };

        let id = opportunity.id;
        tracing::debug!("Worker {} processing opportunity {}", worker_id, id);

        let task_shared = Arc::clone(&shared);
        let outcome = match tokio::spawn(async move { task_shared.process(opportunity).await }).await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Opportunity {} crashed: {}", id, e);
                Outcome::Failed
            }
        };
        summary.record(outcome);
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut summary = BatchSummary::default();
        summary.record(Outcome::Passing { premium: true });
        summary.record(Outcome::Passing { premium: false });
        summary.record(Outcome::Rejected);
        summary.record(Outcome::Failed);

        assert_eq!(
            summary,
            BatchSummary {
                processed: 4,
                passing: 2,
                premium: 1,
                failed: 1,
            }
        );

        let mut total = BatchSummary::default();
        total.absorb(summary);
        total.absorb(summary);
        assert_eq!(total.processed, 8);
        assert_eq!(total.premium, 2);
    }
}

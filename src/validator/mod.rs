//! Tiered domain validation
//!
//! Each tier is more expensive than the one before it and only runs when the
//! earlier tiers passed:
//!
//! | Tier | Checks | Sources |
//! |------|--------|---------|
//! | 1 | resolves, answers, has real content and a way to make contact | DNS, HEAD/GET |
//! | 2 | domain age, traffic estimate, niche relevance | registration record, [`TrafficEstimator`] |
//! | 3 | domain authority, spam score | [`MetricsProvider`], with conservative fallbacks |
//!
//! A Tier 1 network failure that never got a definitive answer leaves the
//! report *inconclusive* (`status == None`): the opportunity is retried by a
//! later batch instead of being rejected.

mod metrics;
mod provider;
mod tiers;

pub use metrics::{
    relevance_score, spam_signals, HeuristicTrafficEstimator, TrafficEstimator, ValidationMetrics,
};
pub use provider::{DomainMetrics, HttpMetricsProvider, MetricsProvider};
pub use tiers::{classify, content_failure, quality_failure, Classification};

use crate::config::ValidatorConfig;
use crate::contact::ContactRecord;
use crate::fetcher::{FetchOutcome, FetchedPage, Fetcher, RetryBudget};
use crate::lookup::{domain_age_years, parse_creation_date, DnsLookup, Lookup, RegistrationLookup};
use crate::parser::{parse_page, ParsedPage};
use crate::store::OpportunityStatus;
use crate::url::{parse_target, root_domain};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Where Tier 3 numbers came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsSource {
    Provider,
    Fallback,
}

/// Result of validating one domain
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Host that was validated
    pub domain: String,

    /// `None` when Tier 1 could not reach a verdict
    pub status: Option<OpportunityStatus>,

    pub is_passing: bool,
    pub is_premium: bool,
    pub metrics: ValidationMetrics,

    /// Always set for rejected and inconclusive reports
    pub fail_reason: Option<String>,

    pub tiers_completed: u8,
    pub metrics_source: Option<MetricsSource>,
    pub validated_at: DateTime<Utc>,

    /// Homepage fetched by Tier 1, handed on to contact extraction
    pub homepage: Option<FetchedPage>,
}

impl ValidationReport {
    fn new(domain: String) -> Self {
        Self {
            domain,
            status: None,
            is_passing: false,
            is_premium: false,
            metrics: ValidationMetrics::default(),
            fail_reason: None,
            tiers_completed: 0,
            metrics_source: None,
            validated_at: Utc::now(),
            homepage: None,
        }
    }

    fn reject(mut self, reason: impl Into<String>) -> Self {
        self.status = Some(OpportunityStatus::Rejected);
        self.is_passing = false;
        self.is_premium = false;
        self.fail_reason = Some(reason.into());
        self
    }

    fn inconclusive(mut self, reason: impl Into<String>) -> Self {
        self.status = None;
        self.fail_reason = Some(reason.into());
        self
    }

    /// True when no verdict was reached and the opportunity stays re-triable
    pub fn is_inconclusive(&self) -> bool {
        self.status.is_none()
    }

    /// The JSON stored in `validation_data`
    ///
    /// All measured metrics plus `failReason`, `tiersCompleted`,
    /// `metricsSource`, `validatedAt` and `inconclusive`.
    pub fn to_validation_data(&self) -> Value {
        let mut data = match serde_json::to_value(&self.metrics) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };

        data.insert(
            "failReason".to_string(),
            self.fail_reason
                .as_ref()
                .map_or(Value::Null, |r| Value::String(r.clone())),
        );
        data.insert("tiersCompleted".to_string(), Value::from(self.tiers_completed));
        data.insert(
            "metricsSource".to_string(),
            self.metrics_source
                .and_then(|s| serde_json::to_value(s).ok())
                .unwrap_or(Value::Null),
        );
        data.insert(
            "validatedAt".to_string(),
            Value::String(self.validated_at.to_rfc3339()),
        );
        data.insert("inconclusive".to_string(), Value::Bool(self.is_inconclusive()));

        Value::Object(data)
    }
}

/// Runs the three validation tiers against a domain
#[derive(Clone)]
pub struct DomainValidator {
    fetcher: Fetcher,
    dns: Arc<dyn DnsLookup>,
    registration: Arc<dyn RegistrationLookup>,
    traffic: Arc<dyn TrafficEstimator>,
    metrics: Arc<dyn MetricsProvider>,
    config: ValidatorConfig,
}

impl std::fmt::Debug for DomainValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainValidator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DomainValidator {
    pub fn new(
        fetcher: Fetcher,
        dns: Arc<dyn DnsLookup>,
        registration: Arc<dyn RegistrationLookup>,
        traffic: Arc<dyn TrafficEstimator>,
        metrics: Arc<dyn MetricsProvider>,
        config: ValidatorConfig,
    ) -> Self {
        Self {
            fetcher,
            dns,
            registration,
            traffic,
            metrics,
            config,
        }
    }

    /// Validates a bare domain or a homepage URL
    ///
    /// # Arguments
    ///
    /// * `domain_or_url` - `acme.io` or `https://acme.io/`
    /// * `existing_contacts` - Stored contact record; a satisfied one counts as
    ///   a contact method even when the homepage shows none
    /// * `budget` - Retry budget of the opportunity
    pub async fn validate(
        &self,
        domain_or_url: &str,
        existing_contacts: Option<&ContactRecord>,
        budget: &RetryBudget,
    ) -> ValidationReport {
        let target = match parse_target(domain_or_url) {
            Ok(url) => url,
            Err(e) => {
                return ValidationReport::new(domain_or_url.to_string())
                    .reject(format!("invalid URL: {}", e));
            }
        };
        let host = target.host_str().unwrap_or_default().to_lowercase();
        let root = root_domain(&host);
        let mut report = ValidationReport::new(host.clone());

        // ===== Tier 1 =====

        match self.dns.resolves(&host).await {
            Lookup::Found(false) => {
                report.metrics.is_domain_active = Some(false);
                tracing::info!("{} rejected: domain does not resolve", host);
                return report.reject("domain does not resolve");
            }
            Lookup::Found(true) => {}
            Lookup::Unavailable(reason) => {
                tracing::debug!("DNS check for {} unavailable: {}", host, reason);
            }
        }

        let head = self.fetcher.head(target.as_str(), budget).await;
        if let FetchOutcome::Page(page) = &head {
            report.metrics.is_domain_active = Some(true);
            report.metrics.status_code = Some(page.status_code);
        }

        let page = match self.fetcher.fetch(target.as_str(), budget).await {
            FetchOutcome::Page(page) => page,
            FetchOutcome::Status { status_code, .. } => {
                report.metrics.is_domain_active = Some(true);
                report.metrics.status_code = Some(status_code);
                tracing::info!("{} rejected: HTTP {}", host, status_code);
                return report.reject(format!("homepage returned HTTP {}", status_code));
            }
            FetchOutcome::NotHtml { content_type, .. } => {
                report.metrics.is_domain_active = Some(true);
                return report.reject(format!("homepage is not HTML ({})", content_type));
            }
            FetchOutcome::Unavailable {
                failure, attempts, ..
            } => {
                if failure.is_permanent() {
                    report.metrics.is_domain_active = Some(false);
                    tracing::info!("{} rejected: {}", host, failure);
                    return report.reject(format!("homepage unreachable: {}", failure));
                }
                tracing::warn!(
                    "{} inconclusive after {} attempts: {}",
                    host,
                    attempts,
                    failure
                );
                return report.inconclusive(format!(
                    "homepage unavailable after {} attempts: {}",
                    attempts, failure
                ));
            }
        };

        report.metrics.is_domain_active = Some(true);
        report.metrics.status_code = Some(page.status_code);
        report.metrics.content_length = Some(page.body.len());

        let parsed = match parse_page(&page.body, &page.final_url) {
            Ok(parsed) => parsed,
            Err(e) => return report.reject(format!("homepage could not be parsed: {}", e)),
        };
        self.measure_content(&mut report.metrics, &parsed, existing_contacts);
        report.homepage = Some(page);

        if let Some(reason) = content_failure(&report.metrics, &self.config) {
            report.tiers_completed = 1;
            tracing::info!("{} rejected at tier 1: {}", host, reason);
            return report.reject(reason);
        }
        report.tiers_completed = 1;

        // ===== Tier 2 =====

        self.measure_quality(&mut report.metrics, &root, &parsed).await;
        if let Some(reason) = quality_failure(&report.metrics, &self.config) {
            report.tiers_completed = 2;
            tracing::info!("{} rejected at tier 2: {}", host, reason);
            return report.reject(reason);
        }
        report.tiers_completed = 2;

        // ===== Tier 3 =====

        match self.metrics.domain_metrics(&root).await {
            Lookup::Found(metrics) => {
                report.metrics.domain_authority = Some(metrics.domain_authority);
                report.metrics.page_authority = metrics.page_authority;
                report.metrics.spam_score = Some(metrics.spam_score);
                report.metrics_source = Some(MetricsSource::Provider);
            }
            Lookup::Unavailable(reason) => {
                tracing::debug!("Metrics for {} unavailable ({}), using fallback", root, reason);
                report.metrics.domain_authority = Some(self.config.fallback_domain_authority);
                report.metrics.spam_score = Some(self.config.fallback_spam_score);
                report.metrics_source = Some(MetricsSource::Fallback);
            }
        }
        report.tiers_completed = 3;

        let classification = classify(&report.metrics, &self.config);
        report.is_passing = classification.is_passing;
        report.is_premium = classification.is_premium;
        report.fail_reason = classification.fail_reason;
        report.status = Some(if classification.is_premium {
            OpportunityStatus::Premium
        } else if classification.is_passing {
            OpportunityStatus::Validated
        } else {
            OpportunityStatus::Rejected
        });

        tracing::info!(
            "{} validated: {} (DA {:?}, spam {:?}, relevance {:?})",
            host,
            report.status.map_or("unknown", |s| s.to_db_string()),
            report.metrics.domain_authority,
            report.metrics.spam_score,
            report.metrics.relevance_score
        );
        report
    }

    fn measure_content(
        &self,
        metrics: &mut ValidationMetrics,
        page: &ParsedPage,
        existing_contacts: Option<&ContactRecord>,
    ) {
        let (spam_words, density) = spam_signals(&page.text, &self.config.spam_keywords);
        metrics.spam_words_found = Some(spam_words);
        metrics.spam_density = Some(density);
        metrics.text_to_link_ratio = Some(page.text_per_link());
        metrics.has_contact_method = Some(
            existing_contacts.map_or(false, |c| c.is_satisfied()) || page.has_contact_method(),
        );
    }

    async fn measure_quality(&self, metrics: &mut ValidationMetrics, root: &str, page: &ParsedPage) {
        match self.registration.lookup(root).await {
            Lookup::Found(record) => {
                metrics.domain_age =
                    parse_creation_date(&record).map(|created| domain_age_years(created, Utc::now()));
            }
            Lookup::Unavailable(reason) => {
                tracing::debug!("Registration record of {} unavailable: {}", root, reason);
            }
        }

        match self.traffic.estimate(root, Some(page)).await {
            Lookup::Found(traffic) => metrics.estimated_traffic = Some(traffic),
            Lookup::Unavailable(reason) => {
                tracing::debug!("Traffic estimate for {} unavailable: {}", root, reason);
            }
        }

        let mut text = page.title.clone().unwrap_or_default();
        text.push(' ');
        text.push_str(&page.text);
        metrics.relevance_score = relevance_score(
            &text,
            &self.config.niche_keywords,
            self.config.relevance_saturation,
        );
    }
}

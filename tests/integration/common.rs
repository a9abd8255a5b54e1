//! Shared fixtures: stub data sources, test configuration and a temp store

use async_trait::async_trait;
use outreach_enrich::config::Config;
use outreach_enrich::lookup::{DnsLookup, Lookup, RegistrationLookup};
use outreach_enrich::parser::ParsedPage;
use outreach_enrich::pipeline::{Pipeline, Sources};
use outreach_enrich::store::SqliteStore;
use outreach_enrich::validator::{DomainMetrics, MetricsProvider, TrafficEstimator};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

pub struct StubDns {
    pub resolves: Lookup<bool>,
    pub mx: Lookup<bool>,
}

#[async_trait]
impl DnsLookup for StubDns {
    async fn resolves(&self, _domain: &str) -> Lookup<bool> {
        self.resolves.clone()
    }

    async fn has_mail_exchange(&self, _domain: &str) -> Lookup<bool> {
        self.mx.clone()
    }
}

pub struct StubWhois(pub Lookup<String>);

#[async_trait]
impl RegistrationLookup for StubWhois {
    async fn lookup(&self, _domain: &str) -> Lookup<String> {
        self.0.clone()
    }
}

pub struct StubTraffic(pub Lookup<u64>);

#[async_trait]
impl TrafficEstimator for StubTraffic {
    async fn estimate(&self, _domain: &str, _homepage: Option<&ParsedPage>) -> Lookup<u64> {
        self.0.clone()
    }
}

/// Metrics provider that counts how often it was asked
pub struct CountingMetrics {
    pub answer: Lookup<DomainMetrics>,
    pub calls: Arc<AtomicUsize>,
}

impl CountingMetrics {
    pub fn new(answer: Lookup<DomainMetrics>) -> Self {
        Self {
            answer,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl MetricsProvider for CountingMetrics {
    async fn domain_metrics(&self, _domain: &str) -> Lookup<DomainMetrics> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}

/// Knobs for one test's data sources
pub struct Fixture {
    pub resolves: Lookup<bool>,
    pub mx: Lookup<bool>,
    pub whois: Lookup<String>,
    pub traffic: Lookup<u64>,
    pub metrics: Lookup<DomainMetrics>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            resolves: Lookup::Found(true),
            mx: Lookup::Found(false),
            whois: Lookup::Unavailable("no whois in tests".to_string()),
            traffic: Lookup::Found(500),
            metrics: Lookup::Unavailable("no provider in tests".to_string()),
        }
    }
}

/// Configuration with short intervals, few retries and a small niche
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.throttle.min_interval_ms = 100;
    config.fetcher.max_retries = 1;
    config.fetcher.base_delay_ms = 10;
    config.fetcher.max_delay_ms = 50;
    config.fetcher.timeout_secs = 5;
    config.fetcher.connect_timeout_secs = 2;
    config.fetcher.retry_budget = 4;
    config.validator.niche_keywords = ["marketing", "seo", "analytics", "content", "growth"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    config.validator.relevance_saturation = 5;
    config.batch.concurrency = 2;
    config
}

pub struct TestPipeline {
    pub pipeline: Pipeline<SqliteStore>,
    pub metrics_calls: Arc<AtomicUsize>,
    _dir: TempDir,
}

impl TestPipeline {
    pub fn metrics_calls(&self) -> usize {
        self.metrics_calls.load(Ordering::SeqCst)
    }
}

/// A pipeline over a fresh on-disk store
pub fn build_pipeline(config: &Config, fixture: Fixture) -> TestPipeline {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = SqliteStore::new(&dir.path().join("test.db")).expect("Failed to open store");

    let metrics = CountingMetrics::new(fixture.metrics);
    let metrics_calls = Arc::clone(&metrics.calls);

    let sources = Sources {
        dns: Arc::new(StubDns {
            resolves: fixture.resolves,
            mx: fixture.mx,
        }),
        registration: Arc::new(StubWhois(fixture.whois)),
        metrics: Arc::new(metrics),
        traffic: Arc::new(StubTraffic(fixture.traffic)),
    };

    let pipeline = Pipeline::with_sources(config, "test-hash".to_string(), store, sources)
        .expect("Failed to build pipeline");

    TestPipeline {
        pipeline,
        metrics_calls,
        _dir: dir,
    }
}

/// Wraps body text in a minimal HTML document
pub fn html_page(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, body
    )
}

use serde::Deserialize;

/// Main configuration structure for Outreach-Enrich
///
/// Every section is optional in the TOML file; missing sections and keys fall
/// back to the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub throttle: ThrottleConfig,
    pub fetcher: FetcherConfig,
    pub discovery: DiscoveryConfig,
    pub extractor: ExtractorConfig,
    pub validator: ValidatorConfig,
    pub metrics: MetricsConfig,
    pub batch: BatchConfig,
    pub storage: StorageConfig,
}

/// Per-domain request pacing
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ThrottleConfig {
    /// Minimum time between request starts to the same root domain (milliseconds)
    pub min_interval_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 2000,
        }
    }
}

/// HTTP fetch behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetcherConfig {
    /// Retries after the first attempt for transient failures
    pub max_retries: u32,

    /// Backoff base delay (milliseconds)
    pub base_delay_ms: u64,

    /// Backoff ceiling (milliseconds)
    pub max_delay_ms: u64,

    /// Relative jitter applied to each backoff delay, in [0, 1)
    pub jitter: f64,

    /// Whole-request timeout (seconds)
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    pub connect_timeout_secs: u64,

    /// Maximum redirect hops followed per request
    pub max_redirects: usize,

    /// Retries allowed per opportunity, summed over all of its fetches
    pub retry_budget: u32,

    /// User-Agent pool; one is picked at random per request
    pub user_agents: Vec<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 8000,
            jitter: 0.25,
            timeout_secs: 15,
            connect_timeout_secs: 10,
            max_redirects: 5,
            retry_budget: 12,
            user_agents: default_user_agents(),
        }
    }
}

fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
        "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Contact page discovery
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DiscoveryConfig {
    /// Maximum number of candidate URLs returned per domain
    pub max_candidates: usize,

    /// Conventional contact-bearing paths, tried in order
    pub paths: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_candidates: 10,
            paths: [
                "/contact",
                "/contact-us",
                "/about",
                "/about-us",
                "/team",
                "/write-for-us",
                "/advertise",
                "/impressum",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Contact extraction cascade
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExtractorConfig {
    /// Query the registration record when pages yield no email
    pub registration_lookup: bool,

    /// Generate conventional addresses as a last resort
    pub generate_addresses: bool,

    /// Local parts used for generated addresses
    pub generated_local_parts: Vec<String>,

    /// Timeout for the system `whois` command (seconds)
    pub whois_timeout_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            registration_lookup: true,
            generate_addresses: true,
            generated_local_parts: ["info", "contact", "hello", "support"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            whois_timeout_secs: 15,
        }
    }
}

/// Domain validation thresholds
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ValidatorConfig {
    /// Tier 1: minimum homepage body size (bytes)
    pub min_content_length: usize,

    /// Tier 1: maximum share of words that are spam keywords
    pub max_spam_density: f64,

    /// Tier 1: minimum visible characters per link
    pub min_text_per_link: f64,

    /// Tier 2: traffic floor, applied when an estimate is available
    pub min_traffic: u64,

    /// Tier 2: relevance floor, applied when a score is available
    pub min_relevance: u32,

    /// Topic keywords describing the product's niche
    pub niche_keywords: Vec<String>,

    /// Distinct niche keywords needed for a relevance score of 100
    pub relevance_saturation: usize,

    /// Keywords counted towards spam density
    pub spam_keywords: Vec<String>,

    /// Substituted when the metrics provider is unavailable
    pub fallback_domain_authority: f64,

    /// Substituted when the metrics provider is unavailable
    pub fallback_spam_score: f64,

    pub standard: StandardThresholds,
    pub premium: PremiumThresholds,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_content_length: 200,
            max_spam_density: 0.03,
            min_text_per_link: 15.0,
            min_traffic: 100,
            min_relevance: 30,
            niche_keywords: [
                "marketing",
                "seo",
                "business",
                "technology",
                "software",
                "startup",
                "ecommerce",
                "digital",
                "content",
                "growth",
                "analytics",
                "saas",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            relevance_saturation: 5,
            spam_keywords: [
                "casino",
                "viagra",
                "cialis",
                "payday",
                "porn",
                "xxx",
                "betting",
                "gambling",
                "replica",
                "escort",
                "cheap pills",
                "crypto giveaway",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            fallback_domain_authority: 25.0,
            fallback_spam_score: 3.0,
            standard: StandardThresholds::default(),
            premium: PremiumThresholds::default(),
        }
    }
}

/// Thresholds an opportunity must meet to pass
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StandardThresholds {
    pub min_domain_authority: f64,
    pub max_spam_score: f64,
    pub min_relevance: u32,
}

impl Default for StandardThresholds {
    fn default() -> Self {
        Self {
            min_domain_authority: 20.0,
            max_spam_score: 5.0,
            min_relevance: 60,
        }
    }
}

/// Stricter thresholds for premium opportunities
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PremiumThresholds {
    pub min_domain_authority: f64,
    pub max_spam_score: f64,
    pub min_relevance: u32,
    pub min_traffic: u64,
    pub min_domain_age_years: f64,
}

impl Default for PremiumThresholds {
    fn default() -> Self {
        Self {
            min_domain_authority: 40.0,
            max_spam_score: 2.0,
            min_relevance: 80,
            min_traffic: 1000,
            min_domain_age_years: 2.0,
        }
    }
}

/// Third-party authority metrics provider
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MetricsConfig {
    /// Endpoint queried as `GET {endpoint}?domain=<domain>`; unset disables the provider
    pub endpoint: Option<String>,

    /// Sent as a bearer token when present
    pub api_key: Option<String>,

    pub timeout_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: 20,
        }
    }
}

/// Batch processing
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BatchConfig {
    /// Number of concurrent workers
    pub concurrency: usize,

    /// Maximum opportunities pulled per batch
    pub batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            batch_size: 50,
        }
    }
}

/// Opportunity store location
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Path to the SQLite database file
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "./opportunities.db".to_string(),
        }
    }
}

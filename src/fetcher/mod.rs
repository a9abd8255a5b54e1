//! HTTP fetcher implementation
//!
//! This module handles all outbound HTTP requests of the pipeline, including:
//! - Per-root-domain pacing through the shared [`DomainThrottle`]
//! - Randomized User-Agent selection from a fixed pool
//! - Retry with exponential backoff and jitter for transient failures
//! - Immediate give-up on permanent failures (DNS, connection refused)
//! - Error classification
//!
//! # Outcome Table
//!
//! | Condition | Result |
//! |-----------|--------|
//! | HTTP 2xx, HTML-like body | `Page` |
//! | HTTP 2xx, other content type | `NotHtml` |
//! | HTTP 429 / 5xx | retry, then `Unavailable` |
//! | Other HTTP 4xx | `Status` (definitive) |
//! | Timeout, dropped connection | retry, then `Unavailable` |
//! | DNS failure, connection refused | `Unavailable` without retrying |
//!
//! `Unavailable` means "unknown": callers must never record a field as empty
//! or failed on the strength of it alone.

mod client;
mod retry;

pub use client::build_http_client;
pub use retry::{FailureClass, RetryBudget, RetryPolicy, RetryState};

use crate::config::FetcherConfig;
use crate::throttle::DomainThrottle;
use crate::url::extract_domain;
use rand::seq::SliceRandom;
use reqwest::{header, Client, Method, StatusCode};
use std::error::Error as StdError;
use url::Url;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested
    pub url: Url,
    /// Final URL after redirects
    pub final_url: Url,
    pub status_code: u16,
    pub content_type: String,
    /// Empty for HEAD requests
    pub body: String,
}

/// Why a fetch could not produce an answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    Timeout,
    RateLimited,
    ServerError(u16),
    /// Connection reset, truncated body and similar mid-flight errors
    Transport(String),
    DnsFailure(String),
    ConnectionRefused(String),
    /// Other connection-establishment errors, TLS included
    Connect(String),
    TooManyRedirects,
    InvalidUrl(String),
}

impl FetchFailure {
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Timeout | Self::RateLimited | Self::ServerError(_) | Self::Transport(_) => {
                FailureClass::Transient
            }
            Self::DnsFailure(_)
            | Self::ConnectionRefused(_)
            | Self::Connect(_)
            | Self::TooManyRedirects
            | Self::InvalidUrl(_) => FailureClass::Permanent,
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.class() == FailureClass::Permanent
    }
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timed out"),
            Self::RateLimited => write!(f, "rate limited (HTTP 429)"),
            Self::ServerError(code) => write!(f, "server error (HTTP {})", code),
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::DnsFailure(e) => write!(f, "DNS failure: {}", e),
            Self::ConnectionRefused(e) => write!(f, "connection refused: {}", e),
            Self::Connect(e) => write!(f, "connection failed: {}", e),
            Self::TooManyRedirects => write!(f, "too many redirects"),
            Self::InvalidUrl(e) => write!(f, "invalid URL: {}", e),
        }
    }
}

/// Result of a fetch operation
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// 2xx with an HTML-like body (HEAD: empty body)
    Page(FetchedPage),

    /// The server answered with a non-retryable error status
    Status { url: Url, status_code: u16 },

    /// 2xx, but not a document we can parse
    NotHtml { url: Url, content_type: String },

    /// No answer; the state machine gave up
    Unavailable {
        url: String,
        failure: FetchFailure,
        attempts: u32,
    },
}

impl FetchOutcome {
    /// The fetched page, if any
    pub fn page(&self) -> Option<&FetchedPage> {
        match self {
            Self::Page(page) => Some(page),
            _ => None,
        }
    }

    pub fn into_page(self) -> Option<FetchedPage> {
        match self {
            Self::Page(page) => Some(page),
            _ => None,
        }
    }

    /// True when the server gave an answer, even a negative one
    pub fn is_answered(&self) -> bool {
        !matches!(self, Self::Unavailable { .. })
    }

    /// The failure behind an `Unavailable` outcome
    pub fn failure(&self) -> Option<&FetchFailure> {
        match self {
            Self::Unavailable { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

/// Throttled, retrying HTTP fetcher shared by the validator and extractor
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    throttle: DomainThrottle,
    policy: RetryPolicy,
    user_agents: Vec<String>,
}

impl Fetcher {
    pub fn new(
        client: Client,
        throttle: DomainThrottle,
        policy: RetryPolicy,
        user_agents: Vec<String>,
    ) -> Self {
        let user_agents = user_agents
            .into_iter()
            .filter(|ua| !ua.trim().is_empty())
            .collect();
        Self {
            client,
            throttle,
            policy,
            user_agents,
        }
    }

    /// Builds a fetcher from configuration around an existing throttle
    pub fn from_config(
        config: &FetcherConfig,
        throttle: DomainThrottle,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config)?;
        Ok(Self::new(
            client,
            throttle,
            RetryPolicy::from_config(config),
            config.user_agents.clone(),
        ))
    }

    pub fn throttle(&self) -> &DomainThrottle {
        &self.throttle
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GETs a page
    pub async fn fetch(&self, url: &str, budget: &RetryBudget) -> FetchOutcome {
        self.execute(Method::GET, url, budget).await
    }

    /// Sends a HEAD request; a success is reported as a `Page` with an empty body
    pub async fn head(&self, url: &str, budget: &RetryBudget) -> FetchOutcome {
        self.execute(Method::HEAD, url, budget).await
    }

    /// Drives the retry state machine for one logical request
    async fn execute(&self, method: Method, url_str: &str, budget: &RetryBudget) -> FetchOutcome {
        let url = match Url::parse(url_str) {
            Ok(url) => url,
            Err(e) => {
                return FetchOutcome::Unavailable {
                    url: url_str.to_string(),
                    failure: FetchFailure::InvalidUrl(e.to_string()),
                    attempts: 0,
                }
            }
        };
        let domain = match extract_domain(&url) {
            Some(domain) => domain,
            None => {
                return FetchOutcome::Unavailable {
                    url: url_str.to_string(),
                    failure: FetchFailure::InvalidUrl("missing host".to_string()),
                    attempts: 0,
                }
            }
        };

        let mut state = RetryState::Attempting(0);
        let mut attempts = 0;
        let mut last_failure = FetchFailure::Timeout;

        loop {
            match state {
                RetryState::Attempting(attempt) => {
                    self.throttle.acquire(&domain).await;
                    attempts += 1;

                    match self.attempt(method.clone(), &url).await {
                        Ok(outcome) => return outcome,
                        Err(failure) => {
                            state = self.policy.advance(attempt, failure.class(), budget);
                            tracing::debug!(
                                "{} {} attempt {} failed: {} -> {:?}",
                                method,
                                url,
                                attempt + 1,
                                failure,
                                state
                            );
                            last_failure = failure;
                        }
                    }
                }
                RetryState::Retrying(retry) => {
                    let delay = self.policy.backoff(retry);
                    tracing::trace!("Backing off {:?} before retrying {}", delay, url);
                    tokio::time::sleep(delay).await;
                    state = RetryState::Attempting(retry + 1);
                }
                RetryState::Exhausted | RetryState::Rejected => {
                    tracing::info!(
                        "Giving up on {} after {} attempt(s): {}",
                        url,
                        attempts,
                        last_failure
                    );
                    return FetchOutcome::Unavailable {
                        url: url.to_string(),
                        failure: last_failure,
                        attempts,
                    };
                }
            }
        }
    }

    /// One request; `Err` carries failures the state machine decides on
    async fn attempt(&self, method: Method, url: &Url) -> Result<FetchOutcome, FetchFailure> {
        let is_head = method == Method::HEAD;
        let mut request = self.client.request(method, url.clone());
        if let Some(user_agent) = self.pick_user_agent() {
            request = request.header(header::USER_AGENT, user_agent);
        }

        let response = request.send().await.map_err(|e| classify_error(&e))?;
        let status = response.status();
        let final_url = response.url().clone();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchFailure::RateLimited);
        }
        if status.is_server_error() {
            return Err(FetchFailure::ServerError(status.as_u16()));
        }
        if !status.is_success() {
            return Ok(FetchOutcome::Status {
                url: final_url,
                status_code: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        if is_head {
            return Ok(FetchOutcome::Page(FetchedPage {
                url: url.clone(),
                final_url,
                status_code: status.as_u16(),
                content_type,
                body: String::new(),
            }));
        }

        if !is_html_like(&content_type) {
            return Ok(FetchOutcome::NotHtml {
                url: final_url,
                content_type,
            });
        }

        let body = response.text().await.map_err(|e| classify_error(&e))?;

        Ok(FetchOutcome::Page(FetchedPage {
            url: url.clone(),
            final_url,
            status_code: status.as_u16(),
            content_type,
            body,
        }))
    }

    fn pick_user_agent(&self) -> Option<String> {
        self.user_agents.choose(&mut rand::thread_rng()).cloned()
    }
}

/// Accepts HTML, XHTML, plain text and servers that omit the header
fn is_html_like(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type.contains("html")
        || content_type.contains("xml")
        || content_type.starts_with("text/")
}

/// Maps a reqwest error onto the retry taxonomy
fn classify_error(err: &reqwest::Error) -> FetchFailure {
    if err.is_timeout() {
        return FetchFailure::Timeout;
    }
    if err.is_redirect() {
        return FetchFailure::TooManyRedirects;
    }

    let detail = error_chain_text(err);
    if err.is_connect() {
        if chain_has_io_kind(err, std::io::ErrorKind::ConnectionRefused) {
            return FetchFailure::ConnectionRefused(detail);
        }
        let lowered = detail.to_lowercase();
        if lowered.contains("dns error")
            || lowered.contains("failed to lookup address")
            || lowered.contains("name or service not known")
            || lowered.contains("no such host")
            || lowered.contains("nodename nor servname")
        {
            return FetchFailure::DnsFailure(detail);
        }
        if lowered.contains("connection refused") {
            return FetchFailure::ConnectionRefused(detail);
        }
        return FetchFailure::Connect(detail);
    }

    FetchFailure::Transport(detail)
}

fn chain_has_io_kind(err: &reqwest::Error, kind: std::io::ErrorKind) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if io.kind() == kind {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

fn error_chain_text(err: &reqwest::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}

use crate::config::FetcherConfig;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// The User-Agent is chosen per request by the [`Fetcher`](super::Fetcher),
/// so the client itself carries none.
///
/// # Example
///
/// ```no_run
/// use outreach_enrich::config::FetcherConfig;
/// use outreach_enrich::fetcher::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(config.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&FetcherConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_build_with_zero_redirects() {
        let config = FetcherConfig {
            max_redirects: 0,
            ..FetcherConfig::default()
        };
        assert!(build_http_client(&config).is_ok());
    }
}

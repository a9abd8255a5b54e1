//! Third-party authority metrics

use crate::config::MetricsConfig;
use crate::lookup::Lookup;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Authority metrics for one domain
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainMetrics {
    pub domain_authority: f64,
    #[serde(default)]
    pub page_authority: Option<f64>,
    pub spam_score: f64,
}

/// Source of [`DomainMetrics`]
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    async fn domain_metrics(&self, domain: &str) -> Lookup<DomainMetrics>;
}

/// Queries `GET {endpoint}?domain=<domain>` and reads a JSON body
#[derive(Debug, Clone)]
pub struct HttpMetricsProvider {
    client: Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

impl HttpMetricsProvider {
    pub fn from_config(config: &MetricsConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config
                .endpoint
                .as_ref()
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }
}

#[async_trait]
impl MetricsProvider for HttpMetricsProvider {
    async fn domain_metrics(&self, domain: &str) -> Lookup<DomainMetrics> {
        let Some(endpoint) = &self.endpoint else {
            return Lookup::Unavailable("no metrics endpoint configured".to_string());
        };

        let mut request = self.client.get(endpoint).query(&[("domain", domain)]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Lookup::Unavailable(format!("metrics request failed: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            return Lookup::Unavailable(format!("metrics provider returned HTTP {}", status.as_u16()));
        }

        match response.json::<DomainMetrics>().await {
            Ok(metrics) if metrics.domain_authority.is_finite() && metrics.spam_score.is_finite() => {
                Lookup::Found(metrics)
            }
            Ok(_) => Lookup::Unavailable("metrics provider returned non-finite values".to_string()),
            Err(e) => Lookup::Unavailable(format!("unreadable metrics response: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(endpoint: Option<String>) -> HttpMetricsProvider {
        HttpMetricsProvider::from_config(&MetricsConfig {
            endpoint,
            api_key: Some("secret".to_string()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_reads_metrics() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/metrics"))
            .and(query_param("domain", "acme.io"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "domainAuthority": 55,
                "pageAuthority": 48.5,
                "spamScore": 1
            })))
            .mount(&server)
            .await;

        let p = provider(Some(format!("{}/metrics", server.uri())));
        assert_eq!(
            p.domain_metrics("acme.io").await,
            Lookup::Found(DomainMetrics {
                domain_authority: 55.0,
                page_authority: Some(48.5),
                spam_score: 1.0,
            })
        );
    }

    #[tokio::test]
    async fn test_errors_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let p = provider(Some(format!("{}/metrics", server.uri())));
        assert!(!p.domain_metrics("acme.io").await.is_found());

        assert!(!provider(None).domain_metrics("acme.io").await.is_found());
    }

    #[tokio::test]
    async fn test_malformed_body_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"rank\": 3}"))
            .mount(&server)
            .await;

        let p = provider(Some(format!("{}/metrics", server.uri())));
        assert!(!p.domain_metrics("acme.io").await.is_found());
    }
}

use crate::config::types::{
    BatchConfig, Config, FetcherConfig, MetricsConfig, StorageConfig, ThrottleConfig,
    ValidatorConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_throttle_config(&config.throttle)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_validator_config(&config.validator)?;
    validate_metrics_config(&config.metrics)?;
    validate_batch_config(&config.batch)?;
    validate_storage_config(&config.storage)?;

    if config.discovery.max_candidates == 0 {
        return Err(ConfigError::Validation(
            "discovery.max-candidates must be >= 1".to_string(),
        ));
    }

    for path in &config.discovery.paths {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "discovery path '{}' must start with '/'",
                path
            )));
        }
    }

    for local in &config.extractor.generated_local_parts {
        validate_local_part(local)?;
    }

    Ok(())
}

fn validate_throttle_config(config: &ThrottleConfig) -> Result<(), ConfigError> {
    if config.min_interval_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "throttle.min-interval-ms must be >= 100ms, got {}ms",
            config.min_interval_ms
        )));
    }
    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "fetcher.max-retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.base_delay_ms == 0 || config.base_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "fetcher.base-delay-ms must be in 1..=max-delay-ms ({}), got {}",
            config.max_delay_ms, config.base_delay_ms
        )));
    }

    if !(0.0..1.0).contains(&config.jitter) {
        return Err(ConfigError::Validation(format!(
            "fetcher.jitter must be in [0, 1), got {}",
            config.jitter
        )));
    }

    if config.timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "fetcher timeouts must be >= 1 second".to_string(),
        ));
    }

    if config.max_redirects > 20 {
        return Err(ConfigError::Validation(format!(
            "fetcher.max-redirects must be <= 20, got {}",
            config.max_redirects
        )));
    }

    if config.user_agents.iter().all(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "fetcher.user-agents must contain at least one non-empty entry".to_string(),
        ));
    }

    Ok(())
}

fn validate_validator_config(config: &ValidatorConfig) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&config.max_spam_density) {
        return Err(ConfigError::Validation(format!(
            "validator.max-spam-density must be in [0, 1], got {}",
            config.max_spam_density
        )));
    }

    if config.relevance_saturation == 0 {
        return Err(ConfigError::Validation(
            "validator.relevance-saturation must be >= 1".to_string(),
        ));
    }

    if config.min_relevance > 100
        || config.standard.min_relevance > 100
        || config.premium.min_relevance > 100
    {
        return Err(ConfigError::Validation(
            "relevance thresholds must be in 0..=100".to_string(),
        ));
    }

    // Premium implies passing only if premium is at least as strict
    if config.premium.min_domain_authority < config.standard.min_domain_authority
        || config.premium.max_spam_score > config.standard.max_spam_score
        || config.premium.min_relevance < config.standard.min_relevance
    {
        return Err(ConfigError::Validation(
            "validator.premium thresholds must be at least as strict as validator.standard"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_metrics_config(config: &MetricsConfig) -> Result<(), ConfigError> {
    if let Some(endpoint) = &config.endpoint {
        let url = Url::parse(endpoint)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid metrics.endpoint: {}", e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "metrics.endpoint must use http or https, got '{}'",
                url.scheme()
            )));
        }
    }
    Ok(())
}

fn validate_batch_config(config: &BatchConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 32 {
        return Err(ConfigError::Validation(format!(
            "batch.concurrency must be between 1 and 32, got {}",
            config.concurrency
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch.batch-size must be >= 1, got {}",
            config.batch_size
        )));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "storage.database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Local parts must be usable verbatim in front of `@domain`
fn validate_local_part(local: &str) -> Result<(), ConfigError> {
    if local.is_empty()
        || !local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "Invalid generated local part: '{}'",
            local
        )));
    }
    Ok(())
}

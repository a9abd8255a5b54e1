//! Threshold checks for each tier and the final classification

use crate::config::ValidatorConfig;
use crate::validator::ValidationMetrics;

/// Outcome of the final classification
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub is_passing: bool,
    pub is_premium: bool,
    /// Set exactly when the opportunity is not passing
    pub fail_reason: Option<String>,
}

/// Tier 1 content checks; the first failed check is returned
pub fn content_failure(metrics: &ValidationMetrics, config: &ValidatorConfig) -> Option<String> {
    let length = metrics.content_length.unwrap_or(0);
    if length < config.min_content_length {
        return Some(format!(
            "content too thin: {} bytes (minimum {})",
            length, config.min_content_length
        ));
    }

    if let Some(density) = metrics.spam_density {
        if density > config.max_spam_density {
            let words = metrics
                .spam_words_found
                .as_ref()
                .map(|w| w.join(", "))
                .unwrap_or_default();
            return Some(format!(
                "spam keyword density {:.3} exceeds {:.3} ({})",
                density, config.max_spam_density, words
            ));
        }
    }

    if let Some(ratio) = metrics.text_to_link_ratio {
        if ratio < config.min_text_per_link {
            return Some(format!(
                "link-heavy page: {:.1} characters per link (minimum {:.1})",
                ratio, config.min_text_per_link
            ));
        }
    }

    if metrics.has_contact_method != Some(true) {
        return Some("no contact method".to_string());
    }

    None
}

/// Tier 2 floors; each applies only when its value is known
pub fn quality_failure(metrics: &ValidationMetrics, config: &ValidatorConfig) -> Option<String> {
    if let Some(traffic) = metrics.estimated_traffic {
        if traffic < config.min_traffic {
            return Some(format!(
                "estimated traffic {} below {}",
                traffic, config.min_traffic
            ));
        }
    }

    if let Some(relevance) = metrics.relevance_score {
        if relevance < config.min_relevance {
            return Some(format!(
                "relevance {} below {}",
                relevance, config.min_relevance
            ));
        }
    }

    None
}

/// Applies the standard and premium thresholds
///
/// A metric that was never measured fails every threshold that needs it.
pub fn classify(metrics: &ValidationMetrics, config: &ValidatorConfig) -> Classification {
    let standard = &config.standard;
    let mut failures = Vec::new();

    match metrics.domain_authority {
        Some(da) if da >= standard.min_domain_authority => {}
        Some(da) => failures.push(format!(
            "domain authority {} below {}",
            da, standard.min_domain_authority
        )),
        None => failures.push("domain authority unknown".to_string()),
    }

    match metrics.spam_score {
        Some(spam) if spam <= standard.max_spam_score => {}
        Some(spam) => failures.push(format!(
            "spam score {} above {}",
            spam, standard.max_spam_score
        )),
        None => failures.push("spam score unknown".to_string()),
    }

    match metrics.relevance_score {
        Some(relevance) if relevance >= standard.min_relevance => {}
        Some(relevance) => failures.push(format!(
            "relevance {} below {}",
            relevance, standard.min_relevance
        )),
        None => failures.push("relevance unknown".to_string()),
    }

    if !failures.is_empty() {
        return Classification {
            is_passing: false,
            is_premium: false,
            fail_reason: Some(failures.join("; ")),
        };
    }

    let premium = &config.premium;
    let is_premium = metrics
        .domain_authority
        .map_or(false, |da| da >= premium.min_domain_authority)
        && metrics
            .spam_score
            .map_or(false, |spam| spam <= premium.max_spam_score)
        && metrics
            .relevance_score
            .map_or(false, |r| r >= premium.min_relevance)
        && metrics
            .estimated_traffic
            .map_or(false, |t| t >= premium.min_traffic)
        && metrics
            .domain_age
            .map_or(false, |age| age >= premium.min_domain_age_years);

    Classification {
        is_passing: true,
        is_premium,
        fail_reason: None,
    }
}

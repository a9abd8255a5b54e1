//! Validation metrics and the content signals behind Tiers 1 and 2

use crate::lookup::Lookup;
use crate::parser::ParsedPage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Everything the tiers measured about a domain
///
/// Fields stay `None` unless the tier computing them ran and its source
/// answered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_domain_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spam_words_found: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spam_density: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_to_link_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_contact_method: Option<bool>,
    /// Years since registration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_age: Option<f64>,
    /// Monthly visits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_traffic: Option<u64>,
    /// 0-100
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_authority: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_authority: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spam_score: Option<f64>,
}

/// Lower-cased alphanumeric words of a text
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Number of times `phrase` occurs as a run of whole words
fn phrase_occurrences(words: &[String], phrase: &[String]) -> usize {
    if phrase.is_empty() || phrase.len() > words.len() {
        return 0;
    }
    words.windows(phrase.len()).filter(|w| *w == phrase).count()
}

/// Spam keywords present in `text` and their density
///
/// Density is keyword occurrences over total words; an empty text has
/// density 0.
pub fn spam_signals(text: &str, keywords: &[String]) -> (Vec<String>, f64) {
    let words = words(text);
    if words.is_empty() {
        return (Vec::new(), 0.0);
    }

    let mut found = BTreeSet::new();
    let mut hits = 0;
    for keyword in keywords {
        let phrase = self::words(keyword);
        let count = phrase_occurrences(&words, &phrase);
        if count > 0 {
            found.insert(keyword.trim().to_lowercase());
            hits += count * phrase.len();
        }
    }

    let density = hits as f64 / words.len() as f64;
    (found.into_iter().collect(), density)
}

/// Niche relevance, 0-100
///
/// Counts distinct niche keywords present in `text`. Matching
/// `saturation` of them (or all of them, if fewer) scores 100. `None` when
/// no keywords are configured.
pub fn relevance_score(text: &str, keywords: &[String], saturation: usize) -> Option<u32> {
    let keywords: BTreeSet<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        return None;
    }

    let words = words(text);
    let matched = keywords
        .iter()
        .filter(|k| phrase_occurrences(&words, &self::words(k)) > 0)
        .count();

    let denominator = match saturation {
        0 => keywords.len(),
        n => n.min(keywords.len()),
    };
    let score = (100.0 * matched as f64 / denominator as f64).round() as u32;
    Some(score.min(100))
}

/// Estimates monthly traffic of a domain
#[async_trait]
pub trait TrafficEstimator: Send + Sync {
    async fn estimate(&self, domain: &str, homepage: Option<&ParsedPage>) -> Lookup<u64>;
}

/// Traffic guess from homepage signals alone
///
/// Sites with more content, deeper internal navigation and an active social
/// presence tend to draw more visitors. The result is an order of magnitude,
/// nothing more.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTrafficEstimator;

#[async_trait]
impl TrafficEstimator for HeuristicTrafficEstimator {
    async fn estimate(&self, _domain: &str, homepage: Option<&ParsedPage>) -> Lookup<u64> {
        let Some(page) = homepage else {
            return Lookup::Unavailable("no homepage to estimate from".to_string());
        };

        let content = page.word_count.min(2000) as u64 / 2;
        let navigation = page.internal_link_count.min(100) as u64 * 20;
        let social = page.social_profiles.len().min(5) as u64 * 300;
        let contact = if page.has_contact_method() { 100 } else { 0 };

        Lookup::Found(50 + content + navigation + social + contact)
    }
}

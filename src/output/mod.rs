//! Human-readable output for the command line
//!
//! This module handles:
//! - Store statistics
//! - Validation reports
//! - Contact records and batch summaries

pub mod stats;

pub use stats::{load_statistics, print_statistics, StoreStatistics};

use crate::contact::ContactRecord;
use crate::pipeline::BatchSummary;
use crate::validator::ValidationReport;
use std::fmt::Write;

/// Renders a validation report
pub fn format_validation_report(report: &ValidationReport) -> String {
    let mut out = String::new();
    let verdict = match report.status {
        Some(status) => status.to_string(),
        None => "inconclusive".to_string(),
    };

    let _ = writeln!(out, "Domain: {}", report.domain);
    let _ = writeln!(out, "Verdict: {}", verdict);
    let _ = writeln!(out, "Tiers completed: {}", report.tiers_completed);
    if let Some(reason) = &report.fail_reason {
        let _ = writeln!(out, "Reason: {}", reason);
    }

    let m = &report.metrics;
    let rows: [(&str, Option<String>); 8] = [
        ("Status code", m.status_code.map(|v| v.to_string())),
        ("Content length", m.content_length.map(|v| format!("{} bytes", v))),
        ("Spam density", m.spam_density.map(|v| format!("{:.3}", v))),
        ("Domain age", m.domain_age.map(|v| format!("{:.1} years", v))),
        ("Estimated traffic", m.estimated_traffic.map(|v| v.to_string())),
        ("Relevance", m.relevance_score.map(|v| v.to_string())),
        ("Domain authority", m.domain_authority.map(|v| format!("{:.0}", v))),
        ("Spam score", m.spam_score.map(|v| format!("{:.1}", v))),
    ];
    for (label, value) in rows.iter() {
        if let Some(value) = value {
            let _ = writeln!(out, "  {}: {}", label, value);
        }
    }

    if let Some(source) = report.metrics_source {
        let _ = writeln!(out, "Metrics source: {:?}", source);
    }
    out
}

/// Renders a contact record
pub fn format_contact_record(record: &ContactRecord) -> String {
    let mut out = String::new();
    let details = &record.extraction_details;

    let _ = writeln!(out, "Source: {}", details.source);
    let _ = writeln!(out, "Confidence: {:?}", details.confidence);
    for email in &record.emails {
        let flag = if details.generated_emails.contains(email) {
            " (generated)"
        } else {
            ""
        };
        let _ = writeln!(out, "  email: {}{}", email, flag);
    }
    for profile in &record.social_profiles {
        let _ = writeln!(out, "  {}: {}", profile.platform, profile.url);
    }
    for form in &record.contact_forms {
        let _ = writeln!(out, "  form: {}", form);
    }
    out
}

/// One-line batch summary
pub fn format_batch_summary(summary: &BatchSummary) -> String {
    format!(
        "{} processed, {} passing ({} premium), {} failed",
        summary.processed, summary.passing, summary.premium, summary.failed
    )
}

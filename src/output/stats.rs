//! Statistics from the opportunity store
//!
//! This module provides functionality for extracting and displaying
//! enrichment statistics from the store.

use crate::store::{BatchRunRecord, OpportunityStatus, OpportunityStore, StorageResult};

/// Number of batch runs shown in the statistics
const RECENT_RUNS: usize = 5;

/// Store statistics summary
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    /// Total number of opportunities
    pub total_opportunities: u64,

    /// Count of opportunities by status, in lifecycle order
    pub by_status: Vec<(OpportunityStatus, u64)>,

    /// Opportunities with at least one email or contact form
    pub with_contacts: u64,

    /// Most recent batch runs, newest first
    pub recent_runs: Vec<BatchRunRecord>,
}

impl StoreStatistics {
    pub fn count(&self, status: OpportunityStatus) -> u64 {
        self.by_status
            .iter()
            .find(|(s, _)| *s == status)
            .map_or(0, |(_, count)| *count)
    }
}

/// Loads statistics from the store
///
/// # Arguments
///
/// * `store` - The store to query
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(store: &dyn OpportunityStore) -> StorageResult<StoreStatistics> {
    let total_opportunities = store.count_total()?;

    let mut by_status = Vec::with_capacity(OpportunityStatus::ALL.len());
    for status in OpportunityStatus::ALL {
        by_status.push((status, store.count_by_status(status)?));
    }

    Ok(StoreStatistics {
        total_opportunities,
        by_status,
        with_contacts: store.count_with_contacts()?,
        recent_runs: store.recent_runs(RECENT_RUNS)?,
    })
}

fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Opportunity Statistics ===\n");

    println!("Overview:");
    println!("  Total opportunities: {}", stats.total_opportunities);
    println!(
        "  With contact details: {} ({:.1}%)",
        stats.with_contacts,
        percentage(stats.with_contacts, stats.total_opportunities)
    );
    println!();

    println!("Opportunities by Status:");
    for (status, count) in &stats.by_status {
        println!(
            "  {}: {} ({:.1}%)",
            status,
            count,
            percentage(*count, stats.total_opportunities)
        );
    }
    println!();

    if !stats.recent_runs.is_empty() {
        println!("Recent Batch Runs:");
        for run in &stats.recent_runs {
            println!(
                "  #{} {} [{}] processed {}, passing {}, premium {}, failed {}",
                run.id,
                run.started_at,
                run.status.to_db_string(),
                run.processed,
                run.passing,
                run.premium,
                run.failed
            );
        }
        println!();
    }

    let passing = stats.count(OpportunityStatus::Validated) + stats.count(OpportunityStatus::Premium);
    let decided = passing + stats.count(OpportunityStatus::Rejected);
    println!(
        "Pass Rate: {:.1}% ({} / {} validated opportunities)",
        percentage(passing, decided),
        passing,
        decided
    );
}

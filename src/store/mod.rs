//! Opportunity store
//!
//! This module persists opportunities and batch runs, including:
//! - SQLite database initialization and schema management
//! - Candidate selection for batch runs
//! - Single-statement partial updates
//! - Lenient decoding of rows written by older versions

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{OpportunityStore, StorageError, StorageResult};

use crate::contact::ContactRecord;
use serde_json::Value;
use std::path::Path;

/// Opens or creates an opportunity database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Successfully opened store
/// * `Err(StorageError)` - Failed to open or initialize the database
pub fn open_store(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::new(path)
}

/// Lifecycle status of an opportunity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpportunityStatus {
    /// Enrolled, not yet (conclusively) validated
    Discovered,
    /// Passed validation
    Validated,
    /// Passed the stricter premium thresholds
    Premium,
    /// Failed validation
    Rejected,
}

impl OpportunityStatus {
    pub const ALL: [OpportunityStatus; 4] = [
        Self::Discovered,
        Self::Validated,
        Self::Premium,
        Self::Rejected,
    ];

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Validated => "validated",
            Self::Premium => "premium",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "discovered" => Some(Self::Discovered),
            "validated" => Some(Self::Validated),
            "premium" => Some(Self::Premium),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for OpportunityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_db_string())
    }
}

impl std::str::FromStr for OpportunityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_string(&s.trim().to_lowercase())
            .ok_or_else(|| format!("unknown status: {}", s))
    }
}

/// A candidate website
#[derive(Debug, Clone)]
pub struct Opportunity {
    pub id: i64,
    pub domain: String,
    pub url: String,
    pub status: OpportunityStatus,
    /// Unset until Tier 3 has run
    pub domain_authority: Option<f64>,
    pub spam_score: Option<f64>,
    pub is_premium: bool,
    /// Opaque bag of per-tier metrics and verdict details
    pub validation_data: Value,
    pub contact_info: Option<ContactRecord>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields to change on an opportunity; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct OpportunityUpdate {
    pub status: Option<OpportunityStatus>,
    pub domain_authority: Option<f64>,
    pub spam_score: Option<f64>,
    pub is_premium: Option<bool>,
    pub validation_data: Option<Value>,
    pub contact_info: Option<ContactRecord>,
}

impl OpportunityUpdate {
    /// True if no field would change
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.domain_authority.is_none()
            && self.spam_score.is_none()
            && self.is_premium.is_none()
            && self.validation_data.is_none()
            && self.contact_info.is_none()
    }
}

/// Which opportunities a batch picks up
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSelector {
    /// Statuses to include
    pub statuses: Vec<OpportunityStatus>,

    /// Only opportunities without a satisfied contact record
    pub missing_contacts: bool,

    /// Only opportunities flagged premium
    pub premium_only: bool,

    /// Batch size override
    pub limit: Option<usize>,
}

impl Default for CandidateSelector {
    fn default() -> Self {
        Self {
            statuses: vec![OpportunityStatus::Discovered],
            missing_contacts: false,
            premium_only: false,
            limit: None,
        }
    }
}

impl CandidateSelector {
    /// Checks one opportunity against the selector
    pub fn matches(&self, opportunity: &Opportunity) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&opportunity.status) {
            return false;
        }
        if self.premium_only && !opportunity.is_premium {
            return false;
        }
        if self.missing_contacts
            && opportunity
                .contact_info
                .as_ref()
                .map_or(false, |c| c.is_satisfied())
        {
            return false;
        }
        true
    }
}

/// A recorded batch run
#[derive(Debug, Clone)]
pub struct BatchRunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub processed: u64,
    pub passing: u64,
    pub premium: u64,
    pub failed: u64,
}

/// Status of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opportunity(status: OpportunityStatus) -> Opportunity {
        Opportunity {
            id: 1,
            domain: "acme.io".to_string(),
            url: "https://acme.io/".to_string(),
            status,
            domain_authority: None,
            spam_score: None,
            is_premium: false,
            validation_data: Value::Object(Default::default()),
            contact_info: Some(ContactRecord::empty()),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_status_roundtrip() {
        for status in OpportunityStatus::ALL {
            assert_eq!(
                OpportunityStatus::from_db_string(status.to_db_string()),
                Some(status)
            );
        }
        assert_eq!(OpportunityStatus::from_db_string("archived"), None);
        assert_eq!("Premium".parse::<OpportunityStatus>(), Ok(OpportunityStatus::Premium));
    }

    #[test]
    fn test_run_status_roundtrip() {
        for status in [RunStatus::Running, RunStatus::Completed, RunStatus::Failed] {
            assert_eq!(RunStatus::from_db_string(status.to_db_string()), Some(status));
        }
        assert_eq!(RunStatus::from_db_string("interrupted"), None);
    }

    #[test]
    fn test_default_selector_takes_discovered() {
        let selector = CandidateSelector::default();
        assert!(selector.matches(&opportunity(OpportunityStatus::Discovered)));
        assert!(!selector.matches(&opportunity(OpportunityStatus::Validated)));
    }

    #[test]
    fn test_selector_filters() {
        let selector = CandidateSelector {
            statuses: vec![OpportunityStatus::Validated, OpportunityStatus::Premium],
            missing_contacts: true,
            premium_only: true,
            limit: None,
        };

        let mut premium = opportunity(OpportunityStatus::Premium);
        premium.is_premium = true;
        assert!(selector.matches(&premium));

        let mut contacted = premium.clone();
        let mut record = ContactRecord::empty();
        record.add_emails(&["hi@acme.io".to_string()], crate::contact::ContactSource::Homepage);
        contacted.contact_info = Some(record);
        assert!(!selector.matches(&contacted));

        assert!(!selector.matches(&opportunity(OpportunityStatus::Validated)));
    }

    #[test]
    fn test_empty_update() {
        assert!(OpportunityUpdate::default().is_empty());
        let update = OpportunityUpdate {
            is_premium: Some(false),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}

//! Optional data sources
//!
//! DNS and the domain registration record are best-effort inputs: they may be
//! down, rate limited or simply not installed. Every source answers with a
//! [`Lookup`] instead of an error so callers are forced to distinguish "the
//! answer is no" from "there is no answer".

mod dns;
mod whois;

pub use dns::HickoryDns;
pub use whois::{
    domain_age_years, parse_creation_date, registrant_emails, WhoisCommand,
};

use async_trait::async_trait;

/// Result of an optional data source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// The source answered
    Found(T),
    /// The source could not answer; the reason is for logs only
    Unavailable(String),
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn found(&self) -> Option<&T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Unavailable(_) => None,
        }
    }

    pub fn into_found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Unavailable(_) => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Lookup<U> {
        match self {
            Self::Found(value) => Lookup::Found(f(value)),
            Self::Unavailable(reason) => Lookup::Unavailable(reason),
        }
    }
}

/// Name resolution
#[async_trait]
pub trait DnsLookup: Send + Sync {
    /// `Found(false)` only for a definitive "no such domain"
    async fn resolves(&self, domain: &str) -> Lookup<bool>;

    /// Whether the domain publishes mail exchange records
    async fn has_mail_exchange(&self, domain: &str) -> Lookup<bool>;
}

/// Domain registration record (whois)
#[async_trait]
pub trait RegistrationLookup: Send + Sync {
    /// Raw registration record text
    async fn lookup(&self, domain: &str) -> Lookup<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_accessors() {
        let found: Lookup<u32> = Lookup::Found(3);
        assert!(found.is_found());
        assert_eq!(found.found(), Some(&3));
        assert_eq!(found.map(|n| n * 2), Lookup::Found(6));

        let missing: Lookup<u32> = Lookup::Unavailable("timeout".to_string());
        assert!(!missing.is_found());
        assert_eq!(missing.clone().into_found(), None);
        assert_eq!(
            missing.map(|n| n + 1),
            Lookup::Unavailable("timeout".to_string())
        );
    }
}

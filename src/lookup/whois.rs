use super::{Lookup, RegistrationLookup};
use crate::parser::find_emails;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::time::Duration;
use tokio::process::Command;

/// Record keys that carry the registration date, lower-cased
const CREATION_KEYS: &[&str] = &[
    "creation date",
    "created",
    "created on",
    "created date",
    "registered on",
    "registered",
    "registration time",
    "registration date",
    "domain registration date",
    "domain create date",
];

/// Substrings of privacy-service and registrar abuse addresses
const PROXY_PATTERNS: &[&str] = &[
    "privacy",
    "proxy",
    "redact",
    "gdpr",
    "whoisguard",
    "protect",
    "abuse@",
];

/// Runs the system `whois` binary
#[derive(Debug, Clone)]
pub struct WhoisCommand {
    timeout: Duration,
    commands: Vec<String>,
}

impl WhoisCommand {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            commands: ["whois", "/usr/bin/whois", "/usr/local/bin/whois"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Overrides the binaries tried, in order
    pub fn with_commands(mut self, commands: Vec<String>) -> Self {
        self.commands = commands;
        self
    }
}

impl Default for WhoisCommand {
    fn default() -> Self {
        Self::new(Duration::from_secs(15))
    }
}

#[async_trait]
impl RegistrationLookup for WhoisCommand {
    async fn lookup(&self, domain: &str) -> Lookup<String> {
        // Dropping the future on timeout kills the child process
        match tokio::time::timeout(self.timeout, run_whois(&self.commands, domain)).await {
            Ok(Ok(record)) => Lookup::Found(record),
            Ok(Err(reason)) => Lookup::Unavailable(reason),
            Err(_) => Lookup::Unavailable("whois timed out".to_string()),
        }
    }
}

async fn run_whois(commands: &[String], domain: &str) -> Result<String, String> {
    let mut last_error = "no whois binary found".to_string();

    for cmd in commands {
        let output = Command::new(cmd)
            .arg(domain)
            .kill_on_drop(true)
            .output()
            .await;
        match output {
            Ok(output) if output.status.success() => {
                let record = String::from_utf8_lossy(&output.stdout).to_string();
                if record.trim().is_empty() {
                    return Err("empty whois response".to_string());
                }
                return Ok(record);
            }
            Ok(output) => {
                last_error = format!("{} exited with {}", cmd, output.status);
            }
            Err(_) => continue,
        }
    }

    Err(last_error)
}

/// Finds the registration date in a whois record
///
/// Recognizes the common `Creation Date:`, `created:` and `Registered on:`
/// spellings and several date formats. The earliest date wins when a record
/// lists more than one.
pub fn parse_creation_date(record: &str) -> Option<DateTime<Utc>> {
    record
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = key.trim().to_lowercase();
            if CREATION_KEYS.contains(&key.as_str()) {
                parse_date_value(value.trim())
            } else {
                None
            }
        })
        .min()
}

fn parse_date_value(value: &str) -> Option<DateTime<Utc>> {
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y.%m.%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    let token = value.split_whitespace().next()?;
    let token = token.split('T').next().unwrap_or(token);
    for format in ["%Y-%m-%d", "%d-%b-%Y", "%Y.%m.%d", "%d.%m.%Y", "%Y/%m/%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(token, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }

    None
}

/// Age in years at `now`
pub fn domain_age_years(created: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days = (now - created).num_days().max(0) as f64;
    days / 365.25
}

/// Contact addresses in a whois record, minus privacy proxies and placeholders
pub fn registrant_emails(record: &str) -> Vec<String> {
    find_emails(record)
        .into_iter()
        .filter(|email| !PROXY_PATTERNS.iter().any(|p| email.contains(p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = "\
Domain Name: ACME.IO
Registrar: Example Registrar, Inc.
Updated Date: 2023-01-10T08:00:00Z
Creation Date: 2015-03-02T18:21:08Z
Registrant Email: owner@acme.io
Admin Email: 5f2b1c@privacyguardian.org
Tech Email: redacted@whoisproxy.net
Registrar Abuse Contact Email: abuse@registrar.net
";

    #[test]
    fn test_parse_creation_date_rfc3339() {
        let created = parse_creation_date(RECORD).unwrap();
        assert_eq!(created, Utc.with_ymd_and_hms(2015, 3, 2, 18, 21, 8).unwrap());
    }

    #[test]
    fn test_parse_creation_date_variants() {
        let de = "domain: acme.de\ncreated: 2001-07-15\n";
        assert_eq!(
            parse_creation_date(de).unwrap(),
            Utc.with_ymd_and_hms(2001, 7, 15, 0, 0, 0).unwrap()
        );

        let uk = "    Registered on: 12-Mar-2010\n    Expiry date:  12-Mar-2030\n";
        assert_eq!(
            parse_creation_date(uk).unwrap(),
            Utc.with_ymd_and_hms(2010, 3, 12, 0, 0, 0).unwrap()
        );

        assert!(parse_creation_date("No match for domain \"NOPE.IO\".").is_none());
    }

    #[test]
    fn test_earliest_creation_date_wins() {
        let record = "created: 2012-01-01\nCreation Date: 2009-05-05T00:00:00Z\n";
        assert_eq!(
            parse_creation_date(record).unwrap(),
            Utc.with_ymd_and_hms(2009, 5, 5, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_registrant_emails_skip_privacy_services() {
        assert_eq!(registrant_emails(RECORD), vec!["owner@acme.io"]);
    }

    #[test]
    fn test_domain_age_years() {
        let created = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let age = domain_age_years(created, now);
        assert!((age - 4.0).abs() < 0.01);
        assert_eq!(domain_age_years(now, created), 0.0);
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let whois = WhoisCommand::new(Duration::from_secs(5))
            .with_commands(vec!["/nonexistent/whois-binary".to_string()]);
        assert!(matches!(whois.lookup("acme.io").await, Lookup::Unavailable(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_lookup_times_out_promptly() {
        // `sleep 30` stands in for a whois server that never answers
        let whois = WhoisCommand::new(Duration::from_millis(200))
            .with_commands(vec!["sleep".to_string()]);

        let started = std::time::Instant::now();
        let result = whois.lookup("30").await;
        assert_eq!(result, Lookup::Unavailable("whois timed out".to_string()));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}

use crate::parser::{is_acceptable_email, is_placeholder, parse_social_link, ParsedPage, SocialProfile};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use url::Url;

/// Written into every record's `extractionDetails.version`
pub const RECORD_VERSION: &str = "2";

/// Where a piece of contact data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContactSource {
    Homepage,
    ContactPages,
    RegistrationRecord,
    GeneratedPattern,
}

impl ContactSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Homepage => "homepage",
            Self::ContactPages => "contact_pages",
            Self::RegistrationRecord => "registration_record",
            Self::GeneratedPattern => "generated_pattern",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "homepage" => Some(Self::Homepage),
            "contact_pages" => Some(Self::ContactPages),
            "registration_record" => Some(Self::RegistrationRecord),
            "generated_pattern" => Some(Self::GeneratedPattern),
            _ => None,
        }
    }
}

/// How much the emails of a record can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// At least one address or form was observed on the site or its record
    Verified,
    /// Only pattern-generated addresses
    Low,
    /// Nothing to contact
    None,
}

/// Provenance of a [`ContactRecord`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionDetails {
    pub normalized: bool,
    /// `+`-joined sorted source names, or `none`
    pub source: String,
    pub version: String,
    pub last_updated: DateTime<Utc>,
    pub confidence: Confidence,
    /// Subset of `emails` produced by pattern generation
    pub generated_emails: Vec<String>,
}

/// Normalized contact details of one opportunity
///
/// The four top-level fields are always present. Records only grow: merging
/// is a set union followed by normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    pub emails: Vec<String>,
    pub social_profiles: Vec<SocialProfile>,
    pub contact_forms: Vec<String>,
    pub extraction_details: ExtractionDetails,
}

impl ContactRecord {
    /// An empty record stamped with the current time
    pub fn empty() -> Self {
        Self::empty_at(Utc::now())
    }

    pub fn empty_at(at: DateTime<Utc>) -> Self {
        Self {
            emails: Vec::new(),
            social_profiles: Vec::new(),
            contact_forms: Vec::new(),
            extraction_details: ExtractionDetails {
                normalized: true,
                source: "none".to_string(),
                version: RECORD_VERSION.to_string(),
                last_updated: at,
                confidence: Confidence::None,
                generated_emails: Vec::new(),
            },
        }
    }

    /// True once there is an email or a contact form
    pub fn is_satisfied(&self) -> bool {
        !self.emails.is_empty() || !self.contact_forms.is_empty()
    }

    /// Sources recorded in `extractionDetails.source`
    pub fn sources(&self) -> BTreeSet<ContactSource> {
        self.extraction_details
            .source
            .split('+')
            .filter_map(ContactSource::parse)
            .collect()
    }

    /// Emails that were observed rather than generated
    pub fn verified_emails(&self) -> Vec<&str> {
        self.emails
            .iter()
            .filter(|e| !self.extraction_details.generated_emails.contains(*e))
            .map(|e| e.as_str())
            .collect()
    }

    /// Adds everything a parsed page offered
    pub fn absorb_page(&mut self, page: &ParsedPage, source: ContactSource) {
        let before = self.content_size();
        self.emails.extend(page.emails.iter().cloned());
        self.social_profiles.extend(page.social_profiles.iter().cloned());
        self.contact_forms.extend(page.contact_forms.iter().cloned());
        self.normalize();
        if self.content_size() > before {
            self.add_source(source);
        }
    }

    /// Adds observed addresses from a non-page source
    pub fn add_emails(&mut self, emails: &[String], source: ContactSource) {
        let before = self.emails.len();
        self.emails.extend(emails.iter().cloned());
        self.normalize();
        if self.emails.len() > before {
            self.add_source(source);
        }
    }

    /// Adds pattern-generated addresses, flagged low confidence
    pub fn add_generated(&mut self, emails: &[String]) {
        let fresh: Vec<String> = emails
            .iter()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !self.emails.contains(e))
            .collect();
        if fresh.is_empty() {
            return;
        }
        self.emails.extend(fresh.iter().cloned());
        self.extraction_details.generated_emails.extend(fresh);
        self.normalize();
        if !self.extraction_details.generated_emails.is_empty() {
            self.add_source(ContactSource::GeneratedPattern);
        }
    }

    fn add_source(&mut self, source: ContactSource) {
        let mut sources = self.sources();
        sources.insert(source);
        self.extraction_details.source = join_sources(&sources);
    }

    fn content_size(&self) -> usize {
        self.emails.len() + self.social_profiles.len() + self.contact_forms.len()
    }

    /// Union of two records
    ///
    /// Commutative and associative on content: emails, profiles, forms and
    /// sources are set unions, `lastUpdated` is the later of the two, and an
    /// address stays "generated" only if neither side observed it.
    pub fn merge(&self, other: &ContactRecord) -> ContactRecord {
        let verified: BTreeSet<String> = self
            .verified_emails()
            .into_iter()
            .chain(other.verified_emails())
            .map(|e| e.to_lowercase())
            .collect();

        let generated: Vec<String> = self
            .extraction_details
            .generated_emails
            .iter()
            .chain(other.extraction_details.generated_emails.iter())
            .filter(|e| !verified.contains(&e.to_lowercase()))
            .cloned()
            .collect();

        let mut sources = self.sources();
        sources.extend(other.sources());

        let mut merged = ContactRecord {
            emails: self.emails.iter().chain(other.emails.iter()).cloned().collect(),
            social_profiles: self
                .social_profiles
                .iter()
                .chain(other.social_profiles.iter())
                .cloned()
                .collect(),
            contact_forms: self
                .contact_forms
                .iter()
                .chain(other.contact_forms.iter())
                .cloned()
                .collect(),
            extraction_details: ExtractionDetails {
                normalized: true,
                source: join_sources(&sources),
                version: RECORD_VERSION.to_string(),
                last_updated: self
                    .extraction_details
                    .last_updated
                    .max(other.extraction_details.last_updated),
                confidence: Confidence::None,
                generated_emails: generated,
            },
        };
        merged.normalize();
        merged
    }

    /// True when both records hold the same emails, profiles and forms
    pub fn same_content(&self, other: &ContactRecord) -> bool {
        self.emails == other.emails
            && self.social_profiles == other.social_profiles
            && self.contact_forms == other.contact_forms
            && self.extraction_details.generated_emails == other.extraction_details.generated_emails
    }

    /// Restores every invariant in place
    ///
    /// Lower-cases and validates emails, drops placeholders, deduplicates and
    /// sorts every list, and recomputes `confidence`.
    pub fn normalize(&mut self) {
        self.emails = normalize_emails(&self.emails);

        let generated = normalize_emails(&self.extraction_details.generated_emails);
        self.extraction_details.generated_emails = generated
            .into_iter()
            .filter(|e| self.emails.contains(e))
            .collect();

        let mut profiles: BTreeMap<(String, String), SocialProfile> = BTreeMap::new();
        for profile in self.social_profiles.drain(..) {
            if profile.username.trim().is_empty() || profile.platform.trim().is_empty() {
                continue;
            }
            if is_placeholder(&profile.url) {
                continue;
            }
            let key = profile.key();
            match profiles.get(&key) {
                Some(existing) if existing <= &profile => {}
                _ => {
                    profiles.insert(key, profile);
                }
            }
        }
        self.social_profiles = profiles.into_values().collect();

        let forms: BTreeSet<String> = self
            .contact_forms
            .iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty() && !is_placeholder(f))
            .collect();
        self.contact_forms = forms.into_iter().collect();

        let sources = self.sources();
        self.extraction_details.source = join_sources(&sources);
        self.extraction_details.normalized = true;
        self.extraction_details.version = RECORD_VERSION.to_string();
        self.extraction_details.confidence = self.compute_confidence();
    }

    fn compute_confidence(&self) -> Confidence {
        let observed = self.emails.len() > self.extraction_details.generated_emails.len();
        if observed || !self.contact_forms.is_empty() {
            Confidence::Verified
        } else if !self.extraction_details.generated_emails.is_empty() {
            Confidence::Low
        } else {
            Confidence::None
        }
    }

    /// Reads a stored record, tolerating older or damaged shapes
    ///
    /// Unknown and malformed elements are dropped, missing arrays become
    /// empty, and the result is normalized. Unparseable JSON yields `None`.
    pub fn from_stored(json: &str) -> Option<ContactRecord> {
        let value: Value = serde_json::from_str(json).ok()?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Option<ContactRecord> {
        let obj = value.as_object()?;

        let emails = string_array(obj.get("emails"));
        let contact_forms = string_array(obj.get("contactForms").or_else(|| obj.get("contact_forms")));

        let social_profiles = obj
            .get("socialProfiles")
            .or_else(|| obj.get("social_profiles"))
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(social_from_value).collect())
            .unwrap_or_default();

        let details = obj
            .get("extractionDetails")
            .or_else(|| obj.get("extraction_details"))
            .and_then(Value::as_object);

        let source = details
            .and_then(|d| d.get("source"))
            .and_then(Value::as_str)
            .unwrap_or("none")
            .to_string();

        let last_updated = details
            .and_then(|d| d.get("lastUpdated").or_else(|| d.get("last_updated")))
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(epoch);

        let generated_emails = string_array(
            details.and_then(|d| d.get("generatedEmails").or_else(|| d.get("generated_emails"))),
        );

        let mut record = ContactRecord {
            emails,
            social_profiles,
            contact_forms,
            extraction_details: ExtractionDetails {
                normalized: true,
                source,
                version: RECORD_VERSION.to_string(),
                last_updated,
                confidence: Confidence::None,
                generated_emails,
            },
        };
        record.normalize();
        Some(record)
    }

    /// Serializes for storage
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Default for ContactRecord {
    fn default() -> Self {
        Self::empty_at(epoch())
    }
}

fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(0, 0).single().unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn join_sources(sources: &BTreeSet<ContactSource>) -> String {
    if sources.is_empty() {
        return "none".to_string();
    }
    let mut names: Vec<&str> = sources.iter().map(|s| s.as_str()).collect();
    names.sort_unstable();
    names.join("+")
}

fn normalize_emails(emails: &[String]) -> Vec<String> {
    emails
        .iter()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| is_acceptable_email(e))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Accepts `{platform, url, username}` objects and bare profile URLs
fn social_from_value(value: &Value) -> Option<SocialProfile> {
    if let Some(url) = value.as_str() {
        return Url::parse(url).ok().as_ref().and_then(parse_social_link);
    }

    let obj = value.as_object()?;
    let url = obj.get("url").and_then(Value::as_str)?;
    let platform = obj.get("platform").and_then(Value::as_str);
    let username = obj.get("username").and_then(Value::as_str);

    match (platform, username) {
        (Some(platform), Some(username)) if !platform.is_empty() && !username.is_empty() => {
            Some(SocialProfile {
                platform: platform.to_lowercase(),
                url: url.to_string(),
                username: username.to_string(),
            })
        }
        _ => Url::parse(url).ok().as_ref().and_then(parse_social_link),
    }
}

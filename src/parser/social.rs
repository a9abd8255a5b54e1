//! Social profile recognition
//!
//! Links are matched against a fixed platform table. Each platform says where
//! the username sits in the path; share widgets and other reserved paths are
//! never treated as profiles.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// A social profile found on a page
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SocialProfile {
    pub platform: String,
    pub url: String,
    pub username: String,
}

impl SocialProfile {
    /// Dedup key: platform plus case-folded username
    pub fn key(&self) -> (String, String) {
        (self.platform.to_lowercase(), self.username.to_lowercase())
    }
}

/// Where the username sits in a profile path
#[derive(Debug, Clone, Copy)]
enum UsernameAt {
    /// First path segment: `twitter.com/acme`
    FirstSegment,
    /// Segment after a fixed prefix: `linkedin.com/company/acme`
    After(&'static str),
    /// First segment prefixed with `@`: `tiktok.com/@acme`
    AtHandle,
}

struct Platform {
    name: &'static str,
    hosts: &'static [&'static str],
    canonical_host: &'static str,
    patterns: &'static [UsernameAt],
}

const PLATFORMS: &[Platform] = &[
    Platform {
        name: "linkedin",
        hosts: &["linkedin.com"],
        canonical_host: "www.linkedin.com",
        patterns: &[UsernameAt::After("company"), UsernameAt::After("in")],
    },
    Platform {
        name: "twitter",
        hosts: &["twitter.com", "x.com"],
        canonical_host: "twitter.com",
        patterns: &[UsernameAt::FirstSegment],
    },
    Platform {
        name: "facebook",
        hosts: &["facebook.com", "fb.com"],
        canonical_host: "www.facebook.com",
        patterns: &[UsernameAt::FirstSegment],
    },
    Platform {
        name: "instagram",
        hosts: &["instagram.com"],
        canonical_host: "www.instagram.com",
        patterns: &[UsernameAt::FirstSegment],
    },
    Platform {
        name: "youtube",
        hosts: &["youtube.com"],
        canonical_host: "www.youtube.com",
        patterns: &[
            UsernameAt::After("channel"),
            UsernameAt::After("c"),
            UsernameAt::After("user"),
            UsernameAt::AtHandle,
        ],
    },
    Platform {
        name: "github",
        hosts: &["github.com"],
        canonical_host: "github.com",
        patterns: &[UsernameAt::FirstSegment],
    },
    Platform {
        name: "pinterest",
        hosts: &["pinterest.com"],
        canonical_host: "www.pinterest.com",
        patterns: &[UsernameAt::FirstSegment],
    },
    Platform {
        name: "tiktok",
        hosts: &["tiktok.com"],
        canonical_host: "www.tiktok.com",
        patterns: &[UsernameAt::AtHandle],
    },
];

/// Paths that belong to the platform itself rather than to a profile
const RESERVED_SEGMENTS: &[&str] = &[
    "share", "sharer", "sharer.php", "share.php", "intent", "home", "search", "hashtag", "i",
    "explore", "p", "reel", "reels", "watch", "embed", "pin", "login", "signup", "dialog",
    "plugins", "tr", "settings", "results", "sharearticle", "privacy", "legal",
    "policies", "help", "about", "features", "pages", "groups", "events", "marketplace",
    "notifications", "messages", "stories", "orgs", "topics", "collections",
];

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,100}$").expect("username pattern is valid"));

/// Recognizes a social profile link
///
/// Returns `None` for links to other hosts, share widgets and reserved paths.
pub fn parse_social_link(link: &Url) -> Option<SocialProfile> {
    let host = link.host_str()?.to_lowercase();
    let host = host
        .trim_start_matches("www.")
        .trim_start_matches("m.")
        .trim_start_matches("mobile.");

    let platform = PLATFORMS
        .iter()
        .find(|p| p.hosts.iter().any(|h| *h == host))?;

    let segments: Vec<&str> = link
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    if segments.iter().any(|seg| is_share_segment(seg)) {
        return None;
    }

    for pattern in platform.patterns {
        if let Some((prefix, username)) = match_pattern(*pattern, &segments) {
            if !USERNAME_RE.is_match(username) {
                continue;
            }
            return Some(SocialProfile {
                platform: platform.name.to_string(),
                url: format!("https://{}/{}{}", platform.canonical_host, prefix, username),
                username: username.to_string(),
            });
        }
    }

    None
}

fn match_pattern<'a>(pattern: UsernameAt, segments: &[&'a str]) -> Option<(String, &'a str)> {
    match pattern {
        UsernameAt::FirstSegment => {
            let first = *segments.first()?;
            if first.starts_with('@') || is_reserved(first) {
                return None;
            }
            Some((String::new(), first))
        }
        UsernameAt::After(prefix) => {
            if *segments.first()? != prefix {
                return None;
            }
            let username = *segments.get(1)?;
            Some((format!("{}/", prefix), username))
        }
        UsernameAt::AtHandle => {
            let handle = segments.first()?.strip_prefix('@')?;
            Some(("@".to_string(), handle))
        }
    }
}

fn is_reserved(segment: &str) -> bool {
    RESERVED_SEGMENTS.iter().any(|r| r.eq_ignore_ascii_case(segment))
}

fn is_share_segment(segment: &str) -> bool {
    let lowered = segment.to_lowercase();
    lowered.starts_with("share") || lowered == "intent" || lowered.starts_with("sharer")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(link: &str) -> Option<SocialProfile> {
        parse_social_link(&Url::parse(link).unwrap())
    }

    #[test]
    fn test_linkedin_company_and_person() {
        let company = parse("https://www.linkedin.com/company/acme-inc/").unwrap();
        assert_eq!(company.platform, "linkedin");
        assert_eq!(company.username, "acme-inc");
        assert_eq!(company.url, "https://www.linkedin.com/company/acme-inc");

        let person = parse("https://linkedin.com/in/jane-doe").unwrap();
        assert_eq!(person.username, "jane-doe");
    }

    #[test]
    fn test_twitter_and_x() {
        assert_eq!(parse("https://x.com/acme").unwrap().platform, "twitter");
        assert_eq!(parse("https://twitter.com/acme").unwrap().username, "acme");
    }

    #[test]
    fn test_youtube_variants() {
        assert_eq!(parse("https://www.youtube.com/@acme").unwrap().username, "acme");
        assert_eq!(
            parse("https://youtube.com/channel/UC123abc").unwrap().username,
            "UC123abc"
        );
        assert_eq!(parse("https://youtube.com/c/AcmeTV").unwrap().username, "AcmeTV");
        assert!(parse("https://youtube.com/watch?v=abc").is_none());
    }

    #[test]
    fn test_tiktok_requires_handle() {
        assert_eq!(parse("https://www.tiktok.com/@acme").unwrap().username, "acme");
        assert!(parse("https://www.tiktok.com/acme").is_none());
    }

    #[test]
    fn test_share_links_are_ignored() {
        assert!(parse("https://twitter.com/intent/tweet?text=hi").is_none());
        assert!(parse("https://www.facebook.com/sharer/sharer.php?u=x").is_none());
        assert!(parse("https://www.linkedin.com/shareArticle?url=x").is_none());
        assert!(parse("https://twitter.com/share").is_none());
    }

    #[test]
    fn test_other_hosts_are_ignored() {
        assert!(parse("https://acme.io/twitter").is_none());
        assert!(parse("https://github.com/").is_none());
    }

    #[test]
    fn test_dedup_key_is_case_insensitive() {
        let a = parse("https://github.com/Acme").unwrap();
        let b = parse("https://github.com/acme").unwrap();
        assert_eq!(a.key(), b.key());
    }
}

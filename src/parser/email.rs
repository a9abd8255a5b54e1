//! Email address detection
//!
//! Three sources feed one set: a regex pass over text, `mailto:` targets, and
//! a de-obfuscation pass that rewrites common hiding tricks back into plain
//! addresses before running the regex again.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Longest address we keep
pub const MAX_EMAIL_LENGTH: usize = 100;

/// Fragments that mark template or tooling domains rather than real contacts
const PLACEHOLDER_FRAGMENTS: &[&str] = &[
    "example.",
    "domain.",
    "yourdomain",
    "yoursite",
    "email.com",
    "sentry",
    "wixpress",
];

/// Local parts that only ever appear in form hints and templates
const PLACEHOLDER_LOCAL_PARTS: &[&str] = &[
    "your",
    "yourname",
    "name",
    "user",
    "username",
    "test",
    "placeholder",
];

/// Suffixes of asset file names that look like addresses (`logo@2x.png`)
const FILE_SUFFIXES: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".avif", ".ico", ".css", ".js",
];

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)*\.[a-z]{2,24}")
        .expect("email pattern is valid")
});

static EMAIL_EXACT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)*\.[a-z]{2,24}$")
        .expect("exact email pattern is valid")
});

static DECIMAL_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(\d{2,4});").expect("decimal reference pattern is valid"));

static HEX_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)&#x([0-9a-f]{2,4});").expect("hex reference pattern is valid")
});

static FROM_CHAR_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"String\.fromCharCode\(\s*([\d\s,]+)\)").expect("fromCharCode pattern is valid")
});

static CONCAT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"['"]\s*\+\s*['"]"#).expect("concatenation pattern is valid"));

/// `info [at] acme [dot] com`, `info(at)acme.com`, `info{at}acme.com`
static BRACKETED_AT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)([a-z0-9._%+-]+)\s*(?:\[at\]|\(at\)|\{at\})\s*([a-z0-9-]+(?:\s*(?:\[dot\]|\(dot\)|\{dot\}|\.)\s*[a-z0-9-]+)+)",
    )
    .expect("bracketed at pattern is valid")
});

/// `info at acme dot com`; a bare " at " needs a spelled-out " dot " as well
static SPELLED_AT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([a-z0-9._%+-]+)\s+at\s+([a-z0-9-]+(?:\s+dot\s+[a-z0-9-]+)+)\b")
        .expect("spelled at pattern is valid")
});

static DOT_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(?:\[dot\]|\(dot\)|\{dot\}|\s+dot\s+|\.)\s*").expect("dot pattern is valid")
});

/// Finds acceptable addresses in free text, lower-cased, in order of appearance
pub fn find_emails(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    for m in EMAIL_RE.find_iter(text) {
        let email = m.as_str().trim_matches('.').to_lowercase();
        if is_acceptable_email(&email) && !found.contains(&email) {
            found.push(email);
        }
    }
    found
}

/// Returns the address of a `mailto:` href, if it holds an acceptable one
pub fn mailto_address(href: &str) -> Option<String> {
    let href = href.trim();
    let target = match (href.get(..7), href.get(7..)) {
        (Some(scheme), Some(rest)) if scheme.eq_ignore_ascii_case("mailto:") => rest,
        _ => return None,
    };

    let target = target.split('?').next().unwrap_or("");
    let first = target.split(',').next().unwrap_or("").trim();
    let email = first.replace("%40", "@").replace("%2E", ".").to_lowercase();

    if is_acceptable_email(&email) {
        Some(email)
    } else {
        None
    }
}

/// Rewrites obfuscated addresses into plain text
///
/// Handles numeric character references, `String.fromCharCode(...)` calls,
/// `'a' + '@' + 'b'` concatenation and `[at]`/`[dot]` style substitutions.
pub fn deobfuscate(input: &str) -> String {
    let decoded = decode_char_refs(input);

    let decoded = FROM_CHAR_CODE_RE.replace_all(&decoded, |caps: &Captures| {
        caps[1]
            .split(',')
            .filter_map(|n| n.trim().parse::<u32>().ok())
            .filter_map(char::from_u32)
            .collect::<String>()
    });

    let joined = CONCAT_RE.replace_all(&decoded, "");

    let bracketed = BRACKETED_AT_RE.replace_all(&joined, |caps: &Captures| {
        format!("{}@{}", &caps[1], DOT_TOKEN_RE.replace_all(&caps[2], "."))
    });

    SPELLED_AT_RE
        .replace_all(&bracketed, |caps: &Captures| {
            format!("{}@{}", &caps[1], DOT_TOKEN_RE.replace_all(&caps[2], "."))
        })
        .into_owned()
}

fn decode_char_refs(input: &str) -> String {
    let decimal = DECIMAL_REF_RE.replace_all(input, |caps: &Captures| {
        caps[1]
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    HEX_REF_RE
        .replace_all(&decimal, |caps: &Captures| {
            u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Syntax, length, placeholder and file-name checks on a lower-cased address
pub fn is_acceptable_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LENGTH || !EMAIL_EXACT_RE.is_match(email) {
        return false;
    }

    let (local, domain) = match email.split_once('@') {
        Some(parts) => parts,
        None => return false,
    };
    !PLACEHOLDER_LOCAL_PARTS.contains(&local) && !is_placeholder(domain) && !looks_like_file(email)
}

/// True when the value contains a denylisted placeholder fragment
pub fn is_placeholder(value: &str) -> bool {
    let lowered = value.to_lowercase();
    PLACEHOLDER_FRAGMENTS.iter().any(|f| lowered.contains(f))
}

fn looks_like_file(email: &str) -> bool {
    FILE_SUFFIXES.iter().any(|s| email.ends_with(s))
        || email.contains("@2x")
        || email.contains("@3x")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_plain_emails() {
        let text = "Write to Hello@Acme.io or sales@acme.io. Repeat: hello@acme.io";
        assert_eq!(find_emails(text), vec!["hello@acme.io", "sales@acme.io"]);
    }

    #[test]
    fn test_placeholders_are_dropped() {
        let text = "you@example.com, john@yourdomain.com, abc@o123.ingest.sentry.io, real@acme.io";
        assert_eq!(find_emails(text), vec!["real@acme.io"]);

        let hints = "name@acme.io user@acme.io test@acme.io your@acme.io placeholder@acme.io";
        assert!(find_emails(hints).is_empty());
    }

    #[test]
    fn test_local_parts_ending_in_placeholder_words_are_kept() {
        for email in [
            "contest@acme.io",
            "latest@acme.io",
            "poweruser@acme.io",
            "firstname@acme.io",
        ] {
            assert!(is_acceptable_email(email), "{} was dropped", email);
        }
        assert_eq!(
            find_emails("Enter the contest@acme.io giveaway"),
            vec!["contest@acme.io"]
        );
    }

    #[test]
    fn test_file_names_are_dropped() {
        assert!(find_emails("logo@2x.png icon@3x.webp sprite@home.png").is_empty());
    }

    #[test]
    fn test_overlong_email_is_dropped() {
        let long = format!("{}@acme.io", "a".repeat(95));
        assert!(!is_acceptable_email(&long));
    }

    #[test]
    fn test_mailto_address() {
        assert_eq!(
            mailto_address("mailto:Team@Acme.io?subject=Hi"),
            Some("team@acme.io".to_string())
        );
        assert_eq!(
            mailto_address("MAILTO:press%40acme.io"),
            Some("press@acme.io".to_string())
        );
        assert_eq!(mailto_address("mailto:"), None);
        assert_eq!(mailto_address("https://acme.io"), None);
    }

    #[test]
    fn test_deobfuscate_bracketed() {
        let out = deobfuscate("reach info [at] acme [dot] io today");
        assert_eq!(find_emails(&out), vec!["info@acme.io"]);

        let out = deobfuscate("jobs(at)acme.co.uk");
        assert_eq!(find_emails(&out), vec!["jobs@acme.co.uk"]);
    }

    #[test]
    fn test_deobfuscate_spelled_out() {
        let out = deobfuscate("mail press at acme dot io");
        assert_eq!(find_emails(&out), vec!["press@acme.io"]);

        // a lone " at " is ordinary prose
        let out = deobfuscate("meet us at acme.io");
        assert!(find_emails(&out).is_empty());
    }

    #[test]
    fn test_deobfuscate_char_refs() {
        let out = deobfuscate("info&#64;acme&#46;io and sales&#x40;acme.io");
        assert_eq!(find_emails(&out), vec!["info@acme.io", "sales@acme.io"]);
    }

    #[test]
    fn test_deobfuscate_from_char_code() {
        // "hi@a.io"
        let script = "document.write(String.fromCharCode(104, 105, 64, 97, 46, 105, 111));";
        assert_eq!(find_emails(&deobfuscate(script)), vec!["hi@a.io"]);
    }

    #[test]
    fn test_deobfuscate_concatenation() {
        let script = r#"var e = 'support' + '@' + 'acme.io'; var f = "ops" + "@" + "acme.io";"#;
        assert_eq!(
            find_emails(&deobfuscate(script)),
            vec!["support@acme.io", "ops@acme.io"]
        );
    }
}

//! HTML page parser
//!
//! This module turns one fetched document into everything the rest of the
//! pipeline wants to know about it:
//! - Email addresses (visible text, `mailto:` links, de-obfuscated scripts)
//! - Social profile links
//! - Whether the page looks like a contact page
//! - Content signals used by domain validation (text, links, contact anchors)
//!
//! Parsing is pure: no I/O, no shared state.

mod email;
mod forms;
mod social;

pub use email::{deobfuscate, find_emails, is_acceptable_email, is_placeholder, mailto_address};
pub use forms::{summarize_forms, FormSummary};
pub use social::{parse_social_link, SocialProfile};

use crate::url::same_root_domain;
use crate::EnrichError;
use scraper::{Html, Selector};
use url::Url;

/// Words in page text that signal a way to reach the owner
const CONTACT_TEXT_KEYWORDS: &[&str] = &[
    "contact",
    "get in touch",
    "reach us",
    "reach out",
    "send us a message",
    "message us",
    "write to us",
    "enquiry",
    "enquiries",
    "inquiry",
    "inquiries",
    "kontakt",
];

/// Words in anchor text or href that point at a contact-bearing page
const CONTACT_ANCHOR_KEYWORDS: &[&str] = &[
    "contact",
    "kontakt",
    "get in touch",
    "get-in-touch",
    "reach-us",
    "reach us",
    "write-for-us",
    "write for us",
    "advertise",
    "impressum",
    "enquir",
    "inquir",
];

/// Elements whose text is not visible content
const NON_VISIBLE: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Lower-cased, deduplicated addresses in order of discovery
    pub emails: Vec<String>,

    pub social_profiles: Vec<SocialProfile>,

    /// The page URL when the page looks like a contact page
    pub contact_forms: Vec<String>,

    pub is_likely_contact_page: bool,

    pub forms: FormSummary,

    /// Visible text with whitespace collapsed
    pub text: String,

    /// Characters of visible text
    pub text_length: usize,

    pub word_count: usize,

    /// Navigable `<a href>` links
    pub link_count: usize,

    /// Links that stay on the page's root domain
    pub internal_link_count: usize,

    /// Same-site links whose text or href suggests a contact page
    pub contact_anchors: Vec<Url>,
}

impl ParsedPage {
    /// True when the page offers any way to reach the owner
    pub fn has_contact_method(&self) -> bool {
        !self.emails.is_empty()
            || !self.contact_forms.is_empty()
            || !self.social_profiles.is_empty()
            || !self.contact_anchors.is_empty()
    }

    /// Visible characters per link; all text when there are no links
    pub fn text_per_link(&self) -> f64 {
        if self.link_count == 0 {
            self.text_length as f64
        } else {
            self.text_length as f64 / self.link_count as f64
        }
    }
}

/// Parses an HTML document fetched from `page_url`
///
/// # Arguments
///
/// * `html` - The document body
/// * `page_url` - Final URL of the page, used to resolve relative links
///
/// # Returns
///
/// * `Ok(ParsedPage)` - Everything found on the page
/// * `Err(EnrichError::HtmlParse)` - The body is empty or binary
pub fn parse_page(html: &str, page_url: &Url) -> Result<ParsedPage, EnrichError> {
    if html.trim().is_empty() {
        return Err(parse_error(page_url, "empty document"));
    }
    if looks_binary(html) {
        return Err(parse_error(page_url, "binary content"));
    }

    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let text = visible_text(&document);
    let scripts = inline_scripts(&document);

    let mut page = ParsedPage {
        title,
        text_length: text.chars().count(),
        word_count: text.split_whitespace().count(),
        ..ParsedPage::default()
    };

    // Emails: text, mailto, then de-obfuscated text and scripts
    let mut emails = find_emails(&text);
    let mut add_email = |email: String| {
        if !emails.contains(&email) {
            emails.push(email);
        }
    };

    let anchor_selector = selector("a[href]")?;
    for anchor in document.select(&anchor_selector) {
        let href = anchor.value().attr("href").unwrap_or("").trim();
        if let Some(email) = mailto_address(href) {
            add_email(email);
        }
    }
    for email in find_emails(&deobfuscate(&text)) {
        add_email(email);
    }
    for email in find_emails(&deobfuscate(&scripts)) {
        add_email(email);
    }
    page.emails = emails;

    // Links, social profiles and contact anchors
    for anchor in document.select(&anchor_selector) {
        let href = anchor.value().attr("href").unwrap_or("").trim();
        let link = match resolve_link(href, page_url) {
            Some(link) => link,
            None => continue,
        };

        page.link_count += 1;

        if let Some(profile) = parse_social_link(&link) {
            if !page.social_profiles.iter().any(|p| p.key() == profile.key()) {
                page.social_profiles.push(profile);
            }
            continue;
        }

        if !same_root_domain(&link, page_url) {
            continue;
        }
        page.internal_link_count += 1;

        let anchor_text = anchor.text().collect::<String>().to_lowercase();
        let href_lower = href.to_lowercase();
        let is_contact = CONTACT_ANCHOR_KEYWORDS
            .iter()
            .any(|k| anchor_text.contains(k) || href_lower.contains(k));

        if is_contact && !page.contact_anchors.contains(&link) {
            page.contact_anchors.push(link);
        }
    }

    // Contact page verdict
    page.forms = summarize_forms(&document);
    let lowered = text.to_lowercase();
    let has_contact_text = CONTACT_TEXT_KEYWORDS.iter().any(|k| lowered.contains(k));
    page.is_likely_contact_page =
        page.forms.has_qualifying_form() && (has_contact_text || page.forms.has_message_form);
    if page.is_likely_contact_page {
        page.contact_forms.push(page_url.to_string());
    }

    page.text = text;

    tracing::trace!(
        "Parsed {}: {} email(s), {} profile(s), contact page: {}",
        page_url,
        page.emails.len(),
        page.social_profiles.len(),
        page.is_likely_contact_page
    );

    Ok(page)
}

fn parse_error(url: &Url, message: &str) -> EnrichError {
    EnrichError::HtmlParse {
        url: url.to_string(),
        message: message.to_string(),
    }
}

fn selector(css: &str) -> Result<Selector, EnrichError> {
    Selector::parse(css).map_err(|e| EnrichError::HtmlParse {
        url: String::new(),
        message: format!("invalid selector {}: {:?}", css, e),
    })
}

/// NUL bytes or a high share of control characters
fn looks_binary(body: &str) -> bool {
    if body.contains('\0') {
        return true;
    }
    let sample: Vec<char> = body.chars().take(2048).collect();
    let control = sample
        .iter()
        .filter(|c| c.is_control() && !c.is_whitespace())
        .count();
    control * 10 > sample.len()
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Text nodes outside scripts, styles and the head, whitespace-collapsed
fn visible_text(document: &Html) -> String {
    let mut parts = Vec::new();

    for node in document.root_element().descendants() {
        let text = match node.value().as_text() {
            Some(text) => text,
            None => continue,
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .map_or(false, |el| NON_VISIBLE.contains(&el.name()))
        });
        if !hidden {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        }
    }

    parts.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Concatenated bodies of inline `<script>` elements
fn inline_scripts(document: &Html) -> String {
    let script_selector = match Selector::parse("script:not([src])") {
        Ok(selector) => selector,
        Err(_) => return String::new(),
    };
    document
        .select(&script_selector)
        .map(|s| s.text().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolves an href to an absolute HTTP(S) URL
///
/// Returns None for fragments, `javascript:`, `mailto:`, `tel:` and `data:`
/// links, and for anything that does not resolve.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.set_fragment(None);
    Some(absolute)
}

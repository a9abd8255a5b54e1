use crate::UrlError;
use std::net::IpAddr;
use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use outreach_enrich::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("https://sub.example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("sub.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Computes the registrable (root) domain of a hostname
///
/// Uses the Public Suffix List, so subdomains are stripped while suffixes such
/// as `.co.uk` or `github.io` are kept whole. IP addresses, single-label hosts
/// and bare suffixes are returned unchanged.
///
/// # Examples
///
/// ```
/// use outreach_enrich::url::root_domain;
///
/// assert_eq!(root_domain("a.example.com"), "example.com");
/// assert_eq!(root_domain("shop.example.co.uk"), "example.co.uk");
/// assert_eq!(root_domain("alice.github.io"), "alice.github.io");
/// assert_eq!(root_domain("127.0.0.1"), "127.0.0.1");
/// ```
pub fn root_domain(host: &str) -> String {
    let host = host.trim().trim_end_matches('.').to_lowercase();

    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if bare.parse::<IpAddr>().is_ok() {
        return host;
    }

    // Hosts that are themselves a public suffix, or single labels, have no
    // registrable part and key on the full host.
    match psl::domain_str(&host) {
        Some(domain) => domain.to_string(),
        None => host,
    }
}

/// Returns the root domain of a URL's host
pub fn root_domain_of(url: &Url) -> Option<String> {
    extract_domain(url).map(|d| root_domain(&d))
}

/// Checks whether two URLs share a root domain
pub fn same_root_domain(a: &Url, b: &Url) -> bool {
    match (root_domain_of(a), root_domain_of(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Parses operator input that may be a bare domain or a full URL
///
/// Bare domains get an `https://` homepage URL.
///
/// ```
/// use outreach_enrich::url::parse_target;
///
/// let url = parse_target("acme.test").unwrap();
/// assert_eq!(url.as_str(), "https://acme.test/");
/// ```
pub fn parse_target(input: &str) -> Result<Url, UrlError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(UrlError::MissingDomain);
    }

    let candidate = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{}/", input.trim_end_matches('/'))
    };

    let url = Url::parse(&candidate).map_err(|e| UrlError::Parse(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }
    Ok(url)
}

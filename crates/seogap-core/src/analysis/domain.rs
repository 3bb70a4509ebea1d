//! URL and host helpers used for ranking detection and competitor filtering.

use url::Url;

/// Parse `input`, assuming `https://` when no scheme is given.
pub fn parse_lenient(input: &str) -> Option<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    Url::parse(&with_scheme).ok().filter(|u| u.host_str().is_some())
}

/// Lowercased host with a single leading `www.` removed.
///
/// Subdomains are otherwise kept: `shop.example.com` and `example.com` are
/// different sites.
pub fn normalize_host(input: &str) -> Option<String> {
    let url = parse_lenient(input)?;
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    Some(host)
}

/// Whether two URLs point at the same site (scheme, path and `www.` ignored).
pub fn same_site(a: &str, b: &str) -> bool {
    match (normalize_host(a), normalize_host(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scheme_path_and_single_www() {
        assert_eq!(
            normalize_host("https://www.Example.com/pricing?x=1").as_deref(),
            Some("example.com")
        );
        assert_eq!(normalize_host("example.com").as_deref(), Some("example.com"));
        assert_eq!(
            normalize_host("http://www.www.example.com").as_deref(),
            Some("www.example.com")
        );
    }

    #[test]
    fn subdomains_are_distinct() {
        assert!(!same_site("https://shop.example.com", "https://example.com"));
        assert!(same_site("http://www.example.com/a", "https://example.com/b"));
        assert!(same_site("EXAMPLE.com", "https://www.example.com"));
    }

    #[test]
    fn unparseable_urls_never_match() {
        assert!(normalize_host("").is_none());
        assert!(normalize_host("http://").is_none());
        assert!(!same_site("not a url", "not a url"));
    }
}

//! Validation and sanitization of submitted analysis requests.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

const URL_MIN: usize = 5;
const URL_MAX: usize = 500;
const KEYWORD_MIN: usize = 2;
const KEYWORD_MAX: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid URL")]
    UrlLength,
    #[error("Invalid input after sanitization")]
    EmptyAfterSanitization,
    #[error("Invalid URL format")]
    UrlFormat,
    #[error("User ID required")]
    MissingUserId,
    #[error("Target keyword is required")]
    MissingKeyword,
    #[error("Keyword must be 2-100 characters")]
    KeywordLength,
}

/// A submission that passed validation, with normalized fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRequest {
    pub url: String,
    pub user_id: String,
    pub target_keyword: String,
}

/// Strip markup, add a scheme if missing, and require an http(s) URL whose
/// host looks like a public domain name.
pub fn sanitize_url(raw: &str) -> Result<String, ValidationError> {
    let len = raw.chars().count();
    if !(URL_MIN..=URL_MAX).contains(&len) {
        return Err(ValidationError::UrlLength);
    }
    let stripped = HTML_TAG.replace_all(raw, "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        return Err(ValidationError::EmptyAfterSanitization);
    }

    let candidate = if stripped.starts_with("http://") || stripped.starts_with("https://") {
        stripped.to_string()
    } else {
        format!("https://{stripped}")
    };
    let url = Url::parse(&candidate).map_err(|_| ValidationError::UrlFormat)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ValidationError::UrlFormat);
    }
    let host = url.host_str().ok_or(ValidationError::UrlFormat)?;
    match host.rsplit_once('.') {
        Some((name, tld)) if !name.is_empty() && tld.len() >= 2 => {}
        _ => return Err(ValidationError::UrlFormat),
    }
    Ok(url.to_string())
}

pub fn validate_keyword(raw: &str) -> Result<String, ValidationError> {
    let keyword = raw.trim();
    if keyword.is_empty() {
        return Err(ValidationError::MissingKeyword);
    }
    let len = keyword.chars().count();
    if !(KEYWORD_MIN..=KEYWORD_MAX).contains(&len) {
        return Err(ValidationError::KeywordLength);
    }
    Ok(keyword.to_string())
}

pub fn validate_request(
    url: &str,
    user_id: &str,
    target_keyword: &str,
) -> Result<ValidRequest, ValidationError> {
    let url = sanitize_url(url)?;
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(ValidationError::MissingUserId);
    }
    let target_keyword = validate_keyword(target_keyword)?;
    Ok(ValidRequest {
        url,
        user_id: user_id.to_string(),
        target_keyword,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_scheme_and_strips_tags() {
        assert_eq!(sanitize_url("example.com").unwrap(), "https://example.com/");
        assert_eq!(
            sanitize_url("<b>https://www.example.com/pricing</b>").unwrap(),
            "https://www.example.com/pricing"
        );
        assert_eq!(sanitize_url("http://acme.io/a?b=c").unwrap(), "http://acme.io/a?b=c");
    }

    #[test]
    fn rejects_bad_urls() {
        assert_eq!(sanitize_url("a.b"), Err(ValidationError::UrlLength));
        assert_eq!(
            sanitize_url(&format!("https://{}.com", "a".repeat(500))),
            Err(ValidationError::UrlLength)
        );
        assert_eq!(
            sanitize_url("<script></script>"),
            Err(ValidationError::EmptyAfterSanitization)
        );
        assert_eq!(sanitize_url("localhost"), Err(ValidationError::UrlFormat));
        assert_eq!(sanitize_url("https://example.c"), Err(ValidationError::UrlFormat));
        assert_eq!(sanitize_url("ftp://example.com"), Err(ValidationError::UrlFormat));
    }

    #[test]
    fn keyword_bounds() {
        assert_eq!(validate_keyword("  crm  ").unwrap(), "crm");
        assert_eq!(validate_keyword("   "), Err(ValidationError::MissingKeyword));
        assert_eq!(validate_keyword(" a "), Err(ValidationError::KeywordLength));
        assert_eq!(
            validate_keyword(&"k".repeat(101)),
            Err(ValidationError::KeywordLength)
        );
        assert!(validate_keyword(&"k".repeat(100)).is_ok());
    }

    #[test]
    fn full_request() {
        let req = validate_request("acme.com", " user-1 ", "project management").unwrap();
        assert_eq!(req.url, "https://acme.com/");
        assert_eq!(req.user_id, "user-1");
        assert_eq!(
            validate_request("acme.com", "", "crm"),
            Err(ValidationError::MissingUserId)
        );
        assert_eq!(
            validate_request("acme.com", "u", "").unwrap_err().to_string(),
            "Target keyword is required"
        );
    }
}

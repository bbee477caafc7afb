use once_cell::sync::Lazy;
use regex::Regex;

static SLASH_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"/{2,}").expect("valid regex"));

/// Whether the string parses as an absolute URL.
pub fn is_valid_url(url: &str) -> bool {
    ::url::Url::parse(url).is_ok()
}

/// Collapse duplicated slashes in the part of a URL after the scheme.
///
/// Returns `None` for anything that is not an absolute URL, so callers can
/// treat a bad configured domain as a configuration error.
pub fn format_url(url: &str) -> Option<String> {
    if !is_valid_url(url) {
        return None;
    }

    match url.split_once("://") {
        Some((scheme, rest)) => Some(format!("{}://{}", scheme, SLASH_RUNS.replace_all(rest, "/"))),
        // Scheme-only URLs such as `mailto:` have no authority to clean up
        None => Some(url.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_url_collapses_slashes() {
        assert_eq!(format_url("http://a.com//b///c").as_deref(), Some("http://a.com/b/c"));
        assert_eq!(
            format_url("https://svc.internal:8080//hook//event").as_deref(),
            Some("https://svc.internal:8080/hook/event")
        );
    }

    #[test]
    fn test_format_url_keeps_clean_url() {
        assert_eq!(
            format_url("http://localhost:3000/health-check").as_deref(),
            Some("http://localhost:3000/health-check")
        );
    }

    #[test]
    fn test_format_url_rejects_invalid() {
        assert_eq!(format_url("not a url"), None);
        assert_eq!(format_url("/relative/path"), None);
        assert_eq!(format_url(""), None);
    }
}

use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap};

/// Pick the response language from `Accept-Language`. English wins when
/// present, then Vietnamese; anything else falls back to Vietnamese.
pub fn accept_language(headers: &HeaderMap) -> &'static str {
    let value = headers
        .get(ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if value.contains("en") {
        "en"
    } else {
        "vi"
    }
}

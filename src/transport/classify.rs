//! Response classification for the IMF service.
//!
//! The service rarely signals failure through clean status codes: overload
//! rejections, oversized queries and unknown datasets all come back as HTML or
//! XML bodies, sometimes with status 200. Every response is classified here
//! before a JSON decode is attempted.

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum length of a body excerpt included in error messages
pub const MAX_EXCERPT_LEN: usize = 300;

/// Body markers the service uses when it sheds load
const OVERLOAD_MARKERS: &[&str] = &[
    "Rejected",
    "Bandwidth",
    "temporarily unavailable",
    "Service Unavailable",
];

/// Body markers for queries the service refuses to evaluate
const QUERY_TOO_LARGE_MARKERS: &[&str] = &["Too many parameters", "too complex"];

static INNER_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<[^>]+>(.*?)</[^>]+>")
        .unwrap_or_else(|e| panic!("FATAL: invalid inner-text pattern: {e}"))
});

static ANY_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").unwrap_or_else(|e| panic!("FATAL: invalid tag pattern: {e}")));

static GKEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*GKey\s*=\s*[a-fA-F0-9-]+")
        .unwrap_or_else(|e| panic!("FATAL: invalid GKey pattern: {e}"))
});

/// Classification of a raw HTTP response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// Plausible JSON payload; still has to decode
    Success,
    /// Server shed load (bandwidth rejection, 429, 502-504)
    Overloaded,
    /// HTTP 400 or a body saying the query is too large
    QueryTooLarge,
    /// HTTP 500, typically a malformed query
    MissingParameter,
    /// Any other error page or non-success status
    ApiError,
}

impl ResponseClass {
    /// User-facing description used in log and error messages
    pub fn description(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Overloaded => "server overloaded",
            Self::QueryTooLarge => "query too large",
            Self::MissingParameter => "malformed query",
            Self::ApiError => "API error",
        }
    }

    /// Remediation hint appended to terminal failures
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Success => "",
            Self::Overloaded => {
                "API may be overwhelmed by too many requests. Take a break and try again."
            }
            Self::QueryTooLarge => {
                "Too many parameters supplied. Please narrow your request by filtering on fewer codes or a shorter period."
            }
            Self::MissingParameter => {
                "The API could not evaluate the query. Check that all required parameters are supplied and valid."
            }
            Self::ApiError => "Check the request and try again.",
        }
    }

    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Overloaded)
    }
}

/// Whether a body is an HTML/XML page rather than JSON
///
/// Only the start of the body counts. Error pages (`<!DOCTYPE`, `<html`,
/// `<?xml`, `<string xmlns=...>`) all open with a tag, while a JSON document
/// opens with `{` or `[` whatever its string values contain.
pub fn contains_markup(body: &str) -> bool {
    body.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
        .starts_with('<')
}

/// Classify a response by status code and body
///
/// Body markers are only consulted for markup bodies, so a JSON payload that
/// mentions "Rejected" or embeds `<html>` in a string value stays a success.
pub fn classify(status: u16, body: &str) -> ResponseClass {
    let markup = contains_markup(body);

    if matches!(status, 429 | 502 | 503 | 504)
        || (markup && OVERLOAD_MARKERS.iter().any(|m| body.contains(m)))
    {
        return ResponseClass::Overloaded;
    }

    if status == 400 || (markup && QUERY_TOO_LARGE_MARKERS.iter().any(|m| body.contains(m))) {
        return ResponseClass::QueryTooLarge;
    }

    if status == 500 {
        return ResponseClass::MissingParameter;
    }

    if markup || !(200..300).contains(&status) {
        return ResponseClass::ApiError;
    }

    ResponseClass::Success
}

/// Extract a readable excerpt from an error body
///
/// Takes the inner text of the first element, drops `GKey = ...` tokens,
/// collapses whitespace and truncates to [`MAX_EXCERPT_LEN`] characters.
pub fn strip_markup(body: &str) -> String {
    let inner = INNER_TEXT
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| ANY_TAG.replace_all(m.as_str(), " ").into_owned())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| ANY_TAG.replace_all(body, " ").into_owned());

    let without_key = GKEY.replace_all(&inner, "");
    let collapsed = without_key.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() > MAX_EXCERPT_LEN {
        let mut truncated: String = collapsed.chars().take(MAX_EXCERPT_LEN).collect();
        truncated.push_str("...");
        truncated
    } else {
        collapsed
    }
}

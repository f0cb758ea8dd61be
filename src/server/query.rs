//! Query-string handling for the API routes.
//!
//! Raw query text is first cut at any trailing protocol marker (`" HTTP/1.1"`)
//! and bounded to `MAX_QUERY_LEN` bytes, then decoded with
//! `application/x-www-form-urlencoded` rules. When a key repeats, the first
//! value wins.

// Author: kelexine (https://github.com/kelexine)

use crate::error::{RelayError, Result};
use crate::oauth::AuthorizationCapture;
use crate::sheets::Submission;
use url::form_urlencoded;

/// Upper bound on the query bytes that are kept.
pub const MAX_QUERY_LEN: usize = 1024;

/// Numbers shorter than this get a plausibility warning.
pub const MIN_NUMBER_DIGITS: usize = 9;

/// Appended to the success body; starts with a newline so the frontend can
/// tell it apart from the name/number fields.
pub const SHORT_NUMBER_WARNING: &str = "\nNumber is invalid or less than 9 digits";

const PROTOCOL_MARKER: &str = " HTTP";

/// Strip a trailing protocol marker and bound the copy to `MAX_QUERY_LEN`.
pub fn clean_query(raw: &str) -> String {
    let without_marker = match raw.find(PROTOCOL_MARKER) {
        Some(pos) => &raw[..pos],
        None => raw,
    };

    let mut end = without_marker.len().min(MAX_QUERY_LEN);
    while !without_marker.is_char_boundary(end) {
        end -= 1;
    }

    without_marker[..end].to_string()
}

/// First decoded value of `key`.
pub fn first_value(query: &str, key: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// A submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubmission {
    pub submission: Submission,
    pub warning: Option<&'static str>,
}

impl ValidatedSubmission {
    /// `success\n<name>\n<number>[<warning>]`
    pub fn body(&self) -> String {
        format!(
            "success\n{}\n{}{}",
            self.submission.name,
            self.submission.number,
            self.warning.unwrap_or("")
        )
    }
}

/// Validate `name` and `number` from the raw query.
///
/// On failure the error message names the failing field(s) and echoes the
/// cleaned query, or `(none)` when the request had no query at all.
pub fn validate_submission(raw_query: Option<&str>) -> Result<ValidatedSubmission> {
    let query = raw_query.map(clean_query);
    let text = query.as_deref().unwrap_or("");

    // The reply is newline-delimited, so a name may not carry control characters
    let name = first_value(text, "name")
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty() && !n.chars().any(char::is_control));
    let number = first_value(text, "number")
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));

    let echoed = query.as_deref().unwrap_or("(none)");
    match (name, number) {
        (Some(name), Some(number)) => {
            let warning = (number.len() < MIN_NUMBER_DIGITS).then_some(SHORT_NUMBER_WARNING);
            Ok(ValidatedSubmission {
                submission: Submission { name, number },
                warning,
            })
        }
        (None, Some(_)) => Err(RelayError::RequestValidation(format!(
            "Invalid name (query {})\n",
            echoed
        ))),
        (Some(_), None) => Err(RelayError::RequestValidation(format!(
            "Invalid number (query {})\n",
            echoed
        ))),
        (None, None) => Err(RelayError::RequestValidation(format!(
            "Invalid name and number (query {})\n",
            echoed
        ))),
    }
}

/// Pull `code`, `state` and `error` out of the OAuth redirect query.
pub fn parse_capture(raw_query: Option<&str>) -> AuthorizationCapture {
    let query = raw_query.map(clean_query).unwrap_or_default();
    AuthorizationCapture {
        code: first_value(&query, "code"),
        state: first_value(&query, "state"),
        error: first_value(&query, "error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_marker_stripped() {
        assert_eq!(
            clean_query("name=Bob&number=123456789 HTTP/1.1"),
            "name=Bob&number=123456789"
        );
        assert_eq!(clean_query("name=Bob"), "name=Bob");
    }

    #[test]
    fn test_marker_query_validates() {
        let valid = validate_submission(Some("name=Bob&number=123456789 HTTP/1.1")).unwrap();
        assert_eq!(valid.submission.name, "Bob");
        assert_eq!(valid.submission.number, "123456789");
        assert_eq!(valid.body(), "success\nBob\n123456789");
    }

    #[test]
    fn test_long_query_bounded() {
        let raw = format!("name={}&number=123456789", "a".repeat(5000));
        assert_eq!(clean_query(&raw).len(), MAX_QUERY_LEN);
    }

    #[test]
    fn test_bound_respects_char_boundaries() {
        let raw = format!("n={}", "é".repeat(1000));
        let cleaned = clean_query(&raw);
        assert!(cleaned.len() <= MAX_QUERY_LEN);
        assert!(cleaned.len() >= MAX_QUERY_LEN - 1);
    }

    #[test]
    fn test_name_is_url_decoded() {
        let valid = validate_submission(Some("name=Ann+Marie%20O%27Neil&number=5551234567")).unwrap();
        assert_eq!(valid.submission.name, "Ann Marie O'Neil");
        assert!(valid.warning.is_none());
    }

    #[test]
    fn test_short_number_warns() {
        let valid = validate_submission(Some("name=Bob&number=12345")).unwrap();
        assert_eq!(valid.warning, Some(SHORT_NUMBER_WARNING));
        assert_eq!(
            valid.body(),
            "success\nBob\n12345\nNumber is invalid or less than 9 digits"
        );
    }

    #[test]
    fn test_field_errors() {
        let err = validate_submission(Some("number=123456789")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid name (query number=123456789)\n");

        let err = validate_submission(Some("name=Bob")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid number (query name=Bob)\n");

        let err = validate_submission(Some("name=&number=")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid name and number (query name=&number=)\n");

        let err = validate_submission(None).unwrap_err();
        assert_eq!(err.to_string(), "Invalid name and number (query (none))\n");
    }

    #[test]
    fn test_name_with_line_break_rejected() {
        let err = validate_submission(Some("name=Bob%0Aevil&number=123456789")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid name (query name=Bob%0Aevil&number=123456789)\n"
        );

        let err = validate_submission(Some("name=Bob%0D%09x&number=123456789")).unwrap_err();
        assert!(err.to_string().starts_with("Invalid name"));
    }

    #[test]
    fn test_non_digit_number_rejected() {
        let err = validate_submission(Some("name=Bob&number=555-1234")).unwrap_err();
        assert!(err.to_string().starts_with("Invalid number"));
    }

    #[test]
    fn test_first_value_wins() {
        assert_eq!(first_value("code=a&code=b", "code").as_deref(), Some("a"));
        assert_eq!(first_value("code=a", "state"), None);
    }

    #[test]
    fn test_parse_capture() {
        let capture = parse_capture(Some("state=xyz&code=4%2F0AbC&scope=openid HTTP/1.1"));
        assert_eq!(capture.code.as_deref(), Some("4/0AbC"));
        assert_eq!(capture.state.as_deref(), Some("xyz"));
        assert!(capture.error.is_none());

        let denied = parse_capture(Some("error=access_denied&state=xyz"));
        assert_eq!(denied.error.as_deref(), Some("access_denied"));
    }
}

//! Structured logging and secret redaction.
//!
//! This module configures the `tracing` ecosystem for the relay and provides
//! helpers that keep Google tokens out of log sinks. Raw token-endpoint bodies
//! are logged on failure, so everything passing through `sanitize` has its
//! access and refresh tokens replaced.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::LoggingConfig;
use crate::error::{RelayError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global tracing subscriber for the application.
///
/// Supported formats:
/// - `json`: Structured JSON logs for production ingestion.
/// - `compact`: Single-line human-readable output.
/// - `pretty` (default): Multi-line, colorized output for development.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| RelayError::Config(format!("Invalid logging.level: {}", e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };

    result.map_err(|e| RelayError::Internal(format!("Failed to install logger: {}", e)))
}

/// Sanitizes sensitive information from log messages.
///
/// Google access tokens (`ya29.`) and refresh tokens (`1//0`) are replaced
/// with placeholders, every occurrence.
pub fn sanitize(input: &str) -> String {
    let redacted = redact_pattern(input, "ya29.", "[REDACTED_ACCESS_TOKEN]");
    redact_pattern(&redacted, "1//0", "[REDACTED_REFRESH_TOKEN]")
}

fn redact_pattern(input: &str, pattern: &str, placeholder: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find(pattern) {
        result.push_str(&rest[..start]);
        result.push_str(placeholder);

        let token = &rest[start..];
        let end = token
            .find(|c: char| c.is_whitespace() || c == '"' || c == '\'' || c == ',' || c == '&')
            .unwrap_or(token.len());
        rest = &token[end..];
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_access_token() {
        let input = "Authorization: Bearer ya29.a0AfH6SMC...";
        let output = sanitize(input);
        assert!(output.contains("[REDACTED_ACCESS_TOKEN]"));
        assert!(!output.contains("ya29.a0AfH6SMC"));
    }

    #[test]
    fn test_sanitize_refresh_token_in_json() {
        let input = r#"{"access_token":"ya29.one","refresh_token":"1//01S6LICZta2ee","expires_in":3599}"#;
        let output = sanitize(input);
        assert_eq!(
            output,
            r#"{"access_token":"[REDACTED_ACCESS_TOKEN]","refresh_token":"[REDACTED_REFRESH_TOKEN]","expires_in":3599}"#
        );
    }

    #[test]
    fn test_sanitize_every_occurrence() {
        let output = sanitize("ya29.a ya29.b");
        assert_eq!(output, "[REDACTED_ACCESS_TOKEN] [REDACTED_ACCESS_TOKEN]");
    }
}

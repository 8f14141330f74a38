//! Error types for the WeCom admin client.
//!
//! This module defines `WeComError`, the unified error type used throughout
//! the crate. Remote rejections (a well-formed envelope with a non-zero
//! `errcode`) are deliberately *not* errors: they come back as
//! [`ApiReply`](crate::models::ApiReply) values with `success == false`.
//!
//! # Security
//!
//! The corp secret and the access token travel in query strings, so every
//! message built from an external source must pass through
//! [`WeComError::sanitize_message`] before it is logged or returned.

use std::time::Duration;
use thiserror::Error;

/// WeCom error codes the client treats specially.
pub mod codes {
    /// Success response.
    pub const SUCCESS: i64 = 0;
    /// Corp id / corp secret pair rejected by `/gettoken`.
    pub const INVALID_CREDENTIAL: i64 = 40001;
    /// Access token is not valid.
    pub const INVALID_ACCESS_TOKEN: i64 = 40014;
    /// Tag id does not exist.
    pub const INVALID_TAG_ID: i64 = 40068;
    /// Access token missing from the request.
    pub const ACCESS_TOKEN_MISSING: i64 = 41001;
    /// Access token expired (tokens live for 7200 seconds).
    pub const ACCESS_TOKEN_EXPIRED: i64 = 42001;
    /// Department does not exist.
    pub const DEPARTMENT_NOT_FOUND: i64 = 60003;
    /// User does not exist.
    pub const USER_NOT_FOUND: i64 = 60111;

    /// Returns true for codes meaning the session token is unusable.
    pub fn is_token_error(code: i64) -> bool {
        matches!(
            code,
            INVALID_ACCESS_TOKEN | ACCESS_TOKEN_MISSING | ACCESS_TOKEN_EXPIRED
        )
    }
}

/// Unified error type for all WeCom client operations.
#[derive(Error, Debug)]
pub enum WeComError {
    /// Configuration error - missing or invalid environment variables.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP client initialization failed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The request never produced a response (connect, TLS, read failure).
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Request timed out.
    #[error("request timed out after {duration:?} ({operation})")]
    Timeout {
        /// How long we waited before timing out.
        duration: Duration,
        /// The operation that timed out.
        operation: String,
    },

    /// HTTP response returned a non-success status code without an envelope.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// The HTTP status code returned.
        status: reqwest::StatusCode,
        /// The (sanitized, truncated) response body.
        body: String,
    },

    /// The response body could not be parsed as JSON.
    #[error("unparseable response body for {operation}: {source}")]
    InvalidBody {
        /// The operation whose response was malformed.
        operation: String,
        /// The underlying parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// Token acquisition failed, or the token was rejected mid-session.
    ///
    /// There is no refresh path: build a new client.
    #[error("authentication failed (errcode {code}): {message}")]
    Authentication {
        /// Vendor error code, or -1 when no code was returned.
        code: i64,
        /// Vendor error message.
        message: String,
    },

    /// Input failed local validation; nothing was sent.
    #[error("validation error: {0}")]
    Validation(String),

    /// JSON serialization or typed decoding failed.
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WeComError {
    /// Creates a configuration error for a missing environment variable.
    pub fn missing_env(var_name: &str) -> Self {
        WeComError::Config(format!(
            "missing required environment variable: {}",
            var_name
        ))
    }

    /// Creates a configuration error for an invalid value.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        WeComError::Config(message.into())
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        WeComError::Validation(message.into())
    }

    /// Creates a timeout error.
    pub fn timeout(duration: Duration, operation: impl Into<String>) -> Self {
        WeComError::Timeout {
            duration,
            operation: operation.into(),
        }
    }

    /// Creates an authentication error.
    pub fn authentication(code: i64, message: impl Into<String>) -> Self {
        WeComError::Authentication {
            code,
            message: message.into(),
        }
    }

    /// Classifies a reqwest send/read failure.
    ///
    /// The URL is stripped because it carries the access token or corp secret.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration, operation: &str) -> Self {
        if err.is_timeout() {
            return WeComError::timeout(timeout, operation);
        }
        WeComError::Transport(err.without_url())
    }

    /// Returns true if the failure happened below the vendor envelope.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            WeComError::Transport(_)
                | WeComError::Timeout { .. }
                | WeComError::HttpStatus { .. }
                | WeComError::InvalidBody { .. }
        )
    }

    /// Returns true if the caller has to rebuild the client.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, WeComError::Authentication { .. })
    }

    /// Sanitizes a message by replacing every occurrence of `secret`.
    ///
    /// # Returns
    ///
    /// The message with any occurrence of the secret replaced with `[REDACTED]`
    #[must_use]
    pub fn sanitize_message(message: &str, secret: &str) -> String {
        if secret.is_empty() {
            return message.to_string();
        }
        message.replace(secret, "[REDACTED]")
    }

    /// Display text with every listed secret redacted.
    #[must_use]
    pub fn sanitized_display(&self, secrets: &[&str]) -> String {
        secrets
            .iter()
            .fold(self.to_string(), |message, secret| {
                Self::sanitize_message(&message, secret)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_error() {
        let err = WeComError::missing_env("WECOM_CORP_SECRET");
        assert!(err.to_string().contains("WECOM_CORP_SECRET"));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_validation_error() {
        let err = WeComError::validation("name is required");
        assert_eq!(err.to_string(), "validation error: name is required");
    }

    #[test]
    fn test_timeout_error() {
        let err = WeComError::timeout(Duration::from_secs(30), "GET /department/list");
        let msg = err.to_string();
        assert!(msg.contains("timed out"));
        assert!(msg.contains("30s"));
        assert!(err.is_transport());
    }

    #[test]
    fn test_authentication_error() {
        let err = WeComError::authentication(codes::ACCESS_TOKEN_EXPIRED, "access_token expired");
        assert!(err.is_authentication());
        assert!(!err.is_transport());
        assert!(err.to_string().contains("42001"));
    }

    #[test]
    fn test_http_status_is_transport() {
        let err = WeComError::HttpStatus {
            status: reqwest::StatusCode::BAD_GATEWAY,
            body: "<html>".to_string(),
        };
        assert!(err.is_transport());
    }

    #[test]
    fn test_validation_is_not_transport() {
        assert!(!WeComError::validation("bad").is_transport());
    }

    #[test]
    fn test_token_error_codes() {
        assert!(codes::is_token_error(40014));
        assert!(codes::is_token_error(41001));
        assert!(codes::is_token_error(42001));
        assert!(!codes::is_token_error(codes::SUCCESS));
        assert!(!codes::is_token_error(codes::USER_NOT_FOUND));
    }

    #[test]
    fn test_sanitize_message_removes_secret() {
        let secret = "super_secret_value_12345";
        let message = format!("GET /gettoken?corpsecret={} failed", secret);
        let sanitized = WeComError::sanitize_message(&message, secret);
        assert!(!sanitized.contains(secret));
        assert!(sanitized.contains("[REDACTED]"));
    }

    #[test]
    fn test_sanitize_message_empty_secret() {
        let message = "Some error message";
        assert_eq!(WeComError::sanitize_message(message, ""), message);
    }

    #[test]
    fn test_sanitized_display_redacts_all() {
        let err = WeComError::validation("token TOK and secret SEC");
        let shown = err.sanitized_display(&["TOK", "SEC"]);
        assert_eq!(shown, "validation error: token [REDACTED] and secret [REDACTED]");
    }
}

// ── Core error types ──
//
// User-facing errors from hconnect-core. Consumers never see reqwest
// errors or JSON parse failures directly; the `From<hconnect_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach Home Connect at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request to Home Connect timed out")]
    Timeout,

    #[error("Rate limited by Home Connect -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // ── Registry errors ──────────────────────────────────────────────
    #[error("Account not found: {id}")]
    AccountNotFound { id: String },

    #[error("Account already set up: {id}")]
    AccountExists { id: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Platform {category} failed: {message}")]
    Platform { category: String, message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// Home Connect error key (e.g. `SDK.Error.UnsupportedCommand`).
        key: Option<String>,
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// HTTP status of the underlying API failure, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => *status,
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<hconnect_api::Error> for CoreError {
    fn from(err: hconnect_api::Error) -> Self {
        match err {
            hconnect_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            hconnect_api::Error::TokenRefresh { status, message } => {
                CoreError::AuthenticationFailed {
                    message: format!("token refresh rejected (HTTP {status}): {message}"),
                }
            }
            hconnect_api::Error::TokenExpired => CoreError::AuthenticationFailed {
                message: "access token expired -- link the account again".into(),
            },
            hconnect_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        key: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            hconnect_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            hconnect_api::Error::InvalidPathSegment { segment } => CoreError::Validation {
                message: format!("'{segment}' is not a valid key"),
            },
            hconnect_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            hconnect_api::Error::RateLimited { retry_after_secs } => {
                CoreError::RateLimited { retry_after_secs }
            }
            hconnect_api::Error::Api {
                status,
                key,
                description,
            } => CoreError::Api {
                message: description,
                key,
                status: Some(status),
            },
            hconnect_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn api_error_keeps_status_and_key() {
        let err = CoreError::from(hconnect_api::Error::Api {
            status: 409,
            key: Some("SDK.Error.UnsupportedCommand".into()),
            description: "not now".into(),
        });
        assert_eq!(err.status(), Some(409));
        assert!(matches!(err, CoreError::Api { key: Some(ref k), .. } if k == "SDK.Error.UnsupportedCommand"));
    }

    #[test]
    fn expired_token_is_authentication_failure() {
        let err = CoreError::from(hconnect_api::Error::TokenExpired);
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    }
}

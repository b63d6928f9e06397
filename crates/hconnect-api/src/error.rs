use thiserror::Error;

/// Top-level error type for the `hconnect-api` crate.
///
/// Covers every failure mode of the Home Connect REST surface:
/// OAuth2 token handling, transport, and structured API errors.
/// `hconnect-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The API rejected the access token (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The token endpoint refused a code exchange or refresh.
    #[error("Token request failed (HTTP {status}): {message}")]
    TokenRefresh { status: u16, message: String },

    /// The stored token has expired and carries no refresh token.
    #[error("Access token expired and no refresh token is available")]
    TokenExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A key or appliance id that cannot stand as one URL path segment.
    #[error("Invalid path segment: {segment:?}")]
    InvalidPathSegment { segment: String },

    /// TLS configuration error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Non-2xx response, parsed from the `{"error": {key, description}}` body when present.
    #[error("Home Connect API error (HTTP {status}): {description}")]
    Api {
        status: u16,
        key: Option<String>,
        description: String,
    },

    /// Too many requests. Includes retry-after in seconds.
    #[error("Rate limited -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// HTTP status code associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { .. } => Some(401),
            Self::TokenRefresh { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if re-authorizing the account might resolve this error.
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::TokenExpired | Self::TokenRefresh { .. }
        )
    }

    /// Returns `true` if this is a transient error worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// The API error key (e.g. `SDK.Error.NoProgramActive`), if available.
    pub fn api_error_key(&self) -> Option<&str> {
        match self {
            Self::Api { key, .. } => key.as_deref(),
            _ => None,
        }
    }
}

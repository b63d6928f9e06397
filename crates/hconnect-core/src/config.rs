// ── Runtime account configuration ──
//
// These types describe *which* accounts to load and how to reach the
// cloud. They carry token data and tuning, but never touch disk: the
// CLI (or any other embedding application) builds them and hands them in.

use std::time::Duration;

use hconnect_api::{API_URL, Token, TransportConfig};
use url::Url;

use crate::error::CoreError;

/// Default interval between poll cycles for one account.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(60);

/// Process-wide settings for a [`Hub`](crate::Hub).
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Minimum time between two poll cycles of the same account.
    pub scan_interval: Duration,
    /// TLS and timeout settings shared by every account's HTTP client.
    pub transport: TransportConfig,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            scan_interval: DEFAULT_SCAN_INTERVAL,
            transport: TransportConfig::default(),
        }
    }
}

/// One linked Home Connect account.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Stable account identifier (registry key).
    pub id: String,
    /// Human-readable label.
    pub title: String,
    /// Name of the registered OAuth2 implementation used to refresh the
    /// token. `None` uses the token as-is until it expires.
    pub implementation: Option<String>,
    pub token: Token,
    /// API root; the production cloud unless overridden.
    pub api_url: Url,
}

impl AccountConfig {
    /// An account against the production cloud.
    pub fn new(
        id: impl Into<String>,
        token: Token,
        implementation: Option<String>,
    ) -> Result<Self, CoreError> {
        let id = id.into();
        let api_url = Url::parse(API_URL).map_err(|e| CoreError::Config {
            message: format!("Invalid URL: {e}"),
        })?;
        Ok(Self {
            title: id.clone(),
            id,
            implementation,
            token,
            api_url,
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_api_url(mut self, api_url: Url) -> Self {
        self.api_url = api_url;
        self
    }
}

//! Shared configuration for hconnect.
//!
//! TOML config with environment overrides, OAuth client credential
//! resolution (env + keyring + plaintext), token persistence, and
//! translation to `hconnect_core::{HubConfig, AccountConfig}`.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use hconnect_api::{API_URL, OAuthApp, SIMULATOR_URL, TlsMode, Token, TransportConfig};
use hconnect_core::{AccountConfig, HubConfig};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Name the configured OAuth2 client is registered under.
pub const IMPLEMENTATION_NAME: &str = "hconnect";

const KEYRING_SERVICE: &str = "hconnect";
const KEYRING_CLIENT_SECRET: &str = "oauth/client-secret";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no OAuth client secret configured")]
    NoClientSecret,

    #[error("no stored token for account '{account}' -- run `hconnect auth login`")]
    NoToken { account: String },

    #[error("unknown account '{account}'")]
    UnknownAccount { account: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    /// OAuth2 client registered as the `hconnect` implementation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OAuthConfig>,

    /// Linked accounts, keyed by account id.
    #[serde(default)]
    pub accounts: BTreeMap<String, AccountEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// API root (production cloud or simulator).
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Talk to the vendor simulator instead of `api_url`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub simulator: bool,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds between poll cycles.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,

    /// Extra CA certificate to trust.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            simulator: false,
            timeout: default_timeout(),
            scan_interval: default_scan_interval(),
            ca_cert: None,
        }
    }
}

impl Defaults {
    /// API root every account uses unless it sets its own.
    pub fn base_url(&self) -> &str {
        if self.simulator {
            SIMULATOR_URL
        } else {
            &self.api_url
        }
    }
}

fn default_api_url() -> String {
    API_URL.into()
}
fn default_timeout() -> u64 {
    30
}
fn default_scan_interval() -> u64 {
    60
}
fn default_redirect_uri() -> String {
    "http://localhost:8080/callback".into()
}

/// `[oauth]` table.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct OAuthConfig {
    pub client_id: Option<String>,

    /// Client secret (plaintext -- prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Environment variable holding the client secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret_env: Option<String>,

    /// Redirect URI registered with the developer portal.
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

/// `[accounts.<id>]` table.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct AccountEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// OAuth2 implementation used to refresh the token; defaults to the
    /// `[oauth]` client when one is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,

    /// Per-account API root override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

// ── Paths ───────────────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "hconnect", "hconnect").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("hconnect");
    p
}

/// `tokens.toml` beside the given config file.
pub fn tokens_path(config_path: &Path) -> PathBuf {
    config_path.with_file_name("tokens.toml")
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the canonical path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load defaults, then `path` (if it exists), then `HCONNECT_*` variables
/// (`HCONNECT_DEFAULTS__TIMEOUT=10` sets `defaults.timeout`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("HCONNECT_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

impl Config {
    /// Reject an `[oauth]` table that names only half of the client.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.scan_interval == 0 {
            return Err(ConfigError::Validation {
                field: "defaults.scan_interval".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        let Some(oauth) = &self.oauth else {
            return Ok(());
        };
        let has_secret = oauth.client_secret.is_some() || oauth.client_secret_env.is_some();
        match (&oauth.client_id, has_secret) {
            (Some(_), true) | (None, false) => Ok(()),
            (Some(_), false) => Err(ConfigError::Validation {
                field: "oauth.client_secret".into(),
                reason: "required together with oauth.client_id".into(),
            }),
            (None, true) => Err(ConfigError::Validation {
                field: "oauth.client_id".into(),
                reason: "required together with oauth.client_secret".into(),
            }),
        }
    }

    pub fn account(&self, id: &str) -> Result<&AccountEntry, ConfigError> {
        self.accounts
            .get(id)
            .ok_or_else(|| ConfigError::UnknownAccount { account: id.into() })
    }

    fn api_url(&self, raw: &str) -> Result<Url, ConfigError> {
        raw.parse().map_err(|_| ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("invalid URL: {raw}"),
        })
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the OAuth client secret: env var, then keyring, then plaintext.
pub fn resolve_client_secret(oauth: &OAuthConfig) -> Result<SecretString, ConfigError> {
    // 1. client_secret_env → env var lookup
    if let Some(ref env_name) = oauth.client_secret_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, KEYRING_CLIENT_SECRET) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref secret) = oauth.client_secret {
        return Ok(SecretString::from(secret.clone()));
    }

    Err(ConfigError::NoClientSecret)
}

/// Store the OAuth client secret in the system keyring.
pub fn store_client_secret(secret: &SecretString) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, KEYRING_CLIENT_SECRET)?
        .set_password(secret.expose_secret())?;
    Ok(())
}

/// Build the configured OAuth2 client, if `[oauth]` names one.
///
/// Endpoints live under the configured API root, so the simulator works too.
pub fn oauth_app(cfg: &Config) -> Result<Option<OAuthApp>, ConfigError> {
    let Some(oauth) = &cfg.oauth else {
        return Ok(None);
    };
    let Some(client_id) = &oauth.client_id else {
        return Ok(None);
    };

    let secret = resolve_client_secret(oauth)?;
    let base = cfg.api_url(cfg.defaults.base_url())?;
    let endpoint = |path: &str| {
        base.join(path).map_err(|e| ConfigError::Validation {
            field: "defaults.api_url".into(),
            reason: e.to_string(),
        })
    };

    let app = OAuthApp::new(IMPLEMENTATION_NAME, client_id.clone(), secret)
        .map_err(|e| ConfigError::Validation {
            field: "oauth".into(),
            reason: e.to_string(),
        })?
        .with_endpoints(
            endpoint("security/oauth/authorize")?,
            endpoint("security/oauth/token")?,
        );
    Ok(Some(app))
}

// ── Translation to core configs ─────────────────────────────────────

/// Build the `HubConfig` from `[defaults]`. `timeout` overrides the
/// configured HTTP timeout when given.
pub fn hub_config(cfg: &Config, timeout: Option<u64>) -> HubConfig {
    let tls = cfg
        .defaults
        .ca_cert
        .clone()
        .map_or(TlsMode::System, TlsMode::CustomCa);
    HubConfig {
        scan_interval: Duration::from_secs(cfg.defaults.scan_interval),
        transport: TransportConfig {
            tls,
            timeout: Duration::from_secs(timeout.unwrap_or(cfg.defaults.timeout)),
        },
    }
}

/// Build the `AccountConfig` for `id` from its table and stored token.
pub fn account_config(
    cfg: &Config,
    id: &str,
    tokens: &TokenFile,
) -> Result<AccountConfig, ConfigError> {
    let entry = cfg.account(id)?;
    let token = tokens
        .get(id)
        .ok_or_else(|| ConfigError::NoToken { account: id.into() })?;

    let api_url = cfg.api_url(entry.api_url.as_deref().unwrap_or(cfg.defaults.base_url()))?;
    let implementation = entry.implementation.clone().or_else(|| {
        cfg.oauth
            .as_ref()
            .and_then(|o| o.client_id.as_ref())
            .map(|_| IMPLEMENTATION_NAME.to_owned())
    });

    Ok(AccountConfig {
        id: id.to_owned(),
        title: entry.title.clone().unwrap_or_else(|| id.to_owned()),
        implementation,
        token,
        api_url,
    })
}

// ── Token storage ───────────────────────────────────────────────────

/// Persisted token of one account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl From<&Token> for StoredToken {
    fn from(token: &Token) -> Self {
        Self {
            access_token: token.access_token.expose_secret().to_owned(),
            refresh_token: token
                .refresh_token
                .as_ref()
                .map(|t| t.expose_secret().to_owned()),
            expires_at: token.expires_at,
        }
    }
}

impl From<StoredToken> for Token {
    fn from(stored: StoredToken) -> Self {
        Token::new(
            SecretString::from(stored.access_token),
            stored.refresh_token.map(SecretString::from),
            stored.expires_at,
        )
    }
}

/// Contents of `tokens.toml`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TokenFile {
    #[serde(default)]
    pub tokens: BTreeMap<String, StoredToken>,
}

impl TokenFile {
    /// Read `path`; a missing file is an empty token set.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Write to `path`, readable by the owner only.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let body = toml::to_string_pretty(self)?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path)?;
        // `mode` only applies on creation; tighten files written by older builds.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(body.as_bytes())?;
        Ok(())
    }

    pub fn get(&self, account: &str) -> Option<Token> {
        self.tokens.get(account).cloned().map(Token::from)
    }

    pub fn insert(&mut self, account: impl Into<String>, token: &Token) {
        self.tokens.insert(account.into(), StoredToken::from(token));
    }

    pub fn remove(&mut self, account: &str) -> bool {
        self.tokens.remove(account).is_some()
    }
}

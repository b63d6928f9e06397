// OAuth2 plumbing for the Home Connect cloud.
//
// An `OAuthApp` is one registered client (id + secret + endpoints). A
// `TokenSource` owns the current token of a single account and refreshes
// it on demand, publishing every refreshed token on a `watch` channel so
// the embedding application can persist it.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::{Mutex, watch};
use tracing::debug;
use url::Url;

use crate::error::Error;

/// Authorization endpoint of the production Home Connect cloud.
pub const OAUTH2_AUTHORIZE: &str = "https://api.home-connect.com/security/oauth/authorize";

/// Token endpoint of the production Home Connect cloud.
pub const OAUTH2_TOKEN: &str = "https://api.home-connect.com/security/oauth/token";

/// Tokens expiring within this window are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 20;

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

// ── OAuthApp ─────────────────────────────────────────────────────────

/// A registered OAuth2 client ("implementation") for the Home Connect cloud.
#[derive(Debug, Clone)]
pub struct OAuthApp {
    /// Name accounts use to refer to this implementation.
    pub name: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub authorize_url: Url,
    pub token_url: Url,
}

impl OAuthApp {
    /// Create an implementation against the production endpoints.
    pub fn new(
        name: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> Result<Self, Error> {
        Ok(Self {
            name: name.into(),
            client_id: client_id.into(),
            client_secret,
            authorize_url: Url::parse(OAUTH2_AUTHORIZE)?,
            token_url: Url::parse(OAUTH2_TOKEN)?,
        })
    }

    /// Override the authorize and token endpoints (simulator, tests).
    pub fn with_endpoints(mut self, authorize_url: Url, token_url: Url) -> Self {
        self.authorize_url = authorize_url;
        self.token_url = token_url;
        self
    }

    /// Generate an opaque `state` value for an authorization request.
    pub fn new_state() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    /// URL the user opens to grant access.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> Url {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", state);
        url
    }

    /// Exchange an authorization code for a token.
    pub async fn exchange_code(
        &self,
        http: &reqwest::Client,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Token, Error> {
        debug!(client_id = %self.client_id, "exchanging authorization code");
        self.token_request(
            http,
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("client_id", &self.client_id),
                ("client_secret", self.client_secret.expose_secret()),
            ],
        )
        .await
    }

    /// Obtain a fresh access token from a refresh token.
    pub async fn refresh(
        &self,
        http: &reqwest::Client,
        refresh_token: &SecretString,
    ) -> Result<Token, Error> {
        debug!(client_id = %self.client_id, "refreshing access token");
        self.token_request(
            http,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.expose_secret()),
                ("client_id", &self.client_id),
                ("client_secret", self.client_secret.expose_secret()),
            ],
        )
        .await
    }

    async fn token_request(
        &self,
        http: &reqwest::Client,
        form: &[(&str, &str)],
    ) -> Result<Token, Error> {
        let resp = http.post(self.token_url.clone()).form(form).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(Error::TokenRefresh {
                status: status.as_u16(),
                message: body,
            });
        }

        let raw: TokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;

        Ok(raw.into_token(Utc::now()))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    /// A lifetime that does not fit a timestamp counts as the default one.
    fn into_token(self, now: DateTime<Utc>) -> Token {
        let expires_at = self
            .expires_in
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or_else(|| now + Duration::seconds(DEFAULT_EXPIRES_IN_SECS));
        Token {
            access_token: SecretString::from(self.access_token),
            refresh_token: self.refresh_token.map(SecretString::from),
            expires_at,
        }
    }
}

// ── Token ────────────────────────────────────────────────────────────

/// An OAuth2 bearer token for one account.
#[derive(Debug, Clone)]
pub struct Token {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    pub fn new(
        access_token: SecretString,
        refresh_token: Option<SecretString>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at,
        }
    }

    /// `true` if the token expires within the refresh margin of `now`.
    pub fn is_expiring(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) <= now
    }
}

// ── TokenSource ──────────────────────────────────────────────────────

/// Hands out valid access tokens for one account, refreshing as needed.
pub struct TokenSource {
    app: Option<OAuthApp>,
    http: reqwest::Client,
    token: watch::Sender<Token>,
    refresh_lock: Mutex<()>,
}

impl TokenSource {
    /// Build a token source around a pre-built HTTP client.
    ///
    /// Without an `app` the token is used as-is and never refreshed.
    pub fn with_client(app: Option<OAuthApp>, token: Token, http: reqwest::Client) -> Self {
        let (token, _) = watch::channel(token);
        Self {
            app,
            http,
            token,
            refresh_lock: Mutex::new(()),
        }
    }

    /// A token source for a static bearer token.
    pub fn fixed(access_token: SecretString) -> Self {
        let token = Token::new(access_token, None, DateTime::<Utc>::MAX_UTC);
        Self::with_client(None, token, reqwest::Client::new())
    }

    /// The current token (possibly expired).
    pub fn current(&self) -> Token {
        self.token.borrow().clone()
    }

    /// Subscribe to token replacements (for persisting refreshed tokens).
    pub fn subscribe(&self) -> watch::Receiver<Token> {
        self.token.subscribe()
    }

    /// Return a valid access token, refreshing it first if it is about to expire.
    pub async fn access_token(&self) -> Result<SecretString, Error> {
        let token = self.current();
        if !token.is_expiring(Utc::now()) {
            return Ok(token.access_token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited.
        let token = self.current();
        if !token.is_expiring(Utc::now()) {
            return Ok(token.access_token);
        }

        let app = self.app.as_ref().ok_or(Error::TokenExpired)?;
        let refresh_token = token.refresh_token.as_ref().ok_or(Error::TokenExpired)?;

        let mut fresh = app.refresh(&self.http, refresh_token).await?;
        if fresh.refresh_token.is_none() {
            fresh.refresh_token = token.refresh_token.clone();
        }

        let access = fresh.access_token.clone();
        self.token.send_replace(fresh);
        Ok(access)
    }
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSource")
            .field("app", &self.app.as_ref().map(|a| a.name.as_str()))
            .field("expires_at", &self.token.borrow().expires_at)
            .finish_non_exhaustive()
    }
}

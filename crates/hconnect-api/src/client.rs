// Home Connect HTTP client
//
// Wraps `reqwest::Client` with bearer-token injection, the vendor media
// type, `{ data }` envelope unwrapping, and error-body parsing. Endpoint
// groups (appliances, programs) live in sibling files as inherent methods.

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::auth::TokenSource;
use crate::error::Error;
use crate::models::{DataEnvelope, ErrorEnvelope};

/// Production API root.
pub const API_URL: &str = "https://api.home-connect.com";

/// Developer simulator API root.
pub const SIMULATOR_URL: &str = "https://simulator.home-connect.com";

const MEDIA_TYPE: &str = "application/vnd.bsh.sdk.v1+json";

/// Authenticated client for one Home Connect account.
///
/// Cheaply cloneable; every clone shares the HTTP connection pool and the
/// account's [`TokenSource`].
#[derive(Clone)]
pub struct HomeConnectClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<TokenSource>,
}

impl HomeConnectClient {
    /// Create a client around a pre-built `reqwest::Client`.
    ///
    /// `base_url` is the API root (e.g. [`API_URL`]); requests go to
    /// `api/...` below it.
    pub fn with_client(http: reqwest::Client, base_url: Url, tokens: Arc<TokenSource>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                tokens,
            }),
        }
    }

    /// The API root this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The account's token source.
    pub fn tokens(&self) -> &Arc<TokenSource> {
        &self.inner.tokens
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/api/{segments...}`.
    ///
    /// Each segment is percent-encoded on its own, so `/`, `?` and `#` in a
    /// key never change which resource is addressed.
    pub(crate) fn api_url(&self, segments: &[&str]) -> Result<Url, Error> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(Error::InvalidPathSegment {
                segment: (*bad).to_owned(),
            });
        }

        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and unwrap the `data` envelope.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let token = self.inner.tokens.access_token().await?;
        let resp = self
            .inner
            .http
            .get(url)
            .bearer_auth(token.expose_secret())
            .header(ACCEPT, MEDIA_TYPE)
            .send()
            .await?;

        let body = read_body(resp).await?;
        let envelope: DataEnvelope<T> =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;

        Ok(envelope.data)
    }

    /// Send a PUT request with `{"data": body}`. The response body is ignored.
    pub(crate) async fn put<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<(), Error> {
        debug!("PUT {}", url);

        let token = self.inner.tokens.access_token().await?;
        let resp = self
            .inner
            .http
            .put(url)
            .bearer_auth(token.expose_secret())
            .header(ACCEPT, MEDIA_TYPE)
            .header(CONTENT_TYPE, MEDIA_TYPE)
            .json(&DataEnvelope { data: body })
            .send()
            .await?;

        read_body(resp).await?;
        Ok(())
    }
}

impl std::fmt::Debug for HomeConnectClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HomeConnectClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Return the body of a 2xx response, or map the failure to an [`Error`].
async fn read_body(resp: reqwest::Response) -> Result<String, Error> {
    let status = resp.status();

    if status.is_success() {
        return Ok(resp.text().await?);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);
        return Err(Error::RateLimited { retry_after_secs });
    }

    let body = resp.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<ErrorEnvelope>(&body).ok();

    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: parsed
                .and_then(|e| e.error.description)
                .unwrap_or_else(|| "access token rejected".into()),
        });
    }

    let fallback = status
        .canonical_reason()
        .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_owned);

    Err(match parsed {
        Some(envelope) => Error::Api {
            status: status.as_u16(),
            description: envelope.error.description.unwrap_or(fallback),
            key: Some(envelope.error.key),
        },
        None => Error::Api {
            status: status.as_u16(),
            key: None,
            description: fallback,
        },
    })
}

// ── Hub: account lifecycle ──
//
// Owns the registry, the registered OAuth2 implementations and the
// background poll task. Sets up one `AccountSession` per account and
// forwards platform setup/teardown to the embedding application's
// `PlatformHost`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use hconnect_api::{HomeConnectClient, OAuthApp, TokenSource};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::command::Command;
use crate::config::{AccountConfig, DEFAULT_SCAN_INTERVAL, HubConfig};
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::error::CoreError;
use crate::model::{Entity, EntityCategory};
use crate::poller::{PollOutcome, poll};
use crate::registry::Registry;
use crate::session::{AccountSession, DeviceSnapshot};

// ── PlatformHost ─────────────────────────────────────────────────────

/// The embedding application's entity platforms.
#[async_trait]
pub trait PlatformHost: Send + Sync {
    /// Expose `session`'s entities of `category`.
    async fn setup_platform(
        &self,
        session: &AccountSession,
        category: EntityCategory,
    ) -> Result<(), CoreError>;

    /// Tear down `category` for an account. `false` means the teardown
    /// failed and the account must stay registered.
    async fn unload_platform(&self, account_id: &str, category: EntityCategory) -> bool;
}

/// In-memory [`PlatformHost`] that records the entities exposed per
/// account and category.
#[derive(Debug, Default)]
pub struct EntityPlatforms {
    loaded: DashMap<String, BTreeMap<EntityCategory, Vec<Entity>>>,
}

impl EntityPlatforms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Categories currently loaded for `account_id`.
    pub fn loaded(&self, account_id: &str) -> Vec<EntityCategory> {
        self.loaded
            .get(account_id)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Entities exposed for `account_id` in `category`.
    pub fn entities(&self, account_id: &str, category: EntityCategory) -> Vec<Entity> {
        self.loaded
            .get(account_id)
            .and_then(|m| m.get(&category).cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PlatformHost for EntityPlatforms {
    async fn setup_platform(
        &self,
        session: &AccountSession,
        category: EntityCategory,
    ) -> Result<(), CoreError> {
        let entities: Vec<Entity> = session
            .entities()
            .into_iter()
            .filter(|e| e.category == category)
            .collect();
        debug!(
            account = session.id(),
            %category,
            count = entities.len(),
            "platform loaded"
        );
        self.loaded
            .entry(session.id().to_owned())
            .or_default()
            .insert(category, entities);
        Ok(())
    }

    async fn unload_platform(&self, account_id: &str, category: EntityCategory) -> bool {
        if let Some(mut categories) = self.loaded.get_mut(account_id) {
            categories.remove(&category);
        }
        self.loaded.remove_if(account_id, |_, m| m.is_empty());
        true
    }
}

// ── Hub ──────────────────────────────────────────────────────────────

/// Entry point for embedding applications.
///
/// Cheaply cloneable via `Arc<HubInner>`.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

struct HubInner {
    config: HubConfig,
    registry: Arc<Registry>,
    dispatcher: Dispatcher,
    platforms: Arc<dyn PlatformHost>,
    implementations: DashMap<String, OAuthApp>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Hub {
    /// A zero scan interval cannot drive a timer and falls back to
    /// [`DEFAULT_SCAN_INTERVAL`].
    pub fn new(mut config: HubConfig, platforms: Arc<dyn PlatformHost>) -> Self {
        if config.scan_interval.is_zero() {
            warn!(
                fallback = ?DEFAULT_SCAN_INTERVAL,
                "scan interval of zero is not usable"
            );
            config.scan_interval = DEFAULT_SCAN_INTERVAL;
        }
        let registry = Arc::new(Registry::new());
        Self {
            inner: Arc::new(HubInner {
                config,
                dispatcher: Dispatcher::new(Arc::clone(&registry)),
                registry,
                platforms,
                implementations: DashMap::new(),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    // ── OAuth2 implementations ───────────────────────────────────────

    /// Register an OAuth2 client under its name, replacing any previous
    /// registration of the same name.
    pub fn register_implementation(&self, app: OAuthApp) {
        debug!(name = %app.name, "registering OAuth2 implementation");
        self.inner.implementations.insert(app.name.clone(), app);
    }

    pub fn implementation(&self, name: &str) -> Option<OAuthApp> {
        self.inner.implementations.get(name).map(|a| a.value().clone())
    }

    // ── Account lifecycle ────────────────────────────────────────────

    /// Register an account, run its first poll cycle and set up every
    /// entity platform.
    pub async fn setup_account(
        &self,
        config: AccountConfig,
    ) -> Result<Arc<AccountSession>, CoreError> {
        let app = match &config.implementation {
            Some(name) => Some(self.implementation(name).ok_or_else(|| CoreError::Config {
                message: format!("OAuth2 implementation '{name}' is not registered"),
            })?),
            None => None,
        };

        let http = self.inner.config.transport.build_client()?;
        let tokens = Arc::new(TokenSource::with_client(app, config.token, http.clone()));
        let client = HomeConnectClient::with_client(http, config.api_url, tokens);
        let session = Arc::new(AccountSession::new(
            config.id,
            config.title,
            client,
            self.inner.config.scan_interval,
            self.inner.registry.entity_ids(),
        ));

        self.inner.registry.insert(Arc::clone(&session))?;
        poll(&session, true).await;

        let results = join_all(
            EntityCategory::ALL
                .iter()
                .map(|category| self.inner.platforms.setup_platform(&session, *category)),
        )
        .await;
        for (category, result) in EntityCategory::ALL.iter().zip(results) {
            if let Err(e) = result {
                warn!(account = session.id(), %category, error = %e, "platform setup failed");
            }
        }

        info!(
            account = session.id(),
            devices = session.devices().len(),
            "account set up"
        );
        Ok(session)
    }

    /// Tear down every platform of an account; remove it from the
    /// registry only if all teardowns succeeded.
    pub async fn unload_account(&self, account_id: &str) -> Result<bool, CoreError> {
        if !self.inner.registry.contains(account_id) {
            return Err(CoreError::AccountNotFound {
                id: account_id.to_owned(),
            });
        }

        let results = join_all(
            EntityCategory::ALL
                .iter()
                .map(|category| self.inner.platforms.unload_platform(account_id, *category)),
        )
        .await;

        let unloaded = results.iter().all(|ok| *ok);
        if unloaded {
            self.inner.registry.remove(account_id);
            info!(account = account_id, "account unloaded");
        } else {
            warn!(account = account_id, "platform teardown failed, account kept");
        }
        Ok(unloaded)
    }

    // ── Polling ──────────────────────────────────────────────────────

    /// Run one poll cycle for an account.
    pub async fn poll_account(&self, account_id: &str, force: bool) -> Result<PollOutcome, CoreError> {
        let session = self.session(account_id)?;
        Ok(poll(&session, force).await)
    }

    /// Poll every registered account concurrently.
    pub async fn poll_all(&self, force: bool) -> Vec<(String, PollOutcome)> {
        let sessions = self.inner.registry.sessions();
        let outcomes = join_all(sessions.iter().map(|s| poll(s, force))).await;
        sessions
            .iter()
            .map(|s| s.id().to_owned())
            .zip(outcomes)
            .collect()
    }

    /// Spawn the background task that polls every account on the scan
    /// interval. Calling it again while the task runs is a no-op.
    pub async fn start_polling(&self) {
        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            return;
        }
        let hub = self.clone();
        let interval = self.inner.config.scan_interval;
        let cancel = self.inner.cancel.clone();
        handles.push(tokio::spawn(poll_task(hub, interval, cancel)));
        debug!(?interval, "background polling started");
    }

    /// Stop background polling and wait for the task to exit.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                error!(error = %e, "background polling task failed");
            }
        }
        debug!("hub shut down");
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Registered account ids, sorted.
    pub fn accounts(&self) -> Vec<String> {
        self.inner
            .registry
            .sessions()
            .iter()
            .map(|s| s.id().to_owned())
            .collect()
    }

    pub fn session(&self, account_id: &str) -> Result<Arc<AccountSession>, CoreError> {
        self.inner
            .registry
            .get(account_id)
            .ok_or_else(|| CoreError::AccountNotFound {
                id: account_id.to_owned(),
            })
    }

    pub fn devices(&self, account_id: &str) -> Result<DeviceSnapshot, CoreError> {
        Ok(self.session(account_id)?.devices())
    }

    /// Entities of every account.
    pub fn entities(&self) -> Vec<Entity> {
        self.inner
            .registry
            .sessions()
            .iter()
            .flat_map(|s| s.entities())
            .collect()
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub async fn dispatch(&self, command: Command) -> Result<DispatchOutcome, CoreError> {
        self.inner.dispatcher.dispatch(command).await
    }

    /// Validate a named service call and dispatch it.
    pub async fn call_service(
        &self,
        service: &str,
        payload: serde_json::Value,
    ) -> Result<DispatchOutcome, CoreError> {
        let command = Command::from_service_call(service, payload)?;
        self.dispatch(command).await
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("accounts", &self.accounts())
            .finish_non_exhaustive()
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Poll every account each interval. Scheduled cycles are forced: the
/// timer is their rate limit, and the throttle still keeps them from
/// overlapping an on-demand cycle.
async fn poll_task(hub: Hub, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                for (account, outcome) in hub.poll_all(true).await {
                    debug!(account = %account, ?outcome, "scheduled poll");
                }
            }
        }
    }
}

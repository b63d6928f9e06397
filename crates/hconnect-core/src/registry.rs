// ── Appliance registry ──
//
// Maps account id to its `AccountSession`. Lookups are lock-free from the
// caller's point of view (sharded `DashMap`); the entity resolver scans
// every session's current device snapshot. Entity ids are handed out by
// one allocator shared by all sessions, so they never repeat across accounts.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use hconnect_api::ApplianceHandle;
use tracing::error;

use crate::error::CoreError;
use crate::model::entity::EntityIdAllocator;
use crate::session::AccountSession;

/// In-memory registry of account sessions.
#[derive(Debug, Default)]
pub struct Registry {
    sessions: DashMap<String, Arc<AccountSession>>,
    entity_ids: Arc<EntityIdAllocator>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. Fails if the account id is already taken.
    pub fn insert(&self, session: Arc<AccountSession>) -> Result<(), CoreError> {
        match self.sessions.entry(session.id().to_owned()) {
            Entry::Occupied(e) => Err(CoreError::AccountExists { id: e.key().clone() }),
            Entry::Vacant(e) => {
                e.insert(session);
                Ok(())
            }
        }
    }

    pub fn get(&self, account_id: &str) -> Option<Arc<AccountSession>> {
        self.sessions.get(account_id).map(|s| Arc::clone(s.value()))
    }

    /// Allocator new sessions of this registry must derive entities with.
    pub(crate) fn entity_ids(&self) -> Arc<EntityIdAllocator> {
        Arc::clone(&self.entity_ids)
    }

    /// Drop a session and free its entity ids.
    pub fn remove(&self, account_id: &str) -> Option<Arc<AccountSession>> {
        let removed = self.sessions.remove(account_id).map(|(_, s)| s);
        if removed.is_some() {
            self.entity_ids.release_account(account_id);
        }
        removed
    }

    pub fn contains(&self, account_id: &str) -> bool {
        self.sessions.contains_key(account_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Every session, ordered by account id.
    pub fn sessions(&self) -> Vec<Arc<AccountSession>> {
        let mut sessions: Vec<_> = self.sessions.iter().map(|s| Arc::clone(s.value())).collect();
        sessions.sort_by(|a, b| a.id().cmp(b.id()));
        sessions
    }

    /// Find the appliance owning `entity_id` across every account.
    ///
    /// A miss is logged at error level and yields `None`.
    pub fn resolve(&self, entity_id: &str) -> Option<ApplianceHandle> {
        let found = self.sessions().into_iter().find_map(|session| {
            session
                .devices()
                .iter()
                .find(|device| device.has_entity(entity_id))
                .map(|device| device.handle().clone())
        });

        if found.is_none() {
            error!(entity_id, "appliance for {entity_id} not found");
        }
        found
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use hconnect_api::{HomeAppliance, HomeConnectClient, TokenSource, TransportConfig};
    use secrecy::SecretString;
    use url::Url;

    use super::*;
    use crate::model::Device;

    fn session(registry: &Registry, id: &str, appliances: &[(&str, &str)]) -> Arc<AccountSession> {
        let client = HomeConnectClient::with_client(
            TransportConfig::default().build_client().unwrap(),
            Url::parse("http://127.0.0.1:9").unwrap(),
            Arc::new(TokenSource::fixed(SecretString::from("t".to_owned()))),
        );
        let ids = registry.entity_ids();
        let devices = appliances
            .iter()
            .map(|(ha_id, kind)| {
                let handle = client.appliance(HomeAppliance {
                    ha_id: (*ha_id).into(),
                    name: (*kind).into(),
                    appliance_type: (*kind).into(),
                    brand: None,
                    vib: None,
                    e_number: None,
                    connected: true,
                });
                Device::new(handle, id, &ids)
            })
            .collect();
        let session = AccountSession::new(id, id, client, Duration::from_secs(60), Arc::clone(&ids));
        session.replace_devices(devices);
        Arc::new(session)
    }

    #[test]
    fn duplicate_account_is_rejected() {
        let registry = Registry::new();
        registry.insert(session(&registry, "home", &[])).unwrap();
        let err = registry.insert(session(&registry, "home", &[])).unwrap_err();
        assert!(matches!(err, CoreError::AccountExists { ref id } if id == "home"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn resolve_scans_every_account() {
        let registry = Registry::new();
        registry.insert(session(&registry, "a", &[("HA-1", "Oven")])).unwrap();
        registry.insert(session(&registry, "b", &[("HA-2", "Dishwasher")])).unwrap();

        let handle = registry.resolve("binary_sensor.dishwasher_door").unwrap();
        assert_eq!(handle.ha_id(), "HA-2");

        let handle = registry.resolve("switch.oven_power").unwrap();
        assert_eq!(handle.ha_id(), "HA-1");
    }

    #[test]
    fn resolve_miss_is_none() {
        let registry = Registry::new();
        registry.insert(session(&registry, "a", &[("HA-1", "Oven")])).unwrap();
        assert!(registry.resolve("switch.nonexistent").is_none());
        assert!(Registry::new().resolve("switch.oven_power").is_none());
    }

    #[test]
    fn same_named_appliances_in_two_accounts_resolve_separately() {
        let registry = Registry::new();
        registry.insert(session(&registry, "a", &[("OVEN-A", "Oven")])).unwrap();
        registry.insert(session(&registry, "b", &[("OVEN-B", "Oven")])).unwrap();

        assert_eq!(registry.resolve("switch.oven_power").unwrap().ha_id(), "OVEN-A");
        assert_eq!(registry.resolve("switch.oven_power_2").unwrap().ha_id(), "OVEN-B");
    }

    #[test]
    fn remove_frees_entity_ids() {
        let registry = Registry::new();
        registry.insert(session(&registry, "a", &[("OVEN-A", "Oven")])).unwrap();
        registry.remove("a");

        registry.insert(session(&registry, "b", &[("OVEN-B", "Oven")])).unwrap();
        assert_eq!(registry.resolve("switch.oven_power").unwrap().ha_id(), "OVEN-B");
    }

    #[test]
    fn remove_returns_session() {
        let registry = Registry::new();
        registry.insert(session(&registry, "a", &[])).unwrap();
        assert!(registry.remove("a").is_some());
        assert!(!registry.contains("a"));
        assert!(registry.remove("a").is_none());
    }
}

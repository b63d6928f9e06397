// ── Device records ──
//
// A `Device` pairs the vendor `ApplianceHandle` with its host-side
// entities and the state fetched during the last poll cycle. Records are
// built fresh on every cycle and never mutated after publication.

use chrono::{DateTime, Utc};
use hconnect_api::{ApplianceHandle, HomeAppliance, Program, StateItem};
use serde::Serialize;
use tracing::debug;

use super::entity::{ApplianceKind, Entity, EntityIdAllocator, derive_entities};

/// Cached appliance state from the last successful initialization.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplianceState {
    pub status: Vec<StateItem>,
    pub settings: Vec<StateItem>,
    pub active_program: Option<Program>,
    /// `None` until the device has been initialized.
    pub initialized_at: Option<DateTime<Utc>>,
}

impl ApplianceState {
    /// Look up a vendor key in status, then settings, then the active
    /// program's options.
    pub fn value_of(&self, key: &str) -> Option<&serde_json::Value> {
        self.status
            .iter()
            .chain(&self.settings)
            .chain(self.active_program.iter().flat_map(|p| &p.options))
            .find(|item| item.key == key)
            .map(|item| &item.value)
    }
}

/// One appliance of an account, as seen by the host.
#[derive(Debug, Clone)]
pub struct Device {
    handle: ApplianceHandle,
    kind: ApplianceKind,
    entities: Vec<Entity>,
    state: ApplianceState,
}

impl Device {
    pub(crate) fn new(handle: ApplianceHandle, account: &str, ids: &EntityIdAllocator) -> Self {
        let info = handle.info();
        let kind = ApplianceKind::parse(&info.appliance_type);
        let entities = derive_entities(&kind, &info.name, &info.ha_id, account, ids);
        Self {
            handle,
            kind,
            entities,
            state: ApplianceState::default(),
        }
    }

    pub fn handle(&self) -> &ApplianceHandle {
        &self.handle
    }

    pub fn info(&self) -> &HomeAppliance {
        self.handle.info()
    }

    pub fn ha_id(&self) -> &str {
        self.handle.ha_id()
    }

    pub fn kind(&self) -> &ApplianceKind {
        &self.kind
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn state(&self) -> &ApplianceState {
        &self.state
    }

    pub fn has_entity(&self, entity_id: &str) -> bool {
        self.entities.iter().any(|e| e.entity_id == entity_id)
    }

    /// Fetch status, settings and the active program.
    ///
    /// An idle appliance (no active program) is not an error.
    pub(crate) async fn initialize(&mut self) -> Result<(), hconnect_api::Error> {
        debug!(ha_id = self.ha_id(), "initializing device");
        let (status, settings, active_program) = tokio::try_join!(
            self.handle.status(),
            self.handle.settings(),
            self.handle.active_program(),
        )?;
        self.state = ApplianceState {
            status,
            settings,
            active_program,
            initialized_at: Some(Utc::now()),
        };
        Ok(())
    }
}

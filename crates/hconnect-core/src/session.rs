// ── Account sessions ──
//
// One `AccountSession` per linked account: the authenticated API client,
// the poll throttle, and the current device snapshot. Snapshots are
// published through a `watch` channel and replaced wholesale.

use std::sync::Arc;
use std::time::Duration;

use hconnect_api::HomeConnectClient;
use tokio::sync::watch;

use crate::model::entity::EntityIdAllocator;
use crate::model::{Device, Entity};
use crate::poller::Throttle;

/// Immutable device list as of the last poll cycle.
pub type DeviceSnapshot = Arc<Vec<Arc<Device>>>;

/// Runtime state of one registered account.
#[derive(Debug)]
pub struct AccountSession {
    id: String,
    title: String,
    client: HomeConnectClient,
    devices: watch::Sender<DeviceSnapshot>,
    throttle: Throttle,
    entity_ids: Arc<EntityIdAllocator>,
}

impl AccountSession {
    /// `entity_ids` is shared with every other session of the registry.
    pub(crate) fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        client: HomeConnectClient,
        scan_interval: Duration,
        entity_ids: Arc<EntityIdAllocator>,
    ) -> Self {
        let (devices, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            id: id.into(),
            title: title.into(),
            client,
            devices,
            throttle: Throttle::new(scan_interval),
            entity_ids,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn client(&self) -> &HomeConnectClient {
        &self.client
    }

    /// Current device snapshot.
    pub fn devices(&self) -> DeviceSnapshot {
        Arc::clone(&self.devices.borrow())
    }

    /// Subscribe to device list replacements.
    pub fn subscribe(&self) -> watch::Receiver<DeviceSnapshot> {
        self.devices.subscribe()
    }

    /// Every entity of every device, in device order.
    pub fn entities(&self) -> Vec<Entity> {
        self.devices()
            .iter()
            .flat_map(|d| d.entities().iter().cloned())
            .collect()
    }

    pub(crate) fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    pub(crate) fn entity_ids(&self) -> &EntityIdAllocator {
        &self.entity_ids
    }

    /// Replace the device list. No merge with the previous snapshot.
    pub(crate) fn replace_devices(&self, devices: Vec<Device>) {
        let snapshot: DeviceSnapshot = Arc::new(devices.into_iter().map(Arc::new).collect());
        self.devices.send_replace(snapshot);
    }
}

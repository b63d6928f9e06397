// hconnect-core: Account registry, polling and command dispatch on top of hconnect-api.

pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod hub;
pub mod model;
pub mod poller;
pub mod registry;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, KeyValueRequest, ProgramRequest, Service, TargetRequest};
pub use config::{AccountConfig, DEFAULT_SCAN_INTERVAL, HubConfig};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::CoreError;
pub use hub::{EntityPlatforms, Hub, PlatformHost};
pub use model::{ApplianceKind, ApplianceState, Device, Entity, EntityCategory};
pub use poller::{PollOutcome, poll};
pub use registry::Registry;
pub use session::{AccountSession, DeviceSnapshot};

// ── Domain model ──
//
// Devices and the entities derived from them. Flat access:
// `use hconnect_core::model::*` gives you everything.

pub mod device;
pub mod entity;

pub use device::{ApplianceState, Device};
pub use entity::{ApplianceKind, Entity, EntityCategory, slugify};

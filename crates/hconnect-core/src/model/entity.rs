// ── Host-visible entities ──
//
// Each appliance is exposed as a handful of entities, one per status or
// setting the host cares about. Entity ids follow `<category>.<object_id>`
// and are unique across every registered account.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Entity platform an entity belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityCategory {
    BinarySensor,
    Light,
    Sensor,
    Switch,
}

impl EntityCategory {
    /// Every platform the integration forwards setup and teardown to.
    pub const ALL: [Self; 4] = [Self::BinarySensor, Self::Light, Self::Sensor, Self::Switch];
}

/// Appliance type as reported by the listing's `type` field.
#[derive(Debug, Clone, PartialEq, Eq, EnumString)]
pub enum ApplianceKind {
    Dishwasher,
    Washer,
    Dryer,
    WasherDryer,
    Oven,
    CoffeeMaker,
    CookProcessor,
    FridgeFreezer,
    Refrigerator,
    Freezer,
    Hood,
    Hob,
    #[strum(default)]
    Other(String),
}

impl ApplianceKind {
    pub fn parse(appliance_type: &str) -> Self {
        // `Other` is the catch-all, so parsing cannot fail.
        appliance_type
            .parse()
            .unwrap_or_else(|_| Self::Other(appliance_type.to_owned()))
    }

    fn runs_programs(&self) -> bool {
        matches!(
            self,
            Self::Dishwasher
                | Self::Washer
                | Self::Dryer
                | Self::WasherDryer
                | Self::Oven
                | Self::CoffeeMaker
                | Self::CookProcessor
        )
    }

    fn has_door(&self) -> bool {
        matches!(
            self,
            Self::Dishwasher
                | Self::Washer
                | Self::Dryer
                | Self::WasherDryer
                | Self::Oven
                | Self::FridgeFreezer
                | Self::Refrigerator
                | Self::Freezer
        )
    }
}

// ── Vendor keys ──────────────────────────────────────────────────────

pub const OPERATION_STATE: &str = "BSH.Common.Status.OperationState";
pub const REMOTE_CONTROL_ACTIVE: &str = "BSH.Common.Status.RemoteControlActive";
pub const DOOR_STATE: &str = "BSH.Common.Status.DoorState";
pub const POWER_STATE: &str = "BSH.Common.Setting.PowerState";
pub const REMAINING_PROGRAM_TIME: &str = "BSH.Common.Option.RemainingProgramTime";
pub const PROGRAM_PROGRESS: &str = "BSH.Common.Option.ProgramProgress";
pub const HOOD_LIGHTING: &str = "Cooking.Common.Setting.Lighting";
pub const AMBIENT_LIGHT: &str = "BSH.Common.Setting.AmbientLightEnabled";

/// One entity exposed for an appliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// `<category>.<object_id>`, unique across all accounts.
    pub entity_id: String,
    pub category: EntityCategory,
    /// Display name, e.g. `Dishwasher Door`.
    pub name: String,
    /// Vendor status/setting/option key whose value the entity reflects.
    pub key: String,
}

struct Template {
    category: EntityCategory,
    suffix: &'static str,
    label: &'static str,
    key: &'static str,
}

const OPERATION: Template = Template {
    category: EntityCategory::Sensor,
    suffix: "operation_state",
    label: "Operation State",
    key: OPERATION_STATE,
};
const REMOTE_CONTROL: Template = Template {
    category: EntityCategory::BinarySensor,
    suffix: "remote_control",
    label: "Remote Control",
    key: REMOTE_CONTROL_ACTIVE,
};
const POWER: Template = Template {
    category: EntityCategory::Switch,
    suffix: "power",
    label: "Power",
    key: POWER_STATE,
};
const REMAINING: Template = Template {
    category: EntityCategory::Sensor,
    suffix: "remaining_program_time",
    label: "Remaining Program Time",
    key: REMAINING_PROGRAM_TIME,
};
const PROGRESS: Template = Template {
    category: EntityCategory::Sensor,
    suffix: "program_progress",
    label: "Program Progress",
    key: PROGRAM_PROGRESS,
};
const DOOR: Template = Template {
    category: EntityCategory::BinarySensor,
    suffix: "door",
    label: "Door",
    key: DOOR_STATE,
};
const LIGHT: Template = Template {
    category: EntityCategory::Light,
    suffix: "light",
    label: "Light",
    key: HOOD_LIGHTING,
};
const AMBIENT: Template = Template {
    category: EntityCategory::Light,
    suffix: "ambient_light",
    label: "Ambient Light",
    key: AMBIENT_LIGHT,
};

fn templates(kind: &ApplianceKind) -> Vec<&'static Template> {
    let mut out = vec![&OPERATION, &REMOTE_CONTROL];
    if kind.runs_programs() {
        out.extend([&POWER, &REMAINING, &PROGRESS]);
    }
    if kind.has_door() {
        out.push(&DOOR);
    }
    match kind {
        ApplianceKind::Hood => out.extend([&POWER, &LIGHT, &AMBIENT]),
        ApplianceKind::Hob => out.push(&REMAINING),
        _ => {}
    }
    out
}

/// Derive the entities of one appliance, reserving their ids in `ids`.
///
/// `name` is the appliance's display name; the appliance id is slugged
/// instead when the name has no usable characters.
pub(crate) fn derive_entities(
    kind: &ApplianceKind,
    name: &str,
    ha_id: &str,
    account: &str,
    ids: &EntityIdAllocator,
) -> Vec<Entity> {
    let mut base = slugify(name);
    if base.is_empty() {
        base = slugify(ha_id);
    }
    let display = if name.trim().is_empty() { ha_id } else { name };
    let owner = Owner {
        account: account.to_owned(),
        ha_id: ha_id.to_owned(),
    };

    templates(kind)
        .into_iter()
        .map(|t| Entity {
            entity_id: ids.allocate(&owner, t.category, &format!("{base}_{}", t.suffix)),
            category: t.category,
            name: format!("{display} {}", t.label),
            key: t.key.to_owned(),
        })
        .collect()
}

/// Lowercase ASCII alphanumerics; every other run collapses to one `_`.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Owner {
    account: String,
    ha_id: String,
}

#[derive(Debug, Default)]
struct IdBook {
    taken: HashSet<String>,
    /// (owner, unsuffixed id) -> id handed out
    assigned: HashMap<(Owner, String), String>,
}

/// Hands out entity ids shared by every account of a registry.
///
/// Collisions get `_2`, `_3`, ... An appliance keeps the id it was first
/// given for as long as its account stays registered, whatever order the
/// vendor lists appliances in later.
#[derive(Debug, Default)]
pub(crate) struct EntityIdAllocator {
    book: Mutex<IdBook>,
}

impl EntityIdAllocator {
    fn allocate(&self, owner: &Owner, category: EntityCategory, object_id: &str) -> String {
        let base = format!("{category}.{object_id}");
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);

        let slot = (owner.clone(), base);
        if let Some(id) = book.assigned.get(&slot) {
            return id.clone();
        }

        let mut candidate = slot.1.clone();
        let mut n = 2_u32;
        while book.taken.contains(&candidate) {
            candidate = format!("{}_{n}", slot.1);
            n += 1;
        }
        book.taken.insert(candidate.clone());
        book.assigned.insert(slot, candidate.clone());
        candidate
    }

    /// Free every id held by `account`'s appliances.
    pub(crate) fn release_account(&self, account: &str) {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        let IdBook { taken, assigned } = &mut *book;
        assigned.retain(|(owner, _), id| {
            if owner.account == account {
                taken.remove(id.as_str());
                false
            } else {
                true
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids_of(entities: &[Entity]) -> Vec<&str> {
        entities.iter().map(|e| e.entity_id.as_str()).collect()
    }

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("Küche Spülmaschine"), "k_che_sp_lmaschine");
        assert_eq!(slugify("  Oven (left) "), "oven_left");
        assert_eq!(slugify("WASHER--2"), "washer_2");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn category_round_trips_through_strings() {
        assert_eq!(EntityCategory::BinarySensor.to_string(), "binary_sensor");
        assert_eq!("switch".parse::<EntityCategory>().unwrap(), EntityCategory::Switch);
    }

    #[test]
    fn unknown_type_is_other() {
        assert_eq!(ApplianceKind::parse("Dishwasher"), ApplianceKind::Dishwasher);
        assert_eq!(
            ApplianceKind::parse("WineCooler"),
            ApplianceKind::Other("WineCooler".into())
        );
    }

    #[test]
    fn dishwasher_entities() {
        let ids = EntityIdAllocator::default();
        let entities = derive_entities(&ApplianceKind::Dishwasher, "Dishwasher", "X", "home", &ids);
        assert_eq!(
            ids_of(&entities),
            vec![
                "sensor.dishwasher_operation_state",
                "binary_sensor.dishwasher_remote_control",
                "switch.dishwasher_power",
                "sensor.dishwasher_remaining_program_time",
                "sensor.dishwasher_program_progress",
                "binary_sensor.dishwasher_door",
            ]
        );
        assert_eq!(entities[5].name, "Dishwasher Door");
        assert_eq!(entities[5].key, DOOR_STATE);
    }

    #[test]
    fn hood_gets_lights() {
        let ids = EntityIdAllocator::default();
        let entities = derive_entities(&ApplianceKind::Hood, "Hood", "X", "home", &ids);
        let lights: Vec<&str> = entities
            .iter()
            .filter(|e| e.category == EntityCategory::Light)
            .map(|e| e.entity_id.as_str())
            .collect();
        assert_eq!(lights, vec!["light.hood_light", "light.hood_ambient_light"]);
    }

    #[test]
    fn unknown_kind_gets_common_entities_only() {
        let ids = EntityIdAllocator::default();
        let entities = derive_entities(
            &ApplianceKind::Other("WineCooler".into()),
            "Cellar",
            "X",
            "home",
            &ids,
        );
        assert_eq!(entities.len(), 2);
    }

    #[test]
    fn colliding_names_get_numeric_suffix() {
        let ids = EntityIdAllocator::default();
        let first = derive_entities(&ApplianceKind::Oven, "Oven", "A", "home", &ids);
        let second = derive_entities(&ApplianceKind::Oven, "Oven", "B", "home", &ids);
        let third = derive_entities(&ApplianceKind::Oven, "Oven", "C", "home", &ids);

        assert_eq!(first[0].entity_id, "sensor.oven_operation_state");
        assert_eq!(second[0].entity_id, "sensor.oven_operation_state_2");
        assert_eq!(third[0].entity_id, "sensor.oven_operation_state_3");
    }

    #[test]
    fn same_name_in_two_accounts_gets_distinct_ids() {
        let ids = EntityIdAllocator::default();
        let home = derive_entities(&ApplianceKind::Oven, "Oven", "OVEN-A", "home", &ids);
        let cabin = derive_entities(&ApplianceKind::Oven, "Oven", "OVEN-B", "cabin", &ids);

        assert_eq!(home[2].entity_id, "switch.oven_power");
        assert_eq!(cabin[2].entity_id, "switch.oven_power_2");
    }

    #[test]
    fn ids_stick_to_their_appliance_across_listing_order() {
        let ids = EntityIdAllocator::default();
        derive_entities(&ApplianceKind::Oven, "Oven", "OVEN-A", "home", &ids);
        derive_entities(&ApplianceKind::Oven, "Oven", "OVEN-B", "home", &ids);

        // Next cycle lists B first.
        let b = derive_entities(&ApplianceKind::Oven, "Oven", "OVEN-B", "home", &ids);
        let a = derive_entities(&ApplianceKind::Oven, "Oven", "OVEN-A", "home", &ids);
        assert_eq!(a[2].entity_id, "switch.oven_power");
        assert_eq!(b[2].entity_id, "switch.oven_power_2");
    }

    #[test]
    fn released_account_frees_its_ids() {
        let ids = EntityIdAllocator::default();
        derive_entities(&ApplianceKind::Oven, "Oven", "OVEN-A", "home", &ids);
        ids.release_account("home");

        let cabin = derive_entities(&ApplianceKind::Oven, "Oven", "OVEN-B", "cabin", &ids);
        assert_eq!(cabin[2].entity_id, "switch.oven_power");
    }

    #[test]
    fn empty_name_falls_back_to_appliance_id() {
        let ids = EntityIdAllocator::default();
        let entities = derive_entities(
            &ApplianceKind::Hob,
            "",
            "BOSCH-HCS05HOB1-1234",
            "home",
            &ids,
        );
        assert_eq!(
            entities[0].entity_id,
            "sensor.bosch_hcs05hob1_1234_operation_state"
        );
    }
}

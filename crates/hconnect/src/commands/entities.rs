//! Entity listing.

use hconnect_core::{Entity, EntityCategory, Hub};
use tabled::Tabled;

use crate::cli::{EntitiesArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct EntityRow {
    #[tabled(rename = "Entity ID")]
    entity_id: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Key")]
    key: String,
}

impl From<&Entity> for EntityRow {
    fn from(e: &Entity) -> Self {
        Self {
            entity_id: e.entity_id.clone(),
            category: e.category.to_string(),
            name: e.name.clone(),
            key: e.key.clone(),
        }
    }
}

pub fn handle(hub: &Hub, args: &EntitiesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let category = args
        .category
        .as_deref()
        .map(str::parse::<EntityCategory>)
        .transpose()
        .map_err(|e| CliError::Validation {
            field: "category".into(),
            reason: e.to_string(),
        })?;

    let mut entities = hub.entities();
    if let Some(category) = category {
        entities.retain(|e| e.category == category);
    }
    entities.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));

    let out = output::render_list(
        &global.output,
        &entities,
        |e| EntityRow::from(e),
        |e| e.entity_id.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

//! Appliance listing across every set-up account.

use hconnect_core::Hub;
use hconnect_core::model::entity::OPERATION_STATE;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::GlobalOpts;
use crate::output;

use super::util;

#[derive(Serialize)]
struct DeviceView {
    account: String,
    account_title: String,
    ha_id: String,
    name: String,
    #[serde(rename = "type")]
    appliance_type: String,
    brand: Option<String>,
    connected: bool,
    operation_state: Option<String>,
    entities: Vec<String>,
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "HA ID")]
    ha_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    appliance_type: String,
    #[tabled(rename = "Connected")]
    connected: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Entities")]
    entities: usize,
}

pub fn handle(hub: &Hub, global: &GlobalOpts) {
    let mut views = Vec::new();
    for session in hub.registry().sessions() {
        for device in session.devices().iter() {
            let info = device.info();
            views.push(DeviceView {
                account: session.id().to_owned(),
                account_title: session.title().to_owned(),
                ha_id: info.ha_id.clone(),
                name: info.name.clone(),
                appliance_type: info.appliance_type.clone(),
                brand: info.brand.clone(),
                connected: info.connected,
                operation_state: device.state().value_of(OPERATION_STATE).map(util::short_value),
                entities: device.entities().iter().map(|e| e.entity_id.clone()).collect(),
            });
        }
    }

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &views,
        |d| DeviceRow {
            account: d.account_title.clone(),
            ha_id: d.ha_id.clone(),
            name: d.name.clone(),
            appliance_type: d.appliance_type.clone(),
            connected: output::connected(d.connected, color),
            state: d
                .operation_state
                .clone()
                .unwrap_or_else(|| output::muted("-", color)),
            entities: d.entities.len(),
        },
        |d| d.ha_id.clone(),
    );
    output::print_output(&out, global.quiet);
}

//! Continuous polling with change output until Ctrl-C.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use hconnect_core::model::entity::OPERATION_STATE;
use hconnect_core::{DeviceSnapshot, Hub};
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize, Clone, PartialEq, Eq)]
struct Observed {
    connected: bool,
    operation_state: Option<String>,
}

#[derive(Serialize)]
struct ChangeEvent<'a> {
    at: DateTime<Utc>,
    account: &'a str,
    ha_id: &'a str,
    name: &'a str,
    #[serde(flatten)]
    observed: &'a Observed,
}

fn detail(event: &ChangeEvent<'_>, color: bool) -> String {
    let time = event.at.format("%H:%M:%S").to_string();
    let state = event.observed.operation_state.as_deref().unwrap_or("-");
    let link = output::connected(event.observed.connected, color);
    if color {
        format!(
            "{} {} {} {} connected={link}",
            time.dimmed(),
            event.account.cyan(),
            event.name.bold(),
            state.yellow()
        )
    } else {
        format!("{time} {} {} {state} connected={link}", event.account, event.name)
    }
}

/// One stream of device snapshots per account, merged.
fn snapshots(hub: &Hub) -> Result<BoxStream<'static, (String, DeviceSnapshot)>, CliError> {
    let mut streams = Vec::new();
    for account in hub.accounts() {
        let rx = hub.session(&account)?.subscribe();
        streams.push(
            stream::unfold((account, rx), |(account, mut rx)| async move {
                rx.changed().await.ok()?;
                let snapshot = rx.borrow_and_update().clone();
                Some(((account.clone(), snapshot), (account, rx)))
            })
            .boxed(),
        );
    }
    Ok(stream::select_all(streams).boxed())
}

pub async fn handle(hub: &Hub, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let mut seen: HashMap<(String, String), Observed> = HashMap::new();
    let mut changes = snapshots(hub)?;

    // Current state first, then every change.
    let initial: Vec<(String, DeviceSnapshot)> = hub
        .accounts()
        .into_iter()
        .map(|a| hub.devices(&a).map(|d| (a, d)))
        .collect::<Result<_, _>>()?;
    for (account, snapshot) in &initial {
        report(account, snapshot, &mut seen, color, global);
    }

    hub.start_polling().await;
    if !global.quiet {
        eprintln!("Watching {} account(s), Ctrl-C to stop", initial.len());
    }

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break,
            next = changes.next() => match next {
                Some((account, snapshot)) => report(&account, &snapshot, &mut seen, color, global),
                None => break,
            },
        }
    }
    Ok(())
}

fn report(
    account: &str,
    snapshot: &DeviceSnapshot,
    seen: &mut HashMap<(String, String), Observed>,
    color: bool,
    global: &GlobalOpts,
) {
    let at = Utc::now();
    for device in snapshot.iter() {
        let info = device.info();
        let observed = Observed {
            connected: info.connected,
            operation_state: device
                .state()
                .value_of(OPERATION_STATE)
                .map(util::short_value),
        };
        let key = (account.to_owned(), info.ha_id.clone());
        if seen.get(&key) == Some(&observed) {
            continue;
        }

        let event = ChangeEvent {
            at,
            account,
            ha_id: &info.ha_id,
            name: &info.name,
            observed: &observed,
        };
        let line = match global.output {
            OutputFormat::Table | OutputFormat::Plain => detail(&event, color),
            // One JSON document per line keeps the stream parseable.
            OutputFormat::Json | OutputFormat::JsonCompact => output::render_single(
                &OutputFormat::JsonCompact,
                &event,
                |e| detail(e, false),
                |e| e.ha_id.to_owned(),
            ),
            OutputFormat::Yaml => output::render_single(
                &global.output,
                &event,
                |e| detail(e, false),
                |e| e.ha_id.to_owned(),
            ),
        };
        output::print_output(&line, global.quiet);
        seen.insert(key, observed);
    }
}

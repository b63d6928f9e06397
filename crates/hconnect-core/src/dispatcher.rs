// ── Command dispatcher ──
//
// Resolves a command's target appliance and runs the matching vendor call
// on a spawned task. The task runs to completion even if the caller stops
// waiting. Failures are returned as-is; nothing is retried and no local
// state is touched (the next poll cycle observes the change).

use std::sync::Arc;

use hconnect_api::{ApplianceHandle, BSH_PAUSE, BSH_RESUME};
use tracing::{debug, info};

use crate::command::Command;
use crate::error::CoreError;
use crate::registry::Registry;

/// What happened to a dispatched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The vendor call completed successfully.
    Completed,
    /// No appliance owns the entity; nothing was sent.
    Skipped,
}

/// Routes commands to appliances registered in a [`Registry`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Validate, resolve and execute `command`.
    pub async fn dispatch(&self, command: Command) -> Result<DispatchOutcome, CoreError> {
        command.validate()?;

        let Some(appliance) = self.registry.resolve(command.entity_id()) else {
            return Ok(DispatchOutcome::Skipped);
        };

        debug!(
            service = %command.service(),
            entity_id = command.entity_id(),
            ha_id = appliance.ha_id(),
            "dispatching command"
        );

        let service = command.service();
        let task = tokio::spawn(route_command(appliance, command));
        task.await
            .map_err(|e| CoreError::Internal(format!("{service} task failed: {e}")))??;

        info!(service = %service, "command completed");
        Ok(DispatchOutcome::Completed)
    }
}

// ── Command routing ──────────────────────────────────────────────────

/// Map a command to its vendor call.
async fn route_command(
    appliance: ApplianceHandle,
    command: Command,
) -> Result<(), hconnect_api::Error> {
    match command {
        Command::Pause { .. } => appliance.execute_command(BSH_PAUSE).await,
        Command::Resume { .. } => appliance.execute_command(BSH_RESUME).await,
        Command::SelectProgram(req) => {
            let options = req.options();
            appliance
                .select_program(&req.program, options.as_deref())
                .await
        }
        Command::StartProgram(req) => {
            let options = req.options();
            appliance
                .start_program(&req.program, options.as_deref())
                .await
        }
        Command::ChangeSetting(req) => appliance.set_setting(&req.key, &req.value).await,
        Command::SetOptionActive(req) => {
            appliance
                .set_options_active_program(&req.key, &req.value)
                .await
        }
        Command::SetOptionSelected(req) => {
            appliance
                .set_options_selected_program(&req.key, &req.value)
                .await
        }
    }
}

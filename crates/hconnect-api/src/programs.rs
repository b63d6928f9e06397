// Remote-control writes
//
// Commands, settings, program options, and program selection/start. Every
// write is a `PUT` with a `{"data": ...}` body; the API answers 204.

use tracing::debug;

use crate::appliances::ApplianceHandle;
use crate::error::Error;
use crate::models::{KeyValue, ProgramBody, ProgramOption};

/// Command verb that pauses the running program.
pub const BSH_PAUSE: &str = "BSH.Common.Command.PauseProgram";

/// Command verb that resumes a paused program.
pub const BSH_RESUME: &str = "BSH.Common.Command.ResumeProgram";

impl ApplianceHandle {
    /// Execute a command verb such as [`BSH_PAUSE`].
    ///
    /// `PUT /api/homeappliances/{haId}/commands/{command}`
    pub async fn execute_command(&self, command: &str) -> Result<(), Error> {
        let url = self.url(&["commands", command])?;
        debug!(ha_id = self.ha_id(), command, "executing command");
        self.client
            .put(
                url,
                &KeyValue {
                    key: command,
                    value: true,
                },
            )
            .await
    }

    /// Change an appliance setting.
    ///
    /// `PUT /api/homeappliances/{haId}/settings/{key}`
    pub async fn set_setting(&self, key: &str, value: &str) -> Result<(), Error> {
        let url = self.url(&["settings", key])?;
        debug!(ha_id = self.ha_id(), key, value, "changing setting");
        self.client.put(url, &KeyValue { key, value }).await
    }

    /// Set an option on the running program.
    ///
    /// `PUT /api/homeappliances/{haId}/programs/active/options/{key}`
    pub async fn set_options_active_program(&self, key: &str, value: &str) -> Result<(), Error> {
        let url = self.url(&["programs", "active", "options", key])?;
        debug!(ha_id = self.ha_id(), key, value, "setting active program option");
        self.client.put(url, &KeyValue { key, value }).await
    }

    /// Set an option on the selected (not yet started) program.
    ///
    /// `PUT /api/homeappliances/{haId}/programs/selected/options/{key}`
    pub async fn set_options_selected_program(&self, key: &str, value: &str) -> Result<(), Error> {
        let url = self.url(&["programs", "selected", "options", key])?;
        debug!(ha_id = self.ha_id(), key, value, "setting selected program option");
        self.client.put(url, &KeyValue { key, value }).await
    }

    /// Select a program without starting it.
    ///
    /// `PUT /api/homeappliances/{haId}/programs/selected`
    pub async fn select_program(
        &self,
        program: &str,
        options: Option<&[ProgramOption]>,
    ) -> Result<(), Error> {
        let url = self.url(&["programs", "selected"])?;
        debug!(ha_id = self.ha_id(), program, ?options, "selecting program");
        self.client
            .put(
                url,
                &ProgramBody {
                    key: program,
                    options,
                },
            )
            .await
    }

    /// Start a program.
    ///
    /// `PUT /api/homeappliances/{haId}/programs/active`
    pub async fn start_program(
        &self,
        program: &str,
        options: Option<&[ProgramOption]>,
    ) -> Result<(), Error> {
        let url = self.url(&["programs", "active"])?;
        debug!(ha_id = self.ha_id(), program, ?options, "starting program");
        self.client
            .put(
                url,
                &ProgramBody {
                    key: program,
                    options,
                },
            )
            .await
    }
}

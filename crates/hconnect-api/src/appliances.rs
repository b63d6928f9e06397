// Appliance discovery and state reads
//
// `GET /api/homeappliances` plus the per-appliance status, settings and
// active-program endpoints.

use tracing::debug;
use url::Url;

use crate::client::HomeConnectClient;
use crate::error::Error;
use crate::models::{HomeAppliance, HomeAppliances, Program, SettingsList, StateItem, StatusList};

impl HomeConnectClient {
    /// List every appliance paired with the account.
    ///
    /// `GET /api/homeappliances`
    pub async fn list_appliances(&self) -> Result<Vec<HomeAppliance>, Error> {
        let url = self.api_url(&["homeappliances"])?;
        debug!("listing appliances");
        let data: HomeAppliances = self.get(url).await?;
        Ok(data.appliances)
    }

    /// List appliances and wrap each in an [`ApplianceHandle`].
    pub async fn get_appliances(&self) -> Result<Vec<ApplianceHandle>, Error> {
        Ok(self
            .list_appliances()
            .await?
            .into_iter()
            .map(|info| self.appliance(info))
            .collect())
    }

    /// Wrap a known appliance in a handle bound to this client.
    pub fn appliance(&self, info: HomeAppliance) -> ApplianceHandle {
        ApplianceHandle {
            client: self.clone(),
            info,
        }
    }
}

/// Client-side handle for one physical appliance.
///
/// All reads and writes for the appliance go through this handle; it is
/// cheap to clone.
#[derive(Debug, Clone)]
pub struct ApplianceHandle {
    pub(crate) client: HomeConnectClient,
    info: HomeAppliance,
}

impl ApplianceHandle {
    /// Appliance metadata as returned by the listing.
    pub fn info(&self) -> &HomeAppliance {
        &self.info
    }

    pub fn ha_id(&self) -> &str {
        &self.info.ha_id
    }

    /// Build `{base}/api/homeappliances/{haId}/{path...}`.
    pub(crate) fn url(&self, path: &[&str]) -> Result<Url, Error> {
        let mut segments = vec!["homeappliances", self.info.ha_id.as_str()];
        segments.extend_from_slice(path);
        self.client.api_url(&segments)
    }

    /// Current status values (operation state, door, remote control, ...).
    ///
    /// `GET /api/homeappliances/{haId}/status`
    pub async fn status(&self) -> Result<Vec<StateItem>, Error> {
        let url = self.url(&["status"])?;
        let data: StatusList = self.client.get(url).await?;
        Ok(data.status)
    }

    /// Current settings (power state, lighting, ...).
    ///
    /// `GET /api/homeappliances/{haId}/settings`
    pub async fn settings(&self) -> Result<Vec<StateItem>, Error> {
        let url = self.url(&["settings"])?;
        let data: SettingsList = self.client.get(url).await?;
        Ok(data.settings)
    }

    /// The running program, or `None` when the appliance is idle.
    ///
    /// `GET /api/homeappliances/{haId}/programs/active`
    pub async fn active_program(&self) -> Result<Option<Program>, Error> {
        let url = self.url(&["programs", "active"])?;
        match self.client.get::<Program>(url).await {
            Ok(program) => Ok(Some(program)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

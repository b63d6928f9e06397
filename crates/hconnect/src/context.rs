//! Config loading and hub construction shared by command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use hconnect_config::{Config, TokenFile, account_config, hub_config, oauth_app, tokens_path};
use hconnect_core::{EntityPlatforms, Hub};
use secrecy::ExposeSecret;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The config file selected by `--config`, or the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(hconnect_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(hconnect_config::load_config_from(&config_file(global))?)
}

// ── Connected hub ────────────────────────────────────────────────────

/// A hub with every selected account set up.
pub struct Connected {
    pub hub: Hub,
    tokens_path: PathBuf,
    tokens: TokenFile,
}

impl Connected {
    /// Load config and tokens, register the OAuth client, and set up each
    /// account (or only `--account`).
    pub async fn open(global: &GlobalOpts) -> Result<Self, CliError> {
        let path = config_file(global);
        let cfg = hconnect_config::load_config_from(&path)?;
        let tokens_path = tokens_path(&path);
        let tokens = TokenFile::load(&tokens_path)?;

        let ids: Vec<String> = match &global.account {
            Some(id) => {
                cfg.account(id)?;
                vec![id.clone()]
            }
            None => cfg.accounts.keys().cloned().collect(),
        };
        if ids.is_empty() {
            return Err(CliError::NoAccounts);
        }

        let hub = Hub::new(
            hub_config(&cfg, global.timeout),
            Arc::new(EntityPlatforms::new()),
        );
        if let Some(app) = oauth_app(&cfg)? {
            hub.register_implementation(app);
        }

        let connected = Self {
            hub,
            tokens_path,
            tokens,
        };
        for id in &ids {
            if let Err(e) = connected.setup(&cfg, id).await {
                // Accounts set up so far may already hold refreshed tokens.
                if let Err(save) = connected.close().await {
                    tracing::warn!(error = %save, "cannot persist refreshed tokens");
                }
                return Err(e);
            }
        }
        Ok(connected)
    }

    async fn setup(&self, cfg: &Config, id: &str) -> Result<(), CliError> {
        let account = account_config(cfg, id, &self.tokens)?;
        self.hub.setup_account(account).await?;
        Ok(())
    }

    /// Stop polling and write back any token refreshed during the run.
    pub async fn close(mut self) -> Result<(), CliError> {
        self.hub.shutdown().await;

        let mut changed = false;
        for id in self.hub.accounts() {
            let current = self.hub.session(&id)?.client().tokens().current();
            let stale = self.tokens.tokens.get(&id).is_none_or(|stored| {
                stored.access_token != current.access_token.expose_secret()
            });
            if stale {
                tracing::debug!(account = %id, "persisting refreshed token");
                self.tokens.insert(id, &current);
                changed = true;
            }
        }
        if changed {
            self.tokens.save(&self.tokens_path)?;
        }
        Ok(())
    }
}

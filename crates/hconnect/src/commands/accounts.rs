//! Account bookkeeping: list linked accounts, forget one.

use chrono::Utc;
use hconnect_config::{TokenFile, save_config_to, tokens_path};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{AccountsArgs, AccountsCommand, GlobalOpts};
use crate::context;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct AccountView {
    id: String,
    title: String,
    api_url: String,
    token: TokenState,
}

#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
enum TokenState {
    Valid,
    Expired,
    Missing,
}

#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "API")]
    api_url: String,
    #[tabled(rename = "Token")]
    token: String,
}

impl From<&AccountView> for AccountRow {
    fn from(a: &AccountView) -> Self {
        Self {
            id: a.id.clone(),
            title: a.title.clone(),
            api_url: a.api_url.clone(),
            token: format!("{:?}", a.token).to_lowercase(),
        }
    }
}

pub fn handle(args: AccountsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = context::config_file(global);
    let mut cfg = context::load(global)?;
    let tokens_path = tokens_path(&path);
    let mut tokens = TokenFile::load(&tokens_path)?;

    match args.command {
        AccountsCommand::List => {
            let now = Utc::now();
            let views: Vec<AccountView> = cfg
                .accounts
                .iter()
                .map(|(id, entry)| AccountView {
                    id: id.clone(),
                    title: entry.title.clone().unwrap_or_else(|| id.clone()),
                    api_url: entry
                        .api_url
                        .clone()
                        .unwrap_or_else(|| cfg.defaults.base_url().to_owned()),
                    token: match tokens.tokens.get(id) {
                        None => TokenState::Missing,
                        Some(t) if t.expires_at <= now && t.refresh_token.is_none() => {
                            TokenState::Expired
                        }
                        Some(_) => TokenState::Valid,
                    },
                })
                .collect();
            let out = output::render_list(
                &global.output,
                &views,
                |a| AccountRow::from(a),
                |a| a.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AccountsCommand::Remove { account } => {
            if !cfg.accounts.contains_key(&account) {
                return Err(CliError::NotFound {
                    resource_type: "account".into(),
                    identifier: account,
                    list_command: "accounts list".into(),
                });
            }
            if !util::confirm(
                &format!("Forget account '{account}' and its token?"),
                "accounts remove",
                global.yes,
            )? {
                return Ok(());
            }

            cfg.accounts.remove(&account);
            save_config_to(&path, &cfg)?;
            if tokens.remove(&account) {
                tokens.save(&tokens_path)?;
            }
            if !global.quiet {
                eprintln!("Account '{account}' removed");
            }
            Ok(())
        }
    }
}

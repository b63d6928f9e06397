//! Account linking through the OAuth2 authorization-code flow.

use hconnect_api::OAuthApp;
use hconnect_config::{
    Config, TokenFile, hub_config, oauth_app, save_config_to, store_client_secret,
    tokens_path,
};
use hconnect_core::CoreError;
use secrecy::SecretString;
use serde::Serialize;

use crate::cli::{AuthArgs, AuthCommand, GlobalOpts};
use crate::context;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct AuthorizeLink {
    url: String,
    state: String,
    redirect_uri: String,
}

fn detail(link: &AuthorizeLink) -> String {
    [
        "Open this URL and grant access:".to_owned(),
        String::new(),
        format!("  {}", link.url),
        String::new(),
        format!("Redirect URI: {}", link.redirect_uri),
        format!("State:        {}", link.state),
        String::new(),
        "Then run: hconnect auth login <account> --code <code>".to_owned(),
    ]
    .join("\n")
}

fn client(cfg: &Config, global: &GlobalOpts) -> Result<(OAuthApp, String), CliError> {
    let no_client = || CliError::NoClient {
        path: context::config_file(global).display().to_string(),
    };
    let app = oauth_app(cfg)?.ok_or_else(no_client)?;
    let redirect_uri = cfg
        .oauth
        .as_ref()
        .map(|o| o.redirect_uri.clone())
        .ok_or_else(no_client)?;
    Ok((app, redirect_uri))
}

pub async fn handle(args: AuthArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        AuthCommand::Url => {
            let cfg = context::load(global)?;
            let (app, redirect_uri) = client(&cfg, global)?;
            let state = OAuthApp::new_state();
            let link = AuthorizeLink {
                url: app.authorize_url(&redirect_uri, &state).to_string(),
                state,
                redirect_uri,
            };
            let out = output::render_single(&global.output, &link, detail, |l| l.url.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AuthCommand::Login {
            account,
            code,
            title,
        } => {
            let path = context::config_file(global);
            let mut cfg = context::load(global)?;
            let (app, redirect_uri) = client(&cfg, global)?;

            let http = hub_config(&cfg, global.timeout)
                .transport
                .build_client()
                .map_err(CoreError::from)?;
            let token = app
                .exchange_code(&http, &code, &redirect_uri)
                .await
                .map_err(CoreError::from)?;

            let tokens_path = tokens_path(&path);
            let mut tokens = TokenFile::load(&tokens_path)?;
            tokens.insert(account.clone(), &token);
            tokens.save(&tokens_path)?;

            let entry = cfg.accounts.entry(account.clone()).or_default();
            if title.is_some() {
                entry.title = title;
            }
            save_config_to(&path, &cfg)?;

            if !global.quiet {
                eprintln!("Linked account '{account}' (token valid until {})", token.expires_at);
            }
            Ok(())
        }

        AuthCommand::SetSecret => {
            let secret = dialoguer::Password::new()
                .with_prompt("OAuth client secret")
                .interact()
                .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
            store_client_secret(&SecretString::from(secret))?;
            if !global.quiet {
                eprintln!("Client secret stored in the system keyring");
            }
            Ok(())
        }
    }
}

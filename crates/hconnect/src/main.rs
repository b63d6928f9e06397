mod cli;
mod commands;
mod context;
mod error;
mod output;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::context::Connected;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let Cli { global, command } = Cli::parse();
    init_tracing(&global);

    if let Err(err) = run(command, &global).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// `RUST_LOG` wins over `-v`/`-q`.
fn init_tracing(global: &GlobalOpts) {
    let level = if global.quiet {
        "error"
    } else {
        match global.verbose {
            0 => "warn",
            1 => "hconnect=info,hconnect_core=info,hconnect_api=info",
            2 => "hconnect=debug,hconnect_core=debug,hconnect_api=debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(global.verbose > 2)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match command {
        Command::Completions(args) => {
            let mut cli = Cli::command();
            clap_complete::generate(args.shell, &mut cli, "hconnect", &mut std::io::stdout());
            Ok(())
        }
        Command::Auth(args) => commands::auth::handle(args, global).await,
        Command::Accounts(args) => commands::accounts::handle(args, global),
        hub_bound => with_hub(hub_bound, global).await,
    }
}

/// Set up every selected account, run `command`, then persist tokens.
/// The command's own error wins over a failure to save.
async fn with_hub(command: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let connected = Connected::open(global).await?;
    tracing::debug!(?command, accounts = ?connected.hub.accounts(), "running command");

    let result = commands::dispatch(command, &connected.hub, global).await;
    let closed = connected.close().await;
    result.and(closed)
}

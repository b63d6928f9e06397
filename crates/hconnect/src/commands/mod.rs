//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod accounts;
pub mod auth;
pub mod control;
pub mod devices;
pub mod entities;
pub mod util;
pub mod watch;

use hconnect_core::Hub;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a hub-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, hub: &Hub, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Devices => {
            devices::handle(hub, global);
            Ok(())
        }
        Command::Entities(args) => entities::handle(hub, &args, global),
        Command::Pause(args) => control::pause(hub, args, global).await,
        Command::Resume(args) => control::resume(hub, args, global).await,
        Command::Select(args) => control::select(hub, args, global).await,
        Command::Start(args) => control::start(hub, args, global).await,
        Command::Setting(args) => control::setting(hub, args, global).await,
        Command::OptionActive(args) => control::option_active(hub, args, global).await,
        Command::OptionSelected(args) => control::option_selected(hub, args, global).await,
        Command::Call(args) => control::call(hub, args, global).await,
        Command::Watch => watch::handle(hub, global).await,
        // Auth, Accounts and Completions are handled before dispatch
        Command::Auth(_) | Command::Accounts(_) | Command::Completions(_) => unreachable!(),
    }
}

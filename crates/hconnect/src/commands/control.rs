//! Remote-control commands: programs, settings, options, raw service calls.

use hconnect_core::{
    Command as CoreCommand, DispatchOutcome, Hub, KeyValueRequest, ProgramRequest,
};

use crate::cli::{CallArgs, GlobalOpts, KeyValueArgs, ProgramArgs, TargetArgs};
use crate::error::CliError;

use super::util;

/// Dispatch and report. An entity no appliance owns is an error here, so
/// scripts notice that nothing was sent.
async fn send(hub: &Hub, command: CoreCommand, global: &GlobalOpts) -> Result<(), CliError> {
    let service = command.service();
    let entity_id = command.entity_id().to_owned();
    match hub.dispatch(command).await? {
        DispatchOutcome::Completed => {
            if !global.quiet {
                eprintln!("{service} sent to {entity_id}");
            }
            Ok(())
        }
        DispatchOutcome::Skipped => Err(CliError::Unresolved { entity_id }),
    }
}

fn program_request(args: ProgramArgs) -> ProgramRequest {
    let request = ProgramRequest::new(args.entity_id, args.program);
    match (args.option_key, args.option_value) {
        (Some(key), Some(value)) => {
            request.with_option(key, util::option_value(&value), args.option_unit)
        }
        _ => request,
    }
}

fn key_value(args: KeyValueArgs) -> KeyValueRequest {
    KeyValueRequest {
        entity_id: args.entity_id,
        key: args.key,
        value: args.value,
    }
}

pub async fn pause(hub: &Hub, args: TargetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let command = CoreCommand::Pause {
        entity_id: args.entity_id,
    };
    send(hub, command, global).await
}

pub async fn resume(hub: &Hub, args: TargetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let command = CoreCommand::Resume {
        entity_id: args.entity_id,
    };
    send(hub, command, global).await
}

pub async fn select(hub: &Hub, args: ProgramArgs, global: &GlobalOpts) -> Result<(), CliError> {
    send(hub, CoreCommand::SelectProgram(program_request(args)), global).await
}

pub async fn start(hub: &Hub, args: ProgramArgs, global: &GlobalOpts) -> Result<(), CliError> {
    send(hub, CoreCommand::StartProgram(program_request(args)), global).await
}

pub async fn setting(hub: &Hub, args: KeyValueArgs, global: &GlobalOpts) -> Result<(), CliError> {
    send(hub, CoreCommand::ChangeSetting(key_value(args)), global).await
}

pub async fn option_active(
    hub: &Hub,
    args: KeyValueArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    send(hub, CoreCommand::SetOptionActive(key_value(args)), global).await
}

pub async fn option_selected(
    hub: &Hub,
    args: KeyValueArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    send(hub, CoreCommand::SetOptionSelected(key_value(args)), global).await
}

/// `hconnect call <service> --data '{...}'`
pub async fn call(hub: &Hub, args: CallArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let payload = match (&args.data, &args.from_file) {
        (Some(data), _) => serde_json::from_str(data)?,
        (None, Some(path)) => util::read_json_file(path)?,
        (None, None) => serde_json::Value::Object(serde_json::Map::new()),
    };
    let command = CoreCommand::from_service_call(&args.service, payload)?;
    send(hub, command, global).await
}

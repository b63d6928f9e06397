//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;

use hconnect_api::OptionValue;

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read and parse a JSON file for `--from-file` flags.
pub fn read_json_file(path: &Path) -> Result<serde_json::Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Integers become numeric option values; anything else stays text.
pub fn option_value(raw: &str) -> OptionValue {
    raw.parse::<i64>()
        .map_or_else(|_| OptionValue::from(raw), OptionValue::from)
}

/// Last segment of a vendor enum value
/// (`BSH.Common.EnumType.OperationState.Run` -> `Run`).
pub fn short_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.rsplit('.').next().unwrap_or(s).to_owned(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_option_values_are_integers() {
        assert_eq!(option_value("60"), OptionValue::Int(60));
        assert_eq!(option_value("-5"), OptionValue::Int(-5));
        assert_eq!(option_value("Eco"), OptionValue::Text("Eco".into()));
        assert_eq!(option_value("1.5"), OptionValue::Text("1.5".into()));
    }

    #[test]
    fn enum_values_are_shortened() {
        assert_eq!(
            short_value(&json!("BSH.Common.EnumType.OperationState.Run")),
            "Run"
        );
        assert_eq!(short_value(&json!(true)), "true");
        assert_eq!(short_value(&json!(42)), "42");
    }
}

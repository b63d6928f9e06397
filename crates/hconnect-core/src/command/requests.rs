// ── Typed request structs for Command payloads ──
//
// Service-call payloads deserialize straight into these structs. Unknown
// fields are rejected; `value` on key-value requests is coerced to a string.

use hconnect_api::{OptionValue, ProgramOption};
use serde::{Deserialize, Deserializer, Serialize};

/// Payload of `pause_program` / `resume_program`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetRequest {
    pub entity_id: String,
}

/// Payload of `change_setting`, `set_option_active`, `set_option_selected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyValueRequest {
    pub entity_id: String,
    pub key: String,
    #[serde(deserialize_with = "value_as_string")]
    pub value: String,
}

/// Payload of `select_program` / `start_program`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramRequest {
    pub entity_id: String,
    pub program: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_value: Option<OptionValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_unit: Option<String>,
}

impl ProgramRequest {
    pub fn new(entity_id: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            program: program.into(),
            option_key: None,
            option_value: None,
            option_unit: None,
        }
    }

    pub fn with_option(
        mut self,
        key: impl Into<String>,
        value: impl Into<OptionValue>,
        unit: Option<String>,
    ) -> Self {
        self.option_key = Some(key.into());
        self.option_value = Some(value.into());
        self.option_unit = unit;
        self
    }

    /// The option list sent with the program.
    ///
    /// Present only when both key and value are given; a unit alone, or a
    /// key without a value, yields `None`.
    pub fn options(&self) -> Option<Vec<ProgramOption>> {
        match (&self.option_key, &self.option_value) {
            (Some(key), Some(value)) => Some(vec![ProgramOption {
                key: key.clone(),
                value: value.clone(),
                unit: self.option_unit.clone(),
            }]),
            _ => None,
        }
    }
}

/// Accept strings, numbers and booleans; store their string form.
fn value_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(D::Error::custom(format!(
            "value must be a string, number or boolean, got {other}"
        ))),
    }
}

// Home Connect API response and request types
//
// Every payload is wrapped in a `{"data": ...}` envelope and every error in
// `{"error": {"key", "description"}}`. Fields use `#[serde(default)]` where
// the API omits them for some appliance types.

use serde::{Deserialize, Serialize};

// ── Envelopes ────────────────────────────────────────────────────────

/// Standard success envelope: `{ "data": ... }`.
#[derive(Debug, Deserialize, Serialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// Standard error envelope: `{ "error": { "key": ..., "description": ... } }`.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub key: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ── Appliances ──────────────────────────────────────────────────────

/// `data` of `GET /api/homeappliances`.
#[derive(Debug, Deserialize)]
pub struct HomeAppliances {
    #[serde(rename = "homeappliances", default)]
    pub appliances: Vec<HomeAppliance>,
}

/// One paired appliance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeAppliance {
    pub ha_id: String,
    #[serde(default)]
    pub name: String,
    /// Appliance type, e.g. `Dishwasher`, `Oven`, `Hood`.
    #[serde(rename = "type", default)]
    pub appliance_type: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub vib: Option<String>,
    #[serde(default, rename = "enumber")]
    pub e_number: Option<String>,
    #[serde(default)]
    pub connected: bool,
}

// ── Status / settings ───────────────────────────────────────────────

/// A single status or setting entry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateItem {
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
}

/// `data` of `GET .../status`.
#[derive(Debug, Deserialize)]
pub struct StatusList {
    #[serde(default)]
    pub status: Vec<StateItem>,
}

/// `data` of `GET .../settings`.
#[derive(Debug, Deserialize)]
pub struct SettingsList {
    #[serde(default)]
    pub settings: Vec<StateItem>,
}

// ── Programs ────────────────────────────────────────────────────────

/// Value of a program option: the API accepts integers and strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Int(i64),
    Text(String),
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl std::fmt::Display for OptionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// An option attached to a program selection or start.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProgramOption {
    pub key: String,
    pub value: OptionValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// `data` of `GET .../programs/active`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Program {
    pub key: String,
    #[serde(default)]
    pub options: Vec<StateItem>,
}

// ── Request bodies ──────────────────────────────────────────────────

/// Body for settings, option and command writes: `{"key", "value"}`.
#[derive(Debug, Serialize)]
pub(crate) struct KeyValue<'a, V: Serialize> {
    pub key: &'a str,
    pub value: V,
}

/// Body for program selection and start.
#[derive(Debug, Serialize)]
pub(crate) struct ProgramBody<'a> {
    pub key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<&'a [ProgramOption]>,
}

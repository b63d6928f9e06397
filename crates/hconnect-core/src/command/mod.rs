// ── Command API ──
//
// Every remote-control action flows through the `Command` enum. Service
// calls (name + JSON payload) are validated into a `Command` here; the
// dispatcher resolves the target appliance and routes each variant to
// one vendor call.

pub mod requests;

use strum::{AsRefStr, Display, EnumString};

use crate::error::CoreError;

pub use requests::{KeyValueRequest, ProgramRequest, TargetRequest};

/// Name of a callable service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Service {
    PauseProgram,
    ResumeProgram,
    SelectProgram,
    StartProgram,
    ChangeSetting,
    SetOptionActive,
    SetOptionSelected,
}

impl Service {
    pub const ALL: [Self; 7] = [
        Self::SetOptionActive,
        Self::SetOptionSelected,
        Self::PauseProgram,
        Self::ResumeProgram,
        Self::SelectProgram,
        Self::StartProgram,
        Self::ChangeSetting,
    ];
}

/// All remote-control actions against an appliance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // ── Program control ──────────────────────────────────────────────
    Pause { entity_id: String },
    Resume { entity_id: String },
    SelectProgram(ProgramRequest),
    StartProgram(ProgramRequest),

    // ── Settings and options ─────────────────────────────────────────
    ChangeSetting(KeyValueRequest),
    SetOptionActive(KeyValueRequest),
    SetOptionSelected(KeyValueRequest),
}

impl Command {
    /// Parse and validate a service call.
    pub fn from_service_call(service: &str, payload: serde_json::Value) -> Result<Self, CoreError> {
        let service: Service = service
            .parse()
            .map_err(|_| CoreError::validation(format!("unknown service: {service}")))?;

        let command = match service {
            Service::PauseProgram => Self::Pause {
                entity_id: parse::<TargetRequest>(service, payload)?.entity_id,
            },
            Service::ResumeProgram => Self::Resume {
                entity_id: parse::<TargetRequest>(service, payload)?.entity_id,
            },
            Service::SelectProgram => Self::SelectProgram(parse(service, payload)?),
            Service::StartProgram => Self::StartProgram(parse(service, payload)?),
            Service::ChangeSetting => Self::ChangeSetting(parse(service, payload)?),
            Service::SetOptionActive => Self::SetOptionActive(parse(service, payload)?),
            Service::SetOptionSelected => Self::SetOptionSelected(parse(service, payload)?),
        };

        command.validate()?;
        Ok(command)
    }

    pub fn service(&self) -> Service {
        match self {
            Self::Pause { .. } => Service::PauseProgram,
            Self::Resume { .. } => Service::ResumeProgram,
            Self::SelectProgram(_) => Service::SelectProgram,
            Self::StartProgram(_) => Service::StartProgram,
            Self::ChangeSetting(_) => Service::ChangeSetting,
            Self::SetOptionActive(_) => Service::SetOptionActive,
            Self::SetOptionSelected(_) => Service::SetOptionSelected,
        }
    }

    /// Entity whose appliance the command targets.
    pub fn entity_id(&self) -> &str {
        match self {
            Self::Pause { entity_id } | Self::Resume { entity_id } => entity_id,
            Self::SelectProgram(req) | Self::StartProgram(req) => &req.entity_id,
            Self::ChangeSetting(req) | Self::SetOptionActive(req) | Self::SetOptionSelected(req) => {
                &req.entity_id
            }
        }
    }

    /// Check field contents that deserialization cannot express.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_entity_id(self.entity_id())?;
        match self {
            Self::Pause { .. } | Self::Resume { .. } => Ok(()),
            Self::SelectProgram(req) | Self::StartProgram(req) => {
                require_non_empty("program", &req.program)
            }
            Self::ChangeSetting(req) | Self::SetOptionActive(req) | Self::SetOptionSelected(req) => {
                require_non_empty("key", &req.key)?;
                require_path_safe("key", &req.key)
            }
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(
    service: Service,
    payload: serde_json::Value,
) -> Result<T, CoreError> {
    if !payload.is_object() {
        return Err(CoreError::validation(format!(
            "{service}: payload must be a JSON object"
        )));
    }
    serde_json::from_value(payload).map_err(|e| CoreError::validation(format!("{service}: {e}")))
}

fn require_non_empty(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Keys become a URL path segment of the owning appliance.
fn require_path_safe(field: &str, value: &str) -> Result<(), CoreError> {
    if value == "." || value == ".." || value.contains(['/', '?', '#', '%']) {
        return Err(CoreError::validation(format!(
            "{field} {value:?} contains characters not allowed in a key"
        )));
    }
    Ok(())
}

/// `<domain>.<object_id>`, both lowercase ASCII alphanumerics and `_`,
/// neither starting nor ending with `_`, and no `__` in the domain.
pub fn validate_entity_id(entity_id: &str) -> Result<(), CoreError> {
    let invalid = || CoreError::validation(format!("invalid entity id: {entity_id:?}"));

    let (domain, object_id) = entity_id.split_once('.').ok_or_else(invalid)?;
    if !valid_slug(domain) || domain.contains("__") || !valid_slug(object_id) {
        return Err(invalid());
    }
    Ok(())
}

fn valid_slug(part: &str) -> bool {
    !part.is_empty()
        && !part.starts_with('_')
        && !part.ends_with('_')
        && part
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

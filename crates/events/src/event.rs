use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// UI classification of an audit event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Danger,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Danger => "danger",
        }
    }
}

impl core::fmt::Display for Severity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown severity '{0}'")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Severity::Info),
            "success" => Ok(Severity::Success),
            "warning" => Ok(Severity::Warning),
            "danger" => Ok(Severity::Danger),
            other => Err(UnknownSeverity(other.to_string())),
        }
    }
}

/// A domain event that is recorded in the audit trail.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **self-describing** (type tag, severity and human-readable text)
/// - designed to be **append-only**
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event type tag (e.g. "work_order_status").
    fn event_type(&self) -> &'static str;

    /// UI severity for the audit feed.
    fn severity(&self) -> Severity;

    /// Human-readable text shown in the events feed.
    fn describe(&self) -> String;

    /// Structured metadata (ids, amounts) for consumers that need more than text.
    fn metadata(&self) -> Option<JsonValue> {
        None
    }

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_string_forms_agree_with_serde() {
        for sev in [Severity::Info, Severity::Success, Severity::Warning, Severity::Danger] {
            let json = serde_json::to_value(sev).unwrap();
            assert_eq!(json, JsonValue::String(sev.as_str().to_string()));
            assert_eq!(sev.as_str().parse::<Severity>().unwrap(), sev);
        }
        assert!("critical".parse::<Severity>().is_err());
    }
}

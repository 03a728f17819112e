use std::borrow::Cow;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkOrderType {
    Corrective,
    Preventive,
}

impl WorkOrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkOrderType::Corrective => "corrective",
            WorkOrderType::Preventive => "preventive",
        }
    }
}

impl FromStr for WorkOrderType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "corrective" => Ok(WorkOrderType::Corrective),
            "preventive" => Ok(WorkOrderType::Preventive),
            other => Err(UnknownVariant {
                kind: "work order type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            other => Err(UnknownVariant {
                kind: "priority",
                value: other.to_string(),
            }),
        }
    }
}

/// Free-form work-order status.
///
/// The canonical vocabulary is `new`, `in_progress`, `done` and `closed`, but any
/// string is accepted and stored verbatim. There is no transition table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkOrderStatus(Cow<'static, str>);

impl WorkOrderStatus {
    pub const NEW: WorkOrderStatus = WorkOrderStatus(Cow::Borrowed("new"));
    pub const IN_PROGRESS: WorkOrderStatus = WorkOrderStatus(Cow::Borrowed("in_progress"));
    pub const DONE: WorkOrderStatus = WorkOrderStatus(Cow::Borrowed("done"));
    pub const CLOSED: WorkOrderStatus = WorkOrderStatus(Cow::Borrowed("closed"));

    /// Stored exactly as given, including the empty string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Cow::Owned(value.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `done` or `closed`.
    pub fn is_completed(&self) -> bool {
        *self == Self::DONE || *self == Self::CLOSED
    }
}

impl Default for WorkOrderStatus {
    fn default() -> Self {
        Self::NEW
    }
}

impl core::fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

//! Org-unit event vocabulary.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Type of an org-unit event in the bitemporal history.
///
/// `Other` keeps values this crate does not know about so that facts from a
/// newer store do not fail to parse; they get the most restrictive handling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OrgEventType {
    Create,
    Rename,
    Move,
    SetBusinessUnit,
    Disable,
    Enable,
    /// Correction of an earlier event's payload
    CorrectEvent,
    /// Correction of the lifecycle status in force
    CorrectStatus,
    /// Rescission of a single event
    RescindEvent,
    /// Rescission of the whole org
    RescindOrg,
    Other(String),
}

impl OrgEventType {
    /// Event types that can be appended as a new version of an existing org.
    pub const EVENT_UPDATES: [OrgEventType; 5] = [
        OrgEventType::Rename,
        OrgEventType::Move,
        OrgEventType::Disable,
        OrgEventType::Enable,
        OrgEventType::SetBusinessUnit,
    ];

    /// Parse a wire value, case-insensitively. Blank input yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let value = raw.trim().to_ascii_uppercase();
        let parsed = match value.as_str() {
            "" => return None,
            "CREATE" => Self::Create,
            "RENAME" => Self::Rename,
            "MOVE" => Self::Move,
            "SET_BUSINESS_UNIT" => Self::SetBusinessUnit,
            "DISABLE" => Self::Disable,
            "ENABLE" => Self::Enable,
            "CORRECT_EVENT" => Self::CorrectEvent,
            "CORRECT_STATUS" => Self::CorrectStatus,
            "RESCIND_EVENT" => Self::RescindEvent,
            "RESCIND_ORG" => Self::RescindOrg,
            _ => Self::Other(value),
        };
        Some(parsed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "CREATE",
            Self::Rename => "RENAME",
            Self::Move => "MOVE",
            Self::SetBusinessUnit => "SET_BUSINESS_UNIT",
            Self::Disable => "DISABLE",
            Self::Enable => "ENABLE",
            Self::CorrectEvent => "CORRECT_EVENT",
            Self::CorrectStatus => "CORRECT_STATUS",
            Self::RescindEvent => "RESCIND_EVENT",
            Self::RescindOrg => "RESCIND_ORG",
            Self::Other(raw) => raw,
        }
    }

    /// Status of the org while this event is the one in force.
    pub fn resulting_status(&self) -> TargetStatus {
        match self {
            Self::Disable => TargetStatus::Disabled,
            _ => TargetStatus::Active,
        }
    }
}

impl fmt::Display for OrgEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OrgEventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrgEventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| serde::de::Error::custom("empty event type"))
    }
}

/// Lifecycle status of an org unit as of a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetStatus {
    Active,
    Disabled,
}

impl TargetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
        }
    }
}

//! Actions and write intents gated by capabilities.

use crate::event::OrgEventType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of action a capability decision is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Correct the payload of the event in force at a date
    CorrectEvent,
    /// Correct the lifecycle status in force at a date
    CorrectStatus,
    /// Rescind a single event
    RescindEvent,
    /// Rescind the whole org unit
    RescindOrg,
    /// Create a new org unit
    Create,
    /// Append a new effective-dated version to an existing org
    EventUpdate,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CorrectEvent => "correct_event",
            Self::CorrectStatus => "correct_status",
            Self::RescindEvent => "rescind_event",
            Self::RescindOrg => "rescind_org",
            Self::Create => "create",
            Self::EventUpdate => "event_update",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key handed to the policy resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionKey {
    pub action_kind: ActionKind,
    pub emitted_event_type: OrgEventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_effective_event_type: Option<OrgEventType>,
}

impl ActionKey {
    pub fn new(action_kind: ActionKind, emitted_event_type: OrgEventType) -> Self {
        Self {
            action_kind,
            emitted_event_type,
            target_effective_event_type: None,
        }
    }

    pub fn with_target(mut self, target: OrgEventType) -> Self {
        self.target_effective_event_type = Some(target);
        self
    }
}

/// Write intent submitted by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteIntent {
    CreateOrg,
    AddVersion,
    InsertVersion,
    Correct,
}

impl WriteIntent {
    pub const ALL: [WriteIntent; 4] = [
        WriteIntent::CreateOrg,
        WriteIntent::AddVersion,
        WriteIntent::InsertVersion,
        WriteIntent::Correct,
    ];

    /// Parse a wire value. Unknown intents yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "create_org" => Some(Self::CreateOrg),
            "add_version" => Some(Self::AddVersion),
            "insert_version" => Some(Self::InsertVersion),
            "correct" => Some(Self::Correct),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateOrg => "create_org",
            Self::AddVersion => "add_version",
            Self::InsertVersion => "insert_version",
            Self::Correct => "correct",
        }
    }

    /// Whether the intent acts on an event already in the history.
    pub fn requires_target_effective_date(&self) -> bool {
        matches!(self, Self::Correct)
    }
}

impl fmt::Display for WriteIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_intent_round_trips_wire_names() {
        for intent in WriteIntent::ALL {
            assert_eq!(WriteIntent::parse(intent.as_str()), Some(intent));
        }
        assert_eq!(WriteIntent::parse("CREATE_ORG"), Some(WriteIntent::CreateOrg));
        assert_eq!(WriteIntent::parse("delete_org"), None);
        assert_eq!(WriteIntent::parse(""), None);
    }

    #[test]
    fn action_key_omits_missing_target() {
        let key = ActionKey::new(ActionKind::RescindEvent, OrgEventType::Create);
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json["action_kind"], "rescind_event");
        assert!(json.get("target_effective_event_type").is_none());

        let key = key.with_target(OrgEventType::Rename);
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json["target_effective_event_type"], "RENAME");
    }
}

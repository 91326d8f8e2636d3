//! Capability decisions.
//!
//! A decision says whether an action is enabled and, only when it is, which
//! fields may be supplied and under which payload keys. A denied decision
//! carries deny reasons and nothing else.

use crate::event::TargetStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable deny reason codes produced by the engine itself.
pub mod deny_reason {
    /// Caller lacks admin rights. Always the first reason when present.
    pub const FORBIDDEN: &str = "FORBIDDEN";
    /// The target event exists but was rescinded.
    pub const ORG_EVENT_RESCINDED: &str = "ORG_EVENT_RESCINDED";
    /// No event exists for the org at or before the date.
    pub const ORG_EVENT_NOT_FOUND: &str = "ORG_EVENT_NOT_FOUND";
    /// The org code does not resolve to an org as of the date.
    pub const ORG_NOT_FOUND_AS_OF: &str = "ORG_NOT_FOUND_AS_OF";
}

/// Outcome of a capability check for one action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDecision {
    pub enabled: bool,
    #[serde(default)]
    pub allowed_fields: Vec<String>,
    #[serde(default)]
    pub field_payload_keys: BTreeMap<String, String>,
    /// Most decisive reason first.
    #[serde(default)]
    pub deny_reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_target_statuses: Vec<TargetStatus>,
}

impl CapabilityDecision {
    /// Enabled decision exposing `allowed_fields`, each under its own name.
    pub fn allow(allowed_fields: Vec<String>) -> Self {
        let field_payload_keys = allowed_fields
            .iter()
            .map(|field| (field.clone(), field.clone()))
            .collect();
        Self {
            enabled: true,
            allowed_fields,
            field_payload_keys,
            deny_reasons: Vec::new(),
            allowed_target_statuses: Vec::new(),
        }
    }

    /// Denied decision with the given reasons
    pub fn deny<I, S>(reasons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: false,
            deny_reasons: reasons.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_target_statuses(mut self, statuses: Vec<TargetStatus>) -> Self {
        self.allowed_target_statuses = statuses;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Strip field-level detail from a denied decision.
    pub fn fail_closed(mut self) -> Self {
        if !self.enabled {
            self.allowed_fields.clear();
            self.field_payload_keys.clear();
            self.allowed_target_statuses.clear();
        }
        self
    }

    /// True when the decision does not leak fields while denied.
    pub fn is_fail_closed(&self) -> bool {
        self.enabled
            || (self.allowed_fields.is_empty()
                && self.field_payload_keys.is_empty()
                && self.allowed_target_statuses.is_empty())
    }

    /// Move `reason` to the front of the deny reasons, inserting it if absent.
    pub fn lead_with_reason(&mut self, reason: &str) {
        self.deny_reasons.retain(|r| r != reason);
        self.deny_reasons.insert(0, reason.to_string());
    }
}

//! Request and response envelopes of the capability surfaces.

use chrono::NaiveDate;
use orgcap_types::{CapabilityDecision, OrgEventType, WriteIntent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Query of the mutation- and append-capabilities surfaces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilitiesQuery {
    #[serde(default)]
    pub org_code: Option<String>,
    #[serde(default)]
    pub effective_date: Option<String>,
}

impl CapabilitiesQuery {
    pub fn new(org_code: impl Into<String>, effective_date: impl Into<String>) -> Self {
        Self {
            org_code: Some(org_code.into()),
            effective_date: Some(effective_date.into()),
        }
    }
}

/// Query of the write-capabilities surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WriteCapabilitiesQuery {
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub org_code: Option<String>,
    #[serde(default)]
    pub effective_date: Option<String>,
    /// Required when `intent = correct`.
    #[serde(default)]
    pub target_effective_date: Option<String>,
}

impl WriteCapabilitiesQuery {
    pub fn new(intent: impl Into<String>, effective_date: impl Into<String>) -> Self {
        Self {
            intent: Some(intent.into()),
            effective_date: Some(effective_date.into()),
            ..Default::default()
        }
    }

    pub fn with_org_code(mut self, org_code: impl Into<String>) -> Self {
        self.org_code = Some(org_code.into());
        self
    }

    pub fn with_target_effective_date(mut self, date: impl Into<String>) -> Self {
        self.target_effective_date = Some(date.into());
        self
    }
}

/// Capability a decision was resolved under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyBinding {
    pub capability_key: String,
    pub effective_policy_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationDecisions {
    pub correct_event: CapabilityDecision,
    pub correct_status: CapabilityDecision,
    pub rescind_event: CapabilityDecision,
    pub rescind_org: CapabilityDecision,
}

impl MutationDecisions {
    /// The same denial for every action.
    pub(crate) fn all_denied(decision: CapabilityDecision) -> Self {
        Self {
            correct_event: decision.clone(),
            correct_status: decision.clone(),
            rescind_event: decision.clone(),
            rescind_org: decision,
        }
    }
}

/// Response of the mutation-capabilities surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationCapabilities {
    pub org_code: String,
    pub effective_date: NaiveDate,
    pub effective_target_event_type: Option<OrgEventType>,
    pub raw_target_event_type: Option<OrgEventType>,
    pub tree_initialized: bool,
    pub policy: PolicyBinding,
    pub capabilities: MutationDecisions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendDecisions {
    pub create: CapabilityDecision,
    /// Keyed by the event type the append would emit.
    pub event_update: BTreeMap<OrgEventType, CapabilityDecision>,
}

/// Response of the append-capabilities surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendCapabilities {
    pub org_code: String,
    pub effective_date: NaiveDate,
    pub tree_initialized: bool,
    pub create_policy: PolicyBinding,
    pub event_update_policy: PolicyBinding,
    pub capabilities: AppendDecisions,
}

/// Response of the write-capabilities surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteCapabilities {
    pub intent: WriteIntent,
    pub capability_key: String,
    /// Raw active version of `capability_key`, not the composed token.
    pub policy_version: String,
    pub effective_policy_version: String,
    pub tree_initialized: bool,
    #[serde(flatten)]
    pub decision: CapabilityDecision,
}

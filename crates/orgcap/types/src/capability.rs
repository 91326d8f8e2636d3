//! Capability definitions and per-tenant policy state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability governing org-unit creation.
pub const ORG_CREATE_CAPABILITY: &str = "org.orgunit_create.field_policy";
/// Capability governing appending a new effective-dated version.
pub const ORG_ADD_VERSION_CAPABILITY: &str = "org.orgunit_add_version.field_policy";
/// Capability governing inserting a historical version.
pub const ORG_INSERT_VERSION_CAPABILITY: &str = "org.orgunit_insert_version.field_policy";
/// Capability governing corrections of past events.
pub const ORG_CORRECT_CAPABILITY: &str = "org.orgunit_correct.field_policy";
/// Shared baseline field policy composed into every write intent.
pub const ORG_WRITE_BASELINE_CAPABILITY: &str = "org.orgunit_write.field_policy";

/// Seed policy version used when nothing else is known.
pub const BASELINE_POLICY_VERSION: &str = "2026-02-28";

/// Activation state of a capability policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationState {
    /// The active version is in force and nothing is staged.
    Active,
    /// A draft version is staged and awaiting activation.
    Draft,
}

impl ActivationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Draft => "draft",
        }
    }
}

impl fmt::Display for ActivationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable registry entry for a capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDefinition {
    pub capability_key: String,
    pub default_activation_state: ActivationState,
    pub baseline_policy_version: String,
}

impl CapabilityDefinition {
    /// Create an active definition seeded with `baseline_policy_version`.
    pub fn active(
        capability_key: impl Into<String>,
        baseline_policy_version: impl Into<String>,
    ) -> Self {
        Self {
            capability_key: capability_key.into(),
            default_activation_state: ActivationState::Active,
            baseline_policy_version: baseline_policy_version.into(),
        }
    }

    /// Override the default activation state
    pub fn with_activation_state(mut self, state: ActivationState) -> Self {
        self.default_activation_state = state;
        self
    }

    /// Seed state for a tenant that has never touched this capability.
    ///
    /// A blank baseline falls back to [`BASELINE_POLICY_VERSION`] so the
    /// active version is never empty.
    pub fn initial_state(&self) -> CapabilityPolicyState {
        let active = self.baseline_policy_version.trim();
        CapabilityPolicyState {
            capability_key: self.capability_key.clone(),
            activation_state: self.default_activation_state,
            active_policy_version: if active.is_empty() {
                BASELINE_POLICY_VERSION.to_string()
            } else {
                active.to_string()
            },
            draft_policy_version: String::new(),
            rollback_from_version: String::new(),
            activated_by: String::new(),
            activated_at: None,
        }
    }
}

/// Mutable activation state of one capability for one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityPolicyState {
    pub capability_key: String,
    pub activation_state: ActivationState,
    pub active_policy_version: String,
    #[serde(default)]
    pub draft_policy_version: String,
    #[serde(default)]
    pub rollback_from_version: String,
    /// Last actor that staged, activated or rolled back this capability.
    #[serde(default)]
    pub activated_by: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rfc3339_opt"
    )]
    pub activated_at: Option<DateTime<Utc>>,
}

impl CapabilityPolicyState {
    /// Whether a draft version is currently staged
    pub fn has_draft(&self) -> bool {
        !self.draft_policy_version.is_empty()
    }
}

/// RFC3339 with second precision and a `Z` suffix.
mod rfc3339_opt {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => DateTime::parse_from_rfc3339(s.trim())
                .map(|ts| Some(ts.with_timezone(&Utc)))
                .map_err(serde::de::Error::custom),
        }
    }
}

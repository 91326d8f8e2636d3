//! Policy resolver contracts.
//!
//! The allow/deny rule table is owned by the resolver implementation. The
//! orchestrator assembles facts, asks once per action, and wraps the answer.
//! Business denials come back as `enabled = false` with deny reasons; an
//! `Err` always means the resolver itself failed.

use crate::error::ResolverError;
use orgcap_types::{ActionKey, CapabilityDecision, TargetStatus, WriteIntent};
use serde::{Deserialize, Serialize};

/// Facts handed to a resolver. Unset facts were not gathered for the action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyFacts {
    pub can_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_initialized: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_already_exists: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_as_root: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_exists_as_of: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_status_as_of: Option<TargetStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_root: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_ext_field_keys: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rescind_org_deny_reasons: Option<Vec<String>>,
}

impl PolicyFacts {
    pub fn new(can_admin: bool) -> Self {
        Self {
            can_admin,
            ..Default::default()
        }
    }
}

/// Decides one action on an existing or prospective org.
pub trait PolicyResolver: Send + Sync {
    fn resolve(
        &self,
        action: &ActionKey,
        facts: &PolicyFacts,
    ) -> Result<CapabilityDecision, ResolverError>;
}

/// Decides a write intent for the write-capabilities surface.
pub trait WriteCapabilityResolver: Send + Sync {
    fn resolve(
        &self,
        intent: WriteIntent,
        facts: &PolicyFacts,
    ) -> Result<CapabilityDecision, ResolverError>;
}

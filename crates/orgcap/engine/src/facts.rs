//! Temporal fact provider contracts.
//!
//! Facts are answered by the org-unit stores. The engine only queries them;
//! implementations live with the storage layer.

use crate::error::FactError;
use async_trait::async_trait;
use chrono::NaiveDate;
use orgcap_types::OrgEventType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal org-unit id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrgId(pub i64);

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event in force for an org as of a date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationTargetEvent {
    /// Any event, rescinded or not, exists at or before the date.
    pub has_raw: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_event_type: Option<OrgEventType>,
    /// A non-rescinded event is in force at the date.
    pub has_effective: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_event_type: Option<OrgEventType>,
}

/// Which of the three target shapes a [`MutationTargetEvent`] is in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetEventState {
    /// A live event is in force.
    Effective(OrgEventType),
    /// Events exist but the one in force was rescinded.
    Rescinded,
    /// Nothing exists as of the date.
    Missing,
}

impl MutationTargetEvent {
    /// Target with a live event of type `event_type`
    pub fn effective(event_type: OrgEventType) -> Self {
        Self {
            has_raw: true,
            raw_event_type: Some(event_type.clone()),
            has_effective: true,
            effective_event_type: Some(event_type),
        }
    }

    /// Target whose only event at the date was rescinded
    pub fn rescinded(raw_event_type: OrgEventType) -> Self {
        Self {
            has_raw: true,
            raw_event_type: Some(raw_event_type),
            has_effective: false,
            effective_event_type: None,
        }
    }

    pub fn missing() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TargetEventState {
        if self.has_effective {
            let event_type = self
                .effective_event_type
                .clone()
                .unwrap_or_else(|| OrgEventType::Other(String::new()));
            TargetEventState::Effective(event_type)
        } else if self.has_raw {
            TargetEventState::Rescinded
        } else {
            TargetEventState::Missing
        }
    }
}

/// Tenant extension field enabled as of a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtFieldConfig {
    pub field_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ExtFieldConfig {
    pub fn new(field_key: impl Into<String>) -> Self {
        Self {
            field_key: field_key.into(),
            label: None,
        }
    }
}

/// Resolves org codes to internal ids.
#[async_trait]
pub trait OrgDirectory: Send + Sync {
    /// `FactError::NotFound` when no org carries `org_code`.
    async fn resolve_org_id(&self, tenant: &str, org_code: &str) -> Result<OrgId, FactError>;
}

/// Bitemporal facts about org units.
#[async_trait]
pub trait TemporalFacts: Send + Sync {
    /// Event in force for `org_id` as of `as_of`.
    async fn target_event(
        &self,
        tenant: &str,
        org_id: OrgId,
        as_of: NaiveDate,
    ) -> Result<MutationTargetEvent, FactError>;

    /// Whether the tenant's org tree has a root yet.
    async fn tree_initialized(&self, tenant: &str) -> Result<bool, FactError>;

    /// Extension fields the tenant has enabled as of `as_of`.
    async fn enabled_ext_fields(
        &self,
        tenant: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<ExtFieldConfig>, FactError>;

    /// Reasons that block rescinding the whole org, most decisive first.
    async fn rescind_org_deny_reasons(
        &self,
        tenant: &str,
        org_id: OrgId,
        as_of: NaiveDate,
    ) -> Result<Vec<String>, FactError>;

    async fn is_root(&self, tenant: &str, org_id: OrgId, as_of: NaiveDate)
        -> Result<bool, FactError>;
}

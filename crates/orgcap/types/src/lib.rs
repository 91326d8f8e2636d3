//! # orgcap-types
//!
//! Shared value types for the org-unit capability engine.
//!
//! Every mutation of an org unit (create, add/insert a version, correct or
//! rescind an event, rescind the org) is gated by a *capability*. A capability
//! is identified by a dotted key such as `org.orgunit_create.field_policy` and
//! carries a per-tenant policy version that operators can stage, activate and
//! roll back.
//!
//! ## Core Types
//!
//! - [`CapabilityDefinition`]: static registry entry with seed defaults
//! - [`CapabilityPolicyState`]: per-tenant activation state of one capability
//! - [`EffectivePolicyVersionParts`]: inputs of the composed version token
//! - [`CapabilityDecision`]: fail-closed allow/deny outcome of one action
//! - [`OrgEventType`], [`ActionKind`], [`WriteIntent`]: closed vocabularies

#![deny(unsafe_code)]

pub mod action;
pub mod capability;
pub mod decision;
pub mod error;
pub mod event;
pub mod version;

pub use action::{ActionKey, ActionKind, WriteIntent};
pub use capability::{
    ActivationState, CapabilityDefinition, CapabilityPolicyState, BASELINE_POLICY_VERSION,
    ORG_ADD_VERSION_CAPABILITY, ORG_CORRECT_CAPABILITY, ORG_CREATE_CAPABILITY,
    ORG_INSERT_VERSION_CAPABILITY, ORG_WRITE_BASELINE_CAPABILITY,
};
pub use decision::{deny_reason, CapabilityDecision};
pub use error::ActivationError;
pub use event::{OrgEventType, TargetStatus};
pub use version::EffectivePolicyVersionParts;

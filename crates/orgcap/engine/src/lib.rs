//! # orgcap-engine
//!
//! Capability decisions for org-unit mutations.
//!
//! [`CapabilityOrchestrator`] answers three questions for a caller:
//!
//! - which corrections / rescinds are allowed on the event in force
//!   ([`CapabilityOrchestrator::mutation_capabilities`])
//! - whether a new org may be created and which event types may be appended
//!   ([`CapabilityOrchestrator::append_capabilities`])
//! - whether a single write intent is allowed, and which policy version the
//!   client must echo back ([`CapabilityOrchestrator::write_capabilities`])
//!
//! Decisions are fail-closed: a denied decision never lists fields, payload
//! keys or target statuses. Storage is reached through the [`OrgDirectory`]
//! and [`TemporalFacts`] traits; the allow/deny rules live behind
//! [`PolicyResolver`] and [`WriteCapabilityResolver`].

#![deny(unsafe_code)]

pub mod error;
pub mod facts;
pub mod fields;
pub mod input;
pub mod orchestrator;
pub mod resolver;
pub mod response;

pub use error::{ApiError, FactError, ResolverError, Result};
pub use facts::{
    ExtFieldConfig, MutationTargetEvent, OrgDirectory, OrgId, TargetEventState, TemporalFacts,
};
pub use fields::{
    allowed_core_fields_for_target_event, enabled_ext_field_keys, is_valid_ext_field_key,
    FieldAllowList, EXT_PAYLOAD_PREFIX,
};
pub use input::normalize_org_code;
pub use orchestrator::{CallerContext, CapabilityOrchestrator};
pub use resolver::{PolicyFacts, PolicyResolver, WriteCapabilityResolver};
pub use response::{
    AppendCapabilities, AppendDecisions, CapabilitiesQuery, MutationCapabilities,
    MutationDecisions, PolicyBinding, WriteCapabilities, WriteCapabilitiesQuery,
};

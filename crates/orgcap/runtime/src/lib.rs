//! # orgcap-runtime
//!
//! Stateful half of the org-unit capability engine.
//!
//! - [`CapabilityRegistry`]: static table of capability definitions
//! - [`PolicyActivationRuntime`]: per-tenant draft → active → rollback state
//! - [`binder`]: write intent / form scope → capability key tables
//! - [`version`]: composed `epv1:` policy version tokens and the migration
//!   window acceptance check
//!
//! The runtime is an explicit instance. Build one per process (or per test)
//! and hand it to whatever needs it:
//!
//! ```rust
//! use orgcap_runtime::PolicyActivationRuntime;
//! use orgcap_types::ORG_CREATE_CAPABILITY;
//!
//! let runtime = PolicyActivationRuntime::builtin();
//! runtime.set_draft("t1", ORG_CREATE_CAPABILITY, "2026-03-10", "ops").unwrap();
//! let state = runtime.activate("t1", ORG_CREATE_CAPABILITY, "2026-03-10", "ops").unwrap();
//! assert_eq!(state.active_policy_version, "2026-03-10");
//!
//! let (token, _parts) = runtime.resolve_effective_policy_version("t1", ORG_CREATE_CAPABILITY);
//! assert!(token.starts_with("epv1:"));
//! ```

#![deny(unsafe_code)]

pub mod activation;
pub mod binder;
pub mod clock;
pub mod registry;
pub mod version;

pub use activation::PolicyActivationRuntime;
pub use binder::{
    baseline_capability_key_for_intent_capability, capability_key_for_scope,
    capability_key_for_write_intent, FORM_SCOPE,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use registry::CapabilityRegistry;
pub use version::{
    build_effective_policy_version, in_migration_window, is_policy_version_accepted,
    EFFECTIVE_POLICY_VERSION_PREFIX,
};

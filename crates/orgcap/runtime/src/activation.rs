//! Per-tenant policy activation state machine.
//!
//! Each (tenant, capability) pair holds an active version, an optional staged
//! draft, and the version displaced by the last activation or rollback.
//!
//! ```text
//!   set_draft(v)            activate(v == draft)
//! ┌──────────────┐      ┌──────────────────────────┐
//! │              ▼      │                          ▼
//! Active ───────► Draft ┘                        Active
//!   ▲                                              │
//!   └──────────── rollback(target | previous) ─────┘
//! ```
//!
//! State is materialized lazily from the registry defaults on first access
//! and lives as long as the runtime instance.

use crate::clock::{Clock, SystemClock};
use crate::registry::{normalize_capability_key, CapabilityRegistry};
use chrono::{DateTime, Utc};
use orgcap_types::{
    ActivationError, ActivationState, CapabilityDefinition, CapabilityPolicyState,
    BASELINE_POLICY_VERSION,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

type StateKey = (String, String);

/// Thread-safe activation state for every tenant and capability.
///
/// All writes go through one coarse lock over the whole map. Activation
/// changes are operator-driven and rare; reads dominate.
#[derive(Debug)]
pub struct PolicyActivationRuntime {
    registry: CapabilityRegistry,
    clock: Arc<dyn Clock>,
    states: RwLock<HashMap<StateKey, CapabilityPolicyState>>,
}

impl PolicyActivationRuntime {
    pub fn new(registry: CapabilityRegistry, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry,
            clock,
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Runtime over the builtin registry and the system clock.
    pub fn builtin() -> Self {
        Self::new(CapabilityRegistry::builtin(), Arc::new(SystemClock))
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Current state, materializing the registry default on first access.
    pub fn state(
        &self,
        tenant: &str,
        capability_key: &str,
    ) -> Result<CapabilityPolicyState, ActivationError> {
        let (key, definition) = self.resolve_key(tenant, capability_key)?;

        {
            let states = self.states.read().map_err(|_| ActivationError::LockPoisoned)?;
            if let Some(state) = states.get(&key) {
                return Ok(state.clone());
            }
        }

        let mut states = self.states.write().map_err(|_| ActivationError::LockPoisoned)?;
        let state = states.entry(key).or_insert_with(|| {
            debug!(
                tenant = %tenant.trim(),
                capability_key = %definition.capability_key,
                "Materialized default policy state"
            );
            definition.initial_state()
        });
        Ok(state.clone())
    }

    /// Stage `draft_version` for later activation.
    pub fn set_draft(
        &self,
        tenant: &str,
        capability_key: &str,
        draft_version: &str,
        operator: &str,
    ) -> Result<CapabilityPolicyState, ActivationError> {
        let (key, definition) = self.resolve_key(tenant, capability_key)?;
        let draft_version = required_version(draft_version)?;

        let mut states = self.states.write().map_err(|_| ActivationError::LockPoisoned)?;
        let state = states
            .entry(key)
            .or_insert_with(|| definition.initial_state());

        state.draft_policy_version = draft_version.to_string();
        state.activation_state = ActivationState::Draft;
        state.activated_by = operator.trim().to_string();

        info!(
            tenant = %tenant.trim(),
            capability_key = %state.capability_key,
            version = %draft_version,
            operator = %state.activated_by,
            "Policy draft staged"
        );
        Ok(state.clone())
    }

    /// Commit the staged draft. `target_version` must equal it exactly.
    pub fn activate(
        &self,
        tenant: &str,
        capability_key: &str,
        target_version: &str,
        operator: &str,
    ) -> Result<CapabilityPolicyState, ActivationError> {
        let (key, definition) = self.resolve_key(tenant, capability_key)?;
        let target_version = required_version(target_version)?;
        let now = self.clock.now();

        let mut states = self.states.write().map_err(|_| ActivationError::LockPoisoned)?;
        let state = states
            .entry(key)
            .or_insert_with(|| definition.initial_state());

        if !state.has_draft() || state.draft_policy_version != target_version {
            warn!(
                tenant = %tenant.trim(),
                capability_key = %state.capability_key,
                requested = %target_version,
                staged = %state.draft_policy_version,
                "Activation rejected: no matching draft"
            );
            return Err(ActivationError::PolicyDraftMissing {
                expected: state.draft_policy_version.clone(),
                requested: target_version.to_string(),
            });
        }

        commit_version(state, target_version, operator, now);
        info!(
            tenant = %tenant.trim(),
            capability_key = %state.capability_key,
            version = %state.active_policy_version,
            previous = %state.rollback_from_version,
            operator = %state.activated_by,
            "Policy activated"
        );
        Ok(state.clone())
    }

    /// Switch back to `target_version`, or to the version displaced by the
    /// last activation when `target_version` is blank.
    pub fn rollback(
        &self,
        tenant: &str,
        capability_key: &str,
        target_version: &str,
        operator: &str,
    ) -> Result<CapabilityPolicyState, ActivationError> {
        let (key, definition) = self.resolve_key(tenant, capability_key)?;
        let now = self.clock.now();

        let mut states = self.states.write().map_err(|_| ActivationError::LockPoisoned)?;
        let state = states
            .entry(key)
            .or_insert_with(|| definition.initial_state());

        let target = match target_version.trim() {
            "" => state.rollback_from_version.trim().to_string(),
            explicit => explicit.to_string(),
        };
        if target.is_empty() {
            warn!(
                tenant = %tenant.trim(),
                capability_key = %state.capability_key,
                "Rollback rejected: no previous version"
            );
            return Err(ActivationError::PolicyRollbackUnavailable);
        }

        commit_version(state, &target, operator, now);
        info!(
            tenant = %tenant.trim(),
            capability_key = %state.capability_key,
            version = %state.active_policy_version,
            previous = %state.rollback_from_version,
            operator = %state.activated_by,
            "Policy rolled back"
        );
        Ok(state.clone())
    }

    /// Active version, or the baseline sentinel if the lookup fails for any
    /// reason. Never errors.
    pub fn active_policy_version(&self, tenant: &str, capability_key: &str) -> String {
        match self.state(tenant, capability_key) {
            Ok(state) if !state.active_policy_version.trim().is_empty() => {
                state.active_policy_version
            }
            Ok(_) => BASELINE_POLICY_VERSION.to_string(),
            Err(err) => {
                debug!(
                    tenant = %tenant.trim(),
                    capability_key = %capability_key.trim(),
                    error = %err,
                    "Falling back to baseline policy version"
                );
                BASELINE_POLICY_VERSION.to_string()
            }
        }
    }

    /// Every materialized state for a tenant, sorted by capability key.
    pub fn tenant_states(&self, tenant: &str) -> Result<Vec<CapabilityPolicyState>, ActivationError> {
        let tenant = tenant.trim();
        if tenant.is_empty() {
            return Err(ActivationError::TenantMissing);
        }
        let states = self.states.read().map_err(|_| ActivationError::LockPoisoned)?;
        let mut out: Vec<_> = states
            .iter()
            .filter(|((t, _), _)| t == tenant)
            .map(|(_, state)| state.clone())
            .collect();
        out.sort_by(|a, b| a.capability_key.cmp(&b.capability_key));
        Ok(out)
    }

    /// Drop all materialized state.
    pub fn reset(&self) -> Result<(), ActivationError> {
        let mut states = self.states.write().map_err(|_| ActivationError::LockPoisoned)?;
        states.clear();
        Ok(())
    }

    fn resolve_key(
        &self,
        tenant: &str,
        capability_key: &str,
    ) -> Result<(StateKey, &CapabilityDefinition), ActivationError> {
        let definition = self.registry.definition(capability_key)?;
        let tenant = tenant.trim();
        if tenant.is_empty() {
            return Err(ActivationError::TenantMissing);
        }
        Ok((
            (tenant.to_string(), normalize_capability_key(capability_key)),
            definition,
        ))
    }
}

impl Default for PolicyActivationRuntime {
    fn default() -> Self {
        Self::builtin()
    }
}

fn required_version(raw: &str) -> Result<&str, ActivationError> {
    match raw.trim() {
        "" => Err(ActivationError::PolicyVersionRequired),
        version => Ok(version),
    }
}

/// Shared bookkeeping of activate and rollback.
fn commit_version(
    state: &mut CapabilityPolicyState,
    target: &str,
    operator: &str,
    now: DateTime<Utc>,
) {
    state.rollback_from_version = std::mem::take(&mut state.active_policy_version);
    state.active_policy_version = target.to_string();
    state.draft_policy_version.clear();
    state.activation_state = ActivationState::Active;
    state.activated_by = operator.trim().to_string();
    state.activated_at = Some(now);
}

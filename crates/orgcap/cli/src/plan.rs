//! Rollout plan execution against an in-process runtime.

use crate::config::{PlanAction, PlanStep};
use anyhow::{Context, Result};
use orgcap_runtime::PolicyActivationRuntime;
use orgcap_types::{CapabilityPolicyState, EffectivePolicyVersionParts};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;

/// Effective version of one capability for one tenant.
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveVersionReport {
    pub tenant: String,
    pub capability_key: String,
    pub active_policy_version: String,
    pub effective_policy_version: String,
    pub parts: EffectivePolicyVersionParts,
}

impl EffectiveVersionReport {
    pub fn resolve(runtime: &PolicyActivationRuntime, tenant: &str, capability_key: &str) -> Self {
        let (effective_policy_version, parts) =
            runtime.resolve_effective_policy_version(tenant, capability_key);
        Self {
            tenant: tenant.trim().to_string(),
            capability_key: parts.intent_capability_key.clone(),
            active_policy_version: parts.intent_policy_version.clone(),
            effective_policy_version,
            parts,
        }
    }
}

/// Outcome of a rollout plan.
#[derive(Debug, Clone, Serialize)]
pub struct RolloutReport {
    pub steps_applied: usize,
    pub states: Vec<CapabilityPolicyState>,
    pub effective_versions: Vec<EffectiveVersionReport>,
}

/// Apply `steps` in order. Stops at the first rejected step.
pub fn apply(runtime: &PolicyActivationRuntime, steps: &[PlanStep]) -> Result<()> {
    for (index, step) in steps.iter().enumerate() {
        let outcome = match step.action {
            PlanAction::Draft => {
                runtime.set_draft(&step.tenant, &step.capability_key, &step.version, &step.operator)
            }
            PlanAction::Activate => {
                runtime.activate(&step.tenant, &step.capability_key, &step.version, &step.operator)
            }
            PlanAction::Rollback => {
                runtime.rollback(&step.tenant, &step.capability_key, &step.version, &step.operator)
            }
        };
        let state = outcome.with_context(|| {
            format!(
                "plan step {} ({:?} {} for tenant {}) rejected",
                index + 1,
                step.action,
                step.capability_key,
                step.tenant
            )
        })?;
        info!(
            step = index + 1,
            tenant = %step.tenant,
            capability_key = %state.capability_key,
            active = %state.active_policy_version,
            draft = %state.draft_policy_version,
            "Plan step applied"
        );
    }
    Ok(())
}

/// Apply `steps` and report the resulting state of every tenant touched.
pub fn rollout(runtime: &PolicyActivationRuntime, steps: &[PlanStep]) -> Result<RolloutReport> {
    apply(runtime, steps)?;

    let tenants: BTreeSet<&str> = steps.iter().map(|s| s.tenant.trim()).collect();
    let mut states = Vec::new();
    let mut effective_versions = Vec::new();
    for tenant in tenants {
        states.extend(runtime.tenant_states(tenant)?);
        for definition in runtime.registry().definitions() {
            effective_versions.push(EffectiveVersionReport::resolve(
                runtime,
                tenant,
                &definition.capability_key,
            ));
        }
    }

    Ok(RolloutReport {
        steps_applied: steps.len(),
        states,
        effective_versions,
    })
}

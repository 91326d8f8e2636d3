//! Effective policy version tokens.
//!
//! An effective policy version identifies the exact combination of rules in
//! force for an intent capability: its own active version composed with the
//! active version of its baseline capability. Clients cache the token and
//! send it back with mutations so stale rule assumptions are detected.
//!
//! Token format: `epv1:` followed by the hex SHA-256 of the canonical JSON
//! encoding of [`EffectivePolicyVersionParts`] (fields trimmed, fixed order).

use crate::activation::PolicyActivationRuntime;
use crate::binder::baseline_capability_key_for_intent_capability;
use crate::registry::normalize_capability_key;
use chrono::{DateTime, NaiveDate, Utc};
use orgcap_types::{EffectivePolicyVersionParts, BASELINE_POLICY_VERSION};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Algorithm tag of the current token scheme.
pub const EFFECTIVE_POLICY_VERSION_PREFIX: &str = "epv1:";

/// First day (UTC, inclusive) on which intent-only tokens are still honored.
const MIGRATION_WINDOW_START: (i32, u32, u32) = (2026, 3, 1);
/// Last day (UTC, inclusive) on which intent-only tokens are still honored.
const MIGRATION_WINDOW_END: (i32, u32, u32) = (2026, 4, 30);

/// Compose the token for `parts`. Equal parts always give equal tokens.
pub fn build_effective_policy_version(parts: &EffectivePolicyVersionParts) -> String {
    let canonical = parts.trimmed();
    // Struct fields serialize in declaration order; a struct of strings
    // cannot fail to encode.
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    format!(
        "{}{}",
        EFFECTIVE_POLICY_VERSION_PREFIX,
        hex::encode(hasher.finalize())
    )
}

/// Whether `now` falls inside the intent-only token migration window.
pub fn in_migration_window(now: DateTime<Utc>) -> bool {
    let (Some(start), Some(end)) = (
        NaiveDate::from_ymd_opt(
            MIGRATION_WINDOW_START.0,
            MIGRATION_WINDOW_START.1,
            MIGRATION_WINDOW_START.2,
        ),
        NaiveDate::from_ymd_opt(
            MIGRATION_WINDOW_END.0,
            MIGRATION_WINDOW_END.1,
            MIGRATION_WINDOW_END.2,
        ),
    ) else {
        return false;
    };
    let today = now.date_naive();
    start <= today && today <= end
}

/// Validate a client's cached policy version against the current one.
///
/// The exact current token is always accepted. Inside the migration window
/// the bare intent version is also accepted, but only while the baseline
/// version is still blank for this tenant; once a baseline is in force old
/// tokens are rejected everywhere.
pub fn is_policy_version_accepted(
    request_version: &str,
    expected_effective_version: &str,
    parts: &EffectivePolicyVersionParts,
    now: DateTime<Utc>,
) -> bool {
    let request_version = request_version.trim();
    if request_version.is_empty() {
        return false;
    }
    if request_version == expected_effective_version.trim() {
        return true;
    }

    in_migration_window(now)
        && request_version == parts.intent_policy_version.trim()
        && !parts.has_baseline_version()
}

impl PolicyActivationRuntime {
    /// Effective version of `intent_capability_key` for `tenant`, together
    /// with the parts it was built from.
    pub fn resolve_effective_policy_version(
        &self,
        tenant: &str,
        intent_capability_key: &str,
    ) -> (String, EffectivePolicyVersionParts) {
        let intent_key = normalize_capability_key(intent_capability_key);
        let mut parts = EffectivePolicyVersionParts::intent_only(
            intent_key.clone(),
            self.active_policy_version(tenant, &intent_key),
        );

        if let Some(baseline_key) = baseline_capability_key_for_intent_capability(&intent_key) {
            parts.baseline_capability_key = baseline_key.to_string();
            if !self.registry().contains(baseline_key) {
                debug!(
                    tenant = %tenant.trim(),
                    capability_key = %baseline_key,
                    "Baseline capability not registered, composing intent version only"
                );
            } else {
                // Only an unregistered baseline may stay blank; a blank
                // baseline reopens the intent-only migration path.
                parts.baseline_policy_version = match self.state(tenant, baseline_key) {
                    Ok(state) => state.active_policy_version,
                    Err(err) => {
                        warn!(
                            tenant = %tenant.trim(),
                            capability_key = %baseline_key,
                            error = %err,
                            "Baseline policy state unavailable, using baseline sentinel"
                        );
                        BASELINE_POLICY_VERSION.to_string()
                    }
                };
            }
        }

        (build_effective_policy_version(&parts), parts)
    }

    /// Resolve the current effective version and check `request_version`
    /// against it. `now = None` uses the runtime clock.
    pub fn accepts_policy_version(
        &self,
        request_version: &str,
        tenant: &str,
        intent_capability_key: &str,
        now: Option<DateTime<Utc>>,
    ) -> bool {
        let (expected, parts) = self.resolve_effective_policy_version(tenant, intent_capability_key);
        let now = now.unwrap_or_else(|| self.clock().now());
        let accepted = is_policy_version_accepted(request_version, &expected, &parts, now);
        if !accepted {
            warn!(
                tenant = %tenant.trim(),
                capability_key = %parts.intent_capability_key,
                requested = %request_version.trim(),
                expected = %expected,
                "Policy version rejected"
            );
        }
        accepted
    }
}

//! Effective policy version parts.

use serde::{Deserialize, Serialize};

/// Inputs of an effective policy version token.
///
/// Field order is significant: it is the canonical serialization order used
/// when the token is hashed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EffectivePolicyVersionParts {
    pub intent_capability_key: String,
    pub intent_policy_version: String,
    /// Empty when the intent capability has no baseline dependency.
    #[serde(default)]
    pub baseline_capability_key: String,
    /// Empty when there is no baseline, or the baseline is not available yet.
    #[serde(default)]
    pub baseline_policy_version: String,
}

impl EffectivePolicyVersionParts {
    /// Parts for a capability without baseline composition
    pub fn intent_only(
        intent_capability_key: impl Into<String>,
        intent_policy_version: impl Into<String>,
    ) -> Self {
        Self {
            intent_capability_key: intent_capability_key.into(),
            intent_policy_version: intent_policy_version.into(),
            ..Default::default()
        }
    }

    /// Attach the baseline capability and its active version
    pub fn with_baseline(
        mut self,
        baseline_capability_key: impl Into<String>,
        baseline_policy_version: impl Into<String>,
    ) -> Self {
        self.baseline_capability_key = baseline_capability_key.into();
        self.baseline_policy_version = baseline_policy_version.into();
        self
    }

    /// Copy with every field trimmed.
    pub fn trimmed(&self) -> Self {
        Self {
            intent_capability_key: self.intent_capability_key.trim().to_string(),
            intent_policy_version: self.intent_policy_version.trim().to_string(),
            baseline_capability_key: self.baseline_capability_key.trim().to_string(),
            baseline_policy_version: self.baseline_policy_version.trim().to_string(),
        }
    }

    pub fn has_baseline_version(&self) -> bool {
        !self.baseline_policy_version.trim().is_empty()
    }
}

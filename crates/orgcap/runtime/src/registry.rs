//! Capability registry.

use orgcap_types::{
    ActivationError, CapabilityDefinition, BASELINE_POLICY_VERSION, ORG_ADD_VERSION_CAPABILITY,
    ORG_CORRECT_CAPABILITY, ORG_CREATE_CAPABILITY, ORG_INSERT_VERSION_CAPABILITY,
    ORG_WRITE_BASELINE_CAPABILITY,
};
use std::collections::HashMap;

/// Immutable lookup table of capability definitions, keyed by
/// normalized (trimmed, lower-case) capability key.
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    definitions: HashMap<String, CapabilityDefinition>,
}

impl CapabilityRegistry {
    /// Build a registry from explicit definitions. Later entries with the
    /// same key replace earlier ones.
    pub fn new(definitions: impl IntoIterator<Item = CapabilityDefinition>) -> Self {
        let definitions = definitions
            .into_iter()
            .map(|mut def| {
                def.capability_key = normalize_capability_key(&def.capability_key);
                (def.capability_key.clone(), def)
            })
            .collect();
        Self { definitions }
    }

    /// The org-unit write capabilities shipped with the engine.
    pub fn builtin() -> Self {
        Self::new(
            [
                ORG_CREATE_CAPABILITY,
                ORG_ADD_VERSION_CAPABILITY,
                ORG_INSERT_VERSION_CAPABILITY,
                ORG_CORRECT_CAPABILITY,
                ORG_WRITE_BASELINE_CAPABILITY,
            ]
            .into_iter()
            .map(|key| CapabilityDefinition::active(key, BASELINE_POLICY_VERSION)),
        )
    }

    /// Look up a definition.
    pub fn definition(&self, capability_key: &str) -> Result<&CapabilityDefinition, ActivationError> {
        let key = normalize_capability_key(capability_key);
        self.definitions
            .get(&key)
            .ok_or(ActivationError::CapabilityUnknown(key))
    }

    pub fn contains(&self, capability_key: &str) -> bool {
        self.definitions
            .contains_key(&normalize_capability_key(capability_key))
    }

    /// All definitions, sorted by key.
    pub fn definitions(&self) -> Vec<&CapabilityDefinition> {
        let mut defs: Vec<_> = self.definitions.values().collect();
        defs.sort_by(|a, b| a.capability_key.cmp(&b.capability_key));
        defs
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

pub(crate) fn normalize_capability_key(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgcap_types::ActivationState;

    #[test]
    fn builtin_registry_contains_write_capabilities() {
        let registry = CapabilityRegistry::builtin();
        assert_eq!(registry.definitions().len(), 5);

        let def = registry.definition(ORG_CREATE_CAPABILITY).unwrap();
        assert_eq!(def.default_activation_state, ActivationState::Active);
        assert_eq!(def.baseline_policy_version, BASELINE_POLICY_VERSION);
    }

    #[test]
    fn lookup_normalizes_key() {
        let registry = CapabilityRegistry::builtin();
        assert!(registry
            .definition("  ORG.OrgUnit_Correct.Field_Policy ")
            .is_ok());
    }

    #[test]
    fn unknown_key_is_an_error() {
        let registry = CapabilityRegistry::builtin();
        let err = registry.definition("org.unknown").unwrap_err();
        assert_eq!(err.code(), "CAPABILITY_UNKNOWN");
        assert!(!registry.contains("org.unknown"));
    }

    #[test]
    fn definitions_are_sorted() {
        let registry = CapabilityRegistry::builtin();
        let keys: Vec<_> = registry
            .definitions()
            .iter()
            .map(|d| d.capability_key.as_str())
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
}

//! Static bindings from write intents and UI scopes to capability keys.

use orgcap_types::{
    WriteIntent, ORG_ADD_VERSION_CAPABILITY, ORG_CORRECT_CAPABILITY, ORG_CREATE_CAPABILITY,
    ORG_INSERT_VERSION_CAPABILITY, ORG_WRITE_BASELINE_CAPABILITY,
};

/// The only scope type with bindings.
pub const FORM_SCOPE: &str = "FORM";

const FORM_BINDINGS: [(&str, &str); 4] = [
    ("orgunit.create_dialog", ORG_CREATE_CAPABILITY),
    ("orgunit.details.add_version_dialog", ORG_ADD_VERSION_CAPABILITY),
    ("orgunit.details.insert_version_dialog", ORG_INSERT_VERSION_CAPABILITY),
    ("orgunit.details.correct_dialog", ORG_CORRECT_CAPABILITY),
];

/// Capability key gating a write intent.
pub fn capability_key_for_write_intent(intent: WriteIntent) -> &'static str {
    match intent {
        WriteIntent::CreateOrg => ORG_CREATE_CAPABILITY,
        WriteIntent::AddVersion => ORG_ADD_VERSION_CAPABILITY,
        WriteIntent::InsertVersion => ORG_INSERT_VERSION_CAPABILITY,
        WriteIntent::Correct => ORG_CORRECT_CAPABILITY,
    }
}

/// Capability key for a UI scope, e.g. (`FORM`, `orgunit.create_dialog`).
pub fn capability_key_for_scope(scope_type: &str, scope_key: &str) -> Option<&'static str> {
    if scope_type.trim() != FORM_SCOPE {
        return None;
    }
    let scope_key = scope_key.trim();
    FORM_BINDINGS
        .iter()
        .find(|(key, _)| *key == scope_key)
        .map(|(_, capability)| *capability)
}

/// Shared baseline capability an intent capability composes with, if any.
pub fn baseline_capability_key_for_intent_capability(capability_key: &str) -> Option<&'static str> {
    match capability_key.trim().to_ascii_lowercase().as_str() {
        ORG_CREATE_CAPABILITY
        | ORG_ADD_VERSION_CAPABILITY
        | ORG_INSERT_VERSION_CAPABILITY
        | ORG_CORRECT_CAPABILITY
        | ORG_WRITE_BASELINE_CAPABILITY => Some(ORG_WRITE_BASELINE_CAPABILITY),
        _ => None,
    }
}

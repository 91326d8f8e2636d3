//! Field allow-lists for corrections.
//!
//! Which core fields a correction may carry depends on the event in force on
//! the target. Tenant extension fields are appended after the core fields and
//! travel under an `ext.` payload key.

use crate::facts::ExtFieldConfig;
use orgcap_types::{CapabilityDecision, OrgEventType};
use std::collections::BTreeMap;

pub const EXT_PAYLOAD_PREFIX: &str = "ext.";

const FIELD_KEY_MAX_LEN: usize = 64;

/// Core fields correctable on a target whose effective event is `event`,
/// sorted ascending.
pub fn allowed_core_fields_for_target_event(event: &OrgEventType) -> &'static [&'static str] {
    match event {
        OrgEventType::Create => &[
            "effective_date",
            "is_business_unit",
            "manager_pernr",
            "name",
            "parent_org_code",
        ],
        OrgEventType::Rename => &["effective_date", "name"],
        OrgEventType::Move => &["effective_date", "parent_org_code"],
        OrgEventType::SetBusinessUnit => &["effective_date", "is_business_unit"],
        OrgEventType::Disable | OrgEventType::Enable => &["effective_date"],
        OrgEventType::CorrectEvent
        | OrgEventType::CorrectStatus
        | OrgEventType::RescindEvent
        | OrgEventType::RescindOrg
        | OrgEventType::Other(_) => &["effective_date"],
    }
}

/// Whether `key` is a usable extension field key: lower-case ASCII letter
/// first, then `[a-z0-9_]`, at most 64 chars.
pub fn is_valid_ext_field_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }
    key.len() <= FIELD_KEY_MAX_LEN
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Extension field keys that pass the allow-list, sorted and deduplicated.
/// Blank or malformed keys are dropped silently.
pub fn enabled_ext_field_keys(configs: &[ExtFieldConfig]) -> Vec<String> {
    let mut keys: Vec<String> = configs
        .iter()
        .map(|c| c.field_key.trim())
        .filter(|k| is_valid_ext_field_key(k))
        .map(str::to_string)
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

/// Fields a caller may supply and the payload key for each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldAllowList {
    pub fields: Vec<String>,
    pub payload_keys: BTreeMap<String, String>,
}

impl FieldAllowList {
    /// Core fields for the given target event, each under its own name.
    pub fn for_target_event(event: &OrgEventType) -> Self {
        let fields: Vec<String> = allowed_core_fields_for_target_event(event)
            .iter()
            .map(|f| f.to_string())
            .collect();
        let payload_keys = fields.iter().map(|f| (f.clone(), f.clone())).collect();
        Self {
            fields,
            payload_keys,
        }
    }

    /// Append enabled extension fields. Keys that collide with a field
    /// already present are skipped.
    pub fn with_ext_fields(mut self, configs: &[ExtFieldConfig]) -> Self {
        for key in enabled_ext_field_keys(configs) {
            if self.payload_keys.contains_key(&key) {
                continue;
            }
            self.payload_keys
                .insert(key.clone(), format!("{EXT_PAYLOAD_PREFIX}{key}"));
            self.fields.push(key);
        }
        self
    }

    /// Extension field keys that made it into the list, in list order.
    pub fn ext_field_keys(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| {
                self.payload_keys
                    .get(*f)
                    .is_some_and(|p| p.starts_with(EXT_PAYLOAD_PREFIX))
            })
            .cloned()
            .collect()
    }

    /// Decision carrying these fields when `enabled`; fail-closed otherwise.
    pub fn into_decision(self, enabled: bool, deny_reasons: Vec<String>) -> CapabilityDecision {
        CapabilityDecision {
            enabled,
            allowed_fields: self.fields,
            field_payload_keys: self.payload_keys,
            deny_reasons,
            allowed_target_statuses: Vec::new(),
        }
        .fail_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(event: &str) -> Vec<&'static str> {
        let event = OrgEventType::parse(event).unwrap();
        allowed_core_fields_for_target_event(&event).to_vec()
    }

    #[test]
    fn core_field_table() {
        assert_eq!(
            fields("CREATE"),
            vec![
                "effective_date",
                "is_business_unit",
                "manager_pernr",
                "name",
                "parent_org_code"
            ]
        );
        assert_eq!(fields("RENAME"), vec!["effective_date", "name"]);
        assert_eq!(fields("MOVE"), vec!["effective_date", "parent_org_code"]);
        assert_eq!(
            fields("SET_BUSINESS_UNIT"),
            vec!["effective_date", "is_business_unit"]
        );
        assert_eq!(fields("DISABLE"), vec!["effective_date"]);
        assert_eq!(fields("ENABLE"), vec!["effective_date"]);
        assert_eq!(fields("UNKNOWN"), vec!["effective_date"]);
    }

    #[test]
    fn core_fields_are_sorted() {
        for event in ["CREATE", "RENAME", "MOVE", "SET_BUSINESS_UNIT"] {
            let f = fields(event);
            let mut sorted = f.clone();
            sorted.sort();
            assert_eq!(f, sorted);
        }
    }

    #[test]
    fn ext_key_validation() {
        assert!(is_valid_ext_field_key("cost_center"));
        assert!(is_valid_ext_field_key("x1"));
        assert!(!is_valid_ext_field_key(""));
        assert!(!is_valid_ext_field_key("1abc"));
        assert!(!is_valid_ext_field_key("Cost"));
        assert!(!is_valid_ext_field_key("cost-center"));
        assert!(!is_valid_ext_field_key(&"a".repeat(65)));
    }

    #[test]
    fn ext_fields_are_merged_with_prefixed_payload_keys() {
        let configs = vec![
            ExtFieldConfig::new("region"),
            ExtFieldConfig::new("   "),
            ExtFieldConfig::new(" cost_center "),
            ExtFieldConfig::new("region"),
            ExtFieldConfig::new("name"),
            ExtFieldConfig::new("Bad Key"),
        ];
        let list = FieldAllowList::for_target_event(&OrgEventType::Rename).with_ext_fields(&configs);

        assert_eq!(
            list.fields,
            vec!["effective_date", "name", "cost_center", "region"]
        );
        assert_eq!(list.payload_keys["cost_center"], "ext.cost_center");
        assert_eq!(list.payload_keys["region"], "ext.region");
        assert_eq!(list.payload_keys["name"], "name");
        assert_eq!(list.ext_field_keys(), vec!["cost_center", "region"]);
    }

    #[test]
    fn denied_decision_drops_fields() {
        let list = FieldAllowList::for_target_event(&OrgEventType::Create)
            .with_ext_fields(&[ExtFieldConfig::new("region")]);
        let decision = list.into_decision(false, vec!["FORBIDDEN".into()]);
        assert!(decision.allowed_fields.is_empty());
        assert!(decision.field_payload_keys.is_empty());
        assert_eq!(decision.deny_reasons, vec!["FORBIDDEN".to_string()]);
    }
}

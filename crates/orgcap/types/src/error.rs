use thiserror::Error;

/// Errors from policy activation operations.
///
/// All of these are local validation failures and are safe to retry after
/// correcting the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActivationError {
    #[error("capability unknown: {0}")]
    CapabilityUnknown(String),

    #[error("tenant id is required")]
    TenantMissing,

    #[error("policy version is required")]
    PolicyVersionRequired,

    #[error("no staged draft matches {requested:?} (staged: {expected:?})")]
    PolicyDraftMissing { expected: String, requested: String },

    #[error("no version available to roll back to")]
    PolicyRollbackUnavailable,

    #[error("policy state lock poisoned")]
    LockPoisoned,
}

impl ActivationError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::CapabilityUnknown(_) => "CAPABILITY_UNKNOWN",
            Self::TenantMissing => "TENANT_MISSING",
            Self::PolicyVersionRequired => "POLICY_VERSION_REQUIRED",
            Self::PolicyDraftMissing { .. } => "POLICY_DRAFT_MISSING",
            Self::PolicyRollbackUnavailable => "POLICY_ROLLBACK_UNAVAILABLE",
            Self::LockPoisoned => "POLICY_STATE_UNAVAILABLE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            ActivationError::CapabilityUnknown("x".into()).code(),
            "CAPABILITY_UNKNOWN"
        );
        assert_eq!(
            ActivationError::PolicyDraftMissing {
                expected: String::new(),
                requested: "v2".into()
            }
            .code(),
            "POLICY_DRAFT_MISSING"
        );
        assert!(ActivationError::CapabilityUnknown("org.x".into())
            .to_string()
            .contains("org.x"));
    }
}

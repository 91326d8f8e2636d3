use orgcap_types::ActivationError;
use std::fmt::Display;
use thiserror::Error;
use tracing::error;

/// Errors returned by the capability surfaces.
///
/// Server-side failures are opaque: `Internal` keeps only a stable code and
/// the underlying error is logged where it is raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("org code is invalid")]
    OrgCodeInvalid,

    #[error("effective date is invalid")]
    EffectiveDateInvalid,

    #[error("target effective date is invalid")]
    TargetEffectiveDateInvalid,

    #[error("write intent not supported: {0}")]
    IntentNotSupported(String),

    #[error("org code not found")]
    OrgCodeNotFound,

    #[error("forbidden")]
    Forbidden,

    #[error("policy version is required")]
    PolicyVersionRequired,

    #[error("policy version is stale")]
    PolicyVersionStale,

    #[error("policy activation failed: {0}")]
    Activation(#[from] ActivationError),

    #[error("internal error ({code})")]
    Internal { code: &'static str },
}

impl ApiError {
    /// HTTP-equivalent status.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_)
            | Self::OrgCodeInvalid
            | Self::EffectiveDateInvalid
            | Self::TargetEffectiveDateInvalid
            | Self::IntentNotSupported(_)
            | Self::PolicyVersionRequired => 400,
            Self::Forbidden => 403,
            Self::OrgCodeNotFound => 404,
            Self::PolicyVersionStale => 409,
            Self::Activation(ActivationError::LockPoisoned) => 500,
            Self::Activation(_) => 400,
            Self::Internal { .. } => 500,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::OrgCodeInvalid => "org_code_invalid",
            Self::EffectiveDateInvalid => "effective_date_invalid",
            Self::TargetEffectiveDateInvalid => "target_effective_date_invalid",
            Self::IntentNotSupported(_) => "ORG_INTENT_NOT_SUPPORTED",
            Self::OrgCodeNotFound => "org_code_not_found",
            Self::Forbidden => "FORBIDDEN",
            Self::PolicyVersionRequired => "policy_version_required",
            Self::PolicyVersionStale => "policy_version_stale",
            Self::Activation(err) => err.code(),
            Self::Internal { code } => code,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status() >= 500
    }

    /// Log `source` and return an opaque internal error carrying `code`.
    pub(crate) fn internal(code: &'static str, source: &dyn Display) -> Self {
        error!(code, error = %source, "Capability resolution failed");
        Self::Internal { code }
    }
}

/// Errors from fact providers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FactError {
    #[error("not found")]
    NotFound,

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("store error: {0}")]
    Store(String),
}

/// Infrastructure failure inside a policy resolver. Never used for denials.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("policy resolver failed: {0}")]
pub struct ResolverError(pub String);

pub type Result<T> = std::result::Result<T, ApiError>;

//! Request input normalization.

use crate::error::ApiError;
use chrono::NaiveDate;

const ORG_CODE_MAX_LEN: usize = 64;

/// Normalize an org code: trimmed, upper-case, 1-64 chars of `[A-Z0-9_-]`.
pub fn normalize_org_code(raw: &str) -> Result<String, ApiError> {
    let code = raw.trim().to_ascii_uppercase();
    if code.is_empty()
        || code.len() > ORG_CODE_MAX_LEN
        || !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ApiError::OrgCodeInvalid);
    }
    Ok(code)
}

/// Value of a required parameter, or `invalid_request` naming it.
pub fn required<'a>(name: &str, value: Option<&'a str>) -> Result<&'a str, ApiError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::InvalidRequest(format!("{name} is required"))),
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

pub fn parse_effective_date(raw: &str) -> Result<NaiveDate, ApiError> {
    parse_date(raw).ok_or(ApiError::EffectiveDateInvalid)
}

pub fn parse_target_effective_date(raw: &str) -> Result<NaiveDate, ApiError> {
    parse_date(raw).ok_or(ApiError::TargetEffectiveDateInvalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn org_code_is_normalized() {
        assert_eq!(normalize_org_code(" a001 ").unwrap(), "A001");
        assert_eq!(normalize_org_code("hq-east_2").unwrap(), "HQ-EAST_2");
    }

    #[test]
    fn bad_org_codes_are_rejected() {
        for raw in ["", "   ", "A 001", "A/1", "Ä1"] {
            assert_eq!(normalize_org_code(raw), Err(ApiError::OrgCodeInvalid), "{raw:?}");
        }
        assert!(normalize_org_code(&"A".repeat(65)).is_err());
        assert!(normalize_org_code(&"A".repeat(64)).is_ok());
    }

    #[test]
    fn dates_parse_as_calendar_dates() {
        assert_eq!(
            parse_effective_date("2026-01-01").unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
        );
        assert_eq!(
            parse_effective_date("2026-02-30"),
            Err(ApiError::EffectiveDateInvalid)
        );
        assert_eq!(
            parse_target_effective_date("01/02/2026"),
            Err(ApiError::TargetEffectiveDateInvalid)
        );
    }

    #[test]
    fn required_rejects_blank() {
        assert_eq!(required("org_code", Some(" A1 ")).unwrap(), "A1");
        assert_eq!(
            required("org_code", Some("  ")).unwrap_err().code(),
            "invalid_request"
        );
        assert!(required("effective_date", None).is_err());
    }
}

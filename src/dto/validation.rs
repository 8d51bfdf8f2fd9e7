//! Validation helpers for request DTOs.

use validator::ValidationError;

/// Validates a retry-request reason against the configured minimum length.
///
/// Rejected locally before any persistence call; whitespace padding does
/// not count towards the minimum.
pub fn validate_retry_reason(reason: &str, min_len: usize) -> Result<(), ValidationError> {
    if reason.trim().chars().count() < min_len {
        let mut err = ValidationError::new("retry_reason_length");
        err.message = Some(
            format!(
                "Retry reason must be at least {min_len} characters (got {})",
                reason.trim().chars().count()
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Validates a contest extension duration in minutes.
///
/// Zero, negative (unrepresentable here) and excessive values are refused;
/// the upper bound comes from configuration.
pub fn validate_extension_minutes(minutes: u64, max_minutes: u64) -> Result<(), ValidationError> {
    if minutes == 0 {
        let mut err = ValidationError::new("extension_zero");
        err.message = Some("Extension must be a positive number of minutes".into());
        return Err(err);
    }

    if minutes > max_minutes {
        let mut err = ValidationError::new("extension_too_large");
        err.message = Some(
            format!("Extension of {minutes} minutes exceeds the allowed maximum of {max_minutes}")
                .into(),
        );
        return Err(err);
    }

    Ok(())
}

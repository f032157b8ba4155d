//! Validation helpers for DTOs.

use validator::ValidationError;

/// Shortest accepted session code.
pub const MIN_CODE_LENGTH: usize = 4;
/// Longest accepted session code.
pub const MAX_CODE_LENGTH: usize = 6;

/// Validates that a session code is 4 to 6 ASCII letters or digits (any case).
///
/// # Examples
///
/// ```ignore
/// validate_session_code("ab12")    // Ok
/// validate_session_code("ABC")     // Err - too short
/// validate_session_code("AB-12")   // Err - punctuation
/// ```
pub fn validate_session_code(code: &str) -> Result<(), ValidationError> {
    let code = code.trim();
    if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&code.len()) {
        let mut err = ValidationError::new("session_code_length");
        err.message = Some(
            format!(
                "Session code must be {MIN_CODE_LENGTH} to {MAX_CODE_LENGTH} characters (got {})",
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("session_code_format");
        err.message = Some("Session code must contain only letters and digits".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a name is not blank once trimmed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_session_code_valid() {
        assert!(validate_session_code("ABCD").is_ok());
        assert!(validate_session_code("ab12").is_ok());
        assert!(validate_session_code("XYZ789").is_ok());
        assert!(validate_session_code(" QWER ").is_ok());
    }

    #[test]
    fn test_validate_session_code_invalid_length() {
        assert!(validate_session_code("ABC").is_err());
        assert!(validate_session_code("ABCDEFG").is_err());
        assert!(validate_session_code("").is_err());
    }

    #[test]
    fn test_validate_session_code_invalid_format() {
        assert!(validate_session_code("AB-1").is_err());
        assert!(validate_session_code("AB 12").is_err());
        assert!(validate_session_code("ÄBCD").is_err());
    }

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("Ann").is_ok());
        assert!(validate_not_blank("   ").is_err());
    }
}

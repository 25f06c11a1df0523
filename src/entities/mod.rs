// Entity Models - patients and doctors
//
// Each entity has:
// - Dense identity (1-based insertion position) that NEVER changes
// - Plain values owned by the EntityStore
// - Text fields bounded by the fixed width of the data file

pub mod doctor;
pub mod patient;

pub use doctor::{Doctor, DoctorId};
pub use patient::{Patient, PatientId, MAX_APPOINTMENTS};

use crate::error::{ClinicError, Result};

/// Widest text field in bytes (fixed width of every text column on disk)
pub const MAX_TEXT_LEN: usize = 100;

/// Normalize a free-text field: trimmed, non-empty, NUL-free, at most
/// `MAX_TEXT_LEN` bytes of UTF-8.
pub fn validate_text(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ClinicError::invalid(field, "must not be empty"));
    }
    if trimmed.contains('\0') {
        return Err(ClinicError::invalid(field, "must not contain NUL bytes"));
    }
    if trimmed.len() > MAX_TEXT_LEN {
        return Err(ClinicError::invalid(
            field,
            format!("longer than {} bytes", MAX_TEXT_LEN),
        ));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_text_trims() {
        assert_eq!(validate_text("name", "  Ada Lovelace \n").unwrap(), "Ada Lovelace");
    }

    #[test]
    fn test_validate_text_rejects_blank() {
        let err = validate_text("name", "   ").unwrap_err();
        assert!(matches!(err, ClinicError::InvalidInput { field: "name", .. }));
    }

    #[test]
    fn test_validate_text_length_is_bytes() {
        // 50 two-byte chars = exactly 100 bytes
        let at_limit = "é".repeat(50);
        assert!(validate_text("name", &at_limit).is_ok());

        let over = "é".repeat(51);
        assert!(validate_text("name", &over).is_err());
    }

    #[test]
    fn test_validate_text_rejects_nul() {
        assert!(validate_text("time", "10:00\0am").is_err());
    }
}

// ⚠️ Clinic error types
// Every failure here is recoverable: the menu reports it and keeps looping.

use std::path::PathBuf;

use thiserror::Error;

use crate::entities::{DoctorId, PatientId};

#[derive(Debug, Error)]
pub enum ClinicError {
    /// Patient or doctor table is full
    #[error("maximum {entity} limit reached ({capacity})")]
    CapacityExceeded {
        entity: &'static str,
        capacity: usize,
    },

    #[error("patient {0} not found")]
    PatientNotFound(PatientId),

    #[error("doctor {0} not found")]
    DoctorNotFound(DoctorId),

    #[error("maximum appointment limit reached for this patient ({0})")]
    AppointmentLimitExceeded(usize),

    #[error("no appointments to delete for this patient")]
    EmptyList,

    /// 1-based index outside `[1, count]`
    #[error("invalid appointment index {index} (expected 1 to {count})")]
    InvalidIndex { index: usize, count: usize },

    #[error("room {room} already allocated to this patient")]
    AlreadyAllocated { room: i32 },

    #[error("doctor {doctor} already assigned to this patient")]
    AlreadyAssigned { doctor: String },

    #[error("invalid input for {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt data file: {0}")]
    CorruptData(String),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),
}

impl ClinicError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ClinicError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ClinicError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for lookups that failed on an unknown id
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ClinicError::PatientNotFound(_) | ClinicError::DoctorNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ClinicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ClinicError::CapacityExceeded {
            entity: "patient",
            capacity: 100,
        };
        assert_eq!(err.to_string(), "maximum patient limit reached (100)");

        let err = ClinicError::InvalidIndex { index: 4, count: 2 };
        assert_eq!(
            err.to_string(),
            "invalid appointment index 4 (expected 1 to 2)"
        );

        let err = ClinicError::invalid("age", "must be a positive integer");
        assert_eq!(
            err.to_string(),
            "invalid input for age: must be a positive integer"
        );
    }

    #[test]
    fn test_not_found_classification() {
        assert!(ClinicError::PatientNotFound(PatientId(3)).is_not_found());
        assert!(ClinicError::DoctorNotFound(DoctorId(1)).is_not_found());
        assert!(!ClinicError::EmptyList.is_not_found());
    }
}

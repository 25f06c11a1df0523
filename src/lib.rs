// Clinic Records - Core Library
// Exposes all modules for use in the menu binary and tests

pub mod config;
pub mod entities;
pub mod error;
pub mod menu;
pub mod persistence;
pub mod records;
pub mod reporting;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use entities::{Doctor, DoctorId, Patient, PatientId, MAX_APPOINTMENTS, MAX_TEXT_LEN};
pub use error::{ClinicError, Result};
pub use menu::{Choice, Menu};
pub use persistence::{FileSummary, PersistOptions};
pub use reporting::{PatientInfo, Statistics};
pub use store::{EntityStore, MAX_DOCTORS, MAX_PATIENTS};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

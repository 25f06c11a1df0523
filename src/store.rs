// 🗂️ Entity Store - every patient and doctor known to this run
//
// Fixed capacity tables with dense ids: the record with id N lives at
// index N - 1. Records are appended, never removed, so ids are never reused.

use serde::Serialize;
use tracing::{debug, info};

use crate::entities::{validate_text, Doctor, DoctorId, Patient, PatientId};
use crate::error::{ClinicError, Result};

pub const MAX_PATIENTS: usize = 100;
pub const MAX_DOCTORS: usize = 20;

// ============================================================================
// ENTITY STORE
// ============================================================================

/// Single owner of all clinic records.
///
/// There is exactly one writer: whoever holds `&mut EntityStore`.
#[derive(Debug, Default, Clone, Serialize)]
pub struct EntityStore {
    patients: Vec<Patient>,
    doctors: Vec<Doctor>,
}

impl EntityStore {
    pub fn new() -> Self {
        EntityStore {
            patients: Vec::with_capacity(MAX_PATIENTS),
            doctors: Vec::with_capacity(MAX_DOCTORS),
        }
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Register a patient and return its new id (`count + 1`).
    ///
    /// Age must be positive; nothing is created when it is not.
    pub fn register_patient(&mut self, name: &str, age: i64) -> Result<PatientId> {
        if self.patients.len() >= MAX_PATIENTS {
            return Err(ClinicError::CapacityExceeded {
                entity: "patient",
                capacity: MAX_PATIENTS,
            });
        }

        let age = u32::try_from(age)
            .ok()
            .filter(|age| *age > 0 && *age <= i32::MAX as u32)
            .ok_or_else(|| ClinicError::invalid("age", "must be a positive integer"))?;
        let name = validate_text("name", name)?;

        let id = PatientId(self.patients.len() as u32 + 1);
        self.patients.push(Patient::new(id, name, age));

        info!(patient_id = %id, "patient registered");
        Ok(id)
    }

    /// Register a doctor and return its new id (`count + 1`).
    pub fn register_doctor(&mut self, name: &str, specialty: &str) -> Result<DoctorId> {
        if self.doctors.len() >= MAX_DOCTORS {
            return Err(ClinicError::CapacityExceeded {
                entity: "doctor",
                capacity: MAX_DOCTORS,
            });
        }

        let name = validate_text("name", name)?;
        let specialty = validate_text("specialty", specialty)?;

        let id = DoctorId(self.doctors.len() as u32 + 1);
        self.doctors.push(Doctor::new(id, name, specialty));

        info!(doctor_id = %id, "doctor registered");
        Ok(id)
    }

    // ------------------------------------------------------------------------
    // Lookup (O(1), dense ids)
    // ------------------------------------------------------------------------

    pub fn find_patient(&self, id: PatientId) -> Result<&Patient> {
        id.index()
            .and_then(|i| self.patients.get(i))
            .ok_or(ClinicError::PatientNotFound(id))
    }

    pub fn find_patient_mut(&mut self, id: PatientId) -> Result<&mut Patient> {
        id.index()
            .and_then(|i| self.patients.get_mut(i))
            .ok_or(ClinicError::PatientNotFound(id))
    }

    pub fn find_doctor(&self, id: DoctorId) -> Result<&Doctor> {
        id.index()
            .and_then(|i| self.doctors.get(i))
            .ok_or(ClinicError::DoctorNotFound(id))
    }

    // ------------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------------

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn doctors(&self) -> &[Doctor] {
        &self.doctors
    }

    pub fn patient_count(&self) -> usize {
        self.patients.len()
    }

    pub fn doctor_count(&self) -> usize {
        self.doctors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty() && self.doctors.is_empty()
    }

    /// Swap in a freshly loaded patient table.
    ///
    /// The table must fit the capacity and keep ids dense; otherwise the
    /// store is left as it was.
    pub fn replace_patients(&mut self, patients: Vec<Patient>) -> Result<()> {
        if patients.len() > MAX_PATIENTS {
            return Err(ClinicError::CapacityExceeded {
                entity: "patient",
                capacity: MAX_PATIENTS,
            });
        }

        if let Some((pos, p)) = patients
            .iter()
            .enumerate()
            .find(|(pos, p)| p.id().index() != Some(*pos))
        {
            return Err(ClinicError::CorruptData(format!(
                "patient at position {} has id {}, expected {}",
                pos + 1,
                p.id(),
                pos + 1
            )));
        }

        debug!(count = patients.len(), "patient table replaced");
        self.patients = patients;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

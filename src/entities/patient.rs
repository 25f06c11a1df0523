// 🧑‍⚕️ Patient Entity - the unit the clinic tracks and persists
//
// Identity: dense id assigned at registration (count + 1), never reused.
// Values: bill, room, doctor snapshot and appointments change through the
// record operations in `crate::records`.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::doctor::Doctor;

/// Appointment slots per patient
pub const MAX_APPOINTMENTS: usize = 10;

/// Dense patient identity: 1-based position in the patient table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(pub u32);

impl PatientId {
    /// Table index for this id, `None` for the invalid id 0
    pub fn index(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ROOM ALLOCATION
// ============================================================================

/// Room number plus the free-text time it was booked for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomAllocation {
    pub room: i32,
    pub time: String,
}

// ============================================================================
// PATIENT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub(crate) id: PatientId,
    pub(crate) name: String,
    pub(crate) age: u32,

    /// Insertion-ordered, never longer than `MAX_APPOINTMENTS`
    pub(crate) appointments: Vec<String>,

    /// Only ever grows
    pub(crate) total_bill: f64,

    pub(crate) room: Option<RoomAllocation>,

    /// Snapshot taken at assignment time, not a link into the doctor table
    pub(crate) assigned_doctor: Option<Doctor>,
}

impl Patient {
    /// Fresh patient: no appointments, zero bill, no room, no doctor
    pub fn new(id: PatientId, name: String, age: u32) -> Self {
        Patient {
            id,
            name,
            age,
            appointments: Vec::with_capacity(MAX_APPOINTMENTS),
            total_bill: 0.0,
            room: None,
            assigned_doctor: None,
        }
    }

    pub fn id(&self) -> PatientId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn total_bill(&self) -> f64 {
        self.total_bill
    }

    pub fn appointments(&self) -> &[String] {
        &self.appointments
    }

    pub fn appointment_count(&self) -> usize {
        self.appointments.len()
    }

    pub fn room(&self) -> Option<&RoomAllocation> {
        self.room.as_ref()
    }

    pub fn allocated_room(&self) -> Option<i32> {
        self.room.as_ref().map(|r| r.room)
    }

    /// Empty when no room is allocated
    pub fn allocated_time(&self) -> &str {
        self.room.as_ref().map(|r| r.time.as_str()).unwrap_or("")
    }

    pub fn assigned_doctor(&self) -> Option<&Doctor> {
        self.assigned_doctor.as_ref()
    }

    pub fn has_room(&self) -> bool {
        self.room.is_some()
    }

    pub fn has_doctor(&self) -> bool {
        self.assigned_doctor.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::DoctorId;

    #[test]
    fn test_patient_creation() {
        let patient = Patient::new(PatientId(1), "Jane Doe".to_string(), 34);

        assert_eq!(patient.id(), PatientId(1));
        assert_eq!(patient.name(), "Jane Doe");
        assert_eq!(patient.age(), 34);
        assert_eq!(patient.total_bill(), 0.0);
        assert_eq!(patient.appointment_count(), 0);
        assert!(!patient.has_room());
        assert!(!patient.has_doctor());
        assert_eq!(patient.allocated_room(), None);
        assert_eq!(patient.allocated_time(), "");
    }

    #[test]
    fn test_patient_id_index() {
        assert_eq!(PatientId(1).index(), Some(0));
        assert_eq!(PatientId(0).index(), None);
    }

    #[test]
    fn test_doctor_snapshot_is_independent_copy() {
        let mut doctor = Doctor::new(DoctorId(1), "Dr. Grey".to_string(), "Surgery".to_string());
        let mut patient = Patient::new(PatientId(1), "John".to_string(), 40);
        patient.assigned_doctor = Some(doctor.clone());

        // Changing the source record does not reach the patient's copy
        doctor.specialty = "Cardiology".to_string();

        assert_eq!(patient.assigned_doctor().unwrap().specialty, "Surgery");
    }
}

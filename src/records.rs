// 📋 Record Operations - mutations on a located patient
//
// Appointments, billing, room allocation and doctor assignment. Every
// operation either applies completely or leaves the patient untouched.

use tracing::{debug, info};

use crate::entities::patient::RoomAllocation;
use crate::entities::{validate_text, Doctor, DoctorId, Patient, PatientId, MAX_APPOINTMENTS};
use crate::error::{ClinicError, Result};
use crate::store::EntityStore;

/// Room number reserved on disk for "no room"
pub const NO_ROOM: i32 = -1;

// ============================================================================
// PATIENT OPERATIONS
// ============================================================================

impl Patient {
    /// Append an appointment; insertion order is display order.
    pub fn schedule_appointment(&mut self, details: &str) -> Result<usize> {
        if self.appointments.len() >= MAX_APPOINTMENTS {
            return Err(ClinicError::AppointmentLimitExceeded(MAX_APPOINTMENTS));
        }

        let details = validate_text("appointment details", details)?;
        self.appointments.push(details);

        debug!(patient_id = %self.id, count = self.appointments.len(), "appointment scheduled");
        Ok(self.appointments.len())
    }

    /// Remove the appointment at 1-based `index`, shifting later ones down.
    ///
    /// Returns the removed entry.
    pub fn delete_appointment(&mut self, index: usize) -> Result<String> {
        let count = self.appointments.len();
        if count == 0 {
            return Err(ClinicError::EmptyList);
        }
        if index < 1 || index > count {
            return Err(ClinicError::InvalidIndex { index, count });
        }

        let removed = self.appointments.remove(index - 1);
        debug!(patient_id = %self.id, index, "appointment deleted");
        Ok(removed)
    }

    /// Add `amount` to the running bill and return the new total.
    pub fn bill(&mut self, amount: f64) -> Result<f64> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(ClinicError::invalid(
                "amount",
                "must be a non-negative number",
            ));
        }

        self.total_bill += amount;
        info!(patient_id = %self.id, amount, total = self.total_bill, "patient billed");
        Ok(self.total_bill)
    }

    /// Allocate a room once. A second allocation keeps the first one.
    ///
    /// No range check is applied to the room number beyond refusing the
    /// on-disk "no room" marker.
    pub fn allocate_room(&mut self, room: i32, time: &str) -> Result<()> {
        if let Some(existing) = &self.room {
            return Err(ClinicError::AlreadyAllocated {
                room: existing.room,
            });
        }
        if room == NO_ROOM {
            return Err(ClinicError::invalid(
                "room number",
                format!("{} is reserved for \"no room\"", NO_ROOM),
            ));
        }

        let time = validate_text("time", time)?;
        self.room = Some(RoomAllocation { room, time });

        info!(patient_id = %self.id, room, "room allocated");
        Ok(())
    }

    /// Store a by-value copy of `doctor`. Later changes to the doctor table
    /// are not reflected here.
    pub fn assign_doctor(&mut self, doctor: &Doctor) -> Result<()> {
        if let Some(current) = &self.assigned_doctor {
            return Err(ClinicError::AlreadyAssigned {
                doctor: current.name.clone(),
            });
        }

        self.assigned_doctor = Some(doctor.clone());
        info!(patient_id = %self.id, doctor_id = %doctor.id, "doctor assigned");
        Ok(())
    }
}

// ============================================================================
// STORE-LEVEL OPERATIONS
// ============================================================================

impl EntityStore {
    pub fn schedule_appointment(&mut self, patient_id: PatientId, details: &str) -> Result<usize> {
        self.find_patient_mut(patient_id)?.schedule_appointment(details)
    }

    pub fn delete_appointment(&mut self, patient_id: PatientId, index: usize) -> Result<String> {
        self.find_patient_mut(patient_id)?.delete_appointment(index)
    }

    pub fn bill_patient(&mut self, patient_id: PatientId, amount: f64) -> Result<f64> {
        self.find_patient_mut(patient_id)?.bill(amount)
    }

    pub fn allocate_room(&mut self, patient_id: PatientId, room: i32, time: &str) -> Result<()> {
        self.find_patient_mut(patient_id)?.allocate_room(room, time)
    }

    /// Look up `doctor_id` and copy it into the patient.
    ///
    /// An already-assigned patient is refused before the doctor lookup; an
    /// unknown doctor leaves the patient unchanged.
    pub fn assign_doctor(&mut self, patient_id: PatientId, doctor_id: DoctorId) -> Result<Doctor> {
        if let Some(current) = self.find_patient(patient_id)?.assigned_doctor() {
            return Err(ClinicError::AlreadyAssigned {
                doctor: current.name.clone(),
            });
        }

        let doctor = self.find_doctor(doctor_id)?.clone();
        self.find_patient_mut(patient_id)?.assign_doctor(&doctor)?;
        Ok(doctor)
    }
}

// ============================================================================
// TESTS
// ============================================================================

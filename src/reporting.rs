// 📊 Reporting - read-only views over the store
//
// Views are plain Serialize structs: the menu renders them with Display,
// the binary can emit them as JSON, and the CSV export flattens patients.

use serde::Serialize;
use std::fmt;
use std::io::Write;

use crate::entities::{Doctor, DoctorId, Patient, PatientId};
use crate::error::Result;
use crate::store::EntityStore;

// ============================================================================
// PATIENT INFO
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentLine {
    /// 1-based display index (the index `delete_appointment` expects)
    pub index: usize,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomView {
    pub room: i32,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctorView {
    pub id: DoctorId,
    pub name: String,
    pub specialty: String,
}

impl From<&Doctor> for DoctorView {
    fn from(doctor: &Doctor) -> Self {
        DoctorView {
            id: doctor.id,
            name: doctor.name.clone(),
            specialty: doctor.specialty.clone(),
        }
    }
}

/// Everything shown for "Display Patient Info"
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientInfo {
    pub id: PatientId,
    pub name: String,
    pub age: u32,
    pub total_bill: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor: Option<DoctorView>,
    pub appointments: Vec<AppointmentLine>,
}

pub fn patient_info(patient: &Patient) -> PatientInfo {
    PatientInfo {
        id: patient.id(),
        name: patient.name().to_string(),
        age: patient.age(),
        total_bill: patient.total_bill(),
        room: patient.room().map(|r| RoomView {
            room: r.room,
            time: r.time.clone(),
        }),
        doctor: patient.assigned_doctor().map(DoctorView::from),
        appointments: patient
            .appointments()
            .iter()
            .enumerate()
            .map(|(i, details)| AppointmentLine {
                index: i + 1,
                details: details.clone(),
            })
            .collect(),
    }
}

impl fmt::Display for PatientInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Patient ID: {}", self.id)?;
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Age: {}", self.age)?;
        writeln!(f, "Total Bill: ${:.2}", self.total_bill)?;

        match &self.room {
            Some(room) => {
                writeln!(f, "Allocated Room Number: {}", room.room)?;
                writeln!(f, "Allocated Time: {}", room.time)?;
            }
            None => writeln!(f, "No room allocated.")?,
        }

        match &self.doctor {
            Some(doctor) => {
                writeln!(f, "Assigned Doctor ID: {}", doctor.id)?;
                writeln!(f, "Assigned Doctor Name: {}", doctor.name)?;
                writeln!(f, "Assigned Doctor Specialty: {}", doctor.specialty)?;
            }
            None => writeln!(f, "No doctor assigned.")?,
        }

        writeln!(f)?;
        writeln!(f, "Appointments:")?;
        for line in &self.appointments {
            writeln!(f, "\t{}: {}", line.index, line.details)?;
        }
        Ok(())
    }
}

// ============================================================================
// ROOM / DOCTOR VERIFICATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomAllocationView {
    pub patient: String,
    pub room: i32,
    pub time: String,
}

impl fmt::Display for RoomAllocationView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Patient {} is allocated Room {} at {}.",
            self.patient, self.room, self.time
        )
    }
}

/// `None` when the patient has no room
pub fn room_allocation(patient: &Patient) -> Option<RoomAllocationView> {
    patient.room().map(|r| RoomAllocationView {
        patient: patient.name().to_string(),
        room: r.room,
        time: r.time.clone(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctorAssignmentView {
    pub patient: String,
    pub doctor: DoctorView,
}

impl fmt::Display for DoctorAssignmentView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Patient {} is assigned Doctor {} with specialty {}.",
            self.patient, self.doctor.name, self.doctor.specialty
        )
    }
}

/// `None` when the patient has no doctor
pub fn doctor_assignment(patient: &Patient) -> Option<DoctorAssignmentView> {
    patient.assigned_doctor().map(|d| DoctorAssignmentView {
        patient: patient.name().to_string(),
        doctor: DoctorView::from(d),
    })
}

impl fmt::Display for DoctorView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Doctor ID: {}", self.id)?;
        writeln!(f, "Name: {}", self.name)?;
        write!(f, "Specialty: {}", self.specialty)
    }
}

pub fn doctor_info(doctor: &Doctor) -> DoctorView {
    DoctorView::from(doctor)
}

// ============================================================================
// STATISTICS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub patient_count: usize,
    pub doctor_count: usize,
    pub total_billing: f64,
    /// 0 when there are no patients
    pub average_billing: f64,
}

pub fn statistics(store: &EntityStore) -> Statistics {
    let total_billing: f64 = store.patients().iter().map(|p| p.total_bill()).sum();
    let patient_count = store.patient_count();

    let average_billing = if patient_count > 0 {
        total_billing / patient_count as f64
    } else {
        0.0
    };

    Statistics {
        patient_count,
        doctor_count: store.doctor_count(),
        total_billing,
        average_billing,
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Registered Patients: {}", self.patient_count)?;
        writeln!(f, "\tTotal Registered Doctors: {}", self.doctor_count)?;
        write!(f, "\tAverage Billing Amount: ${:.2}", self.average_billing)
    }
}

// ============================================================================
// CSV EXPORT
// ============================================================================

/// One flat row per patient
#[derive(Debug, Serialize)]
struct PatientRow<'a> {
    id: u32,
    name: &'a str,
    age: u32,
    total_bill: String,
    room: Option<i32>,
    room_time: &'a str,
    doctor_id: Option<u32>,
    doctor_name: Option<&'a str>,
    doctor_specialty: Option<&'a str>,
    appointments: usize,
}

impl<'a> From<&'a Patient> for PatientRow<'a> {
    fn from(p: &'a Patient) -> Self {
        let doctor = p.assigned_doctor();
        PatientRow {
            id: p.id().0,
            name: p.name(),
            age: p.age(),
            total_bill: format!("{:.2}", p.total_bill()),
            room: p.allocated_room(),
            room_time: p.allocated_time(),
            doctor_id: doctor.map(|d| d.id.0),
            doctor_name: doctor.map(|d| d.name.as_str()),
            doctor_specialty: doctor.map(|d| d.specialty.as_str()),
            appointments: p.appointment_count(),
        }
    }
}

/// Column names of [`PatientRow`], in field order.
const CSV_HEADER: [&str; 10] = [
    "id",
    "name",
    "age",
    "total_bill",
    "room",
    "room_time",
    "doctor_id",
    "doctor_name",
    "doctor_specialty",
    "appointments",
];

/// Write every patient as CSV. The header row is written even when the
/// store is empty. Returns rows written.
pub fn export_csv<W: Write>(store: &EntityStore, writer: W) -> Result<usize> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;

    for patient in store.patients() {
        csv_writer.serialize(PatientRow::from(patient))?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;

    Ok(store.patient_count())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> EntityStore {
        let mut store = EntityStore::new();
        let alice = store.register_patient("Alice", 30).unwrap();
        let bob = store.register_patient("Bob", 45).unwrap();
        let doc = store.register_doctor("Dr. Smith", "Cardiology").unwrap();

        store.bill_patient(alice, 50.0).unwrap();
        store.bill_patient(alice, 30.0).unwrap();
        store.bill_patient(bob, 20.0).unwrap();
        store.allocate_room(alice, 101, "9:00 AM").unwrap();
        store.assign_doctor(alice, doc).unwrap();
        store.schedule_appointment(alice, "ECG").unwrap();
        store.schedule_appointment(alice, "Follow-up").unwrap();
        store
    }

    #[test]
    fn test_statistics_empty_store() {
        let stats = statistics(&EntityStore::new());

        assert_eq!(stats.patient_count, 0);
        assert_eq!(stats.doctor_count, 0);
        assert_eq!(stats.average_billing, 0.0);
        assert!(!stats.average_billing.is_nan());
    }

    #[test]
    fn test_statistics_average() {
        let stats = statistics(&sample_store());

        assert_eq!(stats.patient_count, 2);
        assert_eq!(stats.doctor_count, 1);
        assert_eq!(stats.total_billing, 100.0);
        assert_eq!(stats.average_billing, 50.0);
        assert!(stats.to_string().contains("Average Billing Amount: $50.00"));
    }

    #[test]
    fn test_patient_info_full() {
        let store = sample_store();
        let info = patient_info(store.find_patient(PatientId(1)).unwrap());

        assert_eq!(info.total_bill, 80.0);
        assert_eq!(info.room.as_ref().unwrap().room, 101);
        assert_eq!(info.doctor.as_ref().unwrap().name, "Dr. Smith");
        assert_eq!(info.appointments[0].index, 1);
        assert_eq!(info.appointments[1].details, "Follow-up");

        let text = info.to_string();
        assert!(text.contains("Total Bill: $80.00"));
        assert!(text.contains("Allocated Room Number: 101"));
        assert!(text.contains("Assigned Doctor Specialty: Cardiology"));
        assert!(text.contains("\t2: Follow-up"));
    }

    #[test]
    fn test_patient_info_without_room_or_doctor() {
        let store = sample_store();
        let info = patient_info(store.find_patient(PatientId(2)).unwrap());

        assert!(info.room.is_none());
        assert!(info.doctor.is_none());

        let text = info.to_string();
        assert!(text.contains("No room allocated."));
        assert!(text.contains("No doctor assigned."));

        // Optional sections are omitted from JSON
        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("room").is_none());
        assert!(json.get("doctor").is_none());
    }

    #[test]
    fn test_verification_views() {
        let store = sample_store();
        let alice = store.find_patient(PatientId(1)).unwrap();
        let bob = store.find_patient(PatientId(2)).unwrap();

        assert_eq!(
            room_allocation(alice).unwrap().to_string(),
            "Patient Alice is allocated Room 101 at 9:00 AM."
        );
        assert!(room_allocation(bob).is_none());

        assert_eq!(
            doctor_assignment(alice).unwrap().to_string(),
            "Patient Alice is assigned Doctor Dr. Smith with specialty Cardiology."
        );
        assert!(doctor_assignment(bob).is_none());
    }

    #[test]
    fn test_export_csv() {
        let store = sample_store();
        let mut out = Vec::new();

        let rows = export_csv(&store, &mut out).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,name,age,total_bill"));
        assert_eq!(lines[1], "1,Alice,30,80.00,101,9:00 AM,1,Dr. Smith,Cardiology,2");
        assert_eq!(lines[2], "2,Bob,45,20.00,,,,,,0");
    }

    #[test]
    fn test_export_csv_empty_store_has_header() {
        let store = EntityStore::new();
        let mut out = Vec::new();

        let rows = export_csv(&store, &mut out).unwrap();
        assert_eq!(rows, 0);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            concat!(
                "id,name,age,total_bill,room,room_time,",
                "doctor_id,doctor_name,doctor_specialty,appointments\n"
            )
        );
    }
}

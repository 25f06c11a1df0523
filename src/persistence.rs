// 💾 Persistence Layer - patients.dat
//
// Stable little-endian layout, independent of in-memory struct layout:
//
//   header   32 bytes   magic "CLNC" | version u16 | flags u16 | count u32
//                       | record size u32 | saved-at i64 (unix secs) | 8 reserved
//   records  count x 1425 bytes (see RECORD_LEN)
//   trailer  32 bytes   SHA-256 of header + records
//
// Doctors are not persisted. Appointment slots are always present so every
// record has the same size; they only carry text when FLAG_APPOINTMENTS is set.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::entities::patient::RoomAllocation;
use crate::entities::{Doctor, DoctorId, Patient, PatientId, MAX_APPOINTMENTS, MAX_TEXT_LEN};
use crate::error::{ClinicError, Result};
use crate::records::NO_ROOM;
use crate::store::{EntityStore, MAX_PATIENTS};

pub const DEFAULT_DATA_FILE: &str = "patients.dat";

pub const MAGIC: &[u8; 4] = b"CLNC";
pub const FORMAT_VERSION: u16 = 1;
pub const HEADER_LEN: usize = 32;
pub const CHECKSUM_LEN: usize = 32;

/// Header flag: appointment slots carry text
pub const FLAG_APPOINTMENTS: u16 = 0x0001;

/// Doctor id written when no doctor is assigned
const NO_DOCTOR: i32 = -1;

/// id + name + age + bill + room + time + doctor (id, name, specialty)
/// + appointment count + appointment slots
pub const RECORD_LEN: usize = 4
    + MAX_TEXT_LEN
    + 4
    + 8
    + 4
    + MAX_TEXT_LEN
    + 4
    + MAX_TEXT_LEN
    + MAX_TEXT_LEN
    + 1
    + MAX_APPOINTMENTS * MAX_TEXT_LEN;

// ============================================================================
// OPTIONS + SUMMARY
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistOptions {
    /// Write appointment text on save and restore it on load.
    ///
    /// Off by default: appointments are session-only and every loaded
    /// patient starts with an empty list.
    pub include_appointments: bool,
}

/// What a data file header says, after the checksum has been verified
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    pub version: u16,
    pub record_count: usize,
    pub appointments_persisted: bool,
    pub saved_at: DateTime<Utc>,
}

// ============================================================================
// SAVE / LOAD
// ============================================================================

/// Write every patient in `store` to `path`. Returns the record count.
///
/// The data goes to a sibling `.tmp` file first and is renamed into place,
/// so a failed save leaves the previous file intact.
pub fn save(store: &EntityStore, path: &Path, options: PersistOptions) -> Result<usize> {
    let bytes = encode(store.patients(), options, Utc::now())?;
    let tmp = tmp_path(path);

    if let Err(err) = write_file(&tmp, &bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(ClinicError::io(&tmp, err));
    }
    fs::rename(&tmp, path).map_err(|err| {
        let _ = fs::remove_file(&tmp);
        ClinicError::io(path, err)
    })?;

    info!(
        path = %path.display(),
        patients = store.patient_count(),
        appointments = options.include_appointments,
        "data saved"
    );
    Ok(store.patient_count())
}

/// Load patients from `path` into `store`, replacing its patient table.
///
/// A missing file is not an error: the store is left untouched and 0 is
/// returned. Any other failure also leaves the store untouched.
pub fn load(store: &mut EntityStore, path: &Path, options: PersistOptions) -> Result<usize> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no data file found, starting fresh");
            return Ok(0);
        }
        Err(err) => return Err(ClinicError::io(path, err)),
    };

    let (summary, patients) = decode(&bytes, options)?;
    let count = patients.len();
    store.replace_patients(patients)?;

    info!(
        path = %path.display(),
        patients = count,
        saved_at = %summary.saved_at,
        "data loaded"
    );
    Ok(count)
}

/// Read and verify a data file without loading it anywhere
pub fn inspect(path: &Path) -> Result<FileSummary> {
    let bytes = fs::read(path).map_err(|err| ClinicError::io(path, err))?;
    let (summary, _) = decode(&bytes, PersistOptions::default())?;
    Ok(summary)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| DEFAULT_DATA_FILE.into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

// ============================================================================
// ENCODING
// ============================================================================

/// Serialize `patients` into the full file image (header, records, trailer)
pub fn encode(
    patients: &[Patient],
    options: PersistOptions,
    saved_at: DateTime<Utc>,
) -> Result<Vec<u8>> {
    let count = u32::try_from(patients.len())
        .map_err(|_| ClinicError::invalid("patients", "too many records"))?;
    let flags = if options.include_appointments {
        FLAG_APPOINTMENTS
    } else {
        0
    };

    let mut out = Vec::with_capacity(HEADER_LEN + patients.len() * RECORD_LEN + CHECKSUM_LEN);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&(RECORD_LEN as u32).to_le_bytes());
    out.extend_from_slice(&saved_at.timestamp().to_le_bytes());
    out.extend_from_slice(&[0u8; 8]);

    for patient in patients {
        encode_record(&mut out, patient, options)?;
    }

    let checksum = Sha256::digest(&out);
    out.extend_from_slice(&checksum);

    debug!(records = patients.len(), bytes = out.len(), "encoded data file");
    Ok(out)
}

fn encode_record(out: &mut Vec<u8>, patient: &Patient, options: PersistOptions) -> Result<()> {
    let start = out.len();

    put_i32(out, "id", patient.id.0)?;
    put_text(out, "name", &patient.name)?;
    put_i32(out, "age", patient.age)?;
    out.extend_from_slice(&patient.total_bill.to_le_bytes());

    match &patient.room {
        Some(room) => {
            out.extend_from_slice(&room.room.to_le_bytes());
            put_text(out, "time", &room.time)?;
        }
        None => {
            out.extend_from_slice(&NO_ROOM.to_le_bytes());
            put_text(out, "time", "")?;
        }
    }

    match &patient.assigned_doctor {
        Some(doctor) => {
            put_i32(out, "doctor id", doctor.id.0)?;
            put_text(out, "doctor name", &doctor.name)?;
            put_text(out, "specialty", &doctor.specialty)?;
        }
        None => {
            out.extend_from_slice(&NO_DOCTOR.to_le_bytes());
            put_text(out, "doctor name", "")?;
            put_text(out, "specialty", "")?;
        }
    }

    let persisted: &[String] = if options.include_appointments {
        &patient.appointments
    } else {
        &[]
    };
    out.push(persisted.len().min(MAX_APPOINTMENTS) as u8);
    for slot in 0..MAX_APPOINTMENTS {
        put_text(out, "appointment", persisted.get(slot).map_or("", String::as_str))?;
    }

    debug_assert_eq!(out.len() - start, RECORD_LEN);
    Ok(())
}

fn put_i32(out: &mut Vec<u8>, field: &'static str, value: u32) -> Result<()> {
    let value = i32::try_from(value).map_err(|_| ClinicError::invalid(field, "out of range"))?;
    out.extend_from_slice(&value.to_le_bytes());
    Ok(())
}

/// Fixed-width, NUL-padded UTF-8
fn put_text(out: &mut Vec<u8>, field: &'static str, value: &str) -> Result<()> {
    let bytes = value.as_bytes();
    if bytes.len() > MAX_TEXT_LEN {
        return Err(ClinicError::invalid(
            field,
            format!("longer than {} bytes", MAX_TEXT_LEN),
        ));
    }
    out.extend_from_slice(bytes);
    out.resize(out.len() + MAX_TEXT_LEN - bytes.len(), 0);
    Ok(())
}

// ============================================================================
// DECODING
// ============================================================================

/// Verify and parse a full file image.
///
/// At most `MAX_PATIENTS` records are returned; extra records are ignored.
pub fn decode(bytes: &[u8], options: PersistOptions) -> Result<(FileSummary, Vec<Patient>)> {
    if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(corrupt(format!("file too short ({} bytes)", bytes.len())));
    }

    let (body, trailer) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    if Sha256::digest(body).as_slice() != trailer {
        return Err(corrupt("checksum mismatch"));
    }

    let mut reader = Reader::new(body);
    if reader.take(4)? != MAGIC {
        return Err(corrupt("bad magic"));
    }
    let version = reader.u16()?;
    if version != FORMAT_VERSION {
        return Err(corrupt(format!("unsupported format version {}", version)));
    }
    let flags = reader.u16()?;
    let count = reader.u32()? as usize;
    let record_len = reader.u32()? as usize;
    if record_len != RECORD_LEN {
        return Err(corrupt(format!(
            "record size {} (expected {})",
            record_len, RECORD_LEN
        )));
    }
    let timestamp = reader.i64()?;
    let saved_at = DateTime::from_timestamp(timestamp, 0)
        .ok_or_else(|| corrupt(format!("bad timestamp {}", timestamp)))?;
    reader.take(8)?;

    let expected = count
        .checked_mul(RECORD_LEN)
        .ok_or_else(|| corrupt("record count overflow"))?;
    if reader.remaining() != expected {
        return Err(corrupt(format!(
            "expected {} bytes of records, found {}",
            expected,
            reader.remaining()
        )));
    }

    let appointments_persisted = flags & FLAG_APPOINTMENTS != 0;
    let restore_appointments = appointments_persisted && options.include_appointments;

    if count > MAX_PATIENTS {
        warn!(
            count,
            capacity = MAX_PATIENTS,
            "data file holds more patients than fit, ignoring the rest"
        );
    }

    let mut patients = Vec::with_capacity(count.min(MAX_PATIENTS));
    for position in 0..count.min(MAX_PATIENTS) {
        let record = reader.take(RECORD_LEN)?;
        let patient = decode_record(record, restore_appointments).map_err(|err| {
            let detail = match err {
                ClinicError::CorruptData(msg) => msg,
                other => other.to_string(),
            };
            corrupt(format!("record {}: {}", position + 1, detail))
        })?;
        patients.push(patient);
    }

    let summary = FileSummary {
        version,
        record_count: count,
        appointments_persisted,
        saved_at,
    };
    Ok((summary, patients))
}

fn decode_record(record: &[u8], restore_appointments: bool) -> Result<Patient> {
    let mut r = Reader::new(record);

    let id = positive(r.i32()?, "id")?;
    let name = r.text()?;
    let age = positive(r.i32()?, "age")?;
    let total_bill = r.f64()?;
    if !total_bill.is_finite() || total_bill < 0.0 {
        return Err(corrupt(format!("bad total bill {}", total_bill)));
    }

    let room_number = r.i32()?;
    let time = r.text()?;
    let room = (room_number != NO_ROOM).then(|| RoomAllocation {
        room: room_number,
        time,
    });

    let doctor_id = r.i32()?;
    let doctor_name = r.text()?;
    let specialty = r.text()?;
    let assigned_doctor = if doctor_id == NO_DOCTOR {
        None
    } else {
        let id = positive(doctor_id, "doctor id")?;
        Some(Doctor::new(DoctorId(id), doctor_name, specialty))
    };

    let stored = r.u8()? as usize;
    if stored > MAX_APPOINTMENTS {
        return Err(corrupt(format!("appointment count {}", stored)));
    }
    let mut appointments = Vec::with_capacity(MAX_APPOINTMENTS);
    for slot in 0..MAX_APPOINTMENTS {
        let text = r.text()?;
        if restore_appointments && slot < stored {
            appointments.push(text);
        }
    }

    Ok(Patient {
        id: PatientId(id),
        name,
        age,
        appointments,
        total_bill,
        room,
        assigned_doctor,
    })
}

fn positive(value: i32, field: &str) -> Result<u32> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| corrupt(format!("bad {} {}", field, value)))
}

fn corrupt(msg: impl Into<String>) -> ClinicError {
    ClinicError::CorruptData(msg.into())
}

/// Forward-only view over a byte slice
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf }
    }

    fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.buf.len() < n {
            return Err(corrupt("unexpected end of data"));
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    /// Fixed-width text field, cut at the first NUL
    fn text(&mut self) -> Result<String> {
        let raw = self.take(MAX_TEXT_LEN)?;
        let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
        std::str::from_utf8(&raw[..end])
            .map(str::to_string)
            .map_err(|_| corrupt("text field is not valid UTF-8"))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const WITH_APPOINTMENTS: PersistOptions = PersistOptions {
        include_appointments: true,
    };

    /// Store with `n` patients; every third has a room, every fourth a doctor
    fn populated_store(n: usize) -> EntityStore {
        let mut store = EntityStore::new();
        let doctor = store.register_doctor("Dr. Quinn", "Medicine Woman").unwrap();

        for i in 0..n {
            let id = store
                .register_patient(&format!("Patient {}", i + 1), (i % 90 + 1) as i64)
                .unwrap();
            store.bill_patient(id, i as f64 * 12.25).unwrap();
            store.schedule_appointment(id, &format!("Visit {}", i)).unwrap();
            store.schedule_appointment(id, "Lab work").unwrap();
            if i % 3 == 0 {
                store.allocate_room(id, 100 + i as i32, "08:30").unwrap();
            }
            if i % 4 == 0 {
                store.assign_doctor(id, doctor).unwrap();
            }
        }
        store
    }

    fn assert_fixed_fields_match(original: &Patient, loaded: &Patient) {
        assert_eq!(loaded.id(), original.id());
        assert_eq!(loaded.name(), original.name());
        assert_eq!(loaded.age(), original.age());
        assert_eq!(loaded.total_bill(), original.total_bill());
        assert_eq!(loaded.allocated_room(), original.allocated_room());
        assert_eq!(loaded.allocated_time(), original.allocated_time());
        assert_eq!(loaded.assigned_doctor(), original.assigned_doctor());
    }

    #[test]
    fn test_record_len_matches_layout() {
        assert_eq!(RECORD_LEN, 1425);
    }

    #[test]
    fn test_round_trip_session_only_appointments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("patients.dat");

        for n in [0, 1, 7, 37, MAX_PATIENTS] {
            let original = populated_store(n);
            assert_eq!(save(&original, &path, PersistOptions::default()).unwrap(), n);

            let mut reloaded = EntityStore::new();
            let count = load(&mut reloaded, &path, PersistOptions::default()).unwrap();
            assert_eq!(count, n);
            assert_eq!(reloaded.patient_count(), n);

            for (a, b) in original.patients().iter().zip(reloaded.patients()) {
                assert_fixed_fields_match(a, b);
                assert_eq!(b.appointment_count(), 0);
            }
        }
    }

    #[test]
    fn test_round_trip_with_appointments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("patients.dat");
        let original = populated_store(5);

        save(&original, &path, WITH_APPOINTMENTS).unwrap();

        let mut reloaded = EntityStore::new();
        load(&mut reloaded, &path, WITH_APPOINTMENTS).unwrap();
        for (a, b) in original.patients().iter().zip(reloaded.patients()) {
            assert_fixed_fields_match(a, b);
            assert_eq!(b.appointments(), a.appointments());
        }

        // Loading without the option still drops them
        let mut session_only = EntityStore::new();
        load(&mut session_only, &path, PersistOptions::default()).unwrap();
        assert!(session_only.patients().iter().all(|p| p.appointment_count() == 0));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let mut store = EntityStore::new();

        let missing = dir.path().join("nope.dat");
        let count = load(&mut store, &missing, PersistOptions::default()).unwrap();

        assert_eq!(count, 0);
        assert_eq!(store.patient_count(), 0);
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("patients.dat");

        let err = save(&populated_store(2), &path, PersistOptions::default()).unwrap_err();
        assert!(matches!(err, ClinicError::Io { .. }));
    }

    #[test]
    fn test_save_leaves_no_tmp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("patients.dat");

        save(&populated_store(3), &path, PersistOptions::default()).unwrap();

        assert!(path.exists());
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_file_layout() {
        let saved_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let store = populated_store(2);
        let bytes = encode(store.patients(), PersistOptions::default(), saved_at).unwrap();

        assert_eq!(bytes.len(), HEADER_LEN + 2 * RECORD_LEN + CHECKSUM_LEN);
        assert_eq!(&bytes[0..4], MAGIC);
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), FORMAT_VERSION);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 2);

        // First record starts with id 1 then the padded name
        let record = &bytes[HEADER_LEN..HEADER_LEN + RECORD_LEN];
        assert_eq!(i32::from_le_bytes(record[0..4].try_into().unwrap()), 1);
        assert_eq!(&record[4..13], b"Patient 1");
        assert_eq!(record[13], 0);

        let (summary, patients) = decode(&bytes, PersistOptions::default()).unwrap();
        assert_eq!(summary.saved_at, saved_at);
        assert_eq!(summary.record_count, 2);
        assert!(!summary.appointments_persisted);
        assert_eq!(patients.len(), 2);
    }

    #[test]
    fn test_unallocated_fields_use_sentinels() {
        let mut store = EntityStore::new();
        store.register_patient("Plain", 20).unwrap();
        let bytes = encode(store.patients(), PersistOptions::default(), Utc::now()).unwrap();

        let record = &bytes[HEADER_LEN..];
        let room_offset = 4 + MAX_TEXT_LEN + 4 + 8;
        let doctor_offset = room_offset + 4 + MAX_TEXT_LEN;
        let read_i32 = |at: usize| i32::from_le_bytes(record[at..at + 4].try_into().unwrap());
        assert_eq!(read_i32(room_offset), -1);
        assert_eq!(read_i32(doctor_offset), -1);
    }

    #[test]
    fn test_corrupt_file_leaves_store_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("patients.dat");
        save(&populated_store(3), &path, PersistOptions::default()).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        bytes[HEADER_LEN + 10] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();

        let mut store = EntityStore::new();
        store.register_patient("Existing", 55).unwrap();

        let err = load(&mut store, &path, PersistOptions::default()).unwrap_err();
        assert!(matches!(err, ClinicError::CorruptData(_)));
        assert_eq!(store.patient_count(), 1);
        assert_eq!(store.find_patient(PatientId(1)).unwrap().name(), "Existing");
    }

    #[test]
    fn test_truncated_file_is_corrupt() {
        let store = populated_store(2);
        let bytes = encode(store.patients(), PersistOptions::default(), Utc::now()).unwrap();

        assert!(decode(&bytes[..10], PersistOptions::default()).is_err());
        assert!(decode(&bytes[..bytes.len() - 1], PersistOptions::default()).is_err());
    }

    #[test]
    fn test_decode_caps_at_capacity() {
        let patients: Vec<Patient> = (1..=MAX_PATIENTS as u32 + 1)
            .map(|i| Patient::new(PatientId(i), format!("P{}", i), 30))
            .collect();
        let bytes = encode(&patients, PersistOptions::default(), Utc::now()).unwrap();

        let (summary, loaded) = decode(&bytes, PersistOptions::default()).unwrap();
        assert_eq!(summary.record_count, 101);
        assert_eq!(loaded.len(), MAX_PATIENTS);
        assert_eq!(loaded.last().unwrap().id(), PatientId(100));
    }

    #[test]
    fn test_inspect_reports_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("patients.dat");
        save(&populated_store(4), &path, WITH_APPOINTMENTS).unwrap();

        let summary = inspect(&path).unwrap();
        assert_eq!(summary.version, FORMAT_VERSION);
        assert_eq!(summary.record_count, 4);
        assert!(summary.appointments_persisted);
    }
}

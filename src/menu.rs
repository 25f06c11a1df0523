// 🖥️ Console menu - the numbered 1-15 front end
//
// Line-oriented: every answer is one line, so a bad entry is discarded as a
// whole and cannot leak into the next prompt. End of input behaves like Exit.

use std::io::{self, BufRead, Write};
use tracing::{debug, warn};

use crate::config::Config;
use crate::entities::{DoctorId, PatientId, MAX_APPOINTMENTS};
use crate::error::ClinicError;
use crate::persistence;
use crate::reporting;
use crate::store::{EntityStore, MAX_DOCTORS, MAX_PATIENTS};

// ============================================================================
// MENU CHOICES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    RegisterPatient,
    RegisterDoctor,
    VerifyPatient,
    VerifyDoctor,
    ScheduleAppointment,
    DeleteAppointment,
    BillPatient,
    AllocateRoom,
    VerifyRoomAllocation,
    AssignDoctor,
    VerifyDoctorAssignment,
    DisplayPatientInfo,
    DisplayStatistics,
    SaveData,
    Exit,
}

impl Choice {
    pub const ALL: [Choice; 15] = [
        Choice::RegisterPatient,
        Choice::RegisterDoctor,
        Choice::VerifyPatient,
        Choice::VerifyDoctor,
        Choice::ScheduleAppointment,
        Choice::DeleteAppointment,
        Choice::BillPatient,
        Choice::AllocateRoom,
        Choice::VerifyRoomAllocation,
        Choice::AssignDoctor,
        Choice::VerifyDoctorAssignment,
        Choice::DisplayPatientInfo,
        Choice::DisplayStatistics,
        Choice::SaveData,
        Choice::Exit,
    ];

    /// Menu number (1-based)
    pub fn number(&self) -> usize {
        Choice::ALL.iter().position(|c| c == self).map_or(0, |i| i + 1)
    }

    pub fn from_number(number: i64) -> Option<Choice> {
        usize::try_from(number)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| Choice::ALL.get(i).copied())
    }

    pub fn label(&self) -> &'static str {
        match self {
            Choice::RegisterPatient => "Register Patient",
            Choice::RegisterDoctor => "Register Doctor",
            Choice::VerifyPatient => "Verify Patient",
            Choice::VerifyDoctor => "Verify Doctor",
            Choice::ScheduleAppointment => "Schedule Appointment",
            Choice::DeleteAppointment => "Delete Appointment",
            Choice::BillPatient => "Bill Patient",
            Choice::AllocateRoom => "Allocate Room",
            Choice::VerifyRoomAllocation => "Verify Room Allocation",
            Choice::AssignDoctor => "Assign Doctor",
            Choice::VerifyDoctorAssignment => "Verify Doctor Assignment",
            Choice::DisplayPatientInfo => "Display Patient Info",
            Choice::DisplayStatistics => "Display Statistics",
            Choice::SaveData => "Save Data",
            Choice::Exit => "Exit",
        }
    }
}

/// Whether the loop keeps going after an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

// ============================================================================
// MENU
// ============================================================================

pub struct Menu<'a, R, W> {
    store: &'a mut EntityStore,
    config: &'a Config,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Menu<'a, R, W> {
    pub fn new(store: &'a mut EntityStore, config: &'a Config, input: R, output: W) -> Self {
        Menu {
            store,
            config,
            input,
            output,
        }
    }

    /// Run until Exit is chosen or input runs out.
    ///
    /// Only console I/O failures end the loop with an error; clinic errors
    /// are reported and the menu is shown again.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            self.print_menu()?;

            let Some(line) = self.read_line()? else {
                debug!("input closed, leaving menu");
                return Ok(());
            };

            let choice = match line.trim().parse::<i64>() {
                Ok(number) => Choice::from_number(number),
                Err(_) => {
                    writeln!(self.output, "Invalid input. Please enter a number.")?;
                    continue;
                }
            };

            let Some(choice) = choice else {
                writeln!(self.output, "Invalid choice. Please try again.")?;
                continue;
            };

            if self.dispatch(choice)? == Flow::Exit {
                return Ok(());
            }
        }
    }

    fn print_menu(&mut self) -> io::Result<()> {
        writeln!(self.output)?;
        writeln!(self.output, "Clinic Management System")?;
        for choice in Choice::ALL {
            writeln!(self.output, "\t{}. {}", choice.number(), choice.label())?;
        }
        self.output.flush()
    }

    fn dispatch(&mut self, choice: Choice) -> io::Result<Flow> {
        debug!(?choice, "menu choice");
        let flow = match choice {
            Choice::RegisterPatient => self.register_patient()?,
            Choice::RegisterDoctor => self.register_doctor()?,
            Choice::VerifyPatient | Choice::DisplayPatientInfo => self.show_patient()?,
            Choice::VerifyDoctor => self.verify_doctor()?,
            Choice::ScheduleAppointment => self.schedule_appointment()?,
            Choice::DeleteAppointment => self.delete_appointment()?,
            Choice::BillPatient => self.bill_patient()?,
            Choice::AllocateRoom => self.allocate_room()?,
            Choice::VerifyRoomAllocation => self.verify_room()?,
            Choice::AssignDoctor => self.assign_doctor()?,
            Choice::VerifyDoctorAssignment => self.verify_doctor_assignment()?,
            Choice::DisplayStatistics => {
                let stats = reporting::statistics(self.store);
                writeln!(self.output)?;
                writeln!(self.output, "{}", stats)?;
                Flow::Continue
            }
            Choice::SaveData => {
                self.save()?;
                Flow::Continue
            }
            Choice::Exit => {
                if self.config.save_on_exit {
                    self.save()?;
                }
                Flow::Exit
            }
        };
        Ok(flow)
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    fn register_patient(&mut self) -> io::Result<Flow> {
        if self.store.patient_count() >= MAX_PATIENTS {
            writeln!(self.output, "Maximum patient limit reached!")?;
            return Ok(Flow::Continue);
        }

        let Some(name) = self.prompt_text("Enter patient's name: ")? else {
            return Ok(Flow::Exit);
        };

        let age = loop {
            let Some(raw) = self.prompt("Enter patient's age: ")? else {
                return Ok(Flow::Exit);
            };
            match raw.trim().parse::<i64>() {
                Ok(age) if age > 0 && age <= i64::from(i32::MAX) => break age,
                _ => writeln!(
                    self.output,
                    "Invalid input. Please enter a positive integer for age."
                )?,
            }
        };

        match self.store.register_patient(&name, age) {
            Ok(id) => writeln!(self.output, "Patient registered successfully! ID: {}", id)?,
            Err(err) => self.report(&err)?,
        }
        Ok(Flow::Continue)
    }

    fn register_doctor(&mut self) -> io::Result<Flow> {
        if self.store.doctor_count() >= MAX_DOCTORS {
            writeln!(self.output, "Maximum doctor limit reached!")?;
            return Ok(Flow::Continue);
        }

        let Some(name) = self.prompt_text("Enter doctor's name: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(specialty) = self.prompt_text("Enter doctor's specialty: ")? else {
            return Ok(Flow::Exit);
        };

        match self.store.register_doctor(&name, &specialty) {
            Ok(id) => writeln!(self.output, "Doctor registered successfully! ID: {}", id)?,
            Err(err) => self.report(&err)?,
        }
        Ok(Flow::Continue)
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    fn show_patient(&mut self) -> io::Result<Flow> {
        let Some(id) = self.prompt_patient_id("Enter Patient ID: ")? else {
            return Ok(Flow::Exit);
        };
        let view = self.store.find_patient(id).map(reporting::patient_info);
        match view {
            Ok(info) => {
                writeln!(self.output)?;
                write!(self.output, "{}", info)?;
            }
            Err(_) => writeln!(self.output, "Patient not found.")?,
        }
        Ok(Flow::Continue)
    }

    fn verify_doctor(&mut self) -> io::Result<Flow> {
        let Some(raw) = self.prompt_number("Enter Doctor ID to verify: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(raw) = raw else {
            return Ok(Flow::Continue);
        };
        let view = self
            .store
            .find_doctor(doctor_id(raw))
            .map(reporting::doctor_info);
        match view {
            Ok(doctor) => {
                writeln!(self.output, "Doctor found.")?;
                writeln!(self.output, "{}", doctor)?;
            }
            Err(_) => writeln!(self.output, "Doctor not found.")?,
        }
        Ok(Flow::Continue)
    }

    fn verify_room(&mut self) -> io::Result<Flow> {
        let prompt = "Enter Patient ID to verify room allocation: ";
        let Some(id) = self.prompt_patient_id(prompt)? else {
            return Ok(Flow::Exit);
        };
        let view = self.store.find_patient(id).map(reporting::room_allocation);
        match view {
            Ok(Some(room)) => writeln!(self.output, "{}", room)?,
            Ok(None) => writeln!(self.output, "No room allocated to this patient.")?,
            Err(_) => writeln!(self.output, "Patient not found.")?,
        }
        Ok(Flow::Continue)
    }

    fn verify_doctor_assignment(&mut self) -> io::Result<Flow> {
        let prompt = "Enter Patient ID to verify doctor assignment: ";
        let Some(id) = self.prompt_patient_id(prompt)? else {
            return Ok(Flow::Exit);
        };
        let view = self.store.find_patient(id).map(reporting::doctor_assignment);
        match view {
            Ok(Some(assignment)) => writeln!(self.output, "{}", assignment)?,
            Ok(None) => writeln!(self.output, "No doctor assigned to this patient.")?,
            Err(_) => writeln!(self.output, "Patient not found.")?,
        }
        Ok(Flow::Continue)
    }

    // ------------------------------------------------------------------------
    // Record operations
    // ------------------------------------------------------------------------

    fn schedule_appointment(&mut self) -> io::Result<Flow> {
        let Some(id) = self.prompt_patient_id("Enter Patient ID to schedule appointment: ")? else {
            return Ok(Flow::Exit);
        };
        let count = match self.store.find_patient(id) {
            Ok(patient) => patient.appointment_count(),
            Err(_) => {
                writeln!(self.output, "Patient not found.")?;
                return Ok(Flow::Continue);
            }
        };
        if count >= MAX_APPOINTMENTS {
            writeln!(self.output, "Maximum appointment limit reached for this patient!")?;
            return Ok(Flow::Continue);
        }

        let Some(details) = self.prompt_text("Enter appointment details: ")? else {
            return Ok(Flow::Exit);
        };
        match self.store.schedule_appointment(id, &details) {
            Ok(_) => writeln!(self.output, "Appointment scheduled successfully.")?,
            Err(err) => self.report(&err)?,
        }
        Ok(Flow::Continue)
    }

    fn delete_appointment(&mut self) -> io::Result<Flow> {
        let Some(id) = self.prompt_patient_id("Enter Patient ID to delete appointment: ")? else {
            return Ok(Flow::Exit);
        };
        let count = match self.store.find_patient(id) {
            Ok(patient) => patient.appointment_count(),
            Err(_) => {
                writeln!(self.output, "Patient not found.")?;
                return Ok(Flow::Continue);
            }
        };
        if count == 0 {
            writeln!(self.output, "No appointments to delete for this patient.")?;
            return Ok(Flow::Continue);
        }

        let prompt = format!("Enter appointment index to delete (1 to {}): ", count);
        let Some(raw) = self.prompt_number(&prompt)? else {
            return Ok(Flow::Exit);
        };
        let Some(raw) = raw else {
            return Ok(Flow::Continue);
        };

        // Negative input maps past the end and is reported as an invalid index
        let index = usize::try_from(raw).unwrap_or(usize::MAX);
        match self.store.delete_appointment(id, index) {
            Ok(_) => writeln!(self.output, "Appointment deleted successfully.")?,
            Err(ClinicError::InvalidIndex { .. }) => writeln!(self.output, "Invalid index.")?,
            Err(err) => self.report(&err)?,
        }
        Ok(Flow::Continue)
    }

    fn bill_patient(&mut self) -> io::Result<Flow> {
        let Some(id) = self.prompt_patient_id("Enter Patient ID to bill: ")? else {
            return Ok(Flow::Exit);
        };
        if self.store.find_patient(id).is_err() {
            writeln!(self.output, "Patient not found.")?;
            return Ok(Flow::Continue);
        }

        let mut prompt = "Enter billing amount: ";
        let total = loop {
            let Some(raw) = self.prompt(prompt)? else {
                return Ok(Flow::Exit);
            };
            prompt = "";
            let Ok(amount) = raw.trim().parse::<f64>() else {
                writeln!(self.output, "Invalid input. Please enter a positive billing amount.")?;
                continue;
            };
            match self.store.bill_patient(id, amount) {
                Ok(total) => break total,
                Err(ClinicError::InvalidInput { .. }) => {
                    writeln!(self.output, "Invalid input. Please enter a positive billing amount.")?
                }
                Err(err) => {
                    self.report(&err)?;
                    return Ok(Flow::Continue);
                }
            }
        };

        let name = self.store.find_patient(id).map(|p| p.name().to_string()).unwrap_or_default();
        writeln!(self.output, "Billing updated. Total bill for {}: ${:.2}", name, total)?;
        Ok(Flow::Continue)
    }

    fn allocate_room(&mut self) -> io::Result<Flow> {
        let Some(id) = self.prompt_patient_id("Enter Patient ID to allocate room: ")? else {
            return Ok(Flow::Exit);
        };
        let name = match self.store.find_patient(id) {
            Ok(patient) if patient.has_room() => {
                writeln!(self.output, "Room already allocated to this patient.")?;
                return Ok(Flow::Continue);
            }
            Ok(patient) => patient.name().to_string(),
            Err(_) => {
                writeln!(self.output, "Patient not found.")?;
                return Ok(Flow::Continue);
            }
        };

        let Some(room) = self.prompt_number("Enter room number: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(room) = room else {
            return Ok(Flow::Continue);
        };
        let Ok(room) = i32::try_from(room) else {
            writeln!(self.output, "Invalid input. Room number out of range.")?;
            return Ok(Flow::Continue);
        };

        let Some(time) = self.prompt_text("Enter time allocated for the room: ")? else {
            return Ok(Flow::Exit);
        };
        match self.store.allocate_room(id, room, &time) {
            Ok(()) => {
                writeln!(self.output, "Room {} allocated to {} at {}.", room, name, time.trim())?
            }
            Err(err) => self.report(&err)?,
        }
        Ok(Flow::Continue)
    }

    fn assign_doctor(&mut self) -> io::Result<Flow> {
        let Some(id) = self.prompt_patient_id("Enter Patient ID to assign a doctor: ")? else {
            return Ok(Flow::Exit);
        };
        let name = match self.store.find_patient(id) {
            Ok(patient) if patient.has_doctor() => {
                writeln!(self.output, "Doctor already assigned to this patient.")?;
                return Ok(Flow::Continue);
            }
            Ok(patient) => patient.name().to_string(),
            Err(_) => {
                writeln!(self.output, "Patient not found.")?;
                return Ok(Flow::Continue);
            }
        };

        let Some(raw) = self.prompt_number("Enter Doctor ID to assign: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(raw) = raw else {
            return Ok(Flow::Continue);
        };
        match self.store.assign_doctor(id, doctor_id(raw)) {
            Ok(doctor) => writeln!(
                self.output,
                "Doctor {} assigned to Patient {}.",
                doctor.name, name
            )?,
            Err(ClinicError::DoctorNotFound(_)) => writeln!(self.output, "Doctor not found.")?,
            Err(err) => self.report(&err)?,
        }
        Ok(Flow::Continue)
    }

    fn save(&mut self) -> io::Result<()> {
        if self.config.read_only {
            return writeln!(
                self.output,
                "Saving disabled: the data file could not be loaded at startup."
            );
        }
        match persistence::save(self.store, &self.config.data_file, self.config.persist) {
            Ok(_) => writeln!(self.output, "Data saved successfully."),
            Err(err) => {
                warn!(error = %err, "save failed");
                writeln!(self.output, "Error saving data: {}", err)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Prompt helpers
    // ------------------------------------------------------------------------

    fn report(&mut self, err: &ClinicError) -> io::Result<()> {
        writeln!(self.output, "Error: {}", err)
    }

    /// `None` at end of input. A line that is not UTF-8 is consumed whole,
    /// reported, and handed back empty so callers treat it as invalid.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut raw = Vec::new();
        if self.input.read_until(b'\n', &mut raw)? == 0 {
            return Ok(None);
        }
        match String::from_utf8(raw) {
            Ok(line) => Ok(Some(line)),
            Err(_) => {
                warn!("discarded console line that is not valid UTF-8");
                writeln!(self.output, "Invalid input. Line discarded.")?;
                Ok(Some(String::new()))
            }
        }
    }

    fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        if !text.is_empty() {
            write!(self.output, "{}", text)?;
            self.output.flush()?;
        }
        self.read_line()
    }

    /// Skips blank lines until some text arrives
    fn prompt_text(&mut self, text: &str) -> io::Result<Option<String>> {
        let mut prompt = text;
        loop {
            let Some(line) = self.prompt(prompt)? else {
                return Ok(None);
            };
            if !line.trim().is_empty() {
                return Ok(Some(line.trim().to_string()));
            }
            prompt = "";
        }
    }

    /// Outer `None` at end of input, inner `None` when the entry was not a
    /// number (already reported)
    fn prompt_number(&mut self, text: &str) -> io::Result<Option<Option<i64>>> {
        let Some(line) = self.prompt(text)? else {
            return Ok(None);
        };
        match line.trim().parse::<i64>() {
            Ok(n) => Ok(Some(Some(n))),
            Err(_) => {
                writeln!(self.output, "Invalid input. Please enter a number.")?;
                Ok(Some(None))
            }
        }
    }

    /// Non-numeric entries map to id 0, which never exists
    fn prompt_patient_id(&mut self, text: &str) -> io::Result<Option<PatientId>> {
        Ok(self
            .prompt_number(text)?
            .map(|raw| patient_id(raw.unwrap_or(0))))
    }
}

/// Out-of-range input maps to id 0, which never exists
fn patient_id(raw: i64) -> PatientId {
    PatientId(u32::try_from(raw).unwrap_or(0))
}

fn doctor_id(raw: i64) -> DoctorId {
    DoctorId(u32::try_from(raw).unwrap_or(0))
}

// ============================================================================
// TESTS
// ============================================================================

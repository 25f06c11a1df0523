// 🩺 Doctor Entity - registered once, never changed
//
// Doctors live only as long as the process: they are not written to the
// data file. Patients keep their own copy of the doctor they were assigned.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense doctor identity: 1-based position in the doctor table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DoctorId(pub u32);

impl DoctorId {
    /// Table index for this id, `None` for the invalid id 0
    pub fn index(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }
}

impl fmt::Display for DoctorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: DoctorId,
    pub name: String,
    pub specialty: String,
}

impl Doctor {
    pub fn new(id: DoctorId, name: String, specialty: String) -> Self {
        Doctor {
            id,
            name,
            specialty,
        }
    }
}

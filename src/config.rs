// ⚙️ Runtime configuration
// Built by the binary from CLI flags / environment; library callers can
// construct it directly.

use serde::Serialize;
use std::path::PathBuf;

use crate::persistence::{PersistOptions, DEFAULT_DATA_FILE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    /// Patient data file, loaded at startup and written by "Save Data"
    pub data_file: PathBuf,

    pub persist: PersistOptions,

    /// Also save when the menu exits
    pub save_on_exit: bool,

    /// Never write the data file (set when it could not be loaded)
    pub read_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            persist: PersistOptions::default(),
            save_on_exit: false,
            read_only: false,
        }
    }
}

impl Config {
    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = path.into();
        self
    }

    pub fn with_appointments_persisted(mut self, enabled: bool) -> Self {
        self.persist.include_appointments = enabled;
        self
    }

    pub fn with_save_on_exit(mut self, enabled: bool) -> Self {
        self.save_on_exit = enabled;
        self
    }

    pub fn with_read_only(mut self, enabled: bool) -> Self {
        self.read_only = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.data_file, PathBuf::from("patients.dat"));
        assert!(!config.persist.include_appointments);
        assert!(!config.save_on_exit);
        assert!(!config.read_only);
    }

    #[test]
    fn test_builder_overrides() {
        let config = Config::default()
            .with_data_file("/tmp/clinic.dat")
            .with_appointments_persisted(true)
            .with_save_on_exit(true)
            .with_read_only(true);

        assert_eq!(config.data_file, PathBuf::from("/tmp/clinic.dat"));
        assert!(config.read_only);
        assert!(config.persist.include_appointments);
        assert!(config.save_on_exit);
    }
}

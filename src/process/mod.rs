//! Process guard
//!
//! Answers whether the OBS process is running by enumerating host processes.
//! A missing process is a normal `false`; a host that cannot enumerate
//! processes at all is an `Environment` error so it is never mistaken for
//! "not running".

use log::debug;
use sysinfo::{ProcessesToUpdate, System};

use crate::error::ControllerError;

/// Source of truth for "is this process running"
pub trait ProcessProbe {
    fn is_process_running(&self, process_name: &str) -> Result<bool, ControllerError>;
}

/// Host process enumeration via sysinfo
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoProbe;

impl ProcessProbe for SysinfoProbe {
    fn is_process_running(&self, process_name: &str) -> Result<bool, ControllerError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(ControllerError::Environment(
                "process enumeration is not supported on this platform".to_string(),
            ));
        }

        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);

        // The table always holds at least this process
        if system.processes().is_empty() {
            return Err(ControllerError::Environment(
                "process table could not be read".to_string(),
            ));
        }

        let running = system
            .processes()
            .values()
            .any(|process| process_name_matches(&process.name().to_string_lossy(), process_name));

        debug!("Process '{}' running: {}", process_name, running);
        Ok(running)
    }
}

/// Case-insensitive name comparison that ignores a trailing `.exe`
pub fn process_name_matches(candidate: &str, target: &str) -> bool {
    fn normalize(name: &str) -> String {
        let lower = name.trim().to_ascii_lowercase();
        match lower.strip_suffix(".exe") {
            Some(stem) => stem.to_string(),
            None => lower,
        }
    }
    !target.trim().is_empty() && normalize(candidate) == normalize(target)
}

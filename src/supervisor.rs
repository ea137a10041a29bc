//! Liveness supervision for the managed VPN client
//!
//! The client is an external executable; the agent only checks that a
//! process with the right name exists and starts one from the install path
//! when it does not.

use crate::config::AgentConfig;
use crate::utils::hidden_command;
use log::{error, info};
use std::path::PathBuf;
use sysinfo::{ProcessesToUpdate, System};

/// Process-level view of the managed client.
///
/// Kept as a trait so the matching strategy can be swapped per platform
/// (and faked in tests).
pub trait Supervisor {
    /// Whether a client process is currently alive
    fn is_running(&mut self) -> bool;

    /// Start the client from its install path. A missing install is logged,
    /// not fatal.
    fn start(&mut self);
}

/// Supervisor backed by the OS process table
pub struct ClientSupervisor {
    system: System,
    process_name: String,
    client_path: PathBuf,
}

impl ClientSupervisor {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            system: System::new(),
            process_name: config.client_exe_name.to_lowercase(),
            client_path: config.client_path.clone(),
        }
    }
}

impl Supervisor for ClientSupervisor {
    fn is_running(&mut self) -> bool {
        self.system.refresh_processes(ProcessesToUpdate::All, true);
        self.system.processes().values().any(|process| {
            process
                .name()
                .to_string_lossy()
                .to_lowercase()
                .contains(&self.process_name)
        })
    }

    fn start(&mut self) {
        if !self.client_path.exists() {
            error!("Client not found at {}", self.client_path.display());
            return;
        }

        match hidden_command(&self.client_path).spawn() {
            Ok(child) => info!("Started client (pid {})", child.id()),
            Err(e) => error!("Failed to start client: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supervisor_for(name: &str, path: PathBuf) -> ClientSupervisor {
        let config = AgentConfig {
            client_exe_name: name.to_string(),
            client_path: path,
            ..AgentConfig::default()
        };
        ClientSupervisor::new(&config)
    }

    #[test]
    fn test_detects_own_test_process() {
        // Match on a prefix of our own executable name; process names can be
        // truncated by the OS, so a full-name match is not reliable here.
        let exe = std::env::current_exe().unwrap();
        let name = exe.file_name().unwrap().to_string_lossy().to_string();
        let prefix: String = name.chars().take(8).collect();

        let mut supervisor = supervisor_for(&prefix, exe);
        assert!(supervisor.is_running());
    }

    #[test]
    fn test_absent_process_not_running() {
        let mut supervisor = supervisor_for(
            "no-such-process-name-1f9e2d",
            PathBuf::from("/nonexistent/client"),
        );
        assert!(!supervisor.is_running());
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let exe = std::env::current_exe().unwrap();
        let name = exe.file_name().unwrap().to_string_lossy().to_string();
        let prefix: String = name.chars().take(8).collect();

        let mut supervisor = supervisor_for(&prefix.to_uppercase(), exe);
        assert!(supervisor.is_running());
    }

    #[test]
    fn test_start_with_missing_install_path() {
        let mut supervisor = supervisor_for(
            "no-such-process-name-1f9e2d",
            PathBuf::from("/nonexistent/client"),
        );
        // Logged and ignored
        supervisor.start();
    }
}

//! Agent configuration
//!
//! All deployment constants live in one immutable struct handed to each
//! component at construction.

use std::path::PathBuf;
use std::time::Duration;

/// User-agent header for all agent HTTP traffic
pub const USER_AGENT: &str = "SwiftTunnel-Agent";

/// Local data directory name, shared with the client
const APP_DIR: &str = "SwiftTunnel";

/// Plain-text record of the last installed client version
const VERSION_FILENAME: &str = "installed_version.txt";

/// Scratch filename for the downloaded installer
const ARTIFACT_FILENAME: &str = "SwiftTunnel-Setup.msi";

const CHECK_INTERVAL_MINUTES: u64 = 60;
const METADATA_TIMEOUT_SECS: u64 = 10;

/// Download timeout sized for the full installer over a slow connection
const DOWNLOAD_TIMEOUT_SECS: u64 = 600;

/// Release metadata endpoint (JSON body with a `tag_name` field)
const METADATA_URL: &str =
    "https://api.github.com/repos/Swift-tunnel/swifttunnel-app/releases/latest";

/// Installer artifact endpoint
const INSTALLER_URL: &str =
    "https://github.com/Swift-tunnel/swifttunnel-app/releases/latest/download/SwiftTunnel-Setup.msi";

#[cfg(windows)]
const CLIENT_EXE_NAME: &str = "SwiftTunnel.exe";
#[cfg(not(windows))]
const CLIENT_EXE_NAME: &str = "swifttunnel";

/// Fixed settings for one agent instance
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Time between scheduled update checks
    pub check_interval: Duration,
    /// Process name used for client liveness matching
    pub client_exe_name: String,
    /// Full path to the installed client executable
    pub client_path: PathBuf,
    /// Path of the persisted version record
    pub version_file: PathBuf,
    /// Scratch path for the downloaded installer
    pub artifact_path: PathBuf,
    /// Release metadata endpoint
    pub metadata_url: String,
    /// Installer artifact endpoint
    pub download_url: String,
    /// Timeout for the metadata request
    pub metadata_timeout: Duration,
    /// Timeout for the artifact download
    pub download_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(CHECK_INTERVAL_MINUTES * 60),
            client_exe_name: CLIENT_EXE_NAME.to_string(),
            client_path: default_client_path(),
            version_file: agent_data_dir().join(VERSION_FILENAME),
            artifact_path: std::env::temp_dir().join(ARTIFACT_FILENAME),
            metadata_url: METADATA_URL.to_string(),
            download_url: INSTALLER_URL.to_string(),
            metadata_timeout: Duration::from_secs(METADATA_TIMEOUT_SECS),
            download_timeout: Duration::from_secs(DOWNLOAD_TIMEOUT_SECS),
        }
    }
}

/// Local data directory for the agent (logs, version record, crash logs)
pub fn agent_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(windows)]
fn default_client_path() -> PathBuf {
    PathBuf::from(r"C:\Program Files\SwiftTunnel").join(CLIENT_EXE_NAME)
}

#[cfg(not(windows))]
fn default_client_path() -> PathBuf {
    PathBuf::from("/opt/swifttunnel/bin").join(CLIENT_EXE_NAME)
}

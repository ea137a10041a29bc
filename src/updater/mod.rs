//! Auto-update pipeline for the managed VPN client
//!
//! Checks the release endpoint for newer versions, downloads the installer
//! and runs it unattended, and records the installed version on disk.

pub mod checker;
pub mod cycle;
pub mod installer;
pub mod store;

pub use checker::ReleaseChecker;
pub use cycle::{UpdateAgent, UpdateCycle};
pub use installer::{InstallRunner, Installer};
pub use store::VersionStore;

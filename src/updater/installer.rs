//! Installer download and execution
//!
//! Streams the published installer to a scratch path, then runs it
//! unattended and waits for the exit status.

use crate::config::{AgentConfig, USER_AGENT};
use crate::error::AgentError;
use futures_util::StreamExt;
use log::{debug, info};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Runs a downloaded installer artifact
pub trait InstallRunner: Send + Sync {
    fn run(&self, artifact: &Path) -> Result<(), AgentError>;
}

/// Production runner: silent, unattended install with no visible window
pub struct SilentInstall;

impl InstallRunner for SilentInstall {
    fn run(&self, artifact: &Path) -> Result<(), AgentError> {
        let status = install_command(artifact)
            .status()
            .map_err(|e| AgentError::Install(format!("failed to launch installer: {}", e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(AgentError::Install(format!(
                "installer exited with {}",
                status
            )))
        }
    }
}

/// msiexec with /qn runs the install completely silently
#[cfg(windows)]
fn install_command(artifact: &Path) -> std::process::Command {
    let mut command = crate::utils::hidden_command("msiexec");
    command.arg("/i").arg(artifact).args(["/qn", "/norestart"]);
    command
}

#[cfg(not(windows))]
fn install_command(artifact: &Path) -> std::process::Command {
    let mut command = std::process::Command::new(artifact);
    command.arg("/S");
    command
}

/// Downloads and applies one release
pub struct Installer {
    client: reqwest::Client,
    download_url: String,
    artifact_path: PathBuf,
    runner: Box<dyn InstallRunner>,
}

impl Installer {
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        Self::with_runner(config, Box::new(SilentInstall))
    }

    /// Same wiring with a custom runner
    pub fn with_runner(
        config: &AgentConfig,
        runner: Box<dyn InstallRunner>,
    ) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.download_timeout)
            .build()?;

        Ok(Self {
            client,
            download_url: config.download_url.clone(),
            artifact_path: config.artifact_path.clone(),
            runner,
        })
    }

    /// Download the installer for `version` and run it unattended.
    ///
    /// The artifact is removed after a successful install and left on disk
    /// after a failed one; the next attempt overwrites it.
    pub async fn download_and_install(&self, version: &str) -> Result<(), AgentError> {
        self.download().await?;

        info!("Running installer for v{}", version);
        self.runner.run(&self.artifact_path)?;

        if let Err(e) = std::fs::remove_file(&self.artifact_path) {
            debug!("Could not remove installer artifact: {}", e);
        }
        info!("Installed v{}", version);
        Ok(())
    }

    async fn download(&self) -> Result<(), AgentError> {
        info!("Downloading installer from {}", self.download_url);

        let response = self
            .client
            .get(&self.download_url)
            .send()
            .await
            .map_err(|e| AgentError::NetworkUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AgentError::NetworkUnavailable(format!(
                "download endpoint returned {}",
                response.status()
            )));
        }

        if let Some(parent) = self.artifact_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.storage_err(e))?;
        }

        let total_size = response.content_length().unwrap_or(0);
        let mut file = tokio::fs::File::create(&self.artifact_path)
            .await
            .map_err(|e| self.storage_err(e))?;

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| AgentError::NetworkUnavailable(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| self.storage_err(e))?;
            downloaded += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| self.storage_err(e))?;

        // A short read means a broken transfer; drop the partial file so a
        // failed download is never mistaken for an installer.
        if total_size > 0 && downloaded != total_size {
            let _ = tokio::fs::remove_file(&self.artifact_path).await;
            return Err(AgentError::NetworkUnavailable(format!(
                "download incomplete: expected {} bytes, got {}",
                total_size, downloaded
            )));
        }

        debug!(
            "Downloaded {} bytes to {}",
            downloaded,
            self.artifact_path.display()
        );
        Ok(())
    }

    fn storage_err(&self, source: std::io::Error) -> AgentError {
        AgentError::Storage {
            path: self.artifact_path.clone(),
            source,
        }
    }
}

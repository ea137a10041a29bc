//! Release metadata checker
//!
//! Asks the release endpoint for the latest published client version. Any
//! network or decoding problem is reported as "no release info" so the
//! caller can fall through to supervising the client.

use crate::config::{AgentConfig, USER_AGENT};
use crate::error::AgentError;
use log::{debug, warn};
use serde::Deserialize;

/// Release metadata payload. Only the tag matters to the agent.
#[derive(Debug, Deserialize)]
struct ReleaseMetadata {
    tag_name: String,
}

/// Checker that queries the release metadata endpoint
pub struct ReleaseChecker {
    client: reqwest::Client,
    metadata_url: String,
}

impl ReleaseChecker {
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.metadata_timeout)
            .build()?;

        Ok(Self {
            client,
            metadata_url: config.metadata_url.clone(),
        })
    }

    /// Latest published version, or `None` when the endpoint is unreachable
    /// or answers with something unusable.
    pub async fn latest_version(&self) -> Option<String> {
        match self.fetch_latest().await {
            Ok(version) => {
                debug!("Latest published version: {}", version);
                Some(version)
            }
            Err(e) => {
                warn!("Release check failed: {}", e);
                None
            }
        }
    }

    async fn fetch_latest(&self) -> Result<String, AgentError> {
        let response = self
            .client
            .get(&self.metadata_url)
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await
            .map_err(|e| AgentError::NetworkUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AgentError::NetworkUnavailable(format!(
                "release endpoint returned {}",
                response.status()
            )));
        }

        let release: ReleaseMetadata = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(e.to_string()))?;

        // Tags may carry a "v" prefix ("v2023.4")
        let version = release.tag_name.trim().trim_start_matches('v').to_string();
        if version.is_empty() {
            return Err(AgentError::Parse(
                "empty tag_name in release metadata".to_string(),
            ));
        }

        Ok(version)
    }
}

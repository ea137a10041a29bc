//! Periodic driver for the update cycle

use crate::updater::UpdateAgent;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Spawn the background loop: one cycle immediately, then one per interval,
/// forever. Overlap with manual triggers is resolved by the agent's guard.
pub fn spawn(
    handle: &tokio::runtime::Handle,
    agent: Arc<UpdateAgent>,
    interval: Duration,
) -> JoinHandle<()> {
    handle.spawn(async move {
        loop {
            agent.run_cycle().await;
            debug!("Next scheduled check in {:?}", interval);
            tokio::time::sleep(interval).await;
        }
    })
}

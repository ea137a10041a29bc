//! One update pass over the managed client, plus the shared guard that
//! keeps concurrent passes from interleaving

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::supervisor::{ClientSupervisor, Supervisor};
use crate::updater::checker::ReleaseChecker;
use crate::updater::installer::Installer;
use crate::updater::store::VersionStore;
use crate::version;
use log::{debug, error, info};
use tokio::sync::Mutex;

/// A single check, compare, install, supervise pass
pub struct UpdateCycle {
    store: VersionStore,
    checker: ReleaseChecker,
    installer: Installer,
    supervisor: Box<dyn Supervisor + Send>,
}

impl UpdateCycle {
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        Ok(Self {
            store: VersionStore::new(config.version_file.clone()),
            checker: ReleaseChecker::new(config)?,
            installer: Installer::new(config)?,
            supervisor: Box::new(ClientSupervisor::new(config)),
        })
    }

    /// Assemble a cycle from pre-built parts
    pub fn with_parts(
        store: VersionStore,
        checker: ReleaseChecker,
        installer: Installer,
        supervisor: Box<dyn Supervisor + Send>,
    ) -> Self {
        Self {
            store,
            checker,
            installer,
            supervisor,
        }
    }

    /// Run one pass. Failures are logged; the client liveness check at the
    /// end runs no matter what happened before it.
    pub async fn run(&mut self) {
        let current = self.store.read();
        debug!("Recorded client version: {}", current);

        if let Some(latest) = self.checker.latest_version().await {
            if version::is_newer(&current, &latest) {
                info!("Update available: {} -> {}", current, latest);
                if let Err(e) = self.apply(&latest).await {
                    error!("Update to v{} failed: {}", latest, e);
                }
            } else {
                debug!("No newer release ({} vs {})", current, latest);
            }
        }

        self.ensure_client_running();
    }

    // The version record is written before the install runs and is not
    // rolled back if the install fails (see DESIGN.md).
    async fn apply(&mut self, latest: &str) -> Result<(), AgentError> {
        self.store.write(latest)?;
        self.installer.download_and_install(latest).await
    }

    fn ensure_client_running(&mut self) {
        if self.supervisor.is_running() {
            debug!("Client is running");
        } else {
            info!("Client not running, starting it");
            self.supervisor.start();
        }
    }
}

/// Shared handle that serializes cycle execution between the scheduler and
/// manual triggers: at most one cycle runs at a time, extra triggers are
/// dropped.
pub struct UpdateAgent {
    cycle: Mutex<UpdateCycle>,
}

impl UpdateAgent {
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        Ok(Self::from_cycle(UpdateCycle::new(config)?))
    }

    pub fn from_cycle(cycle: UpdateCycle) -> Self {
        Self {
            cycle: Mutex::new(cycle),
        }
    }

    /// Run one cycle unless another one is already in flight
    pub async fn run_cycle(&self) {
        match self.cycle.try_lock() {
            Ok(mut cycle) => cycle.run().await,
            Err(_) => info!("Update cycle already in flight, skipping trigger"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::updater::installer::InstallRunner;
    use crate::updater::store::UNKNOWN_VERSION;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FakeSupervisor {
        running: bool,
        checks: Arc<AtomicUsize>,
        starts: Arc<AtomicUsize>,
    }

    impl Supervisor for FakeSupervisor {
        fn is_running(&mut self) -> bool {
            self.checks.fetch_add(1, Ordering::SeqCst);
            self.running
        }

        fn start(&mut self) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct RecordingRunner {
        calls: Arc<AtomicUsize>,
    }

    impl InstallRunner for RecordingRunner {
        fn run(&self, _artifact: &Path) -> Result<(), AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Harness {
        cycle: UpdateCycle,
        version_file: std::path::PathBuf,
        installs: Arc<AtomicUsize>,
        checks: Arc<AtomicUsize>,
        starts: Arc<AtomicUsize>,
    }

    /// Wire a cycle against `base_url` (a mock server, or an unreachable
    /// address) with everything else in a temp directory.
    fn harness(base_url: &str, dir: &Path, client_running: bool) -> Harness {
        let config = AgentConfig {
            client_exe_name: "no-such-process-name-1f9e2d".to_string(),
            client_path: dir.join("client"),
            version_file: dir.join("installed_version.txt"),
            artifact_path: dir.join("Setup.msi"),
            metadata_url: format!("{}/releases/latest", base_url),
            download_url: format!("{}/download/Setup.msi", base_url),
            metadata_timeout: Duration::from_secs(2),
            download_timeout: Duration::from_secs(5),
            ..AgentConfig::default()
        };

        let installs = Arc::new(AtomicUsize::new(0));
        let checks = Arc::new(AtomicUsize::new(0));
        let starts = Arc::new(AtomicUsize::new(0));

        let cycle = UpdateCycle::with_parts(
            VersionStore::new(config.version_file.clone()),
            ReleaseChecker::new(&config).unwrap(),
            Installer::with_runner(
                &config,
                Box::new(RecordingRunner {
                    calls: Arc::clone(&installs),
                }),
            )
            .unwrap(),
            Box::new(FakeSupervisor {
                running: client_running,
                checks: Arc::clone(&checks),
                starts: Arc::clone(&starts),
            }),
        );

        Harness {
            cycle,
            version_file: config.version_file,
            installs,
            checks,
            starts,
        }
    }

    async fn mock_release(server: &MockServer, tag: &str) {
        Mock::given(method("GET"))
            .and(path("/releases/latest"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "tag_name": tag })),
            )
            .mount(server)
            .await;
    }

    async fn mock_installer_bytes(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/download/Setup.msi"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 256]))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_newer_release_is_installed_and_client_started() {
        let server = MockServer::start().await;
        mock_release(&server, "2023.4").await;
        mock_installer_bytes(&server).await;

        let dir = tempfile::tempdir().unwrap();
        let mut h = harness(&server.uri(), dir.path(), false);
        VersionStore::new(&h.version_file).write("2023.3").unwrap();

        h.cycle.run().await;

        assert_eq!(VersionStore::new(&h.version_file).read(), "2023.4");
        assert_eq!(h.installs.load(Ordering::SeqCst), 1);
        assert_eq!(h.checks.load(Ordering::SeqCst), 1);
        assert_eq!(h.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_equal_release_skips_install_but_supervises() {
        let server = MockServer::start().await;
        mock_release(&server, "2023.4").await;

        let dir = tempfile::tempdir().unwrap();
        let mut h = harness(&server.uri(), dir.path(), true);
        VersionStore::new(&h.version_file).write("2023.4").unwrap();

        h.cycle.run().await;

        assert_eq!(VersionStore::new(&h.version_file).read(), "2023.4");
        assert_eq!(h.installs.load(Ordering::SeqCst), 0);
        assert_eq!(h.checks.load(Ordering::SeqCst), 1);
        assert_eq!(h.starts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unavailable_release_info_still_supervises() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = harness("http://127.0.0.1:9", dir.path(), false);

        h.cycle.run().await;

        assert!(!h.version_file.exists());
        assert_eq!(h.installs.load(Ordering::SeqCst), 0);
        assert_eq!(h.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_repeated_cycles_without_oracle_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = harness("http://127.0.0.1:9", dir.path(), true);

        h.cycle.run().await;
        h.cycle.run().await;

        assert_eq!(VersionStore::new(&h.version_file).read(), UNKNOWN_VERSION);
        assert_eq!(h.installs.load(Ordering::SeqCst), 0);
        assert_eq!(h.checks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_malformed_remote_version_does_not_update() {
        let server = MockServer::start().await;
        mock_release(&server, "latest-build").await;

        let dir = tempfile::tempdir().unwrap();
        let mut h = harness(&server.uri(), dir.path(), true);
        VersionStore::new(&h.version_file).write("2023.3").unwrap();

        h.cycle.run().await;

        assert_eq!(VersionStore::new(&h.version_file).read(), "2023.3");
        assert_eq!(h.installs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_triggers_run_one_cycle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/releases/latest"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "tag_name": "2023.4" }))
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let h = harness(&server.uri(), dir.path(), true);
        VersionStore::new(&h.version_file).write("2023.4").unwrap();

        let agent = UpdateAgent::from_cycle(h.cycle);
        tokio::join!(agent.run_cycle(), agent.run_cycle());

        // The second trigger is dropped while the first holds the guard
        assert_eq!(h.checks.load(Ordering::SeqCst), 1);
    }
}

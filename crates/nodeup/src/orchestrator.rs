//! Cluster bootstrap pipeline.
//!
//! Stages run strictly in order:
//! 1. Discover instances and classify them into roles
//! 2. Create the inventory on the bastion
//! 3. Install Kubernetes (long-running)
//! 4. Fetch and rewrite the kubeconfig
//! 5. Save the kubeconfig locally
//!
//! A failure in stages 1-3 ends the run with a failed report. Stages 4 and 5
//! only log; the cluster is up even if its credentials could not be saved.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::compute::ComputeLister;
use crate::config::NodeupConfig;
use crate::error::BootstrapError;
use crate::fs::{LocalFs, CREDENTIALS_MODE};
use crate::inventory::{Inventory, Role};
use crate::kubeconfig;
use crate::ssh::{CommandSpec, RemoteExecutor, RemoteTarget};
use crate::stage::BootstrapStage;

/// Final result of a bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    /// Whether the cluster was installed.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
}

impl BootstrapReport {
    /// A successful report.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// A failed report.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// What became of the cluster credentials.
enum Credentials {
    Saved(PathBuf),
    Skipped(String),
}

/// Drives a bootstrap through its stages.
pub struct Orchestrator {
    config: Arc<NodeupConfig>,
    lister: Arc<dyn ComputeLister>,
    executor: Arc<dyn RemoteExecutor>,
    fs: Arc<dyn LocalFs>,
}

impl Orchestrator {
    /// Create an orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        config: Arc<NodeupConfig>,
        lister: Arc<dyn ComputeLister>,
        executor: Arc<dyn RemoteExecutor>,
        fs: Arc<dyn LocalFs>,
    ) -> Self {
        Self {
            config,
            lister,
            executor,
            fs,
        }
    }

    /// Bootstrap the cluster `cluster`.
    ///
    /// Never fails: every outcome is described by the returned report.
    pub async fn bootstrap(&self, cluster: &str) -> BootstrapReport {
        info!(
            cluster,
            host = %self.config.bastion_host,
            "Starting cluster bootstrap"
        );

        let mut stage = BootstrapStage::Discover;
        match self.run(cluster, &mut stage).await {
            Ok(report) => {
                info!(message = %report.message, "Cluster bootstrap complete");
                report
            }
            Err(e) => {
                error!(stage = %stage, error = %e, "Cluster bootstrap failed");
                BootstrapReport::failure(e.to_string())
            }
        }
    }

    async fn run(
        &self,
        cluster: &str,
        stage: &mut BootstrapStage,
    ) -> Result<BootstrapReport, BootstrapError> {
        let target = self.config.target();

        announce(*stage);
        let instances = self.lister.list_instances(cluster).await?;
        let inventory = Inventory::from_instances(&instances);
        if inventory.is_empty() {
            return Err(BootstrapError::EmptyInventory);
        }
        info!(
            control_planes = inventory.count(Role::ControlPlane),
            workers = inventory.count(Role::Worker),
            skipped = instances.len() - inventory.len(),
            "Classified instances"
        );

        advance(stage);
        let payload = inventory.to_json()?;
        let spec = CommandSpec::new(
            self.config.playbooks.inventory_command(&payload),
            self.config.timeouts.inventory,
        );
        self.executor
            .run(&target, &spec)
            .await
            .map_err(BootstrapError::Inventory)?;

        advance(stage);
        let spec = CommandSpec::new(
            self.config.playbooks.install_command(),
            self.config.timeouts.install,
        );
        let result = self
            .executor
            .run(&target, &spec)
            .await
            .map_err(BootstrapError::Install)?;
        info!(
            elapsed_secs = result.elapsed.as_secs(),
            "Kubernetes installation finished"
        );

        advance(stage);
        let credentials = match self.fetch_credentials(&target).await {
            Ok(document) => {
                advance(stage);
                self.persist(&document)
            }
            Err(reason) => Credentials::Skipped(reason),
        };
        *stage = BootstrapStage::Done;

        let count = inventory.len();
        let message = match credentials {
            Credentials::Saved(path) => format!(
                "{count} instances bootstrapped, credentials at {}",
                path.display()
            ),
            Credentials::Skipped(reason) => {
                format!("{count} instances bootstrapped, credentials not saved: {reason}")
            }
        };
        Ok(BootstrapReport::success(message))
    }

    /// Read the remote kubeconfig and rewrite it for tunnelled access.
    async fn fetch_credentials(&self, target: &RemoteTarget) -> Result<String, String> {
        let spec = CommandSpec::new(
            self.config.playbooks.credentials_command(),
            self.config.timeouts.credentials,
        );

        let raw = match self.executor.run_capture(target, &spec).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Failed to fetch kubeconfig");
                return Err(format!("failed to fetch kubeconfig: {e}"));
            }
        };
        if raw.trim().is_empty() {
            warn!("Remote kubeconfig is empty");
            return Err("remote kubeconfig is empty".to_string());
        }

        let rewritten = kubeconfig::rewrite(&raw);
        match &rewritten.api_host {
            Some(host) => info!(
                "Reach the API server through an SSH tunnel: {}",
                kubeconfig::tunnel_command(host, &target.user, &target.host)
            ),
            None => warn!("No API server address found in kubeconfig"),
        }
        Ok(rewritten.document)
    }

    fn persist(&self, document: &str) -> Credentials {
        let path = &self.config.kubeconfig_path;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = self.fs.ensure_dir(parent) {
                warn!(error = %e, "Failed to create kubeconfig directory");
                return Credentials::Skipped(e.to_string());
            }
        }
        if let Err(e) = self
            .fs
            .write_file(path, document.as_bytes(), CREDENTIALS_MODE)
        {
            warn!(error = %e, "Failed to save kubeconfig");
            return Credentials::Skipped(e.to_string());
        }

        info!(path = %path.display(), "Kubeconfig saved");
        Credentials::Saved(path.clone())
    }
}

/// Move to the following stage and log it.
fn advance(stage: &mut BootstrapStage) -> BootstrapStage {
    *stage = stage.next();
    announce(*stage);
    *stage
}

fn announce(stage: BootstrapStage) {
    info!(
        "[{}/{}] {}",
        stage.step_number(),
        BootstrapStage::TOTAL_STEPS,
        stage.description()
    );
}

//! Remote Kubernetes cluster bootstrap for Elemento compute.
//!
//! This library drives a cluster installation on a bastion host over SSH:
//! it discovers the compute instances of a cluster, hands a role inventory to
//! the remote installation playbooks, waits for the (long) install to finish
//! and brings the resulting kubeconfig back to the operator's machine.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use nodeup::{EcloudLister, NodeupConfig, Orchestrator, SshExecutor, StdFs};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(NodeupConfig::new("51.159.157.254"));
//!     let lister = EcloudLister::from_config(&ecloud::EcloudConfig::new("nodeup", "0.1.0")?)?;
//!     let orchestrator = Orchestrator::new(
//!         Arc::clone(&config),
//!         Arc::new(lister),
//!         Arc::new(SshExecutor::new(Arc::clone(&config))),
//!         Arc::new(StdFs),
//!     );
//!     let report = orchestrator.bootstrap("my-cluster").await;
//!     println!("{}", report.message);
//!     Ok(())
//! }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod compute;
pub mod config;
pub mod error;
pub mod fs;
pub mod inventory;
pub mod kubeconfig;
pub mod orchestrator;
pub mod ssh;
pub mod stage;

pub use compute::{ComputeLister, EcloudLister};
pub use config::{NodeupConfig, Playbooks, SshSettings, StageTimeouts};
pub use error::{BootstrapError, ExecError, FsError, KeyError, ListError};
pub use fs::{LocalFs, StdFs};
pub use inventory::{Instance, Inventory, Role, RoleAssignment};
pub use orchestrator::{BootstrapReport, Orchestrator};
pub use ssh::{
    AuthMethod, CommandResult, CommandSpec, FileKeyLoader, KeyLoader, LogProgress, Progress,
    ProgressObserver, RemoteExecutor, RemoteTarget, SshExecutor,
};
pub use stage::BootstrapStage;

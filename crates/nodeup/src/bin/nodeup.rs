//! nodeup CLI - Kubernetes cluster bootstrap on Elemento compute.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ecloud::EcloudConfig;
use nodeup::config::DEFAULT_SSH_USER;
use nodeup::{
    CommandSpec, ComputeLister, EcloudLister, NodeupConfig, Orchestrator, RemoteExecutor, Role,
    SshExecutor, StdFs,
};

/// nodeup CLI - Kubernetes cluster bootstrap over SSH.
#[derive(Parser)]
#[command(name = "nodeup")]
#[command(about = "Bootstrap Kubernetes clusters on Elemento compute instances")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// ecloud configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Compute daemon URL (or set `ECLOUD_COMPUTE_URL` env var).
    #[arg(long, env = "ECLOUD_COMPUTE_URL", global = true)]
    compute_url: Option<String>,

    /// SSH user on the bastion.
    #[arg(long, env = "NODEUP_SSH_USER", default_value = DEFAULT_SSH_USER, global = true)]
    user: String,

    /// SSH port on the bastion.
    #[arg(long, default_value = "22", global = true)]
    port: u16,

    /// Private key to try (repeatable). Defaults to ~/.ssh/id_rsa and ~/.ssh/id_ed25519.
    #[arg(long = "key", global = true)]
    keys: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install Kubernetes on the instances of a cluster.
    Bootstrap {
        /// Cluster name.
        #[arg(long)]
        cluster: String,

        /// Bastion host the playbooks run on.
        #[arg(long, env = "NODEUP_BASTION_HOST")]
        host: String,

        /// Where to save the kubeconfig (default ~/.kube/kubeconfig).
        #[arg(long)]
        kubeconfig: Option<PathBuf>,
    },

    /// List the instances of a cluster and their roles.
    Instances {
        /// Cluster name.
        #[arg(long)]
        cluster: String,
    },

    /// Run one command on a host.
    Exec {
        /// Target host.
        #[arg(long, env = "NODEUP_BASTION_HOST")]
        host: String,

        /// Timeout in seconds.
        #[arg(long, default_value = "300")]
        timeout: u64,

        /// Command line to run.
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },
}

impl Cli {
    fn ecloud_config(&self) -> Result<EcloudConfig> {
        let config = match &self.config {
            Some(path) => EcloudConfig::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => EcloudConfig::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))?,
        };
        Ok(match &self.compute_url {
            Some(url) => config.with_compute_url(url.clone()),
            None => config,
        })
    }

    fn nodeup_config(&self, host: &str) -> NodeupConfig {
        let config = NodeupConfig::new(host)
            .with_user(self.user.clone())
            .with_port(self.port);
        if self.keys.is_empty() {
            config
        } else {
            config.with_key_paths(self.keys.clone())
        }
    }

    fn lister(&self) -> Result<EcloudLister> {
        let ecloud = self.ecloud_config()?;
        EcloudLister::from_config(&ecloud).context("Failed to create compute client")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Bootstrap {
            cluster,
            host,
            kubeconfig,
        } => {
            let mut config = cli.nodeup_config(host);
            if let Some(path) = kubeconfig {
                config = config.with_kubeconfig_path(path.clone());
            }
            let config = Arc::new(config);

            let orchestrator = Orchestrator::new(
                Arc::clone(&config),
                Arc::new(cli.lister()?),
                Arc::new(SshExecutor::new(Arc::clone(&config))),
                Arc::new(StdFs),
            );
            let report = orchestrator.bootstrap(cluster).await;

            println!("{}", report.message);
            if !report.success {
                std::process::exit(1);
            }
        }

        Commands::Instances { cluster } => {
            let instances = cli
                .lister()?
                .list_instances(cluster)
                .await
                .context("Failed to list compute instances")?;

            println!("\n{:<40} {:<38} {:<14}", "NAME", "ID", "ROLE");
            println!("{}", "-".repeat(92));
            for instance in &instances {
                let role = Role::classify(&instance.name)
                    .map_or_else(|| "-".to_string(), |r| r.to_string());
                println!(
                    "{:<40} {:<38} {:<14}",
                    instance.name, instance.instance_id, role
                );
            }
        }

        Commands::Exec {
            host,
            timeout,
            command,
        } => {
            let config = Arc::new(cli.nodeup_config(host));
            let executor = SshExecutor::new(Arc::clone(&config));
            let spec = CommandSpec::new(command.join(" "), Duration::from_secs(*timeout));

            info!(host = %host, command = %spec.command, "Running remote command");
            let result = executor
                .run(&config.target(), &spec)
                .await
                .context("Remote command failed")?;
            print!("{}", result.output_lossy());
        }
    }

    Ok(())
}

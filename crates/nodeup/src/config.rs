//! Bootstrap configuration.
//!
//! [`NodeupConfig`] is built once (by the CLI or the embedding program) and
//! shared read-only between the executor and the orchestrator.

use std::path::PathBuf;
use std::time::Duration;

use crate::kubeconfig;
use crate::ssh::RemoteTarget;

/// Conventional SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default SSH user on the bastion.
pub const DEFAULT_SSH_USER: &str = "root";

/// SSH connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshSettings {
    /// Login user.
    pub user: String,
    /// Remote port.
    pub port: u16,
    /// Private keys to try, in order.
    pub key_paths: Vec<PathBuf>,
    /// Bound on the TCP dial (and on each handshake read).
    pub dial_timeout: Duration,
    /// Bound on the whole connection phase: dial, handshake and auth.
    pub connect_timeout: Duration,
    /// Commands with a longer timeout report progress while they run.
    pub long_running_threshold: Duration,
    /// Interval between progress reports.
    pub progress_interval: Duration,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            user: DEFAULT_SSH_USER.to_string(),
            port: DEFAULT_SSH_PORT,
            key_paths: default_key_paths(),
            dial_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(45),
            long_running_threshold: Duration::from_secs(10 * 60),
            progress_interval: Duration::from_secs(60),
        }
    }
}

/// `~/.ssh/id_rsa` then `~/.ssh/id_ed25519`.
#[must_use]
pub fn default_key_paths() -> Vec<PathBuf> {
    dirs::home_dir()
        .map(|home| {
            let ssh = home.join(".ssh");
            vec![ssh.join("id_rsa"), ssh.join("id_ed25519")]
        })
        .unwrap_or_default()
}

/// Timeouts of the three remote stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimeouts {
    /// Inventory creation playbook.
    pub inventory: Duration,
    /// Cluster installation playbook.
    pub install: Duration,
    /// Reading the remote kubeconfig.
    pub credentials: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            inventory: Duration::from_secs(5 * 60),
            install: Duration::from_secs(30 * 60),
            credentials: Duration::from_secs(30),
        }
    }
}

/// Remote playbooks and files used by the bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playbooks {
    /// Playbook that turns the role list into an inventory file.
    pub inventory_playbook: String,
    /// Playbook that installs Kubernetes.
    pub install_playbook: String,
    /// Inventory file produced by the inventory playbook.
    pub inventory_file: String,
    /// Kubeconfig left on the bastion by the install playbook.
    pub remote_kubeconfig: String,
}

impl Default for Playbooks {
    fn default() -> Self {
        Self {
            inventory_playbook: "inventory_creation.yaml".to_string(),
            install_playbook: "k8s_up.yaml".to_string(),
            inventory_file: "inventory.ini".to_string(),
            remote_kubeconfig: "kubeconfig".to_string(),
        }
    }
}

impl Playbooks {
    /// Inventory creation command for a JSON role list.
    #[must_use]
    pub fn inventory_command(&self, vms_json: &str) -> String {
        format!(
            "ansible-playbook {} -e 'vms_list={}'",
            self.inventory_playbook,
            shell_quote_inner(vms_json)
        )
    }

    /// Cluster installation command.
    ///
    /// Host key checking is disabled for the SSH hops ansible makes from the
    /// bastion to the freshly created instances.
    #[must_use]
    pub fn install_command(&self) -> String {
        format!(
            "ANSIBLE_HOST_KEY_CHECKING=False ansible-playbook -i {} {} -e 'ansible_ssh_common_args=\"-o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null\"'",
            self.inventory_file, self.install_playbook
        )
    }

    /// Command printing the remote kubeconfig.
    #[must_use]
    pub fn credentials_command(&self) -> String {
        format!("cat {}", self.remote_kubeconfig)
    }
}

/// Escape a value for use inside a single-quoted shell word.
fn shell_quote_inner(value: &str) -> String {
    value.replace('\'', r"'\''")
}

/// Complete bootstrap configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeupConfig {
    /// Host the playbooks run on.
    pub bastion_host: String,
    /// SSH settings for reaching the bastion.
    pub ssh: SshSettings,
    /// Per-stage command timeouts.
    pub timeouts: StageTimeouts,
    /// Remote playbook names.
    pub playbooks: Playbooks,
    /// Where the rewritten kubeconfig is written locally.
    pub kubeconfig_path: PathBuf,
}

impl NodeupConfig {
    /// Create a configuration with defaults for the given bastion host.
    #[must_use]
    pub fn new(bastion_host: impl Into<String>) -> Self {
        Self {
            bastion_host: bastion_host.into(),
            ssh: SshSettings::default(),
            timeouts: StageTimeouts::default(),
            playbooks: Playbooks::default(),
            kubeconfig_path: kubeconfig::default_kubeconfig_path()
                .unwrap_or_else(|| PathBuf::from(".kube").join("kubeconfig")),
        }
    }

    /// Set the SSH user.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.ssh.user = user.into();
        self
    }

    /// Set the SSH port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.ssh.port = port;
        self
    }

    /// Replace the private keys to try.
    #[must_use]
    pub fn with_key_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.ssh.key_paths = paths;
        self
    }

    /// Replace the SSH settings.
    #[must_use]
    pub fn with_ssh(mut self, ssh: SshSettings) -> Self {
        self.ssh = ssh;
        self
    }

    /// Replace the stage timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: StageTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Replace the playbook names.
    #[must_use]
    pub fn with_playbooks(mut self, playbooks: Playbooks) -> Self {
        self.playbooks = playbooks;
        self
    }

    /// Set the local kubeconfig output path.
    #[must_use]
    pub fn with_kubeconfig_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig_path = path.into();
        self
    }

    /// The bastion as a remote target.
    #[must_use]
    pub fn target(&self) -> RemoteTarget {
        RemoteTarget {
            host: self.bastion_host.clone(),
            port: self.ssh.port,
            user: self.ssh.user.clone(),
            key_paths: self.ssh.key_paths.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NodeupConfig::new("51.159.157.254");
        assert_eq!(config.ssh.user, "root");
        assert_eq!(config.ssh.port, 22);
        assert!(config.ssh.connect_timeout > config.ssh.dial_timeout);
        assert!(config.timeouts.install > config.ssh.long_running_threshold);
        assert!(config.timeouts.inventory < config.ssh.long_running_threshold);
        assert!(config.kubeconfig_path.ends_with("kubeconfig"));
    }

    #[test]
    fn test_builder_and_target() {
        let config = NodeupConfig::new("10.1.1.1")
            .with_user("admin")
            .with_port(2222)
            .with_key_paths(vec![PathBuf::from("/keys/a")])
            .with_kubeconfig_path("/tmp/kc");

        let target = config.target();
        assert_eq!(target.host, "10.1.1.1");
        assert_eq!(target.port, 2222);
        assert_eq!(target.user, "admin");
        assert_eq!(target.key_paths, vec![PathBuf::from("/keys/a")]);
        assert_eq!(config.kubeconfig_path, PathBuf::from("/tmp/kc"));
    }

    #[test]
    fn test_inventory_command_embeds_json() {
        let cmd = Playbooks::default().inventory_command(r#"[{"role":"nodes","uuid":"a"}]"#);
        assert_eq!(
            cmd,
            r#"ansible-playbook inventory_creation.yaml -e 'vms_list=[{"role":"nodes","uuid":"a"}]'"#
        );
    }

    #[test]
    fn test_inventory_command_escapes_single_quotes() {
        let cmd = Playbooks::default().inventory_command("it's");
        assert!(cmd.ends_with(r"vms_list=it'\''s'"));
    }

    #[test]
    fn test_install_and_credentials_commands() {
        let playbooks = Playbooks::default();
        let install = playbooks.install_command();
        assert!(install.starts_with("ANSIBLE_HOST_KEY_CHECKING=False ansible-playbook -i inventory.ini k8s_up.yaml"));
        assert!(install.contains("StrictHostKeyChecking=no"));
        assert!(install.contains("UserKnownHostsFile=/dev/null"));
        assert_eq!(playbooks.credentials_command(), "cat kubeconfig");
    }
}

//! Bootstrap pipeline stages.

use serde::{Deserialize, Serialize};

/// Stages of a cluster bootstrap, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapStage {
    /// Listing compute instances and classifying them.
    Discover,
    /// Creating the inventory on the bastion.
    Inventory,
    /// Installing Kubernetes.
    Install,
    /// Fetching the remote kubeconfig.
    Credentials,
    /// Writing the rewritten kubeconfig locally.
    Persist,
    /// Finished.
    Done,
}

impl BootstrapStage {
    /// Total number of working stages.
    pub const TOTAL_STEPS: u8 = 5;

    /// Get the next stage in the sequence.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Discover => Self::Inventory,
            Self::Inventory => Self::Install,
            Self::Install => Self::Credentials,
            Self::Credentials => Self::Persist,
            Self::Persist | Self::Done => Self::Done,
        }
    }

    /// Get a human-readable description of the stage.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Discover => "Discovering compute instances",
            Self::Inventory => "Creating cluster inventory",
            Self::Install => "Installing Kubernetes",
            Self::Credentials => "Fetching kubeconfig",
            Self::Persist => "Saving kubeconfig",
            Self::Done => "Complete",
        }
    }

    /// Get the step number for progress display.
    #[must_use]
    pub fn step_number(self) -> u8 {
        match self {
            Self::Discover => 1,
            Self::Inventory => 2,
            Self::Install => 3,
            Self::Credentials => 4,
            Self::Persist => 5,
            Self::Done => Self::TOTAL_STEPS,
        }
    }
}

impl std::fmt::Display for BootstrapStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

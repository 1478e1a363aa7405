//! Compute instance discovery.

use async_trait::async_trait;
use tracing::debug;

use crate::error::ListError;
use crate::inventory::Instance;

/// Label carrying the cluster an instance belongs to.
pub const CLUSTER_LABEL: &str = "cluster";

/// Enumerates the compute instances of a cluster.
#[async_trait]
pub trait ComputeLister: Send + Sync {
    /// List instances, in the order the compute service returns them.
    async fn list_instances(&self, cluster: &str) -> Result<Vec<Instance>, ListError>;
}

/// [`ComputeLister`] backed by the Elemento compute service.
#[derive(Debug, Clone)]
pub struct EcloudLister {
    client: ecloud::ComputeClient,
}

impl EcloudLister {
    /// Wrap an existing compute client.
    #[must_use]
    pub fn new(client: ecloud::ComputeClient) -> Self {
        Self { client }
    }

    /// Build a lister from an ecloud configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ecloud::EcloudConfig) -> Result<Self, ecloud::ApiError> {
        Ok(Self::new(ecloud::ComputeClient::new(config)?))
    }
}

/// Keep servers of `cluster`. Servers without a cluster label are kept.
fn cluster_instances(servers: Vec<ecloud::ComputeServer>, cluster: &str) -> Vec<Instance> {
    servers
        .into_iter()
        .filter(|server| match server.label(CLUSTER_LABEL) {
            Some(label) if label != cluster => {
                debug!(server = %server.vm_name(), label, "Skipping server of another cluster");
                false
            }
            _ => true,
        })
        .map(|server| {
            let name = server.vm_name().to_string();
            Instance::new(name, server.unique_id)
        })
        .collect()
}

#[async_trait]
impl ComputeLister for EcloudLister {
    async fn list_instances(&self, cluster: &str) -> Result<Vec<Instance>, ListError> {
        let servers = self.client.list_servers().await?;
        Ok(cluster_instances(servers, cluster))
    }
}

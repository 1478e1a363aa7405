//! Role inventory for the remote installation playbooks.
//!
//! Roles are derived from instance names: anything named like a control plane
//! becomes one, anything else named like a node becomes a worker, and the rest
//! (bastions, gateways, ...) is left out of the cluster.

use serde::{Deserialize, Serialize};

/// A compute instance as seen by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Instance (VM) name.
    pub name: String,
    /// Unique instance identifier.
    pub instance_id: String,
}

impl Instance {
    /// Create an instance record.
    #[must_use]
    pub fn new(name: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance_id: instance_id.into(),
        }
    }
}

/// Cluster role of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Kubernetes control plane.
    #[serde(rename = "control-plane")]
    ControlPlane,
    /// Worker node. Serialized under the playbooks' group name.
    #[serde(rename = "nodes")]
    Worker,
}

impl Role {
    /// Classify an instance name. Matching is case-insensitive and
    /// `control-plane` wins over `node`.
    #[must_use]
    pub fn classify(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        if name.contains("control-plane") {
            Some(Self::ControlPlane)
        } else if name.contains("node") {
            Some(Self::Worker)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ControlPlane => write!(f, "control-plane"),
            Self::Worker => write!(f, "worker"),
        }
    }
}

/// One classified instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// Assigned role.
    pub role: Role,
    /// Instance identifier.
    #[serde(rename = "uuid")]
    pub instance_id: String,
}

/// Ordered role assignments, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    assignments: Vec<RoleAssignment>,
}

impl Inventory {
    /// Classify discovered instances, dropping those without a role.
    #[must_use]
    pub fn from_instances(instances: &[Instance]) -> Self {
        let assignments = instances
            .iter()
            .filter_map(|instance| {
                Role::classify(&instance.name).map(|role| RoleAssignment {
                    role,
                    instance_id: instance.instance_id.clone(),
                })
            })
            .collect();
        Self { assignments }
    }

    /// All assignments in order.
    #[must_use]
    pub fn assignments(&self) -> &[RoleAssignment] {
        &self.assignments
    }

    /// Number of assigned instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether nothing was classified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Number of instances with the given role.
    #[must_use]
    pub fn count(&self, role: Role) -> usize {
        self.assignments.iter().filter(|a| a.role == role).count()
    }

    /// JSON payload handed to the inventory playbook.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.assignments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instances(names: &[&str]) -> Vec<Instance> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Instance::new(*name, format!("id-{i}")))
            .collect()
    }

    #[test]
    fn test_classify() {
        assert_eq!(Role::classify("k8s-control-plane-1"), Some(Role::ControlPlane));
        assert_eq!(Role::classify("K8S-CONTROL-PLANE"), Some(Role::ControlPlane));
        assert_eq!(Role::classify("k8s-node-2"), Some(Role::Worker));
        assert_eq!(Role::classify("NodeA"), Some(Role::Worker));
        assert_eq!(Role::classify("bastion"), None);
        assert_eq!(Role::classify(""), None);
    }

    #[test]
    fn test_control_plane_wins_over_node() {
        assert_eq!(
            Role::classify("node-pool-control-plane"),
            Some(Role::ControlPlane)
        );
    }

    #[test]
    fn test_inventory_preserves_discovery_order() {
        let inventory = Inventory::from_instances(&instances(&[
            "k8s-node-1",
            "bastion",
            "k8s-control-plane-1",
            "k8s-node-2",
        ]));

        let ids: Vec<_> = inventory
            .assignments()
            .iter()
            .map(|a| a.instance_id.as_str())
            .collect();
        assert_eq!(ids, vec!["id-0", "id-2", "id-3"]);
        assert_eq!(inventory.count(Role::ControlPlane), 1);
        assert_eq!(inventory.count(Role::Worker), 2);
    }

    #[test]
    fn test_classification_is_total() {
        let names = [
            "control-plane",
            "CONTROL-PLANE-x",
            "node",
            "xNODEx",
            "gateway",
            "bastion",
            "ctrl",
            "nod",
            "control-planenode",
        ];
        let inventory = Inventory::from_instances(&instances(&names));

        let mut expected = Vec::new();
        for (i, name) in names.iter().enumerate() {
            let lower = name.to_lowercase();
            let role = if lower.contains("control-plane") {
                Some(Role::ControlPlane)
            } else if lower.contains("node") {
                Some(Role::Worker)
            } else {
                None
            };
            if let Some(role) = role {
                expected.push(RoleAssignment {
                    role,
                    instance_id: format!("id-{i}"),
                });
            }
        }
        assert_eq!(inventory.assignments(), expected.as_slice());
    }

    #[test]
    fn test_empty_when_nothing_matches() {
        let inventory = Inventory::from_instances(&instances(&["bastion", "gateway"]));
        assert!(inventory.is_empty());
        assert_eq!(inventory.len(), 0);
    }

    #[test]
    fn test_json_payload() {
        let inventory =
            Inventory::from_instances(&instances(&["k8s-control-plane-1", "k8s-node-1"]));
        assert_eq!(
            inventory.to_json().unwrap(),
            r#"[{"role":"control-plane","uuid":"id-0"},{"role":"nodes","uuid":"id-1"}]"#
        );
    }
}

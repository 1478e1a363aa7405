//! Compute daemon response models.
//!
//! The daemon schema is still moving, so every field is optional on the wire
//! and unknown fields are ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A VM as reported by the compute daemon status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeServer {
    /// Daemon-side name of the VM.
    #[serde(default)]
    pub name: String,
    /// Unique VM identifier.
    #[serde(rename = "uniqueID", default)]
    pub unique_id: String,
    /// Current status string (e.g. "running").
    #[serde(default)]
    pub status: String,
    /// Free-form labels attached at creation time.
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// The request the VM was created from.
    #[serde(rename = "req_json", default)]
    pub request: RequestConfig,
}

impl ComputeServer {
    /// Name the VM was requested with, falling back to the daemon name.
    #[must_use]
    pub fn vm_name(&self) -> &str {
        if self.request.vm_name.is_empty() {
            &self.name
        } else {
            &self.request.vm_name
        }
    }

    /// Value of a label, if present.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Creation request echoed back by the daemon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Requested VM name.
    #[serde(default)]
    pub vm_name: String,
    /// Number of CPU slots.
    #[serde(default)]
    pub slots: u32,
    /// RAM size in MB.
    #[serde(rename = "ramsize", default)]
    pub ram_size: u64,
    /// CPU architecture.
    #[serde(default)]
    pub arch: String,
    /// OS family (e.g. "linux").
    #[serde(default)]
    pub os_family: String,
    /// OS flavour (e.g. "ubuntu").
    #[serde(default)]
    pub os_flavour: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_partial_server() {
        let json = r#"{
            "name": "vm-1234",
            "uniqueID": "a1b2",
            "status": "running",
            "is_gateway": false,
            "req_json": {"vm_name": "k8s-control-plane-1", "slots": 4, "ramsize": 8192}
        }"#;

        let server: ComputeServer = serde_json::from_str(json).unwrap();
        assert_eq!(server.unique_id, "a1b2");
        assert_eq!(server.vm_name(), "k8s-control-plane-1");
        assert_eq!(server.request.ram_size, 8192);
        assert!(server.labels.is_empty());
    }

    #[test]
    fn test_vm_name_falls_back_to_name() {
        let server = ComputeServer {
            name: "bastion".into(),
            ..Default::default()
        };
        assert_eq!(server.vm_name(), "bastion");
    }
}

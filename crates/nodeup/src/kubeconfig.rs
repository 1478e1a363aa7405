//! Kubeconfig rewriting for tunnelled local access.
//!
//! The kubeconfig produced on the bastion points at the control plane's
//! private address and pins its CA. The operator reaches the API server
//! through an SSH tunnel to `localhost:6443`, so the document is rewritten:
//! - CA data lines become `insecure-skip-tls-verify: true`
//! - the API server host becomes `localhost`
//!
//! Both rewrites are plain line edits; the document is never parsed as YAML.

use std::path::PathBuf;

/// Lines containing this marker are replaced.
pub const CA_MARKER: &str = "certificate-authority-data:";

/// Replacement for CA data lines.
pub const INSECURE_SKIP_TLS_LINE: &str = "    insecure-skip-tls-verify: true";

/// Prefix of the API server line, after trimming.
pub const SERVER_PREFIX: &str = "server: https://";

/// Suffix of the API server line.
pub const API_PORT_SUFFIX: &str = ":6443";

/// Host the API server is reached through once tunnelled.
pub const LOOPBACK_HOST: &str = "localhost";

/// Get the default local kubeconfig path (`~/.kube/kubeconfig`).
#[must_use]
pub fn default_kubeconfig_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".kube").join("kubeconfig"))
}

/// Result of [`rewrite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    /// The rewritten document.
    pub document: String,
    /// API server host found in the original document, if any.
    pub api_host: Option<String>,
    /// Number of CA lines replaced.
    pub ca_lines_replaced: usize,
}

/// Rewrite a kubeconfig for access through a local tunnel.
///
/// Only the first API server line is considered. When it has no host between
/// prefix and port the server rewrite is skipped.
#[must_use]
pub fn rewrite(document: &str) -> Rewritten {
    let mut lines: Vec<String> = document.split('\n').map(str::to_string).collect();

    let mut ca_lines_replaced = 0;
    for line in &mut lines {
        if line.contains(CA_MARKER) {
            *line = INSECURE_SKIP_TLS_LINE.to_string();
            ca_lines_replaced += 1;
        }
    }

    let mut api_host = None;
    for line in &mut lines {
        let trimmed = line.trim();
        if trimmed.starts_with(SERVER_PREFIX) && trimmed.ends_with(API_PORT_SUFFIX) {
            let start = SERVER_PREFIX.len();
            let end = trimmed.len() - API_PORT_SUFFIX.len();
            if end > start {
                let host = trimmed[start..end].to_string();
                *line = line.replacen(&host, LOOPBACK_HOST, 1);
                api_host = Some(host);
            }
            break;
        }
    }

    Rewritten {
        document: lines.join("\n"),
        api_host,
        ca_lines_replaced,
    }
}

/// SSH command forwarding local port 6443 to the API server via the bastion.
#[must_use]
pub fn tunnel_command(api_host: &str, user: &str, bastion: &str) -> String {
    format!("ssh -nNT -L 6443:{api_host}:6443 {user}@{bastion}")
}

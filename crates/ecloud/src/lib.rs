//! Client SDK for the Elemento private cloud control plane.
//!
//! The control plane is a set of local daemons (compute, storage, network)
//! reachable over HTTP. This crate currently exposes the compute daemon
//! client, which is what cluster bootstrapping needs to discover the
//! instances it will install onto.
//!
//! # Example
//!
//! ```rust,ignore
//! use ecloud::{ComputeClient, EcloudConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EcloudConfig::new("nodeup", "0.1.0")?;
//!     let client = ComputeClient::new(&config)?;
//!
//!     for server in client.list_servers().await? {
//!         println!("{} {}", server.unique_id, server.vm_name());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod compute;
pub mod config;
mod error;

pub use compute::{ComputeClient, ComputeServer, RequestConfig};
pub use config::EcloudConfig;
pub use error::ApiError;

//! Compute daemon client.
//!
//! Wraps the VM endpoints of the local compute daemon.

mod client;
mod models;

pub use client::ComputeClient;
pub use models::*;

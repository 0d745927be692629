//! PowerDNS HTTP API access: the transport capability and wire shapes.

pub mod client;
pub mod types;

pub use client::{ApiClient, PowerDnsClient};

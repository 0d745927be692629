//! Endpoint → Server → Zone → RRSet object model.
//!
//! Children never own the transport: a [`Server`] holds the shared client,
//! a [`Zone`] holds a [`ServerBinding`] once bound, and an [`RRSet`] only
//! remembers the name of its zone.

pub mod endpoint;
pub mod rrset;
pub mod server;
pub mod zone;

pub use endpoint::Endpoint;
pub use rrset::{RRSet, Record};
pub use server::Server;
pub use zone::{PayloadMode, ServerBinding, Zone, ZoneDetail, ZonePayload};

//! Client-side model of PowerDNS servers, zones and RRSets.
//!
//! An [`Endpoint`] discovers servers over an [`ApiClient`]; servers load
//! their zones, zones load their RRSets. Changes are made in memory and
//! persisted explicitly with [`Zone::save`] and friends.

pub mod config;
pub mod error;
pub mod model;
pub mod powerdns;
pub mod soa;
pub mod validation;

pub use error::{Error, Result, TransportError};
pub use model::{Endpoint, PayloadMode, RRSet, Record, Server, ServerBinding, Zone, ZoneDetail};
pub use powerdns::client::{ApiClient, PowerDnsClient};
pub use powerdns::types::{ChangeType, DaemonType, ZoneKind};
pub use soa::{Email, Serial, SoaRecord};

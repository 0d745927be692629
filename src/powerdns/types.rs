//! Wire shapes of the PowerDNS HTTP API.
//!
//! These are the JSON documents exchanged with the server. The object model in
//! [`crate::model`] converts to and from them; nothing here does I/O.
use serde::{Deserialize, Serialize};

pub const DEFAULT_TTL: u32 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaemonType {
    Recursor,
    Authoritative,
}

/// Zone kind as reported by the server. Kinds this crate has no variant for
/// (catalog `Producer`/`Consumer`, recursor `Forwarded`, ...) are kept
/// verbatim in `Other` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneKind {
    Native,
    Master,
    Slave,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    #[default]
    Replace,
    Delete,
}

#[derive(Debug, Deserialize)]
pub struct ServerWire {
    pub id: String, // "localhost"
    pub version: String,
    pub daemon_type: DaemonType,
    // accepted on parse, paths are derived from `id`
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub config_url: Option<String>,
    #[serde(default)]
    pub zones_url: Option<String>,
}

/// Zone document as returned by `GET /servers/{id}/zones[/{zone}]`.
///
/// Every field is optional: a field the server omitted leaves the cached
/// value untouched on refresh. `url` and `last_check` are not modelled and
/// are dropped during deserialization.
#[derive(Debug, Default, Deserialize)]
pub struct ZoneWire {
    pub id: Option<String>,   // "example.com."
    pub name: Option<String>, // "example.com."
    #[serde(rename = "type")]
    pub zone_type: Option<String>, // "Zone"
    pub kind: Option<ZoneKind>,
    pub serial: Option<u32>,
    pub notified_serial: Option<u32>,
    pub masters: Option<Vec<String>>,
    pub rrsets: Option<Vec<RRSetWire>>,
    pub dnssec: Option<bool>,
    pub nsec3param: Option<String>,
    pub nsec3narrow: Option<bool>,
    pub presigned: Option<bool>,
    pub soa_edit: Option<String>,
    pub soa_edit_api: Option<String>,
    pub api_rectify: Option<bool>,
    pub zone: Option<String>,
    pub account: Option<String>,
    pub nameservers: Option<Vec<String>>,
    #[serde(rename = "tsig_mater_key_ids", alias = "tsig_master_key_ids")]
    pub tsig_master_key_ids: Option<Vec<String>>,
    pub tsig_slave_key_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RRSetWire {
    pub name: String, // "www.example.com."
    #[serde(rename = "type")]
    pub rrtype: String, // "A", "NS", ...
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changetype: Option<ChangeType>, // only meaningful when patching
    #[serde(default)]
    pub records: Vec<RecordWire>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<CommentWire>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordWire {
    pub content: String, // "192.0.2.1" or "ns1.example.net."
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentWire {
    pub content: String,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub modified_at: i64,
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

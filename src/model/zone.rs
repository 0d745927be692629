//! Zones: metadata, the owned RRSet sequence, and the create/save payloads.
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::rrset::RRSet;
use crate::powerdns::client::ApiClient;
use crate::powerdns::types::{ChangeType, RRSetWire, ZoneKind, ZoneWire};
use crate::soa::{Serial, SoaRecord};

/// The server a zone talks to: the transport plus the server id used to
/// build paths.
#[derive(Clone)]
pub struct ServerBinding {
    client: Arc<dyn ApiClient>,
    server_id: String,
}

impl fmt::Debug for ServerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBinding")
            .field("server_id", &self.server_id)
            .finish()
    }
}

impl ServerBinding {
    pub fn new(client: Arc<dyn ApiClient>, server_id: impl Into<String>) -> Self {
        Self {
            client,
            server_id: server_id.into(),
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn client(&self) -> &Arc<dyn ApiClient> {
        &self.client
    }

    pub fn zones_path(&self) -> String {
        format!("/servers/{}/zones", self.server_id)
    }

    pub fn zone_path(&self, zone: &str) -> String {
        format!("/servers/{}/zones/{}", self.server_id, zone)
    }
}

/// Zone metadata. Field defaults match what PowerDNS assumes when a field
/// is absent from a create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneDetail {
    pub id: Option<String>,
    pub name: String,
    pub zone_type: String,
    pub kind: Option<ZoneKind>,
    pub serial: Option<u32>,
    pub notified_serial: Option<u32>,
    pub masters: Vec<String>,
    pub dnssec: bool,
    pub nsec3param: Option<String>,
    pub nsec3narrow: bool,
    pub presigned: bool,
    pub soa_edit: Option<String>,
    pub soa_edit_api: Option<String>,
    pub api_rectify: bool,
    pub zone: Option<String>,
    pub account: Option<String>,
    pub nameservers: Vec<String>,
    pub tsig_master_key_ids: Vec<String>,
    pub tsig_slave_key_ids: Vec<String>,
}

impl Default for ZoneDetail {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            zone_type: "Zone".into(),
            kind: None,
            serial: None,
            notified_serial: None,
            masters: Vec::new(),
            dnssec: false,
            nsec3param: None,
            nsec3narrow: false,
            presigned: false,
            soa_edit: None,
            soa_edit_api: None,
            api_rectify: false,
            zone: None,
            account: None,
            nameservers: Vec::new(),
            tsig_master_key_ids: Vec::new(),
            tsig_slave_key_ids: Vec::new(),
        }
    }
}

impl ZoneDetail {
    pub fn new(name: impl Into<String>, kind: ZoneKind) -> Self {
        Self {
            name: name.into(),
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Overwrites every field present in `wire`; absent fields keep their
    /// current value. `rrsets` is not touched here.
    fn merge(&mut self, wire: ZoneWire) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }
        fn set_opt<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        set_opt(&mut self.id, wire.id);
        set(&mut self.name, wire.name);
        set(&mut self.zone_type, wire.zone_type);
        set_opt(&mut self.kind, wire.kind);
        set_opt(&mut self.serial, wire.serial);
        set_opt(&mut self.notified_serial, wire.notified_serial);
        set(&mut self.masters, wire.masters);
        set(&mut self.dnssec, wire.dnssec);
        set_opt(&mut self.nsec3param, wire.nsec3param);
        set(&mut self.nsec3narrow, wire.nsec3narrow);
        set(&mut self.presigned, wire.presigned);
        set_opt(&mut self.soa_edit, wire.soa_edit);
        set_opt(&mut self.soa_edit_api, wire.soa_edit_api);
        set(&mut self.api_rectify, wire.api_rectify);
        set_opt(&mut self.zone, wire.zone);
        set_opt(&mut self.account, wire.account);
        set(&mut self.nameservers, wire.nameservers);
        set(&mut self.tsig_master_key_ids, wire.tsig_master_key_ids);
        set(&mut self.tsig_slave_key_ids, wire.tsig_slave_key_ids);
    }
}

/// How a zone is rendered for the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMode {
    /// Only fields that differ from their defaults (zone creation).
    Create,
    /// Every field that has a value (update and backup).
    Full,
}

/// Serializable view of a zone in a given [`PayloadMode`].
pub struct ZonePayload<'a> {
    detail: &'a ZoneDetail,
    rrsets: &'a [RRSet],
    mode: PayloadMode,
}

impl Serialize for ZonePayload<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let d = self.detail;
        let elide = self.mode == PayloadMode::Create;
        let mut map = serializer.serialize_map(None)?;

        macro_rules! field {
            ($key:literal, $value:expr, $is_default:expr) => {
                if !(elide && $is_default) {
                    map.serialize_entry($key, $value)?;
                }
            };
        }
        macro_rules! optional {
            ($key:literal, $value:expr) => {
                if let Some(value) = $value {
                    map.serialize_entry($key, value)?;
                }
            };
        }

        optional!("id", &d.id);
        field!("name", &d.name, d.name.is_empty());
        field!("type", &d.zone_type, d.zone_type == "Zone");
        optional!("kind", &d.kind);
        optional!("serial", &d.serial);
        optional!("notified_serial", &d.notified_serial);
        field!("masters", &d.masters, d.masters.is_empty());
        if !self.rrsets.is_empty() {
            let rrsets: Vec<RRSetWire> = self.rrsets.iter().map(RRSet::json).collect();
            map.serialize_entry("rrsets", &rrsets)?;
        }
        field!("dnssec", &d.dnssec, !d.dnssec);
        optional!("nsec3param", &d.nsec3param);
        field!("nsec3narrow", &d.nsec3narrow, !d.nsec3narrow);
        field!("presigned", &d.presigned, !d.presigned);
        optional!("soa_edit", &d.soa_edit);
        optional!("soa_edit_api", &d.soa_edit_api);
        field!("api_rectify", &d.api_rectify, !d.api_rectify);
        optional!("zone", &d.zone);
        optional!("account", &d.account);
        field!("nameservers", &d.nameservers, d.nameservers.is_empty());
        field!(
            "tsig_mater_key_ids",
            &d.tsig_master_key_ids,
            d.tsig_master_key_ids.is_empty()
        );
        field!(
            "tsig_slave_key_ids",
            &d.tsig_slave_key_ids,
            d.tsig_slave_key_ids.is_empty()
        );

        map.end()
    }
}

#[derive(Debug, Clone)]
pub struct Zone {
    server: Option<ServerBinding>,
    detail: ZoneDetail,
    rrsets: Vec<RRSet>,
}

impl Zone {
    /// Builds an unbound zone.
    ///
    /// RRSets come either from `rrset_list` or from a raw `rrsets` payload;
    /// supplying both fails with [`Error::AmbiguousRRSetSource`].
    pub fn new(
        detail: ZoneDetail,
        rrset_list: Vec<RRSet>,
        rrsets: Option<Vec<RRSetWire>>,
    ) -> Result<Self> {
        if !rrset_list.is_empty() && rrsets.is_some() {
            return Err(Error::AmbiguousRRSetSource);
        }

        let mut zone = Self {
            server: None,
            detail,
            rrsets: Vec::new(),
        };
        match rrsets {
            Some(raw) => zone.replace_rrsets(raw),
            None => {
                for rrset in rrset_list {
                    zone.append_rrset(rrset);
                }
            }
        }
        Ok(zone)
    }

    pub fn named(name: impl Into<String>, kind: ZoneKind) -> Self {
        Self {
            server: None,
            detail: ZoneDetail::new(name, kind),
            rrsets: Vec::new(),
        }
    }

    /// Builds a zone bound to `server` and synchronizes it right away.
    pub async fn bound(
        server: ServerBinding,
        detail: ZoneDetail,
        rrset_list: Vec<RRSet>,
        rrsets: Option<Vec<RRSetWire>>,
    ) -> Result<Self> {
        let mut zone = Self::new(detail, rrset_list, rrsets)?;
        zone.server = Some(server);
        zone.refresh().await?;
        Ok(zone)
    }

    /// Zone from a list entry of `GET /servers/{id}/zones`.
    pub(crate) async fn parse(server: ServerBinding, mut wire: ZoneWire) -> Result<Self> {
        let mut detail = ZoneDetail::default();
        let rrsets = wire.rrsets.take();
        detail.merge(wire);
        Self::bound(server, detail, Vec::new(), rrsets).await
    }

    pub fn name(&self) -> &str {
        &self.detail.name
    }

    pub fn detail(&self) -> &ZoneDetail {
        &self.detail
    }

    pub fn detail_mut(&mut self) -> &mut ZoneDetail {
        &mut self.detail
    }

    pub fn server(&self) -> Option<&ServerBinding> {
        self.server.as_ref()
    }

    pub fn rrsets(&self) -> &[RRSet] {
        &self.rrsets
    }

    pub fn payload(&self, mode: PayloadMode) -> ZonePayload<'_> {
        ZonePayload {
            detail: &self.detail,
            rrsets: &self.rrsets,
            mode,
        }
    }

    /// The id if the server assigned one, otherwise the name.
    fn api_ref(&self) -> &str {
        self.detail.id.as_deref().unwrap_or(&self.detail.name)
    }

    fn binding(&self) -> Result<ServerBinding> {
        self.server
            .clone()
            .ok_or_else(|| Error::UnboundZone(self.detail.name.clone()))
    }

    fn replace_rrsets(&mut self, raw: Vec<RRSetWire>) {
        let name = self.detail.name.clone();
        self.rrsets = raw
            .into_iter()
            .map(|wire| RRSet::from_wire(Some(&name), wire))
            .collect();
    }

    /// Applies a server zone document: fields it carries overwrite the cache
    /// and the RRSet sequence is replaced wholesale.
    fn apply(&mut self, mut wire: ZoneWire) {
        let rrsets = wire.rrsets.take().unwrap_or_default();
        self.detail.merge(wire);
        self.replace_rrsets(rrsets);
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let server = self.binding()?;
        let raw = server
            .client
            .get(&server.zone_path(&self.detail.name))
            .await?;
        let wire: ZoneWire = serde_json::from_value(raw).map_err(Error::decode("zone"))?;
        debug!(zone = %self.detail.name, "refreshed zone detail");
        self.apply(wire);
        Ok(())
    }

    /// POSTs this zone to `server`, eliding default fields, and binds it to
    /// that server on success.
    pub async fn create(&mut self, server: ServerBinding) -> Result<()> {
        let payload = serde_json::to_value(self.payload(PayloadMode::Create))
            .map_err(Error::encode("zone"))?;
        info!(zone = %self.detail.name, server = %server.server_id, "creating zone");
        let created = server
            .client
            .post(&server.zones_path(), Some(&payload))
            .await?;

        // some servers answer 201 with an empty body
        let wire = if created.is_object() {
            Some(serde_json::from_value::<ZoneWire>(created).map_err(Error::decode("zone"))?)
        } else {
            None
        };
        self.server = Some(server);
        if let Some(wire) = wire {
            self.apply(wire);
        }
        Ok(())
    }

    /// PATCHes the full zone, RRSets included, to the zone's path.
    pub async fn save(&self) -> Result<()> {
        self.save_with(&self.rrsets).await
    }

    async fn save_with(&self, rrsets: &[RRSet]) -> Result<()> {
        let server = self.binding()?;
        let payload = ZonePayload {
            detail: &self.detail,
            rrsets,
            mode: PayloadMode::Full,
        };
        let payload = serde_json::to_value(payload).map_err(Error::encode("zone"))?;
        info!(zone = %self.detail.name, rrsets = rrsets.len(), "saving zone");
        server
            .client
            .patch(&server.zone_path(self.api_ref()), Some(&payload))
            .await?;
        Ok(())
    }

    pub fn get_rrset(&self, name: &str) -> Option<&RRSet> {
        self.rrsets.iter().find(|r| r.name() == name)
    }

    pub fn get_rrset_mut(&mut self, name: &str) -> Option<&mut RRSet> {
        self.rrsets.iter_mut().find(|r| r.name() == name)
    }

    /// Every RRSet owned by `name`, whatever its type.
    pub fn rrsets_named(&self, name: &str) -> Vec<&RRSet> {
        info!("getting zone record: {}", name);
        let found: Vec<&RRSet> = self.rrsets.iter().filter(|r| r.name() == name).collect();
        if found.is_empty() {
            info!("record not found: {}", name);
        }
        found
    }

    /// Stages `rrset` in this zone; nothing is sent until [`Zone::save`].
    pub fn append_rrset(&mut self, mut rrset: RRSet) {
        rrset.attach(&self.detail.name);
        self.rrsets.push(rrset);
    }

    /// Marks the RRSet `name`/`rtype` as `DELETE` and saves the zone. The
    /// change is kept in memory only if the save succeeds.
    pub async fn mark_as_deleted(&mut self, name: &str, rtype: &str) -> Result<()> {
        let idx = self
            .rrsets
            .iter()
            .position(|r| r.name() == name && r.rtype() == rtype)
            .ok_or_else(|| Error::DetachedRRSet(name.to_string()))?;

        let mut staged = self.rrsets.clone();
        staged[idx].mark_deleted()?;
        self.save_with(&staged).await?;
        self.rrsets = staged;
        Ok(())
    }

    /// Canonicalizes `rrsets` against this zone and PATCHes them as
    /// `REPLACE`, then reloads the zone. A failed reload after an accepted
    /// PATCH is reported as [`Error::ReloadAfterWrite`].
    pub async fn create_records(&mut self, rrsets: Vec<RRSet>) -> Result<()> {
        info!("creating {} record(s) to {}", rrsets.len(), self.detail.name);
        self.patch_rrsets(rrsets, ChangeType::Replace).await
    }

    /// Canonicalizes `rrsets` against this zone and PATCHes them as
    /// `DELETE`, then reloads the zone.
    pub async fn delete_records(&mut self, rrsets: Vec<RRSet>) -> Result<()> {
        info!("deletion of {} records from {}", rrsets.len(), self.detail.name);
        self.patch_rrsets(rrsets, ChangeType::Delete).await
    }

    async fn patch_rrsets(&mut self, mut rrsets: Vec<RRSet>, changetype: ChangeType) -> Result<()> {
        let server = self.binding()?;
        for rrset in rrsets.iter_mut() {
            rrset.ensure_canonical(&self.detail.name)?;
            rrset.attach(&self.detail.name);
            rrset.set_changetype(changetype);
        }
        let wire: Vec<RRSetWire> = rrsets.iter().map(RRSet::json).collect();
        debug!("records: {:?}", wire);

        let body = json!({ "rrsets": wire });
        server
            .client
            .patch(&server.zone_path(self.api_ref()), Some(&body))
            .await?;
        self.refresh()
            .await
            .map_err(|source| Error::ReloadAfterWrite {
                zone: self.detail.name.clone(),
                source: Box::new(source),
            })
    }

    /// The apex SOA record.
    pub fn soa(&self) -> Result<SoaRecord> {
        let content = self
            .soa_rrset()
            .and_then(|rrset| rrset.records().first())
            .map(|record| record.content.as_str())
            .ok_or_else(|| Error::MissingSoa(self.detail.name.clone()))?;
        SoaRecord::parse(content)
    }

    fn soa_rrset(&self) -> Option<&RRSet> {
        self.rrsets
            .iter()
            .find(|r| r.rtype() == "SOA" && r.name() == self.detail.name)
    }

    /// Advances the SOA serial as of `today` in memory; [`Zone::save`]
    /// persists it.
    pub fn bump_serial(&mut self, today: NaiveDate) -> Result<Serial> {
        let mut soa = self.soa()?;
        soa.serial = soa.serial.next_value(today)?;
        let value = soa.serial.value()?;
        let content = soa.to_content();

        let zone_name = self.detail.name.clone();
        if let Some(record) = self
            .rrsets
            .iter_mut()
            .find(|r| r.rtype() == "SOA" && r.name() == zone_name)
            .and_then(|rrset| rrset.records_mut().first_mut())
        {
            record.content = content;
        }
        self.detail.serial = Some(value);
        Ok(soa.serial)
    }

    /// Writes the full zone as JSON to `directory`. Without a `filename` the
    /// file is named after the zone, trailing dot stripped, with `.json`.
    pub fn backup(&self, directory: &Path, filename: Option<&str>, pretty: bool) -> Result<PathBuf> {
        info!("backup of zone: {}", self.detail.name);
        let filename = match filename {
            Some(name) => name.to_string(),
            None => format!("{}.json", self.detail.name.trim_end_matches('.')),
        };
        let path = directory.join(filename);
        info!("backup file is {}", path.display());

        let payload = self.payload(PayloadMode::Full);
        let data = if pretty {
            serde_json::to_vec_pretty(&payload)
        } else {
            serde_json::to_vec(&payload)
        }
        .map_err(Error::encode("zone backup"))?;
        std::fs::write(&path, data)?;

        info!("zone {} successfully saved", self.detail.name);
        Ok(path)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.server {
            Some(server) => write!(f, "{}:{}", server.server_id, self.detail.name),
            None => f.write_str(&self.detail.name),
        }
    }
}

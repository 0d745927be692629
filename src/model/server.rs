use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::zone::{ServerBinding, Zone};
use crate::powerdns::client::ApiClient;
use crate::powerdns::types::{DaemonType, ServerWire, ZoneWire};
use crate::validation::{is_in_zone, require_canonical};

pub const DEFAULT_SEARCH_RESULTS: usize = 100;

/// A PowerDNS daemon behind an endpoint, with its cached zones.
pub struct Server {
    client: Arc<dyn ApiClient>,
    id: String,
    version: String,
    daemon_type: DaemonType,
    zones: Vec<Zone>,
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("daemon_type", &self.daemon_type)
            .field("zones", &self.zones.len())
            .finish()
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PDNSServer:{}", self.id)
    }
}

impl Server {
    /// A server with an empty zone cache; see [`Server::load`].
    pub fn new(
        client: Arc<dyn ApiClient>,
        id: impl Into<String>,
        version: impl Into<String>,
        daemon_type: DaemonType,
    ) -> Self {
        Self {
            client,
            id: id.into(),
            version: version.into(),
            daemon_type,
            zones: Vec::new(),
        }
    }

    /// Builds the server and loads its zones.
    pub async fn load(
        client: Arc<dyn ApiClient>,
        id: impl Into<String>,
        version: impl Into<String>,
        daemon_type: DaemonType,
    ) -> Result<Self> {
        let mut server = Self::new(client, id, version, daemon_type);
        server.refresh_zones().await?;
        Ok(server)
    }

    pub(crate) async fn parse(client: Arc<dyn ApiClient>, raw: Value) -> Result<Self> {
        let wire: ServerWire = serde_json::from_value(raw).map_err(Error::decode("server"))?;
        debug!(server = %wire.id, url = ?wire.url, "parsed server");
        Self::load(client, wire.id, wire.version, wire.daemon_type).await
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn daemon_type(&self) -> DaemonType {
        self.daemon_type
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn url(&self) -> String {
        format!("/servers/{}", self.id)
    }

    pub fn zones_url(&self) -> String {
        format!("{}/zones", self.url())
    }

    /// Capability handed to the zones of this server.
    pub fn binding(&self) -> ServerBinding {
        ServerBinding::new(self.client.clone(), self.id.clone())
    }

    /// Reloads every zone. The cache is replaced only once all zones loaded.
    pub async fn refresh_zones(&mut self) -> Result<()> {
        let raw = self.client.get(&self.zones_url()).await?;
        let listed: Vec<ZoneWire> =
            serde_json::from_value(raw).map_err(Error::decode("zone list"))?;

        let mut zones = Vec::with_capacity(listed.len());
        for wire in listed {
            zones.push(Zone::parse(self.binding(), wire).await?);
        }
        debug!(server = %self.id, zones = zones.len(), "loaded zones");
        self.zones = zones;
        Ok(())
    }

    /// Zone by exact canonical name.
    pub fn get_zone(&self, name: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.name() == name)
    }

    pub fn get_zone_mut(&mut self, name: &str) -> Option<&mut Zone> {
        self.zones.iter_mut().find(|z| z.name() == name)
    }

    /// The most specific cached zone containing `record_name`, i.e. the
    /// longest zone name that is a label suffix of it.
    pub fn suggest_zone(&self, record_name: &str) -> Result<Option<&Zone>> {
        require_canonical(record_name)?;
        Ok(self
            .zones
            .iter()
            .filter(|z| is_in_zone(record_name, z.name()))
            .max_by_key(|z| z.name().len()))
    }

    /// Creates `zone` on this server and caches it, replacing any cached
    /// zone of the same name.
    pub async fn create_zone(&mut self, mut zone: Zone) -> Result<&mut Zone> {
        zone.create(self.binding()).await?;

        let idx = match self.zones.iter().position(|z| z.name() == zone.name()) {
            Some(idx) => {
                self.zones[idx] = zone;
                idx
            }
            None => {
                self.zones.push(zone);
                self.zones.len() - 1
            }
        };
        Ok(&mut self.zones[idx])
    }

    pub async fn delete_zone(&mut self, name: &str) -> Result<()> {
        info!(server = %self.id, zone = name, "deleting zone");
        self.client
            .delete(&format!("{}/{}", self.zones_url(), name))
            .await?;
        self.zones.retain(|z| z.name() != name);
        Ok(())
    }

    /// Server-side search over zones, records and comments. Results are
    /// returned as the server sent them.
    pub async fn search(&self, term: &str, max_results: Option<usize>) -> Result<Vec<Value>> {
        let max = max_results.unwrap_or(DEFAULT_SEARCH_RESULTS);
        let raw = self
            .client
            .get_with_query(
                &format!("{}/search-data", self.url()),
                &[("q", term.to_string()), ("max", max.to_string())],
            )
            .await?;
        serde_json::from_value(raw).map_err(Error::decode("search results"))
    }
}

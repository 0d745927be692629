use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::config::ClientConfig;
use crate::error::{Error, Result, TransportError};
use crate::model::server::Server;
use crate::powerdns::client::{ApiClient, PowerDnsClient};

/// Root of the model: owns the transport and the discovered servers.
pub struct Endpoint {
    client: Arc<dyn ApiClient>,
    servers: Vec<Server>,
}

impl Endpoint {
    /// Lists `/servers` and loads each one.
    pub async fn connect(client: Arc<dyn ApiClient>) -> Result<Self> {
        let mut endpoint = Self {
            client,
            servers: Vec::new(),
        };
        endpoint.refresh().await?;
        Ok(endpoint)
    }

    pub async fn from_config(config: &ClientConfig) -> Result<Self> {
        let client = PowerDnsClient::from_config(config)
            .map_err(|e| TransportError::Other(anyhow::Error::new(e)))?;
        Self::connect(Arc::new(client)).await
    }

    /// Replaces the cached server list.
    pub async fn refresh(&mut self) -> Result<()> {
        let raw = self.client.get("/servers").await?;
        let listed: Vec<Value> =
            serde_json::from_value(raw).map_err(Error::decode("server list"))?;

        let mut servers = Vec::with_capacity(listed.len());
        for data in listed {
            servers.push(Server::parse(self.client.clone(), data).await?);
        }
        info!(servers = servers.len(), "loaded PowerDNS servers");
        self.servers = servers;
        Ok(())
    }

    pub fn client(&self) -> &Arc<dyn ApiClient> {
        &self.client
    }

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    pub fn get_server(&self, id: &str) -> Option<&Server> {
        self.servers.iter().find(|s| s.id() == id)
    }

    pub fn get_server_mut(&mut self, id: &str) -> Option<&mut Server> {
        self.servers.iter_mut().find(|s| s.id() == id)
    }
}

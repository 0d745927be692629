//! Recording in-memory `ApiClient` for model tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pdns_zones::{ApiClient, TransportError};
use reqwest::Method;
use serde_json::{Value, json};

/// One request as seen by the mock.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// Answers from canned responses keyed by method and path; unknown routes
/// answer 404. Every request is recorded.
#[derive(Default)]
pub struct MockApi {
    responses: Mutex<HashMap<(Method, String), Value>>,
    failures: Mutex<HashMap<(Method, String), u16>>,
    calls: Mutex<Vec<Call>>,
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, method: Method, path: &str, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert((method, path.to_string()), body);
    }

    pub fn fail(&self, method: Method, path: &str, status: u16) {
        self.failures
            .lock()
            .unwrap()
            .insert((method, path.to_string()), status);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: Method) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl ApiClient for MockApi {
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        self.calls.lock().unwrap().push(Call {
            method: method.clone(),
            path: path.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            body: body.cloned(),
        });

        let key = (method.clone(), path.to_string());
        let status = self.failures.lock().unwrap().get(&key).copied().or_else(|| {
            (!self.responses.lock().unwrap().contains_key(&key)).then_some(404)
        });
        if let Some(status) = status {
            return Err(TransportError::Status {
                method,
                path: path.to_string(),
                status: reqwest::StatusCode::from_u16(status).unwrap(),
                body: "mock failure".into(),
            });
        }
        Ok(self.responses.lock().unwrap()[&key].clone())
    }
}

pub fn zone_doc(name: &str, rrsets: Value) -> Value {
    json!({
        "id": name,
        "name": name,
        "type": "Zone",
        "url": format!("/api/v1/servers/localhost/zones/{name}"),
        "kind": "Native",
        "serial": 2023010100u32,
        "notified_serial": 0,
        "masters": [],
        "dnssec": false,
        "last_check": 0,
        "account": "",
        "rrsets": rrsets,
    })
}

pub fn zone_list_entry(name: &str) -> Value {
    json!({
        "id": name,
        "name": name,
        "type": "Zone",
        "url": format!("/api/v1/servers/localhost/zones/{name}"),
        "kind": "Native",
        "serial": 2023010100u32,
        "notified_serial": 0,
        "masters": [],
        "dnssec": false,
        "last_check": 0,
        "account": "",
    })
}

pub fn soa_rrset(zone: &str, serial: &str) -> Value {
    json!({
        "name": zone,
        "type": "SOA",
        "ttl": 3600,
        "records": [{
            "content": format!("ns1.{zone} hostmaster.{zone} {serial} 10800 3600 604800 3600"),
            "disabled": false,
        }],
        "comments": [],
    })
}

/// One authoritative server `localhost` carrying `zones`, each with an SOA.
pub fn seeded(zones: &[&str]) -> Arc<MockApi> {
    let api = MockApi::new();
    api.respond(
        Method::GET,
        "/servers",
        json!([{
            "type": "Server",
            "id": "localhost",
            "daemon_type": "authoritative",
            "version": "4.8.3",
            "url": "/api/v1/servers/localhost",
            "config_url": "/api/v1/servers/localhost/config{/config_setting}",
            "zones_url": "/api/v1/servers/localhost/zones{/zone}",
        }]),
    );
    api.respond(
        Method::GET,
        "/servers/localhost/zones",
        Value::Array(zones.iter().map(|z| zone_list_entry(z)).collect()),
    );
    for zone in zones {
        api.respond(
            Method::GET,
            &format!("/servers/localhost/zones/{zone}"),
            zone_doc(zone, json!([soa_rrset(zone, "2023010100")])),
        );
    }
    api
}

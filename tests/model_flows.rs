mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use common::{MockApi, seeded, soa_rrset, zone_doc};
use pdns_zones::{
    ApiClient, ChangeType, DaemonType, Endpoint, Error, RRSet, Record, Server, TransportError,
    Zone, ZoneDetail, ZoneKind,
};
use reqwest::Method;
use serde_json::json;

async fn connect(api: &Arc<MockApi>) -> Endpoint {
    Endpoint::connect(api.clone() as Arc<dyn ApiClient>)
        .await
        .expect("endpoint should load")
}

#[tokio::test]
async fn endpoint_discovers_servers_and_zones() {
    let api = seeded(&["domain.tld.", "sub.domain.tld."]);
    let endpoint = connect(&api).await;

    assert_eq!(endpoint.servers().len(), 1);
    let server = endpoint.get_server("localhost").expect("localhost server");
    assert_eq!(server.version(), "4.8.3");
    assert_eq!(server.daemon_type(), DaemonType::Authoritative);
    assert_eq!(server.zones().len(), 2);
    assert!(endpoint.get_server("other").is_none());

    // servers, zone list, one detail fetch per zone
    let paths: Vec<String> = api.calls().into_iter().map(|c| c.path).collect();
    assert_eq!(
        paths,
        vec![
            "/servers",
            "/servers/localhost/zones",
            "/servers/localhost/zones/domain.tld.",
            "/servers/localhost/zones/sub.domain.tld.",
        ]
    );
}

#[tokio::test]
async fn zones_are_refreshed_with_rrsets() {
    let api = seeded(&["example.com."]);
    let endpoint = connect(&api).await;
    let zone = endpoint
        .get_server("localhost")
        .and_then(|s| s.get_zone("example.com."))
        .expect("zone");

    assert_eq!(zone.detail().kind, Some(ZoneKind::Native));
    assert_eq!(zone.detail().serial, Some(2023010100));
    assert_eq!(zone.server().map(|s| s.server_id()), Some("localhost"));
    let soa = zone.get_rrset("example.com.").expect("soa rrset");
    assert_eq!(soa.rtype(), "SOA");
    assert_eq!(soa.zone(), Some("example.com."));
    assert_eq!(zone.soa().unwrap().serial.to_string(), "2023010100");
}

#[tokio::test]
async fn suggest_zone_prefers_longest_suffix() {
    let api = seeded(&["domain.tld.", "sub.domain.tld.", "another.domain.tld."]);
    let endpoint = connect(&api).await;
    let server = endpoint.get_server("localhost").unwrap();

    let zone = server.suggest_zone("a.test.sub.domain.tld.").unwrap();
    assert_eq!(zone.map(|z| z.name()), Some("sub.domain.tld."));

    let zone = server.suggest_zone("www.domain.tld.").unwrap();
    assert_eq!(zone.map(|z| z.name()), Some("domain.tld."));

    let zone = server.suggest_zone("another.domain.tld.").unwrap();
    assert_eq!(zone.map(|z| z.name()), Some("another.domain.tld."));

    assert!(server.suggest_zone("example.org.").unwrap().is_none());
    assert!(matches!(
        server.suggest_zone("a.sub.domain.tld"),
        Err(Error::NonCanonicalName(_))
    ));
}

#[tokio::test]
async fn create_zone_posts_only_customized_fields() {
    let api = seeded(&[]);
    api.respond(Method::POST, "/servers/localhost/zones", json!(null));
    let mut endpoint = connect(&api).await;
    let server = endpoint.get_server_mut("localhost").unwrap();

    let mut detail = ZoneDetail::new("new.example.", ZoneKind::Native);
    detail.nameservers = vec!["ns1.example.net.".into(), "ns2.example.net.".into()];
    let zone = Zone::new(detail, Vec::new(), None).unwrap();

    let created = server.create_zone(zone).await.unwrap();
    assert_eq!(created.server().map(|s| s.server_id()), Some("localhost"));

    let posts = api.calls_to(Method::POST);
    assert_eq!(posts.len(), 1);
    assert_eq!(
        posts[0].body,
        Some(json!({
            "name": "new.example.",
            "kind": "Native",
            "nameservers": ["ns1.example.net.", "ns2.example.net."],
        }))
    );
    assert!(server.get_zone("new.example.").is_some());
}

#[tokio::test]
async fn create_zone_applies_server_answer() {
    let api = seeded(&[]);
    api.respond(
        Method::POST,
        "/servers/localhost/zones",
        zone_doc("new.example.", json!([soa_rrset("new.example.", "2024050101")])),
    );
    let mut endpoint = connect(&api).await;
    let server = endpoint.get_server_mut("localhost").unwrap();

    let created = server
        .create_zone(Zone::named("new.example.", ZoneKind::Native))
        .await
        .unwrap();
    assert_eq!(created.detail().id.as_deref(), Some("new.example."));
    assert_eq!(created.rrsets().len(), 1);
}

#[tokio::test]
async fn failed_create_leaves_cache_untouched() {
    let api = seeded(&[]);
    api.fail(Method::POST, "/servers/localhost/zones", 422);
    let mut endpoint = connect(&api).await;
    let server = endpoint.get_server_mut("localhost").unwrap();

    let err = server
        .create_zone(Zone::named("new.example.", ZoneKind::Native))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Transport(TransportError::Status { status, .. }) if status.as_u16() == 422
    ));
    assert!(server.zones().is_empty());
}

#[tokio::test]
async fn delete_zone_drops_cached_zone() {
    let api = seeded(&["a.example.", "b.example."]);
    api.respond(Method::DELETE, "/servers/localhost/zones/a.example.", json!(null));
    let mut endpoint = connect(&api).await;
    let server = endpoint.get_server_mut("localhost").unwrap();

    server.delete_zone("a.example.").await.unwrap();

    assert_eq!(api.calls_to(Method::DELETE).len(), 1);
    assert!(server.get_zone("a.example.").is_none());
    assert!(server.get_zone("b.example.").is_some());
}

#[tokio::test]
async fn save_patches_full_zone_with_staged_rrsets() {
    let api = seeded(&["example.com."]);
    api.respond(Method::PATCH, "/servers/localhost/zones/example.com.", json!(null));
    let mut endpoint = connect(&api).await;
    let zone = endpoint
        .get_server_mut("localhost")
        .and_then(|s| s.get_zone_mut("example.com."))
        .unwrap();

    zone.append_rrset(RRSet::new(
        "www.example.com.",
        "A",
        vec![Record::new("192.0.2.10")],
    ));
    api.clear_calls();
    zone.save().await.unwrap();

    let patches = api.calls_to(Method::PATCH);
    assert_eq!(patches.len(), 1);
    let body = patches[0].body.clone().unwrap();
    assert_eq!(body["name"], "example.com.");
    assert_eq!(body["dnssec"], false);
    assert!(body.get("url").is_none());
    assert!(body.get("last_check").is_none());
    let rrsets = body["rrsets"].as_array().unwrap();
    assert_eq!(rrsets.len(), 2);
    assert_eq!(rrsets[1]["name"], "www.example.com.");
    assert_eq!(rrsets[1]["type"], "A");
    assert_eq!(rrsets[1]["changetype"], "REPLACE");
}

#[tokio::test]
async fn mark_as_deleted_saves_once() {
    let api = seeded(&["example.com."]);
    api.respond(Method::PATCH, "/servers/localhost/zones/example.com.", json!(null));
    let mut endpoint = connect(&api).await;
    let zone = endpoint
        .get_server_mut("localhost")
        .and_then(|s| s.get_zone_mut("example.com."))
        .unwrap();
    zone.append_rrset(RRSet::new("old.example.com.", "TXT", vec![Record::new("\"x\"")]));
    api.clear_calls();

    zone.mark_as_deleted("old.example.com.", "TXT").await.unwrap();

    let patches = api.calls_to(Method::PATCH);
    assert_eq!(api.calls().len(), 1);
    assert_eq!(patches.len(), 1);
    let body = patches[0].body.clone().unwrap();
    let deleted = body["rrsets"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == "old.example.com.")
        .unwrap();
    assert_eq!(deleted["changetype"], "DELETE");
    assert_eq!(
        zone.get_rrset("old.example.com.").unwrap().changetype(),
        ChangeType::Delete
    );
}

#[tokio::test]
async fn failed_delete_keeps_rrset_state() {
    let api = seeded(&["example.com."]);
    api.fail(Method::PATCH, "/servers/localhost/zones/example.com.", 500);
    let mut endpoint = connect(&api).await;
    let zone = endpoint
        .get_server_mut("localhost")
        .and_then(|s| s.get_zone_mut("example.com."))
        .unwrap();

    let err = zone.mark_as_deleted("example.com.", "SOA").await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(
        zone.get_rrset("example.com.").unwrap().changetype(),
        ChangeType::Replace
    );

    let err = zone.mark_as_deleted("missing.example.com.", "A").await.unwrap_err();
    assert!(matches!(err, Error::DetachedRRSet(_)));
}

#[tokio::test]
async fn create_records_canonicalizes_and_reloads() {
    let api = seeded(&["example.com."]);
    api.respond(Method::PATCH, "/servers/localhost/zones/example.com.", json!(null));
    let mut endpoint = connect(&api).await;
    let zone = endpoint
        .get_server_mut("localhost")
        .and_then(|s| s.get_zone_mut("example.com."))
        .unwrap();
    api.clear_calls();

    zone.create_records(vec![RRSet::new("www", "CNAME", vec![Record::new("target")])])
        .await
        .unwrap();

    let calls = api.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].method, Method::PATCH);
    assert_eq!(calls[1].method, Method::GET);
    assert_eq!(
        calls[0].body,
        Some(json!({
            "rrsets": [{
                "name": "www.example.com.",
                "type": "CNAME",
                "ttl": 3600,
                "changetype": "REPLACE",
                "records": [{"content": "target.example.com.", "disabled": false}],
            }]
        }))
    );
}

#[tokio::test]
async fn delete_records_sends_delete() {
    let api = seeded(&["example.com."]);
    api.respond(Method::PATCH, "/servers/localhost/zones/example.com.", json!(null));
    let mut endpoint = connect(&api).await;
    let zone = endpoint
        .get_server_mut("localhost")
        .and_then(|s| s.get_zone_mut("example.com."))
        .unwrap();
    api.clear_calls();

    zone.delete_records(vec![RRSet::new("www", "A", Vec::new())])
        .await
        .unwrap();

    let patch = &api.calls_to(Method::PATCH)[0];
    let body = patch.body.as_ref().unwrap();
    assert_eq!(body["rrsets"][0]["name"], "www.example.com.");
    assert_eq!(body["rrsets"][0]["changetype"], "DELETE");
}

#[tokio::test]
async fn failed_reload_after_patch_is_reported_as_applied() {
    let api = seeded(&["example.com."]);
    api.respond(Method::PATCH, "/servers/localhost/zones/example.com.", json!(null));
    let mut endpoint = connect(&api).await;
    let zone = endpoint
        .get_server_mut("localhost")
        .and_then(|s| s.get_zone_mut("example.com."))
        .unwrap();
    api.fail(Method::GET, "/servers/localhost/zones/example.com.", 503);

    let err = zone
        .create_records(vec![RRSet::new("www", "A", vec![Record::new("192.0.2.1")])])
        .await
        .unwrap_err();

    match err {
        Error::ReloadAfterWrite { zone, source } => {
            assert_eq!(zone, "example.com.");
            assert!(matches!(*source, Error::Transport(TransportError::Status { .. })));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(api.calls_to(Method::PATCH).len(), 1);
}

#[tokio::test]
async fn catalog_zone_kinds_are_listed() {
    let api = seeded(&["example.com.", "catalog.example."]);
    let mut producer = common::zone_list_entry("catalog.example.");
    producer["kind"] = json!("Producer");
    api.respond(
        Method::GET,
        "/servers/localhost/zones",
        json!([common::zone_list_entry("example.com."), producer]),
    );
    let mut detail = zone_doc("catalog.example.", json!([soa_rrset("catalog.example.", "2023010100")]));
    detail["kind"] = json!("Producer");
    api.respond(Method::GET, "/servers/localhost/zones/catalog.example.", detail);

    let endpoint = connect(&api).await;
    let server = endpoint.get_server("localhost").unwrap();
    assert_eq!(server.zones().len(), 2);
    assert_eq!(
        server.get_zone("example.com.").unwrap().detail().kind,
        Some(ZoneKind::Native)
    );
    assert_eq!(
        server.get_zone("catalog.example.").unwrap().detail().kind,
        Some(ZoneKind::Other("Producer".into()))
    );
}

#[tokio::test]
async fn bump_serial_then_save() {
    let api = seeded(&["example.com."]);
    api.respond(Method::PATCH, "/servers/localhost/zones/example.com.", json!(null));
    let mut endpoint = connect(&api).await;
    let zone = endpoint
        .get_server_mut("localhost")
        .and_then(|s| s.get_zone_mut("example.com."))
        .unwrap();

    let next_day = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let serial = zone.bump_serial(next_day).unwrap();
    assert_eq!(serial.to_string(), "2023010201");
    zone.save().await.unwrap();

    let body = api.calls_to(Method::PATCH)[0].body.clone().unwrap();
    let content = body["rrsets"][0]["records"][0]["content"].as_str().unwrap();
    assert!(content.contains(" 2023010201 "), "{content}");
    assert_eq!(body["serial"], 2023010201u32);
}

#[tokio::test]
async fn search_passes_term_and_limit() {
    let api = seeded(&[]);
    api.respond(
        Method::GET,
        "/servers/localhost/search-data",
        json!([{"object_type": "zone", "name": "example.com.", "zone_id": "example.com."}]),
    );
    let endpoint = connect(&api).await;
    let server = endpoint.get_server("localhost").unwrap();

    let hits = server.search("example*", None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["object_type"], "zone");

    let call = api.calls().pop().unwrap();
    assert_eq!(
        call.query,
        vec![
            ("q".to_string(), "example*".to_string()),
            ("max".to_string(), "100".to_string()),
        ]
    );
}

#[tokio::test]
async fn transport_errors_propagate() {
    let api = MockApi::new();
    api.fail(Method::GET, "/servers", 401);

    let err = Endpoint::connect(api.clone() as Arc<dyn ApiClient>)
        .await
        .err()
        .expect("connect must fail");
    assert!(matches!(
        err,
        Error::Transport(TransportError::Status { status, .. }) if status.as_u16() == 401
    ));
    assert_eq!(api.calls().len(), 1);
}

#[tokio::test]
async fn malformed_server_record_is_a_decode_error() {
    let api = MockApi::new();
    api.respond(Method::GET, "/servers", json!([{"id": "localhost"}]));

    let err = Endpoint::connect(api.clone() as Arc<dyn ApiClient>)
        .await
        .err()
        .expect("connect must fail");
    assert!(matches!(err, Error::Decode { what: "server", .. }));
}

#[tokio::test]
async fn refresh_replaces_rrsets_wholesale() {
    let api = seeded(&["example.com."]);
    let mut server = Server::load(
        api.clone() as Arc<dyn ApiClient>,
        "localhost",
        "4.8.3",
        DaemonType::Authoritative,
    )
    .await
    .unwrap();
    let zone = server.get_zone_mut("example.com.").unwrap();
    zone.append_rrset(RRSet::new("staged.example.com.", "A", vec![]));
    zone.detail_mut().account = Some("ops".into());

    zone.refresh().await.unwrap();

    assert!(zone.get_rrset("staged.example.com.").is_none());
    assert_eq!(zone.rrsets().len(), 1);
    // the server document carries account, so it wins
    assert_eq!(zone.detail().account.as_deref(), Some(""));
}

#[tokio::test]
async fn backup_writes_zone_json() {
    let api = seeded(&["example.com."]);
    let endpoint = connect(&api).await;
    let zone = endpoint
        .get_server("localhost")
        .and_then(|s| s.get_zone("example.com."))
        .unwrap();
    let dir = tempfile::tempdir().unwrap();

    let path = zone.backup(dir.path(), None, true).unwrap();
    assert_eq!(path, dir.path().join("example.com.json"));

    let saved: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(saved["name"], "example.com.");
    assert_eq!(saved["rrsets"][0]["type"], "SOA");

    let path = zone.backup(dir.path(), Some("custom.json"), false).unwrap();
    assert!(path.ends_with("custom.json"));
}

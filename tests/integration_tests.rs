//! Integration tests using mock HTTP servers
//!
//! Tests the full end-to-end flow: config file → token refresh → API requests
//! → protocol messages, with config and state files on disk.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xero_tap::cli::{Cli, Commands, Runner};
use xero_tap::http::RetryPolicy;
use xero_tap::output::{JsonLinesSink, MemorySink};
use xero_tap::{Catalog, Error, SyncState};

// ============================================================================
// Fixtures
// ============================================================================

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(server: &MockServer, catalog: &Catalog) -> Self {
        let dir = TempDir::new().unwrap();
        let config = json!({
            "start_date": "2021-01-01T00:00:00Z",
            "client_id": "client",
            "client_secret": "secret",
            "refresh_token": "rt-1",
            "tenant_id": "tenant-1",
            "base_url": format!("{}/api.xro/2.0", server.uri()),
            "token_url": format!("{}/connect/token", server.uri()),
            "user_agent": "tap-test",
            "custom_key": "kept"
        });
        std::fs::write(dir.path().join("config.json"), config.to_string()).unwrap();
        std::fs::write(
            dir.path().join("catalog.json"),
            catalog.to_json_pretty().unwrap(),
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn read_json(&self, name: &str) -> Value {
        read_json(&self.path(name))
    }

    fn write_state(&self, state: &SyncState) {
        std::fs::write(self.path("state.json"), serde_json::to_string(state).unwrap()).unwrap();
    }

    fn runner(&self, command: Commands) -> Runner {
        let cli = Cli {
            config: Some(self.path("config.json")),
            state: Some(self.path("state.json")),
            catalog: Some(self.path("catalog.json")),
            command,
        };
        Runner::new(cli).with_retry(RetryPolicy::default().with_backoff(Duration::ZERO, Duration::ZERO))
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

async fn mount_token(server: &MockServer, presented: &str, rotated: &str, access: &str) {
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .and(body_string_contains(format!("refresh_token={presented}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access,
            "refresh_token": rotated,
            "expires_in": 1800,
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;
}

async fn mount_resource(server: &MockServer, resource: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/api.xro/2.0/{resource}")))
        .and(header("Xero-tenant-id", "tenant-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// `io::Write` handle whose bytes stay readable after the sink is dropped
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// Sync
// ============================================================================

#[tokio::test]
async fn test_sync_end_to_end() {
    let server = MockServer::start().await;
    mount_token(&server, "rt-1", "rt-2", "access-1").await;
    mount_resource(
        &server,
        "Invoices",
        r#"{"Invoices": [
            {"InvoiceID": "inv-1", "Total": 10.10, "UpdatedDateUTC": "/Date(1612137600000+0000)/",
             "Warnings": ["w"], "DueDate": "/Date(-62135596800000)/"},
            {"InvoiceID": "inv-2", "Total": 5.00, "UpdatedDateUTC": "/Date(1612224000000+0000)/"}
        ]}"#,
    )
    .await;
    mount_resource(&server, "Currencies", r#"{"Currencies": [{"Code": "NZD"}]}"#).await;

    let catalog = Catalog::discover().with_selected(&["invoices", "currencies"]);
    let ws = Workspace::new(&server, &catalog);
    let sink = MemorySink::new();

    let stats = ws
        .runner(Commands::Sync)
        .sync(Box::new(sink.clone()))
        .await
        .unwrap();

    assert_eq!(stats.records_synced, 3);
    assert_eq!(sink.schema_streams(), vec!["invoices", "currencies"]);

    let invoices = sink.records("invoices");
    let keys: Vec<&str> = invoices[0].keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["InvoiceID", "Total", "UpdatedDateUTC"]);
    assert_eq!(invoices[0]["Total"].to_string(), "10.10");
    assert_eq!(invoices[0]["UpdatedDateUTC"], "2021-02-01T00:00:00Z");

    let config = ws.read_json("config.json");
    assert_eq!(config["refresh_token"], "rt-2");
    assert_eq!(config["custom_key"], "kept");

    let state = ws.read_json("state.json");
    assert_eq!(state["currently_syncing"], Value::Null);
    assert_eq!(
        state["bookmarks"]["invoices"],
        json!({"UpdatedDateUTC": "2021-02-02T00:00:00Z"})
    );
    assert!(state["bookmarks"].get("currencies").is_none());

    let requests = server.received_requests().await.unwrap();
    let invoice_request = requests
        .iter()
        .find(|r| r.url.path().ends_with("/Invoices"))
        .unwrap();
    assert_eq!(
        invoice_request.headers.get("Authorization").unwrap(),
        "Bearer access-1"
    );
    assert_eq!(invoice_request.headers.get("User-Agent").unwrap(), "tap-test");
}

#[tokio::test]
async fn test_sync_resumes_interrupted_stream_from_saved_page() {
    let server = MockServer::start().await;
    mount_token(&server, "rt-1", "rt-2", "access-1").await;
    Mock::given(method("GET"))
        .and(path("/api.xro/2.0/Invoices"))
        .and(query_param("page", "4"))
        .and(header("If-Modified-Since", "2021-03-01T00:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Invoices": [{"InvoiceID": "inv-301", "UpdatedDateUTC": "2021-03-05T00:00:00Z"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api.xro/2.0/Contacts"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    mount_resource(&server, "Users", r#"{"Users": []}"#).await;

    let catalog = Catalog::discover().with_selected(&["contacts", "invoices", "users"]);
    let ws = Workspace::new(&server, &catalog);
    ws.write_state(
        &serde_json::from_value(json!({
            "currently_syncing": "invoices",
            "bookmarks": {
                "invoices": {"UpdatedDateUTC": "2021-03-01T00:00:00Z", "offset": {"page": 4}}
            }
        }))
        .unwrap(),
    );
    let sink = MemorySink::new();

    ws.runner(Commands::Sync)
        .sync(Box::new(sink.clone()))
        .await
        .unwrap();

    assert_eq!(sink.schema_streams(), vec!["invoices", "users"]);
    let state = ws.read_json("state.json");
    assert_eq!(
        state["bookmarks"]["invoices"],
        json!({"UpdatedDateUTC": "2021-03-05T00:00:00Z"})
    );
    assert_eq!(state["currently_syncing"], Value::Null);
}

#[tokio::test]
async fn test_sync_writes_json_lines() {
    let server = MockServer::start().await;
    mount_token(&server, "rt-1", "rt-2", "access-1").await;
    mount_resource(
        &server,
        "Items",
        r#"{"Items": [{"ItemID": "it-1", "UnitPrice": 12.3400, "UpdatedDateUTC": "2021-02-01T00:00:00Z"}]}"#,
    )
    .await;

    let catalog = Catalog::discover().with_selected(&["items"]);
    let ws = Workspace::new(&server, &catalog);
    let buffer = SharedBuffer::default();

    ws.runner(Commands::Sync)
        .sync(Box::new(JsonLinesSink::new(buffer.clone())))
        .await
        .unwrap();

    let lines = buffer.lines();
    let types: Vec<String> = lines
        .iter()
        .map(|line| serde_json::from_str::<Value>(line).unwrap()["type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(types, vec!["STATE", "SCHEMA", "RECORD", "STATE", "STATE"]);

    assert!(lines[2].contains(r#""UnitPrice":12.3400"#));
    let schema: Value = serde_json::from_str(&lines[1]).unwrap();
    assert_eq!(schema["stream"], "items");
    assert_eq!(schema["key_properties"], json!(["ItemID"]));
    assert_eq!(schema["bookmark_properties"], json!(["UpdatedDateUTC"]));
}

#[tokio::test]
async fn test_second_unauthorized_response_requires_reauthorization() {
    let server = MockServer::start().await;
    mount_token(&server, "rt-1", "rt-2", "access-1").await;
    mount_token(&server, "rt-2", "rt-3", "access-2").await;
    Mock::given(method("GET"))
        .and(path("/api.xro/2.0/Currencies"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let catalog = Catalog::discover().with_selected(&["currencies"]);
    let ws = Workspace::new(&server, &catalog);

    let err = ws
        .runner(Commands::Sync)
        .sync(Box::new(MemorySink::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ReauthorizationRequired));
    assert_eq!(ws.read_json("config.json")["refresh_token"], "rt-3");
    assert_eq!(ws.read_json("state.json")["currently_syncing"], "currencies");
}

#[tokio::test]
async fn test_rejected_refresh_token_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let catalog = Catalog::discover().with_selected(&["currencies"]);
    let ws = Workspace::new(&server, &catalog);

    let err = ws
        .runner(Commands::Sync)
        .sync(Box::new(MemorySink::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::TokenRefresh { .. }));
    assert!(err.to_string().contains("invalid_grant"));
    assert_eq!(ws.read_json("config.json")["refresh_token"], "rt-1");
    assert!(!ws.path("state.json").exists());
}

// ============================================================================
// Discover
// ============================================================================

#[tokio::test]
async fn test_discover_validates_access() {
    let server = MockServer::start().await;
    mount_token(&server, "rt-1", "rt-2", "access-1").await;
    Mock::given(method("GET"))
        .and(path("/api.xro/2.0/Invoices"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Invoices": []})))
        .expect(1)
        .mount(&server)
        .await;

    let ws = Workspace::new(&server, &Catalog::default());
    let catalog = ws.runner(Commands::Discover).discover().await.unwrap();

    assert_eq!(catalog.streams.len(), 26);
    assert!(catalog.selected_stream_ids().is_empty());
    assert_eq!(ws.read_json("config.json")["refresh_token"], "rt-2");
}

#[tokio::test]
async fn test_discover_forbidden_organisation() {
    let server = MockServer::start().await;
    mount_token(&server, "rt-1", "rt-2", "access-1").await;
    Mock::given(method("GET"))
        .and(path("/api.xro/2.0/Invoices"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let ws = Workspace::new(&server, &Catalog::default());
    let err = ws.runner(Commands::Discover).discover().await.unwrap_err();

    assert_eq!(err.api_kind().map(|k| k.status()), Some(403));
}

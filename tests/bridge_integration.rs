//! End-to-end tests for the bridge server.
//!
//! These tests run a real server on an ephemeral localhost port, call it
//! through the RPC client, then shut everything down and inspect the
//! in-memory design the executor handed back.

use std::collections::HashSet;
use std::thread::JoinHandle;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use cad_bridge_mcp::bridge::channel;
use cad_bridge_mcp::config::{ClientConfig, ServerConfig};
use cad_bridge_mcp::engine::{Component, MemoryComponent, MemoryHost, Point3};
use cad_bridge_mcp::error::ClientError;
use cad_bridge_mcp::rpc::{BridgeServer, RpcClient, ServerState};

// =============================================================================
// Harness
// =============================================================================

struct Bridge {
    server: BridgeServer,
    executor: JoinHandle<MemoryHost>,
    client: RpcClient,
}

fn server_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        shutdown_timeout_ms: 1000,
    }
}

fn client_config(port: u16) -> ClientConfig {
    ClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        timeout_ms: 5000,
    }
}

fn start_bridge(host: MemoryHost) -> Bridge {
    let (dispatcher, executor) = channel(host);
    let executor = executor.spawn().unwrap();

    let mut server = BridgeServer::new(server_config(), dispatcher);
    server.start().unwrap();
    let port = server.local_addr().unwrap().port();

    Bridge {
        server,
        executor,
        client: RpcClient::new(client_config(port)),
    }
}

impl Bridge {
    /// Stops the server and returns the host once the executor has drained.
    async fn shutdown(self) -> MemoryHost {
        let Self {
            mut server,
            executor,
            ..
        } = self;
        server.stop();
        drop(server);
        tokio::task::spawn_blocking(move || executor.join().unwrap())
            .await
            .unwrap()
    }
}

fn root(host: &MemoryHost) -> &MemoryComponent {
    host.design().unwrap().root()
}

fn sketch_name_from(message: &str) -> String {
    message
        .split_once("name: ")
        .map(|(_, name)| name.to_string())
        .unwrap()
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_start_twice_binds_one_listener() {
    let (dispatcher, _executor) = channel(MemoryHost::with_empty_design());
    let mut server = BridgeServer::new(server_config(), dispatcher);

    server.start().unwrap();
    let first = server.local_addr().unwrap();
    server.start().unwrap();
    assert_eq!(server.local_addr(), Some(first));
    assert_eq!(server.state(), ServerState::Running);

    server.stop();
    server.stop();
    assert_eq!(server.state(), ServerState::Stopped);
    assert!(server.local_addr().is_none());
}

#[tokio::test]
async fn test_stopped_server_refuses_calls() {
    let mut bridge = start_bridge(MemoryHost::with_empty_design());
    assert!(bridge.client.ping().await.unwrap().success);

    bridge.server.stop();
    let err = bridge.client.ping().await.unwrap_err();
    assert!(matches!(err, ClientError::Connect { .. }));
}

// =============================================================================
// Commands over the wire
// =============================================================================

#[tokio::test]
async fn test_ping() {
    let bridge = start_bridge(MemoryHost::with_empty_design());
    let envelope = bridge.client.ping().await.unwrap();
    assert!(envelope.success);
    assert_eq!(envelope.message, "Pong");
    assert_eq!(envelope.to_text(), "OK: Pong");
}

#[tokio::test]
async fn test_circle_then_extrude_creates_one_body() {
    let bridge = start_bridge(MemoryHost::with_empty_design());

    let created = bridge
        .client
        .create_sketch_circle("xy", &[0.0, 0.0, 0.0], 5.0, None)
        .await
        .unwrap();
    assert!(created.success, "{}", created.message);
    assert!(created
        .message
        .starts_with("Sketch circle created successfully; name: "));
    let name = sketch_name_from(&created.message);
    assert!(!name.is_empty());

    let extruded = bridge.client.extrude_profile(&name, 10.0).await.unwrap();
    assert!(extruded.success, "{}", extruded.message);

    let host = bridge.shutdown().await;
    let component = root(&host);
    assert_eq!(component.sketch_records().len(), 1);
    assert_eq!(component.sketch_records()[0].name, name);
    assert_eq!(component.body_count(), 1);
    assert_eq!(component.bodies()[0].sketch, name);
}

#[tokio::test]
async fn test_bad_plane_creates_nothing() {
    let bridge = start_bridge(MemoryHost::with_empty_design());

    let envelope = bridge
        .client
        .create_sketch_circle("bad-plane", &[0.0, 0.0, 0.0], 5.0, None)
        .await
        .unwrap();
    assert!(!envelope.success);
    assert!(envelope.message.contains("Invalid plane"));

    let host = bridge.shutdown().await;
    assert!(root(&host).sketch_records().is_empty());
}

#[tokio::test]
async fn test_extrude_unknown_sketch() {
    let bridge = start_bridge(MemoryHost::with_empty_design());

    let envelope = bridge
        .client
        .extrude_profile("nonexistent", 5.0)
        .await
        .unwrap();
    assert!(!envelope.success);
    assert!(envelope.message.contains("not found"));
    assert!(envelope.to_text().starts_with("ERROR: "));

    let host = bridge.shutdown().await;
    assert_eq!(root(&host).body_count(), 0);
}

#[tokio::test]
async fn test_negative_cylinder_radius_mutates_nothing() {
    let bridge = start_bridge(MemoryHost::with_empty_design());

    let envelope = bridge
        .client
        .create_cylinder(Point3::new(0.0, 0.0, 0.0), -1.0, 10.0)
        .await
        .unwrap();
    assert!(!envelope.success);
    assert!(envelope.message.contains("radius"));

    let host = bridge.shutdown().await;
    assert!(root(&host).sketch_records().is_empty());
    assert_eq!(root(&host).body_count(), 0);
}

#[tokio::test]
async fn test_named_rectangle_then_extrude() {
    let bridge = start_bridge(MemoryHost::with_empty_design());

    let created = bridge
        .client
        .create_sketch_rectangle("XZ", &[0.0, 0.0], &[4.0, 2.0], Some("Plate"))
        .await
        .unwrap();
    assert!(created.success, "{}", created.message);
    assert_eq!(
        created.message,
        "Sketch rectangle created successfully; name: Plate"
    );

    let duplicate = bridge
        .client
        .create_sketch_rectangle("xy", &[0.0, 0.0], &[1.0, 1.0], Some("Plate"))
        .await
        .unwrap();
    assert!(!duplicate.success);
    assert!(duplicate.message.contains("already exists"));

    let extruded = bridge.client.extrude_profile("Plate", -3.0).await.unwrap();
    assert!(extruded.success, "{}", extruded.message);

    let host = bridge.shutdown().await;
    assert_eq!(root(&host).sketch_records().len(), 1);
    assert_eq!(root(&host).body_count(), 1);
}

#[tokio::test]
async fn test_no_active_design() {
    let bridge = start_bridge(MemoryHost::without_design());

    assert!(bridge.client.ping().await.unwrap().success);

    let envelope = bridge
        .client
        .create_cylinder(Point3::new(0.0, 0.0, 0.0), 1.0, 1.0)
        .await
        .unwrap();
    assert!(!envelope.success);
    assert!(envelope.message.contains("No active design"));

    let host = bridge.shutdown().await;
    assert!(host.design().is_none());
}

// =============================================================================
// Faults
// =============================================================================

#[tokio::test]
async fn test_unknown_method_is_a_fault() {
    let bridge = start_bridge(MemoryHost::with_empty_design());

    let err = bridge
        .client
        .call("delete_everything", Vec::new())
        .await
        .unwrap_err();
    match err {
        ClientError::Fault { code, message } => {
            assert_eq!(code, -32601);
            assert!(message.contains("delete_everything"));
        }
        other => panic!("Expected fault, got {other:?}"),
    }
}

#[tokio::test]
async fn test_wrong_argument_type_is_a_fault() {
    let bridge = start_bridge(MemoryHost::with_empty_design());

    let err = bridge
        .client
        .call("extrude_profile", vec![json!("Base"), json!("far")])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Fault { code: -32602, .. }));

    let err = bridge
        .client
        .call("ping", vec![json!(1)])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Fault { code: -32602, .. }));
}

#[tokio::test]
async fn test_connection_survives_bad_lines() {
    let bridge = start_bridge(MemoryHost::with_empty_design());
    let addr = bridge.server.local_addr().unwrap();

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    write.write_all(b"this is not json\n").await.unwrap();
    let reply: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(reply["error"]["code"], json!(-32700));

    // Notifications get no reply, so the next line answers the ping.
    write
        .write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"ping\"}\n")
        .await
        .unwrap();
    write
        .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":\"p1\",\"method\":\"ping\",\"params\":[]}\n")
        .await
        .unwrap();
    let reply: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(reply["id"], json!("p1"));
    assert_eq!(reply["result"], json!({"success": true, "message": "Pong"}));
}

#[tokio::test]
async fn test_invalid_utf8_line_gets_parse_error() {
    let bridge = start_bridge(MemoryHost::with_empty_design());
    let addr = bridge.server.local_addr().unwrap();

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    write.write_all(b"\xff\xfe\n").await.unwrap();
    let reply: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(reply["error"]["code"], json!(-32700));

    write
        .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"ping\",\"params\":[]}\n")
        .await
        .unwrap();
    let reply: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(reply["id"], json!(7));
    assert_eq!(reply["result"], json!({"success": true, "message": "Pong"}));
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_concurrent_clients_are_serialised() {
    let bridge = start_bridge(MemoryHost::with_empty_design());
    let port = bridge.server.local_addr().unwrap().port();

    let calls: Vec<_> = (0..12)
        .map(|i| {
            tokio::spawn(async move {
                RpcClient::new(client_config(port))
                    .create_cylinder(Point3::new(f64::from(i), 0.0, 0.0), 1.0, 2.0)
                    .await
            })
        })
        .collect();

    for call in calls {
        let envelope = call.await.unwrap().unwrap();
        assert!(envelope.success, "{}", envelope.message);
    }

    let host = bridge.shutdown().await;
    let component = root(&host);
    assert_eq!(component.body_count(), 12);

    let names: HashSet<_> = component
        .sketch_records()
        .iter()
        .map(|sketch| sketch.name.as_str())
        .collect();
    assert_eq!(names.len(), 12);
}

//! WebSocket integration tests
//!
//! Opens real `/api/stream` sessions against a server bound to 127.0.0.1:0
//! and drives commands through the same router.

use axum::{
    Router,
    body::Body,
    http::{Request, header},
};
use control_plane::{ConnectionRegistry, ControlPlane, ControlPlaneConfig, SimulationClock};
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tower::ServiceExt;

type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

// ============================================================================
// Test Fixtures
// ============================================================================

struct TestServer {
    addr: SocketAddr,
    router: Router,
    registry: Arc<ConnectionRegistry>,
}

fn quiet_config() -> ControlPlaneConfig {
    let mut config = ControlPlaneConfig::default();
    config.simulator.enabled = false;
    config
}

/// Start a test server and return its address plus a router sharing its state
async fn start_test_server(config: ControlPlaneConfig) -> TestServer {
    let control_plane: ControlPlane<SimulationClock> = ControlPlane::new(config);
    let router = control_plane.router();
    let registry = Arc::clone(&control_plane.registry);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = router.clone();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        router,
        registry,
    }
}

async fn connect(server: &TestServer) -> Client {
    let url = format!("ws://{}/api/stream", server.addr);
    let (ws_stream, _response) = connect_async(&url).await.expect("Failed to connect");
    ws_stream
}

/// Next text frame as JSON
async fn next_json(ws: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("Timed out waiting for frame")
            .expect("Stream ended")
            .expect("Receive error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Skip frames until one of the given type arrives
async fn next_of_type(ws: &mut Client, kind: &str) -> Value {
    loop {
        let json = next_json(ws).await;
        if json["type"] == kind {
            return json;
        }
    }
}

async fn command(router: &Router, body: Value) -> Value {
    let request = Request::builder()
        .method("POST")
        .uri("/api/command")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn wait_for_connections(registry: &ConnectionRegistry, expected: usize) {
    for _ in 0..100 {
        if registry.count() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "Expected {} connections, found {}",
        expected,
        registry.count()
    );
}

fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(&value.to_string()).unwrap()
}

// ============================================================================
// Session Lifecycle
// ============================================================================

#[tokio::test]
async fn test_snapshot_is_first_message() {
    let server = start_test_server(quiet_config()).await;
    let mut ws = connect(&server).await;

    let snapshot = next_json(&mut ws).await;
    assert_eq!(snapshot["type"], "snapshot");
    assert_eq!(snapshot["strategies"].as_array().unwrap().len(), 3);
    assert!(snapshot["orders"].as_array().unwrap().is_empty());
    assert_eq!(snapshot["prices"].as_object().unwrap().len(), 3);
    assert_eq!(snapshot["systemStatus"]["active_strategies"], 2);

    wait_for_connections(&server.registry, 1).await;
}

#[tokio::test]
async fn test_place_order_broadcasts_order_update() {
    let server = start_test_server(quiet_config()).await;
    let mut ws = connect(&server).await;

    let snapshot = next_json(&mut ws).await;
    let btc_price = decimal(&snapshot["prices"]["BTC/USDT"]);
    wait_for_connections(&server.registry, 1).await;

    let response = command(
        &server.router,
        json!({"cmd": "place_order", "symbol": "BTC/USDT"}),
    )
    .await;
    assert_eq!(response["status"], "success");
    let order_id = response["order_id"].as_str().unwrap().to_string();

    let update = next_of_type(&mut ws, "order_update").await;
    assert_eq!(update["orderId"], order_id.as_str());
    assert_eq!(update["status"], "pending");
    assert_eq!(update["remaining"].as_f64().unwrap(), 1.0);
    assert_eq!(decimal(&update["price"]), btc_price);
    assert!(update["timestamp"].is_i64());
}

#[tokio::test]
async fn test_strategy_command_broadcasts_strategy_event() {
    let server = start_test_server(quiet_config()).await;
    let mut ws = connect(&server).await;
    next_json(&mut ws).await;
    wait_for_connections(&server.registry, 1).await;

    command(&server.router, json!({"cmd": "start_strategy", "id": 3})).await;

    let event = next_of_type(&mut ws, "strategy").await;
    assert_eq!(event["id"], 3);
    assert_eq!(event["status"], "running");
    assert_eq!(event["strategy_type"], "Pure Market Making");
}

#[tokio::test]
async fn test_ping_pong() {
    let server = start_test_server(quiet_config()).await;
    let mut ws = connect(&server).await;
    next_json(&mut ws).await;

    ws.send(Message::Text(json!({"type": "hello"}).to_string().into()))
        .await
        .unwrap();
    ws.send(Message::Text(json!({"type": "ping"}).to_string().into()))
        .await
        .unwrap();

    let reply = next_json(&mut ws).await;
    assert_eq!(reply, json!({"type": "pong"}));
}

#[tokio::test]
async fn test_closing_one_session_keeps_the_other() {
    let server = start_test_server(quiet_config()).await;

    let mut ws_a = connect(&server).await;
    let mut ws_b = connect(&server).await;
    next_json(&mut ws_a).await;
    next_json(&mut ws_b).await;
    wait_for_connections(&server.registry, 2).await;

    ws_a.close(None).await.unwrap();
    wait_for_connections(&server.registry, 1).await;

    command(&server.router, json!({"cmd": "pause_strategy", "id": 1})).await;

    let event = next_of_type(&mut ws_b, "strategy").await;
    assert_eq!(event["id"], 1);
    assert_eq!(event["status"], "paused");
}

#[tokio::test]
async fn test_malformed_frame_closes_only_that_session() {
    let server = start_test_server(quiet_config()).await;

    let mut ws_a = connect(&server).await;
    let mut ws_b = connect(&server).await;
    next_json(&mut ws_a).await;
    next_json(&mut ws_b).await;
    wait_for_connections(&server.registry, 2).await;

    ws_a.send(Message::Text("definitely not json".into()))
        .await
        .unwrap();
    wait_for_connections(&server.registry, 1).await;

    command(&server.router, json!({"cmd": "stop_strategy", "id": 2})).await;
    let event = next_of_type(&mut ws_b, "strategy").await;
    assert_eq!(event["id"], 2);
    assert_eq!(event["status"], "stopped");
}

// ============================================================================
// Market Simulator
// ============================================================================

#[tokio::test]
async fn test_simulator_streams_prices_and_logs() {
    let mut config = ControlPlaneConfig::default();
    config.simulator.interval_ms = 50;
    config.simulator.seed = Some(7);
    let server = start_test_server(config).await;

    let mut ws = connect(&server).await;
    let snapshot = next_json(&mut ws).await;

    // One tick: a price per tracked symbol, then one log
    let mut prices = Vec::new();
    loop {
        let event = next_json(&mut ws).await;
        match event["type"].as_str().unwrap() {
            "price" => prices.push(event),
            "log" => {
                assert!(["info", "warn", "error"].contains(&event["level"].as_str().unwrap()));
                assert!(event["timestamp"].is_i64());
                break;
            }
            other => panic!("Unexpected event type: {}", other),
        }
    }
    assert_eq!(prices.len(), 3);

    for event in &prices {
        let symbol = event["symbol"].as_str().unwrap();
        let before = decimal(&snapshot["prices"][symbol]);
        let after = decimal(&event["price"]);
        // One ulp of slack for the float rendering on the wire
        assert!((after - before).abs() <= before * dec!(0.01) + dec!(0.000001));
    }

    ws.close(None).await.unwrap();
    wait_for_connections(&server.registry, 0).await;
}

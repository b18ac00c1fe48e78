//! HTTP-level tests for HttpBridge against a mock bridge served by axum.
//!
//! Each test binds an ephemeral port, so they run in parallel without setup.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use reflection_bridge::{
    BridgeError, DumpRequest, Envelope, FunctionRecord, FunctionsDump, HttpBridge,
    PropertiesDump, PropertyRecord, ReflectionBridge,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

// ── Mock bridge ────────────────────────────────────────────────

type Seen = Arc<Mutex<Vec<Value>>>;

async fn dump(State(seen): State<Seen>, Json(body): Json<Value>) -> (StatusCode, String) {
    seen.lock().unwrap().push(body.clone());

    match body["class_name"].as_str() {
        Some("Missing") => {
            return (
                StatusCode::OK,
                Envelope::failure("No instances of Missing found").to_body(),
            )
        }
        Some("Garbled") => {
            return (
                StatusCode::OK,
                r#"{"success":true,"message":"{\"class\":"}"#.to_string(),
            )
        }
        Some("Crashed") => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Envelope::failure("Game thread did not respond").to_body(),
            )
        }
        Some("Overloaded") => {
            return (StatusCode::SERVICE_UNAVAILABLE, "try again later".to_string())
        }
        _ => {}
    }

    let dump = PropertiesDump::new(
        "/Script/Pal.PalPlayerState",
        vec![
            PropertyRecord::new("PlayerId", "StructProperty", "{A1B2}").at_offset(0x3c0),
            PropertyRecord::new("Level", "IntProperty", "12"),
        ],
    );
    (StatusCode::OK, Envelope::success(&dump).unwrap().to_body())
}

async fn dump_functions(State(seen): State<Seen>, Json(body): Json<Value>) -> String {
    seen.lock().unwrap().push(body);
    let dump = FunctionsDump::new("/Script/Pal.PalPlayerState", vec![FunctionRecord::new("Heal")]);
    Envelope::success(&dump).unwrap().to_body()
}

async fn discover(Json(body): Json<Value>) -> String {
    let message = json!({
        "properties": {"level": "PawnPrivate.Level", "slots": "NOT_FOUND"},
        "timestamp": 1767225600.5,
        "force": body["force"],
    });
    json!({"success": true, "message": message.to_string()}).to_string()
}

async fn discovery() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "no discovery-log.json yet")
}

async fn spawn_bridge() -> (HttpBridge, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/api/dump", post(dump))
        .route("/api/dump-functions", post(dump_functions))
        .route("/api/discover", post(discover))
        .route("/api/discovery", get(discovery))
        .with_state(seen.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let bridge = HttpBridge::new(&format!("http://{addr}/")).unwrap();
    (bridge, seen)
}

// ── Tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_dump_properties_round_trip() {
    let (bridge, seen) = spawn_bridge().await;

    let dump = bridge
        .dump_properties(&DumpRequest::new("PalPlayerState", 0, 50))
        .await
        .unwrap();

    assert_eq!(dump.class_path, "/Script/Pal.PalPlayerState");
    assert_eq!(dump.properties.len(), 2);
    assert_eq!(dump.properties[0].offset, Some(0x3c0));

    let bodies = seen.lock().unwrap();
    assert!(bodies[0].get("property_path").is_none());
    assert!(bodies[0].get("filter").is_none());
    assert_eq!(bodies[0]["max_items"], 50);
}

#[tokio::test]
async fn test_dump_sends_property_path_and_filter() {
    let (bridge, seen) = spawn_bridge().await;

    let req = DumpRequest::new("PalPlayerState", 1, 20)
        .with_property_path(Some("PlayerId".into()))
        .with_filter(Some("heal".into()));
    let dump = bridge.dump_functions(&req).await.unwrap();
    assert_eq!(dump.functions[0].name, "Heal");

    let bodies = seen.lock().unwrap();
    assert_eq!(bodies[0]["property_path"], "PlayerId");
    assert_eq!(bodies[0]["filter"], "heal");
    assert_eq!(bodies[0]["instance_index"], 1);
}

#[tokio::test]
async fn test_rejection_is_surfaced_verbatim() {
    let (bridge, _) = spawn_bridge().await;

    let err = bridge
        .dump_properties(&DumpRequest::new("Missing", 0, 50))
        .await
        .unwrap_err();
    assert_eq!(err, BridgeError::Rejected("No instances of Missing found".into()));
}

#[tokio::test]
async fn test_error_status_with_failure_envelope_is_rejection() {
    let (bridge, _) = spawn_bridge().await;

    let err = bridge
        .dump_properties(&DumpRequest::new("Crashed", 0, 50))
        .await
        .unwrap_err();
    assert_eq!(err, BridgeError::Rejected("Game thread did not respond".into()));
    assert_eq!(err.to_string(), "Game thread did not respond");

    let err = bridge
        .dump_properties(&DumpRequest::new("Overloaded", 0, 50))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::Status {
            status: 503,
            body: "try again later".into()
        }
    );
}

#[tokio::test]
async fn test_garbled_payload_is_invalid_response() {
    let (bridge, _) = spawn_bridge().await;

    let err = bridge
        .dump_properties(&DumpRequest::new("Garbled", 0, 50))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_RESPONSE");
}

#[tokio::test]
async fn test_probe_decodes_embedded_result() {
    let (bridge, _) = spawn_bridge().await;

    let result = bridge.probe(true).await.unwrap();
    assert_eq!(result.resolve("level"), Some("PawnPrivate.Level"));
    assert_eq!(result.resolve("slots"), None);
    let probed_at = result.timestamp.unwrap().to_datetime().unwrap();
    assert_eq!(probed_at.timestamp(), 1767225600);
}

#[tokio::test]
async fn test_missing_persisted_probe_is_status_error() {
    let (bridge, _) = spawn_bridge().await;

    let err = bridge.load_persisted_probe().await.unwrap_err();
    assert!(matches!(err, BridgeError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_unreachable_bridge_is_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let bridge = HttpBridge::new(&format!("http://{addr}")).unwrap();
    let err = bridge.probe(false).await.unwrap_err();
    assert_eq!(err.code(), "TRANSPORT");
}

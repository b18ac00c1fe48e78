//! Discovery probe caching, single-flight and persistence.

use std::sync::Arc;

use async_trait::async_trait;
use live_editor::bridge::{
    BridgeCall, BridgeError, DumpRequest, FunctionsDump, InMemoryBridge, ProbeResult,
    PropertiesDump, ReflectionBridge, Result as BridgeResult,
};
use live_editor::{DiscoveryStatus, JsonFileProbeStore, ProbeError, ProbeStore, Prober};
use pretty_assertions::assert_eq;
use tokio::sync::Notify;

fn result(pairs: &[(&str, &str)]) -> ProbeResult {
    pairs.iter().copied().collect()
}

#[tokio::test]
async fn test_success_replaces_cache_wholesale() {
    let bridge = Arc::new(InMemoryBridge::new());
    bridge.push_probe(result(&[("level", "PawnPrivate.Level")]));
    bridge.push_probe(result(&[("hp", "PawnPrivate.HP")]));
    let prober = Prober::new(bridge.clone());

    prober.probe(false).await.unwrap();
    assert_eq!(prober.resolve("level").as_deref(), Some("PawnPrivate.Level"));

    prober.probe(true).await.unwrap();
    assert_eq!(prober.resolve("level"), None);
    assert_eq!(prober.resolve("hp").as_deref(), Some("PawnPrivate.HP"));
    assert_eq!(prober.cached().unwrap().total(), 1);

    assert_eq!(
        bridge.calls(),
        vec![
            BridgeCall::Probe { force: false },
            BridgeCall::Probe { force: true }
        ]
    );
}

#[tokio::test]
async fn test_failure_keeps_previous_cache() {
    let bridge = Arc::new(InMemoryBridge::new());
    bridge.push_probe(result(&[("level", "PawnPrivate.Level"), ("slots", "NOT_FOUND")]));
    bridge.push_probe_failure(BridgeError::Rejected("Player not loaded".into()));
    let prober = Prober::new(bridge);

    prober.probe(false).await.unwrap();
    let err = prober.probe(true).await.unwrap_err();
    assert_eq!(
        err,
        ProbeError::Bridge(BridgeError::Rejected("Player not loaded".into()))
    );

    assert_eq!(prober.resolve("level").as_deref(), Some("PawnPrivate.Level"));
    assert_eq!(prober.resolve("slots"), None);
    assert_eq!(prober.status(), DiscoveryStatus::Stale { found: 1, total: 2 });
    assert_eq!(prober.status().to_string(), "DISC 1/2 !");
    assert!(prober.status_detail().ends_with(": Player not loaded"));
    assert_eq!(prober.last_failure().unwrap().code(), "REJECTED");
    assert!(!prober.is_probing());
}

#[tokio::test]
async fn test_next_success_clears_failure_marker() {
    let bridge = Arc::new(InMemoryBridge::new());
    bridge.push_probe_failure(BridgeError::Transport("connection refused".into()));
    bridge.push_probe(result(&[("level", "PawnPrivate.Level")]));
    let prober = Prober::new(bridge);

    assert!(prober.probe(false).await.is_err());
    assert_eq!(prober.status(), DiscoveryStatus::Failed);
    assert_eq!(prober.status().to_string(), "DISC !");

    prober.probe(true).await.unwrap();
    assert_eq!(prober.status(), DiscoveryStatus::Complete { total: 1 });
    assert_eq!(prober.status().to_string(), "DISC 1/1");
    assert!(prober.last_failure().is_none());
}

/// Holds every probe until released.
struct GatedBridge {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl ReflectionBridge for GatedBridge {
    async fn dump_properties(&self, _req: &DumpRequest) -> BridgeResult<PropertiesDump> {
        Err(BridgeError::Rejected("not scripted".into()))
    }

    async fn dump_functions(&self, _req: &DumpRequest) -> BridgeResult<FunctionsDump> {
        Err(BridgeError::Rejected("not scripted".into()))
    }

    async fn probe(&self, _force: bool) -> BridgeResult<ProbeResult> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(result(&[("level", "PawnPrivate.Level")]))
    }

    async fn load_persisted_probe(&self) -> BridgeResult<ProbeResult> {
        Err(BridgeError::Status {
            status: 404,
            body: String::new(),
        })
    }
}

#[tokio::test]
async fn test_second_probe_while_running_is_refused() {
    let bridge = Arc::new(GatedBridge {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let prober = Arc::new(Prober::new(bridge.clone()));

    let first = tokio::spawn({
        let prober = prober.clone();
        async move { prober.probe(false).await }
    });
    bridge.entered.notified().await;

    assert!(prober.is_probing());
    assert_eq!(prober.status(), DiscoveryStatus::Pending);
    assert_eq!(
        prober.probe(true).await.unwrap_err(),
        ProbeError::AlreadyProbing
    );

    bridge.release.notify_one();
    first.await.unwrap().unwrap();

    assert!(!prober.is_probing());
    assert_eq!(prober.status(), DiscoveryStatus::Complete { total: 1 });
}

#[tokio::test]
async fn test_load_persisted_from_bridge() {
    let bridge = Arc::new(InMemoryBridge::new());
    bridge.set_persisted_probe(Some(result(&[("level", "PawnPrivate.Level")])));
    let prober = Prober::new(bridge);

    let loaded = prober.load_persisted().await.unwrap();
    assert_eq!(loaded.found_count(), 1);
    assert_eq!(prober.resolve("level").as_deref(), Some("PawnPrivate.Level"));
}

#[tokio::test]
async fn test_load_persisted_swallows_errors() {
    let prober = Prober::new(Arc::new(InMemoryBridge::new()));

    assert!(prober.load_persisted().await.is_none());
    assert!(prober.cached().is_none());
    assert!(prober.last_failure().is_none());
    assert_eq!(prober.status(), DiscoveryStatus::Pending);
}

#[tokio::test]
async fn test_load_persisted_never_overwrites_probe_result() {
    let bridge = Arc::new(InMemoryBridge::new());
    bridge.push_probe(result(&[("hp", "PawnPrivate.HP")]));
    bridge.set_persisted_probe(Some(result(&[("level", "Old.Level")])));
    let prober = Prober::new(bridge);

    prober.probe(false).await.unwrap();
    let kept = prober.load_persisted().await.unwrap();

    assert_eq!(kept.resolve("hp"), Some("PawnPrivate.HP"));
    assert_eq!(prober.resolve("level"), None);
}

#[tokio::test]
async fn test_store_fallback_and_write_through() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("discovery.json");

    // First session probes and saves.
    let bridge = Arc::new(InMemoryBridge::new());
    bridge.push_probe(result(&[("level", "PawnPrivate.Level")]));
    let prober = Prober::new(bridge).with_store(Arc::new(JsonFileProbeStore::new(&path)));
    prober.probe(false).await.unwrap();

    let saved = JsonFileProbeStore::new(&path).load().await.unwrap().unwrap();
    assert_eq!(saved.resolve("level"), Some("PawnPrivate.Level"));

    // Second session: the bridge has nothing saved, the local file does.
    let prober = Prober::new(Arc::new(InMemoryBridge::new()))
        .with_store(Arc::new(JsonFileProbeStore::new(&path)));
    let loaded = prober.load_persisted().await.unwrap();
    assert_eq!(loaded, saved);
    assert_eq!(prober.status(), DiscoveryStatus::Complete { total: 1 });
}

#[tokio::test]
async fn test_corrupt_store_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("discovery.json");
    tokio::fs::write(&path, b"not json").await.unwrap();

    let prober = Prober::new(Arc::new(InMemoryBridge::new()))
        .with_store(Arc::new(JsonFileProbeStore::new(&path)));
    assert!(prober.load_persisted().await.is_none());
}

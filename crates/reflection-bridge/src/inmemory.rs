//! InMemoryBridge - scripted bridge for tests and offline demos.
//!
//! Fixtures are stored as response bodies, so every answer goes through the
//! same two-step envelope decode as `HttpBridge`. Every call is recorded and
//! can be inspected with [`InMemoryBridge::calls`].

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::envelope::Envelope;
use crate::error::BridgeError;
use crate::proto::{DumpRequest, FunctionsDump, ProbeResult, PropertiesDump};
use crate::{ReflectionBridge, Result};

/// A request the bridge received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCall {
    DumpProperties(DumpRequest),
    DumpFunctions(DumpRequest),
    Probe { force: bool },
    LoadPersistedProbe,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ObjectKey {
    class_name: String,
    instance_index: u32,
    property_path: Option<String>,
}

impl ObjectKey {
    fn new(class_name: &str, instance_index: u32, property_path: Option<&str>) -> Self {
        Self {
            class_name: class_name.to_string(),
            instance_index,
            property_path: property_path.map(str::to_string),
        }
    }

    fn of(req: &DumpRequest) -> Self {
        Self::new(
            &req.class_name,
            req.instance_index,
            req.property_path.as_deref(),
        )
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Body(String),
    Fail(BridgeError),
}

impl Reply {
    fn wrap<T: serde::Serialize>(payload: &T) -> Self {
        match Envelope::success(payload) {
            Ok(envelope) => Self::Body(envelope.to_body()),
            Err(e) => Self::Fail(e),
        }
    }
}

#[derive(Default)]
struct Fixtures {
    properties: HashMap<ObjectKey, Reply>,
    functions: HashMap<ObjectKey, Reply>,
    probes: VecDeque<Reply>,
    persisted: Option<ProbeResult>,
    calls: Vec<BridgeCall>,
}

#[derive(Default)]
pub struct InMemoryBridge {
    fixtures: Mutex<Fixtures>,
}

impl InMemoryBridge {
    pub fn new() -> Self {
        Self::default()
    }

    fn fixtures(&self) -> MutexGuard<'_, Fixtures> {
        self.fixtures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Serve `dump` for a properties request on this address.
    pub fn insert_properties(
        &self,
        class_name: &str,
        instance_index: u32,
        property_path: Option<&str>,
        dump: PropertiesDump,
    ) {
        self.fixtures().properties.insert(
            ObjectKey::new(class_name, instance_index, property_path),
            Reply::wrap(&dump),
        );
    }

    /// Serve a raw response body for a properties request on this address.
    pub fn insert_properties_body(
        &self,
        class_name: &str,
        instance_index: u32,
        property_path: Option<&str>,
        body: impl Into<String>,
    ) {
        self.fixtures().properties.insert(
            ObjectKey::new(class_name, instance_index, property_path),
            Reply::Body(body.into()),
        );
    }

    /// Fail properties requests on this address with `error`.
    pub fn fail_properties(
        &self,
        class_name: &str,
        instance_index: u32,
        property_path: Option<&str>,
        error: BridgeError,
    ) {
        self.fixtures().properties.insert(
            ObjectKey::new(class_name, instance_index, property_path),
            Reply::Fail(error),
        );
    }

    /// Serve `dump` for a functions request on this address. The request's
    /// `filter` and `max_items` are applied to it the way the bridge does.
    pub fn insert_functions(
        &self,
        class_name: &str,
        instance_index: u32,
        property_path: Option<&str>,
        dump: FunctionsDump,
    ) {
        self.fixtures().functions.insert(
            ObjectKey::new(class_name, instance_index, property_path),
            Reply::wrap(&dump),
        );
    }

    /// Queue the answer to the next probe.
    pub fn push_probe(&self, result: ProbeResult) {
        self.fixtures().probes.push_back(Reply::wrap(&result));
    }

    /// Queue a failure as the answer to the next probe.
    pub fn push_probe_failure(&self, error: BridgeError) {
        self.fixtures().probes.push_back(Reply::Fail(error));
    }

    pub fn set_persisted_probe(&self, result: Option<ProbeResult>) {
        self.fixtures().persisted = result;
    }

    /// Every request received so far, oldest first.
    pub fn calls(&self) -> Vec<BridgeCall> {
        self.fixtures().calls.clone()
    }

    fn not_found(req: &DumpRequest) -> BridgeError {
        match &req.property_path {
            Some(path) => BridgeError::Rejected(format!(
                "Property path '{}' not found on {}[{}]",
                path, req.class_name, req.instance_index
            )),
            None => BridgeError::Rejected(format!(
                "No instance {} of class '{}'",
                req.instance_index, req.class_name
            )),
        }
    }
}

fn answer<T: serde::de::DeserializeOwned>(reply: Reply) -> Result<T> {
    match reply {
        Reply::Body(body) => Envelope::decode(&body),
        Reply::Fail(error) => Err(error),
    }
}

#[async_trait]
impl ReflectionBridge for InMemoryBridge {
    async fn dump_properties(&self, req: &DumpRequest) -> Result<PropertiesDump> {
        let reply = {
            let mut fixtures = self.fixtures();
            fixtures.calls.push(BridgeCall::DumpProperties(req.clone()));
            fixtures.properties.get(&ObjectKey::of(req)).cloned()
        };
        let mut dump: PropertiesDump = answer(reply.ok_or_else(|| Self::not_found(req))?)?;

        dump.properties.truncate(req.max_items as usize);
        dump.property_count = dump.properties.len() as u32;
        Ok(dump)
    }

    async fn dump_functions(&self, req: &DumpRequest) -> Result<FunctionsDump> {
        let reply = {
            let mut fixtures = self.fixtures();
            fixtures.calls.push(BridgeCall::DumpFunctions(req.clone()));
            fixtures.functions.get(&ObjectKey::of(req)).cloned()
        };
        let mut dump: FunctionsDump = answer(reply.ok_or_else(|| Self::not_found(req))?)?;

        if let Some(filter) = req.filter.as_deref() {
            let needle = filter.to_lowercase();
            dump.functions.retain(|f| f.name.to_lowercase().contains(&needle));
        }
        dump.functions.truncate(req.max_items as usize);
        dump.function_count = dump.functions.len() as u32;
        Ok(dump)
    }

    async fn probe(&self, force: bool) -> Result<ProbeResult> {
        let reply = {
            let mut fixtures = self.fixtures();
            fixtures.calls.push(BridgeCall::Probe { force });
            fixtures.probes.pop_front()
        };
        match reply {
            Some(reply) => answer(reply),
            None => Err(BridgeError::Rejected("Discovery is not available".into())),
        }
    }

    async fn load_persisted_probe(&self) -> Result<ProbeResult> {
        let mut fixtures = self.fixtures();
        fixtures.calls.push(BridgeCall::LoadPersistedProbe);
        fixtures.persisted.clone().ok_or(BridgeError::Status {
            status: 404,
            body: "no discovery result saved".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{FunctionRecord, PropertyRecord};

    fn request(path: Option<&str>) -> DumpRequest {
        DumpRequest::new("PalPlayerState", 0, 50).with_property_path(path.map(String::from))
    }

    #[tokio::test]
    async fn test_unknown_address_is_rejected() {
        let bridge = InMemoryBridge::new();
        let err = bridge
            .dump_properties(&request(Some("Nope")))
            .await
            .unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(bridge.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_max_items_truncates() {
        let bridge = InMemoryBridge::new();
        let props = (0..5)
            .map(|i| PropertyRecord::new(format!("P{i}"), "IntProperty", "0"))
            .collect();
        bridge.insert_properties("PalPlayerState", 0, None, PropertiesDump::new("X", props));

        let mut req = request(None);
        req.max_items = 2;
        let dump = bridge.dump_properties(&req).await.unwrap();
        assert_eq!(dump.properties.len(), 2);
        assert_eq!(dump.property_count, 2);
    }

    #[tokio::test]
    async fn test_function_filter_is_case_insensitive() {
        let bridge = InMemoryBridge::new();
        bridge.insert_functions(
            "PalPlayerState",
            0,
            None,
            FunctionsDump::new(
                "X",
                vec![FunctionRecord::new("HealAll"), FunctionRecord::new("GetLevel")],
            ),
        );

        let req = request(None).with_filter(Some("heal".into()));
        let dump = bridge.dump_functions(&req).await.unwrap();
        assert_eq!(dump.functions.len(), 1);
        assert_eq!(dump.functions[0].name, "HealAll");
    }

    #[tokio::test]
    async fn test_probe_queue_drains_in_order() {
        let bridge = InMemoryBridge::new();
        bridge.push_probe([("level", "PawnPrivate.Level")].into_iter().collect());
        bridge.push_probe_failure(BridgeError::Transport("gone".into()));

        assert!(bridge.probe(false).await.is_ok());
        assert!(bridge.probe(true).await.is_err());
        assert!(bridge.probe(true).await.unwrap_err().is_rejection());
        assert_eq!(bridge.calls()[1], BridgeCall::Probe { force: true });
    }
}

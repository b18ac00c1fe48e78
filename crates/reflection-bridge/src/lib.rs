//! ReflectionBridge trait - the sole API boundary between the live editor and
//! the reflection bridge exposed by the server mod.
//!
//! The bridge walks live server memory and serializes what it finds. This
//! crate only speaks its wire contract:
//!
//! - `proto` - request and payload types
//! - `envelope` - the `{ success, message }` wrapper and its two-step decode
//! - `http` - reqwest-backed client for a running bridge
//! - `inmemory` - scripted bridge for tests and offline demos

pub mod envelope;
pub mod error;
pub mod http;
pub mod inmemory;
pub mod proto;

use async_trait::async_trait;

pub use envelope::Envelope;
pub use error::BridgeError;
pub use http::HttpBridge;
pub use inmemory::{BridgeCall, InMemoryBridge};
pub use proto::*;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[async_trait]
pub trait ReflectionBridge: Send + Sync {
    /// Dump the properties of the object addressed by `req`.
    async fn dump_properties(&self, req: &DumpRequest) -> Result<PropertiesDump>;

    /// Dump the callable functions of the object addressed by `req`.
    /// `req.filter` is a case-insensitive substring applied by the bridge.
    async fn dump_functions(&self, req: &DumpRequest) -> Result<FunctionsDump>;

    /// Run the bridge-side discovery battery.
    async fn probe(&self, force: bool) -> Result<ProbeResult>;

    /// Fetch the probe result the bridge saved from an earlier run.
    async fn load_persisted_probe(&self) -> Result<ProbeResult>;
}

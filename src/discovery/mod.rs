//! Auto-discovery of semantic roles.
//!
//! The bridge runs a fixed battery of well-known lookups and reports which
//! concrete property path each role ("level", "inventory slots", ...) lives
//! at. The result lets other components resolve fields without hardcoding
//! paths that shift between server builds.
//!
//! - `probe`: single-flight `Prober` owning the cached result
//! - `store`: local persistence of the last good result
//! - `status`: the found/total indicator

pub mod probe;
pub mod status;
pub mod store;

pub use probe::{ProbeError, Prober};
pub use status::DiscoveryStatus;
pub use store::{JsonFileProbeStore, ProbeStore, StoreError};

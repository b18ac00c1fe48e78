//! Live Editor - operator tooling for a running game server.
//!
//! The server mod exposes a reflection bridge over HTTP (see the
//! `reflection-bridge` crate). This crate builds the operator-facing pieces on
//! top of it:
//!
//! - `explorer`: path-addressed drill-down through reflected objects
//! - `discovery`: cached role -> property path probe results
//! - `config`: `LIVE_EDITOR_*` environment configuration
//!
//! The `live_editor` binary (feature `cli`) wraps both in a command line and
//! an interactive REPL.

pub mod config;
pub mod discovery;
pub mod error;
pub mod explorer;

pub use config::ExplorerConfig;
pub use discovery::{DiscoveryStatus, JsonFileProbeStore, ProbeError, ProbeStore, Prober};
pub use error::ExplorerError;
pub use explorer::{DumpMode, DumpOutcome, Explorer, ExplorerStatus, ObjectPath, Selection};

pub use reflection_bridge as bridge;

//! Explorer - path-based drill-down through the server's reflected objects.
//!
//! - `path`: ObjectPath, the address of a position in the graph
//! - `classify`: declared type + value -> render category and drillability
//! - `breadcrumb`: re-resolvable trail derived from a path
//! - `session`: the dump request/response cycle and navigation
//! - `render`: display panel for the committed view
//!
//! ## Usage Example
//!
//! ```ignore
//! use live_editor::explorer::{DumpMode, Explorer, ObjectPath};
//!
//! let explorer = Explorer::new(bridge, 50);
//! explorer.open(ObjectPath::root("PalPlayerState", 0), DumpMode::Properties).await?;
//! explorer.drill("PlayerId").await?;
//! explorer.jump(0).await?;
//! ```

pub mod breadcrumb;
pub mod classify;
pub mod path;
pub mod render;
pub mod session;

pub use breadcrumb::{Breadcrumb, Crumb};
pub use classify::{classify, Classification, TypeFamily, ValueCategory, ERROR_TAG, NULL_SENTINEL};
pub use path::ObjectPath;
pub use render::{render, Panel, PanelBody};
pub use session::{
    DumpMode, DumpOutcome, DumpTicket, Explorer, ExplorerStatus, ExplorerView, Listing,
    PropertyRow, RawDump, Selection,
};

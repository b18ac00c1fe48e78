//! Explorer session: the dump request/response cycle.
//!
//! A dump goes through three phases:
//!
//! 1. `begin` records the requested path and issues a ticket,
//! 2. `fetch` performs the bridge round trip (no state lock held),
//! 3. `complete` applies the result, but only if the ticket is still the
//!    latest one issued.
//!
//! Navigation commits only on a fully decoded successful round trip; a failed
//! or superseded dump leaves the committed view and breadcrumb untouched.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reflection_bridge::{
    BridgeError, FunctionRecord, FunctionsDump, PropertiesDump, PropertyRecord, ReflectionBridge,
};
use tracing::{debug, info, warn};

use super::breadcrumb::Breadcrumb;
use super::classify::{classify, Classification};
use super::path::ObjectPath;
use crate::error::ExplorerError;

pub type Result<T> = std::result::Result<T, ExplorerError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpMode {
    Properties,
    Functions { filter: Option<String> },
}

impl DumpMode {
    /// Functions mode; a blank filter means no filter.
    pub fn functions(filter: Option<&str>) -> Self {
        let filter = filter
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string);
        Self::Functions { filter }
    }

    pub fn noun(&self) -> &'static str {
        match self {
            Self::Properties => "properties",
            Self::Functions { .. } => "functions",
        }
    }

    pub fn filter(&self) -> Option<&str> {
        match self {
            Self::Properties => None,
            Self::Functions { filter } => filter.as_deref(),
        }
    }
}

/// A property record with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRow {
    pub record: PropertyRecord,
    pub classification: Classification,
}

impl PropertyRow {
    pub fn new(record: PropertyRecord) -> Self {
        let classification = classify(&record.declared_type, &record.value);
        Self {
            record,
            classification,
        }
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn is_drillable(&self) -> bool {
        self.classification.drillable
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Properties(Vec<PropertyRow>),
    Functions(Vec<FunctionRecord>),
}

impl Listing {
    pub fn len(&self) -> usize {
        match self {
            Self::Properties(rows) => rows.len(),
            Self::Functions(functions) => functions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decoded payload of either dump kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawDump {
    Properties(PropertiesDump),
    Functions(FunctionsDump),
}

/// What the operator is looking at: the last successfully applied dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerView {
    pub path: ObjectPath,
    pub breadcrumb: Breadcrumb,
    pub mode: DumpMode,
    /// Class path as resolved by the bridge.
    pub class_path: String,
    pub instance_count: Option<u32>,
    /// Item count reported by the bridge.
    pub item_count: u32,
    pub listing: Listing,
    pub fetched_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl ExplorerView {
    fn from_dump(ticket: &DumpTicket, raw: RawDump, elapsed: Duration) -> Self {
        let (class_path, instance_count, item_count, listing) = match raw {
            RawDump::Properties(dump) => (
                dump.class_path,
                dump.instance_count,
                dump.property_count,
                Listing::Properties(dump.properties.into_iter().map(PropertyRow::new).collect()),
            ),
            RawDump::Functions(dump) => (
                dump.class_path,
                dump.instance_count,
                dump.function_count,
                Listing::Functions(dump.functions),
            ),
        };

        Self {
            path: ticket.path.clone(),
            breadcrumb: Breadcrumb::build(&ticket.path),
            mode: ticket.mode.clone(),
            class_path,
            instance_count,
            item_count,
            listing,
            fetched_at: Utc::now(),
            elapsed,
        }
    }

    pub fn row(&self, field: &str) -> Option<&PropertyRow> {
        match &self.listing {
            Listing::Properties(rows) => rows.iter().find(|row| row.name() == field),
            Listing::Functions(_) => None,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "OK: {} {} in {:.2}s",
            self.item_count,
            self.mode.noun(),
            self.elapsed.as_secs_f64()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExplorerStatus {
    #[default]
    Idle,
    Loading {
        path: ObjectPath,
    },
    Loaded {
        summary: String,
    },
    Failed(ExplorerError),
}

/// An issued dump. Only the most recently issued ticket may apply its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpTicket {
    id: u64,
    path: ObjectPath,
    mode: DumpMode,
    max_items: u32,
    issued_at: Instant,
}

impl DumpTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    pub fn mode(&self) -> &DumpMode {
        &self.mode
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpOutcome {
    /// The result became the committed view (or the visible error).
    Applied,
    /// A newer dump was issued meanwhile; the result was dropped.
    Superseded,
}

/// Operator input from the render layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Drill into a property of the current view.
    Field(String),
    /// Jump back to a breadcrumb entry.
    Crumb(usize),
    /// Re-issue the current view's request.
    Refresh,
}

#[derive(Debug, Default)]
struct ExplorerState {
    next_ticket: u64,
    in_flight: Option<u64>,
    requested: Option<ObjectPath>,
    view: Option<ExplorerView>,
    status: ExplorerStatus,
}

pub struct Explorer {
    bridge: Arc<dyn ReflectionBridge>,
    max_items: u32,
    state: Mutex<ExplorerState>,
}

impl Explorer {
    pub fn new(bridge: Arc<dyn ReflectionBridge>, max_items: u32) -> Self {
        Self {
            bridge,
            max_items,
            state: Mutex::new(ExplorerState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ExplorerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn max_items(&self) -> u32 {
        self.max_items
    }

    // ── Dump cycle ────────────────────────────────────────────

    /// Dump `path` and apply the result if it is still wanted on arrival.
    pub async fn open(&self, path: ObjectPath, mode: DumpMode) -> Result<DumpOutcome> {
        let ticket = self.begin(path, mode)?;
        let result = self.fetch(&ticket).await;
        self.complete(ticket, result)
    }

    /// Record `path` as the requested target and issue a ticket for it.
    /// Any ticket issued earlier is superseded.
    pub fn begin(&self, path: ObjectPath, mode: DumpMode) -> Result<DumpTicket> {
        if path.root_type().is_empty() {
            return Err(ExplorerError::MissingRootType);
        }

        let mut state = self.state();
        state.next_ticket += 1;
        let ticket = DumpTicket {
            id: state.next_ticket,
            path,
            mode,
            max_items: self.max_items,
            issued_at: Instant::now(),
        };
        state.in_flight = Some(ticket.id);
        state.requested = Some(ticket.path.clone());
        state.status = ExplorerStatus::Loading {
            path: ticket.path.clone(),
        };

        debug!(ticket = ticket.id, path = %ticket.path, mode = ticket.mode.noun(), "dump issued");
        Ok(ticket)
    }

    /// Perform the bridge round trip for `ticket`.
    pub async fn fetch(&self, ticket: &DumpTicket) -> std::result::Result<RawDump, BridgeError> {
        let req = ticket.path.to_request(ticket.max_items);
        match &ticket.mode {
            DumpMode::Properties => self
                .bridge
                .dump_properties(&req)
                .await
                .map(RawDump::Properties),
            DumpMode::Functions { filter } => self
                .bridge
                .dump_functions(&req.with_filter(filter.clone()))
                .await
                .map(RawDump::Functions),
        }
    }

    /// Apply a finished round trip.
    ///
    /// Returns `Superseded` without touching state when `ticket` is no longer
    /// the latest one. Otherwise a success becomes the committed view and a
    /// failure becomes the visible error; the committed view is kept.
    pub fn complete(
        &self,
        ticket: DumpTicket,
        result: std::result::Result<RawDump, BridgeError>,
    ) -> Result<DumpOutcome> {
        let mut state = self.state();
        if state.in_flight != Some(ticket.id) {
            debug!(ticket = ticket.id, path = %ticket.path, "dropping superseded dump response");
            return Ok(DumpOutcome::Superseded);
        }
        state.in_flight = None;

        let elapsed = ticket.issued_at.elapsed();
        match result {
            Ok(raw) => {
                let view = ExplorerView::from_dump(&ticket, raw, elapsed);
                info!(
                    path = %view.path,
                    class = %view.class_path,
                    items = view.listing.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "dump applied"
                );
                state.status = ExplorerStatus::Loaded {
                    summary: view.summary(),
                };
                state.view = Some(view);
                Ok(DumpOutcome::Applied)
            }
            Err(e) => {
                warn!(path = %ticket.path, code = e.code(), error = %e, "dump failed");
                let err = ExplorerError::Bridge(e);
                state.status = ExplorerStatus::Failed(err.clone());
                Err(err)
            }
        }
    }

    // ── Navigation ────────────────────────────────────────────

    /// Manual submit: class name, instance index and dotted property path.
    pub async fn submit(
        &self,
        root_type: &str,
        instance_index: u32,
        property_path: &str,
    ) -> Result<DumpOutcome> {
        let path = ObjectPath::parse(root_type, instance_index, property_path);
        self.open(path, DumpMode::Properties).await
    }

    /// Descend into a drillable property of the committed view.
    pub async fn drill(&self, field: &str) -> Result<DumpOutcome> {
        let target = {
            let state = self.state();
            let view = state.view.as_ref().ok_or(ExplorerError::NoView)?;
            let row = view.row(field).ok_or_else(|| ExplorerError::UnknownField {
                field: field.to_string(),
            })?;
            if !row.is_drillable() {
                return Err(ExplorerError::NotDrillable {
                    field: field.to_string(),
                });
            }
            view.path
                .descend(field)
                .ok_or_else(|| ExplorerError::InvalidSegment {
                    name: field.to_string(),
                })?
        };
        self.open(target, DumpMode::Properties).await
    }

    /// Jump back to breadcrumb `index` of the committed view, keeping its mode.
    pub async fn jump(&self, index: usize) -> Result<DumpOutcome> {
        let (target, mode) = {
            let state = self.state();
            let view = state.view.as_ref().ok_or(ExplorerError::NoView)?;
            let target = view
                .breadcrumb
                .target(index)
                .cloned()
                .ok_or(ExplorerError::InvalidCrumb { index })?;
            (target, view.mode.clone())
        };
        self.open(target, mode).await
    }

    /// Go up one level.
    pub async fn up(&self) -> Result<DumpOutcome> {
        let depth = self.committed_path().ok_or(ExplorerError::NoView)?.depth();
        if depth == 0 {
            return Err(ExplorerError::InvalidCrumb { index: 0 });
        }
        self.jump(depth - 1).await
    }

    /// Re-dump the committed path in another mode.
    pub async fn switch_mode(&self, mode: DumpMode) -> Result<DumpOutcome> {
        let path = self.committed_path().ok_or(ExplorerError::NoView)?;
        self.open(path, mode).await
    }

    pub async fn refresh(&self) -> Result<DumpOutcome> {
        let (path, mode) = {
            let state = self.state();
            let view = state.view.as_ref().ok_or(ExplorerError::NoView)?;
            (view.path.clone(), view.mode.clone())
        };
        self.open(path, mode).await
    }

    pub async fn select(&self, selection: Selection) -> Result<DumpOutcome> {
        match selection {
            Selection::Field(field) => self.drill(&field).await,
            Selection::Crumb(index) => self.jump(index).await,
            Selection::Refresh => self.refresh().await,
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn view(&self) -> Option<ExplorerView> {
        self.state().view.clone()
    }

    pub fn status(&self) -> ExplorerStatus {
        self.state().status.clone()
    }

    pub fn committed_path(&self) -> Option<ObjectPath> {
        self.state().view.as_ref().map(|v| v.path.clone())
    }

    /// Most recently requested path, committed or not.
    pub fn requested_path(&self) -> Option<ObjectPath> {
        self.state().requested.clone()
    }

    pub fn breadcrumb(&self) -> Option<Breadcrumb> {
        self.state().view.as_ref().map(|v| v.breadcrumb.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.state().in_flight.is_some()
    }
}

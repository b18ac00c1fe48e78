//! Render layer: turns the committed view and status into a display panel.
//!
//! Pure presentation. Nothing here mutates explorer state; selections go back
//! through [`Explorer::select`](super::Explorer::select).

use reflection_bridge::{FunctionRecord, ParamDirection};
use serde::Serialize;

use super::classify::{is_error_tagged, ValueCategory};
use super::session::{DumpMode, ExplorerStatus, ExplorerView, Listing, PropertyRow};

/// Values longer than this are cut in the table; the full text is kept.
pub const VALUE_DISPLAY_LIMIT: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTone {
    Idle,
    Loading,
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrumbCell {
    pub label: String,
    /// Index to pass to `Selection::Crumb`; `None` for the current crumb.
    pub target: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultsInfo {
    pub class_path: String,
    pub instances: String,
    pub shown: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyLine {
    pub offset: String,
    pub declared_type: String,
    pub name: String,
    pub value: String,
    pub full_value: String,
    pub category: ValueCategory,
    pub drillable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionLine {
    pub signature: String,
    pub flags: String,
    pub error: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum PanelBody {
    Ready,
    Properties(Vec<PropertyLine>),
    Functions(Vec<FunctionLine>),
    Empty(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Panel {
    pub status: String,
    pub tone: StatusTone,
    pub breadcrumb: Vec<CrumbCell>,
    pub info: Option<ResultsInfo>,
    pub body: PanelBody,
    /// Wall-clock time of the committed dump, `HH:MM:SS`.
    pub fetched_at: Option<String>,
}

/// Render the panel for a committed view (if any) and the current status.
pub fn render(view: Option<&ExplorerView>, status: &ExplorerStatus) -> Panel {
    let breadcrumb = view.map(breadcrumb_cells).unwrap_or_default();
    let fetched_at = view.map(|v| v.fetched_at.format("%H:%M:%S").to_string());

    let (status_text, tone) = match status {
        ExplorerStatus::Idle => ("Ready".to_string(), StatusTone::Idle),
        ExplorerStatus::Loading { path } => (
            format!("Dumping {}...", path.root_type()),
            StatusTone::Loading,
        ),
        ExplorerStatus::Loaded { summary } => (summary.clone(), StatusTone::Ok),
        ExplorerStatus::Failed(err) => (format!("Error: {err}"), StatusTone::Error),
    };

    let (info, body) = match (status, view) {
        (ExplorerStatus::Failed(err), _) => (None, PanelBody::Error(err.to_string())),
        (_, Some(view)) => render_view(view),
        (_, None) => (None, PanelBody::Ready),
    };

    Panel {
        status: status_text,
        tone,
        breadcrumb,
        info,
        body,
        fetched_at,
    }
}

fn breadcrumb_cells(view: &ExplorerView) -> Vec<CrumbCell> {
    view.breadcrumb
        .iter()
        .enumerate()
        .map(|(i, crumb)| CrumbCell {
            label: crumb.label.clone(),
            target: (!crumb.current).then_some(i),
        })
        .collect()
}

fn render_view(view: &ExplorerView) -> (Option<ResultsInfo>, PanelBody) {
    let instances = view
        .instance_count
        .map(|n| n.to_string())
        .unwrap_or_else(|| "?".to_string());
    let class_path = if view.class_path.is_empty() {
        "?".to_string()
    } else {
        view.class_path.clone()
    };

    match &view.listing {
        Listing::Properties(rows) => {
            let info = ResultsInfo {
                class_path: format!("Path: {class_path}"),
                instances: format!("Instances: {instances}"),
                shown: format!("Properties shown: {}", view.item_count),
            };
            let body = if rows.is_empty() {
                PanelBody::Empty("No properties found at this path.".to_string())
            } else {
                PanelBody::Properties(rows.iter().map(property_line).collect())
            };
            (Some(info), body)
        }
        Listing::Functions(functions) if functions.is_empty() => {
            let message = match view.mode.filter() {
                Some(filter) => format!("No functions found matching filter '{filter}'."),
                None => "No functions found at this path.".to_string(),
            };
            (None, PanelBody::Empty(message))
        }
        Listing::Functions(functions) => {
            let info = ResultsInfo {
                class_path: format!("Path: {class_path}"),
                instances: format!("Instances: {instances}"),
                shown: format!("Functions shown: {}", view.item_count),
            };
            (
                Some(info),
                PanelBody::Functions(functions.iter().map(function_line).collect()),
            )
        }
    }
}

fn property_line(row: &PropertyRow) -> PropertyLine {
    PropertyLine {
        offset: format_offset(row.record.offset),
        declared_type: row.record.declared_type.clone(),
        name: row.record.name.clone(),
        value: truncate_value(&row.record.value, VALUE_DISPLAY_LIMIT),
        full_value: row.record.value.clone(),
        category: row.classification.category,
        drillable: row.classification.drillable,
    }
}

fn function_line(function: &FunctionRecord) -> FunctionLine {
    FunctionLine {
        signature: function_signature(function),
        flags: function.flags.iter().cloned().collect::<Vec<_>>().join(" | "),
        error: is_error_tagged(&function.name),
    }
}

/// `ReturnType Name(type name, out type name)`; `void` when nothing is returned.
pub fn function_signature(function: &FunctionRecord) -> String {
    let params = function
        .parameters
        .iter()
        .map(|p| match p.direction {
            ParamDirection::In => format!("{} {}", p.param_type, p.name),
            ParamDirection::Out => format!("out {} {}", p.param_type, p.name),
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{} {}({})",
        function.return_type.as_deref().unwrap_or("void"),
        function.name,
        params
    )
}

/// `0x` + 4-digit upper-case hex, or `0x????` when unknown.
pub fn format_offset(offset: Option<u32>) -> String {
    match offset {
        Some(offset) => format!("0x{offset:04X}"),
        None => "0x????".to_string(),
    }
}

/// Cut `value` to `max` characters, appending `...` when cut.
pub fn truncate_value(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &value[..cut]),
        None => value.to_string(),
    }
}

/// Short label for the mode, used in the REPL prompt.
pub fn mode_label(mode: &DumpMode) -> String {
    match mode {
        DumpMode::Properties => "props".to_string(),
        DumpMode::Functions { filter: None } => "funcs".to_string(),
        DumpMode::Functions {
            filter: Some(filter),
        } => format!("funcs~{filter}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflection_bridge::ParamDirection;

    #[test]
    fn test_format_offset() {
        assert_eq!(format_offset(Some(0x3c0)), "0x03C0");
        assert_eq!(format_offset(Some(0x12345)), "0x12345");
        assert_eq!(format_offset(None), "0x????");
    }

    #[test]
    fn test_truncate_value() {
        assert_eq!(truncate_value("short", 120), "short");
        let long = "x".repeat(130);
        let cut = truncate_value(&long, 120);
        assert_eq!(cut.len(), 123);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_value("héllo", 2), "hé...");
    }

    #[test]
    fn test_function_signature() {
        let f = FunctionRecord::new("HealPal")
            .param("Amount", "FloatProperty", ParamDirection::In)
            .param("Healed", "BoolProperty", ParamDirection::Out)
            .returns("BoolProperty");
        assert_eq!(
            function_signature(&f),
            "BoolProperty HealPal(FloatProperty Amount, out BoolProperty Healed)"
        );
        assert_eq!(function_signature(&FunctionRecord::new("Tick")), "void Tick()");
    }

    #[test]
    fn test_idle_panel_is_ready() {
        let panel = render(None, &ExplorerStatus::Idle);
        assert_eq!(panel.status, "Ready");
        assert_eq!(panel.body, PanelBody::Ready);
        assert!(panel.breadcrumb.is_empty());
        assert!(panel.info.is_none());
    }
}

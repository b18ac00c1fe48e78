//! Request and payload types of the reflection bridge.
//!
//! Field names follow the bridge's JSON exactly; Rust-side names are
//! descriptive and mapped with `serde(rename)`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Sentinel the bridge uses for a role it could not resolve.
pub const NOT_FOUND: &str = "NOT_FOUND";

/// Body of a properties or functions dump.
///
/// `property_path` and `filter` are omitted from the JSON when absent: the
/// bridge reads a missing path as "dump the root object", which is not the
/// same thing as an empty path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpRequest {
    pub class_name: String,
    pub instance_index: u32,
    pub max_items: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl DumpRequest {
    pub fn new(class_name: impl Into<String>, instance_index: u32, max_items: u32) -> Self {
        Self {
            class_name: class_name.into(),
            instance_index,
            max_items,
            property_path: None,
            filter: None,
        }
    }

    pub fn with_property_path(mut self, path: Option<String>) -> Self {
        self.property_path = path;
        self
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }
}

/// Body of a probe request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeRequest {
    pub force: bool,
}

/// One row of a properties dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub declared_type: String,
    /// Serialized value as text. JSON `null` and a missing field both read as "".
    #[serde(default, deserialize_with = "value_text")]
    pub value: String,
    /// Byte offset inside the owning object, when the bridge knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl PropertyRecord {
    pub fn new(
        name: impl Into<String>,
        declared_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            value: value.into(),
            offset: None,
        }
    }

    pub fn at_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Inner payload of a properties dump.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PropertiesDump {
    /// Class path the bridge actually resolved.
    #[serde(rename = "class", default)]
    pub class_path: String,
    #[serde(default)]
    pub instance_count: Option<u32>,
    #[serde(default)]
    pub property_count: u32,
    #[serde(default)]
    pub properties: Vec<PropertyRecord>,
}

impl PropertiesDump {
    pub fn new(class_path: impl Into<String>, properties: Vec<PropertyRecord>) -> Self {
        Self {
            class_path: class_path.into(),
            instance_count: Some(1),
            property_count: properties.len() as u32,
            properties,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamDirection {
    #[serde(alias = "In", alias = "IN")]
    In,
    #[serde(alias = "Out", alias = "OUT")]
    Out,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionParam {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub direction: ParamDirection,
}

/// One row of a functions dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub name: String,
    #[serde(rename = "params", default)]
    pub parameters: Vec<FunctionParam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default)]
    pub flags: BTreeSet<String>,
}

impl FunctionRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            return_type: None,
            flags: BTreeSet::new(),
        }
    }

    pub fn param(mut self, name: &str, param_type: &str, direction: ParamDirection) -> Self {
        self.parameters.push(FunctionParam {
            name: name.to_string(),
            param_type: param_type.to_string(),
            direction,
        });
        self
    }

    pub fn returns(mut self, return_type: &str) -> Self {
        self.return_type = Some(return_type.to_string());
        self
    }

    pub fn flag(mut self, flag: &str) -> Self {
        self.flags.insert(flag.to_string());
        self
    }
}

/// Inner payload of a functions dump.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FunctionsDump {
    #[serde(rename = "class", default)]
    pub class_path: String,
    #[serde(default)]
    pub instance_count: Option<u32>,
    #[serde(default)]
    pub function_count: u32,
    #[serde(default)]
    pub functions: Vec<FunctionRecord>,
}

impl FunctionsDump {
    pub fn new(class_path: impl Into<String>, functions: Vec<FunctionRecord>) -> Self {
        Self {
            class_path: class_path.into(),
            instance_count: Some(1),
            function_count: functions.len() as u32,
            functions,
        }
    }
}

/// Where a probed role resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProbedPath {
    Found(String),
    NotFound,
}

impl ProbedPath {
    pub fn as_path(&self) -> Option<&str> {
        match self {
            Self::Found(path) => Some(path),
            Self::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

impl From<String> for ProbedPath {
    fn from(raw: String) -> Self {
        if raw.is_empty() || raw == NOT_FOUND {
            Self::NotFound
        } else {
            Self::Found(raw)
        }
    }
}

impl From<ProbedPath> for String {
    fn from(path: ProbedPath) -> Self {
        match path {
            ProbedPath::Found(path) => path,
            ProbedPath::NotFound => NOT_FOUND.to_string(),
        }
    }
}

/// Probe timestamp as sent by the bridge: Unix seconds (whole or
/// fractional) or free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProbeTimestamp {
    Unix(i64),
    UnixFraction(serde_json::Number),
    Text(String),
}

impl ProbeTimestamp {
    /// Interpret the timestamp, if it is Unix seconds or RFC 3339 text.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Unix(secs) => Utc.timestamp_opt(*secs, 0).single(),
            Self::UnixFraction(number) => {
                let secs = number.as_f64().filter(|s| s.is_finite())?;
                let whole = secs.floor();
                if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
                    return None;
                }
                let nanos = (((secs - whole) * 1e9) as u32).min(999_999_999);
                Utc.timestamp_opt(whole as i64, nanos).single()
            }
            Self::Text(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

impl fmt::Display for ProbeTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S UTC")),
            None => match self {
                Self::Unix(secs) => write!(f, "{secs}"),
                Self::UnixFraction(number) => write!(f, "{number}"),
                Self::Text(text) => f.write_str(text),
            },
        }
    }
}

/// Role -> property path map produced by the discovery battery.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProbeResult {
    #[serde(default)]
    pub properties: BTreeMap<String, ProbedPath>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_timestamp"
    )]
    pub timestamp: Option<ProbeTimestamp>,
}

impl ProbeResult {
    pub fn new(properties: BTreeMap<String, ProbedPath>) -> Self {
        Self {
            properties,
            timestamp: None,
        }
    }

    /// Resolved path for a role, `None` when missing or `NOT_FOUND`.
    pub fn resolve(&self, role: &str) -> Option<&str> {
        self.properties.get(role).and_then(ProbedPath::as_path)
    }

    pub fn found_count(&self) -> usize {
        self.properties.values().filter(|p| p.is_found()).count()
    }

    pub fn total(&self) -> usize {
        self.properties.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ProbeResult {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(role, path)| (role.into(), ProbedPath::from(path.into())))
                .collect(),
        )
    }
}

/// The timestamp is metadata; a shape we cannot read is dropped rather than
/// failing the whole role map.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<ProbeTimestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Accept any JSON scalar as value text; the bridge is not consistent about
/// quoting numbers and booleans.
fn value_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dump_request_omits_absent_path() {
        let req = DumpRequest::new("PalPlayerState", 0, 50);
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(
            body,
            json!({"class_name": "PalPlayerState", "instance_index": 0, "max_items": 50})
        );
    }

    #[test]
    fn test_dump_request_carries_path_and_filter() {
        let req = DumpRequest::new("PalPlayerState", 2, 10)
            .with_property_path(Some("PawnPrivate.Level".into()))
            .with_filter(Some("heal".into()));
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["property_path"], "PawnPrivate.Level");
        assert_eq!(body["filter"], "heal");
        assert_eq!(body["instance_index"], 2);
    }

    #[test]
    fn test_property_value_accepts_scalars() {
        let records: Vec<PropertyRecord> = serde_json::from_value(json!([
            {"name": "Level", "type": "IntProperty", "value": 12, "offset": 64},
            {"name": "bIsDead", "type": "BoolProperty", "value": false},
            {"name": "Owner", "type": "ObjectProperty", "value": null},
            {"name": "Nick", "type": "StrProperty"}
        ]))
        .unwrap();
        assert_eq!(records[0].value, "12");
        assert_eq!(records[0].offset, Some(64));
        assert_eq!(records[1].value, "false");
        assert_eq!(records[2].value, "");
        assert_eq!(records[3].value, "");
    }

    #[test]
    fn test_function_record_wire_names() {
        let record: FunctionRecord = serde_json::from_value(json!({
            "name": "HealPal",
            "params": [
                {"name": "Amount", "type": "FloatProperty", "direction": "in"},
                {"name": "ReturnValue", "type": "BoolProperty", "direction": "Out"}
            ],
            "return_type": "BoolProperty",
            "flags": ["Native", "BlueprintCallable", "Native"]
        }))
        .unwrap();
        assert_eq!(record.parameters.len(), 2);
        assert_eq!(record.parameters[1].direction, ParamDirection::Out);
        assert_eq!(record.flags.len(), 2);
    }

    #[test]
    fn test_probed_path_sentinel() {
        let result: ProbeResult = serde_json::from_value(json!({
            "properties": {"level": "PawnPrivate.Level", "hp": "NOT_FOUND"},
            "timestamp": 1700000000
        }))
        .unwrap();
        assert_eq!(result.resolve("level"), Some("PawnPrivate.Level"));
        assert_eq!(result.resolve("hp"), None);
        assert_eq!(result.found_count(), 1);
        assert_eq!(result.total(), 2);

        let back = serde_json::to_value(&result).unwrap();
        assert_eq!(back["properties"]["hp"], "NOT_FOUND");
    }

    #[test]
    fn test_probe_timestamp_forms() {
        let unix = ProbeTimestamp::Unix(0);
        assert_eq!(unix.to_string(), "1970-01-01 00:00:00 UTC");

        let text = ProbeTimestamp::Text("2026-01-02T03:04:05Z".into());
        assert!(text.to_datetime().is_some());

        let opaque = ProbeTimestamp::Text("yesterday".into());
        assert!(opaque.to_datetime().is_none());
        assert_eq!(opaque.to_string(), "yesterday");
    }

    #[test]
    fn test_fractional_timestamp_decodes() {
        let result: ProbeResult = serde_json::from_value(json!({
            "properties": {"level": "PawnPrivate.Level"},
            "timestamp": 1767225600.25
        }))
        .unwrap();
        assert_eq!(result.resolve("level"), Some("PawnPrivate.Level"));

        let ts = result.timestamp.unwrap();
        let dt = ts.to_datetime().unwrap();
        assert_eq!(dt.timestamp(), 1767225600);
        assert_eq!(dt.timestamp_subsec_millis(), 250);
        assert_eq!(ts.to_string(), "2026-01-01 00:00:00 UTC");
    }

    #[test]
    fn test_unreadable_timestamp_keeps_role_map() {
        for timestamp in [json!(true), json!({"at": 1}), json!([1, 2]), json!(null)] {
            let result: ProbeResult = serde_json::from_value(json!({
                "properties": {"level": "PawnPrivate.Level", "hp": "NOT_FOUND"},
                "timestamp": timestamp
            }))
            .unwrap();
            assert_eq!(result.timestamp, None);
            assert_eq!(result.found_count(), 1);
            assert_eq!(result.total(), 2);
        }
    }
}

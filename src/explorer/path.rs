//! ObjectPath - the address of a position inside the remote object graph.
//!
//! A path is a root class name, an instance index and a chain of property
//! names. It is a pure value: navigation always builds a new path, and the
//! bridge re-resolves it from scratch on every request.

use std::fmt;

use reflection_bridge::DumpRequest;
use serde::{Deserialize, Serialize};

/// Separator between segments in the request form.
pub const SEGMENT_SEPARATOR: char = '.';

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectPath {
    root_type: String,
    instance_index: u32,
    segments: Vec<String>,
}

impl ObjectPath {
    /// Path to a root instance, with no segments.
    pub fn root(root_type: &str, instance_index: u32) -> Self {
        Self {
            root_type: root_type.trim().to_string(),
            instance_index,
            segments: Vec::new(),
        }
    }

    /// Path from manually entered text, e.g. `"PawnPrivate.CharacterParameterComponent"`.
    /// Empty pieces are dropped.
    pub fn parse(root_type: &str, instance_index: u32, property_path: &str) -> Self {
        let mut path = Self::root(root_type, instance_index);
        path.segments = property_path
            .split(SEGMENT_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        path
    }

    /// New path one property deeper.
    ///
    /// Returns `None` for an empty name or one containing the separator,
    /// since neither survives the round trip through the request form.
    pub fn descend(&self, property_name: &str) -> Option<Self> {
        if property_name.is_empty() || property_name.contains(SEGMENT_SEPARATOR) {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.push(property_name.to_string());
        Some(Self {
            root_type: self.root_type.clone(),
            instance_index: self.instance_index,
            segments,
        })
    }

    /// This path truncated to `depth` segments (0 = root). Clamps at the end.
    pub fn truncate(&self, depth: usize) -> Self {
        Self {
            root_type: self.root_type.clone(),
            instance_index: self.instance_index,
            segments: self.segments[..depth.min(self.segments.len())].to_vec(),
        }
    }

    /// Joined segments, or `None` at the root (field omitted on the wire).
    pub fn to_request_path(&self) -> Option<String> {
        if self.segments.is_empty() {
            None
        } else {
            Some(self.segments.join("."))
        }
    }

    pub fn to_request(&self, max_items: u32) -> DumpRequest {
        DumpRequest::new(self.root_type.clone(), self.instance_index, max_items)
            .with_property_path(self.to_request_path())
    }

    pub fn root_type(&self) -> &str {
        &self.root_type
    }

    pub fn instance_index(&self) -> u32 {
        self.instance_index
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Root label as shown in the first breadcrumb, e.g. `PalPlayerState[0]`.
    pub fn root_label(&self) -> String {
        format!("{}[{}]", self.root_type, self.instance_index)
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root_label())?;
        for segment in &self.segments {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

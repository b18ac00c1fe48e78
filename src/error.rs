//! Explorer error types.

use reflection_bridge::BridgeError;
use thiserror::Error;

/// Errors surfaced by the explorer to the operator.
///
/// Navigation errors are raised before any request is issued; `Bridge` wraps
/// a failed round trip. None of them change the committed view.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExplorerError {
    #[error("Enter a class name")]
    MissingRootType,

    #[error("Invalid property name '{name}'")]
    InvalidSegment { name: String },

    #[error("No property '{field}' at this path")]
    UnknownField { field: String },

    #[error("Property '{field}' cannot be drilled into")]
    NotDrillable { field: String },

    #[error("Breadcrumb {index} is not navigable")]
    InvalidCrumb { index: usize },

    #[error("Nothing has been dumped yet")]
    NoView,

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl ExplorerError {
    /// Get an error code for this error type.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingRootType => "MISSING_ROOT_TYPE",
            Self::InvalidSegment { .. } => "INVALID_SEGMENT",
            Self::UnknownField { .. } => "UNKNOWN_FIELD",
            Self::NotDrillable { .. } => "NOT_DRILLABLE",
            Self::InvalidCrumb { .. } => "INVALID_CRUMB",
            Self::NoView => "NO_VIEW",
            Self::Bridge(e) => e.code(),
        }
    }
}

//! Value classification by declared property type.
//!
//! Decides how a returned value is rendered and whether it is safe to descend
//! into. The remote type universe is open-ended, so unknown types degrade to
//! `Opaque` instead of failing.

use serde::{Deserialize, Serialize};

/// Prefix the bridge puts on a value it failed to read.
pub const ERROR_TAG: &str = "ERROR:";

/// Text the bridge writes for a null reference.
pub const NULL_SENTINEL: &str = "nil";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueCategory {
    Numeric,
    BoolTrue,
    BoolFalse,
    Text,
    Error,
    Opaque,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    Numeric,
    Boolean,
    Text,
    Object,
    Unknown,
}

impl TypeFamily {
    pub fn of(declared_type: &str) -> Self {
        match declared_type {
            "IntProperty" | "Int8Property" | "Int16Property" | "Int64Property"
            | "UInt16Property" | "UInt32Property" | "UInt64Property" | "ByteProperty"
            | "FloatProperty" | "DoubleProperty" => Self::Numeric,
            "BoolProperty" => Self::Boolean,
            "StrProperty" | "NameProperty" | "TextProperty" => Self::Text,
            "ObjectProperty" | "ClassProperty" | "StructProperty" => Self::Object,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Classification {
    pub category: ValueCategory,
    pub drillable: bool,
}

pub fn is_error_tagged(raw_value: &str) -> bool {
    raw_value.starts_with(ERROR_TAG)
}

/// Classify one property value.
///
/// `drillable` requires both an object-family type and a sane value: a null
/// or error-tagged reference would make the bridge recurse into garbage.
pub fn classify(declared_type: &str, raw_value: &str) -> Classification {
    let family = TypeFamily::of(declared_type);

    if is_error_tagged(raw_value) {
        return Classification {
            category: ValueCategory::Error,
            drillable: false,
        };
    }
    if raw_value.is_empty() {
        return Classification {
            category: ValueCategory::Opaque,
            drillable: false,
        };
    }

    let category = match family {
        TypeFamily::Numeric => ValueCategory::Numeric,
        TypeFamily::Boolean if raw_value == "true" => ValueCategory::BoolTrue,
        TypeFamily::Boolean => ValueCategory::BoolFalse,
        TypeFamily::Text => ValueCategory::Text,
        TypeFamily::Object | TypeFamily::Unknown => ValueCategory::Opaque,
    };

    Classification {
        category,
        drillable: family == TypeFamily::Object && raw_value != NULL_SENTINEL,
    }
}

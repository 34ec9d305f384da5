//! Attribute lookups shared by both reconcilers.

use std::str::FromStr;

use uuid::Uuid;

use crate::error::{CreateFailure, ReconcileError};

/// Attribute value, treating an empty string like a missing attribute.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Attribute value or `default` when the attribute is absent.
pub(crate) fn or_default<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    value.as_deref().unwrap_or(default)
}

/// `true` only if the attribute is present and parses as true.
pub(crate) fn flag(attribute: &'static str, value: &Option<String>) -> Result<bool, ReconcileError> {
    match value.as_deref().map(str::trim) {
        None => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
        Some(v) => Err(ReconcileError::InvalidAttribute {
            attribute,
            value: v.to_string(),
        }),
    }
}

pub(crate) fn prop_set_id(value: &Option<String>) -> Result<Uuid, CreateFailure> {
    let value = present(value).ok_or(CreateFailure::MissingAttribute("PropSetId"))?;
    Uuid::parse_str(value.trim()).map_err(|source| CreateFailure::PropSetId {
        value: value.to_string(),
        source,
    })
}

pub(crate) fn variant_type(value: &Option<String>) -> Result<i32, CreateFailure> {
    let value = present(value).ok_or(CreateFailure::MissingAttribute("VariantType"))?;
    i32::from_str(value.trim()).map_err(|source| CreateFailure::VariantType {
        value: value.to_string(),
        source,
    })
}

/// GUID attribute with the zero GUID as default.
pub(crate) fn guid_or_nil(attribute: &'static str, value: &Option<String>) -> Result<Uuid, ReconcileError> {
    match present(value) {
        None => Ok(Uuid::nil()),
        Some(v) => Uuid::parse_str(v.trim()).map_err(|_| ReconcileError::InvalidAttribute {
            attribute,
            value: v.to_string(),
        }),
    }
}

//! Caller-facing vertex identifiers.
//!
//! A vertex is named either by one value or by an ordered tuple of values
//! (one per vertex column). Every entry point normalizes a [`VertexId`] into a
//! [`VertexKey`] checked against the shape of the vertex columns, so the rest
//! of the pipeline only ever deals with full-tuple keys.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use smallvec::SmallVec;

use super::{Result, StrataError};

/// One component of a vertex key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum KeyValue {
    /// Integer component; 32-bit columns are widened.
    Int(i64),
    /// String component.
    Str(String),
}

/// Kind of a vertex column, used to type-check caller arguments.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyKind {
    /// Integer vertex column.
    Int,
    /// String vertex column.
    Str,
}

/// Normalized full-tuple vertex key.
pub type VertexKey = SmallVec<[KeyValue; 2]>;

/// A vertex identifier as supplied by callers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum VertexId {
    /// Single-column identifier.
    Scalar(KeyValue),
    /// Multi-column identifier, one value per vertex column.
    Composite(Vec<KeyValue>),
}

impl KeyValue {
    /// Returns the kind of this component.
    pub fn kind(&self) -> KeyKind {
        match self {
            KeyValue::Int(_) => KeyKind::Int,
            KeyValue::Str(_) => KeyKind::Str,
        }
    }

    /// Returns the integer value, if this is an integer component.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            KeyValue::Int(v) => Some(*v),
            KeyValue::Str(_) => None,
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(v) => write!(f, "{v}"),
            KeyValue::Str(s) => write!(f, "{s}"),
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Int => f.write_str("integer"),
            KeyKind::Str => f.write_str("string"),
        }
    }
}

impl FromStr for KeyValue {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().parse::<i64>() {
            Ok(v) => KeyValue::Int(v),
            Err(_) => KeyValue::Str(s.to_string()),
        })
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        KeyValue::Int(value)
    }
}

impl From<i32> for KeyValue {
    fn from(value: i32) -> Self {
        KeyValue::Int(i64::from(value))
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        KeyValue::Str(value.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        KeyValue::Str(value)
    }
}

impl From<KeyValue> for VertexId {
    fn from(value: KeyValue) -> Self {
        VertexId::Scalar(value)
    }
}

impl From<i64> for VertexId {
    fn from(value: i64) -> Self {
        VertexId::Scalar(value.into())
    }
}

impl From<i32> for VertexId {
    fn from(value: i32) -> Self {
        VertexId::Scalar(value.into())
    }
}

impl From<&str> for VertexId {
    fn from(value: &str) -> Self {
        VertexId::Scalar(value.into())
    }
}

impl From<String> for VertexId {
    fn from(value: String) -> Self {
        VertexId::Scalar(value.into())
    }
}

impl VertexId {
    /// Builds a composite identifier.
    pub fn composite<I, T>(parts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<KeyValue>,
    {
        VertexId::Composite(parts.into_iter().map(Into::into).collect())
    }

    /// Rebuilds a caller-facing identifier from a normalized key.
    pub fn from_key(key: &[KeyValue]) -> Self {
        match key {
            [single] => VertexId::Scalar(single.clone()),
            parts => VertexId::Composite(parts.to_vec()),
        }
    }

    /// Number of components in this identifier.
    pub fn arity(&self) -> usize {
        match self {
            VertexId::Scalar(_) => 1,
            VertexId::Composite(parts) => parts.len(),
        }
    }

    /// Normalizes this identifier against the vertex column kinds.
    ///
    /// Fails with a validation error when the arity or any component kind does
    /// not match.
    pub fn normalize(&self, kinds: &[KeyKind]) -> Result<VertexKey> {
        let parts: &[KeyValue] = match self {
            VertexId::Scalar(value) => std::slice::from_ref(value),
            VertexId::Composite(parts) => parts,
        };
        if parts.len() != kinds.len() {
            return Err(StrataError::validation(format!(
                "vertex {self} has {} component(s), expected {}",
                parts.len(),
                kinds.len()
            )));
        }
        for (part, kind) in parts.iter().zip(kinds) {
            if part.kind() != *kind {
                return Err(StrataError::validation(format!(
                    "vertex {self} has a {} component where a {kind} is expected",
                    part.kind()
                )));
            }
        }
        Ok(parts.iter().cloned().collect())
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VertexId::Scalar(value) => write!(f, "{value}"),
            VertexId::Composite(parts) => {
                f.write_str("(")?;
                for (idx, part) in parts.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{part}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_normalizes_to_single_component() {
        let key = VertexId::from(7i64).normalize(&[KeyKind::Int]).unwrap();
        assert_eq!(key.as_slice(), &[KeyValue::Int(7)]);
    }

    #[test]
    fn composite_requires_matching_arity() {
        let id = VertexId::composite([1i64, 2]);
        assert!(id.normalize(&[KeyKind::Int, KeyKind::Int]).is_ok());
        let err = id.normalize(&[KeyKind::Int]).unwrap_err();
        assert!(matches!(err, StrataError::Validation(_)));
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let err = VertexId::from("a").normalize(&[KeyKind::Int]).unwrap_err();
        assert!(err.to_string().contains("string component"));
    }

    #[test]
    fn from_key_round_trips_shape() {
        let key: VertexKey = [KeyValue::from("x"), KeyValue::Int(3)].into_iter().collect();
        assert_eq!(
            VertexId::from_key(&key),
            VertexId::Composite(vec![KeyValue::from("x"), KeyValue::Int(3)])
        );
        assert_eq!(VertexId::from_key(&key[..1]), VertexId::from("x"));
    }

    #[test]
    fn parses_integers_before_strings() {
        assert_eq!("42".parse::<KeyValue>().unwrap(), KeyValue::Int(42));
        assert_eq!("n42".parse::<KeyValue>().unwrap(), KeyValue::from("n42"));
    }
}

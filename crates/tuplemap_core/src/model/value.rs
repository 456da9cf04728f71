//! Attribute values stored inside tuples.
//!
//! # Invariants
//! - `Value` is totally ordered so relations can sort and de-duplicate.
//! - `Value::Relation` payloads are kept sorted and free of duplicates.

use crate::model::tuple::Tuple;
use serde::{Deserialize, Serialize};

/// One attribute value of a raw tuple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Text(String),
    /// Nested tuple produced by `wrap`.
    Tuple(Tuple),
    /// Nested tuple set produced by `group`.
    Relation(Vec<Tuple>),
}

impl Value {
    /// Builds a relation-valued attribute, sorting and de-duplicating tuples.
    pub fn relation(tuples: impl IntoIterator<Item = Tuple>) -> Self {
        let mut tuples = tuples.into_iter().collect::<Vec<_>>();
        tuples.sort();
        tuples.dedup();
        Self::Relation(tuples)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Short stable name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Text(_) => "text",
            Self::Tuple(_) => "tuple",
            Self::Relation(_) => "relation",
        }
    }

    /// Converts into a JSON value; nested tuples become arrays.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(value) => serde_json::Value::Bool(*value),
            Self::Integer(value) => serde_json::Value::from(*value),
            Self::Text(value) => serde_json::Value::String(value.clone()),
            Self::Tuple(tuple) => tuple_to_json(tuple),
            Self::Relation(tuples) => {
                serde_json::Value::Array(tuples.iter().map(tuple_to_json).collect())
            }
        }
    }
}

fn tuple_to_json(tuple: &Tuple) -> serde_json::Value {
    serde_json::Value::Array(tuple.values().iter().map(Value::to_json).collect())
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Tuple> for Value {
    fn from(value: Tuple) -> Self {
        Self::Tuple(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::Value;
    use crate::tuple;

    #[test]
    fn values_order_by_variant_then_payload() {
        assert!(Value::Null < Value::Bool(false));
        assert!(Value::Integer(1) < Value::Integer(2));
        assert!(Value::Integer(99) < Value::Text("a".to_string()));
    }

    #[test]
    fn relation_constructor_sorts_and_dedups() {
        let value = Value::relation(vec![tuple![2], tuple![1], tuple![2]]);
        assert_eq!(value, Value::Relation(vec![tuple![1], tuple![2]]));
    }

    #[test]
    fn option_conversion_maps_none_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
    }

    #[test]
    fn accessors_match_only_their_variant() {
        assert!(Value::Null.is_null());
        assert!(!Value::from(0).is_null());
        assert_eq!(Value::from(7).as_i64(), Some(7));
        assert_eq!(Value::from("7").as_i64(), None);
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(1).as_bool(), None);
        assert_eq!(Value::from("John").as_str(), Some("John"));
    }

    #[test]
    fn nested_values_render_as_json_arrays() {
        let value = Value::Tuple(tuple![1, "John"]);
        assert_eq!(value.to_json(), serde_json::json!([1, "John"]));
    }
}

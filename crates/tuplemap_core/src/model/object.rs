//! Loaded domain objects produced by [`ObjectMapper`](crate::mapper::ObjectMapper).
//!
//! # Invariants
//! - Field names are unique; `with`/`set` replace an existing field in place.
//! - Field order follows the mapper attribute order on load, but equality
//!   ignores it: objects compare by model and name-keyed fields.
//! - Grouped collections compare as sets, matching relation-valued storage.

use crate::mapper::{MappingError, MappingResult};
use crate::model::value::Value;
use serde::de::DeserializeOwned;

/// One object field: a scalar, a wrapped object, or a grouped collection.
#[derive(Debug, Clone)]
pub enum Field {
    Value(Value),
    Object(Object),
    Objects(Vec<Object>),
}

impl Field {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Value(value) => value.to_json(),
            Self::Object(object) => object.to_json(),
            Self::Objects(objects) => {
                serde_json::Value::Array(objects.iter().map(Object::to_json).collect())
            }
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Object(_) => "object",
            Self::Objects(_) => "objects",
        }
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(left), Self::Value(right)) => left == right,
            (Self::Object(left), Self::Object(right)) => left == right,
            (Self::Objects(left), Self::Objects(right)) => same_members(left, right),
            _ => false,
        }
    }
}

impl Eq for Field {}

fn same_members(left: &[Object], right: &[Object]) -> bool {
    left.iter().all(|object| right.contains(object))
        && right.iter().all(|object| left.contains(object))
}

/// Domain object with a model name and named fields.
#[derive(Debug, Clone)]
pub struct Object {
    model: String,
    fields: Vec<(String, Field)>,
}

impl Object {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            fields: Vec::new(),
        }
    }

    /// Builder-style scalar setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, Field::Value(value.into()));
        self
    }

    /// Builder-style setter for nested fields.
    pub fn with_field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.set(name, field);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, field: Field) {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = field,
            None => self.fields.push((name, field)),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, field)| field)
    }

    /// Returns the scalar value of `name`, if the field is a scalar.
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.get(name) {
            Some(Field::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Renders the object as a JSON map keyed by field name.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .fields()
            .map(|(name, field)| (name.to_string(), field.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }

    /// Deserializes the object into a typed domain struct via its JSON form.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> MappingResult<T> {
        serde_json::from_value(self.to_json()).map_err(MappingError::Json)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        // Field names are unique, so equal counts plus one-way lookup suffice.
        self.model == other.model
            && self.fields.len() == other.fields.len()
            && self
                .fields()
                .all(|(name, field)| other.get(name) == Some(field))
    }
}

impl Eq for Object {}

//! Relation headers: ordered, uniquely named attribute descriptors.
//!
//! # Invariants
//! - Attribute names are unique within one header.
//! - Attribute order defines tuple value positions.

use crate::engine::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Shape of one attribute value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Scalar,
    /// Single nested tuple with the given header.
    Tuple(Header),
    /// Nested set of tuples with the given header.
    Relation(Header),
}

/// Named attribute descriptor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

impl Attribute {
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Scalar,
        }
    }

    pub fn tuple(name: impl Into<String>, header: Header) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Tuple(header),
        }
    }

    pub fn relation(name: impl Into<String>, header: Header) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Relation(header),
        }
    }
}

/// Ordered attribute list describing every tuple of a relation.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Header {
    attributes: Vec<Attribute>,
}

impl Header {
    /// Creates a header, rejecting duplicate attribute names.
    pub fn new(attributes: Vec<Attribute>) -> EngineResult<Self> {
        let mut seen = BTreeSet::new();
        for attribute in &attributes {
            if !seen.insert(attribute.name.as_str()) {
                return Err(EngineError::DuplicateAttribute(attribute.name.clone()));
            }
        }
        Ok(Self { attributes })
    }

    /// Wraps attributes whose names are already known to be unique.
    pub(crate) fn from_unique(attributes: Vec<Attribute>) -> Self {
        debug_assert!(Self::new(attributes.clone()).is_ok());
        Self { attributes }
    }

    /// Creates a header of scalar attributes.
    pub fn scalars<I, S>(names: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(Attribute::scalar).collect())
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .map(|attribute| attribute.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.attributes
            .iter()
            .position(|attribute| attribute.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Resolves `name` to its position or fails with `UnknownAttribute`.
    pub(crate) fn require(&self, name: &str) -> EngineResult<usize> {
        self.position(name)
            .ok_or_else(|| EngineError::UnknownAttribute(name.to_string()))
    }
}

//! Mapper contract and the default object mapper.
//!
//! # Responsibility
//! - Define `TupleMapper`: load/dump between raw tuples and domain objects.
//! - Mirror the relation vocabulary (project, rename, join, wrap, group) so
//!   mappers reshape in lockstep with relations.
//!
//! # Invariants
//! - `dump(load(t)) == t` for every well-formed tuple `t`.
//! - `header()` always describes the tuples `load` accepts and `dump` emits.
//! - Mapper equality is configuration equality, never identity.

use crate::model::header::Header;
use crate::model::tuple::Tuple;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod object_mapper;

pub use object_mapper::{MappedAttribute, ObjectMapper};

pub type MappingResult<T> = Result<T, MappingError>;

/// Errors raised while loading, dumping or reshaping a mapper.
#[derive(Debug)]
pub enum MappingError {
    ArityMismatch {
        expected: usize,
        actual: usize,
    },
    /// Object lacks a field the mapper models.
    MissingField(String),
    /// Tuple value does not match the attribute kind.
    UnexpectedValue {
        attribute: String,
        found: &'static str,
    },
    /// Object field does not match the attribute kind.
    UnexpectedField {
        attribute: String,
        found: &'static str,
    },
    UnknownAttribute(String),
    DuplicateAttribute(String),
    Json(serde_json::Error),
}

impl Display for MappingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArityMismatch { expected, actual } => write!(
                f,
                "mapper expects {expected} tuple values, got {actual}"
            ),
            Self::MissingField(name) => write!(f, "object is missing field `{name}`"),
            Self::UnexpectedValue { attribute, found } => {
                write!(f, "attribute `{attribute}` cannot load a {found} value")
            }
            Self::UnexpectedField { attribute, found } => {
                write!(f, "attribute `{attribute}` cannot dump a {found} field")
            }
            Self::UnknownAttribute(name) => write!(f, "mapper has no attribute `{name}`"),
            Self::DuplicateAttribute(name) => {
                write!(f, "mapper attribute `{name}` is defined twice")
            }
            Self::Json(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MappingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for MappingError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Load/dump strategy paired with a relation.
///
/// Structural transforms return a new mapper whose `header()` matches the
/// header of the relation transformed the same way.
pub trait TupleMapper: Clone + PartialEq {
    type Object;

    fn header(&self) -> Header;

    fn load(&self, tuple: &Tuple) -> MappingResult<Self::Object>;
    fn dump(&self, object: &Self::Object) -> MappingResult<Tuple>;

    fn project(&self, names: &[&str]) -> MappingResult<Self>;
    fn rename(&self, renames: &[(&str, &str)]) -> MappingResult<Self>;
    fn join(&self, other: &Self) -> MappingResult<Self>;
    fn wrap(&self, wraps: &[(String, Self)]) -> MappingResult<Self>;
    fn group(&self, groups: &[(String, Self)]) -> MappingResult<Self>;
}

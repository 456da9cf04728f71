//! Relational-algebra engine contract and the in-memory engine.
//!
//! # Responsibility
//! - Define `RelationAlgebra`, the capability set the mapping layer consumes.
//! - Provide `MemoryRelation`, a set-semantics engine for in-process use.
//!
//! # Invariants
//! - Every operation returns a new relation value; inputs are never mutated.
//! - Header and tuple shape stay consistent after any transform.
//! - Positional operations (`take`/`first`/`last`/`drop`) require an ordered
//!   relation.

use crate::model::header::Header;
use crate::model::tuple::{Tuple, TupleRef};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;

pub use memory::MemoryRelation;

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by relation engines.
#[derive(Debug)]
pub enum EngineError {
    UnknownAttribute(String),
    DuplicateAttribute(String),
    ArityMismatch {
        expected: usize,
        actual: usize,
    },
    /// A join attribute has different kinds on both sides.
    IncompatibleHeader(String),
    /// Positional operation on a relation without a defined order.
    Unordered {
        operation: &'static str,
    },
    /// Failure from a foreign engine implementation.
    Other(Box<dyn Error + Send + Sync>),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownAttribute(name) => write!(f, "unknown attribute `{name}`"),
            Self::DuplicateAttribute(name) => write!(f, "duplicate attribute `{name}`"),
            Self::ArityMismatch { expected, actual } => write!(
                f,
                "tuple arity mismatch: header has {expected} attributes, tuple has {actual}"
            ),
            Self::IncompatibleHeader(name) => {
                write!(f, "join attribute `{name}` has incompatible kinds")
            }
            Self::Unordered { operation } => {
                write!(f, "`{operation}` requires a sorted relation")
            }
            Self::Other(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Other(err) => {
                let source: &(dyn Error + 'static) = err.as_ref();
                Some(source)
            }
            _ => None,
        }
    }
}

/// Sort direction for one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Ascending,
    Descending,
}

/// One attribute of a sort specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub attribute: String,
    pub direction: Direction,
}

impl SortKey {
    pub fn asc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            direction: Direction::Descending,
        }
    }
}

/// Capability set of an underlying relation engine.
///
/// Implementations are values: every operation returns a new relation and
/// leaves `self` untouched.
pub trait RelationAlgebra: Clone {
    fn header(&self) -> &Header;

    /// Enumerates raw tuples in the relation's current order.
    fn tuples(&self) -> Box<dyn Iterator<Item = Tuple> + '_>;

    fn insert(&self, tuples: Vec<Tuple>) -> EngineResult<Self>;
    fn delete(&self, tuples: Vec<Tuple>) -> EngineResult<Self>;
    /// Replaces the whole tuple set.
    fn replace(&self, tuples: Vec<Tuple>) -> EngineResult<Self>;

    fn restrict<P>(&self, predicate: P) -> EngineResult<Self>
    where
        P: Fn(TupleRef<'_>) -> bool;

    /// Sorts ascending by every header attribute, in header order.
    fn sort(&self) -> EngineResult<Self>;
    fn sort_by(&self, keys: &[SortKey]) -> EngineResult<Self>;

    fn take(&self, limit: usize) -> EngineResult<Self>;
    fn first(&self, limit: usize) -> EngineResult<Self>;
    fn last(&self, limit: usize) -> EngineResult<Self>;
    fn drop(&self, offset: usize) -> EngineResult<Self>;

    /// Natural join on shared attribute names.
    fn join(&self, other: &Self) -> EngineResult<Self>;
    /// Nests the attributes of each header under the paired name.
    fn wrap(&self, wraps: &[(String, Header)]) -> EngineResult<Self>;
    /// Collects the attributes of each header into a nested tuple set.
    fn group(&self, groups: &[(String, Header)]) -> EngineResult<Self>;
    fn project(&self, names: &[&str]) -> EngineResult<Self>;
    fn rename(&self, renames: &[(&str, &str)]) -> EngineResult<Self>;
}

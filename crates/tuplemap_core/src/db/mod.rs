//! SQLite adapter: connection bootstrap and table/relation transfer.
//!
//! # Responsibility
//! - Open and configure SQLite connections.
//! - Load a table into a `MemoryRelation` and store a relation back.
//!
//! # Invariants
//! - Only scalar attributes cross the SQLite boundary.
//! - Table and column names are plain identifiers; nothing else is
//!   interpolated into SQL text.

use crate::engine::EngineError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
mod table;

pub use open::{open_db, open_db_in_memory};
pub use table::{load_relation, store_relation};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    InvalidIdentifier(String),
    /// Header with no attributes; SQLite has no zero-column select or insert.
    EmptyHeader,
    /// Header attribute with a nested kind.
    UnsupportedAttribute(String),
    /// Value that has no SQLite column representation.
    UnsupportedValue {
        attribute: String,
        kind: &'static str,
    },
    Engine(EngineError),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidIdentifier(name) => write!(f, "invalid SQL identifier `{name}`"),
            Self::EmptyHeader => write!(f, "relation header has no attributes to map to columns"),
            Self::UnsupportedAttribute(name) => {
                write!(f, "attribute `{name}` is nested and cannot map to a column")
            }
            Self::UnsupportedValue { attribute, kind } => {
                write!(f, "column `{attribute}` cannot store a {kind} value")
            }
            Self::Engine(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Engine(err) => Some(err),
            Self::InvalidIdentifier(_)
            | Self::EmptyHeader
            | Self::UnsupportedAttribute(_)
            | Self::UnsupportedValue { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<EngineError> for DbError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

//! Object-relational mapping core for tuplemap.
//!
//! Wraps a relational-algebra engine with a load/dump mapper so relations
//! can be reshaped, written and read as domain objects.

pub mod db;
pub mod engine;
pub mod logging;
pub mod mapper;
pub mod model;
pub mod reader;
pub mod relation;

pub use engine::{Direction, EngineError, EngineResult, MemoryRelation, RelationAlgebra, SortKey};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use mapper::{MappedAttribute, MappingError, MappingResult, ObjectMapper, TupleMapper};
pub use model::header::{Attribute, AttributeKind, Header};
pub use model::object::{Field, Object};
pub use model::tuple::{Tuple, TupleRef};
pub use model::value::Value;
pub use reader::{BatchReader, LoadReader, ObjectStream, Reader};
pub use relation::{Loaded, MappedRelation, Objects, RelationError, RelationResult};

/// Minimal health-check API for integration probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

//! Value model shared by the relation engine, mappers and readers.
//!
//! # Responsibility
//! - Define raw tuple storage types (`Value`, `Tuple`, `Header`).
//! - Define the loaded object shape produced by the default mapper.
//!
//! # Invariants
//! - Every tuple of a relation has exactly one value per header attribute.
//! - Values are totally ordered; sorting a relation is always possible.

pub mod header;
pub mod object;
pub mod tuple;
pub mod value;

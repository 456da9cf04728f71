//! Mapped relation: an object-level view over a raw relation.
//!
//! # Responsibility
//! - Pair a `RelationAlgebra` value with a `TupleMapper` and a `Reader`.
//! - Apply every structural transform to relation and mapper in lockstep.
//! - Provide cardinality helpers (`one`) and deterministic positional access.
//!
//! # Invariants
//! - Wrappers are immutable; every operation returns a fresh wrapper.
//! - `mapper.header()` describes the tuples of `relation` after any transform
//!   performed through this type.
//! - Positional operations always run on the full-header-sorted relation.
//! - Equality compares mappers only; tuple content is ignored.

use crate::engine::{EngineError, RelationAlgebra, SortKey};
use crate::mapper::{MappingError, TupleMapper};
use crate::model::header::Header;
use crate::model::tuple::{Tuple, TupleRef};
use crate::reader::{LoadReader, ObjectStream, Reader};
use log::debug;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

pub type RelationResult<T> = Result<T, RelationError>;

/// Errors surfaced by mapped relation operations.
///
/// Engine and mapping failures are carried unmodified.
#[derive(Debug)]
pub enum RelationError {
    /// `one` found no tuples and no fallback was given.
    NoTuples,
    /// `one` found more than one tuple.
    ManyTuples,
    Engine(EngineError),
    Mapping(MappingError),
}

impl Display for RelationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoTuples => write!(f, "expected exactly one tuple, found none"),
            Self::ManyTuples => write!(f, "expected exactly one tuple, found more"),
            Self::Engine(err) => write!(f, "{err}"),
            Self::Mapping(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RelationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NoTuples | Self::ManyTuples => None,
            Self::Engine(err) => Some(err),
            Self::Mapping(err) => Some(err),
        }
    }
}

impl From<EngineError> for RelationError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<MappingError> for RelationError {
    fn from(value: MappingError) -> Self {
        Self::Mapping(value)
    }
}

type SharedReader<M> = Arc<dyn Reader<M> + Send + Sync>;

/// Relation paired with the mapper that loads and dumps its tuples.
pub struct MappedRelation<R, M: TupleMapper> {
    relation: R,
    mapper: M,
    reader: SharedReader<M>,
}

impl<R: Clone, M: TupleMapper> Clone for MappedRelation<R, M> {
    fn clone(&self) -> Self {
        Self {
            relation: self.relation.clone(),
            mapper: self.mapper.clone(),
            reader: Arc::clone(&self.reader),
        }
    }
}

impl<R: Debug, M: TupleMapper + Debug> Debug for MappedRelation<R, M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedRelation")
            .field("relation", &self.relation)
            .field("mapper", &self.mapper)
            .finish_non_exhaustive()
    }
}

/// Two mapped relations are equal when their mappers are equal.
///
/// The wrapper is a view: equality tracks mapping semantics, not tuple content.
impl<R, M: TupleMapper> PartialEq for MappedRelation<R, M> {
    fn eq(&self, other: &Self) -> bool {
        self.mapper == other.mapper
    }
}

impl<R, M> MappedRelation<R, M>
where
    R: RelationAlgebra,
    M: TupleMapper,
{
    /// Pairs a raw relation with a mapper using the default [`LoadReader`].
    pub fn new(relation: R, mapper: M) -> Self {
        Self {
            relation,
            mapper,
            reader: Arc::new(LoadReader),
        }
    }

    /// Fresh wrapper keeping this wrapper's reader.
    fn derive(&self, relation: R, mapper: M) -> Self {
        Self {
            relation,
            mapper,
            reader: Arc::clone(&self.reader),
        }
    }

    fn with_relation(&self, relation: R) -> Self {
        self.derive(relation, self.mapper.clone())
    }

    pub fn relation(&self) -> &R {
        &self.relation
    }

    pub fn into_relation(self) -> R {
        self.relation
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    pub fn header(&self) -> &Header {
        self.relation.header()
    }

    /// Lazy, restartable sequence of loaded objects.
    pub fn iter(&self) -> Objects<'_, R, M> {
        Objects { source: self }
    }

    /// Pushes every loaded object to `visitor` through the configured reader.
    pub fn each<F>(&self, mut visitor: F) -> RelationResult<&Self>
    where
        F: FnMut(M::Object),
    {
        let mut tuples = self.relation.tuples();
        self.reader.call(&mut tuples, &self.mapper, &mut visitor)?;
        Ok(self)
    }

    /// Materializes every loaded object through the configured reader.
    pub fn to_vec(&self) -> RelationResult<Vec<M::Object>> {
        let mut objects = Vec::new();
        self.each(|object| objects.push(object))?;
        Ok(objects)
    }

    pub fn insert(&self, object: &M::Object) -> RelationResult<Self> {
        let tuple = self.mapper.dump(object)?;
        Ok(self.with_relation(self.relation.insert(vec![tuple])?))
    }

    /// Replaces the tuple of `original` with the tuple of `object`.
    ///
    /// A missing `original` turns the delete half into a no-op.
    pub fn update(&self, object: &M::Object, original: &M::Object) -> RelationResult<Self> {
        let stale = self.mapper.dump(original)?;
        let fresh = self.mapper.dump(object)?;
        let relation = self.relation.delete(vec![stale])?.insert(vec![fresh])?;
        Ok(self.with_relation(relation))
    }

    pub fn delete(&self, object: &M::Object) -> RelationResult<Self> {
        let tuple = self.mapper.dump(object)?;
        Ok(self.with_relation(self.relation.delete(vec![tuple])?))
    }

    /// Replaces the whole tuple set with the dumped `objects`, in order.
    pub fn replace(&self, objects: &[M::Object]) -> RelationResult<Self> {
        let tuples = objects
            .iter()
            .map(|object| self.mapper.dump(object))
            .collect::<Result<Vec<Tuple>, _>>()?;
        Ok(self.with_relation(self.relation.replace(tuples)?))
    }

    pub fn restrict<P>(&self, predicate: P) -> RelationResult<Self>
    where
        P: Fn(TupleRef<'_>) -> bool,
    {
        Ok(self.with_relation(self.relation.restrict(predicate)?))
    }

    pub fn sort(&self) -> RelationResult<Self> {
        Ok(self.with_relation(self.relation.sort()?))
    }

    pub fn sort_by(&self, keys: &[SortKey]) -> RelationResult<Self> {
        Ok(self.with_relation(self.relation.sort_by(keys)?))
    }

    pub fn project(&self, names: &[&str]) -> RelationResult<Self> {
        let relation = self.relation.project(names)?;
        let mapper = self.mapper.project(names)?;
        Ok(self.derive(relation, mapper))
    }

    pub fn rename(&self, renames: &[(&str, &str)]) -> RelationResult<Self> {
        let relation = self.relation.rename(renames)?;
        let mapper = self.mapper.rename(renames)?;
        Ok(self.derive(relation, mapper))
    }

    /// Natural join of both relations, with a mapper for the joined shape.
    pub fn join(&self, other: &Self) -> RelationResult<Self> {
        let relation = self.relation.join(&other.relation)?;
        let mapper = self.mapper.join(&other.mapper)?;
        Ok(self.derive(relation, mapper))
    }

    /// Nests the attributes of each named relation as one sub-object.
    pub fn wrap(&self, others: &[(&str, &Self)]) -> RelationResult<Self> {
        let (headers, mappers) = split_nested(others);
        let relation = self.relation.wrap(&headers)?;
        let mapper = self.mapper.wrap(&mappers)?;
        Ok(self.derive(relation, mapper))
    }

    /// Collects the attributes of each named relation into a sub-collection.
    pub fn group(&self, others: &[(&str, &Self)]) -> RelationResult<Self> {
        let (headers, mappers) = split_nested(others);
        let relation = self.relation.group(&headers)?;
        let mapper = self.mapper.group(&mappers)?;
        Ok(self.derive(relation, mapper))
    }

    pub fn take(&self, limit: usize) -> RelationResult<Self> {
        Ok(self.with_relation(self.relation.sort()?.take(limit)?))
    }

    pub fn first(&self, limit: usize) -> RelationResult<Self> {
        Ok(self.with_relation(self.relation.sort()?.first(limit)?))
    }

    pub fn last(&self, limit: usize) -> RelationResult<Self> {
        Ok(self.with_relation(self.relation.sort()?.last(limit)?))
    }

    pub fn drop(&self, offset: usize) -> RelationResult<Self> {
        Ok(self.with_relation(self.relation.sort()?.drop(offset)?))
    }

    /// Returns the only object of this relation.
    ///
    /// # Errors
    /// - `NoTuples` when the relation is empty.
    /// - `ManyTuples` when it holds more than one tuple.
    pub fn one(&self) -> RelationResult<M::Object> {
        self.one_with(|| Err(RelationError::NoTuples))
    }

    /// Like [`one`](Self::one), but an empty relation yields `on_empty()`.
    pub fn one_or_else<F>(&self, on_empty: F) -> RelationResult<M::Object>
    where
        F: FnOnce() -> M::Object,
    {
        self.one_with(|| Ok(on_empty()))
    }

    fn one_with<F>(&self, on_empty: F) -> RelationResult<M::Object>
    where
        F: FnOnce() -> RelationResult<M::Object>,
    {
        // At most two tuples are enough to decide cardinality.
        let mut objects = self.take(2)?.to_vec()?;
        match objects.len() {
            0 => {
                debug!("event=relation_one module=relation status=empty");
                on_empty()
            }
            1 => Ok(objects.remove(0)),
            count => {
                debug!(
                    "event=relation_one module=relation status=error error_code=many_tuples count_at_least={}",
                    count
                );
                Err(RelationError::ManyTuples)
            }
        }
    }

    /// Same relation and mapper, different materialization strategy.
    pub fn inject_reader<D>(&self, reader: D) -> Self
    where
        D: Reader<M> + Send + Sync + 'static,
    {
        Self {
            relation: self.relation.clone(),
            mapper: self.mapper.clone(),
            reader: Arc::new(reader),
        }
    }
}

type NestedParts<M> = (Vec<(String, Header)>, Vec<(String, M)>);

fn split_nested<R, M>(others: &[(&str, &MappedRelation<R, M>)]) -> NestedParts<M>
where
    R: RelationAlgebra,
    M: TupleMapper,
{
    others
        .iter()
        .map(|(name, other)| {
            (
                (name.to_string(), other.relation.header().clone()),
                (name.to_string(), other.mapper.clone()),
            )
        })
        .unzip()
}

/// Restartable lazy view over the objects of a [`MappedRelation`].
///
/// Each call to [`iter`](Objects::iter) starts a new pass over the relation
/// through the wrapper's reader.
pub struct Objects<'a, R, M: TupleMapper> {
    source: &'a MappedRelation<R, M>,
}

impl<'a, R, M> Objects<'a, R, M>
where
    R: RelationAlgebra,
    M: TupleMapper,
{
    pub fn iter(&self) -> Loaded<'a, M> {
        let source = self.source;
        Loaded {
            objects: source
                .reader
                .read(source.relation.tuples(), &source.mapper),
        }
    }
}

impl<'a, R, M> IntoIterator for Objects<'a, R, M>
where
    R: RelationAlgebra,
    M: TupleMapper,
{
    type Item = Result<M::Object, MappingError>;
    type IntoIter = Loaded<'a, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, R, M> IntoIterator for &'a MappedRelation<R, M>
where
    R: RelationAlgebra,
    M: TupleMapper,
{
    type Item = Result<M::Object, MappingError>;
    type IntoIter = Loaded<'a, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter().iter()
    }
}

/// Iterator over objects produced by the wrapper's reader.
pub struct Loaded<'a, M: TupleMapper> {
    objects: ObjectStream<'a, M::Object>,
}

impl<M: TupleMapper> Iterator for Loaded<'_, M> {
    type Item = Result<M::Object, MappingError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.objects.next()
    }
}

//! Reader strategies turning raw tuple streams into loaded objects.
//!
//! # Responsibility
//! - Bridge relation enumeration and `TupleMapper::load`.
//! - Allow alternative materialization strategies behind one contract,
//!   for both pull (`read`) and push (`call`) iteration.
//!
//! # Invariants
//! - Objects are produced in tuple enumeration order.
//! - Mapper errors propagate unchanged and stop the read.

use crate::mapper::{MappingResult, TupleMapper};
use crate::model::tuple::Tuple;
use log::debug;
use std::vec;

/// Lazy stream of loaded objects borrowing the tuples and mapper.
pub type ObjectStream<'a, O> = Box<dyn Iterator<Item = MappingResult<O>> + 'a>;

/// Materialization strategy used by [`MappedRelation`](crate::MappedRelation)
/// iteration.
pub trait Reader<M: TupleMapper> {
    /// Pull mode: wraps `tuples` in a lazy stream of loaded objects.
    fn read<'a>(
        &self,
        tuples: Box<dyn Iterator<Item = Tuple> + 'a>,
        mapper: &'a M,
    ) -> ObjectStream<'a, M::Object>
    where
        M: 'a;

    /// Push mode: feeds every loaded object to `visitor`, stopping at the
    /// first mapping error.
    fn call(
        &self,
        tuples: &mut dyn Iterator<Item = Tuple>,
        mapper: &M,
        visitor: &mut dyn FnMut(M::Object),
    ) -> MappingResult<()> {
        for object in self.read(Box::new(tuples), mapper) {
            visitor(object?);
        }
        Ok(())
    }
}

/// Default reader: loads one tuple per pull.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadReader;

impl<M: TupleMapper> Reader<M> for LoadReader {
    fn read<'a>(
        &self,
        tuples: Box<dyn Iterator<Item = Tuple> + 'a>,
        mapper: &'a M,
    ) -> ObjectStream<'a, M::Object>
    where
        M: 'a,
    {
        Box::new(tuples.map(move |tuple| mapper.load(&tuple)))
    }
}

/// Loads tuples in fixed-size batches before handing them out.
///
/// A batch that fails to load is not partially delivered.
#[derive(Debug, Clone, Copy)]
pub struct BatchReader {
    batch_size: usize,
}

impl BatchReader {
    /// `batch_size` of zero is treated as one.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl<M: TupleMapper> Reader<M> for BatchReader {
    fn read<'a>(
        &self,
        tuples: Box<dyn Iterator<Item = Tuple> + 'a>,
        mapper: &'a M,
    ) -> ObjectStream<'a, M::Object>
    where
        M: 'a,
    {
        Box::new(Batches {
            tuples,
            mapper,
            batch_size: self.batch_size,
            batch_index: 0,
            pending: Vec::new().into_iter(),
            failed: false,
        })
    }
}

/// Pulls the next batch only once the previous one is drained.
struct Batches<'a, M: TupleMapper> {
    tuples: Box<dyn Iterator<Item = Tuple> + 'a>,
    mapper: &'a M,
    batch_size: usize,
    batch_index: usize,
    pending: vec::IntoIter<M::Object>,
    failed: bool,
}

impl<M: TupleMapper> Iterator for Batches<'_, M> {
    type Item = MappingResult<M::Object>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(object) = self.pending.next() {
            return Some(Ok(object));
        }
        if self.failed {
            return None;
        }

        let batch = self
            .tuples
            .by_ref()
            .take(self.batch_size)
            .collect::<Vec<_>>();
        if batch.is_empty() {
            return None;
        }

        let mapper = self.mapper;
        match batch
            .iter()
            .map(|tuple| mapper.load(tuple))
            .collect::<MappingResult<Vec<_>>>()
        {
            Ok(loaded) => {
                debug!(
                    "event=reader_batch module=reader status=ok batch_index={} batch_len={}",
                    self.batch_index,
                    loaded.len()
                );
                self.batch_index += 1;
                self.pending = loaded.into_iter();
                self.pending.next().map(Ok)
            }
            Err(err) => {
                debug!(
                    "event=reader_batch module=reader status=error batch_index={} error={}",
                    self.batch_index, err
                );
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

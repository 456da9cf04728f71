//! In-memory relation engine with set semantics.
//!
//! # Invariants
//! - Tuples are unique; construction and writes drop duplicates, keeping
//!   first-occurrence order.
//! - A relation is ordered only after `sort`/`sort_by`; writes on an ordered
//!   relation re-sort with the same keys.
//! - `join`, `wrap`, `group`, `project` and `rename` return unordered results.

use crate::engine::{Direction, EngineError, EngineResult, RelationAlgebra, SortKey};
use crate::model::header::{Attribute, Header};
use crate::model::tuple::{Tuple, TupleRef};
use crate::model::value::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Immutable relation value backed by a shared tuple vector.
#[derive(Debug, Clone)]
pub struct MemoryRelation {
    header: Header,
    tuples: Arc<Vec<Tuple>>,
    order: Option<Vec<SortKey>>,
}

impl MemoryRelation {
    /// Creates an unordered relation, validating tuple arity.
    pub fn new(header: Header, tuples: Vec<Tuple>) -> EngineResult<Self> {
        check_arity(&header, &tuples)?;
        Ok(Self::from_parts(header, dedup(tuples), None))
    }

    pub fn empty(header: Header) -> Self {
        Self::from_parts(header, Vec::new(), None)
    }

    fn from_parts(header: Header, tuples: Vec<Tuple>, order: Option<Vec<SortKey>>) -> Self {
        Self {
            header,
            tuples: Arc::new(tuples),
            order,
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.order.is_some()
    }

    /// Sort keys of an ordered relation.
    pub fn order(&self) -> Option<&[SortKey]> {
        self.order.as_deref()
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Raw tuples in current order.
    pub fn to_vec(&self) -> Vec<Tuple> {
        self.tuples.as_ref().clone()
    }

    /// Same header and order, new tuple set.
    fn with_tuples(&self, tuples: Vec<Tuple>) -> EngineResult<Self> {
        let tuples = match &self.order {
            Some(keys) => sort_tuples(&self.header, keys, tuples)?,
            None => tuples,
        };
        Ok(Self::from_parts(
            self.header.clone(),
            tuples,
            self.order.clone(),
        ))
    }

    /// Same header and order, positional slice of the tuples.
    fn slice(&self, operation: &'static str, start: usize, end: usize) -> EngineResult<Self> {
        if self.order.is_none() {
            return Err(EngineError::Unordered { operation });
        }
        Ok(Self::from_parts(
            self.header.clone(),
            self.tuples[start..end].to_vec(),
            self.order.clone(),
        ))
    }
}

impl PartialEq for MemoryRelation {
    /// Relations are equal when headers match and they hold the same tuple set.
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header
            && self.tuples.iter().collect::<BTreeSet<_>>()
                == other.tuples.iter().collect::<BTreeSet<_>>()
    }
}

impl RelationAlgebra for MemoryRelation {
    fn header(&self) -> &Header {
        &self.header
    }

    fn tuples(&self) -> Box<dyn Iterator<Item = Tuple> + '_> {
        Box::new(self.tuples.iter().cloned())
    }

    fn insert(&self, tuples: Vec<Tuple>) -> EngineResult<Self> {
        check_arity(&self.header, &tuples)?;
        let mut merged = self.to_vec();
        merged.extend(tuples);
        self.with_tuples(dedup(merged))
    }

    fn delete(&self, tuples: Vec<Tuple>) -> EngineResult<Self> {
        check_arity(&self.header, &tuples)?;
        let doomed = tuples.into_iter().collect::<BTreeSet<_>>();
        let kept = self
            .tuples
            .iter()
            .filter(|tuple| !doomed.contains(*tuple))
            .cloned()
            .collect();
        self.with_tuples(kept)
    }

    fn replace(&self, tuples: Vec<Tuple>) -> EngineResult<Self> {
        check_arity(&self.header, &tuples)?;
        self.with_tuples(dedup(tuples))
    }

    fn restrict<P>(&self, predicate: P) -> EngineResult<Self>
    where
        P: Fn(TupleRef<'_>) -> bool,
    {
        let kept = self
            .tuples
            .iter()
            .filter(|tuple| predicate(TupleRef::new(&self.header, tuple)))
            .cloned()
            .collect();
        Ok(Self::from_parts(
            self.header.clone(),
            kept,
            self.order.clone(),
        ))
    }

    fn sort(&self) -> EngineResult<Self> {
        let keys = self.header.names().map(SortKey::asc).collect::<Vec<_>>();
        self.sort_by(&keys)
    }

    fn sort_by(&self, keys: &[SortKey]) -> EngineResult<Self> {
        let tuples = sort_tuples(&self.header, keys, self.to_vec())?;
        Ok(Self::from_parts(
            self.header.clone(),
            tuples,
            Some(keys.to_vec()),
        ))
    }

    fn take(&self, limit: usize) -> EngineResult<Self> {
        self.slice("take", 0, limit.min(self.len()))
    }

    fn first(&self, limit: usize) -> EngineResult<Self> {
        self.slice("first", 0, limit.min(self.len()))
    }

    fn last(&self, limit: usize) -> EngineResult<Self> {
        let len = self.len();
        self.slice("last", len - limit.min(len), len)
    }

    fn drop(&self, offset: usize) -> EngineResult<Self> {
        let len = self.len();
        self.slice("drop", offset.min(len), len)
    }

    fn join(&self, other: &Self) -> EngineResult<Self> {
        let mut attributes = self.header.attributes().to_vec();
        let mut left_key = Vec::new();
        let mut right_key = Vec::new();
        let mut right_only = Vec::new();

        for (right_position, attribute) in other.header.attributes().iter().enumerate() {
            match self.header.position(&attribute.name) {
                Some(left_position) => {
                    if self.header.attributes()[left_position].kind != attribute.kind {
                        return Err(EngineError::IncompatibleHeader(attribute.name.clone()));
                    }
                    left_key.push(left_position);
                    right_key.push(right_position);
                }
                None => {
                    right_only.push(right_position);
                    attributes.push(attribute.clone());
                }
            }
        }
        let header = Header::new(attributes)?;

        let mut index: BTreeMap<Vec<Value>, Vec<&Tuple>> = BTreeMap::new();
        for tuple in other.tuples.iter() {
            index.entry(tuple.pick(&right_key)).or_default().push(tuple);
        }

        let mut joined = Vec::new();
        for left in self.tuples.iter() {
            let Some(matches) = index.get(&left.pick(&left_key)) else {
                continue;
            };
            for right in matches {
                let mut values = left.values().to_vec();
                values.extend(right.pick(&right_only));
                joined.push(Tuple::new(values));
            }
        }

        Ok(Self::from_parts(header, dedup(joined), None))
    }

    fn wrap(&self, wraps: &[(String, Header)]) -> EngineResult<Self> {
        let mut header = self.header.clone();
        let mut tuples = self.to_vec();
        for (name, nested) in wraps {
            let split = split_header(&header, name, nested)?;
            header = split.outer_header(Attribute::tuple(name.as_str(), split.nested.clone()))?;
            tuples = tuples
                .iter()
                .map(|tuple| {
                    let mut values = tuple.pick(&split.outer_positions);
                    values.push(Value::Tuple(Tuple::new(
                        tuple.pick(&split.nested_positions),
                    )));
                    Tuple::new(values)
                })
                .collect();
        }
        Ok(Self::from_parts(header, dedup(tuples), None))
    }

    fn group(&self, groups: &[(String, Header)]) -> EngineResult<Self> {
        let mut header = self.header.clone();
        let mut tuples = self.to_vec();
        for (name, nested) in groups {
            let split = split_header(&header, name, nested)?;
            header =
                split.outer_header(Attribute::relation(name.as_str(), split.nested.clone()))?;

            let mut slots: BTreeMap<Vec<Value>, usize> = BTreeMap::new();
            let mut grouped: Vec<(Vec<Value>, Vec<Tuple>)> = Vec::new();
            for tuple in &tuples {
                let key = tuple.pick(&split.outer_positions);
                let member = Tuple::new(tuple.pick(&split.nested_positions));
                match slots.get(&key) {
                    Some(&slot) => grouped[slot].1.push(member),
                    None => {
                        slots.insert(key.clone(), grouped.len());
                        grouped.push((key, vec![member]));
                    }
                }
            }

            tuples = grouped
                .into_iter()
                .map(|(mut values, members)| {
                    values.push(Value::relation(members));
                    Tuple::new(values)
                })
                .collect();
        }
        Ok(Self::from_parts(header, tuples, None))
    }

    fn project(&self, names: &[&str]) -> EngineResult<Self> {
        let positions = names
            .iter()
            .map(|name| self.header.require(name))
            .collect::<EngineResult<Vec<_>>>()?;
        let header = Header::new(
            positions
                .iter()
                .map(|&position| self.header.attributes()[position].clone())
                .collect(),
        )?;
        let tuples = self
            .tuples
            .iter()
            .map(|tuple| Tuple::new(tuple.pick(&positions)))
            .collect();
        Ok(Self::from_parts(header, dedup(tuples), None))
    }

    fn rename(&self, renames: &[(&str, &str)]) -> EngineResult<Self> {
        for (from, _) in renames {
            self.header.require(from)?;
        }
        let attributes = self
            .header
            .attributes()
            .iter()
            .map(|attribute| {
                let name = renames
                    .iter()
                    .find(|(from, _)| *from == attribute.name)
                    .map_or(attribute.name.as_str(), |(_, to)| *to);
                Attribute {
                    name: name.to_string(),
                    kind: attribute.kind.clone(),
                }
            })
            .collect();
        Ok(Self {
            header: Header::new(attributes)?,
            tuples: Arc::clone(&self.tuples),
            order: None,
        })
    }
}

/// Attribute positions of one `wrap`/`group` step.
struct HeaderSplit {
    nested: Header,
    nested_positions: Vec<usize>,
    outer_positions: Vec<usize>,
    outer_attributes: Vec<Attribute>,
}

impl HeaderSplit {
    fn outer_header(&self, appended: Attribute) -> EngineResult<Header> {
        let mut attributes = self.outer_attributes.clone();
        attributes.push(appended);
        Header::new(attributes)
    }
}

fn split_header(header: &Header, name: &str, nested: &Header) -> EngineResult<HeaderSplit> {
    let nested_positions = nested
        .names()
        .map(|nested_name| header.require(nested_name))
        .collect::<EngineResult<Vec<_>>>()?;
    let outer_positions = (0..header.len())
        .filter(|position| !nested_positions.contains(position))
        .collect::<Vec<_>>();
    let outer_attributes = outer_positions
        .iter()
        .map(|&position| header.attributes()[position].clone())
        .collect::<Vec<_>>();
    // Kinds come from this relation, not from the caller's header.
    let nested = Header::new(
        nested_positions
            .iter()
            .map(|&position| header.attributes()[position].clone())
            .collect(),
    )?;

    Ok(HeaderSplit {
        nested,
        nested_positions,
        outer_positions,
        outer_attributes,
    })
}

fn sort_tuples(
    header: &Header,
    keys: &[SortKey],
    mut tuples: Vec<Tuple>,
) -> EngineResult<Vec<Tuple>> {
    let resolved = keys
        .iter()
        .map(|key| {
            header
                .require(&key.attribute)
                .map(|position| (position, key.direction))
        })
        .collect::<EngineResult<Vec<_>>>()?;

    tuples.sort_by(|left, right| {
        for &(position, direction) in &resolved {
            let ordering = left.values()[position].cmp(&right.values()[position]);
            let ordering = match direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        left.cmp(right)
    });
    Ok(tuples)
}

fn check_arity(header: &Header, tuples: &[Tuple]) -> EngineResult<()> {
    match tuples.iter().find(|tuple| tuple.len() != header.len()) {
        Some(tuple) => Err(EngineError::ArityMismatch {
            expected: header.len(),
            actual: tuple.len(),
        }),
        None => Ok(()),
    }
}

fn dedup(tuples: Vec<Tuple>) -> Vec<Tuple> {
    let mut seen = BTreeSet::new();
    tuples
        .into_iter()
        .filter(|tuple| seen.insert(tuple.clone()))
        .collect()
}

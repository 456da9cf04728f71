//! Raw tuples and borrowed header-aware tuple views.

use crate::model::header::Header;
use crate::model::value::Value;
use serde::{Deserialize, Serialize};

/// Ordered attribute values aligned with a relation header.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tuple {
    values: Vec<Value>,
}

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Picks values at `positions`, in the order given.
    pub(crate) fn pick(&self, positions: &[usize]) -> Vec<Value> {
        positions
            .iter()
            .map(|&position| self.values[position].clone())
            .collect()
    }
}

impl From<Vec<Value>> for Tuple {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl FromIterator<Value> for Tuple {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Builds a [`Tuple`] from values convertible into [`Value`].
///
/// ```
/// use tuplemap_core::{tuple, Value};
///
/// let row = tuple![1, "John"];
/// assert_eq!(row.values()[1], Value::Text("John".to_string()));
/// ```
#[macro_export]
macro_rules! tuple {
    ($($value:expr),* $(,)?) => {
        $crate::model::tuple::Tuple::new(vec![$($crate::model::value::Value::from($value)),*])
    };
}

/// Borrowed view pairing a tuple with its header, used by restriction predicates.
#[derive(Debug, Clone, Copy)]
pub struct TupleRef<'a> {
    header: &'a Header,
    tuple: &'a Tuple,
}

impl<'a> TupleRef<'a> {
    pub fn new(header: &'a Header, tuple: &'a Tuple) -> Self {
        Self { header, tuple }
    }

    /// Returns the value of attribute `name`, or `None` when the header lacks it.
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.header
            .position(name)
            .and_then(|position| self.tuple.get(position))
    }

    pub fn header(&self) -> &'a Header {
        self.header
    }

    pub fn tuple(&self) -> &'a Tuple {
        self.tuple
    }
}

#[cfg(test)]
mod tests {
    use super::{Tuple, TupleRef};
    use crate::model::header::Header;
    use crate::model::value::Value;

    #[test]
    fn tuple_ref_reads_values_by_attribute_name() {
        let header = Header::scalars(["id", "name"]).expect("valid header");
        let tuple = tuple![1, "John"];
        let view = TupleRef::new(&header, &tuple);

        assert_eq!(view.get("name"), Some(&Value::Text("John".to_string())));
        assert_eq!(view.get("email"), None);
    }

    #[test]
    fn tuples_build_from_vectors_and_iterators() {
        let from_vec = Tuple::from(vec![Value::from(1), Value::from("John")]);
        let collected = [Value::from(1), Value::from("John")]
            .into_iter()
            .collect::<Tuple>();
        assert_eq!(from_vec, collected);
        assert_eq!(from_vec, tuple![1, "John"]);
        assert_eq!(
            collected.into_values(),
            vec![Value::from(1), Value::from("John")]
        );
    }

    #[test]
    fn tuples_compare_lexicographically() {
        assert!(tuple![1, "b"] < tuple![2, "a"]);
        assert!(tuple![1, "a"] < tuple![1, "b"]);
    }
}

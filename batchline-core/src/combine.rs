//! Keyed full-barrier aggregation

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;

use crate::element::Element;
use crate::error::{Error, Result};

/// Type-erased per-key accumulator table.
///
/// Tables are owned exclusively by the execution backend's reduction stage
/// and never exposed to user functions.
pub struct AccTable(Box<dyn Any + Send>);

/// Object-safe combiner interface used by execution backends.
///
/// The split into shard-local accumulation (`new_table` + `accumulate`),
/// `merge`, and `finish` is what lets a sharded backend reduce disjoint
/// partitions independently and still produce the same result, provided the
/// combine function is associative and commutative.
pub trait DynCombiner: Send + Sync {
    /// Create an empty accumulator table.
    fn new_table(&self) -> AccTable;

    /// Fold one `(key, value)` element into the table.
    fn accumulate(&self, table: &mut AccTable, elem: Element) -> Result<()>;

    /// Merge two partial tables into one.
    fn merge(&self, left: AccTable, right: AccTable) -> Result<AccTable>;

    /// Emit one `(key, combined)` element per distinct key and drop the table.
    fn finish(&self, table: AccTable) -> Result<Vec<Element>>;
}

/// Combiner backed by a user-supplied binary combine function.
pub(crate) struct FnCombiner<K, V, F> {
    node: String,
    combine: F,
    _types: PhantomData<fn() -> (K, V)>,
}

impl<K, V, F> FnCombiner<K, V, F> {
    pub(crate) fn new(node: &str, combine: F) -> Self {
        Self {
            node: node.to_string(),
            combine,
            _types: PhantomData,
        }
    }

    fn type_err(&self) -> Error {
        Error::TypeMismatch {
            node: self.node.clone(),
            expected: type_name::<(K, V)>(),
        }
    }
}

impl<K, V, F> DynCombiner for FnCombiner<K, V, F>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
    F: Fn(V, V) -> V + Send + Sync + 'static,
{
    fn new_table(&self) -> AccTable {
        AccTable(Box::new(HashMap::<K, V>::new()))
    }

    fn accumulate(&self, table: &mut AccTable, elem: Element) -> Result<()> {
        let map = table
            .0
            .downcast_mut::<HashMap<K, V>>()
            .ok_or_else(|| self.type_err())?;
        let (key, value) = elem.downcast::<(K, V)>().ok_or_else(|| self.type_err())?;
        let combined = match map.remove(&key) {
            Some(previous) => (self.combine)(previous, value),
            None => value,
        };
        map.insert(key, combined);
        Ok(())
    }

    fn merge(&self, left: AccTable, right: AccTable) -> Result<AccTable> {
        let mut left_map = left
            .0
            .downcast::<HashMap<K, V>>()
            .map_err(|_| self.type_err())?;
        let right_map = right
            .0
            .downcast::<HashMap<K, V>>()
            .map_err(|_| self.type_err())?;
        for (key, value) in *right_map {
            let combined = match left_map.remove(&key) {
                Some(previous) => (self.combine)(previous, value),
                None => value,
            };
            left_map.insert(key, combined);
        }
        Ok(AccTable(left_map))
    }

    fn finish(&self, table: AccTable) -> Result<Vec<Element>> {
        let map = table
            .0
            .downcast::<HashMap<K, V>>()
            .map_err(|_| self.type_err())?;
        Ok(map
            .into_iter()
            .map(|(key, value)| Element::new((key, value)))
            .collect())
    }
}

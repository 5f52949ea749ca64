//! Source trait and implementations for data input

use crate::element::Element;
use crate::error::Result;

/// A bounded source of typed records for a pipeline.
///
/// `read` is called once per run and returns a lazy, fallible iterator over
/// the records; a rebuilt stream restarts from the beginning. Implementations
/// must not require the whole dataset in memory at once.
pub trait RecordSource: Send + Sync {
    /// The type of records produced by this source
    type Item: Send + Clone + 'static;

    /// Open the source, returning a lazy iterator over its records
    fn read(&self) -> Result<Box<dyn Iterator<Item = Result<Self::Item>> + Send>>;

    /// Provides a hint about the total number of records (if known)
    fn size_hint(&self) -> Option<usize> {
        None
    }
}

/// Type-erased source stored in the graph.
pub(crate) trait DynSource: Send + Sync {
    fn open(&self) -> Result<Box<dyn Iterator<Item = Result<Element>> + Send>>;
}

pub(crate) struct TypedSource<S>(pub(crate) S);

impl<S: RecordSource> DynSource for TypedSource<S> {
    fn open(&self) -> Result<Box<dyn Iterator<Item = Result<Element>> + Send>> {
        let records = self.0.read()?;
        Ok(Box::new(records.map(|record| record.map(Element::new))))
    }
}

/// An in-memory source, mainly for tests and small inputs.
pub struct VecSource<T> {
    items: Vec<T>,
}

impl<T> VecSource<T> {
    /// Create a source over the given items.
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T: Send + Sync + Clone + 'static> RecordSource for VecSource<T> {
    type Item = T;

    fn read(&self) -> Result<Box<dyn Iterator<Item = Result<T>> + Send>> {
        let items = self.items.clone();
        Ok(Box::new(items.into_iter().map(Ok)))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_source_restarts_on_rebuild() {
        let source = VecSource::new(vec![1, 2, 3]);
        for _ in 0..2 {
            let items: Result<Vec<i32>> = source.read().unwrap().collect();
            assert_eq!(items.unwrap(), vec![1, 2, 3]);
        }
        assert_eq!(source.size_hint(), Some(3));
    }
}

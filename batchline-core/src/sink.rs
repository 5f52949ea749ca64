//! Sink trait and implementations for data output

use std::any::type_name;
use std::sync::{Arc, Mutex, PoisonError};

use crate::element::Element;
use crate::error::{Error, Result};

/// A sink that consumes the records of a terminal element stream.
pub trait RecordSink: Send + Sync {
    /// The type of records this sink consumes
    type Item: Send + 'static;

    /// Consume one record
    fn write(&mut self, item: Self::Item) -> Result<()>;

    /// Flush any buffered output and finalize
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Type-erased sink stored in the graph.
pub(crate) trait DynSink: Send + Sync {
    fn write_element(&mut self, elem: Element) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

pub(crate) struct TypedSink<S> {
    pub(crate) node: String,
    pub(crate) sink: S,
}

impl<S: RecordSink> DynSink for TypedSink<S> {
    fn write_element(&mut self, elem: Element) -> Result<()> {
        let item = elem.downcast::<S::Item>().ok_or_else(|| Error::TypeMismatch {
            node: self.node.clone(),
            expected: type_name::<S::Item>(),
        })?;
        self.sink.write(item)
    }

    fn close(&mut self) -> Result<()> {
        self.sink.close()
    }
}

/// A sink that collects records in memory behind a shared handle.
///
/// The pipeline consumes the sink itself, so results are read through the
/// handle returned by [`CollectingSink::results`] after the run finishes.
pub struct CollectingSink<T> {
    items: Arc<Mutex<Vec<T>>>,
}

/// Shared read handle for a [`CollectingSink`].
pub struct CollectedItems<T>(Arc<Mutex<Vec<T>>>);

impl<T> CollectingSink<T> {
    /// Create a new collecting sink.
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle for reading the collected records after the run finishes.
    pub fn results(&self) -> CollectedItems<T> {
        CollectedItems(Arc::clone(&self.items))
    }
}

impl<T> Default for CollectingSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> RecordSink for CollectingSink<T> {
    type Item = T;

    fn write(&mut self, item: T) -> Result<()> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item);
        Ok(())
    }
}

impl<T: Clone> CollectedItems<T> {
    /// Copy of the records collected so far.
    pub fn snapshot(&self) -> Vec<T> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<T> CollectedItems<T> {
    /// Number of records collected so far.
    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_through_handle() {
        let mut sink = CollectingSink::new();
        let results = sink.results();
        sink.write(1).unwrap();
        sink.write(2).unwrap();
        sink.close().unwrap();
        assert_eq!(results.snapshot(), vec![1, 2]);
        assert_eq!(results.len(), 2);
    }
}

//! Type-erased elements flowing along pipeline edges

use std::any::Any;

/// Object-safe view of a clone-able element payload.
pub(crate) trait ElementValue: Any + Send {
    fn clone_box(&self) -> Box<dyn ElementValue>;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T: Any + Send + Clone> ElementValue for T {
    fn clone_box(&self) -> Box<dyn ElementValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// One unit of data flowing through a pipeline.
///
/// Elements are type-erased so that a single graph can carry edges of
/// different element types. The concrete type is recovered by the typed
/// operator wrappers built at graph-construction time; cloning only happens
/// on fan-out edges.
pub struct Element(Box<dyn ElementValue>);

impl Element {
    /// Wrap a value as an element.
    pub fn new<T: Any + Send + Clone>(value: T) -> Self {
        Self(Box::new(value))
    }

    /// Recover the concrete value, or `None` if the type does not match.
    pub fn downcast<T: Any>(self) -> Option<T> {
        self.0.into_any().downcast::<T>().ok().map(|boxed| *boxed)
    }

    /// Whether this element holds a value of type `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.0.as_any().is::<T>()
    }
}

impl Clone for Element {
    fn clone(&self) -> Self {
        Self(self.0.clone_box())
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Element(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast_recovers_value() {
        let elem = Element::new(("word".to_string(), 1u64));
        assert!(elem.is::<(String, u64)>());
        assert_eq!(elem.downcast::<(String, u64)>(), Some(("word".to_string(), 1)));
    }

    #[test]
    fn downcast_wrong_type_returns_none() {
        let elem = Element::new(42i32);
        assert!(!elem.is::<String>());
        assert_eq!(elem.downcast::<String>(), None);
    }

    #[test]
    fn clone_is_independent() {
        let elem = Element::new(vec![1, 2, 3]);
        let copy = elem.clone();
        assert_eq!(elem.downcast::<Vec<i32>>(), Some(vec![1, 2, 3]));
        assert_eq!(copy.downcast::<Vec<i32>>(), Some(vec![1, 2, 3]));
    }
}

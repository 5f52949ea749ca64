//! Pipeline construction

use std::any::type_name;
use std::collections::HashSet;
use std::hash::Hash;
use std::marker::PhantomData;

use uuid::Uuid;

use crate::combine::FnCombiner;
use crate::element::Element;
use crate::error::{Error, Result};
use crate::graph::{Node, NodeId, NodeKind, NodeOp};
use crate::sink::{RecordSink, TypedSink};
use crate::source::{RecordSource, TypedSource};

/// A typed reference to a node in a [`Pipeline`].
///
/// Handles carry the element type of the node's output edge, so transform
/// input/output types are checked when the graph is built rather than when it
/// runs. A handle is only valid for the pipeline that created it.
#[derive(Debug)]
pub struct NodeHandle<T> {
    pipeline: Uuid,
    pub(crate) id: NodeId,
    name: String,
    _output: PhantomData<fn() -> T>,
}

impl<T> NodeHandle<T> {
    fn new(pipeline: Uuid, id: NodeId, name: &str) -> Self {
        Self {
            pipeline,
            id,
            name: name.to_string(),
            _output: PhantomData,
        }
    }

    /// The user-visible name of the referenced node.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for NodeHandle<T> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline,
            id: self.id,
            name: self.name.clone(),
            _output: PhantomData,
        }
    }
}

/// A directed acyclic graph of transforms over bounded element streams.
///
/// A pipeline is built declaratively through the methods below (no execution
/// happens at build time), then consumed exactly once by a
/// [`PipelineRunner`](crate::PipelineRunner).
pub struct Pipeline {
    id: Uuid,
    pub(crate) nodes: Vec<Node>,
    names: HashSet<String>,
}

impl Pipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            nodes: Vec::new(),
            names: HashSet::new(),
        }
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn register(
        &mut self,
        name: &str,
        kind: NodeKind,
        upstream: Option<NodeId>,
        op: NodeOp,
    ) -> Result<NodeId> {
        if !self.names.insert(name.to_string()) {
            return Err(Error::DuplicateName(name.to_string()));
        }
        self.nodes.push(Node {
            name: name.to_string(),
            kind,
            upstream,
            op,
        });
        Ok(self.nodes.len() - 1)
    }

    fn check_attached<T>(&self, handle: &NodeHandle<T>) -> Result<()> {
        if handle.pipeline != self.id {
            return Err(Error::DetachedNode(handle.name.clone()));
        }
        Ok(())
    }

    /// Add a source node producing the records of `source`.
    pub fn read<S>(&mut self, name: &str, source: S) -> Result<NodeHandle<S::Item>>
    where
        S: RecordSource + 'static,
    {
        let op = NodeOp::Source(Box::new(TypedSource(source)));
        let id = self.register(name, NodeKind::Source, None, op)?;
        Ok(NodeHandle::new(self.id, id, name))
    }

    /// Add a one-to-many element-wise transform.
    ///
    /// `f` must be pure; a returned error aborts the whole run.
    pub fn flat_map<I, O, F>(
        &mut self,
        upstream: &NodeHandle<I>,
        name: &str,
        f: F,
    ) -> Result<NodeHandle<O>>
    where
        I: Send + Clone + 'static,
        O: Send + Clone + 'static,
        F: Fn(I) -> anyhow::Result<Vec<O>> + Send + Sync + 'static,
    {
        self.check_attached(upstream)?;
        let node = name.to_string();
        let op = NodeOp::FlatMap(Box::new(move |elem: Element| {
            let input = elem.downcast::<I>().ok_or_else(|| Error::TypeMismatch {
                node: node.clone(),
                expected: type_name::<I>(),
            })?;
            let outputs = f(input).map_err(|source| Error::Transform {
                node: node.clone(),
                source,
            })?;
            Ok(outputs.into_iter().map(Element::new).collect())
        }));
        let id = self.register(name, NodeKind::FlatMap, Some(upstream.id), op)?;
        Ok(NodeHandle::new(self.id, id, name))
    }

    /// Add a one-to-one element-wise transform.
    ///
    /// `f` must be pure; a returned error aborts the whole run.
    pub fn map<I, O, F>(
        &mut self,
        upstream: &NodeHandle<I>,
        name: &str,
        f: F,
    ) -> Result<NodeHandle<O>>
    where
        I: Send + Clone + 'static,
        O: Send + Clone + 'static,
        F: Fn(I) -> anyhow::Result<O> + Send + Sync + 'static,
    {
        self.check_attached(upstream)?;
        let node = name.to_string();
        let op = NodeOp::Map(Box::new(move |elem: Element| {
            let input = elem.downcast::<I>().ok_or_else(|| Error::TypeMismatch {
                node: node.clone(),
                expected: type_name::<I>(),
            })?;
            let output = f(input).map_err(|source| Error::Transform {
                node: node.clone(),
                source,
            })?;
            Ok(Element::new(output))
        }));
        let id = self.register(name, NodeKind::Map, Some(upstream.id), op)?;
        Ok(NodeHandle::new(self.id, id, name))
    }

    /// Add a keyed aggregation over `(key, value)` pairs.
    ///
    /// `combine` must be associative and commutative; otherwise results are
    /// backend-dependent and not reproducible. The node is a full barrier: it
    /// emits exactly one `(key, combined)` pair per distinct key, only after
    /// its entire upstream is exhausted. Output order is unspecified.
    pub fn combine_per_key<K, V, F>(
        &mut self,
        upstream: &NodeHandle<(K, V)>,
        name: &str,
        combine: F,
    ) -> Result<NodeHandle<(K, V)>>
    where
        K: Eq + Hash + Clone + Send + 'static,
        V: Clone + Send + 'static,
        F: Fn(V, V) -> V + Send + Sync + 'static,
    {
        self.check_attached(upstream)?;
        let op = NodeOp::Combine(Box::new(FnCombiner::<K, V, F>::new(name, combine)));
        let id = self.register(name, NodeKind::CombinePerKey, Some(upstream.id), op)?;
        Ok(NodeHandle::new(self.id, id, name))
    }

    /// Add a terminal sink consuming the upstream stream.
    pub fn write<S>(&mut self, upstream: &NodeHandle<S::Item>, name: &str, sink: S) -> Result<()>
    where
        S: RecordSink + 'static,
    {
        self.check_attached(upstream)?;
        let op = NodeOp::Sink(Some(Box::new(TypedSink {
            node: name.to_string(),
            sink,
        })));
        self.register(name, NodeKind::Sink, Some(upstream.id), op)?;
        Ok(())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

//! Transform graph nodes and dependency ordering

use std::collections::VecDeque;

use crate::combine::DynCombiner;
use crate::element::Element;
use crate::error::{Error, Result};
use crate::sink::DynSink;
use crate::source::DynSource;

/// Index of a node within its owning pipeline.
pub type NodeId = usize;

/// The operator category of a pipeline node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Produces the initial element stream
    Source,
    /// One-to-many element-wise operator
    FlatMap,
    /// One-to-one element-wise operator
    Map,
    /// Keyed full-barrier aggregation
    CombinePerKey,
    /// Terminal consumer
    Sink,
}

pub(crate) type FlatMapFn = Box<dyn Fn(Element) -> Result<Vec<Element>> + Send + Sync>;
pub(crate) type MapFn = Box<dyn Fn(Element) -> Result<Element> + Send + Sync>;

/// The type-erased operator held by a node.
pub(crate) enum NodeOp {
    Source(Box<dyn DynSource>),
    FlatMap(FlatMapFn),
    Map(MapFn),
    Combine(Box<dyn DynCombiner>),
    /// The writer is taken out of the graph when a run starts.
    Sink(Option<Box<dyn DynSink>>),
}

pub(crate) struct Node {
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) upstream: Option<NodeId>,
    pub(crate) op: NodeOp,
}

/// Kahn's algorithm over the node list. Returns the topological order and the
/// per-node consumer lists. The builder cannot create cycles, but the check
/// is still performed before every run.
pub(crate) fn topo_order(nodes: &[Node]) -> Result<(Vec<NodeId>, Vec<Vec<NodeId>>)> {
    let mut consumers: Vec<Vec<NodeId>> = vec![Vec::new(); nodes.len()];
    let mut indegree: Vec<usize> = Vec::with_capacity(nodes.len());

    for (id, node) in nodes.iter().enumerate() {
        indegree.push(usize::from(node.upstream.is_some()));
        if let Some(upstream) = node.upstream {
            consumers[upstream].push(id);
        }
    }

    let mut ready: VecDeque<NodeId> = indegree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(id, _)| id)
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(id) = ready.pop_front() {
        order.push(id);
        for &consumer in &consumers[id] {
            indegree[consumer] -= 1;
            if indegree[consumer] == 0 {
                ready.push_back(consumer);
            }
        }
    }

    if order.len() != nodes.len() {
        return Err(Error::Cycle);
    }

    Ok((order, consumers))
}

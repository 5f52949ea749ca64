//! Execution plan and element push driver shared by runners
//!
//! A [`Pipeline`] is compiled into an [`ExecPlan`] before it runs: the graph
//! is validated (cycle check), topologically ordered, and the sink writers
//! are taken out into a [`SinkSet`]. Backends then drive elements through the
//! plan one source at a time, accumulating per-node state in an
//! [`ExecState`]. Sharded backends build one state per shard and merge them;
//! the single-threaded runner uses a single state throughout.

use std::collections::BTreeMap;
use std::mem;
use std::time::Duration;

use crate::combine::{AccTable, DynCombiner};
use crate::element::Element;
use crate::error::{Error, Result};
use crate::graph::{topo_order, Node, NodeId, NodeKind, NodeOp};
use crate::pipeline::Pipeline;
use crate::runner::RunResult;
use crate::sink::DynSink;

/// A validated, topologically ordered view of a pipeline's graph.
pub struct ExecPlan<'a> {
    nodes: &'a [Node],
    order: Vec<NodeId>,
    consumers: Vec<Vec<NodeId>>,
    sources: Vec<NodeId>,
}

/// The sink writers of a pipeline, owned by the driving thread of a run.
pub struct SinkSet {
    sinks: Vec<(NodeId, Box<dyn DynSink>)>,
}

/// Mutable per-run (or per-shard) execution state.
pub struct ExecState {
    counts: Vec<u64>,
    tables: Vec<Option<AccTable>>,
    sink_buffers: Vec<Vec<Element>>,
}

impl<'a> ExecPlan<'a> {
    /// Validate the pipeline and split it into a shareable plan and the
    /// run's sink writers.
    pub fn compile(pipeline: &'a mut Pipeline) -> Result<(Self, SinkSet)> {
        let mut sinks = Vec::new();
        for (id, node) in pipeline.nodes.iter_mut().enumerate() {
            if let NodeOp::Sink(slot) = &mut node.op {
                if let Some(sink) = slot.take() {
                    sinks.push((id, sink));
                }
            }
        }

        let nodes: &'a [Node] = &pipeline.nodes;
        let (order, consumers) = topo_order(nodes)?;
        let sources = order
            .iter()
            .copied()
            .filter(|&id| nodes[id].kind == NodeKind::Source)
            .collect();

        Ok((
            Self {
                nodes,
                order,
                consumers,
                sources,
            },
            SinkSet { sinks },
        ))
    }

    /// Source nodes in dependency order.
    pub fn source_ids(&self) -> &[NodeId] {
        &self.sources
    }

    /// The user-visible name of a node.
    pub fn node_name(&self, id: NodeId) -> &str {
        &self.nodes[id].name
    }

    /// Fresh, empty execution state for this plan.
    pub fn new_state(&self) -> ExecState {
        let len = self.nodes.len();
        ExecState {
            counts: vec![0; len],
            tables: (0..len).map(|_| None).collect(),
            sink_buffers: (0..len).map(|_| Vec::new()).collect(),
        }
    }

    /// Open the element stream of a source node.
    pub fn open_source(
        &self,
        id: NodeId,
    ) -> Result<Box<dyn Iterator<Item = Result<Element>> + Send>> {
        match &self.nodes[id].op {
            NodeOp::Source(source) => source.open(),
            _ => Err(Error::Execution(format!(
                "node '{}' is not a source",
                self.nodes[id].name
            ))),
        }
    }

    /// Push one source element through the element-wise stages below it.
    ///
    /// Combine nodes accumulate into the state's tables; sink deliveries are
    /// buffered in the state until the caller drains them.
    pub fn push_source_element(
        &self,
        state: &mut ExecState,
        source: NodeId,
        elem: Element,
    ) -> Result<()> {
        state.counts[source] += 1;
        self.push_downstream(state, source, elem)
    }

    fn push_downstream(
        &self,
        state: &mut ExecState,
        producer: NodeId,
        elem: Element,
    ) -> Result<()> {
        match self.consumers[producer].split_last() {
            None => Ok(()),
            Some((&last, rest)) => {
                // Fan-out edges clone; the final consumer takes ownership.
                for &consumer in rest {
                    self.deliver(state, consumer, elem.clone())?;
                }
                self.deliver(state, last, elem)
            }
        }
    }

    fn deliver(&self, state: &mut ExecState, node: NodeId, elem: Element) -> Result<()> {
        match &self.nodes[node].op {
            NodeOp::FlatMap(f) => {
                let outputs = f(elem)?;
                state.counts[node] += outputs.len() as u64;
                for output in outputs {
                    self.push_downstream(state, node, output)?;
                }
                Ok(())
            }
            NodeOp::Map(f) => {
                let output = f(elem)?;
                state.counts[node] += 1;
                self.push_downstream(state, node, output)
            }
            NodeOp::Combine(combiner) => {
                let table = state.tables[node].get_or_insert_with(|| combiner.new_table());
                combiner.accumulate(table, elem)
            }
            NodeOp::Sink(_) => {
                state.counts[node] += 1;
                state.sink_buffers[node].push(elem);
                Ok(())
            }
            NodeOp::Source(_) => Err(Error::Execution(format!(
                "source '{}' cannot consume elements",
                self.nodes[node].name
            ))),
        }
    }

    /// Finalize combine nodes in dependency order, pushing each node's output
    /// through the stages below it.
    ///
    /// Must be called exactly once, after every source stream is exhausted:
    /// combines are full barriers and know their key set only at that point.
    pub fn finalize(&self, state: &mut ExecState) -> Result<()> {
        for &id in &self.order {
            if let NodeOp::Combine(combiner) = &self.nodes[id].op {
                let table = state.tables[id]
                    .take()
                    .unwrap_or_else(|| combiner.new_table());
                let outputs = combiner.finish(table)?;
                state.counts[id] += outputs.len() as u64;
                for output in outputs {
                    self.push_downstream(state, id, output)?;
                }
            }
        }
        Ok(())
    }

    /// Merge two shard-local states: counts add, partial combine tables merge
    /// through the node's combiner, and pending sink output concatenates.
    pub fn merge_states(&self, mut left: ExecState, right: ExecState) -> Result<ExecState> {
        for (acc, count) in left.counts.iter_mut().zip(right.counts) {
            *acc += count;
        }
        for (id, table) in right.tables.into_iter().enumerate() {
            if let Some(right_table) = table {
                let merged = match left.tables[id].take() {
                    Some(left_table) => self.combiner(id)?.merge(left_table, right_table)?,
                    None => right_table,
                };
                left.tables[id] = Some(merged);
            }
        }
        for (id, mut buffer) in right.sink_buffers.into_iter().enumerate() {
            left.sink_buffers[id].append(&mut buffer);
        }
        Ok(left)
    }

    /// Build the run report from a finished state.
    pub fn run_result(&self, state: &ExecState, execution_time: Duration) -> RunResult {
        let node_counts: BTreeMap<String, u64> = self
            .order
            .iter()
            .map(|&id| (self.nodes[id].name.clone(), state.counts[id]))
            .collect();
        RunResult {
            node_counts,
            execution_time,
        }
    }

    fn combiner(&self, id: NodeId) -> Result<&dyn DynCombiner> {
        match &self.nodes[id].op {
            NodeOp::Combine(combiner) => Ok(combiner.as_ref()),
            _ => Err(Error::Execution(format!(
                "node '{}' is not a combine",
                self.nodes[id].name
            ))),
        }
    }
}

impl ExecState {
    /// Take the non-empty pending sink deliveries, leaving the buffers empty.
    pub fn take_sink_buffers(&mut self) -> Vec<(NodeId, Vec<Element>)> {
        self.sink_buffers
            .iter_mut()
            .enumerate()
            .filter(|(_, buffer)| !buffer.is_empty())
            .map(|(id, buffer)| (id, mem::take(buffer)))
            .collect()
    }
}

impl SinkSet {
    /// Deliver a batch of elements to the given sink node.
    pub fn write(&mut self, node: NodeId, elements: Vec<Element>) -> Result<()> {
        if let Some((_, sink)) = self.sinks.iter_mut().find(|(id, _)| *id == node) {
            for elem in elements {
                sink.write_element(elem)?;
            }
        }
        Ok(())
    }

    /// Flush and finalize every sink. Called once, after the run drains.
    pub fn close(&mut self) -> Result<()> {
        for (_, sink) in &mut self.sinks {
            sink.close()?;
        }
        Ok(())
    }
}

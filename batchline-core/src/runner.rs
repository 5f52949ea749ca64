//! Runner contract, cancellation, and run reporting

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::error::Result;
use crate::pipeline::Pipeline;

/// Cooperative cancellation signal shared between a caller and a running
/// pipeline.
///
/// Cancellation stops the scheduling of further elements or shards and makes
/// the run fail with [`Error::Cancelled`](crate::Error::Cancelled) promptly.
/// No partial-output cleanup is performed.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Summary of a completed pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// Elements produced by each node, keyed by node name.
    ///
    /// Sources and element-wise nodes count emitted elements, combine nodes
    /// count distinct keys, sinks count records written.
    pub node_counts: BTreeMap<String, u64>,

    /// Wall-clock execution time.
    #[serde(with = "humantime_serde")]
    pub execution_time: Duration,
}

/// An execution backend for [`Pipeline`]s.
///
/// Backends differ in scheduling only; for pipelines whose combine functions
/// are associative and commutative, every backend produces the same multiset
/// of results. A pipeline is consumed by `run` and cannot be executed twice.
pub trait PipelineRunner {
    /// Run the pipeline to completion, honouring `cancel`.
    fn run_with_cancel(&self, pipeline: Pipeline, cancel: &CancelToken) -> Result<RunResult>;

    /// Run the pipeline to completion.
    fn run(&self, pipeline: Pipeline) -> Result<RunResult> {
        self.run_with_cancel(pipeline, &CancelToken::new())
    }
}

//! Single-threaded reference runner

use std::time::Instant;

use tracing::debug;

use crate::error::{Error, Result};
use crate::pipeline::Pipeline;
use crate::plan::ExecPlan;
use crate::runner::{CancelToken, PipelineRunner, RunResult};

/// The reference backend: pulls one element at a time through the full
/// element-wise chain on the calling thread.
///
/// Memory stays bounded by the input line length apart from the per-key
/// combine tables, which hold one entry per distinct key.
#[derive(Debug, Default)]
pub struct DirectRunner;

impl DirectRunner {
    /// Create a new direct runner.
    pub fn new() -> Self {
        Self
    }
}

impl PipelineRunner for DirectRunner {
    fn run_with_cancel(&self, mut pipeline: Pipeline, cancel: &CancelToken) -> Result<RunResult> {
        let started = Instant::now();
        let (plan, mut sinks) = ExecPlan::compile(&mut pipeline)?;
        let mut state = plan.new_state();

        for &source in plan.source_ids() {
            debug!(node = plan.node_name(source), "reading source");
            let mut stream = plan.open_source(source)?;
            while let Some(item) = stream.next() {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                plan.push_source_element(&mut state, source, item?)?;
                for (node, batch) in state.take_sink_buffers() {
                    sinks.write(node, batch)?;
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        plan.finalize(&mut state)?;
        for (node, batch) in state.take_sink_buffers() {
            sinks.write(node, batch)?;
        }
        sinks.close()?;

        let result = plan.run_result(&state, started.elapsed());
        debug!(elapsed = ?result.execution_time, "pipeline complete");
        Ok(result)
    }
}

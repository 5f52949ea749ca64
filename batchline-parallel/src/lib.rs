//! Sharded parallel runner for batchline pipelines
//!
//! Splits each source stream into chunks and runs the element-wise stages
//! over disjoint chunks on a rayon pool. Each chunk produces a shard-local
//! state (per-node counts, partial combine tables, pending sink output);
//! states are merged on the driving thread through the combiners' `merge`,
//! and combine nodes are finalized single-threaded once every source is
//! exhausted. For associative and commutative combine functions the result
//! is identical to [`DirectRunner`](batchline_core::DirectRunner)'s.

use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use batchline_core::element::Element;
use batchline_core::error::{Error, Result};
use batchline_core::plan::{ExecPlan, ExecState};
use batchline_core::runner::{CancelToken, PipelineRunner, RunResult};
use batchline_core::Pipeline;

/// Configuration for [`ShardedRunner`].
#[derive(Debug, Clone)]
pub struct ShardedRunnerOptions {
    /// Number of worker threads for the element-wise stages.
    pub worker_threads: usize,

    /// Elements per shard chunk.
    pub chunk_size: usize,

    /// Chunks buffered per processing wave, as a multiple of
    /// `worker_threads`. Bounds how much of the source is resident at once.
    pub chunks_per_wave: usize,
}

impl Default for ShardedRunnerOptions {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus::get(),
            chunk_size: 1024,
            chunks_per_wave: 4,
        }
    }
}

/// A higher-throughput backend that shards source streams across worker
/// threads.
///
/// Shards share no mutable state; partial per-key accumulators are merged
/// with the same combine function in a final single-threaded reduction pass,
/// so sinks and combine output see exactly what the direct runner would
/// produce (up to unspecified key order).
pub struct ShardedRunner {
    options: ShardedRunnerOptions,
}

impl ShardedRunner {
    /// Create a runner with default options.
    pub fn new() -> Self {
        Self::with_options(ShardedRunnerOptions::default())
    }

    /// Create a runner with explicit options.
    pub fn with_options(options: ShardedRunnerOptions) -> Self {
        Self { options }
    }
}

impl Default for ShardedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRunner for ShardedRunner {
    fn run_with_cancel(&self, mut pipeline: Pipeline, cancel: &CancelToken) -> Result<RunResult> {
        let started = Instant::now();
        let (plan, mut sinks) = ExecPlan::compile(&mut pipeline)?;

        let workers = self.options.worker_threads.max(1);
        let chunk_size = self.options.chunk_size.max(1);
        let wave_len = workers * self.options.chunks_per_wave.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| Error::Execution(format!("failed to build worker pool: {e}")))?;

        let mut merged = plan.new_state();

        for &source in plan.source_ids() {
            debug!(node = plan.node_name(source), workers, "sharding source");
            let mut stream = plan.open_source(source)?;
            let mut exhausted = false;

            while !exhausted {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }

                let mut wave: Vec<Vec<Element>> = Vec::new();
                for _ in 0..wave_len {
                    let mut chunk = Vec::with_capacity(chunk_size);
                    for item in stream.by_ref().take(chunk_size) {
                        chunk.push(item?);
                    }
                    let full = chunk.len() == chunk_size;
                    if !chunk.is_empty() {
                        wave.push(chunk);
                    }
                    if !full {
                        exhausted = true;
                        break;
                    }
                }
                if wave.is_empty() {
                    break;
                }

                let states: Vec<ExecState> = pool.install(|| {
                    wave.into_par_iter()
                        .map(|chunk| {
                            let mut state = plan.new_state();
                            for elem in chunk {
                                plan.push_source_element(&mut state, source, elem)?;
                            }
                            Ok(state)
                        })
                        .collect::<Result<Vec<_>>>()
                })?;

                for state in states {
                    merged = plan.merge_states(merged, state)?;
                }
                for (node, batch) in merged.take_sink_buffers() {
                    sinks.write(node, batch)?;
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        plan.finalize(&mut merged)?;
        for (node, batch) in merged.take_sink_buffers() {
            sinks.write(node, batch)?;
        }
        sinks.close()?;

        let result = plan.run_result(&merged, started.elapsed());
        debug!(elapsed = ?result.execution_time, "pipeline complete");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;
    use batchline_core::sink::CollectingSink;
    use batchline_core::source::VecSource;
    use batchline_core::DirectRunner;

    fn small_runner() -> ShardedRunner {
        // Tiny chunks so even small inputs exercise the merge path.
        ShardedRunner::with_options(ShardedRunnerOptions {
            worker_threads: 2,
            chunk_size: 2,
            chunks_per_wave: 2,
        })
    }

    fn word_count(
        runner: &dyn PipelineRunner,
        input: &[String],
    ) -> (RunResult, Vec<(String, u64)>) {
        let mut pipeline = Pipeline::new();
        let lines = pipeline
            .read("lines", VecSource::new(input.to_vec()))
            .unwrap();
        let words = pipeline
            .flat_map(&lines, "split", |line: String| {
                Ok(line.split_whitespace().map(str::to_string).collect())
            })
            .unwrap();
        let pairs = pipeline
            .map(&words, "pair", |word: String| Ok((word, 1u64)))
            .unwrap();
        let counts = pipeline
            .combine_per_key(&pairs, "sum", |a, b| a + b)
            .unwrap();
        let sink = CollectingSink::new();
        let results = sink.results();
        pipeline.write(&counts, "collect", sink).unwrap();

        let report = runner.run(pipeline).unwrap();
        let mut out = results.snapshot();
        out.sort();
        (report, out)
    }

    fn input(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn counts_match_the_direct_runner() {
        let lines = input(&[
            "the cat sat on the mat",
            "the dog",
            "",
            "cat and dog and cat",
        ]);
        let (_, direct) = word_count(&DirectRunner::new(), &lines);
        let (_, sharded) = word_count(&small_runner(), &lines);
        assert_eq!(direct, sharded);
    }

    #[test]
    fn node_counts_survive_the_merge() {
        let lines = input(&["a b c", "a b", "a"]);
        let (report, _) = word_count(&small_runner(), &lines);
        assert_eq!(report.node_counts["lines"], 3);
        assert_eq!(report.node_counts["split"], 6);
        assert_eq!(report.node_counts["pair"], 6);
        assert_eq!(report.node_counts["sum"], 3);
        assert_eq!(report.node_counts["collect"], 3);
    }

    #[test]
    fn empty_input_produces_no_output() {
        let (report, out) = word_count(&small_runner(), &[]);
        assert!(out.is_empty());
        assert_eq!(report.node_counts["collect"], 0);
    }

    #[test]
    fn pre_barrier_sinks_preserve_chunk_order() {
        let mut pipeline = Pipeline::new();
        let numbers = pipeline
            .read("numbers", VecSource::new((0i64..20).collect()))
            .unwrap();
        let doubled = pipeline
            .map(&numbers, "double", |n: i64| Ok(n * 2))
            .unwrap();
        let sink = CollectingSink::new();
        let results = sink.results();
        pipeline.write(&doubled, "collect", sink).unwrap();

        small_runner().run(pipeline).unwrap();
        let expected: Vec<i64> = (0..20).map(|n| n * 2).collect();
        assert_eq!(results.snapshot(), expected);
    }

    #[test]
    fn cancellation_stops_the_run() {
        let mut pipeline = Pipeline::new();
        let numbers = pipeline
            .read("numbers", VecSource::new(vec![1i64, 2, 3]))
            .unwrap();
        pipeline
            .write(&numbers, "collect", CollectingSink::<i64>::new())
            .unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = small_runner()
            .run_with_cancel(pipeline, &cancel)
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    proptest! {
        // Backend equivalence for an associative/commutative combiner, plus
        // count conservation across both backends.
        #[test]
        fn agrees_with_direct_runner(
            lines in prop::collection::vec(
                prop::collection::vec("[a-z]{1,3}", 0..8),
                0..12,
            )
        ) {
            let total_words: usize = lines.iter().map(Vec::len).sum();
            let joined: Vec<String> = lines.iter().map(|words| words.join(" ")).collect();

            let (_, direct) = word_count(&DirectRunner::new(), &joined);
            let (_, sharded) = word_count(&small_runner(), &joined);
            prop_assert_eq!(&direct, &sharded);

            let total: u64 = direct.iter().map(|(_, n)| n).sum();
            prop_assert_eq!(total as usize, total_words);

            let mut expected: HashMap<String, u64> = HashMap::new();
            for word in lines.iter().flatten() {
                *expected.entry(word.clone()).or_insert(0) += 1;
            }
            prop_assert_eq!(direct.len(), expected.len());
        }
    }
}

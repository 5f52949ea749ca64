//! Word-count binary

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use batchline_core::{DirectRunner, PipelineRunner, RunResult};
use batchline_io::TextWriterOptions;
use batchline_parallel::{ShardedRunner, ShardedRunnerOptions};
use batchline_wordcount::wordcount_pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RunnerKind {
    /// Single-threaded reference backend
    Direct,
    /// Parallel backend sharding the input across worker threads
    Sharded,
}

#[derive(Debug, Parser)]
#[command(name = "batchline-wordcount", about = "Count words in text files", version)]
struct Args {
    /// Input file or glob pattern
    #[arg(long, default_value = "data/kinglear.txt")]
    input: String,

    /// Output path prefix
    #[arg(long, default_value = "wordcount-output/part")]
    output: String,

    /// Execution backend
    #[arg(long, value_enum, default_value = "direct")]
    runner: RunnerKind,

    /// Number of output shard files
    #[arg(long, default_value_t = 1)]
    shards: usize,

    /// Elements per parallel chunk (sharded runner only)
    #[arg(long, default_value_t = 1024)]
    chunk_size: usize,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

fn print_report(result: &RunResult) {
    println!("=== Word count complete ===");
    for (node, count) in &result.node_counts {
        println!("  {node}: {count} elements");
    }
    println!("  elapsed: {:?}", result.execution_time);
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let writer = TextWriterOptions {
        num_shards: args.shards.max(1),
        suffix: String::new(),
    };

    info!(input = %args.input, output = %args.output, runner = ?args.runner, "starting word count");
    let pipeline = wordcount_pipeline(&args.input, &args.output, writer)?;

    let result = match args.runner {
        RunnerKind::Direct => DirectRunner::new().run(pipeline)?,
        RunnerKind::Sharded => {
            let options = ShardedRunnerOptions {
                chunk_size: args.chunk_size.max(1),
                ..Default::default()
            };
            ShardedRunner::with_options(options).run(pipeline)?
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_report(&result);
    }
    Ok(())
}

//! End-to-end word-count runs over real files.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use tempfile::tempdir;

use batchline_core::{DirectRunner, PipelineRunner};
use batchline_io::TextWriterOptions;
use batchline_parallel::{ShardedRunner, ShardedRunnerOptions};
use batchline_wordcount::wordcount_pipeline;

fn run(runner: &dyn PipelineRunner, input: &Path, output: &Path, shards: usize) {
    let options = TextWriterOptions {
        num_shards: shards,
        suffix: String::new(),
    };
    let pipeline = wordcount_pipeline(
        &input.to_string_lossy(),
        &output.to_string_lossy(),
        options,
    )
    .unwrap();
    runner.run(pipeline).unwrap();
}

fn read_lines(path: &Path) -> BTreeSet<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn direct_runner_counts_a_shakespeare_fragment() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("input.txt");
    let output = dir.path().join("out");
    fs::write(&input, "Hear him: He's dead.\n").unwrap();

    run(&DirectRunner::new(), &input, &output, 1);

    let expected: BTreeSet<String> = ["Hear: 1", "him: 1", "He's: 1", "dead: 1"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(read_lines(&output), expected);
}

#[test]
fn repeated_words_are_summed() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("input.txt");
    let output = dir.path().join("out");
    fs::write(&input, "the cat\nthe dog\nthe cat\n").unwrap();

    run(&DirectRunner::new(), &input, &output, 1);

    let expected: BTreeSet<String> = ["the: 3", "cat: 2", "dog: 1"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(read_lines(&output), expected);
}

#[test]
fn empty_input_writes_an_empty_output_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("input.txt");
    let output = dir.path().join("out");
    fs::write(&input, "").unwrap();

    run(&DirectRunner::new(), &input, &output, 1);

    assert_eq!(fs::read_to_string(&output).unwrap(), "");
}

#[test]
fn runners_agree_and_reruns_are_idempotent() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("input.txt");
    fs::write(
        &input,
        "To be, or not to be: that is the question\n\
         Whether 'tis nobler in the mind to suffer\n",
    )
    .unwrap();

    let direct_out = dir.path().join("direct");
    run(&DirectRunner::new(), &input, &direct_out, 1);

    let sharded = ShardedRunner::with_options(ShardedRunnerOptions {
        worker_threads: 2,
        chunk_size: 1,
        chunks_per_wave: 2,
    });
    let sharded_out = dir.path().join("sharded");
    run(&sharded, &input, &sharded_out, 1);
    assert_eq!(read_lines(&direct_out), read_lines(&sharded_out));

    let rerun_out = dir.path().join("rerun");
    run(&DirectRunner::new(), &input, &rerun_out, 1);
    assert_eq!(read_lines(&direct_out), read_lines(&rerun_out));
}

#[test]
fn sharded_output_files_partition_the_result() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("input.txt");
    let output = dir.path().join("part");
    fs::write(&input, "a b c d e f\n").unwrap();

    run(&DirectRunner::new(), &input, &output, 3);

    let mut all = BTreeSet::new();
    for index in 0..3 {
        let shard = dir.path().join(format!("part-{index:05}-of-00003"));
        for line in read_lines(&shard) {
            assert!(all.insert(line), "duplicate line across shards");
        }
    }
    let expected: BTreeSet<String> = ["a", "b", "c", "d", "e", "f"]
        .iter()
        .map(|w| format!("{w}: 1"))
        .collect();
    assert_eq!(all, expected);
}

#[test]
fn glob_input_reads_every_matching_file() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("one.txt"), "alpha beta\n").unwrap();
    fs::write(dir.path().join("two.txt"), "beta gamma\n").unwrap();
    let output = dir.path().join("out");

    let pattern = dir.path().join("*.txt");
    let options = TextWriterOptions::default();
    let pipeline =
        wordcount_pipeline(&pattern.to_string_lossy(), &output.to_string_lossy(), options).unwrap();
    DirectRunner::new().run(pipeline).unwrap();

    let expected: BTreeSet<String> = ["alpha: 1", "beta: 2", "gamma: 1"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(read_lines(&output), expected);
}

#[test]
fn missing_input_fails_without_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("does-not-exist.txt");
    let output = dir.path().join("out");

    let pipeline = wordcount_pipeline(
        &input.to_string_lossy(),
        &output.to_string_lossy(),
        TextWriterOptions::default(),
    )
    .unwrap();
    let err = DirectRunner::new().run(pipeline).unwrap_err();
    assert!(matches!(
        err,
        batchline_core::Error::SourceNotFound(_)
    ));
    assert!(!output.exists());
}

//! Word-count pipeline assembly
//!
//! The canonical batchline pipeline: read text lines, split them into words,
//! pair each word with 1, sum per key, format `"<word>: <count>"`, and write
//! the result as line-delimited text.

use once_cell::sync::Lazy;
use regex::Regex;

use batchline_core::{Pipeline, Result};
use batchline_io::{TextFileWriter, TextLineReader, TextWriterOptions};

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z']+").expect("static word pattern"));

/// Extract the maximal letter/apostrophe runs from a line.
///
/// Case-sensitive, no normalization; tokens without letters or apostrophes
/// (digits, punctuation) are dropped.
pub fn extract_words(line: &str) -> Vec<String> {
    WORD_RE
        .find_iter(line)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Build the word-count pipeline over `input` (a file path or glob pattern),
/// writing `"<word>: <count>"` lines under the `output` prefix.
pub fn wordcount_pipeline(
    input: &str,
    output: &str,
    writer: TextWriterOptions,
) -> Result<Pipeline> {
    let mut pipeline = Pipeline::new();
    let lines = pipeline.read("ReadLines", TextLineReader::new(input))?;
    let words = pipeline.flat_map(&lines, "Split", |line: String| Ok(extract_words(&line)))?;
    let pairs = pipeline.map(&words, "PairWithOne", |word: String| Ok((word, 1u64)))?;
    let counts = pipeline.combine_per_key(&pairs, "GroupAndSum", |a, b| a + b)?;
    let formatted = pipeline.map(&counts, "Format", |(word, count): (String, u64)| {
        Ok(format!("{word}: {count}"))
    })?;
    pipeline.write(
        &formatted,
        "WriteCounts",
        TextFileWriter::with_options(output, writer),
    )?;
    Ok(pipeline)
}

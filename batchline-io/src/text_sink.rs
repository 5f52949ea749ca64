//! Sharded line-oriented text output

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use tracing::debug;

use batchline_core::error::{Error, Result};
use batchline_core::RecordSink;

/// Options for [`TextFileWriter`].
#[derive(Debug, Clone)]
pub struct TextWriterOptions {
    /// Number of output shard files
    pub num_shards: usize,

    /// Suffix appended to every shard file name (e.g. ".txt")
    pub suffix: String,
}

impl Default for TextWriterOptions {
    fn default() -> Self {
        Self {
            num_shards: 1,
            suffix: String::new(),
        }
    }
}

/// Writes one element per line across one or more UTF-8 shard files.
///
/// A single shard is written to the bare prefix; with `n > 1` shards the
/// files are named `prefix-00000-of-0000n` and records are distributed
/// round-robin. Parent directories are created as needed, and shard files
/// are created even when the stream is empty. Output is buffered and only
/// durable once `close` succeeds; a failed run may leave partial files
/// behind, so its output must be treated as undefined.
pub struct TextFileWriter {
    prefix: String,
    options: TextWriterOptions,
    shards: Vec<ShardWriter>,
    next_shard: usize,
}

struct ShardWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl TextFileWriter {
    /// Create a single-shard writer for the given output prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_options(prefix, TextWriterOptions::default())
    }

    /// Create a writer with explicit sharding options.
    pub fn with_options(prefix: impl Into<String>, options: TextWriterOptions) -> Self {
        Self {
            prefix: prefix.into(),
            options,
            shards: Vec::new(),
            next_shard: 0,
        }
    }

    fn shard_path(&self, index: usize, count: usize) -> PathBuf {
        if count <= 1 {
            PathBuf::from(format!("{}{}", self.prefix, self.options.suffix))
        } else {
            PathBuf::from(format!(
                "{}-{:05}-of-{:05}{}",
                self.prefix, index, count, self.options.suffix
            ))
        }
    }

    fn ensure_open(&mut self) -> Result<()> {
        if !self.shards.is_empty() {
            return Ok(());
        }
        let count = self.options.num_shards.max(1);
        for index in 0..count {
            let path = self.shard_path(index, count);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).map_err(|source| Error::SinkWrite {
                        path: path.clone(),
                        source,
                    })?;
                }
            }
            let file = File::create(&path).map_err(|source| Error::SinkWrite {
                path: path.clone(),
                source,
            })?;
            self.shards.push(ShardWriter {
                path,
                writer: BufWriter::new(file),
            });
        }
        Ok(())
    }
}

impl RecordSink for TextFileWriter {
    type Item = String;

    fn write(&mut self, item: String) -> Result<()> {
        self.ensure_open()?;
        let index = self.next_shard;
        self.next_shard = (index + 1) % self.shards.len();
        let shard = &mut self.shards[index];
        writeln!(shard.writer, "{item}").map_err(|source| Error::SinkWrite {
            path: shard.path.clone(),
            source,
        })
    }

    fn close(&mut self) -> Result<()> {
        // Shards are created even if nothing was written: an empty input
        // still yields (empty) output files.
        self.ensure_open()?;
        for shard in &mut self.shards {
            shard.writer.flush().map_err(|source| Error::SinkWrite {
                path: shard.path.clone(),
                source,
            })?;
        }
        debug!(shards = self.shards.len(), prefix = %self.prefix, "sink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn single_shard_uses_bare_prefix() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("out").to_string_lossy().into_owned();

        let mut writer = TextFileWriter::new(prefix.clone());
        writer.write("alpha".to_string()).unwrap();
        writer.write("beta".to_string()).unwrap();
        writer.close().unwrap();

        let content = fs::read_to_string(&prefix).unwrap();
        assert_eq!(content, "alpha\nbeta\n");
    }

    #[test]
    fn multiple_shards_are_named_and_filled_round_robin() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("part").to_string_lossy().into_owned();

        let mut writer = TextFileWriter::with_options(
            prefix.clone(),
            TextWriterOptions {
                num_shards: 2,
                suffix: ".txt".to_string(),
            },
        );
        for item in ["a", "b", "c"] {
            writer.write(item.to_string()).unwrap();
        }
        writer.close().unwrap();

        let first = fs::read_to_string(format!("{prefix}-00000-of-00002.txt")).unwrap();
        let second = fs::read_to_string(format!("{prefix}-00001-of-00002.txt")).unwrap();
        assert_eq!(first, "a\nc\n");
        assert_eq!(second, "b\n");
    }

    #[test]
    fn empty_stream_still_creates_the_output_file() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("empty-out").to_string_lossy().into_owned();

        let mut writer = TextFileWriter::new(prefix.clone());
        writer.close().unwrap();

        assert_eq!(fs::read_to_string(&prefix).unwrap(), "");
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let prefix = dir
            .path()
            .join("nested/deeper/out")
            .to_string_lossy()
            .into_owned();

        let mut writer = TextFileWriter::new(prefix.clone());
        writer.write("line".to_string()).unwrap();
        writer.close().unwrap();

        assert_eq!(fs::read_to_string(&prefix).unwrap(), "line\n");
    }
}

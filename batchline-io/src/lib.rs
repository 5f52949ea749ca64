//! Text file sources and sinks for batchline pipelines
//!
//! Provides the line-oriented input and output used by text pipelines:
//! [`TextLineReader`] streams newline-delimited UTF-8 from a file or glob
//! pattern, and [`TextFileWriter`] persists a terminal stream of lines
//! across one or more shard files.

pub mod text_sink;
pub mod text_source;

pub use text_sink::{TextFileWriter, TextWriterOptions};
pub use text_source::TextLineReader;

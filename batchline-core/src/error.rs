//! Error types for batch pipelines

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for pipeline construction and execution.
///
/// All execution errors are fatal to the run as a whole: the engine performs
/// no retries and no per-element isolation.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A transform name was used twice within one pipeline
    #[error("duplicate transform name: '{0}'")]
    DuplicateName(String),

    /// A node handle from a different pipeline was passed to the builder
    #[error("node '{0}' does not belong to this pipeline")]
    DetachedNode(String),

    /// The transform graph contains a cycle
    #[error("transform graph contains a cycle")]
    Cycle,

    /// No input files matched the source path or pattern
    #[error("no input files match '{0}'")]
    SourceNotFound(String),

    /// The source file pattern could not be parsed
    #[error("invalid file pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Parser diagnostic
        reason: String,
    },

    /// A user transform function failed
    #[error("transform '{node}' failed: {source}")]
    Transform {
        /// Name of the failing node
        node: String,
        /// The underlying failure
        #[source]
        source: anyhow::Error,
    },

    /// A node received an element of an unexpected type
    #[error("node '{node}' received an unexpected element type (expected {expected})")]
    TypeMismatch {
        /// Name of the receiving node
        node: String,
        /// The expected element type
        expected: &'static str,
    },

    /// Writing to a sink file failed
    #[error("failed to write sink file '{path}': {source}")]
    SinkWrite {
        /// Path of the shard being written
        path: PathBuf,
        /// The underlying IO failure
        #[source]
        source: io::Error,
    },

    /// The run was cancelled through its [`CancelToken`](crate::CancelToken)
    #[error("pipeline cancelled")]
    Cancelled,

    /// Backend execution error
    #[error("execution error: {0}")]
    Execution(String),
}

//! Core traits, transform graph, and runners for bounded-batch pipelines
//!
//! This crate provides the foundational components for building bounded-batch
//! data pipelines: the type-erased element model, the transform graph and its
//! builder, the source/sink/combiner traits, and the single-threaded reference
//! runner. Parallel backends build on the [`plan`] module and implement the
//! same [`PipelineRunner`] contract.

#![warn(missing_docs)]

pub mod combine;
pub mod direct;
pub mod element;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod plan;
pub mod runner;
pub mod sink;
pub mod source;

// Re-export key types for convenience
pub use direct::DirectRunner;
pub use element::Element;
pub use error::{Error, Result};
pub use pipeline::{NodeHandle, Pipeline};
pub use runner::{CancelToken, PipelineRunner, RunResult};
pub use sink::{CollectingSink, RecordSink};
pub use source::{RecordSource, VecSource};

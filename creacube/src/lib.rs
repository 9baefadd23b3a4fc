// THEORY:
// This file is the main entry point for the `creacube` library crate. It exposes the
// annotation engine that watches four tracked cubes, works out which of them are
// joined and along which axis, recognizes known assemblies, and logs when the
// assembly on the table changes.
//
// The public surface: `AnnotationPipeline` for one ordered
// frame sequence, `ParallelPipeline` for many independent sequences, and the `io`
// collaborators that read tracker exports and catalogs and write event logs. The
// `core_modules` hold the four per-frame stages and their data types.

pub mod core_modules;
pub mod error;
pub mod io;
pub mod parallel_pipeline;
pub mod pipeline;

#[cfg(test)]
mod test_support;

pub use core_modules::adjacency::{AdjacencyDetector, Axis, Connection, ConnectionSet, MAX_CONNECTIONS};
pub use core_modules::catalog::{Catalog, Configuration};
pub use core_modules::cube::CubeId;
pub use core_modules::frame::Frame;
pub use core_modules::geometry::{Center, CubeGeometry, Edge, Rectangle, reduce_frame};
pub use error::{CreaCubeError, Result};
pub use parallel_pipeline::{ParallelPipeline, SequenceJob, SequenceOutcome, SequenceSource};
pub use pipeline::{
    AnnotationPipeline, AnnotationRun, DebouncePolicy, DebounceState, Event, FrameReport,
    PipelineConfig, RunSummary, annotate,
};

//! # vizpipe-pipeline
//!
//! The image visualization processor: joins a streamed source dataset
//! against a set of downloaded images, serializes per-image metadata, and
//! drives a remote plot service to completion.
//!
//! Stages, in order:
//!
//! 1. [`registry`] — parse the download manifest into an in-memory image
//!    registry and post-id index.
//! 2. [`scan`] — stream the source records once, merging matching records
//!    into the registry's per-image accumulators.
//! 3. [`metadata`] — emit the enriched records as a fixed-schema CSV.
//! 4. [`orchestrator`] — upload, trigger, and poll the remote plot job.
//! 5. [`html`] — emit the redirect page pointing at the finished plot.
//!
//! [`processor::PixPlotProcessor`] wires the stages together behind the
//! host's dataset handle.

pub mod html;
pub mod metadata;
pub mod orchestrator;
pub mod processor;
pub mod registry;
pub mod scan;

pub use html::redirect_page;
pub use metadata::write_metadata;
pub use orchestrator::{PlotOptions, PlotOrchestrator};
pub use processor::PixPlotProcessor;
pub use registry::{ImageRegistry, LoadDiagnostics};
pub use scan::{scan_source, ScanStats};

//! # vizpipe-core
//!
//! Core types, traits, and abstractions for the vizpipe visualization
//! pipeline.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the client and pipeline crates depend on.

pub mod dataset;
pub mod defaults;
pub mod error;
pub mod models;

// Re-export commonly used types at crate root
pub use dataset::{DatasetHandle, ItemMapper};
pub use error::{Error, Result};
pub use models::{DownloadRecord, ImageMetadata, PlotJob, PlotJobStatus, SourceRecord};

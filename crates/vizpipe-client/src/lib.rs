//! # vizpipe-client
//!
//! HTTP client for the remote PixPlot visualization service.
//!
//! The service consumes a batch of images plus a metadata file, builds an
//! explorable plot asynchronously, and exposes job state through a polling
//! endpoint. This crate covers exactly that contract:
//!
//! - `POST /api/send_photos` — multipart upload of metadata + images
//! - `POST /api/pixplot` — job creation (202 = accepted)
//! - `GET /api/pixplot?key=...` — job status
//!
//! The [`PlotBackend`] trait is the seam the pipeline crate programs
//! against; [`PixPlotClient`] is the production implementation and
//! [`mock::MockPlotBackend`] the deterministic test double.

pub mod mock;
pub mod pixplot;

pub use pixplot::{
    PixPlotClient, PlotArgs, PlotBackend, PollOutcome, TriggerOutcome, UploadReceipt,
};

//! Centralized default constants for the vizpipe pipeline.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates should reference these constants instead of defining
//! their own magic numbers.

// =============================================================================
// METADATA
// =============================================================================

/// Hard cap on the description field, in characters.
///
/// The remote plot service truncates any CSV field beyond this length, so
/// the scanner enforces it after every append.
pub const DESCRIPTION_MAX_CHARS: usize = 131_072;

/// Filename of the per-image download manifest inside the staging area.
pub const MANIFEST_FILENAME: &str = ".metadata.json";

/// Filename of the generated metadata file inside the staging area.
pub const METADATA_FILENAME: &str = "metadata.csv";

// =============================================================================
// UPLOAD
// =============================================================================

/// Default number of images to upload when the caller gives no amount.
pub const DEFAULT_MAX_IMAGES: usize = 100;

/// Hard upper bound on the number of images per plot.
pub const MAX_IMAGES_CAP: usize = 1000;

/// Timeout for the multipart image upload (seconds).
pub const UPLOAD_TIMEOUT_SECS: u64 = 600;

/// Timeout for trigger and status requests (seconds).
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// PLOT PARAMETERS
// =============================================================================

/// Default thumbnail cell size in pixels.
pub const DEFAULT_CELL_SIZE: u32 = 64;

/// Default UMAP nearest-neighbors parameter.
pub const DEFAULT_N_NEIGHBORS: u32 = 15;

/// Default UMAP minimum distance between points.
pub const DEFAULT_MIN_DIST: f64 = 0.01;

// =============================================================================
// POLLING
// =============================================================================

/// Interval between status polls while the remote job runs (seconds).
pub const POLL_INTERVAL_SECS: u64 = 10;

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Base URL of the remote plot service. The processor is unavailable when
/// this is unset.
pub const ENV_PIXPLOT_SERVER: &str = "PIXPLOT_SERVER";

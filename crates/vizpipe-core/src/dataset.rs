//! Collaborator traits supplied by the host application.
//!
//! The pipeline does not own datasets or their storage; it reports progress
//! and writes results through these seams.

use std::path::PathBuf;

use crate::models::SourceRecord;

/// Handle to the dataset the processor operates on.
///
/// Implemented by the host application's dataset object. The processor uses
/// it for identity (the dataset key doubles as the remote folder name and
/// polling key), for progress reporting, and to locate the result file.
pub trait DatasetHandle: Send + Sync {
    /// Dataset identifier; used as the remote folder name and job key.
    fn key(&self) -> &str;

    /// Path the result document is written to.
    fn results_path(&self) -> PathBuf;

    /// Report a human-readable status update.
    fn update_status(&self, message: &str);

    /// Mark the dataset finished with the given number of result rows.
    fn finish(&self, num_rows: usize);
}

/// Normalizes a heterogeneous source record into the canonical shape.
///
/// Source datasets come from different collectors with different schemas;
/// the host may supply a mapper that rewrites each record before the
/// scanner inspects it. When no mapper is supplied, records are taken
/// as-is.
pub trait ItemMapper: Send + Sync {
    fn map_item(&self, record: SourceRecord) -> SourceRecord;
}

/// Identity mapper for sources that are already in canonical shape.
pub struct IdentityMapper;

impl ItemMapper for IdentityMapper {
    fn map_item(&self, record: SourceRecord) -> SourceRecord {
        record
    }
}

//! Metadata serializer.
//!
//! Emits the enriched registry as a fixed-schema CSV consumed by the remote
//! plot service. Purely a formatting step: no mutation, and repeated runs
//! over the same registry produce byte-identical output.

use std::path::Path;

use tracing::debug;

use vizpipe_core::Result;

use crate::registry::ImageRegistry;

/// Column order of the metadata file.
pub const FIELDNAMES: [&str; 6] = [
    "filename",
    "description",
    "permalink",
    "year",
    "tags",
    "number_of_posts",
];

/// Write the metadata CSV, one row per image in registry insertion order.
///
/// Tags are pipe-joined; an absent year serializes as the empty field. The
/// writer is flushed and closed before returning, since the uploader reads
/// the file back from disk.
pub fn write_metadata(registry: &ImageRegistry, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(FIELDNAMES)?;
    for image in registry.images() {
        let year = image.year.map(|y| y.to_string()).unwrap_or_default();
        writer.write_record([
            image.filename.as_str(),
            image.description.as_str(),
            image.permalink.as_str(),
            year.as_str(),
            image.tags.join("|").as_str(),
            image.number_of_posts.to_string().as_str(),
        ])?;
    }
    writer.flush()?;
    debug!(rows = registry.len(), path = %path.display(), "Wrote metadata file");
    Ok(())
}

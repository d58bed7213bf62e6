//! End-to-end processor: manifest → scan → metadata file → remote plot →
//! redirect page.
//!
//! The processor owns the staging directory for the duration of a run and
//! removes it on every exit path, including errors raised mid-upload. All
//! progress reporting flows through the host's [`DatasetHandle`].

use std::path::{Path, PathBuf};

use tokio::sync::watch;
use tracing::{info, warn};

use vizpipe_client::{PixPlotClient, PlotBackend};
use vizpipe_core::{defaults, DatasetHandle, ItemMapper, PlotJob, Result, SourceRecord};

use crate::html::redirect_page;
use crate::metadata::write_metadata;
use crate::orchestrator::{PlotOptions, PlotOrchestrator};
use crate::registry::ImageRegistry;
use crate::scan::scan_source;

/// Removes the staging directory when dropped, success or failure.
struct StagingCleanup {
    path: PathBuf,
}

impl Drop for StagingCleanup {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove staging area");
        }
    }
}

/// The visualization processor.
///
/// Takes a staging directory of downloaded images plus their manifest,
/// builds the metadata file from the streamed source records, and drives
/// the remote plot service to completion.
pub struct PixPlotProcessor<B: PlotBackend> {
    orchestrator: PlotOrchestrator<B>,
}

impl PixPlotProcessor<PixPlotClient> {
    /// Create from the `PIXPLOT_SERVER` environment variable.
    ///
    /// Returns `None` when no server is configured; the processor is not
    /// available without one.
    pub fn from_env() -> Option<Self> {
        PixPlotClient::from_env().map(Self::new)
    }
}

impl<B: PlotBackend> PixPlotProcessor<B> {
    /// Create a processor with default options.
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, PlotOptions::default())
    }

    /// Create a processor with explicit options.
    pub fn with_options(backend: B, options: PlotOptions) -> Self {
        Self {
            orchestrator: PlotOrchestrator::with_options(backend, options),
        }
    }

    /// Run the full pipeline for one dataset.
    ///
    /// `staging` holds the unpacked images and their `.metadata.json`
    /// manifest; it is removed before this returns, on every path.
    /// `records` is the lazy source stream; it is consumed exactly once.
    /// On success the redirect page is written to the dataset's results
    /// path and the finished [`PlotJob`] is returned.
    pub async fn process<I>(
        &self,
        dataset: &dyn DatasetHandle,
        staging: PathBuf,
        records: I,
        mapper: Option<&dyn ItemMapper>,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<PlotJob>
    where
        I: IntoIterator<Item = Result<SourceRecord>>,
    {
        let _cleanup = StagingCleanup {
            path: staging.clone(),
        };

        dataset.update_status("Reading image manifest");
        let manifest_path = staging.join(defaults::MANIFEST_FILENAME);
        let (mut registry, diagnostics) = ImageRegistry::from_manifest_file(&manifest_path)?;
        if diagnostics.skipped_records > 0 {
            dataset.update_status(&format!(
                "Skipped {} incomplete manifest record(s)",
                diagnostics.skipped_records
            ));
        }
        if registry.is_empty() {
            dataset.update_status("No images available to plot");
            dataset.finish(0);
            return Ok(PlotJob::new(dataset.key()));
        }

        dataset.update_status(&format!(
            "Collecting metadata for {} image(s)",
            registry.len()
        ));
        let stats = scan_source(&mut registry, records, mapper);
        if stats.skipped_records > 0 {
            dataset.update_status(&format!(
                "Skipped {} unreadable source record(s)",
                stats.skipped_records
            ));
        }

        let metadata_path = staging.join(defaults::METADATA_FILENAME);
        write_metadata(&registry, &metadata_path)?;

        let image_paths = list_images(&staging)?;
        let job = self
            .orchestrator
            .generate(&metadata_path, &image_paths, dataset.key(), cancel, &|m| {
                dataset.update_status(m)
            })
            .await?;

        let plot_url = job.result_url.as_deref().unwrap_or_default();
        tokio::fs::write(dataset.results_path(), redirect_page(plot_url)).await?;
        info!(key = dataset.key(), %plot_url, "Plot pipeline finished");

        dataset.update_status("Finished");
        dataset.finish(1);
        Ok(job)
    }
}

/// Image files in the staging area, sorted by name for a stable upload
/// order. The manifest and the generated metadata file are bookkeeping,
/// not images, and are excluded.
fn list_images(staging: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(staging)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if name == defaults::MANIFEST_FILENAME || name == defaults::METADATA_FILENAME {
            continue;
        }
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

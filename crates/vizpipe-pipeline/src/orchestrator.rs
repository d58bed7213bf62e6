//! Remote plot orchestrator.
//!
//! Drives one plot job through its lifecycle against a [`PlotBackend`]:
//! multipart upload, job creation, then a fixed-interval poll until the
//! remote reports completion. The poll wait is bounded and cancellable —
//! an optional poll budget plus a watch-channel cancellation signal checked
//! every iteration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info};

use vizpipe_client::{PlotArgs, PlotBackend, PollOutcome, TriggerOutcome};
use vizpipe_core::{defaults, Error, PlotJob, Result};

/// Configuration for one orchestration run.
#[derive(Debug, Clone)]
pub struct PlotOptions {
    /// Maximum number of image files to upload (exclusive bound: exactly
    /// this many at most).
    pub max_images: usize,
    /// Plot-generation parameters forwarded to the remote service.
    pub args: PlotArgs,
    /// Interval between status polls.
    pub poll_interval: Duration,
    /// Maximum number of polls before giving up; `None` waits until
    /// cancellation.
    pub max_polls: Option<u32>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            max_images: defaults::DEFAULT_MAX_IMAGES,
            args: PlotArgs::default(),
            poll_interval: Duration::from_secs(defaults::POLL_INTERVAL_SECS),
            max_polls: None,
        }
    }
}

impl PlotOptions {
    /// Set the image cap. An amount of zero means "up to the hard cap".
    pub fn with_max_images(mut self, max_images: usize) -> Self {
        self.max_images = if max_images == 0 {
            defaults::MAX_IMAGES_CAP
        } else {
            max_images.min(defaults::MAX_IMAGES_CAP)
        };
        self
    }

    /// Set the plot-generation parameters.
    pub fn with_args(mut self, args: PlotArgs) -> Self {
        self.args = args;
        self
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Bound the number of polls.
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = Some(max_polls);
        self
    }
}

/// Orchestrates upload, trigger, and polling for one plot job.
pub struct PlotOrchestrator<B: PlotBackend> {
    backend: B,
    options: PlotOptions,
}

impl<B: PlotBackend> PlotOrchestrator<B> {
    /// Create an orchestrator with default options.
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, PlotOptions::default())
    }

    /// Create an orchestrator with explicit options.
    pub fn with_options(backend: B, options: PlotOptions) -> Self {
        Self { backend, options }
    }

    /// Run options.
    pub fn options(&self) -> &PlotOptions {
        &self.options
    }

    /// The backend this orchestrator drives.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run one job to completion and return it in the `Done` state with its
    /// result URL.
    ///
    /// A 403 on upload surfaces as [`Error::Forbidden`] before any polling.
    /// An unexpected trigger or poll response surfaces as [`Error::Job`];
    /// no result is produced for a failed remote job. Cancellation flips
    /// the watch channel to `true` and is checked every poll iteration.
    pub async fn generate(
        &self,
        metadata_path: &Path,
        image_paths: &[PathBuf],
        folder_name: &str,
        cancel: &mut watch::Receiver<bool>,
        status: &(dyn Fn(&str) + Send + Sync),
    ) -> Result<PlotJob> {
        let capped = &image_paths[..image_paths.len().min(self.options.max_images)];
        status("Uploading images to PixPlot");
        let receipt = self
            .backend
            .upload(metadata_path, capped, folder_name)
            .await?;

        status("Requesting PixPlot creation");
        let key = match self.backend.trigger(&receipt, &self.options.args).await? {
            TriggerOutcome::Accepted { key } => key,
            // A prior job for this folder is still in flight; the remote
            // keys plots by folder name, so poll under the dataset key.
            TriggerOutcome::AlreadyRunning => folder_name.to_string(),
        };
        let job = PlotJob::new(folder_name).running();

        status("PixPlot generating results");
        let mut polls: u32 = 0;
        loop {
            if *cancel.borrow() {
                return Err(Error::Cancelled("plot generation cancelled".to_string()));
            }
            if let Some(max_polls) = self.options.max_polls {
                if polls >= max_polls {
                    return Err(Error::Job(format!(
                        "no completion after {} status polls",
                        max_polls
                    )));
                }
            }

            tokio::select! {
                changed = cancel.changed() => {
                    match changed {
                        Ok(()) if *cancel.borrow() => {
                            return Err(Error::Cancelled(
                                "plot generation cancelled".to_string(),
                            ));
                        }
                        // Sender gone or a non-cancel update: wait out the
                        // interval before polling.
                        _ => sleep(self.options.poll_interval).await,
                    }
                }
                _ = sleep(self.options.poll_interval) => {}
            }

            polls += 1;
            match self.backend.status(&key).await? {
                PollOutcome::Running => {
                    debug!(%key, polls, "Plot job still running");
                    continue;
                }
                PollOutcome::Done => break,
                PollOutcome::Failed(body) => {
                    error!(%key, body = %body, "Plot job failed");
                    return Err(Error::Job(format!("remote plot job failed: {}", body)));
                }
            }
        }

        let result_url = self.backend.plot_url(folder_name);
        info!(%folder_name, url = %result_url, "Plot job complete");
        Ok(job.done(result_url))
    }
}

//! PixPlot backend implementation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use vizpipe_core::{defaults, Error, Result};

/// Plot-generation parameters appended to the job-creation request.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotArgs {
    /// Thumbnail cell size in pixels.
    pub cell_size: u32,
    /// UMAP nearest-neighbors parameter.
    pub n_neighbors: u32,
    /// UMAP minimum distance between points.
    pub min_dist: f64,
}

impl Default for PlotArgs {
    fn default() -> Self {
        Self {
            cell_size: defaults::DEFAULT_CELL_SIZE,
            n_neighbors: defaults::DEFAULT_N_NEIGHBORS,
            min_dist: defaults::DEFAULT_MIN_DIST,
        }
    }
}

/// Result of a successful upload.
///
/// The upload response carries the JSON body the client must POST back to
/// create the plot job; the client treats it as opaque apart from the
/// `args` array it extends.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    pub create_request: Value,
}

/// Outcome of the job-creation request.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    /// 202: a new job was accepted; poll with this key.
    Accepted { key: String },
    /// The service reported a job for this folder already exists; poll the
    /// existing job instead of re-triggering.
    AlreadyRunning,
}

/// One observation of a remote job's state.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Job still running; keep waiting.
    Running,
    /// Completion marker observed.
    Done,
    /// Terminal failure, with the raw response for the log.
    Failed(String),
}

/// Backend trait for the remote plot service.
#[async_trait]
pub trait PlotBackend: Send + Sync {
    /// Upload the metadata file and image files under the given folder name.
    async fn upload(
        &self,
        metadata_path: &Path,
        image_paths: &[PathBuf],
        folder_name: &str,
    ) -> Result<UploadReceipt>;

    /// Request plot creation from a prior upload's receipt.
    async fn trigger(&self, receipt: &UploadReceipt, args: &PlotArgs) -> Result<TriggerOutcome>;

    /// Fetch the current state of a job.
    async fn status(&self, key: &str) -> Result<PollOutcome>;

    /// URL of the finished plot for a folder.
    fn plot_url(&self, folder_name: &str) -> String;
}

/// Production client for a PixPlot server.
pub struct PixPlotClient {
    client: Client,
    base_url: String,
}

impl PixPlotClient {
    /// Create a client for the given server base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!(server = %base_url, "Initializing PixPlot client");
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Create from the `PIXPLOT_SERVER` environment variable.
    ///
    /// Returns `None` when the variable is unset or empty; the processor is
    /// unavailable without a configured server.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var(defaults::ENV_PIXPLOT_SERVER).ok()?;
        if base_url.is_empty() {
            return None;
        }
        Some(Self::new(base_url))
    }

    /// Server base URL (trailing slash stripped).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/api/{}", self.base_url, endpoint)
    }
}

/// Append the size/neighbor/distance arguments to a job-creation body.
///
/// The upload response is expected to carry an `args` array; one is created
/// when missing so a sparse response still round-trips.
fn append_plot_args(request: &mut Value, args: &PlotArgs) -> Result<()> {
    let obj = request.as_object_mut().ok_or_else(|| {
        Error::Serialization("job-creation body is not a JSON object".to_string())
    })?;
    let arg_list = obj
        .entry("args")
        .or_insert_with(|| Value::Array(Vec::new()));
    let arg_list = arg_list.as_array_mut().ok_or_else(|| {
        Error::Serialization("job-creation body has a non-array `args` field".to_string())
    })?;
    for (flag, value) in [
        ("--cell_size", args.cell_size.to_string()),
        ("--n_neighbors", args.n_neighbors.to_string()),
        ("--min_dist", args.min_dist.to_string()),
    ] {
        arg_list.push(Value::String(flag.to_string()));
        arg_list.push(Value::String(value));
    }
    Ok(())
}

/// Whether a free-text report field signals completion.
///
/// The service appends `Done!` (plus a trailing newline) to the report when
/// the build finishes without error.
fn report_complete(report: &str) -> bool {
    report.trim_end().ends_with("Done!")
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string())
}

#[async_trait]
impl PlotBackend for PixPlotClient {
    async fn upload(
        &self,
        metadata_path: &Path,
        image_paths: &[PathBuf],
        folder_name: &str,
    ) -> Result<UploadReceipt> {
        let url = self.api_url("send_photos");
        debug!(
            %url,
            folder = folder_name,
            image_count = image_paths.len(),
            "Uploading images to PixPlot"
        );

        let metadata_bytes = tokio::fs::read(metadata_path).await?;
        let mut form = Form::new().part(
            "metadata",
            Part::bytes(metadata_bytes).file_name(file_name_of(metadata_path)),
        );
        for path in image_paths {
            let bytes = tokio::fs::read(path).await?;
            form = form.part("images", Part::bytes(bytes).file_name(file_name_of(path)));
        }
        form = form.text("folder_name", folder_name.to_string());

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .timeout(Duration::from_secs(defaults::UPLOAD_TIMEOUT_SECS))
            .send()
            .await?;

        if response.status() == StatusCode::FORBIDDEN {
            return Err(Error::Forbidden(
                "no permission to use this PixPlot server".to_string(),
            ));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Request(format!(
                "upload returned {}: {}",
                status, body
            )));
        }

        let body: Value = response.json().await?;
        let create_request = body
            .get("create_pixplot_post_info")
            .and_then(|info| info.get("json"))
            .cloned()
            .ok_or_else(|| {
                Error::Serialization(
                    "upload response missing create_pixplot_post_info.json".to_string(),
                )
            })?;

        Ok(UploadReceipt { create_request })
    }

    async fn trigger(&self, receipt: &UploadReceipt, args: &PlotArgs) -> Result<TriggerOutcome> {
        let url = self.api_url("pixplot");
        let mut request = receipt.create_request.clone();
        append_plot_args(&mut request, args)?;

        debug!(%url, "Requesting plot creation");
        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();

        if status == StatusCode::ACCEPTED {
            let body: Value = response.json().await?;
            let key = body
                .get("key")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    Error::Serialization("202 response missing polling key".to_string())
                })?
                .to_string();
            info!(%key, "Plot job accepted");
            return Ok(TriggerOutcome::Accepted { key });
        }

        let body = response.text().await.unwrap_or_default();
        let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
        let error_message = parsed
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if error_message.contains("already exists") {
            // A prior job for this folder is still in flight; track it
            // instead of re-triggering.
            info!("Plot job already in flight, tracking existing job");
            return Ok(TriggerOutcome::AlreadyRunning);
        }

        warn!(%status, body = %body, "Unexpected plot creation response");
        Err(Error::Job(format!(
            "plot creation returned {}: {}",
            status, body
        )))
    }

    async fn status(&self, key: &str) -> Result<PollOutcome> {
        let url = self.api_url("pixplot");
        let response = self
            .client
            .get(&url)
            .query(&[("key", key)])
            .timeout(Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS))
            .send()
            .await?;
        let body: Value = response.json().await?;
        debug!(%key, body = %body, "Poll response");

        if body.get("status").and_then(Value::as_str) == Some("running") {
            return Ok(PollOutcome::Running);
        }
        if let Some(report) = body.get("report").and_then(Value::as_str) {
            if report_complete(report) {
                return Ok(PollOutcome::Done);
            }
        }
        Ok(PollOutcome::Failed(body.to_string()))
    }

    fn plot_url(&self, folder_name: &str) -> String {
        format!("{}/plots/{}/index.html", self.base_url, folder_name)
    }
}

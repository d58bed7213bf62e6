//! Mock plot backend for deterministic testing.
//!
//! Scripts the three HTTP exchanges of the real service so orchestration
//! logic can be tested without a server: upload outcome, trigger outcome,
//! and a queue of poll observations. Every call is logged for assertions.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use vizpipe_core::{Error, Result};

use crate::pixplot::{PlotArgs, PlotBackend, PollOutcome, TriggerOutcome, UploadReceipt};

/// A logged backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Upload {
        image_count: usize,
        folder_name: String,
    },
    Trigger,
    Status {
        key: String,
    },
}

#[derive(Debug)]
struct MockState {
    upload_forbidden: bool,
    already_running: bool,
    trigger_key: String,
    statuses: VecDeque<PollOutcome>,
    calls: Vec<MockCall>,
    uploaded_images: Vec<PathBuf>,
    uploaded_metadata: Option<Vec<u8>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            upload_forbidden: false,
            already_running: false,
            trigger_key: "mock-key".to_string(),
            statuses: VecDeque::new(),
            calls: Vec::new(),
            uploaded_images: Vec::new(),
            uploaded_metadata: None,
        }
    }
}

/// Mock implementation of [`PlotBackend`].
#[derive(Clone, Default)]
pub struct MockPlotBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockPlotBackend {
    /// Create a mock that accepts the upload, accepts the trigger with key
    /// `mock-key`, and reports `Done` on the first poll.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the upload with a 403-equivalent error.
    pub fn with_upload_forbidden(self) -> Self {
        self.state.lock().unwrap().upload_forbidden = true;
        self
    }

    /// Answer the trigger with an "already exists" outcome.
    pub fn with_already_running(self) -> Self {
        self.state.lock().unwrap().already_running = true;
        self
    }

    /// Set the polling key returned on a 202 trigger.
    pub fn with_trigger_key(self, key: impl Into<String>) -> Self {
        self.state.lock().unwrap().trigger_key = key.into();
        self
    }

    /// Script the sequence of poll observations. Once exhausted, further
    /// polls report `Done`.
    pub fn with_statuses(self, statuses: impl IntoIterator<Item = PollOutcome>) -> Self {
        self.state.lock().unwrap().statuses = statuses.into_iter().collect();
        self
    }

    /// All calls made against this backend, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Image paths passed to the upload call.
    pub fn uploaded_images(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().uploaded_images.clone()
    }

    /// Contents of the uploaded metadata file, when it existed on disk at
    /// upload time.
    pub fn uploaded_metadata(&self) -> Option<Vec<u8>> {
        self.state.lock().unwrap().uploaded_metadata.clone()
    }
}

#[async_trait]
impl PlotBackend for MockPlotBackend {
    async fn upload(
        &self,
        metadata_path: &Path,
        image_paths: &[PathBuf],
        folder_name: &str,
    ) -> Result<UploadReceipt> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::Upload {
            image_count: image_paths.len(),
            folder_name: folder_name.to_string(),
        });
        state.uploaded_images = image_paths.to_vec();
        state.uploaded_metadata = std::fs::read(metadata_path).ok();
        if state.upload_forbidden {
            return Err(Error::Forbidden(
                "no permission to use this PixPlot server".to_string(),
            ));
        }
        Ok(UploadReceipt {
            create_request: json!({"args": ["--folder", folder_name]}),
        })
    }

    async fn trigger(&self, _receipt: &UploadReceipt, _args: &PlotArgs) -> Result<TriggerOutcome> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::Trigger);
        if state.already_running {
            Ok(TriggerOutcome::AlreadyRunning)
        } else {
            Ok(TriggerOutcome::Accepted {
                key: state.trigger_key.clone(),
            })
        }
    }

    async fn status(&self, key: &str) -> Result<PollOutcome> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::Status {
            key: key.to_string(),
        });
        Ok(state.statuses.pop_front().unwrap_or(PollOutcome::Done))
    }

    fn plot_url(&self, folder_name: &str) -> String {
        format!("http://mock.plot/plots/{}/index.html", folder_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_happy_path() {
        let backend = MockPlotBackend::new().with_trigger_key("k1");

        let receipt = backend
            .upload(
                Path::new("metadata.csv"),
                &[PathBuf::from("a.jpg"), PathBuf::from("b.jpg")],
                "folder-1",
            )
            .await
            .unwrap();
        let outcome = backend
            .trigger(&receipt, &PlotArgs::default())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            TriggerOutcome::Accepted {
                key: "k1".to_string()
            }
        );
        assert_eq!(backend.status("k1").await.unwrap(), PollOutcome::Done);

        let calls = backend.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[0],
            MockCall::Upload {
                image_count: 2,
                folder_name: "folder-1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_mock_upload_forbidden() {
        let backend = MockPlotBackend::new().with_upload_forbidden();
        let err = backend
            .upload(Path::new("metadata.csv"), &[], "folder-1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_mock_scripted_statuses() {
        let backend = MockPlotBackend::new().with_statuses([
            PollOutcome::Running,
            PollOutcome::Running,
            PollOutcome::Done,
        ]);
        assert_eq!(backend.status("k").await.unwrap(), PollOutcome::Running);
        assert_eq!(backend.status("k").await.unwrap(), PollOutcome::Running);
        assert_eq!(backend.status("k").await.unwrap(), PollOutcome::Done);
        // Exhausted queue keeps reporting Done.
        assert_eq!(backend.status("k").await.unwrap(), PollOutcome::Done);
    }

    #[tokio::test]
    async fn test_mock_already_running() {
        let backend = MockPlotBackend::new().with_already_running();
        let receipt = UploadReceipt {
            create_request: json!({}),
        };
        let outcome = backend
            .trigger(&receipt, &PlotArgs::default())
            .await
            .unwrap();
        assert_eq!(outcome, TriggerOutcome::AlreadyRunning);
    }
}

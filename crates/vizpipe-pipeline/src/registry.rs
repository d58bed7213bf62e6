//! Image registry loader.
//!
//! Parses the per-image download manifest (a JSON object keyed by source
//! URL) into two in-memory structures: the insertion-ordered registry of
//! [`ImageMetadata`] entries, one per successfully downloaded image, and
//! the post-id index mapping each post id to the filenames it references.
//! The relationship is many-to-many: one post may carry several images and
//! one image may appear in several posts.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use vizpipe_core::{DownloadRecord, Error, ImageMetadata, Result};

/// Counters describing how the manifest was consumed.
///
/// Loading is permissive: incomplete records are dropped rather than
/// aborting the run, but every drop is counted so the processor can surface
/// it in status reporting instead of losing data silently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadDiagnostics {
    /// Images registered (successful downloads with complete records).
    pub images: usize,
    /// Failed downloads, excluded by contract.
    pub failed_downloads: usize,
    /// Records skipped for missing `filename`/`post_ids` or a shape the
    /// manifest parser could not read.
    pub skipped_records: usize,
}

/// In-memory join target for the source scan.
#[derive(Debug, Default)]
pub struct ImageRegistry {
    images: Vec<ImageMetadata>,
    by_filename: HashMap<String, usize>,
    post_index: HashMap<String, Vec<String>>,
}

impl ImageRegistry {
    /// Load a manifest from its JSON document.
    ///
    /// For every record with `success = true`, one registry entry is
    /// created keyed by filename, with the description seeded from the
    /// record's post count and the permalink set to the source URL. Every
    /// post id gains the filename in the post index, preserving order and
    /// allowing the same filename under multiple ids.
    pub fn from_manifest_value(manifest: &Value) -> Result<(Self, LoadDiagnostics)> {
        let entries = manifest.as_object().ok_or_else(|| {
            Error::InvalidInput("download manifest must be a JSON object".to_string())
        })?;

        let mut registry = Self::default();
        let mut diagnostics = LoadDiagnostics::default();

        for (url, entry) in entries {
            let record: DownloadRecord = match serde_json::from_value(entry.clone()) {
                Ok(record) => record,
                Err(e) => {
                    warn!(%url, error = %e, "Unreadable manifest record, skipping");
                    diagnostics.skipped_records += 1;
                    continue;
                }
            };
            if !record.success {
                diagnostics.failed_downloads += 1;
                continue;
            }
            let (filename, post_ids) = match (record.filename, record.post_ids) {
                (Some(filename), Some(post_ids)) => (filename, post_ids),
                _ => {
                    warn!(%url, "Manifest record missing filename or post_ids, skipping");
                    diagnostics.skipped_records += 1;
                    continue;
                }
            };

            for post_id in &post_ids {
                registry
                    .post_index
                    .entry(post_id.as_key())
                    .or_default()
                    .push(filename.clone());
            }

            let metadata = ImageMetadata {
                filename: filename.clone(),
                permalink: url.clone(),
                description: format!("<b>Num of Post(s) w/ Image:</b> {}", post_ids.len()),
                tags: Vec::new(),
                number_of_posts: 0,
                year: None,
            };
            match registry.by_filename.get(&filename) {
                // A later manifest entry for the same filename replaces the
                // earlier one but keeps its position.
                Some(&index) => registry.images[index] = metadata,
                None => {
                    registry.by_filename.insert(filename, registry.images.len());
                    registry.images.push(metadata);
                }
            }
        }

        diagnostics.images = registry.images.len();
        debug!(
            images = diagnostics.images,
            failed = diagnostics.failed_downloads,
            skipped = diagnostics.skipped_records,
            "Loaded download manifest"
        );
        Ok((registry, diagnostics))
    }

    /// Load a manifest from a file on disk.
    pub fn from_manifest_file(path: &Path) -> Result<(Self, LoadDiagnostics)> {
        let contents = std::fs::read_to_string(path)?;
        let manifest: Value = serde_json::from_str(&contents)?;
        Self::from_manifest_value(&manifest)
    }

    /// Number of registered images.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether no image survived the manifest.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Registered images in insertion order.
    pub fn images(&self) -> impl Iterator<Item = &ImageMetadata> {
        self.images.iter()
    }

    /// Look up one image by filename.
    pub fn get(&self, filename: &str) -> Option<&ImageMetadata> {
        self.by_filename
            .get(filename)
            .map(|&index| &self.images[index])
    }

    /// Mutable lookup, used by the scanner during its pass.
    pub(crate) fn get_mut(&mut self, filename: &str) -> Option<&mut ImageMetadata> {
        let index = *self.by_filename.get(filename)?;
        Some(&mut self.images[index])
    }

    /// Filenames associated with a post id, in manifest order.
    pub fn filenames_for_post(&self, post_id: &str) -> Option<&[String]> {
        self.post_index.get(post_id).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn load(manifest: Value) -> (ImageRegistry, LoadDiagnostics) {
        ImageRegistry::from_manifest_value(&manifest).unwrap()
    }

    #[test]
    fn test_successful_record_registered() {
        let (registry, diagnostics) = load(json!({
            "http://img/a": {"success": true, "filename": "a.jpg", "post_ids": ["1", "2"]}
        }));

        assert_eq!(registry.len(), 1);
        assert_eq!(diagnostics.images, 1);
        let image = registry.get("a.jpg").unwrap();
        assert_eq!(image.permalink, "http://img/a");
        assert_eq!(image.description, "<b>Num of Post(s) w/ Image:</b> 2");
        assert_eq!(image.number_of_posts, 0);
        assert!(image.year.is_none());
        assert_eq!(registry.filenames_for_post("1").unwrap(), ["a.jpg"]);
        assert_eq!(registry.filenames_for_post("2").unwrap(), ["a.jpg"]);
    }

    #[test]
    fn test_failed_download_excluded() {
        let (registry, diagnostics) = load(json!({
            "http://img/a": {"success": false, "filename": "a.jpg", "post_ids": ["1"]},
            "http://img/b": {"success": true, "filename": "b.jpg", "post_ids": ["1"]}
        }));

        assert_eq!(registry.len(), 1);
        assert!(registry.get("a.jpg").is_none());
        assert_eq!(diagnostics.failed_downloads, 1);
        assert_eq!(registry.filenames_for_post("1").unwrap(), ["b.jpg"]);
    }

    #[test]
    fn test_incomplete_record_counted_not_fatal() {
        let (registry, diagnostics) = load(json!({
            "http://img/a": {"success": true, "post_ids": ["1"]},
            "http://img/b": {"success": true, "filename": "b.jpg"},
            "http://img/c": {"success": true, "filename": "c.jpg", "post_ids": ["9"]}
        }));

        assert_eq!(registry.len(), 1);
        assert_eq!(diagnostics.skipped_records, 2);
        assert!(registry.get("c.jpg").is_some());
    }

    #[test]
    fn test_unreadable_record_counted() {
        let (registry, diagnostics) = load(json!({
            "http://img/a": {"success": true, "filename": "a.jpg", "post_ids": "not-a-list"},
            "http://img/b": {"success": true, "filename": "b.jpg", "post_ids": ["1"]}
        }));

        assert_eq!(registry.len(), 1);
        assert_eq!(diagnostics.skipped_records, 1);
    }

    #[test]
    fn test_numeric_post_ids_normalized() {
        let (registry, _) = load(json!({
            "http://img/a": {"success": true, "filename": "a.jpg", "post_ids": [7, "8"]}
        }));

        assert_eq!(registry.filenames_for_post("7").unwrap(), ["a.jpg"]);
        assert_eq!(registry.filenames_for_post("8").unwrap(), ["a.jpg"]);
    }

    #[test]
    fn test_shared_post_id_preserves_order() {
        let (registry, _) = load(json!({
            "http://img/a": {"success": true, "filename": "a.jpg", "post_ids": ["1"]},
            "http://img/b": {"success": true, "filename": "b.jpg", "post_ids": ["1"]}
        }));

        assert_eq!(registry.filenames_for_post("1").unwrap(), ["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_insertion_order_kept_for_serialization() {
        let (registry, _) = load(json!({
            "http://img/z": {"success": true, "filename": "z.jpg", "post_ids": ["1"]},
            "http://img/a": {"success": true, "filename": "a.jpg", "post_ids": ["2"]}
        }));

        let order: Vec<&str> = registry.images().map(|i| i.filename.as_str()).collect();
        assert_eq!(order, ["z.jpg", "a.jpg"]);
    }

    #[test]
    fn test_manifest_must_be_object() {
        let err = ImageRegistry::from_manifest_value(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_empty_manifest() {
        let (registry, diagnostics) = load(json!({}));
        assert!(registry.is_empty());
        assert_eq!(diagnostics, LoadDiagnostics::default());
    }
}

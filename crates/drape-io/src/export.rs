//! Result download and sharing.
//!
//! Both exports act on a completed [`PipelineState`]. Download writes
//! the composed image to disk under a fixed base name. Sharing hands a
//! small payload to a [`ShareTarget`]; a failed share is reported by a
//! `false` return and a log line, never an error.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use drape_pipeline::{PipelineState, Stage};
use serde::{Deserialize, Serialize};

/// Base file name of a downloaded result, without extension.
pub const RESULT_BASENAME: &str = "virtual-tryon-result";

/// Default share title.
pub const DEFAULT_SHARE_TITLE: &str = "My Virtual Try-On";

/// Default share text.
pub const DEFAULT_SHARE_TEXT: &str = "Check out how I look in this outfit!";

/// Errors from [`download_result`].
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The pipeline has not completed, so there is nothing to export.
    #[error("no result to export (pipeline is {0})")]
    NoResult(Stage),

    /// Writing the file failed.
    #[error("failed to write {path}: {source}")]
    Io {
        /// Destination that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// File name for a result of the given extension.
#[must_use]
pub fn result_filename(extension: &str) -> String {
    format!("{RESULT_BASENAME}.{extension}")
}

/// Write the completed result into `dir`.
///
/// The file is named `virtual-tryon-result.<ext>`, where `<ext>` follows
/// the result's MIME type. An existing file of that name is replaced.
///
/// # Errors
///
/// Returns [`ExportError::NoResult`] unless `state` is complete, and
/// [`ExportError::Io`] if the file cannot be written.
pub async fn download_result(state: &PipelineState, dir: &Path) -> Result<PathBuf, ExportError> {
    let result = state.result().ok_or(ExportError::NoResult(state.stage()))?;
    let path = dir.join(result_filename(result.extension()));
    tokio::fs::write(&path, result.bytes())
        .await
        .map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
    tracing::info!(path = %path.display(), bytes = result.bytes().len(), "result downloaded");
    Ok(path)
}

/// What gets handed to a share target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharePayload {
    /// Headline shown by the share sheet.
    pub title: String,
    /// Message body accompanying the link.
    pub text: String,
    /// Reference to the page or resource being shared.
    pub url: String,
}

impl SharePayload {
    /// The default payload pointing at `url`.
    #[must_use]
    pub fn for_page(url: impl Into<String>) -> Self {
        Self {
            title: DEFAULT_SHARE_TITLE.to_owned(),
            text: DEFAULT_SHARE_TEXT.to_owned(),
            url: url.into(),
        }
    }
}

/// Errors a share target may report.
#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    /// Sharing is not available in this environment.
    #[error("sharing is not supported")]
    Unsupported,

    /// The user dismissed the share.
    #[error("share was cancelled")]
    Cancelled,

    /// The target failed.
    #[error("share failed: {0}")]
    Failed(String),
}

/// A destination for share payloads.
#[async_trait]
pub trait ShareTarget: Send + Sync {
    /// Deliver `payload`.
    ///
    /// # Errors
    ///
    /// Returns a [`ShareError`] when the payload was not delivered.
    async fn share(&self, payload: &SharePayload) -> Result<(), ShareError>;
}

/// Offer `payload` to `target`.
///
/// Returns whether the share went through. Failures are logged and
/// otherwise ignored.
pub async fn share_result(target: &dyn ShareTarget, payload: &SharePayload) -> bool {
    match target.share(payload).await {
        Ok(()) => {
            tracing::info!(url = %payload.url, "result shared");
            true
        }
        Err(err) => {
            tracing::warn!(error = %err, "share failed");
            false
        }
    }
}

/// Share target that writes the payload as pretty JSON to a file.
#[derive(Debug, Clone)]
pub struct FileShareTarget {
    path: PathBuf,
}

impl FileShareTarget {
    /// A target that writes payloads to `path`, replacing any existing file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Destination file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ShareTarget for FileShareTarget {
    async fn share(&self, payload: &SharePayload) -> Result<(), ShareError> {
        let json =
            serde_json::to_vec_pretty(payload).map_err(|e| ShareError::Failed(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| ShareError::Failed(format!("{}: {e}", self.path.display())))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use drape_pipeline::ComposedImage;

    use super::*;

    fn completed(mime_type: &str) -> PipelineState {
        let mut state = PipelineState::idle().start(true).unwrap().state;
        while let Some(next) = state.advance() {
            state = next.state;
        }
        state
            .complete(ComposedImage::new(mime_type, vec![9u8, 8, 7]))
            .unwrap()
            .state
    }

    struct Refusing;

    #[async_trait]
    impl ShareTarget for Refusing {
        async fn share(&self, _payload: &SharePayload) -> Result<(), ShareError> {
            Err(ShareError::Unsupported)
        }
    }

    #[test]
    fn filename_uses_fixed_basename() {
        assert_eq!(result_filename("png"), "virtual-tryon-result.png");
    }

    #[test]
    fn payload_defaults() {
        let payload = SharePayload::for_page("https://example.test/tryon");
        assert_eq!(payload.title, "My Virtual Try-On");
        assert_eq!(payload.text, "Check out how I look in this outfit!");
        assert_eq!(payload.url, "https://example.test/tryon");
    }

    #[tokio::test]
    async fn download_writes_result_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = download_result(&completed("image/png"), dir.path())
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("virtual-tryon-result.png"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![9u8, 8, 7]);
    }

    #[tokio::test]
    async fn download_extension_follows_mime_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = download_result(&completed("image/jpeg"), dir.path())
            .await
            .unwrap();
        assert_eq!(path.extension().unwrap(), "jpg");
    }

    #[tokio::test]
    async fn download_without_result_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = download_result(&PipelineState::idle(), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::NoResult(Stage::Idle)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn download_into_missing_dir_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = download_result(&completed("image/png"), &missing)
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
    }

    #[tokio::test]
    async fn failed_share_is_swallowed() {
        let payload = SharePayload::for_page("https://example.test");
        assert!(!share_result(&Refusing, &payload).await);
    }

    #[tokio::test]
    async fn file_share_writes_payload_json() {
        let dir = tempfile::tempdir().unwrap();
        let target = FileShareTarget::new(dir.path().join("share.json"));
        let payload = SharePayload::for_page("https://example.test");
        assert!(share_result(&target, &payload).await);

        let written: SharePayload =
            serde_json::from_slice(&std::fs::read(target.path()).unwrap()).unwrap();
        assert_eq!(written, payload);
    }
}

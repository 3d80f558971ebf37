//! Preview decoding off the async executor.

use drape_pipeline::{ImageInput, Preview};

/// Errors from background preview work.
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    /// The blocking task panicked or was cancelled.
    #[error("preview task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Build the preview for `input` on the blocking pool.
///
/// Base64 encoding and header probing scale with the file size, so they
/// run via `spawn_blocking` rather than on a runtime worker.
///
/// # Errors
///
/// Returns [`PreviewError::Task`] if the blocking task does not finish.
pub async fn decode_preview(input: &ImageInput) -> Result<Preview, PreviewError> {
    let mime_type = input.mime_type().to_owned();
    let bytes = input.shared_bytes();
    let preview =
        tokio::task::spawn_blocking(move || Preview::encode(&mime_type, &bytes)).await?;
    Ok(preview)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use drape_pipeline::{CandidateFile, InputSlots, Role};

    use super::*;

    #[tokio::test]
    async fn preview_is_a_data_url_of_the_input() {
        let mut slots = InputSlots::new();
        let accepted = slots
            .submit(
                Role::Garment,
                CandidateFile::new("shirt.gif", "image/gif", b"abc".to_vec()),
            )
            .unwrap();
        let preview = decode_preview(&accepted.input).await.unwrap();
        assert_eq!(preview.data_url, "data:image/gif;base64,YWJj");
        assert_eq!(preview.dimensions, None);
    }
}

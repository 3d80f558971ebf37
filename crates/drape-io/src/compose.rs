//! The composition backend boundary.
//!
//! The session never composes images itself. In the final processing
//! stage it hands the captured person and garment inputs to a
//! [`CompositionService`] and waits (bounded by the configured timeout)
//! for a [`ComposedImage`]. A real backend would call out to a model
//! server; [`PlaceholderCompositor`] stands in when none is configured.

use std::time::Duration;

use async_trait::async_trait;
use drape_pipeline::{
    ComposedImage, CompositionFailure, FailureKind, ImageInput, PipelineError, render_placeholder,
};

/// Errors a composition backend may report.
#[derive(Debug, thiserror::Error)]
pub enum CompositionError {
    /// The backend refused the inputs (wrong content, unsupported format).
    #[error("unsupported input: {0}")]
    Unsupported(String),

    /// The backend could not be reached or failed internally.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend did not answer in time.
    #[error("composition timed out after {0:?}")]
    Timeout(Duration),
}

impl From<&CompositionError> for CompositionFailure {
    fn from(err: &CompositionError) -> Self {
        let kind = match err {
            CompositionError::Unsupported(_) => FailureKind::Unsupported,
            CompositionError::Unavailable(_) => FailureKind::Unavailable,
            CompositionError::Timeout(_) => FailureKind::Timeout,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

impl From<PipelineError> for CompositionError {
    fn from(err: PipelineError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Something that turns a person image and a garment image into a
/// composed try-on image.
#[async_trait]
pub trait CompositionService: Send + Sync {
    /// Compose `garment` onto `person`.
    ///
    /// # Errors
    ///
    /// Returns a [`CompositionError`] describing why no image was
    /// produced. The session maps it into the `failed` state.
    async fn compose(
        &self,
        person: &ImageInput,
        garment: &ImageInput,
    ) -> Result<ComposedImage, CompositionError>;
}

/// Backend that ignores its inputs and returns a flat placeholder PNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderCompositor {
    latency: Duration,
}

impl PlaceholderCompositor {
    /// A placeholder backend that answers immediately.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            latency: Duration::ZERO,
        }
    }

    /// A placeholder backend that waits `latency` before answering.
    #[must_use]
    pub const fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }

    /// Configured answer delay.
    #[must_use]
    pub const fn latency(&self) -> Duration {
        self.latency
    }
}

#[async_trait]
impl CompositionService for PlaceholderCompositor {
    async fn compose(
        &self,
        _person: &ImageInput,
        _garment: &ImageInput,
    ) -> Result<ComposedImage, CompositionError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(render_placeholder()?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use drape_pipeline::{CandidateFile, InputSlots, Role};

    use super::*;

    fn staged_pair() -> (ImageInput, ImageInput) {
        let mut slots = InputSlots::new();
        let _ = slots.submit(
            Role::Person,
            CandidateFile::new("me.png", "image/png", vec![1, 2, 3]),
        );
        let _ = slots.submit(
            Role::Garment,
            CandidateFile::new("shirt.jpg", "image/jpeg", vec![4, 5]),
        );
        slots.pair().unwrap()
    }

    #[test]
    fn errors_map_to_failure_kinds() {
        let cases = [
            (
                CompositionError::Unsupported("no person found".into()),
                FailureKind::Unsupported,
            ),
            (
                CompositionError::Unavailable("503".into()),
                FailureKind::Unavailable,
            ),
            (
                CompositionError::Timeout(Duration::from_secs(30)),
                FailureKind::Timeout,
            ),
        ];
        for (err, kind) in cases {
            let failure = CompositionFailure::from(&err);
            assert_eq!(failure.kind, kind);
            assert_eq!(failure.message, err.to_string());
        }
    }

    #[tokio::test]
    async fn placeholder_returns_png_immediately() {
        let (person, garment) = staged_pair();
        let result = PlaceholderCompositor::new()
            .compose(&person, &garment)
            .await
            .unwrap();
        assert_eq!(result.mime_type(), "image/png");
        assert_eq!(result, render_placeholder().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn placeholder_waits_for_its_latency() {
        let (person, garment) = staged_pair();
        let compositor = PlaceholderCompositor::with_latency(Duration::from_secs(2));
        let started = tokio::time::Instant::now();
        compositor.compose(&person, &garment).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}

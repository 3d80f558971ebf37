//! Shared types for the drape try-on pipeline.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// MIME filter advertised to file choosers.
pub const ACCEPT_FILTER: &str = "image/*";

/// Upload size communicated to users (10 MiB).
///
/// Informational only: submissions larger than this are still accepted.
pub const ADVERTISED_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// One of the two fixed input slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The photo of the person trying the garment on.
    Person,
    /// The garment to be fitted.
    Garment,
}

impl Role {
    /// Both roles, person first.
    pub const ALL: [Self; 2] = [Self::Person, Self::Garment];

    /// Lowercase name used in logs and wire formats.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Garment => "garment",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one accepted submission.
///
/// Ids increase monotonically per [`InputSlots`](crate::InputSlots), so a
/// preview produced for a replaced input can be recognised as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InputId(pub(crate) u64);

impl InputId {
    /// The raw counter value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A user-chosen file before validation.
///
/// The chooser and drag-and-drop paths both produce one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// File name as reported by the source.
    pub name: String,
    /// MIME type as reported by the source.
    pub mime_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl CandidateFile {
    /// Create a candidate with an explicit MIME type.
    #[must_use]
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Create a candidate whose MIME type is guessed from the file
    /// extension, the way a browser reports `File.type`.
    ///
    /// Unknown extensions report `application/octet-stream`.
    #[must_use]
    pub fn from_name(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = mime_for_filename(&name).to_owned();
        Self {
            name,
            mime_type,
            bytes,
        }
    }
}

/// Guess a MIME type from a file name's extension.
#[must_use]
pub fn mime_for_filename(name: &str) -> &'static str {
    name.rsplit_once('.')
        .and_then(|(_, ext)| image::ImageFormat::from_extension(ext))
        .map_or("application/octet-stream", |format| format.to_mime_type())
}

/// Whether a reported MIME type passes the acceptance gate.
///
/// This prefix check is the only validation performed on submissions.
#[must_use]
pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}

/// A validated, staged input image.
///
/// Never mutated after creation: a later valid submission for the same
/// role replaces it wholesale. The bytes are shared, so clones handed to
/// a running pipeline are cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub(crate) id: InputId,
    pub(crate) role: Role,
    pub(crate) name: String,
    pub(crate) mime_type: String,
    pub(crate) bytes: Arc<[u8]>,
}

impl ImageInput {
    /// Identity of this submission.
    #[must_use]
    pub const fn id(&self) -> InputId {
        self.id
    }

    /// The slot this input occupies.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Original file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reported MIME type (always starts with `image/`).
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Raw file contents.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the raw file contents.
    #[must_use]
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    /// Size of the file in bytes. Informational only.
    #[must_use]
    pub fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Size formatted as megabytes with two decimals, e.g. `"1.25 MB"`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn size_mb(&self) -> String {
        format!("{:.2} MB", self.byte_size() as f64 / 1024.0 / 1024.0)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// The composed output of a completed run.
///
/// Opaque to the pipeline: the bytes are only handed on to exporters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedImage {
    mime_type: String,
    bytes: Arc<[u8]>,
}

impl ComposedImage {
    /// Wrap encoded image bytes.
    #[must_use]
    pub fn new(mime_type: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// MIME type of the encoded bytes.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Encoded image bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Preferred file extension for the MIME type, `bin` when unknown.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        image::ImageFormat::from_mime_type(&self.mime_type)
            .and_then(|format| format.extensions_str().first().copied())
            .unwrap_or("bin")
    }
}

/// Why the composition backend did not produce a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// The backend rejected the input content.
    Unsupported,
    /// The backend could not be reached or errored internally.
    Unavailable,
    /// The backend did not answer within the configured timeout.
    Timeout,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unsupported => "unsupported input",
            Self::Unavailable => "backend unavailable",
            Self::Timeout => "timed out",
        })
    }
}

/// Cause carried by the `failed` state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionFailure {
    /// Failure category.
    pub kind: FailureKind,
    /// Backend-provided detail.
    pub message: String,
}

impl fmt::Display for CompositionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Errors from the pure pipeline helpers.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Encoding an image in memory failed.
    #[error("failed to encode image: {0}")]
    ImageEncode(#[from] image::ImageError),
}

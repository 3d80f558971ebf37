//! drape-io: Async shell around the try-on pipeline.
//!
//! Owns everything that waits or touches the outside world: the
//! [`Session`] handle that drives runs on tokio, the
//! [`CompositionService`] boundary and its placeholder, background
//! preview decoding, result download and sharing, and the session
//! configuration.

pub mod compose;
pub mod config;
pub mod export;
pub mod preview;
pub mod session;

pub use compose::{CompositionError, CompositionService, PlaceholderCompositor};
pub use config::{ConfigError, SessionConfig};
pub use export::{
    ExportError, FileShareTarget, RESULT_BASENAME, ShareError, SharePayload, ShareTarget,
    download_result, result_filename, share_result,
};
pub use preview::{PreviewError, decode_preview};
pub use session::{RunHandle, Session, SessionEvent};

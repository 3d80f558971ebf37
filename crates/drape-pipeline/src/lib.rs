//! drape-pipeline: Pure try-on pipeline state machine (sans-IO).
//!
//! Models the two input slots (person and garment), the fixed sequence
//! of processing stages a try-on run passes through, and the read-only
//! state snapshot consumers render:
//!
//! idle -> uploading -> segmenting -> pose-detection ->
//! garment-extraction -> alignment -> blending -> complete | failed
//!
//! This crate has **no async runtime and no I/O** -- every operation is a
//! synchronous function over in-memory values that returns the next
//! state together with the events it produced. Waiting, the composition
//! backend, previews on background tasks, and exports live in `drape-io`.

pub mod ingest;
pub mod placeholder;
pub mod preview;
pub mod stage;
pub mod state;
pub mod types;

pub use ingest::{Accepted, IngestEvent, InputSlots};
pub use placeholder::render_placeholder;
pub use preview::Preview;
pub use stage::{POSITION_COUNT, PROCESSING_COUNT, Stage, StepStatus};
pub use state::{PipelineEvent, PipelineState, StateSummary, Transition};
pub use types::{
    ACCEPT_FILTER, ADVERTISED_MAX_BYTES, CandidateFile, ComposedImage, CompositionFailure,
    Dimensions, FailureKind, ImageInput, InputId, PipelineError, Role, is_image_mime,
    mime_for_filename,
};

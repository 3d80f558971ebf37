//! The try-on pipeline state machine.
//!
//! [`PipelineState`] is a plain value. Every transition is a pure method
//! that returns a [`Transition`] holding the next state and the events
//! the change produced, or `None` when the transition is not permitted
//! from the current stage. Refused transitions are not errors: the
//! caller simply keeps its current state.
//!
//! ```rust
//! # use drape_pipeline::{ComposedImage, PipelineState, Stage};
//! let mut state = PipelineState::idle();
//! state = state.start(true).map(|t| t.state).unwrap_or(state);
//! while let Some(next) = state.advance() {
//!     state = next.state;
//! }
//! assert_eq!(state.stage(), Stage::Blending);
//!
//! let result = ComposedImage::new("image/png", vec![0u8; 4]);
//! let done = state.complete(result).map(|t| t.state).unwrap_or(state);
//! assert_eq!(done.progress(), 100);
//! ```
//!
//! Invariants held by every reachable state:
//!
//! - `result` is present iff the stage is [`Stage::Complete`].
//! - `progress == 100` iff the stage is [`Stage::Complete`].
//! - `failure` is present iff the stage is [`Stage::Failed`].
//! - progress never decreases within a run; only [`PipelineState::reset`]
//!   and [`PipelineState::cancel`] bring it back to 0.

use serde::{Deserialize, Serialize};

use crate::stage::Stage;
use crate::types::{ComposedImage, CompositionFailure};

/// Read-only snapshot of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineState {
    stage: Stage,
    progress: u8,
    result: Option<ComposedImage>,
    failure: Option<CompositionFailure>,
}

/// Something consumers may want to react to.
///
/// `StageChanged` and `ProgressChanged` carry the snapshot after the
/// change, so subscribers never need to read back into the sequencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A run began from idle.
    RunStarted,
    /// The stage changed; carries the new snapshot.
    StageChanged(PipelineState),
    /// The progress value changed; carries the new snapshot.
    ProgressChanged(PipelineState),
    /// The run reached [`Stage::Complete`].
    RunCompleted,
    /// The run reached [`Stage::Failed`].
    RunFailed(CompositionFailure),
    /// An active run was abandoned and the pipeline returned to idle.
    RunCancelled,
    /// The pipeline was explicitly reset to idle.
    Reset,
}

/// Outcome of a permitted transition.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a transition does nothing until its state is stored"]
pub struct Transition {
    /// The state after the transition.
    pub state: PipelineState,
    /// Events emitted by the transition, in order.
    pub events: Vec<PipelineEvent>,
}

/// Compact, serializable summary of a snapshot for logs and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSummary {
    /// Current stage.
    pub stage: Stage,
    /// Progress percentage.
    pub progress: u8,
    /// MIME type of the result, when complete.
    pub result_mime_type: Option<String>,
    /// Size of the result in bytes, when complete.
    pub result_bytes: Option<usize>,
    /// Failure cause, when failed.
    pub failure: Option<CompositionFailure>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::idle()
    }
}

impl PipelineState {
    /// The initial state: idle, progress 0, no result.
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            stage: Stage::Idle,
            progress: 0,
            result: None,
            failure: None,
        }
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Progress percentage in `0..=100`.
    #[must_use]
    pub const fn progress(&self) -> u8 {
        self.progress
    }

    /// The composed image; present only when complete.
    #[must_use]
    pub const fn result(&self) -> Option<&ComposedImage> {
        self.result.as_ref()
    }

    /// The failure cause; present only when failed.
    #[must_use]
    pub const fn failure(&self) -> Option<&CompositionFailure> {
        self.failure.as_ref()
    }

    /// Whether a run is in one of its processing stages.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.stage.is_processing()
    }

    /// Whether [`start`](Self::start) would be permitted.
    #[must_use]
    pub const fn can_start(&self, inputs_ready: bool) -> bool {
        inputs_ready && matches!(self.stage, Stage::Idle)
    }

    /// Begin a run by entering the first processing stage.
    ///
    /// Permitted only from idle, and only when both inputs are staged.
    #[must_use]
    pub fn start(&self, inputs_ready: bool) -> Option<Transition> {
        if !self.can_start(inputs_ready) {
            return None;
        }
        let mut transition = Self::enter(Stage::Uploading);
        transition.events.insert(0, PipelineEvent::RunStarted);
        Some(transition)
    }

    /// Move from one processing stage to the next.
    ///
    /// Returns `None` outside the processing stages and at
    /// [`Stage::Blending`], which leaves only through
    /// [`complete`](Self::complete) or [`fail`](Self::fail).
    #[must_use]
    pub fn advance(&self) -> Option<Transition> {
        self.stage.next_processing().map(Self::enter)
    }

    /// Finish the run with the composed image.
    ///
    /// Permitted only from [`Stage::Blending`].
    #[must_use]
    pub fn complete(&self, result: ComposedImage) -> Option<Transition> {
        if self.stage != Stage::Blending {
            return None;
        }
        let state = Self {
            stage: Stage::Complete,
            progress: Stage::Complete.progress_on_entry(),
            result: Some(result),
            failure: None,
        };
        Some(Transition {
            events: vec![
                PipelineEvent::StageChanged(state.clone()),
                PipelineEvent::ProgressChanged(state.clone()),
                PipelineEvent::RunCompleted,
            ],
            state,
        })
    }

    /// End the run in [`Stage::Failed`] with `failure` as the cause.
    ///
    /// Permitted only from [`Stage::Blending`]. Progress stays where the
    /// run had reached, so no progress event is emitted.
    #[must_use]
    pub fn fail(&self, failure: CompositionFailure) -> Option<Transition> {
        if self.stage != Stage::Blending {
            return None;
        }
        let state = Self {
            stage: Stage::Failed,
            progress: self.progress,
            result: None,
            failure: Some(failure.clone()),
        };
        Some(Transition {
            events: vec![
                PipelineEvent::StageChanged(state.clone()),
                PipelineEvent::RunFailed(failure),
            ],
            state,
        })
    }

    /// Abandon an active run and return to idle.
    ///
    /// Permitted only while a processing stage is active.
    #[must_use]
    pub fn cancel(&self) -> Option<Transition> {
        if !self.is_running() {
            return None;
        }
        let mut transition = Self::back_to_idle();
        transition.events.insert(0, PipelineEvent::RunCancelled);
        Some(transition)
    }

    /// Return to idle from any state, dropping any result or failure.
    ///
    /// Staged inputs live outside the pipeline state and are not
    /// affected, so a new run can start straight away.
    pub fn reset(&self) -> Transition {
        let mut transition = Self::back_to_idle();
        transition.events.insert(0, PipelineEvent::Reset);
        transition
    }

    /// Serializable summary of this snapshot.
    #[must_use]
    pub fn summary(&self) -> StateSummary {
        StateSummary {
            stage: self.stage,
            progress: self.progress,
            result_mime_type: self.result.as_ref().map(|r| r.mime_type().to_owned()),
            result_bytes: self.result.as_ref().map(|r| r.bytes().len()),
            failure: self.failure.clone(),
        }
    }

    /// Enter a processing stage with its fixed progress value.
    fn enter(stage: Stage) -> Transition {
        let state = Self {
            stage,
            progress: stage.progress_on_entry(),
            result: None,
            failure: None,
        };
        Transition {
            events: vec![
                PipelineEvent::StageChanged(state.clone()),
                PipelineEvent::ProgressChanged(state.clone()),
            ],
            state,
        }
    }

    fn back_to_idle() -> Transition {
        let state = Self::idle();
        Transition {
            events: vec![
                PipelineEvent::StageChanged(state.clone()),
                PipelineEvent::ProgressChanged(state.clone()),
            ],
            state,
        }
    }
}

//! The try-on session: one owned handle around the input slots and the
//! pipeline state.
//!
//! [`Session`] is cheap to clone; every clone drives the same session.
//! All mutations go through one lock, and the events a mutation produces
//! are broadcast while that lock is held, so subscribers observe events
//! in the order the state changed.
//!
//! A started run is driven by a spawned task that sleeps through each
//! processing stage, then asks the [`CompositionService`] for the result.
//! Every run remembers the session generation it started under. `reset`
//! and `cancel` bump the generation; a run whose generation is no longer
//! current stops at its next suspension point without touching state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use drape_pipeline::{
    CandidateFile, CompositionFailure, ImageInput, IngestEvent, InputId, InputSlots,
    PipelineEvent, PipelineState, Preview, Role, Stage, Transition,
};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::compose::{CompositionError, CompositionService, PlaceholderCompositor};
use crate::config::SessionConfig;
use crate::preview::decode_preview;

/// Everything a session subscriber can be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// An input slot changed.
    Ingest(IngestEvent),
    /// The pipeline state changed.
    Pipeline(PipelineEvent),
}

#[derive(Debug, Default)]
struct Shared {
    slots: InputSlots,
    state: PipelineState,
}

struct Inner {
    config: SessionConfig,
    compositor: Arc<dyn CompositionService>,
    shared: Mutex<Shared>,
    events: broadcast::Sender<SessionEvent>,
    /// Bumped by `reset` and `cancel`; only written under `shared`.
    generation: watch::Sender<u64>,
}

/// Handle to a try-on session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.inner.config)
            .field("state", &self.snapshot().stage())
            .field("generation", &*self.inner.generation.borrow())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session that composes with `compositor`.
    #[must_use]
    pub fn new(config: SessionConfig, compositor: Arc<dyn CompositionService>) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (generation, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                config,
                compositor,
                shared: Mutex::new(Shared::default()),
                events,
                generation,
            }),
        }
    }

    /// Create a session backed by [`PlaceholderCompositor`].
    #[must_use]
    pub fn with_placeholder(config: SessionConfig) -> Self {
        Self::new(config, Arc::new(PlaceholderCompositor::new()))
    }

    /// The configuration this session was built with.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Receive every event emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Current pipeline state.
    #[must_use]
    pub fn snapshot(&self) -> PipelineState {
        self.lock().state.clone()
    }

    /// The input staged for `role`, if any.
    #[must_use]
    pub fn input(&self, role: Role) -> Option<ImageInput> {
        self.lock().slots.get(role).cloned()
    }

    /// The preview of the input staged for `role`, once it is ready.
    #[must_use]
    pub fn preview(&self, role: Role) -> Option<Preview> {
        self.lock().slots.preview(role).cloned()
    }

    /// Both staged inputs, person first. Kept across resets so a result
    /// can be shown next to what produced it.
    #[must_use]
    pub fn inputs(&self) -> (Option<ImageInput>, Option<ImageInput>) {
        let shared = self.lock();
        (
            shared.slots.get(Role::Person).cloned(),
            shared.slots.get(Role::Garment).cloned(),
        )
    }

    /// Whether both slots are filled.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.lock().slots.is_ready()
    }

    /// Offer `file` for `role`.
    ///
    /// Files whose MIME type does not start with `image/` are dropped:
    /// nothing changes, nothing is emitted, and `None` is returned. An
    /// accepted file replaces the slot's previous input and its preview
    /// is built in the background.
    pub fn submit(&self, role: Role, file: CandidateFile) -> Option<ImageInput> {
        let name = file.name.clone();
        let mime_type = file.mime_type.clone();
        let input = {
            let mut shared = self.lock();
            let Some(accepted) = shared.slots.submit(role, file) else {
                tracing::debug!(%role, %name, %mime_type, "ignored non-image submission");
                return None;
            };
            self.emit(SessionEvent::Ingest(accepted.event));
            accepted.input
        };
        tracing::info!(
            %role,
            id = %input.id(),
            name = input.name(),
            size = %input.size_mb(),
            "input accepted"
        );
        self.spawn_preview(input.clone());
        Some(input)
    }

    /// Clear the slot for `role`. Returns whether anything was removed.
    pub fn remove(&self, role: Role) -> bool {
        let mut shared = self.lock();
        match shared.slots.remove(role) {
            Some(event) => {
                tracing::debug!(%role, "input removed");
                self.emit(SessionEvent::Ingest(event));
                true
            }
            None => false,
        }
    }

    /// Begin a run with the currently staged inputs.
    ///
    /// Returns `None`, with no effect, unless the pipeline is idle and
    /// both inputs are staged. The run uses the inputs as they are at
    /// this moment; later submissions only affect the next run.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Option<RunHandle> {
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("start requested outside a tokio runtime");
            return None;
        };

        let (person, garment, generation) = {
            let mut guard = self.lock();
            let shared = &mut *guard;
            let transition = shared.state.start(shared.slots.is_ready())?;
            let (person, garment) = shared.slots.pair()?;
            self.apply(shared, transition);
            (person, garment, *self.inner.generation.borrow())
        };

        tracing::info!(
            person = person.name(),
            garment = garment.name(),
            generation,
            "try-on run started"
        );
        let task = runtime.spawn(self.clone().drive(person, garment, generation));
        Some(RunHandle {
            session: self.clone(),
            task,
        })
    }

    /// Return to idle from any state, dropping any result or failure.
    ///
    /// An active run is abandoned. Staged inputs are kept.
    pub fn reset(&self) {
        let mut guard = self.lock();
        let shared = &mut *guard;
        let was = shared.state.stage();
        self.inner.generation.send_modify(|g| *g += 1);
        let transition = shared.state.reset();
        self.apply(shared, transition);
        tracing::info!(from = %was, "pipeline reset");
    }

    /// Abandon the active run, if any, and return to idle.
    ///
    /// Returns whether a run was cancelled.
    pub fn cancel(&self) -> bool {
        let mut guard = self.lock();
        let shared = &mut *guard;
        let Some(transition) = shared.state.cancel() else {
            return false;
        };
        let at = shared.state.stage();
        self.inner.generation.send_modify(|g| *g += 1);
        self.apply(shared, transition);
        tracing::warn!(%at, "try-on run cancelled");
        true
    }

    async fn drive(self, person: ImageInput, garment: ImageInput, generation: u64) -> PipelineState {
        let mut superseded = self.inner.generation.subscribe();
        let stage_delay = self.inner.config.stage_delay;

        // Every processing stage, blending included, holds for its wait
        // before the next step.
        let mut stage = Stage::Uploading;
        loop {
            tokio::select! {
                () = tokio::time::sleep(stage_delay) => {}
                () = superseded_by(&mut superseded, generation) => return self.snapshot(),
            }
            if stage == Stage::Blending {
                break;
            }
            match self.transition_if_current(generation, PipelineState::advance) {
                Some(state) => stage = state.stage(),
                None => return self.snapshot(),
            }
        }

        let timeout = self.inner.config.composition_timeout;
        let compose = tokio::time::timeout(
            timeout,
            self.inner.compositor.compose(&person, &garment),
        );
        let outcome = tokio::select! {
            outcome = compose => outcome,
            () = superseded_by(&mut superseded, generation) => return self.snapshot(),
        };

        let finished = match outcome {
            Ok(Ok(result)) => self.transition_if_current(generation, |s| s.complete(result)),
            Ok(Err(err)) => self.fail(generation, &err),
            Err(_elapsed) => self.fail(generation, &CompositionError::Timeout(timeout)),
        };
        if finished.is_some_and(|state| state.stage() == Stage::Complete) {
            tracing::info!(generation, "try-on run complete");
        }
        self.snapshot()
    }

    fn fail(&self, generation: u64, err: &CompositionError) -> Option<PipelineState> {
        let failure = CompositionFailure::from(err);
        tracing::warn!(
            generation,
            kind = %failure.kind,
            error = %err,
            "composition failed"
        );
        self.transition_if_current(generation, |s| s.fail(failure))
    }

    /// Apply `step` to the current state if `generation` is still current.
    fn transition_if_current(
        &self,
        generation: u64,
        step: impl FnOnce(&PipelineState) -> Option<Transition>,
    ) -> Option<PipelineState> {
        let mut guard = self.lock();
        if *self.inner.generation.borrow() != generation {
            return None;
        }
        let shared = &mut *guard;
        let transition = step(&shared.state)?;
        self.apply(shared, transition);
        tracing::debug!(
            stage = %shared.state.stage(),
            progress = shared.state.progress(),
            "stage entered"
        );
        Some(shared.state.clone())
    }

    fn spawn_preview(&self, input: ImageInput) {
        match Handle::try_current() {
            Ok(runtime) => {
                let session = self.clone();
                runtime.spawn(async move {
                    match decode_preview(&input).await {
                        Ok(preview) => session.attach_preview(input.role(), input.id(), preview),
                        Err(err) => {
                            tracing::warn!(role = %input.role(), id = %input.id(), error = %err, "preview failed");
                        }
                    }
                });
            }
            Err(_) => {
                let preview = Preview::encode(input.mime_type(), input.bytes());
                self.attach_preview(input.role(), input.id(), preview);
            }
        }
    }

    fn attach_preview(&self, role: Role, id: InputId, preview: Preview) {
        let mut shared = self.lock();
        match shared.slots.attach_preview(role, id, preview) {
            Some(event) => {
                tracing::debug!(%role, %id, "preview ready");
                self.emit(SessionEvent::Ingest(event));
            }
            None => tracing::warn!(%role, %id, "discarded stale preview"),
        }
    }

    fn apply(&self, shared: &mut Shared, transition: Transition) {
        shared.state = transition.state;
        for event in transition.events {
            self.emit(SessionEvent::Pipeline(event));
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is not an error.
        let _ = self.inner.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.inner
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolves once the session generation has moved past `generation`.
///
/// The watch read guard is released before returning: `reset` and
/// `cancel` write the generation while holding the state lock, so the
/// caller must not hold the guard while it takes that lock.
async fn superseded_by(rx: &mut watch::Receiver<u64>, generation: u64) {
    let _ = rx.wait_for(|g| *g != generation).await;
}

/// Handle to a run started by [`Session::start`].
///
/// Dropping the handle does not stop the run.
#[derive(Debug)]
pub struct RunHandle {
    session: Session,
    task: JoinHandle<PipelineState>,
}

impl RunHandle {
    /// Wait for the run to end and return the state it left behind.
    ///
    /// A cancelled or reset run ends early; the returned state is then
    /// whatever the session holds at that moment.
    pub async fn wait(self) -> PipelineState {
        match self.task.await {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(error = %err, "run task did not finish");
                self.session.snapshot()
            }
        }
    }

    /// Whether the run task has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

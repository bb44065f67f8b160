// SessionManager: Focused manager for the session lifecycle
//
// Single Responsibility: load, drive and replace the active session
// Owns the only periodic task (position polling) and the emitter
// completion worker.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use futures::Stream;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::audio::AudioTrack;
use crate::config::TutorConfig;
use crate::engine::{AudioOutput, ClockSource, EmitterId, TimeSource};
use crate::error::{log_session_error, ErrorCode, SessionError, USER_FACING_START_ERROR};
use crate::exercise::{Exercise, HintMarker, Selection, SessionIdentity, StartRequest};
use crate::playback::{PlaybackController, PlaybackSnapshot, PlaybackStatus, TickOutcome};
use crate::report::{write_report, ReportInput, ReportRenderer};
use crate::session::{AudioSynthesizer, ContentGenerator, ScriptReveal, Session};
use crate::telemetry::hub;

use super::broadcast_manager::{BroadcastChannelManager, StatusUpdate};
use super::position_poller::PositionPoller;

/// External collaborators and audio plumbing a manager drives
pub struct SessionBackends {
    pub generator: Arc<dyn ContentGenerator>,
    pub synthesizer: Arc<dyn AudioSynthesizer>,
    pub output: Arc<dyn AudioOutput>,
    pub time: Arc<dyn TimeSource>,
}

enum SessionSlot {
    Idle { last_error: Option<String> },
    Loading { token: u64 },
    Active(Box<Session>),
}

impl SessionSlot {
    fn status(&self) -> PlaybackStatus {
        match self {
            SessionSlot::Idle { .. } => PlaybackStatus::Idle,
            SessionSlot::Loading { .. } => PlaybackStatus::Loading,
            SessionSlot::Active(session) => session.status(),
        }
    }

    fn is_loading(&self, token: u64) -> bool {
        matches!(self, SessionSlot::Loading { token: current } if *current == token)
    }
}

/// State shared with the polling task and the completion worker
///
/// Lock order is always `state` then `poller`.
struct Shared {
    state: Mutex<SessionSlot>,
    poller: Mutex<Option<PositionPoller>>,
    broadcasts: BroadcastChannelManager,
    completion_tx: mpsc::UnboundedSender<EmitterId>,
    poll_interval: Duration,
    runtime: Handle,
}

impl Shared {
    fn lock_state(&self) -> Result<MutexGuard<'_, SessionSlot>, SessionError> {
        self.state.lock().map_err(|_| {
            let err = SessionError::StatePoisoned;
            log_session_error(&err, "lock_state");
            err
        })
    }

    fn lock_poller(&self) -> Result<MutexGuard<'_, Option<PositionPoller>>, SessionError> {
        self.poller.lock().map_err(|_| {
            let err = SessionError::StatePoisoned;
            log_session_error(&err, "lock_poller");
            err
        })
    }

    fn publish_transition(&self, from: PlaybackStatus, to: PlaybackStatus, error: Option<String>) {
        if from != to || error.is_some() {
            hub().record_status(from, to);
            self.broadcasts.publish_status(to, error);
        }
    }

    /// Make the polling task follow the active emitter
    ///
    /// A new emitter gets a fresh poller (dropping the old one aborts it);
    /// no emitter clears the slot.
    fn sync_poller(self: &Arc<Self>, active: Option<EmitterId>) -> Result<(), SessionError> {
        let mut slot = self.lock_poller()?;
        match active {
            Some(emitter) if slot.as_ref().map(PositionPoller::emitter) == Some(emitter) => {}
            Some(emitter) => {
                let task = self.runtime.spawn(poll_position(
                    Arc::downgrade(self),
                    emitter,
                    self.poll_interval,
                ));
                *slot = Some(PositionPoller::new(emitter, task));
            }
            None => {
                slot.take();
            }
        }
        Ok(())
    }

    /// One polling step; false once the poller should stop
    fn poll_tick(&self, emitter: EmitterId) -> bool {
        let mut state = match self.lock_state() {
            Ok(state) => state,
            Err(_) => return false,
        };
        let session = match &mut *state {
            SessionSlot::Active(session) => session,
            _ => return false,
        };
        if session.playback().active_emitter() != Some(emitter) {
            return false;
        }

        match session.playback_mut().tick() {
            TickOutcome::Position(_) => {
                self.broadcasts
                    .publish_position(session.playback().snapshot());
                true
            }
            TickOutcome::Ended(position) => {
                self.after_emitter_end(session, position);
                if let Ok(mut slot) = self.lock_poller() {
                    if slot.as_ref().map(PositionPoller::emitter) == Some(emitter) {
                        if let Some(poller) = slot.take() {
                            poller.release();
                        }
                    }
                }
                false
            }
            TickOutcome::Stopped => false,
        }
    }

    /// Identity-checked completion delivered by the output
    fn complete_emitter(&self, id: EmitterId) {
        let mut state = match self.lock_state() {
            Ok(state) => state,
            Err(_) => return,
        };
        let session = match &mut *state {
            SessionSlot::Active(session) => session,
            _ => return,
        };
        if !session.playback_mut().on_emitter_complete(id) {
            return;
        }

        let position = session.playback().position();
        self.after_emitter_end(session, position);
        if let Ok(mut slot) = self.lock_poller() {
            if slot.as_ref().map(PositionPoller::emitter) == Some(id) {
                slot.take();
            }
        }
    }

    fn after_emitter_end(&self, session: &Session, position: f64) {
        tracing::info!(
            "[SessionManager] Session {} emitter finished at {:.2}s",
            session.token(),
            position
        );
        self.publish_transition(PlaybackStatus::Playing, session.status(), None);
        self.broadcasts
            .publish_position(session.playback().snapshot());
    }
}

async fn poll_position(shared: Weak<Shared>, emitter: EmitterId, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let keep_going = match shared.upgrade() {
            Some(shared) => shared.poll_tick(emitter),
            None => false,
        };
        if !keep_going {
            break;
        }
    }
    tracing::debug!("[PositionPoller] Stopped polling emitter {}", emitter.0);
}

async fn run_completion_worker(shared: Weak<Shared>, mut rx: mpsc::UnboundedReceiver<EmitterId>) {
    while let Some(id) = rx.recv().await {
        match shared.upgrade() {
            Some(shared) => shared.complete_emitter(id),
            None => break,
        }
    }
}

/// Manages the lifecycle of listening sessions
///
/// Single Responsibility: session start, replacement and every learner
/// operation on the active session.
///
/// This manager handles:
/// - Session start with generation then synthesis, discarding responses
///   that a newer start request has superseded
/// - Falling back to idle with a single user-facing message on failure
/// - The position polling task, scoped to the active emitter
/// - Emitter completion and status/position broadcasts
///
/// # Example
/// ```ignore
/// let manager = SessionManager::new(backends, TutorConfig::load());
/// manager.start_session(StartRequest::default()).await?;
/// manager.toggle()?;
/// manager.finalize()?;
/// let report = manager.report()?;
/// ```
pub struct SessionManager {
    shared: Arc<Shared>,
    generator: Arc<dyn ContentGenerator>,
    synthesizer: Arc<dyn AudioSynthesizer>,
    output: Arc<dyn AudioOutput>,
    time: Arc<dyn TimeSource>,
    config: TutorConfig,
    next_token: AtomicU64,
    completion_worker: JoinHandle<()>,
}

impl SessionManager {
    /// Create an idle manager
    ///
    /// # Panics
    /// When called outside a Tokio runtime, like `tokio::spawn`.
    pub fn new(backends: SessionBackends, config: TutorConfig) -> Self {
        let runtime = Handle::current();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            state: Mutex::new(SessionSlot::Idle { last_error: None }),
            poller: Mutex::new(None),
            broadcasts: BroadcastChannelManager::new(config.playback.broadcast_capacity),
            completion_tx,
            poll_interval: Duration::from_millis(config.playback.poll_interval_ms.max(1)),
            runtime: runtime.clone(),
        });
        let completion_worker =
            runtime.spawn(run_completion_worker(Arc::downgrade(&shared), completion_rx));

        Self {
            shared,
            generator: backends.generator,
            synthesizer: backends.synthesizer,
            output: backends.output,
            time: backends.time,
            config,
            next_token: AtomicU64::new(0),
            completion_worker,
        }
    }

    pub fn config(&self) -> &TutorConfig {
        &self.config
    }

    // ========================================================================
    // SESSION LIFECYCLE
    // ========================================================================

    /// Start a new session for `request`
    ///
    /// Valid from idle, loading (the pending start is superseded) and
    /// submitted. The previous session is torn down before anything is
    /// awaited.
    ///
    /// # Errors
    /// - `InvalidSelection` before any state change
    /// - `SessionInProgress` while a session is ready or playing
    /// - `GenerationFailure` / `SynthesisFailure`: the manager is back to
    ///   idle and publishes [`USER_FACING_START_ERROR`]
    /// - `Superseded` when a newer start arrived while this one was loading
    pub async fn start_session(&self, request: StartRequest) -> Result<(), SessionError> {
        request.selection.validate().map_err(|err| {
            log_session_error(&err, "start_session");
            err
        })?;

        let token = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        self.enter_loading(token)?;
        tracing::info!(
            "[SessionManager] Session {} loading ({} / {:?} / {})",
            token,
            request.selection.part.identifier(),
            request.selection.level,
            request.selection.topic
        );

        match self.load(token, &request.selection).await {
            Ok((exercise, track)) => self.install(token, exercise, track, &request.identity),
            Err(SessionError::Superseded { token }) => {
                tracing::info!("[SessionManager] Discarding superseded session {}", token);
                Err(SessionError::Superseded { token })
            }
            Err(err) => {
                self.fail_start(token, &err);
                Err(err)
            }
        }
    }

    /// Start a new session after the current one was submitted
    pub async fn restart(&self, request: StartRequest) -> Result<(), SessionError> {
        {
            let state = self.shared.lock_state()?;
            match &*state {
                SessionSlot::Active(session) if session.is_submitted() => {}
                SessionSlot::Active(_) => return Err(SessionError::SessionInProgress),
                _ => return Err(SessionError::NoActiveSession),
            }
        }
        self.start_session(request).await
    }

    /// Drop the active session (or pending start) and return to idle
    pub fn teardown(&self) -> Result<(), SessionError> {
        let mut state = self.shared.lock_state()?;
        let from = state.status();
        if let SessionSlot::Active(session) = &mut *state {
            session.teardown();
        }
        self.shared.sync_poller(None)?;
        *state = SessionSlot::Idle { last_error: None };
        self.shared
            .publish_transition(from, PlaybackStatus::Idle, None);
        Ok(())
    }

    fn enter_loading(&self, token: u64) -> Result<(), SessionError> {
        let mut state = self.shared.lock_state()?;
        if let SessionSlot::Active(session) = &*state {
            if matches!(
                session.status(),
                PlaybackStatus::Ready | PlaybackStatus::Playing
            ) {
                let err = SessionError::SessionInProgress;
                log_session_error(&err, "start_session");
                return Err(err);
            }
        }

        let from = state.status();
        if let SessionSlot::Active(session) = &mut *state {
            session.teardown();
        }
        self.shared.sync_poller(None)?;
        *state = SessionSlot::Loading { token };
        self.shared
            .publish_transition(from, PlaybackStatus::Loading, None);
        Ok(())
    }

    fn ensure_current(&self, token: u64) -> Result<(), SessionError> {
        if self.shared.lock_state()?.is_loading(token) {
            Ok(())
        } else {
            Err(SessionError::Superseded { token })
        }
    }

    async fn load(
        &self,
        token: u64,
        selection: &Selection,
    ) -> Result<(Exercise, AudioTrack), SessionError> {
        let generated = self.generator.generate(selection).await;
        self.ensure_current(token)?;
        let exercise = generated?;
        exercise.validate()?;

        let synthesized = self.synthesizer.synthesize(&exercise).await;
        self.ensure_current(token)?;
        let track = synthesized?;
        if track.frame_count() == 0 {
            return Err(SessionError::SynthesisFailure {
                reason: "synthesizer returned an empty track".to_string(),
            });
        }

        let duration = track.duration();
        Ok((exercise.clamped_to_duration(duration), track))
    }

    fn install(
        &self,
        token: u64,
        exercise: Exercise,
        track: AudioTrack,
        identity: &SessionIdentity,
    ) -> Result<(), SessionError> {
        let mut state = self.shared.lock_state()?;
        if !state.is_loading(token) {
            return Err(SessionError::Superseded { token });
        }

        let duration = track.duration();
        let questions = exercise.questions.len();
        let clock = ClockSource::new(
            Arc::clone(&self.output),
            Arc::clone(&self.time),
            Arc::new(track),
            self.shared.completion_tx.clone(),
        );
        let playback = PlaybackController::new(clock, self.config.playback.replay_threshold_secs);
        let identity = identity.resolved(
            &self.config.session.default_display_name,
            &self.config.session.default_test_number,
        );
        let session = Session::new(
            token,
            Arc::new(exercise),
            playback,
            identity,
            self.config.session.lifeline_seed,
            self.config.report.clone(),
        );
        let snapshot = session.playback().snapshot();

        *state = SessionSlot::Active(Box::new(session));
        hub().record_session_loaded(token, questions, duration);
        self.shared
            .publish_transition(PlaybackStatus::Loading, PlaybackStatus::Ready, None);
        self.shared.broadcasts.publish_position(snapshot);
        tracing::info!(
            "[SessionManager] Session {} ready: {} questions, {:.1}s of audio",
            token,
            questions,
            duration
        );
        Ok(())
    }

    fn fail_start(&self, token: u64, err: &SessionError) {
        log_session_error(err, "start_session");
        hub().record_error(err.code(), "start_session");

        let mut state = match self.shared.lock_state() {
            Ok(state) => state,
            Err(_) => return,
        };
        if state.is_loading(token) {
            *state = SessionSlot::Idle {
                last_error: Some(USER_FACING_START_ERROR.to_string()),
            };
            self.shared.publish_transition(
                PlaybackStatus::Loading,
                PlaybackStatus::Idle,
                Some(USER_FACING_START_ERROR.to_string()),
            );
        }
    }

    // ========================================================================
    // STATE QUERIES
    // ========================================================================

    pub fn status(&self) -> Result<PlaybackStatus, SessionError> {
        Ok(self.shared.lock_state()?.status())
    }

    /// User-facing message left by the last failed start, if idle
    pub fn last_error(&self) -> Result<Option<String>, SessionError> {
        match &*self.shared.lock_state()? {
            SessionSlot::Idle { last_error } => Ok(last_error.clone()),
            _ => Ok(None),
        }
    }

    pub fn snapshot(&self) -> Result<PlaybackSnapshot, SessionError> {
        self.read_session(|session| session.playback().snapshot())
    }

    pub fn exercise(&self) -> Result<Arc<Exercise>, SessionError> {
        self.read_session(|session| Arc::clone(session.exercise()))
    }

    pub fn hint_markers(&self) -> Result<Vec<HintMarker>, SessionError> {
        self.read_session(Session::hint_markers)
    }

    pub fn answer(&self, question_id: u32) -> Result<String, SessionError> {
        self.read_session(|session| session.answers().get(question_id).map(str::to_string))?
            .ok_or(SessionError::UnknownQuestion { question_id })
    }

    pub fn hidden_options(&self, question_id: u32) -> Result<Vec<String>, SessionError> {
        self.read_session(|session| session.hidden_options(question_id).to_vec())
    }

    fn read_session<T>(&self, read: impl FnOnce(&Session) -> T) -> Result<T, SessionError> {
        match &*self.shared.lock_state()? {
            SessionSlot::Active(session) => Ok(read(session)),
            _ => Err(SessionError::NoActiveSession),
        }
    }

    // ========================================================================
    // PLAYBACK OPERATIONS
    // ========================================================================

    pub fn play(&self) -> Result<(), SessionError> {
        self.with_session("play", |session| Ok(session.playback_mut().play()?))
    }

    pub fn pause(&self) -> Result<(), SessionError> {
        self.with_session("pause", |session| Ok(session.playback_mut().pause()?))
    }

    pub fn toggle(&self) -> Result<(), SessionError> {
        self.with_session("toggle", |session| Ok(session.playback_mut().toggle()?))
    }

    pub fn seek(&self, target: f64) -> Result<(), SessionError> {
        self.with_session("seek", |session| Ok(session.playback_mut().seek(target)?))
    }

    /// Play the proof interval of a question
    pub fn play_proof(&self, question_id: u32) -> Result<(), SessionError> {
        self.with_session("play_proof", |session| session.play_proof(question_id))
    }

    // ========================================================================
    // QUESTION OPERATIONS
    // ========================================================================

    pub fn set_answer(&self, question_id: u32, value: &str) -> Result<(), SessionError> {
        self.with_session("set_answer", |session| session.set_answer(question_id, value))
    }

    pub fn use_lifeline(&self, question_id: u32) -> Result<Vec<String>, SessionError> {
        self.with_session("use_lifeline", |session| session.use_lifeline(question_id))
    }

    pub fn reveal_script(&self, question_id: u32) -> Result<ScriptReveal, SessionError> {
        self.with_session("reveal_script", |session| session.reveal_script(question_id))
    }

    // ========================================================================
    // SUBMISSION AND REPORT
    // ========================================================================

    pub fn finalize(&self) -> Result<(), SessionError> {
        self.with_session("finalize", Session::finalize)
    }

    pub fn report(&self) -> Result<ReportInput, SessionError> {
        self.with_session("report", |session| session.report())
    }

    /// Render the report and save it in `dir`
    pub fn render_report(
        &self,
        renderer: &dyn ReportRenderer,
        dir: &Path,
    ) -> Result<PathBuf, SessionError> {
        let report = self.report()?;
        write_report(renderer, &report, dir).map_err(|err| {
            log_session_error(&err, "render_report");
            err
        })
    }

    // ========================================================================
    // STREAMS
    // ========================================================================

    pub fn subscribe_position(&self) -> broadcast::Receiver<PlaybackSnapshot> {
        self.shared.broadcasts.subscribe_position()
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusUpdate> {
        self.shared.broadcasts.subscribe_status()
    }

    /// Position snapshots as a `Stream`; lagged messages are skipped
    pub fn position_stream(&self) -> impl Stream<Item = PlaybackSnapshot> + Send + 'static {
        BroadcastStream::new(self.subscribe_position()).filter_map(|item| item.ok())
    }

    pub fn status_stream(&self) -> impl Stream<Item = StatusUpdate> + Send + 'static {
        BroadcastStream::new(self.subscribe_status()).filter_map(|item| item.ok())
    }

    /// Run `op` on the active session, then publish what it changed
    ///
    /// New interaction events go to telemetry, a status change is broadcast,
    /// the position snapshot is republished and the poller is moved to
    /// whichever emitter is now active.
    fn with_session<T>(
        &self,
        context: &'static str,
        op: impl FnOnce(&mut Session) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let result = self.apply(op);
        if let Err(err) = &result {
            log_session_error(err, context);
            hub().record_error(err.code(), context);
        }
        result
    }

    fn apply<T>(
        &self,
        op: impl FnOnce(&mut Session) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let mut state = self.shared.lock_state()?;
        let session = match &mut *state {
            SessionSlot::Active(session) => session.as_mut(),
            _ => return Err(SessionError::NoActiveSession),
        };

        let status_before = session.status();
        let events_before = session.playback().log().len();
        let result = op(&mut *session);

        for event in &session.playback().log().events()[events_before..] {
            hub().record_interaction(event);
        }
        self.shared
            .publish_transition(status_before, session.status(), None);
        self.shared
            .broadcasts
            .publish_position(session.playback().snapshot());
        self.shared
            .sync_poller(session.playback().active_emitter())?;

        result
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.completion_worker.abort();
        if let Ok(mut state) = self.shared.state.lock() {
            if let SessionSlot::Active(session) = &mut *state {
                session.teardown();
            }
        }
        if let Ok(mut poller) = self.shared.poller.lock() {
            poller.take();
        }
    }
}

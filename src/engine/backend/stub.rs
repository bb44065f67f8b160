use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::error::PlaybackError;

use super::{AudioOutput, EmitterId, EmitterRequest, TimeSource};

/// Offset and end recorded for each started emitter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartedEmitter {
    pub id: EmitterId,
    pub offset: f64,
    pub end: f64,
}

#[derive(Default)]
struct StubState {
    active: HashMap<EmitterId, mpsc::UnboundedSender<EmitterId>>,
    started: Vec<StartedEmitter>,
    max_concurrent: usize,
}

/// Stub output used for deterministic testing and CLI simulation.
///
/// No audio is produced. The stub tracks which emitters are alive so tests
/// can assert that no two ever overlap, and lets the caller fire an
/// emitter's completion by hand.
pub struct StubOutput {
    state: Mutex<StubState>,
    fail_next_start: AtomicBool,
}

impl StubOutput {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StubState::default()),
            fail_next_start: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StubState>, PlaybackError> {
        self.state.lock().map_err(|_| PlaybackError::LockPoisoned {
            component: "stub_output".to_string(),
        })
    }

    /// Make the next `start` call fail with `PlaybackFailure`
    pub fn fail_next_start(&self) {
        self.fail_next_start.store(true, Ordering::SeqCst);
    }

    /// Number of emitters currently alive
    pub fn active_count(&self) -> usize {
        self.lock().map(|state| state.active.len()).unwrap_or(0)
    }

    /// Highest number of simultaneously alive emitters seen so far
    pub fn max_concurrent(&self) -> usize {
        self.lock().map(|state| state.max_concurrent).unwrap_or(0)
    }

    /// Every emitter started so far, in order
    pub fn started(&self) -> Vec<StartedEmitter> {
        self.lock()
            .map(|state| state.started.clone())
            .unwrap_or_default()
    }

    /// Id of the most recently started emitter that is still alive
    pub fn active_id(&self) -> Option<EmitterId> {
        let state = self.lock().ok()?;
        state
            .started
            .iter()
            .rev()
            .map(|emitter| emitter.id)
            .find(|id| state.active.contains_key(id))
    }

    /// Simulate an emitter reaching its end
    ///
    /// Sends the completion signal and releases the emitter. Returns false if
    /// the emitter was not alive.
    pub fn finish(&self, id: EmitterId) -> bool {
        let sender = match self.lock() {
            Ok(mut state) => state.active.remove(&id),
            Err(_) => None,
        };
        match sender {
            Some(sender) => sender.send(id).is_ok(),
            None => false,
        }
    }
}

impl Default for StubOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for StubOutput {
    fn start(&self, request: EmitterRequest) -> Result<(), PlaybackError> {
        if self.fail_next_start.swap(false, Ordering::SeqCst) {
            return Err(PlaybackError::PlaybackFailure {
                reason: "stub output configured to fail".to_string(),
            });
        }

        let mut state = self.lock()?;
        state.started.push(StartedEmitter {
            id: request.id,
            offset: request.offset,
            end: request.end,
        });
        state.active.insert(request.id, request.completion);
        state.max_concurrent = state.max_concurrent.max(state.active.len());
        Ok(())
    }

    fn stop(&self, id: EmitterId) -> Result<(), PlaybackError> {
        let mut state = self.lock()?;
        match state.active.remove(&id) {
            Some(_) => Ok(()),
            None => Err(PlaybackError::NoActiveEmitter),
        }
    }
}

/// Deterministic time source for tests and simulation.
///
/// Time only moves when `advance` is called. The wall clock starts at a
/// fixed epoch offset and moves in step with the monotonic clock.
pub struct ManualTimeSource {
    start: Instant,
    offset_us: AtomicU64,
    wall_clock_base_ms: u64,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::with_wall_clock(1_700_000_000_000)
    }

    /// Start the wall clock at `base_ms` milliseconds since the Unix epoch
    pub fn with_wall_clock(base_ms: u64) -> Self {
        Self {
            start: Instant::now(),
            offset_us: AtomicU64::new(0),
            wall_clock_base_ms: base_ms,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset_us
            .fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, seconds: f64) {
        if seconds.is_finite() && seconds > 0.0 {
            self.advance(Duration::from_secs_f64(seconds));
        }
    }

    /// Total time advanced since creation
    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.offset_us.load(Ordering::SeqCst))
    }
}

impl Default for ManualTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn wall_clock_ms(&self) -> u64 {
        self.wall_clock_base_ms + self.elapsed().as_millis() as u64
    }
}

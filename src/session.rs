use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use tokio::sync::{Mutex, Notify, RwLock};

/// Position of a session in the registry. Dense, starting at 0, assigned in
/// start order, and resolvable for the life of the process.
pub type SessionHandle = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Capture loop is running.
    Recording = 0,
    /// Stop requested, loop has not yet acknowledged.
    Stopping = 1,
    /// Loop observed the stop request and exited.
    Finished = 2,
    /// Loop failed to acknowledge the stop request within the wait budget.
    Abandoned = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Recording,
            1 => Self::Stopping,
            2 => Self::Finished,
            _ => Self::Abandoned,
        }
    }
}

/// State of one recording: owned frame list, elapsed time and lifecycle flags.
///
/// The capture loop is the only writer of `frames`, `elapsed` and the
/// `Stopping -> Finished` transition; the stop path only ever requests the
/// `Recording -> Stopping` transition and reads the rest after completion.
pub struct Session {
    handle: SessionHandle,
    started_at: DateTime<Utc>,
    state: AtomicU8,
    elapsed_bits: AtomicU64,
    frames: Mutex<Vec<PathBuf>>,
    done: Notify,
}

impl Session {
    fn new(handle: SessionHandle) -> Self {
        Self {
            handle,
            started_at: Utc::now(),
            state: AtomicU8::new(SessionState::Recording as u8),
            elapsed_bits: AtomicU64::new(0.0f64.to_bits()),
            frames: Mutex::new(Vec::new()),
            done: Notify::new(),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_recording(&self) -> bool {
        self.state() == SessionState::Recording
    }

    /// Elapsed recording time at the last successful capture, not wall-clock
    /// time of the stop request.
    pub fn elapsed_secs(&self) -> f64 {
        f64::from_bits(self.elapsed_bits.load(Ordering::SeqCst))
    }

    pub(crate) fn set_elapsed_secs(&self, secs: f64) {
        self.elapsed_bits.store(secs.to_bits(), Ordering::SeqCst);
    }

    pub async fn frames(&self) -> Vec<PathBuf> {
        self.frames.lock().await.clone()
    }

    pub async fn frame_count(&self) -> usize {
        self.frames.lock().await.len()
    }

    pub(crate) async fn push_frame(&self, path: PathBuf) {
        self.frames.lock().await.push(path);
    }

    /// Flips the session out of `Recording`. Returns false if a stop was
    /// already requested or the session has reached a terminal state.
    pub(crate) fn request_stop(&self) -> bool {
        self.state
            .compare_exchange(
                SessionState::Recording as u8,
                SessionState::Stopping as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Last action of the capture loop: acknowledge the stop request and wake
    /// the waiting stop call. A no-op if the session was already abandoned.
    pub(crate) fn mark_finished(&self) {
        if self
            .state
            .compare_exchange(
                SessionState::Stopping as u8,
                SessionState::Finished as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
        {
            self.done.notify_waiters();
        }
    }

    pub(crate) fn mark_abandoned(&self) {
        let _ = self.state.compare_exchange(
            SessionState::Stopping as u8,
            SessionState::Abandoned as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Resolves once the capture loop has marked the session finished.
    pub async fn wait_finished(&self) {
        loop {
            let notified = self.done.notified();
            if self.state() == SessionState::Finished {
                return;
            }
            notified.await;
        }
    }
}

/// Process-wide ordered collection of sessions. Append-only: sessions are
/// never removed, so a handle stays resolvable after the recording ends.
pub struct SessionRegistry {
    sessions: RwLock<Vec<Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(Vec::new()),
        }
    }

    pub async fn register(&self) -> Arc<Session> {
        let mut sessions = self.sessions.write().await;
        let session = Arc::new(Session::new(sessions.len()));
        sessions.push(session.clone());
        session
    }

    pub async fn get(&self, handle: SessionHandle) -> Option<Arc<Session>> {
        self.sessions.read().await.get(handle).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

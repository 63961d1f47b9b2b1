//! Engine sessions: ownership of the single external engine process.
//!
//! A session serializes every round trip to the engine behind one async
//! mutex. The owned guard moves into a blocking worker together with the
//! search, so the process is never shared between two searches and the
//! pipe I/O never runs on the async scheduler.
//!
//! Two lifecycle policies implement [`EngineSession`]:
//!
//! - [`EagerSession`] is started once at startup and stopped at shutdown.
//! - [`SharedSession`] launches the engine on first use and lives as long as
//!   its handles.

mod backend;
mod eager;
mod process;
mod shared;

pub use backend::{EngineBackend, EngineLauncher};
pub use eager::EagerSession;
pub use process::{UciLauncher, UciProcess};
pub use shared::SharedSession;

use std::future::Future;
use std::io;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use uci::{SearchReport, UciError};

/// Errors raised by an engine session.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Engine executable was not found at the specified path.
    #[error("Engine not found at path: {0}")]
    NotFound(String),
    /// Failed to spawn the engine process.
    #[error("Failed to spawn engine: {0}")]
    Spawn(#[source] std::io::Error),
    /// The process started but did not complete the UCI handshake.
    #[error("Engine initialization failed: {0}")]
    Handshake(#[source] UciError),
    /// The session was never started or has been stopped.
    #[error("Engine session is not running")]
    NotRunning,
    /// The engine process died during an earlier call.
    #[error("Engine process has terminated")]
    Terminated,
    /// Communication broke down during a search.
    #[error("Engine protocol error: {0}")]
    Uci(#[from] UciError),
    /// Engine returned an invalid or unexpected response.
    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),
    /// The blocking worker running the search panicked.
    #[error("Engine worker panicked: {0}")]
    WorkerPanicked(String),
}

/// Coarse split of [`EngineError`] that callers act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// No engine to talk to; retrying the same call will not help.
    Unavailable,
    /// The engine was reached but the exchange failed.
    Failure,
}

impl EngineError {
    pub fn kind(&self) -> EngineErrorKind {
        match self {
            EngineError::NotFound(_)
            | EngineError::Spawn(_)
            | EngineError::Handshake(_)
            | EngineError::NotRunning
            | EngineError::Terminated => EngineErrorKind::Unavailable,
            EngineError::Uci(_) | EngineError::InvalidResponse(_) | EngineError::WorkerPanicked(_) => {
                EngineErrorKind::Failure
            }
        }
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Running,
    Stopped,
}

/// Exclusive, asynchronous access to one engine process.
///
/// Methods return `impl Future + Send` so sessions can be driven from
/// spawned tasks without boxing.
pub trait EngineSession: Send + Sync {
    /// Launch the engine and complete the handshake. No-op when running.
    fn start(&self) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Search `fen` to a fixed depth and return the engine's final report.
    ///
    /// Concurrent calls queue up; at most one search is in flight.
    fn evaluate(
        &self,
        fen: &str,
        depth: u32,
    ) -> impl Future<Output = Result<SearchReport, EngineError>> + Send;

    /// Terminate the engine process. No-op when not running.
    fn stop(&self) -> impl Future<Output = Result<(), EngineError>> + Send;

    fn state(&self) -> impl Future<Output = SessionState> + Send;
}

/// The guarded contents of a session.
pub(crate) enum Slot<B> {
    NotStarted,
    Running(B),
    Stopped { crashed: bool },
}

impl<B> Slot<B> {
    pub(crate) fn state(&self) -> SessionState {
        match self {
            Slot::NotStarted => SessionState::NotStarted,
            Slot::Running(_) => SessionState::Running,
            Slot::Stopped { .. } => SessionState::Stopped,
        }
    }
}

pub(crate) type SharedSlot<B> = Arc<Mutex<Slot<B>>>;

/// Run `f` on the slot in a blocking worker while holding the session lock.
///
/// A panicking worker leaves the engine in an unknown state, so the slot is
/// marked crashed and later calls fail fast.
pub(crate) async fn with_slot<B, T, F>(slot: &SharedSlot<B>, f: F) -> Result<T, EngineError>
where
    B: Send + 'static,
    T: Send + 'static,
    F: FnOnce(&mut Slot<B>) -> Result<T, EngineError> + Send + 'static,
{
    let mut guard = Arc::clone(slot).lock_owned().await;
    match tokio::task::spawn_blocking(move || f(&mut guard)).await {
        Ok(result) => result,
        Err(join_err) => {
            tracing::error!(error = %join_err, "engine worker panicked");
            *slot.lock().await = Slot::Stopped { crashed: true };
            Err(EngineError::WorkerPanicked(join_err.to_string()))
        }
    }
}

/// Launch a backend into an empty slot.
pub(crate) fn launch_into<L: EngineLauncher>(
    launcher: &L,
    slot: &mut Slot<L::Backend>,
) -> Result<(), EngineError> {
    let backend = launcher.launch()?;
    tracing::info!("engine launched");
    *slot = Slot::Running(backend);
    Ok(())
}

/// One search against a running slot.
///
/// When the search fails on a closed pipe or the process is gone, the slot
/// becomes `Stopped { crashed: true }` so the next call does not hang.
pub(crate) fn search_in<B: EngineBackend>(
    slot: &mut Slot<B>,
    fen: &str,
    depth: u32,
) -> Result<SearchReport, EngineError> {
    let backend = match slot {
        Slot::Running(backend) => backend,
        Slot::Stopped { crashed: true } => return Err(EngineError::Terminated),
        Slot::NotStarted | Slot::Stopped { crashed: false } => {
            return Err(EngineError::NotRunning)
        }
    };

    match backend.search(fen, depth) {
        Ok(report) => Ok(report),
        Err(err) => {
            if pipe_closed(&err) || !backend.is_alive() {
                tracing::error!(error = %err, fen, depth, "engine process died during search");
                *slot = Slot::Stopped { crashed: true };
            }
            Err(err)
        }
    }
}

/// Errors that mean the engine's pipes are gone. Undecodable output is not
/// one of them: the process may still be alive.
fn pipe_closed(err: &EngineError) -> bool {
    match err {
        EngineError::Uci(UciError::Disconnected) => true,
        EngineError::Uci(UciError::IoError(io)) => matches!(
            io.kind(),
            io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
        ),
        _ => false,
    }
}

use std::sync::Arc;

use tokio::sync::Mutex;
use uci::SearchReport;

use super::{
    launch_into, search_in, with_slot, EngineBackend, EngineError, EngineLauncher, EngineSession,
    SessionState, SharedSlot, Slot, UciLauncher,
};
use crate::config::EngineConfig;

/// Session started explicitly at startup and stopped at shutdown.
///
/// `evaluate` never launches anything: before `start` and after `stop` it
/// fails fast with an unavailable error. Clones share the same process.
pub struct EagerSession<L: EngineLauncher = UciLauncher> {
    launcher: Arc<L>,
    slot: SharedSlot<L::Backend>,
}

impl<L: EngineLauncher> Clone for EagerSession<L> {
    fn clone(&self) -> Self {
        Self {
            launcher: Arc::clone(&self.launcher),
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<L: EngineLauncher> EagerSession<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher: Arc::new(launcher),
            slot: Arc::new(Mutex::new(Slot::NotStarted)),
        }
    }
}

impl EagerSession {
    /// Session over a real engine process.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(UciLauncher::new(config.clone()))
    }
}

impl<L: EngineLauncher> EngineSession for EagerSession<L> {
    async fn start(&self) -> Result<(), EngineError> {
        let launcher = Arc::clone(&self.launcher);
        with_slot(&self.slot, move |slot| {
            if matches!(slot, Slot::Running(_)) {
                return Ok(());
            }
            launch_into(launcher.as_ref(), slot)
        })
        .await
    }

    async fn evaluate(&self, fen: &str, depth: u32) -> Result<SearchReport, EngineError> {
        let fen = fen.to_string();
        with_slot(&self.slot, move |slot| search_in(slot, &fen, depth)).await
    }

    async fn stop(&self) -> Result<(), EngineError> {
        with_slot(&self.slot, |slot| {
            match std::mem::replace(slot, Slot::Stopped { crashed: false }) {
                Slot::Running(backend) => backend.shutdown(),
                idle => *slot = idle,
            }
            Ok(())
        })
        .await
    }

    async fn state(&self) -> SessionState {
        self.slot.lock().await.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeLauncher, START_FEN};

    #[tokio::test]
    async fn evaluate_before_start_fails_fast() {
        let launcher = FakeLauncher::new();
        let session = EagerSession::new(launcher.clone());

        let err = session.evaluate(START_FEN, 5).await.unwrap_err();
        assert!(matches!(err, EngineError::NotRunning));
        assert_eq!(launcher.launches(), 0);
        assert_eq!(session.state().await, SessionState::NotStarted);
    }

    #[tokio::test]
    async fn start_is_idempotent_and_stop_ends_service() {
        let launcher = FakeLauncher::new();
        let session = EagerSession::new(launcher.clone());

        session.start().await.unwrap();
        session.start().await.unwrap();
        assert_eq!(launcher.launches(), 1);
        assert_eq!(session.state().await, SessionState::Running);

        let report = session.evaluate(START_FEN, 5).await.unwrap();
        assert_eq!(report.depth, Some(5));

        session.stop().await.unwrap();
        assert_eq!(session.state().await, SessionState::Stopped);
        assert!(matches!(
            session.evaluate(START_FEN, 5).await,
            Err(EngineError::NotRunning)
        ));

        // Stopping twice is harmless.
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn failed_start_reports_unavailable() {
        let launcher = FakeLauncher::failing();
        let session = EagerSession::new(launcher);
        let err = session.start().await.unwrap_err();
        assert_eq!(err.kind(), crate::session::EngineErrorKind::Unavailable);
        assert_eq!(session.state().await, SessionState::NotStarted);
    }

    #[tokio::test]
    async fn crash_moves_session_to_stopped() {
        let launcher = FakeLauncher::crashing_after(1);
        let session = EagerSession::new(launcher);
        session.start().await.unwrap();

        session.evaluate(START_FEN, 3).await.unwrap();
        let crash = session.evaluate(START_FEN, 3).await.unwrap_err();
        assert_eq!(crash.kind(), crate::session::EngineErrorKind::Failure);

        assert_eq!(session.state().await, SessionState::Stopped);
        assert!(matches!(
            session.evaluate(START_FEN, 3).await,
            Err(EngineError::Terminated)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_evaluations_never_overlap() {
        let launcher = FakeLauncher::with_delay(std::time::Duration::from_millis(15));
        let session = EagerSession::new(launcher.clone());
        session.start().await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let session = session.clone();
            handles.push(tokio::spawn(async move {
                session.evaluate(START_FEN, 4).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        launcher.assert_no_overlap(8);
    }
}

use std::sync::Arc;

use tokio::sync::Mutex;
use uci::SearchReport;

use super::{
    launch_into, search_in, with_slot, EngineError, EngineLauncher, EngineSession, SessionState,
    SharedSlot, Slot, UciLauncher,
};
use crate::config::EngineConfig;

/// Cloneable handle to an engine that is launched by its first user.
///
/// Launch happens inside the session lock, so callers racing on a cold
/// handle queue behind a single launch. A failed launch leaves the handle
/// cold and the next call tries again; once an engine has run, it is never
/// relaunched, and a crash makes every later call fail fast.
pub struct SharedSession<L: EngineLauncher = UciLauncher> {
    launcher: Arc<L>,
    slot: SharedSlot<L::Backend>,
}

impl<L: EngineLauncher> Clone for SharedSession<L> {
    fn clone(&self) -> Self {
        Self {
            launcher: Arc::clone(&self.launcher),
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<L: EngineLauncher> SharedSession<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher: Arc::new(launcher),
            slot: Arc::new(Mutex::new(Slot::NotStarted)),
        }
    }
}

impl SharedSession {
    /// Handle over a real engine process, launched on first use.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(UciLauncher::new(config.clone()))
    }
}

fn ensure_running<L: EngineLauncher>(
    launcher: &L,
    slot: &mut Slot<L::Backend>,
) -> Result<(), EngineError> {
    match slot.state() {
        SessionState::Running => Ok(()),
        SessionState::Stopped => Err(EngineError::Terminated),
        SessionState::NotStarted => launch_into(launcher, slot),
    }
}

impl<L: EngineLauncher> EngineSession for SharedSession<L> {
    async fn start(&self) -> Result<(), EngineError> {
        let launcher = Arc::clone(&self.launcher);
        with_slot(&self.slot, move |slot| ensure_running(launcher.as_ref(), slot)).await
    }

    async fn evaluate(&self, fen: &str, depth: u32) -> Result<SearchReport, EngineError> {
        let launcher = Arc::clone(&self.launcher);
        let fen = fen.to_string();
        with_slot(&self.slot, move |slot| {
            ensure_running(launcher.as_ref(), slot)?;
            search_in(slot, &fen, depth)
        })
        .await
    }

    /// The process lives as long as the handles; nothing to do here.
    async fn stop(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn state(&self) -> SessionState {
        self.slot.lock().await.state()
    }
}

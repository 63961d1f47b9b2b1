use uci::SearchReport;

use super::EngineError;

/// A live engine, driven synchronously from a blocking worker.
pub trait EngineBackend: Send + 'static {
    /// Run one fixed-depth search and wait for its final report.
    fn search(&mut self, fen: &str, depth: u32) -> Result<SearchReport, EngineError>;

    /// Whether the underlying process is still running.
    fn is_alive(&mut self) -> bool;

    /// Terminate the engine. Dropping a backend must have the same effect.
    fn shutdown(self)
    where
        Self: Sized,
    {
        drop(self);
    }
}

/// Knows how to bring up a fresh [`EngineBackend`].
pub trait EngineLauncher: Send + Sync + 'static {
    type Backend: EngineBackend;

    /// Start the engine and complete its handshake. Blocks.
    fn launch(&self) -> Result<Self::Backend, EngineError>;
}

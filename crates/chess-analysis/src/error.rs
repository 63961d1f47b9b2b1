//! Errors surfaced to callers of the analysis pipeline.

use thiserror::Error;

use crate::session::{EngineError, EngineErrorKind};

/// Errors that can occur while evaluating positions or analyzing games.
///
/// Validation variants are always produced before the engine is contacted.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The engine could not be reached: missing binary, failed handshake,
    /// session not started or already stopped.
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(#[source] EngineError),
    /// The engine was reached but the exchange failed mid-way.
    #[error("Engine failure: {0}")]
    EngineFailure(#[source] EngineError),
    /// A FEN string did not describe a legal position.
    #[error("Invalid position: {0}")]
    InvalidPosition(String),
    /// A move was malformed or illegal in its position.
    #[error("Invalid move: {0}")]
    InvalidMove(String),
    /// A game could not be read or replayed.
    #[error("Invalid game: {0}")]
    GameParse(String),
    /// Requested search depth outside the supported range.
    #[error("Depth {0} is outside the supported range {min}..={max}", min = crate::config::MIN_DEPTH, max = crate::config::MAX_DEPTH)]
    InvalidDepth(u32),
}

impl AnalysisError {
    /// True for errors caused by the engine rather than by the input.
    pub fn is_engine_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::EngineUnavailable(_) | AnalysisError::EngineFailure(_)
        )
    }
}

impl From<EngineError> for AnalysisError {
    fn from(err: EngineError) -> Self {
        match err.kind() {
            EngineErrorKind::Unavailable => AnalysisError::EngineUnavailable(err),
            EngineErrorKind::Failure => AnalysisError::EngineFailure(err),
        }
    }
}

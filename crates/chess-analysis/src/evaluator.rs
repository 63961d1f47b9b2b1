//! Turns one engine search into an [`EvaluationResult`].

use std::time::Instant;

use shakmaty::Chess;

use crate::board::{self, TerminalState};
use crate::evaluation::{Evaluation, EvaluationResult, MateScoring};
use crate::session::{EngineError, EngineSession};
use crate::AnalysisError;

/// Evaluates single positions through an [`EngineSession`].
///
/// Finished games are scored locally: checkmate as mate 0 and every other
/// terminal state as a draw. The engine is only consulted for live positions.
pub struct PositionEvaluator<S> {
    session: S,
    scoring: MateScoring,
}

impl<S: EngineSession> PositionEvaluator<S> {
    pub fn new(session: S, scoring: MateScoring) -> Self {
        Self { session, scoring }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn scoring(&self) -> &MateScoring {
        &self.scoring
    }

    /// Evaluate `pos` at `depth`, scores relative to the side to move.
    ///
    /// # Errors
    ///
    /// Engine errors are mapped by kind; a search that ends without ever
    /// reporting a score is an engine failure.
    pub async fn evaluate_position(
        &self,
        pos: &Chess,
        depth: u32,
    ) -> Result<EvaluationResult, AnalysisError> {
        self.evaluate_occurrence(pos, 1, depth).await
    }

    /// Evaluate `pos`, reached for the `occurrences`th time in a game. A
    /// fifth occurrence is a draw and never reaches the engine.
    pub async fn evaluate_occurrence(
        &self,
        pos: &Chess,
        occurrences: u32,
        depth: u32,
    ) -> Result<EvaluationResult, AnalysisError> {
        if let Some(state) = board::terminal_state_in_game(pos, occurrences) {
            tracing::debug!(?state, "terminal position, engine not consulted");
            return Ok(EvaluationResult::terminal(state == TerminalState::Checkmate));
        }

        let fen = board::to_fen(pos);
        let started = Instant::now();
        let report = self.session.evaluate(&fen, depth).await?;
        let elapsed_millis = started.elapsed().as_secs_f64() * 1000.0;

        let score = report.score.ok_or_else(|| {
            EngineError::InvalidResponse(format!("search of {} ended without a score", fen))
        })?;
        let principal_move = report.pv.first().cloned().or(report.best_move);

        tracing::debug!(
            fen = %fen,
            depth,
            reached = ?report.depth,
            ?score,
            elapsed_millis,
            "position evaluated"
        );

        Ok(EvaluationResult::new(
            Evaluation::from_score(score),
            principal_move,
            report.depth.unwrap_or(depth),
            report.nodes,
            elapsed_millis,
        ))
    }
}

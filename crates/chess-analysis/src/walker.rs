//! Walks a game ply by ply and classifies every move.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use shakmaty::{Chess, Position};

use crate::board;
use crate::classifier::{classify, ClassificationInput, GamePhase, MoveQuality};
use crate::evaluator::PositionEvaluator;
use crate::session::EngineSession;
use crate::AnalysisError;

/// What to do when the engine fails on one ply of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop and return the error.
    #[default]
    Abort,
    /// Log the error, leave the ply out and carry on from the next board.
    Skip,
}

/// Analysis of one played move. Evaluations are White-relative centipawns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveClassificationRecord {
    /// 1-based ply number within the game.
    pub move_index: u32,
    /// Position before the move.
    pub position_fen: String,
    pub played_move: String,
    pub engine_best_move: Option<String>,
    /// The engine's reply in the position after the move.
    pub opponent_best_move_after: Option<String>,
    pub evaluation_before_centipawns: i32,
    pub evaluation_after_centipawns: i32,
    pub evaluation_loss_centipawns: f64,
    pub quality: MoveQuality,
    pub game_phase: GamePhase,
}

/// Folds over a move list, producing one record per ply.
pub struct GameWalker<'e, S> {
    evaluator: &'e PositionEvaluator<S>,
}

impl<'e, S: EngineSession> GameWalker<'e, S> {
    pub fn new(evaluator: &'e PositionEvaluator<S>) -> Self {
        Self { evaluator }
    }

    /// Analyze `moves` (UCI) played from `start`.
    ///
    /// The whole list is replayed before the engine is contacted, so a bad
    /// move costs no engine time.
    ///
    /// # Errors
    ///
    /// - `AnalysisError::GameParse` if the list is empty or a move cannot be
    ///   played, naming the ply
    /// - engine errors on any ply when `policy` is [`ErrorPolicy::Abort`]
    pub async fn analyze_game(
        &self,
        start: &Chess,
        moves: &[String],
        depth: u32,
        policy: ErrorPolicy,
    ) -> Result<Vec<MoveClassificationRecord>, AnalysisError> {
        let boards = replay(start, moves)?;
        let mut records = Vec::with_capacity(moves.len());
        let mut seen = Repetitions::default();
        seen.record(start);

        for (i, mv) in moves.iter().enumerate() {
            let ply = i as u32 + 1;
            let outcome = self.classify_ply(&boards[i], mv, ply, depth, &seen).await;
            seen.record(&boards[i + 1]);
            match outcome {
                Ok(record) => {
                    tracing::info!(
                        ply,
                        played = %record.played_move,
                        quality = ?record.quality,
                        loss = record.evaluation_loss_centipawns,
                        "ply classified"
                    );
                    records.push(record);
                }
                Err(err) if policy == ErrorPolicy::Skip => {
                    tracing::warn!(ply, played = %mv, error = %err, "skipping ply");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(records)
    }

    /// Evaluate and classify one move from `before`, numbered `ply`.
    ///
    /// # Errors
    ///
    /// `AnalysisError::InvalidMove` if `played` is not legal in `before`;
    /// engine errors from the before or after evaluation.
    pub async fn analyze_ply(
        &self,
        before: &Chess,
        played: &str,
        ply: u32,
        depth: u32,
    ) -> Result<MoveClassificationRecord, AnalysisError> {
        let mut seen = Repetitions::default();
        seen.record(before);
        self.classify_ply(before, played, ply, depth, &seen).await
    }

    /// One ply of a game whose positions so far, `before` included, are in
    /// `seen`.
    async fn classify_ply(
        &self,
        before: &Chess,
        played: &str,
        ply: u32,
        depth: u32,
        seen: &Repetitions,
    ) -> Result<MoveClassificationRecord, AnalysisError> {
        let scoring = self.evaluator.scoring();
        let played = board::normalize_uci(played);

        let after = board::play_uci(before, &played)?;

        let eval_before = self
            .evaluator
            .evaluate_occurrence(before, seen.count(before).max(1), depth)
            .await?;
        let best_move = eval_before.principal_move().map(str::to_string);
        let eval_after = self
            .evaluator
            .evaluate_occurrence(&after, seen.count(&after) + 1, depth)
            .await?;

        let eval_after_best = match best_move.as_deref() {
            Some(best) if !best.eq_ignore_ascii_case(&played) => {
                self.counterfactual(before, best, depth, seen).await
            }
            _ => None,
        };

        let before_cp = eval_before.white_relative(before.turn(), scoring);
        let after_cp = eval_after.white_relative(after.turn(), scoring);
        let classification = classify(&ClassificationInput {
            eval_before: before_cp,
            eval_after: after_cp,
            eval_after_best,
            mover: before.turn(),
            played_move: &played,
            best_move: best_move.as_deref(),
            ply,
        });

        Ok(MoveClassificationRecord {
            move_index: ply,
            position_fen: board::to_fen(before),
            played_move: played,
            engine_best_move: best_move,
            opponent_best_move_after: eval_after.principal_move().map(str::to_string),
            evaluation_before_centipawns: before_cp,
            evaluation_after_centipawns: after_cp,
            evaluation_loss_centipawns: classification.loss,
            quality: classification.quality,
            game_phase: classification.phase,
        })
    }

    /// White-relative evaluation after `best` instead of the played move.
    ///
    /// Best effort: any failure is logged and treated as unavailable.
    async fn counterfactual(
        &self,
        before: &Chess,
        best: &str,
        depth: u32,
        seen: &Repetitions,
    ) -> Option<i32> {
        let alternative = match board::play_uci(before, best) {
            Ok(pos) => pos,
            Err(err) => {
                tracing::warn!(best, error = %err, "engine suggested an unplayable move");
                return None;
            }
        };
        let occurrences = seen.count(&alternative) + 1;
        if board::terminal_state_in_game(&alternative, occurrences).is_some() {
            return None;
        }

        match self
            .evaluator
            .evaluate_occurrence(&alternative, occurrences, depth)
            .await
        {
            Ok(result) => {
                Some(result.white_relative(alternative.turn(), self.evaluator.scoring()))
            }
            Err(err) => {
                tracing::warn!(best, error = %err, "counterfactual evaluation failed");
                None
            }
        }
    }
}

/// Every board of the game, `start` first and the final position last,
/// checking each move along the way.
fn replay(start: &Chess, moves: &[String]) -> Result<Vec<Chess>, AnalysisError> {
    if moves.is_empty() {
        return Err(AnalysisError::GameParse("move list is empty".to_string()));
    }

    let mut boards = Vec::with_capacity(moves.len() + 1);
    boards.push(start.clone());
    for (i, mv) in moves.iter().enumerate() {
        let next = board::play_uci(&boards[i], mv)
            .map_err(|e| AnalysisError::GameParse(format!("ply {}: {}", i + 1, e)))?;
        boards.push(next);
    }
    Ok(boards)
}

/// How often each position has occurred so far in a game.
#[derive(Debug, Default)]
struct Repetitions(HashMap<String, u32>);

impl Repetitions {
    fn count(&self, pos: &Chess) -> u32 {
        self.0.get(&board::repetition_key(pos)).copied().unwrap_or(0)
    }

    fn record(&mut self, pos: &Chess) {
        *self.0.entry(board::repetition_key(pos)).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::MateScoring;
    use crate::testing::{fen_after, ScriptedSession, START_FEN};

    fn moves(list: &[&str]) -> Vec<String> {
        list.iter().map(|m| m.to_string()).collect()
    }

    fn evaluator(session: &ScriptedSession) -> PositionEvaluator<ScriptedSession> {
        PositionEvaluator::new(session.clone(), MateScoring::default())
    }

    #[tokio::test]
    async fn two_ply_game_uses_counterfactual() {
        let session = ScriptedSession::new()
            .cp(START_FEN, 30, "e2e4")
            .cp(&fen_after(&["e2e4"]), 20, "e7e5")
            .cp(&fen_after(&["e2e4", "a7a6"]), 90, "d2d4")
            .cp(&fen_after(&["e2e4", "e7e5"]), 35, "g1f3");
        let eval = evaluator(&session);
        let walker = GameWalker::new(&eval);

        let records = walker
            .analyze_game(&Chess::default(), &moves(&["e2e4", "a7a6"]), 12, ErrorPolicy::Abort)
            .await
            .unwrap();

        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.move_index, 1);
        assert_eq!(first.position_fen, START_FEN);
        assert_eq!(first.quality, MoveQuality::Best);
        assert_eq!(first.evaluation_loss_centipawns, 0.0);
        assert_eq!(first.evaluation_before_centipawns, 30);
        assert_eq!(first.evaluation_after_centipawns, -20);
        assert_eq!(first.opponent_best_move_after.as_deref(), Some("e7e5"));

        let second = &records[1];
        assert_eq!(second.move_index, 2);
        assert_eq!(second.position_fen, fen_after(&["e2e4"]));
        assert_eq!(second.engine_best_move.as_deref(), Some("e7e5"));
        assert_eq!(second.evaluation_before_centipawns, -20);
        assert_eq!(second.evaluation_after_centipawns, 90);
        // Measured against 1. e4 e5 (+35), not against the position before (-20).
        assert_eq!(second.evaluation_loss_centipawns, 55.0);
        assert_eq!(second.quality, MoveQuality::Inaccuracy);
        assert_eq!(second.game_phase, GamePhase::Opening);
        assert_eq!(second.opponent_best_move_after.as_deref(), Some("d2d4"));

        // Ply 1 skips the counterfactual; ply 2 needs before, after and alternative.
        assert_eq!(session.call_count(), 5);
    }

    #[tokio::test]
    async fn failed_counterfactual_falls_back_to_before() {
        let session = ScriptedSession::new()
            .cp(START_FEN, 30, "e2e4")
            .cp(&fen_after(&["d2d4"]), 15, "d7d5")
            .fail(&fen_after(&["e2e4"]));
        let eval = evaluator(&session);

        let record = GameWalker::new(&eval)
            .analyze_ply(&Chess::default(), "d2d4", 1, 10)
            .await
            .unwrap();
        assert_eq!(record.evaluation_loss_centipawns, 45.0);
        assert_eq!(record.quality, MoveQuality::Inaccuracy);
    }

    #[tokio::test]
    async fn checkmating_move_scores_without_engine() {
        let fools_mate = ["f2f3", "e7e5", "g2g4", "d8h4"];
        let session = ScriptedSession::new()
            .cp(START_FEN, 25, "e2e4")
            .cp(&fen_after(&fools_mate[..1]), 60, "e7e5")
            .cp(&fen_after(&fools_mate[..2]), -70, "d2d4")
            .cp(&fen_after(&fools_mate[..3]), 5000, "d8h4")
            .cp(&fen_after(&["e2e4"]), -25, "e7e5")
            .cp(&fen_after(&["f2f3", "e7e5", "d2d4"]), -60, "d8h4");
        let eval = evaluator(&session);

        let records = GameWalker::new(&eval)
            .analyze_game(&Chess::default(), &moves(&fools_mate), 8, ErrorPolicy::Abort)
            .await
            .unwrap();

        let mate = &records[3];
        assert_eq!(mate.quality, MoveQuality::Best);
        assert_eq!(mate.evaluation_after_centipawns, -10_000);
        assert_eq!(mate.opponent_best_move_after, None);
        assert!(!session.calls().contains(&fen_after(&fools_mate)));
    }

    #[tokio::test]
    async fn fifth_repetition_is_scored_as_draw() {
        let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];
        let game: Vec<&str> = shuffle.iter().cycle().take(16).copied().collect();
        let mut session = ScriptedSession::new();
        for (i, mv) in game.iter().enumerate() {
            session = session.cp(&fen_after(&game[..i]), 10, mv);
        }
        let eval = evaluator(&session);

        let records = GameWalker::new(&eval)
            .analyze_game(&Chess::default(), &moves(&game), 6, ErrorPolicy::Abort)
            .await
            .unwrap();

        assert_eq!(records.len(), 16);
        // Fourth time in the start position: still a live game.
        assert_eq!(records[11].evaluation_after_centipawns, 10);
        let last = &records[15];
        assert_eq!(last.evaluation_after_centipawns, 0);
        assert_eq!(last.opponent_best_move_after, None);
        assert!(!session.calls().contains(&fen_after(&game)));
        // Each ply's before board, plus the after boards of plies 1 to 15.
        assert_eq!(session.call_count(), 31);
    }

    #[tokio::test]
    async fn played_move_is_echoed_lowercase() {
        let session = ScriptedSession::new()
            .cp(START_FEN, 30, "e2e4")
            .cp(&fen_after(&["e2e4"]), -30, "e7e5");
        let eval = evaluator(&session);

        let records = GameWalker::new(&eval)
            .analyze_game(&Chess::default(), &moves(&["E2E4"]), 8, ErrorPolicy::Abort)
            .await
            .unwrap();
        assert_eq!(records[0].played_move, "e2e4");
        assert_eq!(records[0].quality, MoveQuality::Best);
    }

    #[tokio::test]
    async fn bad_moves_fail_before_engine_contact() {
        let session = ScriptedSession::new();
        let eval = evaluator(&session);
        let walker = GameWalker::new(&eval);

        let err = walker
            .analyze_game(&Chess::default(), &moves(&["e2e4", "e2e4"]), 5, ErrorPolicy::Skip)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::GameParse(ref msg) if msg.starts_with("ply 2")));

        let err = walker
            .analyze_game(&Chess::default(), &[], 5, ErrorPolicy::Abort)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::GameParse(_)));
        assert_eq!(session.call_count(), 0);
    }

    fn flaky_session() -> ScriptedSession {
        ScriptedSession::new()
            .cp(START_FEN, 30, "e2e4")
            .cp(&fen_after(&["e2e4"]), -30, "e7e5")
            .fail(&fen_after(&["e2e4", "e7e5"]))
            .cp(&fen_after(&["e2e4", "e7e5", "g1f3"]), -35, "b8c6")
            .cp(&fen_after(&["e2e4", "e7e5", "g1f3", "b8c6"]), 30, "f1b5")
    }

    #[tokio::test]
    async fn skip_policy_keeps_walking() {
        let session = flaky_session();
        let eval = evaluator(&session);

        let records = GameWalker::new(&eval)
            .analyze_game(
                &Chess::default(),
                &moves(&["e2e4", "e7e5", "g1f3", "b8c6"]),
                10,
                ErrorPolicy::Skip,
            )
            .await
            .unwrap();

        let indices: Vec<u32> = records.iter().map(|r| r.move_index).collect();
        assert_eq!(indices, vec![1, 4]);
        assert_eq!(records[1].position_fen, fen_after(&["e2e4", "e7e5", "g1f3"]));
        assert_eq!(records[1].quality, MoveQuality::Best);
    }

    #[tokio::test]
    async fn abort_policy_returns_engine_error() {
        let session = flaky_session();
        let eval = evaluator(&session);

        let err = GameWalker::new(&eval)
            .analyze_game(
                &Chess::default(),
                &moves(&["e2e4", "e7e5", "g1f3", "b8c6"]),
                10,
                ErrorPolicy::Abort,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::EngineFailure(_)));
    }

    #[tokio::test]
    async fn single_move_rejects_illegal_input() {
        let session = ScriptedSession::new().cp(START_FEN, 30, "e2e4");
        let eval = evaluator(&session);
        let walker = GameWalker::new(&eval);
        let err = walker
            .analyze_ply(&Chess::default(), "e1e3", 1, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidMove(_)));
        assert_eq!(session.call_count(), 0);
    }
}

//! Caller-facing analysis operations.
//!
//! Every operation validates its input (depth, FEN, moves) before the engine
//! is contacted.

use shakmaty::Chess;

use crate::board;
use crate::config::{AnalysisConfig, MAX_DEPTH, MIN_DEPTH};
use crate::evaluation::EvaluationResult;
use crate::evaluator::PositionEvaluator;
use crate::pgn::{self, ParsedGame};
use crate::session::EngineSession;
use crate::walker::{ErrorPolicy, GameWalker, MoveClassificationRecord};
use crate::AnalysisError;

/// Analysis entry points over one engine session.
pub struct AnalysisService<S> {
    evaluator: PositionEvaluator<S>,
    default_depth: u32,
}

impl<S: EngineSession> AnalysisService<S> {
    pub fn new(session: S, config: &AnalysisConfig) -> Self {
        Self {
            evaluator: PositionEvaluator::new(session, config.mate),
            default_depth: config.default_depth,
        }
    }

    pub fn session(&self) -> &S {
        self.evaluator.session()
    }

    /// The requested depth, or the configured default when `None`.
    ///
    /// # Errors
    ///
    /// `AnalysisError::InvalidDepth` outside 1..=25.
    pub fn resolve_depth(&self, depth: Option<u32>) -> Result<u32, AnalysisError> {
        let depth = depth.unwrap_or(self.default_depth);
        if (MIN_DEPTH..=MAX_DEPTH).contains(&depth) {
            Ok(depth)
        } else {
            Err(AnalysisError::InvalidDepth(depth))
        }
    }

    /// Evaluate one position given as FEN.
    pub async fn evaluate_single_position(
        &self,
        fen: &str,
        depth: Option<u32>,
    ) -> Result<EvaluationResult, AnalysisError> {
        let depth = self.resolve_depth(depth)?;
        let pos = board::parse_fen(fen)?;
        self.evaluator.evaluate_position(&pos, depth).await
    }

    /// Classify every move of a game given as UCI moves, from `start_fen` or
    /// the standard starting position.
    pub async fn analyze_game(
        &self,
        moves: &[String],
        start_fen: Option<&str>,
        depth: Option<u32>,
        policy: ErrorPolicy,
    ) -> Result<Vec<MoveClassificationRecord>, AnalysisError> {
        let depth = self.resolve_depth(depth)?;
        let start = match start_fen {
            Some(fen) => board::parse_fen(fen)?,
            None => Chess::default(),
        };
        GameWalker::new(&self.evaluator)
            .analyze_game(&start, moves, depth, policy)
            .await
    }

    /// Classify the mainline of the first game in `pgn`.
    pub async fn analyze_pgn(
        &self,
        pgn: &str,
        depth: Option<u32>,
        policy: ErrorPolicy,
    ) -> Result<Vec<MoveClassificationRecord>, AnalysisError> {
        let depth = self.resolve_depth(depth)?;
        let game = pgn::parse_first_game(pgn)?;
        self.walk_parsed(&game, depth, policy).await
    }

    /// Classify an already parsed game.
    pub async fn analyze_parsed(
        &self,
        game: &ParsedGame,
        depth: Option<u32>,
        policy: ErrorPolicy,
    ) -> Result<Vec<MoveClassificationRecord>, AnalysisError> {
        let depth = self.resolve_depth(depth)?;
        self.walk_parsed(game, depth, policy).await
    }

    async fn walk_parsed(
        &self,
        game: &ParsedGame,
        depth: u32,
        policy: ErrorPolicy,
    ) -> Result<Vec<MoveClassificationRecord>, AnalysisError> {
        tracing::info!(
            plies = game.moves.len(),
            white = game.tag("White").unwrap_or("?"),
            black = game.tag("Black").unwrap_or("?"),
            depth,
            "analyzing game"
        );
        GameWalker::new(&self.evaluator)
            .analyze_game(&game.start, &game.moves, depth, policy)
            .await
    }

    /// Classify a single move played from `fen`. The record is numbered ply 1.
    pub async fn classify_single_move(
        &self,
        fen: &str,
        played: &str,
        depth: Option<u32>,
    ) -> Result<MoveClassificationRecord, AnalysisError> {
        let depth = self.resolve_depth(depth)?;
        let pos = board::parse_fen(fen)?;
        board::parse_move(&pos, played)?;
        GameWalker::new(&self.evaluator)
            .analyze_ply(&pos, played, 1, depth)
            .await
    }
}

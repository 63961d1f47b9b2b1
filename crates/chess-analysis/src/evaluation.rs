//! Chess position evaluation types.

use serde::{Deserialize, Serialize};
use shakmaty::Color;
use uci::Score;

/// Represents a chess position evaluation, relative to the side to move.
///
/// Evaluations can be either centipawn scores (for normal positions)
/// or mate scores (when a forced mate is found).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Centipawn evaluation (positive = side to move is better)
    Centipawns(i32),
    /// Mate in N moves (positive = side to move mates, negative = gets mated,
    /// zero = side to move is already mated)
    Mate(i32),
}

/// Serialized tag of an [`Evaluation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    Centipawns,
    Mate,
}

/// Numeric stand-ins used when a mate has to be compared against centipawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MateScoring {
    /// Value of a delivered checkmate.
    pub checkmate: i32,
    /// Value of a forced mate; mate in `n` counts as `cap - n`.
    pub cap: i32,
}

impl Default for MateScoring {
    fn default() -> Self {
        Self {
            checkmate: 10_000,
            cap: 100_000,
        }
    }
}

impl Evaluation {
    pub fn from_score(score: Score) -> Self {
        match score {
            Score::Cp(cp) => Evaluation::Centipawns(cp),
            Score::Mate(n) => Evaluation::Mate(n),
        }
    }

    /// The same evaluation seen from the other side.
    pub fn flip(self) -> Self {
        match self {
            Evaluation::Centipawns(cp) => Evaluation::Centipawns(-cp),
            Evaluation::Mate(n) => Evaluation::Mate(-n),
        }
    }

    pub fn kind(self) -> ScoreKind {
        match self {
            Evaluation::Centipawns(_) => ScoreKind::Centipawns,
            Evaluation::Mate(_) => ScoreKind::Mate,
        }
    }

    /// Collapse to a single signed number for comparisons.
    pub fn to_centipawns(self, scoring: &MateScoring) -> i32 {
        match self {
            Evaluation::Centipawns(cp) => cp,
            Evaluation::Mate(0) => -scoring.checkmate,
            Evaluation::Mate(n) if n > 0 => scoring.cap - n,
            Evaluation::Mate(n) => -scoring.cap - n,
        }
    }
}

/// Interpreted outcome of evaluating one position.
///
/// Fields are private so a mate result always reports a zero raw score and
/// a mate distance, and a centipawn result never reports a mate distance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    raw_score_centipawns: i32,
    kind: ScoreKind,
    mate_distance: Option<i32>,
    principal_move: Option<String>,
    depth_reached: u32,
    node_count: Option<u64>,
    elapsed_millis: f64,
}

impl EvaluationResult {
    pub fn new(
        evaluation: Evaluation,
        principal_move: Option<String>,
        depth_reached: u32,
        node_count: Option<u64>,
        elapsed_millis: f64,
    ) -> Self {
        let (raw_score_centipawns, mate_distance) = match evaluation {
            Evaluation::Centipawns(cp) => (cp, None),
            Evaluation::Mate(n) => (0, Some(n)),
        };
        Self {
            raw_score_centipawns,
            kind: evaluation.kind(),
            mate_distance,
            principal_move,
            depth_reached,
            node_count,
            elapsed_millis,
        }
    }

    /// Result for a position with no game left: mate 0 when checkmated,
    /// otherwise a dead draw.
    pub fn terminal(checkmated: bool) -> Self {
        let evaluation = if checkmated {
            Evaluation::Mate(0)
        } else {
            Evaluation::Centipawns(0)
        };
        Self::new(evaluation, None, 0, None, 0.0)
    }

    pub fn evaluation(&self) -> Evaluation {
        match self.mate_distance {
            Some(n) => Evaluation::Mate(n),
            None => Evaluation::Centipawns(self.raw_score_centipawns),
        }
    }

    pub fn raw_score_centipawns(&self) -> i32 {
        self.raw_score_centipawns
    }

    pub fn kind(&self) -> ScoreKind {
        self.kind
    }

    pub fn mate_distance(&self) -> Option<i32> {
        self.mate_distance
    }

    pub fn principal_move(&self) -> Option<&str> {
        self.principal_move.as_deref()
    }

    pub fn depth_reached(&self) -> u32 {
        self.depth_reached
    }

    pub fn node_count(&self) -> Option<u64> {
        self.node_count
    }

    pub fn elapsed_millis(&self) -> f64 {
        self.elapsed_millis
    }

    /// Score as a signed number from White's point of view, given who was to
    /// move when the position was evaluated.
    pub fn white_relative(&self, side_to_move: Color, scoring: &MateScoring) -> i32 {
        let relative = self.evaluation().to_centipawns(scoring);
        match side_to_move {
            Color::White => relative,
            Color::Black => -relative,
        }
    }
}

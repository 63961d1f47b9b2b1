//! Move quality classification.
//!
//! Everything here is a pure function of its inputs: no engine, no board.

use serde::{Deserialize, Serialize};
use shakmaty::Color;

/// Classification of move quality based on evaluation loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveQuality {
    /// The move the engine recommended
    Best,
    /// Loss under 10 centipawns
    Excellent,
    /// Loss under 30 centipawns
    Good,
    /// Loss under 100 centipawns
    Inaccuracy,
    /// Loss under 300 centipawns
    Mistake,
    /// Anything worse
    Blunder,
}

impl MoveQuality {
    /// Threshold table. Never yields [`MoveQuality::Best`].
    pub fn from_loss(loss: f64) -> Self {
        if loss < 10.0 {
            MoveQuality::Excellent
        } else if loss < 30.0 {
            MoveQuality::Good
        } else if loss < 100.0 {
            MoveQuality::Inaccuracy
        } else if loss < 300.0 {
            MoveQuality::Mistake
        } else {
            MoveQuality::Blunder
        }
    }

    /// Best, excellent and good moves count towards accuracy.
    pub fn is_accurate(self) -> bool {
        matches!(
            self,
            MoveQuality::Best | MoveQuality::Excellent | MoveQuality::Good
        )
    }
}

/// Game phase by ply number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

impl GamePhase {
    pub fn from_ply(ply: u32) -> Self {
        match ply {
            0..=20 => GamePhase::Opening,
            21..=40 => GamePhase::Middlegame,
            _ => GamePhase::Endgame,
        }
    }
}

/// Everything the classifier looks at. Evaluations are White-relative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationInput<'a> {
    pub eval_before: i32,
    pub eval_after: i32,
    /// Evaluation after the engine's move instead of the played one.
    pub eval_after_best: Option<i32>,
    pub mover: Color,
    pub played_move: &'a str,
    pub best_move: Option<&'a str>,
    /// 1-based ply number.
    pub ply: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub quality: MoveQuality,
    pub phase: GamePhase,
    /// Centipawns given away, never negative.
    pub loss: f64,
}

/// Classify one move.
///
/// A position the engine scores dead level before and after is `Good`, even
/// when the engine's own move was played. Otherwise playing the engine's move
/// is `Best` with no loss, and any other move is measured against the
/// engine's alternative when it was evaluated, falling back to the
/// evaluation before the move.
pub fn classify(input: &ClassificationInput<'_>) -> Classification {
    let phase = GamePhase::from_ply(input.ply);

    if input.eval_before == 0 && input.eval_after == 0 {
        return Classification {
            quality: MoveQuality::Good,
            phase,
            loss: 0.0,
        };
    }

    let played_best = input
        .best_move
        .is_some_and(|best| best.eq_ignore_ascii_case(input.played_move));
    if played_best {
        return Classification {
            quality: MoveQuality::Best,
            phase,
            loss: 0.0,
        };
    }

    // Work from the mover's point of view.
    let sign = match input.mover {
        Color::White => 1i64,
        Color::Black => -1i64,
    };
    let before = sign * i64::from(input.eval_before);
    let after = sign * i64::from(input.eval_after);
    let reference = input
        .eval_after_best
        .map(|best| sign * i64::from(best))
        .unwrap_or(before);

    let loss = (after - reference).abs() as f64;

    Classification {
        quality: MoveQuality::from_loss(loss),
        phase,
        loss,
    }
}

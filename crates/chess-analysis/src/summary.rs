//! Per-player statistics over a classified game.

use serde::Serialize;
use shakmaty::Color;

use crate::classifier::MoveQuality;
use crate::walker::MoveClassificationRecord;

/// Statistics for a player's performance in a game.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerStats {
    /// Total moves analyzed
    pub total_moves: u32,
    pub best_moves: u32,
    pub excellent_moves: u32,
    pub good_moves: u32,
    pub inaccuracies: u32,
    pub mistakes: u32,
    pub blunders: u32,
    /// Average centipawn loss
    pub avg_cp_loss: f64,
    /// Share of best, excellent and good moves (0-100)
    pub accuracy_percent: f64,
}

impl PlayerStats {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a MoveClassificationRecord>,
    {
        let mut stats = PlayerStats::default();
        let mut total_loss = 0.0;
        let mut accurate = 0u32;

        for record in records {
            stats.total_moves += 1;
            total_loss += record.evaluation_loss_centipawns;
            if record.quality.is_accurate() {
                accurate += 1;
            }
            match record.quality {
                MoveQuality::Best => stats.best_moves += 1,
                MoveQuality::Excellent => stats.excellent_moves += 1,
                MoveQuality::Good => stats.good_moves += 1,
                MoveQuality::Inaccuracy => stats.inaccuracies += 1,
                MoveQuality::Mistake => stats.mistakes += 1,
                MoveQuality::Blunder => stats.blunders += 1,
            }
        }

        if stats.total_moves > 0 {
            let total = f64::from(stats.total_moves);
            stats.avg_cp_loss = total_loss / total;
            stats.accuracy_percent = 100.0 * f64::from(accurate) / total;
        }
        stats
    }
}

/// Both players' statistics for one game.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GameSummary {
    pub white: PlayerStats,
    pub black: PlayerStats,
}

impl GameSummary {
    /// Splits `records` by mover. Odd plies belong to `first_mover`; skipped
    /// plies leave gaps but do not shift the parity.
    pub fn from_records(records: &[MoveClassificationRecord], first_mover: Color) -> Self {
        let mover = |record: &MoveClassificationRecord| {
            if record.move_index % 2 == 1 {
                first_mover
            } else {
                !first_mover
            }
        };

        Self {
            white: PlayerStats::from_records(records.iter().filter(|r| mover(r) == Color::White)),
            black: PlayerStats::from_records(records.iter().filter(|r| mover(r) == Color::Black)),
        }
    }
}

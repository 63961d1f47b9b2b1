//! Thin adapter over `shakmaty` for the handful of board queries analysis needs.

use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Move, Position};

use crate::AnalysisError;

/// Halfmove clock value at which the 75-move rule ends the game.
const SEVENTY_FIVE_MOVE_HALFMOVES: u32 = 150;

/// Occurrences of one position that end the game.
pub const FIVEFOLD_REPETITION: u32 = 5;

/// Why a position has no game left to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    /// Side to move is mated.
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    SeventyFiveMoveRule,
    FivefoldRepetition,
}

/// Parse a FEN string into a legal position.
pub fn parse_fen(fen: &str) -> Result<Chess, AnalysisError> {
    let parsed: Fen = fen
        .trim()
        .parse()
        .map_err(|e| AnalysisError::InvalidPosition(format!("{}: {}", fen, e)))?;
    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| AnalysisError::InvalidPosition(format!("{}: {}", fen, e)))
}

/// Encode a position as FEN.
pub fn to_fen(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

/// Canonical spelling of a UCI move as typed: trimmed, lowercase.
pub fn normalize_uci(uci: &str) -> String {
    uci.trim().to_ascii_lowercase()
}

/// Parse a UCI move string and check that it is legal in `pos`.
///
/// Case is ignored, so `E2E4` and `e7e8Q` are accepted.
pub fn parse_move(pos: &Chess, uci: &str) -> Result<Move, AnalysisError> {
    let parsed: UciMove = normalize_uci(uci)
        .parse()
        .map_err(|_| AnalysisError::InvalidMove(format!("'{}' is not UCI notation", uci)))?;
    parsed.to_move(pos).map_err(|_| {
        AnalysisError::InvalidMove(format!("'{}' is illegal in {}", uci, to_fen(pos)))
    })
}

/// UCI notation of a legal move.
pub fn move_to_uci(mv: &Move) -> String {
    mv.to_uci(CastlingMode::Standard).to_string()
}

/// Play a UCI move and return the resulting position.
pub fn play_uci(pos: &Chess, uci: &str) -> Result<Chess, AnalysisError> {
    let mv = parse_move(pos, uci)?;
    pos.clone()
        .play(mv)
        .map_err(|e| AnalysisError::InvalidMove(format!("'{}': {}", uci, e)))
}

/// FEN without the move counters: equal keys are the same position for
/// repetition purposes.
pub fn repetition_key(pos: &Chess) -> String {
    to_fen(pos)
        .split_whitespace()
        .take(4)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Like [`terminal_state`], for a position reached for the `occurrences`th
/// time in a game.
pub fn terminal_state_in_game(pos: &Chess, occurrences: u32) -> Option<TerminalState> {
    terminal_state(pos).or_else(|| {
        (occurrences >= FIVEFOLD_REPETITION).then_some(TerminalState::FivefoldRepetition)
    })
}

/// Report whether the game is over in `pos`, and why.
///
/// Repetition needs the game's history; see [`terminal_state_in_game`].
pub fn terminal_state(pos: &Chess) -> Option<TerminalState> {
    if pos.is_checkmate() {
        Some(TerminalState::Checkmate)
    } else if pos.is_stalemate() {
        Some(TerminalState::Stalemate)
    } else if pos.is_insufficient_material() {
        Some(TerminalState::InsufficientMaterial)
    } else if pos.halfmoves() >= SEVENTY_FIVE_MOVE_HALFMOVES {
        Some(TerminalState::SeventyFiveMoveRule)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn fen_round_trip_of_start_position() {
        let pos = parse_fen(START).unwrap();
        assert_eq!(to_fen(&pos), START);
        assert_eq!(to_fen(&Chess::default()), START);
    }

    #[test]
    fn rejects_garbage_fen() {
        assert!(matches!(
            parse_fen("not a fen"),
            Err(AnalysisError::InvalidPosition(_))
        ));
        // Two white kings.
        assert!(matches!(
            parse_fen("4k3/8/8/8/8/8/8/K3K3 w - - 0 1"),
            Err(AnalysisError::InvalidPosition(_))
        ));
    }

    #[test]
    fn plays_legal_moves_only() {
        let pos = Chess::default();
        let after = play_uci(&pos, "e2e4").unwrap();
        assert_eq!(
            to_fen(&after),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
        );
        assert!(matches!(play_uci(&pos, "e2e5"), Err(AnalysisError::InvalidMove(_))));
        assert!(matches!(play_uci(&pos, "zz"), Err(AnalysisError::InvalidMove(_))));
    }

    #[test]
    fn move_case_is_ignored() {
        let pos = Chess::default();
        assert_eq!(
            to_fen(&play_uci(&pos, "E2E4").unwrap()),
            to_fen(&play_uci(&pos, "e2e4").unwrap())
        );
        assert!(play_uci(&pos, " G1F3 ").is_ok());
        assert_eq!(normalize_uci(" E7E8Q "), "e7e8q");

        let promotion = parse_fen("8/4P3/8/8/8/8/k7/4K3 w - - 0 1").unwrap();
        let mv = parse_move(&promotion, "E7E8Q").unwrap();
        assert_eq!(move_to_uci(&mv), "e7e8q");
    }

    #[test]
    fn castling_uses_king_destination() {
        let pos = parse_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let mv = parse_move(&pos, "e1g1").unwrap();
        assert_eq!(move_to_uci(&mv), "e1g1");
    }

    #[test]
    fn detects_terminal_states() {
        let mated = parse_fen("7k/6Q1/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(terminal_state(&mated), Some(TerminalState::Checkmate));

        let stalemate = parse_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(terminal_state(&stalemate), Some(TerminalState::Stalemate));

        let bare_kings = parse_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(
            terminal_state(&bare_kings),
            Some(TerminalState::InsufficientMaterial)
        );

        let stale_clock = parse_fen("4k3/8/8/8/8/8/8/R3K3 w - - 150 120").unwrap();
        assert_eq!(
            terminal_state(&stale_clock),
            Some(TerminalState::SeventyFiveMoveRule)
        );

        assert_eq!(terminal_state(&Chess::default()), None);
    }

    #[test]
    fn fifth_occurrence_ends_the_game() {
        let start = Chess::default();
        assert_eq!(terminal_state_in_game(&start, 4), None);
        assert_eq!(
            terminal_state_in_game(&start, 5),
            Some(TerminalState::FivefoldRepetition)
        );

        let mated = parse_fen("7k/6Q1/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(
            terminal_state_in_game(&mated, 5),
            Some(TerminalState::Checkmate)
        );
    }

    #[test]
    fn repetition_key_ignores_move_counters() {
        let mut pos = Chess::default();
        for mv in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            pos = play_uci(&pos, mv).unwrap();
        }
        assert_ne!(to_fen(&pos), to_fen(&Chess::default()));
        assert_eq!(repetition_key(&pos), repetition_key(&Chess::default()));
        assert_eq!(
            repetition_key(&pos),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -"
        );
    }
}

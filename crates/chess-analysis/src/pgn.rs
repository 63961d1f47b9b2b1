//! Reads the first game of a PGN text into a start position and UCI mainline.

use std::io::Cursor;
use std::ops::ControlFlow;

use pgn_reader::{RawTag, SanPlus, Skip, Visitor};
use shakmaty::{Chess, Position};

use crate::board;
use crate::AnalysisError;

/// A game ready to be walked ply by ply.
#[derive(Debug, Clone)]
pub struct ParsedGame {
    /// Start position, taken from the `FEN` tag when present.
    pub start: Chess,
    /// Mainline in UCI notation; variations are dropped.
    pub moves: Vec<String>,
    /// Header tags in file order.
    pub tags: Vec<(String, String)>,
}

impl ParsedGame {
    /// Value of the first tag called `name`.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

struct Mainline {
    tags: Vec<(String, String)>,
    start: Chess,
    position: Chess,
    moves: Vec<String>,
}

struct GameReader;

impl Visitor for GameReader {
    type Tags = Vec<(String, String)>;
    type Movetext = Mainline;
    type Output = Result<ParsedGame, String>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(Vec::new())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        tags.push((
            String::from_utf8_lossy(name).into_owned(),
            value.decode_utf8_lossy().into_owned(),
        ));
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        let start = match tags.iter().find(|(n, _)| n == "FEN") {
            Some((_, fen)) => match board::parse_fen(fen) {
                Ok(pos) => pos,
                Err(e) => return ControlFlow::Break(Err(e.to_string())),
            },
            None => Chess::default(),
        };

        ControlFlow::Continue(Mainline {
            tags,
            position: start.clone(),
            start,
            moves: Vec::new(),
        })
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        let ply = movetext.moves.len() + 1;
        let mv = match san.san.to_move(&movetext.position) {
            Ok(mv) => mv,
            Err(_) => {
                return ControlFlow::Break(Err(format!(
                    "ply {}: '{}' is illegal in {}",
                    ply,
                    san,
                    board::to_fen(&movetext.position)
                )))
            }
        };

        movetext.moves.push(board::move_to_uci(&mv));
        match movetext.position.clone().play(mv) {
            Ok(next) => {
                movetext.position = next;
                ControlFlow::Continue(())
            }
            Err(e) => ControlFlow::Break(Err(format!("ply {}: {}", ply, e))),
        }
    }

    fn begin_variation(
        &mut self,
        _movetext: &mut Self::Movetext,
    ) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        Ok(ParsedGame {
            start: movetext.start,
            moves: movetext.moves,
            tags: movetext.tags,
        })
    }
}

/// Parse the first game found in `pgn`.
///
/// # Errors
///
/// Returns [`AnalysisError::GameParse`] when the text holds no game, the game
/// has no moves, or a move cannot be played.
pub fn parse_first_game(pgn: &str) -> Result<ParsedGame, AnalysisError> {
    let mut reader = pgn_reader::Reader::new(Cursor::new(pgn.as_bytes()));

    let game = reader
        .read_game(&mut GameReader)
        .map_err(|e| AnalysisError::GameParse(e.to_string()))?
        .ok_or_else(|| AnalysisError::GameParse("no game found".to_string()))?
        .map_err(AnalysisError::GameParse)?;

    if game.moves.is_empty() {
        return Err(AnalysisError::GameParse("game has no moves".to_string()));
    }
    Ok(game)
}

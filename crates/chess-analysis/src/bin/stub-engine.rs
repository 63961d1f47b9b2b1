//! Deterministic UCI engine for development and tests.
//!
//! Plays the first legal move in UCI order unless a mate in one is
//! available, and scores positions by material from the side to move.
//! Flags simulate the failures a real engine can show.

use std::thread;
use std::time::Duration;

use clap::Parser;
use shakmaty::{Chess, Color, Piece, Position, Role};
use uci::{stdio_engine, GuiCommand, InfoBuilder, Score, ScoreBound, UciError};

use chess_analysis::board;

#[derive(Parser, Debug)]
#[command(name = "stub-engine", about = "Deterministic UCI engine for tests")]
struct Args {
    /// Exit without answering the first `go`.
    #[arg(long)]
    exit_on_go: bool,

    /// Exit without answering `uci`.
    #[arg(long)]
    exit_on_uci: bool,

    /// Sleep this long before answering each `go`.
    #[arg(long, value_name = "N", default_value_t = 0)]
    delay_ms: u64,
}

fn main() -> Result<(), UciError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let args = Args::parse();

    let mut engine = stdio_engine();
    let mut position = Chess::default();

    loop {
        let cmd = match engine.read_command() {
            Ok(cmd) => cmd,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable command");
                continue;
            }
        };

        match cmd {
            GuiCommand::Uci => {
                if args.exit_on_uci {
                    std::process::exit(1);
                }
                engine.send_id("StubEngine", "chess-analysis")?;
                engine.send_uciok()?;
            }

            GuiCommand::IsReady => engine.send_readyok()?,

            GuiCommand::SetOption { name, value } => {
                tracing::debug!(%name, ?value, "option ignored");
            }

            GuiCommand::UciNewGame => position = Chess::default(),

            GuiCommand::Position { fen, moves } => {
                position = match setup(fen.as_deref(), &moves) {
                    Ok(pos) => pos,
                    Err(e) => {
                        tracing::warn!(error = %e, "bad position, keeping the previous one");
                        position
                    }
                };
            }

            GuiCommand::Go(opts) => {
                if args.exit_on_go {
                    std::process::exit(1);
                }
                thread::sleep(Duration::from_millis(args.delay_ms));

                let depth = opts.depth.unwrap_or(1).max(1);
                match choose(&position) {
                    Some((best, score)) => {
                        for d in 1..=depth {
                            if let Score::Cp(cp) = score {
                                engine.send_info(
                                    InfoBuilder::new()
                                        .depth(d)
                                        .score(Score::Cp(cp + 50))
                                        .bound(ScoreBound::Lower)
                                        .build(),
                                )?;
                            }
                            engine.send_info(
                                InfoBuilder::new()
                                    .depth(d)
                                    .seldepth(d + 1)
                                    .score(score)
                                    .nodes(u64::from(d) * 100)
                                    .time(u64::from(d))
                                    .pv(vec![best.clone()])
                                    .build(),
                            )?;
                        }
                        engine.send_bestmove(Some(best.as_str()))?;
                    }
                    None => {
                        let score = if position.is_checkmate() {
                            Score::Mate(0)
                        } else {
                            Score::Cp(0)
                        };
                        engine.send_info(InfoBuilder::new().depth(0).score(score).build())?;
                        engine.send_bestmove(None)?;
                    }
                }
            }

            GuiCommand::Stop | GuiCommand::Unknown(_) => {}

            GuiCommand::Quit => break,
        }
    }

    Ok(())
}

fn setup(fen: Option<&str>, moves: &[String]) -> Result<Chess, chess_analysis::AnalysisError> {
    let mut pos = match fen {
        Some(f) => board::parse_fen(f)?,
        None => Chess::default(),
    };
    for mv in moves {
        pos = board::play_uci(&pos, mv)?;
    }
    Ok(pos)
}

/// Best move and score, or `None` when there is no legal move.
fn choose(pos: &Chess) -> Option<(String, Score)> {
    let mut moves: Vec<(String, Chess)> = pos
        .legal_moves()
        .into_iter()
        .filter_map(|mv| {
            let uci = board::move_to_uci(&mv);
            pos.clone().play(mv).ok().map(|after| (uci, after))
        })
        .collect();
    moves.sort_by(|a, b| a.0.cmp(&b.0));

    if let Some((uci, _)) = moves.iter().find(|(_, after)| after.is_checkmate()) {
        return Some((uci.clone(), Score::Mate(1)));
    }
    let (first, _) = moves.into_iter().next()?;
    Some((first, Score::Cp(material(pos, pos.turn()))))
}

fn material(pos: &Chess, side: Color) -> i32 {
    let value = |color: Color| -> i32 {
        Role::ALL
            .iter()
            .map(|&role| {
                let count = pos.board().by_piece(Piece { color, role }).count() as i32;
                count * piece_value(role)
            })
            .sum()
    };
    value(side) - value(!side)
}

fn piece_value(role: Role) -> i32 {
    match role {
        Role::Pawn => 100,
        Role::Knight | Role::Bishop => 300,
        Role::Rook => 500,
        Role::Queen => 900,
        Role::King => 0,
    }
}

//! UCI (Universal Chess Interface) protocol library.
//!
//! This crate covers both ends of the protocol: [`UciEngine`] for writing an
//! engine that answers a GUI, and [`UciClient`] for driving an external
//! engine such as Stockfish from an analysis program.
//!
//! # Commands used by the client
//!
//! - `uci` / `uciok` - Enter UCI mode, collect id and options
//! - `setoption name <n> value <v>` - Configure the engine
//! - `isready` / `readyok` - Synchronization
//! - `ucinewgame` - Forget everything learned from earlier searches
//! - `position fen <fen>` - Set position
//! - `go depth <d>` - Fixed-depth search, answered by `info` lines and `bestmove`
//! - `quit` - Exit engine

mod client;
mod command;
mod info;

pub use client::{EngineIdentity, SearchReport, UciClient, MAX_HANDSHAKE_LINES};
pub use command::{GoOptions, GuiCommand};
pub use info::{EngineInfo, InfoBuilder, Score, ScoreBound};

use std::io::{BufRead, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UciError {
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Engine closed the connection")]
    Disconnected,
    #[error("Protocol violation: {0}")]
    Protocol(String),
}

/// Messages sent from engine to GUI.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    /// Engine identification.
    Id { name: Option<String>, author: Option<String> },
    /// UCI initialization complete.
    UciOk,
    /// Engine is ready.
    ReadyOk,
    /// Search information.
    Info(EngineInfo),
    /// Best move found. Engines without a legal move send `(none)` or `0000`.
    BestMove { mv: String, ponder: Option<String> },
}

impl EngineMessage {
    /// Format message for output.
    pub fn to_uci(&self) -> String {
        match self {
            EngineMessage::Id { name, author } => {
                let mut parts = Vec::new();
                if let Some(n) = name {
                    parts.push(format!("id name {}", n));
                }
                if let Some(a) = author {
                    parts.push(format!("id author {}", a));
                }
                parts.join("\n")
            }
            EngineMessage::UciOk => "uciok".to_string(),
            EngineMessage::ReadyOk => "readyok".to_string(),
            EngineMessage::Info(info) => info.to_uci(),
            EngineMessage::BestMove { mv, ponder } => match ponder {
                Some(p) => format!("bestmove {} ponder {}", mv, p),
                None => format!("bestmove {}", mv),
            },
        }
    }

    /// Parse one line of engine output.
    ///
    /// Returns `None` for lines the client has no use for (`option ...`,
    /// banners, blank lines).
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (keyword, rest) = match line.split_once(char::is_whitespace) {
            Some((k, r)) => (k, r.trim()),
            None => (line, ""),
        };

        match keyword {
            "uciok" => Some(EngineMessage::UciOk),
            "readyok" => Some(EngineMessage::ReadyOk),
            "info" => EngineInfo::parse(line).map(EngineMessage::Info),
            "id" => match rest.split_once(char::is_whitespace) {
                Some(("name", value)) => Some(EngineMessage::Id {
                    name: Some(value.trim().to_string()),
                    author: None,
                }),
                Some(("author", value)) => Some(EngineMessage::Id {
                    name: None,
                    author: Some(value.trim().to_string()),
                }),
                _ => None,
            },
            "bestmove" => {
                let mut tokens = rest.split_whitespace();
                let mv = tokens.next()?.to_string();
                let ponder = match (tokens.next(), tokens.next()) {
                    (Some("ponder"), Some(p)) => Some(p.to_string()),
                    _ => None,
                };
                Some(EngineMessage::BestMove { mv, ponder })
            }
            _ => None,
        }
    }
}

/// Simple UCI engine wrapper for writing bots.
pub struct UciEngine<R: BufRead, W: Write> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> UciEngine<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Read and parse the next command from GUI.
    ///
    /// End of input reads as [`GuiCommand::Quit`].
    pub fn read_command(&mut self) -> Result<GuiCommand, UciError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(GuiCommand::Quit);
        }
        GuiCommand::parse(&line)
    }

    /// Send a message to the GUI.
    pub fn send(&mut self, msg: &EngineMessage) -> Result<(), UciError> {
        writeln!(self.writer, "{}", msg.to_uci())?;
        self.writer.flush()?;
        Ok(())
    }

    /// Send engine identification.
    pub fn send_id(&mut self, name: &str, author: &str) -> Result<(), UciError> {
        self.send(&EngineMessage::Id {
            name: Some(name.to_string()),
            author: Some(author.to_string()),
        })
    }

    /// Send uciok.
    pub fn send_uciok(&mut self) -> Result<(), UciError> {
        self.send(&EngineMessage::UciOk)
    }

    /// Send readyok.
    pub fn send_readyok(&mut self) -> Result<(), UciError> {
        self.send(&EngineMessage::ReadyOk)
    }

    /// Send best move, or `(none)` when the position has no legal move.
    pub fn send_bestmove(&mut self, mv: Option<&str>) -> Result<(), UciError> {
        self.send(&EngineMessage::BestMove {
            mv: mv.unwrap_or("(none)").to_string(),
            ponder: None,
        })
    }

    /// Send search info.
    pub fn send_info(&mut self, info: EngineInfo) -> Result<(), UciError> {
        self.send(&EngineMessage::Info(info))
    }
}

/// Create a UCI engine using stdin/stdout.
pub fn stdio_engine() -> UciEngine<std::io::BufReader<std::io::Stdin>, std::io::Stdout> {
    UciEngine::new(
        std::io::BufReader::new(std::io::stdin()),
        std::io::stdout(),
    )
}

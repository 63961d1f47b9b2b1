//! Blocking client for driving an external UCI engine.
//!
//! The client is transport-agnostic: anything `BufRead` + `Write` works, which
//! is a child process's pipes in production and in-memory buffers in tests.

use std::io::{BufRead, Write};

use crate::{EngineInfo, EngineMessage, GoOptions, GuiCommand, Score, UciError};

/// Upper bound on lines read while waiting for `uciok` or `readyok`.
///
/// Engines list their options during the handshake; a program that never
/// answers is not an engine.
pub const MAX_HANDSHAKE_LINES: usize = 1000;

/// What the engine said about itself during the handshake.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineIdentity {
    pub name: Option<String>,
    pub author: Option<String>,
}

/// Outcome of one search: the last exact `info` report plus `bestmove`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchReport {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    /// Relative to the side to move.
    pub score: Option<Score>,
    pub nodes: Option<u64>,
    pub pv: Vec<String>,
    /// `None` when the engine had no legal move to play.
    pub best_move: Option<String>,
    pub ponder: Option<String>,
}

impl SearchReport {
    fn absorb(&mut self, info: EngineInfo) {
        // Secondary lines of a multi-PV search describe worse moves.
        if info.multipv.is_some_and(|n| n > 1) || !info.is_exact() {
            return;
        }
        self.depth = info.depth.or(self.depth);
        self.seldepth = info.seldepth.or(self.seldepth);
        self.score = info.score;
        self.nodes = info.nodes.or(self.nodes);
        if !info.pv.is_empty() {
            self.pv = info.pv;
        }
    }
}

/// UCI client speaking to one engine over a reader/writer pair.
pub struct UciClient<R: BufRead, W: Write> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> UciClient<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Send one command line and flush.
    pub fn send(&mut self, cmd: &GuiCommand) -> Result<(), UciError> {
        writeln!(self.writer, "{}", cmd.to_uci())?;
        self.writer.flush()?;
        Ok(())
    }

    /// Read lines until one parses as an engine message.
    ///
    /// # Errors
    ///
    /// Returns [`UciError::Disconnected`] when the engine closes its output.
    pub fn read_message(&mut self) -> Result<EngineMessage, UciError> {
        loop {
            if let Some(msg) = self.read_line()? {
                return Ok(msg);
            }
        }
    }

    /// Perform the `uci` / `uciok` exchange.
    pub fn handshake(&mut self) -> Result<EngineIdentity, UciError> {
        self.send(&GuiCommand::Uci)?;

        let mut identity = EngineIdentity::default();
        for _ in 0..MAX_HANDSHAKE_LINES {
            match self.read_line()? {
                Some(EngineMessage::UciOk) => return Ok(identity),
                Some(EngineMessage::Id { name, author }) => {
                    identity.name = name.or(identity.name);
                    identity.author = author.or(identity.author);
                }
                _ => {}
            }
        }

        Err(UciError::Protocol(format!(
            "no uciok within {} lines",
            MAX_HANDSHAKE_LINES
        )))
    }

    /// Send `setoption name <name> value <value>`.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), UciError> {
        self.send(&GuiCommand::SetOption {
            name: name.to_string(),
            value: Some(value.to_string()),
        })
    }

    /// Block until the engine answers `isready`.
    pub fn sync(&mut self) -> Result<(), UciError> {
        self.send(&GuiCommand::IsReady)?;
        for _ in 0..MAX_HANDSHAKE_LINES {
            if let Some(EngineMessage::ReadyOk) = self.read_line()? {
                return Ok(());
            }
        }
        Err(UciError::Protocol(format!(
            "no readyok within {} lines",
            MAX_HANDSHAKE_LINES
        )))
    }

    /// Tell the engine a new game starts, then wait until it is ready.
    pub fn new_game(&mut self) -> Result<(), UciError> {
        self.send(&GuiCommand::UciNewGame)?;
        self.sync()
    }

    /// Search the position given as FEN and wait for `bestmove`.
    ///
    /// There is no line limit here: a deep search legitimately emits many
    /// thousands of `info` lines. The call returns only when the engine
    /// answers or closes its output.
    pub fn search(&mut self, fen: &str, go: GoOptions) -> Result<SearchReport, UciError> {
        self.send(&GuiCommand::Position {
            fen: Some(fen.to_string()),
            moves: Vec::new(),
        })?;
        self.send(&GuiCommand::Go(go))?;

        let mut report = SearchReport::default();
        loop {
            match self.read_message()? {
                EngineMessage::Info(info) => report.absorb(info),
                EngineMessage::BestMove { mv, ponder } => {
                    report.best_move = match mv.as_str() {
                        "(none)" | "0000" => None,
                        _ => Some(mv),
                    };
                    report.ponder = ponder;
                    return Ok(report);
                }
                _ => {}
            }
        }
    }

    fn read_line(&mut self) -> Result<Option<EngineMessage>, UciError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(UciError::Disconnected);
        }
        Ok(EngineMessage::parse(&line))
    }
}

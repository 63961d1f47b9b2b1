//! Commands flowing from the GUI (or analysis client) to the engine.

use std::fmt::Write as _;

use crate::UciError;

/// Commands sent from GUI to engine.
#[derive(Debug, Clone, PartialEq)]
pub enum GuiCommand {
    /// Enter UCI mode.
    Uci,
    /// Synchronization ping, answered by `readyok`.
    IsReady,
    /// The next search belongs to a different game; engines clear their hash.
    UciNewGame,
    /// `setoption name <name> [value <value>]`.
    SetOption { name: String, value: Option<String> },
    /// Set up position. `fen == None` means the standard start position.
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    /// Start calculating.
    Go(GoOptions),
    /// Stop calculating.
    Stop,
    /// Quit the engine.
    Quit,
    /// Anything we do not understand, kept verbatim.
    Unknown(String),
}

/// Options for the `go` command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GoOptions {
    /// Search for exactly this time in milliseconds.
    pub movetime: Option<u64>,
    /// Search to this depth.
    pub depth: Option<u32>,
    /// Search this many nodes.
    pub nodes: Option<u64>,
    /// Search indefinitely until `stop`.
    pub infinite: bool,
}

impl GoOptions {
    /// Fixed-depth search, the only mode the analysis pipeline uses.
    pub fn depth(depth: u32) -> Self {
        Self {
            depth: Some(depth),
            ..Self::default()
        }
    }
}

impl GuiCommand {
    /// Parse a UCI command string.
    pub fn parse(input: &str) -> Result<Self, UciError> {
        let input = input.trim();
        let mut parts = input.split_whitespace();

        match parts.next().unwrap_or("") {
            "uci" => Ok(GuiCommand::Uci),
            "isready" => Ok(GuiCommand::IsReady),
            "ucinewgame" => Ok(GuiCommand::UciNewGame),
            "stop" => Ok(GuiCommand::Stop),
            "quit" => Ok(GuiCommand::Quit),
            "setoption" => Self::parse_setoption(parts),
            "position" => Self::parse_position(parts),
            "go" => Ok(GuiCommand::Go(Self::parse_go(parts))),
            _ => Ok(GuiCommand::Unknown(input.to_string())),
        }
    }

    /// Format the command as a single protocol line (without newline).
    pub fn to_uci(&self) -> String {
        match self {
            GuiCommand::Uci => "uci".to_string(),
            GuiCommand::IsReady => "isready".to_string(),
            GuiCommand::UciNewGame => "ucinewgame".to_string(),
            GuiCommand::Stop => "stop".to_string(),
            GuiCommand::Quit => "quit".to_string(),
            GuiCommand::SetOption { name, value } => match value {
                Some(v) => format!("setoption name {} value {}", name, v),
                None => format!("setoption name {}", name),
            },
            GuiCommand::Position { fen, moves } => {
                let mut line = match fen {
                    Some(f) => format!("position fen {}", f),
                    None => "position startpos".to_string(),
                };
                if !moves.is_empty() {
                    line.push_str(" moves ");
                    line.push_str(&moves.join(" "));
                }
                line
            }
            GuiCommand::Go(opts) => {
                let mut line = "go".to_string();
                if let Some(d) = opts.depth {
                    let _ = write!(line, " depth {}", d);
                }
                if let Some(n) = opts.nodes {
                    let _ = write!(line, " nodes {}", n);
                }
                if let Some(t) = opts.movetime {
                    let _ = write!(line, " movetime {}", t);
                }
                if opts.infinite {
                    line.push_str(" infinite");
                }
                line
            }
            GuiCommand::Unknown(raw) => raw.clone(),
        }
    }

    fn parse_setoption<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Self, UciError> {
        let tokens: Vec<&str> = parts.collect();
        if tokens.first() != Some(&"name") {
            return Err(UciError::ParseError(
                "setoption requires 'name'".to_string(),
            ));
        }

        // Option names and values may both contain spaces.
        let rest = &tokens[1..];
        let (name, value) = match rest.iter().position(|&t| t == "value") {
            Some(idx) => (rest[..idx].join(" "), Some(rest[idx + 1..].join(" "))),
            None => (rest.join(" "), None),
        };
        if name.is_empty() {
            return Err(UciError::ParseError("setoption with empty name".to_string()));
        }

        Ok(GuiCommand::SetOption { name, value })
    }

    fn parse_position<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Self, UciError> {
        let fen = match parts.next() {
            Some("startpos") => None,
            Some("fen") => {
                let fen_parts: Vec<&str> = parts.by_ref().take_while(|&p| p != "moves").collect();
                if fen_parts.is_empty() {
                    return Err(UciError::ParseError("Empty FEN".to_string()));
                }
                Some(fen_parts.join(" "))
            }
            Some(other) => {
                return Err(UciError::ParseError(format!(
                    "Expected 'startpos' or 'fen', got '{}'",
                    other
                )));
            }
            None => {
                return Err(UciError::ParseError(
                    "Expected 'startpos' or 'fen'".to_string(),
                ));
            }
        };

        // `take_while` already swallowed the `moves` keyword for FEN input.
        let moves = parts
            .skip_while(|&p| p == "moves")
            .map(str::to_string)
            .collect();

        Ok(GuiCommand::Position { fen, moves })
    }

    fn parse_go<'a>(mut parts: impl Iterator<Item = &'a str>) -> GoOptions {
        let mut opts = GoOptions::default();

        while let Some(token) = parts.next() {
            match token {
                "depth" => opts.depth = parts.next().and_then(|v| v.parse().ok()),
                "nodes" => opts.nodes = parts.next().and_then(|v| v.parse().ok()),
                "movetime" => opts.movetime = parts.next().and_then(|v| v.parse().ok()),
                "infinite" => opts.infinite = true,
                // Clock parameters carry one value each; skip it.
                "wtime" | "btime" | "winc" | "binc" | "movestogo" => {
                    parts.next();
                }
                _ => {}
            }
        }

        opts
    }
}

//! Chess analyzer - evaluates positions and classifies games from the shell.
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use std::path::PathBuf;

use anyhow::Context;
use chess_analysis::pgn::{self, ParsedGame};
use chess_analysis::{
    board, AnalysisService, AnalyzerConfig, EagerSession, EngineSession, ErrorPolicy,
    GameSummary, Lifecycle, SharedSession,
};
use clap::{Parser, Subcommand};
use shakmaty::{Chess, Position};

#[derive(Parser)]
#[command(name = "chess-analyzer")]
#[command(about = "Engine-backed chess position and move analysis")]
struct Cli {
    /// Search depth (1-25); defaults to the configured depth
    #[arg(short, long, global = true)]
    depth: Option<u32>,

    /// Configuration file; defaults to analyzer.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Engine executable, overriding the configuration
    #[arg(long, global = true)]
    engine: Option<String>,

    /// Launch the engine on first use instead of at startup
    #[arg(long, global = true)]
    lazy: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a single position
    Position {
        /// Position in FEN
        fen: String,
    },
    /// Classify every move of a game
    Game {
        /// Moves in UCI notation
        moves: Vec<String>,
        /// Read the first game of a PGN file instead
        #[arg(long, conflicts_with_all = ["moves", "fen"])]
        pgn: Option<PathBuf>,
        /// Starting position in FEN
        #[arg(long)]
        fen: Option<String>,
        /// Leave out plies the engine fails on instead of stopping
        #[arg(long)]
        skip_errors: bool,
    },
    /// Classify one move played from a position
    Classify {
        /// Position in FEN
        fen: String,
        /// Move in UCI notation
        #[arg(value_name = "MOVE")]
        played: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AnalyzerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?
            .with_env(|key| std::env::var(key).ok())?,
        None => AnalyzerConfig::load()?,
    };
    if let Some(engine) = &cli.engine {
        config.engine.path = engine.clone();
    }
    if cli.lazy {
        config.engine.lifecycle = Lifecycle::Lazy;
    }
    tracing::info!(
        engine = %config.engine.path,
        lifecycle = ?config.engine.lifecycle,
        "configuration loaded"
    );

    let output = match config.engine.lifecycle {
        Lifecycle::Eager => {
            let session = EagerSession::from_config(&config.engine);
            session.start().await?;
            let service = AnalysisService::new(session.clone(), &config.analysis);
            let output = run(&service, cli.depth, cli.command).await;
            if let Err(e) = session.stop().await {
                tracing::warn!(error = %e, "engine did not stop cleanly");
            }
            output?
        }
        Lifecycle::Lazy => {
            let session = SharedSession::from_config(&config.engine);
            let service = AnalysisService::new(session, &config.analysis);
            run(&service, cli.depth, cli.command).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run<S: EngineSession>(
    service: &AnalysisService<S>,
    depth: Option<u32>,
    command: Commands,
) -> anyhow::Result<serde_json::Value> {
    match command {
        Commands::Position { fen } => {
            let result = service.evaluate_single_position(&fen, depth).await?;
            Ok(serde_json::to_value(result)?)
        }

        Commands::Game {
            pgn: Some(path),
            skip_errors,
            ..
        } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let game = pgn::parse_first_game(&text)?;
            let records = service
                .analyze_parsed(&game, depth, policy(skip_errors))
                .await?;
            game_output(&game, records)
        }

        Commands::Game {
            moves,
            pgn: None,
            fen,
            skip_errors,
        } => {
            let start = match fen.as_deref() {
                Some(fen) => board::parse_fen(fen)?,
                None => Chess::default(),
            };
            let records = service
                .analyze_game(&moves, fen.as_deref(), depth, policy(skip_errors))
                .await?;
            game_output(
                &ParsedGame {
                    start,
                    moves,
                    tags: Vec::new(),
                },
                records,
            )
        }

        Commands::Classify { fen, played } => {
            let record = service.classify_single_move(&fen, &played, depth).await?;
            Ok(serde_json::to_value(record)?)
        }
    }
}

fn policy(skip_errors: bool) -> ErrorPolicy {
    if skip_errors {
        ErrorPolicy::Skip
    } else {
        ErrorPolicy::Abort
    }
}

fn game_output(
    game: &ParsedGame,
    records: Vec<chess_analysis::MoveClassificationRecord>,
) -> anyhow::Result<serde_json::Value> {
    let summary = GameSummary::from_records(&records, game.start.turn());
    tracing::info!(
        analyzed = records.len(),
        plies = game.moves.len(),
        white_accuracy = summary.white.accuracy_percent,
        black_accuracy = summary.black.accuracy_percent,
        "game analyzed"
    );
    let tags: serde_json::Map<String, serde_json::Value> = game
        .tags
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
        .collect();
    Ok(serde_json::json!({
        "tags": tags,
        "moves": records,
        "summary": summary,
    }))
}

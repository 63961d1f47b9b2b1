//! Chess position analysis over an external UCI engine.
//!
//! This crate drives an engine such as Stockfish through a serialized
//! session and classifies the quality of played moves.
//!
//! # Overview
//!
//! - [`EngineSession`] - Async access to one engine process, with an eager
//!   ([`EagerSession`]) and a lazily launched shared ([`SharedSession`]) policy
//! - [`PositionEvaluator`] - Turns a board into an [`EvaluationResult`]
//! - [`classify`] - Pure move quality classification
//! - [`GameWalker`] - Classifies every move of a game
//! - [`AnalysisService`] - Validating entry points used by the CLI
//!
//! # Example
//!
//! ```ignore
//! use chess_analysis::{AnalysisService, AnalyzerConfig, EagerSession, EngineSession, ErrorPolicy};
//!
//! let config = AnalyzerConfig::load()?;
//! let session = EagerSession::from_config(&config.engine);
//! session.start().await?;
//!
//! let service = AnalysisService::new(session.clone(), &config.analysis);
//! let moves = vec!["e2e4".to_string(), "e7e5".to_string()];
//! let records = service.analyze_game(&moves, None, Some(12), ErrorPolicy::Abort).await?;
//! session.stop().await?;
//! ```

pub mod board;
pub mod classifier;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod evaluator;
pub mod pgn;
pub mod service;
pub mod session;
pub mod summary;
pub mod walker;

#[cfg(test)]
mod testing;

pub use classifier::{classify, Classification, ClassificationInput, GamePhase, MoveQuality};
pub use config::{AnalysisConfig, AnalyzerConfig, ConfigError, EngineConfig, Lifecycle};
pub use error::AnalysisError;
pub use evaluation::{Evaluation, EvaluationResult, MateScoring, ScoreKind};
pub use evaluator::PositionEvaluator;
pub use service::AnalysisService;
pub use session::{EagerSession, EngineError, EngineSession, SessionState, SharedSession};
pub use summary::{GameSummary, PlayerStats};
pub use walker::{ErrorPolicy, GameWalker, MoveClassificationRecord};

//! The real backend: a child process speaking UCI over its stdio pipes.

use std::io::{self, BufReader};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use uci::{EngineIdentity, GoOptions, SearchReport, UciClient};

use super::{EngineBackend, EngineError, EngineLauncher};
use crate::config::EngineConfig;

/// How long an engine gets to honour `quit` before it is killed.
const QUIT_GRACE: Duration = Duration::from_millis(500);
const QUIT_POLL: Duration = Duration::from_millis(10);

/// Wrapper for a UCI-compatible engine process like Stockfish.
pub struct UciProcess {
    /// The engine process handle.
    child: Child,
    client: UciClient<BufReader<ChildStdout>, ChildStdin>,
    identity: EngineIdentity,
    reset_between_searches: bool,
}

impl UciProcess {
    /// Spawn the engine described by `config` and bring it to a ready state.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` if the executable does not exist
    /// - `EngineError::Spawn` if the process fails to start
    /// - `EngineError::Handshake` if the UCI handshake or option setup fails
    pub fn spawn(config: &EngineConfig) -> Result<Self, EngineError> {
        let mut child = Command::new(&config.path)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => EngineError::NotFound(config.path.clone()),
                _ => EngineError::Spawn(e),
            })?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(EngineError::Spawn(io::Error::other(
                    "engine stdio was not captured",
                )));
            }
        };

        let mut process = Self {
            child,
            client: UciClient::new(BufReader::new(stdout), stdin),
            identity: EngineIdentity::default(),
            reset_between_searches: config.reset_between_searches,
        };
        // On failure `process` is dropped here, which reaps the child.
        process.initialize(config)?;

        tracing::info!(
            path = %config.path,
            name = process.name(),
            "engine ready"
        );
        Ok(process)
    }

    /// The engine's name (reported via UCI id), or "unknown".
    pub fn name(&self) -> &str {
        self.identity.name.as_deref().unwrap_or("unknown")
    }

    fn initialize(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        self.identity = self.client.handshake().map_err(EngineError::Handshake)?;
        for (name, value) in &config.options {
            tracing::debug!(name = %name, value = %value, "setoption");
            self.client
                .set_option(name, value)
                .map_err(EngineError::Handshake)?;
        }
        self.client.sync().map_err(EngineError::Handshake)
    }
}

impl EngineBackend for UciProcess {
    fn search(&mut self, fen: &str, depth: u32) -> Result<SearchReport, EngineError> {
        if self.reset_between_searches {
            self.client.new_game()?;
        }
        let report = self.client.search(fen, GoOptions::depth(depth))?;
        tracing::debug!(
            fen,
            depth = ?report.depth,
            best_move = ?report.best_move,
            "search complete"
        );
        Ok(report)
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn shutdown(self) {
        tracing::info!(name = self.name(), "stopping engine");
        drop(self);
    }
}

impl Drop for UciProcess {
    fn drop(&mut self) {
        let _ = self.client.send(&uci::GuiCommand::Quit);

        let deadline = Instant::now() + QUIT_GRACE;
        while Instant::now() < deadline {
            match self.child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) => thread::sleep(QUIT_POLL),
                Err(_) => break,
            }
        }

        tracing::warn!("engine ignored quit, killing it");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Launches [`UciProcess`]es from an [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct UciLauncher {
    config: EngineConfig,
}

impl UciLauncher {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl EngineLauncher for UciLauncher {
    type Backend = UciProcess;

    fn launch(&self) -> Result<UciProcess, EngineError> {
        UciProcess::spawn(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_executable_is_not_found() {
        let config = EngineConfig {
            path: "/nonexistent/path/to/engine".to_string(),
            ..EngineConfig::default()
        };
        match UciProcess::spawn(&config) {
            Err(EngineError::NotFound(path)) => assert_eq!(path, "/nonexistent/path/to/engine"),
            Err(other) => panic!("Expected NotFound, got {:?}", other),
            Ok(_) => panic!("Expected NotFound, got a running engine"),
        }
    }

    #[test]
    fn non_engine_program_fails_handshake() {
        // `true` exits immediately without ever saying uciok.
        let config = EngineConfig {
            path: "true".to_string(),
            ..EngineConfig::default()
        };
        match UciProcess::spawn(&config) {
            Err(EngineError::Handshake(_)) => {}
            Err(other) => panic!("Expected Handshake, got {:?}", other),
            Ok(_) => panic!("Expected Handshake error"),
        }
    }
}

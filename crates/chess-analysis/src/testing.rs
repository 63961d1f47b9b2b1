//! Instrumented stand-ins for the engine, shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use uci::{Score, SearchReport, UciError};

use crate::board;
use crate::session::{EngineBackend, EngineError, EngineLauncher, EngineSession, SessionState};

pub(crate) const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// FEN reached by playing `moves` from the start position.
pub(crate) fn fen_after(moves: &[&str]) -> String {
    let mut pos = shakmaty::Chess::default();
    for mv in moves {
        pos = board::play_uci(&pos, mv).unwrap();
    }
    board::to_fen(&pos)
}

#[derive(Clone)]
enum Reply {
    Report(SearchReport),
    Fail,
}

/// Session answering from a FEN-keyed script and counting calls.
#[derive(Clone, Default)]
pub(crate) struct ScriptedSession {
    replies: Arc<Mutex<HashMap<String, Reply>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSession {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer `fen` with a centipawn score (side to move) and best move.
    pub(crate) fn cp(self, fen: &str, cp: i32, best: &str) -> Self {
        self.script(fen, Score::Cp(cp), best)
    }

    pub(crate) fn mate(self, fen: &str, n: i32, best: &str) -> Self {
        self.script(fen, Score::Mate(n), best)
    }

    /// Make searches of `fen` fail as if the engine broke mid-search.
    pub(crate) fn fail(self, fen: &str) -> Self {
        self.replies.lock().unwrap().insert(fen.to_string(), Reply::Fail);
        self
    }

    /// Answer `fen` with exactly `report`.
    pub(crate) fn report(self, fen: &str, report: SearchReport) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(fen.to_string(), Reply::Report(report));
        self
    }

    fn script(self, fen: &str, score: Score, best: &str) -> Self {
        self.report(
            fen,
            SearchReport {
                depth: Some(14),
                seldepth: Some(20),
                score: Some(score),
                nodes: Some(12_345),
                pv: vec![best.to_string()],
                best_move: Some(best.to_string()),
                ponder: None,
            },
        )
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl EngineSession for ScriptedSession {
    async fn start(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn evaluate(&self, fen: &str, _depth: u32) -> Result<SearchReport, EngineError> {
        self.calls.lock().unwrap().push(fen.to_string());
        let reply = self.replies.lock().unwrap().get(fen).cloned();
        match reply {
            Some(Reply::Report(report)) => Ok(report),
            Some(Reply::Fail) => Err(EngineError::Uci(UciError::Disconnected)),
            None => Err(EngineError::InvalidResponse(format!("unscripted position {}", fen))),
        }
    }

    async fn stop(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn state(&self) -> SessionState {
        SessionState::Running
    }
}

#[derive(Default)]
struct LaunchLog {
    fail: bool,
    delay: Duration,
    crash_after: Option<usize>,
    attempts: AtomicUsize,
    launches: AtomicUsize,
    spans: Mutex<Vec<(Instant, Instant)>>,
}

/// Launcher whose backends sleep instead of searching and log their timing.
#[derive(Clone, Default)]
pub(crate) struct FakeLauncher {
    log: Arc<LaunchLog>,
}

impl FakeLauncher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self::build(LaunchLog {
            delay,
            ..LaunchLog::default()
        })
    }

    pub(crate) fn failing() -> Self {
        Self::build(LaunchLog {
            fail: true,
            ..LaunchLog::default()
        })
    }

    /// Backends answer `n` searches, then die.
    pub(crate) fn crashing_after(n: usize) -> Self {
        Self::build(LaunchLog {
            crash_after: Some(n),
            ..LaunchLog::default()
        })
    }

    fn build(log: LaunchLog) -> Self {
        Self { log: Arc::new(log) }
    }

    pub(crate) fn attempts(&self) -> usize {
        self.log.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn launches(&self) -> usize {
        self.log.launches.load(Ordering::SeqCst)
    }

    /// Assert `expected` searches ran and no two of them overlapped in time.
    pub(crate) fn assert_no_overlap(&self, expected: usize) {
        let mut spans = self.log.spans.lock().unwrap().clone();
        assert_eq!(spans.len(), expected);
        spans.sort_by_key(|(entry, _)| *entry);
        for pair in spans.windows(2) {
            assert!(
                pair[0].1 <= pair[1].0,
                "searches overlapped: {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }
}

impl EngineLauncher for FakeLauncher {
    type Backend = FakeBackend;

    fn launch(&self) -> Result<FakeBackend, EngineError> {
        self.log.attempts.fetch_add(1, Ordering::SeqCst);
        if self.log.fail {
            return Err(EngineError::NotFound("fake-engine".to_string()));
        }
        thread::sleep(self.log.delay);
        self.log.launches.fetch_add(1, Ordering::SeqCst);
        Ok(FakeBackend {
            log: Arc::clone(&self.log),
            searches: 0,
            alive: true,
        })
    }
}

pub(crate) struct FakeBackend {
    log: Arc<LaunchLog>,
    searches: usize,
    alive: bool,
}

impl EngineBackend for FakeBackend {
    fn search(&mut self, _fen: &str, depth: u32) -> Result<SearchReport, EngineError> {
        if self.log.crash_after.is_some_and(|n| self.searches >= n) {
            self.alive = false;
            return Err(EngineError::Uci(UciError::Disconnected));
        }

        let entry = Instant::now();
        thread::sleep(self.log.delay);
        let exit = Instant::now();
        self.log.spans.lock().unwrap().push((entry, exit));
        self.searches += 1;

        Ok(SearchReport {
            depth: Some(depth),
            score: Some(Score::Cp(0)),
            pv: vec!["e2e4".to_string()],
            best_move: Some("e2e4".to_string()),
            ..SearchReport::default()
        })
    }

    fn is_alive(&mut self) -> bool {
        self.alive
    }
}

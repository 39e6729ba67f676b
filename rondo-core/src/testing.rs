//! Testing utilities for the game engine.
//!
//! This module provides tools for integration testing:
//! - `ScriptedOracle` for deterministic games without API calls
//! - `Scripted` envelopes with progress notes, silence or failures
//! - Assertion helpers for verifying session state

use crate::config::{GameConfig, TutorialPacing};
use crate::error::OracleError;
use crate::game::Game;
use crate::model::{
    BeatContext, ClosingScenario, MessageKind, Mystery, RawVerdict, Reply, TutorialBeat,
};
use crate::oracle::{ClosingRequest, ConverseRequest, JudgeRequest, Oracle};
use crate::session::{GameSession, Stage};
use crate::stream::{Chunk, Envelope};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
enum Ending<T> {
    Terminal(T),
    Silent,
    Fail(String),
    Refuse(String),
}

/// One scripted envelope: progress notes, then how it ends.
#[derive(Debug, Clone)]
pub struct Scripted<T> {
    notes: Vec<String>,
    ending: Ending<T>,
}

impl<T> Scripted<T> {
    /// End with a terminal payload.
    pub fn terminal(value: T) -> Self {
        Self {
            notes: Vec::new(),
            ending: Ending::Terminal(value),
        }
    }

    /// End without ever yielding a terminal.
    pub fn silent() -> Self {
        Self {
            notes: Vec::new(),
            ending: Ending::Silent,
        }
    }

    /// Fail after the notes, while the envelope is being read.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            notes: Vec::new(),
            ending: Ending::Fail(message.into()),
        }
    }

    /// Fail before the envelope opens.
    pub fn refused(message: impl Into<String>) -> Self {
        Self {
            notes: Vec::new(),
            ending: Ending::Refuse(message.into()),
        }
    }

    /// Emit a progress note before the ending.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl<T: Send + 'static> Scripted<T> {
    fn open(self) -> Result<Envelope<T>, OracleError> {
        let end = match self.ending {
            Ending::Refuse(message) => return Err(OracleError::Stream(message)),
            Ending::Terminal(value) => Some(Ok(Chunk::Terminal(value))),
            Ending::Silent => None,
            Ending::Fail(message) => Some(Err(OracleError::Stream(message))),
        };
        let notes = self.notes.into_iter().map(|note| Ok(Chunk::Progress(note)));
        Ok(futures::stream::iter(notes.chain(end)).boxed())
    }
}

/// A call the scripted oracle received.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleCall {
    GenerateMystery(String),
    Converse(ConverseRequest),
    Judge(JudgeRequest),
    Closing(ClosingRequest),
    TutorialBeat(BeatContext),
}

/// An oracle that replays queued envelopes in order.
///
/// Each call shape has its own queue. A call with nothing queued fails to
/// open, so an unexpected call shows up as an error line.
#[derive(Default)]
pub struct ScriptedOracle {
    mysteries: Mutex<VecDeque<Scripted<Mystery>>>,
    replies: Mutex<VecDeque<Scripted<Reply>>>,
    verdicts: Mutex<VecDeque<Scripted<RawVerdict>>>,
    closings: Mutex<VecDeque<Scripted<ClosingScenario>>>,
    beats: Mutex<VecDeque<Scripted<TutorialBeat>>>,
    calls: Mutex<Vec<OracleCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn next<T: Send + 'static>(
    queue: &Mutex<VecDeque<Scripted<T>>>,
    call: &str,
) -> Result<Envelope<T>, OracleError> {
    match lock(queue).pop_front() {
        Some(scripted) => scripted.open(),
        None => Err(OracleError::Stream(format!("no scripted response for {call}"))),
    }
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_mystery(&self, scripted: Scripted<Mystery>) -> &Self {
        lock(&self.mysteries).push_back(scripted);
        self
    }

    pub fn queue_reply(&self, scripted: Scripted<Reply>) -> &Self {
        lock(&self.replies).push_back(scripted);
        self
    }

    pub fn queue_verdict(&self, scripted: Scripted<RawVerdict>) -> &Self {
        lock(&self.verdicts).push_back(scripted);
        self
    }

    pub fn queue_closing(&self, scripted: Scripted<ClosingScenario>) -> &Self {
        lock(&self.closings).push_back(scripted);
        self
    }

    pub fn queue_beat(&self, scripted: Scripted<TutorialBeat>) -> &Self {
        lock(&self.beats).push_back(scripted);
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<OracleCall> {
        lock(&self.calls).clone()
    }

    pub fn converse_requests(&self) -> Vec<ConverseRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                OracleCall::Converse(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn judge_requests(&self) -> Vec<JudgeRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                OracleCall::Judge(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: OracleCall) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn generate_mystery(&self, theme: &str) -> Result<Envelope<Mystery>, OracleError> {
        self.record(OracleCall::GenerateMystery(theme.to_string()));
        next(&self.mysteries, "generate_mystery")
    }

    async fn converse(&self, request: ConverseRequest) -> Result<Envelope<Reply>, OracleError> {
        self.record(OracleCall::Converse(request));
        next(&self.replies, "converse")
    }

    async fn judge_hypothesis(
        &self,
        request: JudgeRequest,
    ) -> Result<Envelope<RawVerdict>, OracleError> {
        self.record(OracleCall::Judge(request));
        next(&self.verdicts, "judge_hypothesis")
    }

    async fn closing_scenario(
        &self,
        request: ClosingRequest,
    ) -> Result<Envelope<ClosingScenario>, OracleError> {
        self.record(OracleCall::Closing(request));
        next(&self.closings, "closing_scenario")
    }

    async fn tutorial_beat(
        &self,
        context: BeatContext,
    ) -> Result<Envelope<TutorialBeat>, OracleError> {
        self.record(OracleCall::TutorialBeat(context));
        next(&self.beats, "tutorial_beat")
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// A small mystery with two pool facts and a two-item checklist.
pub fn sample_mystery() -> Mystery {
    Mystery {
        title: "The Golden Manor".to_string(),
        surface_situation: "The heir lies dead in a study bolted from the inside.".to_string(),
        hidden_truth: "The maid drew the bolt with a silk thread through the keyhole.".to_string(),
        red_truths: vec![
            "No one entered the study after midnight".to_string(),
            "The window was nailed shut".to_string(),
        ],
        magic_list: vec!["A".to_string(), "B".to_string()],
    }
}

/// A reply without a declared fact.
pub fn reply(text: impl Into<String>) -> Reply {
    Reply {
        reply: text.into(),
        fact_to_declare: None,
    }
}

/// A reply declaring `fact`.
pub fn reply_with_fact(text: impl Into<String>, fact: impl Into<String>) -> Reply {
    Reply {
        reply: text.into(),
        fact_to_declare: Some(fact.into()),
    }
}

/// A raw verdict as the oracle would send it.
pub fn verdict(status: &str, red_truth: Option<&str>, message: Option<&str>) -> RawVerdict {
    RawVerdict {
        status: status.to_string(),
        red_truth: red_truth.map(String::from),
        message: message.map(String::from),
    }
}

/// A game over `oracle` whose tutorial never pauses.
pub fn instant_game(oracle: Arc<ScriptedOracle>) -> Game {
    Game::with_config(
        oracle,
        GameConfig::new().with_pacing(TutorialPacing::instant()),
    )
}

/// A game already playing [`sample_mystery`].
pub async fn playing_game(oracle: Arc<ScriptedOracle>) -> Game {
    oracle.queue_mystery(Scripted::terminal(sample_mystery()));
    let mut game = instant_game(oracle);
    if let Err(e) = game.new_game("").await {
        panic!("starting the sample game failed: {e}");
    }
    assert_stage(&game.snapshot(), Stage::Playing);
    game
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the session is at `stage`.
#[track_caller]
pub fn assert_stage(session: &GameSession, stage: Stage) {
    assert_eq!(
        session.stage(),
        stage,
        "Expected stage {stage}, got {}",
        session.stage()
    );
}

/// Assert the last lines of history have exactly these kinds.
#[track_caller]
pub fn assert_tail(session: &GameSession, kinds: &[MessageKind]) {
    let history = session.history();
    assert!(
        history.len() >= kinds.len(),
        "Expected at least {} lines, history has {}",
        kinds.len(),
        history.len()
    );
    let tail: Vec<MessageKind> = history[history.len() - kinds.len()..]
        .iter()
        .map(|message| message.kind)
        .collect();
    assert_eq!(tail, kinds, "Unexpected tail of history");
}

/// Assert how many lines of `kind` the history holds.
#[track_caller]
pub fn assert_kind_count(session: &GameSession, kind: MessageKind, count: usize) {
    let actual = session
        .history()
        .iter()
        .filter(|message| message.kind == kind)
        .count();
    assert_eq!(actual, count, "Expected {count} {kind:?} lines, got {actual}");
}

//! Game - the controller that owns a session and drives it.
//!
//! `Game` holds the oracle, the committed [`GameSession`] record and the
//! side channels a front end watches:
//! - the record itself, published whole after every transition
//! - the ephemeral activity line
//! - audible cues
//!
//! Every action takes `&mut self`, so one owner can have at most one turn in
//! flight. The actions themselves live in [`actions`](crate::actions).

use crate::config::GameConfig;
use crate::cue::{Cue, CueSink};
use crate::error::ActionError;
use crate::model::{BeatContext, ChatMessage};
use crate::oracle::Oracle;
use crate::session::{GameSession, Stage};
use crate::stream::{drive, Activity};
use crate::tutorial::{Step, TutorialAction, TutorialSequencer};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Error line shown when a tutorial beat fails.
pub const TUTORIAL_FAILED_LINE: &str = "Something went wrong while running the tutorial.";

pub(crate) const WATCHING: &str = "The witch is watching you...";

/// A single-player game.
pub struct Game {
    pub(crate) oracle: Arc<dyn Oracle>,
    pub(crate) config: GameConfig,
    pub(crate) record: watch::Sender<Arc<GameSession>>,
    pub(crate) activity: Activity,
    pub(crate) cues: CueSink,
    tutorial: Option<TutorialSequencer>,
}

impl Game {
    /// Create a game sitting on the start screen.
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self::with_config(oracle, GameConfig::default())
    }

    pub fn with_config(oracle: Arc<dyn Oracle>, config: GameConfig) -> Self {
        let (record, _rx) = watch::channel(Arc::new(GameSession::new()));
        Self {
            oracle,
            config,
            record,
            activity: Activity::new(),
            cues: CueSink::silent(),
            tutorial: None,
        }
    }

    /// Watch committed records. Never yields an intermediate state.
    pub fn subscribe(&self) -> watch::Receiver<Arc<GameSession>> {
        self.record.subscribe()
    }

    /// The latest committed record.
    pub fn snapshot(&self) -> Arc<GameSession> {
        self.record.borrow().clone()
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// Connect the cue channel. Only the first call gets a receiver; cues
    /// played before that are dropped.
    pub fn cues(&mut self) -> Option<mpsc::UnboundedReceiver<Cue>> {
        if self.cues.is_connected() {
            return None;
        }
        let (sink, rx) = CueSink::channel();
        self.cues = sink;
        Some(rx)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The running tutorial, if any.
    pub fn tutorial(&self) -> Option<&TutorialSequencer> {
        self.tutorial.as_ref()
    }

    pub(crate) fn commit(&self, next: GameSession) -> Arc<GameSession> {
        let next = Arc::new(next);
        self.record.send_replace(next.clone());
        next
    }

    // ========================================================================
    // Tutorial
    // ========================================================================

    /// Leave the start screen for the tutorial. Call [`run_tutorial`]
    /// afterwards to play the opening steps.
    ///
    /// [`run_tutorial`]: Game::run_tutorial
    pub fn start_tutorial(&mut self) -> Result<(), ActionError> {
        let session = self.snapshot();
        session.require("tutorial", &[Stage::Start])?;

        self.tutorial = Some(TutorialSequencer::new());
        let next = self.commit(session.enter_tutorial());
        tracing::info!(session = %next.id(), "tutorial started");
        Ok(())
    }

    /// Play steps until one waits for the player or the script runs out.
    ///
    /// Returns the action the tutorial now waits for.
    pub async fn run_tutorial(&mut self) -> Result<Option<TutorialAction>, ActionError> {
        let pacing = self.config.pacing;
        loop {
            let step = {
                let tutorial = self.tutorial.as_ref().ok_or(ActionError::NoTutorial)?;
                match tutorial.current() {
                    Some(step) => step,
                    None => return Ok(None),
                }
            };

            match step {
                Step::Await { action, .. } => return Ok(Some(action)),
                Step::Narrate(text) => {
                    tokio::time::sleep(pacing.step_delay).await;
                    let session = self.snapshot();
                    self.commit(session.with_message(ChatMessage::tutorial_note(text)));
                    tokio::time::sleep(pacing.narration_hold).await;
                }
                Step::Beat(context) => {
                    tokio::time::sleep(pacing.step_delay).await;
                    self.tutorial_beat(context).await;
                }
            }

            if let Some(tutorial) = self.tutorial.as_mut() {
                tutorial.advance();
            }
        }
    }

    async fn tutorial_beat(&mut self, context: BeatContext) {
        self.activity.announce(WATCHING);
        let result = drive(self.oracle.tutorial_beat(context), &self.activity).await;

        let session = self.snapshot();
        match result {
            Ok(beat) => {
                let mut next = session.with_message(ChatMessage::antagonist(beat.message.clone()));
                if let Some(fact) = beat.declared_fact() {
                    next = next.with_fact(fact);
                    self.commit(next);
                    self.cues.play(Cue::AbsoluteFact);
                } else {
                    self.commit(next);
                }
            }
            Err(e) => {
                tracing::warn!(session = %session.id(), context = context.as_str(), error = %e, "tutorial beat failed");
                self.commit(session.with_message(ChatMessage::error(TUTORIAL_FAILED_LINE)));
            }
        }
    }

    /// Perform the gated action the tutorial is waiting for.
    ///
    /// Any other action is refused and the tutorial stays where it is.
    /// Triggering [`TutorialAction::End`] returns the game to the start
    /// screen. Follow any other trigger with [`run_tutorial`].
    ///
    /// [`run_tutorial`]: Game::run_tutorial
    pub async fn tutorial_trigger(&mut self, action: TutorialAction) -> Result<(), ActionError> {
        let tutorial = self.tutorial.as_mut().ok_or(ActionError::NoTutorial)?;
        tutorial.check(action)?;
        let input = tutorial.input().to_string();

        let session = self.snapshot();
        match action {
            TutorialAction::Ask => {
                self.commit(session.with_message(ChatMessage::human(input)));
            }
            TutorialAction::Declare => {
                self.commit(session.with_message(ChatMessage::hypothesis(input)));
                self.cues.play(Cue::Declaration);
            }
            TutorialAction::End => {
                self.tutorial = None;
                self.commit(session.leave_tutorial());
                tracing::info!(session = %session.id(), "tutorial ended");
                return Ok(());
            }
        }

        tokio::time::sleep(self.config.pacing.action_hold).await;
        if let Some(tutorial) = self.tutorial.as_mut() {
            tutorial.advance();
        }
        Ok(())
    }
}

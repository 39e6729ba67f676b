//! The player's actions: new game, ask, declare a hypothesis, forfeit.
//!
//! Each action commits its provisional record first, then drives the oracle
//! envelope and commits the outcome. Failures the player can recover from
//! become a single error line; nothing here returns a transport error.

use crate::cue::Cue;
use crate::error::{ActionError, TurnError};
use crate::game::{Game, WATCHING};
use crate::model::{ChatMessage, Verdict};
use crate::oracle::{ClosingRequest, ConverseRequest, JudgeRequest};
use crate::session::{Stage, ASK_FAILED_LINE, DECLARE_FAILED_LINE, UNKNOWN_VERDICT_LINE};
use crate::stream::drive;

const LISTENING: &str = "The witch is listening...";
const SAVOURING: &str = "The witch savours your blue truth...";
const SNEERING: &str = "The witch sneers at your surrender...";

fn non_blank(text: &str) -> Result<&str, ActionError> {
    let text = text.trim();
    if text.is_empty() {
        Err(ActionError::BlankInput)
    } else {
        Ok(text)
    }
}

impl Game {
    /// Start a new game, replacing the current session wholesale.
    ///
    /// A blank theme lets the oracle choose. Generation failure is not an
    /// error here: the session ends up finished with a placeholder mystery.
    pub async fn new_game(&mut self, theme: &str) -> Result<(), ActionError> {
        let session = self.snapshot();
        session.require("new game", &[Stage::Start, Stage::Finished])?;

        let loading = self.commit(session.begin_loading());
        tracing::info!(session = %loading.id(), theme, "generating mystery");

        self.activity.announce(WATCHING);
        let result = drive(self.oracle.generate_mystery(theme), &self.activity).await;

        match result {
            Ok(mystery) => {
                let next = self.commit(loading.loaded(mystery));
                tracing::info!(
                    session = %next.id(),
                    title = %next.title(),
                    magic = next.magic_list().len(),
                    "mystery ready"
                );
            }
            Err(e) => {
                tracing::error!(session = %loading.id(), error = %e, "mystery generation failed");
                self.commit(loading.load_failed());
            }
        }
        Ok(())
    }

    /// Ask the antagonist a question.
    pub async fn ask(&mut self, text: &str) -> Result<(), ActionError> {
        let session = self.snapshot();
        session.require("ask", &[Stage::Playing])?;
        let text = non_blank(text)?;

        let request = ConverseRequest {
            hidden_truth: session.hidden_truth().to_string(),
            history: session.history().to_vec(),
            message: text.to_string(),
            red_truth_pool: session.mystery().red_truths.clone(),
            used_facts: session.used_facts().to_vec(),
            available_facts: session.available_facts(),
            magic_list: session.magic_list().to_vec(),
        };

        let pending = self.commit(session.with_message(ChatMessage::human(text)));
        tracing::info!(session = %pending.id(), "asking");

        self.activity.announce(LISTENING);
        let result = drive(self.oracle.converse(request), &self.activity).await;

        match result {
            Ok(reply) => {
                let declared = reply.declared_fact().is_some();
                let next = self.commit(pending.with_reply(&reply));
                if declared {
                    self.cues.play(Cue::AbsoluteFact);
                }
                tracing::info!(session = %next.id(), declared, facts = next.used_facts().len(), "answered");
            }
            Err(e) => {
                tracing::warn!(session = %pending.id(), error = %e, "ask failed");
                self.commit(pending.with_message(ChatMessage::error(ASK_FAILED_LINE)));
            }
        }
        Ok(())
    }

    /// Declare a hypothesis and have it judged.
    pub async fn declare_hypothesis(&mut self, text: &str) -> Result<(), ActionError> {
        let session = self.snapshot();
        session.require("declare", &[Stage::Playing])?;
        let text = non_blank(text)?;

        let request = JudgeRequest {
            hidden_truth: session.hidden_truth().to_string(),
            used_facts: session.used_facts().to_vec(),
            hypothesis: text.to_string(),
            magic_list: session.magic_list().to_vec(),
            history: session.history().to_vec(),
        };

        let pending = self.commit(session.with_message(ChatMessage::hypothesis(text)));
        self.cues.play(Cue::Declaration);
        tracing::info!(session = %pending.id(), "declaring hypothesis");

        self.activity.announce(SAVOURING);
        let result = drive(self.oracle.judge_hypothesis(request), &self.activity).await;

        let verdict = result.and_then(|raw| {
            let status = raw.status.clone();
            let partial = raw.message.clone();
            Verdict::try_from(raw).inspect_err(|e| {
                tracing::warn!(
                    session = %pending.id(),
                    status = %status,
                    partial = ?partial,
                    error = %e,
                    "unrecognized verdict"
                );
            })
        });

        match verdict {
            Ok(verdict) => {
                let next = self.commit(pending.with_verdict(&verdict));
                match verdict {
                    Verdict::Refuted { .. } => self.cues.play(Cue::AbsoluteFact),
                    Verdict::Accepted { .. } => self.cues.play(Cue::Victory),
                    Verdict::Mocked { .. } | Verdict::Incomplete { .. } => {}
                }
                tracing::info!(session = %next.id(), stage = %next.stage(), "hypothesis judged");
            }
            Err(TurnError::UnrecognizedVerdict(_)) => {
                self.commit(pending.with_message(ChatMessage::error(UNKNOWN_VERDICT_LINE)));
            }
            Err(e) => {
                tracing::warn!(session = %pending.id(), error = %e, "declare failed");
                self.commit(pending.with_message(ChatMessage::error(DECLARE_FAILED_LINE)));
            }
        }
        Ok(())
    }

    /// Give up. Always ends the game, whatever the oracle does.
    pub async fn forfeit(&mut self) -> Result<(), ActionError> {
        let session = self.snapshot();
        session.require("forfeit", &[Stage::Playing])?;

        self.activity.announce(SNEERING);
        tracing::info!(session = %session.id(), "forfeiting");

        let request = ClosingRequest {
            surface_situation: session.surface().to_string(),
            hidden_truth: session.hidden_truth().to_string(),
            used_facts: session.used_facts().to_vec(),
            magic_list: session.magic_list().to_vec(),
        };
        let closing = match drive(self.oracle.closing_scenario(request), &self.activity).await {
            Ok(closing) => closing,
            Err(e) => {
                tracing::warn!(session = %session.id(), error = %e, "closing scenario failed, revealing the hidden truth");
                session.fallback_closing()
            }
        };

        let next = self.commit(session.forfeited(&closing));
        self.cues.play(Cue::AbsoluteFact);
        tracing::info!(session = %next.id(), "game forfeited");
        Ok(())
    }
}

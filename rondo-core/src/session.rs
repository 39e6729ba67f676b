//! GameSession - the committed game record and its transitions.
//!
//! A session is never mutated once published. Every transition borrows the
//! current record and returns a whole new one, so a reader holding an older
//! record keeps a consistent view of it.

use crate::error::ActionError;
use crate::ledger::TruthLedger;
use crate::model::{ChatMessage, ClosingScenario, Mystery, Reply, Verdict};
use crate::tutorial::TUTORIAL_TITLE;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Error line shown when the mystery could not be generated.
pub const LOAD_FAILED_LINE: &str =
    "Failed to generate the mystery. Start a new game to try again.";

/// Error line shown when a question could not be answered.
pub const ASK_FAILED_LINE: &str = "Lost contact with the witch.";

/// Error line shown when a hypothesis could not be judged.
pub const DECLARE_FAILED_LINE: &str = "The duel of truths was interrupted.";

/// Error line shown for a verdict outside the known set.
pub const UNKNOWN_VERDICT_LINE: &str = "The witch returned a verdict nobody understands.";

/// System line appended after the antagonist concedes.
pub const VICTORY_LINE: &str =
    "The witch fades away, her very existence denied. Victory is yours.";

/// System line that opens a forfeit.
pub const FORFEIT_LINE: &str = "The player has forfeited the game.";

/// Taunt used when the closing scenario cannot be generated.
pub const FORFEIT_TAUNT: &str = "Kukuku... so your little mind could never break my game board. \
     Very well, in my mercy I will show you the witch's truth.";

const PLACEHOLDER_TITLE: &str = "Connection Lost";
const PLACEHOLDER_SURFACE: &str =
    "The connection to the witch was severed. The game board could not be built.";

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Loading,
    Tutorial,
    Playing,
    Finished,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::Loading => "loading",
            Stage::Tutorial => "tutorial",
            Stage::Playing => "playing",
            Stage::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// One game, from the start screen to the final verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSession {
    id: Uuid,
    stage: Stage,
    mystery: Mystery,
    history: Vec<ChatMessage>,
    ledger: TruthLedger,
}

impl GameSession {
    /// A fresh record sitting on the start screen.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: Stage::Start,
            mystery: Mystery::default(),
            history: Vec::new(),
            ledger: TruthLedger::new(),
        }
    }

    // ========================================================================
    // Projections
    // ========================================================================

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Finished
    }

    pub fn mystery(&self) -> &Mystery {
        &self.mystery
    }

    pub fn title(&self) -> &str {
        &self.mystery.title
    }

    pub fn surface(&self) -> &str {
        &self.mystery.surface_situation
    }

    /// The hidden truth. Spoiler view for finished games and debugging.
    pub fn hidden_truth(&self) -> &str {
        &self.mystery.hidden_truth
    }

    pub fn magic_list(&self) -> &[String] {
        &self.mystery.magic_list
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn ledger(&self) -> &TruthLedger {
        &self.ledger
    }

    pub fn used_facts(&self) -> &[String] {
        self.ledger.used()
    }

    /// Pool facts the antagonist has not spent yet.
    pub fn available_facts(&self) -> Vec<String> {
        self.ledger.available(&self.mystery.red_truths)
    }

    /// Refuse `action` unless the session is in one of `allowed`.
    pub fn require(&self, action: &'static str, allowed: &[Stage]) -> Result<(), ActionError> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(ActionError::NotAllowed {
                action,
                stage: self.stage,
            })
        }
    }

    // ========================================================================
    // Stage transitions
    // ========================================================================

    /// Replace the session wholesale with an empty one awaiting its mystery.
    pub fn begin_loading(&self) -> Self {
        Self {
            stage: Stage::Loading,
            ..Self::new()
        }
    }

    /// Seed the board with the opening banner and start play.
    pub fn loaded(&self, mystery: Mystery) -> Self {
        let history = vec![
            ChatMessage::system(format!("Game start: {}", mystery.title)),
            ChatMessage::antagonist(mystery.surface_situation.clone()),
        ];
        Self {
            id: self.id,
            stage: Stage::Playing,
            mystery,
            history,
            ledger: TruthLedger::new(),
        }
    }

    /// Degraded terminal state after mystery generation failed.
    pub fn load_failed(&self) -> Self {
        let placeholder = Mystery {
            title: PLACEHOLDER_TITLE.to_string(),
            surface_situation: PLACEHOLDER_SURFACE.to_string(),
            ..Mystery::default()
        };
        Self {
            id: self.id,
            stage: Stage::Finished,
            mystery: placeholder,
            history: vec![ChatMessage::error(LOAD_FAILED_LINE)],
            ledger: TruthLedger::new(),
        }
    }

    /// A fresh record for the tutorial board.
    pub fn enter_tutorial(&self) -> Self {
        Self {
            stage: Stage::Tutorial,
            mystery: Mystery {
                title: TUTORIAL_TITLE.to_string(),
                ..Mystery::default()
            },
            ..Self::new()
        }
    }

    pub fn leave_tutorial(&self) -> Self {
        Self::new()
    }

    fn with_stage(&self, stage: Stage) -> Self {
        Self {
            stage,
            ..self.clone()
        }
    }

    // ========================================================================
    // History transitions
    // ========================================================================

    /// Append one line.
    pub fn with_message(&self, message: ChatMessage) -> Self {
        self.with_messages([message])
    }

    /// Append several lines in order.
    pub fn with_messages(&self, messages: impl IntoIterator<Item = ChatMessage>) -> Self {
        let mut next = self.clone();
        next.history.extend(messages);
        next
    }

    /// Declare an absolute fact: one chat line plus one ledger entry.
    pub fn with_fact(&self, fact: &str) -> Self {
        let mut next = self.with_message(ChatMessage::absolute_fact(fact));
        next.ledger.record(fact);
        next
    }

    /// Commit the antagonist's answer to a question.
    pub fn with_reply(&self, reply: &Reply) -> Self {
        let next = match reply.declared_fact() {
            Some(fact) => self.with_fact(fact),
            None => self.clone(),
        };
        next.with_message(ChatMessage::antagonist(reply.reply.clone()))
    }

    /// Commit a judged hypothesis.
    pub fn with_verdict(&self, verdict: &Verdict) -> Self {
        match verdict {
            Verdict::Refuted { fact, taunt } => self
                .with_fact(fact)
                .with_message(ChatMessage::antagonist(taunt.clone())),
            Verdict::Accepted { final_line } => self
                .with_messages([
                    ChatMessage::antagonist(final_line.clone()),
                    ChatMessage::system(VICTORY_LINE),
                ])
                .with_stage(Stage::Finished),
            Verdict::Mocked { line } | Verdict::Incomplete { line } => {
                self.with_message(ChatMessage::antagonist(line.clone()))
            }
        }
    }

    /// The closing scenario to reveal when the oracle cannot supply one.
    pub fn fallback_closing(&self) -> ClosingScenario {
        ClosingScenario {
            taunt: FORFEIT_TAUNT.to_string(),
            magical_truth: self.mystery.hidden_truth.clone(),
        }
    }

    /// End the game on the player's surrender.
    pub fn forfeited(&self, closing: &ClosingScenario) -> Self {
        self.with_messages([
            ChatMessage::system(FORFEIT_LINE),
            ChatMessage::antagonist(closing.taunt.clone()),
            ChatMessage::antagonist_truth(closing.magical_truth.clone()),
        ])
        .with_stage(Stage::Finished)
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}

//! The guided tutorial: a fixed script walked one step at a time.
//!
//! [`TutorialSequencer`] only tracks where in the script the player is. The
//! effects of each step (timers, oracle beats, chat lines) are applied by
//! [`Game`](crate::Game), which asks the sequencer what to do next and tells
//! it when a step is done.

use crate::error::ActionError;
use crate::model::BeatContext;

/// A player action a tutorial step can wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TutorialAction {
    Ask,
    Declare,
    End,
}

/// One entry of the tutorial script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Push a literal tutorial note, then move on after a pause.
    Narrate(&'static str),
    /// Ask the oracle for an antagonist line and push it.
    Beat(BeatContext),
    /// Block until the player triggers `action`.
    Await {
        action: TutorialAction,
        prefill: Option<&'static str>,
    },
}

/// Title of the tutorial board.
pub const TUTORIAL_TITLE: &str = "Tutorial: The Truth of the Missing Cookie";

/// "The Missing Cookie".
pub static SCRIPT: [Step; 11] = [
    Step::Narrate(
        "Welcome to the tutorial. Your goal is to win a duel of logic against the witch.",
    ),
    Step::Beat(BeatContext::Introduction),
    Step::Narrate(
        "The witch has laid out her mystery. Start by gathering information with a question. \
         Your input has been filled in for you. Use Ask.",
    ),
    Step::Await {
        action: TutorialAction::Ask,
        prefill: Some("Aren't you the culprit?"),
    },
    Step::Beat(BeatContext::ResponseToQuestion),
    Step::Narrate(
        "The witch has declared a red truth. A red truth is absolute within the game, \
         and none of your reasoning may contradict it.",
    ),
    Step::Narrate(
        "There is a hole in her logic. 'A witch does not lie' only holds if she really is a witch. \
         Strike back by declaring your reasoning as a blue truth.",
    ),
    Step::Await {
        action: TutorialAction::Declare,
        prefill: Some(
            "'A witch does not lie' is true. But you are no witch, so the rule does not apply to you.",
        ),
    },
    Step::Beat(BeatContext::Defeat),
    Step::Narrate(
        "Congratulations! You brought the witch to her knees and seized the truth. \
         You are ready to challenge a real game board.",
    ),
    Step::Await {
        action: TutorialAction::End,
        prefill: None,
    },
];

/// Position in a tutorial script.
///
/// Exactly one step is active at a time and the index never moves backwards.
#[derive(Debug, Clone)]
pub struct TutorialSequencer {
    script: &'static [Step],
    index: usize,
    input: String,
}

impl TutorialSequencer {
    /// Start at the top of the built-in script.
    pub fn new() -> Self {
        Self::with_script(&SCRIPT)
    }

    pub fn with_script(script: &'static [Step]) -> Self {
        let mut sequencer = Self {
            script,
            index: 0,
            input: String::new(),
        };
        sequencer.load_prefill();
        sequencer
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.script.len()
    }

    pub fn is_empty(&self) -> bool {
        self.script.is_empty()
    }

    /// The active step, or `None` once the script is exhausted.
    pub fn current(&self) -> Option<Step> {
        self.script.get(self.index).copied()
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.script.len()
    }

    /// The action the active step is blocked on, if it is gated.
    pub fn awaiting(&self) -> Option<TutorialAction> {
        match self.current() {
            Some(Step::Await { action, .. }) => Some(action),
            _ => None,
        }
    }

    /// The pre-filled (read-only) input for the active gated step.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Accept `action` only if the active step waits for exactly it.
    pub fn check(&self, action: TutorialAction) -> Result<(), ActionError> {
        match self.awaiting() {
            Some(expected) if expected == action => Ok(()),
            expected => Err(ActionError::NotPermitted {
                expected,
                got: action,
            }),
        }
    }

    /// Move to the next step.
    pub fn advance(&mut self) {
        if self.index < self.script.len() {
            self.index += 1;
        }
        self.load_prefill();
    }

    fn load_prefill(&mut self) {
        self.input = match self.current() {
            Some(Step::Await {
                prefill: Some(text),
                ..
            }) => text.to_string(),
            _ => String::new(),
        };
    }
}

impl Default for TutorialSequencer {
    fn default() -> Self {
        Self::new()
    }
}

//! Game data: the mystery, chat lines, and the records the oracle returns.

use crate::error::TurnError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A generated mystery. Never modified once a session has it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mystery {
    /// Title of the game board.
    pub title: String,

    /// The impossible situation shown to the player.
    pub surface_situation: String,

    /// What really happened. Never shown directly during play.
    pub hidden_truth: String,

    /// Pre-authored absolute facts the antagonist may spend.
    #[serde(default)]
    pub red_truths: Vec<String>,

    /// Phenomena the player must explain to win.
    #[serde(default)]
    pub magic_list: Vec<String>,
}

/// Who (or what) a chat line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    Human,
    Antagonist,
    System,
    Error,
    AbsoluteFact,
    Hypothesis,
    AntagonistTruth,
    TutorialNote,
}

impl MessageKind {
    /// Short tag used by text front ends.
    pub fn tag(self) -> &'static str {
        match self {
            MessageKind::Human => "YOU",
            MessageKind::Antagonist => "WITCH",
            MessageKind::System => "SYSTEM",
            MessageKind::Error => "ERROR",
            MessageKind::AbsoluteFact => "RED",
            MessageKind::Hypothesis => "BLUE",
            MessageKind::AntagonistTruth => "TRUTH",
            MessageKind::TutorialNote => "TUTORIAL",
        }
    }
}

/// One line of the chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl ChatMessage {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn human(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Human, text)
    }

    pub fn antagonist(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Antagonist, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageKind::System, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Error, text)
    }

    pub fn absolute_fact(text: impl Into<String>) -> Self {
        Self::new(MessageKind::AbsoluteFact, text)
    }

    pub fn hypothesis(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Hypothesis, text)
    }

    pub fn antagonist_truth(text: impl Into<String>) -> Self {
        Self::new(MessageKind::AntagonistTruth, text)
    }

    pub fn tutorial_note(text: impl Into<String>) -> Self {
        Self::new(MessageKind::TutorialNote, text)
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.tag(), self.text)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// The antagonist's answer to a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub reply: String,

    #[serde(rename = "redTruthToDeclare", default)]
    pub fact_to_declare: Option<String>,
}

impl Reply {
    /// The fact to declare, if any. Blank strings count as absent.
    pub fn declared_fact(&self) -> Option<&str> {
        non_blank(&self.fact_to_declare)
    }
}

/// A hypothesis judgement exactly as the oracle sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVerdict {
    pub status: String,
    #[serde(default)]
    pub red_truth: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

const REFUTED_FALLBACK: &str =
    "Hah! Your flimsy truth shatters before this red truth of mine!";
const ACCEPTED_FALLBACK: &str = "...Resign. I cannot cut down your blue truth.";
const MOCKED_FALLBACK: &str = "Your words are not even worthy of being called a blue truth.";
const INCOMPLETE_FALLBACK: &str =
    "An amusing tale, but it does not explain every magic. What of the rest?";

/// A judged hypothesis, one of four mutually exclusive outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The hypothesis contradicts the facts; a new fact proves it.
    Refuted { fact: String, taunt: String },
    /// Every checklist item is explained. The player wins.
    Accepted { final_line: String },
    /// Irrelevant to the checklist.
    Mocked { line: String },
    /// Explains some, but not all, checklist items.
    Incomplete { line: String },
}

impl TryFrom<RawVerdict> for Verdict {
    type Error = TurnError;

    fn try_from(raw: RawVerdict) -> Result<Self, Self::Error> {
        let line = |fallback: &str| {
            non_blank(&raw.message)
                .unwrap_or(fallback)
                .to_string()
        };

        match raw.status.trim().to_ascii_lowercase().as_str() {
            "refuted" => {
                let fact = non_blank(&raw.red_truth).ok_or_else(|| {
                    TurnError::UnrecognizedVerdict("refuted verdict without a red truth".into())
                })?;
                Ok(Verdict::Refuted {
                    fact: fact.to_string(),
                    taunt: line(REFUTED_FALLBACK),
                })
            }
            "accepted" => Ok(Verdict::Accepted {
                final_line: line(ACCEPTED_FALLBACK),
            }),
            "mocked" => Ok(Verdict::Mocked {
                line: line(MOCKED_FALLBACK),
            }),
            "incomplete" => Ok(Verdict::Incomplete {
                line: line(INCOMPLETE_FALLBACK),
            }),
            other => Err(TurnError::UnrecognizedVerdict(format!(
                "unknown status '{other}'"
            ))),
        }
    }
}

/// The antagonist's closing revelation after a forfeit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosingScenario {
    pub taunt: String,
    pub magical_truth: String,
}

/// Which tutorial moment an oracle beat is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatContext {
    Introduction,
    ResponseToQuestion,
    Defeat,
}

impl BeatContext {
    pub fn as_str(self) -> &'static str {
        match self {
            BeatContext::Introduction => "introduction",
            BeatContext::ResponseToQuestion => "response_to_question",
            BeatContext::Defeat => "defeat",
        }
    }
}

/// One generated tutorial line, optionally with a declared fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorialBeat {
    pub message: String,
    #[serde(default)]
    pub red_truth: Option<String>,
}

impl TutorialBeat {
    pub fn declared_fact(&self) -> Option<&str> {
        non_blank(&self.red_truth)
    }
}

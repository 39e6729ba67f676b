//! The oracle: the generative collaborator behind the antagonist.
//!
//! Every call returns an [`Envelope`] once the response channel is open.
//! Opening can fail on its own (network, bad key), separately from failures
//! while the envelope is being read.

mod anthropic;

pub use self::anthropic::{ClaudeOracle, THEMES};

use crate::error::OracleError;
use crate::model::{
    BeatContext, ChatMessage, ClosingScenario, Mystery, RawVerdict, Reply, TutorialBeat,
};
use crate::stream::Envelope;
use async_trait::async_trait;
use serde::Serialize;

/// Everything the antagonist sees when answering a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    pub hidden_truth: String,
    /// History before the question was appended.
    pub history: Vec<ChatMessage>,
    pub message: String,
    /// The whole pre-authored pool, spent entries included.
    pub red_truth_pool: Vec<String>,
    pub used_facts: Vec<String>,
    /// Pool entries not yet spent, as the ledger counts them.
    pub available_facts: Vec<String>,
    pub magic_list: Vec<String>,
}

/// Everything the judge sees when weighing a hypothesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeRequest {
    pub hidden_truth: String,
    pub used_facts: Vec<String>,
    pub hypothesis: String,
    pub magic_list: Vec<String>,
    /// History before the hypothesis was appended.
    pub history: Vec<ChatMessage>,
}

/// Input for the closing revelation after a forfeit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosingRequest {
    pub surface_situation: String,
    pub hidden_truth: String,
    pub used_facts: Vec<String>,
    pub magic_list: Vec<String>,
}

/// A source of mysteries, replies and verdicts.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Generate a new mystery. A blank theme asks for a random one.
    async fn generate_mystery(&self, theme: &str) -> Result<Envelope<Mystery>, OracleError>;

    /// Answer a question, optionally declaring an absolute fact.
    async fn converse(&self, request: ConverseRequest) -> Result<Envelope<Reply>, OracleError>;

    /// Judge a hypothesis. The status is returned unparsed.
    async fn judge_hypothesis(
        &self,
        request: JudgeRequest,
    ) -> Result<Envelope<RawVerdict>, OracleError>;

    /// Produce the antagonist's own version of events.
    async fn closing_scenario(
        &self,
        request: ClosingRequest,
    ) -> Result<Envelope<ClosingScenario>, OracleError>;

    /// Produce one scripted tutorial line for `context`.
    async fn tutorial_beat(
        &self,
        context: BeatContext,
    ) -> Result<Envelope<TutorialBeat>, OracleError>;
}

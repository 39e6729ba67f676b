//! Claude-backed oracle.

use super::{ClosingRequest, ConverseRequest, JudgeRequest, Oracle};
use crate::config::OracleConfig;
use crate::error::OracleError;
use crate::model::{
    BeatContext, ChatMessage, ClosingScenario, MessageKind, Mystery, RawVerdict, Reply,
    TutorialBeat,
};
use crate::stream::{Chunk, Envelope};
use async_trait::async_trait;
use claude::{Claude, EventStream, Message, Request, StreamEvent};
use futures::StreamExt;
use rand::seq::SliceRandom;
use serde::de::DeserializeOwned;

/// Themes picked from when the player leaves the theme blank.
pub const THEMES: &[&str] = &[
    "A snowbound mansion on an island cut off by a typhoon",
    "A locked chapel where the saint's statue weeps blood",
    "A travelling circus whose magician vanishes mid-act",
    "A lighthouse keeper found dead at the top of a sealed tower",
    "An alchemist's study where gold appeared overnight",
    "A masked ball where the host is stabbed in front of every guest",
    "A night train whose last carriage arrives empty",
    "An old library where a forbidden book rewrites itself",
];

/// An [`Oracle`] that talks to Claude.
pub struct ClaudeOracle {
    client: Claude,
    config: OracleConfig,
}

impl ClaudeOracle {
    pub fn new(client: Claude) -> Self {
        Self {
            client,
            config: OracleConfig::default(),
        }
    }

    /// Create an oracle from the ANTHROPIC_API_KEY environment variable.
    pub fn from_env() -> Result<Self, OracleError> {
        Ok(Self::new(Claude::from_env()?))
    }

    pub fn with_config(mut self, config: OracleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    fn request(&self, model: &str, system: &str, prompt: String) -> Request {
        let request = Request::new(vec![Message::user(prompt)])
            .with_model(model)
            .with_max_tokens(self.config.max_tokens)
            .with_system(system);
        match self.config.thinking_budget {
            Some(budget) => request.with_thinking(budget),
            None => request,
        }
    }

    async fn open<T>(&self, request: Request) -> Result<Envelope<T>, OracleError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let events = self.client.stream(request).await?;
        Ok(envelope(events))
    }
}

#[async_trait]
impl Oracle for ClaudeOracle {
    async fn generate_mystery(&self, theme: &str) -> Result<Envelope<Mystery>, OracleError> {
        let theme = match theme.trim() {
            "" => THEMES
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(THEMES[0]),
            given => given,
        };
        tracing::debug!(theme, "generating mystery");

        let prompt = format!(
            "Build an original and uncanny impossible crime scenario based on this theme: \"{theme}\"."
        );
        let request = self.request(
            &self.config.mystery_model,
            include_str!("prompts/mystery.txt"),
            prompt,
        );
        self.open(request).await
    }

    async fn converse(&self, request: ConverseRequest) -> Result<Envelope<Reply>, OracleError> {
        let mut system = String::from(include_str!("prompts/witch.txt"));
        system.push_str("\n\n## The case\n");
        system.push_str(&format!("Truth of the case: {}\n", request.hidden_truth));
        system.push_str(&format!(
            "Magic list the player must refute: {}\n",
            request.magic_list.join(", ")
        ));

        let mut prompt = String::new();
        prompt.push_str("## Conversation so far\n");
        prompt.push_str(&transcript(&request.history));
        prompt.push_str("\n\n## Red truths already declared\n");
        prompt.push_str(&bullets(request.used_facts.iter()));
        prompt.push_str("\n\n## Available red truths\n");
        prompt.push_str(&bullets(request.available_facts.iter()));
        prompt.push_str("\n\n## The human's new message\n");
        prompt.push_str(&request.message);
        prompt.push_str("\n\nAnalyse the flow of the conversation and respond as your task demands.");

        let request = self.request(&self.config.model, &system, prompt);
        self.open(request).await
    }

    async fn judge_hypothesis(
        &self,
        request: JudgeRequest,
    ) -> Result<Envelope<RawVerdict>, OracleError> {
        let mut prompt = String::new();
        prompt.push_str("## Absolute facts you know\n");
        prompt.push_str(&format!("1. Truth of the case: {}\n", request.hidden_truth));
        prompt.push_str(&format!(
            "2. Red truths already declared: [{}]\n",
            request.used_facts.join(", ")
        ));
        prompt.push_str(&format!(
            "3. Magic list the player must refute: [{}]\n",
            request.magic_list.join(", ")
        ));
        prompt.push_str("\n## Conversation so far\n");
        prompt.push_str(&transcript(&request.history));
        prompt.push_str("\n\n## The human's blue truth\n");
        prompt.push_str(&request.hypothesis);

        let request = self.request(&self.config.model, include_str!("prompts/judge.txt"), prompt);
        self.open(request).await
    }

    async fn closing_scenario(
        &self,
        request: ClosingRequest,
    ) -> Result<Envelope<ClosingScenario>, OracleError> {
        let prompt = format!(
            "1. Surface situation: {}\n\
             2. Magic list the player had to refute: [{}]\n\
             3. Red truths declared: [{}]\n\
             4. The original human truth, for reference: {}\n",
            request.surface_situation,
            request.magic_list.join(", "),
            request.used_facts.join(", "),
            request.hidden_truth,
        );

        let request = self.request(&self.config.model, include_str!("prompts/closing.txt"), prompt);
        self.open(request).await
    }

    async fn tutorial_beat(
        &self,
        context: BeatContext,
    ) -> Result<Envelope<TutorialBeat>, OracleError> {
        let prompt = match context {
            BeatContext::Introduction => {
                "The tutorial begins. Present the mystery of the missing cookie and mock the human \
                 with your opening line (for example: \"There was a cookie on the table. Only you and \
                 I are in this room... so the culprit is you!\")."
            }
            BeatContext::ResponseToQuestion => {
                "The human asked: \"Aren't you the culprit?\". Answer the question, and you MUST \
                 declare the red truth \"A witch does not lie. I am not the culprit.\" in the \
                 redTruth field."
            }
            BeatContext::Defeat => {
                "The human declared as a blue truth that you are not a witch, so you are able to \
                 lie. You have lost to this logic. As the end of the tutorial, concede while \
                 keeping your dignity as a witch. The line must include the truth of the case \
                 (\"I ate the cookie...\")."
            }
        };

        let request = self.request(
            &self.config.model,
            include_str!("prompts/tutorial.txt"),
            prompt.to_string(),
        );
        self.open(request).await
    }
}

fn speaker(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Human => "Human",
        MessageKind::Hypothesis => "Human (blue truth)",
        MessageKind::AbsoluteFact => "Witch (red truth)",
        MessageKind::AntagonistTruth => "Witch (witch's truth)",
        MessageKind::System | MessageKind::Error | MessageKind::TutorialNote => "System",
        MessageKind::Antagonist => "Witch",
    }
}

fn transcript(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|message| format!("{}: {}", speaker(message.kind), message.text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn bullets<'a>(items: impl Iterator<Item = &'a String>) -> String {
    let lines: Vec<String> = items.map(|item| format!("- {item}")).collect();
    if lines.is_empty() {
        "None".to_string()
    } else {
        lines.join("\n")
    }
}

/// Remove a Markdown code fence wrapped around a JSON payload.
fn extract_json(text: &str) -> &str {
    let text = text.trim();

    // ```json ... ``` anywhere in the reply
    if let Some(start) = text.find("```json") {
        let content_start = start + 7;
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    // ``` ... ``` without a language tag
    if let Some(start) = text.find("```") {
        let content_start = start + 3;
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    // Bare object surrounded by prose
    match (text.find('{'), text.rfind('}')) {
        (Some(open), Some(close)) if open < close => &text[open..=close],
        _ => text,
    }
}

struct Translation {
    events: EventStream,
    thinking: String,
    text: String,
    flush_thinking: bool,
    ended: bool,
    finished: bool,
}

impl Translation {
    /// Next complete thinking line, or the remainder once a block closed.
    fn next_line(&mut self) -> Option<String> {
        while let Some(newline) = self.thinking.find('\n') {
            let line: String = self.thinking.drain(..=newline).collect();
            let line = line.trim();
            if !line.is_empty() {
                return Some(line.to_string());
            }
        }
        if self.flush_thinking {
            self.flush_thinking = false;
            let rest = std::mem::take(&mut self.thinking);
            let rest = rest.trim();
            if !rest.is_empty() {
                return Some(rest.to_string());
            }
        }
        None
    }
}

/// Turn Claude's raw event stream into an envelope.
///
/// Thinking deltas become progress notes, one line at a time. Text deltas
/// accumulate into the JSON terminal payload, parsed once the message ends.
/// A message with no text yields no terminal at all.
fn envelope<T>(events: EventStream) -> Envelope<T>
where
    T: DeserializeOwned + Send + 'static,
{
    let state = Translation {
        events,
        thinking: String::new(),
        text: String::new(),
        flush_thinking: false,
        ended: false,
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }
            if let Some(line) = state.next_line() {
                return Some((Ok(Chunk::Progress(line)), state));
            }
            if state.ended {
                state.finished = true;
                let payload = extract_json(&state.text);
                if payload.is_empty() {
                    tracing::warn!("message ended without any text");
                    return None;
                }
                let parsed = serde_json::from_str::<T>(payload).map_err(|e| {
                    tracing::warn!(error = %e, payload, "terminal payload did not parse");
                    OracleError::from(e)
                });
                return Some((parsed.map(Chunk::Terminal), state));
            }

            match state.events.next().await {
                Some(Ok(StreamEvent::ThinkingDelta { thinking, .. })) => {
                    state.thinking.push_str(&thinking);
                }
                Some(Ok(StreamEvent::TextDelta { text, .. })) => state.text.push_str(&text),
                Some(Ok(StreamEvent::ContentBlockStop { .. })) => state.flush_thinking = true,
                Some(Ok(StreamEvent::Error { message })) => {
                    state.finished = true;
                    return Some((Err(OracleError::Stream(message)), state));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(OracleError::Client(e)), state));
                }
                None => {
                    state.ended = true;
                    state.flush_thinking = true;
                }
            }
        }
    })
    .boxed()
}

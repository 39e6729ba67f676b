//! Configuration for the engine and the Claude-backed oracle.

use std::time::Duration;

/// Default model for every oracle call.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Configuration for [`ClaudeOracle`](crate::oracle::ClaudeOracle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleConfig {
    /// Model for conversation, judging, closing scenarios and the tutorial.
    pub model: String,

    /// Model for mystery generation, which needs the most care.
    pub mystery_model: String,

    /// Maximum tokens per response, thinking included.
    pub max_tokens: usize,

    /// Extended thinking budget. `None` disables thinking and with it all
    /// progress notes.
    pub thinking_budget: Option<usize>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            mystery_model: DEFAULT_MODEL.to_string(),
            max_tokens: 8192,
            thinking_budget: Some(4096),
        }
    }
}

impl OracleConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_mystery_model(mut self, model: impl Into<String>) -> Self {
        self.mystery_model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_thinking_budget(mut self, budget: usize) -> Self {
        self.thinking_budget = Some(budget);
        self
    }

    pub fn without_thinking(mut self) -> Self {
        self.thinking_budget = None;
        self
    }
}

/// Timing of the scripted tutorial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TutorialPacing {
    /// Pause before every narrated or oracle-driven step.
    pub step_delay: Duration,

    /// Pause after a narration line is shown.
    pub narration_hold: Duration,

    /// Pause after the player triggers a gated action.
    pub action_hold: Duration,
}

impl TutorialPacing {
    /// No pauses at all. Used by tests and non-interactive front ends.
    pub fn instant() -> Self {
        Self {
            step_delay: Duration::ZERO,
            narration_hold: Duration::ZERO,
            action_hold: Duration::ZERO,
        }
    }
}

impl Default for TutorialPacing {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(1000),
            narration_hold: Duration::from_millis(500),
            action_hold: Duration::from_millis(500),
        }
    }
}

/// Configuration for a [`Game`](crate::Game).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameConfig {
    pub pacing: TutorialPacing,
}

impl GameConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tutorial pacing.
    pub fn with_pacing(mut self, pacing: TutorialPacing) -> Self {
        self.pacing = pacing;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_defaults() {
        let config = OracleConfig::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.mystery_model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, 8192);
        assert_eq!(config.thinking_budget, Some(4096));
    }

    #[test]
    fn test_oracle_builder() {
        let config = OracleConfig::default()
            .with_model("claude-haiku")
            .with_max_tokens(2048)
            .without_thinking();
        assert_eq!(config.model, "claude-haiku");
        assert_eq!(config.mystery_model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.thinking_budget, None);
    }

    #[test]
    fn test_pacing() {
        let pacing = TutorialPacing::default();
        assert_eq!(pacing.step_delay, Duration::from_secs(1));
        assert_eq!(pacing.narration_hold, Duration::from_millis(500));

        let config = GameConfig::new().with_pacing(TutorialPacing::instant());
        assert_eq!(config.pacing.action_hold, Duration::ZERO);
    }
}

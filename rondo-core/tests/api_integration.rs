//! Integration tests that call the real Claude API.
//!
//! These tests require ANTHROPIC_API_KEY to be set (via .env file or environment).
//! Run with: `cargo test -p rondo-core --test api_integration -- --ignored`
//!
//! These are marked #[ignore] by default to avoid:
//! - API costs in CI
//! - Test failures when no API key is available
//! - Slow test runs (mystery generation takes a while)

use rondo_core::model::{BeatContext, MessageKind};
use rondo_core::oracle::Oracle;
use rondo_core::stream::{drive, Activity};
use rondo_core::{ClaudeOracle, Game, GameConfig, OracleConfig, Stage, TutorialPacing};
use std::sync::Arc;

/// Load environment variables from .env file
fn setup() {
    let _ = dotenvy::dotenv();
}

/// Check if API key is available
fn has_api_key() -> bool {
    std::env::var("ANTHROPIC_API_KEY").is_ok()
}

fn oracle() -> ClaudeOracle {
    ClaudeOracle::from_env()
        .expect("Failed to create oracle")
        .with_config(OracleConfig::default().with_thinking_budget(2048))
}

#[tokio::test]
#[ignore] // Run with: cargo test -p rondo-core --test api_integration -- --ignored
async fn test_generated_mystery_starts_play() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: ANTHROPIC_API_KEY not set");
        return;
    }

    let mut game = Game::new(Arc::new(oracle()));
    game.new_game("a lighthouse on a stormy night").await.unwrap();

    let session = game.snapshot();
    assert_eq!(session.stage(), Stage::Playing, "history: {:?}", session.history());
    assert!(!session.title().is_empty());
    assert!(!session.hidden_truth().is_empty());
    assert!(session.magic_list().len() >= 2);

    game.ask("Was anyone else in the tower that night?").await.unwrap();
    let session = game.snapshot();
    assert_eq!(
        session.history().last().map(|m| m.kind),
        Some(MessageKind::Antagonist),
        "history: {:?}",
        session.history()
    );
}

#[tokio::test]
#[ignore]
async fn test_tutorial_beat_declares_fact() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: ANTHROPIC_API_KEY not set");
        return;
    }

    let oracle = oracle();
    let activity = Activity::new();
    let beat = drive(oracle.tutorial_beat(BeatContext::ResponseToQuestion), &activity)
        .await
        .expect("beat should arrive");

    assert!(!beat.message.is_empty());
    assert!(beat.declared_fact().is_some(), "beat: {beat:?}");
}

#[tokio::test]
#[ignore]
async fn test_forfeit_reveals_truth() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: ANTHROPIC_API_KEY not set");
        return;
    }

    let config = GameConfig::new().with_pacing(TutorialPacing::instant());
    let mut game = Game::with_config(Arc::new(oracle()), config);
    game.new_game("").await.unwrap();
    if game.snapshot().is_finished() {
        eprintln!("Mystery generation failed; nothing to forfeit");
        return;
    }

    game.forfeit().await.unwrap();

    let session = game.snapshot();
    assert!(session.is_finished());
    assert_eq!(
        session.history().last().map(|m| m.kind),
        Some(MessageKind::AntagonistTruth)
    );
}

//! Engine for a witch's-game-board mystery duel against an AI antagonist.
//!
//! This crate provides:
//! - The game session state machine with its append-only chat history
//! - A ledger of the absolute facts ("red truths") the antagonist declares
//! - Streamed oracle responses folded into progress notes and one result
//! - A scripted tutorial that mixes narration, oracle beats and gated actions
//! - A Claude-backed oracle and a scripted one for tests
//!
//! # Quick Start
//!
//! ```ignore
//! use rondo_core::{ClaudeOracle, Game};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let oracle = Arc::new(ClaudeOracle::from_env()?);
//!     let mut game = Game::new(oracle);
//!
//!     game.new_game("a lighthouse on a stormy night").await?;
//!     game.ask("Was anyone else in the tower?").await?;
//!     game.declare_hypothesis("The keeper locked the door from outside with a rope.").await?;
//!
//!     for line in game.snapshot().history() {
//!         println!("{line}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod config;
pub mod cue;
pub mod error;
pub mod game;
pub mod ledger;
pub mod model;
pub mod oracle;
pub mod session;
pub mod stream;
pub mod testing;
pub mod tutorial;

// Primary public API
pub use config::{GameConfig, OracleConfig, TutorialPacing};
pub use cue::{Cue, CueSink};
pub use error::{ActionError, OracleError, TurnError};
pub use game::Game;
pub use ledger::TruthLedger;
pub use model::{ChatMessage, MessageKind, Mystery, Verdict};
pub use oracle::{ClaudeOracle, Oracle};
pub use session::{GameSession, Stage};
pub use stream::{Activity, Chunk, Envelope};
pub use testing::{Scripted, ScriptedOracle};
pub use tutorial::{TutorialAction, TutorialSequencer};

//! Error types for the game engine.
//!
//! Three layers, each converting from the one below:
//! - [`OracleError`]: the oracle could not open or continue an envelope.
//! - [`TurnError`]: why a turn produced no usable terminal payload.
//! - [`ActionError`]: the caller asked for something the current state refuses.

use crate::session::Stage;
use crate::tutorial::TutorialAction;
use thiserror::Error;

/// Failures raised by an oracle implementation.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Claude API error: {0}")]
    Client(#[from] claude::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Malformed payload: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for OracleError {
    fn from(err: serde_json::Error) -> Self {
        OracleError::Malformed(err.to_string())
    }
}

/// Why a turn could not be committed.
#[derive(Debug, Error)]
pub enum TurnError {
    /// The envelope could not be opened or failed while being read.
    #[error("transport failure: {0}")]
    Transport(#[from] OracleError),

    /// The envelope ended without ever yielding a terminal element.
    #[error("the oracle finished without a result")]
    EmptyResult,

    /// A verdict whose status or shape is outside the known set.
    #[error("unrecognized verdict: {0}")]
    UnrecognizedVerdict(String),
}

/// Requests rejected before anything is sent to the oracle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("input is blank")]
    BlankInput,

    #[error("{action} is not allowed while the game is {stage}")]
    NotAllowed { action: &'static str, stage: Stage },

    #[error("the tutorial expects {expected:?}, not {got:?}")]
    NotPermitted {
        expected: Option<TutorialAction>,
        got: TutorialAction,
    },

    #[error("no tutorial is running")]
    NoTutorial,
}

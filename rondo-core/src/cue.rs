//! Audible side effects.
//!
//! The engine never plays sound itself. It emits [`Cue`]s on a channel and
//! whichever front end holds the receiver decides what to do with them.

use tokio::sync::mpsc;

/// A sound the presentation layer should play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    /// An absolute fact was declared.
    AbsoluteFact,
    /// The player declared a hypothesis.
    Declaration,
    /// The antagonist conceded.
    Victory,
}

/// Sending half of the cue channel.
#[derive(Debug, Clone, Default)]
pub struct CueSink {
    tx: Option<mpsc::UnboundedSender<Cue>>,
}

impl CueSink {
    /// Create a connected sink and its receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Cue>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that drops every cue.
    pub fn silent() -> Self {
        Self { tx: None }
    }

    pub fn is_connected(&self) -> bool {
        self.tx.is_some()
    }

    pub fn play(&self, cue: Cue) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(cue).is_err() {
            tracing::debug!(?cue, "cue receiver dropped");
        }
    }
}

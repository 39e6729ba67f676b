//! Streamed oracle responses and their aggregation.
//!
//! Every oracle call yields an [`Envelope`]: zero or more progress notes
//! followed by exactly one terminal payload. [`aggregate`] folds an envelope
//! into that payload while mirroring the notes into the ephemeral
//! [`Activity`] indicator.

use crate::error::{OracleError, TurnError};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Display budget for a single progress note, in characters.
pub const ACTIVITY_BUDGET: usize = 80;

const THINKING_PREFIX: &str = "The witch is thinking... ";

/// One element of an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk<T> {
    /// Advisory text describing what the oracle is doing.
    Progress(String),
    /// The final payload.
    Terminal(T),
}

/// A lazy, finite, non-restartable oracle response.
pub type Envelope<T> = BoxStream<'static, Result<Chunk<T>, OracleError>>;

/// The "current activity" line shown while a turn is pending.
///
/// Cheap to clone; every clone drives the same indicator.
#[derive(Debug, Clone)]
pub struct Activity {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl Activity {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Watch the indicator. `None` means nothing is pending.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }

    /// The text currently shown, if any.
    pub fn current(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    /// Show a fixed announcement.
    pub fn announce(&self, text: impl Into<String>) {
        self.tx.send_replace(Some(text.into()));
    }

    /// Show a progress note, truncated to [`ACTIVITY_BUDGET`].
    pub fn note(&self, note: &str) {
        self.announce(format!("{THINKING_PREFIX}{}", truncate(note, ACTIVITY_BUDGET)));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }
}

impl Default for Activity {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the indicator when aggregation ends, however it ends.
struct ClearOnDrop<'a>(&'a Activity);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        self.0.clear();
    }
}

/// Cut `text` to at most `budget` characters, appending `...` when cut.
pub fn truncate(text: &str, budget: usize) -> String {
    match text.char_indices().nth(budget) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Consume an envelope and return its terminal payload.
///
/// Progress notes are surfaced in order. The first terminal element ends
/// consumption; anything after it is never polled. An envelope that ends
/// without a terminal is [`TurnError::EmptyResult`].
pub async fn aggregate<T>(mut envelope: Envelope<T>, activity: &Activity) -> Result<T, TurnError> {
    let _clear = ClearOnDrop(activity);

    while let Some(item) = envelope.next().await {
        match item? {
            Chunk::Progress(note) => {
                tracing::debug!(note = %note, "oracle progress");
                activity.note(&note);
            }
            Chunk::Terminal(payload) => return Ok(payload),
        }
    }

    Err(TurnError::EmptyResult)
}

/// Open an envelope and aggregate it.
///
/// The indicator is cleared even when the envelope never opens.
pub async fn drive<T, F>(opening: F, activity: &Activity) -> Result<T, TurnError>
where
    F: Future<Output = Result<Envelope<T>, OracleError>>,
{
    let _clear = ClearOnDrop(activity);
    let envelope = opening.await?;
    aggregate(envelope, activity).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn envelope(items: Vec<Result<Chunk<u32>, OracleError>>) -> Envelope<u32> {
        stream::iter(items).boxed()
    }

    #[test]
    fn test_truncate_within_budget() {
        assert_eq!(truncate("short", 80), "short");
        let exact = "x".repeat(80);
        assert_eq!(truncate(&exact, 80), exact);
    }

    #[test]
    fn test_truncate_over_budget() {
        let long = "y".repeat(81);
        let cut = truncate(&long, 80);
        assert_eq!(cut.chars().count(), 83);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_truncate_counts_characters() {
        let korean = "마".repeat(90);
        let cut = truncate(&korean, 80);
        assert_eq!(cut, format!("{}...", "마".repeat(80)));
    }

    #[tokio::test]
    async fn test_aggregate_returns_terminal() {
        let activity = Activity::new();
        let result = aggregate(
            envelope(vec![
                Ok(Chunk::Progress("one".into())),
                Ok(Chunk::Progress("two".into())),
                Ok(Chunk::Terminal(7)),
            ]),
            &activity,
        )
        .await
        .unwrap();

        assert_eq!(result, 7);
        assert_eq!(activity.current(), None);
    }

    #[tokio::test]
    async fn test_aggregate_stops_at_first_terminal() {
        let activity = Activity::new();
        let result = aggregate(
            envelope(vec![
                Ok(Chunk::Terminal(1)),
                Ok(Chunk::Terminal(2)),
                Err(OracleError::Stream("never read".into())),
            ]),
            &activity,
        )
        .await
        .unwrap();

        assert_eq!(result, 1);
    }

    #[tokio::test]
    async fn test_aggregate_without_terminal_is_empty_result() {
        let activity = Activity::new();
        let err = aggregate(
            envelope(vec![Ok(Chunk::Progress("pondering".into()))]),
            &activity,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, TurnError::EmptyResult));
        assert_eq!(activity.current(), None);
    }

    #[tokio::test]
    async fn test_aggregate_transport_failure() {
        let activity = Activity::new();
        activity.announce("listening");
        let err = aggregate(
            envelope(vec![
                Ok(Chunk::Progress("pondering".into())),
                Err(OracleError::Stream("connection reset".into())),
            ]),
            &activity,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, TurnError::Transport(_)));
        assert_eq!(activity.current(), None);
    }

    #[tokio::test]
    async fn test_drive_open_failure_clears_activity() {
        let activity = Activity::new();
        activity.announce("The witch is listening...");
        let err = drive(
            async { Err::<Envelope<u32>, _>(OracleError::Stream("refused".into())) },
            &activity,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, TurnError::Transport(OracleError::Stream(_))));
        assert_eq!(activity.current(), None);
    }

    #[tokio::test]
    async fn test_progress_notes_reach_watchers_in_order() {
        let activity = Activity::new();
        let mut rx = activity.subscribe();
        let (tx, chunks) = futures::channel::mpsc::unbounded();

        let aggregation = tokio::spawn({
            let activity = activity.clone();
            async move { aggregate(chunks.boxed(), &activity).await }
        });

        tx.unbounded_send(Ok(Chunk::Progress("first".into()))).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(
            rx.borrow_and_update().as_deref(),
            Some("The witch is thinking... first")
        );

        tx.unbounded_send(Ok(Chunk::Progress("second".into()))).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(
            rx.borrow_and_update().as_deref(),
            Some("The witch is thinking... second")
        );

        tx.unbounded_send(Ok(Chunk::Terminal(3))).unwrap();
        assert_eq!(aggregation.await.unwrap().unwrap(), 3);
        assert_eq!(activity.current(), None);
    }
}

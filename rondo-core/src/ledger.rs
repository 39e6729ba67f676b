//! Bookkeeping for absolute facts ("red truths").

use serde::{Deserialize, Serialize};

/// Append-only record of every absolute fact declared during a session.
///
/// Duplicates are kept: the oracle may restate a fact verbatim and each
/// declaration counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruthLedger {
    used: Vec<String>,
}

impl TruthLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly declared fact.
    pub fn record(&mut self, fact: impl Into<String>) {
        self.used.push(fact.into());
    }

    /// Facts in declaration order.
    pub fn used(&self) -> &[String] {
        &self.used
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    /// Pool entries not yet spent, in pool order.
    ///
    /// Multiset difference: each recorded use cancels one equal pool entry.
    /// Recomputed on every call.
    pub fn available(&self, pool: &[String]) -> Vec<String> {
        let mut spent: Vec<&str> = self.used.iter().map(String::as_str).collect();
        pool.iter()
            .filter(|fact| match spent.iter().position(|used| used == fact) {
                Some(pos) => {
                    spent.swap_remove(pos);
                    false
                }
                None => true,
            })
            .cloned()
            .collect()
    }
}

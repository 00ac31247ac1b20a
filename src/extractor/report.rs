//! Per-movie outcomes of the detail batch

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A movie id whose detail or credits could not be fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    /// Catalog movie id
    pub id: i64,
    /// Which request failed ("detail" or "credits")
    pub stage: String,
    /// Error text
    pub error: String,
}

/// Result of fetching one movie
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    /// Both documents fetched
    Fetched {
        /// Catalog movie id
        id: i64,
        /// Detail document as returned
        detail: Value,
        /// Credits document as returned
        credits: Value,
    },
    /// Either request failed; neither document is kept
    Failed(FailedItem),
}

impl ItemOutcome {
    /// Movie id of the outcome
    pub fn id(&self) -> i64 {
        match self {
            ItemOutcome::Fetched { id, .. } => *id,
            ItemOutcome::Failed(failed) => failed.id,
        }
    }

    /// Whether both documents were fetched
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Fetched { .. })
    }
}

/// Summary of a detail batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailFetchReport {
    /// Ids submitted
    pub requested: usize,
    /// Ids with both documents written
    pub succeeded: usize,
    /// Ids that failed, in input order
    pub failed: Vec<FailedItem>,
}

impl DetailFetchReport {
    /// Fold one outcome into the report
    pub fn record(&mut self, outcome: &ItemOutcome) {
        self.requested += 1;
        match outcome {
            ItemOutcome::Fetched { .. } => self.succeeded += 1,
            ItemOutcome::Failed(failed) => self.failed.push(failed.clone()),
        }
    }

    /// Whether every requested id succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Ids that failed
    pub fn failed_ids(&self) -> Vec<i64> {
        self.failed.iter().map(|f| f.id).collect()
    }
}

//! Per-document processing report (§4.7 "Metrics emitted per document").

use crate::metrics::FallbackReason;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Latency of one named pipeline stage, in milliseconds (serializable;
/// `Duration` itself is kept internally during processing).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageLatency {
    /// Stage name, e.g. `"navigation"`, `"chunking"`, `"relationships"`.
    pub stage: &'static str,
    /// Wall-clock duration of that stage, in milliseconds.
    pub millis: u128,
}

/// The outcome of processing one document (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    /// The document this report covers.
    pub document_id: String,
    /// Whether the hierarchical path was used.
    pub routed_hierarchical: bool,
    /// Present only when the document fell back to flat chunking.
    pub fallback_reason: Option<FallbackReason>,
    /// Per-stage wall-clock latency.
    pub stage_latencies: Vec<StageLatency>,
    /// Number of chunks emitted.
    pub chunk_count: usize,
    /// Number of relationships emitted (after strength filtering).
    pub relationship_count: usize,
    /// Number of entities emitted.
    pub entity_count: usize,
    /// Number of decision trees emitted.
    pub decision_tree_count: usize,
    /// How many of those decision trees were flagged `needs_manual_review`.
    pub decision_trees_needing_review: usize,
    /// Set when the final Graph Store write failed permanently after
    /// retries (§4.8 "Failure semantics"); the document's graph state is
    /// unchanged in that case.
    pub persistence_error: Option<String>,
}

impl DocumentReport {
    /// Whether every emitted decision tree met its quality thresholds
    /// without needing manual review (§9 Open Question, resolved in
    /// DESIGN.md: a tree needing review still counts as "emitted", but this
    /// flag tracks review-free completeness separately for callers who want
    /// the stricter signal).
    #[must_use]
    pub fn decision_trees_fully_automated(&self) -> bool {
        self.decision_tree_count > 0
            && self.decision_trees_needing_review == 0
    }
}

/// Internal stage-timer accumulator used while building a [`DocumentReport`].
#[derive(Debug, Default)]
pub(super) struct StageTimer {
    started: HashMap<&'static str, std::time::Instant>,
    latencies: Vec<StageLatency>,
}

impl StageTimer {
    pub(super) fn start(&mut self, stage: &'static str) {
        self.started.insert(stage, std::time::Instant::now());
    }

    pub(super) fn stop(&mut self, stage: &'static str) {
        if let Some(start) = self.started.remove(stage) {
            self.latencies.push(StageLatency { stage, millis: start.elapsed().as_millis() });
        }
    }

    pub(super) fn into_latencies(self) -> Vec<StageLatency> {
        self.latencies
    }
}

/// Elapsed time since `start`, used for soft-deadline routing checks.
#[must_use]
pub fn elapsed_since(start: std::time::Instant) -> Duration {
    start.elapsed()
}

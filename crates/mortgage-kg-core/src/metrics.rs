//! Process-wide metric counters (spec §5, §9: "Only metric counters and the
//! LLM rate-limit bucket are process-wide... Counters use atomic add").

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomically-updated counters shared across concurrently processed
/// documents. Cheap to clone (it's an `Arc`-free bag of atomics meant to be
/// held behind a single `Arc<PipelineMetrics>` by the orchestrator).
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    documents_routed_hierarchical: AtomicU64,
    documents_routed_flat: AtomicU64,
    chunks_emitted: AtomicU64,
    relationships_detected: AtomicU64,
    relationships_dropped_low_strength: AtomicU64,
    decision_trees_emitted: AtomicU64,
    decision_trees_needing_review: AtomicU64,
    fallback_soft_deadline: AtomicU64,
    fallback_hard_deadline: AtomicU64,
    fallback_stage_exception: AtomicU64,
    fallback_structure_insufficient: AtomicU64,
    persistence_retries: AtomicU64,
    persistence_failures: AtomicU64,
}

/// A point-in-time, serializable snapshot of [`PipelineMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Documents routed through the hierarchical pipeline.
    pub documents_routed_hierarchical: u64,
    /// Documents routed through the flat fallback chunker.
    pub documents_routed_flat: u64,
    /// Total chunks emitted across all documents.
    pub chunks_emitted: u64,
    /// Total chunk relationships kept after the strength floor.
    pub relationships_detected: u64,
    /// Relationships dropped for falling below `min_relationship_strength`.
    pub relationships_dropped_low_strength: u64,
    /// Decision trees emitted (including synthesized-complete ones).
    pub decision_trees_emitted: u64,
    /// Decision trees emitted with `needs_manual_review = true`.
    pub decision_trees_needing_review: u64,
    /// Fallbacks triggered by the soft deadline.
    pub fallback_soft_deadline: u64,
    /// Fallbacks triggered by the hard deadline (stage cancelled).
    pub fallback_hard_deadline: u64,
    /// Fallbacks triggered by an unrecoverable stage exception.
    pub fallback_stage_exception: u64,
    /// Fallbacks triggered by `STRUCTURE_INSUFFICIENT` or a size ceiling.
    pub fallback_structure_insufficient: u64,
    /// Transient persistence retries attempted.
    pub persistence_retries: u64,
    /// Persistence operations that failed permanently.
    pub persistence_failures: u64,
}

/// Why a document fell back to the flat chunker (§4.7, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackReason {
    /// The soft deadline elapsed before hierarchical stages completed.
    SoftDeadline,
    /// The hard deadline elapsed; the in-flight stage was cancelled.
    HardDeadline,
    /// A stage raised an unrecoverable exception.
    StageException,
    /// Routing declined the hierarchical path outright.
    StructureInsufficient,
}

impl PipelineMetrics {
    /// Create a fresh, zeroed counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record routing of one document.
    pub fn record_routed(&self, hierarchical: bool) {
        if hierarchical {
            self.documents_routed_hierarchical
                .fetch_add(1, Ordering::Relaxed);
        } else {
            self.documents_routed_flat.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record `count` chunks emitted for one document.
    pub fn record_chunks(&self, count: u64) {
        self.chunks_emitted.fetch_add(count, Ordering::Relaxed);
    }

    /// Record relationships kept and dropped for one document.
    pub fn record_relationships(&self, kept: u64, dropped_low_strength: u64) {
        self.relationships_detected
            .fetch_add(kept, Ordering::Relaxed);
        self.relationships_dropped_low_strength
            .fetch_add(dropped_low_strength, Ordering::Relaxed);
    }

    /// Record one decision tree's completion state.
    pub fn record_decision_tree(&self, needs_manual_review: bool) {
        self.decision_trees_emitted.fetch_add(1, Ordering::Relaxed);
        if needs_manual_review {
            self.decision_trees_needing_review
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a fallback decision for one document.
    pub fn record_fallback(&self, reason: FallbackReason) {
        let counter = match reason {
            FallbackReason::SoftDeadline => &self.fallback_soft_deadline,
            FallbackReason::HardDeadline => &self.fallback_hard_deadline,
            FallbackReason::StageException => &self.fallback_stage_exception,
            FallbackReason::StructureInsufficient => &self.fallback_structure_insufficient,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a persistence retry attempt.
    pub fn record_persistence_retry(&self) {
        self.persistence_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a permanent persistence failure.
    pub fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a consistent-enough snapshot for reporting. Individual counters
    /// are read independently (no cross-counter atomicity is promised, nor
    /// needed — each is monotonic and used for dashboards/tests, not
    /// accounting reconciliation).
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_routed_hierarchical: self.documents_routed_hierarchical.load(Ordering::Relaxed),
            documents_routed_flat: self.documents_routed_flat.load(Ordering::Relaxed),
            chunks_emitted: self.chunks_emitted.load(Ordering::Relaxed),
            relationships_detected: self.relationships_detected.load(Ordering::Relaxed),
            relationships_dropped_low_strength: self
                .relationships_dropped_low_strength
                .load(Ordering::Relaxed),
            decision_trees_emitted: self.decision_trees_emitted.load(Ordering::Relaxed),
            decision_trees_needing_review: self
                .decision_trees_needing_review
                .load(Ordering::Relaxed),
            fallback_soft_deadline: self.fallback_soft_deadline.load(Ordering::Relaxed),
            fallback_hard_deadline: self.fallback_hard_deadline.load(Ordering::Relaxed),
            fallback_stage_exception: self.fallback_stage_exception.load(Ordering::Relaxed),
            fallback_structure_insufficient: self
                .fallback_structure_insufficient
                .load(Ordering::Relaxed),
            persistence_retries: self.persistence_retries.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn counters_start_at_zero() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn record_routed_splits_hierarchical_and_flat() {
        let metrics = PipelineMetrics::new();
        metrics.record_routed(true);
        metrics.record_routed(true);
        metrics.record_routed(false);
        let snap = metrics.snapshot();
        assert_eq!(snap.documents_routed_hierarchical, 2);
        assert_eq!(snap.documents_routed_flat, 1);
    }

    #[test]
    fn concurrent_increments_are_atomic() {
        let metrics = Arc::new(PipelineMetrics::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let m = Arc::clone(&metrics);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    m.record_chunks(1);
                }
            }));
        }
        for h in handles {
            h.join().expect("thread panicked");
        }
        assert_eq!(metrics.snapshot().chunks_emitted, 8000);
    }

    #[test]
    fn fallback_reasons_route_to_distinct_counters() {
        let metrics = PipelineMetrics::new();
        metrics.record_fallback(FallbackReason::SoftDeadline);
        metrics.record_fallback(FallbackReason::StructureInsufficient);
        metrics.record_fallback(FallbackReason::StructureInsufficient);
        let snap = metrics.snapshot();
        assert_eq!(snap.fallback_soft_deadline, 1);
        assert_eq!(snap.fallback_structure_insufficient, 2);
        assert_eq!(snap.fallback_hard_deadline, 0);
    }
}

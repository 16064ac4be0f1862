//! Chunk relationship data model (§3, §4.4).

use serde::{Deserialize, Serialize};

/// The ten relationship kinds the Chunk Relationship Manager can emit
/// (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipKind {
    /// Derived from the navigation tree: the owning node of A is the
    /// parent of the owning node of B.
    ParentChild,
    /// Consecutive chunks inside the same SECTION.
    Sequential,
    /// An explicit citation in A resolves to a node containing B.
    References,
    /// From a DECISION chunk to a candidate outcome-criterion chunk.
    DecisionBranch,
    /// From a DECISION/BRANCH chunk to a chunk carrying a final outcome.
    DecisionOutcome,
    /// An IF-THEN pattern detected inside a CONTENT chunk.
    Conditional,
    /// A CONTENT chunk textually expands a MATRIX cell.
    Elaborates,
    /// A chunk is a short summary of a sibling.
    Summarizes,
    /// A Guidelines chunk references a section of a same-Product/Program
    /// Matrix document.
    InterDocument,
    /// Bidirectional overlay between Guideline sections and Matrix cells
    /// sharing a normalized threshold (§9 Open Question: treated as
    /// bidirectional here — see DESIGN.md).
    MatrixGuideline,
}

/// Evidence backing one detected relationship (§4.4: "a small record: rule
/// id, up to 3 text excerpts, and normalized anchors").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Identifier of the detection rule that produced this relationship.
    pub rule_id: String,
    /// Up to 3 supporting text excerpts.
    pub excerpts: Vec<String>,
    /// Normalized anchors (numbering, titles) the rule matched on.
    pub anchors: Vec<String>,
}

impl Evidence {
    /// Build evidence, truncating excerpts to the 3-excerpt cap.
    #[must_use]
    pub fn new(rule_id: impl Into<String>, excerpts: Vec<String>, anchors: Vec<String>) -> Self {
        let mut excerpts = excerpts;
        excerpts.truncate(3);
        Self { rule_id: rule_id.into(), excerpts, anchors }
    }
}

/// A typed, evidence-scored relationship between two chunks (§3, §4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRelationship {
    /// Source chunk id.
    pub from_chunk_id: String,
    /// Target chunk id.
    pub to_chunk_id: String,
    /// Relationship kind.
    pub kind: RelationshipKind,
    /// Rule-specific strength in `[0, 1]`.
    pub strength: f64,
    /// Rule prior × evidence count, in `[0, 1]`.
    pub confidence: f64,
    /// Supporting evidence.
    pub evidence: Evidence,
}

impl ChunkRelationship {
    /// The `(from, to, kind)` key relationships must be unique on (§4.4
    /// validation; §8 invariant 3).
    #[must_use]
    pub fn key(&self) -> (String, String, RelationshipKind) {
        (self.from_chunk_id.clone(), self.to_chunk_id.clone(), self.kind)
    }
}

/// Aggregate detection metrics emitted alongside a relationship batch
/// (§4.4: "Emit metrics: detection_rate, average strength, average
/// confidence").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelationshipMetrics {
    /// Fraction of candidate chunk-pairs that yielded a kept relationship.
    pub detection_rate: f64,
    /// Mean `strength` across kept relationships.
    pub average_strength: f64,
    /// Mean `confidence` across kept relationships.
    pub average_confidence: f64,
}

impl RelationshipMetrics {
    /// Compute metrics over a kept relationship set and the number of
    /// candidate pairs considered.
    #[must_use]
    pub fn compute(relationships: &[ChunkRelationship], candidate_pairs: usize) -> Self {
        if relationships.is_empty() {
            return Self { detection_rate: 0.0, average_strength: 0.0, average_confidence: 0.0 };
        }
        let n = relationships.len() as f64;
        let total_strength: f64 = relationships.iter().map(|r| r.strength).sum();
        let total_confidence: f64 = relationships.iter().map(|r| r.confidence).sum();
        Self {
            detection_rate: if candidate_pairs == 0 { 0.0 } else { n / candidate_pairs as f64 },
            average_strength: total_strength / n,
            average_confidence: total_confidence / n,
        }
    }
}

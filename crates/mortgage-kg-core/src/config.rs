//! Recognized configuration options (spec §6 "Configuration").
//!
//! This is a closed set — the pipeline never reads the environment or a
//! filesystem path itself; a caller builds a [`PipelineConfig`] (optionally
//! from its own env/TOML loading) and passes it to the orchestrator. Keeping
//! the orchestrator a pure function of its config argument is what makes the
//! re-run idempotence law (§8) straightforward to test.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-document-type character ceilings used by the navigation extractor's
/// routing pre-check (§4.2 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocCharCeilings {
    /// Ceiling for Guidelines documents.
    pub guidelines: usize,
    /// Ceiling for Matrix documents.
    pub matrix: usize,
    /// Ceiling for Procedures documents.
    pub procedures: usize,
    /// Ceiling applied when the document type hint is absent or unknown.
    pub default: usize,
}

impl Default for DocCharCeilings {
    fn default() -> Self {
        Self {
            guidelines: 600_000,
            matrix: 300_000,
            procedures: 200_000,
            default: 600_000,
        }
    }
}

impl DocCharCeilings {
    /// The ceiling that applies to a given document type hint.
    #[must_use]
    pub fn for_document_type(&self, document_type: Option<&str>) -> usize {
        match document_type.map(str::to_ascii_lowercase).as_deref() {
            Some("guidelines") => self.guidelines,
            Some("matrix") => self.matrix,
            Some("procedures") => self.procedures,
            _ => self.default,
        }
    }
}

/// Chunk sizing knobs consumed by the semantic chunker (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSizing {
    /// Target chunk size in tokens.
    pub target_chunk_tokens: usize,
    /// Overlap carried between adjacent chunks, in tokens.
    pub chunk_overlap_tokens: usize,
    /// Minimum viable chunk size; a sibling shorter than this is
    /// forward-merged into the next sibling instead of standing alone.
    pub min_chunk_tokens: usize,
    /// Chunks exceeding this are split at the highest-precedence internal
    /// break (paragraph > sentence > hard token cut).
    pub max_chunk_tokens: usize,
}

impl Default for ChunkSizing {
    fn default() -> Self {
        Self {
            target_chunk_tokens: 1500,
            chunk_overlap_tokens: 200,
            min_chunk_tokens: 200,
            max_chunk_tokens: 2000,
        }
    }
}

/// The full recognized configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// If false, every document is routed to the flat chunker regardless of
    /// structure score or length.
    pub enable_hierarchical_chunking: bool,
    /// If false, the relationship manager stage (§4.4) is skipped entirely.
    pub enable_relationship_detection: bool,
    /// Per-document-type size ceilings for routing.
    pub max_doc_chars: DocCharCeilings,
    /// Chunker sizing knobs.
    pub chunk_sizing: ChunkSizing,
    /// Relationships scoring below this strength are dropped before
    /// persistence.
    pub min_relationship_strength: f64,
    /// Soft deadline: once elapsed, the orchestrator stops starting new
    /// stages and falls back for the current document.
    #[serde(with = "duration_secs")]
    pub soft_deadline: Duration,
    /// Hard deadline: the in-flight stage is cancelled and any partially
    /// persisted data rolled back.
    #[serde(with = "duration_secs")]
    pub hard_deadline: Duration,
    /// Minimum structural probe score required to attempt the hierarchical
    /// path (§4.2 step 2).
    pub structure_score_floor: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enable_hierarchical_chunking: true,
            enable_relationship_detection: true,
            max_doc_chars: DocCharCeilings::default(),
            chunk_sizing: ChunkSizing::default(),
            min_relationship_strength: 0.1,
            soft_deadline: Duration::from_secs(300),
            hard_deadline: Duration::from_secs(600),
            structure_score_floor: 0.3,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_secs_f64().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.max_doc_chars.guidelines, 600_000);
        assert_eq!(cfg.max_doc_chars.matrix, 300_000);
        assert_eq!(cfg.max_doc_chars.procedures, 200_000);
        assert_eq!(cfg.max_doc_chars.default, 600_000);
        assert_eq!(cfg.chunk_sizing.target_chunk_tokens, 1500);
        assert_eq!(cfg.chunk_sizing.chunk_overlap_tokens, 200);
        assert_eq!(cfg.soft_deadline, Duration::from_secs(300));
        assert_eq!(cfg.hard_deadline, Duration::from_secs(600));
    }

    #[test]
    fn ceiling_lookup_falls_back_to_default_for_unknown_type() {
        let ceilings = DocCharCeilings::default();
        assert_eq!(ceilings.for_document_type(Some("RateSheet")), 600_000);
        assert_eq!(ceilings.for_document_type(None), 600_000);
        assert_eq!(ceilings.for_document_type(Some("Matrix")), 300_000);
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = PipelineConfig::default();
        let json = serde_json::to_string(&cfg).expect("serialize");
        let back: PipelineConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.soft_deadline, cfg.soft_deadline);
        assert_eq!(back.max_doc_chars.matrix, cfg.max_doc_chars.matrix);
    }
}

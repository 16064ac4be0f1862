//! Error taxonomy for the hierarchical document-understanding pipeline.
//!
//! Mirrors the split in spec §7: input errors fail fast and propagate to the
//! caller; routing "errors" are not errors at all (they select the fallback
//! path, see [`crate::orchestrator::routing`]); stage exceptions and
//! persistence errors are recovered or retried internally and surfaced to
//! the caller only as structured report fields, never as a propagated
//! `Result::Err` from the orchestrator.

use thiserror::Error;

/// Errors that can occur anywhere in the pipeline.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A package definition was rejected outright (unknown category, a
    /// Product with no Guidelines slot, a Program with no Matrix slot).
    #[error("invalid package definition: {0}")]
    InvalidPackageDefinition(String),

    /// `bind_document` was called with a `detected_type` that disagrees
    /// with the target slot's `document_type`.
    #[error("slot type mismatch: slot expects {expected:?}, got {actual:?}")]
    SlotTypeMismatch {
        /// The document type the slot was declared to accept.
        expected: crate::package::model::DocumentType,
        /// The document type actually detected on the bound document.
        actual: crate::package::model::DocumentType,
    },

    /// No such package/slot/version exists.
    #[error("not found: {0}")]
    NotFound(String),

    /// The navigation extractor's structural probe could not justify the
    /// hierarchical path. Not a hard failure — callers of the extractor see
    /// this as a signal, the orchestrator uses it to route to the fallback
    /// chunker (§4.2, §7).
    #[error("structure insufficient: score {score:.3} below floor, or length {length} exceeds ceiling {ceiling}")]
    StructureInsufficient {
        /// The computed structural score.
        score: f64,
        /// Document length in characters.
        length: usize,
        /// The applicable per-document-type ceiling.
        ceiling: usize,
    },

    /// A pipeline stage raised an unrecoverable exception; the orchestrator
    /// converts this into a fallback decision plus a recorded reason.
    #[error("stage '{stage}' failed: {source}")]
    StageFailed {
        /// Which stage failed (`navigation`, `chunking`, `relationships`,
        /// `entities`, `decision_trees`).
        stage: &'static str,
        /// The underlying cause.
        #[source]
        source: Box<Error>,
    },

    /// The LLM client's contract was violated by the provider (non-JSON
    /// response where a schema was requested, or a non-recoverable HTTP
    /// error after retries were exhausted).
    #[error("llm call failed: {0}")]
    Llm(String),

    /// A persistence operation against the graph store failed permanently
    /// (not transient) and the document's transaction was rolled back.
    #[error("graph store persistence failed: {0}")]
    Persistence(String),

    /// An invariant the pipeline is supposed to guarantee did not hold at a
    /// stage boundary (dangling relationship endpoint, duplicate
    /// `(from, to, kind)`, PARENT_CHILD cycle survives validation, etc).
    /// Surfacing this is itself a bug in the stage that let it through.
    #[error("invariant violated: {0}")]
    InvariantViolated(String),
}

/// Result type used throughout the pipeline.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap an error as having originated from a named stage.
    #[must_use]
    pub fn in_stage(stage: &'static str, source: Error) -> Self {
        Error::StageFailed {
            stage,
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_insufficient_displays_score_and_length() {
        let err = Error::StructureInsufficient {
            score: 0.12,
            length: 500_000,
            ceiling: 300_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("0.12"));
        assert!(msg.contains("500000"));
    }

    #[test]
    fn stage_failed_wraps_source() {
        let inner = Error::Llm("timeout".into());
        let wrapped = Error::in_stage("navigation", inner);
        match wrapped {
            Error::StageFailed { stage, source } => {
                assert_eq!(stage, "navigation");
                assert!(matches!(*source, Error::Llm(_)));
            }
            _ => panic!("expected StageFailed"),
        }
    }
}

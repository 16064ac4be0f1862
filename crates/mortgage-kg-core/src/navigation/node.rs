//! NavigationNode data model (§3, §9 "arena-allocated nodes referenced by
//! index to avoid owning-pointer cycles between parent and child").

use serde::{Deserialize, Serialize};

/// Stable index of a node within one document's [`super::tree::NavigationTree`]
/// arena. Not unique across documents.
pub type NodeIndex = usize;

/// The kind of structural element a NavigationNode represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    /// Synthetic top node wrapping the whole document.
    Root,
    /// Top-level chapter.
    Chapter,
    /// Section within a chapter.
    Section,
    /// Subsection within a section.
    Subsection,
    /// A section whose content drives an underwriting decision.
    DecisionFlowSection,
}

/// Half-open byte offset span `[start, end)` into the document's raw text.
/// Offsets are UTF-8 byte positions (matching `str` indexing and the
/// extractors' regex match offsets), not character counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    /// Start offset, inclusive.
    pub start: usize,
    /// End offset, exclusive.
    pub end: usize,
}

impl TextSpan {
    /// Number of bytes covered by this span.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether this span covers zero bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Metadata attached only to `DecisionFlowSection` nodes, flagging that
/// downstream decision-tree extraction applies (§4.6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionMetadata {
    /// Whether the extractor (LLM pass or regex fallback) detected explicit
    /// outcome keywords (approve/decline/refer) in this section's text.
    pub has_outcome_keywords: bool,
    /// Number of candidate criteria the extractor located, prior to
    /// validation/synthesis.
    pub candidate_criteria_count: usize,
}

/// A heading-level structural element of a document (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationNode {
    /// Stable id within the owning document (`"n0"`, `"n1"`, ... or an LLM
    /// supplied numbering-derived id).
    pub node_id: String,
    /// 1–5; ROOT is always 0 (kept out of the 1-5 range intentionally to
    /// make "deepest open ancestor whose depth < node.depth" comparisons
    /// simple at the tree's edge).
    pub depth_level: u8,
    /// Structural kind.
    pub node_type: NodeType,
    /// Heading text, trimmed.
    pub title: String,
    /// Normalized chapter/section numbering, e.g. `"1.2.3"`, if present.
    pub numbering: Option<String>,
    /// Byte span of this node's own content in the raw document.
    pub text_span: TextSpan,
    /// Arena index of the parent, `None` only for ROOT.
    pub parent: Option<NodeIndex>,
    /// Arena indices of children, in document order.
    pub children: Vec<NodeIndex>,
    /// Present only when `node_type == DecisionFlowSection`.
    pub decision_metadata: Option<DecisionMetadata>,
}

impl NavigationNode {
    /// Whether this node drives an underwriting decision.
    #[must_use]
    pub fn is_decision_flow_section(&self) -> bool {
        matches!(self.node_type, NodeType::DecisionFlowSection)
    }
}

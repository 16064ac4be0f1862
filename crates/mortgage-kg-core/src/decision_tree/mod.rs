//! Decision Tree Extractor & Validator (§4.6): for each DECISION_FLOW_SECTION
//! produces a complete decision tree, guaranteeing completeness by
//! synthesis rather than omitting a tree when extraction underdelivers.

mod extractor;
mod model;
mod validator;

pub use extractor::extract_decision_tree;
pub use model::{
    DecisionEdge, DecisionEdgeKind, DecisionTree, DecisionTreeNode, NodeRole, Outcome,
    QualityReport, TreeState,
};
pub use validator::{compute_quality, enforce_completeness, minimal_tree, validate};

use crate::llm::LlmClient;
use std::collections::HashSet;

/// Stands in for "the extractor raised an exception" (§4.6 state machine):
/// exactly one ROOT, and every parent id referenced by a node actually
/// exists in the tree. The regex fallback can't violate this; it exists for
/// the LLM path, where a malformed candidate graph is possible.
fn structurally_sane(tree: &DecisionTree) -> bool {
    if tree.root().is_none() {
        return false;
    }
    let ids: HashSet<&str> = tree.nodes.iter().map(|n| n.id.as_str()).collect();
    tree.nodes.iter().all(|n| n.parent_ids.iter().all(|p| ids.contains(p.as_str())))
}

/// Run the full §4.6 pipeline for one DECISION_FLOW_SECTION: extract, retry
/// once on a structural-sanity failure, fall back to a minimal synthesized
/// tree on a second failure, then always complete and validate so a tree is
/// never omitted.
pub async fn extract_and_validate(
    llm: &dyn LlmClient,
    section_node_id: &str,
    decision_text: &str,
) -> DecisionTree {
    let mut tree = extract_decision_tree(llm, section_node_id, decision_text).await;
    if !structurally_sane(&tree) {
        tree = extract_decision_tree(llm, section_node_id, decision_text).await;
        if !structurally_sane(&tree) {
            tree = minimal_tree(section_node_id);
        }
    }
    let completed = enforce_completeness(tree);
    let mut validated = validate(completed);
    validated.state = TreeState::Emitted;
    validated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FakeLlmClient;

    #[tokio::test]
    async fn pipeline_always_emits_a_complete_tree() {
        let fake = FakeLlmClient::new();
        let tree = extract_and_validate(&fake, "sec1", "If FICO < 620, decline the loan.").await;
        assert_eq!(tree.state, TreeState::Emitted);
        assert!(tree.is_complete());
    }

    #[tokio::test]
    async fn pipeline_emits_even_for_blank_section() {
        let fake = FakeLlmClient::new();
        let tree = extract_and_validate(&fake, "sec1", "").await;
        assert_eq!(tree.state, TreeState::Emitted);
        assert!(tree.is_complete());
    }
}

//! Decision tree completeness enforcement and scoring (§4.6 "Completeness
//! enforcement", "Validation categories and mandatory thresholds").

use super::model::{
    DecisionEdge, DecisionEdgeKind, DecisionTree, DecisionTreeNode, NodeRole, Outcome,
    QualityReport, TreeState,
};
use std::collections::HashSet;

fn default_message(outcome: Outcome) -> String {
    match outcome {
        Outcome::Approve => {
            "Synthesized default: approve when no disqualifying criterion applies.".to_string()
        }
        Outcome::Decline => {
            "Synthesized default: decline when eligibility criteria are not met.".to_string()
        }
        Outcome::Refer => "Synthesized default: refer to underwriter for manual review.".to_string(),
    }
}

fn ensure_leaf(tree: &mut DecisionTree, outcome: Outcome) -> String {
    if let Some(existing) = tree
        .nodes
        .iter()
        .find(|n| n.role == NodeRole::Leaf && n.outcome == Some(outcome))
    {
        return existing.id.clone();
    }
    let leaf_id = format!("{}-synthesized-{outcome:?}", tree.tree_id);
    tree.nodes.push(DecisionTreeNode {
        id: leaf_id.clone(),
        role: NodeRole::Leaf,
        outcome: Some(outcome),
        evaluation_precedence: outcome.synthesized_precedence(),
        logical_expression: default_message(outcome),
        parent_ids: Vec::new(),
        child_ids: Vec::new(),
        synthesized: true,
    });
    leaf_id
}

fn link(tree: &mut DecisionTree, from: &str, to: &str, kind: DecisionEdgeKind) {
    tree.edges.push(DecisionEdge { from: from.to_string(), to: to.to_string(), kind });
    if let Some(idx) = tree.nodes.iter().position(|n| n.id == from) {
        tree.nodes[idx].child_ids.push(to.to_string());
    }
    if let Some(idx) = tree.nodes.iter().position(|n| n.id == to) {
        tree.nodes[idx].parent_ids.push(from.to_string());
    }
}

/// Synthesize any missing mandatory outcome leaf, attach a `DEFAULT_PATH`
/// edge from every BRANCH left without an outgoing edge, wire ROOT directly
/// to the leaves if no BRANCH was extracted at all, then reattach orphans
/// (§4.6 "Completeness enforcement").
#[must_use]
pub fn enforce_completeness(mut tree: DecisionTree) -> DecisionTree {
    let have: HashSet<Outcome> = tree
        .nodes
        .iter()
        .filter_map(|n| if n.role == NodeRole::Leaf { n.outcome } else { None })
        .collect();

    let refer_id = if have.contains(&Outcome::Refer) {
        tree.nodes
            .iter()
            .find(|n| n.role == NodeRole::Leaf && n.outcome == Some(Outcome::Refer))
            .map(|n| n.id.clone())
            .unwrap_or_default()
    } else {
        ensure_leaf(&mut tree, Outcome::Refer)
    };
    if !have.contains(&Outcome::Approve) {
        ensure_leaf(&mut tree, Outcome::Approve);
    }
    if !have.contains(&Outcome::Decline) {
        ensure_leaf(&mut tree, Outcome::Decline);
    }

    let branch_ids: Vec<String> =
        tree.nodes.iter().filter(|n| n.role == NodeRole::Branch).map(|n| n.id.clone()).collect();
    for branch_id in branch_ids {
        let has_outgoing = tree.edges.iter().any(|e| e.from == branch_id);
        if !has_outgoing {
            link(&mut tree, &branch_id, &refer_id, DecisionEdgeKind::DefaultPath);
        }
    }

    if let Some(root_id) = tree.root().map(|r| r.id.clone()) {
        let root_has_outgoing = tree.edges.iter().any(|e| e.from == root_id);
        if !root_has_outgoing {
            let leaf_ids: Vec<String> =
                tree.nodes.iter().filter(|n| n.role == NodeRole::Leaf).map(|n| n.id.clone()).collect();
            for leaf_id in leaf_ids {
                link(&mut tree, &root_id, &leaf_id, DecisionEdgeKind::ResultsIn);
            }
        }
    }

    reattach_orphans(&mut tree);
    tree.state = TreeState::Complete;
    tree
}

/// Reattach every node unreachable from ROOT to its recorded parent if that
/// parent is itself reachable, otherwise directly to ROOT (§4.6 "Orphan
/// detection pass").
fn reattach_orphans(tree: &mut DecisionTree) {
    let Some(root_id) = tree.root().map(|r| r.id.clone()) else { return };
    loop {
        let reachable = tree.reachable_from_root();
        let orphan = tree
            .nodes
            .iter()
            .find(|n| n.id != root_id && !reachable.contains(&n.id))
            .map(|n| n.id.clone());
        let Some(orphan_id) = orphan else { break };
        let anchor = tree
            .nodes
            .iter()
            .find(|n| n.id == orphan_id)
            .and_then(|n| n.parent_ids.iter().find(|p| reachable.contains(*p)).cloned())
            .unwrap_or_else(|| root_id.clone());
        link(tree, &anchor, &orphan_id, DecisionEdgeKind::EscalatesTo);
    }
}

/// Compute the five §4.6 quality scores for a `Complete` tree.
#[must_use]
pub fn compute_quality(tree: &DecisionTree) -> QualityReport {
    let structural = if tree.root().is_some() { 1.0 } else { 0.0 };
    let reachable = tree.reachable_from_root();
    let leaves: Vec<&DecisionTreeNode> = tree.nodes.iter().filter(|n| n.role == NodeRole::Leaf).collect();

    let outcomes: HashSet<Outcome> =
        leaves.iter().filter(|l| reachable.contains(&l.id)).filter_map(|l| l.outcome).collect();
    let outcome_coverage = outcomes.len() as f64 / 3.0;

    let path_coverage = if leaves.is_empty() {
        1.0
    } else {
        leaves.iter().filter(|l| reachable.contains(&l.id)).count() as f64 / leaves.len() as f64
    };

    let branches: Vec<&DecisionTreeNode> = tree.nodes.iter().filter(|n| n.role == NodeRole::Branch).collect();
    let logical_consistency = if branches.is_empty() {
        1.0
    } else {
        let consistent = branches
            .iter()
            .filter(|b| {
                let outgoing: Vec<&DecisionEdge> = tree.edges.iter().filter(|e| e.from == b.id).collect();
                let true_count = outgoing.iter().filter(|e| e.kind == DecisionEdgeKind::IfTrue).count();
                let false_count = outgoing
                    .iter()
                    .filter(|e| matches!(e.kind, DecisionEdgeKind::IfFalse | DecisionEdgeKind::DefaultPath))
                    .count();
                true_count <= 1 && false_count <= 1
            })
            .count();
        consistent as f64 / branches.len() as f64
    };

    let overall =
        0.3 * structural + 0.3 * outcome_coverage + 0.2 * logical_consistency + 0.2 * path_coverage;

    QualityReport { structural, outcome_coverage, logical_consistency, path_coverage, overall }
}

/// Score a `Complete` tree and flag it for manual review if any mandatory
/// threshold is missed; validation never fails the tree outright (§4.6).
#[must_use]
pub fn validate(mut tree: DecisionTree) -> DecisionTree {
    tree.quality = compute_quality(&tree);
    tree.needs_manual_review = tree.needs_manual_review || !tree.quality.meets_thresholds();
    tree.state = TreeState::Validated;
    tree
}

/// A minimal tree for the "extraction failed twice" path: ROOT routed
/// straight to a REFER leaf, with APPROVE/DECLINE leaves present but
/// unreachable until `enforce_completeness` wires them in (§4.6: "second
/// failure synthesizes a minimal tree — ROOT with a single REFER leaf").
#[must_use]
pub fn minimal_tree(section_node_id: &str) -> DecisionTree {
    let tree_id = format!("tree-{section_node_id}");
    let root_id = format!("{tree_id}-root");
    DecisionTree {
        tree_id,
        section_node_id: section_node_id.to_string(),
        nodes: vec![DecisionTreeNode {
            id: root_id,
            role: NodeRole::Root,
            outcome: None,
            evaluation_precedence: 0,
            logical_expression: "policy entry".to_string(),
            parent_ids: Vec::new(),
            child_ids: Vec::new(),
            synthesized: true,
        }],
        edges: Vec::new(),
        state: TreeState::StructuralValid,
        quality: QualityReport {
            structural: 1.0,
            outcome_coverage: 0.0,
            logical_consistency: 1.0,
            path_coverage: 0.0,
            overall: 0.0,
        },
        needs_manual_review: true,
        extraction_attempts: 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision_tree::extractor::extract_decision_tree;
    use crate::llm::FakeLlmClient;

    #[tokio::test]
    async fn completeness_synthesizes_all_three_outcomes_for_empty_section() {
        let fake = FakeLlmClient::new();
        let tree = extract_decision_tree(&fake, "sec1", "").await;
        let tree = enforce_completeness(tree);
        assert!(tree.is_complete());
        let validated = validate(tree);
        assert!(validated.quality.meets_thresholds());
        assert!(!validated.needs_manual_review);
    }

    #[tokio::test]
    async fn partial_extraction_synthesizes_only_missing_outcomes() {
        let fake = FakeLlmClient::new();
        let tree =
            extract_decision_tree(&fake, "sec1", "If DTI exceeds 45%, decline the loan.").await;
        let synthesized_before = tree.nodes.iter().filter(|n| n.synthesized).count();
        let tree = enforce_completeness(tree);
        let synthesized_after = tree.nodes.iter().filter(|n| n.synthesized).count();
        assert!(synthesized_after > synthesized_before);
        assert!(tree.is_complete());
    }

    #[test]
    fn minimal_tree_needs_manual_review_after_completion() {
        let tree = minimal_tree("sec1");
        let tree = enforce_completeness(tree);
        assert!(tree.is_complete());
        let validated = validate(tree);
        assert!(validated.needs_manual_review);
    }

    #[tokio::test]
    async fn quality_report_path_coverage_counts_only_reachable_leaves() {
        let fake = FakeLlmClient::new();
        let tree = extract_decision_tree(&fake, "sec1", "If FICO < 620, decline the loan.").await;
        let tree = enforce_completeness(tree);
        let report = compute_quality(&tree);
        assert_eq!(report.path_coverage, 1.0);
        assert_eq!(report.outcome_coverage, 1.0);
    }
}

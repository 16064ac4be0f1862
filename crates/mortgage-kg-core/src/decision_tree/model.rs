//! Decision tree data model (§3, §4.6).

use serde::{Deserialize, Serialize};

/// The three mandatory roles plus the two auxiliary roles a decision tree
/// node can hold (§3, GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    /// The policy entry point; exactly one per tree.
    Root,
    /// An intermediate criterion node.
    Branch,
    /// A terminal node carrying a final outcome.
    Leaf,
    /// A non-outcome terminal (used for orphan re-attachment bookkeeping;
    /// rare in practice since every reachable terminal must carry an
    /// outcome per §8 invariant 2).
    Terminal,
    /// A routing node with no criterion of its own, e.g. a synthesized
    /// `DEFAULT_PATH` junction.
    Gateway,
}

/// The three mandatory underwriting outcomes (§GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Loan approved.
    Approve,
    /// Loan declined.
    Decline,
    /// Referred to a human underwriter.
    Refer,
}

impl Outcome {
    /// The evaluation_precedence reserved for a *synthesized* leaf of this
    /// outcome (§3: "APPROVE=98, DECLINE=99, REFER=97 for synthesized
    /// leaves").
    #[must_use]
    pub fn synthesized_precedence(self) -> u8 {
        match self {
            Outcome::Approve => 98,
            Outcome::Decline => 99,
            Outcome::Refer => 97,
        }
    }

    /// Detect an outcome keyword in free text (shared by the extractor and
    /// the relationship manager's DECISION_OUTCOME rule).
    #[must_use]
    pub fn detect(text: &str) -> Option<Self> {
        let lower = text.to_ascii_lowercase();
        if lower.contains("decline") || lower.contains("ineligible") {
            Some(Outcome::Decline)
        } else if lower.contains("refer") {
            Some(Outcome::Refer)
        } else if lower.contains("approve") || lower.contains("eligible") {
            Some(Outcome::Approve)
        } else {
            None
        }
    }
}

/// One node in a decision tree (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeNode {
    /// Stable id, unique within the owning tree.
    pub id: String,
    /// Structural role.
    pub role: NodeRole,
    /// Final outcome, present only on reachable LEAF nodes.
    pub outcome: Option<Outcome>,
    /// 1-99; 1-89 for real extracted criteria, 97/98/99 reserved for
    /// synthesized REFER/APPROVE/DECLINE leaves (§3, GLOSSARY).
    pub evaluation_precedence: u8,
    /// Free-text rendering of the criterion this node evaluates (e.g.
    /// `"FICO >= 620"`), empty for ROOT.
    pub logical_expression: String,
    /// Ids of this node's parents. ROOT has none; any other reachable node
    /// has at least one.
    pub parent_ids: Vec<String>,
    /// Ids of this node's children, in precedence order.
    pub child_ids: Vec<String>,
    /// Whether this node was synthesized by the validator rather than
    /// extracted from source text (§4.6 Completeness enforcement).
    pub synthesized: bool,
}

/// The kind of edge a decision-tree edge is persisted as (§6 edge types:
/// `IF_TRUE`, `IF_FALSE`, `DEFAULT_PATH`, `RESULTS_IN`, `ESCALATES_TO`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionEdgeKind {
    /// The criterion evaluated true.
    IfTrue,
    /// The criterion evaluated false.
    IfFalse,
    /// A BRANCH's fallback edge, attached when no other outgoing edge
    /// exists after connection (§4.6).
    DefaultPath,
    /// A BRANCH/ROOT edge directly into a LEAF carrying the final outcome.
    ResultsIn,
    /// An orphan re-attached to its nearest ancestor by navigation path
    /// (§4.6 "Orphan detection pass").
    EscalatesTo,
}

/// A directed edge between two decision-tree nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionEdge {
    /// Source node id.
    pub from: String,
    /// Target node id.
    pub to: String,
    /// Edge kind.
    pub kind: DecisionEdgeKind,
}

/// State machine states for one tree's extraction/validation lifecycle
/// (§4.6 "State machine (per tree)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeState {
    /// No extraction attempted yet.
    Empty,
    /// Extraction in progress.
    Extracting,
    /// ROOT/BRANCH/LEAF roles assigned and parent/child links consistent,
    /// but completeness/coverage not yet checked.
    StructuralValid,
    /// All three outcomes present and every LEAF reachable from ROOT,
    /// after synthesis if needed.
    Complete,
    /// Validation thresholds checked (may still be below threshold, in
    /// which case `needs_manual_review` is set, but the state still
    /// advances — validation is never fatal, §4.6).
    Validated,
    /// Final state; the tree is ready to hand to the Graph Store.
    Emitted,
}

/// A complete decision tree for one DECISION_FLOW_SECTION (§3, §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Stable tree id, derived from the owning section's node_id.
    pub tree_id: String,
    /// The DECISION_FLOW_SECTION node_id this tree was extracted from.
    pub section_node_id: String,
    /// All nodes in the tree.
    pub nodes: Vec<DecisionTreeNode>,
    /// All edges in the tree.
    pub edges: Vec<DecisionEdge>,
    /// Lifecycle state at emission time. Always `Emitted` or `Validated`
    /// by the time a tree leaves the extractor/validator pair; earlier
    /// states are only observed mid-extraction.
    pub state: TreeState,
    /// Quality scores per §4.6 "Validation categories and mandatory
    /// thresholds".
    pub quality: QualityReport,
    /// Set when thresholds could not be met even after auto-completion
    /// (§4.6); the tree is still emitted, never omitted.
    pub needs_manual_review: bool,
    /// How many times extraction was retried after an exception (§4.6
    /// "retries once; second failure synthesizes a minimal tree").
    pub extraction_attempts: u8,
}

/// Per-category scores computed by the validator (§4.6 "Validation
/// categories and mandatory thresholds").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Exactly one ROOT, all parent/child links consistent. Must be 100%.
    pub structural: f64,
    /// All three outcomes present among reachable LEAFs. Must be 100%.
    pub outcome_coverage: f64,
    /// Fraction of BRANCH nodes whose child edges are non-contradictory.
    /// Must be >= 95%.
    pub logical_consistency: f64,
    /// Fraction of LEAFs reachable from ROOT. Must be >= 90%.
    pub path_coverage: f64,
    /// Weighted overall score. Must be >= 85%.
    pub overall: f64,
}

impl QualityReport {
    /// Whether every mandatory threshold from §4.6 is met.
    #[must_use]
    pub fn meets_thresholds(&self) -> bool {
        self.structural >= 1.0
            && self.outcome_coverage >= 1.0
            && self.logical_consistency >= 0.95
            && self.path_coverage >= 0.90
            && self.overall >= 0.85
    }
}

impl DecisionTree {
    /// Nodes with `role == Leaf` and a non-`None` outcome.
    #[must_use]
    pub fn outcome_leaves(&self) -> Vec<&DecisionTreeNode> {
        self.nodes
            .iter()
            .filter(|n| n.role == NodeRole::Leaf && n.outcome.is_some())
            .collect()
    }

    /// The single ROOT node, if the structural invariant holds.
    #[must_use]
    pub fn root(&self) -> Option<&DecisionTreeNode> {
        let mut roots = self.nodes.iter().filter(|n| n.role == NodeRole::Root);
        let first = roots.next()?;
        if roots.next().is_some() {
            return None;
        }
        Some(first)
    }

    /// Node ids reachable from ROOT by following `child_ids`.
    #[must_use]
    pub fn reachable_from_root(&self) -> std::collections::HashSet<String> {
        let mut visited = std::collections::HashSet::new();
        let Some(root) = self.root() else { return visited };
        let mut stack = vec![root.id.clone()];
        while let Some(id) = stack.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.iter().find(|n| n.id == id) {
                stack.extend(node.child_ids.iter().cloned());
            }
        }
        visited
    }

    /// Whether §8 invariant 2 holds: exactly one ROOT, all three outcomes
    /// present among reachable LEAFs, every LEAF reachable.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        let Some(_) = self.root() else { return false };
        let reachable = self.reachable_from_root();
        let leaves: Vec<&DecisionTreeNode> =
            self.nodes.iter().filter(|n| n.role == NodeRole::Leaf).collect();
        if leaves.is_empty() || !leaves.iter().all(|l| reachable.contains(&l.id)) {
            return false;
        }
        let outcomes: std::collections::HashSet<Outcome> =
            leaves.iter().filter_map(|l| l.outcome).collect();
        outcomes.contains(&Outcome::Approve)
            && outcomes.contains(&Outcome::Decline)
            && outcomes.contains(&Outcome::Refer)
    }
}

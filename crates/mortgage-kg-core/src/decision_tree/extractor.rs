//! Decision element extraction (§4.6 "Extraction"): LLM-first, regex
//! fallback, turning a DECISION_FLOW_SECTION's text into a pre-completeness
//! ROOT + BRANCH + LEAF skeleton. Completeness enforcement and scoring is
//! `super::validator`'s job.

use super::model::{
    DecisionEdge, DecisionEdgeKind, DecisionTree, DecisionTreeNode, NodeRole, Outcome,
    QualityReport, TreeState,
};
use crate::llm::LlmClient;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::LazyLock;

static SENTENCE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?\n]+[.!?]?").unwrap());
static CONDITION_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(if|unless|when|provided that)\b").unwrap());

#[derive(Debug, Deserialize)]
struct LlmCriterion {
    condition: String,
    outcome: Option<String>,
    #[serde(default = "default_precedence")]
    precedence: u8,
}

fn default_precedence() -> u8 {
    50
}

fn criterion_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "criteria": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "condition": {"type": "string"},
                        "outcome": {"type": ["string", "null"]},
                        "precedence": {"type": "integer"}
                    },
                    "required": ["condition"]
                }
            }
        },
        "required": ["criteria"]
    })
}

fn parse_outcome_label(label: &str) -> Option<Outcome> {
    match label.to_ascii_uppercase().as_str() {
        "APPROVE" => Some(Outcome::Approve),
        "DECLINE" => Some(Outcome::Decline),
        "REFER" => Some(Outcome::Refer),
        _ => None,
    }
}

/// Attempt the LLM decision-element pass. Returns `None` on any failure to
/// call or parse, mirroring the navigation extractor's regex-fallback
/// contract (§4.2 step 4 "no error").
async fn extract_with_llm(llm: &dyn LlmClient, section_text: &str) -> Option<Vec<LlmCriterion>> {
    let prompt = format!(
        "extract_decision_elements\nIdentify the ordered underwriting criteria and their \
         outcomes (APPROVE/DECLINE/REFER) from this decision section:\n\n{section_text}"
    );
    let response = llm.complete(&prompt, &criterion_schema()).await.ok()?;
    let criteria = response.get("criteria")?.clone();
    serde_json::from_value::<Vec<LlmCriterion>>(criteria).ok()
}

/// Regex-only fallback: one candidate criterion per sentence that both
/// carries a condition marker and an outcome keyword, in document order.
fn extract_with_regex(section_text: &str) -> Vec<(String, Option<Outcome>, u8)> {
    let mut out = Vec::new();
    for (i, sentence) in SENTENCE_SPLIT.find_iter(section_text).enumerate() {
        let text = sentence.as_str().trim();
        if text.is_empty() || !CONDITION_MARKERS.is_match(text) {
            continue;
        }
        let outcome = Outcome::detect(text);
        if outcome.is_none() {
            continue;
        }
        let precedence = (((i + 1) * 10).min(89)) as u8;
        out.push((text.to_string(), outcome, precedence));
    }
    out
}

/// Extracted-leaf precedence: a fixed, always-valid (<= 89) value distinct
/// per outcome, reserved range 97-99 being for *synthesized* leaves only
/// (§3).
fn extracted_leaf_precedence(outcome: Outcome) -> u8 {
    match outcome {
        Outcome::Approve => 80,
        Outcome::Decline => 85,
        Outcome::Refer => 75,
    }
}

/// Run the §4.6 "Extraction" algorithm for one DECISION_FLOW_SECTION,
/// producing a tree in `StructuralValid` state (ROOT always present,
/// possibly zero BRANCHes/LEAVES if the section carries no decision
/// content — completeness is enforced downstream by the validator).
pub async fn extract_decision_tree(
    llm: &dyn LlmClient,
    section_node_id: &str,
    decision_text: &str,
) -> DecisionTree {
    let tree_id = format!("tree-{section_node_id}");
    let root_id = format!("{tree_id}-root");

    let mut nodes = vec![DecisionTreeNode {
        id: root_id.clone(),
        role: NodeRole::Root,
        outcome: None,
        evaluation_precedence: 0,
        logical_expression: "policy entry".to_string(),
        parent_ids: Vec::new(),
        child_ids: Vec::new(),
        synthesized: decision_text.trim().is_empty(),
    }];
    let mut edges = Vec::new();

    let criteria: Vec<(String, Option<Outcome>, u8)> = match extract_with_llm(llm, decision_text).await
    {
        Some(parsed) if !parsed.is_empty() => parsed
            .into_iter()
            .map(|c| {
                (
                    c.condition,
                    c.outcome.as_deref().and_then(parse_outcome_label),
                    c.precedence.clamp(1, 89),
                )
            })
            .collect(),
        _ => extract_with_regex(decision_text),
    };

    let mut leaf_by_outcome: HashMap<Outcome, String> = HashMap::new();
    let mut previous = root_id.clone();

    for (condition, outcome, precedence) in criteria {
        let branch_id = format!("{tree_id}-branch-{}", nodes.len());
        nodes.push(DecisionTreeNode {
            id: branch_id.clone(),
            role: NodeRole::Branch,
            outcome: None,
            evaluation_precedence: precedence.clamp(1, 89),
            logical_expression: condition,
            parent_ids: vec![previous.clone()],
            child_ids: Vec::new(),
            synthesized: false,
        });
        let link_kind = if previous == root_id {
            DecisionEdgeKind::ResultsIn
        } else {
            DecisionEdgeKind::IfFalse
        };
        edges.push(DecisionEdge { from: previous.clone(), to: branch_id.clone(), kind: link_kind });
        if let Some(idx) = nodes.iter().position(|n| n.id == previous) {
            nodes[idx].child_ids.push(branch_id.clone());
        }

        if let Some(outcome) = outcome {
            let leaf_id = leaf_by_outcome
                .entry(outcome)
                .or_insert_with(|| format!("{tree_id}-leaf-{outcome:?}"))
                .clone();
            if !nodes.iter().any(|n| n.id == leaf_id) {
                nodes.push(DecisionTreeNode {
                    id: leaf_id.clone(),
                    role: NodeRole::Leaf,
                    outcome: Some(outcome),
                    evaluation_precedence: extracted_leaf_precedence(outcome),
                    logical_expression: String::new(),
                    parent_ids: Vec::new(),
                    child_ids: Vec::new(),
                    synthesized: false,
                });
            }
            edges.push(DecisionEdge {
                from: branch_id.clone(),
                to: leaf_id.clone(),
                kind: DecisionEdgeKind::IfTrue,
            });
            if let Some(idx) = nodes.iter().position(|n| n.id == branch_id) {
                nodes[idx].child_ids.push(leaf_id.clone());
            }
            if let Some(idx) = nodes.iter().position(|n| n.id == leaf_id) {
                nodes[idx].parent_ids.push(branch_id.clone());
            }
        }
        previous = branch_id;
    }

    DecisionTree {
        tree_id,
        section_node_id: section_node_id.to_string(),
        nodes,
        edges,
        state: TreeState::StructuralValid,
        quality: QualityReport {
            structural: 1.0,
            outcome_coverage: 0.0,
            logical_consistency: 1.0,
            path_coverage: 0.0,
            overall: 0.0,
        },
        needs_manual_review: false,
        extraction_attempts: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FakeLlmClient;

    #[tokio::test]
    async fn regex_fallback_builds_branch_and_leaf_for_decline() {
        let fake = FakeLlmClient::new();
        let tree = extract_decision_tree(
            &fake,
            "sec1",
            "If DTI exceeds 45%, decline the loan due to excessive debt.",
        )
        .await;
        assert!(tree.nodes.iter().any(|n| n.role == NodeRole::Branch));
        assert!(tree
            .nodes
            .iter()
            .any(|n| n.role == NodeRole::Leaf && n.outcome == Some(Outcome::Decline)));
    }

    #[tokio::test]
    async fn empty_section_yields_root_only() {
        let fake = FakeLlmClient::new();
        let tree = extract_decision_tree(&fake, "sec1", "").await;
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.root().unwrap().role, NodeRole::Root);
    }

    #[tokio::test]
    async fn llm_path_used_when_response_parses() {
        let response = json!({
            "criteria": [
                {"condition": "FICO < 620", "outcome": "DECLINE", "precedence": 10},
                {"condition": "FICO >= 620 and DTI <= 43", "outcome": "APPROVE", "precedence": 20}
            ]
        });
        let fake = FakeLlmClient::new().with_default(response);
        let tree = extract_decision_tree(&fake, "sec1", "some decision text").await;
        let leaves: Vec<_> = tree.nodes.iter().filter(|n| n.role == NodeRole::Leaf).collect();
        assert_eq!(leaves.len(), 2);
    }

    #[tokio::test]
    async fn multiple_criteria_for_same_outcome_share_one_leaf() {
        let fake = FakeLlmClient::new();
        let text = "If bankruptcy occurred within 2 years, decline. If foreclosure occurred \
                     within 3 years, decline the application as well.";
        let tree = extract_decision_tree(&fake, "sec1", text).await;
        let decline_leaves: Vec<_> = tree
            .nodes
            .iter()
            .filter(|n| n.role == NodeRole::Leaf && n.outcome == Some(Outcome::Decline))
            .collect();
        assert_eq!(decline_leaves.len(), 1);
    }
}

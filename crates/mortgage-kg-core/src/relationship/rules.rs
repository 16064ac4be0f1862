//! Individual relationship-detection rules (§4.4 table). Each rule takes
//! the chunk list plus whatever indices it needs and returns candidate
//! relationships; the manager (§4.4 "Validation") dedups and filters them.

use super::model::{ChunkRelationship, Evidence, RelationshipKind};
use crate::chunk::{Chunk, ChunkType};
use crate::navigation::NavigationTree;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static CROSS_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsee\s+(?:section|matrix)\s+([0-9.]+)").unwrap());
static OUTCOME_KEYWORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(approve|decline|refer to underwriter)\b").unwrap());
static IF_THEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bif\b.{1,200}?\bthen\b").unwrap());
static NUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(\.\d+)?%?").unwrap());

/// Map from a chunk's owning node_id (last entry of `navigation_path`) to
/// the indices of chunks owned by that node, preserving a node-id index so
/// later rules avoid re-scanning the full chunk list (§4.4 performance
/// target).
pub struct ChunkIndex<'a> {
    chunks: &'a [Chunk],
    by_node: HashMap<&'a str, Vec<usize>>,
}

impl<'a> ChunkIndex<'a> {
    /// Build an index over `chunks`.
    #[must_use]
    pub fn build(chunks: &'a [Chunk]) -> Self {
        let mut by_node: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if let Some(node_id) = chunk.navigation_path.last() {
                by_node.entry(node_id.as_str()).or_default().push(i);
            }
        }
        Self { chunks, by_node }
    }

    fn owning_node(&self, chunk: &Chunk) -> Option<&str> {
        chunk.navigation_path.last().map(String::as_str)
    }
}

fn numeric_anchors(text: &str) -> Vec<String> {
    NUMERIC.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// PARENT_CHILD: chunk A's owning node is the navigation-tree parent of
/// chunk B's owning node.
#[must_use]
pub fn parent_child(tree: &NavigationTree, index: &ChunkIndex) -> Vec<ChunkRelationship> {
    let mut out = Vec::new();
    for node in tree.nodes() {
        let Some(parent_idx) = node.parent else { continue };
        let parent_node = tree.node(parent_idx).expect("parent index valid");
        let Some(parent_chunks) = index.by_node.get(parent_node.node_id.as_str()) else {
            continue;
        };
        let Some(child_chunks) = index.by_node.get(node.node_id.as_str()) else { continue };
        for &p in parent_chunks {
            for &c in child_chunks {
                out.push(ChunkRelationship {
                    from_chunk_id: index.chunks[p].chunk_id.clone(),
                    to_chunk_id: index.chunks[c].chunk_id.clone(),
                    kind: RelationshipKind::ParentChild,
                    strength: 1.0,
                    confidence: 1.0,
                    evidence: Evidence::new(
                        "parent_child.tree_derived",
                        vec![],
                        vec![parent_node.node_id.clone(), node.node_id.clone()],
                    ),
                });
            }
        }
    }
    out
}

/// SEQUENTIAL: consecutive chunks (by `position`) sharing the same owning
/// node.
#[must_use]
pub fn sequential(index: &ChunkIndex) -> Vec<ChunkRelationship> {
    let mut ordered: Vec<usize> = (0..index.chunks.len()).collect();
    ordered.sort_by_key(|&i| index.chunks[i].position);
    let mut out = Vec::new();
    for pair in ordered.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if index.owning_node(&index.chunks[a]) == index.owning_node(&index.chunks[b])
            && index.owning_node(&index.chunks[a]).is_some()
        {
            out.push(ChunkRelationship {
                from_chunk_id: index.chunks[a].chunk_id.clone(),
                to_chunk_id: index.chunks[b].chunk_id.clone(),
                kind: RelationshipKind::Sequential,
                strength: 1.0,
                confidence: 0.9,
                evidence: Evidence::new("sequential.same_node_consecutive", vec![], vec![]),
            });
        }
    }
    out
}

/// REFERENCES: an explicit "see Section X.Y" / "see Matrix X.Y" citation
/// resolved first by exact numbering match, then by normalized title
/// match.
#[must_use]
pub fn references(tree: &NavigationTree, index: &ChunkIndex) -> Vec<ChunkRelationship> {
    let numbering_index: HashMap<&str, &str> = tree
        .nodes()
        .iter()
        .filter_map(|n| n.numbering.as_deref().map(|num| (num, n.node_id.as_str())))
        .collect();
    let title_index: HashMap<String, &str> = tree
        .nodes()
        .iter()
        .filter(|n| !n.title.is_empty())
        .map(|n| (n.title.to_ascii_lowercase(), n.node_id.as_str()))
        .collect();

    let mut out = Vec::new();
    for chunk in index.chunks {
        for caps in CROSS_REF.captures_iter(&chunk.content) {
            let Some(reference) = caps.get(1) else { continue };
            let target_node = numbering_index
                .get(reference.as_str())
                .copied()
                .or_else(|| title_index.get(&reference.as_str().to_ascii_lowercase()).copied());
            let Some(target_node) = target_node else { continue };
            let Some(target_chunks) = index.by_node.get(target_node) else { continue };
            for &t in target_chunks {
                if index.chunks[t].chunk_id == chunk.chunk_id {
                    continue;
                }
                out.push(ChunkRelationship {
                    from_chunk_id: chunk.chunk_id.clone(),
                    to_chunk_id: index.chunks[t].chunk_id.clone(),
                    kind: RelationshipKind::References,
                    strength: 0.9,
                    confidence: 0.85,
                    evidence: Evidence::new(
                        "references.citation_resolved",
                        vec![caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default()],
                        vec![reference.as_str().to_string()],
                    ),
                });
            }
        }
    }
    out
}

/// DECISION_BRANCH and DECISION_OUTCOME: from a DECISION chunk to sibling
/// candidate-criterion chunks under the same owning node, and on to any
/// chunk carrying a final outcome keyword.
#[must_use]
pub fn decision_edges(index: &ChunkIndex) -> Vec<ChunkRelationship> {
    let mut out = Vec::new();
    for (&node_id, chunk_indices) in &index.by_node {
        let decisions: Vec<usize> = chunk_indices
            .iter()
            .copied()
            .filter(|&i| index.chunks[i].chunk_type == ChunkType::Decision)
            .collect();
        if decisions.is_empty() {
            continue;
        }
        for &decision_idx in &decisions {
            for &sibling_idx in chunk_indices {
                if sibling_idx == decision_idx {
                    continue;
                }
                let sibling = &index.chunks[sibling_idx];
                let has_outcome = OUTCOME_KEYWORDS.is_match(&sibling.content);
                let kind = if has_outcome {
                    RelationshipKind::DecisionOutcome
                } else {
                    RelationshipKind::DecisionBranch
                };
                out.push(ChunkRelationship {
                    from_chunk_id: index.chunks[decision_idx].chunk_id.clone(),
                    to_chunk_id: sibling.chunk_id.clone(),
                    kind,
                    strength: if has_outcome { 0.95 } else { 0.7 },
                    confidence: 0.8,
                    evidence: Evidence::new(
                        "decision_edges.same_decision_flow_section",
                        vec![],
                        vec![node_id.to_string()],
                    ),
                });
            }
        }
    }
    out
}

/// CONDITIONAL: an IF-THEN pattern inside a CONTENT chunk, linked to the
/// immediately following chunk in reading order (its consequence).
#[must_use]
pub fn conditional(index: &ChunkIndex) -> Vec<ChunkRelationship> {
    let mut ordered: Vec<usize> = (0..index.chunks.len()).collect();
    ordered.sort_by_key(|&i| index.chunks[i].position);

    let mut out = Vec::new();
    for pair in ordered.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let chunk = &index.chunks[a];
        if chunk.chunk_type == ChunkType::Content && IF_THEN.is_match(&chunk.content) {
            out.push(ChunkRelationship {
                from_chunk_id: chunk.chunk_id.clone(),
                to_chunk_id: index.chunks[b].chunk_id.clone(),
                kind: RelationshipKind::Conditional,
                strength: 0.6,
                confidence: 0.6,
                evidence: Evidence::new("conditional.if_then_pattern", vec![], vec![]),
            });
        }
    }
    out
}

/// ELABORATES: a CONTENT chunk fuzzy-matches numeric thresholds present in
/// a MATRIX chunk under the same owning node's sibling set.
#[must_use]
pub fn elaborates(index: &ChunkIndex) -> Vec<ChunkRelationship> {
    let matrices: Vec<usize> = (0..index.chunks.len())
        .filter(|&i| index.chunks[i].chunk_type == ChunkType::Matrix)
        .collect();
    let contents: Vec<usize> = (0..index.chunks.len())
        .filter(|&i| index.chunks[i].chunk_type == ChunkType::Content)
        .collect();

    let mut out = Vec::new();
    for &m in &matrices {
        let matrix_numbers: std::collections::HashSet<String> =
            numeric_anchors(&index.chunks[m].content).into_iter().collect();
        if matrix_numbers.is_empty() {
            continue;
        }
        for &c in &contents {
            let content_numbers = numeric_anchors(&index.chunks[c].content);
            let shared: Vec<String> = content_numbers
                .into_iter()
                .filter(|n| matrix_numbers.contains(n))
                .collect();
            if shared.is_empty() {
                continue;
            }
            out.push(ChunkRelationship {
                from_chunk_id: index.chunks[c].chunk_id.clone(),
                to_chunk_id: index.chunks[m].chunk_id.clone(),
                kind: RelationshipKind::Elaborates,
                strength: (shared.len() as f64 / 5.0).min(1.0),
                confidence: 0.65,
                evidence: Evidence::new("elaborates.shared_numeric_threshold", vec![], shared),
            });
        }
    }
    out
}

fn word_set(text: &str) -> std::collections::HashSet<String> {
    text.split_whitespace().map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_ascii_lowercase()).filter(|w| !w.is_empty()).collect()
}

/// SUMMARIZES: a chunk is a short, high-lexical-recall summary of a true
/// sibling (same parent navigation node).
#[must_use]
pub fn summarizes(tree: &NavigationTree, index: &ChunkIndex) -> Vec<ChunkRelationship> {
    let mut siblings_by_parent: HashMap<usize, Vec<&str>> = HashMap::new();
    for node in tree.nodes() {
        if let Some(parent) = node.parent {
            siblings_by_parent.entry(parent).or_default().push(node.node_id.as_str());
        }
    }

    let mut out = Vec::new();
    for sibling_nodes in siblings_by_parent.values() {
        for &node_a in sibling_nodes {
            for &node_b in sibling_nodes {
                if node_a == node_b {
                    continue;
                }
                let Some(chunks_a) = index.by_node.get(node_a) else { continue };
                let Some(chunks_b) = index.by_node.get(node_b) else { continue };
                for &a in chunks_a {
                    for &b in chunks_b {
                        let (shorter, longer) = (&index.chunks[a], &index.chunks[b]);
                        if shorter.content.len() >= longer.content.len() {
                            continue;
                        }
                        if (shorter.content.len() as f64) > 0.3 * longer.content.len() as f64 {
                            continue;
                        }
                        let short_words = word_set(&shorter.content);
                        let long_words = word_set(&longer.content);
                        if long_words.is_empty() {
                            continue;
                        }
                        let overlap = short_words.intersection(&long_words).count();
                        let recall = overlap as f64 / long_words.len() as f64;
                        if recall > 0.6 {
                            out.push(ChunkRelationship {
                                from_chunk_id: shorter.chunk_id.clone(),
                                to_chunk_id: longer.chunk_id.clone(),
                                kind: RelationshipKind::Summarizes,
                                strength: recall,
                                confidence: 0.6,
                                evidence: Evidence::new(
                                    "summarizes.high_recall_low_length",
                                    vec![],
                                    vec![],
                                ),
                            });
                        }
                    }
                }
            }
        }
    }
    out
}

/// INTER_DOCUMENT: a Guidelines chunk references a Matrix section of the
/// same Product/Program (scope decision recorded in DESIGN.md).
#[must_use]
pub fn inter_document(
    guidelines_tree: &NavigationTree,
    guidelines: &ChunkIndex,
    matrix_tree: &NavigationTree,
    matrix: &ChunkIndex,
) -> Vec<ChunkRelationship> {
    let matrix_numbering: HashMap<&str, &str> = matrix_tree
        .nodes()
        .iter()
        .filter_map(|n| n.numbering.as_deref().map(|num| (num, n.node_id.as_str())))
        .collect();
    let _ = guidelines_tree;

    let mut out = Vec::new();
    for chunk in guidelines.chunks {
        for caps in CROSS_REF.captures_iter(&chunk.content) {
            let Some(reference) = caps.get(1) else { continue };
            let Some(target_node) = matrix_numbering.get(reference.as_str()) else { continue };
            let Some(target_chunks) = matrix.by_node.get(*target_node) else { continue };
            for &t in target_chunks {
                out.push(ChunkRelationship {
                    from_chunk_id: chunk.chunk_id.clone(),
                    to_chunk_id: matrix.chunks[t].chunk_id.clone(),
                    kind: RelationshipKind::InterDocument,
                    strength: 0.85,
                    confidence: 0.8,
                    evidence: Evidence::new(
                        "inter_document.matrix_citation",
                        vec![],
                        vec![reference.as_str().to_string()],
                    ),
                });
            }
        }
    }
    out
}

/// MATRIX_GUIDELINE: bidirectional overlay between Guideline content and
/// Matrix cells sharing a normalized numeric threshold (decided
/// bidirectional per DESIGN.md).
#[must_use]
pub fn matrix_guideline(guidelines: &ChunkIndex, matrix: &ChunkIndex) -> Vec<ChunkRelationship> {
    let mut out = Vec::new();
    for g in guidelines.chunks {
        let g_numbers: std::collections::HashSet<String> =
            numeric_anchors(&g.content).into_iter().collect();
        if g_numbers.is_empty() {
            continue;
        }
        for m in matrix.chunks.iter().filter(|c| c.chunk_type == ChunkType::Matrix) {
            let shared: Vec<String> = numeric_anchors(&m.content)
                .into_iter()
                .filter(|n| g_numbers.contains(n))
                .collect();
            if shared.is_empty() {
                continue;
            }
            let strength = (shared.len() as f64 / 5.0).min(1.0);
            out.push(ChunkRelationship {
                from_chunk_id: g.chunk_id.clone(),
                to_chunk_id: m.chunk_id.clone(),
                kind: RelationshipKind::MatrixGuideline,
                strength,
                confidence: 0.7,
                evidence: Evidence::new(
                    "matrix_guideline.shared_threshold",
                    vec![],
                    shared.clone(),
                ),
            });
            out.push(ChunkRelationship {
                from_chunk_id: m.chunk_id.clone(),
                to_chunk_id: g.chunk_id.clone(),
                kind: RelationshipKind::MatrixGuideline,
                strength,
                confidence: 0.7,
                evidence: Evidence::new("matrix_guideline.shared_threshold", vec![], shared),
            });
        }
    }
    out
}

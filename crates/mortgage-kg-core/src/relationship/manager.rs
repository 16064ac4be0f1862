//! Chunk Relationship Manager (§4.4): runs every detection rule, then
//! validates and scores the combined result.

use super::model::{ChunkRelationship, RelationshipKind, RelationshipMetrics};
use super::rules::{self, ChunkIndex};
use crate::chunk::Chunk;
use crate::navigation::NavigationTree;
use std::collections::HashMap;

/// The validated output of one relationship-detection pass.
#[derive(Debug, Clone)]
pub struct RelationshipBatch {
    /// Relationships that passed validation and the strength floor.
    pub relationships: Vec<ChunkRelationship>,
    /// Aggregate detection metrics (§4.4).
    pub metrics: RelationshipMetrics,
    /// Relationships dropped for falling below `min_strength`.
    pub dropped_low_strength: usize,
}

/// Run all within-document detection rules (§4.4 table, PARENT_CHILD
/// through SUMMARIZES; INTER_DOCUMENT/MATRIX_GUIDELINE are cross-document
/// and handled by [`detect_cross_document`]), then validate and score.
#[must_use]
pub fn detect_relationships(
    tree: &NavigationTree,
    chunks: &[Chunk],
    min_strength: f64,
) -> RelationshipBatch {
    let index = ChunkIndex::build(chunks);
    let mut candidates = Vec::new();
    candidates.extend(rules::parent_child(tree, &index));
    candidates.extend(rules::sequential(&index));
    candidates.extend(rules::references(tree, &index));
    candidates.extend(rules::decision_edges(&index));
    candidates.extend(rules::conditional(&index));
    candidates.extend(rules::elaborates(&index));
    candidates.extend(rules::summarizes(tree, &index));

    let candidate_pairs = chunks.len().saturating_mul(chunks.len().saturating_sub(1));
    finish(candidates, candidate_pairs, min_strength)
}

/// Run the two cross-document rules (§4.4 INTER_DOCUMENT, MATRIX_GUIDELINE)
/// between a Guidelines document's chunks and a same-Product/Program
/// Matrix document's chunks.
#[must_use]
pub fn detect_cross_document(
    guidelines_tree: &NavigationTree,
    guidelines_chunks: &[Chunk],
    matrix_tree: &NavigationTree,
    matrix_chunks: &[Chunk],
    min_strength: f64,
) -> RelationshipBatch {
    let guidelines_index = ChunkIndex::build(guidelines_chunks);
    let matrix_index = ChunkIndex::build(matrix_chunks);

    let mut candidates = Vec::new();
    candidates.extend(rules::inter_document(
        guidelines_tree,
        &guidelines_index,
        matrix_tree,
        &matrix_index,
    ));
    candidates.extend(rules::matrix_guideline(&guidelines_index, &matrix_index));

    let candidate_pairs = guidelines_chunks.len().saturating_mul(matrix_chunks.len());
    finish(candidates, candidate_pairs, min_strength)
}

fn finish(candidates: Vec<ChunkRelationship>, candidate_pairs: usize, min_strength: f64) -> RelationshipBatch {
    let deduped = drop_self_loops_and_dedupe(candidates);
    let acyclic = drop_parent_child_cycles(deduped);

    let mut dropped_low_strength = 0;
    let (kept, dropped): (Vec<_>, Vec<_>) =
        acyclic.into_iter().partition(|r| r.strength >= min_strength);
    dropped_low_strength += dropped.len();

    let metrics = RelationshipMetrics::compute(&kept, candidate_pairs);
    RelationshipBatch { relationships: kept, metrics, dropped_low_strength }
}

/// Reject self-loops; for duplicate `(from, to, kind)` keep the
/// highest-confidence one (§4.4 Validation).
fn drop_self_loops_and_dedupe(candidates: Vec<ChunkRelationship>) -> Vec<ChunkRelationship> {
    let mut best: HashMap<(String, String, RelationshipKind), ChunkRelationship> = HashMap::new();
    for rel in candidates {
        if rel.from_chunk_id == rel.to_chunk_id {
            continue;
        }
        let key = rel.key();
        match best.get(&key) {
            Some(existing) if existing.confidence >= rel.confidence => {}
            _ => {
                best.insert(key, rel);
            }
        }
    }
    best.into_values().collect()
}

/// Detect and drop cycles within the PARENT_CHILD subset (§9: "forbidden
/// for PARENT_CHILD... detect and drop PARENT_CHILD cycles at
/// relationship-emit time"). PARENT_CHILD edges are tree-derived so a cycle
/// should never occur in practice; this is a defensive validation pass.
fn drop_parent_child_cycles(relationships: Vec<ChunkRelationship>) -> Vec<ChunkRelationship> {
    use petgraph::algo::toposort;
    use petgraph::graphmap::DiGraphMap;

    let (parent_child, rest): (Vec<_>, Vec<_>) =
        relationships.into_iter().partition(|r| r.kind == RelationshipKind::ParentChild);

    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for rel in &parent_child {
        graph.add_edge(rel.from_chunk_id.as_str(), rel.to_chunk_id.as_str(), ());
    }

    let cyclic_nodes: std::collections::HashSet<String> = match toposort(&graph, None) {
        Ok(_) => std::collections::HashSet::new(),
        Err(cycle) => {
            // Conservatively drop every edge touching the node toposort
            // flagged; a single cycle node is enough to identify the loop.
            std::iter::once(cycle.node_id().to_string()).collect()
        }
    };

    let mut out: Vec<ChunkRelationship> = parent_child
        .into_iter()
        .filter(|r| {
            !cyclic_nodes.contains(&r.from_chunk_id) && !cyclic_nodes.contains(&r.to_chunk_id)
        })
        .collect();
    out.extend(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{chunk_id, ChunkType};
    use crate::navigation::{NavigationNode, NodeType, TextSpan};

    fn chunk(id_seed: &str, content: &str, chunk_type: ChunkType, path: &[&str], position: usize) -> Chunk {
        Chunk {
            chunk_id: chunk_id(&format!("{id_seed}-{content}")),
            content: content.to_string(),
            chunk_type,
            navigation_path: path.iter().map(|s| s.to_string()).collect(),
            depth_level: path.len() as u8,
            position,
            token_count: content.split_whitespace().count(),
            quality_score: 0.8,
        }
    }

    fn two_level_tree() -> NavigationTree {
        let mut tree = NavigationTree::with_root(1000);
        let root = tree.root_index();
        let ch1 = tree.insert_child(
            root,
            NavigationNode {
                node_id: "ch1".to_string(),
                depth_level: 1,
                node_type: NodeType::Chapter,
                title: "Chapter 1".to_string(),
                numbering: Some("1".to_string()),
                text_span: TextSpan { start: 0, end: 10 },
                parent: None,
                children: Vec::new(),
                decision_metadata: None,
            },
        );
        tree.insert_child(
            ch1,
            NavigationNode {
                node_id: "sec1.1".to_string(),
                depth_level: 2,
                node_type: NodeType::Section,
                title: "Income Documentation".to_string(),
                numbering: Some("1.1".to_string()),
                text_span: TextSpan { start: 0, end: 10 },
                parent: None,
                children: Vec::new(),
                decision_metadata: None,
            },
        );
        tree
    }

    #[test]
    fn parent_child_emitted_for_tree_derived_pairs() {
        let tree = two_level_tree();
        let chunks = vec![
            chunk("a", "Chapter 1 body", ChunkType::Content, &["root", "ch1"], 0),
            chunk("b", "Income doc body", ChunkType::Content, &["root", "ch1", "sec1.1"], 1),
        ];
        let batch = detect_relationships(&tree, &chunks, 0.0);
        assert!(batch
            .relationships
            .iter()
            .any(|r| r.kind == RelationshipKind::ParentChild));
    }

    #[test]
    fn self_loops_are_rejected() {
        let tree = NavigationTree::with_root(100);
        let c = chunk("a", "content", ChunkType::Content, &["root"], 0);
        let self_loop = ChunkRelationship {
            from_chunk_id: c.chunk_id.clone(),
            to_chunk_id: c.chunk_id.clone(),
            kind: RelationshipKind::Sequential,
            strength: 1.0,
            confidence: 1.0,
            evidence: super::super::model::Evidence::new("test", vec![], vec![]),
        };
        let deduped = drop_self_loops_and_dedupe(vec![self_loop]);
        assert!(deduped.is_empty());
        let _ = tree;
    }

    #[test]
    fn duplicate_relationship_keeps_highest_confidence() {
        let low = ChunkRelationship {
            from_chunk_id: "a".to_string(),
            to_chunk_id: "b".to_string(),
            kind: RelationshipKind::References,
            strength: 0.5,
            confidence: 0.3,
            evidence: super::super::model::Evidence::new("low", vec![], vec![]),
        };
        let high = ChunkRelationship {
            from_chunk_id: "a".to_string(),
            to_chunk_id: "b".to_string(),
            kind: RelationshipKind::References,
            strength: 0.9,
            confidence: 0.95,
            evidence: super::super::model::Evidence::new("high", vec![], vec![]),
        };
        let deduped = drop_self_loops_and_dedupe(vec![low, high]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].evidence.rule_id, "high");
    }

    #[test]
    fn min_strength_filters_weak_relationships() {
        let tree = two_level_tree();
        let chunks = vec![
            chunk("a", "Chapter 1 body", ChunkType::Content, &["root", "ch1"], 0),
            chunk("b", "Income doc body", ChunkType::Content, &["root", "ch1", "sec1.1"], 1),
        ];
        let permissive = detect_relationships(&tree, &chunks, 0.0);
        let strict = detect_relationships(&tree, &chunks, 2.0);
        assert!(strict.relationships.is_empty());
        assert!(!permissive.relationships.is_empty());
        assert_eq!(strict.dropped_low_strength, permissive.relationships.len());
    }

    #[test]
    fn references_resolve_by_exact_numbering() {
        let tree = two_level_tree();
        let chunks = vec![
            chunk(
                "a",
                "For documentation rules see Section 1.1 for complete requirements.",
                ChunkType::Content,
                &["root", "ch1"],
                0,
            ),
            chunk("b", "Income doc body", ChunkType::Content, &["root", "ch1", "sec1.1"], 1),
        ];
        let batch = detect_relationships(&tree, &chunks, 0.0);
        assert!(batch.relationships.iter().any(|r| r.kind == RelationshipKind::References));
    }
}

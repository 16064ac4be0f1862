//! Semantic Chunker (§4.3): splits a document into navigation-aware chunks.

use super::classify::classify;
use super::model::{chunk_id, Chunk, ChunkType};
use super::tokens::count_tokens;
use crate::config::ChunkSizing;
use crate::navigation::{NavigationTree, NodeIndex};
use mortgage_kg_text::{RecursiveCharacterTextSplitter, TextSplitter};

struct LeafText<'a> {
    index: NodeIndex,
    title: &'a str,
    body: String,
    merged_from: usize,
}

fn leaf_body<'a>(text: &'a str, tree: &NavigationTree, leaf: NodeIndex) -> &'a str {
    let node = tree.node(leaf).expect("leaf index is valid");
    let start = node.text_span.start.min(text.len());
    let end = node.text_span.end.min(text.len());
    if start >= end {
        ""
    } else {
        &text[start..end]
    }
}

/// Collect each leaf's own text, forward-merging any leaf whose token count
/// falls below `min` into the next sibling (§4.3: "if one sibling is
/// shorter than `min`, then forward-merge into the next sibling").
fn collect_leaves_with_merge<'a>(text: &'a str, tree: &NavigationTree, sizing: &ChunkSizing) -> Vec<LeafText<'a>> {
    let leaves = tree.leaves();
    let mut out: Vec<LeafText<'a>> = Vec::new();
    let mut pending: Option<LeafText<'a>> = None;

    for leaf in leaves {
        let node = tree.node(leaf).expect("leaf index is valid");
        let body = leaf_body(text, tree, leaf).to_string();
        let mut current = LeafText { index: leaf, title: &node.title, body, merged_from: 0 };

        if let Some(prev) = pending.take() {
            if count_tokens(&prev.body) < sizing.min_chunk_tokens {
                current.body = format!("{}\n{}", prev.body, current.body);
                current.merged_from = prev.merged_from + 1;
            } else {
                out.push(prev);
            }
        }
        pending = Some(current);
    }
    if let Some(last) = pending {
        out.push(last);
    }
    out
}

fn split_oversized(content: &str, sizing: &ChunkSizing) -> Vec<String> {
    if count_tokens(content) <= sizing.max_chunk_tokens {
        return vec![content.to_string()];
    }
    let splitter = RecursiveCharacterTextSplitter::new()
        .with_chunk_size(sizing.target_chunk_tokens)
        .with_chunk_overlap(sizing.chunk_overlap_tokens)
        .with_length_function(count_tokens);
    splitter.split_text(content)
}

/// Split `text` into chunks that respect `tree`'s navigation boundaries
/// (§4.3). If `tree` carries no nodes above ROOT, emits exactly one CONTENT
/// chunk covering the full text with `quality_score <= 0.5` (§8 boundary
/// behavior).
#[must_use]
pub fn chunk_document(tree: &NavigationTree, text: &str, sizing: &ChunkSizing) -> Vec<Chunk> {
    if tree.is_empty() {
        let content = text.to_string();
        let token_count = count_tokens(&content);
        return vec![Chunk {
            chunk_id: chunk_id(&content),
            content,
            chunk_type: ChunkType::Content,
            navigation_path: vec![tree.node(tree.root_index()).unwrap().node_id.clone()],
            depth_level: 0,
            position: 0,
            token_count,
            quality_score: 0.4,
        }];
    }

    let leaves = collect_leaves_with_merge(text, tree, sizing);
    let mut chunks = Vec::new();
    let mut position = 0usize;

    for leaf in leaves {
        let navigation_path: Vec<String> = tree
            .path_to_root(leaf.index)
            .into_iter()
            .map(|i| tree.node(i).unwrap().node_id.clone())
            .collect();
        let depth_level = tree.node(leaf.index).unwrap().depth_level;

        if !leaf.title.is_empty() {
            let content = leaf.title.to_string();
            let token_count = count_tokens(&content);
            chunks.push(Chunk {
                chunk_id: chunk_id(&content),
                content,
                chunk_type: ChunkType::Header,
                navigation_path: navigation_path.clone(),
                depth_level,
                position,
                token_count,
                quality_score: 1.0,
            });
            position += 1;
        }

        let trimmed = leaf.body.trim();
        if trimmed.is_empty() {
            continue;
        }

        for piece in split_oversized(trimmed, sizing) {
            let piece = piece.trim().to_string();
            if piece.is_empty() {
                continue;
            }
            let token_count = count_tokens(&piece);
            let chunk_type = classify(&piece, false);
            let balance = 1.0
                - ((token_count as f64 - sizing.target_chunk_tokens as f64).abs()
                    / sizing.target_chunk_tokens as f64)
                    .min(1.0);
            let boundary_respect = if piece.ends_with(['.', '!', '?', ':']) { 1.0 } else { 0.7 };
            let cohesion = if leaf.merged_from == 0 { 1.0 } else { 0.7 };
            let quality_score = (0.5 * balance + 0.3 * boundary_respect + 0.2 * cohesion).clamp(0.0, 1.0);

            chunks.push(Chunk {
                chunk_id: chunk_id(&piece),
                content: piece,
                chunk_type,
                navigation_path: navigation_path.clone(),
                depth_level,
                position,
                token_count,
                quality_score,
            });
            position += 1;
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::{NavigationNode, NodeType, TextSpan};

    fn small_tree() -> (NavigationTree, String) {
        let text = "Chapter 1\nBorrowers must document income with two years of tax returns. \
                     Self-employed borrowers require additional documentation.\nChapter 2\n\
                     LTV must not exceed 80% for primary residences."
            .to_string();
        let mut tree = NavigationTree::with_root(text.chars().count());
        let root = tree.root_index();
        tree.insert_child(
            root,
            NavigationNode {
                node_id: "ch1".to_string(),
                depth_level: 1,
                node_type: NodeType::Chapter,
                title: "Chapter 1".to_string(),
                numbering: None,
                text_span: TextSpan { start: 10, end: 140 },
                parent: None,
                children: Vec::new(),
                decision_metadata: None,
            },
        );
        tree.insert_child(
            root,
            NavigationNode {
                node_id: "ch2".to_string(),
                depth_level: 1,
                node_type: NodeType::Chapter,
                title: "Chapter 2".to_string(),
                numbering: None,
                text_span: TextSpan { start: 150, end: text.len() },
                parent: None,
                children: Vec::new(),
                decision_metadata: None,
            },
        );
        (tree, text)
    }

    #[test]
    fn empty_tree_yields_single_content_chunk_with_low_quality() {
        let text = "Just some unstructured prose with no headings whatsoever.";
        let tree = NavigationTree::with_root(text.len());
        let sizing = ChunkSizing::default();
        let chunks = chunk_document(&tree, text, &sizing);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_type, ChunkType::Content);
        assert!(chunks[0].quality_score <= 0.5);
    }

    #[test]
    fn chunks_carry_navigation_path_to_root() {
        let (tree, text) = small_tree();
        let sizing = ChunkSizing::default();
        let chunks = chunk_document(&tree, &text, &sizing);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert_eq!(chunk.navigation_path.first().map(String::as_str), Some("root"));
        }
    }

    #[test]
    fn chunk_id_is_deterministic_across_runs() {
        let (tree, text) = small_tree();
        let sizing = ChunkSizing::default();
        let first = chunk_document(&tree, &text, &sizing);
        let second = chunk_document(&tree, &text, &sizing);
        let first_ids: Vec<_> = first.iter().map(|c| c.chunk_id.clone()).collect();
        let second_ids: Vec<_> = second.iter().map(|c| c.chunk_id.clone()).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn header_chunks_emitted_for_titled_nodes() {
        let (tree, text) = small_tree();
        let sizing = ChunkSizing::default();
        let chunks = chunk_document(&tree, &text, &sizing);
        assert!(chunks.iter().any(|c| c.chunk_type == ChunkType::Header && c.content == "Chapter 1"));
    }

    #[test]
    fn oversized_leaf_is_split_and_preserves_content() {
        let body = "Income documentation requirement sentence number. ".repeat(400);
        let mut tree = NavigationTree::with_root(body.len());
        let root = tree.root_index();
        tree.insert_child(
            root,
            NavigationNode {
                node_id: "ch1".to_string(),
                depth_level: 1,
                node_type: NodeType::Chapter,
                title: String::new(),
                numbering: None,
                text_span: TextSpan { start: 0, end: body.len() },
                parent: None,
                children: Vec::new(),
                decision_metadata: None,
            },
        );
        let sizing = ChunkSizing::default();
        let chunks = chunk_document(&tree, &body, &sizing);
        assert!(chunks.len() > 1, "expected the oversized leaf to be split");
        for chunk in &chunks {
            assert!(chunk.token_count <= sizing.max_chunk_tokens + sizing.chunk_overlap_tokens);
        }
    }
}

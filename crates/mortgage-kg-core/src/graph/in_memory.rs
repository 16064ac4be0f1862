//! A deterministic in-process [`GraphStore`] fake for tests (§9).

use super::model::DocumentGraphWrite;
use super::store::GraphStore;
use crate::decision_tree::DecisionEdgeKind;
use crate::error::Result;
use crate::relationship::RelationshipKind;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;

/// The MERGE-deduplicated state an [`InMemoryGraphStore`] has accumulated.
/// Node/edge sets are keyed the same way the write algorithm's MERGE
/// clauses are (§4.8), so re-persisting the same document cannot grow them
/// — the property §8 invariant 4 and the "persisting the same chunk list
/// twice does not increase Chunk node count" round-trip law both exercise.
#[derive(Debug, Default, Clone)]
pub struct GraphSnapshot {
    /// `(document_id, node_id)` navigation node keys.
    pub navigation_node_keys: HashSet<(String, String)>,
    /// Chunk ids.
    pub chunk_ids: HashSet<String>,
    /// `(document_id, entity_id)` entity keys.
    pub entity_keys: HashSet<(String, String)>,
    /// `(from, to, kind)` chunk relationship keys.
    pub chunk_relationship_keys: HashSet<(String, String, RelationshipKind)>,
    /// Decision tree node ids.
    pub decision_tree_node_ids: HashSet<String>,
    /// `(from, to, kind)` decision tree edge keys.
    pub decision_tree_edge_keys: HashSet<(String, String, DecisionEdgeKind)>,
    /// How many times `persist_document` has been called, regardless of
    /// whether it changed anything — distinct from the node/edge counts
    /// above so tests can assert idempotence directly.
    pub write_count: usize,
}

/// A fake [`GraphStore`] holding a [`GraphSnapshot`] behind a mutex.
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    snapshot: Mutex<GraphSnapshot>,
}

impl InMemoryGraphStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A clone of the current accumulated state.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        self.snapshot.lock().clone()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn persist_document(&self, write: &DocumentGraphWrite) -> Result<()> {
        let mut snapshot = self.snapshot.lock();
        snapshot.write_count += 1;

        if let Some(navigation) = &write.navigation {
            for node in navigation.nodes() {
                snapshot
                    .navigation_node_keys
                    .insert((write.document_id.clone(), node.node_id.clone()));
            }
        }
        for chunk in &write.chunks {
            snapshot.chunk_ids.insert(chunk.chunk_id.clone());
        }
        for entity in &write.entities {
            snapshot
                .entity_keys
                .insert((write.document_id.clone(), entity.entity_id.clone()));
        }
        for relationship in &write.chunk_relationships {
            snapshot.chunk_relationship_keys.insert(relationship.key());
        }
        for tree in &write.decision_trees {
            for node in &tree.nodes {
                snapshot.decision_tree_node_ids.insert(node.id.clone());
            }
            for edge in &tree.edges {
                snapshot
                    .decision_tree_edge_keys
                    .insert((edge.from.clone(), edge.to.clone(), edge.kind));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{Chunk, ChunkType};
    use crate::package::model::{DocumentType as SlotType, ExpectedDocument, UploadStatus};
    use crate::package::{self, DocumentType, ProductSpec, ProgramSpec};

    fn slot(slot_id: &str, ty: SlotType) -> ExpectedDocument {
        ExpectedDocument {
            slot_id: slot_id.to_string(),
            product_id: None,
            program_id: None,
            document_type: ty,
            required: true,
            upload_status: UploadStatus::Empty,
            accepted_mime_types: vec!["application/pdf".to_string()],
            max_size_bytes: 50_000_000,
            raw_document_ref: None,
        }
    }

    fn sample_write() -> DocumentGraphWrite {
        let package = package::create_package(
            "pkg-1",
            "NQM",
            vec![ProductSpec {
                display_name: "Non-QM Standard".into(),
                processing_priority: 0,
                slots: vec![slot("slot-guidelines", SlotType::Guidelines)],
                programs: vec![ProgramSpec {
                    code: "STD".into(),
                    slots: vec![slot("slot-matrix", SlotType::Matrix)],
                }],
            }],
        )
        .expect("valid package");

        let chunk = Chunk {
            chunk_id: "chunk-1".into(),
            content: "some content".into(),
            chunk_type: ChunkType::Content,
            navigation_path: vec!["root".into()],
            depth_level: 1,
            position: 0,
            token_count: 2,
            quality_score: 0.8,
        };

        DocumentGraphWrite::flat(
            "doc-1",
            "slot-guidelines",
            package,
            DocumentType::Guidelines,
            vec![chunk],
        )
    }

    #[tokio::test]
    async fn repeated_persistence_does_not_grow_chunk_count() {
        let store = InMemoryGraphStore::new();
        let write = sample_write();
        store.persist_document(&write).await.unwrap();
        store.persist_document(&write).await.unwrap();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.chunk_ids.len(), 1);
        assert_eq!(snapshot.write_count, 2);
    }
}

//! The write payload handed to a [`super::GraphStore`] (§4.8).

use crate::chunk::Chunk;
use crate::decision_tree::DecisionTree;
use crate::entity::{Entity, EntityRelationship};
use crate::navigation::NavigationTree;
use crate::package::{DocumentType, Package};
use crate::relationship::ChunkRelationship;
use serde::{Deserialize, Serialize};

/// Everything one processed document contributes to the graph, bundled so
/// the Graph Store Adapter can persist it under a single transaction
/// (§4.8 "Persist everything under a single logical transaction per
/// document").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentGraphWrite {
    /// The document this write originates from.
    pub document_id: String,
    /// The slot this document is bound to.
    pub slot_id: String,
    /// The owning package, with up-to-date tier structure and slot status
    /// (§4.8 steps 1-2).
    pub package: Package,
    /// The document type actually detected, used to pick the write path
    /// (Guidelines attach at Product level, Matrix at Program level; see
    /// `Package::find_slot`).
    pub document_type: DocumentType,
    /// The navigation tree, present only when routing selected the
    /// hierarchical path (§4.8 step 3).
    pub navigation: Option<NavigationTree>,
    /// Ordered chunks, in reading-order `position` (§4.8 step 4).
    pub chunks: Vec<Chunk>,
    /// Extracted entities (§4.8 step 5).
    pub entities: Vec<Entity>,
    /// Entity-level relationships (§4.5).
    pub entity_relationships: Vec<EntityRelationship>,
    /// Detected chunk relationships (§4.8 step 6).
    pub chunk_relationships: Vec<ChunkRelationship>,
    /// One decision tree per DECISION_FLOW_SECTION (§4.8 step 7).
    pub decision_trees: Vec<DecisionTree>,
}

impl DocumentGraphWrite {
    /// A write with no hierarchical content — the shape produced for a
    /// document that fell back to flat chunking (§4.7 "Fallback"); package
    /// structure and slot status are still carried so step 1-2 of the
    /// write algorithm always runs.
    #[must_use]
    pub fn flat(
        document_id: impl Into<String>,
        slot_id: impl Into<String>,
        package: Package,
        document_type: DocumentType,
        chunks: Vec<Chunk>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            slot_id: slot_id.into(),
            package,
            document_type,
            navigation: None,
            chunks,
            entities: Vec::new(),
            entity_relationships: Vec::new(),
            chunk_relationships: Vec::new(),
            decision_trees: Vec::new(),
        }
    }
}

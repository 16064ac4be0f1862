//! Chunk Relationship Manager (§4.4): typed, evidence-scored relationships
//! between chunks.

mod manager;
mod model;
mod rules;

pub use manager::{detect_cross_document, detect_relationships, RelationshipBatch};
pub use model::{ChunkRelationship, Evidence, RelationshipKind, RelationshipMetrics};

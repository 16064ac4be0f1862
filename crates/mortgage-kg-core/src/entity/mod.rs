//! Entity Extractor (§4.5): mortgage-domain entities with navigation
//! context, extracted from DECISION_FLOW_SECTION nodes and regex
//! vocabularies across the whole tree.

mod extractor;
mod model;

pub use extractor::{extract_entities, extract_entities_for_node};
pub use model::{
    entity_id, Entity, EntityRelationship, EntityType, Inclusivity, NavigationContext,
    NormalizedThreshold,
};

//! Entity data model (§3, §4.5).

use serde::{Deserialize, Serialize};

/// The closed set of 10 mortgage-domain entity kinds (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// A named loan program, e.g. "30-Year Fixed".
    LoanProgram,
    /// A classification of borrower, e.g. "Self-Employed".
    BorrowerType,
    /// A numeric threshold, e.g. "LTV <= 80%".
    NumericThreshold,
    /// A category of qualifying income.
    IncomeType,
    /// A category of qualifying asset.
    AssetType,
    /// A category of financed property.
    PropertyType,
    /// A required documentation category.
    DocumentationType,
    /// An occupancy classification (primary/second home/investment).
    OccupancyType,
    /// A credit event (bankruptcy, foreclosure, short sale, ...).
    CreditEvent,
    /// A reference to a guideline section.
    GuidelineSection,
}

/// Inclusivity of a numeric threshold's boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Inclusivity {
    /// Boundary value itself satisfies the condition (`<=`/`>=`).
    Inclusive,
    /// Boundary value itself does not satisfy the condition (`<`/`>`).
    Exclusive,
}

/// A normalized numeric threshold, present only on `NumericThreshold`
/// entities (§4.5: "normalized (range boundaries, inclusivity)").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedThreshold {
    /// Lower bound, if any.
    pub min: Option<f64>,
    /// Upper bound, if any.
    pub max: Option<f64>,
    /// Whether `min`/`max` themselves satisfy the condition.
    pub inclusivity: Inclusivity,
}

/// Where an entity's mention was found (§4.5 "navigation_context").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationContext {
    /// The navigation node the mention was extracted from.
    pub node_id: String,
    /// The chunk the mention was extracted from, if extraction ran at
    /// chunk granularity rather than node granularity.
    pub chunk_id: Option<String>,
}

/// A mortgage-domain entity (§3, §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable id, derived from `(entity_type, primary_mention)` so repeated
    /// extraction is idempotent.
    pub entity_id: String,
    /// Entity kind.
    pub entity_type: EntityType,
    /// The exact text mention that produced this entity.
    pub primary_mention: String,
    /// Normalized value (only populated for `NumericThreshold`; other
    /// types may carry a normalized canonical string).
    pub normalized_value: Option<String>,
    /// Where this entity was found.
    pub navigation_context: NavigationContext,
    /// Extractor confidence in `[0, 1]`.
    pub confidence: f64,
}

/// A relationship between two entities (§3 "Relationship (entity-level)").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRelationship {
    /// Source entity id.
    pub source_entity_id: String,
    /// Target entity id.
    pub target_entity_id: String,
    /// Relationship label, free-form (e.g. `"requires"`, `"excludes"`).
    pub kind: String,
}

/// Deterministic entity id from type and mention, so merging duplicates
/// within a node (§4.5 "merged by primary_mention + normalized_value") is a
/// pure function of content.
#[must_use]
pub fn entity_id(entity_type: EntityType, primary_mention: &str, normalized_value: Option<&str>) -> String {
    let key = format!("{entity_type:?}|{}|{}", primary_mention.to_ascii_lowercase(), normalized_value.unwrap_or(""));
    let mut hasher = sha2::Sha256::new();
    use sha2::Digest;
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

//! Routing decision (§4.7 "Routing decision"): hierarchical vs. flat.

use crate::config::PipelineConfig;
use crate::navigation::{probe, StructuralProbe};
use std::time::Duration;

/// Why a document was routed to the flat chunker, for the per-document
/// report's `fallback_reason` field (§4.7 "Metrics emitted per document").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision {
    /// All hierarchical preconditions held.
    Hierarchical,
    /// `ENABLE_HIERARCHICAL_CHUNKING` or `ENABLE_RELATIONSHIP_DETECTION` is
    /// false.
    FeatureDisabled,
    /// Document length exceeds the per-type ceiling.
    SizeCeilingExceeded,
    /// The structural probe score is below `structure_score_floor`.
    StructureInsufficient,
    /// The soft deadline has already elapsed for this document.
    SoftDeadlineExhausted,
}

impl RoutingDecision {
    /// Whether this decision selects the hierarchical path.
    #[must_use]
    pub fn is_hierarchical(self) -> bool {
        matches!(self, Self::Hierarchical)
    }
}

/// Decide hierarchical vs. flat for one document (§4.7 "Routing decision":
/// length <= ceiling, structure_score >= floor, soft deadline not
/// exhausted, both feature flags true).
#[must_use]
pub fn route(
    config: &PipelineConfig,
    document_type_hint: Option<&str>,
    text: &str,
    elapsed_since_start: Duration,
) -> (RoutingDecision, StructuralProbe) {
    let probe_result = probe::probe(text);

    if !config.enable_hierarchical_chunking || !config.enable_relationship_detection {
        return (RoutingDecision::FeatureDisabled, probe_result);
    }
    if elapsed_since_start >= config.soft_deadline {
        return (RoutingDecision::SoftDeadlineExhausted, probe_result);
    }
    let ceiling = config.max_doc_chars.for_document_type(document_type_hint);
    if probe_result.length > ceiling {
        return (RoutingDecision::SizeCeilingExceeded, probe_result);
    }
    if probe_result.structure_score < config.structure_score_floor {
        return (RoutingDecision::StructureInsufficient, probe_result);
    }
    (RoutingDecision::Hierarchical, probe_result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structured_text() -> String {
        let mut text = String::new();
        for chapter in 1..=5 {
            text.push_str(&format!("CHAPTER {chapter}\n"));
            for section in 1..=4 {
                text.push_str(&format!("{chapter}.{section} Some Section Title\n"));
                text.push_str("Body text describing the underwriting requirement.\n");
            }
        }
        text
    }

    #[test]
    fn well_structured_short_document_routes_hierarchical() {
        let config = PipelineConfig::default();
        let (decision, _) = route(&config, Some("guidelines"), &structured_text(), Duration::ZERO);
        assert_eq!(decision, RoutingDecision::Hierarchical);
    }

    #[test]
    fn disabled_feature_flag_always_routes_flat() {
        let mut config = PipelineConfig::default();
        config.enable_hierarchical_chunking = false;
        let (decision, _) = route(&config, Some("guidelines"), &structured_text(), Duration::ZERO);
        assert_eq!(decision, RoutingDecision::FeatureDisabled);
    }

    #[test]
    fn document_at_ceiling_routes_hierarchical_one_over_routes_flat() {
        let config = PipelineConfig::default();
        let unit = structured_text();
        let mut padded = unit.chars().cycle().take(config.max_doc_chars.guidelines).collect::<String>();
        assert_eq!(padded.chars().count(), config.max_doc_chars.guidelines);
        let (decision, _) = route(&config, Some("guidelines"), &padded, Duration::ZERO);
        assert_eq!(decision, RoutingDecision::Hierarchical);

        padded.push('.');
        let (decision, _) = route(&config, Some("guidelines"), &padded, Duration::ZERO);
        assert_eq!(decision, RoutingDecision::SizeCeilingExceeded);
    }

    #[test]
    fn unstructured_text_is_structure_insufficient() {
        let config = PipelineConfig::default();
        let text = "Plain prose with no headings at all, just paragraphs of running text \
                     about lending in general terms.";
        let (decision, _) = route(&config, Some("guidelines"), text, Duration::ZERO);
        assert_eq!(decision, RoutingDecision::StructureInsufficient);
    }

    #[test]
    fn exhausted_soft_deadline_routes_flat() {
        let config = PipelineConfig::default();
        let (decision, _) =
            route(&config, Some("guidelines"), &structured_text(), config.soft_deadline);
        assert_eq!(decision, RoutingDecision::SoftDeadlineExhausted);
    }

}

//! Entity Extractor (§4.5): pattern + vocabulary pass per node, augmented by
//! an LLM pass on DECISION_FLOW_SECTION nodes.

use super::model::{entity_id, Entity, EntityType, Inclusivity, NavigationContext, NormalizedThreshold};
use crate::llm::LlmClient;
use crate::navigation::{NavigationTree, NodeType};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::LazyLock;

struct Vocabulary {
    entity_type: EntityType,
    terms: &'static [&'static str],
}

static VOCABULARIES: LazyLock<Vec<Vocabulary>> = LazyLock::new(|| {
    vec![
        Vocabulary {
            entity_type: EntityType::BorrowerType,
            terms: &["self-employed", "first-time homebuyer", "foreign national", "co-borrower"],
        },
        Vocabulary {
            entity_type: EntityType::IncomeType,
            terms: &["w-2 income", "1099 income", "rental income", "bank statement income"],
        },
        Vocabulary {
            entity_type: EntityType::AssetType,
            terms: &["checking account", "savings account", "retirement account", "gift funds"],
        },
        Vocabulary {
            entity_type: EntityType::PropertyType,
            terms: &["single family", "condominium", "multi-family", "manufactured home"],
        },
        Vocabulary {
            entity_type: EntityType::DocumentationType,
            terms: &["full documentation", "bank statement", "asset depletion", "no documentation"],
        },
        Vocabulary {
            entity_type: EntityType::OccupancyType,
            terms: &["primary residence", "second home", "investment property"],
        },
        Vocabulary {
            entity_type: EntityType::CreditEvent,
            terms: &["bankruptcy", "foreclosure", "short sale", "deed in lieu"],
        },
    ]
});

static NUMERIC_THRESHOLD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(LTV|CLTV|DTI|FICO)\b\D{0,10}?(<=|>=|<|>|not to exceed|at least|minimum|maximum)?\D{0,10}?(\d+(\.\d+)?)\s*(%)?").unwrap()
});

static GUIDELINE_SECTION_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:section|chapter)\s+([0-9.]+)").unwrap());

fn parse_inclusivity(op: Option<&str>) -> Inclusivity {
    match op.map(str::to_ascii_lowercase).as_deref() {
        Some("<") | Some(">") => Inclusivity::Exclusive,
        _ => Inclusivity::Inclusive,
    }
}

/// Extract numeric threshold entities from `text` via regex (§4.5
/// "NUMERIC_THRESHOLD entities are normalized").
fn extract_numeric_thresholds(text: &str, context: &NavigationContext) -> Vec<Entity> {
    let mut out = Vec::new();
    for caps in NUMERIC_THRESHOLD.captures_iter(text) {
        let metric = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let operator = caps.get(2).map(|m| m.as_str());
        let value: f64 = match caps.get(3).and_then(|m| m.as_str().parse().ok()) {
            Some(v) => v,
            None => continue,
        };
        let inclusivity = parse_inclusivity(operator);
        let is_upper_bound = !matches!(
            operator.map(str::to_ascii_lowercase).as_deref(),
            Some("at least") | Some("minimum") | Some(">") | Some(">=")
        );
        let threshold = NormalizedThreshold {
            min: if is_upper_bound { None } else { Some(value) },
            max: if is_upper_bound { Some(value) } else { None },
            inclusivity,
        };
        let mention = caps.get(0).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
        let normalized = serde_json::to_string(&threshold).unwrap_or_default();
        out.push(Entity {
            entity_id: entity_id(EntityType::NumericThreshold, &mention, Some(&normalized)),
            entity_type: EntityType::NumericThreshold,
            primary_mention: format!("{metric} {mention}").trim().to_string(),
            normalized_value: Some(normalized),
            navigation_context: context.clone(),
            confidence: 0.8,
        });
    }
    out
}

fn extract_vocabulary_matches(text: &str, context: &NavigationContext) -> Vec<Entity> {
    let lower = text.to_ascii_lowercase();
    let mut out = Vec::new();
    for vocab in VOCABULARIES.iter() {
        for term in vocab.terms {
            if lower.contains(term) {
                out.push(Entity {
                    entity_id: entity_id(vocab.entity_type, term, None),
                    entity_type: vocab.entity_type,
                    primary_mention: (*term).to_string(),
                    normalized_value: None,
                    navigation_context: context.clone(),
                    confidence: 0.75,
                });
            }
        }
    }
    out
}

fn extract_guideline_sections(text: &str, context: &NavigationContext) -> Vec<Entity> {
    GUIDELINE_SECTION_REF
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .map(|numbering| Entity {
            entity_id: entity_id(EntityType::GuidelineSection, &numbering, None),
            entity_type: EntityType::GuidelineSection,
            primary_mention: numbering.clone(),
            normalized_value: Some(numbering),
            navigation_context: context.clone(),
            confidence: 0.7,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct LlmEntity {
    entity_type: String,
    primary_mention: String,
    #[serde(default)]
    normalized_value: Option<String>,
    #[serde(default = "default_llm_confidence")]
    confidence: f64,
}

fn default_llm_confidence() -> f64 {
    0.85
}

fn parse_entity_type(label: &str) -> Option<EntityType> {
    match label.to_ascii_uppercase().as_str() {
        "LOAN_PROGRAM" => Some(EntityType::LoanProgram),
        "BORROWER_TYPE" => Some(EntityType::BorrowerType),
        "NUMERIC_THRESHOLD" => Some(EntityType::NumericThreshold),
        "INCOME_TYPE" => Some(EntityType::IncomeType),
        "ASSET_TYPE" => Some(EntityType::AssetType),
        "PROPERTY_TYPE" => Some(EntityType::PropertyType),
        "DOCUMENTATION_TYPE" => Some(EntityType::DocumentationType),
        "OCCUPANCY_TYPE" => Some(EntityType::OccupancyType),
        "CREDIT_EVENT" => Some(EntityType::CreditEvent),
        "GUIDELINE_SECTION" => Some(EntityType::GuidelineSection),
        _ => None,
    }
}

async fn extract_with_llm(llm: &dyn LlmClient, text: &str, context: &NavigationContext) -> Vec<Entity> {
    let schema = json!({
        "type": "object",
        "properties": {
            "entities": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "entity_type": {"type": "string"},
                        "primary_mention": {"type": "string"},
                        "normalized_value": {"type": ["string", "null"]},
                        "confidence": {"type": "number"}
                    },
                    "required": ["entity_type", "primary_mention"]
                }
            }
        }
    });
    let prompt = format!(
        "extract_decision_entities\nExtract mortgage entities driving this underwriting decision \
         section:\n\n{text}"
    );
    let Ok(response) = llm.complete(&prompt, &schema).await else { return Vec::new() };
    let Some(raw_entities) = response.get("entities") else { return Vec::new() };
    let Ok(parsed) = serde_json::from_value::<Vec<LlmEntity>>(raw_entities.clone()) else {
        return Vec::new();
    };
    parsed
        .into_iter()
        .filter_map(|e| {
            let entity_type = parse_entity_type(&e.entity_type)?;
            Some(Entity {
                entity_id: entity_id(entity_type, &e.primary_mention, e.normalized_value.as_deref()),
                entity_type,
                primary_mention: e.primary_mention,
                normalized_value: e.normalized_value,
                navigation_context: context.clone(),
                confidence: e.confidence,
            })
        })
        .collect()
}

/// Merge duplicate entities within the same node by `(primary_mention,
/// normalized_value)`, keeping the higher-confidence extraction (§4.5).
fn merge_duplicates(entities: Vec<Entity>) -> Vec<Entity> {
    let mut best: HashMap<(String, Option<String>), Entity> = HashMap::new();
    for entity in entities {
        let key = (entity.primary_mention.to_ascii_lowercase(), entity.normalized_value.clone());
        match best.get(&key) {
            Some(existing) if existing.confidence >= entity.confidence => {}
            _ => {
                best.insert(key, entity);
            }
        }
    }
    best.into_values().collect()
}

/// Extract entities from one navigation node's text (§4.5). Runs the
/// pattern/vocabulary pass always, and additionally the LLM pass when
/// `node_type` is `DecisionFlowSection`.
pub async fn extract_entities_for_node(
    llm: &dyn LlmClient,
    node_id: &str,
    node_type: NodeType,
    text: &str,
) -> Vec<Entity> {
    let context = NavigationContext { node_id: node_id.to_string(), chunk_id: None };
    let mut entities = Vec::new();
    entities.extend(extract_numeric_thresholds(text, &context));
    entities.extend(extract_vocabulary_matches(text, &context));
    entities.extend(extract_guideline_sections(text, &context));

    if matches!(node_type, NodeType::DecisionFlowSection) {
        entities.extend(extract_with_llm(llm, text, &context).await);
    }

    merge_duplicates(entities)
}

/// Extract entities across every non-ROOT node in `tree`, slicing each
/// node's text from the document body by its `text_span`. ROOT is skipped:
/// it wraps the entire document, so running the same pass over it would
/// only re-extract everything every other node already covers.
pub async fn extract_entities(llm: &dyn LlmClient, tree: &NavigationTree, text: &str) -> Vec<Entity> {
    let mut all = Vec::new();
    for node in tree.nodes() {
        if node.node_type == NodeType::Root {
            continue;
        }
        let start = node.text_span.start.min(text.len());
        let end = node.text_span.end.min(text.len());
        if start >= end {
            continue;
        }
        let node_text = &text[start..end];
        all.extend(extract_entities_for_node(llm, &node.node_id, node.node_type, node_text).await);
    }
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FakeLlmClient;

    #[tokio::test]
    async fn numeric_threshold_extracted_and_normalized() {
        let fake = FakeLlmClient::new();
        let context = NavigationContext { node_id: "n1".to_string(), chunk_id: None };
        let entities = extract_numeric_thresholds("LTV not to exceed 80%.", &context);
        assert!(!entities.is_empty());
        assert_eq!(entities[0].entity_type, EntityType::NumericThreshold);
        let _ = fake;
    }

    #[tokio::test]
    async fn vocabulary_pass_detects_borrower_type() {
        let context = NavigationContext { node_id: "n1".to_string(), chunk_id: None };
        let entities = extract_vocabulary_matches("Self-employed borrowers require extra docs.", &context);
        assert!(entities.iter().any(|e| e.entity_type == EntityType::BorrowerType));
    }

    #[tokio::test]
    async fn llm_pass_only_runs_on_decision_flow_sections() {
        let response = json!({
            "entities": [{
                "entity_type": "LOAN_PROGRAM",
                "primary_mention": "30-Year Fixed",
                "confidence": 0.9
            }]
        });
        let fake = FakeLlmClient::new().with_default(response);

        let decision_entities =
            extract_entities_for_node(&fake, "n1", NodeType::DecisionFlowSection, "approve if DTI low")
                .await;
        assert!(decision_entities.iter().any(|e| e.entity_type == EntityType::LoanProgram));

        let section_entities =
            extract_entities_for_node(&fake, "n1", NodeType::Section, "approve if DTI low").await;
        assert!(!section_entities.iter().any(|e| e.entity_type == EntityType::LoanProgram));
    }

    #[tokio::test]
    async fn extract_entities_does_not_panic_on_multibyte_root_span() {
        use crate::navigation::{extract_navigation_tree, PromptCategory};

        let text = "CHAPTER 1 Eligibility\u{2014}Overview\n1.1 Income Documentation\nBorrowers with a \
                     self\u{2013}employed history\u{2014}caf\u{e9} owners included\u{2014}require two \
                     years\u{2019} tax returns. LTV not to exceed 80\u{bd}%.";
        let fake = FakeLlmClient::new();
        let tree = extract_navigation_tree(&fake, text, PromptCategory::Universal)
            .await
            .expect("regex fallback never errors");
        // Must not panic slicing any node's span, including ROOT, against
        // multibyte characters (em dash, en dash, curly apostrophe, accented
        // letter, vulgar fraction).
        let entities = extract_entities(&fake, &tree, text).await;
        assert!(entities.iter().all(|e| e.navigation_context.node_id != "root"));
    }

    #[tokio::test]
    async fn duplicate_mentions_in_same_node_are_merged() {
        let context = NavigationContext { node_id: "n1".to_string(), chunk_id: None };
        let a = Entity {
            entity_id: entity_id(EntityType::BorrowerType, "self-employed", None),
            entity_type: EntityType::BorrowerType,
            primary_mention: "self-employed".to_string(),
            normalized_value: None,
            navigation_context: context.clone(),
            confidence: 0.6,
        };
        let mut b = a.clone();
        b.confidence = 0.9;
        let merged = merge_duplicates(vec![a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].confidence, 0.9);
    }
}

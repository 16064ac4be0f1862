//! Navigation extraction (§4.2 steps 3-6): LLM-driven node discovery with a
//! regex-only fallback, then tree assembly with depth-gap correction.

use super::node::{DecisionMetadata, NavigationNode, NodeType, TextSpan};
use super::tree::NavigationTree;
use crate::error::{Error, Result};
use crate::llm::LlmClient;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::LazyLock;

/// A single node as discovered by either extraction path, prior to tree
/// assembly (which fixes up monotonic depth and parent linkage).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeCandidate {
    /// Heading text.
    pub title: String,
    /// Normalized numbering (`"1.2.3"`), if the heading carried one.
    pub numbering: Option<String>,
    /// Tentative nesting depth as reported by the extractor; corrected for
    /// gaps during tree assembly.
    pub depth: u8,
    /// Character span of this node's own content.
    pub text_span: TextSpan,
    /// Whether this section drives an underwriting decision.
    pub has_decision_content: bool,
    /// Cross-references detected in this section's text (e.g. "see Section
    /// 3.2"), carried through for the relationship manager (§4.4
    /// REFERENCES).
    #[serde(default)]
    pub cross_references: Vec<String>,
}

/// Category used to select a category-specific extraction prompt (§4.2
/// step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptCategory {
    /// Non-QM.
    Nqm,
    /// Retail.
    Rtl,
    /// Small Balance Commercial.
    Sbc,
    /// Conventional/conforming.
    Conv,
    /// No category-specific signal available.
    Universal,
}

impl From<Option<crate::package::Category>> for PromptCategory {
    fn from(category: Option<crate::package::Category>) -> Self {
        match category {
            Some(crate::package::Category::Nqm) => Self::Nqm,
            Some(crate::package::Category::Rtl) => Self::Rtl,
            Some(crate::package::Category::Sbc) => Self::Sbc,
            Some(crate::package::Category::Conv) => Self::Conv,
            None => Self::Universal,
        }
    }
}

fn node_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "nodes": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": {"type": "string"},
                        "numbering": {"type": ["string", "null"]},
                        "depth": {"type": "integer"},
                        "text_span": {
                            "type": "object",
                            "properties": {
                                "start": {"type": "integer"},
                                "end": {"type": "integer"}
                            },
                            "required": ["start", "end"]
                        },
                        "has_decision_content": {"type": "boolean"},
                        "cross_references": {"type": "array", "items": {"type": "string"}}
                    },
                    "required": ["title", "depth", "text_span", "has_decision_content"]
                }
            }
        },
        "required": ["nodes"]
    })
}

fn build_prompt(text: &str, category: PromptCategory) -> String {
    let label = match category {
        PromptCategory::Nqm => "NQM",
        PromptCategory::Rtl => "RTL",
        PromptCategory::Sbc => "SBC",
        PromptCategory::Conv => "CONV",
        PromptCategory::Universal => "Universal",
    };
    format!(
        "extract_navigation_nodes\ncategory: {label}\nExtract the heading hierarchy from the \
         following document. For each heading emit title, normalized numbering, tentative \
         depth, character text_span, whether the section drives an underwriting decision, and \
         any cross-references to other sections.\n\n{text}"
    )
}

/// Attempt the LLM extraction path (§4.2 step 3). Returns `Ok(None)` if the
/// response could not be parsed into node candidates — callers fall back to
/// [`extract_with_regex`] in that case (§4.2 step 4, "no error").
pub async fn extract_with_llm(
    llm: &dyn LlmClient,
    text: &str,
    category: PromptCategory,
) -> Option<Vec<NodeCandidate>> {
    let prompt = build_prompt(text, category);
    let response = llm.complete(&prompt, &node_schema()).await.ok()?;
    let nodes = response.get("nodes")?.clone();
    serde_json::from_value::<Vec<NodeCandidate>>(nodes).ok()
}

static HEADING_PATTERNS: LazyLock<Vec<(Regex, u8)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"(?m)^\s*CHAPTER\s+(\d+)[:\.\s]*(.*)$").unwrap(), 1),
        (Regex::new(r"(?m)^\s*(\d+)\.(\d+)\.(\d+)\s+(.+)$").unwrap(), 3),
        (Regex::new(r"(?m)^\s*(\d+)\.(\d+)\s+(.+)$").unwrap(), 2),
        (Regex::new(r"(?m)^\s*(\d+)\.\s+(.+)$").unwrap(), 1),
    ]
});

static DECISION_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(approve|decline|refer to underwriter|ineligible)\b").unwrap()
});

static CROSS_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsee\s+(?:section|matrix)\s+([0-9.]+)").unwrap());

/// A regex-only extractor that always produces a valid (possibly shallow)
/// set of candidates, used as the step-4 fallback and whenever no LLM
/// client is configured.
#[must_use]
pub fn extract_with_regex(text: &str) -> Vec<NodeCandidate> {
    let mut matches: Vec<(usize, usize, u8, String, Option<String>)> = Vec::new();
    for (pattern, depth) in HEADING_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            let caps = pattern.captures(m.as_str()).expect("find_iter match captures");
            let title = caps
                .iter()
                .skip(1)
                .last()
                .flatten()
                .map(|c| c.as_str().trim().to_string())
                .unwrap_or_default();
            let numbering = if *depth > 0 && caps.len() > 2 {
                let nums: Vec<&str> = caps
                    .iter()
                    .skip(1)
                    .take(caps.len() - 2)
                    .filter_map(|c| c.map(|c| c.as_str()))
                    .collect();
                if nums.iter().all(|n| n.chars().all(|c| c.is_ascii_digit())) && !nums.is_empty() {
                    Some(nums.join("."))
                } else {
                    None
                }
            } else {
                None
            };
            matches.push((m.start(), m.end(), *depth, title, numbering));
        }
    }
    matches.sort_by_key(|(start, ..)| *start);
    matches.dedup_by_key(|(start, ..)| *start);

    let mut candidates = Vec::with_capacity(matches.len());
    for (i, (start, end, depth, title, numbering)) in matches.iter().enumerate() {
        let content_end = matches.get(i + 1).map_or(text.len(), |next| next.0);
        let body = &text[*end..content_end.min(text.len())];
        candidates.push(NodeCandidate {
            title: title.clone(),
            numbering: numbering.clone(),
            depth: *depth,
            text_span: TextSpan { start: *start, end: content_end },
            has_decision_content: DECISION_KEYWORDS.is_match(body),
            cross_references: CROSS_REF
                .captures_iter(body)
                .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
                .collect(),
        });
    }
    candidates
}

/// Assemble a [`NavigationTree`] from a flat list of candidates (§4.2 steps
/// 5-6): attach each node to the deepest open ancestor whose depth is less
/// than the candidate's depth, inserting synthetic SECTION placeholders to
/// keep depth increments monotonic.
#[must_use]
pub fn build_tree(candidates: &[NodeCandidate], document_len: usize) -> NavigationTree {
    let mut tree = NavigationTree::with_root(document_len);
    let root = tree.root_index();
    let mut open_path_tail = root;
    let mut counter = 0usize;

    for candidate in candidates {
        let target_depth = candidate.depth.max(1).min(4);
        let mut anchor = tree.deepest_open_ancestor(open_path_tail, target_depth);

        // Insert synthetic SECTION placeholders to close any depth gap
        // (e.g. jumping from depth 1 straight to depth 3).
        let mut next_depth = tree.node(anchor).expect("anchor exists").depth_level + 1;
        while next_depth < target_depth {
            counter += 1;
            let placeholder = NavigationNode {
                node_id: format!("synthetic-{counter}"),
                depth_level: next_depth,
                node_type: NodeType::Section,
                title: String::new(),
                numbering: None,
                text_span: candidate.text_span,
                parent: None,
                children: Vec::new(),
                decision_metadata: None,
            };
            anchor = tree.insert_child(anchor, placeholder);
            next_depth += 1;
        }

        let node_type = if candidate.has_decision_content {
            NodeType::DecisionFlowSection
        } else {
            match target_depth {
                1 => NodeType::Chapter,
                2 => NodeType::Section,
                _ => NodeType::Subsection,
            }
        };
        counter += 1;
        let node = NavigationNode {
            node_id: candidate
                .numbering
                .clone()
                .unwrap_or_else(|| format!("node-{counter}")),
            depth_level: target_depth,
            node_type,
            title: candidate.title.clone(),
            numbering: candidate.numbering.clone(),
            text_span: candidate.text_span,
            parent: None,
            children: Vec::new(),
            decision_metadata: candidate.has_decision_content.then_some(DecisionMetadata {
                has_outcome_keywords: true,
                candidate_criteria_count: candidate.cross_references.len(),
            }),
        };
        open_path_tail = tree.insert_child(anchor, node);
    }

    tree
}

/// Run the full navigation extraction algorithm (§4.2 steps 3-6): try the
/// LLM path, fall back to regex on any parse failure, then build the tree.
pub async fn extract_navigation_tree(
    llm: &dyn LlmClient,
    text: &str,
    category: PromptCategory,
) -> Result<NavigationTree> {
    if text.is_empty() {
        return Err(Error::InvalidPackageDefinition("empty document text".to_string()));
    }
    let candidates = match extract_with_llm(llm, text, category).await {
        Some(candidates) => candidates,
        None => extract_with_regex(text),
    };
    Ok(build_tree(&candidates, text.len()))
}

//! Chunk classification (§4.3): HEADER / CONTENT / DECISION / MATRIX.

use super::model::ChunkType;
use regex::Regex;
use std::sync::LazyLock;

static DECISION_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(approve|decline|refer|ineligible|if\s+.+\s+then)\b").unwrap()
});

static CONDITION_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(if|unless|when|provided that)\b").unwrap());

/// Rows of a Markdown-style table, or ≥3 lines containing multiple
/// whitespace/pipe-delimited columns, count as tabular structure.
fn looks_tabular(text: &str) -> bool {
    let delimited_lines = text
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return false;
            }
            trimmed.matches('|').count() >= 2
                || trimmed.split("  ").filter(|s| !s.trim().is_empty()).count() >= 3
        })
        .count();
    delimited_lines >= 3
}

/// Classify `content`, given whether it is the owning node's title-only text
/// (§4.3: "HEADER (node title only)").
#[must_use]
pub fn classify(content: &str, is_header_only: bool) -> ChunkType {
    if is_header_only {
        return ChunkType::Header;
    }
    if looks_tabular(content) {
        return ChunkType::Matrix;
    }
    let condition_count = CONDITION_MARKERS.find_iter(content).count();
    if DECISION_KEYWORDS.is_match(content) && condition_count >= 2 {
        return ChunkType::Decision;
    }
    ChunkType::Content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_only_flag_wins_regardless_of_content() {
        assert_eq!(classify("Chapter 1: Eligibility", true), ChunkType::Header);
    }

    #[test]
    fn tabular_content_classified_as_matrix() {
        let text = "LTV | FICO | Rate\n80% | 740  | 5.5%\n75% | 700  | 5.75%\n70% | 680  | 6.0%";
        assert_eq!(classify(text, false), ChunkType::Matrix);
    }

    #[test]
    fn decision_keywords_with_multiple_conditions_classified_as_decision() {
        let text = "If DTI exceeds 45%, decline the loan. If FICO is below 620, decline unless \
                     compensating factors are documented and approved by underwriting.";
        assert_eq!(classify(text, false), ChunkType::Decision);
    }

    #[test]
    fn plain_prose_classified_as_content() {
        let text = "This section describes general underwriting philosophy and history.";
        assert_eq!(classify(text, false), ChunkType::Content);
    }

    #[test]
    fn single_condition_without_outcome_is_not_decision() {
        let text = "If the borrower requests it, provide a copy of the appraisal.";
        assert_eq!(classify(text, false), ChunkType::Content);
    }
}

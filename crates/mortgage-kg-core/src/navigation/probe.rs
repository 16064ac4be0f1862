//! Structural probe (§4.2 step 1): a cheap regex-only estimate of how
//! heading-structured a document is, consulted both by the navigation
//! extractor's own routing pre-check and by the orchestrator (§4.7).

use regex::Regex;
use std::sync::LazyLock;

struct Pattern {
    regex: Regex,
    weight: f64,
}

static PATTERNS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    vec![
        // Numbered outline: "1.2.3 Title", "1.2 Title", "1. Title"
        Pattern {
            regex: Regex::new(r"(?m)^\s*\d+(\.\d+){1,3}\s+\S").unwrap(),
            weight: 1.0,
        },
        Pattern {
            regex: Regex::new(r"(?mi)^\s*CHAPTER\s+\d+").unwrap(),
            weight: 1.2,
        },
        Pattern {
            regex: Regex::new(r"(?mi)^\s*SECTION\s+\d+(\.\d+)*").unwrap(),
            weight: 1.0,
        },
        // Legal-style outline: "(a)", "(i)", "(1)"
        Pattern {
            regex: Regex::new(r"(?m)^\s*\([a-z0-9]{1,3}\)\s+\S").unwrap(),
            weight: 0.6,
        },
        // Decision keywords, a weaker signal on their own.
        Pattern {
            regex: Regex::new(r"(?i)\b(approve|decline|refer to underwriter|ineligible)\b")
                .unwrap(),
            weight: 0.4,
        },
    ]
});

/// Result of running the structural probe over one document's text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructuralProbe {
    /// Combined score in `[0, 1]`.
    pub structure_score: f64,
    /// Raw character length of the probed text.
    pub length: usize,
}

/// Compute the structural probe (§4.2 step 1). Weighted match density is
/// squashed into `[0, 1]` so that a handful of matches in a short document
/// doesn't saturate the score the way raw counts would.
#[must_use]
pub fn probe(text: &str) -> StructuralProbe {
    let length = text.chars().count();
    if length == 0 {
        return StructuralProbe { structure_score: 0.0, length: 0 };
    }

    let lines = text.lines().count().max(1) as f64;
    let mut weighted_matches = 0.0;
    for pattern in PATTERNS.iter() {
        let count = pattern.regex.find_iter(text).count() as f64;
        weighted_matches += count * pattern.weight;
    }

    // Matches per 20 lines, saturating smoothly toward 1.0.
    let density = weighted_matches / (lines / 20.0).max(1.0);
    let structure_score = 1.0 - (-density / 4.0).exp();
    StructuralProbe { structure_score: structure_score.clamp(0.0, 1.0), length }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_scores_zero() {
        let result = probe("");
        assert_eq!(result.structure_score, 0.0);
        assert_eq!(result.length, 0);
    }

    #[test]
    fn unstructured_prose_scores_low() {
        let text = "This is a plain paragraph about lending policy with no headings at all. \
                     It just keeps going in prose form without any numbered outline.";
        let result = probe(text);
        assert!(result.structure_score < 0.3, "score was {}", result.structure_score);
    }

    #[test]
    fn heavily_numbered_outline_scores_high() {
        let mut text = String::new();
        for chapter in 1..=5 {
            text.push_str(&format!("CHAPTER {chapter}\n"));
            for section in 1..=4 {
                text.push_str(&format!("{chapter}.{section} Some Section Title\n"));
                text.push_str("Body text describing the underwriting requirement.\n");
            }
        }
        let result = probe(&text);
        assert!(result.structure_score > 0.6, "score was {}", result.structure_score);
    }

    #[test]
    fn length_counts_unicode_scalars_not_bytes() {
        let result = probe("café");
        assert_eq!(result.length, 4);
    }
}

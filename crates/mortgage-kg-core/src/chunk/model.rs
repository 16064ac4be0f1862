//! Chunk data model (§3, §4.3).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The classification a chunk is assigned during semantic chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkType {
    /// The owning node's title only, no body content.
    Header,
    /// Ordinary prose.
    Content,
    /// Contains decision keywords and ≥2 conditions.
    Decision,
    /// Tabular structure detected.
    Matrix,
}

/// A navigation-aware unit of document text (§3, §4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Content-addressed id: SHA-256 of normalized content, hex-encoded.
    pub chunk_id: String,
    /// The chunk's text.
    pub content: String,
    /// Classification.
    pub chunk_type: ChunkType,
    /// Ordered list of node_ids from ROOT to the owning node.
    pub navigation_path: Vec<String>,
    /// Depth of the owning navigation node.
    pub depth_level: u8,
    /// Global reading-order position within the document.
    pub position: usize,
    /// Token count under the configured tokenizer.
    pub token_count: usize,
    /// Composite quality score in `[0, 1]` (§4.3).
    pub quality_score: f64,
}

/// Normalize content for hashing: trim, collapse internal whitespace runs.
/// Two chunks with the same meaningful text but different incidental
/// whitespace must hash identically (§3 "chunk_id is a deterministic
/// function of normalized content").
#[must_use]
pub fn normalize_content(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compute the content-addressed id for `content` (§3, §4.3 determinism).
#[must_use]
pub fn chunk_id(content: &str) -> String {
    let normalized = normalize_content(content);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_is_deterministic_across_whitespace_variation() {
        let a = chunk_id("Loan   amount\nmust  not exceed  $500,000.");
        let b = chunk_id("Loan amount must not exceed $500,000.");
        assert_eq!(a, b);
    }

    #[test]
    fn chunk_id_differs_for_different_content() {
        let a = chunk_id("LTV must not exceed 80%.");
        let b = chunk_id("LTV must not exceed 90%.");
        assert_ne!(a, b);
    }

    #[test]
    fn chunk_id_is_hex_sha256_length() {
        let id = chunk_id("anything");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

//! Flat-chunker boundary (§6 "Flat-chunker interface (fallback)"), used
//! only when hierarchical routing is declined.

use crate::chunk::{chunk_id, count_tokens, normalize_content, Chunk, ChunkType};

/// One chunk emitted by the flat-chunking fallback path.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatChunk {
    /// The chunk's text.
    pub content: String,
    /// Reading-order position.
    pub position: usize,
}

/// `chunk(text, target_tokens, overlap) -> [flat_chunk]` (§6). A concrete
/// implementation may call out to the same splitter the semantic chunker
/// uses, or a simpler fixed-size splitter; the contract only constrains
/// shape and ordering.
pub trait FlatChunker: Send + Sync {
    /// Split `text` into flat chunks targeting `target_tokens` tokens each,
    /// with `overlap` tokens of overlap between adjacent chunks.
    fn chunk(&self, text: &str, target_tokens: usize, overlap: usize) -> Vec<FlatChunk>;
}

/// A token-counting, paragraph-respecting [`FlatChunker`] built on the same
/// recursive splitter the semantic chunker uses for oversized leaves, with
/// no navigation awareness at all (§4.7 "Fallback").
#[derive(Debug, Default)]
pub struct RecursiveFlatChunker;

impl FlatChunker for RecursiveFlatChunker {
    fn chunk(&self, text: &str, target_tokens: usize, overlap: usize) -> Vec<FlatChunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let splitter = mortgage_kg_text::RecursiveCharacterTextSplitter::new()
            .with_chunk_size(target_tokens)
            .with_chunk_overlap(overlap)
            .with_length_function(count_tokens);
        splitter
            .split_text(text)
            .into_iter()
            .enumerate()
            .map(|(position, content)| FlatChunk { content, position })
            .collect()
    }
}

/// Turn flat chunks into full [`Chunk`] records with content-addressed ids,
/// an empty navigation path, and depth 0 (there is no navigation tree on
/// the flat path).
#[must_use]
pub fn into_chunks(flat: Vec<FlatChunk>) -> Vec<Chunk> {
    flat.into_iter()
        .map(|f| Chunk {
            chunk_id: chunk_id(&f.content),
            content: normalize_content(&f.content),
            chunk_type: ChunkType::Content,
            navigation_path: Vec::new(),
            depth_level: 0,
            position: f.position,
            token_count: count_tokens(&f.content),
            quality_score: 0.5,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = RecursiveFlatChunker;
        assert!(chunker.chunk("", 100, 10).is_empty());
    }

    #[test]
    fn positions_are_sequential() {
        let chunker = RecursiveFlatChunker;
        let text = "Paragraph one has some words in it.\n\nParagraph two has more words in it too.\n\nParagraph three rounds it out with even more words.";
        let chunks = chunker.chunk(text, 10, 2);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.position, i);
        }
    }

    #[test]
    fn into_chunks_assigns_content_addressed_ids() {
        let flat = vec![FlatChunk { content: "same text".to_string(), position: 0 }];
        let chunks = into_chunks(flat.clone());
        let chunks_again = into_chunks(flat);
        assert_eq!(chunks[0].chunk_id, chunks_again[0].chunk_id);
    }
}

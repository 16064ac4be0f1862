//! In-process test doubles for the pipeline's trait boundaries (§4.7, §9:
//! "tests run against `FakeLlmClient` + `InMemoryGraphStore`, never a real
//! LLM or database").

pub use crate::graph::InMemoryGraphStore;
pub use crate::llm::FakeLlmClient;
pub use crate::raw_document::InMemoryDocumentProvider;

use crate::orchestrator::{FlatChunk, FlatChunker};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A [`FlatChunker`] that returns one chunk per call, the whole input text
/// unmodified, so orchestrator tests can assert on fallback-path behavior
/// without depending on the real splitter's token-counting output.
#[derive(Debug, Default)]
pub struct WholeTextFlatChunker {
    calls: AtomicUsize,
}

impl WholeTextFlatChunker {
    /// Build a fresh chunker with a zeroed call counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `chunk` has been called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FlatChunker for WholeTextFlatChunker {
    fn chunk(&self, text: &str, _target_tokens: usize, _overlap: usize) -> Vec<FlatChunk> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.trim().is_empty() {
            return Vec::new();
        }
        vec![FlatChunk { content: text.to_string(), position: 0 }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_text_chunker_counts_calls() {
        let chunker = WholeTextFlatChunker::new();
        chunker.chunk("hello", 100, 10);
        chunker.chunk("world", 100, 10);
        assert_eq!(chunker.call_count(), 2);
    }

    #[test]
    fn whole_text_chunker_yields_single_chunk() {
        let chunker = WholeTextFlatChunker::new();
        let chunks = chunker.chunk("some text here", 100, 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "some text here");
    }
}

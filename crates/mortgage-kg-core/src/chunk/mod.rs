//! Semantic Chunker (§4.3): navigation-aware, content-addressed chunking.

mod chunker;
mod classify;
mod model;
mod tokens;

pub use chunker::chunk_document;
pub use classify::classify;
pub use model::{chunk_id, normalize_content, Chunk, ChunkType};
pub use tokens::count_tokens;

//! Low-level text splitting primitives used by the semantic chunker.
//!
//! This crate provides the character/regex splitting machinery that the
//! navigation-aware chunker falls back on when a node's content must be
//! broken at a paragraph, sentence, or hard token boundary while preserving
//! overlap on both sides.
//!
//! # Available Splitters
//!
//! - [`CharacterTextSplitter`]: Split on a single separator (e.g., "\n\n")
//! - [`RecursiveCharacterTextSplitter`]: Recursively split on multiple separators,
//!   falling back from paragraph to sentence to hard character cuts
//!
//! # Example
//!
//! ```
//! use mortgage_kg_text::{TextSplitter, CharacterTextSplitter};
//!
//! let splitter = CharacterTextSplitter::new()
//!     .with_chunk_size(100)
//!     .with_chunk_overlap(20);
//!
//! let text = "This is a long document that needs to be split into smaller chunks.";
//! let chunks = splitter.split_text(text);
//! ```

mod character;
mod error;
mod split_utils;
mod traits;

pub use character::{CharacterTextSplitter, RecursiveCharacterTextSplitter, TextSplitterConfig};
pub use error::{Error, Result};
pub use traits::{KeepSeparator, TextSplitter};

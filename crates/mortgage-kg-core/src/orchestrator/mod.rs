//! Pipeline Orchestrator (§4.7): routing, the flat fallback path, and the
//! per-document report shape, tied together by [`Pipeline`].

mod flat_chunker;
mod pipeline;
mod report;
mod routing;

pub use flat_chunker::{into_chunks, FlatChunk, FlatChunker, RecursiveFlatChunker};
pub use pipeline::{BindingContext, Pipeline, SubmissionDocument, SubmissionReport};
pub use report::{DocumentReport, StageLatency};
pub use routing::{route, RoutingDecision};

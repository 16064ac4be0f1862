//! Hierarchical document-understanding pipeline for mortgage guideline and
//! matrix documents.
//!
//! `mortgage-kg-core` turns raw guideline/matrix text into a navigable
//! knowledge graph: a [`navigation`] tree of sections, content-addressed
//! [`chunk`]s hung off that tree, [`relationship`]s and [`entity`]s detected
//! within and across documents, and one [`decision_tree`] per decision-flow
//! section. The [`orchestrator`] ties these stages together behind a
//! [`graph::GraphStore`] boundary so a concrete backend (Neo4j, or an
//! in-process fake from [`testing`]) can persist the result.
//!
//! # Modules
//!
//! - [`package`]: Category -> Product -> Program -> expected-document slots
//!   (§4.1), the structure a document is bound into before processing.
//! - [`navigation`]: turns raw text into a rooted tree of navigation nodes
//!   (§4.2).
//! - [`chunk`]: content-addressed chunking over a navigation tree (§4.3).
//! - [`relationship`]: within- and cross-document chunk relationships
//!   (§4.4).
//! - [`entity`]: mortgage-domain entity extraction (§4.5).
//! - [`decision_tree`]: decision-flow-section trees, always complete by
//!   construction (§4.6).
//! - [`orchestrator`]: routing, concurrency, and the per-document report
//!   (§4.7).
//! - [`graph`]: the write payload and the [`graph::GraphStore`] trait a
//!   backend implements (§4.8).
//! - [`config`], [`error`], [`metrics`], [`retry`], [`rate_limit`]: the
//!   ambient stack shared by every stage.
//! - [`testing`]: in-process fakes for the trait boundaries above.

pub mod chunk;
pub mod config;
pub mod decision_tree;
pub mod entity;
pub mod error;
pub mod graph;
pub mod llm;
pub mod metrics;
pub mod navigation;
pub mod orchestrator;
pub mod package;
pub mod rate_limit;
pub mod raw_document;
pub mod relationship;
pub mod retry;
pub mod testing;

pub use config::{ChunkSizing, DocCharCeilings, PipelineConfig};
pub use error::{Error, Result};
pub use graph::{DocumentGraphWrite, GraphStore};
pub use llm::LlmClient;
pub use metrics::{FallbackReason, MetricsSnapshot, PipelineMetrics};
pub use orchestrator::{BindingContext, DocumentReport, Pipeline, SubmissionDocument, SubmissionReport};
pub use package::{Category, DocumentType, Package};
pub use raw_document::{RawDocument, RawDocumentProvider};

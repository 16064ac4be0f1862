//! The raw document provider boundary (§6: "Raw document provider —
//! `read(document_id) -> Result<RawDocument>`... the pipeline never reads
//! from cloud storage directly").

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;

/// A document as handed to the navigation extractor: extracted text plus
/// whatever the upstream ingestion stage already knows about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// Stable identifier assigned by the upstream system.
    pub document_id: String,
    /// Plain-text (already OCR'd/extracted) document content.
    pub text: String,
    /// Best-effort document type hint (`"guidelines"`, `"matrix"`,
    /// `"procedures"`), used for the per-type character ceiling (§4.2).
    pub document_type_hint: Option<String>,
}

/// Supplies raw document content by id. The pipeline depends only on this
/// trait, never on a concrete storage backend (§1 Non-goals: cloud storage
/// adapters are out of scope).
#[async_trait]
pub trait RawDocumentProvider: Send + Sync {
    /// Fetch the raw document for `document_id`.
    async fn read(&self, document_id: &str) -> Result<RawDocument>;
}

/// A fixed in-memory [`RawDocumentProvider`] for tests.
#[derive(Debug, Default)]
pub struct InMemoryDocumentProvider {
    documents: HashMap<String, RawDocument>,
}

impl InMemoryDocumentProvider {
    /// An empty provider; populate with [`Self::with_document`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document for later `read` calls.
    #[must_use]
    pub fn with_document(mut self, doc: RawDocument) -> Self {
        self.documents.insert(doc.document_id.clone(), doc);
        self
    }
}

#[async_trait]
impl RawDocumentProvider for InMemoryDocumentProvider {
    async fn read(&self, document_id: &str) -> Result<RawDocument> {
        self.documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("document {document_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str) -> RawDocument {
        RawDocument {
            document_id: id.to_string(),
            text: "Chapter 1\nSection 1.1\nLTV not to exceed 80%.".to_string(),
            document_type_hint: Some("guidelines".to_string()),
        }
    }

    #[tokio::test]
    async fn reads_registered_document() {
        let provider = InMemoryDocumentProvider::new().with_document(sample("doc-1"));
        let doc = provider.read("doc-1").await.expect("document present");
        assert_eq!(doc.document_id, "doc-1");
        assert_eq!(doc.document_type_hint.as_deref(), Some("guidelines"));
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let provider = InMemoryDocumentProvider::new();
        let err = provider.read("missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}

//! Pipeline Orchestrator (§4.7): routes a document, runs the hierarchical
//! stages or falls back to flat chunking, then persists.

use super::flat_chunker::{self, FlatChunker};
use super::report::{DocumentReport, StageTimer};
use super::routing::{self, RoutingDecision};
use crate::chunk::{self, Chunk};
use crate::config::PipelineConfig;
use crate::decision_tree::{self, DecisionTree};
use crate::entity::{self, Entity};
use crate::graph::{DocumentGraphWrite, GraphStore};
use crate::llm::LlmClient;
use crate::metrics::{FallbackReason, PipelineMetrics};
use crate::navigation::{self, NavigationTree, PromptCategory};
use crate::package::{DocumentType, Package};
use crate::raw_document::RawDocument;
use crate::relationship::ChunkRelationship;
use crate::retry::{self, RetryPolicy};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Where a document is bound: which slot, at which tier, under which
/// package (§4.1/§4.8 step 1-2 context carried alongside the raw text).
pub struct BindingContext<'a> {
    /// The owning package, already updated by `bind_document`.
    pub package: &'a Package,
    /// The slot this document fills.
    pub slot_id: &'a str,
    /// The detected document type (Guidelines/Matrix/RateSheet/KnowledgeBase).
    pub document_type: DocumentType,
}

/// One document belonging to a package submission, as handed to
/// [`Pipeline::process_submission`]: which slot it binds, and its raw text.
pub struct SubmissionDocument {
    /// The slot this document fills.
    pub slot_id: String,
    /// The detected document type.
    pub document_type: DocumentType,
    /// The document content itself.
    pub document: RawDocument,
}

/// The result of processing a whole package submission (§4.7, §5 ordering
/// guarantee, §4.4 INTER_DOCUMENT/MATRIX_GUIDELINE).
pub struct SubmissionReport {
    /// One report per document, in the order processed (Guidelines before
    /// Matrices, per §5).
    pub document_reports: Vec<DocumentReport>,
    /// Cross-document relationships detected and persisted between a
    /// Product's Guidelines document and its Programs' Matrix documents
    /// (§4.4 INTER_DOCUMENT, MATRIX_GUIDELINE).
    pub inter_document_relationship_count: usize,
}

/// What a hierarchically-routed document retains past its own
/// `process_document` call so [`Pipeline::process_submission`] can run the
/// cross-document relationship pass (§4.4) against it afterward.
struct HierarchicalArtifacts {
    tree: NavigationTree,
    chunks: Vec<Chunk>,
}

/// Wires the six processing stages together behind their trait boundaries
/// (§4.7, §9: "the pipeline is generic over `LlmClient`/`GraphStore`").
pub struct Pipeline {
    llm: Arc<dyn LlmClient>,
    graph_store: Arc<dyn GraphStore>,
    flat_chunker: Arc<dyn FlatChunker>,
    metrics: Arc<PipelineMetrics>,
    config: PipelineConfig,
    persistence_retry: RetryPolicy,
}

impl Pipeline {
    /// Build a pipeline over the given collaborators and configuration.
    #[must_use]
    pub fn new(
        llm: Arc<dyn LlmClient>,
        graph_store: Arc<dyn GraphStore>,
        flat_chunker: Arc<dyn FlatChunker>,
        metrics: Arc<PipelineMetrics>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            llm,
            graph_store,
            flat_chunker,
            metrics,
            config,
            persistence_retry: RetryPolicy::exponential(3),
        }
    }

    /// Process one document end to end, always returning a report — stage
    /// exceptions and persistence failures are captured as report fields,
    /// never propagated (§7 "only input errors propagate to the caller").
    #[tracing::instrument(skip(self, document, context), fields(document_id = %document.document_id))]
    pub async fn process_document(
        &self,
        document: &RawDocument,
        context: &BindingContext<'_>,
    ) -> DocumentReport {
        self.process_document_with_artifacts(document, context).await.0
    }

    /// Same as [`Self::process_document`], but on the hierarchical-success
    /// path also returns the navigation tree and chunks so
    /// [`Self::process_submission`] can feed them into the cross-document
    /// relationship pass (§4.4) without re-running navigation extraction.
    async fn process_document_with_artifacts(
        &self,
        document: &RawDocument,
        context: &BindingContext<'_>,
    ) -> (DocumentReport, Option<HierarchicalArtifacts>) {
        let start = Instant::now();
        let mut timer = StageTimer::default();

        let (decision, _probe) = routing::route(
            &self.config,
            document.document_type_hint.as_deref(),
            &document.text,
            start.elapsed(),
        );

        if !decision.is_hierarchical() {
            let report = self
                .run_flat_path(document, context, fallback_reason_for(decision), timer)
                .await;
            return (report, None);
        }

        let category = PromptCategory::from(Some(context.package.category));
        let hard_deadline_remaining = self.config.hard_deadline.saturating_sub(start.elapsed());

        let hierarchical = tokio::time::timeout(
            hard_deadline_remaining,
            self.run_hierarchical_stages(document, category, &mut timer),
        )
        .await;

        let (tree, chunks, entities, chunk_relationships, dropped_low_strength, decision_trees) =
            match hierarchical {
                Ok(Some(result)) => result,
                Ok(None) => {
                    self.metrics.record_fallback(FallbackReason::StageException);
                    let report = self
                        .run_flat_path(document, context, Some(FallbackReason::StageException), timer)
                        .await;
                    return (report, None);
                }
                Err(_) => {
                    self.metrics.record_fallback(FallbackReason::HardDeadline);
                    let report = self
                        .run_flat_path(document, context, Some(FallbackReason::HardDeadline), timer)
                        .await;
                    return (report, None);
                }
            };

        self.metrics.record_routed(true);
        self.metrics.record_chunks(chunks.len() as u64);
        self.metrics
            .record_relationships(chunk_relationships.len() as u64, dropped_low_strength as u64);
        for tree in &decision_trees {
            self.metrics.record_decision_tree(tree.needs_manual_review);
        }

        let artifacts = HierarchicalArtifacts { tree: tree.clone(), chunks: chunks.clone() };

        let write = DocumentGraphWrite {
            document_id: document.document_id.clone(),
            slot_id: context.slot_id.to_string(),
            package: context.package.clone(),
            document_type: context.document_type,
            navigation: Some(tree),
            chunks: chunks.clone(),
            entities: entities.clone(),
            entity_relationships: Vec::new(),
            chunk_relationships: chunk_relationships.clone(),
            decision_trees: decision_trees.clone(),
        };

        timer.start("persistence");
        let persisted = self.persist_with_retry(&write).await;
        timer.stop("persistence");

        let decision_trees_needing_review =
            decision_trees.iter().filter(|t| t.needs_manual_review).count();
        let persistence_error = persisted.err().map(|e| {
            self.metrics.record_persistence_failure();
            e.to_string()
        });

        let report = DocumentReport {
            document_id: document.document_id.clone(),
            routed_hierarchical: true,
            fallback_reason: None,
            stage_latencies: timer.into_latencies(),
            chunk_count: chunks.len(),
            relationship_count: chunk_relationships.len(),
            entity_count: entities.len(),
            decision_tree_count: decision_trees.len(),
            decision_trees_needing_review,
            persistence_error,
        };
        (report, Some(artifacts))
    }

    /// Process every document in a package submission, Guidelines before
    /// Matrices within each Product (§5 ordering guarantee: "required for
    /// INTER_DOCUMENT reference resolution"), then run the cross-document
    /// relationship pass (§4.4) for each Matrix document against its
    /// Product's Guidelines document and persist the resulting edges.
    pub async fn process_submission(
        &self,
        package: &Package,
        documents: Vec<SubmissionDocument>,
    ) -> SubmissionReport {
        let (guidelines_docs, matrix_docs): (Vec<_>, Vec<_>) = documents
            .into_iter()
            .partition(|doc| doc.document_type == DocumentType::Guidelines);

        let mut document_reports = Vec::new();
        let mut guidelines_artifacts: HashMap<String, HierarchicalArtifacts> = HashMap::new();

        for doc in guidelines_docs {
            let context = BindingContext {
                package,
                slot_id: &doc.slot_id,
                document_type: doc.document_type,
            };
            let (report, artifacts) =
                self.process_document_with_artifacts(&doc.document, &context).await;
            if let Some(artifacts) = artifacts {
                if let Some(product_id) = owning_product_id_for_guidelines_slot(package, &doc.slot_id) {
                    guidelines_artifacts.insert(product_id, artifacts);
                }
            }
            document_reports.push(report);
        }

        let mut inter_document_relationship_count = 0;

        for doc in matrix_docs {
            let context = BindingContext {
                package,
                slot_id: &doc.slot_id,
                document_type: doc.document_type,
            };
            let owning_product_id = owning_product_id_for_matrix_slot(package, &doc.slot_id);

            let (report, matrix_artifacts) =
                self.process_document_with_artifacts(&doc.document, &context).await;
            document_reports.push(report);

            let Some(matrix_artifacts) = matrix_artifacts else { continue };
            let Some(product_id) = owning_product_id else { continue };
            let Some(guidelines) = guidelines_artifacts.get(&product_id) else { continue };

            let batch = crate::relationship::detect_cross_document(
                &guidelines.tree,
                &guidelines.chunks,
                &matrix_artifacts.tree,
                &matrix_artifacts.chunks,
                self.config.min_relationship_strength,
            );
            self.metrics.record_relationships(
                batch.relationships.len() as u64,
                batch.dropped_low_strength as u64,
            );
            if batch.relationships.is_empty() {
                continue;
            }
            inter_document_relationship_count += batch.relationships.len();

            let mut write = DocumentGraphWrite::flat(
                doc.document.document_id.clone(),
                doc.slot_id.clone(),
                package.clone(),
                doc.document_type,
                Vec::new(),
            );
            write.chunk_relationships = batch.relationships;
            if self.persist_with_retry(&write).await.is_err() {
                self.metrics.record_persistence_failure();
            }
        }

        SubmissionReport { document_reports, inter_document_relationship_count }
    }

    /// Run NavigationExtractor -> SemanticChunker -> {Relationships,
    /// Entities, DecisionTrees} (concurrently, §5). Returns `None` on any
    /// unrecoverable stage exception (currently: navigation extraction
    /// rejecting empty text).
    async fn run_hierarchical_stages(
        &self,
        document: &RawDocument,
        category: PromptCategory,
        timer: &mut StageTimer,
    ) -> Option<(NavigationTree, Vec<Chunk>, Vec<Entity>, Vec<ChunkRelationship>, usize, Vec<DecisionTree>)>
    {
        timer.start("navigation");
        let tree = navigation::extract_navigation_tree(self.llm.as_ref(), &document.text, category)
            .await
            .ok()?;
        timer.stop("navigation");

        timer.start("chunking");
        let chunks = chunk::chunk_document(&tree, &document.text, &self.config.chunk_sizing);
        timer.stop("chunking");

        timer.start("relationships_entities_decision_trees");
        let (relationship_batch, entities, decision_trees) = tokio::join!(
            async {
                crate::relationship::detect_relationships(
                    &tree,
                    &chunks,
                    self.config.min_relationship_strength,
                )
            },
            entity::extract_entities(self.llm.as_ref(), &tree, &document.text),
            self.extract_decision_trees(&tree, &document.text),
        );
        timer.stop("relationships_entities_decision_trees");

        Some((
            tree,
            chunks,
            entities,
            relationship_batch.relationships,
            relationship_batch.dropped_low_strength,
            decision_trees,
        ))
    }

    /// Run the decision tree extractor/validator over every
    /// DECISION_FLOW_SECTION node concurrently (§5: disjoint read-only
    /// inputs).
    async fn extract_decision_trees(&self, tree: &NavigationTree, text: &str) -> Vec<DecisionTree> {
        let sections: Vec<(String, String)> = tree
            .nodes()
            .iter()
            .filter(|n| n.is_decision_flow_section())
            .map(|n| {
                let start = n.text_span.start.min(text.len());
                let end = n.text_span.end.min(text.len());
                let slice = if start < end { text[start..end].to_string() } else { String::new() };
                (n.node_id.clone(), slice)
            })
            .collect();

        let tasks = sections.into_iter().map(|(node_id, slice)| {
            let llm = Arc::clone(&self.llm);
            async move { decision_tree::extract_and_validate(llm.as_ref(), &node_id, &slice).await }
        });
        futures::future::join_all(tasks).await
    }

    /// The fallback path (§4.7 "Fallback"): flat chunking plus persistence,
    /// with package-structure writes still occurring.
    async fn run_flat_path(
        &self,
        document: &RawDocument,
        context: &BindingContext<'_>,
        fallback_reason: Option<FallbackReason>,
        mut timer: StageTimer,
    ) -> DocumentReport {
        self.metrics.record_routed(false);

        timer.start("flat_chunking");
        let flat_chunks = self.flat_chunker.chunk(
            &document.text,
            self.config.chunk_sizing.target_chunk_tokens,
            self.config.chunk_sizing.chunk_overlap_tokens,
        );
        let chunks = flat_chunker::into_chunks(flat_chunks);
        timer.stop("flat_chunking");
        self.metrics.record_chunks(chunks.len() as u64);

        let write = DocumentGraphWrite::flat(
            document.document_id.clone(),
            context.slot_id,
            context.package.clone(),
            context.document_type,
            chunks.clone(),
        );

        timer.start("persistence");
        let persisted = self.persist_with_retry(&write).await;
        timer.stop("persistence");
        let persistence_error = persisted.err().map(|e| {
            self.metrics.record_persistence_failure();
            e.to_string()
        });

        DocumentReport {
            document_id: document.document_id.clone(),
            routed_hierarchical: false,
            fallback_reason,
            stage_latencies: timer.into_latencies(),
            chunk_count: chunks.len(),
            relationship_count: 0,
            entity_count: 0,
            decision_tree_count: 0,
            decision_trees_needing_review: 0,
            persistence_error,
        }
    }

    /// Persist with exponential backoff retry (§4.8 "Failure semantics":
    /// transient errors get >= 3 attempts).
    async fn persist_with_retry(&self, write: &DocumentGraphWrite) -> crate::error::Result<()> {
        let attempted = std::sync::atomic::AtomicUsize::new(0);
        retry::with_retry(
            &self.persistence_retry,
            |_err: &crate::error::Error| true,
            || {
                let first = attempted.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0;
                if !first {
                    self.metrics.record_persistence_retry();
                }
                self.graph_store.persist_document(write)
            },
        )
        .await
    }
}

/// The Product a Guidelines slot belongs to, found by structural membership
/// in `package.products[..].slots` rather than the slot's own
/// `product_id` field (which `package::create_package` leaves as whatever
/// the caller supplied, not necessarily the owning Product).
fn owning_product_id_for_guidelines_slot(package: &Package, slot_id: &str) -> Option<String> {
    package
        .products
        .iter()
        .find(|product| product.slots.iter().any(|slot| slot.slot_id == slot_id))
        .map(|product| product.product_id.clone())
}

/// The Product a Matrix slot's owning Program belongs to, found the same
/// structural way as [`owning_product_id_for_guidelines_slot`].
fn owning_product_id_for_matrix_slot(package: &Package, slot_id: &str) -> Option<String> {
    package
        .products
        .iter()
        .flat_map(|product| &product.programs)
        .find(|program| program.slots.iter().any(|slot| slot.slot_id == slot_id))
        .map(|program| program.product_id.clone())
}

fn fallback_reason_for(decision: RoutingDecision) -> Option<FallbackReason> {
    match decision {
        RoutingDecision::Hierarchical | RoutingDecision::FeatureDisabled => None,
        RoutingDecision::SizeCeilingExceeded | RoutingDecision::StructureInsufficient => {
            Some(FallbackReason::StructureInsufficient)
        }
        RoutingDecision::SoftDeadlineExhausted => Some(FallbackReason::SoftDeadline),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::InMemoryGraphStore;
    use crate::llm::FakeLlmClient;
    use crate::package::{self, ProductSpec, ProgramSpec};
    use crate::package::model::{ExpectedDocument, UploadStatus};

    fn slot(slot_id: &str, ty: DocumentType) -> ExpectedDocument {
        ExpectedDocument {
            slot_id: slot_id.to_string(),
            product_id: None,
            program_id: None,
            document_type: ty,
            required: true,
            upload_status: UploadStatus::Empty,
            accepted_mime_types: vec!["application/pdf".to_string()],
            max_size_bytes: 50_000_000,
            raw_document_ref: None,
        }
    }

    fn sample_package() -> Package {
        package::create_package(
            "pkg-1",
            "NQM",
            vec![ProductSpec {
                display_name: "Non-QM Standard".into(),
                processing_priority: 0,
                slots: vec![slot("slot-guidelines", DocumentType::Guidelines)],
                programs: vec![ProgramSpec {
                    code: "STD".into(),
                    slots: vec![slot("slot-matrix", DocumentType::Matrix)],
                }],
            }],
        )
        .expect("valid package")
    }

    fn structured_document(id: &str) -> RawDocument {
        let mut text = String::new();
        for chapter in 1..=3 {
            text.push_str(&format!("CHAPTER {chapter} Underwriting\n"));
            for section in 1..=2 {
                text.push_str(&format!("{chapter}.{section} Eligibility Criteria\n"));
                text.push_str(
                    "If DTI exceeds 45%, decline the loan. If FICO is at least 620, approve.\n",
                );
            }
        }
        RawDocument {
            document_id: id.to_string(),
            text,
            document_type_hint: Some("guidelines".to_string()),
        }
    }

    fn pipeline() -> (Pipeline, Arc<InMemoryGraphStore>) {
        let graph_store = Arc::new(InMemoryGraphStore::new());
        let pipeline = Pipeline::new(
            Arc::new(FakeLlmClient::new()),
            Arc::clone(&graph_store) as Arc<dyn GraphStore>,
            Arc::new(flat_chunker::RecursiveFlatChunker),
            Arc::new(PipelineMetrics::new()),
            PipelineConfig::default(),
        );
        (pipeline, graph_store)
    }

    #[tokio::test]
    async fn structured_document_routes_hierarchical_and_persists() {
        let (pipeline, store) = pipeline();
        let package = sample_package();
        let context = BindingContext {
            package: &package,
            slot_id: "slot-guidelines",
            document_type: DocumentType::Guidelines,
        };
        let document = structured_document("doc-1");
        let report = pipeline.process_document(&document, &context).await;

        assert!(report.routed_hierarchical);
        assert!(report.chunk_count > 0);
        assert!(report.decision_tree_count > 0);
        assert!(report.persistence_error.is_none());
        assert!(store.snapshot().chunk_ids.len() > 0);
    }

    #[tokio::test]
    async fn unstructured_document_falls_back_to_flat() {
        let (pipeline, _store) = pipeline();
        let package = sample_package();
        let context = BindingContext {
            package: &package,
            slot_id: "slot-guidelines",
            document_type: DocumentType::Guidelines,
        };
        let document = RawDocument {
            document_id: "doc-2".to_string(),
            text: "Plain prose about lending in general terms with no headings at all here."
                .to_string(),
            document_type_hint: Some("guidelines".to_string()),
        };
        let report = pipeline.process_document(&document, &context).await;
        assert!(!report.routed_hierarchical);
        assert_eq!(report.fallback_reason, Some(FallbackReason::StructureInsufficient));
        assert_eq!(report.decision_tree_count, 0);
    }

    fn matrix_document(id: &str) -> RawDocument {
        let mut text = String::new();
        for chapter in 1..=2 {
            text.push_str(&format!("CHAPTER {chapter} Pricing Matrix\n"));
            text.push_str(&format!("{chapter}.1 LTV Tiers\n"));
            text.push_str("LTV | FICO | Rate\n");
            text.push_str("80% | 620  | 5.5%\n");
            text.push_str("75% | 700  | 5.75%\n");
            text.push_str("70% | 680  | 6.0%\n");
        }
        RawDocument {
            document_id: id.to_string(),
            text,
            document_type_hint: Some("matrix".to_string()),
        }
    }

    #[tokio::test]
    async fn process_submission_detects_and_persists_cross_document_relationships() {
        let (pipeline, store) = pipeline();
        let package = sample_package();
        let guidelines = structured_document("doc-guidelines");
        let matrix = matrix_document("doc-matrix");

        let documents = vec![
            SubmissionDocument {
                slot_id: "slot-guidelines".to_string(),
                document_type: DocumentType::Guidelines,
                document: guidelines,
            },
            SubmissionDocument {
                slot_id: "slot-matrix".to_string(),
                document_type: DocumentType::Matrix,
                document: matrix,
            },
        ];

        let report = pipeline.process_submission(&package, documents).await;

        assert_eq!(report.document_reports.len(), 2);
        assert!(report.document_reports.iter().all(|r| r.routed_hierarchical));
        assert!(report.inter_document_relationship_count > 0);
        assert!(store.snapshot().chunk_ids.len() > 0);
    }

    #[tokio::test]
    async fn repeated_processing_does_not_grow_chunk_count() {
        let (pipeline, store) = pipeline();
        let package = sample_package();
        let context = BindingContext {
            package: &package,
            slot_id: "slot-guidelines",
            document_type: DocumentType::Guidelines,
        };
        let document = structured_document("doc-3");
        pipeline.process_document(&document, &context).await;
        let first_count = store.snapshot().chunk_ids.len();
        pipeline.process_document(&document, &context).await;
        let second_count = store.snapshot().chunk_ids.len();
        assert_eq!(first_count, second_count);
    }
}

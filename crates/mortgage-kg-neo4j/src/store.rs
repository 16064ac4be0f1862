//! Concrete [`mortgage_kg_core::graph::GraphStore`] backed by Neo4j,
//! implementing the §4.8 write algorithm as idempotent MERGE Cypher.

use async_trait::async_trait;
use mortgage_kg_core::chunk::Chunk;
use mortgage_kg_core::decision_tree::{DecisionEdge, DecisionEdgeKind, DecisionTree, NodeRole};
use mortgage_kg_core::entity::Entity;
use mortgage_kg_core::error::{Error, Result};
use mortgage_kg_core::graph::{DocumentGraphWrite, GraphStore};
use mortgage_kg_core::navigation::NavigationTree;
use mortgage_kg_core::package::Package;
use mortgage_kg_core::relationship::{ChunkRelationship, RelationshipKind};
use neo4rs::{Graph, Query, Txn};

/// Adapts a live Neo4j connection to the pipeline's [`GraphStore`] boundary.
pub struct Neo4jGraphStore {
    graph: Graph,
}

impl Neo4jGraphStore {
    /// Connect to Neo4j at `uri` with the given credentials.
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .map_err(|e| Error::Persistence(format!("failed to connect to neo4j: {e}")))?;
        Ok(Self { graph })
    }
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn persist_document(&self, write: &DocumentGraphWrite) -> Result<()> {
        let mut txn = self
            .graph
            .start_txn()
            .await
            .map_err(|e| Error::Persistence(format!("failed to start transaction: {e}")))?;

        if let Err(err) = run_write(&mut txn, write).await {
            let _ = txn.rollback().await;
            return Err(err);
        }

        txn.commit()
            .await
            .map_err(|e| Error::Persistence(format!("failed to commit transaction: {e}")))
    }
}

async fn run_write(txn: &mut Txn, write: &DocumentGraphWrite) -> Result<()> {
    merge_package_structure(txn, &write.package).await?;
    merge_slot(txn, write).await?;
    merge_document(txn, write).await?;
    if let Some(tree) = &write.navigation {
        merge_navigation(txn, &write.document_id, tree).await?;
    }
    merge_chunks(txn, write).await?;
    merge_entities(txn, &write.document_id, &write.entities).await?;
    create_chunk_relationships(txn, &write.chunk_relationships).await?;
    merge_decision_trees(txn, &write.decision_trees).await?;
    Ok(())
}

async fn run(txn: &mut Txn, query: Query) -> Result<()> {
    txn.run(query)
        .await
        .map_err(|e| Error::Persistence(format!("write failed: {e}")))
}

/// Step 1: MERGE the Category, Product, Program nodes if absent.
async fn merge_package_structure(txn: &mut Txn, package: &Package) -> Result<()> {
    let category = format!("{:?}", package.category).to_ascii_uppercase();
    for product in &package.products {
        run(
            txn,
            Query::new(
                "MERGE (cat:Category {name: $category}) \
                 MERGE (prod:Product {product_id: $product_id}) \
                 SET prod.display_name = $display_name, prod.processing_priority = $processing_priority \
                 MERGE (cat)-[:CONTAINS]->(prod)"
                    .to_string(),
            )
            .param("category", category.clone())
            .param("product_id", product.product_id.clone())
            .param("display_name", product.display_name.clone())
            .param("processing_priority", i64::from(product.processing_priority)),
        )
        .await?;

        for program in &product.programs {
            run(
                txn,
                Query::new(
                    "MATCH (prod:Product {product_id: $product_id}) \
                     MERGE (prog:Program {program_id: $program_id}) \
                     SET prog.code = $code \
                     MERGE (prod)-[:CONTAINS]->(prog)"
                        .to_string(),
                )
                .param("product_id", product.product_id.clone())
                .param("program_id", program.program_id.clone())
                .param("code", program.code.clone()),
            )
            .await?;
        }
    }
    Ok(())
}

/// Step 2: MERGE the ExpectedDocument slot, updating its upload_status, and
/// the Document it now points at.
async fn merge_slot(txn: &mut Txn, write: &DocumentGraphWrite) -> Result<()> {
    let slot = write
        .package
        .find_slot(&write.slot_id)
        .ok_or_else(|| Error::NotFound(format!("slot {}", write.slot_id)))?;
    let document_type = format!("{:?}", slot.document_type);
    let upload_status = format!("{:?}", slot.upload_status);

    if let Some(product_id) = &slot.product_id {
        run(
            txn,
            Query::new(
                "MATCH (prod:Product {product_id: $product_id}) \
                 MERGE (slot:ExpectedDocument {slot_id: $slot_id}) \
                 SET slot.document_type = $document_type, slot.required = $required, \
                     slot.upload_status = $upload_status \
                 MERGE (slot)-[:SLOT_FOR]->(prod) \
                 MERGE (prod)-[:INCLUDES]->(doc:Document {document_id: $document_id})"
                    .to_string(),
            )
            .param("product_id", product_id.clone())
            .param("slot_id", slot.slot_id.clone())
            .param("document_type", document_type)
            .param("required", slot.required)
            .param("upload_status", upload_status)
            .param("document_id", write.document_id.clone()),
        )
        .await?;
    } else if let Some(program_id) = &slot.program_id {
        run(
            txn,
            Query::new(
                "MATCH (prog:Program {program_id: $program_id}) \
                 MERGE (slot:ExpectedDocument {slot_id: $slot_id}) \
                 SET slot.document_type = $document_type, slot.required = $required, \
                     slot.upload_status = $upload_status \
                 MERGE (slot)-[:SLOT_FOR]->(prog) \
                 MERGE (prog)-[:INCLUDES]->(doc:Document {document_id: $document_id})"
                    .to_string(),
            )
            .param("program_id", program_id.clone())
            .param("slot_id", slot.slot_id.clone())
            .param("document_type", document_type)
            .param("required", slot.required)
            .param("upload_status", upload_status)
            .param("document_id", write.document_id.clone()),
        )
        .await?;
    }
    Ok(())
}

async fn merge_document(txn: &mut Txn, write: &DocumentGraphWrite) -> Result<()> {
    run(
        txn,
        Query::new("MERGE (doc:Document {document_id: $document_id}) SET doc.document_type = $document_type".to_string())
            .param("document_id", write.document_id.clone())
            .param("document_type", format!("{:?}", write.document_type)),
    )
    .await
}

/// Step 3: MERGE NavigationNodes by (document_id, node_id); CREATE CONTAINS
/// edges top-down, including from the owning Document into ROOT.
async fn merge_navigation(txn: &mut Txn, document_id: &str, tree: &NavigationTree) -> Result<()> {
    for node in tree.nodes() {
        run(
            txn,
            Query::new(
                "MERGE (n:NavigationNode {document_id: $document_id, node_id: $node_id}) \
                 SET n.depth_level = $depth_level, n.node_type = $node_type, n.title = $title, \
                     n.numbering = $numbering"
                    .to_string(),
            )
            .param("document_id", document_id.to_string())
            .param("node_id", node.node_id.clone())
            .param("depth_level", i64::from(node.depth_level))
            .param("node_type", format!("{:?}", node.node_type))
            .param("title", node.title.clone())
            .param("numbering", node.numbering.clone().unwrap_or_default()),
        )
        .await?;
    }

    let root = &tree.nodes()[tree.root_index()];
    run(
        txn,
        Query::new(
            "MATCH (doc:Document {document_id: $document_id}) \
             MATCH (root:NavigationNode {document_id: $document_id, node_id: $root_id}) \
             MERGE (doc)-[:CONTAINS]->(root)"
                .to_string(),
        )
        .param("document_id", document_id.to_string())
        .param("root_id", root.node_id.clone()),
    )
    .await?;

    for node in tree.nodes() {
        for &child_index in &node.children {
            let child = &tree.nodes()[child_index];
            run(
                txn,
                Query::new(
                    "MATCH (parent:NavigationNode {document_id: $document_id, node_id: $parent_id}) \
                     MATCH (child:NavigationNode {document_id: $document_id, node_id: $child_id}) \
                     MERGE (parent)-[:CONTAINS]->(child)"
                        .to_string(),
                )
                .param("document_id", document_id.to_string())
                .param("parent_id", node.node_id.clone())
                .param("child_id", child.node_id.clone()),
            )
            .await?;
        }
    }
    Ok(())
}

/// Step 4: MERGE Chunks by chunk_id; CREATE PART_OF, BELONGS_TO, and
/// NEXT_CHUNK sequential edges.
async fn merge_chunks(txn: &mut Txn, write: &DocumentGraphWrite) -> Result<()> {
    let mut ordered: Vec<&Chunk> = write.chunks.iter().collect();
    ordered.sort_by_key(|c| c.position);

    for chunk in &ordered {
        run(
            txn,
            Query::new(
                "MERGE (c:Chunk {chunk_id: $chunk_id}) \
                 SET c.content = $content, c.chunk_type = $chunk_type, c.depth_level = $depth_level, \
                     c.position = $position, c.token_count = $token_count, c.quality_score = $quality_score \
                 WITH c \
                 MATCH (doc:Document {document_id: $document_id}) \
                 MERGE (c)-[:PART_OF]->(doc)"
                    .to_string(),
            )
            .param("chunk_id", chunk.chunk_id.clone())
            .param("content", chunk.content.clone())
            .param("chunk_type", format!("{:?}", chunk.chunk_type))
            .param("depth_level", i64::from(chunk.depth_level))
            .param("position", chunk.position as i64)
            .param("token_count", chunk.token_count as i64)
            .param("quality_score", chunk.quality_score)
            .param("document_id", write.document_id.clone()),
        )
        .await?;

        if let Some(node_id) = chunk.navigation_path.last() {
            run(
                txn,
                Query::new(
                    "MATCH (c:Chunk {chunk_id: $chunk_id}) \
                     MATCH (n:NavigationNode {document_id: $document_id, node_id: $node_id}) \
                     MERGE (c)-[:BELONGS_TO]->(n)"
                        .to_string(),
                )
                .param("chunk_id", chunk.chunk_id.clone())
                .param("document_id", write.document_id.clone())
                .param("node_id", node_id.clone()),
            )
            .await?;
        }
    }

    for pair in ordered.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        run(
            txn,
            Query::new(
                "MATCH (a:Chunk {chunk_id: $from}), (b:Chunk {chunk_id: $to}) \
                 MERGE (a)-[:NEXT_CHUNK]->(b)"
                    .to_string(),
            )
            .param("from", from.chunk_id.clone())
            .param("to", to.chunk_id.clone()),
        )
        .await?;
    }
    Ok(())
}

/// Step 5: MERGE entities by (document_id, entity_id); CREATE HAS_ENTITY
/// (Chunk -> Entity) when the entity was extracted at chunk granularity.
async fn merge_entities(txn: &mut Txn, document_id: &str, entities: &[Entity]) -> Result<()> {
    for entity in entities {
        run(
            txn,
            Query::new(
                "MERGE (e:Entity {document_id: $document_id, entity_id: $entity_id}) \
                 SET e.entity_type = $entity_type, e.primary_mention = $primary_mention, \
                     e.normalized_value = $normalized_value, e.confidence = $confidence"
                    .to_string(),
            )
            .param("document_id", document_id.to_string())
            .param("entity_id", entity.entity_id.clone())
            .param("entity_type", format!("{:?}", entity.entity_type))
            .param("primary_mention", entity.primary_mention.clone())
            .param("normalized_value", entity.normalized_value.clone().unwrap_or_default())
            .param("confidence", entity.confidence),
        )
        .await?;

        if let Some(chunk_id) = &entity.navigation_context.chunk_id {
            run(
                txn,
                Query::new(
                    "MATCH (c:Chunk {chunk_id: $chunk_id}) \
                     MATCH (e:Entity {document_id: $document_id, entity_id: $entity_id}) \
                     MERGE (c)-[:HAS_ENTITY]->(e)"
                        .to_string(),
                )
                .param("chunk_id", chunk_id.clone())
                .param("document_id", document_id.to_string())
                .param("entity_id", entity.entity_id.clone()),
            )
            .await?;
        }
    }
    Ok(())
}

/// The Neo4j edge type for each relationship kind (§6 graph schema). Kinds
/// without a dedicated edge type reuse the structural edge they specialize:
/// `ParentChild` -> `CONTAINS`, `Sequential` -> `NEXT_CHUNK`.
fn relationship_edge_type(kind: RelationshipKind) -> &'static str {
    match kind {
        RelationshipKind::ParentChild => "CONTAINS",
        RelationshipKind::Sequential => "NEXT_CHUNK",
        RelationshipKind::References => "REFERENCES",
        RelationshipKind::DecisionBranch => "DECISION_BRANCH",
        RelationshipKind::DecisionOutcome => "DECISION_OUTCOME",
        RelationshipKind::Conditional => "CONDITIONAL",
        RelationshipKind::Elaborates => "ELABORATES",
        RelationshipKind::Summarizes => "SUMMARIZES",
        RelationshipKind::InterDocument => "INTER_DOCUMENT",
        RelationshipKind::MatrixGuideline => "MATRIX_GUIDELINE",
    }
}

/// Step 6: CREATE ChunkRelationships as typed edges, `(from, to, kind)`
/// unique by MERGE.
async fn create_chunk_relationships(txn: &mut Txn, relationships: &[ChunkRelationship]) -> Result<()> {
    for rel in relationships {
        let edge_type = relationship_edge_type(rel.kind);
        let cypher = format!(
            "MATCH (a:Chunk {{chunk_id: $from}}), (b:Chunk {{chunk_id: $to}}) \
             MERGE (a)-[r:{edge_type} {{kind: $kind}}]->(b) \
             SET r.strength = $strength, r.confidence = $confidence, r.rule_id = $rule_id"
        );
        run(
            txn,
            Query::new(cypher)
                .param("from", rel.from_chunk_id.clone())
                .param("to", rel.to_chunk_id.clone())
                .param("kind", format!("{:?}", rel.kind))
                .param("strength", rel.strength)
                .param("confidence", rel.confidence)
                .param("rule_id", rel.evidence.rule_id.clone()),
        )
        .await?;
    }
    Ok(())
}

fn decision_edge_type(kind: DecisionEdgeKind) -> &'static str {
    match kind {
        DecisionEdgeKind::IfTrue => "IF_TRUE",
        DecisionEdgeKind::IfFalse => "IF_FALSE",
        DecisionEdgeKind::DefaultPath => "DEFAULT_PATH",
        DecisionEdgeKind::ResultsIn => "RESULTS_IN",
        DecisionEdgeKind::EscalatesTo => "ESCALATES_TO",
    }
}

/// Step 7: MERGE DecisionTreeNodes and their typed edges.
async fn merge_decision_trees(txn: &mut Txn, trees: &[DecisionTree]) -> Result<()> {
    for tree in trees {
        for node in &tree.nodes {
            let outcome = node.outcome.map(|o| format!("{o:?}"));
            run(
                txn,
                Query::new(
                    "MERGE (n:DecisionTreeNode {node_id: $node_id}) \
                     SET n.role = $role, n.outcome = $outcome, n.evaluation_precedence = $evaluation_precedence, \
                         n.logical_expression = $logical_expression, n.synthesized = $synthesized"
                        .to_string(),
                )
                .param("node_id", node.id.clone())
                .param("role", role_label(node.role))
                .param("outcome", outcome.unwrap_or_default())
                .param("evaluation_precedence", i64::from(node.evaluation_precedence))
                .param("logical_expression", node.logical_expression.clone())
                .param("synthesized", node.synthesized),
            )
            .await?;
        }

        for edge in &tree.edges {
            create_decision_edge(txn, edge).await?;
        }
    }
    Ok(())
}

fn role_label(role: NodeRole) -> &'static str {
    match role {
        NodeRole::Root => "ROOT",
        NodeRole::Branch => "BRANCH",
        NodeRole::Leaf => "LEAF",
        NodeRole::Terminal => "TERMINAL",
        NodeRole::Gateway => "GATEWAY",
    }
}

async fn create_decision_edge(txn: &mut Txn, edge: &DecisionEdge) -> Result<()> {
    let edge_type = decision_edge_type(edge.kind);
    let cypher = format!(
        "MATCH (a:DecisionTreeNode {{node_id: $from}}), (b:DecisionTreeNode {{node_id: $to}}) \
         MERGE (a)-[:{edge_type}]->(b)"
    );
    run(
        txn,
        Query::new(cypher).param("from", edge.from.clone()).param("to", edge.to.clone()),
    )
    .await
}


// Gated on a live Neo4j instance: `NEO4J_TEST_URI=bolt://localhost:7687 cargo test -- --ignored`.
#[cfg(test)]
mod integration {
    use super::*;
    use mortgage_kg_core::chunk::{Chunk, ChunkType};
    use mortgage_kg_core::package::model::{ExpectedDocument, UploadStatus};
    use mortgage_kg_core::package::{self, DocumentType, ProductSpec};

    #[tokio::test]
    #[ignore]
    async fn persists_a_flat_document_idempotently() {
        let uri = std::env::var("NEO4J_TEST_URI").expect("NEO4J_TEST_URI must be set");
        let store = Neo4jGraphStore::connect(&uri, "neo4j", "password").await.expect("connect");

        let slot = ExpectedDocument {
            slot_id: "slot-guidelines".to_string(),
            product_id: None,
            program_id: None,
            document_type: DocumentType::Guidelines,
            required: true,
            upload_status: UploadStatus::Empty,
            accepted_mime_types: vec!["application/pdf".to_string()],
            max_size_bytes: 50_000_000,
            raw_document_ref: None,
        };
        let package = package::create_package(
            "pkg-it-1",
            "NQM",
            vec![ProductSpec {
                display_name: "Integration Test Product".into(),
                processing_priority: 0,
                slots: vec![slot],
                programs: vec![],
            }],
        )
        .expect("valid package");

        let chunk = Chunk {
            chunk_id: "it-chunk-1".to_string(),
            content: "Integration test content.".to_string(),
            chunk_type: ChunkType::Content,
            navigation_path: Vec::new(),
            depth_level: 0,
            position: 0,
            token_count: 4,
            quality_score: 0.5,
        };
        let write = DocumentGraphWrite::flat(
            "it-doc-1",
            "slot-guidelines",
            package,
            DocumentType::Guidelines,
            vec![chunk],
        );

        store.persist_document(&write).await.expect("first persist");
        store.persist_document(&write).await.expect("second persist");
    }
}

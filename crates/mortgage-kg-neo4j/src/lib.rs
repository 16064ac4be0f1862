//! Neo4j Graph Store Adapter (§4.8) for the mortgage knowledge-graph
//! pipeline.
//!
//! Implements [`mortgage_kg_core::graph::GraphStore`] over a real Neo4j
//! instance: each call to [`Neo4jGraphStore::persist_document`] runs the
//! seven-step write algorithm (Category/Product/Program, the bound slot,
//! navigation, chunks, entities, chunk relationships, decision trees) inside
//! one transaction, with every write MERGE-keyed on a stable id so
//! re-running for an unchanged document is a no-op beyond timestamps.

mod store;

pub use store::Neo4jGraphStore;

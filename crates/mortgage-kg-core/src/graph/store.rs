//! The Graph Store Adapter boundary (§4.8, §6 "Graph schema").

use super::model::DocumentGraphWrite;
use crate::error::Result;
use async_trait::async_trait;

/// A concrete graph backend implements this trait; the pipeline depends
/// only on the trait (§9: "the pipeline is generic over `GraphStore`").
///
/// `persist_document` must be idempotent: re-running it for the same
/// [`DocumentGraphWrite`] leaves the graph equivalent up to timestamps
/// (§4.8 "Idempotence", §8 invariant 4) by MERGE-ing on stable ids and
/// keying relationships on `(from, to, kind)`.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Persist `write` under a single logical transaction, following the
    /// seven-step write algorithm of §4.8. On a validation error (e.g. a
    /// dangling edge) the implementation must abort and leave no partial
    /// data.
    async fn persist_document(&self, write: &DocumentGraphWrite) -> Result<()>;
}

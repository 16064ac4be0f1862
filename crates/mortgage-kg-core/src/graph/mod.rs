//! Graph Store Adapter boundary (§4.8): the write payload, the trait a
//! concrete backend implements, and an in-process fake for tests.

mod in_memory;
mod model;
mod store;

pub use in_memory::{GraphSnapshot, InMemoryGraphStore};
pub use model::DocumentGraphWrite;
pub use store::GraphStore;

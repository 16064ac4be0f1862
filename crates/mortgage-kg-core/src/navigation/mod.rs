//! Navigation Extractor (§4.2): turns raw document text into a rooted tree
//! of navigation nodes.

mod extractor;
mod node;
mod probe;
mod tree;

pub use extractor::{
    build_tree, extract_navigation_tree, extract_with_llm, extract_with_regex, NodeCandidate,
    PromptCategory,
};
pub use node::{DecisionMetadata, NavigationNode, NodeIndex, NodeType, TextSpan};
pub use probe::{probe, StructuralProbe};
pub use tree::NavigationTree;

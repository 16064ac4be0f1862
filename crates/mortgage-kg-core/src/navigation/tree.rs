//! Arena-allocated navigation tree (§9).

use super::node::{NavigationNode, NodeIndex, NodeType, TextSpan};

/// A rooted tree of [`NavigationNode`]s for one document, stored as a flat
/// arena indexed by [`NodeIndex`]. Parent/child links are indices, not
/// owning pointers, so the structure is trivially `Clone` and cannot form a
/// reference cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTree {
    nodes: Vec<NavigationNode>,
}

impl NavigationTree {
    /// A tree containing only the synthetic ROOT node wrapping
    /// `document_len` bytes (§4.2 step 6). Callers must pass a byte length
    /// (`text.len()`, not `text.chars().count()`) so ROOT's `text_span`
    /// stays consistent with the byte offsets every other node's span uses.
    #[must_use]
    pub fn with_root(document_len: usize) -> Self {
        let root = NavigationNode {
            node_id: "root".to_string(),
            depth_level: 0,
            node_type: NodeType::Root,
            title: String::new(),
            numbering: None,
            text_span: TextSpan { start: 0, end: document_len },
            parent: None,
            children: Vec::new(),
            decision_metadata: None,
        };
        Self { nodes: vec![root] }
    }

    /// Index of the ROOT node; always `0`.
    #[must_use]
    pub fn root_index(&self) -> NodeIndex {
        0
    }

    /// Borrow a node by index.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> Option<&NavigationNode> {
        self.nodes.get(index)
    }

    /// All nodes, in arena order (ROOT first, then insertion order).
    #[must_use]
    pub fn nodes(&self) -> &[NavigationNode] {
        &self.nodes
    }

    /// Number of nodes, including ROOT.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds only the ROOT node (no headings detected).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Append a new node as a child of `parent`, returning its index.
    pub fn insert_child(&mut self, parent: NodeIndex, mut node: NavigationNode) -> NodeIndex {
        node.parent = Some(parent);
        let index = self.nodes.len();
        self.nodes.push(node);
        self.nodes[parent].children.push(index);
        index
    }

    /// The path of node indices from ROOT to `index`, inclusive of both
    /// ends. Returns an empty vec if `index` is out of range.
    #[must_use]
    pub fn path_to_root(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut path = Vec::new();
        let mut current = Some(index);
        while let Some(i) = current {
            if self.nodes.get(i).is_none() {
                return Vec::new();
            }
            path.push(i);
            current = self.nodes[i].parent;
        }
        path.reverse();
        path
    }

    /// The deepest node on the currently open path (tracked by the builder
    /// during extraction) whose `depth_level` is strictly less than
    /// `target_depth`. Walks up from `from` until it finds one, or returns
    /// ROOT.
    #[must_use]
    pub fn deepest_open_ancestor(&self, from: NodeIndex, target_depth: u8) -> NodeIndex {
        let mut current = from;
        loop {
            if self.nodes[current].depth_level < target_depth {
                return current;
            }
            match self.nodes[current].parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// All leaf nodes (no children) reachable under `root`, in document
    /// order. Used by the chunker to find the owning node for free text.
    #[must_use]
    pub fn leaves(&self) -> Vec<NodeIndex> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.children.is_empty())
            .map(|(i, _)| i)
            .collect()
    }

    /// Whether `ancestor` appears on `descendant`'s path to root.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeIndex, descendant: NodeIndex) -> bool {
        self.path_to_root(descendant).contains(&ancestor)
    }
}

use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::nodes::{Decoration, Node, NodeId, NodeKind};

/// Flat node storage addressed by [`NodeId`].
///
/// Trees are encoded first-child/next-sibling. Nodes never point at their
/// parent, and every traversal here walks an explicit stack so deep dumps
/// cannot exhaust the call stack.
#[derive(Default, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Arena {
    pub(crate) nodes: Vec<Node>,
}

impl Arena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds an unlinked node and returns its id.
    ///
    /// # Panics
    ///
    /// Panics if the arena already holds `u32::MAX` nodes.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).expect("arena exceeds u32 node ids"));
        self.nodes.push(Node {
            first_child: None,
            next_sibling: None,
            ..node
        });
        id
    }

    /// Shorthand for adding a node without decoration.
    pub fn add(&mut self, label: impl Into<String>, kind: NodeKind) -> NodeId {
        self.add_node(Node::new(label, kind))
    }

    #[must_use]
    pub fn find_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn set_first_child(&mut self, parent: NodeId, child: Option<NodeId>) {
        self.nodes[parent.index()].first_child = child;
    }

    pub fn set_next_sibling(&mut self, node: NodeId, sibling: Option<NodeId>) {
        self.nodes[node.index()].next_sibling = sibling;
    }

    pub fn set_decoration(&mut self, node: NodeId, decoration: Option<Decoration>) {
        self.nodes[node.index()].decoration = decoration;
    }

    /// Appends `child` after the last existing child of `parent`.
    ///
    /// Walks the sibling chain; builders that append many children keep
    /// their own tail pointer and link with [`Arena::link_after`] instead.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        match self.last_child(parent) {
            Some(last) => self.link_after(last, child),
            None => self.set_first_child(parent, Some(child)),
        }
    }

    pub fn link_after(&mut self, node: NodeId, sibling: NodeId) {
        self.set_next_sibling(node, Some(sibling));
    }

    #[must_use]
    pub fn last_child(&self, parent: NodeId) -> Option<NodeId> {
        self.children(parent).last()
    }

    /// Direct children of `parent`, in order.
    #[must_use]
    pub fn children(&self, parent: NodeId) -> Children<'_> {
        Children {
            arena: self,
            next: self[parent].first_child,
        }
    }

    /// Preorder walk of the subtree rooted at `root`, yielding each node with
    /// its depth relative to `root`. Siblings of `root` are not visited.
    #[must_use]
    pub fn preorder(&self, root: NodeId) -> Preorder<'_> {
        Preorder {
            arena: self,
            root,
            stack: vec![(root, 0)],
        }
    }

    /// Number of nodes in the subtree rooted at `root`.
    #[must_use]
    pub fn subtree_size(&self, root: NodeId) -> usize {
        self.preorder(root).count()
    }

    /// Number of levels in the subtree rooted at `root`; a single node has height 1.
    #[must_use]
    pub fn height(&self, root: NodeId) -> usize {
        self.preorder(root)
            .map(|(_, depth)| depth + 1)
            .max()
            .unwrap_or(0)
    }

    /// Copies the subtree rooted at `root` of `source` into this arena and
    /// returns the id of the copy. The copy has no next sibling.
    pub fn import_subtree(&mut self, source: &Arena, root: NodeId) -> NodeId {
        let new_root = self.add_node(source[root].clone());
        // (node to copy, parent copy, previously copied sibling)
        let mut stack: Vec<(NodeId, NodeId, Option<NodeId>)> = Vec::new();
        if let Some(child) = source[root].first_child {
            stack.push((child, new_root, None));
        }
        while let Some((src, parent, previous)) = stack.pop() {
            let copy = self.add_node(source[src].clone());
            match previous {
                Some(previous) => self.link_after(previous, copy),
                None => self.set_first_child(parent, Some(copy)),
            }
            if let Some(sibling) = source[src].next_sibling {
                stack.push((sibling, parent, Some(copy)));
            }
            if let Some(child) = source[src].first_child {
                stack.push((child, copy, None));
            }
        }
        new_root
    }
}

impl Index<NodeId> for Arena {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}

pub struct Children<'a> {
    arena: &'a Arena,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.arena[current].next_sibling;
        Some(current)
    }
}

pub struct Preorder<'a> {
    arena: &'a Arena,
    root: NodeId,
    stack: Vec<(NodeId, usize)>,
}

impl Iterator for Preorder<'_> {
    type Item = (NodeId, usize);

    fn next(&mut self) -> Option<(NodeId, usize)> {
        let (id, depth) = self.stack.pop()?;
        let node = &self.arena[id];
        if id != self.root
            && let Some(sibling) = node.next_sibling
        {
            self.stack.push((sibling, depth));
        }
        if let Some(child) = node.first_child {
            self.stack.push((child, depth + 1));
        }
        Some((id, depth))
    }
}

//! Canonical form shared by hardware and software trees.
//!
//! [`normalize`] rebuilds every declaration so that the two sides only
//! differ in what matters for matching:
//!
//! - decoration (basic-block ids, source locations) is dropped;
//! - punctuation tokens such as `'('` or `';'` are removed;
//! - `BUNDLE_DEF` / `FUNCTION_DEF` roots become one `DECL_DEF` root whose
//!   first child is a `DECL_LABEL` holding only the declaration name;
//! - a tree whose root is a bare label is wrapped into a declaration.
//!
//! The output is laid out in preorder, so normalizing a normalized forest
//! reproduces it exactly.

use mcmap_ast::{
    arena::Arena,
    forest::{Forest, ForestPhase},
    nodes::{Node, NodeId, NodeKind},
};

use crate::errors::{MatchError, expect_phase};

pub const DECLARATION_LABEL: &str = "{";
pub const HEADER_LABEL: &str = "LABEL";

/// Returns the canonical form of `forest`.
///
/// # Errors
///
/// Returns [`MatchError::InvalidState`] for a forest that has already been inlined.
pub fn normalize(forest: &Forest) -> Result<Forest, MatchError> {
    if forest.phase() != ForestPhase::Normalized {
        expect_phase("normalize", ForestPhase::Parsed, forest.phase())?;
    }

    let source = forest.arena();
    let mut out = Forest::with_arena(forest.side(), Arena::with_capacity(source.len()));
    for declaration in forest.declarations() {
        let root = normalize_tree(source, declaration.root, out.arena_mut());
        out.add_declaration(&declaration.name, root);
    }
    out.set_phase(ForestPhase::Normalized);
    tracing::debug!(
        side = %forest.side(),
        declarations = out.len(),
        nodes_before = source.len(),
        nodes_after = out.arena().len(),
        "normalized forest"
    );
    Ok(out)
}

fn normalize_tree(source: &Arena, root: NodeId, out: &mut Arena) -> NodeId {
    let root_node = &source[root];

    let header = if root_node.kind.is_declaration_label() {
        Some(root)
    } else if root_node.kind.is_declaration_root() {
        source
            .children(root)
            .next()
            .filter(|&c| source[c].kind.is_declaration_label())
    } else {
        None
    };

    if !root_node.kind.is_declaration_root() && header.is_none() {
        let new_root = out.add(root_node.label.clone(), root_node.kind.clone());
        copy_chain(source, root_node.first_child, out, new_root, None, None);
        return new_root;
    }

    let new_root = out.add(DECLARATION_LABEL, NodeKind::Declaration);
    let new_header = out.add(HEADER_LABEL, NodeKind::DeclLabel);
    out.set_first_child(new_root, Some(new_header));

    let name = header.and_then(|h| {
        source
            .children(h)
            .find(|&c| source[c].kind == NodeKind::Identifier)
    });
    if let Some(name) = name {
        let copy = out.add(source[name].label.clone(), NodeKind::Identifier);
        out.set_first_child(new_header, Some(copy));
    }

    if header == Some(root) {
        // Bare label root: everything under the label except its name is body.
        copy_chain(source, root_node.first_child, out, new_root, Some(new_header), name);
    } else {
        let body = match header {
            Some(h) => source[h].next_sibling,
            None => root_node.first_child,
        };
        copy_chain(source, body, out, new_root, Some(new_header), None);
    }
    new_root
}

/// Copies the sibling chain starting at `start`, with all descendants, as
/// children of `parent` placed after `previous`. Punctuation and `skip` are
/// left out.
fn copy_chain(
    source: &Arena,
    start: Option<NodeId>,
    out: &mut Arena,
    parent: NodeId,
    previous: Option<NodeId>,
    skip: Option<NodeId>,
) {
    let mut stack: Vec<(NodeId, NodeId, Option<NodeId>)> = Vec::new();
    if let Some(start) = start {
        stack.push((start, parent, previous));
    }
    while let Some((src, parent, previous)) = stack.pop() {
        let node = &source[src];
        if matches!(node.kind, NodeKind::Punctuation(_)) || Some(src) == skip {
            if let Some(sibling) = node.next_sibling {
                stack.push((sibling, parent, previous));
            }
            continue;
        }
        let copy = out.add_node(Node::new(node.label.clone(), node.kind.clone()));
        match previous {
            Some(previous) => out.link_after(previous, copy),
            None => out.set_first_child(parent, Some(copy)),
        }
        if let Some(sibling) = node.next_sibling {
            stack.push((sibling, parent, Some(copy)));
        }
        if let Some(child) = node.first_child {
            stack.push((child, copy, None));
        }
    }
}

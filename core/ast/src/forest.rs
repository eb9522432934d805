//! Named collections of declaration trees.

use std::fmt::Write;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::arena::Arena;
use crate::nodes::{NodeId, NodeKind, Side};

/// How far a forest has progressed through the mapping pipeline.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ForestPhase {
    Parsed,
    Normalized,
    Inlined,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub root: NodeId,
}

/// A mapping from declaration name to declaration root, in source order.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Forest {
    side: Side,
    phase: ForestPhase,
    arena: Arena,
    declarations: Vec<Declaration>,
    index: FxHashMap<String, usize>,
}

impl Forest {
    #[must_use]
    pub fn new(side: Side) -> Self {
        Self::with_arena(side, Arena::new())
    }

    #[must_use]
    pub fn with_arena(side: Side, arena: Arena) -> Self {
        Self {
            side,
            phase: ForestPhase::Parsed,
            arena,
            declarations: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    #[must_use]
    pub fn phase(&self) -> ForestPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: ForestPhase) {
        self.phase = phase;
    }

    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    /// Registers `root` under `name` and returns the name actually used.
    ///
    /// A name that is already taken gets the first free `_1`, `_2`, ... suffix.
    pub fn add_declaration(&mut self, name: &str, root: NodeId) -> String {
        let unique = if self.index.contains_key(name) {
            (1..)
                .map(|n| format!("{name}_{n}"))
                .find(|candidate| !self.index.contains_key(candidate))
                .unwrap_or_else(|| name.to_string())
        } else {
            name.to_string()
        };
        self.index.insert(unique.clone(), self.declarations.len());
        self.declarations.push(Declaration {
            name: unique.clone(),
            root,
        });
        unique
    }

    #[must_use]
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).map(|&i| self.declarations[i].root)
    }

    /// Position of `name` in declaration order.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    #[must_use]
    pub fn node_count(&self, name: &str) -> Option<usize> {
        self.get(name).map(|root| self.arena.subtree_size(root))
    }

    /// Nodes reachable from any declaration root.
    #[must_use]
    pub fn total_nodes(&self) -> usize {
        self.declarations
            .iter()
            .map(|d| self.arena.subtree_size(d.root))
            .sum()
    }

    /// Renders the subtree rooted at `root` in dump syntax, indented from column zero.
    #[must_use]
    pub fn render_subtree(&self, root: NodeId) -> String {
        render_subtree(&self.arena, root)
    }

    /// Renders every declaration in order.
    #[must_use]
    pub fn render(&self) -> String {
        self.declarations
            .iter()
            .map(|d| self.render_subtree(d.root))
            .collect()
    }
}

/// Name carried by a declaration tree: the identifier under its label.
///
/// Accepts both a full declaration root and a bare label root.
#[must_use]
pub fn declared_name(arena: &Arena, root: NodeId) -> Option<String> {
    let label = if arena[root].kind.is_declaration_label() {
        root
    } else {
        arena
            .children(root)
            .next()
            .filter(|&c| arena[c].kind.is_declaration_label())?
    };
    arena
        .children(label)
        .find(|&c| arena[c].kind == NodeKind::Identifier)
        .map(|c| arena[c].label.clone())
}

/// See [`Forest::render_subtree`].
#[must_use]
pub fn render_subtree(arena: &Arena, root: NodeId) -> String {
    let mut out = String::new();
    for (id, depth) in arena.preorder(root) {
        let node = &arena[id];
        let _ = write!(
            out,
            "{:indent$}-> {} ({})",
            "",
            node.label,
            node.kind,
            indent = depth * 2
        );
        if let Some(decoration) = &node.decoration {
            let _ = write!(out, "  {decoration}");
        }
        out.push('\n');
    }
    out
}

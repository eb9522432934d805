//! Symbol resolution over a matched software subtree.
//!
//! [`annotate`] is the entry point: it gathers every identifier referenced by
//! the subtree, looks each one up, and returns a self-contained
//! [`Annotation`]. [`collect_references`] and [`resolve`] are the two halves,
//! exposed for callers that only need one of them.

use core::fmt;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use mcmap_ast::{
    arena::Arena,
    forest::Forest,
    nodes::{NodeId, NodeKind},
};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::symbol_table::{SymbolInfo, SymbolTable};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Resolved(SymbolInfo),
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSymbol {
    pub name: String,
    pub resolution: Resolution,
}

impl ResolvedSymbol {
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self.resolution, Resolution::Resolved(_))
    }
}

impl Display for ResolvedSymbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.resolution {
            Resolution::Resolved(info) if info.declaration.is_empty() => {
                write!(f, "// {} {}", info.kind, info.name)
            }
            Resolution::Resolved(info) => write!(f, "{}", info.declaration),
            Resolution::Unresolved => write!(f, "// unresolved: {}", self.name),
        }
    }
}

/// Symbols referenced by one matched subtree, plus the subtree itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub symbols: Vec<ResolvedSymbol>,
    /// The matched subtree in dump syntax.
    pub tree: String,
}

impl Annotation {
    pub fn unresolved(&self) -> impl Iterator<Item = &ResolvedSymbol> {
        self.symbols.iter().filter(|s| !s.is_resolved())
    }
}

/// Every identifier referenced inside the subtree rooted at `root`.
///
/// Identifier nodes and calls whose label is a plain name count as
/// references. The name identifier under the root's own declaration label
/// does not.
#[must_use]
pub fn collect_references(arena: &Arena, root: NodeId) -> BTreeSet<String> {
    let own_name: FxHashSet<NodeId> = arena
        .children(root)
        .next()
        .filter(|&label| arena[label].kind.is_declaration_label())
        .map(|label| {
            arena
                .children(label)
                .filter(|&c| arena[c].kind == NodeKind::Identifier)
                .collect()
        })
        .unwrap_or_default();

    arena
        .preorder(root)
        .filter(|(id, _)| !own_name.contains(id))
        .filter_map(|(id, _)| {
            let node = &arena[id];
            match &node.kind {
                NodeKind::Identifier if !node.label.is_empty() => Some(node.label.clone()),
                NodeKind::Call(_) if is_plain_name(&node.label) => Some(node.label.clone()),
                _ => None,
            }
        })
        .collect()
}

/// Looks up each identifier; unknown names are kept as [`Resolution::Unresolved`].
#[must_use]
pub fn resolve(identifiers: &BTreeSet<String>, table: &SymbolTable) -> Vec<ResolvedSymbol> {
    identifiers
        .iter()
        .map(|name| ResolvedSymbol {
            name: name.clone(),
            resolution: table
                .lookup(name)
                .cloned()
                .map_or(Resolution::Unresolved, Resolution::Resolved),
        })
        .collect()
}

/// Collects and resolves the references of the subtree at `root` in `forest`.
#[must_use]
pub fn annotate(forest: &Forest, root: NodeId, table: &SymbolTable) -> Annotation {
    let references = collect_references(forest.arena(), root);
    let symbols = resolve(&references, table);
    let unresolved = symbols.iter().filter(|s| !s.is_resolved()).count();
    if unresolved > 0 {
        tracing::debug!(
            references = symbols.len(),
            unresolved,
            "unresolved symbols in matched tree"
        );
    }
    Annotation {
        symbols,
        tree: forest.render_subtree(root),
    }
}

fn is_plain_name(label: &str) -> bool {
    let mut chars = label.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

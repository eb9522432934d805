use core::fmt;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Index of a node inside an [`Arena`](crate::arena::Arena).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which side of the mapping a forest was read from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Side {
    Hardware,
    Software,
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Side::Hardware => write!(f, "hardware"),
            Side::Software => write!(f, "software"),
        }
    }
}

/// Classification of a node's raw kind tag.
///
/// Variants that carry a `String` keep the raw tag from the dump so that two
/// statements (or expressions, literals, ...) only compare equal when the
/// dump gave them the same tag.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum NodeKind {
    /// `BUNDLE_DEF`, the root of a hardware bundle.
    BundleRoot,
    /// `FUNCTION_DEF`, the root of a software function.
    FunctionRoot,
    /// Unified declaration root produced by normalization.
    Declaration,
    BundleLabel,
    FunctionLabel,
    /// Unified declaration header produced by normalization.
    DeclLabel,
    Call(String),
    Statement(String),
    Expression(String),
    Identifier,
    Literal(String),
    /// Quoted word token such as `"void"`.
    Keyword(String),
    /// Quoted punctuation token such as `'('`.
    Punctuation(String),
    Other(String),
}

/// Basic-block id and source location attached to a node by the dump.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct Decoration {
    pub block: Option<u64>,
    pub location: Vec<i64>,
    /// Groups that were neither a block id nor a location.
    pub extra: Vec<String>,
}

impl Decoration {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.block.is_none() && self.location.is_empty() && self.extra.is_empty()
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Node {
    pub label: String,
    pub kind: NodeKind,
    pub first_child: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub decoration: Option<Decoration>,
}

impl Node {
    #[must_use]
    pub fn new(label: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            label: label.into(),
            kind,
            first_child: None,
            next_sibling: None,
            decoration: None,
        }
    }

    #[must_use]
    pub fn with_decoration(mut self, decoration: Option<Decoration>) -> Self {
        self.decoration = decoration.filter(|d| !d.is_empty());
        self
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.first_child.is_none()
    }
}

//! Kind classification and textual forms for node types.
//!
//! The dump format tags each node with a raw kind such as `FUNCTION_DEF`,
//! `IDENT`, `'('` or `"void"`. [`NodeKind::classify`] maps those tags onto the
//! small set of categories the matcher reasons about, and [`NodeKind::tag`]
//! gives back the tag used when rendering.

use core::fmt;
use std::borrow::Cow;
use std::fmt::{Display, Formatter};

use crate::nodes::{Decoration, NodeKind};

impl NodeKind {
    /// Classifies a raw kind tag as it appears between parentheses in a dump line.
    #[must_use]
    pub fn classify(raw: &str) -> NodeKind {
        match raw {
            "BUNDLE_DEF" => return NodeKind::BundleRoot,
            "FUNCTION_DEF" => return NodeKind::FunctionRoot,
            "DECL_DEF" => return NodeKind::Declaration,
            "BUNDLE_LABEL" => return NodeKind::BundleLabel,
            "FUNCTION_LABEL" => return NodeKind::FunctionLabel,
            "DECL_LABEL" => return NodeKind::DeclLabel,
            "IDENT" => return NodeKind::Identifier,
            _ => {}
        }

        if let Some(inner) = unquote(raw) {
            return if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_punctuation()) {
                NodeKind::Punctuation(raw.to_string())
            } else {
                NodeKind::Keyword(raw.to_string())
            };
        }

        let upper = raw.to_ascii_uppercase();
        if upper.contains("CALL") {
            NodeKind::Call(raw.to_string())
        } else if upper.contains("LITERAL")
            || matches!(upper.as_str(), "NUMBER" | "INT" | "CONST" | "STRING")
        {
            NodeKind::Literal(raw.to_string())
        } else if upper.ends_with("_STMT") || upper.contains("STATEMENT") {
            NodeKind::Statement(raw.to_string())
        } else if upper.contains("EXPR") {
            NodeKind::Expression(raw.to_string())
        } else {
            NodeKind::Other(raw.to_string())
        }
    }

    /// The raw tag written back when rendering a node.
    #[must_use]
    pub fn tag(&self) -> Cow<'_, str> {
        match self {
            NodeKind::BundleRoot => Cow::Borrowed("BUNDLE_DEF"),
            NodeKind::FunctionRoot => Cow::Borrowed("FUNCTION_DEF"),
            NodeKind::Declaration => Cow::Borrowed("DECL_DEF"),
            NodeKind::BundleLabel => Cow::Borrowed("BUNDLE_LABEL"),
            NodeKind::FunctionLabel => Cow::Borrowed("FUNCTION_LABEL"),
            NodeKind::DeclLabel => Cow::Borrowed("DECL_LABEL"),
            NodeKind::Identifier => Cow::Borrowed("IDENT"),
            NodeKind::Call(raw)
            | NodeKind::Statement(raw)
            | NodeKind::Expression(raw)
            | NodeKind::Literal(raw)
            | NodeKind::Keyword(raw)
            | NodeKind::Punctuation(raw)
            | NodeKind::Other(raw) => Cow::Borrowed(raw.as_str()),
        }
    }

    #[must_use]
    pub fn is_declaration_root(&self) -> bool {
        matches!(
            self,
            NodeKind::BundleRoot | NodeKind::FunctionRoot | NodeKind::Declaration
        )
    }

    #[must_use]
    pub fn is_declaration_label(&self) -> bool {
        matches!(
            self,
            NodeKind::BundleLabel | NodeKind::FunctionLabel | NodeKind::DeclLabel
        )
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

fn unquote(raw: &str) -> Option<&str> {
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'\'' || first == b'"') && first == last {
            return Some(&raw[1..raw.len() - 1]);
        }
    }
    None
}

impl Decoration {
    /// Folds one parenthesized decoration group into this decoration.
    ///
    /// `BB:<n>` sets the block id, a comma separated list of integers sets
    /// the location, anything else is kept verbatim in `extra`.
    pub fn absorb_group(&mut self, group: &str) {
        let group = group.trim();
        if let Some(block) = group.strip_prefix("BB:")
            && let Ok(block) = block.trim().parse::<u64>()
        {
            self.block = Some(block);
            return;
        }
        let location: Result<Vec<i64>, _> =
            group.split(',').map(|n| n.trim().parse::<i64>()).collect();
        match location {
            Ok(location) if !group.is_empty() => self.location = location,
            _ => self.extra.push(group.to_string()),
        }
    }
}

impl Display for Decoration {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let mut groups: Vec<String> = Vec::new();
        if let Some(block) = self.block {
            groups.push(format!("(BB:{block})"));
        }
        if !self.location.is_empty() {
            let location: Vec<String> = self.location.iter().map(ToString::to_string).collect();
            groups.push(format!("({})", location.join(", ")));
        }
        for extra in &self.extra {
            groups.push(format!("({extra})"));
        }
        write!(f, "{}", groups.join(" "))
    }
}

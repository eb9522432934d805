//! Forest builder that converts indented tree dumps into arena-based forests.
//!
//! The dump format writes one node per line:
//!
//! ```text
//! Print Tree:
//! -> { (FUNCTION_DEF)  (BB:182014) (109, 431, 41, 41, 6)
//!   -> FUNCTION_LABEL (FUNCTION_LABEL)  (BB:182014) (109, 431, 41, 41, 6)
//!     -> add (IDENT)  (BB:4294967295) (109, 431, 45, 41, 6)
//! ```
//!
//! The first whitespace separated token after `->` is the label, the first
//! parenthesized group is the kind and every following group is decoration.
//! Nesting is given by indentation: a line is a child of the closest
//! preceding line with a smaller indent. Lines at the outermost level start
//! new declarations.
//!
//! `Print Tree:` headers, `segment N` markers and blank lines are skipped.
//!
//! # Example
//!
//! ```
//! use mcmap_ast::builder::Builder;
//! use mcmap_ast::nodes::Side;
//!
//! let dump = "-> { (BUNDLE_DEF)\n  -> BUNDLE_LABEL (BUNDLE_LABEL)\n    -> b0 (IDENT)\n";
//! let forest = Builder::new(Side::Hardware).build_forest(dump).unwrap();
//! assert_eq!(forest.declarations()[0].name, "b0");
//! ```

use std::path::Path;

use crate::{
    arena::Arena,
    errors::AstError,
    forest::{Forest, declared_name},
    nodes::{Decoration, Node, NodeId, NodeKind, Side},
};

/// A parsed dump line before it is linked into the arena.
#[derive(Debug, PartialEq)]
struct DumpLine {
    indent: usize,
    label: String,
    kind: String,
    decoration: Decoration,
}

struct OpenNode {
    indent: usize,
    id: NodeId,
    last_child: Option<NodeId>,
}

pub struct Builder {
    side: Side,
    origin: String,
    fallback_name: Option<String>,
}

impl Builder {
    #[must_use]
    pub fn new(side: Side) -> Self {
        Self {
            side,
            origin: format!("<{side}>"),
            fallback_name: None,
        }
    }

    /// Name used in error messages.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Declaration name for trees whose label carries no identifier.
    #[must_use]
    pub fn with_fallback_name(mut self, name: impl Into<String>) -> Self {
        self.fallback_name = Some(name.into());
        self
    }

    /// Reads and parses a dump file. The file stem becomes the fallback name.
    ///
    /// # Errors
    ///
    /// Returns [`AstError::FileReadError`] if the file cannot be read, and the
    /// errors of [`Builder::build_forest`] otherwise.
    pub fn build_forest_from_path(mut self, path: &Path) -> Result<Forest, AstError> {
        let source = std::fs::read_to_string(path).map_err(|source| AstError::FileReadError {
            path: path.to_path_buf(),
            source,
        })?;
        self.origin = path.display().to_string();
        if self.fallback_name.is_none() {
            self.fallback_name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned());
        }
        self.build_forest(&source)
    }

    /// Parses a dump held in memory.
    ///
    /// # Errors
    ///
    /// Returns [`AstError::Syntax`] for the first malformed line and
    /// [`AstError::Empty`] if the dump holds no tree.
    pub fn build_forest(&self, source: &str) -> Result<Forest, AstError> {
        let mut arena = Arena::new();
        let mut roots: Vec<NodeId> = Vec::new();
        let mut open: Vec<OpenNode> = Vec::new();

        for (index, raw_line) in source.lines().enumerate() {
            let line_no = index + 1;
            if is_skipped(raw_line) {
                continue;
            }
            let line = parse_line(raw_line).map_err(|reason| AstError::Syntax {
                origin: self.origin.clone(),
                line: line_no,
                reason,
            })?;

            let id = arena.add_node(
                Node::new(line.label, NodeKind::classify(&line.kind))
                    .with_decoration(Some(line.decoration)),
            );

            while open.last().is_some_and(|top| top.indent >= line.indent) {
                open.pop();
            }
            match open.last_mut() {
                Some(parent) => {
                    match parent.last_child {
                        Some(previous) => arena.link_after(previous, id),
                        None => arena.set_first_child(parent.id, Some(id)),
                    }
                    parent.last_child = Some(id);
                }
                None => roots.push(id),
            }
            open.push(OpenNode {
                indent: line.indent,
                id,
                last_child: None,
            });
        }

        if roots.is_empty() {
            return Err(AstError::Empty {
                origin: self.origin.clone(),
            });
        }

        let mut forest = Forest::with_arena(self.side, arena);
        for root in roots {
            let name = declared_name(forest.arena(), root)
                .or_else(|| self.fallback_name.clone())
                .unwrap_or_else(|| format!("{}_decl", self.side));
            forest.add_declaration(&name, root);
        }
        Ok(forest)
    }
}

fn is_skipped(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty()
        || trimmed.starts_with("Print Tree")
        || trimmed
            .strip_prefix("segment")
            .is_some_and(|rest| rest.trim().chars().all(|c| c.is_ascii_digit()))
}

fn parse_line(line: &str) -> Result<DumpLine, String> {
    let indent = line
        .chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 2 } else { 1 })
        .sum();
    let rest = line.trim_start();
    let Some(rest) = rest.strip_prefix("->") else {
        return Err(format!("expected `->` at the start of `{}`", line.trim()));
    };
    let rest = rest.trim();

    // The label is the first token unless the line starts straight with the
    // kind group, which happens for nodes with an empty label.
    let (label, tail) = match rest.find(char::is_whitespace) {
        Some(split) => (&rest[..split], rest[split..].trim_start()),
        None => (rest, ""),
    };
    let (label_parts, groups) = match split_groups(tail) {
        Ok((words, groups)) => {
            let mut parts = vec![label.to_string()];
            parts.extend(words);
            (parts, groups)
        }
        Err(_) if label.starts_with('(') => split_groups(rest)?,
        Err(err) => return Err(err),
    };

    let mut groups = groups.into_iter();
    let Some(kind) = groups.next() else {
        return Err(format!("missing `(KIND)` group in `{}`", line.trim()));
    };
    let mut decoration = Decoration::default();
    for group in groups {
        decoration.absorb_group(&group);
    }
    Ok(DumpLine {
        indent,
        label: label_parts.join(" "),
        kind: kind.trim().to_string(),
        decoration,
    })
}

/// Splits `text` into leading bare words (continuation of the label) and the
/// parenthesized groups that follow them.
fn split_groups(text: &str) -> Result<(Vec<String>, Vec<String>), String> {
    let chars: Vec<char> = text.chars().collect();
    let mut words = Vec::new();
    let mut groups = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }
        if chars[i] == '(' {
            let (content, next) = read_group(&chars, i)?;
            groups.push(content);
            i = next;
        } else {
            if !groups.is_empty() {
                return Err(format!("unexpected text after groups in `{text}`"));
            }
            let start = i;
            while i < chars.len() && !chars[i].is_whitespace() {
                i += 1;
            }
            words.push(chars[start..i].iter().collect());
        }
    }
    if groups.is_empty() {
        return Err(format!("missing `(KIND)` group in `{text}`"));
    }
    Ok((words, groups))
}

/// Reads a group starting at the `(` at `start`. A group whose content opens
/// with a quote is read up to the matching quote, so `('(')` is one group.
fn read_group(chars: &[char], start: usize) -> Result<(String, usize), String> {
    let mut i = start + 1;
    if let Some(&quote) = chars.get(i)
        && (quote == '\'' || quote == '"')
    {
        let close = chars[i + 1..]
            .iter()
            .position(|&c| c == quote)
            .map(|offset| i + 1 + offset)
            .ok_or_else(|| "unterminated quoted kind".to_string())?;
        i = close + 1;
        while i < chars.len() && chars[i] != ')' {
            i += 1;
        }
        if i == chars.len() {
            return Err("unbalanced parentheses".to_string());
        }
        return Ok((chars[start + 1..i].iter().collect(), i + 1));
    }

    let mut depth = 1usize;
    while i < chars.len() {
        match chars[i] {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((chars[start + 1..i].iter().collect(), i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err("unbalanced parentheses".to_string())
}

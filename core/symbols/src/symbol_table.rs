//! Symbol Table
//!
//! Identifier to declaration metadata, loaded once from a plain text source
//! with one entry per line:
//!
//! ```text
//! # identifier  kind      declaration
//! acc_reg       register  uint32_t acc_reg;
//! do_add        function  void do_add(uint32_t a, uint32_t b);
//! ```
//!
//! Blank lines and lines starting with `#` or `//` are ignored. The table is
//! immutable once loaded and is shared read-only between matching workers.

use core::fmt;
use std::fmt::{Display, Formatter};
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::errors::SymbolError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Function,
    Variable,
    Type,
    Constant,
    Register,
    Other(String),
}

impl SymbolKind {
    #[must_use]
    pub fn parse(raw: &str) -> SymbolKind {
        match raw.to_ascii_lowercase().as_str() {
            "function" | "func" | "fn" => SymbolKind::Function,
            "variable" | "var" => SymbolKind::Variable,
            "type" | "typedef" | "struct" => SymbolKind::Type,
            "constant" | "const" => SymbolKind::Constant,
            "register" | "reg" => SymbolKind::Register,
            _ => SymbolKind::Other(raw.to_string()),
        }
    }
}

impl Display for SymbolKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Function => write!(f, "function"),
            SymbolKind::Variable => write!(f, "variable"),
            SymbolKind::Type => write!(f, "type"),
            SymbolKind::Constant => write!(f, "constant"),
            SymbolKind::Register => write!(f, "register"),
            SymbolKind::Other(raw) => write!(f, "{raw}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    pub kind: SymbolKind,
    /// Declaration text emitted ahead of a matched tree.
    pub declaration: String,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: FxHashMap<String, SymbolInfo>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and parses a symbol table file.
    ///
    /// # Errors
    ///
    /// Returns [`SymbolError::FileReadError`] if the file cannot be read and
    /// [`SymbolError::MalformedEntry`] for a line with fewer than two fields.
    pub fn from_path(path: &Path) -> Result<Self, SymbolError> {
        let source = std::fs::read_to_string(path).map_err(|source| SymbolError::FileReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source, &path.display().to_string())
    }

    /// Parses a symbol table held in memory. `origin` names it in errors.
    ///
    /// # Errors
    ///
    /// Returns [`SymbolError::MalformedEntry`] for a line with fewer than two fields.
    pub fn parse(source: &str, origin: &str) -> Result<Self, SymbolError> {
        let mut table = SymbolTable::new();
        for (index, line) in source.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//") {
                continue;
            }
            let (name, rest) = split_field(trimmed);
            let (kind, declaration) = split_field(rest);
            if kind.is_empty() {
                return Err(SymbolError::MalformedEntry {
                    origin: origin.to_string(),
                    line: index + 1,
                    text: trimmed.to_string(),
                });
            }
            let inserted = table.insert(SymbolInfo {
                name: name.to_string(),
                kind: SymbolKind::parse(kind),
                declaration: declaration.trim_end().to_string(),
            });
            if !inserted {
                tracing::debug!(symbol = name, line = index + 1, "duplicate symbol ignored");
            }
        }
        Ok(table)
    }

    /// Inserts `info` unless its name is already defined. The first
    /// definition wins; returns whether the entry was added.
    pub fn insert(&mut self, info: SymbolInfo) -> bool {
        if self.symbols.contains_key(&info.name) {
            return false;
        }
        self.symbols.insert(info.name.clone(), info);
        true
    }

    #[must_use = "this is a pure lookup with no side effects"]
    pub fn lookup(&self, name: &str) -> Option<&SymbolInfo> {
        self.symbols.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

fn split_field(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(split) => (&text[..split], text[split..].trim_start()),
        None => (text, ""),
    }
}

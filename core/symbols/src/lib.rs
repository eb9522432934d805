#![warn(clippy::pedantic)]
//! Symbol table and symbol resolution for matched software trees.
//!
//! The table is loaded once per run ([`symbol_table::SymbolTable`]) and
//! queried for every accepted match through [`resolver::annotate`].

pub mod errors;
pub mod resolver;
pub mod symbol_table;

pub use resolver::{Annotation, Resolution, ResolvedSymbol, annotate};
pub use symbol_table::{SymbolInfo, SymbolKind, SymbolTable};

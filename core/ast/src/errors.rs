//! Error types for the AST crate.
//!
//! This module defines structured errors for reading and parsing tree dumps.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while turning a tree dump into a forest.
#[derive(Debug, Error)]
#[must_use = "errors must not be silently ignored"]
pub enum AstError {
    /// Failed to read a source file.
    #[error("failed to read {}: {source}", path.display())]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A dump line does not follow the `-> label (KIND) (decoration)...` shape.
    #[error("{origin}:{line}: {reason}")]
    Syntax {
        origin: String,
        line: usize,
        reason: String,
    },

    /// The dump contains no tree at all.
    #[error("no declarations found in {origin}")]
    Empty { origin: String },
}

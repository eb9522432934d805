use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a symbol table.
#[derive(Debug, Error)]
#[must_use = "errors must not be silently ignored"]
pub enum SymbolError {
    #[error("failed to read {}: {source}", path.display())]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin}:{line}: expected `<identifier> <kind> [declaration]`, found `{text}`")]
    MalformedEntry {
        origin: String,
        line: usize,
        text: String,
    },
}

use std::path::PathBuf;

use mcmap_ast::{errors::AstError, forest::ForestPhase};
use mcmap_matcher::MatchError;
use mcmap_symbols::errors::SymbolError;
use thiserror::Error;

#[derive(Debug, Error)]
#[must_use = "errors must not be silently ignored"]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] AstError),

    #[error(transparent)]
    Symbols(#[from] SymbolError),

    #[error("{operation} expects a {expected:?} forest, found {found:?}")]
    InvalidState {
        operation: &'static str,
        expected: ForestPhase,
        found: ForestPhase,
    },

    #[error("unknown hardware unit `{0}`")]
    UnknownUnit(String),

    /// A match result that does not point at a declaration of this run.
    #[error("`{0}` is not a declaration root of the inlined software forest")]
    UnknownCandidate(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<MatchError> for EngineError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::InvalidState {
                operation,
                expected,
                found,
            } => EngineError::InvalidState {
                operation,
                expected,
                found,
            },
            MatchError::UnknownUnit(name) => EngineError::UnknownUnit(name),
            MatchError::Config(reason) => EngineError::Config(reason),
        }
    }
}

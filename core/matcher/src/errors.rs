use mcmap_ast::forest::ForestPhase;
use thiserror::Error;

#[derive(Debug, Error)]
#[must_use = "errors must not be silently ignored"]
pub enum MatchError {
    /// A pipeline step was handed a forest in the wrong phase.
    #[error("{operation} expects a {expected:?} forest, found {found:?}")]
    InvalidState {
        operation: &'static str,
        expected: ForestPhase,
        found: ForestPhase,
    },

    #[error("unknown hardware unit `{0}`")]
    UnknownUnit(String),

    #[error("invalid threshold configuration: {0}")]
    Config(String),
}

pub(crate) fn expect_phase(
    operation: &'static str,
    expected: ForestPhase,
    found: ForestPhase,
) -> Result<(), MatchError> {
    if expected == found {
        Ok(())
    } else {
        Err(MatchError::InvalidState {
            operation,
            expected,
            found,
        })
    }
}

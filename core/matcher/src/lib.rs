#![warn(clippy::pedantic)]
//! Matching passes over hardware and software forests.
//!
//! ```text
//! parsed forest → normalize → (software only) inline → match
//! ```
//!
//! - [`preprocess::normalize`] brings both sides to one canonical shape.
//! - [`inline::InlineExpander`] splices callee bodies into their call sites so
//!   a software function is as flat as a hardware bundle.
//! - [`similarity::match_all`] scores every software declaration against one
//!   hardware unit and keeps the ones at or above the threshold.
//!
//! Each pass checks the [`ForestPhase`](mcmap_ast::forest::ForestPhase) of
//! its input and fails with [`MatchError::InvalidState`] when run out of
//! order. All passes return new forests; inputs are never modified.

pub mod config;
pub mod errors;
pub mod inline;
pub mod preprocess;
pub mod similarity;

pub use config::{RatioDirection, Thresholds};
pub use errors::MatchError;
pub use inline::{GROWTH_FACTOR, InlineExpander, InlineStats};
pub use preprocess::normalize;
pub use similarity::{
    HardwareUnit, MatchResult, SimilarityScorer, best_overall, match_all, match_one,
};

//! Threshold configuration shared by the inline expander and the matcher.
//!
//! Thresholds are fixed before any phase runs. They can be built in code
//! with [`Thresholds::new`] or read from TOML, where every key is optional:
//!
//! ```toml
//! inline_depth_diff = 2
//! inline_node_ratio = 2.0
//! matching_threshold = 0.8
//! ratio_direction = "callee_over_caller"
//! max_inline_chain = 4
//! label_edit_bound = 0.3
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::MatchError;

/// Which way the inline node-count ratio is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioDirection {
    /// `nodes(callee body) / nodes(caller)`
    #[default]
    CalleeOverCaller,
    /// `nodes(caller) / nodes(callee body)`
    CallerOverCallee,
}

impl RatioDirection {
    #[must_use]
    pub fn ratio(self, caller_nodes: usize, callee_body_nodes: usize) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let (caller, callee) = (caller_nodes as f64, callee_body_nodes as f64);
        match self {
            RatioDirection::CalleeOverCaller => callee / caller.max(1.0),
            RatioDirection::CallerOverCallee => caller / callee.max(1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    inline_depth_diff: u32,
    inline_node_ratio: f64,
    matching_threshold: f64,
    ratio_direction: RatioDirection,
    max_inline_chain: usize,
    label_edit_bound: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            inline_depth_diff: 2,
            inline_node_ratio: 2.0,
            matching_threshold: 0.8,
            ratio_direction: RatioDirection::default(),
            max_inline_chain: 4,
            label_edit_bound: 0.3,
        }
    }
}

impl Thresholds {
    /// # Errors
    ///
    /// Returns [`MatchError::Config`] if the ratio is not a positive finite
    /// number or the matching threshold lies outside `[0, 1]`.
    pub fn new(
        inline_depth_diff: u32,
        inline_node_ratio: f64,
        matching_threshold: f64,
    ) -> Result<Self, MatchError> {
        let thresholds = Self {
            inline_depth_diff,
            inline_node_ratio,
            matching_threshold,
            ..Self::default()
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Parses thresholds from a TOML document; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Config`] for malformed TOML, unknown keys, or
    /// values rejected by [`Thresholds::validate`].
    pub fn from_toml_str(source: &str) -> Result<Self, MatchError> {
        let thresholds: Thresholds =
            toml::from_str(source).map_err(|e| MatchError::Config(e.to_string()))?;
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// # Errors
    ///
    /// Returns [`MatchError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), MatchError> {
        if !(self.inline_node_ratio.is_finite() && self.inline_node_ratio > 0.0) {
            return Err(MatchError::Config(format!(
                "inline_node_ratio must be a positive number, got {}",
                self.inline_node_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.matching_threshold) {
            return Err(MatchError::Config(format!(
                "matching_threshold must lie in [0, 1], got {}",
                self.matching_threshold
            )));
        }
        if self.max_inline_chain == 0 {
            return Err(MatchError::Config(
                "max_inline_chain must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.label_edit_bound) {
            return Err(MatchError::Config(format!(
                "label_edit_bound must lie in [0, 1], got {}",
                self.label_edit_bound
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_ratio_direction(mut self, direction: RatioDirection) -> Self {
        self.ratio_direction = direction;
        self
    }

    /// # Errors
    ///
    /// Returns [`MatchError::Config`] if `chain` is zero.
    pub fn with_max_inline_chain(mut self, chain: usize) -> Result<Self, MatchError> {
        self.max_inline_chain = chain;
        self.validate()?;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns [`MatchError::Config`] if `bound` lies outside `[0, 1]`.
    pub fn with_label_edit_bound(mut self, bound: f64) -> Result<Self, MatchError> {
        self.label_edit_bound = bound;
        self.validate()?;
        Ok(self)
    }

    #[must_use]
    pub fn inline_depth_diff(&self) -> u32 {
        self.inline_depth_diff
    }

    #[must_use]
    pub fn inline_node_ratio(&self) -> f64 {
        self.inline_node_ratio
    }

    #[must_use]
    pub fn matching_threshold(&self) -> f64 {
        self.matching_threshold
    }

    #[must_use]
    pub fn ratio_direction(&self) -> RatioDirection {
        self.ratio_direction
    }

    #[must_use]
    pub fn max_inline_chain(&self) -> usize {
        self.max_inline_chain
    }

    #[must_use]
    pub fn label_edit_bound(&self) -> f64 {
        self.label_edit_bound
    }
}

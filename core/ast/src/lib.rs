#![warn(clippy::pedantic)]
//! Labeled ordered trees shared by the hardware and software sides.
//!
//! Trees live in an [`arena::Arena`] and are linked first-child/next-sibling.
//! A [`forest::Forest`] names the declaration roots of one dump, and the
//! [`builder::Builder`] reads the indented dump format into a forest.
pub mod arena;
pub mod builder;
pub mod errors;
pub mod forest;
pub mod nodes;
pub(crate) mod nodes_impl;

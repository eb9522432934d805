//! Similarity scoring between a hardware bundle and software candidates.
//!
//! Trees are compared as ordered first-child/next-sibling skeletons. The
//! alignment `A(h, s)` over two sibling lists starting at `h` and `s` is
//!
//! ```text
//! A(h, s) = max( A(h.right, s),
//!                A(h, s.right),
//!                W(h, s) + A(h.right, s.right) )
//! W(h, s) = pair(h, s) + A(h.down, s.down)      if h and s are compatible
//! ```
//!
//! where `pair` is 1 for inner nodes and the label similarity for leaves.
//! The score of two trees is `A(root_h, root_s) / max(|H|, |S|)`, which lies
//! in `[0, 1]` and is 1 exactly when both trees have the same shape, kinds
//! and leaf labels.
//!
//! The recurrence is evaluated over a dense table indexed by preorder
//! position. Every reference from `(i, j)` goes to a later position on at
//! least one side, so filling the table from the back needs no recursion.
//! Time is `O(|H| * |S|)` and so is memory: one `f32` cell per node pair,
//! about 4 MB for two 1000-node trees. [`match_all`] runs its size check
//! before any table is allocated, so candidates that cannot reach the
//! threshold cost nothing.

use std::cmp::Ordering;

use mcmap_ast::{
    arena::Arena,
    forest::{Forest, ForestPhase},
    nodes::{NodeId, NodeKind},
};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    config::Thresholds,
    errors::{MatchError, expect_phase},
};

/// One accepted pairing of a hardware unit with a software declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub hardware_unit: String,
    pub candidate: String,
    /// Position of the candidate in the software forest's declaration order.
    pub candidate_index: usize,
    /// Root of the candidate in the inlined software forest.
    pub node: NodeId,
    pub similarity: f64,
}

/// A hardware declaration that is matched on its own.
#[derive(Debug, Clone, Copy)]
pub struct HardwareUnit<'a> {
    name: &'a str,
    forest: &'a Forest,
    root: NodeId,
}

impl<'a> HardwareUnit<'a> {
    #[must_use]
    pub fn new(name: &'a str, forest: &'a Forest, root: NodeId) -> Self {
        Self { name, forest, root }
    }

    /// Every declaration of `forest` as a unit, in declaration order.
    pub fn all(forest: &'a Forest) -> impl Iterator<Item = HardwareUnit<'a>> + 'a {
        forest
            .declarations()
            .iter()
            .map(move |d| HardwareUnit::new(&d.name, forest, d.root))
    }

    #[must_use]
    pub fn name(&self) -> &'a str {
        self.name
    }

    #[must_use]
    pub fn forest(&self) -> &'a Forest {
        self.forest
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.forest.arena().subtree_size(self.root)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityScorer {
    label_edit_bound: f64,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new(&Thresholds::default())
    }
}

impl SimilarityScorer {
    #[must_use]
    pub fn new(thresholds: &Thresholds) -> Self {
        Self {
            label_edit_bound: thresholds.label_edit_bound(),
        }
    }

    /// Similarity of two leaf labels: 1 when equal, `1 - d / max_len` when the
    /// edit distance `d` stays within the configured bound, 0 otherwise.
    #[must_use]
    pub fn label_similarity(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 1.0;
        }
        let longest = a.chars().count().max(b.chars().count());
        #[allow(clippy::cast_precision_loss)]
        let (distance, longest) = (edit_distance(a, b) as f64, longest as f64);
        if distance <= self.label_edit_bound * longest {
            1.0 - distance / longest
        } else {
            0.0
        }
    }

    /// Scores the subtree at `h_root` of `hardware` against the subtree at
    /// `s_root` of `software`. Siblings of either root are ignored.
    #[must_use]
    pub fn score_trees(
        &self,
        hardware: &Arena,
        h_root: NodeId,
        software: &Arena,
        s_root: NodeId,
    ) -> f64 {
        let h = Skeleton::new(hardware, h_root);
        let s = Skeleton::new(software, s_root);
        let (nh, ns) = (h.len(), s.len());
        let width = ns + 1;

        // Row `nh` and column `ns` stand for an empty sibling list.
        let mut table = vec![0.0_f32; (nh + 1) * width];
        for i in (0..nh).rev() {
            for j in (0..ns).rev() {
                let skip_h = table[h.right[i] * width + j];
                let skip_s = table[i * width + s.right[j]];
                let mut best = skip_h.max(skip_s);
                if let Some(pair) = self.pair(&h, i, &s, j) {
                    let aligned = pair
                        + table[h.down[i] * width + s.down[j]]
                        + table[h.right[i] * width + s.right[j]];
                    best = best.max(aligned);
                }
                table[i * width + j] = best;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let size = nh.max(ns).max(1) as f64;
        (f64::from(table[0]) / size).clamp(0.0, 1.0)
    }

    /// Contribution of aligning `h[i]` with `s[j]`, or `None` if they cannot
    /// be aligned.
    fn pair(&self, h: &Skeleton<'_>, i: usize, s: &Skeleton<'_>, j: usize) -> Option<f32> {
        let (hn, sn) = (&h.arena[h.ids[i]], &s.arena[s.ids[j]]);
        if !compatible(&hn.kind, &sn.kind) {
            return None;
        }
        if h.is_name[i] && s.is_name[j] {
            return Some(1.0);
        }
        if hn.is_terminal() || sn.is_terminal() {
            #[allow(clippy::cast_possible_truncation)]
            let similarity = self.label_similarity(&hn.label, &sn.label) as f32;
            return (similarity > 0.0).then_some(similarity);
        }
        Some(1.0)
    }
}

/// Preorder view of one subtree with sibling and child links rewritten as
/// local positions. Position `len()` means "none".
struct Skeleton<'a> {
    arena: &'a Arena,
    ids: Vec<NodeId>,
    down: Vec<usize>,
    right: Vec<usize>,
    /// Declaration-name identifiers, which match each other regardless of label.
    is_name: Vec<bool>,
}

impl<'a> Skeleton<'a> {
    fn new(arena: &'a Arena, root: NodeId) -> Self {
        let ids: Vec<NodeId> = arena.preorder(root).map(|(id, _)| id).collect();
        let n = ids.len();
        let position: FxHashMap<NodeId, usize> =
            ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let local = |id: Option<NodeId>| id.and_then(|id| position.get(&id).copied()).unwrap_or(n);

        let mut down = Vec::with_capacity(n);
        let mut right = Vec::with_capacity(n);
        let mut is_name = vec![false; n];
        for (i, &id) in ids.iter().enumerate() {
            let node = &arena[id];
            down.push(local(node.first_child));
            right.push(if i == 0 { n } else { local(node.next_sibling) });
            if node.kind.is_declaration_label() {
                for child in arena.children(id) {
                    if arena[child].kind == NodeKind::Identifier {
                        is_name[position[&child]] = true;
                        break;
                    }
                }
            }
        }
        Self {
            arena,
            ids,
            down,
            right,
            is_name,
        }
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

fn compatible(a: &NodeKind, b: &NodeKind) -> bool {
    (a.is_declaration_root() && b.is_declaration_root())
        || (a.is_declaration_label() && b.is_declaration_label())
        || a == b
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Scores every declaration of the inlined `software` forest against `unit`
/// and returns those scoring at least `threshold`, best first. Equal scores
/// keep declaration order.
///
/// # Errors
///
/// Returns [`MatchError::InvalidState`] unless the unit's forest is
/// `Normalized` and `software` is `Inlined`, and [`MatchError::Config`] for a
/// threshold outside `[0, 1]`.
pub fn match_all(
    scorer: &SimilarityScorer,
    unit: &HardwareUnit<'_>,
    software: &Forest,
    threshold: f64,
) -> Result<Vec<MatchResult>, MatchError> {
    expect_phase("match hardware", ForestPhase::Normalized, unit.forest.phase())?;
    expect_phase("match software", ForestPhase::Inlined, software.phase())?;
    if !(0.0..=1.0).contains(&threshold) {
        return Err(MatchError::Config(format!(
            "matching threshold must lie in [0, 1], got {threshold}"
        )));
    }

    let hardware = unit.forest.arena();
    let h_size = unit.node_count();
    let mut results: Vec<MatchResult> = software
        .declarations()
        .par_iter()
        .enumerate()
        .filter_map(|(index, declaration)| {
            let s_size = software.arena().subtree_size(declaration.root);
            #[allow(clippy::cast_precision_loss)]
            let bound = h_size.min(s_size) as f64 / h_size.max(s_size).max(1) as f64;
            if bound < threshold {
                return None;
            }
            let similarity =
                scorer.score_trees(hardware, unit.root, software.arena(), declaration.root);
            (similarity >= threshold).then(|| MatchResult {
                hardware_unit: unit.name.to_string(),
                candidate: declaration.name.clone(),
                candidate_index: index,
                node: declaration.root,
                similarity,
            })
        })
        .collect();
    results.sort_by(rank);

    tracing::debug!(
        unit = unit.name,
        candidates = software.len(),
        accepted = results.len(),
        best = results.first().map(|r| r.similarity),
        "matched hardware unit"
    );
    Ok(results)
}

/// [`match_all`] for the unit called `name` among `units`.
///
/// # Errors
///
/// Returns [`MatchError::UnknownUnit`] if no unit has that name, otherwise
/// whatever [`match_all`] returns.
pub fn match_one(
    scorer: &SimilarityScorer,
    units: &[HardwareUnit<'_>],
    name: &str,
    software: &Forest,
    threshold: f64,
) -> Result<Vec<MatchResult>, MatchError> {
    let unit = units
        .iter()
        .find(|u| u.name == name)
        .ok_or_else(|| MatchError::UnknownUnit(name.to_string()))?;
    match_all(scorer, unit, software, threshold)
}

/// The highest-scoring result; the earliest one wins a tie.
pub fn best_overall<'r>(
    results: impl IntoIterator<Item = &'r MatchResult>,
) -> Option<&'r MatchResult> {
    results.into_iter().fold(None, |best, r| match best {
        Some(b) if b.similarity >= r.similarity => Some(b),
        _ => Some(r),
    })
}

fn rank(a: &MatchResult, b: &MatchResult) -> Ordering {
    b.similarity
        .total_cmp(&a.similarity)
        .then(a.candidate_index.cmp(&b.candidate_index))
}

//! Call-site inlining for software forests.
//!
//! Hardware bundles are mostly flat operation sequences, while software
//! spreads the same work over nested helper calls. The expander splices a
//! copy of a callee's body in place of each admissible call so both sides
//! are compared at a similar granularity.
//!
//! A call to `callee` made from `caller` (the innermost function on the
//! current expansion chain) is expanded when
//!
//! - `|height(caller) - height(callee)| <= inline_depth_diff`,
//! - the node-count ratio (see [`RatioDirection`]) is at most
//!   `inline_node_ratio`,
//! - `callee` is not already on the chain, and
//! - the chain is shorter than `max_inline_chain`.
//!
//! Heights and node counts are taken from the normalized input, not from the
//! partially expanded output. One pass may splice in at most
//! `GROWTH_FACTOR` times the input node count in callee bodies, shared by
//! all declarations. A call whose body no longer fits is copied unchanged,
//! so the output never exceeds `(GROWTH_FACTOR + 1)` times the input.

use std::rc::Rc;

use mcmap_ast::{
    arena::Arena,
    forest::{Forest, ForestPhase},
    nodes::{Node, NodeId, NodeKind},
};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::{
    config::{RatioDirection, Thresholds},
    errors::{MatchError, expect_phase},
};

/// Spliced body nodes allowed per pass, as a multiple of the input forest size.
pub const GROWTH_FACTOR: usize = 8;

/// Counters describing what one [`InlineExpander::expand`] pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InlineStats {
    pub expanded: usize,
    pub rejected_depth: usize,
    pub rejected_ratio: usize,
    pub cycles: usize,
    pub chain_limited: usize,
    pub budget_limited: usize,
    /// Calls to a declared function that has nothing but a name.
    pub empty_bodies: usize,
    /// Calls whose target is not declared in the forest.
    pub external: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Decision {
    Expand(usize),
    External,
    EmptyBody,
    DepthMismatch,
    RatioExceeded,
    Cycle,
    ChainLimit,
    Budget,
}

/// Shape of one input declaration, measured once before expansion.
struct DeclShape {
    height: usize,
    nodes: usize,
    body: Option<NodeId>,
    body_nodes: usize,
}

struct Frame {
    next: Option<NodeId>,
    parent: NodeId,
    chain: Rc<Vec<usize>>,
}

#[derive(Debug, Clone)]
pub struct InlineExpander {
    depth_diff: u32,
    node_ratio: f64,
    direction: RatioDirection,
    max_chain: usize,
}

impl InlineExpander {
    #[must_use]
    pub fn new(thresholds: &Thresholds) -> Self {
        Self {
            depth_diff: thresholds.inline_depth_diff(),
            node_ratio: thresholds.inline_node_ratio(),
            direction: thresholds.ratio_direction(),
            max_chain: thresholds.max_inline_chain(),
        }
    }

    /// An expander with the given acceptance knobs and default chain bound.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Config`] if `node_ratio` is not a positive number.
    pub fn configure(depth_diff: u32, node_ratio: f64) -> Result<Self, MatchError> {
        let defaults = Thresholds::default();
        Thresholds::new(depth_diff, node_ratio, defaults.matching_threshold())
            .map(|t| Self::new(&t))
    }

    /// Expands every declaration of a normalized software forest.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::InvalidState`] unless `forest` is `Normalized`,
    /// which also rules out inlining the same forest twice.
    pub fn expand(&self, forest: &Forest) -> Result<(Forest, InlineStats), MatchError> {
        expect_phase("inline", ForestPhase::Normalized, forest.phase())?;

        let source = forest.arena();
        let shapes: Vec<DeclShape> = forest
            .declarations()
            .iter()
            .map(|d| shape(source, d.root))
            .collect();
        let mut budget = GROWTH_FACTOR * forest.total_nodes().max(1);

        let mut out = Forest::with_arena(forest.side(), Arena::with_capacity(source.len()));
        let mut stats = InlineStats::default();
        for (index, declaration) in forest.declarations().iter().enumerate() {
            let root = self.expand_declaration(
                forest,
                &shapes,
                index,
                declaration.root,
                out.arena_mut(),
                &mut budget,
                &mut stats,
            );
            out.add_declaration(&declaration.name, root);
        }
        out.set_phase(ForestPhase::Inlined);

        tracing::info!(
            declarations = out.len(),
            nodes_before = source.len(),
            nodes_after = out.arena().len(),
            expanded = stats.expanded,
            budget_limited = stats.budget_limited,
            cycles = stats.cycles,
            "inlined software forest"
        );
        Ok((out, stats))
    }

    #[allow(clippy::too_many_arguments)]
    fn expand_declaration(
        &self,
        forest: &Forest,
        shapes: &[DeclShape],
        index: usize,
        root: NodeId,
        out: &mut Arena,
        budget: &mut usize,
        stats: &mut InlineStats,
    ) -> NodeId {
        let source = forest.arena();
        let new_root = out.add_node(Node::new(
            source[root].label.clone(),
            source[root].kind.clone(),
        ));
        let mut last_child: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        let mut stack = vec![Frame {
            next: source[root].first_child,
            parent: new_root,
            chain: Rc::new(vec![index]),
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(src) = frame.next else {
                stack.pop();
                continue;
            };
            frame.next = source[src].next_sibling;
            let parent = frame.parent;
            let chain = Rc::clone(&frame.chain);
            let node = &source[src];

            if matches!(node.kind, NodeKind::Call(_)) {
                let decision = self.decide(forest, shapes, src, &chain, *budget);
                tracing::debug!(
                    caller = %forest.declarations()[*chain.last().unwrap_or(&index)].name,
                    call = %node.label,
                    ?decision,
                    "inline decision"
                );
                stats.record(decision);
                if let Decision::Expand(callee) = decision {
                    *budget -= shapes[callee].body_nodes;
                    let mut extended = (*chain).clone();
                    extended.push(callee);
                    stack.push(Frame {
                        next: shapes[callee].body,
                        parent,
                        chain: Rc::new(extended),
                    });
                    continue;
                }
            }

            let copy = out.add_node(Node::new(node.label.clone(), node.kind.clone()));
            match last_child.insert(parent, copy) {
                Some(previous) => out.link_after(previous, copy),
                None => out.set_first_child(parent, Some(copy)),
            }
            if let Some(child) = node.first_child {
                stack.push(Frame {
                    next: Some(child),
                    parent: copy,
                    chain,
                });
            }
        }
        new_root
    }

    fn decide(
        &self,
        forest: &Forest,
        shapes: &[DeclShape],
        call: NodeId,
        chain: &[usize],
        budget: usize,
    ) -> Decision {
        let Some(callee) = callee_of(forest, call) else {
            return Decision::External;
        };
        if chain.contains(&callee) {
            return Decision::Cycle;
        }
        if chain.len() > self.max_chain {
            return Decision::ChainLimit;
        }
        let target = &shapes[callee];
        if target.body_nodes > budget {
            return Decision::Budget;
        }
        if target.body.is_none() {
            return Decision::EmptyBody;
        }
        let caller = &shapes[chain[chain.len() - 1]];
        if caller.height.abs_diff(target.height) > self.depth_diff as usize {
            return Decision::DepthMismatch;
        }
        if self.direction.ratio(caller.nodes, target.body_nodes) > self.node_ratio {
            return Decision::RatioExceeded;
        }
        Decision::Expand(callee)
    }
}

impl InlineStats {
    fn record(&mut self, decision: Decision) {
        match decision {
            Decision::Expand(_) => self.expanded += 1,
            Decision::External => self.external += 1,
            Decision::EmptyBody => self.empty_bodies += 1,
            Decision::DepthMismatch => self.rejected_depth += 1,
            Decision::RatioExceeded => self.rejected_ratio += 1,
            Decision::Cycle => self.cycles += 1,
            Decision::ChainLimit => self.chain_limited += 1,
            Decision::Budget => self.budget_limited += 1,
        }
    }
}

/// Declaration index targeted by a call: the call's own label if it names a
/// declaration, otherwise the first identifier child that does.
fn callee_of(forest: &Forest, call: NodeId) -> Option<usize> {
    let arena = forest.arena();
    forest.position(&arena[call].label).or_else(|| {
        arena
            .children(call)
            .filter(|&c| arena[c].kind == NodeKind::Identifier)
            .find_map(|c| forest.position(&arena[c].label))
    })
}

fn shape(arena: &Arena, root: NodeId) -> DeclShape {
    let first = arena[root].first_child;
    let body = match first {
        Some(label) if arena[label].kind.is_declaration_label() => arena[label].next_sibling,
        other => other,
    };
    let mut body_nodes = 0;
    let mut cursor = body;
    while let Some(id) = cursor {
        body_nodes += arena.subtree_size(id);
        cursor = arena[id].next_sibling;
    }
    DeclShape {
        height: arena.height(root),
        nodes: arena.subtree_size(root),
        body,
        body_nodes,
    }
}

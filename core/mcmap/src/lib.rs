#![warn(clippy::pedantic)]
//! Hardware/Software Tree Mapping Engine
//!
//! This crate maps hardware microcode bundles to the software functions that
//! implement the same operations. Both sides arrive as indented tree dumps;
//! the engine brings them to one canonical shape, inlines software helper
//! calls so both sides have a similar granularity, and then ranks software
//! functions against every hardware bundle by tree similarity.
//!
//! ## Pipeline
//!
//! ```text
//! dumps → ingest → normalize → inline (software) → match (per unit) → annotate
//! ```
//!
//! [`MappingEngine`] encodes the pipeline as a typestate, in the same way a
//! builder only hands out its result once the work is done: each step
//! consumes the engine and returns it in the next state, so running a step
//! twice or out of order does not compile. Matching borrows the inlined
//! engine and can be repeated for any unit.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use mcmap::{MappingEngine, Thresholds};
//!
//! let engine = MappingEngine::new(Thresholds::default())
//!     .ingest_batch(Path::new("hw"), Path::new("sw.txt"), Path::new("symbols.txt"))?
//!     .normalize()?
//!     .inline()?;
//! let run = engine.match_batch()?;
//! if let Some((unit, best)) = run.best_overall() {
//!     println!("{unit}: {} ({:.3})", best.candidate, best.similarity);
//! }
//! # Ok::<(), mcmap::errors::EngineError>(())
//! ```
//!
//! The lower-level passes live in [`mcmap_matcher`] and can be driven
//! directly on [`Forest`] values; they check the forest's phase tag at run
//! time instead.

use std::{marker::PhantomData, path::Path, sync::Arc};

use mcmap_ast::{forest::Forest, nodes::Side};
use mcmap_matcher::{
    HardwareUnit, InlineExpander, InlineStats, SimilarityScorer, match_all, normalize,
};
use mcmap_symbols::{ResolvedSymbol, SymbolTable};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

pub mod errors;
pub mod ingest;

pub use errors::EngineError;
pub use ingest::{Inputs, SkippedUnit, Sources};
pub use mcmap_matcher::{MatchResult, RatioDirection, Thresholds};

/// Marker state: thresholds are set, nothing has been read yet.
pub struct Uninitialized;

/// Marker state: all forests are parsed.
pub struct Ingested;

/// Marker state: all forests are in canonical form.
pub struct Normalized;

/// Marker state: the software forest is inlined and matching is possible.
pub struct Inlined;

/// Where a hardware unit lives: forest and declaration position.
#[derive(Debug, Clone)]
struct UnitRef {
    name: String,
    forest: usize,
    declaration: usize,
}

/// Drives one mapping run through its phases.
pub struct MappingEngine<S> {
    thresholds: Thresholds,
    workers: Option<usize>,
    hardware: Vec<Forest>,
    software: Forest,
    symbols: Arc<SymbolTable>,
    skipped: Vec<SkippedUnit>,
    units: Vec<UnitRef>,
    inline_stats: Option<InlineStats>,
    _state: PhantomData<S>,
}

impl Default for MappingEngine<Uninitialized> {
    fn default() -> Self {
        MappingEngine::new(Thresholds::default())
    }
}

impl MappingEngine<Uninitialized> {
    #[must_use]
    pub fn new(thresholds: Thresholds) -> Self {
        MappingEngine {
            thresholds,
            workers: None,
            hardware: Vec::new(),
            software: Forest::new(Side::Software),
            symbols: Arc::new(SymbolTable::new()),
            skipped: Vec::new(),
            units: Vec::new(),
            inline_stats: None,
            _state: PhantomData,
        }
    }

    /// Reads thresholds from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] if the file cannot be read and
    /// [`EngineError::Config`] if it holds invalid thresholds.
    pub fn from_config_file(path: &Path) -> Result<Self, EngineError> {
        let source = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(Thresholds::from_toml_str(&source)?))
    }

    /// Caps the number of threads used by [`MappingEngine::match_batch`].
    /// Without it the global rayon pool is used.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] for zero workers.
    pub fn with_workers(mut self, workers: usize) -> Result<Self, EngineError> {
        if workers == 0 {
            return Err(EngineError::Config(
                "workers must be at least 1".to_string(),
            ));
        }
        self.workers = Some(workers);
        Ok(self)
    }

    /// Single mode: one hardware dump, one software dump, one symbol table.
    ///
    /// # Errors
    ///
    /// See [`ingest::parse_single`].
    pub fn ingest_single(
        self,
        hardware: &Path,
        software: &Path,
        symbols: &Path,
    ) -> Result<MappingEngine<Ingested>, EngineError> {
        let ingested = ingest::parse_single(hardware, software, symbols)?;
        Ok(self.ingest(ingested))
    }

    /// Batch mode: every `.txt` dump of `hardware_dir`. Malformed dumps are
    /// skipped and reported by [`MappingEngine::skipped`].
    ///
    /// # Errors
    ///
    /// See [`ingest::parse_batch`].
    pub fn ingest_batch(
        self,
        hardware_dir: &Path,
        software: &Path,
        symbols: &Path,
    ) -> Result<MappingEngine<Ingested>, EngineError> {
        let ingested = ingest::parse_batch(hardware_dir, software, symbols)?;
        Ok(self.ingest(ingested))
    }

    /// # Errors
    ///
    /// See [`ingest::parse_sources`].
    pub fn ingest_sources(
        self,
        sources: &Sources<'_>,
    ) -> Result<MappingEngine<Ingested>, EngineError> {
        let ingested = ingest::parse_sources(sources)?;
        Ok(self.ingest(ingested))
    }

    /// Takes already parsed forests.
    #[must_use]
    pub fn ingest(self, ingested: Inputs) -> MappingEngine<Ingested> {
        let units = collect_units(&ingested.hardware);
        tracing::info!(
            hardware_forests = ingested.hardware.len(),
            hardware_units = units.len(),
            software_declarations = ingested.software.len(),
            symbols = ingested.symbols.len(),
            skipped = ingested.skipped.len(),
            "ingested"
        );
        MappingEngine {
            thresholds: self.thresholds,
            workers: self.workers,
            hardware: ingested.hardware,
            software: ingested.software,
            symbols: Arc::new(ingested.symbols),
            skipped: ingested.skipped,
            units,
            inline_stats: None,
            _state: PhantomData,
        }
    }
}

impl MappingEngine<Ingested> {
    /// Brings every hardware forest and the software forest to canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] if a forest was handed in
    /// already inlined.
    pub fn normalize(self) -> Result<MappingEngine<Normalized>, EngineError> {
        let hardware = self
            .hardware
            .par_iter()
            .map(normalize)
            .collect::<Result<Vec<_>, _>>()?;
        let software = normalize(&self.software)?;
        tracing::info!(
            hardware_nodes = hardware.iter().map(Forest::total_nodes).sum::<usize>(),
            software_nodes = software.total_nodes(),
            "normalized"
        );
        Ok(self.advance(hardware, software))
    }
}

impl MappingEngine<Normalized> {
    /// Inlines the software forest with the configured thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] if the software forest is not
    /// normalized, which the typestate already rules out.
    pub fn inline(mut self) -> Result<MappingEngine<Inlined>, EngineError> {
        let (software, stats) = InlineExpander::new(&self.thresholds).expand(&self.software)?;
        let hardware = std::mem::take(&mut self.hardware);
        let mut next = self.advance(hardware, software);
        next.inline_stats = Some(stats);
        Ok(next)
    }
}

impl MappingEngine<Inlined> {
    /// Accepted candidates for the unit called `name`, best first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownUnit`] if no hardware unit has that name.
    pub fn match_one(&self, name: &str) -> Result<UnitMatches, EngineError> {
        let unit = self
            .units
            .iter()
            .find(|u| u.name == name)
            .ok_or_else(|| EngineError::UnknownUnit(name.to_string()))?;
        self.match_unit(unit)
    }

    /// Matches every hardware unit in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while matching a unit.
    pub fn match_all(&self) -> Result<MatchRun, EngineError> {
        let outcomes = self
            .units
            .iter()
            .map(|unit| self.match_unit(unit).map(UnitOutcome::Matched))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.finish(outcomes))
    }

    /// Matches all hardware units in parallel. A unit that fails is recorded
    /// as [`UnitOutcome::Failed`] and does not affect the others.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if the worker pool cannot be built.
    pub fn match_batch(&self) -> Result<MatchRun, EngineError> {
        let run = || {
            self.units
                .par_iter()
                .map(|unit| match self.match_unit(unit) {
                    Ok(matches) => UnitOutcome::Matched(matches),
                    Err(err) => {
                        tracing::warn!(unit = %unit.name, error = %err, "unit failed");
                        UnitOutcome::Failed {
                            unit: unit.name.clone(),
                            reason: err.to_string(),
                        }
                    }
                })
                .collect::<Vec<_>>()
        };
        let outcomes = match self.workers {
            Some(workers) => rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| EngineError::Config(e.to_string()))?
                .install(run),
            None => run(),
        };
        Ok(self.finish(outcomes))
    }

    /// Resolves the symbols referenced by a match and renders its tree.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownCandidate`] if `result` does not name a
    /// declaration root of this engine's software forest.
    pub fn annotate(&self, result: &MatchResult) -> Result<AnnotatedMatch, EngineError> {
        if self.software.get(&result.candidate) != Some(result.node) {
            return Err(EngineError::UnknownCandidate(result.candidate.clone()));
        }
        let annotation = mcmap_symbols::annotate(&self.software, result.node, &self.symbols);
        Ok(AnnotatedMatch {
            result: result.clone(),
            symbols: annotation.symbols,
            tree: annotation.tree,
        })
    }

    #[must_use]
    pub fn inline_stats(&self) -> Option<&InlineStats> {
        self.inline_stats.as_ref()
    }

    fn match_unit(&self, unit: &UnitRef) -> Result<UnitMatches, EngineError> {
        let forest = &self.hardware[unit.forest];
        let root = forest.declarations()[unit.declaration].root;
        let hardware = HardwareUnit::new(&unit.name, forest, root);
        let scorer = SimilarityScorer::new(&self.thresholds);
        let matches = match_all(
            &scorer,
            &hardware,
            &self.software,
            self.thresholds.matching_threshold(),
        )?;
        Ok(UnitMatches {
            unit: unit.name.clone(),
            matches,
        })
    }

    fn finish(&self, outcomes: Vec<UnitOutcome>) -> MatchRun {
        let run = MatchRun {
            outcomes,
            skipped: self.skipped.clone(),
        };
        tracing::info!(
            units = run.outcomes.len(),
            accepted = run.accepted_count(),
            skipped = run.skipped.len(),
            "matched"
        );
        run
    }
}

impl<S> MappingEngine<S> {
    #[must_use]
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Names of all hardware units, in file then declaration order.
    pub fn hardware_units(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|u| u.name.as_str())
    }

    /// Node count of the named hardware unit in its current phase.
    #[must_use]
    pub fn hardware_node_count(&self, name: &str) -> Option<usize> {
        let unit = self.units.iter().find(|u| u.name == name)?;
        let forest = &self.hardware[unit.forest];
        Some(
            forest
                .arena()
                .subtree_size(forest.declarations()[unit.declaration].root),
        )
    }

    /// Node count of the named software declaration in its current phase.
    #[must_use]
    pub fn software_node_count(&self, name: &str) -> Option<usize> {
        self.software.node_count(name)
    }

    #[must_use]
    pub fn hardware_forests(&self) -> &[Forest] {
        &self.hardware
    }

    #[must_use]
    pub fn software_forest(&self) -> &Forest {
        &self.software
    }

    #[must_use]
    pub fn symbols(&self) -> Arc<SymbolTable> {
        Arc::clone(&self.symbols)
    }

    /// Hardware dumps left out of a batch.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedUnit] {
        &self.skipped
    }

    fn advance<T>(self, hardware: Vec<Forest>, software: Forest) -> MappingEngine<T> {
        MappingEngine {
            thresholds: self.thresholds,
            workers: self.workers,
            hardware,
            software,
            symbols: self.symbols,
            skipped: self.skipped,
            units: self.units,
            inline_stats: self.inline_stats,
            _state: PhantomData,
        }
    }
}

/// Unit names across all forests. A name already taken by an earlier unit
/// gets a `_1`, `_2`, ... suffix.
fn collect_units(hardware: &[Forest]) -> Vec<UnitRef> {
    let mut taken = FxHashSet::default();
    let mut units = Vec::new();
    for (forest_index, forest) in hardware.iter().enumerate() {
        for (declaration, decl) in forest.declarations().iter().enumerate() {
            let mut name = decl.name.clone();
            let mut suffix = 0;
            while taken.contains(&name) {
                suffix += 1;
                name = format!("{}_{suffix}", decl.name);
            }
            taken.insert(name.clone());
            units.push(UnitRef {
                name,
                forest: forest_index,
                declaration,
            });
        }
    }
    units
}

/// Accepted candidates of one hardware unit, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitMatches {
    pub unit: String,
    pub matches: Vec<MatchResult>,
}

impl UnitMatches {
    #[must_use]
    pub fn best(&self) -> Option<&MatchResult> {
        self.matches.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnitOutcome {
    Matched(UnitMatches),
    Failed { unit: String, reason: String },
}

impl UnitOutcome {
    #[must_use]
    pub fn unit(&self) -> &str {
        match self {
            UnitOutcome::Matched(m) => &m.unit,
            UnitOutcome::Failed { unit, .. } => unit,
        }
    }
}

/// Results of matching a set of hardware units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRun {
    outcomes: Vec<UnitOutcome>,
    skipped: Vec<SkippedUnit>,
}

impl MatchRun {
    #[must_use]
    pub fn outcomes(&self) -> &[UnitOutcome] {
        &self.outcomes
    }

    #[must_use]
    pub fn skipped(&self) -> &[SkippedUnit] {
        &self.skipped
    }

    /// Accepted results of the named unit; `None` if it was not matched.
    #[must_use]
    pub fn results_for(&self, unit: &str) -> Option<&[MatchResult]> {
        self.outcomes.iter().find_map(|o| match o {
            UnitOutcome::Matched(m) if m.unit == unit => Some(m.matches.as_slice()),
            _ => None,
        })
    }

    /// Every accepted result, unit by unit.
    pub fn matches(&self) -> impl Iterator<Item = &MatchResult> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                UnitOutcome::Matched(m) => Some(&m.matches),
                UnitOutcome::Failed { .. } => None,
            })
            .flatten()
    }

    #[must_use]
    pub fn accepted_count(&self) -> usize {
        self.matches().count()
    }

    /// The highest-scoring pair across all units; the earliest unit wins a tie.
    #[must_use]
    pub fn best_overall(&self) -> Option<(&str, &MatchResult)> {
        mcmap_matcher::best_overall(self.matches()).map(|r| (r.hardware_unit.as_str(), r))
    }
}

/// A match with its resolved symbols and rendered tree, ready to be written out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedMatch {
    pub result: MatchResult,
    pub symbols: Vec<ResolvedSymbol>,
    pub tree: String,
}

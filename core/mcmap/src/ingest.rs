//! Reading hardware dumps, the software dump and the symbol table.
//!
//! Single mode reads one file of each kind and fails on the first error.
//! Batch mode reads every `.txt` dump of a hardware directory; a dump that
//! cannot be parsed is recorded as a [`SkippedUnit`] and the rest of the
//! batch goes on.

use std::path::{Path, PathBuf};

use mcmap_ast::{builder::Builder, forest::Forest, nodes::Side};
use mcmap_symbols::SymbolTable;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::errors::EngineError;

const HARDWARE_EXTENSION: &str = "txt";

/// A hardware dump left out of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedUnit {
    pub file: PathBuf,
    pub reason: String,
}

/// Everything the engine needs before normalization.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub hardware: Vec<Forest>,
    pub software: Forest,
    pub symbols: SymbolTable,
    pub skipped: Vec<SkippedUnit>,
}

/// In-memory dumps, named for error messages.
#[derive(Debug, Clone, Copy)]
pub struct Sources<'a> {
    pub hardware: &'a [(&'a str, &'a str)],
    pub software: &'a str,
    pub symbols: &'a str,
}

/// Reads one hardware dump, one software dump and the symbol table.
///
/// # Errors
///
/// Returns [`EngineError::Parse`] or [`EngineError::Symbols`] if any of the
/// three files is missing or malformed.
pub fn parse_single(
    hardware: &Path,
    software: &Path,
    symbols: &Path,
) -> Result<Inputs, EngineError> {
    let hardware = Builder::new(Side::Hardware).build_forest_from_path(hardware)?;
    let (software, symbols) = parse_shared(software, symbols)?;
    Ok(Inputs {
        hardware: vec![hardware],
        software,
        symbols,
        skipped: Vec::new(),
    })
}

/// Reads every hardware dump in `hardware_dir`, plus the software dump and
/// symbol table once. Hardware forests come back in file-name order.
///
/// # Errors
///
/// Returns [`EngineError::Io`] if the directory cannot be listed, and
/// [`EngineError::Parse`] or [`EngineError::Symbols`] if the software dump or
/// symbol table is missing or malformed. Malformed hardware dumps are not
/// errors; they end up in [`Inputs::skipped`].
pub fn parse_batch(
    hardware_dir: &Path,
    software: &Path,
    symbols: &Path,
) -> Result<Inputs, EngineError> {
    let files = list_hardware_units(hardware_dir)?;
    let (software, symbols) = parse_shared(software, symbols)?;

    let parsed: Vec<(PathBuf, Result<Forest, String>)> = files
        .into_par_iter()
        .map(|file| {
            let forest = Builder::new(Side::Hardware)
                .build_forest_from_path(&file)
                .map_err(|e| e.to_string());
            (file, forest)
        })
        .collect();

    let mut hardware = Vec::with_capacity(parsed.len());
    let mut skipped = Vec::new();
    for (file, forest) in parsed {
        match forest {
            Ok(forest) => hardware.push(forest),
            Err(reason) => {
                tracing::warn!(file = %file.display(), %reason, "skipping hardware dump");
                skipped.push(SkippedUnit { file, reason });
            }
        }
    }
    tracing::info!(
        directory = %hardware_dir.display(),
        parsed = hardware.len(),
        skipped = skipped.len(),
        "ingested hardware batch"
    );
    Ok(Inputs {
        hardware,
        software,
        symbols,
        skipped,
    })
}

/// Parses dumps held in memory; any malformed source is an error.
///
/// # Errors
///
/// Returns [`EngineError::Parse`] or [`EngineError::Symbols`] for the first
/// malformed source.
pub fn parse_sources(sources: &Sources<'_>) -> Result<Inputs, EngineError> {
    let hardware = sources
        .hardware
        .iter()
        .map(|(name, dump)| {
            Builder::new(Side::Hardware)
                .with_origin(*name)
                .with_fallback_name(*name)
                .build_forest(dump)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let software = Builder::new(Side::Software)
        .with_origin("<software>")
        .build_forest(sources.software)?;
    let symbols = SymbolTable::parse(sources.symbols, "<symbols>")?;
    Ok(Inputs {
        hardware,
        software,
        symbols,
        skipped: Vec::new(),
    })
}

/// The `.txt` files directly inside `directory`, sorted by file name.
///
/// # Errors
///
/// Returns [`EngineError::Io`] if the directory cannot be read.
pub fn list_hardware_units(directory: &Path) -> Result<Vec<PathBuf>, EngineError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| EngineError::Io {
            path: directory.to_path_buf(),
            source: e.into(),
        })?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().is_some_and(|ext| ext == HARDWARE_EXTENSION)
        {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

fn parse_shared(software: &Path, symbols: &Path) -> Result<(Forest, SymbolTable), EngineError> {
    let software = Builder::new(Side::Software).build_forest_from_path(software)?;
    let symbols = SymbolTable::from_path(symbols)?;
    Ok((software, symbols))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const BUNDLE: &str = "-> { (BUNDLE_DEF)\n  -> BUNDLE_LABEL (BUNDLE_LABEL)\n    -> b (IDENT)\n  -> add (OP)\n";
    const FUNCTION: &str = "-> { (FUNCTION_DEF)\n  -> FUNCTION_LABEL (FUNCTION_LABEL)\n    -> f (IDENT)\n  -> add (OP)\n";

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn lists_only_txt_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.txt", BUNDLE);
        write(dir.path(), "a.txt", BUNDLE);
        write(dir.path(), "notes.md", "ignored");
        fs::create_dir(dir.path().join("nested.txt")).unwrap();
        write(&dir.path().join("nested.txt"), "c.txt", BUNDLE);

        let names: Vec<String> = list_hardware_units(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            list_hardware_units(&dir.path().join("absent")),
            Err(EngineError::Io { .. })
        ));
    }

    #[test]
    fn single_mode_fails_on_missing_or_malformed_input() {
        let dir = tempfile::tempdir().unwrap();
        let hw = write(dir.path(), "hw.txt", BUNDLE);
        let sw = write(dir.path(), "sw.txt", FUNCTION);
        let sym = write(dir.path(), "symbols.txt", "f function int f(void);\n");
        let bad = write(dir.path(), "bad.txt", "not a dump\n");

        let ingested = parse_single(&hw, &sw, &sym).unwrap();
        assert_eq!(ingested.hardware.len(), 1);
        assert_eq!(ingested.symbols.len(), 1);

        assert!(matches!(
            parse_single(&bad, &sw, &sym),
            Err(EngineError::Parse(_))
        ));
        assert!(matches!(
            parse_single(&hw, &dir.path().join("missing.txt"), &sym),
            Err(EngineError::Parse(_))
        ));
        assert!(matches!(
            parse_single(&hw, &sw, &dir.path().join("missing.sym")),
            Err(EngineError::Symbols(_))
        ));
    }

    #[test]
    fn batch_mode_skips_malformed_dumps() {
        let hw_dir = tempfile::tempdir().unwrap();
        write(hw_dir.path(), "0.txt", BUNDLE);
        write(hw_dir.path(), "1.txt", "-> missing kind\n");
        write(hw_dir.path(), "2.txt", BUNDLE);
        let dir = tempfile::tempdir().unwrap();
        let sw = write(dir.path(), "sw.txt", FUNCTION);
        let sym = write(dir.path(), "symbols.txt", "");

        let ingested = parse_batch(hw_dir.path(), &sw, &sym).unwrap();
        assert_eq!(ingested.hardware.len(), 2);
        assert_eq!(ingested.skipped.len(), 1);
        assert!(ingested.skipped[0].file.ends_with("1.txt"));
    }

    #[test]
    fn in_memory_sources_use_the_given_names() {
        let ingested = parse_sources(&Sources {
            hardware: &[("first", "-> add (OP)\n")],
            software: FUNCTION,
            symbols: "",
        })
        .unwrap();
        assert_eq!(ingested.hardware[0].declarations()[0].name, "first");
        assert!(ingested.symbols.is_empty());
    }
}

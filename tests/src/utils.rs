use std::path::{Path, PathBuf};

use mcmap::{Inlined, MappingEngine, Thresholds};

pub(crate) fn get_test_data_path() -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::current_dir().unwrap());
    manifest_dir.join("test_data")
}

/// Resolves a dump next to the test module that uses it.
///
/// # Example
/// For a test in `tests/src/pipeline.rs`, `get_test_file_path(module_path!(), "software")`
/// resolves to `tests/test_data/pipeline/software.txt`.
pub(crate) fn get_test_file_path(module_path: &str, name: &str) -> PathBuf {
    let mut path = get_test_data_path();
    for part in module_path.split("::").skip(1) {
        path = path.join(part);
    }
    path.join(format!("{name}.txt"))
}

pub(crate) fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// A bundle dump whose body is one `OP` node per label.
pub(crate) fn bundle_dump(name: &str, ops: &[&str]) -> String {
    let mut dump = format!(
        "Print Tree:\n-> {{ (BUNDLE_DEF)  (BB:1) (1, 1, 0, 0, 0)\n  -> BUNDLE_LABEL (BUNDLE_LABEL)\n    -> {name} (IDENT)\n"
    );
    for op in ops {
        dump.push_str(&format!("  -> {op} (OP)\n"));
    }
    dump
}

/// A function dump whose body is one `OP` node per label.
pub(crate) fn function_dump(name: &str, ops: &[&str]) -> String {
    let mut dump = format!(
        "-> {{ (FUNCTION_DEF)\n  -> FUNCTION_LABEL (FUNCTION_LABEL)\n    -> {name} (IDENT)\n"
    );
    for op in ops {
        dump.push_str(&format!("  -> {op} (OP)\n  -> ; (';')\n"));
    }
    dump
}

pub(crate) fn run_batch(
    hardware_dir: &Path,
    software: &Path,
    symbols: &Path,
    thresholds: Thresholds,
) -> anyhow::Result<MappingEngine<Inlined>> {
    Ok(MappingEngine::new(thresholds)
        .ingest_batch(hardware_dir, software, symbols)?
        .normalize()?
        .inline()?)
}

use std::path::PathBuf;

use crate::utils::{get_test_data_path, get_test_file_path};
use mcmap::{MappingEngine, Thresholds, UnitOutcome};
use mcmap_ast::forest::ForestPhase;
use mcmap_symbols::Resolution;

fn fixture(name: &str) -> PathBuf {
    get_test_file_path(module_path!(), name)
}

fn single_engine() -> anyhow::Result<MappingEngine<mcmap::Inlined>> {
    Ok(MappingEngine::default()
        .ingest_single(&fixture("hardware"), &fixture("software"), &fixture("symbols"))?
        .normalize()?
        .inline()?)
}

#[test]
fn test_single_mode_finds_inlined_function() -> anyhow::Result<()> {
    let engine = single_engine()?;
    assert_eq!(engine.hardware_units().collect::<Vec<_>>(), vec!["mac_bundle"]);

    let matches = engine.match_one("mac_bundle")?;
    assert_eq!(matches.matches.len(), 1);
    let best = matches.best().unwrap();
    assert_eq!(best.candidate, "mac");
    assert_eq!(best.candidate_index, 0);
    assert!((best.similarity - 1.0).abs() < 1e-12);
    Ok(())
}

#[test]
fn test_phases_are_tagged_along_the_way() -> anyhow::Result<()> {
    let ingested = MappingEngine::default().ingest_single(
        &fixture("hardware"),
        &fixture("software"),
        &fixture("symbols"),
    )?;
    assert_eq!(ingested.software_forest().phase(), ForestPhase::Parsed);
    assert_eq!(ingested.software_node_count("mac"), Some(17));

    let normalized = ingested.normalize()?;
    assert_eq!(normalized.software_forest().phase(), ForestPhase::Normalized);
    assert_eq!(normalized.hardware_forests()[0].phase(), ForestPhase::Normalized);
    assert_eq!(normalized.software_node_count("mac"), Some(10));
    assert_eq!(normalized.hardware_node_count("mac_bundle"), Some(11));

    let inlined = normalized.inline()?;
    assert_eq!(inlined.software_forest().phase(), ForestPhase::Inlined);
    assert_eq!(inlined.software_node_count("mac"), Some(11));

    let stats = inlined.inline_stats().unwrap();
    assert_eq!(stats.expanded, 1);
    assert_eq!(stats.cycles, 1);
    Ok(())
}

#[test]
fn test_annotation_resolves_symbols_of_the_match() -> anyhow::Result<()> {
    let engine = single_engine()?;
    let run = engine.match_all()?;
    let (unit, best) = run.best_overall().unwrap();
    assert_eq!(unit, "mac_bundle");

    let annotated = engine.annotate(best)?;
    let names: Vec<&str> = annotated.symbols.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["a", "acc", "b", "prod"]);
    assert!(annotated.symbols.iter().all(|s| s.is_resolved()));
    match &annotated.symbols[1].resolution {
        Resolution::Resolved(info) => assert_eq!(info.declaration, "static int acc;"),
        Resolution::Unresolved => panic!("acc should resolve"),
    }
    assert_eq!(
        annotated.tree,
        "\
-> { (DECL_DEF)
  -> LABEL (DECL_LABEL)
    -> mac (IDENT)
  -> = (ASSIGN_STMT)
    -> prod (IDENT)
    -> * (MUL_EXPR)
      -> a (IDENT)
      -> b (IDENT)
  -> += (ADD_ASSIGN_STMT)
    -> acc (IDENT)
    -> prod (IDENT)
"
    );

    let json = serde_json::to_value(&annotated)?;
    assert_eq!(json["result"]["candidate"], "mac");
    assert_eq!(json["result"]["hardware_unit"], "mac_bundle");
    Ok(())
}

#[test]
fn test_thresholds_from_config_file() -> anyhow::Result<()> {
    let path = get_test_data_path().join("pipeline").join("thresholds.toml");
    let engine = MappingEngine::from_config_file(&path)?;
    assert_eq!(engine.thresholds(), &Thresholds::default());

    let missing = get_test_data_path().join("pipeline").join("missing.toml");
    assert!(MappingEngine::from_config_file(&missing).is_err());
    Ok(())
}

#[test]
fn test_match_all_reports_every_unit() -> anyhow::Result<()> {
    let engine = single_engine()?;
    let run = engine.match_all()?;
    assert_eq!(run.outcomes().len(), 1);
    assert!(matches!(&run.outcomes()[0], UnitOutcome::Matched(m) if m.unit == "mac_bundle"));
    assert_eq!(run.results_for("mac_bundle").map(<[_]>::len), Some(1));
    assert!(run.results_for("other").is_none());
    assert!(run.skipped().is_empty());
    Ok(())
}

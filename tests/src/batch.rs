use mcmap::{MappingEngine, Thresholds, UnitOutcome, ingest::list_hardware_units};

use crate::utils::{bundle_dump, function_dump, run_batch, write_file};

const OPS: [&str; 5] = ["ld", "mul", "add", "shr", "st"];

#[test]
fn test_empty_hardware_directory() -> anyhow::Result<()> {
    let hw_dir = tempfile::tempdir()?;
    let dir = tempfile::tempdir()?;
    let software = write_file(dir.path(), "sw.txt", &function_dump("f", &OPS));
    let symbols = write_file(dir.path(), "symbols.txt", "");

    assert!(list_hardware_units(hw_dir.path())?.is_empty());
    let engine = run_batch(hw_dir.path(), &software, &symbols, Thresholds::default())?;
    assert_eq!(engine.hardware_units().count(), 0);

    let run = engine.match_batch()?;
    assert!(run.outcomes().is_empty());
    assert_eq!(run.accepted_count(), 0);
    assert!(run.best_overall().is_none());
    Ok(())
}

#[test]
fn test_one_malformed_file_among_ten() -> anyhow::Result<()> {
    let hw_dir = tempfile::tempdir()?;
    for i in 0..10 {
        let content = if i == 4 {
            "-> { (BUNDLE_DEF)\n  BUNDLE_LABEL without arrow\n".to_string()
        } else {
            bundle_dump(&format!("bundle_{i}"), &OPS[..=(i % 5)])
        };
        write_file(hw_dir.path(), &format!("unit_{i:02}.txt"), &content);
    }
    let dir = tempfile::tempdir()?;
    let software = write_file(dir.path(), "sw.txt", &function_dump("f", &OPS));
    let symbols = write_file(dir.path(), "symbols.txt", "");

    let engine = run_batch(hw_dir.path(), &software, &symbols, Thresholds::default())?;
    assert_eq!(engine.skipped().len(), 1);
    assert!(engine.skipped()[0].file.ends_with("unit_04.txt"));
    assert!(engine.skipped()[0].reason.contains(":2:"));

    let run = engine.match_batch()?;
    assert_eq!(run.outcomes().len(), 9);
    assert!(run.outcomes().iter().all(|o| matches!(o, UnitOutcome::Matched(_))));
    assert_eq!(run.skipped().len(), 1);
    assert!(run.results_for("bundle_4").is_none());

    // Bundles holding at least four of the five operations reach 0.8.
    let mut accepted: Vec<&str> = run.matches().map(|r| r.hardware_unit.as_str()).collect();
    accepted.sort_unstable();
    assert_eq!(accepted, vec!["bundle_3", "bundle_8", "bundle_9"]);
    Ok(())
}

#[test]
fn test_bounded_worker_pool_gives_the_same_run() -> anyhow::Result<()> {
    let hw_dir = tempfile::tempdir()?;
    for i in 0..6 {
        write_file(
            hw_dir.path(),
            &format!("{i}.txt"),
            &bundle_dump(&format!("b{i}"), &OPS[i % 5..]),
        );
    }
    let dir = tempfile::tempdir()?;
    let software: String = (0..5)
        .map(|i| function_dump(&format!("f{i}"), &OPS[i..]))
        .collect();
    let software = write_file(dir.path(), "sw.txt", &software);
    let symbols = write_file(dir.path(), "symbols.txt", "");

    let shared = run_batch(hw_dir.path(), &software, &symbols, Thresholds::default())?;
    let bounded = MappingEngine::default()
        .with_workers(1)?
        .ingest_batch(hw_dir.path(), &software, &symbols)?
        .normalize()?
        .inline()?;

    let expected = shared.match_all()?;
    assert_eq!(shared.match_batch()?, expected);
    assert_eq!(bounded.match_batch()?, expected);

    let units: Vec<&str> = expected.outcomes().iter().map(UnitOutcome::unit).collect();
    assert_eq!(units, vec!["b0", "b1", "b2", "b3", "b4", "b5"]);
    for (unit, candidate) in [("b0", "f0"), ("b3", "f3"), ("b5", "f0")] {
        let best = expected.results_for(unit).and_then(<[_]>::first).unwrap();
        assert_eq!(best.candidate, candidate);
        assert!((best.similarity - 1.0).abs() < 1e-12);
    }
    Ok(())
}

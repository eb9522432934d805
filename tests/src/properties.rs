use mcmap::{MappingEngine, Sources, Thresholds};
use mcmap_ast::{builder::Builder, nodes::Side};
use mcmap_matcher::{InlineExpander, MatchError, normalize};

use crate::utils::{bundle_dump, function_dump, get_test_data_path};

const OPS: [&str; 6] = ["ld", "ld", "mac", "add", "shr", "st"];

fn software() -> String {
    (1..=OPS.len())
        .map(|n| function_dump(&format!("take_{n}"), &OPS[..n]))
        .chain(std::iter::once(function_dump(
            "reversed",
            &["st", "shr", "add", "mac", "ld", "ld"],
        )))
        .collect()
}

fn accepted(threshold: f64) -> anyhow::Result<Vec<(String, String)>> {
    let hardware = [bundle_dump("full", &OPS), bundle_dump("half", &OPS[..3])];
    let named: Vec<(&str, &str)> = vec![
        ("full", hardware[0].as_str()),
        ("half", hardware[1].as_str()),
    ];
    let software = software();
    let engine = MappingEngine::new(Thresholds::new(2, 2.0, threshold)?)
        .ingest_sources(&Sources {
            hardware: &named,
            software: &software,
            symbols: "",
        })?
        .normalize()?
        .inline()?;
    Ok(engine
        .match_all()?
        .matches()
        .map(|r| (r.hardware_unit.clone(), r.candidate.clone()))
        .collect())
}

#[test]
fn test_normalize_is_idempotent_on_fixtures() -> anyhow::Result<()> {
    let data = get_test_data_path();
    for (side, file) in [
        (Side::Hardware, data.join("pipeline").join("hardware.txt")),
        (Side::Software, data.join("pipeline").join("software.txt")),
        (Side::Hardware, data.join("scenarios").join("vec_step.txt")),
        (Side::Software, data.join("scenarios").join("recursive.txt")),
    ] {
        let once = normalize(&Builder::new(side).build_forest_from_path(&file)?)?;
        let twice = normalize(&once)?;
        assert_eq!(once, twice, "{}", file.display());
    }
    Ok(())
}

#[test]
fn test_repeated_runs_are_identical() -> anyhow::Result<()> {
    let first = accepted(0.5)?;
    assert!(!first.is_empty());
    for _ in 0..4 {
        assert_eq!(accepted(0.5)?, first);
    }
    Ok(())
}

#[test]
fn test_raising_the_threshold_never_adds_matches() -> anyhow::Result<()> {
    let mut previous = accepted(0.0)?;
    for step in 1..=20 {
        let current = accepted(f64::from(step) / 20.0)?;
        assert!(
            current.iter().all(|pair| previous.contains(pair)),
            "threshold {} accepted {current:?}, previous {previous:?}",
            f64::from(step) / 20.0
        );
        previous = current;
    }
    Ok(())
}

#[test]
fn test_identical_trees_are_accepted_at_full_threshold() -> anyhow::Result<()> {
    let pairs = accepted(1.0)?;
    assert_eq!(
        pairs,
        vec![
            ("full".to_string(), "take_6".to_string()),
            ("half".to_string(), "take_3".to_string()),
        ]
    );
    Ok(())
}

#[test]
fn test_forest_phases_are_enforced_at_run_time() -> anyhow::Result<()> {
    let parsed = Builder::new(Side::Software).build_forest(&function_dump("f", &OPS))?;
    let expander = InlineExpander::new(&Thresholds::default());
    assert!(matches!(
        expander.expand(&parsed),
        Err(MatchError::InvalidState { .. })
    ));

    let (inlined, _) = expander.expand(&normalize(&parsed)?)?;
    assert!(matches!(
        expander.expand(&inlined),
        Err(MatchError::InvalidState { .. })
    ));
    assert!(normalize(&inlined).is_err());
    Ok(())
}

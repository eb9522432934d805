use std::path::PathBuf;

use crate::utils::get_test_file_path;
use mcmap_ast::{builder::Builder, forest::Forest, nodes::Side};
use mcmap_matcher::{
    GROWTH_FACTOR, HardwareUnit, InlineExpander, SimilarityScorer, Thresholds, match_all,
    normalize,
};

fn fixture(name: &str) -> PathBuf {
    get_test_file_path(module_path!(), name)
}

fn normalized(side: Side, name: &str) -> anyhow::Result<Forest> {
    let forest = Builder::new(side).build_forest_from_path(&fixture(name))?;
    Ok(normalize(&forest)?)
}

#[test]
fn test_five_operation_bundle_against_inlined_function() -> anyhow::Result<()> {
    let hardware = normalized(Side::Hardware, "vec_step")?;
    let software = normalized(Side::Software, "step")?;
    let thresholds = Thresholds::default();
    let (software, stats) = InlineExpander::new(&thresholds).expand(&software)?;
    assert_eq!(stats.expanded, 1);
    assert_eq!(software.node_count("step"), Some(8));

    let unit = HardwareUnit::all(&hardware).next().unwrap();
    assert_eq!(unit.name(), "vec_step");
    assert_eq!(unit.node_count(), 8);

    let results = match_all(&SimilarityScorer::new(&thresholds), &unit, &software, 0.8)?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].candidate, "step");
    assert!(results[0].similarity >= 0.8);
    Ok(())
}

#[test]
fn test_direct_and_mutual_recursion_terminate() -> anyhow::Result<()> {
    let software = normalized(Side::Software, "recursive")?;
    let (inlined, stats) = InlineExpander::configure(2, 2.0)?.expand(&software)?;

    // countdown keeps its self-call; even and odd each inline the other once.
    assert_eq!(stats.expanded, 2);
    assert_eq!(stats.cycles, 3);
    assert_eq!(
        inlined.render_subtree(inlined.get("countdown").unwrap()),
        software.render_subtree(software.get("countdown").unwrap())
    );
    assert_eq!(
        inlined.render_subtree(inlined.get("even").unwrap()),
        "\
-> { (DECL_DEF)
  -> LABEL (DECL_LABEL)
    -> even (IDENT)
  -> even (CALL_EXPR)
"
    );
    Ok(())
}

fn call_fan_out(declarations: usize, calls: usize) -> String {
    let mut dump = String::new();
    for i in 0..declarations {
        dump.push_str(&format!(
            "-> {{ (FUNCTION_DEF)\n  -> FUNCTION_LABEL (FUNCTION_LABEL)\n    -> f{i} (IDENT)\n  -> op (OP)\n"
        ));
        if i + 1 < declarations {
            let next = i + 1;
            for _ in 0..calls {
                dump.push_str(&format!("  -> f{next} (CALL_EXPR)\n"));
            }
        }
    }
    dump
}

#[test]
fn test_inline_growth_stays_proportional() -> anyhow::Result<()> {
    // Every function calls the next one several times, so unbounded inlining
    // grows with the number of declarations as well as their size.
    let thresholds = Thresholds::new(100, 100.0, 0.8)?.with_max_inline_chain(64)?;
    let expander = InlineExpander::new(&thresholds);
    for (declarations, calls) in [(12, 2), (25, 20), (50, 20), (100, 20)] {
        let dump = call_fan_out(declarations, calls);
        let software = normalize(&Builder::new(Side::Software).build_forest(&dump)?)?;
        let (inlined, stats) = expander.expand(&software)?;

        assert_eq!(inlined.len(), software.len());
        assert!(stats.budget_limited > 0);
        assert!(
            inlined.total_nodes() <= (GROWTH_FACTOR + 1) * software.total_nodes(),
            "{declarations} declarations: {} nodes from {}",
            inlined.total_nodes(),
            software.total_nodes()
        );
    }
    Ok(())
}

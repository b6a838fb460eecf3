use crate::{
    DerivativeCache, DerivativeOrder, Emitter, MultiIndex, Variable, VariableList, XcError, parse,
};
use std::collections::HashMap;
use Variable::*;

fn vars(list: &[Variable]) -> VariableList {
    VariableList::new(list.iter().copied()).unwrap()
}

fn point() -> HashMap<&'static str, f64> {
    [("ra", 0.7), ("rb", 0.4), ("ga", 0.3), ("gb", 0.2), ("gab", 0.1)]
        .into_iter()
        .collect()
}

#[test]
fn test_scenario_single_variable_first_order() {
    let base = parse("ra^(4/3)").unwrap();
    let cache = DerivativeCache::build(base, vars(&[Ra]), DerivativeOrder::FIRST).unwrap();
    let statements = Emitter::new().statements(&cache, DerivativeOrder::FIRST).unwrap();
    assert_eq!(statements.len(), 1);
    assert_eq!(statements[0].slot, "df1000");
    assert_eq!(statements[0].rhs, "1.3333333333333333*pow(ra, 0.33333333333333326)");
}

#[test]
fn test_scenario_two_variables_second_order() {
    let base = parse("ra*ga^2").unwrap();
    let cache = DerivativeCache::build(base, vars(&[Ra, Ga]), DerivativeOrder::SECOND).unwrap();
    let statements = Emitter::new().statements(&cache, DerivativeOrder::SECOND).unwrap();
    let slots: Vec<&str> = statements.iter().map(|s| s.slot.as_str()).collect();
    assert_eq!(slots, ["df1000", "df0010", "df2000", "df1010", "df0020"]);

    let zero: Vec<bool> = statements.iter().map(|s| s.is_zero()).collect();
    assert_eq!(zero, [false, false, true, false, false]);

    let block = Emitter::new().block(&cache, DerivativeOrder::SECOND).unwrap();
    for line in block.lines().filter(|l| !l.is_empty()) {
        assert_eq!(line.contains("df2000"), line.trim_start().starts_with("//"), "{line}");
    }
}

#[test]
fn test_scenario_order_five_is_rejected() {
    let err = DerivativeOrder::new(5).unwrap_err();
    assert_eq!(err, XcError::InvalidOrder(5));
    assert!(err.is_config_error());
    assert!(matches!(
        crate::derivative_block("ra", &[Ra], 5),
        Err(XcError::InvalidOrder(5))
    ));
}

#[test]
fn test_higher_order_contains_lower() {
    let base = parse("exp(-ra*ga)*rb^2 + gab*ra").unwrap();
    let list = vars(&Variable::ALL);
    let mut previous: Option<DerivativeCache> = None;
    for order in DerivativeOrder::FOURTH.up_to() {
        let cache = DerivativeCache::build(base.clone(), list.clone(), order).unwrap();
        if let Some(prev) = &previous {
            let top = DerivativeOrder::new(prev.max_order() as u8).unwrap();
            for (index, expr) in prev.iter_up_to(top) {
                assert_eq!(cache.get(&index), Some(expr), "{index}");
            }
            assert!(cache.len() > prev.len());
        }
        previous = Some(cache);
    }
}

#[test]
fn test_every_entry_matches_direct_differentiation() {
    // each entry equals differentiating the base along the sorted path from scratch
    let base = parse("ra^2*ga + sin(rb*ga)").unwrap();
    let list = vars(&[Ra, Rb, Ga]);
    let cache = DerivativeCache::build(base.clone(), list, DerivativeOrder::THIRD).unwrap();
    let diff = crate::Diff::new();
    let at = point();
    for (index, expr) in cache.iter_up_to(DerivativeOrder::THIRD) {
        let mut direct = base.clone();
        for var in Variable::ALL {
            for _ in 0..index.count(var) {
                direct = diff.differentiate(&direct, var.name()).unwrap();
            }
        }
        let a = expr.eval_f64(&at).unwrap();
        let b = direct.eval_f64(&at).unwrap();
        assert!((a - b).abs() <= 1e-10 * (1.0 + b.abs()), "{index}: {a} vs {b}");
    }
}

#[test]
fn test_gab_slots_have_five_digits() {
    let cache = DerivativeCache::build(
        parse("ra*rb*gab").unwrap(),
        vars(&Variable::ALL),
        DerivativeOrder::SECOND,
    )
    .unwrap();
    let names: Vec<String> = cache
        .layer(DerivativeOrder::SECOND)
        .iter()
        .map(MultiIndex::slot_name)
        .collect();
    assert!(names.contains(&"df01001".to_string()));
    assert!(names.contains(&"df00002".to_string()));
    assert!(names.contains(&"df1100".to_string()));
    assert_eq!(
        cache.get_by_path(&[Gab, Rb]).and_then(|e| e.eval_f64(&point()).ok()),
        Some(0.7)
    );
}

#[test]
fn test_variable_list_order_drives_enumeration() {
    let base = parse("ra*ga").unwrap();
    let cache = DerivativeCache::build(base, vars(&[Ga, Ra]), DerivativeOrder::SECOND).unwrap();
    let names: Vec<String> = cache
        .iter_up_to(DerivativeOrder::SECOND)
        .map(|(idx, _)| idx.slot_name())
        .collect();
    assert_eq!(names, ["df0010", "df1000", "df0020", "df1010", "df2000"]);
}

#[cfg(feature = "parallel")]
#[test]
fn test_single_thread_and_parallel_builds_agree() {
    let base = parse("ra^(4/3)*exp(-ga*rb) + atan(gab)").unwrap();
    let list = vars(&Variable::ALL);
    let build = || DerivativeCache::build(base.clone(), list.clone(), DerivativeOrder::THIRD);
    let on_pool = |threads: usize| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap()
            .install(&build)
            .unwrap()
    };

    let single = on_pool(1);
    let parallel = on_pool(4);
    let default = build().unwrap();

    let expected: Vec<_> = single.iter_up_to(DerivativeOrder::THIRD).collect();
    assert_eq!(expected.len(), 5 + 15 + 35);
    for cache in [&parallel, &default] {
        let entries: Vec<_> = cache.iter_up_to(DerivativeOrder::THIRD).collect();
        assert_eq!(entries, expected);
    }
}

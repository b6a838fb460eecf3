use crate::{
    DerivativeCache, DerivativeOrder, Emitter, Expr, SymbolMap, Variable, VariableList,
    comment_zero_lines, parse, render_c,
};

#[test]
fn test_comment_zero_lines_is_idempotent() {
    let code = "\n  ds->df1000 += (2)*factor;\n  ds->df2000 += (0)*factor;\n";
    let once = comment_zero_lines(code);
    assert_eq!(comment_zero_lines(&once), once);
    assert!(once.contains("\n  // ds->df2000 += (0)*factor;\n"));
    assert!(once.contains("\n  ds->df1000 += (2)*factor;\n"));
}

#[test]
fn test_zero_only_means_literal_zero() {
    // a nonzero constant that merely contains a 0 digit stays active
    let code = "  ds->df1000 += (10)*factor;\n  ds->df0100 += (0.5)*factor;\n";
    assert_eq!(comment_zero_lines(code), code);
}

#[test]
fn test_render_density_accessors() {
    let expr = parse("ra*rb + ga*gb - gab").unwrap();
    assert_eq!(
        render_c(&expr, &SymbolMap::density()).unwrap(),
        "dp->rhoa*dp->rhob + dp->grada*dp->gradb - dp->gradab"
    );
}

#[test]
fn test_render_custom_symbols() {
    let symbols = SymbolMap::constants().with("PREF", "pref_value");
    let expr = Expr::symbol("PREF") * Expr::symbol("pi");
    assert_eq!(render_c(&expr, &symbols).unwrap(), "pref_value*M_PI");
}

#[test]
fn test_fourth_order_block_sizes() {
    let cache = DerivativeCache::build(
        parse("ra^(4/3)*ga").unwrap(),
        VariableList::new([Variable::Ra, Variable::Ga]).unwrap(),
        DerivativeOrder::FOURTH,
    )
    .unwrap();
    let emitter = Emitter::new();
    // 2 + 3 + 4 + 5 statements, three blank separators
    let block = emitter.block(&cache, DerivativeOrder::FOURTH).unwrap();
    assert_eq!(block.lines().count(), 14 + 3);
    assert_eq!(block.lines().filter(|l| l.is_empty()).count(), 3);
    // linear in ga: every statement with two or more ga derivatives is zero
    for line in block.lines() {
        let commented = line.trim_start().starts_with("//");
        let ga_twice = ["df0020", "df1020", "df0030", "df2020", "df1030", "df0040"]
            .iter()
            .any(|slot| line.contains(slot));
        assert_eq!(commented, ga_twice, "{line}");
    }
}

#[test]
fn test_unrenderable_derivative_fails_block() {
    // an infinite coefficient survives simplification but has no C spelling
    let cache = DerivativeCache::build(
        Expr::number(f64::INFINITY) * Expr::symbol("ra").pow_of(2.0),
        VariableList::new([Variable::Ra]).unwrap(),
        DerivativeOrder::FIRST,
    )
    .unwrap();
    assert!(matches!(
        Emitter::new().block(&cache, DerivativeOrder::FIRST),
        Err(crate::XcError::Unrenderable(_))
    ));
}

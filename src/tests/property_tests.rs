//! Property-based tests
//!
//! Uses quickcheck for:
//! - Parser robustness on arbitrary input
//! - Commutativity of mixed partial derivatives, checked numerically
//! - Path independence of multi-indices and slot names
//! - Idempotence of zero-statement commenting

use quickcheck::{Arbitrary, Gen, QuickCheck, TestResult};
use std::collections::HashMap;

use crate::{
    DerivativeCache, DerivativeOrder, Diff, Emitter, MultiIndex, Variable, VariableList,
    comment_zero_lines, parse,
};

// ============================================================
// EXPRESSION GENERATORS
// ============================================================

const ATOMS: [&str; 3] = ["ra", "rb", "ga"];

/// Random smooth expression over ra, rb and ga
fn random_formula(g: &mut Gen, depth: usize) -> String {
    if depth == 0 {
        return match u8::arbitrary(g) % 4 {
            0 => format!("{}", 1 + u8::arbitrary(g) % 5),
            _ => ATOMS[usize::arbitrary(g) % ATOMS.len()].to_string(),
        };
    }
    match u8::arbitrary(g) % 8 {
        0 | 1 => {
            let op = ["+", "-", "*"][usize::arbitrary(g) % 3];
            format!(
                "({} {op} {})",
                random_formula(g, depth - 1),
                random_formula(g, depth - 1)
            )
        }
        2 => format!("{}/(1 + {}^2)", random_formula(g, depth - 1), random_formula(g, depth - 1)),
        3 => format!("{}^{}", random_formula(g, depth - 1), 2 + u8::arbitrary(g) % 2),
        4 => {
            let f = ["exp", "sin", "cos", "atan", "tanh"][usize::arbitrary(g) % 5];
            format!("{f}({})", random_formula(g, depth - 1))
        }
        _ => random_formula(g, depth - 1),
    }
}

#[derive(Clone, Debug)]
struct Formula(String);

impl Arbitrary for Formula {
    fn arbitrary(g: &mut Gen) -> Self {
        Formula(random_formula(g, 3))
    }
}

#[derive(Clone, Debug)]
struct Path(Vec<Variable>);

impl Arbitrary for Path {
    fn arbitrary(g: &mut Gen) -> Self {
        let len = 1 + usize::arbitrary(g) % 4;
        Path(
            (0..len)
                .map(|_| Variable::ALL[usize::arbitrary(g) % Variable::ALL.len()])
                .collect(),
        )
    }
}

fn sample_point() -> HashMap<&'static str, f64> {
    [("ra", 0.37), ("rb", 0.81), ("ga", 0.52)].into_iter().collect()
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-8 * (1.0 + a.abs().max(b.abs()))
}

// ============================================================
// PARSER
// ============================================================

#[test]
fn test_parser_never_panics_on_random_input() {
    fn prop_parser_no_panic(input: String) -> TestResult {
        let _ = parse(&input);
        TestResult::passed()
    }
    QuickCheck::new()
        .tests(1000)
        .quickcheck(prop_parser_no_panic as fn(String) -> TestResult);
}

#[test]
fn test_generated_formulas_parse() {
    fn prop_parses(f: Formula) -> bool {
        parse(&f.0).is_ok()
    }
    QuickCheck::new()
        .tests(300)
        .quickcheck(prop_parses as fn(Formula) -> bool);
}

// ============================================================
// DERIVATIVES
// ============================================================

#[test]
fn test_mixed_partials_commute() {
    fn prop_commute(f: Formula, a: u8, b: u8) -> TestResult {
        let x = ATOMS[a as usize % ATOMS.len()];
        let y = ATOMS[b as usize % ATOMS.len()];
        let Ok(expr) = parse(&f.0) else {
            return TestResult::discard();
        };
        let diff = Diff::new();
        let xy = diff
            .differentiate(&expr, x)
            .and_then(|d| diff.differentiate(&d, y));
        let yx = diff
            .differentiate(&expr, y)
            .and_then(|d| diff.differentiate(&d, x));
        let (Ok(xy), Ok(yx)) = (xy, yx) else {
            return TestResult::failed();
        };
        let point = sample_point();
        match (xy.eval_f64(&point), yx.eval_f64(&point)) {
            (Ok(p), Ok(q)) if p.is_finite() && q.is_finite() => {
                TestResult::from_bool(approx_eq(p, q))
            }
            _ => TestResult::discard(),
        }
    }
    QuickCheck::new()
        .tests(200)
        .quickcheck(prop_commute as fn(Formula, u8, u8) -> TestResult);
}

#[test]
fn test_cache_entries_match_every_path() {
    // the cached entry for a multi-index equals differentiating along any
    // ordering of its path
    fn prop_any_path(f: Formula, rotate: u8) -> TestResult {
        let Ok(expr) = parse(&f.0) else {
            return TestResult::discard();
        };
        let vars = VariableList::new([Variable::Ra, Variable::Rb, Variable::Ga]).unwrap();
        let Ok(cache) = DerivativeCache::build(expr.clone(), vars, DerivativeOrder::THIRD) else {
            return TestResult::failed();
        };
        let point = sample_point();
        let diff = Diff::new();
        for (index, cached) in cache.iter_up_to(DerivativeOrder::THIRD) {
            let mut path: Vec<Variable> = Variable::ALL
                .iter()
                .flat_map(|&v| std::iter::repeat_n(v, index.count(v) as usize))
                .collect();
            let len = path.len();
            path.rotate_left(rotate as usize % len);
            let mut direct = expr.clone();
            for v in &path {
                match diff.differentiate(&direct, v.name()) {
                    Ok(d) => direct = d,
                    Err(_) => return TestResult::failed(),
                }
            }
            match (cached.eval_f64(&point), direct.eval_f64(&point)) {
                (Ok(p), Ok(q)) if p.is_finite() && q.is_finite() => {
                    if !approx_eq(p, q) {
                        return TestResult::failed();
                    }
                }
                _ => return TestResult::discard(),
            }
        }
        TestResult::passed()
    }
    QuickCheck::new()
        .tests(40)
        .quickcheck(prop_any_path as fn(Formula, u8) -> TestResult);
}

#[test]
fn test_slot_name_ignores_path_order() {
    fn prop_reversed(path: Path) -> bool {
        let mut reversed = path.0.clone();
        reversed.reverse();
        let a = MultiIndex::from_path(&path.0).unwrap();
        let b = MultiIndex::from_path(&reversed).unwrap();
        a == b && a.slot_name() == b.slot_name() && a.order() == path.0.len()
    }
    QuickCheck::new()
        .tests(500)
        .quickcheck(prop_reversed as fn(Path) -> bool);
}

#[test]
fn test_extending_never_evicts() {
    fn prop_monotonic(f: Formula) -> TestResult {
        let Ok(expr) = parse(&f.0) else {
            return TestResult::discard();
        };
        let vars = VariableList::new([Variable::Ra, Variable::Ga]).unwrap();
        let mut cache = DerivativeCache::new(expr, vars);
        let mut seen = Vec::new();
        for order in DerivativeOrder::FOURTH.up_to() {
            if cache.extend_to(order).is_err() {
                return TestResult::failed();
            }
            for (index, expr) in &seen {
                if cache.get(index) != Some(expr) {
                    return TestResult::failed();
                }
            }
            seen = cache
                .iter_up_to(order)
                .map(|(i, e)| (i, e.clone()))
                .collect();
        }
        TestResult::from_bool(cache.len() == 2 + 3 + 4 + 5)
    }
    QuickCheck::new()
        .tests(30)
        .quickcheck(prop_monotonic as fn(Formula) -> TestResult);
}

// ============================================================
// EMISSION
// ============================================================

#[test]
fn test_comment_zero_lines_idempotent() {
    fn prop_idempotent(lines: Vec<(u8, bool)>) -> bool {
        let code: String = lines
            .iter()
            .map(|&(slot, zero)| {
                let rhs = if zero { "0".to_string() } else { format!("{slot}") };
                format!("  ds->df{slot:04} += ({rhs})*factor;\n")
            })
            .collect();
        let once = comment_zero_lines(&code);
        comment_zero_lines(&once) == once
            && once.lines().count() == code.lines().count()
    }
    QuickCheck::new()
        .tests(300)
        .quickcheck(prop_idempotent as fn(Vec<(u8, bool)>) -> bool);
}

#[test]
fn test_block_output_is_stable() {
    fn prop_stable(f: Formula) -> TestResult {
        let Ok(expr) = parse(&f.0) else {
            return TestResult::discard();
        };
        let vars = VariableList::new([Variable::Ra, Variable::Rb]).unwrap();
        let build = || {
            DerivativeCache::build(expr.clone(), vars.clone(), DerivativeOrder::SECOND)
                .and_then(|c| Emitter::new().block(&c, DerivativeOrder::SECOND))
        };
        match (build(), build()) {
            (Ok(a), Ok(b)) => TestResult::from_bool(a == b),
            _ => TestResult::discard(),
        }
    }
    QuickCheck::new()
        .tests(50)
        .quickcheck(prop_stable as fn(Formula) -> TestResult);
}

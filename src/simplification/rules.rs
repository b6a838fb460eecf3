//! Rewrite rules applied node by node by the engine
//!
//! Every rule sees a node whose children are already simplified and returns
//! `Some(new)` only when it changes something.

use crate::ast::{EULER, PI};
use crate::functions::registry::Registry;
use crate::variables::Variable;
use crate::{Expr, ExprKind};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;

/// Relative size below which a collected coefficient counts as cancelled
const CANCEL_TOLERANCE: f64 = 1e-12;

/// Expression kind for fast rule filtering
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum NodeKind {
    Number,
    Symbol,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Function,
}

impl NodeKind {
    #[inline]
    pub(crate) fn of(expr: &Expr) -> Self {
        match &expr.kind {
            ExprKind::Number(_) => NodeKind::Number,
            ExprKind::Symbol(_) => NodeKind::Symbol,
            ExprKind::Add(_, _) => NodeKind::Add,
            ExprKind::Sub(_, _) => NodeKind::Sub,
            ExprKind::Mul(_, _) => NodeKind::Mul,
            ExprKind::Div(_, _) => NodeKind::Div,
            ExprKind::Pow(_, _) => NodeKind::Pow,
            ExprKind::FunctionCall { .. } => NodeKind::Function,
        }
    }
}

/// Context passed to rules during application
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct RuleContext {
    pub domain_safe: bool,
}

/// Core trait for all simplification rules
pub(crate) trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Higher runs first
    fn priority(&self) -> i32;

    /// Rules that are only valid for positive bases
    fn alters_domain(&self) -> bool {
        false
    }

    fn applies_to(&self) -> &'static [NodeKind];

    fn apply(&self, expr: &Expr, context: &RuleContext) -> Option<Expr>;
}

/// All rules, sorted by descending priority
pub(crate) fn all_rules() -> Vec<Box<dyn Rule>> {
    let mut rules: Vec<Box<dyn Rule>> = vec![
        Box::new(NumericFoldRule),
        Box::new(IdentityRule),
        Box::new(FunctionFoldRule),
        Box::new(DivToPowRule),
        Box::new(PowerOfPowerRule),
        Box::new(PowerOfProductRule),
        Box::new(CollectFactorsRule),
        Box::new(CollectTermsRule),
    ];
    rules.sort_by_key(|r| std::cmp::Reverse(r.priority()));
    rules
}

fn finite(n: f64) -> Option<Expr> {
    n.is_finite().then(|| Expr::number(n))
}

/// Constant folding: 2 * 3 -> 6, 4 / 3 -> 1.333..
///
/// Results that are not finite (1/0, (-8)^(1/3)) are left unfolded.
pub(crate) struct NumericFoldRule;

impl Rule for NumericFoldRule {
    fn name(&self) -> &'static str {
        "numeric_fold"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[
            NodeKind::Add,
            NodeKind::Sub,
            NodeKind::Mul,
            NodeKind::Div,
            NodeKind::Pow,
        ]
    }

    fn apply(&self, expr: &Expr, _context: &RuleContext) -> Option<Expr> {
        match &expr.kind {
            ExprKind::Add(u, v) => finite(u.as_number()? + v.as_number()?),
            ExprKind::Sub(u, v) => finite(u.as_number()? - v.as_number()?),
            ExprKind::Mul(u, v) => finite(u.as_number()? * v.as_number()?),
            ExprKind::Div(u, v) => finite(u.as_number()? / v.as_number()?),
            ExprKind::Pow(u, v) => finite(u.as_number()?.powf(v.as_number()?)),
            _ => None,
        }
    }
}

/// Neutral and absorbing elements: x + 0, x * 1, x * 0, x^1, x^0, 1^x, x / 1
pub(crate) struct IdentityRule;

impl Rule for IdentityRule {
    fn name(&self) -> &'static str {
        "identities"
    }

    fn priority(&self) -> i32 {
        95
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[
            NodeKind::Add,
            NodeKind::Sub,
            NodeKind::Mul,
            NodeKind::Div,
            NodeKind::Pow,
        ]
    }

    fn apply(&self, expr: &Expr, _context: &RuleContext) -> Option<Expr> {
        match &expr.kind {
            ExprKind::Add(u, v) => {
                if u.is_zero_num() {
                    Some((**v).clone())
                } else if v.is_zero_num() {
                    Some((**u).clone())
                } else {
                    None
                }
            }
            ExprKind::Sub(u, v) => {
                if v.is_zero_num() {
                    Some((**u).clone())
                } else if u.is_zero_num() {
                    Some((**v).clone().negate())
                } else if u == v {
                    Some(Expr::number(0.0))
                } else {
                    None
                }
            }
            ExprKind::Mul(u, v) => {
                if u.is_zero_num() || v.is_zero_num() {
                    Some(Expr::number(0.0))
                } else if u.is_one_num() {
                    Some((**v).clone())
                } else if v.is_one_num() {
                    Some((**u).clone())
                } else {
                    None
                }
            }
            ExprKind::Div(u, v) => {
                if v.is_one_num() {
                    Some((**u).clone())
                } else if u.is_zero_num() && !v.is_zero_num() {
                    Some(Expr::number(0.0))
                } else {
                    None
                }
            }
            ExprKind::Pow(u, v) => {
                if v.is_one_num() {
                    Some((**u).clone())
                } else if v.is_zero_num() || u.is_one_num() {
                    Some(Expr::number(1.0))
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

/// Evaluate calls on numbers when the result is a whole number: exp(0) -> 1, sqrt(4) -> 2
///
/// Other values such as sqrt(2) stay symbolic so the C code keeps the call.
pub(crate) struct FunctionFoldRule;

impl Rule for FunctionFoldRule {
    fn name(&self) -> &'static str {
        "function_fold"
    }

    fn priority(&self) -> i32 {
        90
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Function]
    }

    fn apply(&self, expr: &Expr, _context: &RuleContext) -> Option<Expr> {
        let ExprKind::FunctionCall { name, args } = &expr.kind else {
            return None;
        };
        let values: Option<Vec<f64>> = args.iter().map(Expr::as_number).collect();
        let def = Registry::lookup(name, args.len()).ok()?;
        let value = (def.eval)(&values?)?;
        (value.is_finite() && value.fract() == 0.0).then(|| Expr::number(value))
    }
}

/// a / b -> a * b^-1, and a / n -> (1/n) * a for numbers
pub(crate) struct DivToPowRule;

impl Rule for DivToPowRule {
    fn name(&self) -> &'static str {
        "div_to_pow"
    }

    fn priority(&self) -> i32 {
        80
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Div]
    }

    fn apply(&self, expr: &Expr, _context: &RuleContext) -> Option<Expr> {
        let ExprKind::Div(u, v) = &expr.kind else {
            return None;
        };
        if let Some(n) = v.as_number() {
            let inverse = 1.0 / n;
            return inverse
                .is_finite()
                .then(|| Expr::mul_expr(Expr::number(inverse), (**u).clone()));
        }
        let inverse = Expr::pow((**v).clone(), Expr::number(-1.0));
        Some(if u.is_one_num() {
            inverse
        } else {
            Expr::mul_expr((**u).clone(), inverse)
        })
    }
}

/// (x^a)^b -> x^(a*b) for numeric a and b
///
/// An even integer `a` hides the sign of `x`, so unless `x` is known to be
/// non-negative the result is `abs(x)^(a*b)`; `((ra-rb)^2)^(1/2)` is `abs(ra-rb)`.
pub(crate) struct PowerOfPowerRule;

impl Rule for PowerOfPowerRule {
    fn name(&self) -> &'static str {
        "power_of_power"
    }

    fn priority(&self) -> i32 {
        70
    }

    fn alters_domain(&self) -> bool {
        true
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Pow]
    }

    fn apply(&self, expr: &Expr, _context: &RuleContext) -> Option<Expr> {
        let ExprKind::Pow(inner, outer) = &expr.kind else {
            return None;
        };
        let ExprKind::Pow(base, exp) = &inner.kind else {
            return None;
        };
        let inner_n = exp.as_number()?;
        let combined = inner_n * outer.as_number()?;
        let base = if is_even_integer(inner_n)
            && !is_even_integer(combined)
            && !is_non_negative(base)
        {
            Expr::func("abs", (**base).clone())
        } else {
            (**base).clone()
        };
        Some(Expr::pow(base, Expr::number(combined)))
    }
}

/// (x * y)^n -> x^n * y^n for numeric n
///
/// A non-integer `n` is only distributed over factors that cannot be negative.
pub(crate) struct PowerOfProductRule;

impl Rule for PowerOfProductRule {
    fn name(&self) -> &'static str {
        "power_of_product"
    }

    fn priority(&self) -> i32 {
        70
    }

    fn alters_domain(&self) -> bool {
        true
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Pow]
    }

    fn apply(&self, expr: &Expr, _context: &RuleContext) -> Option<Expr> {
        let ExprKind::Pow(base, exp) = &expr.kind else {
            return None;
        };
        let n = exp.as_number()?;
        let ExprKind::Mul(u, v) = &base.kind else {
            return None;
        };
        if n.fract() != 0.0 && !(is_non_negative(u) && is_non_negative(v)) {
            return None;
        }
        Some(Expr::mul_expr(
            Expr::pow((**u).clone(), Expr::number(n)),
            Expr::pow((**v).clone(), Expr::number(n)),
        ))
    }
}

fn is_even_integer(n: f64) -> bool {
    n.fract() == 0.0 && n % 2.0 == 0.0
}

/// Sign known from the structure alone: densities, gradient norms, `pi`, `e`,
/// non-negative numbers, `abs`, and products and powers of those
fn is_non_negative(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Number(n) => *n >= 0.0,
        ExprKind::Symbol(name) if name == PI || name == EULER => true,
        ExprKind::Symbol(name) => name
            .parse::<Variable>()
            .is_ok_and(Variable::is_non_negative),
        ExprKind::Mul(u, v) => is_non_negative(u) && is_non_negative(v),
        ExprKind::Pow(base, exp) => {
            is_non_negative(base) || exp.as_number().is_some_and(is_even_integer)
        }
        ExprKind::FunctionCall { name, .. } => name == "abs",
        _ => false,
    }
}

/// Canonical products: one leading coefficient, equal bases merged, factors sorted
///
/// `ra * 2 * ra^2 * ga` becomes `2 * ga * ra^3`.
pub(crate) struct CollectFactorsRule;

impl Rule for CollectFactorsRule {
    fn name(&self) -> &'static str {
        "collect_factors"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Mul]
    }

    fn apply(&self, expr: &Expr, _context: &RuleContext) -> Option<Expr> {
        let mut factors = Vec::new();
        flatten_product(expr, &mut factors);

        let mut coeff = 1.0;
        let mut index: FxHashMap<Expr, usize> = FxHashMap::default();
        let mut groups: Vec<(Expr, f64)> = Vec::new();
        for factor in factors {
            if let Some(n) = factor.as_number() {
                coeff *= n;
                continue;
            }
            let (base, exp) = split_power(&factor);
            match index.get(&base) {
                Some(&i) => groups[i].1 += exp,
                None => {
                    index.insert(base.clone(), groups.len());
                    groups.push((base, exp));
                }
            }
        }

        if coeff == 0.0 {
            return Some(Expr::number(0.0));
        }
        groups.retain(|(_, exp)| *exp != 0.0);
        let mut keyed: Vec<(String, Expr)> = groups
            .into_iter()
            .map(|(base, exp)| {
                let key = base.to_string();
                let factor = if exp == 1.0 { base } else { base.pow_of(exp) };
                (key, factor)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        let rebuilt = build_product(coeff, keyed.into_iter().map(|(_, f)| f));
        (rebuilt != *expr).then_some(rebuilt)
    }
}

/// Canonical sums: like terms collected, cancelled terms dropped, terms sorted
///
/// Negative terms are written back as subtractions: `2*ra - ga`.
pub(crate) struct CollectTermsRule;

impl Rule for CollectTermsRule {
    fn name(&self) -> &'static str {
        "collect_terms"
    }

    fn priority(&self) -> i32 {
        40
    }

    fn applies_to(&self) -> &'static [NodeKind] {
        &[NodeKind::Add, NodeKind::Sub]
    }

    fn apply(&self, expr: &Expr, _context: &RuleContext) -> Option<Expr> {
        let mut terms = Vec::new();
        flatten_sum(expr, 1.0, &mut terms);

        let mut constant = 0.0;
        let mut index: FxHashMap<Expr, usize> = FxHashMap::default();
        // (rest, summed coefficient, largest contributing magnitude)
        let mut groups: Vec<(Expr, f64, f64)> = Vec::new();
        for (coeff, rest) in terms {
            let Some(rest) = rest else {
                constant += coeff;
                continue;
            };
            match index.get(&rest) {
                Some(&i) => {
                    groups[i].1 += coeff;
                    groups[i].2 = groups[i].2.max(coeff.abs());
                }
                None => {
                    index.insert(rest.clone(), groups.len());
                    groups.push((rest, coeff, coeff.abs()));
                }
            }
        }

        let mut keyed: Vec<(String, f64, Expr)> = groups
            .into_iter()
            .filter(|(_, sum, scale)| sum.abs() > CANCEL_TOLERANCE * scale)
            .map(|(rest, sum, _)| (rest.to_string(), sum, rest))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        let mut parts: Vec<(f64, Option<Expr>)> = Vec::with_capacity(keyed.len() + 1);
        if constant != 0.0 {
            parts.push((constant, None));
        }
        parts.extend(keyed.into_iter().map(|(_, coeff, rest)| (coeff, Some(rest))));

        let rebuilt = build_sum(parts);
        (rebuilt != *expr).then_some(rebuilt)
    }
}

// ===== Shared helpers =====

fn flatten_product(expr: &Expr, out: &mut Vec<Expr>) {
    match &expr.kind {
        ExprKind::Mul(u, v) => {
            flatten_product(u, out);
            flatten_product(v, out);
        }
        _ => out.push(expr.clone()),
    }
}

/// Split `x^n` (numeric n) into `(x, n)`; anything else is `(expr, 1)`
fn split_power(expr: &Expr) -> (Expr, f64) {
    if let ExprKind::Pow(base, exp) = &expr.kind
        && let Some(n) = exp.as_number()
    {
        return ((**base).clone(), n);
    }
    (expr.clone(), 1.0)
}

/// Left-folded product with the coefficient first (omitted when it is 1)
fn build_product(coeff: f64, factors: impl IntoIterator<Item = Expr>) -> Expr {
    let mut iter = factors.into_iter();
    let Some(first) = iter.next() else {
        return Expr::number(coeff);
    };
    let start = if coeff == 1.0 {
        first
    } else {
        Expr::mul_expr(Expr::number(coeff), first)
    };
    iter.fold(start, Expr::mul_expr)
}

/// Flatten Add/Sub into signed `(coefficient, rest)` terms; `rest == None` is a constant
fn flatten_sum(expr: &Expr, sign: f64, out: &mut Vec<(f64, Option<Expr>)>) {
    match &expr.kind {
        ExprKind::Add(u, v) => {
            flatten_sum(u, sign, out);
            flatten_sum(v, sign, out);
        }
        ExprKind::Sub(u, v) => {
            flatten_sum(u, sign, out);
            flatten_sum(v, -sign, out);
        }
        ExprKind::Number(n) => out.push((sign * n, None)),
        ExprKind::Mul(_, _) => {
            let mut factors = Vec::new();
            flatten_product(expr, &mut factors);
            let mut coeff = sign;
            let mut rest = Vec::with_capacity(factors.len());
            for factor in factors {
                match factor.as_number() {
                    Some(n) => coeff *= n,
                    None => rest.push(factor),
                }
            }
            if rest.is_empty() {
                out.push((coeff, None));
            } else {
                out.push((coeff, Some(build_product(1.0, rest))));
            }
        }
        _ => out.push((sign, Some(expr.clone()))),
    }
}

/// Left-folded sum; negative coefficients after the first term become subtractions
fn build_sum(parts: Vec<(f64, Option<Expr>)>) -> Expr {
    let term = |coeff: f64, rest: Option<Expr>| match rest {
        Some(rest) => build_product(coeff, [rest]),
        None => Expr::number(coeff),
    };

    let mut iter = parts.into_iter();
    let Some((coeff, rest)) = iter.next() else {
        return Expr::number(0.0);
    };
    let mut acc = term(coeff, rest);
    for (coeff, rest) in iter {
        acc = match coeff.partial_cmp(&0.0) {
            Some(Ordering::Less) => Expr::sub_expr(acc, term(-coeff, rest)),
            _ => Expr::add_expr(acc, term(coeff, rest)),
        };
    }
    acc
}

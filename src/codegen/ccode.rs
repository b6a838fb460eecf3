//! C99 rendering of expressions
//!
//! The output follows the conventions of the host program's hand-written
//! functionals: `pow(x, n)` for powers, `sqrt(x)` for square roots, `x/y`
//! for reciprocal factors, and `M_PI`/`M_E` for the constants.

use crate::ast::{EULER, PI};
use crate::functions::registry::Registry;
use crate::variables::Variable;
use crate::{Expr, ExprKind, Result, XcError};
use rustc_hash::FxHashMap;

/// How symbols are spelled in the generated C
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolMap {
    names: FxHashMap<String, String>,
}

impl SymbolMap {
    /// Only the mathematical constants are mapped; everything else prints as is
    pub fn constants() -> Self {
        let mut names = FxHashMap::default();
        names.insert(PI.to_string(), "M_PI".to_string());
        names.insert(EULER.to_string(), "M_E".to_string());
        Self { names }
    }

    /// Constants plus the density variables as `FunDensProp` fields
    pub fn density() -> Self {
        Variable::ALL.into_iter().fold(Self::constants(), |map, v| {
            map.with(v.name(), v.c_accessor())
        })
    }

    /// Add or replace one mapping
    pub fn with(mut self, symbol: impl Into<String>, c_text: impl Into<String>) -> Self {
        self.names.insert(symbol.into(), c_text.into());
        self
    }

    pub fn resolve<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.names.get(symbol).map_or(symbol, String::as_str)
    }
}

/// Render a number the way C reads it back exactly
///
/// Whole numbers print without a fraction (`2`), everything else uses the
/// shortest representation that round-trips (`0.33333333333333326`).
pub fn render_number(n: f64) -> Result<String> {
    if !n.is_finite() {
        return Err(XcError::Unrenderable(format!("non-finite number {n}")));
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Ok(format!("{}", n as i64))
    } else {
        Ok(format!("{:?}", n))
    }
}

/// Render an expression as a C99 expression string
///
/// # Errors
/// `XcError::Unrenderable` for non-finite numbers and calls without a C
/// counterpart.
pub fn render_c(expr: &Expr, symbols: &SymbolMap) -> Result<String> {
    Renderer {
        symbols,
        floats: false,
    }
    .render(expr)
}

/// A number C reads as `double` even when it is whole: `3.0`, `-1.0`, `1e-20`
fn render_float(n: f64) -> Result<String> {
    let s = render_number(n)?;
    if s.contains(['.', 'e', 'E']) {
        Ok(s)
    } else {
        Ok(format!("{s}.0"))
    }
}

/// Literals and arithmetic on literals only; C would compute these in `int`
fn numeric_only(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Number(_) => true,
        ExprKind::Add(u, v)
        | ExprKind::Sub(u, v)
        | ExprKind::Mul(u, v)
        | ExprKind::Div(u, v) => numeric_only(u) && numeric_only(v),
        _ => false,
    }
}

#[derive(Clone, Copy)]
struct Renderer<'a> {
    symbols: &'a SymbolMap,
    /// Whole numbers print as `double` literals, so `/` never divides integers
    floats: bool,
}

impl Renderer<'_> {
    fn floats_if(self, numeric: bool) -> Self {
        Self {
            floats: self.floats || numeric,
            ..self
        }
    }

    fn number(&self, n: f64) -> Result<String> {
        if self.floats {
            render_float(n)
        } else {
            render_number(n)
        }
    }

    fn render(&self, expr: &Expr) -> Result<String> {
        match &expr.kind {
            ExprKind::Number(n) => self.number(*n),
            ExprKind::Symbol(s) => Ok(self.symbols.resolve(s).to_string()),
            ExprKind::FunctionCall { name, args } => {
                let def = Registry::lookup(name, args.len())
                    .map_err(|_| XcError::Unrenderable(format!("no C function for '{name}'")))?;
                let rendered = args
                    .iter()
                    .map(|a| self.render(a))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("{}({})", def.c_name, rendered.join(", ")))
            }
            ExprKind::Add(u, v) => {
                let left = self.render(u)?;
                let right = self.render(v)?;
                // a + (-2*x) reads as a - 2*x
                if matches!(v.kind, ExprKind::Mul(_, _) | ExprKind::Number(_))
                    && let Some(stripped) = right.strip_prefix('-')
                {
                    Ok(format!("{left} - {stripped}"))
                } else {
                    Ok(format!("{left} + {right}"))
                }
            }
            ExprKind::Sub(u, v) => {
                let left = self.render(u)?;
                let right = self.render(v)?;
                if matches!(v.kind, ExprKind::Add(_, _) | ExprKind::Sub(_, _))
                    || right.starts_with('-')
                {
                    Ok(format!("{left} - ({right})"))
                } else {
                    Ok(format!("{left} - {right}"))
                }
            }
            ExprKind::Mul(_, _) => self.render_product(expr),
            ExprKind::Div(u, v) => {
                let num = self.floats_if(numeric_only(u)).render_factor(u)?;
                let den_renderer = self.floats_if(numeric_only(v));
                let den = match &v.kind {
                    ExprKind::Symbol(_) | ExprKind::FunctionCall { .. } | ExprKind::Pow(_, _) => {
                        den_renderer.render(v)?
                    }
                    ExprKind::Number(n) if *n >= 0.0 => den_renderer.render(v)?,
                    _ => format!("({})", den_renderer.render(v)?),
                };
                Ok(format!("{num}/{den}"))
            }
            ExprKind::Pow(base, exp) => {
                if reciprocal(exp).is_some() {
                    self.render_product(expr)
                } else {
                    self.render_power(base, exp)
                }
            }
        }
    }

    fn render_power(&self, base: &Expr, exp: &Expr) -> Result<String> {
        let base_str = self.render(base)?;
        if exp.as_number() == Some(0.5) {
            return Ok(format!("sqrt({base_str})"));
        }
        Ok(format!("pow({base_str}, {})", self.render(exp)?))
    }

    /// Operand of `*` or `/`: sums need parentheses
    fn render_factor(&self, expr: &Expr) -> Result<String> {
        let s = self.render(expr)?;
        Ok(match &expr.kind {
            ExprKind::Add(_, _) | ExprKind::Sub(_, _) | ExprKind::Div(_, _) => format!("({s})"),
            ExprKind::Number(n) if *n < 0.0 => format!("({s})"),
            _ => s,
        })
    }

    /// Coefficient, numerator factors, then `/denominator` for `x^-1` and `x^-0.5` factors
    fn render_product(&self, expr: &Expr) -> Result<String> {
        let mut factors = Vec::new();
        flatten_product(expr, &mut factors);

        let coeff = factors.first().and_then(|f| f.as_number());
        let rest = if coeff.is_some() { &factors[1..] } else { &factors[..] };

        let mut numerator_factors = Vec::new();
        let mut denominator = Vec::new();
        for factor in rest {
            if let ExprKind::Pow(base, exp) = &factor.kind
                && let Some(root) = reciprocal(exp)
            {
                let base_str = self.render(base)?;
                denominator.push(if root {
                    format!("sqrt({base_str})")
                } else {
                    match &base.kind {
                        ExprKind::Add(_, _) | ExprKind::Sub(_, _) | ExprKind::Mul(_, _) => {
                            format!("({base_str})")
                        }
                        _ => base_str,
                    }
                });
            } else {
                numerator_factors.push(factor);
            }
        }

        // a literal-only numerator over a denominator must not divide in `int`
        let this = self.floats_if(
            !denominator.is_empty() && numerator_factors.iter().all(|f| numeric_only(f)),
        );
        let numerator = numerator_factors
            .into_iter()
            .map(|f| this.render_factor(f))
            .collect::<Result<Vec<_>>>()?;

        let den = match denominator.len() {
            0 => None,
            1 => denominator.pop(),
            _ => Some(format!("({})", denominator.join("*"))),
        };

        let out = match (coeff, numerator.is_empty(), den) {
            (Some(c), true, None) => this.number(c)?,
            (None, true, None) => "1".to_string(),
            (Some(c), true, Some(den)) if c == -1.0 => format!("-1.0/{den}"),
            (Some(c), true, Some(den)) if c != 1.0 => format!("{}/{den}", render_float(c)?),
            (_, true, Some(den)) => format!("1.0/{den}"),
            (c, false, den) => {
                let prefix = match c {
                    None => String::new(),
                    Some(c) if c == 1.0 => String::new(),
                    Some(c) if c == -1.0 => "-".to_string(),
                    Some(c) => format!("{}*", this.number(c)?),
                };
                let body = numerator.join("*");
                match den {
                    Some(den) => format!("{prefix}{body}/{den}"),
                    None => format!("{prefix}{body}"),
                }
            }
        };
        Ok(out)
    }
}

/// `Some(false)` for exponent -1, `Some(true)` for -0.5, otherwise `None`
fn reciprocal(exp: &Expr) -> Option<bool> {
    match exp.as_number() {
        Some(n) if n == -1.0 => Some(false),
        Some(n) if n == -0.5 => Some(true),
        _ => None,
    }
}

fn flatten_product(expr: &Expr, out: &mut Vec<Expr>) {
    match &expr.kind {
        ExprKind::Mul(u, v) => {
            flatten_product(u, out);
            flatten_product(v, out);
        }
        _ => out.push(expr.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn c(expr: &Expr) -> String {
        render_c(expr, &SymbolMap::constants()).unwrap()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(render_number(2.0).unwrap(), "2");
        assert_eq!(render_number(-0.75).unwrap(), "-0.75");
        assert_eq!(render_number(4.0 / 3.0 - 1.0).unwrap(), "0.33333333333333326");
        assert_eq!(render_number(1e-20).unwrap(), "1e-20");
        assert!(matches!(render_number(f64::NAN), Err(XcError::Unrenderable(_))));
    }

    #[test]
    fn test_power_forms() {
        let ra = Expr::symbol("ra");
        let expr = Expr::number(4.0 / 3.0) * ra.clone().pow_of(4.0 / 3.0 - 1.0);
        assert_eq!(c(&expr), "1.3333333333333333*pow(ra, 0.33333333333333326)");
        assert_eq!(c(&ra.clone().pow_of(0.5)), "sqrt(ra)");
        assert_eq!(c(&ra.clone().pow_of(-1.0)), "1.0/ra");
        assert_eq!(c(&ra.pow_of(-2.0)), "pow(ra, -2)");
    }

    #[test]
    fn test_products_with_denominators() {
        let expr = Expr::number(-2.0)
            * Expr::symbol("ga")
            * (Expr::symbol("ra") + Expr::number(1.0)).pow_of(-1.0);
        assert_eq!(c(&expr), "-2*ga/(ra + 1)");
        let expr = Expr::number(-1.0) * Expr::symbol("ra").pow_of(-0.5);
        assert_eq!(c(&expr), "-1.0/sqrt(ra)");
    }

    #[test]
    fn test_division_never_truncates() {
        // unsimplified input keeps its literal quotients
        assert_eq!(c(&parse("ra^(1/3)").unwrap()), "pow(ra, 1.0/3.0)");
        assert_eq!(c(&parse("ra/3").unwrap()), "ra/3.0");
        assert_eq!(c(&parse("(1 + 2)/4").unwrap()), "(1.0 + 2.0)/4.0");
        let expr = Expr::number(2.0) * Expr::symbol("ra").pow_of(-1.0);
        assert_eq!(c(&expr), "2.0/ra");
        let expr = Expr::number(2.0) * Expr::number(3.0) * Expr::number(5.0).pow_of(-1.0);
        assert_eq!(c(&expr), "2.0*3.0/5");
        assert_eq!(render_float(1e-20).unwrap(), "1e-20");
        assert_eq!(render_float(-4.0).unwrap(), "-4.0");
    }

    #[test]
    fn test_constants_and_variables() {
        let expr = parse("pi*ra + e").unwrap();
        assert_eq!(c(&expr), "M_PI*ra + M_E");
        assert_eq!(
            render_c(&expr, &SymbolMap::density()).unwrap(),
            "M_PI*dp->rhoa + M_E"
        );
    }

    #[test]
    fn test_sums_and_negation() {
        let expr = Expr::add_expr(Expr::symbol("ra"), Expr::number(-2.0) * Expr::symbol("ga"));
        assert_eq!(c(&expr), "ra - 2*ga");
        let expr = Expr::sub_expr(Expr::symbol("ra"), Expr::symbol("ga") + Expr::number(1.0));
        assert_eq!(c(&expr), "ra - (ga + 1)");
        assert_eq!(c(&Expr::symbol("ra").negate()), "-ra");
    }

    #[test]
    fn test_function_names() {
        let expr = parse("abs(ln(ra))").unwrap();
        assert_eq!(c(&expr), "fabs(log(ra))");
        let err = render_c(&parse("besselj(ra)").unwrap(), &SymbolMap::constants());
        assert!(matches!(err, Err(XcError::Unrenderable(_))));
    }
}

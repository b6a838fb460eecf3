// Display formatting for AST
//
// This is the human-readable form used in logs and error messages. The C
// spelling lives in `codegen::ccode`.
use crate::{Expr, ExprKind};
use std::fmt;

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Number(n) => {
                if n.is_nan() {
                    write!(f, "NaN")
                } else if n.is_infinite() {
                    if *n > 0.0 {
                        write!(f, "Infinity")
                    } else {
                        write!(f, "-Infinity")
                    }
                } else if n.fract() == 0.0 && n.abs() < 1e10 {
                    // Display as integer if no fractional part
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }

            ExprKind::Symbol(s) => write!(f, "{}", s),

            ExprKind::FunctionCall { name, args } => {
                let args_str: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
                write!(f, "{}({})", name, args_str.join(", "))
            }

            ExprKind::Add(u, v) => {
                // a + (-1 * b) reads as a - b
                if let ExprKind::Mul(left, right) = &v.kind
                    && left.as_number() == Some(-1.0)
                {
                    write!(f, "{} - {}", u, format_mul_operand(right))
                } else {
                    write!(f, "{} + {}", u, v)
                }
            }

            ExprKind::Sub(u, v) => {
                // Parenthesize RHS when it's an addition or subtraction to preserve
                // the intended grouping: `a - (b + c)` instead of `a - b + c`.
                let right_str = match &v.kind {
                    ExprKind::Add(_, _) | ExprKind::Sub(_, _) => format!("({})", v),
                    _ => v.to_string(),
                };
                write!(f, "{} - {}", u, right_str)
            }

            ExprKind::Mul(u, v) => {
                if u.as_number() == Some(-1.0) {
                    write!(f, "-{}", format_mul_operand(v))
                } else {
                    write!(f, "{} * {}", format_mul_operand(u), format_mul_operand(v))
                }
            }

            ExprKind::Div(u, v) => {
                let formatted_num = match &u.kind {
                    ExprKind::Add(_, _) | ExprKind::Sub(_, _) => format!("({})", u),
                    _ => u.to_string(),
                };
                let formatted_denom = match &v.kind {
                    ExprKind::Symbol(_) | ExprKind::Pow(_, _) | ExprKind::FunctionCall { .. } => {
                        v.to_string()
                    }
                    ExprKind::Number(n) if *n >= 0.0 => v.to_string(),
                    _ => format!("({})", v),
                };
                write!(f, "{} / {}", formatted_num, formatted_denom)
            }

            ExprKind::Pow(u, v) => {
                // (C * R)^2 must not display as C * R^2
                let formatted_base = match &u.kind {
                    ExprKind::Symbol(_) | ExprKind::FunctionCall { .. } => u.to_string(),
                    ExprKind::Number(n) if *n >= 0.0 => u.to_string(),
                    _ => format!("({})", u),
                };
                let formatted_exp = match &v.kind {
                    ExprKind::Symbol(_) => v.to_string(),
                    ExprKind::Number(n) if *n >= 0.0 => v.to_string(),
                    _ => format!("({})", v),
                };
                write!(f, "{}^{}", formatted_base, formatted_exp)
            }
        }
    }
}

/// Format operand for multiplication to minimize parentheses
fn format_mul_operand(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Add(_, _) | ExprKind::Sub(_, _) => format!("({})", expr),
        _ => expr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_number() {
        assert_eq!(Expr::number(3.0).to_string(), "3");
        assert!(Expr::number(314.0 / 100.0).to_string().starts_with("3.14"));
        assert_eq!(Expr::number(f64::NAN).to_string(), "NaN");
    }

    #[test]
    fn test_display_negation_and_subtraction() {
        let x = Expr::symbol("ra");
        assert_eq!(x.clone().negate().to_string(), "-ra");
        let sum = Expr::add_expr(Expr::symbol("rb"), Expr::symbol("ra").negate());
        assert_eq!(sum.to_string(), "rb - ra");
        let sub = Expr::sub_expr(x, Expr::symbol("ga") + Expr::number(1.0));
        assert_eq!(sub.to_string(), "ra - (ga + 1)");
    }

    #[test]
    fn test_display_power_parentheses() {
        let base = Expr::symbol("ra") * Expr::symbol("rb");
        assert_eq!(base.pow_of(2.0).to_string(), "(ra * rb)^2");
        assert_eq!(Expr::symbol("ra").pow_of(-1.0).to_string(), "ra^(-1)");
    }

    #[test]
    fn test_display_division() {
        let expr =
            (Expr::symbol("ra") + Expr::number(1.0)) / (Expr::symbol("ga") * Expr::number(2.0));
        assert_eq!(expr.to_string(), "(ra + 1) / (ga * 2)");
    }
}

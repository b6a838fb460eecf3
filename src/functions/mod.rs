//! Centralized mathematical function registry
//!
//! Single source of truth for every function a functional expression may call:
//! numeric evaluation, derivative formula, and the C routine it maps to.

use crate::{Expr, ExprKind};

pub(crate) mod definitions;
pub(crate) mod registry;

// ===== Helper functions for building derivative expressions =====

/// Create a function call expression
pub(crate) fn func(name: &str, arg: Expr) -> Expr {
    Expr::func(name, arg)
}

/// Multiply, optimizing for common cases (0 and 1)
pub(crate) fn mul_opt(a: Expr, b: Expr) -> Expr {
    match (&a.kind, &b.kind) {
        (ExprKind::Number(x), _) if *x == 0.0 => Expr::number(0.0),
        (_, ExprKind::Number(x)) if *x == 0.0 => Expr::number(0.0),
        (ExprKind::Number(x), _) if *x == 1.0 => b,
        (_, ExprKind::Number(x)) if *x == 1.0 => a,
        _ => Expr::mul_expr(a, b),
    }
}

/// Negate an expression
pub(crate) fn neg(a: Expr) -> Expr {
    mul_opt(Expr::number(-1.0), a)
}

/// Raise to a numeric power
pub(crate) fn powf(base: Expr, exponent: f64) -> Expr {
    Expr::pow(base, Expr::number(exponent))
}

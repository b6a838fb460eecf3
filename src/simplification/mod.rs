//! Simplification framework - reduces expressions to a canonical form
//!
//! The canonical form matters for code generation: a derivative that is
//! identically zero must come out as the number `0`, and equal subterms must
//! compare equal so they can be collected.
pub(crate) mod engine;
mod rules;

use crate::Expr;

/// Simplify an expression, allowing rules that assume positive bases
///
/// Densities and gradient norms are non-negative, so `(ra^2)^0.5 -> ra` is
/// what the generated code wants.
pub fn simplify_expr(expr: Expr) -> Expr {
    engine::Simplifier::new().simplify(expr)
}

/// Simplify an expression without rules that change the domain
pub fn simplify_domain_safe(expr: Expr) -> Expr {
    engine::Simplifier::new()
        .with_domain_safe(true)
        .simplify(expr)
}

//! Function definitions for the function registry
//!
//! Only functions with a direct C99 `<math.h>` counterpart are listed, since
//! every expression ends up as C source.

use super::registry::FunctionDefinition;
use super::{func, mul_opt, neg, powf};
use crate::Expr;

/// 2/sqrt(pi), the derivative prefactor of erf
const TWO_OVER_SQRT_PI: f64 = std::f64::consts::FRAC_2_SQRT_PI;

/// Return all function definitions for populating the registry
pub(crate) fn all_definitions() -> Vec<FunctionDefinition> {
    vec![
        // Exponential and logarithmic
        FunctionDefinition {
            name: "exp",
            c_name: "exp",
            arity: 1..=1,
            eval: |args| Some(args[0].exp()),
            derivative: |args, arg_primes| {
                // d/dx exp(u) = exp(u) * u'
                mul_opt(func("exp", args[0].clone()), arg_primes[0].clone())
            },
        },
        FunctionDefinition {
            name: "ln",
            c_name: "log",
            arity: 1..=1,
            eval: |args| Some(args[0].ln()),
            derivative: |args, arg_primes| {
                // d/dx ln(u) = u' / u
                mul_opt(powf(args[0].clone(), -1.0), arg_primes[0].clone())
            },
        },
        FunctionDefinition {
            name: "log",
            c_name: "log",
            arity: 1..=1,
            eval: |args| Some(args[0].ln()),
            derivative: |args, arg_primes| {
                mul_opt(powf(args[0].clone(), -1.0), arg_primes[0].clone())
            },
        },
        // Roots
        FunctionDefinition {
            name: "sqrt",
            c_name: "sqrt",
            arity: 1..=1,
            eval: |args| Some(args[0].sqrt()),
            derivative: |args, arg_primes| {
                // d/dx sqrt(u) = 0.5 * u^(-1/2) * u'
                mul_opt(
                    Expr::mul_expr(Expr::number(0.5), powf(args[0].clone(), -0.5)),
                    arg_primes[0].clone(),
                )
            },
        },
        FunctionDefinition {
            name: "cbrt",
            c_name: "cbrt",
            arity: 1..=1,
            eval: |args| Some(args[0].cbrt()),
            derivative: |args, arg_primes| {
                // d/dx cbrt(u) = (1/3) * u^(-2/3) * u'
                mul_opt(
                    Expr::mul_expr(
                        Expr::number(1.0 / 3.0),
                        powf(args[0].clone(), -2.0 / 3.0),
                    ),
                    arg_primes[0].clone(),
                )
            },
        },
        // Trigonometric
        FunctionDefinition {
            name: "sin",
            c_name: "sin",
            arity: 1..=1,
            eval: |args| Some(args[0].sin()),
            derivative: |args, arg_primes| {
                mul_opt(func("cos", args[0].clone()), arg_primes[0].clone())
            },
        },
        FunctionDefinition {
            name: "cos",
            c_name: "cos",
            arity: 1..=1,
            eval: |args| Some(args[0].cos()),
            derivative: |args, arg_primes| {
                mul_opt(neg(func("sin", args[0].clone())), arg_primes[0].clone())
            },
        },
        FunctionDefinition {
            name: "tan",
            c_name: "tan",
            arity: 1..=1,
            eval: |args| Some(args[0].tan()),
            derivative: |args, arg_primes| {
                // d/dx tan(u) = (1 + tan(u)^2) * u'
                mul_opt(
                    Expr::add_expr(
                        Expr::number(1.0),
                        powf(func("tan", args[0].clone()), 2.0),
                    ),
                    arg_primes[0].clone(),
                )
            },
        },
        FunctionDefinition {
            name: "atan",
            c_name: "atan",
            arity: 1..=1,
            eval: |args| Some(args[0].atan()),
            derivative: |args, arg_primes| {
                // d/dx atan(u) = u' / (1 + u^2)
                mul_opt(
                    powf(
                        Expr::add_expr(Expr::number(1.0), powf(args[0].clone(), 2.0)),
                        -1.0,
                    ),
                    arg_primes[0].clone(),
                )
            },
        },
        // Hyperbolic
        FunctionDefinition {
            name: "sinh",
            c_name: "sinh",
            arity: 1..=1,
            eval: |args| Some(args[0].sinh()),
            derivative: |args, arg_primes| {
                mul_opt(func("cosh", args[0].clone()), arg_primes[0].clone())
            },
        },
        FunctionDefinition {
            name: "cosh",
            c_name: "cosh",
            arity: 1..=1,
            eval: |args| Some(args[0].cosh()),
            derivative: |args, arg_primes| {
                mul_opt(func("sinh", args[0].clone()), arg_primes[0].clone())
            },
        },
        FunctionDefinition {
            name: "tanh",
            c_name: "tanh",
            arity: 1..=1,
            eval: |args| Some(args[0].tanh()),
            derivative: |args, arg_primes| {
                // d/dx tanh(u) = (1 - tanh(u)^2) * u'
                mul_opt(
                    Expr::sub_expr(
                        Expr::number(1.0),
                        powf(func("tanh", args[0].clone()), 2.0),
                    ),
                    arg_primes[0].clone(),
                )
            },
        },
        FunctionDefinition {
            name: "asinh",
            c_name: "asinh",
            arity: 1..=1,
            eval: |args| Some(args[0].asinh()),
            derivative: |args, arg_primes| {
                // d/dx asinh(u) = u' / sqrt(1 + u^2)
                mul_opt(
                    powf(
                        Expr::add_expr(Expr::number(1.0), powf(args[0].clone(), 2.0)),
                        -0.5,
                    ),
                    arg_primes[0].clone(),
                )
            },
        },
        // Special
        FunctionDefinition {
            name: "erf",
            c_name: "erf",
            arity: 1..=1,
            eval: |args| Some(libm::erf(args[0])),
            derivative: |args, arg_primes| {
                // d/dx erf(u) = 2/sqrt(pi) * exp(-u^2) * u'
                mul_opt(
                    Expr::mul_expr(
                        Expr::number(TWO_OVER_SQRT_PI),
                        func("exp", neg(powf(args[0].clone(), 2.0))),
                    ),
                    arg_primes[0].clone(),
                )
            },
        },
        FunctionDefinition {
            name: "abs",
            c_name: "fabs",
            arity: 1..=1,
            eval: |args| Some(args[0].abs()),
            derivative: |args, arg_primes| {
                // d/dx |u| = u / |u| * u'
                mul_opt(
                    Expr::mul_expr(args[0].clone(), powf(func("abs", args[0].clone()), -1.0)),
                    arg_primes[0].clone(),
                )
            },
        },
    ]
}

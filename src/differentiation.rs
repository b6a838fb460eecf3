// Differentiation engine - applies calculus rules
//
// Inline checks (0 + x -> x, 1 * x -> x) keep intermediate trees small before
// the simplifier runs; fourth derivatives of a five-variable functional grow
// quickly without them.

use crate::functions::registry::Registry;
use crate::{Expr, ExprKind, Result};

impl Expr {
    /// Differentiate this expression with respect to a variable
    ///
    /// The result is not simplified; `Diff` adds that step.
    ///
    /// # Errors
    /// `XcError::UnknownFunction` when a call has no registered derivative rule.
    pub(crate) fn derive(&self, var: &str) -> Result<Expr> {
        let d = match &self.kind {
            // Base cases
            ExprKind::Number(_) => Expr::number(0.0),

            ExprKind::Symbol(name) => {
                if name == var {
                    Expr::number(1.0)
                } else {
                    Expr::number(0.0)
                }
            }

            ExprKind::FunctionCall { name, args } => {
                let def = Registry::lookup(name, args.len())?;
                let arg_primes = args
                    .iter()
                    .map(|arg| arg.derive(var))
                    .collect::<Result<Vec<Expr>>>()?;
                if arg_primes.iter().all(Expr::is_zero_num) {
                    Expr::number(0.0)
                } else {
                    (def.derivative)(args, &arg_primes)
                }
            }

            // Sum rule: (u + v)' = u' + v'
            ExprKind::Add(u, v) => {
                let u_prime = u.derive(var)?;
                let v_prime = v.derive(var)?;
                if u_prime.is_zero_num() {
                    v_prime
                } else if v_prime.is_zero_num() {
                    u_prime
                } else {
                    Expr::add_expr(u_prime, v_prime)
                }
            }

            // Subtraction rule: (u - v)' = u' - v'
            ExprKind::Sub(u, v) => {
                let u_prime = u.derive(var)?;
                let v_prime = v.derive(var)?;
                if v_prime.is_zero_num() {
                    u_prime
                } else if u_prime.is_zero_num() {
                    v_prime.negate()
                } else {
                    Expr::sub_expr(u_prime, v_prime)
                }
            }

            // Product rule: (u * v)' = u' * v + u * v'
            ExprKind::Mul(u, v) => {
                let u_prime = u.derive(var)?;
                let v_prime = v.derive(var)?;

                let term1 = scaled(&u_prime, v);
                let term2 = scaled(&v_prime, u);

                if term1.is_zero_num() {
                    term2
                } else if term2.is_zero_num() {
                    term1
                } else {
                    Expr::add_expr(term1, term2)
                }
            }

            // Quotient rule: (u / v)' = (u' * v - u * v') / v^2
            ExprKind::Div(u, v) => {
                let u_prime = u.derive(var)?;
                let v_prime = v.derive(var)?;

                if u_prime.is_zero_num() && v_prime.is_zero_num() {
                    Expr::number(0.0)
                } else if v_prime.is_zero_num() {
                    // Constant denominator: u' / v
                    if v.is_one_num() {
                        u_prime
                    } else {
                        Expr::div_expr(u_prime, (**v).clone())
                    }
                } else {
                    let term1 = scaled(&u_prime, v);
                    let term2 = scaled(&v_prime, u);
                    let numerator = if term1.is_zero_num() {
                        term2.negate()
                    } else if term2.is_zero_num() {
                        term1
                    } else {
                        Expr::sub_expr(term1, term2)
                    };
                    Expr::div_expr(numerator, Expr::pow((**v).clone(), Expr::number(2.0)))
                }
            }

            ExprKind::Pow(u, v) => {
                if !v.contains_var(var) {
                    // Constant exponent: (u^n)' = n * u^(n-1) * u'
                    let u_prime = u.derive(var)?;
                    if u_prime.is_zero_num() {
                        Expr::number(0.0)
                    } else if let Some(n_val) = v.as_number() {
                        if n_val == 0.0 {
                            Expr::number(0.0)
                        } else if n_val == 1.0 {
                            u_prime
                        } else {
                            let u_pow = Expr::pow((**u).clone(), Expr::number(n_val - 1.0));
                            let body = if u_prime.is_one_num() {
                                u_pow
                            } else {
                                Expr::mul_expr(u_pow, u_prime)
                            };
                            Expr::mul_expr(Expr::number(n_val), body)
                        }
                    } else {
                        // Symbolic constant exponent such as `a` or `1/pi`
                        let n_minus_1 = Expr::sub_expr((**v).clone(), Expr::number(1.0));
                        let u_pow = Expr::pow((**u).clone(), n_minus_1);
                        let body = if u_prime.is_one_num() {
                            u_pow
                        } else {
                            Expr::mul_expr(u_pow, u_prime)
                        };
                        Expr::mul_expr((**v).clone(), body)
                    }
                } else {
                    // Variable exponent - logarithmic differentiation
                    // d/dx[u^v] = u^v * (v' * ln(u) + v * u'/u)
                    let u_prime = u.derive(var)?;
                    let v_prime = v.derive(var)?;

                    let ln_u = if u.as_symbol() == Some(crate::ast::EULER) {
                        Expr::number(1.0)
                    } else {
                        Expr::func("ln", (**u).clone())
                    };
                    let term1 = if v_prime.is_zero_num() {
                        Expr::number(0.0)
                    } else if ln_u.is_one_num() {
                        v_prime
                    } else {
                        Expr::mul_expr(v_prime, ln_u)
                    };
                    let term2 = if u_prime.is_zero_num() {
                        Expr::number(0.0)
                    } else {
                        Expr::mul_expr(
                            (**v).clone(),
                            Expr::div_expr(u_prime, (**u).clone()),
                        )
                    };
                    let sum = if term1.is_zero_num() {
                        term2
                    } else if term2.is_zero_num() {
                        term1
                    } else {
                        Expr::add_expr(term1, term2)
                    };
                    if sum.is_zero_num() {
                        Expr::number(0.0)
                    } else {
                        Expr::mul_expr(Expr::pow((**u).clone(), (**v).clone()), sum)
                    }
                }
            }
        };
        Ok(d)
    }
}

/// Build `factor * other`, skipping the multiplication for 0 and 1
fn scaled(factor: &Expr, other: &Expr) -> Expr {
    if factor.is_zero_num() || other.is_zero_num() {
        Expr::number(0.0)
    } else if factor.is_one_num() {
        other.clone()
    } else if other.is_one_num() {
        factor.clone()
    } else {
        Expr::mul_expr(factor.clone(), other.clone())
    }
}

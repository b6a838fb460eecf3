//! Abstract Syntax Tree for functional expressions

use std::collections::{HashMap, HashSet};
use std::ops::{Add, Deref, Div, Mul, Neg, Sub};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Result, XcError};

/// Global counter for expression IDs
static EXPR_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_id() -> u64 {
    EXPR_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Names of symbolic constants understood by the evaluator and the C renderer
pub const PI: &str = "pi";
pub const EULER: &str = "e";

#[derive(Debug, Clone)]
pub struct Expr {
    /// Unique ID for debugging (not used in equality comparisons)
    pub id: u64,
    pub kind: ExprKind,
}

impl Deref for Expr {
    type Target = ExprKind;

    fn deref(&self) -> &Self::Target {
        &self.kind
    }
}

// Implement Eq and Hash based on KIND only for structural equality
impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for Expr {}

impl std::hash::Hash for Expr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Constant number (e.g., 3.14, 1e-20)
    Number(f64),

    /// Variable or named constant (e.g., "ra", "pi", "PREF")
    Symbol(String),

    /// Function call (e.g., "exp", "log")
    FunctionCall { name: String, args: Vec<Expr> },

    /// Addition
    Add(Arc<Expr>, Arc<Expr>),

    /// Subtraction
    Sub(Arc<Expr>, Arc<Expr>),

    /// Multiplication
    Mul(Arc<Expr>, Arc<Expr>),

    /// Division
    Div(Arc<Expr>, Arc<Expr>),

    /// Exponentiation
    Pow(Arc<Expr>, Arc<Expr>),
}

// Numbers compare by bit pattern so that Eq and Hash agree
impl PartialEq for ExprKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ExprKind::Number(a), ExprKind::Number(b)) => a.to_bits() == b.to_bits(),
            (ExprKind::Symbol(a), ExprKind::Symbol(b)) => a == b,
            (
                ExprKind::FunctionCall { name: n1, args: a1 },
                ExprKind::FunctionCall { name: n2, args: a2 },
            ) => n1 == n2 && a1 == a2,
            (ExprKind::Add(l1, r1), ExprKind::Add(l2, r2))
            | (ExprKind::Sub(l1, r1), ExprKind::Sub(l2, r2))
            | (ExprKind::Mul(l1, r1), ExprKind::Mul(l2, r2))
            | (ExprKind::Div(l1, r1), ExprKind::Div(l2, r2))
            | (ExprKind::Pow(l1, r1), ExprKind::Pow(l2, r2)) => l1 == l2 && r1 == r2,
            _ => false,
        }
    }
}

impl Eq for ExprKind {}

impl std::hash::Hash for ExprKind {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ExprKind::Number(n) => n.to_bits().hash(state),
            ExprKind::Symbol(s) => s.hash(state),
            ExprKind::FunctionCall { name, args } => {
                name.hash(state);
                args.hash(state);
            }
            ExprKind::Add(l, r)
            | ExprKind::Sub(l, r)
            | ExprKind::Mul(l, r)
            | ExprKind::Div(l, r)
            | ExprKind::Pow(l, r) => {
                l.hash(state);
                r.hash(state);
            }
        }
    }
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr {
            id: next_id(),
            kind,
        }
    }

    // Accessor methods

    /// Check if expression is a constant number and return its value
    pub fn as_number(&self) -> Option<f64> {
        match &self.kind {
            ExprKind::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Return the symbol name if this is a symbol
    pub fn as_symbol(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Check if this expression is exactly the number zero
    #[inline]
    pub fn is_zero_num(&self) -> bool {
        self.as_number().is_some_and(|n| n == 0.0)
    }

    /// Check if this expression is exactly the number one
    #[inline]
    pub fn is_one_num(&self) -> bool {
        self.as_number().is_some_and(|n| n == 1.0)
    }

    // Convenience constructors

    /// Create a number expression
    pub fn number(n: f64) -> Self {
        Expr::new(ExprKind::Number(n))
    }

    /// Create a symbol expression
    pub fn symbol(s: impl Into<String>) -> Self {
        Expr::new(ExprKind::Symbol(s.into()))
    }

    /// Create an addition expression
    pub fn add_expr(left: Expr, right: Expr) -> Self {
        Expr::new(ExprKind::Add(Arc::new(left), Arc::new(right)))
    }

    /// Create a subtraction expression
    pub fn sub_expr(left: Expr, right: Expr) -> Self {
        Expr::new(ExprKind::Sub(Arc::new(left), Arc::new(right)))
    }

    /// Create a multiplication expression
    pub fn mul_expr(left: Expr, right: Expr) -> Self {
        Expr::new(ExprKind::Mul(Arc::new(left), Arc::new(right)))
    }

    /// Create a division expression
    pub fn div_expr(left: Expr, right: Expr) -> Self {
        Expr::new(ExprKind::Div(Arc::new(left), Arc::new(right)))
    }

    /// Create a power expression
    pub fn pow(base: Expr, exponent: Expr) -> Self {
        Expr::new(ExprKind::Pow(Arc::new(base), Arc::new(exponent)))
    }

    /// Raise to a numeric power
    pub fn pow_of(self, exponent: f64) -> Self {
        Expr::pow(self, Expr::number(exponent))
    }

    /// Create a function call expression (single argument convenience)
    pub fn func(name: impl Into<String>, content: Expr) -> Self {
        Expr::new(ExprKind::FunctionCall {
            name: name.into(),
            args: vec![content],
        })
    }

    /// Create a multi-argument function call expression
    pub fn func_multi(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::new(ExprKind::FunctionCall {
            name: name.into(),
            args,
        })
    }

    /// Negate by multiplying with -1
    pub fn negate(self) -> Self {
        Expr::mul_expr(Expr::number(-1.0), self)
    }

    // Analysis methods

    /// Count the total number of nodes in the AST
    pub fn node_count(&self) -> usize {
        match &self.kind {
            ExprKind::Number(_) | ExprKind::Symbol(_) => 1,
            ExprKind::FunctionCall { args, .. } => {
                1 + args.iter().map(|a| a.node_count()).sum::<usize>()
            }
            ExprKind::Add(l, r)
            | ExprKind::Sub(l, r)
            | ExprKind::Mul(l, r)
            | ExprKind::Div(l, r)
            | ExprKind::Pow(l, r) => 1 + l.node_count() + r.node_count(),
        }
    }

    /// Get the maximum nesting depth of the AST
    pub fn max_depth(&self) -> usize {
        match &self.kind {
            ExprKind::Number(_) | ExprKind::Symbol(_) => 1,
            ExprKind::FunctionCall { args, .. } => {
                1 + args.iter().map(|a| a.max_depth()).max().unwrap_or(0)
            }
            ExprKind::Add(l, r)
            | ExprKind::Sub(l, r)
            | ExprKind::Mul(l, r)
            | ExprKind::Div(l, r)
            | ExprKind::Pow(l, r) => 1 + l.max_depth().max(r.max_depth()),
        }
    }

    /// Check if the expression contains a specific variable
    pub fn contains_var(&self, var: &str) -> bool {
        match &self.kind {
            ExprKind::Number(_) => false,
            ExprKind::Symbol(s) => s == var,
            ExprKind::FunctionCall { args, .. } => args.iter().any(|a| a.contains_var(var)),
            ExprKind::Add(l, r)
            | ExprKind::Sub(l, r)
            | ExprKind::Mul(l, r)
            | ExprKind::Div(l, r)
            | ExprKind::Pow(l, r) => l.contains_var(var) || r.contains_var(var),
        }
    }

    /// Collect all symbol names in the expression
    pub fn symbols(&self) -> HashSet<String> {
        let mut vars = HashSet::new();
        self.collect_symbols(&mut vars);
        vars
    }

    fn collect_symbols(&self, vars: &mut HashSet<String>) {
        match &self.kind {
            ExprKind::Symbol(s) => {
                vars.insert(s.clone());
            }
            ExprKind::FunctionCall { args, .. } => {
                for arg in args {
                    arg.collect_symbols(vars);
                }
            }
            ExprKind::Add(l, r)
            | ExprKind::Sub(l, r)
            | ExprKind::Mul(l, r)
            | ExprKind::Div(l, r)
            | ExprKind::Pow(l, r) => {
                l.collect_symbols(vars);
                r.collect_symbols(vars);
            }
            ExprKind::Number(_) => {}
        }
    }

    /// Transform the expression tree by applying a function to each node
    /// Nodes are visited in post-order (children before parent)
    pub fn map<F>(&self, f: F) -> Expr
    where
        F: Fn(&Expr) -> Expr + Copy,
    {
        let transformed = match &self.kind {
            ExprKind::Number(_) | ExprKind::Symbol(_) => self.clone(),
            ExprKind::FunctionCall { name, args } => Expr::new(ExprKind::FunctionCall {
                name: name.clone(),
                args: args.iter().map(|arg| arg.map(f)).collect(),
            }),
            ExprKind::Add(a, b) => Expr::add_expr(a.map(f), b.map(f)),
            ExprKind::Sub(a, b) => Expr::sub_expr(a.map(f), b.map(f)),
            ExprKind::Mul(a, b) => Expr::mul_expr(a.map(f), b.map(f)),
            ExprKind::Div(a, b) => Expr::div_expr(a.map(f), b.map(f)),
            ExprKind::Pow(a, b) => Expr::pow(a.map(f), b.map(f)),
        };
        f(&transformed)
    }

    /// Substitute a symbol with another expression
    ///
    /// # Example
    /// ```ignore
    /// let expr = parse("PREF * ra")?;
    /// let result = expr.substitute("PREF", &Expr::number(-0.75));
    /// // result is -0.75 * ra
    /// ```
    pub fn substitute(&self, var: &str, replacement: &Expr) -> Expr {
        self.map(|node| {
            if let ExprKind::Symbol(s) = &node.kind
                && s == var
            {
                return replacement.clone();
            }
            node.clone()
        })
    }

    /// Evaluate to a number with the given symbol values
    ///
    /// `pi` and `e` are known unless overridden in `vars`. Any other
    /// unbound symbol is an error.
    pub fn eval_f64(&self, vars: &HashMap<&str, f64>) -> Result<f64> {
        match &self.kind {
            ExprKind::Number(n) => Ok(*n),
            ExprKind::Symbol(s) => {
                if let Some(&val) = vars.get(s.as_str()) {
                    return Ok(val);
                }
                match s.as_str() {
                    PI => Ok(std::f64::consts::PI),
                    EULER => Ok(std::f64::consts::E),
                    _ => Err(XcError::UnboundSymbol(s.clone())),
                }
            }
            ExprKind::FunctionCall { name, args } => {
                let values = args
                    .iter()
                    .map(|a| a.eval_f64(vars))
                    .collect::<Result<Vec<f64>>>()?;
                let def = crate::functions::registry::Registry::lookup(name, args.len())?;
                (def.eval)(&values).ok_or_else(|| XcError::UnknownFunction {
                    name: name.clone(),
                    arity: args.len(),
                })
            }
            ExprKind::Add(a, b) => Ok(a.eval_f64(vars)? + b.eval_f64(vars)?),
            ExprKind::Sub(a, b) => Ok(a.eval_f64(vars)? - b.eval_f64(vars)?),
            ExprKind::Mul(a, b) => Ok(a.eval_f64(vars)? * b.eval_f64(vars)?),
            ExprKind::Div(a, b) => Ok(a.eval_f64(vars)? / b.eval_f64(vars)?),
            ExprKind::Pow(a, b) => Ok(a.eval_f64(vars)?.powf(b.eval_f64(vars)?)),
        }
    }
}

// ===== Operator overloading for ergonomic construction =====

impl Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::add_expr(self, rhs)
    }
}

impl Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::sub_expr(self, rhs)
    }
}

impl Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::mul_expr(self, rhs)
    }
}

impl Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::div_expr(self, rhs)
    }
}

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        self.negate()
    }
}

impl Mul<Expr> for f64 {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::mul_expr(Expr::number(self), rhs)
    }
}

impl From<f64> for Expr {
    fn from(n: f64) -> Self {
        Expr::number(n)
    }
}

impl From<&str> for Expr {
    fn from(name: &str) -> Self {
        Expr::symbol(name)
    }
}

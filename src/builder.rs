//! Builder pattern API for differentiation
//!
//! Provides a fluent interface for configuring and executing differentiation.
//!
//! # Example
//! ```
//! use xcgen::{Diff, parse};
//!
//! let expr = parse("ra * ga^2").unwrap();
//! let derivative = Diff::new().differentiate(&expr, "ga").unwrap();
//! assert_eq!(derivative.to_string(), "2 * ga * ra");
//! ```

use crate::{Expr, Result, XcError, simplification};

/// Builder for differentiation operations
#[derive(Clone, Debug)]
pub struct Diff {
    simplify: bool,
    domain_safe: bool,
    max_depth: Option<usize>,
    max_nodes: Option<usize>,
}

impl Default for Diff {
    fn default() -> Self {
        Self {
            simplify: true,
            domain_safe: false,
            max_depth: None,
            max_nodes: None,
        }
    }
}

impl Diff {
    /// Create a new differentiation builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable simplification of each result (on by default)
    ///
    /// Without simplification zero derivatives are not reliably reduced to `0`.
    pub fn simplify(mut self, simplify: bool) -> Self {
        self.simplify = simplify;
        self
    }

    /// Enable or disable domain-safe mode (skips domain-altering rules)
    pub fn domain_safe(mut self, safe: bool) -> Self {
        self.domain_safe = safe;
        self
    }

    /// Set maximum AST depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set maximum AST node count
    pub fn max_nodes(mut self, nodes: usize) -> Self {
        self.max_nodes = Some(nodes);
        self
    }

    fn check_limits(&self, expr: &Expr) -> Result<()> {
        if let Some(max_d) = self.max_depth
            && expr.max_depth() > max_d
        {
            return Err(XcError::MaxDepthExceeded);
        }
        if let Some(max_n) = self.max_nodes
            && expr.node_count() > max_n
        {
            return Err(XcError::MaxNodesExceeded);
        }
        Ok(())
    }

    /// Differentiate an expression with respect to a variable name
    ///
    /// The input is not modified. Size limits apply to the input and to the
    /// result.
    pub fn differentiate(&self, expr: &Expr, var: &str) -> Result<Expr> {
        self.check_limits(expr)?;

        let derivative = expr.derive(var)?;

        let result = if !self.simplify {
            derivative
        } else if self.domain_safe {
            simplification::simplify_domain_safe(derivative)
        } else {
            simplification::simplify_expr(derivative)
        };

        self.check_limits(&result)?;
        Ok(result)
    }
}

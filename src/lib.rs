//! Exchange-correlation functional code generator
//!
//! Turns a symbolic density functional F(ra, rb, ga, gb, gab) into the C
//! routines a quantum-chemistry host program calls: the energy plus the
//! first through fourth partial derivatives, each accumulated into a slot
//! named after its multi-index (`df1000`, `df0110`, `df00001`, ...).
//!
//! # Features
//! - Text parsing of functional expressions with `pi`, `e` and the usual
//!   elementary functions
//! - Symbolic differentiation with a canonicalizing simplifier, so zero
//!   derivatives are recognized
//! - Layered derivative cache: every partial derivative is computed once from
//!   one of the previous order, optionally in parallel within a layer
//! - C emission with zero-statement suppression, threshold guards for
//!   decoupled spin channels and YAML functional definitions
//!
//! # Usage
//!
//! ```
//! use xcgen::{DerivativeCache, DerivativeOrder, Emitter, Variable, VariableList, parse};
//!
//! let cache = DerivativeCache::build(
//!     parse("ra*ga^2").unwrap(),
//!     VariableList::new([Variable::Ra, Variable::Ga]).unwrap(),
//!     DerivativeOrder::SECOND,
//! )
//! .unwrap();
//! let block = Emitter::new().block(&cache, DerivativeOrder::SECOND).unwrap();
//! assert!(block.contains("// ds->df2000 += (0)*factor;"));
//! ```
//!
//! Whole functionals go through [`Functional`] or [`FunctionalConfig`]:
//!
//! ```
//! use xcgen::FunctionalConfig;
//!
//! let yaml = "name: Example\nexpression: \"ra*ga^2 + rb*gb^2\"\n";
//! let functional = FunctionalConfig::from_yaml_str(yaml)
//!     .unwrap()
//!     .into_functional()
//!     .unwrap();
//! let source = functional.to_c_source().unwrap();
//! assert!(source.contains("static integer example_isgga(void) { return 1; }"));
//! ```

mod ast;
mod builder;
pub mod cache;
pub mod codegen;
pub mod config;
mod differentiation;
mod display;
mod error;
pub mod functional;
mod functions;
pub mod multi_index;
mod parser;
mod simplification;
pub mod variables;

#[cfg(test)]
mod tests;

pub use ast::{EULER, Expr, ExprKind, PI};
pub use builder::Diff;
pub use cache::{DerivativeCache, DerivativeOrder, MAX_ORDER};
pub use codegen::{Emitter, Statement, SymbolMap, comment_zero_lines, render_c};
pub use config::FunctionalConfig;
pub use error::{Result, Span, XcError};
pub use functional::{Channels, DensityPoint, Functional};
pub use multi_index::MultiIndex;
pub use parser::parse;
pub use simplification::{simplify_domain_safe, simplify_expr};
pub use variables::{Variable, VariableList};

/// Parse a formula and generate the derivative block of order 1 through `order`
///
/// Convenience entry point for a single expression over an explicit variable
/// list, rendered with the density accessors (`dp->rhoa`, ...).
///
/// # Errors
/// Parse, order, differentiation and rendering errors, in that order.
///
/// # Example
/// ```
/// let block = xcgen::derivative_block("ra^2", &[xcgen::Variable::Ra], 1).unwrap();
/// assert_eq!(block, "  ds->df1000 += (2*dp->rhoa)*factor;\n");
/// ```
pub fn derivative_block(formula: &str, vars: &[Variable], order: u8) -> Result<String> {
    let expr = parse(formula)?;
    let order = DerivativeOrder::new(order)?;
    let cache = DerivativeCache::build(expr, VariableList::new(vars.iter().copied())?, order)?;
    Emitter::new()
        .symbols(SymbolMap::density())
        .block(&cache, order)
}

//! Slot statements and order blocks
//!
//! Every cache entry becomes one accumulation statement
//! `ds->df1010 += (2*ga)*factor;`. A block is the text of all statements of
//! orders 1 through N, optionally with a blank line between orders, after
//! statements whose value is the literal `0` have been commented out.

use super::ccode::{SymbolMap, render_c};
use crate::cache::{DerivativeCache, DerivativeOrder};
use crate::multi_index::MultiIndex;
use crate::Result;
use std::fmt;

/// Statement tail that marks a zero contribution with the default scale
const ZERO_TAIL: &str = "= (0)*factor;";

/// One accumulation into a derivative slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub index: MultiIndex,
    /// Field name such as `df1010`
    pub slot: String,
    /// Rendered C expression
    pub rhs: String,
    accumulator: String,
    prefix: String,
    scale: String,
}

impl Statement {
    /// True when the right-hand side is the literal `0`
    pub fn is_zero(&self) -> bool {
        self.rhs == "0"
    }

    pub fn order(&self) -> usize {
        self.index.order()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} += {}({}){};",
            self.accumulator, self.slot, self.prefix, self.rhs, self.scale
        )
    }
}

/// Turns a derivative cache into C statements
#[derive(Debug, Clone)]
pub struct Emitter {
    accumulator: String,
    scale: String,
    prefix: String,
    indent: String,
    separate_layers: bool,
    symbols: SymbolMap,
}

impl Default for Emitter {
    fn default() -> Self {
        Self {
            accumulator: "ds->".to_string(),
            scale: "*factor".to_string(),
            prefix: String::new(),
            indent: "  ".to_string(),
            separate_layers: true,
            symbols: SymbolMap::constants(),
        }
    }
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text before the slot name (`ds->`)
    pub fn accumulator(mut self, accumulator: impl Into<String>) -> Self {
        self.accumulator = accumulator.into();
        self
    }

    /// Text after the parenthesized value (`*factor`)
    pub fn scale(mut self, scale: impl Into<String>) -> Self {
        self.scale = scale.into();
        self
    }

    /// Factor written in front of the parenthesized value, e.g. `EPREF*`
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    /// Put a blank line between the statements of consecutive orders
    pub fn separate_layers(mut self, separate: bool) -> Self {
        self.separate_layers = separate;
        self
    }

    /// How symbols are spelled, e.g. [`SymbolMap::density`] for `dp->rhoa`
    pub fn symbols(mut self, symbols: SymbolMap) -> Self {
        self.symbols = symbols;
        self
    }

    /// Statements for orders 1 through `order`, in cache enumeration order
    ///
    /// The cache must already hold `order`; missing layers yield no statements.
    ///
    /// # Errors
    /// The first rendering failure.
    pub fn statements(
        &self,
        cache: &DerivativeCache,
        order: DerivativeOrder,
    ) -> Result<Vec<Statement>> {
        cache
            .iter_up_to(order)
            .map(|(index, expr)| {
                Ok(Statement {
                    index,
                    slot: index.slot_name(),
                    rhs: render_c(expr, &self.symbols)?,
                    accumulator: self.accumulator.clone(),
                    prefix: self.prefix.clone(),
                    scale: self.scale.clone(),
                })
            })
            .collect()
    }

    /// Indented block text, one statement per line, zero statements commented out
    pub fn block(&self, cache: &DerivativeCache, order: DerivativeOrder) -> Result<String> {
        let statements = self.statements(cache, order)?;
        Ok(self.format_statements(&statements))
    }

    /// Lay out already rendered statements
    pub fn format_statements(&self, statements: &[Statement]) -> String {
        let mut out = String::new();
        let mut previous_order = None;
        for stmt in statements {
            if self.separate_layers
                && previous_order.is_some_and(|o| o != stmt.order())
            {
                out.push('\n');
            }
            previous_order = Some(stmt.order());
            out.push_str(&self.indent);
            out.push_str(&stmt.to_string());
            out.push('\n');
        }
        comment_statements_ending_with(&out, &self.zero_tail())
    }

    /// How a zero statement ends with this emitter's prefix and scale
    pub fn zero_tail(&self) -> String {
        format!("= {}(0){};", self.prefix, self.scale)
    }
}

/// Comment out every line accumulating `(0)*factor`
///
/// Leading whitespace stays in front of the inserted `// `. Lines that are
/// already comments are left alone, so applying this twice changes nothing.
pub fn comment_zero_lines(code: &str) -> String {
    comment_statements_ending_with(code, ZERO_TAIL)
}

fn comment_statements_ending_with(code: &str, tail: &str) -> String {
    code.split('\n')
        .map(|line| {
            let body = line.trim_start();
            if body.ends_with(tail) && !body.starts_with("//") {
                let indent = &line[..line.len() - body.len()];
                format!("{indent}// {body}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

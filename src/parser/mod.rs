//! Parser module - converts strings to AST
mod lexer;
mod pratt;
mod tokens;

use crate::{Expr, Result, XcError};

/// Parse a formula string into an expression AST
///
/// The grammar is ordinary infix arithmetic: `+ - * / ^` (with `**` as a
/// synonym for `^`), unary minus, parentheses and `name(args)` calls.
/// Multiplication is always explicit.
///
/// Function names are checked against the registry later, when the
/// expression is differentiated or rendered, so parsing never fails on an
/// unknown call.
///
/// # Example
/// ```
/// use xcgen::parse;
///
/// let expr = parse("-0.75*(3/pi)^(1/3)*ra^(4/3)").unwrap();
/// assert!(expr.contains_var("ra"));
/// ```
///
/// # Errors
/// Returns `XcError` if:
/// - The input is empty
/// - The input contains a character or number that cannot be lexed
/// - Parentheses are unbalanced or an operator is missing an operand
pub fn parse(input: &str) -> Result<Expr> {
    if input.trim().is_empty() {
        return Err(XcError::EmptyFormula);
    }

    let tokens = lexer::lex(input)?;
    pratt::parse_expression(&tokens)
}

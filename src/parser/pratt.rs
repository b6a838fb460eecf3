use crate::parser::tokens::{Operator, SpannedToken, Token};
use crate::{Expr, ExprKind, Result, XcError};

/// Binding power of unary minus: below `^`, above `*`
const UNARY_PRECEDENCE: u8 = 25;

/// Parse tokens into an AST using Pratt parsing algorithm
pub(crate) fn parse_expression(tokens: &[SpannedToken]) -> Result<Expr> {
    if tokens.is_empty() {
        return Err(XcError::UnexpectedEndOfInput);
    }

    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr(0)?;

    // Everything must be consumed
    if let Some(extra) = parser.tokens.get(parser.pos) {
        return Err(XcError::UnexpectedToken {
            expected: "end of input".to_string(),
            got: extra.token.to_user_string(),
            span: Some(extra.span),
        });
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [SpannedToken],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn current(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn unexpected(&self, expected: &str) -> XcError {
        match self.tokens.get(self.pos) {
            Some(t) => XcError::UnexpectedToken {
                expected: expected.to_string(),
                got: t.token.to_user_string(),
                span: Some(t.span),
            },
            None => XcError::UnexpectedToken {
                expected: expected.to_string(),
                got: "end of input".to_string(),
                span: None,
            },
        }
    }

    fn expect_right_paren(&mut self) -> Result<()> {
        if let Some(Token::RightParen) = self.current() {
            self.advance(); // consume )
            Ok(())
        } else {
            Err(self.unexpected(")"))
        }
    }

    fn parse_expr(&mut self, min_precedence: u8) -> Result<Expr> {
        // Parse left side (prefix)
        let mut left = self.parse_prefix()?;

        // Parse operators and right side (infix)
        while let Some(Token::Operator(op)) = self.current() {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            left = self.parse_infix(left, *op, precedence)?;
        }

        Ok(left)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();

        if let Some(Token::RightParen) = self.current() {
            return Ok(args); // Empty argument list
        }

        loop {
            args.push(self.parse_expr(0)?);

            match self.current() {
                Some(Token::Comma) => {
                    self.advance(); // consume ,
                }
                Some(Token::RightParen) => break,
                _ => return Err(self.unexpected(", or )")),
            }
        }

        Ok(args)
    }

    fn parse_prefix(&mut self) -> Result<Expr> {
        let spanned = self
            .tokens
            .get(self.pos)
            .ok_or(XcError::UnexpectedEndOfInput)?;

        match &spanned.token {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::number(*n))
            }

            Token::Identifier(name) => {
                self.advance();

                if let Some(Token::LeftParen) = self.current() {
                    self.advance(); // consume (
                    let args = self.parse_arguments()?;
                    self.expect_right_paren()?;

                    Ok(Expr::new(ExprKind::FunctionCall {
                        name: name.clone(),
                        args,
                    }))
                } else {
                    Ok(Expr::symbol(name.clone()))
                }
            }

            // -x^2 parses as -(x^2), not (-x)^2
            Token::Operator(Operator::Sub) => {
                self.advance();
                let expr = self.parse_expr(UNARY_PRECEDENCE)?;
                Ok(match expr.as_number() {
                    Some(n) => Expr::number(-n),
                    None => Expr::mul_expr(Expr::number(-1.0), expr),
                })
            }

            Token::Operator(Operator::Add) => {
                self.advance();
                self.parse_expr(UNARY_PRECEDENCE)
            }

            Token::LeftParen => {
                self.advance(); // consume (
                let expr = self.parse_expr(0)?;
                self.expect_right_paren()?;
                Ok(expr)
            }

            other => Err(XcError::invalid_token_at(
                other.to_user_string(),
                spanned.span,
            )),
        }
    }

    fn parse_infix(&mut self, left: Expr, op: Operator, precedence: u8) -> Result<Expr> {
        self.advance();

        // Right associative for power, left for others
        let next_precedence = if op == Operator::Pow {
            precedence
        } else {
            precedence + 1
        };

        let right = self.parse_expr(next_precedence)?;

        Ok(match op {
            Operator::Add => Expr::add_expr(left, right),
            Operator::Sub => Expr::sub_expr(left, right),
            Operator::Mul => Expr::mul_expr(left, right),
            Operator::Div => Expr::div_expr(left, right),
            Operator::Pow => Expr::pow(left, right),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::lex;

    fn parse(input: &str) -> Result<Expr> {
        parse_expression(&lex(input)?)
    }

    #[test]
    fn test_precedence() {
        // x + 2 * 3 should be x + (2 * 3)
        let ast = parse("ra + 2 * 3").unwrap();
        match &ast.kind {
            ExprKind::Add(left, right) => {
                assert!(matches!(left.kind, ExprKind::Symbol(_)));
                assert!(matches!(right.kind, ExprKind::Mul(_, _)));
            }
            _ => panic!("Expected Add at top level"),
        }
    }

    #[test]
    fn test_power_is_right_associative() {
        let ast = parse("ra^2^3").unwrap();
        let expected = Expr::pow(
            Expr::symbol("ra"),
            Expr::pow(Expr::number(2.0), Expr::number(3.0)),
        );
        assert_eq!(ast, expected);
    }

    #[test]
    fn test_unary_minus_binds_below_power() {
        let ast = parse("-ra^2").unwrap();
        assert_eq!(
            ast,
            Expr::mul_expr(Expr::number(-1.0), Expr::symbol("ra").pow_of(2.0))
        );
        assert_eq!(parse("-0.75").unwrap(), Expr::number(-0.75));
    }

    #[test]
    fn test_parentheses() {
        let ast = parse("(ra + 1) * 2").unwrap();
        match &ast.kind {
            ExprKind::Mul(left, right) => {
                assert!(matches!(left.kind, ExprKind::Add(_, _)));
                assert_eq!(right.as_number(), Some(2.0));
            }
            _ => panic!("Expected Mul at top level"),
        }
    }

    #[test]
    fn test_function_arguments() {
        let ast = parse("exp(-ra * rb)").unwrap();
        assert!(matches!(ast.kind, ExprKind::FunctionCall { ref args, .. } if args.len() == 1));
    }

    #[test]
    fn test_empty_parentheses() {
        assert!(parse("()").is_err());
    }

    #[test]
    fn test_unbalanced() {
        let err = parse("(ra + 1").unwrap_err();
        assert_eq!(
            err,
            XcError::UnexpectedToken {
                expected: ")".to_string(),
                got: "end of input".to_string(),
                span: None,
            }
        );
        assert!(parse("ra + 1)").is_err());
    }

    #[test]
    fn test_dangling_operator() {
        assert_eq!(parse("ra *").unwrap_err(), XcError::UnexpectedEndOfInput);
    }
}

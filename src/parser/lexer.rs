use crate::parser::tokens::{Operator, SpannedToken, Token};
use crate::{Result, Span, XcError};

/// Split a formula into tokens
///
/// Identifiers are `[A-Za-z_][A-Za-z0-9_]*`, numbers accept a decimal point and
/// an exponent part, and `**` is read as `^`.
pub(crate) fn lex(input: &str) -> Result<Vec<SpannedToken>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::with_capacity(input.len() / 2);
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos] as char;

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;
        let token = match c {
            '(' => {
                pos += 1;
                Token::LeftParen
            }
            ')' => {
                pos += 1;
                Token::RightParen
            }
            ',' => {
                pos += 1;
                Token::Comma
            }
            '*' if bytes.get(pos + 1) == Some(&b'*') => {
                pos += 2;
                Token::Operator(Operator::Pow)
            }
            '+' | '-' | '*' | '/' | '^' => {
                pos += 1;
                match Operator::from_char(c) {
                    Some(op) => Token::Operator(op),
                    None => return Err(XcError::invalid_token_at(c, Span::at(start))),
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                pos = scan_number(bytes, pos);
                let text = &input[start..pos];
                let value = text.parse::<f64>().map_err(|_| XcError::InvalidNumber {
                    value: text.to_string(),
                    span: Some(Span::new(start, pos)),
                })?;
                Token::Number(value)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                while pos < bytes.len()
                    && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                Token::Identifier(input[start..pos].to_string())
            }
            _ => {
                let ch_len = input[start..].chars().next().map_or(1, char::len_utf8);
                return Err(XcError::invalid_token_at(
                    &input[start..start + ch_len],
                    Span::new(start, start + ch_len),
                ));
            }
        };

        tokens.push(SpannedToken {
            token,
            span: Span::new(start, pos),
        });
    }

    Ok(tokens)
}

/// Advance over `digits [. digits] [e|E [+|-] digits]`
fn scan_number(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
        pos += 1;
    }
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut exp = pos + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            while exp < bytes.len() && bytes[exp].is_ascii_digit() {
                exp += 1;
            }
            pos = exp;
        }
    }
    pos
}

//! Unit expression parser
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expr     := power (('*' | '·' | '/') power)*
//! power    := primary (('**' | '^') exponent | SUPERSCRIPT)?
//! exponent := '-'? NUMBER (('**' | '^') exponent)?
//!           | '(' '-'? NUMBER ('/' NUMBER)? ')'
//! primary  := NAME | '-'? NUMBER | '[' NAME? ']' | '(' expr ')'
//! ```
//!
//! Names may contain letters, digits (not first), `_` and symbol characters
//! such as `°`, `%`, `µ` or `Ω`, which are kept verbatim for lookup.

use gauge_core::dimension::{checked_div, checked_pow, parse_exponent};
use gauge_core::{Exponent, Result, UnitError};
use num_traits::Zero;

use crate::ast::UnitExpr;

/// Byte range of a token in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Name,
    Number,
    Dimension,
    /// Run of superscript characters, text normalized to ASCII (`-1.5`)
    Superscript,
    Star,
    Slash,
    Pow,
    Minus,
    LParen,
    RParen,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

const SUPERSCRIPT_DIGITS: [char; 10] = ['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];
const SUPERSCRIPT_MINUS: char = '⁻';
/// Dot operator, used as the decimal point inside superscript exponents
const DOT_OPERATOR: char = '⋅';
const MIDDLE_DOT: char = '·';

fn superscript_digit(c: char) -> Option<char> {
    SUPERSCRIPT_DIGITS
        .iter()
        .position(|&s| s == c)
        .and_then(|d| char::from_digit(d as u32, 10))
}

fn is_superscript(c: char) -> bool {
    c == SUPERSCRIPT_MINUS || superscript_digit(c).is_some()
}

/// `⋅` is a decimal point only between superscript digits (`m¹⋅⁵`);
/// elsewhere it multiplies (`m²⋅s`).
fn superscript_follows(input: &str, at: usize) -> bool {
    input[at..].chars().next().and_then(superscript_digit).is_some()
}

fn is_operator(c: char) -> bool {
    matches!(c, '*' | '/' | '^' | '(' | ')' | '[' | ']' | '-' | '+' | '.' | ',' | '=' | ';' | '#')
        || c == MIDDLE_DOT
        || c == DOT_OPERATOR
}

fn is_name_start(c: char) -> bool {
    !c.is_whitespace() && !c.is_ascii_digit() && !is_operator(c) && !is_superscript(c)
}

fn is_name_continue(c: char) -> bool {
    c.is_ascii_digit() || is_name_start(c)
}

/// Tokenize a unit expression.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        let (kind, end) = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '*' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '*'))) {
                    chars.next();
                    (TokenKind::Pow, pos + 2)
                } else {
                    (TokenKind::Star, pos + 1)
                }
            }
            '^' => {
                chars.next();
                (TokenKind::Pow, pos + 1)
            }
            c if c == MIDDLE_DOT || c == DOT_OPERATOR => {
                chars.next();
                (TokenKind::Star, pos + c.len_utf8())
            }
            '/' => {
                chars.next();
                (TokenKind::Slash, pos + 1)
            }
            '-' => {
                chars.next();
                (TokenKind::Minus, pos + 1)
            }
            '(' => {
                chars.next();
                (TokenKind::LParen, pos + 1)
            }
            ')' => {
                chars.next();
                (TokenKind::RParen, pos + 1)
            }
            '[' => {
                chars.next();
                let mut end = None;
                while let Some((i, c)) = chars.next() {
                    if c == ']' {
                        end = Some(i + 1);
                        break;
                    }
                    if !is_name_continue(c) {
                        return Err(UnitError::syntax(
                            input,
                            i,
                            c.to_string(),
                            "invalid character in dimension name",
                        ));
                    }
                }
                match end {
                    Some(end) => (TokenKind::Dimension, end),
                    None => {
                        return Err(UnitError::syntax(input, pos, &input[pos..], "unclosed '['"));
                    }
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                let end = scan_number(input, pos);
                while chars.peek().map_or(false, |&(i, _)| i < end) {
                    chars.next();
                }
                if end == pos + 1 && c == '.' {
                    return Err(UnitError::syntax(input, pos, ".", "unexpected '.'"));
                }
                (TokenKind::Number, end)
            }
            c if is_superscript(c) => {
                let mut text = String::new();
                let mut end = pos;
                while let Some(&(i, c)) = chars.peek() {
                    let normalized = if c == SUPERSCRIPT_MINUS {
                        '-'
                    } else if c == DOT_OPERATOR && superscript_follows(input, i + c.len_utf8()) {
                        '.'
                    } else if let Some(d) = superscript_digit(c) {
                        d
                    } else {
                        break;
                    };
                    text.push(normalized);
                    end = i + c.len_utf8();
                    chars.next();
                }
                tokens.push(Token {
                    kind: TokenKind::Superscript,
                    span: Span { start: pos, end },
                    text,
                });
                continue;
            }
            c if is_name_start(c) => {
                let mut end = pos;
                while let Some(&(i, c)) = chars.peek() {
                    if !is_name_continue(c) {
                        break;
                    }
                    end = i + c.len_utf8();
                    chars.next();
                }
                (TokenKind::Name, end)
            }
            c => {
                return Err(UnitError::syntax(input, pos, c.to_string(), "unexpected character"));
            }
        };
        tokens.push(Token {
            kind,
            span: Span { start: pos, end },
            text: input[pos..end].to_string(),
        });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span { start: input.len(), end: input.len() },
        text: String::new(),
    });
    Ok(tokens)
}

/// End of a numeric literal starting at `start`: digits, optional fraction,
/// optional exponent (`1e-3`). The exponent is only consumed when complete.
fn scan_number(input: &str, start: usize) -> usize {
    let bytes = input.as_bytes();
    let mut i = start;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    i
}

struct Parser<'t> {
    source: &'t str,
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn new(source: &'t str, tokens: &'t [Token]) -> Self {
        Parser { source, tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn advance(&mut self) -> &Token {
        let idx = self.pos.min(self.tokens.len() - 1);
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        &self.tokens[idx]
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, reason: &str) -> UnitError {
        let token = self.peek();
        let reason = if token.kind == TokenKind::Eof {
            format!("{} (unexpected end of expression)", reason)
        } else {
            reason.to_string()
        };
        UnitError::syntax(self.source, token.span.start, token.text.clone(), reason)
    }

    fn error_at(&self, token: &Token, reason: &str) -> UnitError {
        UnitError::syntax(self.source, token.span.start, token.text.clone(), reason)
    }

    fn expect(&mut self, kind: TokenKind, reason: &str) -> Result<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error(reason))
        }
    }
}

/// Parse a unit expression such as `kg*m/s**2` or `(lb_m*inch)/(minute^2*day)`.
pub fn parse_expression(input: &str) -> Result<UnitExpr> {
    let tokens = tokenize(input)?;
    let mut p = Parser::new(input, &tokens);
    if p.peek_kind() == TokenKind::Eof {
        return Err(p.error("empty expression"));
    }
    let expr = parse_product(&mut p)?;
    if p.peek_kind() != TokenKind::Eof {
        let reason = if p.peek_kind() == TokenKind::RParen {
            "unbalanced ')'"
        } else {
            "unexpected trailing input"
        };
        return Err(p.error(reason));
    }
    Ok(expr)
}

fn parse_product(p: &mut Parser) -> Result<UnitExpr> {
    let mut left = parse_power(p)?;
    loop {
        if p.eat(TokenKind::Star) {
            let right = parse_power(p)?;
            left = UnitExpr::product(left, right);
        } else if p.eat(TokenKind::Slash) {
            let right = parse_power(p)?;
            left = UnitExpr::quotient(left, right);
        } else {
            return Ok(left);
        }
    }
}

fn parse_power(p: &mut Parser) -> Result<UnitExpr> {
    let base = parse_primary(p)?;
    if p.eat(TokenKind::Pow) {
        let exp = parse_exponent_expr(p)?;
        return Ok(UnitExpr::power(base, exp));
    }
    if p.peek_kind() == TokenKind::Superscript {
        let exp = match parse_exponent(&p.peek().text) {
            Some(exp) => exp,
            None => return Err(p.error("invalid superscript exponent")),
        };
        p.advance();
        return Ok(UnitExpr::power(base, exp));
    }
    Ok(base)
}

fn parse_exponent_expr(p: &mut Parser) -> Result<Exponent> {
    if p.eat(TokenKind::LParen) {
        let negative = p.eat(TokenKind::Minus);
        let mut exp = parse_exponent_number(p)?;
        if p.eat(TokenKind::Slash) {
            let denom = parse_exponent_number(p)?;
            if denom.is_zero() {
                return Err(p.error("zero denominator in exponent"));
            }
            exp = checked_div(exp, denom).ok_or_else(|| p.error("exponent out of range"))?;
        }
        p.expect(TokenKind::RParen, "expected ')' after exponent")?;
        return Ok(if negative { -exp } else { exp });
    }

    let first = p.peek().clone();
    let negative = p.eat(TokenKind::Minus);
    let base = parse_exponent_number(p)?;
    let base = if negative { -base } else { base };

    // Right-associative: 2**3**2 == 2**(3**2)
    if p.peek_kind() == TokenKind::Pow {
        p.advance();
        let outer = parse_exponent_expr(p)?;
        if !outer.is_integer() {
            return Err(p.error("nested exponent must be an integer"));
        }
        return checked_pow(base, outer.to_integer())
            .ok_or_else(|| p.error_at(&first, "exponent out of range"));
    }
    Ok(base)
}

fn parse_exponent_number(p: &mut Parser) -> Result<Exponent> {
    if p.peek_kind() != TokenKind::Number {
        return Err(p.error("expected exponent"));
    }
    match parse_exponent(&p.peek().text) {
        Some(exp) => {
            p.advance();
            Ok(exp)
        }
        None => Err(p.error("exponent must be an integer or decimal")),
    }
}

fn parse_primary(p: &mut Parser) -> Result<UnitExpr> {
    match p.peek_kind() {
        TokenKind::Name => {
            let name = p.advance().text.clone();
            Ok(UnitExpr::UnitRef(name))
        }
        TokenKind::Number => parse_number(p, false),
        TokenKind::Minus => {
            p.advance();
            if p.peek_kind() != TokenKind::Number {
                return Err(p.error("expected number after '-'"));
            }
            parse_number(p, true)
        }
        TokenKind::Dimension => {
            let text = p.advance().text.clone();
            let name = text.trim_start_matches('[').trim_end_matches(']');
            Ok(UnitExpr::Dimension(name.to_string()))
        }
        TokenKind::LParen => {
            p.advance();
            if p.peek_kind() == TokenKind::RParen {
                return Err(p.error("empty parentheses"));
            }
            let inner = parse_product(p)?;
            p.expect(TokenKind::RParen, "expected ')'")?;
            Ok(inner)
        }
        TokenKind::RParen => Err(p.error("unbalanced ')'")),
        _ => Err(p.error("expected unit name")),
    }
}

fn parse_number(p: &mut Parser, negative: bool) -> Result<UnitExpr> {
    let value: f64 = match p.peek().text.parse() {
        Ok(v) => v,
        Err(_) => return Err(p.error("invalid number")),
    };
    p.advance();
    Ok(UnitExpr::Number(if negative { -value } else { value }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp(n: i64) -> Exponent {
        Exponent::from_integer(n)
    }

    fn unit(name: &str) -> UnitExpr {
        UnitExpr::unit(name)
    }

    fn syntax_position(input: &str) -> (usize, String) {
        match parse_expression(input) {
            Err(UnitError::UnitSyntax { position, token, .. }) => (position, token),
            other => panic!("expected syntax error for {:?}, got {:?}", input, other),
        }
    }

    #[test]
    fn test_parse_simple_unit() {
        assert_eq!(parse_expression("m").unwrap(), unit("m"));
        assert_eq!(parse_expression("  inch_H2O_39F ").unwrap(), unit("inch_H2O_39F"));
    }

    #[test]
    fn test_symbols_pass_through() {
        assert_eq!(parse_expression("°F").unwrap(), unit("°F"));
        assert_eq!(parse_expression("%").unwrap(), unit("%"));
        assert_eq!(parse_expression("µm").unwrap(), unit("µm"));
        assert_eq!(parse_expression("Ω").unwrap(), unit("Ω"));
    }

    #[test]
    fn test_parse_quotient_left_associative() {
        // a/b/c == (a/b)/c
        let expected = UnitExpr::quotient(UnitExpr::quotient(unit("a"), unit("b")), unit("c"));
        assert_eq!(parse_expression("a/b/c").unwrap(), expected);
    }

    #[test]
    fn test_power_binds_tighter() {
        // m**2*K/W == ((m**2)*K)/W
        let expected = UnitExpr::quotient(
            UnitExpr::product(UnitExpr::power(unit("m"), exp(2)), unit("K")),
            unit("W"),
        );
        assert_eq!(parse_expression("m**2*K/W").unwrap(), expected);
    }

    #[test]
    fn test_caret_and_negative_exponents() {
        assert_eq!(
            parse_expression("s^-1").unwrap(),
            UnitExpr::power(unit("s"), exp(-1))
        );
        assert_eq!(
            parse_expression("m**1.5").unwrap(),
            UnitExpr::power(unit("m"), Exponent::new(3, 2))
        );
        assert_eq!(
            parse_expression("m**(1/2)").unwrap(),
            UnitExpr::power(unit("m"), Exponent::new(1, 2))
        );
        assert_eq!(
            parse_expression("m**(-3)").unwrap(),
            UnitExpr::power(unit("m"), exp(-3))
        );
    }

    #[test]
    fn test_power_right_associative() {
        assert_eq!(
            parse_expression("m**2**2").unwrap(),
            UnitExpr::power(unit("m"), exp(4))
        );
    }

    #[test]
    fn test_nested_exponent_out_of_range() {
        match parse_expression("m**10**30") {
            Err(UnitError::UnitSyntax { position, token, reason, .. }) => {
                assert_eq!((position, token.as_str()), (3, "10"));
                assert_eq!(reason, "exponent out of range");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(parse_expression("m**2**-2**70"), Err(UnitError::UnitSyntax { .. })));
        assert_eq!(
            parse_expression("m**1**4000000000").unwrap(),
            UnitExpr::power(unit("m"), exp(1))
        );
        assert_eq!(
            parse_expression("m**2**-2").unwrap(),
            UnitExpr::power(unit("m"), Exponent::new(1, 4))
        );
    }

    #[test]
    fn test_superscripts() {
        assert_eq!(parse_expression("m²").unwrap(), UnitExpr::power(unit("m"), exp(2)));
        assert_eq!(parse_expression("s⁻¹").unwrap(), UnitExpr::power(unit("s"), exp(-1)));
        assert_eq!(
            parse_expression("m¹⋅⁵/s").unwrap(),
            UnitExpr::quotient(UnitExpr::power(unit("m"), Exponent::new(3, 2)), unit("s"))
        );
    }

    #[test]
    fn test_middle_dot_is_product() {
        assert_eq!(
            parse_expression("K·m²").unwrap(),
            UnitExpr::product(unit("K"), UnitExpr::power(unit("m"), exp(2)))
        );
    }

    #[test]
    fn test_dot_operator_after_superscript() {
        let expected = UnitExpr::product(UnitExpr::power(unit("m"), exp(2)), unit("s"));
        assert_eq!(parse_expression("m²⋅s").unwrap(), expected);
        assert_eq!(parse_expression("m² ⋅ s").unwrap(), expected);
        assert_eq!(
            parse_expression("m⋅s").unwrap(),
            UnitExpr::product(unit("m"), unit("s"))
        );
        assert_eq!(
            parse_expression("m¹⋅⁵⋅s").unwrap(),
            UnitExpr::product(UnitExpr::power(unit("m"), Exponent::new(3, 2)), unit("s"))
        );
    }

    #[test]
    fn test_parentheses() {
        let expected = UnitExpr::quotient(
            UnitExpr::product(UnitExpr::product(unit("lb_m"), unit("inch")), unit("meter")),
            UnitExpr::product(UnitExpr::power(unit("minute"), exp(2)), unit("day")),
        );
        assert_eq!(
            parse_expression("(lb_m*inch*meter)/(minute^2*day)").unwrap(),
            expected
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            parse_expression("0.0254 * meter").unwrap(),
            UnitExpr::product(UnitExpr::Number(0.0254), unit("meter"))
        );
        assert_eq!(
            parse_expression("1/s").unwrap(),
            UnitExpr::quotient(UnitExpr::Number(1.0), unit("s"))
        );
        assert_eq!(parse_expression("1e-3").unwrap(), UnitExpr::Number(1e-3));
        assert_eq!(parse_expression("-40").unwrap(), UnitExpr::Number(-40.0));
    }

    #[test]
    fn test_dimensions() {
        let expected = UnitExpr::quotient(
            UnitExpr::power(UnitExpr::Dimension("length".into()), exp(3)),
            UnitExpr::Dimension("time".into()),
        );
        assert_eq!(parse_expression("[length] ** 3 / [time]").unwrap(), expected);
        assert_eq!(parse_expression("[]").unwrap(), UnitExpr::Dimension(String::new()));
    }

    #[test]
    fn test_empty_expression() {
        assert!(matches!(parse_expression(""), Err(UnitError::UnitSyntax { .. })));
        assert!(matches!(parse_expression("   "), Err(UnitError::UnitSyntax { .. })));
    }

    #[test]
    fn test_unbalanced_parentheses() {
        assert_eq!(syntax_position("(m/s"), (4, String::new()));
        assert_eq!(syntax_position("m/s)"), (3, ")".to_string()));
        assert_eq!(syntax_position("()"), (1, ")".to_string()));
    }

    #[test]
    fn test_trailing_tokens() {
        assert_eq!(syntax_position("m s"), (2, "s".to_string()));
        assert_eq!(syntax_position("2ft"), (1, "ft".to_string()));
    }

    #[test]
    fn test_empty_atom() {
        assert_eq!(syntax_position("m*/s"), (2, "/".to_string()));
        assert_eq!(syntax_position("m*"), (2, String::new()));
        assert_eq!(syntax_position("m**"), (3, String::new()));
        assert_eq!(syntax_position("m**x"), (3, "x".to_string()));
    }

    #[test]
    fn test_syntax_error_carries_expression() {
        match parse_expression("kg*(m") {
            Err(UnitError::UnitSyntax { expression, reason, .. }) => {
                assert_eq!(expression, "kg*(m");
                assert!(reason.contains("')'"), "reason: {}", reason);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_tokenize_spans() {
        let tokens = tokenize("°F/s").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Name);
        assert_eq!(tokens[0].text, "°F");
        assert_eq!(tokens[1].span, Span { start: 3, end: 4 });
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }
}

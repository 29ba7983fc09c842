// src/evaluator/arith.rs — Arithmetic-only expression evaluator
//
// Accepts digits, whitespace, `+ - * /` and parentheses. Nothing else is ever
// interpreted: the input is whitelisted, tokenized and evaluated by a small
// recursive-descent parser over
//
//   expr   := term (('+' | '-') term)*
//   term   := factor (('*' | '/') factor)*
//   factor := ('+' | '-') factor | number | '(' expr ')'

use thiserror::Error;

/// Maximum parenthesis / unary nesting accepted before bailing out.
const MAX_DEPTH: usize = 64;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArithError {
    #[error("empty expression")]
    Empty,

    #[error("disallowed character '{0}'")]
    DisallowedChar(char),

    #[error("forbidden operator '{0}'")]
    ForbiddenOperator(&'static str),

    #[error("unexpected token at position {0}")]
    UnexpectedToken(usize),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unbalanced parentheses")]
    UnbalancedParens,

    #[error("division by zero")]
    DivisionByZero,

    #[error("nesting deeper than {MAX_DEPTH}")]
    TooDeep,

    #[error("result is not a finite number")]
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

/// Evaluate an arithmetic expression, returning `None` for anything unsafe or invalid.
pub fn evaluate(expr: &str) -> Option<f64> {
    try_evaluate(expr).ok()
}

/// Like [`evaluate`], but reports why an expression was rejected.
pub fn try_evaluate(expr: &str) -> Result<f64, ArithError> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(ArithError::Empty);
    }

    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;

    match parser.peek() {
        None => {}
        Some(Token::RParen) => return Err(ArithError::UnbalancedParens),
        Some(_) => return Err(ArithError::UnexpectedToken(parser.pos)),
    }

    if value.is_finite() {
        Ok(value)
    } else {
        Err(ArithError::NonFinite)
    }
}

fn is_allowed_char(c: char) -> bool {
    c.is_ascii_digit() || c.is_whitespace() || matches!(c, '+' | '-' | '*' | '/' | '(' | ')')
}

fn tokenize(expr: &str) -> Result<Vec<Token>, ArithError> {
    if let Some(bad) = expr.chars().find(|c| !is_allowed_char(*c)) {
        return Err(ArithError::DisallowedChar(bad));
    }
    if expr.contains("**") {
        return Err(ArithError::ForbiddenOperator("**"));
    }
    if expr.contains("//") {
        return Err(ArithError::ForbiddenOperator("//"));
    }

    let bytes = expr.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'0'..=b'9' => {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                // Only ASCII digits reach here, so the slice is valid UTF-8.
                let value: f64 = expr[start..i]
                    .parse()
                    .map_err(|_| ArithError::UnexpectedToken(tokens.len()))?;
                tokens.push(Token::Num(value));
                continue;
            }
            b'+' => tokens.push(Token::Plus),
            b'-' => tokens.push(Token::Minus),
            b'*' => tokens.push(Token::Star),
            b'/' => tokens.push(Token::Slash),
            b'(' => tokens.push(Token::LParen),
            b')' => tokens.push(Token::RParen),
            _ => {} // whitespace (including multi-byte whitespace continuation bytes)
        }
        i += 1;
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.peek();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn descend(&mut self) -> Result<(), ArithError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            Err(ArithError::TooDeep)
        } else {
            Ok(())
        }
    }

    fn expr(&mut self) -> Result<f64, ArithError> {
        let mut acc = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    acc += self.term()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    acc -= self.term()?;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn term(&mut self) -> Result<f64, ArithError> {
        let mut acc = self.factor()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    acc *= self.factor()?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let rhs = self.factor()?;
                    if rhs == 0.0 {
                        return Err(ArithError::DivisionByZero);
                    }
                    acc /= rhs;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn factor(&mut self) -> Result<f64, ArithError> {
        let at = self.pos;
        match self.next() {
            Some(Token::Num(v)) => Ok(v),
            Some(Token::Minus) => {
                self.descend()?;
                let v = self.factor()?;
                self.depth -= 1;
                Ok(-v)
            }
            Some(Token::Plus) => {
                self.descend()?;
                let v = self.factor()?;
                self.depth -= 1;
                Ok(v)
            }
            Some(Token::LParen) => {
                self.descend()?;
                let v = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => {
                        self.depth -= 1;
                        Ok(v)
                    }
                    None => Err(ArithError::UnbalancedParens),
                    Some(_) => Err(ArithError::UnexpectedToken(self.pos - 1)),
                }
            }
            Some(_) => Err(ArithError::UnexpectedToken(at)),
            None => Err(ArithError::UnexpectedEnd),
        }
    }
}

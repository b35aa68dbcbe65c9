//! Attribute literal parsing.
//!
//! Markup attributes arrive as text. Each one is run through a small literal
//! grammar (integers, floats, booleans, quoted strings, and tuples or lists of
//! those); text that does not parse is kept verbatim as a string.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Tuple(Vec<AttrValue>),
}

impl AttrValue {
    pub fn kind(&self) -> &'static str {
        match self {
            AttrValue::Int(_) => "integer",
            AttrValue::Float(_) => "float",
            AttrValue::Bool(_) => "boolean",
            AttrValue::Str(_) => "string",
            AttrValue::Tuple(_) => "tuple",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::Tuple(items) => Some(items),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralError {
    pub position: usize,
    pub message: &'static str,
}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.message, self.position)
    }
}

impl std::error::Error for LiteralError {}

/// Parses `input` as a literal, or reports where it stopped making sense.
pub fn parse_literal(input: &str) -> Result<AttrValue, LiteralError> {
    let mut parser = Parser { src: input, pos: 0 };
    let first = parser.parse_value()?;
    parser.skip_ws();
    let value = if parser.peek() == Some(b',') {
        // Bare tuple: `0, 50`.
        let mut items = vec![first];
        while parser.peek() == Some(b',') {
            parser.pos += 1;
            parser.skip_ws();
            if parser.peek().is_none() {
                break;
            }
            items.push(parser.parse_value()?);
            parser.skip_ws();
        }
        AttrValue::Tuple(items)
    } else {
        first
    };
    parser.skip_ws();
    if parser.peek().is_some() {
        return Err(parser.error("trailing characters"));
    }
    Ok(value)
}

/// Literal value of `raw`, falling back to the raw text.
pub fn coerce(raw: &str) -> AttrValue {
    parse_literal(raw).unwrap_or_else(|_| AttrValue::Str(raw.to_string()))
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn error(&self, message: &'static str) -> LiteralError {
        LiteralError {
            position: self.pos,
            message,
        }
    }

    fn parse_value(&mut self) -> Result<AttrValue, LiteralError> {
        self.skip_ws();
        match self.peek() {
            Some(b'(') => self.parse_sequence(b')', true),
            Some(b'[') => self.parse_sequence(b']', false),
            Some(b'\'' | b'"') => self.parse_string(),
            Some(c) if c.is_ascii_digit() || matches!(c, b'+' | b'-' | b'.') => {
                self.parse_number()
            }
            Some(c) if c.is_ascii_alphabetic() => self.parse_keyword(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_sequence(
        &mut self,
        close: u8,
        parenthesized: bool,
    ) -> Result<AttrValue, LiteralError> {
        self.pos += 1;
        let mut items = Vec::new();
        let mut saw_comma = false;
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                break;
            }
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    saw_comma = true;
                }
                Some(c) if c == close => {
                    self.pos += 1;
                    break;
                }
                Some(_) => return Err(self.error("expected `,` or closing bracket")),
                None => return Err(self.error("unterminated sequence")),
            }
        }
        // `(5)` is a parenthesised scalar, `(5,)` a one-element tuple.
        if parenthesized && !saw_comma && items.len() == 1 {
            if let Some(inner) = items.pop() {
                return Ok(inner);
            }
        }
        Ok(AttrValue::Tuple(items))
    }

    fn parse_string(&mut self) -> Result<AttrValue, LiteralError> {
        let start = self.pos;
        let rest = &self.src[self.pos..];
        let mut chars = rest.char_indices();
        let Some((_, quote)) = chars.next() else {
            return Err(self.error("unexpected end of input"));
        };
        let mut out = String::new();
        let mut escaped = false;
        for (idx, ch) in chars {
            if escaped {
                out.push(match ch {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => other,
                });
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                self.pos = start + idx + ch.len_utf8();
                return Ok(AttrValue::Str(out));
            } else {
                out.push(ch);
            }
        }
        self.pos = self.src.len();
        Err(self.error("unterminated string"))
    }

    fn parse_number(&mut self) -> Result<AttrValue, LiteralError> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let mut is_float = false;
        let mut digits = 0usize;
        while let Some(c) = self.peek() {
            match c {
                b'0'..=b'9' => {
                    digits += 1;
                    self.pos += 1;
                }
                b'.' if !is_float => {
                    is_float = true;
                    self.pos += 1;
                }
                b'e' | b'E' if digits > 0 => {
                    is_float = true;
                    self.pos += 1;
                    if matches!(self.peek(), Some(b'+' | b'-')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
        if digits == 0 {
            return Err(self.error("expected digits"));
        }
        let text = &self.src[start..self.pos];
        if is_float {
            text.parse::<f64>()
                .map(AttrValue::Float)
                .map_err(|_| self.error("malformed float"))
        } else {
            text.parse::<i64>()
                .map(AttrValue::Int)
                .map_err(|_| self.error("integer out of range"))
        }
    }

    fn parse_keyword(&mut self) -> Result<AttrValue, LiteralError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        match &self.src[start..self.pos] {
            "True" | "true" => Ok(AttrValue::Bool(true)),
            "False" | "false" => Ok(AttrValue::Bool(false)),
            _ => {
                self.pos = start;
                Err(self.error("unknown identifier"))
            }
        }
    }
}

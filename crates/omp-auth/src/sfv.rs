//! Minimal structured-field (RFC 8941) dictionary parser and serializer.
//!
//! Only the subset used by message-signature headers is supported: dictionaries
//! whose members are items or inner lists, with parameters on either. Decimals
//! are rejected. Byte sequences are kept as their raw text so callers can apply
//! their own decoding policy.
//!
//! Duplicate dictionary keys are reported to the caller instead of being
//! silently overwritten.

use std::fmt::Write as _;

use crate::error::AuthError;

/// Integers are limited to 15 digits.
const MAX_INTEGER_DIGITS: usize = 15;

/// A bare item value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BareItem {
    /// `42`, `-7`
    Integer(i64),
    /// `"text"`
    String(String),
    /// `sha-256`
    Token(String),
    /// `?1` / `?0`
    Boolean(bool),
    /// `:base64:`, raw text between the colons.
    ByteSequence(String),
}

/// Ordered parameters attached to an item or inner list.
pub type Parameters = Vec<(String, BareItem)>;

/// A bare item with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// The value.
    pub bare: BareItem,
    /// Parameters in wire order.
    pub params: Parameters,
}

/// A parenthesized list of items with its own parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerList {
    /// Items in wire order.
    pub items: Vec<Item>,
    /// Parameters in wire order.
    pub params: Parameters,
}

/// A dictionary member value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    /// A single item.
    Item(Item),
    /// An inner list.
    InnerList(InnerList),
}

/// Parse a dictionary field value into `(key, member)` pairs in wire order.
///
/// Keys may repeat in the result; deciding whether that is acceptable is up to
/// the caller.
pub fn parse_dictionary(input: &str) -> Result<Vec<(String, Member)>, AuthError> {
    let mut parser = Parser::new(input);
    parser.skip_sp();
    let mut members = Vec::new();

    while !parser.at_end() {
        let key = parser.parse_key()?;
        let member = if parser.eat(b'=') {
            parser.parse_member()?
        } else {
            Member::Item(Item {
                bare: BareItem::Boolean(true),
                params: parser.parse_parameters()?,
            })
        };
        members.push((key, member));

        parser.skip_ows();
        if parser.at_end() {
            break;
        }
        if !parser.eat(b',') {
            return Err(parser.error("expected ',' between dictionary members"));
        }
        parser.skip_ows();
        if parser.at_end() {
            return Err(parser.error("trailing ',' in dictionary"));
        }
    }

    Ok(members)
}

/// Serialize an inner list with its parameters.
#[must_use]
pub fn serialize_inner_list(list: &InnerList) -> String {
    let mut out = String::from("(");
    for (i, item) in list.items.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write_bare_item(&mut out, &item.bare);
        write_parameters(&mut out, &item.params);
    }
    out.push(')');
    write_parameters(&mut out, &list.params);
    out
}

/// Serialize a string as an sf-string with escaping.
#[must_use]
pub fn serialize_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    write_string(&mut out, value);
    out
}

fn write_parameters(out: &mut String, params: &Parameters) {
    for (key, value) in params {
        out.push(';');
        out.push_str(key);
        if *value != BareItem::Boolean(true) {
            out.push('=');
            write_bare_item(out, value);
        }
    }
}

fn write_bare_item(out: &mut String, item: &BareItem) {
    match item {
        BareItem::Integer(v) => {
            let _ = write!(out, "{v}");
        }
        BareItem::String(s) => write_string(out, s),
        BareItem::Token(t) => out.push_str(t),
        BareItem::Boolean(b) => out.push_str(if *b { "?1" } else { "?0" }),
        BareItem::ByteSequence(raw) => {
            out.push(':');
            out.push_str(raw);
            out.push(':');
        }
    }
}

fn write_string(out: &mut String, value: &str) {
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_sp(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    fn skip_ows(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    fn error(&self, reason: &str) -> AuthError {
        AuthError::malformed(format!("{reason} at offset {}", self.pos))
    }

    fn slice(&self, start: usize) -> &'a str {
        // Only ASCII bytes are ever consumed, so the range is on char boundaries.
        std::str::from_utf8(&self.input[start..self.pos]).unwrap_or_default()
    }

    fn parse_key(&mut self) -> Result<String, AuthError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_lowercase() || c == b'*' => self.pos += 1,
            _ => return Err(self.error("expected a lowercase key")),
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, b'_' | b'-' | b'.' | b'*')
            {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(self.slice(start).to_owned())
    }

    fn parse_member(&mut self) -> Result<Member, AuthError> {
        if self.peek() == Some(b'(') {
            self.parse_inner_list().map(Member::InnerList)
        } else {
            self.parse_item().map(Member::Item)
        }
    }

    fn parse_inner_list(&mut self) -> Result<InnerList, AuthError> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_sp();
            match self.peek() {
                None => return Err(self.error("unterminated inner list")),
                Some(b')') => {
                    self.pos += 1;
                    let params = self.parse_parameters()?;
                    return Ok(InnerList { items, params });
                }
                Some(_) => {
                    items.push(self.parse_item()?);
                    if !matches!(self.peek(), Some(b' ' | b')')) {
                        return Err(self.error("expected ' ' or ')' in inner list"));
                    }
                }
            }
        }
    }

    fn parse_item(&mut self) -> Result<Item, AuthError> {
        let bare = self.parse_bare_item()?;
        let params = self.parse_parameters()?;
        Ok(Item { bare, params })
    }

    fn parse_parameters(&mut self) -> Result<Parameters, AuthError> {
        let mut params: Parameters = Vec::new();
        while self.eat(b';') {
            self.skip_sp();
            let key = self.parse_key()?;
            let value = if self.eat(b'=') {
                self.parse_bare_item()?
            } else {
                BareItem::Boolean(true)
            };
            if let Some(existing) = params.iter_mut().find(|(k, _)| *k == key) {
                existing.1 = value;
            } else {
                params.push((key, value));
            }
        }
        Ok(params)
    }

    fn parse_bare_item(&mut self) -> Result<BareItem, AuthError> {
        match self.peek() {
            Some(b'-' | b'0'..=b'9') => self.parse_integer(),
            Some(b'"') => self.parse_string(),
            Some(b':') => self.parse_byte_sequence(),
            Some(b'?') => self.parse_boolean(),
            Some(c) if c.is_ascii_alphabetic() || c == b'*' => Ok(self.parse_token()),
            _ => Err(self.error("expected a bare item")),
        }
    }

    fn parse_integer(&mut self) -> Result<BareItem, AuthError> {
        let negative = self.eat(b'-');
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        let digits = self.slice(start);
        if digits.is_empty() {
            return Err(self.error("expected digits"));
        }
        if digits.len() > MAX_INTEGER_DIGITS {
            return Err(self.error("integer out of range"));
        }
        if self.peek() == Some(b'.') {
            return Err(self.error("decimals are not supported"));
        }
        let value: i64 = digits
            .parse()
            .map_err(|_| self.error("integer out of range"))?;
        Ok(BareItem::Integer(if negative { -value } else { value }))
    }

    fn parse_string(&mut self) -> Result<BareItem, AuthError> {
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(BareItem::String(value));
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(c @ (b'"' | b'\\')) => {
                            value.push(char::from(c));
                            self.pos += 1;
                        }
                        _ => return Err(self.error("invalid escape in string")),
                    }
                }
                Some(c @ 0x20..=0x7e) => {
                    value.push(char::from(c));
                    self.pos += 1;
                }
                Some(_) => return Err(self.error("invalid character in string")),
            }
        }
    }

    fn parse_token(&mut self) -> BareItem {
        let start = self.pos;
        self.pos += 1;
        while let Some(c) = self.peek() {
            if is_tchar(c) || c == b':' || c == b'/' {
                self.pos += 1;
            } else {
                break;
            }
        }
        BareItem::Token(self.slice(start).to_owned())
    }

    fn parse_byte_sequence(&mut self) -> Result<BareItem, AuthError> {
        self.pos += 1;
        let start = self.pos;
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated byte sequence")),
                Some(b':') => break,
                Some(c) if c.is_ascii_alphanumeric() || matches!(c, b'+' | b'/' | b'=' | b'-' | b'_') => {
                    self.pos += 1;
                }
                Some(_) => return Err(self.error("invalid character in byte sequence")),
            }
        }
        let raw = self.slice(start).to_owned();
        self.pos += 1;
        Ok(BareItem::ByteSequence(raw))
    }

    fn parse_boolean(&mut self) -> Result<BareItem, AuthError> {
        self.pos += 1;
        let value = match self.peek() {
            Some(b'1') => true,
            Some(b'0') => false,
            _ => return Err(self.error("invalid boolean")),
        };
        self.pos += 1;
        Ok(BareItem::Boolean(value))
    }
}

fn is_tchar(c: u8) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}

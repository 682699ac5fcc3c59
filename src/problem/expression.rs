//! Shared scanning helpers for the region and equation mini-languages.

use thiserror::Error;

/// A parse failure inside a region selector or an equation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at position {position}")]
pub struct ExpressionError {
    pub position: usize,
    pub message: String,
}

/// Byte cursor over an expression. Every accessor skips leading whitespace.
pub(crate) struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn reset(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn error(&self, message: impl Into<String>) -> ExpressionError {
        ExpressionError {
            position: self.pos,
            message: message.into(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    pub fn is_at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.rest().is_empty()
    }

    pub fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.rest().chars().next()
    }

    /// Consume `token` verbatim if it comes next.
    pub fn eat(&mut self, token: &str) -> bool {
        self.skip_whitespace();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    /// Like [`Cursor::eat`], but the token must not run into an identifier.
    pub fn eat_keyword(&mut self, word: &str) -> bool {
        self.skip_whitespace();
        let rest = self.rest();
        if !rest.starts_with(word) {
            return false;
        }
        match rest[word.len()..].chars().next() {
            Some(c) if is_ident_char(c) => false,
            _ => {
                self.pos += word.len();
                true
            }
        }
    }

    pub fn expect(&mut self, token: &str) -> Result<(), ExpressionError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{token}'")))
        }
    }

    pub fn identifier(&mut self) -> Result<&'a str, ExpressionError> {
        self.skip_whitespace();
        let rest = self.rest();
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return Err(self.error("expected identifier")),
        }
        let end = chars
            .find(|(_, c)| !is_ident_char(*c))
            .map_or(rest.len(), |(i, _)| i);
        self.pos += end;
        Ok(&rest[..end])
    }

    pub fn unsigned(&mut self) -> Result<usize, ExpressionError> {
        self.skip_whitespace();
        let rest = self.rest();
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(self.error("expected integer"));
        }
        let value = rest[..end]
            .parse()
            .map_err(|_| self.error("integer out of range"))?;
        self.pos += end;
        Ok(value)
    }

    pub fn is_number_next(&mut self) -> bool {
        matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.')
    }

    /// Unsigned decimal literal with optional fraction and exponent.
    pub fn number(&mut self) -> Result<f64, ExpressionError> {
        self.skip_whitespace();
        let bytes = self.rest().as_bytes();
        let mut end = 0;
        while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
            end += 1;
        }
        if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
            let mut exp = end + 1;
            if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
                exp += 1;
            }
            let digits_start = exp;
            while exp < bytes.len() && bytes[exp].is_ascii_digit() {
                exp += 1;
            }
            if exp > digits_start {
                end = exp;
            }
        }
        if end == 0 {
            return Err(self.error("expected number"));
        }
        let text = &self.rest()[..end];
        let value = text
            .parse()
            .map_err(|_| self.error(format!("malformed number '{text}'")))?;
        self.pos += end;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_respect_identifier_boundaries() {
        let mut c = Cursor::new("vertices in");
        assert!(!c.eat_keyword("vertex"));
        assert!(c.eat_keyword("vertices"));
        assert!(c.eat_keyword("in"));
        assert!(c.is_at_end());
    }

    #[test]
    fn scans_numbers_with_exponents() {
        let mut c = Cursor::new("  1e-10 0.099999 2.");
        assert_eq!(c.number().unwrap(), 1e-10);
        assert_eq!(c.number().unwrap(), 0.099999);
        assert_eq!(c.number().unwrap(), 2.0);
    }

    #[test]
    fn reports_position_of_failure() {
        let mut c = Cursor::new("abc   ?");
        c.identifier().unwrap();
        let err = c.identifier().unwrap_err();
        assert_eq!(err.position, 6);
    }
}

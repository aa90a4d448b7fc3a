//! Character-level stream reader with single-character pushback.
//!
//! Mirrors the original's `fgetc`/`ungetc` pair over a `FILE *`, but reads
//! from any `std::io::Read` so `parse_stream` and `parse_string` share one
//! implementation (`parse_string` just wraps its bytes in a `Cursor`).

use std::io::Read;

use crate::error::{Error, Result};

pub(crate) struct Lexer<R> {
    reader: R,
    pushback: Option<u8>,
}

impl<R: Read> Lexer<R> {
    pub fn new(reader: R) -> Self {
        Lexer {
            reader,
            pushback: None,
        }
    }

    /// Next byte, or `None` at end of stream.
    pub fn next_byte(&mut self) -> Result<Option<u8>> {
        if let Some(b) = self.pushback.take() {
            return Ok(Some(b));
        }
        let mut buf = [0u8; 1];
        match self.reader.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) => Err(Error::parse(format!("error reading descriptor: {e}"))),
        }
    }

    /// Pushes a single byte back so the next `next_byte` returns it. Only
    /// one byte of pushback is ever needed by this grammar.
    pub fn unread(&mut self, b: u8) {
        debug_assert!(self.pushback.is_none(), "at most one byte of pushback");
        self.pushback = Some(b);
    }

    /// Reads one byte, failing with a parse error at EOF.
    pub fn expect_byte(&mut self) -> Result<u8> {
        self.next_byte()?
            .ok_or_else(|| Error::parse("unexpected end of descriptor"))
    }

    /// Reads one byte and fails unless it equals `expected`.
    pub fn expect(&mut self, expected: u8) -> Result<()> {
        let c = self.expect_byte()?;
        if c != expected {
            return Err(Error::parse(format!(
                "expected '{}' got '{}'",
                expected as char, c as char
            )));
        }
        Ok(())
    }

    /// Parses `[A-Za-z_][A-Za-z0-9_]*`.
    pub fn parse_identifier(&mut self) -> Result<Box<str>> {
        let first = self.expect_byte()?;
        if !is_ident_start(first) {
            return Err(Error::parse(format!(
                "expected identifier, got '{}'",
                first as char
            )));
        }
        let mut name = String::new();
        name.push(first as char);
        loop {
            match self.next_byte()? {
                Some(c) if is_ident_continue(c) => name.push(c as char),
                Some(c) => {
                    self.unread(c);
                    break;
                }
                None => break,
            }
        }
        Ok(name.into_boxed_str())
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_identifier_and_stops_at_delimiter() {
        let mut lex = Lexer::new(Cursor::new(b"age weight".as_slice()));
        assert_eq!(&*lex.parse_identifier().unwrap(), "age");
        assert_eq!(lex.next_byte().unwrap(), Some(b' '));
        assert_eq!(&*lex.parse_identifier().unwrap(), "weight");
    }

    #[test]
    fn pushback_returns_exactly_one_byte() {
        let mut lex = Lexer::new(Cursor::new(b"ab".as_slice()));
        let c = lex.expect_byte().unwrap();
        lex.unread(c);
        assert_eq!(lex.expect_byte().unwrap(), c);
        assert_eq!(lex.expect_byte().unwrap(), b'b');
        assert_eq!(lex.next_byte().unwrap(), None);
    }
}

//! Whitespace tokenizer shared by the ASCII formats

use std::io::Read;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Splits text on whitespace and on single-character separators
///
/// Separators are dropped, so `(1 2)` and `1 2` yield the same tokens.
#[derive(Debug)]
pub(crate) struct Tokens {
    text: String,
    pos: usize,
    separators: &'static [char],
    format: &'static str,
}

impl Tokens {
    /// Read all of `input` as UTF-8 text
    pub(crate) fn read<R: Read>(
        mut input: R,
        separators: &'static [char],
        format: &'static str,
    ) -> Result<Self> {
        let mut text = String::new();
        input.read_to_string(&mut text)?;
        Ok(Self {
            text,
            pos: 0,
            separators,
            format,
        })
    }

    fn is_break(&self, c: char) -> bool {
        c.is_whitespace() || self.separators.contains(&c)
    }

    /// Next token, or `None` at the end of input
    pub(crate) fn next_token(&mut self) -> Option<&str> {
        let rest = &self.text[self.pos..];
        let start = rest.find(|c| !self.is_break(c))?;
        let tail = &rest[start..];
        let len = tail.find(|c| self.is_break(c)).unwrap_or(tail.len());
        let begin = self.pos + start;
        self.pos = begin + len;
        Some(&self.text[begin..begin + len])
    }

    /// Next token, failing at the end of input
    pub(crate) fn token(&mut self) -> Result<&str> {
        let format = self.format;
        self.next_token()
            .ok_or_else(|| Error::invalid_format(format!("{format}: unexpected end of file")))
    }

    /// Consume a token that must equal `expected`
    pub(crate) fn expect(&mut self, expected: &str) -> Result<()> {
        let format = self.format;
        let token = self.token()?;
        if token != expected {
            return Err(Error::invalid_format(format!(
                "{format}: expected '{expected}', found '{token}'"
            )));
        }
        Ok(())
    }

    /// Consume and parse the next token
    pub(crate) fn parse<T: FromStr>(&mut self) -> Result<T> {
        let format = self.format;
        let token = self.token()?;
        token.parse().map_err(|_| {
            Error::invalid_format(format!("{format}: cannot parse '{token}' as a number"))
        })
    }

    /// Upper bound on the tokens left in the unread text
    ///
    /// Every token but the last needs a break after it.
    pub(crate) fn max_remaining(&self) -> usize {
        (self.text.len() - self.pos).div_ceil(2)
    }

    /// Peek at the next token without consuming it
    pub(crate) fn peek(&mut self) -> Option<&str> {
        let saved = self.pos;
        let len = self.next_token().map(str::len);
        let end = self.pos;
        self.pos = saved;
        len.map(|len| &self.text[end - len..end])
    }
}

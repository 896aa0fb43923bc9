//! Label selector parsing
//!
//! Queries carry their stream selector as `{name="value", other=~"re.*"}`.
//! Only equality matchers describe labels every line is known to carry, so
//! only those become labels; `!=`, `=~` and `!~` matchers are validated and
//! skipped.

use super::error::LabelParseError;
use crate::frame::Labels;

/// Turns query text into a label mapping
pub trait LabelParser: Send + Sync + 'static {
    /// Parse the labels out of `query`
    fn parse(&self, query: &str) -> Result<Labels, LabelParseError>;
}

/// Default parser for `{k="v", ...}` selectors
///
/// Text without a selector yields empty labels. Anything after the closing
/// brace (pipeline stages, filters) is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorParser;

impl LabelParser for SelectorParser {
    fn parse(&self, query: &str) -> Result<Labels, LabelParseError> {
        match query.find('{') {
            Some(start) => Scanner::new(query, start + 1).selector(),
            None => Ok(Labels::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchOp {
    Eq,
    NotEq,
    Re,
    NotRe,
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str, pos: usize) -> Self {
        Self { input, pos }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
            self.pos += c.len_utf8();
        }
    }

    fn error(&self, reason: &str) -> LabelParseError {
        LabelParseError::new(self.pos, reason)
    }

    /// Parse matchers up to and including the closing brace
    fn selector(mut self) -> Result<Labels, LabelParseError> {
        let mut labels = Labels::new();

        self.skip_whitespace();
        if self.peek() == Some('}') {
            return Ok(labels);
        }

        loop {
            self.skip_whitespace();
            let name = self.name()?;
            self.skip_whitespace();
            let op = self.op()?;
            self.skip_whitespace();
            let value = self.quoted()?;

            if op == MatchOp::Eq {
                labels.insert(name, value);
            }

            self.skip_whitespace();
            match self.bump() {
                Some(',') => {
                    self.skip_whitespace();
                    // Trailing comma before the closing brace
                    if self.peek() == Some('}') {
                        return Ok(labels);
                    }
                }
                Some('}') => return Ok(labels),
                Some(_) => return Err(self.error("expected ',' or '}'")),
                None => return Err(self.error("unterminated selector")),
            }
        }
    }

    fn name(&mut self) -> Result<String, LabelParseError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return Err(self.error("expected label name")),
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn op(&mut self) -> Result<MatchOp, LabelParseError> {
        let rest = &self.input[self.pos..];
        let (op, len) = if rest.starts_with("=~") {
            (MatchOp::Re, 2)
        } else if rest.starts_with("!=") {
            (MatchOp::NotEq, 2)
        } else if rest.starts_with("!~") {
            (MatchOp::NotRe, 2)
        } else if rest.starts_with('=') {
            (MatchOp::Eq, 1)
        } else {
            return Err(self.error("expected matcher operator"));
        };
        self.pos += len;
        Ok(op)
    }

    fn quoted(&mut self) -> Result<String, LabelParseError> {
        if self.peek() != Some('"') {
            return Err(self.error("expected quoted value"));
        }
        self.pos += 1;

        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(value),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c) => value.push(c),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) => value.push(c),
                None => return Err(self.error("unterminated quoted value")),
            }
        }
    }
}

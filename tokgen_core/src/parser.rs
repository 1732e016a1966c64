use crate::token::{Token, TokenError};
use std::fmt;
use thiserror::Error;

/// The flat input buffer a tree is matched against.
///
/// Cursors are byte offsets into the buffer.
#[derive(Debug, Clone, Copy)]
pub struct ParserInput<'a> {
    data: &'a [u8],
}

impl<'a> ParserInput<'a> {
    pub fn new(data: &'a str) -> Self {
        Self {
            data: data.as_bytes(),
        }
    }

    pub fn from_bytes(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes in `from..to`, or `None` if the range reaches past the end of input.
    pub fn slice(&self, from: usize, to: usize) -> Option<&'a [u8]> {
        self.data.get(from..to)
    }

    /// Lossy text of `from..to`, clamped to the buffer, for diagnostics.
    pub fn excerpt(&self, from: usize, to: usize) -> String {
        let end = to.min(self.data.len());
        let start = from.min(end);
        String::from_utf8_lossy(&self.data[start..end]).into_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The input ended before the token was complete.
    UnexpectedEof,
    /// There was enough input but it did not match the token.
    UnexpectedData,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::UnexpectedEof => write!(f, "unexpected end of input"),
            ParseErrorKind::UnexpectedData => write!(f, "unexpected data"),
        }
    }
}

/// One structured parse failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Byte offset the failing token started matching at.
    pub position: usize,
    /// Human-readable description of what the token accepts.
    pub expected: String,
    /// The text that was found instead. Empty for end-of-input failures at the end.
    pub found: String,
}

impl ParseError {
    pub fn unexpected_eof(
        position: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self {
            kind: ParseErrorKind::UnexpectedEof,
            position,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_data(
        position: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self {
            kind: ParseErrorKind::UnexpectedData,
            position,
            expected: expected.into(),
            found: found.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParseErrorKind::UnexpectedEof => write!(
                f,
                "{} at offset {}: expected {} but got early EOF",
                self.kind, self.position, self.expected
            ),
            ParseErrorKind::UnexpectedData => write!(
                f,
                "{} at offset {}: expected {} but got {:?}",
                self.kind, self.position, self.expected, self.found
            ),
        }
    }
}

/// Ordered, non-empty list of parse failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ParseErrors(Vec<ParseError>);

impl ParseErrors {
    /// Wraps `errors`, returning `None` for an empty list.
    pub fn new(errors: Vec<ParseError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.0
    }

    pub fn first(&self) -> &ParseError {
        &self.0[0]
    }

    pub fn into_vec(self) -> Vec<ParseError> {
        self.0
    }
}

impl From<ParseError> for ParseErrors {
    fn from(error: ParseError) -> Self {
        ParseErrors(vec![error])
    }
}

impl From<ParseError> for TokenError {
    fn from(error: ParseError) -> Self {
        TokenError::Parse(error.into())
    }
}

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

/// Matches `root` against the start of `data` and returns the cursor after the match.
///
/// A full match is one where the returned cursor equals `data.len()`.
pub fn parse(root: &mut dyn Token, data: &str) -> Result<usize, TokenError> {
    let input = ParserInput::new(data);
    let end = root.parse(&input, 0)?;
    tracing::trace!(token = %root.id(), end, len = input.len(), "parsed input prefix");
    Ok(end)
}

/// Like [`parse`] but fails with unexpected data if input remains after the match.
pub fn parse_complete(root: &mut dyn Token, data: &str) -> Result<(), TokenError> {
    let input = ParserInput::new(data);
    let end = root.parse(&input, 0)?;
    if end != input.len() {
        let found = input.excerpt(end, input.len());
        return Err(ParseError::unexpected_data(end, "end of input", found).into());
    }
    Ok(())
}

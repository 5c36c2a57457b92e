use std::fmt;

use crate::syntax::TokenKind;

/// A single lexed token: its kind, its (possibly normalized) text, and the
/// 1-based line it starts on.
///
/// The text is the lexeme as it appears in the source, except for the
/// prefix-stripping normalizations documented on [`TokenKind`]. Line numbers
/// are monotonically non-decreasing across a token stream.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    text: String,
    line: u32,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, text: impl Into<String>, line: u32) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// Consumes the token, returning its text without cloning.
    pub fn into_text(self) -> String {
        self.text
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}@{}\"{}\"",
            self.kind,
            self.line,
            self.text.escape_debug()
        )
    }
}

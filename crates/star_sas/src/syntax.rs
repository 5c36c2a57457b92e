use std::fmt;

/// The closed set of token kinds the lexer can emit.
///
/// Escaped quotes (`U+0007` followed by a quote) and quote or semicolon
/// characters that fail their delimiter context checks are reclassified to
/// [`TokenKind::Characters`] before emission, so they never appear as kinds of
/// their own in the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `#` up to the end of the line, with the `#` stripped from the text.
    Comment,
    /// `global_`, matched case-insensitively.
    GlobalStart,
    /// `data_<suffix>`, with the prefix stripped from the text.
    DataStart,
    /// `save_<suffix>`, with the prefix stripped from the text.
    SaveStart,
    /// A bare `save_`.
    SaveEnd,
    /// `loop_`.
    LoopStart,
    /// `stop_`.
    Stop,
    /// `_` followed by a run of non-whitespace. The underscore is kept.
    TagName,
    /// `$` followed by a run of non-whitespace, with the `$` stripped.
    FrameCode,
    /// Bareword values and the content chunks of delimited values.
    Characters,
    /// A run of `\n`.
    Newline,
    /// A run of whitespace starting with something other than `\n`.
    Space,
    SingleStart,
    SingleEnd,
    DoubleStart,
    DoubleEnd,
    TripleSingleStart,
    TripleSingleEnd,
    TripleDoubleStart,
    TripleDoubleEnd,
    SemiStart,
    SemiEnd,
}

impl TokenKind {
    /// Whitespace kinds that the parsers skip at structural levels.
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Newline | TokenKind::Space)
    }

    /// Kinds that are a complete value on their own, with no closing token.
    pub fn is_plain_value(self) -> bool {
        matches!(self, TokenKind::Characters | TokenKind::FrameCode)
    }

    /// The delimiter a value-opening kind introduces.
    pub fn opening_delimiter(self) -> Option<Delimiter> {
        match self {
            TokenKind::SingleStart => Some(Delimiter::Single),
            TokenKind::DoubleStart => Some(Delimiter::Double),
            TokenKind::TripleSingleStart => Some(Delimiter::TripleSingle),
            TokenKind::TripleDoubleStart => Some(Delimiter::TripleDouble),
            TokenKind::SemiStart => Some(Delimiter::Semicolon),
            _ => None,
        }
    }

    /// The delimiter a value-closing kind terminates.
    pub fn closing_delimiter(self) -> Option<Delimiter> {
        match self {
            TokenKind::SingleEnd => Some(Delimiter::Single),
            TokenKind::DoubleEnd => Some(Delimiter::Double),
            TokenKind::TripleSingleEnd => Some(Delimiter::TripleSingle),
            TokenKind::TripleDoubleEnd => Some(Delimiter::TripleDouble),
            TokenKind::SemiEnd => Some(Delimiter::Semicolon),
            _ => None,
        }
    }

    pub fn is_opening_delimiter(self) -> bool {
        self.opening_delimiter().is_some()
    }

    /// The closing kind paired with a value-opening kind.
    pub fn matching_close(self) -> Option<TokenKind> {
        match self {
            TokenKind::SingleStart => Some(TokenKind::SingleEnd),
            TokenKind::DoubleStart => Some(TokenKind::DoubleEnd),
            TokenKind::TripleSingleStart => Some(TokenKind::TripleSingleEnd),
            TokenKind::TripleDoubleStart => Some(TokenKind::TripleDoubleEnd),
            TokenKind::SemiStart => Some(TokenKind::SemiEnd),
            _ => None,
        }
    }
}

/// The canonical identity of a value delimiter as reported to handlers.
///
/// Bareword values carry no delimiter and are reported as `None` wherever an
/// `Option<Delimiter>` appears in a handler callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Delimiter {
    Single,
    Double,
    TripleSingle,
    TripleDouble,
    Semicolon,
    FrameCode,
}

impl Delimiter {
    /// The delimiter as it appears in the source text (`$` for framecodes).
    pub fn as_str(self) -> &'static str {
        match self {
            Delimiter::Single => "'",
            Delimiter::Double => "\"",
            Delimiter::TripleSingle => "'''",
            Delimiter::TripleDouble => "\"\"\"",
            Delimiter::Semicolon => ";",
            Delimiter::FrameCode => "$",
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

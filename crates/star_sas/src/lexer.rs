//! A streaming, context-sensitive scanner for STAR input.
//!
//! STAR's quoting rules cannot be lexed with a stateless tokenizer: the
//! closing digraph of a single- or double-quoted value is quote-then-
//! whitespace, a semicolon only delimits a text field at column 1, and
//! triple quotes must win over single quotes. The lexer keeps an explicit
//! stack of quoting modes and decides each token with at most one byte of
//! lookahead and one byte of lookbehind within the current buffer.
//!
//! Input must arrive in whole lines; the newline-adjacent checks above are
//! meaningless otherwise. When reading from a [`BufRead`] source the lexer
//! buffers complete lines up to a threshold and scans the buffer; callers in
//! push mode feed complete lines through [`StarLexer::send`].

use std::io::BufRead;

use log::trace;
use memchr::{memchr, memchr_iter};

use crate::error::SasError;
use crate::syntax::TokenKind;
use crate::token::Token;

/// Default buffering threshold for [`StarLexer::from_reader`].
pub const DEFAULT_BUFFER_SIZE: usize = 65_534;

/// The quoting context the scanner is currently inside. An empty mode stack
/// is the initial (structural) context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Single,
    TripleSingle,
    Double,
    TripleDouble,
    Semi,
}

/// The STAR lexer. One token per [`StarLexer::next_token`] call; `None` is
/// end of stream (or, in push mode, "feed me more lines").
pub struct StarLexer<R = std::io::Empty> {
    source: Option<R>,
    bufsize: usize,
    buf: String,
    pos: usize,
    line: u32,
    modes: Vec<Mode>,
}

impl StarLexer<std::io::Empty> {
    /// A push-mode lexer: no source, input arrives via [`StarLexer::send`].
    pub fn new() -> Self {
        Self {
            source: None,
            bufsize: 0,
            buf: String::new(),
            pos: 0,
            line: 1,
            modes: Vec::new(),
        }
    }

    /// Lex a complete in-memory document.
    pub fn from_str(text: &str) -> Self {
        let mut lexer = Self::new();
        lexer.buf = text.to_owned();
        lexer
    }
}

impl Default for StarLexer<std::io::Empty> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: BufRead> StarLexer<R> {
    /// Lex from a reader, buffering whole lines until the buffer reaches
    /// `bufsize` bytes. A `bufsize` of 0 buffers one line at a time.
    pub fn from_reader(source: R, bufsize: usize) -> Self {
        Self {
            source: Some(source),
            bufsize,
            buf: String::new(),
            pos: 0,
            line: 1,
            modes: Vec::new(),
        }
    }

    /// The current 1-based line number.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Feed the next chunk of input. The chunk must be one or more complete
    /// lines and replaces any previously consumed buffer; the mode stack and
    /// line counter carry over.
    pub fn send(&mut self, lines: &str) {
        debug_assert!(
            self.pos >= self.buf.len(),
            "send() called with unconsumed input in the buffer"
        );
        self.buf.clear();
        self.buf.push_str(lines);
        self.pos = 0;
    }

    /// Rewind the scanner by `len` bytes, un-consuming the token that was
    /// just read. The parsers use this to implement implicit loop
    /// termination; it is only valid for a token wholly inside the current
    /// buffer, which every token is.
    pub fn push_back(&mut self, len: usize) -> Result<(), SasError> {
        if len <= self.pos {
            self.pos -= len;
            Ok(())
        } else {
            Err(SasError::PushBack {
                line: self.line,
                len,
            })
        }
    }

    /// Pull the next token. `None` means the input is exhausted; in push
    /// mode the caller may [`StarLexer::send`] more lines and continue.
    pub fn next_token(&mut self) -> Option<Result<Token, SasError>> {
        if self.pos >= self.buf.len() {
            match self.refill() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(err) => return Some(Err(err)),
            }
        }
        Some(self.scan())
    }

    fn refill(&mut self) -> Result<bool, SasError> {
        let Some(source) = self.source.as_mut() else {
            return Ok(false);
        };
        let mut fresh = String::new();
        loop {
            let read = source.read_line(&mut fresh).map_err(|err| SasError::Read {
                line: self.line,
                source: err,
            })?;
            if read == 0 || fresh.len() >= self.bufsize {
                break;
            }
        }
        if fresh.is_empty() {
            return Ok(false);
        }
        self.buf = fresh;
        self.pos = 0;
        Ok(true)
    }

    fn scan(&mut self) -> Result<Token, SasError> {
        match self.modes.last() {
            None => Ok(self.scan_initial()),
            Some(Mode::Single) => self.scan_quoted(b'\''),
            Some(Mode::Double) => self.scan_quoted(b'"'),
            Some(Mode::TripleSingle) => Ok(self.scan_triple(b'\'')),
            Some(Mode::TripleDouble) => Ok(self.scan_triple(b'"')),
            Some(Mode::Semi) => Ok(self.scan_semi()),
        }
    }

    // The structural context. Dispatch happens only at a token start: a
    // quote, semicolon, hash, or escape byte in the middle of a bareword is
    // swallowed by the catch-all non-whitespace run at the bottom.
    fn scan_initial(&mut self) -> Token {
        let start = self.pos;
        let line = self.line;
        let bytes = self.buf.as_bytes();

        match bytes[start] {
            b'\n' => return self.newline_run(start),
            c if c.is_ascii_whitespace() => {
                let end = run_end(bytes, start, |b| b.is_ascii_whitespace());
                self.line += count_newlines(&bytes[start..end]);
                self.pos = end;
                return self.slice_token(TokenKind::Space, start, end, line);
            }
            0x07 => {
                if let Some(quote) = escaped_quote(bytes, start) {
                    self.pos = start + 2;
                    return Token::new(TokenKind::Characters, (quote as char).to_string(), line);
                }
            }
            b'\'' => {
                if bytes[start..].starts_with(b"'''") {
                    self.modes.push(Mode::TripleSingle);
                    trace!("opening triple single quote in line {line}");
                    self.pos = start + 3;
                    return Token::new(TokenKind::TripleSingleStart, "'''", line);
                }
                self.modes.push(Mode::Single);
                trace!("opening single quote in line {line}");
                self.pos = start + 1;
                return Token::new(TokenKind::SingleStart, "'", line);
            }
            b'"' => {
                if bytes[start..].starts_with(b"\"\"\"") {
                    self.modes.push(Mode::TripleDouble);
                    trace!("opening triple double quote in line {line}");
                    self.pos = start + 3;
                    return Token::new(TokenKind::TripleDoubleStart, "\"\"\"", line);
                }
                self.modes.push(Mode::Double);
                trace!("opening double quote in line {line}");
                self.pos = start + 1;
                return Token::new(TokenKind::DoubleStart, "\"", line);
            }
            b';' => {
                // A semicolon opens a text field only at column 1, which
                // within a line-complete buffer means position 0 or right
                // after a newline.
                if start == 0 || bytes[start - 1] == b'\n' {
                    self.modes.push(Mode::Semi);
                    trace!("opening semicolon field in line {line}");
                    self.pos = start + 1;
                    return Token::new(TokenKind::SemiStart, ";", line);
                }
                self.pos = start + 1;
                return Token::new(TokenKind::Characters, ";", line);
            }
            b'#' => {
                let end = memchr(b'\n', &bytes[start..]).map_or(bytes.len(), |at| start + at);
                self.pos = end;
                return self.slice_token(TokenKind::Comment, start + 1, end, line);
            }
            _ => {}
        }

        // Keywords are first-match, not longest-match: `loop_x` is a
        // LoopStart followed by a bareword `x`.
        let rest = &self.buf[start..];
        let word_end = run_end(bytes, start, |b| !b.is_ascii_whitespace());
        if starts_with_ignore_ascii_case(rest, "global_") {
            self.pos = start + 7;
            return self.slice_token(TokenKind::GlobalStart, start, start + 7, line);
        }
        if starts_with_ignore_ascii_case(rest, "data_") && word_end > start + 5 {
            self.pos = word_end;
            return self.slice_token(TokenKind::DataStart, start + 5, word_end, line);
        }
        if rest.starts_with("save_") {
            if word_end > start + 5 {
                self.pos = word_end;
                return self.slice_token(TokenKind::SaveStart, start + 5, word_end, line);
            }
            self.pos = start + 5;
            return Token::new(TokenKind::SaveEnd, "save_", line);
        }
        if rest.starts_with("loop_") {
            self.pos = start + 5;
            return Token::new(TokenKind::LoopStart, "loop_", line);
        }
        if rest.starts_with("stop_") {
            self.pos = start + 5;
            return Token::new(TokenKind::Stop, "stop_", line);
        }
        if bytes[start] == b'_' && word_end > start + 1 {
            self.pos = word_end;
            return self.slice_token(TokenKind::TagName, start, word_end, line);
        }
        if bytes[start] == b'$' && word_end > start + 1 {
            self.pos = word_end;
            return self.slice_token(TokenKind::FrameCode, start + 1, word_end, line);
        }

        self.pos = word_end;
        self.slice_token(TokenKind::Characters, start, word_end, line)
    }

    // Inside a single- or double-quoted value. `quote` is the active quote
    // byte; the other flavor, semicolons, and stray escape bytes are data.
    fn scan_quoted(&mut self, quote: u8) -> Result<Token, SasError> {
        let start = self.pos;
        let line = self.line;
        let bytes = self.buf.as_bytes();

        match bytes[start] {
            b'\n' => {
                let end = run_end(bytes, start, |b| b == b'\n');
                self.line += (end - start) as u32;
                self.pos = end;
                return Err(SasError::NewlineInQuoted { line: self.line });
            }
            0x07 => {
                if let Some(quote) = escaped_quote(bytes, start) {
                    self.pos = start + 2;
                    return Ok(Token::new(
                        TokenKind::Characters,
                        (quote as char).to_string(),
                        line,
                    ));
                }
                // A stray escape byte is carried through as data.
                self.pos = start + 1;
                return Ok(Token::new(TokenKind::Characters, "\u{7}", line));
            }
            c if c == quote => {
                // The closing digraph is quote-then-whitespace; a quote glued
                // to more data is part of the value.
                let closes = match bytes.get(start + 1) {
                    None => true,
                    Some(next) => next.is_ascii_whitespace(),
                };
                self.pos = start + 1;
                if closes {
                    self.modes.pop();
                    trace!("closing quote in line {line}");
                    let kind = if quote == b'\'' {
                        TokenKind::SingleEnd
                    } else {
                        TokenKind::DoubleEnd
                    };
                    return Ok(self.slice_token(kind, start, start + 1, line));
                }
                return Ok(self.slice_token(TokenKind::Characters, start, start + 1, line));
            }
            _ => {}
        }

        let end = run_end(bytes, start, |b| b != quote && b != 0x07 && b != b'\n');
        self.pos = end;
        Ok(self.slice_token(TokenKind::Characters, start, end, line))
    }

    // Inside a triple-quoted value: content comes out as maximal runs of
    // non-quote bytes (which may span lines) or runs of one or two quotes.
    fn scan_triple(&mut self, quote: u8) -> Token {
        let start = self.pos;
        let line = self.line;
        let bytes = self.buf.as_bytes();

        if bytes[start] == b'\n' {
            return self.newline_run(start);
        }
        if let Some(escaped) = escaped_quote(bytes, start) {
            self.pos = start + 2;
            return Token::new(TokenKind::Characters, (escaped as char).to_string(), line);
        }

        let triple: [u8; 3] = [quote; 3];
        if bytes[start..].starts_with(&triple) {
            self.modes.pop();
            trace!("closing triple quote in line {line}");
            let kind = if quote == b'\'' {
                TokenKind::TripleSingleEnd
            } else {
                TokenKind::TripleDoubleEnd
            };
            self.pos = start + 3;
            return self.slice_token(kind, start, start + 3, line);
        }
        if bytes[start] == quote {
            // One or two quotes; three were ruled out above.
            let end = (start + 2).min(run_end(bytes, start, |b| b == quote));
            self.pos = end;
            return self.slice_token(TokenKind::Characters, start, end, line);
        }

        let end = memchr(quote, &bytes[start..]).map_or(bytes.len(), |at| start + at);
        self.line += count_newlines(&bytes[start..end]);
        self.pos = end;
        self.slice_token(TokenKind::Characters, start, end, line)
    }

    // Inside a semicolon-delimited text field: every line is one content
    // token, and only a semicolon at column 1 closes the field.
    fn scan_semi(&mut self) -> Token {
        let start = self.pos;
        let line = self.line;
        let bytes = self.buf.as_bytes();

        match bytes[start] {
            b'\n' => return self.newline_run(start),
            0x07 => {
                if let Some(quote) = escaped_quote(bytes, start) {
                    self.pos = start + 2;
                    return Token::new(TokenKind::Characters, (quote as char).to_string(), line);
                }
            }
            b'\'' | b'"' => {
                self.pos = start + 1;
                return self.slice_token(TokenKind::Characters, start, start + 1, line);
            }
            b';' => {
                if start == 0 || bytes[start - 1] == b'\n' {
                    self.modes.pop();
                    trace!("closing semicolon field in line {line}");
                    self.pos = start + 1;
                    return Token::new(TokenKind::SemiEnd, ";", line);
                }
                self.pos = start + 1;
                return Token::new(TokenKind::Characters, ";", line);
            }
            _ => {}
        }

        let end = memchr(b'\n', &bytes[start..]).map_or(bytes.len(), |at| start + at);
        self.pos = end;
        self.slice_token(TokenKind::Characters, start, end, line)
    }

    fn newline_run(&mut self, start: usize) -> Token {
        let line = self.line;
        let bytes = self.buf.as_bytes();
        let end = run_end(bytes, start, |b| b == b'\n');
        self.line += (end - start) as u32;
        self.pos = end;
        self.slice_token(TokenKind::Newline, start, end, line)
    }

    fn slice_token(&self, kind: TokenKind, start: usize, end: usize, line: u32) -> Token {
        Token::new(kind, &self.buf[start..end], line)
    }
}

impl<R: BufRead> Iterator for StarLexer<R> {
    type Item = Result<Token, SasError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

// A `U+0007` escape is only meaningful right before a quote; the caller
// emits the quote as data with the escape byte stripped.
fn escaped_quote(bytes: &[u8], start: usize) -> Option<u8> {
    if bytes[start] != 0x07 {
        return None;
    }
    match bytes.get(start + 1) {
        Some(&quote @ (b'\'' | b'"')) => Some(quote),
        _ => None,
    }
}

fn run_end(bytes: &[u8], start: usize, pred: impl Fn(u8) -> bool) -> usize {
    let mut end = start;
    while end < bytes.len() && pred(bytes[end]) {
        end += 1;
    }
    end
}

fn count_newlines(bytes: &[u8]) -> u32 {
    memchr_iter(b'\n', bytes).count() as u32
}

fn starts_with_ignore_ascii_case(text: &str, prefix: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= prefix.len() && bytes[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

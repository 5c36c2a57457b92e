//! The dialect parsers.
//!
//! Each parser is a small explicit state machine that pulls tokens from a
//! [`StarLexer`], drives one of the handler contracts, and routes every
//! diagnostic through an [`ErrorHandler`]. The machines differ only where
//! the dialects do: NMR-STAR requires explicit `stop_` loop terminators and
//! treats EOF inside a saveframe or loop as fatal; mmCIF has no saveframes
//! and ends loops implicitly by pushing the triggering token back into the
//! lexer; DDL accepts the superset of both plus `global_` blocks and
//! multiple data blocks per file.

use std::io::BufRead;

use crate::error::{ErrorHandler, SasError};
use crate::handler::Flow;
use crate::lexer::StarLexer;
use crate::sniffer::find_keyword;
use crate::syntax::TokenKind;
use crate::token::Token;

mod ddl;
mod mmcif;
mod nmrstar;
mod stream;
mod tagvalue;

pub use ddl::DdlParser;
pub use mmcif::CifParser;
pub use nmrstar::NmrStarParser;
pub use stream::NmrStarStreamParser;
pub use tagvalue::NmrStarTagValueParser;

/// The data-block name reported by `end_data` when the stream ends before
/// any `data_` block was declared.
pub const UNNAMED_DATA_BLOCK: &str = "__FILE__";

/// The saveframe name used when a frame has to be reported before its name
/// is known.
pub const UNNAMED_SAVEFRAME: &str = "__UNNAMED__";

/// Stand-in tag recorded when a loop delivers values without any tags and a
/// cooperative error sink chose to keep parsing.
pub(crate) const PLACEHOLDER_TAG: &str = "LOOP_WITH_NO_TAGS";

/// One pull from the lexer with the fatal-forwarding policy applied: a lexer
/// error is reported to the sink and collapses to [`Step::Fatal`].
pub(crate) enum Step {
    Token(Token),
    Eof,
    Fatal,
}

pub(crate) fn next_step<R: BufRead, E: ErrorHandler>(
    lexer: &mut StarLexer<R>,
    errors: &mut E,
) -> Step {
    match lexer.next_token() {
        None => Step::Eof,
        Some(Ok(token)) => Step::Token(token),
        Some(Err(err)) => {
            errors.fatal(err.line(), &format!("lexer error: {err}"));
            Step::Fatal
        }
    }
}

/// The on-disk length of a token's lexeme, restoring the prefixes the lexer
/// strips. Needed to rewind the scanner by exactly one token.
pub(crate) fn lexeme_len(token: &Token) -> usize {
    match token.kind() {
        TokenKind::DataStart | TokenKind::SaveStart => token.text().len() + 5,
        TokenKind::FrameCode | TokenKind::Comment => token.text().len() + 1,
        _ => token.text().len(),
    }
}

/// Un-consume `token` so the enclosing scope re-reads it. Reports `fatal`
/// and answers [`Flow::Stop`] if the scanner cannot rewind that far.
pub(crate) fn push_back_token<R: BufRead, E: ErrorHandler>(
    lexer: &mut StarLexer<R>,
    errors: &mut E,
    token: &Token,
) -> Flow {
    match lexer.push_back(lexeme_len(token)) {
        Ok(()) => Flow::Continue,
        Err(err @ SasError::PushBack { .. }) => {
            errors.fatal(token.line(), &format!("{err}: `{}`", token.text()));
            Flow::Stop
        }
        Err(err) => {
            errors.fatal(err.line(), &err.to_string());
            Flow::Stop
        }
    }
}

/// Reads a delimited value after its opening token, returning the
/// accumulated text and a stop hint.
///
/// Chunks of multi-line values (semicolon and triple-quoted) are run through
/// the keyword sniffer; a warning's stop hint is honored once the value
/// completes. For semicolon fields the trailing newline belongs to the
/// closing `\n;` digraph and is stripped. A newline inside a single- or
/// double-quoted value surfaces from the lexer as a fatal error, as does EOF
/// before the closing delimiter.
pub(crate) fn read_delimited_value<R: BufRead, E: ErrorHandler>(
    lexer: &mut StarLexer<R>,
    errors: &mut E,
    open: TokenKind,
) -> (String, Flow) {
    let close = open
        .matching_close()
        .expect("read_delimited_value requires an opening delimiter token");
    let multi_line = matches!(
        open,
        TokenKind::SemiStart | TokenKind::TripleSingleStart | TokenKind::TripleDoubleStart
    );

    let mut value = String::new();
    let mut stop = Flow::Continue;
    let mut last_line = lexer.line();
    loop {
        let token = match next_step(lexer, errors) {
            Step::Fatal => return (value, Flow::Stop),
            Step::Eof => {
                errors.fatal(last_line, "EOF in delimited value");
                return (value, Flow::Stop);
            }
            Step::Token(token) => token,
        };
        last_line = token.line();

        if token.kind() == close {
            if open == TokenKind::SemiStart {
                while value.ends_with('\n') {
                    value.pop();
                }
            }
            break;
        }

        if multi_line {
            if let Some(keyword) = find_keyword(token.text()) {
                let hint = errors.warning(token.line(), &format!("keyword in value: {keyword}"));
                if hint.is_stop() {
                    stop = Flow::Stop;
                }
            }
        }
        value.push_str(token.text());
    }

    (value, stop)
}

//! Event-driven (SAX-style) parsers for the STAR family of text formats.
//!
//! STAR is the self-describing tag/value format used by crystallography and
//! NMR data archives. Three dialects are handled from a single lexer:
//!
//! - **NMR-STAR**: one data block per file containing named saveframes;
//!   loops end with an explicit `stop_`.
//! - **mmCIF**: one data block per file, no saveframes; loops end implicitly
//!   at the next token that is not a loop value.
//! - **DDL / generic STAR**: multiple data blocks, optional `global_`
//!   blocks, saveframes, and both loop-termination styles.
//!
//! The pipeline is two stages: [`StarLexer`] turns bytes into tokens, and a
//! dialect parser turns tokens into callbacks on one of three handler
//! contracts of increasing granularity ([`ContentHandler`],
//! [`TagValueHandler`], [`StreamHandler`]). Diagnostics flow through an
//! [`ErrorHandler`] sink whose non-fatal callbacks answer a stop hint the
//! parsers honor at every reporting site.
//!
//! The lexer accepts the 1991/1994 STAR syntax plus the 2012 triple-quote
//! extension; the other STAR-2012 extensions (lists, tables, references)
//! are out of scope. Input must be fed in whole lines, because the quoting
//! rules depend on newline-adjacent context.
//!
//! References:
//!
//! 1. Hall, S. R., "The STAR File: A New Format for Electronic Data
//!    Transfer and Archiving", J. Chem. Inf. Comput. Sci. 31, 326-333
//!    (1991).
//! 2. Hall, S. R. and Spadaccini, N., "The STAR File: Detailed
//!    Specifications", J. Chem. Inf. Comput. Sci. 34, 505-508 (1994).
//! 3. Spadaccini, N. and Hall, S. R., "Extensions to the STAR File Syntax",
//!    J. Chem. Inf. Model. 52 (8), 1901-1906 (2012).

pub use error::{ErrorHandler, LoggingErrorHandler, SasError};
pub use handler::{ContentHandler, DataItem, Flow, StreamHandler, TagValueHandler};
pub use lexer::{StarLexer, DEFAULT_BUFFER_SIZE};
pub use parser::{
    CifParser, DdlParser, NmrStarParser, NmrStarStreamParser, NmrStarTagValueParser,
    UNNAMED_DATA_BLOCK, UNNAMED_SAVEFRAME,
};
pub use quickcheck::{Dialect, QuickCheck};
pub use sniffer::find_keyword;
pub use syntax::{Delimiter, TokenKind};
pub use token::Token;

mod error;
mod handler;
mod lexer;
mod parser;
mod quickcheck;
mod sniffer;
mod syntax;
mod token;

use std::io::BufRead;

/// Parse NMR-STAR input, delivering reassembled tag/value items.
pub fn parse_nmr_star<R: BufRead>(
    lexer: StarLexer<R>,
    handler: &mut impl ContentHandler,
    errors: &mut impl ErrorHandler,
) {
    NmrStarParser::new(lexer, handler, errors).parse()
}

/// Parse NMR-STAR input, delivering tags and values in on-disk order.
pub fn parse_nmr_star_tag_value<R: BufRead>(
    lexer: StarLexer<R>,
    handler: &mut impl TagValueHandler,
    errors: &mut impl ErrorHandler,
) {
    NmrStarTagValueParser::new(lexer, handler, errors).parse()
}

/// Parse NMR-STAR input, streaming value content chunk by chunk.
pub fn parse_nmr_star_stream<R: BufRead>(
    lexer: StarLexer<R>,
    handler: &mut impl StreamHandler,
    errors: &mut impl ErrorHandler,
) {
    NmrStarStreamParser::new(lexer, handler, errors).parse()
}

/// Parse mmCIF input, delivering reassembled tag/value items.
pub fn parse_mmcif<R: BufRead>(
    lexer: StarLexer<R>,
    handler: &mut impl ContentHandler,
    errors: &mut impl ErrorHandler,
) {
    CifParser::new(lexer, handler, errors).parse()
}

/// Parse DDL or generic STAR input, delivering reassembled tag/value items.
pub fn parse_ddl<R: BufRead>(
    lexer: StarLexer<R>,
    handler: &mut impl ContentHandler,
    errors: &mut impl ErrorHandler,
) {
    DdlParser::new(lexer, handler, errors).parse()
}

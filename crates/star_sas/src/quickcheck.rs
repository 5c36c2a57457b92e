//! A minimal consumer that validates syntax and, optionally, tag names.

use std::cell::Cell;
use std::collections::HashSet;
use std::io::{self, BufRead};
use std::rc::Rc;

use log::{error, warn};

use crate::error::ErrorHandler;
use crate::handler::{ContentHandler, DataItem, Flow};
use crate::lexer::StarLexer;
use crate::parser::{CifParser, DdlParser, NmrStarParser};

/// Which dialect's grammar a quick check should enforce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    NmrStar,
    MmCif,
    Ddl,
}

/// Parses a file to make sure it is valid, reporting each problem through
/// the `log` facade.
///
/// With a tag list, every tag in the file that is not in the list is also
/// reported and fails the check. Structural errors stop at the first one;
/// warnings never fail a check.
pub struct QuickCheck {
    allowed: Option<HashSet<String>>,
    failed: Rc<Cell<bool>>,
}

impl QuickCheck {
    pub fn new(allowed: Option<HashSet<String>>) -> Self {
        Self {
            allowed,
            failed: Rc::new(Cell::new(false)),
        }
    }

    /// Read a tag list, one tag per line, trimming matching single or
    /// double quotes around each entry. Blank lines are skipped.
    pub fn load_tag_list(reader: impl BufRead) -> io::Result<HashSet<String>> {
        let mut tags = HashSet::new();
        for line in reader.lines() {
            let line = line?;
            let tag = line.trim();
            let tag = tag
                .strip_prefix('\'')
                .and_then(|inner| inner.strip_suffix('\''))
                .or_else(|| {
                    tag.strip_prefix('"')
                        .and_then(|inner| inner.strip_suffix('"'))
                })
                .unwrap_or(tag);
            if !tag.is_empty() {
                tags.insert(tag.to_owned());
            }
        }
        Ok(tags)
    }

    /// Run the given dialect's parser over the input; true means the file
    /// passed.
    pub fn check<R: BufRead>(&mut self, lexer: StarLexer<R>, dialect: Dialect) -> bool {
        self.failed.set(false);
        let mut sink = QuickCheckSink {
            failed: Rc::clone(&self.failed),
        };
        match dialect {
            Dialect::NmrStar => NmrStarParser::new(lexer, self, &mut sink).parse(),
            Dialect::MmCif => CifParser::new(lexer, self, &mut sink).parse(),
            Dialect::Ddl => DdlParser::new(lexer, self, &mut sink).parse(),
        }
        !self.failed.get()
    }
}

impl ContentHandler for QuickCheck {
    fn start_data(&mut self, _line: u32, _name: &str) -> Flow {
        Flow::Continue
    }

    fn end_data(&mut self, _line: u32, _name: &str) {}

    fn start_loop(&mut self, _line: u32) -> Flow {
        Flow::Continue
    }

    fn end_loop(&mut self, _line: u32) -> Flow {
        Flow::Continue
    }

    fn comment(&mut self, _line: u32, _text: &str) -> Flow {
        Flow::Continue
    }

    fn data(&mut self, item: &DataItem<'_>) -> Flow {
        if let Some(allowed) = &self.allowed {
            if !allowed.contains(item.tag) {
                error!("invalid tag in line {}: {}", item.tag_line, item.tag);
                self.failed.set(true);
            }
        }
        Flow::Continue
    }
}

/// The error sink side of a quick check: any error or fatal fails the run.
struct QuickCheckSink {
    failed: Rc<Cell<bool>>,
}

impl ErrorHandler for QuickCheckSink {
    fn fatal(&mut self, line: u32, msg: &str) {
        error!("critical parse error in line {line}: {msg}");
        self.failed.set(true);
    }

    fn error(&mut self, line: u32, msg: &str) -> Flow {
        error!("parse error in line {line}: {msg}");
        self.failed.set(true);
        Flow::Stop
    }

    fn warning(&mut self, line: u32, msg: &str) -> Flow {
        warn!("parser warning in line {line}: {msg}");
        Flow::Continue
    }
}

//! The three content-handler contracts a parser can drive.
//!
//! All three observe the same structural events; they differ only in how data
//! items are delivered. [`ContentHandler`] reassembles each tag/value pair
//! into one callback, [`TagValueHandler`] delivers tags and values separately
//! in on-disk order, and [`StreamHandler`] is the most SAX-like, streaming
//! large delimited values chunk by chunk with bounded memory.
//!
//! Every callback except the `end_data`/`end_saveframe` terminators answers a
//! [`Flow`] hint; [`Flow::Stop`] asks the parser to cease parsing, after which
//! no further callbacks fire.

use crate::syntax::Delimiter;

/// A stop hint returned by handler and error-sink callbacks.
#[must_use = "the parser must honor a Stop hint at every reporting site"]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

impl Flow {
    pub fn is_stop(self) -> bool {
        matches!(self, Flow::Stop)
    }

    pub fn is_continue(self) -> bool {
        !self.is_stop()
    }
}

/// A fully reassembled data item as delivered to [`ContentHandler::data`].
///
/// For loop rows, the parser matches each value to its tag by position
/// (modulo the tag count) and sets `in_loop`.
#[derive(Clone, Copy, Debug)]
pub struct DataItem<'a> {
    pub tag: &'a str,
    pub tag_line: u32,
    pub value: &'a str,
    pub value_line: u32,
    /// The opening delimiter, or `None` for a bareword value.
    pub delim: Option<Delimiter>,
    pub in_loop: bool,
}

/// The item-oriented contract: one callback per tag/value pair.
///
/// Convenient in most cases, but buffers whole semicolon- and triple-quoted
/// values in memory. Global and saveframe callbacks have no-op defaults since
/// neither exists in mmCIF and globals do not exist in NMR-STAR.
pub trait ContentHandler {
    fn start_global(&mut self, _line: u32) -> Flow {
        Flow::Continue
    }
    fn end_global(&mut self, _line: u32) -> Flow {
        Flow::Continue
    }
    fn start_data(&mut self, line: u32, name: &str) -> Flow;
    fn end_data(&mut self, line: u32, name: &str);
    fn start_saveframe(&mut self, _line: u32, _name: &str) -> Flow {
        Flow::Continue
    }
    fn end_saveframe(&mut self, _line: u32, _name: &str) {}
    fn start_loop(&mut self, line: u32) -> Flow;
    fn end_loop(&mut self, line: u32) -> Flow;
    fn comment(&mut self, line: u32, text: &str) -> Flow;
    fn data(&mut self, item: &DataItem<'_>) -> Flow;
}

/// The tag-then-value contract: separate callbacks for tags and values.
///
/// Loops are delivered "as is": all tags first, then all values in row-major
/// order. Convenient for e.g. database insertions.
pub trait TagValueHandler {
    fn start_global(&mut self, _line: u32) -> Flow {
        Flow::Continue
    }
    fn end_global(&mut self, _line: u32) -> Flow {
        Flow::Continue
    }
    fn start_data(&mut self, line: u32, name: &str) -> Flow;
    fn end_data(&mut self, line: u32, name: &str);
    fn start_saveframe(&mut self, _line: u32, _name: &str) -> Flow {
        Flow::Continue
    }
    fn end_saveframe(&mut self, _line: u32, _name: &str) {}
    fn start_loop(&mut self, line: u32) -> Flow;
    fn end_loop(&mut self, line: u32) -> Flow;
    fn comment(&mut self, line: u32, text: &str) -> Flow;
    fn tag(&mut self, line: u32, name: &str) -> Flow;
    fn value(&mut self, line: u32, text: &str, delim: Option<Delimiter>) -> Flow;
}

/// The streaming contract: values arrive as
/// `start_value` → `characters`* → `end_value`.
///
/// Semicolon and triple-quoted values may produce several `characters` events
/// per value; barewords and framecodes are wrapped in a synthetic triplet so
/// consumers see a uniform surface. This is the leanest contract and the
/// fastest on files with very large text fields.
pub trait StreamHandler {
    fn start_global(&mut self, _line: u32) -> Flow {
        Flow::Continue
    }
    fn end_global(&mut self, _line: u32) -> Flow {
        Flow::Continue
    }
    fn start_data(&mut self, line: u32, name: &str) -> Flow;
    fn end_data(&mut self, line: u32, name: &str);
    fn start_saveframe(&mut self, _line: u32, _name: &str) -> Flow {
        Flow::Continue
    }
    fn end_saveframe(&mut self, _line: u32, _name: &str) {}
    fn start_loop(&mut self, line: u32) -> Flow;
    fn end_loop(&mut self, line: u32) -> Flow;
    fn comment(&mut self, line: u32, text: &str) -> Flow;
    fn tag(&mut self, line: u32, name: &str) -> Flow;
    fn start_value(&mut self, line: u32, delim: Option<Delimiter>) -> Flow;
    fn characters(&mut self, line: u32, text: &str) -> Flow;
    fn end_value(&mut self, line: u32, delim: Option<Delimiter>) -> Flow;
}

//! Shared recording handlers and runners for the integration tests. Every
//! callback is captured as one compact line so expected event streams can be
//! written out literally in the tests.

use star_sas::{
    ContentHandler, DataItem, Delimiter, ErrorHandler, Flow, SasError, StarLexer, StreamHandler,
    TagValueHandler, Token, TokenKind,
};

pub fn delim_str(delim: Option<Delimiter>) -> &'static str {
    delim.map(Delimiter::as_str).unwrap_or("-")
}

/// Records [`ContentHandler`] callbacks. With `stop_at` set, the callback
/// that records the n-th event (1-based) answers [`Flow::Stop`].
#[derive(Default)]
pub struct ItemRecorder {
    pub events: Vec<String>,
    pub stop_at: Option<usize>,
}

impl ItemRecorder {
    #[allow(unused)]
    pub fn stopping_at(event_count: usize) -> Self {
        Self {
            events: Vec::new(),
            stop_at: Some(event_count),
        }
    }

    fn push(&mut self, event: String) -> Flow {
        self.events.push(event);
        match self.stop_at {
            Some(n) if self.events.len() >= n => Flow::Stop,
            _ => Flow::Continue,
        }
    }
}

impl ContentHandler for ItemRecorder {
    fn start_global(&mut self, line: u32) -> Flow {
        self.push(format!("start_global({line})"))
    }

    fn end_global(&mut self, line: u32) -> Flow {
        self.push(format!("end_global({line})"))
    }

    fn start_data(&mut self, line: u32, name: &str) -> Flow {
        self.push(format!("start_data({line},{name})"))
    }

    fn end_data(&mut self, line: u32, name: &str) {
        self.events.push(format!("end_data({line},{name})"));
    }

    fn start_saveframe(&mut self, line: u32, name: &str) -> Flow {
        self.push(format!("start_saveframe({line},{name})"))
    }

    fn end_saveframe(&mut self, line: u32, name: &str) {
        self.events.push(format!("end_saveframe({line},{name})"));
    }

    fn start_loop(&mut self, line: u32) -> Flow {
        self.push(format!("start_loop({line})"))
    }

    fn end_loop(&mut self, line: u32) -> Flow {
        self.push(format!("end_loop({line})"))
    }

    fn comment(&mut self, line: u32, text: &str) -> Flow {
        self.push(format!("comment({line},{text})"))
    }

    fn data(&mut self, item: &DataItem<'_>) -> Flow {
        self.push(format!(
            "data({},{},{:?},{},{},{})",
            item.tag,
            item.tag_line,
            item.value,
            item.value_line,
            delim_str(item.delim),
            item.in_loop
        ))
    }
}

/// Records [`TagValueHandler`] callbacks.
#[derive(Default)]
pub struct PairRecorder {
    pub events: Vec<String>,
}

impl PairRecorder {
    fn push(&mut self, event: String) -> Flow {
        self.events.push(event);
        Flow::Continue
    }
}

impl TagValueHandler for PairRecorder {
    fn start_data(&mut self, line: u32, name: &str) -> Flow {
        self.push(format!("start_data({line},{name})"))
    }

    fn end_data(&mut self, line: u32, name: &str) {
        self.events.push(format!("end_data({line},{name})"));
    }

    fn start_saveframe(&mut self, line: u32, name: &str) -> Flow {
        self.push(format!("start_saveframe({line},{name})"))
    }

    fn end_saveframe(&mut self, line: u32, name: &str) {
        self.events.push(format!("end_saveframe({line},{name})"));
    }

    fn start_loop(&mut self, line: u32) -> Flow {
        self.push(format!("start_loop({line})"))
    }

    fn end_loop(&mut self, line: u32) -> Flow {
        self.push(format!("end_loop({line})"))
    }

    fn comment(&mut self, line: u32, text: &str) -> Flow {
        self.push(format!("comment({line},{text})"))
    }

    fn tag(&mut self, line: u32, name: &str) -> Flow {
        self.push(format!("tag({line},{name})"))
    }

    fn value(&mut self, line: u32, text: &str, delim: Option<Delimiter>) -> Flow {
        self.push(format!("value({line},{text:?},{})", delim_str(delim)))
    }
}

/// Records [`StreamHandler`] callbacks. Besides the event log it assembles
/// each value from its chunks, for comparison with the item parser.
#[derive(Default)]
pub struct StreamRecorder {
    pub events: Vec<String>,
    pub values: Vec<String>,
    current_value: Option<String>,
}

impl StreamRecorder {
    fn push(&mut self, event: String) -> Flow {
        self.events.push(event);
        Flow::Continue
    }
}

impl StreamHandler for StreamRecorder {
    fn start_data(&mut self, line: u32, name: &str) -> Flow {
        self.push(format!("start_data({line},{name})"))
    }

    fn end_data(&mut self, line: u32, name: &str) {
        self.events.push(format!("end_data({line},{name})"));
    }

    fn start_saveframe(&mut self, line: u32, name: &str) -> Flow {
        self.push(format!("start_saveframe({line},{name})"))
    }

    fn end_saveframe(&mut self, line: u32, name: &str) {
        self.events.push(format!("end_saveframe({line},{name})"));
    }

    fn start_loop(&mut self, line: u32) -> Flow {
        self.push(format!("start_loop({line})"))
    }

    fn end_loop(&mut self, line: u32) -> Flow {
        self.push(format!("end_loop({line})"))
    }

    fn comment(&mut self, line: u32, text: &str) -> Flow {
        self.push(format!("comment({line},{text})"))
    }

    fn tag(&mut self, line: u32, name: &str) -> Flow {
        self.push(format!("tag({line},{name})"))
    }

    fn start_value(&mut self, line: u32, delim: Option<Delimiter>) -> Flow {
        self.current_value = Some(String::new());
        self.push(format!("start_value({line},{})", delim_str(delim)))
    }

    fn characters(&mut self, line: u32, text: &str) -> Flow {
        if let Some(value) = self.current_value.as_mut() {
            value.push_str(text);
        }
        self.push(format!("characters({line},{text:?})"))
    }

    fn end_value(&mut self, line: u32, delim: Option<Delimiter>) -> Flow {
        if let Some(value) = self.current_value.take() {
            self.values.push(value);
        }
        self.push(format!("end_value({line},{})", delim_str(delim)))
    }
}

/// Records error-sink callbacks. The default answers [`Flow::Stop`] on
/// errors like the library's logging sink; `lenient()` keeps going.
pub struct Sink {
    pub events: Vec<String>,
    pub stop_on_error: bool,
}

impl Default for Sink {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            stop_on_error: true,
        }
    }
}

impl Sink {
    #[allow(unused)]
    pub fn lenient() -> Self {
        Self {
            events: Vec::new(),
            stop_on_error: false,
        }
    }
}

impl ErrorHandler for Sink {
    fn fatal(&mut self, line: u32, msg: &str) {
        self.events.push(format!("fatal({line},{msg})"));
    }

    fn error(&mut self, line: u32, msg: &str) -> Flow {
        self.events.push(format!("error({line},{msg})"));
        if self.stop_on_error {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }

    fn warning(&mut self, line: u32, msg: &str) -> Flow {
        self.events.push(format!("warning({line},{msg})"));
        Flow::Continue
    }
}

#[allow(unused)]
pub fn run_nmr_star(input: &str) -> (ItemRecorder, Sink) {
    let mut handler = ItemRecorder::default();
    let mut sink = Sink::default();
    star_sas::parse_nmr_star(StarLexer::from_str(input), &mut handler, &mut sink);
    (handler, sink)
}

#[allow(unused)]
pub fn run_mmcif(input: &str) -> (ItemRecorder, Sink) {
    let mut handler = ItemRecorder::default();
    let mut sink = Sink::default();
    star_sas::parse_mmcif(StarLexer::from_str(input), &mut handler, &mut sink);
    (handler, sink)
}

#[allow(unused)]
pub fn run_ddl(input: &str) -> (ItemRecorder, Sink) {
    let mut handler = ItemRecorder::default();
    let mut sink = Sink::default();
    star_sas::parse_ddl(StarLexer::from_str(input), &mut handler, &mut sink);
    (handler, sink)
}

#[allow(unused)]
pub fn run_nmr_star_tag_value(input: &str) -> (PairRecorder, Sink) {
    let mut handler = PairRecorder::default();
    let mut sink = Sink::default();
    star_sas::parse_nmr_star_tag_value(StarLexer::from_str(input), &mut handler, &mut sink);
    (handler, sink)
}

#[allow(unused)]
pub fn run_nmr_star_stream(input: &str) -> (StreamRecorder, Sink) {
    let mut handler = StreamRecorder::default();
    let mut sink = Sink::default();
    star_sas::parse_nmr_star_stream(StarLexer::from_str(input), &mut handler, &mut sink);
    (handler, sink)
}

/// Collects the full token stream, panicking on a lexer error.
#[allow(unused)]
pub fn lex(input: &str) -> Vec<Token> {
    StarLexer::from_str(input)
        .collect::<Result<Vec<_>, _>>()
        .expect("input must lex cleanly")
}

/// Collects tokens until the first lexer error, returning both.
#[allow(unused)]
pub fn lex_until_error(input: &str) -> (Vec<Token>, Option<SasError>) {
    let mut tokens = Vec::new();
    let mut lexer = StarLexer::from_str(input);
    while let Some(result) = lexer.next_token() {
        match result {
            Ok(token) => tokens.push(token),
            Err(err) => return (tokens, Some(err)),
        }
    }
    (tokens, None)
}

/// `(kind, text, line)` triples for compact comparison.
#[allow(unused)]
pub fn lex_triples(input: &str) -> Vec<(TokenKind, String, u32)> {
    lex(input)
        .into_iter()
        .map(|token| (token.kind(), token.text().to_owned(), token.line()))
        .collect()
}

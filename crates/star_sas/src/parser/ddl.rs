use std::io::BufRead;

use log::debug;

use crate::error::ErrorHandler;
use crate::handler::{ContentHandler, DataItem, Flow};
use crate::lexer::StarLexer;
use crate::syntax::{Delimiter, TokenKind};

use super::{
    next_step, push_back_token, read_delimited_value, Step, PLACEHOLDER_TAG, UNNAMED_DATA_BLOCK,
};

/// Whether a block scope was opened by `data_<name>` or `global_`, which
/// decides the terminator callback it gets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scope {
    Data,
    Global,
}

/// DDL / generic STAR parser over the item-oriented [`ContentHandler`]
/// contract.
///
/// This is the superset dialect: a file may hold multiple data blocks and
/// `global_` blocks; blocks mix items, loops, and saveframes; and loops end
/// either with an explicit `stop_` or implicitly at the next structural
/// token, which is pushed back for the enclosing scope. Saveframes still
/// require their explicit `save_` closer.
pub struct DdlParser<'a, R, H, E> {
    lexer: StarLexer<R>,
    handler: &'a mut H,
    errors: &'a mut E,
    data_name: String,
    last_line: u32,
    data_seen: bool,
    data_open: bool,
    error_stop: bool,
}

impl<'a, R: BufRead, H: ContentHandler, E: ErrorHandler> DdlParser<'a, R, H, E> {
    pub fn new(lexer: StarLexer<R>, handler: &'a mut H, errors: &'a mut E) -> Self {
        Self {
            lexer,
            handler,
            errors,
            data_name: UNNAMED_DATA_BLOCK.to_owned(),
            last_line: 0,
            data_seen: false,
            data_open: false,
            error_stop: false,
        }
    }

    /// Run the parse to completion, a requested stop, or a fatal error.
    ///
    /// If the stream ends before any `data_` block was declared, `end_data`
    /// still fires once with the [`UNNAMED_DATA_BLOCK`] sentinel.
    pub fn parse(mut self) {
        debug!("parsing DDL (item handler)");
        loop {
            let token = match next_step(&mut self.lexer, self.errors) {
                Step::Fatal => return,
                Step::Eof => break,
                Step::Token(token) => token,
            };
            self.last_line = token.line();
            match token.kind() {
                kind if kind.is_trivia() => {}
                TokenKind::Comment => {
                    if self.handler.comment(token.line(), token.text()).is_stop() {
                        return;
                    }
                }
                TokenKind::DataStart => {
                    if self.handler.start_data(token.line(), token.text()).is_stop() {
                        return;
                    }
                    self.data_seen = true;
                    self.data_open = true;
                    self.data_name = token.into_text();
                    if self.parse_block(Scope::Data).is_stop() {
                        self.close_after_error_stop();
                        return;
                    }
                }
                TokenKind::GlobalStart => {
                    if self.handler.start_global(token.line()).is_stop() {
                        return;
                    }
                    if self.parse_block(Scope::Global).is_stop() {
                        self.close_after_error_stop();
                        return;
                    }
                }
                _ => {
                    if self
                        .report(
                            token.line(),
                            &format!(
                                "invalid token at file level: {:?} : {}",
                                token.kind(),
                                token.text()
                            ),
                        )
                        .is_stop()
                    {
                        self.close_after_error_stop();
                        return;
                    }
                }
            }
        }
        if !self.data_seen {
            self.handler.end_data(self.last_line, UNNAMED_DATA_BLOCK);
        }
    }

    /// Parse the inside of a data or global block. The block ends at the
    /// next `data_`/`global_` (pushed back for `parse` to re-read) or EOF;
    /// either way this emits the matching terminator itself.
    fn parse_block(&mut self, scope: Scope) -> Flow {
        debug!("entering {scope:?} block `{}`", self.data_name);
        let mut need_value = false;
        let mut last_tag: Option<(String, u32)> = None;
        loop {
            let token = match next_step(&mut self.lexer, self.errors) {
                Step::Fatal => return Flow::Stop,
                Step::Eof => {
                    if need_value {
                        self.errors
                            .fatal(self.last_line, "premature EOF, expected value");
                        return Flow::Stop;
                    }
                    return self.end_block(scope, self.last_line);
                }
                Step::Token(token) => token,
            };
            self.last_line = token.line();
            match token.kind() {
                kind if kind.is_trivia() => {}
                TokenKind::Comment => {
                    if self.handler.comment(token.line(), token.text()).is_stop() {
                        return Flow::Stop;
                    }
                }
                TokenKind::DataStart | TokenKind::GlobalStart => {
                    if need_value
                        && self
                            .report(token.line(), "found block start, expected value")
                            .is_stop()
                    {
                        return Flow::Stop;
                    }
                    if self.end_block(scope, token.line()).is_stop() {
                        return Flow::Stop;
                    }
                    return push_back_token(&mut self.lexer, self.errors, &token);
                }
                TokenKind::SaveStart => {
                    if need_value
                        && self
                            .report(token.line(), "found save_, expected value")
                            .is_stop()
                    {
                        return Flow::Stop;
                    }
                    if self
                        .handler
                        .start_saveframe(token.line(), token.text())
                        .is_stop()
                    {
                        return Flow::Stop;
                    }
                    if self.parse_save(token.text()).is_stop() {
                        return Flow::Stop;
                    }
                }
                TokenKind::LoopStart => {
                    if need_value
                        && self
                            .report(token.line(), "found loop_, expected value")
                            .is_stop()
                    {
                        return Flow::Stop;
                    }
                    if self.handler.start_loop(token.line()).is_stop() {
                        return Flow::Stop;
                    }
                    if self.parse_loop().is_stop() {
                        return Flow::Stop;
                    }
                }
                TokenKind::TagName => {
                    if need_value
                        && self
                            .report(
                                token.line(),
                                &format!("found tag: {}, expected value", token.text()),
                            )
                            .is_stop()
                    {
                        return Flow::Stop;
                    }
                    let line = token.line();
                    last_tag = Some((token.into_text(), line));
                    need_value = true;
                }
                kind if kind.is_plain_value() => {
                    if !need_value
                        && self
                            .report(
                                token.line(),
                                &format!("value not expected here: {}", token.text()),
                            )
                            .is_stop()
                    {
                        return Flow::Stop;
                    }
                    if let Some((tag, tag_line)) = &last_tag {
                        let delim = (kind == TokenKind::FrameCode).then_some(Delimiter::FrameCode);
                        let item = DataItem {
                            tag,
                            tag_line: *tag_line,
                            value: token.text(),
                            value_line: token.line(),
                            delim,
                            in_loop: false,
                        };
                        if self.handler.data(&item).is_stop() {
                            return Flow::Stop;
                        }
                    }
                    need_value = false;
                }
                kind if kind.is_opening_delimiter() => {
                    if !need_value
                        && self
                            .report(token.line(), "value not expected here (found delimiter)")
                            .is_stop()
                    {
                        return Flow::Stop;
                    }
                    let (value, stop) = read_delimited_value(&mut self.lexer, self.errors, kind);
                    if stop.is_stop() {
                        return Flow::Stop;
                    }
                    if let Some((tag, tag_line)) = &last_tag {
                        let item = DataItem {
                            tag,
                            tag_line: *tag_line,
                            value: &value,
                            value_line: token.line(),
                            delim: kind.opening_delimiter(),
                            in_loop: false,
                        };
                        if self.handler.data(&item).is_stop() {
                            return Flow::Stop;
                        }
                    }
                    need_value = false;
                }
                _ => {
                    if self
                        .report(
                            token.line(),
                            &format!(
                                "invalid token in block: {:?} : {}",
                                token.kind(),
                                token.text()
                            ),
                        )
                        .is_stop()
                    {
                        return Flow::Stop;
                    }
                }
            }
        }
    }

    fn parse_save(&mut self, name: &str) -> Flow {
        debug!("entering saveframe `{name}`");
        let mut need_value = false;
        let mut last_tag: Option<(String, u32)> = None;
        loop {
            let token = match next_step(&mut self.lexer, self.errors) {
                Step::Fatal => return Flow::Stop,
                Step::Eof => {
                    self.errors.fatal(
                        self.last_line,
                        &format!("EOF in saveframe: {name} (no closing save_)"),
                    );
                    return Flow::Stop;
                }
                Step::Token(token) => token,
            };
            self.last_line = token.line();
            match token.kind() {
                kind if kind.is_trivia() => {}
                TokenKind::Comment => {
                    if self.handler.comment(token.line(), token.text()).is_stop() {
                        return Flow::Stop;
                    }
                }
                TokenKind::SaveEnd => {
                    if need_value
                        && self
                            .report(token.line(), "found save_, expected value")
                            .is_stop()
                    {
                        return Flow::Stop;
                    }
                    self.handler.end_saveframe(token.line(), name);
                    return Flow::Continue;
                }
                TokenKind::LoopStart => {
                    if need_value
                        && self
                            .report(token.line(), "found loop_, expected value")
                            .is_stop()
                    {
                        return Flow::Stop;
                    }
                    if self.handler.start_loop(token.line()).is_stop() {
                        return Flow::Stop;
                    }
                    if self.parse_loop().is_stop() {
                        return Flow::Stop;
                    }
                }
                TokenKind::TagName => {
                    if need_value
                        && self
                            .report(
                                token.line(),
                                &format!("found tag: {}, expected value", token.text()),
                            )
                            .is_stop()
                    {
                        return Flow::Stop;
                    }
                    let line = token.line();
                    last_tag = Some((token.into_text(), line));
                    need_value = true;
                }
                kind if kind.is_plain_value() => {
                    if !need_value
                        && self
                            .report(
                                token.line(),
                                &format!("value not expected here: {}", token.text()),
                            )
                            .is_stop()
                    {
                        return Flow::Stop;
                    }
                    if let Some((tag, tag_line)) = &last_tag {
                        let delim = (kind == TokenKind::FrameCode).then_some(Delimiter::FrameCode);
                        let item = DataItem {
                            tag,
                            tag_line: *tag_line,
                            value: token.text(),
                            value_line: token.line(),
                            delim,
                            in_loop: false,
                        };
                        if self.handler.data(&item).is_stop() {
                            return Flow::Stop;
                        }
                    }
                    need_value = false;
                }
                kind if kind.is_opening_delimiter() => {
                    if !need_value
                        && self
                            .report(token.line(), "value not expected here (found delimiter)")
                            .is_stop()
                    {
                        return Flow::Stop;
                    }
                    let (value, stop) = read_delimited_value(&mut self.lexer, self.errors, kind);
                    if stop.is_stop() {
                        return Flow::Stop;
                    }
                    if let Some((tag, tag_line)) = &last_tag {
                        let item = DataItem {
                            tag,
                            tag_line: *tag_line,
                            value: &value,
                            value_line: token.line(),
                            delim: kind.opening_delimiter(),
                            in_loop: false,
                        };
                        if self.handler.data(&item).is_stop() {
                            return Flow::Stop;
                        }
                    }
                    need_value = false;
                }
                _ => {
                    if self
                        .report(
                            token.line(),
                            &format!(
                                "invalid token in saveframe: {:?} : {}",
                                token.kind(),
                                token.text()
                            ),
                        )
                        .is_stop()
                    {
                        return Flow::Stop;
                    }
                }
            }
        }
    }

    fn parse_loop(&mut self) -> Flow {
        debug!("entering loop");
        let mut tags: Vec<(String, u32)> = Vec::new();
        let mut reading_tags = true;
        let mut tag_idx = 0usize;
        let mut num_values = 0usize;
        loop {
            let token = match next_step(&mut self.lexer, self.errors) {
                Step::Fatal => return Flow::Stop,
                Step::Eof => {
                    // Implicit end; the enclosing scope decides whether EOF
                    // is legal where the loop sat.
                    if self.loop_checks(&tags, num_values, true, self.last_line).is_stop() {
                        return Flow::Stop;
                    }
                    if self.handler.end_loop(self.last_line).is_stop() {
                        return Flow::Stop;
                    }
                    return Flow::Continue;
                }
                Step::Token(token) => token,
            };
            self.last_line = token.line();
            match token.kind() {
                kind if kind.is_trivia() => {}
                TokenKind::Comment => {
                    if self.handler.comment(token.line(), token.text()).is_stop() {
                        return Flow::Stop;
                    }
                }
                TokenKind::Stop => {
                    if self.loop_checks(&tags, num_values, true, token.line()).is_stop() {
                        return Flow::Stop;
                    }
                    if self.handler.end_loop(token.line()).is_stop() {
                        return Flow::Stop;
                    }
                    return Flow::Continue;
                }
                TokenKind::TagName if reading_tags => {
                    let line = token.line();
                    tags.push((token.into_text(), line));
                }
                TokenKind::TagName
                | TokenKind::LoopStart
                | TokenKind::SaveStart
                | TokenKind::SaveEnd
                | TokenKind::DataStart
                | TokenKind::GlobalStart => {
                    // Any structural token in the value phase ends the loop
                    // implicitly and is replayed for the enclosing scope.
                    let require_values = token.kind() != TokenKind::LoopStart || !reading_tags;
                    if self
                        .loop_checks(&tags, num_values, require_values, token.line())
                        .is_stop()
                    {
                        return Flow::Stop;
                    }
                    if self.handler.end_loop(token.line()).is_stop() {
                        return Flow::Stop;
                    }
                    if push_back_token(&mut self.lexer, self.errors, &token).is_stop() {
                        return Flow::Stop;
                    }
                    return Flow::Continue;
                }
                kind if kind.is_plain_value() => {
                    reading_tags = false;
                    if tags.is_empty() {
                        if self.report(token.line(), "Loop with no tags").is_stop() {
                            return Flow::Stop;
                        }
                        tags.push((PLACEHOLDER_TAG.to_owned(), token.line()));
                    }
                    let (tag, tag_line) = &tags[tag_idx];
                    let delim = (kind == TokenKind::FrameCode).then_some(Delimiter::FrameCode);
                    let item = DataItem {
                        tag,
                        tag_line: *tag_line,
                        value: token.text(),
                        value_line: token.line(),
                        delim,
                        in_loop: true,
                    };
                    if self.handler.data(&item).is_stop() {
                        return Flow::Stop;
                    }
                    num_values += 1;
                    tag_idx = (tag_idx + 1) % tags.len();
                }
                kind if kind.is_opening_delimiter() => {
                    reading_tags = false;
                    if tags.is_empty() {
                        if self.report(token.line(), "Loop with no tags").is_stop() {
                            return Flow::Stop;
                        }
                        tags.push((PLACEHOLDER_TAG.to_owned(), token.line()));
                    }
                    let (value, stop) = read_delimited_value(&mut self.lexer, self.errors, kind);
                    if stop.is_stop() {
                        return Flow::Stop;
                    }
                    let (tag, tag_line) = &tags[tag_idx];
                    let item = DataItem {
                        tag,
                        tag_line: *tag_line,
                        value: &value,
                        value_line: token.line(),
                        delim: kind.opening_delimiter(),
                        in_loop: true,
                    };
                    if self.handler.data(&item).is_stop() {
                        return Flow::Stop;
                    }
                    num_values += 1;
                    tag_idx = (tag_idx + 1) % tags.len();
                }
                _ => {
                    if self
                        .report(
                            token.line(),
                            &format!(
                                "invalid token in loop: {:?} : {}",
                                token.kind(),
                                token.text()
                            ),
                        )
                        .is_stop()
                    {
                        return Flow::Stop;
                    }
                }
            }
        }
    }

    fn loop_checks(
        &mut self,
        tags: &[(String, u32)],
        num_values: usize,
        require_values: bool,
        line: u32,
    ) -> Flow {
        if tags.is_empty() && self.report(line, "Loop with no tags").is_stop() {
            return Flow::Stop;
        }
        if require_values && num_values == 0 && self.report(line, "Loop with no values").is_stop() {
            return Flow::Stop;
        }
        if !tags.is_empty()
            && num_values % tags.len() != 0
            && self.report(line, "Loop count error").is_stop()
        {
            return Flow::Stop;
        }
        Flow::Continue
    }

    fn end_block(&mut self, scope: Scope, line: u32) -> Flow {
        match scope {
            Scope::Data => {
                self.data_open = false;
                self.handler.end_data(line, &self.data_name);
                Flow::Continue
            }
            Scope::Global => self.handler.end_global(line),
        }
    }

    fn report(&mut self, line: u32, msg: &str) -> Flow {
        let hint = self.errors.error(line, msg);
        if hint.is_stop() {
            self.error_stop = true;
        }
        hint
    }

    fn close_after_error_stop(&mut self) {
        if self.error_stop && self.data_open {
            self.handler.end_data(self.last_line, &self.data_name);
        }
    }
}

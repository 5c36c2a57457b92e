use std::io::BufRead;

use log::debug;

use crate::error::ErrorHandler;
use crate::handler::{Flow, TagValueHandler};
use crate::lexer::StarLexer;
use crate::syntax::{Delimiter, TokenKind};

use super::{next_step, push_back_token, read_delimited_value, Step, UNNAMED_DATA_BLOCK};

/// NMR-STAR parser over the [`TagValueHandler`] contract.
///
/// Tags and values are delivered in separate callbacks, in the raw on-disk
/// order: inside a loop the handler sees every tag first and then the value
/// stream, without the positional matching the item parser performs.
pub struct NmrStarTagValueParser<'a, R, H, E> {
    lexer: StarLexer<R>,
    handler: &'a mut H,
    errors: &'a mut E,
    data_name: String,
    last_line: u32,
    data_open: bool,
    error_stop: bool,
}

impl<'a, R: BufRead, H: TagValueHandler, E: ErrorHandler> NmrStarTagValueParser<'a, R, H, E> {
    pub fn new(lexer: StarLexer<R>, handler: &'a mut H, errors: &'a mut E) -> Self {
        Self {
            lexer,
            handler,
            errors,
            data_name: UNNAMED_DATA_BLOCK.to_owned(),
            last_line: 0,
            data_open: false,
            error_stop: false,
        }
    }

    /// Run the parse to completion, a requested stop, or a fatal error.
    pub fn parse(mut self) {
        debug!("parsing NMR-STAR (tag/value handler)");
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
                    self.data_open = true;
                    self.data_name = token.into_text();
                    if self.parse_data().is_stop() {
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
        self.handler.end_data(self.last_line, &self.data_name);
    }

    fn parse_data(&mut self) -> Flow {
        debug!("entering data block `{}`", self.data_name);
        loop {
            let token = match next_step(&mut self.lexer, self.errors) {
                Step::Fatal => return Flow::Stop,
                Step::Eof => return Flow::Continue,
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
                TokenKind::SaveStart => {
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
                TokenKind::DataStart => {
                    if self
                        .report(
                            token.line(),
                            &format!(
                                "invalid token in data block: {:?} : {}",
                                token.kind(),
                                token.text()
                            ),
                        )
                        .is_stop()
                    {
                        return Flow::Stop;
                    }
                    // Close this block, then replay the token for the file
                    // level so the next block still gets parsed.
                    self.handler.end_data(token.line(), &self.data_name);
                    self.data_open = false;
                    return push_back_token(&mut self.lexer, self.errors, &token);
                }
                _ => {
                    if self
                        .report(
                            token.line(),
                            &format!(
                                "invalid token in data block: {:?} : {}",
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
        loop {
            let token = match next_step(&mut self.lexer, self.errors) {
                Step::Fatal => return Flow::Stop,
                Step::Eof => {
                    let msg = if need_value {
                        format!("EOF in saveframe: {name} (expected value)")
                    } else {
                        format!("EOF in saveframe: {name} (no closing save_)")
                    };
                    self.errors.fatal(self.last_line, &msg);
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
                    if self.handler.tag(token.line(), token.text()).is_stop() {
                        return Flow::Stop;
                    }
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
                    let delim = (kind == TokenKind::FrameCode).then_some(Delimiter::FrameCode);
                    if self
                        .handler
                        .value(token.line(), token.text(), delim)
                        .is_stop()
                    {
                        return Flow::Stop;
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
                    if self
                        .handler
                        .value(token.line(), &value, kind.opening_delimiter())
                        .is_stop()
                    {
                        return Flow::Stop;
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
        let mut need_tag = true;
        let mut num_tags = 0usize;
        let mut num_values = 0usize;
        loop {
            let token = match next_step(&mut self.lexer, self.errors) {
                Step::Fatal => return Flow::Stop,
                Step::Eof => {
                    if num_tags == 0 {
                        self.errors.fatal(self.last_line, "EOF in loop (no tags)");
                    } else if num_values == 0 {
                        self.errors.fatal(self.last_line, "EOF in loop (no values)");
                    } else {
                        if num_values % num_tags != 0 {
                            let _ = self.report(self.last_line, "Loop count error");
                        }
                        self.errors
                            .fatal(self.last_line, "EOF in loop (no closing stop_)");
                    }
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
                TokenKind::Stop => {
                    if num_tags == 0 && self.report(token.line(), "Loop with no tags").is_stop() {
                        return Flow::Stop;
                    }
                    if num_values == 0
                        && self.report(token.line(), "Loop with no values").is_stop()
                    {
                        return Flow::Stop;
                    }
                    if num_tags > 0
                        && num_values % num_tags != 0
                        && self.report(token.line(), "Loop count error").is_stop()
                    {
                        return Flow::Stop;
                    }
                    if self.handler.end_loop(token.line()).is_stop() {
                        return Flow::Stop;
                    }
                    return Flow::Continue;
                }
                TokenKind::TagName => {
                    if !need_tag
                        && self
                            .report(
                                token.line(),
                                &format!("tag not expected here: {}", token.text()),
                            )
                            .is_stop()
                    {
                        return Flow::Stop;
                    }
                    num_tags += 1;
                    if self.handler.tag(token.line(), token.text()).is_stop() {
                        return Flow::Stop;
                    }
                }
                kind if kind.is_plain_value() => {
                    need_tag = false;
                    if num_tags == 0 && self.report(token.line(), "Loop with no tags").is_stop() {
                        return Flow::Stop;
                    }
                    num_values += 1;
                    let delim = (kind == TokenKind::FrameCode).then_some(Delimiter::FrameCode);
                    if self
                        .handler
                        .value(token.line(), token.text(), delim)
                        .is_stop()
                    {
                        return Flow::Stop;
                    }
                }
                kind if kind.is_opening_delimiter() => {
                    need_tag = false;
                    if num_tags == 0 && self.report(token.line(), "Loop with no tags").is_stop() {
                        return Flow::Stop;
                    }
                    num_values += 1;
                    let (value, stop) = read_delimited_value(&mut self.lexer, self.errors, kind);
                    if stop.is_stop() {
                        return Flow::Stop;
                    }
                    if self
                        .handler
                        .value(token.line(), &value, kind.opening_delimiter())
                        .is_stop()
                    {
                        return Flow::Stop;
                    }
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

use std::io::BufRead;

use log::debug;

use crate::error::ErrorHandler;
use crate::handler::{ContentHandler, DataItem, Flow};
use crate::lexer::StarLexer;
use crate::syntax::{Delimiter, TokenKind};

use super::{
    next_step, push_back_token, read_delimited_value, Step, PLACEHOLDER_TAG, UNNAMED_DATA_BLOCK,
};

/// mmCIF parser over the item-oriented [`ContentHandler`] contract.
///
/// mmCIF has no saveframes, so `start_saveframe`/`end_saveframe` never fire.
/// Loop ends are implicit: the first `loop_` or tag in a loop's value phase
/// (or EOF) closes the loop, and the triggering token is pushed back into
/// the lexer so the data-block scope re-reads it. A comment between a loop's
/// last value and the next structural token is delivered inside the loop;
/// there is no way to tell which side it belongs to.
pub struct CifParser<'a, R, H, E> {
    lexer: StarLexer<R>,
    handler: &'a mut H,
    errors: &'a mut E,
    data_name: String,
    last_line: u32,
    data_open: bool,
    error_stop: bool,
}

impl<'a, R: BufRead, H: ContentHandler, E: ErrorHandler> CifParser<'a, R, H, E> {
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
        debug!("parsing mmCIF (item handler)");
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
                    need_value = false;
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
                    // The loop, and with it the data block, end at EOF.
                    if tags.is_empty() && self.report(self.last_line, "Loop with no tags").is_stop()
                    {
                        return Flow::Stop;
                    }
                    if num_values == 0
                        && self.report(self.last_line, "Loop with no values").is_stop()
                    {
                        return Flow::Stop;
                    }
                    if !tags.is_empty()
                        && num_values % tags.len() != 0
                        && self.report(self.last_line, "Loop count error").is_stop()
                    {
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
                TokenKind::LoopStart => {
                    if reading_tags {
                        if tags.is_empty()
                            && self.report(token.line(), "Loop with no tags").is_stop()
                        {
                            return Flow::Stop;
                        }
                        if self
                            .report(token.line(), "found loop_, expected value")
                            .is_stop()
                        {
                            return Flow::Stop;
                        }
                    } else if num_values % tags.len() != 0
                        && self.report(token.line(), "Loop count error").is_stop()
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
                TokenKind::TagName => {
                    if reading_tags {
                        let line = token.line();
                        tags.push((token.into_text(), line));
                        continue;
                    }
                    // A tag after values implicitly ends the loop.
                    if num_values % tags.len() != 0
                        && self.report(token.line(), "Loop count error").is_stop()
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

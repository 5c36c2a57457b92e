use std::io::BufRead;

use log::debug;

use crate::error::ErrorHandler;
use crate::handler::{Flow, StreamHandler};
use crate::lexer::StarLexer;
use crate::sniffer::find_keyword;
use crate::syntax::{Delimiter, TokenKind};
use crate::token::Token;

use super::{next_step, push_back_token, Step, UNNAMED_DATA_BLOCK};

/// NMR-STAR parser over the [`StreamHandler`] contract.
///
/// Values are never buffered: the parser emits `start_value` on the opening
/// delimiter, forwards every content chunk through `characters`, and emits
/// `end_value` on the matching closer. Barewords and framecodes get a
/// synthetic triplet so every value looks the same to the consumer. The
/// newline that belongs to a semicolon field's closing `\n;` digraph is held
/// back one token and dropped at the close, so the chunks of a value
/// concatenate to exactly the string the item parser would deliver.
pub struct NmrStarStreamParser<'a, R, H, E> {
    lexer: StarLexer<R>,
    handler: &'a mut H,
    errors: &'a mut E,
    data_name: String,
    last_line: u32,
    data_open: bool,
    error_stop: bool,
}

impl<'a, R: BufRead, H: StreamHandler, E: ErrorHandler> NmrStarStreamParser<'a, R, H, E> {
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
        debug!("parsing NMR-STAR (streaming handler)");
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
        let mut open_delim: Option<Delimiter> = None;
        // Newlines inside a semicolon field are held back one token; the
        // last one belongs to the closing `\n;` digraph.
        let mut pending_newlines = String::new();
        loop {
            let token = match next_step(&mut self.lexer, self.errors) {
                Step::Fatal => return Flow::Stop,
                Step::Eof => {
                    let msg = match open_delim {
                        Some(delim) => format!("EOF in value: no closing `{delim}`"),
                        None => format!("EOF in saveframe: {name} (no closing save_)"),
                    };
                    self.errors.fatal(self.last_line, &msg);
                    return Flow::Stop;
                }
                Step::Token(token) => token,
            };
            self.last_line = token.line();
            match token.kind() {
                kind if kind.is_trivia() => {
                    if kind == TokenKind::Newline {
                        match open_delim {
                            Some(Delimiter::Semicolon) => pending_newlines.push_str(token.text()),
                            Some(Delimiter::TripleSingle) | Some(Delimiter::TripleDouble) => {
                                if self.handler.characters(token.line(), token.text()).is_stop() {
                                    return Flow::Stop;
                                }
                            }
                            _ => {}
                        }
                    }
                }
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
                TokenKind::Characters => {
                    if open_delim.is_none()
                        && !need_value
                        && self
                            .report(
                                token.line(),
                                &format!("value not expected here: {}", token.text()),
                            )
                            .is_stop()
                    {
                        return Flow::Stop;
                    }
                    match self.value_chunk(&token, open_delim, &mut pending_newlines) {
                        Flow::Stop => return Flow::Stop,
                        Flow::Continue => {}
                    }
                    if open_delim.is_none() {
                        need_value = false;
                    }
                }
                TokenKind::FrameCode => {
                    if !need_value
                        && self
                            .report(
                                token.line(),
                                &format!("framecode not expected here: {}", token.text()),
                            )
                            .is_stop()
                    {
                        return Flow::Stop;
                    }
                    if self.framecode_value(token.line(), token.text()).is_stop() {
                        return Flow::Stop;
                    }
                    need_value = false;
                }
                kind if kind.is_opening_delimiter() => {
                    let delim = kind.opening_delimiter().unwrap();
                    if !need_value
                        && self
                            .report(
                                token.line(),
                                &format!("value not expected here (found delimiter {delim})"),
                            )
                            .is_stop()
                    {
                        return Flow::Stop;
                    }
                    if open_delim.is_some()
                        && self
                            .report(
                                token.line(),
                                &format!("found opening {delim} inside quoted value"),
                            )
                            .is_stop()
                    {
                        return Flow::Stop;
                    }
                    open_delim = Some(delim);
                    pending_newlines.clear();
                    if self.handler.start_value(token.line(), Some(delim)).is_stop() {
                        return Flow::Stop;
                    }
                }
                kind if kind.closing_delimiter().is_some() => {
                    let delim = kind.closing_delimiter().unwrap();
                    match open_delim {
                        None => {
                            if self
                                .report(
                                    token.line(),
                                    &format!(
                                        "closing {delim} not expected here (not reading value)"
                                    ),
                                )
                                .is_stop()
                            {
                                return Flow::Stop;
                            }
                        }
                        Some(open) if open != delim => {
                            if self
                                .report(
                                    token.line(),
                                    &format!("closing {delim} not expected here (need {open})"),
                                )
                                .is_stop()
                            {
                                return Flow::Stop;
                            }
                        }
                        Some(_) => {
                            pending_newlines.clear();
                            if self.handler.end_value(token.line(), Some(delim)).is_stop() {
                                return Flow::Stop;
                            }
                            open_delim = None;
                            need_value = false;
                        }
                    }
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
        let mut open_delim: Option<Delimiter> = None;
        let mut pending_newlines = String::new();
        loop {
            let token = match next_step(&mut self.lexer, self.errors) {
                Step::Fatal => return Flow::Stop,
                Step::Eof => {
                    let msg = match open_delim {
                        Some(delim) => format!("EOF in value: no closing `{delim}`"),
                        None => "EOF in loop (no closing stop_)".to_owned(),
                    };
                    self.errors.fatal(self.last_line, &msg);
                    return Flow::Stop;
                }
                Step::Token(token) => token,
            };
            self.last_line = token.line();
            match token.kind() {
                kind if kind.is_trivia() => {
                    if kind == TokenKind::Newline {
                        match open_delim {
                            Some(Delimiter::Semicolon) => pending_newlines.push_str(token.text()),
                            Some(Delimiter::TripleSingle) | Some(Delimiter::TripleDouble) => {
                                if self.handler.characters(token.line(), token.text()).is_stop() {
                                    return Flow::Stop;
                                }
                            }
                            _ => {}
                        }
                    }
                }
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
                TokenKind::Characters => {
                    need_tag = false;
                    if num_tags == 0 && self.report(token.line(), "Loop with no tags").is_stop() {
                        return Flow::Stop;
                    }
                    match self.value_chunk(&token, open_delim, &mut pending_newlines) {
                        Flow::Stop => return Flow::Stop,
                        Flow::Continue => {}
                    }
                    if open_delim.is_none() {
                        num_values += 1;
                    }
                }
                TokenKind::FrameCode => {
                    need_tag = false;
                    if num_tags == 0 && self.report(token.line(), "Loop with no tags").is_stop() {
                        return Flow::Stop;
                    }
                    if self.framecode_value(token.line(), token.text()).is_stop() {
                        return Flow::Stop;
                    }
                    num_values += 1;
                }
                kind if kind.is_opening_delimiter() => {
                    need_tag = false;
                    let delim = kind.opening_delimiter().unwrap();
                    if num_tags == 0 && self.report(token.line(), "Loop with no tags").is_stop() {
                        return Flow::Stop;
                    }
                    if open_delim.is_some()
                        && self
                            .report(
                                token.line(),
                                &format!("found opening {delim} inside quoted value"),
                            )
                            .is_stop()
                    {
                        return Flow::Stop;
                    }
                    open_delim = Some(delim);
                    pending_newlines.clear();
                    if self.handler.start_value(token.line(), Some(delim)).is_stop() {
                        return Flow::Stop;
                    }
                }
                kind if kind.closing_delimiter().is_some() => {
                    need_tag = false;
                    let delim = kind.closing_delimiter().unwrap();
                    match open_delim {
                        None => {
                            if self
                                .report(
                                    token.line(),
                                    &format!(
                                        "closing {delim} not expected here (not reading value)"
                                    ),
                                )
                                .is_stop()
                            {
                                return Flow::Stop;
                            }
                        }
                        Some(open) if open != delim => {
                            if self
                                .report(
                                    token.line(),
                                    &format!("closing {delim} not expected here (need {open})"),
                                )
                                .is_stop()
                            {
                                return Flow::Stop;
                            }
                        }
                        Some(_) => {
                            pending_newlines.clear();
                            if self.handler.end_value(token.line(), Some(delim)).is_stop() {
                                return Flow::Stop;
                            }
                            open_delim = None;
                            num_values += 1;
                        }
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

    /// Deliver one `Characters` token: as a chunk of the currently open
    /// delimited value, or as a complete synthetic bareword value.
    fn value_chunk(
        &mut self,
        token: &Token,
        open_delim: Option<Delimiter>,
        pending_newlines: &mut String,
    ) -> Flow {
        match open_delim {
            Some(delim) => {
                if matches!(
                    delim,
                    Delimiter::Semicolon | Delimiter::TripleSingle | Delimiter::TripleDouble
                ) {
                    if let Some(keyword) = find_keyword(token.text()) {
                        if self
                            .warn(token.line(), &format!("keyword in value: {keyword}"))
                            .is_stop()
                        {
                            return Flow::Stop;
                        }
                    }
                }
                if !pending_newlines.is_empty() {
                    let held = std::mem::take(pending_newlines);
                    if self.handler.characters(token.line(), &held).is_stop() {
                        return Flow::Stop;
                    }
                }
                self.handler.characters(token.line(), token.text())
            }
            None => {
                if self.handler.start_value(token.line(), None).is_stop() {
                    return Flow::Stop;
                }
                if self.handler.characters(token.line(), token.text()).is_stop() {
                    return Flow::Stop;
                }
                self.handler.end_value(token.line(), None)
            }
        }
    }

    /// A framecode is always a complete value of its own.
    fn framecode_value(&mut self, line: u32, text: &str) -> Flow {
        if self
            .handler
            .start_value(line, Some(Delimiter::FrameCode))
            .is_stop()
        {
            return Flow::Stop;
        }
        if self.handler.characters(line, text).is_stop() {
            return Flow::Stop;
        }
        self.handler.end_value(line, Some(Delimiter::FrameCode))
    }

    fn report(&mut self, line: u32, msg: &str) -> Flow {
        let hint = self.errors.error(line, msg);
        if hint.is_stop() {
            self.error_stop = true;
        }
        hint
    }

    fn warn(&mut self, line: u32, msg: &str) -> Flow {
        self.errors.warning(line, msg)
    }

    fn close_after_error_stop(&mut self) {
        if self.error_stop && self.data_open {
            self.handler.end_data(self.last_line, &self.data_name);
        }
    }
}

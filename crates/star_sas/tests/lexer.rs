//! Token-level tests: quoting digraphs, keyword matching, line counting,
//! push-back, and the buffered/push input modes.

use std::io::Cursor;

use test_case::test_case;

use star_sas::{SasError, StarLexer, TokenKind};

use harness::{lex, lex_triples, lex_until_error};

mod harness;

fn kinds(input: &str) -> Vec<TokenKind> {
    lex(input).into_iter().map(|token| token.kind()).collect()
}

#[test]
fn simple_item_stream() {
    let triples = lex_triples("data_x\n_a v\n");
    assert_eq!(
        triples,
        vec![
            (TokenKind::DataStart, "x".to_owned(), 1),
            (TokenKind::Newline, "\n".to_owned(), 1),
            (TokenKind::TagName, "_a".to_owned(), 2),
            (TokenKind::Space, " ".to_owned(), 2),
            (TokenKind::Characters, "v".to_owned(), 2),
            (TokenKind::Newline, "\n".to_owned(), 2),
        ]
    );
}

#[test_case("save_name", TokenKind::SaveStart, "name"; "save_with_suffix")]
#[test_case("save_", TokenKind::SaveEnd, "save_"; "bare_save")]
#[test_case("loop_", TokenKind::LoopStart, "loop_"; "loop_keyword")]
#[test_case("stop_", TokenKind::Stop, "stop_"; "stop_keyword")]
#[test_case("global_", TokenKind::GlobalStart, "global_"; "global_keyword")]
#[test_case("GLOBAL_", TokenKind::GlobalStart, "GLOBAL_"; "global_upper")]
#[test_case("DATA_entry", TokenKind::DataStart, "entry"; "data_upper")]
#[test_case("_Entry.ID", TokenKind::TagName, "_Entry.ID"; "tag_keeps_underscore")]
#[test_case("$frame", TokenKind::FrameCode, "frame"; "framecode_stripped")]
#[test_case("data_", TokenKind::Characters, "data_"; "bare_data_is_bareword")]
#[test_case("_", TokenKind::Characters, "_"; "bare_underscore_is_bareword")]
#[test_case("$", TokenKind::Characters, "$"; "bare_dollar_is_bareword")]
#[test_case("don't", TokenKind::Characters, "don't"; "quote_inside_bareword")]
#[test_case("b;c", TokenKind::Characters, "b;c"; "semicolon_inside_bareword")]
fn first_token(input: &str, kind: TokenKind, text: &str) {
    let triples = lex_triples(input);
    assert_eq!(triples[0].0, kind);
    assert_eq!(triples[0].1, text);
}

// Keyword matching is first-match, not longest-match.
#[test]
fn keyword_prefix_wins_over_bareword() {
    let triples = lex_triples("loop_x");
    assert_eq!(
        triples,
        vec![
            (TokenKind::LoopStart, "loop_".to_owned(), 1),
            (TokenKind::Characters, "x".to_owned(), 1),
        ]
    );
}

#[test]
fn comment_strips_hash() {
    let triples = lex_triples("# a comment\n");
    assert_eq!(triples[0], (TokenKind::Comment, " a comment".to_owned(), 1));
}

#[test]
fn hash_inside_bareword_is_data() {
    let triples = lex_triples("foo#bar\n");
    assert_eq!(triples[0], (TokenKind::Characters, "foo#bar".to_owned(), 1));
}

#[test]
fn semicolon_opens_field_only_at_column_one() {
    // Column 1: a text field.
    let stream = kinds(";text\n;\n");
    assert_eq!(
        stream,
        vec![
            TokenKind::SemiStart,
            TokenKind::Characters,
            TokenKind::Newline,
            TokenKind::SemiEnd,
            TokenKind::Newline,
        ]
    );

    // Mid-line: a lone character token.
    let triples = lex_triples("_a ;c\n");
    assert_eq!(triples[2], (TokenKind::Characters, ";".to_owned(), 2));
    assert_eq!(triples[3], (TokenKind::Characters, "c".to_owned(), 2));
}

#[test]
fn quote_followed_by_data_is_not_a_close() {
    let triples = lex_triples("'don''t stop'\n");
    assert_eq!(
        triples,
        vec![
            (TokenKind::SingleStart, "'".to_owned(), 1),
            (TokenKind::Characters, "don".to_owned(), 1),
            (TokenKind::Characters, "'".to_owned(), 1),
            (TokenKind::Characters, "'".to_owned(), 1),
            (TokenKind::Characters, "t stop".to_owned(), 1),
            (TokenKind::SingleEnd, "'".to_owned(), 1),
            (TokenKind::Newline, "\n".to_owned(), 1),
        ]
    );
}

#[test]
fn triple_quote_wins_over_single() {
    let stream = kinds("'''v''' \n");
    assert_eq!(
        stream[0..3],
        [
            TokenKind::TripleSingleStart,
            TokenKind::Characters,
            TokenKind::TripleSingleEnd,
        ]
    );
}

#[test]
fn one_or_two_quotes_inside_triple_are_data() {
    let triples = lex_triples("'''it's''' \n");
    assert_eq!(
        triples[0..5],
        [
            (TokenKind::TripleSingleStart, "'''".to_owned(), 1),
            (TokenKind::Characters, "it".to_owned(), 1),
            (TokenKind::Characters, "'".to_owned(), 1),
            (TokenKind::Characters, "s".to_owned(), 1),
            (TokenKind::TripleSingleEnd, "'''".to_owned(), 1),
        ]
    );
}

#[test]
fn escaped_quote_is_data_in_every_mode() {
    // Initial mode.
    let triples = lex_triples("\u{7}' \n");
    assert_eq!(triples[0], (TokenKind::Characters, "'".to_owned(), 1));

    // Single-quote mode: the escape does not close the value.
    let triples = lex_triples("'d\u{7}' onofrio' \n");
    assert_eq!(
        triples[0..5],
        [
            (TokenKind::SingleStart, "'".to_owned(), 1),
            (TokenKind::Characters, "d".to_owned(), 1),
            (TokenKind::Characters, "'".to_owned(), 1),
            (TokenKind::Characters, " onofrio".to_owned(), 1),
            (TokenKind::SingleEnd, "'".to_owned(), 1),
        ]
    );
}

#[test]
fn other_quote_flavor_is_data() {
    let triples = lex_triples("'a \"b\" c' \n");
    let texts: Vec<&str> = triples.iter().map(|(_, text, _)| text.as_str()).collect();
    assert_eq!(texts, vec!["'", "a \"b\" c", "'", " \n"]);
}

#[test]
fn newline_in_single_quoted_value_is_fatal() {
    let (_, err) = lex_until_error("'unterminated\nrest'\n");
    match err {
        Some(SasError::NewlineInQuoted { line }) => assert_eq!(line, 2),
        other => panic!("expected NewlineInQuoted, got {other:?}"),
    }
}

#[test]
fn newline_in_double_quoted_value_is_fatal() {
    let (_, err) = lex_until_error("\"unterminated\n\"\n");
    assert!(matches!(err, Some(SasError::NewlineInQuoted { .. })));
}

#[test]
fn lines_are_monotone_and_counted_through_whitespace() {
    let triples = lex_triples("data_x\n\n\n_a v\n");
    let lines: Vec<u32> = triples.iter().map(|(_, _, line)| *line).collect();
    assert_eq!(lines, vec![1, 1, 4, 4, 4, 4]);
    let mut sorted = lines.clone();
    sorted.sort_unstable();
    assert_eq!(lines, sorted);
}

#[test]
fn lines_counted_inside_semicolon_field() {
    let triples = lex_triples("data_x\n_a\n;one\ntwo\n;\n");
    let semi_end = triples
        .iter()
        .find(|(kind, _, _)| *kind == TokenKind::SemiEnd)
        .expect("field must close");
    assert_eq!(semi_end.2, 5);
}

#[test]
fn lines_counted_inside_triple_quoted_value() {
    // The content run spans two lines; the closer reports the later line.
    let triples = lex_triples("'''one\ntwo''' \nx\n");
    let close = triples
        .iter()
        .find(|(kind, _, _)| *kind == TokenKind::TripleSingleEnd)
        .expect("value must close");
    assert_eq!(close.2, 2);
    let last = triples.last().unwrap();
    assert_eq!(last.2, 3);
}

// Concatenating token texts with stripped prefixes restored reproduces the
// source byte for byte.
#[test]
fn roundtrip_reconstruction() {
    let source =
        "data_entry\n# note\nsave_one\n_tag $frame\nloop_\n_a\n'v w' \"x\"\n;text\n;\nstop_\nsave_\n";
    let mut rebuilt = String::new();
    for token in lex(source) {
        match token.kind() {
            TokenKind::DataStart => rebuilt.push_str("data_"),
            TokenKind::SaveStart => rebuilt.push_str("save_"),
            TokenKind::FrameCode => rebuilt.push('$'),
            TokenKind::Comment => rebuilt.push('#'),
            _ => {}
        }
        rebuilt.push_str(token.text());
    }
    assert_eq!(rebuilt, source);
}

#[test]
fn push_back_replays_a_token() {
    let mut lexer = StarLexer::from_str("loop_ x\n");
    let first = lexer.next_token().unwrap().unwrap();
    assert_eq!(first.kind(), TokenKind::LoopStart);
    lexer.push_back(first.text().len()).unwrap();
    let again = lexer.next_token().unwrap().unwrap();
    assert_eq!(again.kind(), TokenKind::LoopStart);
    assert_eq!(again.line(), first.line());
}

#[test]
fn push_back_past_buffer_start_fails() {
    let mut lexer = StarLexer::from_str("x\n");
    let _ = lexer.next_token().unwrap().unwrap();
    assert!(matches!(
        lexer.push_back(10),
        Err(SasError::PushBack { .. })
    ));
}

#[test]
fn push_mode_matches_buffered_mode() {
    let source = "data_x\n_a\n;one\ntwo\n;\n_b 'v'\n";
    let buffered = lex_triples(source);

    let mut pushed = Vec::new();
    let mut lexer = StarLexer::new();
    for line in source.split_inclusive('\n') {
        lexer.send(line);
        while let Some(result) = lexer.next_token() {
            let token = result.expect("push-mode input must lex cleanly");
            pushed.push((token.kind(), token.text().to_owned(), token.line()));
        }
    }
    assert_eq!(pushed, buffered);
}

#[test_case(0; "line_at_a_time")]
#[test_case(8; "tiny_buffer")]
#[test_case(1 << 16; "whole_file")]
fn reader_mode_matches_in_memory(bufsize: usize) {
    let source = "data_x\n_a\n;one\ntwo\n;\n_b 'v'\n# done\n";
    let expected = lex_triples(source);

    let lexer = StarLexer::from_reader(Cursor::new(source.as_bytes()), bufsize);
    let actual: Vec<_> = lexer
        .map(|result| result.expect("reader input must lex cleanly"))
        .map(|token| (token.kind(), token.text().to_owned(), token.line()))
        .collect();
    assert_eq!(actual, expected);
}

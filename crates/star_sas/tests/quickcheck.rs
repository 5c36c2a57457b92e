//! The quick-check consumer: structural validation plus optional tag
//! membership checks.

use std::collections::HashSet;
use std::io::Cursor;

use star_sas::{Dialect, QuickCheck, StarLexer};

const VALID_NMR_STAR: &str = "data_e\nsave_s\n_Entry.ID 1\nloop_\n_Row.A\n1 2\nstop_\nsave_\n";

#[test]
fn valid_file_passes_without_a_dictionary() {
    let mut check = QuickCheck::new(None);
    assert!(check.check(StarLexer::from_str(VALID_NMR_STAR), Dialect::NmrStar));
}

#[test]
fn structural_error_fails_the_check() {
    let mut check = QuickCheck::new(None);
    assert!(!check.check(StarLexer::from_str("data_e\n_t v\n"), Dialect::NmrStar));
}

#[test]
fn fatal_eof_fails_the_check() {
    let mut check = QuickCheck::new(None);
    assert!(!check.check(StarLexer::from_str("data_e\nsave_s\n_t v\n"), Dialect::NmrStar));
}

#[test]
fn known_tags_pass_with_a_dictionary() {
    let allowed: HashSet<String> = ["_Entry.ID", "_Row.A"]
        .iter()
        .map(|tag| (*tag).to_owned())
        .collect();
    let mut check = QuickCheck::new(Some(allowed));
    assert!(check.check(StarLexer::from_str(VALID_NMR_STAR), Dialect::NmrStar));
}

#[test]
fn unknown_tag_fails_with_a_dictionary() {
    let allowed: HashSet<String> = ["_Entry.ID"].iter().map(|tag| (*tag).to_owned()).collect();
    let mut check = QuickCheck::new(Some(allowed));
    assert!(!check.check(StarLexer::from_str(VALID_NMR_STAR), Dialect::NmrStar));
}

#[test]
fn dialect_selects_the_grammar() {
    // Items directly in the data block are valid mmCIF but invalid NMR-STAR.
    let input = "data_x\n_a v\n";
    let mut check = QuickCheck::new(None);
    assert!(check.check(StarLexer::from_str(input), Dialect::MmCif));
    assert!(!check.check(StarLexer::from_str(input), Dialect::NmrStar));
    assert!(check.check(StarLexer::from_str(input), Dialect::Ddl));
}

#[test]
fn checker_is_reusable_after_a_failure() {
    let mut check = QuickCheck::new(None);
    assert!(!check.check(StarLexer::from_str("data_e\n_t v\n"), Dialect::NmrStar));
    assert!(check.check(StarLexer::from_str(VALID_NMR_STAR), Dialect::NmrStar));
}

#[test]
fn load_tag_list_trims_matching_quotes() {
    let source = "_Entry.ID\n'_Row.A'\n\"_Row.B\"\n\n  _Spaced  \n";
    let tags = QuickCheck::load_tag_list(Cursor::new(source.as_bytes())).unwrap();
    let expected: HashSet<String> = ["_Entry.ID", "_Row.A", "_Row.B", "_Spaced"]
        .iter()
        .map(|tag| (*tag).to_owned())
        .collect();
    assert_eq!(tags, expected);
}

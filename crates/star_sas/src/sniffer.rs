//! Detection of STAR keywords inside multi-line values.
//!
//! A `data_`, `save_`, `loop_`, `stop_`, or tag-shaped word at the start of a
//! line (or after whitespace) inside a semicolon or triple-quoted value is
//! almost always a missing closing delimiter rather than intentional content.
//! The parsers run every chunk of a multi-line value through this set and
//! report a warning on a match, without altering the value.

use once_cell::sync::Lazy;
use regex::Regex;

static KEYWORDS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(?:^|\s)(global_)",
        r"(?i)(?:^|\s)(data_\w+)",
        r"(?i)(?:^|\s)(save_\S*)",
        r"(?i)(?:^|\s)(loop_)",
        r"(?i)(?:^|\s)(stop_)",
        r"(?i)(?:^|\s)(_\w\S*)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("keyword pattern must compile"))
    .collect()
});

/// Returns the first STAR keyword found in `text`, if any.
///
/// The text is trimmed before matching, so a keyword at the very start of a
/// chunk counts even though the patterns anchor on preceding whitespace.
pub fn find_keyword(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    for pattern in KEYWORDS.iter() {
        if let Some(captures) = pattern.captures(trimmed) {
            return Some(captures.get(1).expect("keyword group").as_str());
        }
    }
    None
}

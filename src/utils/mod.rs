use lazy_static::lazy_static;
use onig::Regex;
use std::ops::Range;

pub mod parallelism;
pub mod regex;

/// The case folding used for every case-insensitive comparison *and* for the folded index fields.
/// Both sides must agree, otherwise a case-insensitive rule could match a token the index can not find.
#[inline]
pub fn fold(string: &str) -> String {
    string.to_lowercase()
}

pub fn normalize_lang_code(lang_code: &str) -> String {
    lang_code.trim().to_lowercase()
}

pub fn is_title_case(string: &str) -> bool {
    let mut char_case = string.chars().map(|x| x.is_uppercase());

    char_case.next().unwrap_or(false) && !char_case.any(|x| x)
}

pub fn is_uppercase(string: &str) -> bool {
    !string.chars().any(|x| x.is_lowercase())
}

// collapse whitespace runs (including newlines from XML indentation) to one space
pub fn normalize_whitespace(string: &str) -> String {
    lazy_static! {
        static ref REGEX: Regex = Regex::new(r"\s+").unwrap();
    }

    REGEX.replace_all(string.trim(), " ")
}

/// Slices a string by char (not byte) indices. Out of range indices are clamped.
pub fn char_slice(text: &str, range: Range<usize>) -> &str {
    if range.start >= range.end {
        return "";
    }

    let mut char_indices: Vec<_> = text.char_indices().map(|(i, _)| i).collect();
    char_indices.push(text.len());

    let start = char_indices[range.start.min(char_indices.len() - 1)];
    let end = char_indices[range.end.min(char_indices.len() - 1)];

    &text[start..end]
}

#[inline]
pub fn splitting_chars() -> &'static str {
    r##"«»'’`´‘],.:;!?/\()<=>„“”"+#…*"##
}

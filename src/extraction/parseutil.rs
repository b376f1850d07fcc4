//! Text utilities shared by folding and the transform units.

use lazy_regex::{regex_find, regex_replace_all};

use crate::table::Row;

/// Cleans leading, trailing, and redundant whitespace from a string, in-place.
pub fn clean_text(s: &mut String) {
    let trimmed = s.trim();
    // Skip the copy/realloc if nothing to do.
    if trimmed.len() != s.len() || regex_find!(r"\s{2,}|[\t\r\n]", trimmed).is_some() {
        let new = regex_replace_all!(r"\s+", trimmed, " ");
        *s = new.to_string();
    }
}

/// Joins non-empty cells with a single space. A single-cell row is returned
/// verbatim, and an empty row produces an empty string.
pub fn row_text(row: &Row) -> String {
    match row.as_slice() {
        [] => String::new(),
        [cell] => cell.clone(),
        cells => join_non_empty(cells.iter().map(String::as_str)),
    }
}

/// Joins the non-empty (after trimming) strings with a single space.
pub fn join_non_empty<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for part in parts.into_iter().map(str::trim).filter(|part| !part.is_empty()) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(part);
    }
    out
}

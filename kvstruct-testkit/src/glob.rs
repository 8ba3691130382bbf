//! Glob matching for `SCAN ... MATCH`.
//!
//! Supports `*`, `?` and backslash escapes. Character classes are not
//! supported; an unescaped `[` matches itself.

pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    matches_from(&pattern, &text)
}

fn matches_from(pattern: &[char], text: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some(('*', rest)) => (0..=text.len()).any(|skip| matches_from(rest, &text[skip..])),
        Some(('?', rest)) => !text.is_empty() && matches_from(rest, &text[1..]),
        Some(('\\', rest)) if !rest.is_empty() => {
            text.first() == Some(&rest[0]) && matches_from(&rest[1..], &text[1..])
        }
        Some((ch, rest)) => text.first() == Some(ch) && matches_from(rest, &text[1..]),
    }
}

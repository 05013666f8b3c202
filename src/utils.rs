//! Small string and time helpers shared across the pipeline.

use chrono::{SecondsFormat, Utc};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) and get an
/// ellipsis and byte count appended.
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

/// First `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Keep at most `max` whitespace-separated words, preserving the original
/// spacing of the kept part.
pub fn clamp_words(s: &str, max: usize) -> String {
    let mut words = 0usize;
    let mut in_word = false;
    for (idx, c) in s.char_indices() {
        if c.is_whitespace() {
            if in_word && words == max {
                return s[..idx].to_string();
            }
            in_word = false;
        } else if !in_word {
            in_word = true;
            words += 1;
        }
    }
    s.to_string()
}

/// Current UTC date as `YYYY-MM-DD`.
pub fn today_utc() -> String {
    Utc::now().date_naive().to_string()
}

/// Current UTC time as RFC 3339 with millisecond precision.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

use std::borrow::Cow;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Formats how long ago `then` was, relative to `now`.
///
/// Under a minute reports seconds, under an hour minutes, under a day hours,
/// otherwise whole days. Timestamps in the future read as `0 sec ago`.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use newsdeck::util::time_ago;
///
/// let now = Utc::now();
/// assert_eq!(time_ago(now - Duration::minutes(5), now), "5 min ago");
/// assert_eq!(time_ago(now - Duration::days(3), now), "3 days ago");
/// ```
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if seconds < 60 {
        format!("{seconds} sec ago")
    } else if minutes < 60 {
        format!("{minutes} min ago")
    } else if hours < 24 {
        format!("{hours} h ago")
    } else {
        format!("{days} days ago")
    }
}

/// Extracts the display label from a hierarchical category label.
///
/// `"dmoz/Business/Investing"` yields `"Business"`. Labels with no segment
/// after the first `/`, or a blank one, yield `None`.
pub fn extract_category_label(label: &str) -> Option<&str> {
    let mut parts = label.split('/');
    parts.next()?;
    parts.next().filter(|segment| !segment.trim().is_empty())
}

/// The grouping key of a suggestion URI: the segment after the first `/`,
/// or the whole URI when there is none.
pub fn uri_group(uri: &str) -> &str {
    uri.split('/').nth(1).unwrap_or(uri)
}

/// Keeps the first item of each [`uri_group`], preserving order.
pub fn unique_by_uri_group<T, F>(items: Vec<T>, uri_of: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(uri_group(uri_of(item)).to_string()))
        .collect()
}

/// Calculates the display width of a string in terminal columns.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncates to at most `max_width` terminal columns, ending in `...` when
/// text was cut. Widths of 3 or less are filled with characters only.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let budget = if max_width > 3 { max_width - 3 } else { max_width };
    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    if max_width > 3 {
        Cow::Owned(format!("{}...", &s[..end]))
    } else {
        Cow::Owned(s[..end].to_string())
    }
}

/// Removes terminal control characters and ANSI escape sequences from text
/// received from the APIs before it is printed.
///
/// Tab, newline and carriage return are kept. CSI (`ESC [`) sequences are
/// dropped through their final byte, OSC (`ESC ]`) through BEL or `ESC \`.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_unsafe =
        |c: char| c == '\x1b' || c == '\x7f' || (c < ' ' && !matches!(c, '\t' | '\n' | '\r'));
    if !s.chars().any(is_unsafe) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            match chars.peek() {
                Some('[') => {
                    chars.next();
                    for c in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&c) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\x07' {
                            break;
                        }
                        if c == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            }
        } else if !is_unsafe(c) {
            out.push(c);
        }
    }

    Cow::Owned(out)
}

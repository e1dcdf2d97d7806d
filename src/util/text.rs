use std::borrow::Cow;

/// Truncates a string to at most `max_chars` characters.
///
/// Counts Unicode scalar values rather than bytes so a multi-byte character
/// is never split. Returns the input borrowed when no truncation is needed.
///
/// # Examples
///
/// ```
/// use newsdigest::util::truncate_chars;
///
/// assert_eq!(truncate_chars("hello", 10), "hello");
/// assert_eq!(truncate_chars("hello", 2), "he");
/// assert_eq!(truncate_chars("سلام دنیا", 4), "سلام");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_chars) {
        Some((byte_end, _)) => Cow::Owned(s[..byte_end].to_string()),
        None => Cow::Borrowed(s),
    }
}

/// Removes terminal control characters from untrusted text before printing.
///
/// AI output and feed titles end up on the user's terminal, so ESC and other
/// C0/C1 control characters are dropped. Tab and newline are kept.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_unwanted = |c: char| c.is_control() && c != '\n' && c != '\t';

    if !s.chars().any(is_unwanted) {
        return Cow::Borrowed(s);
    }

    Cow::Owned(s.chars().filter(|&c| !is_unwanted(c)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_no_op_borrows() {
        let s = "short text";
        assert!(matches!(truncate_chars(s, 100), Cow::Borrowed(_)));
    }

    #[test]
    fn test_truncate_exact_length() {
        assert_eq!(truncate_chars("abcd", 4), "abcd");
    }

    #[test]
    fn test_truncate_multibyte_boundary() {
        // Each Persian letter is 2 bytes in UTF-8
        let s = "خبرهای امروز";
        let out = truncate_chars(s, 5);
        assert_eq!(out.chars().count(), 5);
        assert_eq!(out, "خبرها");
    }

    #[test]
    fn test_truncate_zero() {
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_strip_control_chars_removes_escape() {
        assert_eq!(strip_control_chars("a\x1b[31mred\x1b[0m"), "a[31mred[0m");
    }

    #[test]
    fn test_strip_control_chars_keeps_newlines_and_tabs() {
        let s = "line one\n\tline two";
        assert!(matches!(strip_control_chars(s), Cow::Borrowed(_)));
    }
}

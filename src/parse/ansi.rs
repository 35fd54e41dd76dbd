use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// ESC `[` digits-or-semicolons, then a final letter
static CONTROL_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[;0-9]*[A-Za-z]").expect("control sequence regex"));

/// Remove terminal color/cursor sequences from external command output
pub fn strip_control_sequences(text: &str) -> Cow<'_, str> {
    CONTROL_SEQUENCE.replace_all(text, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_colors() {
        assert_eq!(
            strip_control_sequences("\x1b[1;31mred\x1b[0m plain"),
            "red plain"
        );
    }

    #[test]
    fn test_strips_cursor_moves() {
        assert_eq!(strip_control_sequences("\x1b[2Kline\x1b[A"), "line");
    }

    #[test]
    fn test_leaves_plain_text_borrowed() {
        let out = strip_control_sequences("[1;31m no escape");
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, "[1;31m no escape");
    }
}

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn quoting_escapes_specials() {
    assert_eq!(quote_literal("a\"b\\c"), r#""a\"b\\c""#);
    assert_eq!(quote_literal("x\n\ty\r"), r#""x\n\ty\r""#);
    assert_eq!(quote_literal("\x01\x7f"), r#""\x01\x7f""#);
}

#[test]
fn quoting_keeps_non_ascii() {
    assert_eq!(quote_literal("héllo"), "\"héllo\"");
}

#[test]
fn quoted_literal_stays_on_one_line() {
    let body = "    int x;\n\n    x = 1;\n";
    assert!(!quote_literal(body).contains('\n'));
}

#[test]
fn quoting_inverts_unquoting() {
    for text in ["", "plain", "a\nb", "tab\there", "q\"q", "back\\slash", "\x00\x1b", "ünï"] {
        assert_eq!(unquote_literal(&quote_literal(text)).unwrap(), text);
    }
}

#[test]
fn unquote_handles_quote_styles() {
    assert_eq!(unquote_literal("'a'").unwrap(), "a");
    assert_eq!(unquote_literal("\"\"\"a\nb\"\"\"").unwrap(), "a\nb");
    assert_eq!(unquote_literal("''").unwrap(), "");
}

#[test]
fn raw_prefix_skips_escapes() {
    assert_eq!(unquote_literal(r"r'a\nb'").unwrap(), r"a\nb");
    assert_eq!(unquote_literal(r"Rb'\x41'").unwrap(), r"\x41");
}

#[test]
fn numeric_escapes() {
    assert_eq!(unquote_literal(r"'\x41\101é\U0001F600'").unwrap(), "AAé😀");
}

#[test]
fn unknown_escape_is_kept() {
    assert_eq!(unquote_literal(r"'\d'").unwrap(), r"\d");
}

#[test]
fn escaped_newline_is_dropped() {
    assert_eq!(unquote_literal("'a\\\nb'").unwrap(), "ab");
}

#[test]
fn malformed_literals() {
    assert!(matches!(unquote_literal("abc"), Err(LexError::InvalidLiteral { .. })));
    assert!(matches!(unquote_literal("'abc"), Err(LexError::InvalidLiteral { .. })));
    assert!(matches!(unquote_literal(r"'\x4'"), Err(LexError::InvalidLiteral { .. })));
    assert!(matches!(unquote_literal(r"'\ud800'"), Err(LexError::InvalidLiteral { .. })));
}

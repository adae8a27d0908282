use super::*;

#[test]
fn sentinel_follows_content() {
    let buf = SourceBuffer::new("abc");
    assert_eq!(buf.len(), 3);
    assert_eq!(buf.as_bytes(), b"abc");
    let mut cursor = buf.cursor();
    cursor.advance_n(3);
    assert!(cursor.is_eof());
}

#[test]
fn padding_is_cache_line_aligned() {
    let buf = SourceBuffer::new(&"x".repeat(64));
    assert_eq!(buf.buf.len() % CACHE_LINE, 0);
    assert!(buf.buf.len() > 64);
}

#[test]
fn empty_source() {
    let buf = SourceBuffer::new("");
    assert!(buf.is_empty());
    assert!(buf.cursor().is_eof());
}

#[test]
fn bom_is_skipped() {
    let buf = SourceBuffer::new("\u{feff}x = 1");
    assert_eq!(buf.as_bytes(), b"x = 1");
    assert_eq!(buf.bom_len(), 3);
}

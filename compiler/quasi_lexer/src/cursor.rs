//! Cursor over a sentinel-terminated buffer.
//!
//! The cursor advances through the buffer byte-by-byte. EOF is detected
//! when the current byte equals the sentinel (`0x00`) and the position
//! has reached the source length. Interior null bytes are told apart from
//! EOF by comparing `pos` against `source_len`.

/// Cursor over a sentinel-terminated byte buffer.
///
/// Created via [`SourceBuffer::cursor()`](crate::SourceBuffer::cursor).
/// The cursor is [`Copy`], so the tokenizer can snapshot and rewind it when
/// it switches into a raw capture mode.
///
/// # Invariant
///
/// `buf[source_len] == 0x00` and every byte after it is `0x00` as well.
#[derive(Clone, Copy, Debug)]
pub struct Cursor<'a> {
    /// Sentinel-terminated buffer (source + sentinel + padding).
    buf: &'a [u8],
    /// Current read position (byte index into `buf`).
    pos: u32,
    /// Length of actual source content (excludes sentinel and padding).
    source_len: u32,
}

const _: () = assert!(std::mem::size_of::<Cursor<'static>>() <= 24);

impl<'a> Cursor<'a> {
    pub(crate) fn new(buf: &'a [u8], source_len: u32) -> Self {
        debug_assert!(
            (source_len as usize) < buf.len(),
            "sentinel must be within buffer bounds"
        );
        Self {
            buf,
            pos: 0,
            source_len,
        }
    }

    /// Returns the byte at the current position (`0x00` at EOF).
    #[inline]
    pub fn current(&self) -> u8 {
        self.buf[self.pos as usize]
    }

    /// Returns the byte one position ahead of current.
    #[inline]
    pub fn peek(&self) -> u8 {
        self.byte_at(self.pos + 1)
    }

    /// Returns the byte two positions ahead of current.
    #[inline]
    pub fn peek2(&self) -> u8 {
        self.byte_at(self.pos + 2)
    }

    /// Byte at an absolute offset; `0x00` anywhere past the buffer.
    #[inline]
    pub fn byte_at(&self, offset: u32) -> u8 {
        self.buf.get(offset as usize).copied().unwrap_or(0)
    }

    #[inline]
    pub fn advance(&mut self) {
        self.pos += 1;
    }

    #[inline]
    pub fn advance_n(&mut self, n: u32) {
        self.pos += n;
    }

    /// Move the cursor to an absolute offset within the source.
    pub fn set_pos(&mut self, pos: u32) {
        debug_assert!(pos <= self.source_len, "cursor moved past EOF");
        self.pos = pos.min(self.source_len);
    }

    /// Returns `true` if the cursor has reached EOF.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.current() == 0 && self.pos >= self.source_len
    }

    /// Current byte offset in the source.
    #[inline]
    pub fn pos(&self) -> u32 {
        self.pos
    }

    #[inline]
    pub fn source_len(&self) -> u32 {
        self.source_len
    }

    /// Extract a source substring as `&str`.
    ///
    /// `start..end` must fall on character boundaries within the source.
    /// The tokenizer only produces boundaries at ASCII bytes or at the ends
    /// of whole UTF-8 sequences, so a failed conversion means a caller bug;
    /// it yields an empty string instead of panicking.
    pub fn slice(&self, start: u32, end: u32) -> &'a str {
        debug_assert!(start <= end, "slice start {start} exceeds end {end}");
        let end = end.min(self.source_len) as usize;
        let start = (start as usize).min(end);
        std::str::from_utf8(&self.buf[start..end]).unwrap_or_default()
    }

    /// Extract a source substring from `start` to the current position.
    pub fn slice_from(&self, start: u32) -> &'a str {
        self.slice(start, self.pos)
    }

    /// Advance while `pred` returns `true` for the current byte.
    ///
    /// `pred(0)` must return `false` so the sentinel stops the loop.
    #[inline]
    pub fn eat_while(&mut self, pred: impl Fn(u8) -> bool) {
        while pred(self.buf[self.pos as usize]) {
            self.pos += 1;
        }
    }

    /// Returns the number of bytes in the UTF-8 character starting with `byte`.
    #[inline]
    pub fn utf8_char_width(byte: u8) -> u32 {
        match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        }
    }

    /// Advance the cursor past one full UTF-8 character.
    #[inline]
    pub fn advance_char(&mut self) {
        let width = Self::utf8_char_width(self.current());
        self.advance_n(width);
    }

    /// Advance past horizontal whitespace (space, tab, form feed).
    #[inline]
    pub fn eat_whitespace(&mut self) {
        while matches!(self.buf[self.pos as usize], b' ' | b'\t' | 0x0C) {
            self.pos += 1;
        }
    }

    /// Advance to the next `\n` byte or EOF using SIMD-accelerated search.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "remaining.len() <= source_len which fits in u32"
    )]
    pub fn eat_until_newline_or_eof(&mut self) {
        let remaining = &self.buf[self.pos as usize..self.source_len as usize];
        match memchr::memchr2(b'\n', b'\r', remaining) {
            Some(offset) => self.pos += offset as u32,
            None => self.pos = self.source_len,
        }
    }

    /// Offset just past the end of the physical line containing `offset`
    /// (after its `\n`, or the source length on the last line).
    #[allow(
        clippy::cast_possible_truncation,
        reason = "offsets are bounded by source_len which fits in u32"
    )]
    pub fn line_end_from(&self, offset: u32) -> u32 {
        let from = offset.min(self.source_len) as usize;
        let remaining = &self.buf[from..self.source_len as usize];
        match memchr::memchr(b'\n', remaining) {
            Some(i) => (from + i + 1) as u32,
            None => self.source_len,
        }
    }

    /// Offset of the first byte of the physical line containing `offset`.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "offsets are bounded by source_len which fits in u32"
    )]
    pub fn line_start_of(&self, offset: u32) -> u32 {
        let upto = offset.min(self.source_len) as usize;
        memchr::memrchr(b'\n', &self.buf[..upto]).map_or(0, |i| (i + 1) as u32)
    }

    /// Find `needle` at or after the current position.
    ///
    /// Returns the absolute offset of the first match without moving the
    /// cursor.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "offsets are bounded by source_len which fits in u32"
    )]
    pub fn find(&self, needle: &[u8]) -> Option<u32> {
        let remaining = &self.buf[self.pos as usize..self.source_len as usize];
        memchr::memmem::find(remaining, needle).map(|i| self.pos + i as u32)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]

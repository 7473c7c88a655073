//! Byte cursor over a shared source buffer with line/column tracking.
//!
//! The cursor owns an `Rc<str>` handle to the canonicalized text so that
//! buffers pushed on the preprocessor's stack need no borrowed lifetime
//! back into the file registry. Reads past the end return `0`, which no
//! token class accepts, so scanning loops terminate without separate
//! bounds checks.

use std::rc::Rc;

#[derive(Clone)]
pub struct Cursor {
    text: Rc<str>,
    pos: usize,
    line: u32,
    line_start: usize,
}

impl Cursor {
    pub fn new(text: Rc<str>) -> Self {
        Cursor {
            text,
            pos: 0,
            line: 1,
            line_start: 0,
        }
    }

    /// The byte at the current position, or `0` at end of input.
    #[inline]
    pub fn current(&self) -> u8 {
        self.text.as_bytes().get(self.pos).copied().unwrap_or(0)
    }

    /// The byte `n` positions ahead, or `0` past the end.
    #[inline]
    pub fn peek(&self, n: usize) -> u8 {
        self.text.as_bytes().get(self.pos + n).copied().unwrap_or(0)
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// Advance one byte, keeping the line/column bookkeeping current.
    #[inline]
    pub fn advance(&mut self) {
        if let Some(&b) = self.text.as_bytes().get(self.pos) {
            self.pos += 1;
            if b == b'\n' {
                self.line += 1;
                self.line_start = self.pos;
            }
        }
    }

    pub fn advance_n(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    /// Advance past one full UTF-8 scalar and return it. Off-boundary
    /// positions (possible after single-byte `Other` tokens split a
    /// multibyte sequence) advance by one byte and yield U+FFFD.
    pub fn advance_char(&mut self) -> char {
        if !self.text.is_char_boundary(self.pos) {
            self.advance();
            return '\u{fffd}';
        }
        match self.text[self.pos..].chars().next() {
            Some(c) => {
                self.advance_n(c.len_utf8());
                c
            }
            None => '\0',
        }
    }

    /// Does the remaining input start with `lit`?
    pub fn starts_with(&self, lit: &str) -> bool {
        self.text.as_bytes()[self.pos..].starts_with(lit.as_bytes())
    }

    /// Consume `lit` if the remaining input starts with it.
    pub fn eat_str(&mut self, lit: &str) -> bool {
        if self.starts_with(lit) {
            self.advance_n(lit.len());
            true
        } else {
            false
        }
    }

    /// Advance to the next `\n` (not consuming it) or to end of input.
    pub fn skip_to_newline(&mut self) {
        let rest = &self.text.as_bytes()[self.pos..];
        match memchr::memchr(b'\n', rest) {
            Some(offset) => self.pos += offset,
            None => self.pos = self.text.len(),
        }
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// 1-based column of the current position.
    #[inline]
    pub fn col(&self) -> u32 {
        u32::try_from(self.pos - self.line_start).unwrap_or(u32::MAX - 1) + 1
    }

    pub fn slice(&self, start: usize, end: usize) -> &str {
        &self.text[start..end]
    }

    pub fn remaining(&self) -> &str {
        &self.text[self.pos..]
    }

    pub fn remaining_bytes(&self) -> &[u8] {
        &self.text.as_bytes()[self.pos..]
    }
}

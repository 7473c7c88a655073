//! The raw token scanner.
//!
//! Classification is tried in a fixed order against the cursor: high-bit
//! byte, whitespace/comments, string or character literal, number,
//! identifier, punctuator. Numbers are captured greedily (including
//! digit separators and signed exponents) without validation, so the
//! same scanner serves contexts such as raw `#if` text where stricter
//! numeric rules do not yet apply.
//!
//! The scanner never aborts: malformed input produces an issue record
//! plus a best-effort token, letting downstream consumers resynchronize.

use std::rc::Rc;

use crate::cursor::Cursor;
use crate::token::{PpToken, PpTokenKind, Punct, StrKind, TokenFlags};

/// A recoverable lexical problem, reported out-of-band so this crate
/// stays independent of the diagnostic sink.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScanIssue {
    pub line: u32,
    pub col: u32,
    pub kind: ScanIssueKind,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScanIssueKind {
    UnterminatedBlockComment,
    UnterminatedString,
    UnterminatedChar,
    /// `\x` with no hex digits following.
    MissingHexDigits,
}

impl ScanIssueKind {
    pub fn message(self) -> &'static str {
        match self {
            ScanIssueKind::UnterminatedBlockComment => "unterminated block comment",
            ScanIssueKind::UnterminatedString => "unterminated string constant",
            ScanIssueKind::UnterminatedChar => "unterminated character constant",
            ScanIssueKind::MissingHexDigits => "\\x used with no following hex digits",
        }
    }
}

/// Scanner over one canonicalized buffer.
pub struct Scanner {
    cur: Cursor,
    /// Set at buffer start and after each newline; moves onto the next
    /// emitted token as its LINE_START flag.
    pending_line_start: bool,
    issues: Vec<ScanIssue>,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

impl Scanner {
    pub fn new(text: Rc<str>) -> Self {
        Scanner {
            cur: Cursor::new(text),
            pending_line_start: true,
            issues: Vec::new(),
        }
    }

    /// Drain the issues recorded since the last call.
    pub fn take_issues(&mut self) -> Vec<ScanIssue> {
        std::mem::take(&mut self.issues)
    }

    fn issue(&mut self, line: u32, col: u32, kind: ScanIssueKind) {
        self.issues.push(ScanIssue { line, col, kind });
    }

    /// Produce the next raw token. Returns an `Eof` token at end of
    /// buffer; further calls keep returning `Eof`.
    pub fn next_token(&mut self) -> PpToken {
        let mut flags = TokenFlags::empty();
        loop {
            if self.skip_whitespace_and_comments() {
                flags |= TokenFlags::WS_BEFORE;
                continue;
            }
            break;
        }
        if self.pending_line_start {
            flags |= TokenFlags::LINE_START;
        }
        let line = self.cur.line();
        let col = self.cur.col();

        let kind = self.classify();
        if !matches!(kind, PpTokenKind::Eof) {
            self.pending_line_start = false;
        }
        PpToken {
            kind,
            flags,
            line,
            col,
            loc: None,
        }
    }

    fn classify(&mut self) -> PpTokenKind {
        let b = self.cur.current();
        if self.cur.is_eof() {
            return PpTokenKind::Eof;
        }
        // The scanner does not UTF-8-decode outside of string/char
        // literals: any high-bit byte becomes a one-byte Other token.
        if b & 0x80 != 0 {
            self.cur.advance();
            return PpTokenKind::Other(b);
        }
        if let Some(kind) = self.string_literal() {
            return kind;
        }
        if let Some(kind) = self.number() {
            return kind;
        }
        if let Some(kind) = self.identifier() {
            return kind;
        }
        if let Some((punct, len)) = Punct::lookup(self.cur.remaining_bytes()) {
            self.cur.advance_n(len);
            return PpTokenKind::Punct(punct);
        }
        // Stray control byte; emit it opaquely and move on.
        self.cur.advance();
        PpTokenKind::Other(b)
    }

    /// Skip one run of whitespace or one comment. Returns whether any
    /// progress was made; the caller loops because a comment followed by
    /// spaces needs more than one pass.
    fn skip_whitespace_and_comments(&mut self) -> bool {
        let mut progressed = false;
        while self.cur.current().is_ascii_whitespace() && !self.cur.is_eof() {
            if self.cur.current() == b'\n' {
                self.pending_line_start = true;
            }
            self.cur.advance();
            progressed = true;
        }
        if self.cur.starts_with("//") {
            self.cur.skip_to_newline();
            progressed = true;
        }
        if self.cur.starts_with("/*") {
            let line = self.cur.line();
            let col = self.cur.col();
            self.cur.advance_n(2);
            loop {
                if self.cur.is_eof() {
                    self.issue(line, col, ScanIssueKind::UnterminatedBlockComment);
                    break;
                }
                if self.cur.eat_str("*/") {
                    break;
                }
                if self.cur.current() == b'\n' {
                    self.pending_line_start = true;
                }
                self.cur.advance();
            }
            progressed = true;
        }
        progressed
    }

    /// Detect an optional encoding prefix immediately followed by a
    /// quote; on match, decode the body to code points.
    fn string_literal(&mut self) -> Option<PpTokenKind> {
        let (prefix_len, kind) = if self.cur.starts_with("u8") {
            (2, StrKind::StrUtf8)
        } else if self.cur.current() == b'u' {
            (1, StrKind::StrUtf16)
        } else if self.cur.current() == b'U' {
            (1, StrKind::StrUtf32)
        } else if self.cur.current() == b'L' {
            (1, StrKind::StrWide)
        } else {
            (0, StrKind::Str)
        };
        let quote = self.cur.peek(prefix_len);
        if quote != b'"' && quote != b'\'' {
            return None;
        }
        let kind = if quote == b'\'' { kind.char_variant() } else { kind };
        self.cur.advance_n(prefix_len + 1);

        let mut body = Vec::new();
        loop {
            let b = self.cur.current();
            if self.cur.is_eof() || b == b'\n' {
                // Leave the newline for the next token so line starts
                // and line numbers stay accurate.
                let issue = if kind.is_char() {
                    ScanIssueKind::UnterminatedChar
                } else {
                    ScanIssueKind::UnterminatedString
                };
                self.issue(self.cur.line(), self.cur.col(), issue);
                break;
            }
            if b == quote {
                self.cur.advance();
                break;
            }
            if b == b'\\' {
                self.cur.advance();
                body.push(self.escaped_char());
            } else {
                body.push(self.cur.advance_char() as u32);
            }
        }
        Some(PpTokenKind::Str { kind, body })
    }

    /// Decode one escape sequence after the backslash has been consumed.
    ///
    /// Recognized: octal up to three digits, `\xH...`, `\uHHHH`,
    /// `\UHHHHHHHH`, and the single-letter set. Unknown escapes yield
    /// the character itself; a `\u`/`\U` with too few digits yields a
    /// literal backslash and leaves the digits in place.
    fn escaped_char(&mut self) -> u32 {
        let b = self.cur.current();
        if (b'0'..=b'7').contains(&b) {
            let mut value = 0u32;
            for _ in 0..3 {
                let d = self.cur.current();
                if !(b'0'..=b'7').contains(&d) {
                    break;
                }
                value = (value << 3) | u32::from(d - b'0');
                self.cur.advance();
            }
            return value;
        }
        match b {
            b'x' => {
                self.cur.advance();
                if !self.cur.current().is_ascii_hexdigit() {
                    self.issue(self.cur.line(), self.cur.col(), ScanIssueKind::MissingHexDigits);
                }
                let mut value = 0u32;
                while self.cur.current().is_ascii_hexdigit() {
                    let d = self.cur.current() as char;
                    value = (value << 4) | d.to_digit(16).unwrap_or(0);
                    self.cur.advance();
                }
                value
            }
            b'u' => self.unicode_escape(4),
            b'U' => self.unicode_escape(8),
            _ => {
                self.cur.advance();
                match b {
                    b'a' => 0x07,
                    b'b' => 0x08,
                    b'f' => 0x0c,
                    b'n' => b'\n' as u32,
                    b'r' => b'\r' as u32,
                    b't' => b'\t' as u32,
                    b'v' => 0x0b,
                    b'\'' | b'"' | b'?' | b'\\' => u32::from(b),
                    other => u32::from(other),
                }
            }
        }
    }

    /// Read exactly `len` hex digits after `\u`/`\U`. On a short read
    /// the escape is not taken: the marker stays in the body as `\`.
    fn unicode_escape(&mut self, len: usize) -> u32 {
        let mut value = 0u32;
        for i in 0..len {
            let d = self.cur.peek(i + 1);
            if !d.is_ascii_hexdigit() {
                return u32::from(b'\\');
            }
            value = (value << 4) | (d as char).to_digit(16).unwrap_or(0);
        }
        self.cur.advance_n(len + 1);
        value
    }

    /// Greedy number capture: a digit, or `.` followed by a digit,
    /// starts a number; alphanumerics, `_`, `'`, `.`, and sign-bearing
    /// exponent markers extend it.
    fn number(&mut self) -> Option<PpTokenKind> {
        let b = self.cur.current();
        let starts = b.is_ascii_digit() || (b == b'.' && self.cur.peek(1).is_ascii_digit());
        if !starts {
            return None;
        }
        let start = self.cur.pos();
        self.cur.advance();
        loop {
            let c = self.cur.current();
            if is_ident_continue(c) || c == b'\'' || c == b'.' {
                if matches!(c, b'e' | b'E' | b'p' | b'P')
                    && matches!(self.cur.peek(1), b'+' | b'-')
                {
                    self.cur.advance_n(2);
                    continue;
                }
                self.cur.advance();
            } else {
                break;
            }
        }
        let text = self.cur.slice(start, self.cur.pos()).to_owned();
        Some(PpTokenKind::Number(text))
    }

    fn identifier(&mut self) -> Option<PpTokenKind> {
        if !is_ident_start(self.cur.current()) {
            return None;
        }
        let start = self.cur.pos();
        while is_ident_continue(self.cur.current()) {
            self.cur.advance();
        }
        Some(PpTokenKind::Ident(
            self.cur.slice(start, self.cur.pos()).to_owned(),
        ))
    }
}

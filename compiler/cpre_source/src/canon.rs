//! Input canonicalization passes.
//!
//! Raw file bytes pass through two phases before any scanning happens:
//!
//! - **Phase 1**: strip a UTF-8 byte-order mark, normalize `\r\n` and
//!   lone `\r` to `\n`, replace the nine standard trigraph sequences.
//! - **Phase 2**: splice `\` immediately followed by `\n` (removing
//!   both), re-inserting an equal number of blank lines at the next real
//!   newline so later lines keep their physical line numbers.
//!
//! Both phases run once per file; the result is cached by the registry.

/// Strip a leading UTF-8 byte-order mark, if present.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Normalize `\r\n` and lone `\r` line endings to `\n`.
pub fn canonicalize_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut bytes = text.chars().peekable();
    while let Some(c) = bytes.next() {
        if c == '\r' {
            if bytes.peek() == Some(&'\n') {
                bytes.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}

/// Replace the nine standard trigraph sequences with their single-byte
/// equivalents.
///
/// `??` followed by anything else is left untouched (both `?` bytes are
/// copied and scanning resumes after them, matching the usual two-byte
/// advance so `???=` still resolves the trailing `?=` pair correctly).
pub fn replace_trigraphs(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'?' && i + 2 < bytes.len() && bytes[i + 1] == b'?' {
            let replacement = match bytes[i + 2] {
                b'<' => Some('{'),
                b'>' => Some('}'),
                b'(' => Some('['),
                b')' => Some(']'),
                b'=' => Some('#'),
                b'/' => Some('\\'),
                b'\'' => Some('^'),
                b'!' => Some('|'),
                b'-' => Some('~'),
                _ => None,
            };
            if let Some(c) = replacement {
                out.push(c);
                i += 3;
                continue;
            }
            out.push_str("??");
            i += 2;
            continue;
        }
        // Everything outside trigraph starts is copied verbatim. The copy
        // is byte-wise but stays on UTF-8 boundaries because '?' is ASCII.
        let start = i;
        while i < bytes.len() && bytes[i] != b'?' {
            i += 1;
        }
        if start == i {
            out.push('?');
            i += 1;
        } else {
            out.push_str(&text[start..i]);
        }
    }
    out
}

/// Splice backslash-newline pairs, preserving the physical line count.
///
/// Each removed `\`+`\n` pair defers one newline; the deferred newlines
/// are emitted right after the next real newline (or at end of text) so
/// that every subsequent line keeps its original line number.
pub fn splice_continued_lines(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut deferred = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
            i += 2;
            deferred += 1;
        } else if bytes[i] == b'\n' {
            out.push('\n');
            for _ in 0..deferred {
                out.push('\n');
            }
            deferred = 0;
            i += 1;
        } else {
            let start = i;
            while i < bytes.len() && bytes[i] != b'\\' && bytes[i] != b'\n' {
                i += 1;
            }
            if start == i {
                out.push('\\');
                i += 1;
            } else {
                out.push_str(&text[start..i]);
            }
        }
    }
    for _ in 0..deferred {
        out.push('\n');
    }
    out
}

/// Run both canonicalization phases over raw file bytes.
///
/// Invalid UTF-8 sequences are replaced with U+FFFD; the scanner treats
/// any high-bit byte as an opaque `Other` token, so replacement does not
/// change the token structure of well-formed programs.
pub fn canonicalize(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let text = strip_bom(&text);
    let text = canonicalize_newlines(text);
    let text = replace_trigraphs(&text);
    splice_continued_lines(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bom_is_stripped() {
        assert_eq!(strip_bom("\u{feff}int"), "int");
        assert_eq!(strip_bom("int"), "int");
    }

    #[test]
    fn crlf_and_lone_cr_become_lf() {
        assert_eq!(canonicalize_newlines("a\r\nb\rc\nd"), "a\nb\nc\nd");
    }

    #[test]
    fn all_nine_trigraphs_resolve() {
        assert_eq!(
            replace_trigraphs("??< ??> ??( ??) ??= ??/ ??' ??! ??-"),
            "{ } [ ] # \\ ^ | ~"
        );
    }

    #[test]
    fn unknown_trigraph_tail_is_kept() {
        assert_eq!(replace_trigraphs("??x"), "??x");
        assert_eq!(replace_trigraphs("a?b"), "a?b");
    }

    #[test]
    fn question_run_resolves_trailing_pair() {
        // `???=` is `?` + `??=`.
        assert_eq!(replace_trigraphs("???="), "?#");
    }

    #[test]
    fn splice_joins_lines() {
        assert_eq!(splice_continued_lines("ab\\\ncd\n"), "abcd\n\n");
    }

    #[test]
    fn splice_preserves_line_numbers() {
        // Two spliced lines: the deferred newlines land after the next
        // real one, so "next" still starts on physical line 4.
        let spliced = splice_continued_lines("a\\\nb\\\nc\nnext\n");
        assert_eq!(spliced, "abc\n\n\nnext\n");
    }

    #[test]
    fn splice_at_end_of_text() {
        assert_eq!(splice_continued_lines("ab\\\n"), "ab\n");
    }

    #[test]
    fn backslash_not_before_newline_is_kept() {
        assert_eq!(splice_continued_lines("a\\b\n"), "a\\b\n");
    }

    #[test]
    fn full_pipeline() {
        let out = canonicalize("\u{feff}#define X 1??/\r\nint x;\r\n".as_bytes());
        assert_eq!(out, "#define X 1int x;\n\n");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn newline_count(s: &str) -> usize {
            s.bytes().filter(|&b| b == b'\n').count()
        }

        proptest! {
            #[test]
            fn splice_never_changes_newline_count(
                s in "[a-z\\\\\n]{0,64}"
            ) {
                prop_assert_eq!(
                    newline_count(&splice_continued_lines(&s)),
                    newline_count(&s)
                );
            }

            #[test]
            fn newline_canonicalization_is_idempotent(s in ".{0,64}") {
                let once = canonicalize_newlines(&s);
                prop_assert_eq!(canonicalize_newlines(&once), once);
            }
        }
    }
}

//! Token display helpers.
//!
//! `format_token` reconstructs a source-like spelling (used when
//! emitting preprocessed output), while `format_token_verbose` adds
//! position and classification for dump-style listings.

use std::fmt::Write;

use crate::token::{PpToken, PpTokenKind, StrKind};

/// Render a string or character body element back to escaped form.
fn push_escaped(out: &mut String, cp: u32, quote: char) {
    match char::from_u32(cp) {
        Some(c) if c == quote => {
            out.push('\\');
            out.push(c);
        }
        Some('\\') => out.push_str("\\\\"),
        Some('\n') => out.push_str("\\n"),
        Some('\t') => out.push_str("\\t"),
        Some('\r') => out.push_str("\\r"),
        Some(c) if (c as u32) >= 0x20 && (c as u32) < 0x7f => out.push(c),
        Some(c) if (c as u32) > 0x7f => out.push(c),
        _ => {
            let _ = write!(out, "\\x{cp:x}");
        }
    }
}

/// Spelling of a token, close to how it appeared in source.
pub fn format_token(tok: &PpToken) -> String {
    match &tok.kind {
        PpTokenKind::Eof => String::new(),
        PpTokenKind::Ident(text) | PpTokenKind::Number(text) => text.clone(),
        PpTokenKind::Punct(p) => p.spelling(),
        PpTokenKind::Other(b) => {
            if b.is_ascii_graphic() || *b == b' ' {
                (*b as char).to_string()
            } else {
                format!("\\x{b:02x}")
            }
        }
        PpTokenKind::Str { kind, body } => {
            let quote = if kind.is_char() { '\'' } else { '"' };
            let mut out = String::new();
            out.push_str(str_prefix(*kind));
            out.push(quote);
            for &cp in body {
                push_escaped(&mut out, cp, quote);
            }
            out.push(quote);
            out
        }
    }
}

fn str_prefix(kind: StrKind) -> &'static str {
    match kind {
        StrKind::Str | StrKind::Char => "",
        StrKind::StrUtf8 | StrKind::CharUtf8 => "u8",
        StrKind::StrUtf16 | StrKind::CharUtf16 => "u",
        StrKind::StrUtf32 | StrKind::CharUtf32 => "U",
        StrKind::StrWide | StrKind::CharWide => "L",
    }
}

/// One-line dump form: `line:col: <Kind> spelling`.
pub fn format_token_verbose(tok: &PpToken) -> String {
    let kind = match &tok.kind {
        PpTokenKind::Eof => "Eof",
        PpTokenKind::Ident(_) => "Ident",
        PpTokenKind::Number(_) => "Number",
        PpTokenKind::Str { kind, .. } if kind.is_char() => "Char",
        PpTokenKind::Str { .. } => "Str",
        PpTokenKind::Punct(_) => "Punct",
        PpTokenKind::Other(_) => "Other",
    };
    format!("{}:{}: <{}> {}", tok.line, tok.col, kind, format_token(tok))
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::scanner::Scanner;

    fn first_spelling(text: &str) -> String {
        let mut scanner = Scanner::new(Rc::from(text));
        format_token(&scanner.next_token())
    }

    #[test]
    fn spellings_round_trip() {
        for text in [
            "ident",
            "0xFFull",
            ">>=",
            "...",
            "->",
            "##",
            ";",
            r#""a\tb""#,
            r#"u8"x""#,
            r#"L'q'"#,
            r#"'\\'"#,
        ] {
            assert_eq!(first_spelling(text), text);
        }
    }

    #[test]
    fn every_punctuator_round_trips() {
        for (text, _) in crate::token::MULTI_PUNCTS {
            assert_eq!(first_spelling(text), *text);
        }
        for byte in b"!%&()*+,-./:;<=>?[]^{|}~#" {
            let text = (*byte as char).to_string();
            assert_eq!(first_spelling(&text), text);
        }
    }

    #[test]
    fn non_printable_body_uses_hex_escape() {
        assert_eq!(first_spelling("\"\\x1\""), "\"\\x1\"");
    }

    #[test]
    fn verbose_form() {
        let mut scanner = Scanner::new(Rc::from("  foo"));
        let tok = scanner.next_token();
        assert_eq!(format_token_verbose(&tok), "1:3: <Ident> foo");
    }
}

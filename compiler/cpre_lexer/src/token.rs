//! Preprocessing token model and the static punctuator/keyword tables.

use cpre_source::LocId;

bitflags::bitflags! {
    /// Per-token layout flags, both required by the driver: whitespace
    /// adjacency decides function-like macro invocation, line starts
    /// decide directive recognition.
    #[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
    pub struct TokenFlags: u8 {
        /// Whitespace (or a comment) preceded this token.
        const WS_BEFORE = 1 << 0;
        /// This token is the first on its line.
        const LINE_START = 1 << 1;
    }
}

/// String/char literal kind: encoding prefix crossed with string vs
/// character constant.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum StrKind {
    /// `"..."`
    Str,
    /// `u8"..."`
    StrUtf8,
    /// `u"..."`
    StrUtf16,
    /// `U"..."`
    StrUtf32,
    /// `L"..."`
    StrWide,
    /// `'...'`
    Char,
    /// `u8'...'`
    CharUtf8,
    /// `u'...'`
    CharUtf16,
    /// `U'...'`
    CharUtf32,
    /// `L'...'`
    CharWide,
}

impl StrKind {
    /// The corresponding character-constant kind for a string kind.
    pub fn char_variant(self) -> StrKind {
        match self {
            StrKind::Str => StrKind::Char,
            StrKind::StrUtf8 => StrKind::CharUtf8,
            StrKind::StrUtf16 => StrKind::CharUtf16,
            StrKind::StrUtf32 => StrKind::CharUtf32,
            StrKind::StrWide => StrKind::CharWide,
            other => other,
        }
    }

    pub fn is_char(self) -> bool {
        matches!(
            self,
            StrKind::Char
                | StrKind::CharUtf8
                | StrKind::CharUtf16
                | StrKind::CharUtf32
                | StrKind::CharWide
        )
    }

    /// Source spelling of the opening prefix and quote.
    pub fn opener(self) -> &'static str {
        match self {
            StrKind::Str => "\"",
            StrKind::StrUtf8 => "u8\"",
            StrKind::StrUtf16 => "u\"",
            StrKind::StrUtf32 => "U\"",
            StrKind::StrWide => "L\"",
            StrKind::Char => "'",
            StrKind::CharUtf8 => "u8'",
            StrKind::CharUtf16 => "u'",
            StrKind::CharUtf32 => "U'",
            StrKind::CharWide => "L'",
        }
    }

    pub fn terminator(self) -> char {
        if self.is_char() {
            '\''
        } else {
            '"'
        }
    }

    /// Destination element width in bytes implied by the prefix:
    /// UTF-8 for none/`u8`, UTF-16 for `u`, raw 32-bit for `U`/`L`.
    pub fn element_width(self) -> u8 {
        match self {
            StrKind::Str | StrKind::StrUtf8 | StrKind::Char | StrKind::CharUtf8 => 1,
            StrKind::StrUtf16 | StrKind::CharUtf16 => 2,
            StrKind::StrUtf32 | StrKind::StrWide | StrKind::CharUtf32 | StrKind::CharWide => 4,
        }
    }
}

/// Punctuator id: a named variant for every multi-character operator,
/// or the single ASCII punctuation byte.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Punct {
    ShrAssign,
    ShlAssign,
    Ellipsis,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    Inc,
    Dec,
    Shr,
    Shl,
    LogicalAnd,
    LogicalOr,
    Eq,
    Ne,
    Le,
    Ge,
    HashHash,
    Arrow,
    /// Any single ASCII punctuation byte (`#`, `(`, `+`, ...).
    Char(u8),
}

/// Multi-character punctuators, longest first so a linear scan gives the
/// longest match.
pub const MULTI_PUNCTS: &[(&str, Punct)] = &[
    (">>=", Punct::ShrAssign),
    ("<<=", Punct::ShlAssign),
    ("...", Punct::Ellipsis),
    ("+=", Punct::AddAssign),
    ("-=", Punct::SubAssign),
    ("*=", Punct::MulAssign),
    ("/=", Punct::DivAssign),
    ("%=", Punct::ModAssign),
    ("&=", Punct::AndAssign),
    ("|=", Punct::OrAssign),
    ("^=", Punct::XorAssign),
    ("++", Punct::Inc),
    ("--", Punct::Dec),
    (">>", Punct::Shr),
    ("<<", Punct::Shl),
    ("&&", Punct::LogicalAnd),
    ("||", Punct::LogicalOr),
    ("==", Punct::Eq),
    ("!=", Punct::Ne),
    ("<=", Punct::Le),
    (">=", Punct::Ge),
    ("##", Punct::HashHash),
    ("->", Punct::Arrow),
];

impl Punct {
    /// Longest match against the start of `bytes`, falling back to a
    /// single ASCII punctuation byte. Returns the punct and its length.
    pub fn lookup(bytes: &[u8]) -> Option<(Punct, usize)> {
        for (text, punct) in MULTI_PUNCTS {
            if bytes.starts_with(text.as_bytes()) {
                return Some((*punct, text.len()));
            }
        }
        match bytes.first() {
            Some(&b) if b.is_ascii_punctuation() => Some((Punct::Char(b), 1)),
            _ => None,
        }
    }

    /// Source spelling. Single-byte punctuators render their byte.
    pub fn spelling(self) -> String {
        for (text, punct) in MULTI_PUNCTS {
            if *punct == self {
                return (*text).to_owned();
            }
        }
        match self {
            Punct::Char(b) => (b as char).to_string(),
            // All non-Char variants are in MULTI_PUNCTS.
            _ => String::new(),
        }
    }
}

/// Keywords of the target language. Pure data with no initialization
/// order concerns; the preprocessor itself does not treat these
/// specially, but downstream consumers and the round-trip tests do.
pub const KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "_Alignas", "_Alignof", "_Atomic", "_Bool",
    "_Complex", "_Generic", "_Imaginary", "_Noreturn", "_Static_assert", "_Thread_local",
];

/// Kind and kind-specific payload of a preprocessing token.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum PpTokenKind {
    /// Explicit end-of-input marker terminating the stream.
    Eof,
    Ident(String),
    /// Greedily captured number spelling; validation and typing are
    /// deferred to the literal converters.
    Number(String),
    /// String or character literal with its escape-decoded code points.
    Str { kind: StrKind, body: Vec<u32> },
    Punct(Punct),
    /// A byte the scanner does not classify (notably any byte with the
    /// high bit set; the scanner does not UTF-8-decode outside of
    /// string/char literals).
    Other(u8),
}

/// One preprocessing token. Immutable once produced; `eat` transfers
/// ownership to the caller, `peek` borrows.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct PpToken {
    pub kind: PpTokenKind,
    pub flags: TokenFlags,
    /// 1-based line within the producing buffer.
    pub line: u32,
    /// 1-based column within the producing buffer.
    pub col: u32,
    /// Interned location; attached by the buffer stack, not the scanner.
    pub loc: Option<LocId>,
}

impl PpToken {
    /// The end-of-input token. Also serves as a neutral template for
    /// synthesized tokens.
    pub fn eof() -> PpToken {
        PpToken {
            kind: PpTokenKind::Eof,
            flags: TokenFlags::empty(),
            line: 0,
            col: 0,
            loc: None,
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, PpTokenKind::Eof)
    }

    pub fn has_ws_before(&self) -> bool {
        self.flags.contains(TokenFlags::WS_BEFORE)
    }

    pub fn at_line_start(&self) -> bool {
        self.flags.contains(TokenFlags::LINE_START)
    }

    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            PpTokenKind::Ident(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_ident(&self, name: &str) -> bool {
        self.ident() == Some(name)
    }

    pub fn is_punct(&self, punct: Punct) -> bool {
        matches!(&self.kind, PpTokenKind::Punct(p) if *p == punct)
    }

    /// Shorthand for single-byte punctuator checks.
    pub fn is_punct_byte(&self, byte: u8) -> bool {
        self.is_punct(Punct::Char(byte))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_match_wins() {
        assert_eq!(Punct::lookup(b">>="), Some((Punct::ShrAssign, 3)));
        assert_eq!(Punct::lookup(b">>"), Some((Punct::Shr, 2)));
        assert_eq!(Punct::lookup(b">"), Some((Punct::Char(b'>'), 1)));
        assert_eq!(Punct::lookup(b"...x"), Some((Punct::Ellipsis, 3)));
    }

    #[test]
    fn non_punctuation_does_not_match() {
        assert_eq!(Punct::lookup(b"a"), None);
        assert_eq!(Punct::lookup(b""), None);
        assert_eq!(Punct::lookup(b" "), None);
    }

    #[test]
    fn spelling_round_trips_through_lookup() {
        for (text, punct) in MULTI_PUNCTS {
            assert_eq!(punct.spelling(), *text);
            assert_eq!(Punct::lookup(text.as_bytes()), Some((*punct, text.len())));
        }
    }

    #[test]
    fn str_kind_widths() {
        assert_eq!(StrKind::Str.element_width(), 1);
        assert_eq!(StrKind::StrUtf16.element_width(), 2);
        assert_eq!(StrKind::CharWide.element_width(), 4);
        assert!(StrKind::CharUtf16.is_char());
        assert!(!StrKind::StrUtf8.is_char());
        assert_eq!(StrKind::StrWide.char_variant(), StrKind::CharWide);
    }
}

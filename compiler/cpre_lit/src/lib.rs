//! Semantic conversion of literal tokens.
//!
//! The raw scanner captures number spellings greedily and decodes
//! string/char bodies to code points; this crate applies the language's
//! conversion rules on top: radix and suffix resolution with type-rank
//! selection for integers, from-scratch IEEE-754 encoding for floats,
//! and element-width re-encoding for strings and character constants.
//!
//! Conversion is lazy: callers invoke it only when a number or string
//! token is actually consumed downstream.

mod float;
mod int;
mod str_enc;

pub use float::{encode_float, FloatLit, FloatType};
pub use int::{parse_int, IntError, IntLit, IntType};
pub use str_enc::{encode_string, pack_char_constant, EncodedString};

/// A fully converted numeric literal.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum NumLit {
    Int(IntLit),
    Float(FloatLit),
}

/// Convert a number spelling to a typed value.
///
/// The integer parse is attempted first; its failure is only a signal
/// to try the floating-point parse. `None` means both failed and the
/// literal is invalid.
pub fn convert_number(text: &str) -> Option<NumLit> {
    if let Ok(lit) = parse_int(text) {
        return Some(NumLit::Int(lit));
    }
    encode_float(text).map(NumLit::Float)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn int_first_float_fallthrough() {
        assert_eq!(
            convert_number("42"),
            Some(NumLit::Int(IntLit {
                value: 42,
                ty: IntType::Int,
            }))
        );
        assert!(matches!(convert_number("12.375"), Some(NumLit::Float(_))));
        // Integer grammar rejects the dot, float grammar rejects the 'x'.
        assert_eq!(convert_number("12.x"), None);
        assert_eq!(convert_number("0x"), None);
    }
}

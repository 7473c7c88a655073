//! String and character constant encoding.
//!
//! The scanner has already decoded escapes to code points; here each
//! code point is re-encoded into the element width implied by the
//! literal's prefix, and the buffer is terminated by a zero element at
//! that width. Character constants instead pack their code points into
//! one integer, multi-character-constant style.

use cpre_lexer::StrKind;

/// An encoded string constant: the raw element bytes plus the element
/// count (terminator included), which downstream type construction
/// needs for the array length.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncodedString {
    pub bytes: Vec<u8>,
    pub element_width: u8,
    pub element_count: usize,
}

fn encode_utf8(out: &mut Vec<u8>, cp: u32) -> usize {
    match char::from_u32(cp) {
        Some(c) => {
            let mut buf = [0u8; 4];
            let encoded = c.encode_utf8(&mut buf);
            out.extend_from_slice(encoded.as_bytes());
            encoded.len()
        }
        None => {
            // Invalid scalar, e.g. an out-of-range escape: emit the
            // replacement character rather than corrupt the stream.
            out.extend_from_slice("\u{fffd}".as_bytes());
            3
        }
    }
}

fn encode_utf16(out: &mut Vec<u8>, cp: u32) -> usize {
    match char::from_u32(cp) {
        Some(c) => {
            let mut buf = [0u16; 2];
            let units = c.encode_utf16(&mut buf);
            for unit in units.iter() {
                out.extend_from_slice(&unit.to_le_bytes());
            }
            units.len()
        }
        None => {
            out.extend_from_slice(&0xfffdu16.to_le_bytes());
            1
        }
    }
}

/// Re-encode a decoded string body to its destination element width and
/// append the zero terminator.
pub fn encode_string(kind: StrKind, body: &[u32]) -> EncodedString {
    let width = kind.element_width();
    let mut bytes = Vec::with_capacity(body.len() * usize::from(width) + usize::from(width));
    let mut element_count = 0usize;
    for &cp in body {
        element_count += match width {
            1 => encode_utf8(&mut bytes, cp),
            2 => encode_utf16(&mut bytes, cp),
            _ => {
                bytes.extend_from_slice(&cp.to_le_bytes());
                1
            }
        };
    }
    bytes.extend_from_slice(&vec![0u8; usize::from(width)]);
    element_count += 1;
    EncodedString {
        bytes,
        element_width: width,
        element_count,
    }
}

/// Pack a character constant's code points into one integer: previously
/// accumulated bits shift left by the element width and the new code
/// point is OR-ed in, truncated to that width. Code points too wide for
/// the element are dropped, matching the conventional
/// (implementation-defined) multi-character-constant value.
pub fn pack_char_constant(kind: StrKind, body: &[u32]) -> u64 {
    let width_bits = u32::from(kind.element_width()) * 8;
    let mask: u64 = if width_bits >= 64 {
        u64::MAX
    } else {
        (1u64 << width_bits) - 1
    };
    let mut value: u64 = 0;
    for &cp in body {
        if width_bits < 32 && u64::from(cp) > mask {
            break;
        }
        value = (value << width_bits) | (u64::from(cp) & mask);
    }
    value & mask
}

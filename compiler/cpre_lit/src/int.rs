//! Integer literal conversion: radix and suffix resolution plus
//! smallest-fitting-type selection.

use thiserror::Error;

/// Standard integer types by ascending rank, LP64 widths.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IntType {
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
}

impl IntType {
    pub fn is_signed(self) -> bool {
        matches!(self, IntType::Int | IntType::Long | IntType::LongLong)
    }

    pub fn bits(self) -> u32 {
        match self {
            IntType::Int | IntType::UInt => 32,
            _ => 64,
        }
    }

    fn fits(self, value: u64) -> bool {
        match self {
            IntType::Int => value <= i32::MAX as u64,
            IntType::UInt => value <= u32::MAX as u64,
            IntType::Long | IntType::LongLong => value <= i64::MAX as u64,
            IntType::ULong | IntType::ULongLong => true,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct IntLit {
    pub value: u64,
    pub ty: IntType,
}

/// Failure here is not reported directly; the caller falls through to
/// the floating-point parse.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum IntError {
    #[error("integer literal has no digits")]
    NoDigits,
    #[error("invalid digit for this radix")]
    InvalidDigit,
    #[error("unrecognized literal suffix")]
    InvalidSuffix,
    #[error("integer literal overflows the widest type")]
    Overflow,
}

struct Suffix {
    is_unsigned: bool,
    long_count: u8,
}

/// Match the trailing suffix letters: `u`/`U` and `l`/`L`/`ll`/`LL`,
/// each at most once, in either order. `ll` must be case-homogeneous.
fn parse_suffix(rest: &str) -> Result<Suffix, IntError> {
    let mut suffix = Suffix {
        is_unsigned: false,
        long_count: 0,
    };
    let bytes = rest.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'u' | b'U' if !suffix.is_unsigned => {
                suffix.is_unsigned = true;
                i += 1;
            }
            c @ (b'l' | b'L') if suffix.long_count == 0 => {
                if i + 1 < bytes.len() && bytes[i + 1] == c {
                    suffix.long_count = 2;
                    i += 2;
                } else {
                    suffix.long_count = 1;
                    i += 1;
                }
            }
            _ => return Err(IntError::InvalidSuffix),
        }
    }
    Ok(suffix)
}

fn candidate_types(radix: u32, suffix: &Suffix) -> &'static [IntType] {
    use IntType::*;
    // Decimal literals prefer signed ranks and reach an unsigned type
    // only once the value exceeds the largest signed rank; bit-pattern
    // radixes may take the unsigned type of the same rank first.
    match (radix == 10, suffix.is_unsigned, suffix.long_count) {
        (true, false, 0) => &[Int, Long, LongLong, ULongLong],
        (true, false, 1) => &[Long, LongLong, ULongLong],
        (true, false, _) => &[LongLong, ULongLong],
        (false, false, 0) => &[Int, UInt, Long, ULong, LongLong, ULongLong],
        (false, false, 1) => &[Long, ULong, LongLong, ULongLong],
        (false, false, _) => &[LongLong, ULongLong],
        (_, true, 0) => &[UInt, ULong, ULongLong],
        (_, true, 1) => &[ULong, ULongLong],
        (_, true, _) => &[ULongLong],
    }
}

/// Parse an integer literal spelling (radix prefix, digits with
/// optional `'` separators, suffix) and pick the smallest type that
/// holds the value.
pub fn parse_int(text: &str) -> Result<IntLit, IntError> {
    let bytes = text.as_bytes();
    let (radix, digits_at) = if bytes.len() > 2 && (bytes.starts_with(b"0x") || bytes.starts_with(b"0X")) {
        (16, 2)
    } else if bytes.len() > 2 && (bytes.starts_with(b"0b") || bytes.starts_with(b"0B")) {
        (2, 2)
    } else if bytes.len() > 1 && bytes[0] == b'0' && bytes[1].is_ascii_digit() {
        (8, 1)
    } else {
        (10, 0)
    };

    let mut value: u64 = 0;
    let mut digit_count = 0usize;
    let mut i = digits_at;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\'' {
            i += 1;
            continue;
        }
        let Some(d) = (b as char).to_digit(radix) else {
            break;
        };
        value = value
            .checked_mul(u64::from(radix))
            .and_then(|v| v.checked_add(u64::from(d)))
            .ok_or(IntError::Overflow)?;
        digit_count += 1;
        i += 1;
    }
    if digit_count == 0 {
        return Err(IntError::NoDigits);
    }
    let suffix = parse_suffix(&text[i..])?;

    let ty = candidate_types(radix, &suffix)
        .iter()
        .copied()
        .find(|t| t.fits(value))
        .ok_or(IntError::Overflow)?;
    Ok(IntLit { value, ty })
}

//! Floating literal conversion: decimal text to an IEEE-754 bit
//! pattern, computed digit-by-digit rather than through a
//! string-to-float library routine.
//!
//! The fractional part is turned into a binary fraction by repeatedly
//! doubling the decimal fraction against its decimal denominator and
//! extracting one bit per doubling, until the target format's mantissa
//! budget is filled or the fraction terminates exactly. The combined
//! integer+fraction pattern is then normalized to find the exponent and
//! packed with the sign bit. Truncation, not round-to-nearest: the
//! result may sit one unit in the last place below the ideal value.

/// Target encodings. The extended format shares the 64-bit layout;
/// only the nominal type differs for downstream consumers.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FloatType {
    Float,
    Double,
    LongDouble,
}

struct FormatInfo {
    exponent_bits: u32,
    mantissa_bits: u32,
}

impl FloatType {
    fn info(self) -> FormatInfo {
        match self {
            FloatType::Float => FormatInfo {
                exponent_bits: 8,
                mantissa_bits: 23,
            },
            FloatType::Double | FloatType::LongDouble => FormatInfo {
                exponent_bits: 11,
                mantissa_bits: 52,
            },
        }
    }
}

/// A converted floating literal. For the 32-bit format only the low
/// 32 bits of `bits` are meaningful.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FloatLit {
    pub bits: u64,
    pub ty: FloatType,
}

impl FloatLit {
    pub fn value(self) -> f64 {
        match self.ty {
            FloatType::Float => f64::from(f32::from_bits(self.bits as u32)),
            FloatType::Double | FloatType::LongDouble => f64::from_bits(self.bits),
        }
    }
}

struct Parsed {
    negative: bool,
    /// All mantissa digits, integer then fractional, in order.
    digits: Vec<u8>,
    /// How many of `digits` sit left of the decimal point once the
    /// exponent has been folded in. May be negative or exceed the
    /// digit count.
    point: i64,
    ty: FloatType,
}

/// Grammar: `[+-] digits [. digits] [eE [+-] digits] [fFlL]`, with `'`
/// separators permitted between digits. Hex floats (`p` exponents) are
/// not accepted. Returns `None` on any violation, which the caller
/// surfaces as an invalid literal.
fn parse(text: &str) -> Option<Parsed> {
    let bytes = text.as_bytes();
    let mut i = 0;
    let negative = match bytes.first() {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };

    let mut digits = Vec::new();
    let mut int_len = 0i64;
    let mut seen_dot = false;
    let mut seen_digit = false;
    while i < bytes.len() {
        match bytes[i] {
            b @ b'0'..=b'9' => {
                digits.push(b - b'0');
                if !seen_dot {
                    int_len += 1;
                }
                seen_digit = true;
            }
            b'\'' => {}
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        i += 1;
    }
    if !seen_digit {
        return None;
    }

    let mut exp = 0i64;
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        let exp_negative = match bytes.get(i) {
            Some(b'-') => {
                i += 1;
                true
            }
            Some(b'+') => {
                i += 1;
                false
            }
            _ => false,
        };
        let mut exp_digits = 0;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            exp = (exp * 10 + i64::from(bytes[i] - b'0')).min(100_000);
            exp_digits += 1;
            i += 1;
        }
        if exp_digits == 0 {
            return None;
        }
        if exp_negative {
            exp = -exp;
        }
    }

    let ty = match &text[i..] {
        "" => FloatType::Double,
        "f" | "F" => FloatType::Float,
        "l" | "L" => FloatType::LongDouble,
        _ => return None,
    };
    Some(Parsed {
        negative,
        digits,
        point: int_len + exp,
        ty,
    })
}

// The decimal denominator must stay inside u128; 10^38 < 2^127. An
// integer part wider than this is unrepresentable to us and rejected.
const MAX_DECIMAL_DIGITS: i64 = 38;

// A fraction whose first one-bit lies beyond this many doublings is
// below the normal range of every supported format.
const MAX_DOUBLINGS: u64 = 1200;

/// Convert a floating literal spelling to its target bit pattern.
/// `None` means the spelling does not match the floating grammar or the
/// magnitude exceeds the converter's decimal-digit budget.
pub fn encode_float(text: &str) -> Option<FloatLit> {
    let parsed = parse(text)?;
    let info = parsed.ty.info();
    let ndigits = parsed.digits.len() as i64;
    let sign = u64::from(parsed.negative) << (info.exponent_bits + info.mantissa_bits);
    let zero = FloatLit {
        bits: sign,
        ty: parsed.ty,
    };
    if parsed.point > MAX_DECIMAL_DIGITS {
        return None;
    }

    // Integer part: digits left of the (exponent-adjusted) point,
    // zero-padded when the point lies past the last digit.
    let mut integer_part: u128 = 0;
    for idx in 0..parsed.point {
        let d = if idx < ndigits {
            parsed.digits[idx as usize]
        } else {
            0
        };
        integer_part = integer_part * 10 + u128::from(d);
    }

    // Fraction part as numerator over a power-of-ten denominator. A
    // point left of the first digit contributes leading zeros; digits
    // beyond the denominator budget cannot influence the mantissa bits
    // we keep and are dropped.
    let mut fraction_dec: u128 = 0;
    let mut denominator: u128 = 1;
    let mut taken = 0i64;
    let mut idx = parsed.point;
    while idx < ndigits && taken < MAX_DECIMAL_DIGITS {
        let d = if idx < 0 { 0 } else { parsed.digits[idx as usize] };
        fraction_dec = fraction_dec * 10 + u128::from(d);
        denominator *= 10;
        taken += 1;
        idx += 1;
    }

    // Extract binary fraction bits by doubling. When the integer part
    // is zero the budget starts counting at the first one-bit, so small
    // magnitudes keep their full mantissa precision.
    let mut fraction_bits: u128 = 0;
    let mut fraction_bitlen: u64 = 0;
    let mut counting = integer_part != 0;
    let mut counted: u32 = 0;
    while fraction_dec != 0 && counted < info.mantissa_bits && fraction_bitlen < MAX_DOUBLINGS {
        fraction_bitlen += 1;
        fraction_dec *= 2;
        let bit = fraction_dec / denominator;
        fraction_dec %= denominator;
        fraction_bits = (fraction_bits << 1) | bit;
        if bit == 1 {
            counting = true;
        }
        if counting {
            counted += 1;
        }
    }

    // Leading zero doublings contribute no set bits, so `fraction_bits`
    // always fits well inside 128 bits even when `fraction_bitlen`
    // exceeds it.
    let combined = if integer_part != 0 {
        let shifted = integer_part.checked_shl(fraction_bitlen as u32)?;
        if shifted >> fraction_bitlen != integer_part {
            return None;
        }
        shifted | fraction_bits
    } else {
        fraction_bits
    };
    if combined == 0 {
        return Some(zero);
    }

    // Normalize: the position of the highest one-bit relative to the
    // binary point is the unbiased exponent.
    let msb = 127 - i64::from(combined.leading_zeros());
    let exponent = msb - fraction_bitlen as i64;

    let bias = (1i64 << (info.exponent_bits - 1)) - 1;
    let biased = exponent + bias;
    let max_biased = (1i64 << info.exponent_bits) - 2;
    if biased > max_biased {
        // Overflows the format: encode infinity.
        let inf = ((1u64 << info.exponent_bits) - 1) << info.mantissa_bits;
        return Some(FloatLit {
            bits: sign | inf,
            ty: parsed.ty,
        });
    }
    if biased <= 0 {
        // Below the normal range: flush to zero (no denormals).
        return Some(zero);
    }

    // Strip the leading one, then widen or truncate to the format's
    // mantissa width.
    let mut mantissa = combined & ((1u128 << msb) - 1);
    let width = msb as u32;
    if width < info.mantissa_bits {
        mantissa <<= info.mantissa_bits - width;
    } else {
        mantissa >>= width - info.mantissa_bits;
    }

    let bits = sign | ((biased as u64) << info.mantissa_bits) | (mantissa as u64);
    Some(FloatLit {
        bits,
        ty: parsed.ty,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn bits(text: &str) -> u64 {
        encode_float(text).unwrap_or_else(|| panic!("{text} did not convert")).bits
    }

    fn value(text: &str) -> f64 {
        encode_float(text).unwrap().value()
    }

    #[test]
    fn documented_double_pattern() {
        assert_eq!(bits("12.375"), 0x4028_C000_0000_0000);
    }

    #[test]
    fn exact_binary_fractions() {
        assert_eq!(value("0.25"), 0.25);
        assert_eq!(value("0.375"), 0.375);
        assert_eq!(value("6"), 6.0);
        assert_eq!(value("0.0"), 0.0);
        assert_eq!(value("0"), 0.0);
    }

    #[test]
    fn inexact_fraction_stays_within_mantissa_budget() {
        assert!((value("0.1") - 0.1).abs() < 1e-16);
        assert!((value("0.333333") - 0.333333).abs() < 1e-16);
    }

    #[test]
    fn small_magnitudes_keep_full_precision() {
        // The budget starts at the first one-bit, so the leading zero
        // doublings of 1e-6 cost no mantissa precision.
        let got = value("0.000001");
        let ulp = (1e-6f64.to_bits() as i64 - got.to_bits() as i64).abs();
        assert!(ulp <= 1, "got {got}");
        assert_eq!(value("0.00390625"), 0.00390625);
    }

    #[test]
    fn narrow_format() {
        let lit = encode_float("12.375f").unwrap();
        assert_eq!(lit.ty, FloatType::Float);
        assert_eq!(lit.bits as u32, 0x4146_0000);
        assert_eq!(lit.value(), 12.375);
    }

    #[test]
    fn extended_format_shares_double_layout() {
        let lit = encode_float("1.5L").unwrap();
        assert_eq!(lit.ty, FloatType::LongDouble);
        assert_eq!(lit.bits, 1.5f64.to_bits());
    }

    #[test]
    fn decimal_exponents_shift_the_point() {
        assert_eq!(value("1.5e-3"), 0.0015);
        assert_eq!(value("1e10"), 1e10);
        assert_eq!(value("125e-3"), 0.125);
        assert_eq!(value(".5"), 0.5);
        assert_eq!(value("1E+2"), 100.0);
    }

    #[test]
    fn negative_sign_sets_the_sign_bit() {
        assert_eq!(value("-0.25"), -0.25);
        assert_eq!(bits("-0.0"), 1u64 << 63);
    }

    #[test]
    fn magnitude_limits() {
        // Past the decimal-digit budget the literal is rejected rather
        // than mis-encoded; below the normal range it flushes to zero.
        assert_eq!(encode_float("1e400"), None);
        assert_eq!(value("1e-400"), 0.0);
        assert_eq!(value("1e-320"), 0.0);
    }

    #[test]
    fn rejects_non_float_spellings() {
        assert_eq!(encode_float("abc"), None);
        assert_eq!(encode_float("12x"), None);
        assert_eq!(encode_float("1e"), None);
        assert_eq!(encode_float("0x1p3"), None);
        assert_eq!(encode_float(""), None);
        assert_eq!(encode_float("."), None);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Truncation instead of round-to-nearest means the result
            // may sit one unit in the last place below the reference
            // conversion, never more.
            #[test]
            fn close_to_reference_conversion(int in 0u32..1_000_000, frac in 0u32..1_000_000) {
                let text = format!("{int}.{frac:06}");
                let reference: f64 = text.parse().unwrap();
                let got = encode_float(&text).unwrap().value();
                let ulp = (reference.to_bits() as i64 - got.to_bits() as i64).abs();
                prop_assert!(ulp <= 1, "{text}: reference {reference}, got {got}");
            }

            #[test]
            fn never_panics(s in "[0-9eE'fFlL+.x-]{0,24}") {
                let _ = encode_float(&s);
            }
        }
    }
}

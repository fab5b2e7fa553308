//! Pure interpreters from stored byte strings to typed scalars.
//!
//! These never touch a document; they borrow a byte slice (anything a
//! [`Str`](crate::Str) dereferences to) and decide how the written form maps
//! onto the requested type. Out-of-range inputs are clamped rather than
//! rejected: the caller receives the clamped value through
//! [`Parsed::Clamped`] and can treat it as [`Error::ValueRange`] or use it
//! as-is.

use crate::error::Error;
use crate::section::SectionKind;

/// A successfully interpreted scalar, tagged with whether it had to be
/// clamped into the target type's range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Parsed<T> {
    Exact(T),
    Clamped(T),
}

impl<T> Parsed<T> {
    /// The interpreted value, clamped or not.
    pub fn value(self) -> T {
        match self {
            Parsed::Exact(v) | Parsed::Clamped(v) => v,
        }
    }

    pub fn is_clamped(&self) -> bool {
        matches!(self, Parsed::Clamped(_))
    }

    /// The value only if it was exact.
    pub fn exact(self) -> Option<T> {
        match self {
            Parsed::Exact(v) => Some(v),
            Parsed::Clamped(_) => None,
        }
    }

    /// Treats clamping as [`Error::ValueRange`].
    pub fn checked(self) -> Result<T, Error> {
        match self {
            Parsed::Exact(v) => Ok(v),
            Parsed::Clamped(_) => Err(Error::ValueRange),
        }
    }
}

/// A decoded section reference: the kind implied by the `{}`/`[]` prefix and
/// the referent name, borrowed as the literal bytes after the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference<'s> {
    pub kind: SectionKind,
    pub name: &'s [u8],
}

#[inline]
fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n')
}

fn skip_ws(mut s: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = s {
        if !is_space(*first) {
            break;
        }
        s = rest;
    }
    s
}

/// Interprets a strict boolean literal: exactly `true`, `True`, `TRUE`,
/// `false`, `False`, or `FALSE` — no surrounding whitespace, nothing else.
pub fn to_bool(s: &[u8]) -> Result<bool, Error> {
    match s {
        b"true" | b"True" | b"TRUE" => Ok(true),
        b"false" | b"False" | b"FALSE" => Ok(false),
        _ => Err(Error::ValueFormat),
    }
}

/// Interprets a section reference: optional leading whitespace, then exactly
/// `{}` or `[]`, then the referent name taken literally. A nameless
/// reference is legal syntax that can never resolve (names are non-empty).
pub fn to_ref(s: &[u8]) -> Result<Reference<'_>, Error> {
    match skip_ws(s) {
        [b'{', b'}', name @ ..] => Ok(Reference {
            kind: SectionKind::Table,
            name,
        }),
        [b'[', b']', name @ ..] => Ok(Reference {
            kind: SectionKind::Array,
            name,
        }),
        _ => Err(Error::ValueFormat),
    }
}

fn digit_val(byte: u8, base: u32) -> Option<u32> {
    let d = match byte {
        b'0'..=b'9' => u32::from(byte - b'0'),
        b'A'..=b'Z' => u32::from(byte - b'A') + 10,
        b'a'..=b'z' => u32::from(byte - b'a') + 10,
        _ => return None,
    };
    (d < base).then_some(d)
}

/// Greedy digit parse in `base`. Returns the accumulated magnitude
/// (saturated at `u64::MAX`), how many bytes were consumed, and whether the
/// accumulator overflowed.
fn parse_digits(base: u32, s: &[u8]) -> (u64, usize, bool) {
    let mut value: u64 = 0;
    let mut consumed = 0;
    let mut overflow = false;
    for &byte in s {
        let Some(d) = digit_val(byte, base) else {
            break;
        };
        consumed += 1;
        let (mul, o1) = value.overflowing_mul(u64::from(base));
        let (add, o2) = mul.overflowing_add(u64::from(d));
        if o1 || o2 || overflow {
            overflow = true;
            value = u64::MAX;
        } else {
            value = add;
        }
    }
    (value, consumed, overflow)
}

/// Detects a base prefix: `0x`/`0X`, `0o`/`0O`, `0b`/`0B`, optionally led by
/// `-` when `signed`. Returns `(negative, base, rest)`.
fn detect_prefix(s: &[u8], signed: bool) -> (bool, u32, &[u8]) {
    let base_of = |byte: u8| match byte {
        b'x' | b'X' => Some(16),
        b'o' | b'O' => Some(8),
        b'b' | b'B' => Some(2),
        _ => None,
    };
    if signed && s.len() >= 3 && s[0] == b'-' && s[1] == b'0' {
        if let Some(base) = base_of(s[2]) {
            return (true, base, &s[3..]);
        }
    }
    if s.len() >= 2 && s[0] == b'0' {
        if let Some(base) = base_of(s[1]) {
            return (false, base, &s[2..]);
        }
    }
    (false, 10, s)
}

/// Longest prefix of `s` forming a decimal float: optional sign, digits with
/// an optional fraction, an optional complete exponent, or an
/// `inf`/`infinity`/`nan` literal. Returns the prefix length, 0 if none.
fn scan_float(s: &[u8]) -> usize {
    let mut i = 0;
    if i < s.len() && (s[i] == b'+' || s[i] == b'-') {
        i += 1;
    }
    let rest = &s[i..];
    for lit in [b"infinity".as_slice(), b"inf".as_slice(), b"nan".as_slice()] {
        if rest.len() >= lit.len() && rest[..lit.len()].eq_ignore_ascii_case(lit) {
            return i + lit.len();
        }
    }
    let mant_start = i;
    while i < s.len() && s[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - mant_start;
    let mut frac_digits = 0;
    if i < s.len() && s[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < s.len() && s[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = i - frac_start;
    }
    if int_digits == 0 && frac_digits == 0 {
        return 0;
    }
    if i < s.len() && (s[i] == b'e' || s[i] == b'E') {
        let mut j = i + 1;
        if j < s.len() && (s[j] == b'+' || s[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < s.len() && s[j].is_ascii_digit() {
            j += 1;
        }
        // An exponent without digits is not part of the number.
        if j > exp_start {
            i = j;
        }
    }
    i
}

fn parse_float_text(s: &[u8]) -> Option<f64> {
    let text = std::str::from_utf8(s).ok()?;
    text.parse::<f64>().ok()
}

fn literal_nonfinite(s: &[u8]) -> bool {
    let t = match s {
        [b'+' | b'-', rest @ ..] => rest,
        _ => s,
    };
    t.eq_ignore_ascii_case(b"inf") || t.eq_ignore_ascii_case(b"infinity") || t.eq_ignore_ascii_case(b"nan")
}

fn i64_from_f64(d: f64) -> Parsed<i64> {
    // 2^63 and -2^63 are exactly representable; only -2^63 fits an i64.
    if d >= i64::MAX as f64 {
        return Parsed::Clamped(i64::MAX);
    }
    if d < i64::MIN as f64 {
        return Parsed::Clamped(i64::MIN);
    }
    let v = d as i64; // rounds toward zero
    if v as f64 == d {
        Parsed::Exact(v)
    } else {
        Parsed::Clamped(v)
    }
}

fn u64_from_f64(d: f64) -> Parsed<u64> {
    if d >= u64::MAX as f64 {
        return Parsed::Clamped(u64::MAX);
    }
    if d < 0.0 {
        return Parsed::Clamped(0);
    }
    let v = d as u64;
    if v as f64 == d {
        Parsed::Exact(v)
    } else {
        Parsed::Clamped(v)
    }
}

/// Interprets a signed 64-bit integer.
///
/// The base is chosen by the written prefix (`0x`, `0o`, `0b`, base 10
/// otherwise; a leading `-` may precede the prefix and is applied after the
/// digits). A base-10 number running into `.`, `e`, or `E` is re-read as a
/// decimal float and rounded toward zero, so `1e3` is the integer 1000 and
/// `1.5` is 1 with a clamp flag. Out-of-range values clamp to the type
/// bounds. No digits at all is `ValueFormat`.
pub fn to_i64(s: &[u8]) -> Result<Parsed<i64>, Error> {
    let t = skip_ws(s);
    if t.is_empty() {
        return Err(Error::ValueFormat);
    }
    let (negative, base, rest) = detect_prefix(t, true);
    if base != 10 {
        let (mag, consumed, overflow) = parse_digits(base, rest);
        if consumed == 0 {
            return Err(Error::ValueFormat);
        }
        return Ok(signed_from_magnitude(negative, mag, overflow));
    }
    let (negative, digits) = match t[0] {
        b'+' => (false, &t[1..]),
        b'-' => (true, &t[1..]),
        _ => (false, t),
    };
    let (mag, consumed, overflow) = parse_digits(10, digits);
    if consumed == 0 {
        return Err(Error::ValueFormat);
    }
    if let Some(b'.' | b'e' | b'E') = digits.get(consumed) {
        let float_len = scan_float(t);
        if float_len > 0 {
            if let Some(d) = parse_float_text(&t[..float_len]) {
                return Ok(i64_from_f64(d));
            }
        }
    }
    Ok(signed_from_magnitude(negative, mag, overflow))
}

fn signed_from_magnitude(negative: bool, mag: u64, overflow: bool) -> Parsed<i64> {
    const MIN_MAG: u64 = i64::MAX as u64 + 1;
    if negative {
        if overflow || mag > MIN_MAG {
            Parsed::Clamped(i64::MIN)
        } else {
            Parsed::Exact(0i64.wrapping_sub_unsigned(mag))
        }
    } else if overflow || mag > i64::MAX as u64 {
        Parsed::Clamped(i64::MAX)
    } else {
        Parsed::Exact(mag as i64)
    }
}

/// Interprets an unsigned 64-bit integer. Same shape as [`to_i64`], except
/// a `-` never joins a base prefix and a negative decimal clamps to 0.
pub fn to_u64(s: &[u8]) -> Result<Parsed<u64>, Error> {
    let t = skip_ws(s);
    if t.is_empty() {
        return Err(Error::ValueFormat);
    }
    let (_, base, rest) = detect_prefix(t, false);
    if base != 10 {
        let (mag, consumed, overflow) = parse_digits(base, rest);
        if consumed == 0 {
            return Err(Error::ValueFormat);
        }
        return Ok(if overflow {
            Parsed::Clamped(u64::MAX)
        } else {
            Parsed::Exact(mag)
        });
    }
    let (negative, digits) = match t[0] {
        b'+' => (false, &t[1..]),
        b'-' => (true, &t[1..]),
        _ => (false, t),
    };
    let (mag, consumed, overflow) = parse_digits(10, digits);
    if consumed == 0 {
        return Err(Error::ValueFormat);
    }
    if let Some(b'.' | b'e' | b'E') = digits.get(consumed) {
        let float_len = scan_float(t);
        if float_len > 0 {
            if let Some(d) = parse_float_text(&t[..float_len]) {
                return Ok(u64_from_f64(d));
            }
        }
    }
    Ok(if overflow {
        Parsed::Clamped(u64::MAX)
    } else if negative && mag > 0 {
        Parsed::Clamped(0)
    } else {
        Parsed::Exact(mag)
    })
}

macro_rules! narrow_signed {
    ($(#[$doc:meta])* $name:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(s: &[u8]) -> Result<Parsed<$ty>, Error> {
            let wide = to_i64(s)?;
            let v = wide.value();
            let narrowed = v.clamp(<$ty>::MIN as i64, <$ty>::MAX as i64) as $ty;
            if wide.is_clamped() || i64::from(narrowed) != v {
                Ok(Parsed::Clamped(narrowed))
            } else {
                Ok(Parsed::Exact(narrowed))
            }
        }
    };
}

macro_rules! narrow_unsigned {
    ($(#[$doc:meta])* $name:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(s: &[u8]) -> Result<Parsed<$ty>, Error> {
            let wide = to_u64(s)?;
            let v = wide.value();
            let narrowed = v.min(<$ty>::MAX as u64) as $ty;
            if wide.is_clamped() || u64::from(narrowed) != v {
                Ok(Parsed::Clamped(narrowed))
            } else {
                Ok(Parsed::Exact(narrowed))
            }
        }
    };
}

narrow_signed! {
    /// [`to_i64`] narrowed to `i8` with a clamping cast.
    to_i8, i8
}
narrow_signed! {
    /// [`to_i64`] narrowed to `i16` with a clamping cast.
    to_i16, i16
}
narrow_signed! {
    /// [`to_i64`] narrowed to `i32` with a clamping cast.
    to_i32, i32
}
narrow_unsigned! {
    /// [`to_u64`] narrowed to `u8` with a clamping cast.
    to_u8, u8
}
narrow_unsigned! {
    /// [`to_u64`] narrowed to `u16` with a clamping cast.
    to_u16, u16
}
narrow_unsigned! {
    /// [`to_u64`] narrowed to `u32` with a clamping cast.
    to_u32, u32
}

/// Interprets a 64-bit float.
///
/// A base prefix (`0x`/`0o`/`0b`, optionally negative) routes through the
/// integer parser and casts, which loses precision above 2^53. Decimal
/// overflow clamps to the infinities; underflow to zero is not an error;
/// `inf` and `nan` literals pass through exactly.
pub fn to_f64(s: &[u8]) -> Result<Parsed<f64>, Error> {
    let t = skip_ws(s);
    if t.is_empty() {
        return Err(Error::ValueFormat);
    }
    let (negative, base, rest) = detect_prefix(t, true);
    if base != 10 {
        let (mag, consumed, overflow) = parse_digits(base, rest);
        if consumed == 0 {
            return Err(Error::ValueFormat);
        }
        let value = if negative { -(mag as f64) } else { mag as f64 };
        return Ok(if overflow {
            Parsed::Clamped(value)
        } else {
            Parsed::Exact(value)
        });
    }
    let float_len = scan_float(t);
    if float_len == 0 {
        return Err(Error::ValueFormat);
    }
    let text = &t[..float_len];
    let Some(d) = parse_float_text(text) else {
        return Err(Error::ValueFormat);
    };
    if d.is_infinite() && !literal_nonfinite(text) {
        // Magnitude overflowed the type; the sign survives.
        return Ok(Parsed::Clamped(d));
    }
    Ok(Parsed::Exact(d))
}

/// Interprets a 32-bit float; see [`to_f64`]. Values beyond the `f32` range
/// clamp to the infinities.
pub fn to_f32(s: &[u8]) -> Result<Parsed<f32>, Error> {
    let wide = to_f64(s)?;
    let d = wide.value();
    let v = d as f32;
    if v.is_infinite() && d.is_finite() {
        return Ok(Parsed::Clamped(v));
    }
    if wide.is_clamped() {
        Ok(Parsed::Clamped(v))
    } else {
        Ok(Parsed::Exact(v))
    }
}

#[cfg(test)]
#[path = "./value_tests.rs"]
mod tests;

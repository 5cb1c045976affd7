// src/gps/codec.rs
//! Numeric codecs for NMEA term text
//!
//! All parsers here are lenient: they stop at the first byte that does not
//! fit the expected shape and never fail. Arithmetic wraps the way a 32-bit
//! microcontroller would, so garbage input produces garbage numbers rather
//! than panics.

/// Coordinate in NMEA `DDDMM.MMMM` form before the hemisphere is applied.
///
/// `billionths` is the fractional part of a degree scaled by 10^9, derived
/// from the minutes so that no floating point is needed while parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawDegrees {
    pub deg: u16,
    pub billionths: u32,
    pub negative: bool,
}

impl RawDegrees {
    /// Signed decimal degrees
    pub fn to_degrees(&self) -> f64 {
        let ret = self.deg as f64 + self.billionths as f64 / 1_000_000_000.0;
        if self.negative {
            -ret
        } else {
            ret
        }
    }
}

/// Parse a leading run of ASCII digits, returning the value and the number
/// of bytes consumed.
fn leading_digits(term: &[u8]) -> (u32, usize) {
    let mut value = 0u32;
    let mut used = 0;
    for &b in term {
        if !b.is_ascii_digit() {
            break;
        }
        value = value.wrapping_mul(10).wrapping_add((b - b'0') as u32);
        used += 1;
    }
    (value, used)
}

/// Parse a signed integer the way C's `atol` does: optional leading
/// whitespace, optional sign, then digits.
pub fn parse_integer(term: &[u8]) -> i32 {
    let mut rest = term;
    while let Some((&b, tail)) = rest.split_first() {
        if !b.is_ascii_whitespace() {
            break;
        }
        rest = tail;
    }

    let negative = match rest.first() {
        Some(b'-') => {
            rest = &rest[1..];
            true
        }
        Some(b'+') => {
            rest = &rest[1..];
            false
        }
        _ => false,
    };

    let (value, _) = leading_digits(rest);
    let value = value as i32;
    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}

/// Parse a (possibly negative) number with up to two decimal digits into a
/// fixed-point value scaled by 100. Extra decimal digits are truncated.
///
/// `"022.4"` gives `2240`, `"-1.25"` gives `-125`, `"3.999"` gives `399`.
pub fn parse_decimal(term: &[u8]) -> i32 {
    let negative = term.first() == Some(&b'-');
    let term = if negative { &term[1..] } else { term };

    let mut ret = parse_integer(term).wrapping_mul(100);

    let (_, used) = leading_digits(term);
    let frac = &term[used..];
    if frac.first() == Some(&b'.') {
        if let Some(&d1) = frac.get(1).filter(|b| b.is_ascii_digit()) {
            ret = ret.wrapping_add(10 * (d1 - b'0') as i32);
            if let Some(&d2) = frac.get(2).filter(|b| b.is_ascii_digit()) {
                ret = ret.wrapping_add((d2 - b'0') as i32);
            }
        }
    }

    if negative {
        ret.wrapping_neg()
    } else {
        ret
    }
}

/// Parse degrees in NMEA `DDDMM.MMMM` format.
///
/// The last two digits before the decimal point are whole minutes, anything
/// in front of them is whole degrees. Up to seven fractional digits of a
/// minute are kept. The hemisphere is not known yet, so `negative` is
/// always cleared.
pub fn parse_degrees(term: &[u8]) -> RawDegrees {
    let left_of_decimal = parse_integer(term) as u32;
    let minutes = left_of_decimal % 100;
    let mut multiplier = 10_000_000u32;
    let mut ten_millionths_of_minutes = minutes.wrapping_mul(multiplier);

    let (_, used) = leading_digits(term);
    let frac = &term[used..];
    if frac.first() == Some(&b'.') {
        for &b in frac[1..].iter().take_while(|b| b.is_ascii_digit()) {
            multiplier /= 10;
            ten_millionths_of_minutes =
                ten_millionths_of_minutes.wrapping_add((b - b'0') as u32 * multiplier);
        }
    }

    RawDegrees {
        deg: (left_of_decimal / 100) as u16,
        // ten-millionths of a minute -> billionths of a degree
        billionths: ten_millionths_of_minutes.wrapping_mul(5).wrapping_add(1) / 3,
        negative: false,
    }
}

fn hex_digit(b: u8) -> u8 {
    match b {
        b'A'..=b'F' => b - b'A' + 10,
        b'a'..=b'f' => b - b'a' + 10,
        _ => b.wrapping_sub(b'0'),
    }
}

/// Decode the two hex digits of a checksum term. Missing digits read as
/// NUL, which can never produce a matching checksum for a real sentence
/// in practice.
pub fn parse_hex_byte(term: &[u8]) -> u8 {
    let hi = hex_digit(term.first().copied().unwrap_or(0));
    let lo = hex_digit(term.get(1).copied().unwrap_or(0));
    hi.wrapping_mul(16).wrapping_add(lo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal(b"022.4"), 2240);
        assert_eq!(parse_decimal(b"084.4"), 8440);
        assert_eq!(parse_decimal(b"545.4"), 54540);
        assert_eq!(parse_decimal(b"0.9"), 90);
        assert_eq!(parse_decimal(b"123519"), 12351900);
        assert_eq!(parse_decimal(b"123519.25"), 12351925);
    }

    #[test]
    fn test_parse_decimal_negative_and_truncation() {
        assert_eq!(parse_decimal(b"-1.25"), -125);
        assert_eq!(parse_decimal(b"-0.5"), -50);
        assert_eq!(parse_decimal(b"3.999"), 399);
    }

    #[test]
    fn test_parse_decimal_lenient() {
        assert_eq!(parse_decimal(b""), 0);
        assert_eq!(parse_decimal(b"12x.5"), 1200);
        assert_eq!(parse_decimal(b"7."), 700);
        assert_eq!(parse_decimal(b"abc"), 0);
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer(b"08"), 8);
        assert_eq!(parse_integer(b"230394"), 230394);
        assert_eq!(parse_integer(b"  -42z"), -42);
        assert_eq!(parse_integer(b"+7"), 7);
        assert_eq!(parse_integer(b""), 0);
    }

    #[test]
    fn test_parse_degrees() {
        let lat = parse_degrees(b"4807.038");
        assert_eq!(lat.deg, 48);
        assert_eq!(lat.billionths, 117_300_000);
        assert!(!lat.negative);

        let lng = parse_degrees(b"01131.000");
        assert_eq!(lng.deg, 11);
        assert_eq!(lng.billionths, 516_666_667);
    }

    #[test]
    fn test_parse_degrees_precision() {
        // 12118.86023' -> 121 deg, 18.86023 min
        let lng = parse_degrees(b"12118.86023");
        assert_eq!(lng.deg, 121);
        let expected = 121.0 + 18.86023 / 60.0;
        assert!((lng.to_degrees() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_degree_text_round_trip() {
        // Encode known coordinates as DDMM.MMMMMMM and decode them again
        for &value in &[0.0f64, 1.5, 48.1173, 53.36133666, 89.9999999, 179.123456] {
            let deg = value.trunc();
            let minutes_text = format!("{:010.7}", (value - deg) * 60.0);
            let minutes: f64 = minutes_text.parse().unwrap();
            let text = format!("{:03}{}", deg as u32, minutes_text);
            let raw = parse_degrees(text.as_bytes());
            let decoded_minutes = (raw.to_degrees() - raw.deg as f64) * 60.0;
            assert_eq!(raw.deg as f64, deg, "{}", text);
            assert!(
                (decoded_minutes - minutes).abs() <= 1e-7,
                "{} decoded to {}",
                text,
                raw.to_degrees()
            );
        }
    }

    #[test]
    fn test_raw_degrees_sign() {
        let mut raw = parse_degrees(b"5321.6802");
        raw.negative = true;
        assert!(raw.to_degrees() < -53.0);
    }

    #[test]
    fn test_parse_hex_byte() {
        assert_eq!(parse_hex_byte(b"6A"), 0x6A);
        assert_eq!(parse_hex_byte(b"6a"), 0x6A);
        assert_eq!(parse_hex_byte(b"47"), 0x47);
        assert_eq!(parse_hex_byte(b"FF"), 0xFF);
    }
}

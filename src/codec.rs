//! Fixed-width integer codec.
//!
//! Every integer on the wire occupies exactly `width` bytes, most significant byte first.
//! Non-negative values are written as plain base-256 digits. Negative values are shifted
//! into the non-negative range by adding `2^(8*width-1)` and then get the sign bit set on
//! the leading byte:
//!
//! ```text
//! width = 2
//!    1234  ->  [0x04, 0xD2]          1234 = 4*256 + 210
//!      -1  ->  [0xFF, 0xFF]          -1 + 32768 = 0x7FFF, then 0x7F + 0x80
//!  -32768  ->  [0x80, 0x00]          -32768 + 32768 = 0x0000, then 0x00 + 0x80
//! ```
//!
//! The client firmware decodes exactly this layout, so the algorithm is kept as is rather
//! than delegating to `to_be_bytes`. Over the valid range the two happen to agree, which
//! the tests pin down.

use crate::constants::MAX_INT_WIDTH;
use crate::error::{Error, Result};

/// `2^(8*width-1)`, the size of each signed half of the range.
fn half_range(width: usize) -> i128 {
    1i128 << (8 * width - 1)
}

fn check_width(width: usize) -> Result<()> {
    if width == 0 || width > MAX_INT_WIDTH {
        return Err(Error::InvalidWidth {
            width,
            max: MAX_INT_WIDTH,
        });
    }
    Ok(())
}

/// Inclusive `(min, max)` of the values representable in `width` bytes.
pub fn bounds(width: usize) -> Result<(i64, i64)> {
    check_width(width)?;
    let half = half_range(width);
    // Both ends fit i64 for every width up to MAX_INT_WIDTH.
    Ok(((-half) as i64, (half - 1) as i64))
}

/// Checks that `value` survives encoding into `width` bytes.
pub fn check_range(value: i128, width: usize) -> Result<()> {
    check_width(width)?;
    let half = half_range(width);
    if value < -half || value >= half {
        return Err(Error::OutOfRange { value, width });
    }
    Ok(())
}

/// Writes `value` as base-256 digits into `out`, least significant digit last.
fn write_digits(out: &mut [u8], mut value: u64) {
    for byte in out.iter_mut().rev() {
        *byte = (value % 256) as u8;
        value /= 256;
    }
}

/// Encodes `value` into exactly `width` bytes.
pub fn encode_integer(value: i64, width: usize) -> Result<Vec<u8>> {
    check_range(i128::from(value), width)?;

    let mut out = vec![0u8; width];
    if value >= 0 {
        write_digits(&mut out, value as u64);
    } else {
        // In [0, 2^(8w-1)), so the leading byte stays below 0x80 until the sign bit is added.
        let offset = i128::from(value) + half_range(width);
        write_digits(&mut out, offset as u64);
        out[0] += 0x80;
    }
    Ok(out)
}

/// Encodes each value in order and concatenates the results.
///
/// The first value that does not fit aborts the call; no partial output is returned.
pub fn encode_sequence(values: &[i64], width: usize) -> Result<Vec<u8>> {
    check_width(width)?;
    let mut out = Vec::with_capacity(values.len() * width);
    for &value in values {
        out.extend_from_slice(&encode_integer(value, width)?);
    }
    Ok(out)
}

/// Inverse of [`encode_integer`]; the width is the slice length.
pub fn decode_integer(bytes: &[u8]) -> Result<i64> {
    let width = bytes.len();
    check_width(width)?;

    let negative = bytes[0] & 0x80 != 0;
    let magnitude = bytes[1..]
        .iter()
        .fold(u64::from(bytes[0] & 0x7F), |acc, &b| (acc << 8) | u64::from(b));

    if negative {
        Ok((i128::from(magnitude) - half_range(width)) as i64)
    } else {
        Ok(magnitude as i64)
    }
}

/// Splits `bytes` into `width`-sized chunks and decodes each one.
pub fn decode_sequence(bytes: &[u8], width: usize) -> Result<Vec<i64>> {
    check_width(width)?;
    if bytes.len() % width != 0 {
        return Err(Error::InvalidLength {
            width,
            actual: bytes.len(),
        });
    }
    bytes.chunks_exact(width).map(decode_integer).collect()
}

/// Converts a floating point value to an integer without truncation.
///
/// Fractional and non-finite values are rejected rather than rounded.
pub fn integral(value: f64) -> Result<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(Error::NotIntegral(value.to_string()));
    }
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    if value < i64::MIN as f64 || value >= i64::MAX as f64 {
        return Err(Error::OutOfRange {
            value: value as i128,
            width: MAX_INT_WIDTH,
        });
    }
    Ok(value as i64)
}

/// Parses a textual parameter such as a command line argument.
///
/// `"12"` and `"1e3"` are accepted, `"12.5"` is a [`Error::NotIntegral`].
pub fn parse_integer(text: &str) -> Result<i64> {
    let text = text.trim();
    if let Ok(value) = text.parse::<i64>() {
        return Ok(value);
    }
    match text.parse::<f64>() {
        Ok(value) => integral(value),
        Err(_) => Err(Error::NotIntegral(text.to_string())),
    }
}

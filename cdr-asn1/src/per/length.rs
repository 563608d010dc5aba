//! PER length determinants
//!
//! A length with a known size range of at most 65536 values is a constrained
//! whole number. Every other length uses the general, octet-aligned form:
//!
//! ```text
//! 0xxxxxxx             0 ..= 127
//! 10xxxxxx xxxxxxxx    0 ..= 16383
//! 11000nnn             fragment of n * 16384 items (n = 1..=4), more follows
//! ```

use super::constrained::{read_constrained_raw, write_constrained_raw, MAX_PACKED_RANGE};
use super::cursor::{BitCursor, BitWriter};
use cdr_core::{CdrError, CdrResult};

/// Number of items in one fragment unit
pub const FRAGMENT_UNIT: u64 = 16384;

/// Largest number of fragment units in one length determinant
pub const MAX_FRAGMENT_UNITS: u64 = 4;

/// Decoded length determinant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Length {
    /// Number of items covered by this determinant
    pub value: u64,
    /// Another determinant follows the items
    pub repeat: bool,
}

fn packed_range(size_range: Option<u128>) -> Option<u128> {
    size_range.filter(|&range| range > 0 && range <= MAX_PACKED_RANGE)
}

/// Read one length determinant
///
/// # Arguments
/// * `size_range` - `ub - lb + 1` of the size constraint, if bounded
///
/// The returned value of a constrained length is the raw offset from `lb`.
pub fn decode_length(cursor: &mut BitCursor<'_>, size_range: Option<u128>) -> CdrResult<Length> {
    if let Some(range) = packed_range(size_range) {
        let value = read_constrained_raw(cursor, range)?;
        if value as u128 >= range {
            return Err(CdrError::InvalidLengthEncoding(format!(
                "length offset {} outside a range of {} values",
                value, range
            )));
        }
        return Ok(Length { value, repeat: false });
    }

    cursor.align()?;
    let first = cursor.read_bits(8)?;
    let length = if first & 0x80 == 0 {
        Length {
            value: first & 0x7F,
            repeat: false,
        }
    } else if first & 0x40 == 0 {
        let second = cursor.read_bits(8)?;
        Length {
            value: ((first & 0x3F) << 8) | second,
            repeat: false,
        }
    } else {
        let units = first & 0x3F;
        if !(1..=MAX_FRAGMENT_UNITS).contains(&units) {
            return Err(CdrError::InvalidLengthEncoding(format!(
                "fragment length octet 0x{:02x}",
                first
            )));
        }
        Length {
            value: FRAGMENT_UNIT * units,
            repeat: true,
        }
    };
    log::trace!("length determinant {:?}", length);
    Ok(length)
}

/// Write the length determinant for the next `remaining` items
///
/// Returns how many items the determinant covers. When `repeat` is set the
/// caller writes that many items and calls again for the rest; a final
/// determinant (possibly zero) always ends the sequence.
pub fn encode_length(
    writer: &mut BitWriter,
    size_range: Option<u128>,
    remaining: u64,
) -> CdrResult<Length> {
    if let Some(range) = packed_range(size_range) {
        write_constrained_raw(writer, range, remaining)?;
        return Ok(Length {
            value: remaining,
            repeat: false,
        });
    }

    writer.align();
    let length = if remaining < 128 {
        writer.write_bits(8, remaining);
        Length {
            value: remaining,
            repeat: false,
        }
    } else if remaining < FRAGMENT_UNIT {
        writer.write_bits(16, 0x8000 | remaining);
        Length {
            value: remaining,
            repeat: false,
        }
    } else {
        let units = (remaining / FRAGMENT_UNIT).min(MAX_FRAGMENT_UNITS);
        writer.write_bits(8, 0xC0 | units);
        Length {
            value: units * FRAGMENT_UNIT,
            repeat: true,
        }
    };
    Ok(length)
}

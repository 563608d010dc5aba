//! Constrained whole numbers
//!
//! A value inside `[lb, ub]` is sent as the offset `value - lb`. The number
//! of bits depends only on the range `ub - lb + 1`:
//!
//! | range          | encoding                       |
//! |----------------|--------------------------------|
//! | 1              | nothing                        |
//! | 2 ..= 255      | minimum bits, unaligned        |
//! | 256            | one octet, aligned             |
//! | 257 ..= 65536  | two octets, aligned            |
//! | above          | `RangeTooLarge`                |

use super::cursor::{BitCursor, BitWriter};
use crate::schema::Constraint;
use cdr_core::{CdrError, CdrResult};

/// Largest range packed directly into bits or octets
pub const MAX_PACKED_RANGE: u128 = 65536;

/// Smallest `b` with `2^b >= range`
pub fn bits_for_range(range: u128) -> u32 {
    if range <= 1 {
        0
    } else {
        128 - (range - 1).leading_zeros()
    }
}

/// Read the raw offset of a value in a range of `range` values
///
/// The offset is not checked against the range; callers decide which
/// error an out-of-range offset maps to.
pub fn read_constrained_raw(cursor: &mut BitCursor<'_>, range: u128) -> CdrResult<u64> {
    log::trace!("reading constrained value with range {}", range);
    if range <= 1 {
        Ok(0)
    } else if range <= 255 {
        cursor.read_bits(bits_for_range(range))
    } else if range == 256 {
        cursor.align()?;
        cursor.read_bits(8)
    } else if range <= MAX_PACKED_RANGE {
        cursor.align()?;
        cursor.read_bits(16)
    } else {
        Err(CdrError::RangeTooLarge(range))
    }
}

/// Write the raw offset of a value in a range of `range` values
pub fn write_constrained_raw(writer: &mut BitWriter, range: u128, raw: u64) -> CdrResult<()> {
    if raw as u128 >= range.max(1) {
        return Err(CdrError::ValueOutOfRange(format!(
            "offset {} outside a range of {} values",
            raw, range
        )));
    }
    if range <= 1 {
        Ok(())
    } else if range <= 255 {
        writer.write_bits(bits_for_range(range), raw);
        Ok(())
    } else if range == 256 {
        writer.align();
        writer.write_bits(8, raw);
        Ok(())
    } else if range <= MAX_PACKED_RANGE {
        writer.align();
        writer.write_bits(16, raw);
        Ok(())
    } else {
        Err(CdrError::RangeTooLarge(range))
    }
}

/// Decode a value of `[lb, ub]`
pub fn decode_constrained_whole(cursor: &mut BitCursor<'_>, lb: i64, ub: i64) -> CdrResult<i64> {
    let constraint = Constraint::range(lb, ub);
    let range = constraint.span().ok_or_else(|| {
        CdrError::UnexportedOrMalformedSchema(format!("empty constraint {}", constraint))
    })?;
    let raw = read_constrained_raw(cursor, range)?;
    if raw as u128 >= range {
        return Err(CdrError::ValueOutOfRange(format!(
            "decoded offset {} outside {}",
            raw, constraint
        )));
    }
    Ok((lb as i128 + raw as i128) as i64)
}

/// Encode a value of `[lb, ub]`
pub fn encode_constrained_whole(writer: &mut BitWriter, lb: i64, ub: i64, value: i64) -> CdrResult<()> {
    let constraint = Constraint::range(lb, ub);
    let range = constraint.span().ok_or_else(|| {
        CdrError::UnexportedOrMalformedSchema(format!("empty constraint {}", constraint))
    })?;
    constraint.check("value", value as i128)?;
    write_constrained_raw(writer, range, (value as i128 - lb as i128) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_for_range() {
        assert_eq!(bits_for_range(1), 0);
        assert_eq!(bits_for_range(2), 1);
        assert_eq!(bits_for_range(3), 2);
        assert_eq!(bits_for_range(128), 7);
        assert_eq!(bits_for_range(129), 8);
        assert_eq!(bits_for_range(255), 8);
    }

    #[test]
    fn test_range_128_uses_seven_bits() {
        let mut writer = BitWriter::new();
        encode_constrained_whole(&mut writer, 0, 127, 127).unwrap();
        assert_eq!(writer.bit_len(), 7);
        assert_eq!(writer.into_bytes(), vec![0xFE]);
    }

    #[test]
    fn test_range_256_is_aligned_octet() {
        let mut writer = BitWriter::new();
        writer.write_bit(true);
        encode_constrained_whole(&mut writer, 0, 255, 0xAB).unwrap();
        assert_eq!(writer.into_bytes(), vec![0x80, 0xAB]);

        let data = [0x80, 0xAB];
        let mut cursor = BitCursor::new(&data);
        assert!(cursor.read_bit().unwrap());
        assert_eq!(decode_constrained_whole(&mut cursor, 0, 255).unwrap(), 0xAB);
    }

    #[test]
    fn test_two_octet_range_with_offset() {
        let mut writer = BitWriter::new();
        encode_constrained_whole(&mut writer, -1000, 1000, 0).unwrap();
        let bytes = writer.into_bytes();
        assert_eq!(bytes, vec![0x03, 0xE8]);
        let mut cursor = BitCursor::new(&bytes);
        assert_eq!(decode_constrained_whole(&mut cursor, -1000, 1000).unwrap(), 0);
    }

    #[test]
    fn test_range_too_large() {
        let data = [0u8; 8];
        let mut cursor = BitCursor::new(&data);
        assert!(matches!(
            read_constrained_raw(&mut cursor, 65537),
            Err(CdrError::RangeTooLarge(65537))
        ));
    }

    #[test]
    fn test_out_of_range() {
        let mut writer = BitWriter::new();
        assert!(matches!(
            encode_constrained_whole(&mut writer, 1, 10, 11),
            Err(CdrError::ValueOutOfRange(_))
        ));

        // 3 bits can carry 7 but the range [0, 4] stops at 4
        let data = [0b1110_0000];
        let mut cursor = BitCursor::new(&data);
        assert!(matches!(
            decode_constrained_whole(&mut cursor, 0, 4),
            Err(CdrError::ValueOutOfRange(_))
        ));
    }
}

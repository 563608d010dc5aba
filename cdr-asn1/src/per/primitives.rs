//! PER encodings of the primitive types

use super::constrained::{
    bits_for_range, decode_constrained_whole, encode_constrained_whole, read_constrained_raw,
    write_constrained_raw, MAX_PACKED_RANGE,
};
use super::cursor::{BitCursor, BitWriter};
use super::length::{decode_length, encode_length};
use crate::integer::{signed_from_octets, signed_octets, unsigned_from_octets, unsigned_octets};
use crate::schema::Constraint;
use cdr_core::{BitString, CdrError, CdrResult};

/// Largest fixed size sent without a length determinant
const MAX_FIXED_SIZE: i64 = 65535;

/// Fixed sizes up to this many bits are not octet aligned
const UNALIGNED_FIXED_BITS: usize = 16;

pub fn decode_boolean(cursor: &mut BitCursor<'_>) -> CdrResult<bool> {
    let value = cursor.read_bit()?;
    log::trace!("decoded BOOLEAN {}", value);
    Ok(value)
}

pub fn encode_boolean(writer: &mut BitWriter, value: bool) {
    writer.write_bit(value);
}

fn read_length_octet(cursor: &mut BitCursor<'_>) -> CdrResult<usize> {
    let octets = cursor.read_octets(1)?[0] as usize;
    if octets == 0 || octets > 8 {
        return Err(CdrError::InvalidLengthEncoding(format!(
            "integer of {} octets",
            octets
        )));
    }
    Ok(octets)
}

fn decode_unconstrained_integer(cursor: &mut BitCursor<'_>) -> CdrResult<i64> {
    let octets = read_length_octet(cursor)?;
    signed_from_octets(cursor.read_octets(octets)?)
}

fn encode_unconstrained_integer(writer: &mut BitWriter, value: i64) {
    let octets = signed_octets(value);
    writer.align();
    writer.write_bits(8, octets.len() as u64);
    writer.write_bytes(&octets);
}

fn offset_value(lb: i64, raw: u64) -> CdrResult<i64> {
    i64::try_from(lb as i128 + raw as i128)
        .map_err(|_| CdrError::ValueOutOfRange(format!("{} + {} overflows INTEGER", lb, raw)))
}

/// Octets needed for any offset of the range
fn range_octets(range: u128) -> u128 {
    let mut octets = 1;
    let mut rest = (range - 1) >> 8;
    while rest > 0 {
        octets += 1;
        rest >>= 8;
    }
    octets
}

/// Decode an INTEGER with the given value constraint
pub fn decode_integer(cursor: &mut BitCursor<'_>, constraint: &Constraint) -> CdrResult<i64> {
    if constraint.extensible && cursor.read_bit()? {
        log::trace!("decoding INTEGER outside its extensible root");
        return decode_unconstrained_integer(cursor);
    }

    let value = match (constraint.lower, constraint.upper) {
        (Some(lb), Some(ub)) => {
            let range = constraint.span().ok_or_else(|| {
                CdrError::UnexportedOrMalformedSchema(format!("empty constraint {}", constraint))
            })?;
            if range == 1 {
                lb
            } else if range <= MAX_PACKED_RANGE {
                decode_constrained_whole(cursor, lb, ub)?
            } else {
                let length_bits = bits_for_range(range_octets(range)).max(1);
                let octets = cursor.read_bits(length_bits)? as usize + 1;
                let raw = unsigned_from_octets(cursor.read_octets(octets)?)?;
                if raw as u128 >= range {
                    return Err(CdrError::ValueOutOfRange(format!(
                        "decoded offset {} outside {}",
                        raw, constraint
                    )));
                }
                offset_value(lb, raw)?
            }
        }
        (Some(lb), None) => {
            let octets = read_length_octet(cursor)?;
            let raw = unsigned_from_octets(cursor.read_octets(octets)?)?;
            offset_value(lb, raw)?
        }
        (None, _) => decode_unconstrained_integer(cursor)?,
    };
    // a root value that only has an upper bound is sent unconstrained
    if !constraint.contains(value as i128) {
        return Err(CdrError::ValueOutOfRange(format!(
            "decoded INTEGER {} outside {}",
            value, constraint
        )));
    }
    log::trace!("decoded INTEGER {} with constraint {}", value, constraint);
    Ok(value)
}

/// Encode an INTEGER with the given value constraint
pub fn encode_integer(writer: &mut BitWriter, constraint: &Constraint, value: i64) -> CdrResult<()> {
    if constraint.extensible {
        let in_root = constraint.contains(value as i128);
        writer.write_bit(!in_root);
        if !in_root {
            encode_unconstrained_integer(writer, value);
            return Ok(());
        }
    }
    constraint.check("INTEGER", value as i128)?;

    match (constraint.lower, constraint.upper) {
        (Some(lb), Some(ub)) => {
            let range = constraint.span().ok_or_else(|| {
                CdrError::UnexportedOrMalformedSchema(format!("empty constraint {}", constraint))
            })?;
            if range == 1 {
                return Ok(());
            }
            if range <= MAX_PACKED_RANGE {
                return encode_constrained_whole(writer, lb, ub, value);
            }
            let length_bits = bits_for_range(range_octets(range)).max(1);
            let octets = unsigned_octets((value as i128 - lb as i128) as u64);
            writer.write_bits(length_bits, octets.len() as u64 - 1);
            writer.align();
            writer.write_bytes(&octets);
        }
        (Some(lb), None) => {
            let octets = unsigned_octets((value as i128 - lb as i128) as u64);
            writer.align();
            writer.write_bits(8, octets.len() as u64);
            writer.write_bytes(&octets);
        }
        (None, _) => encode_unconstrained_integer(writer, value),
    }
    Ok(())
}

/// Bounds of an ENUMERATED root; both must be known and `0 <= lb <= ub`
fn enumerated_bounds(constraint: &Constraint) -> CdrResult<(i64, i64)> {
    match (constraint.lower, constraint.upper) {
        (Some(lb), Some(ub)) if lb >= 0 && lb <= ub => Ok((lb, ub)),
        _ => Err(CdrError::UnexportedOrMalformedSchema(format!(
            "ENUMERATED constraint {} needs 0 <= lb <= ub",
            constraint
        ))),
    }
}

/// Decode a normally small non-negative whole number
pub fn decode_normally_small(cursor: &mut BitCursor<'_>) -> CdrResult<u64> {
    if !cursor.read_bit()? {
        return cursor.read_bits(6);
    }
    let length = decode_length(cursor, None)?;
    if length.repeat || length.value == 0 || length.value > 8 {
        return Err(CdrError::InvalidLengthEncoding(format!(
            "normally small number of {} octets",
            length.value
        )));
    }
    unsigned_from_octets(cursor.read_octets(length.value as usize)?)
}

/// Encode a normally small non-negative whole number
pub fn encode_normally_small(writer: &mut BitWriter, value: u64) -> CdrResult<()> {
    if value < 64 {
        writer.write_bit(false);
        writer.write_bits(6, value);
        return Ok(());
    }
    writer.write_bit(true);
    let octets = unsigned_octets(value);
    encode_length(writer, None, octets.len() as u64)?;
    writer.write_bytes(&octets);
    Ok(())
}

/// Decode an ENUMERATED with the root `[lb, ub]`
pub fn decode_enumerated(cursor: &mut BitCursor<'_>, constraint: &Constraint) -> CdrResult<u64> {
    let (lb, ub) = enumerated_bounds(constraint)?;
    let value = if constraint.extensible && cursor.read_bit()? {
        let extension = decode_normally_small(cursor)?;
        (ub as u64)
            .checked_add(1)
            .and_then(|first| first.checked_add(extension))
            .ok_or_else(|| CdrError::ValueOutOfRange(format!("extension value {}", extension)))?
    } else {
        decode_constrained_whole(cursor, lb, ub)? as u64
    };
    log::trace!("decoded ENUMERATED {}", value);
    Ok(value)
}

/// Encode an ENUMERATED with the root `[lb, ub]`
pub fn encode_enumerated(writer: &mut BitWriter, constraint: &Constraint, value: u64) -> CdrResult<()> {
    let (lb, ub) = enumerated_bounds(constraint)?;
    let in_root = value >= lb as u64 && value <= ub as u64;
    if constraint.extensible {
        writer.write_bit(!in_root);
        if !in_root {
            if value < lb as u64 {
                return Err(CdrError::ValueOutOfRange(format!(
                    "ENUMERATED {} below {}",
                    value, constraint
                )));
            }
            return encode_normally_small(writer, value - ub as u64 - 1);
        }
    } else if !in_root {
        return Err(CdrError::ValueOutOfRange(format!(
            "ENUMERATED {} outside {}",
            value, constraint
        )));
    }
    encode_constrained_whole(writer, lb, ub, value as i64)
}

/// Size bounds in effect after the extension bit has been handled
struct SizeBounds {
    lb: i64,
    ub: Option<i64>,
}

impl SizeBounds {
    fn root(constraint: &Constraint) -> Self {
        Self {
            lb: constraint.lower.unwrap_or(0).max(0),
            ub: constraint.upper,
        }
    }

    fn unconstrained() -> Self {
        Self { lb: 0, ub: None }
    }

    fn fixed(&self) -> Option<usize> {
        match self.ub {
            Some(ub) if ub == self.lb && ub <= MAX_FIXED_SIZE => Some(ub as usize),
            _ => None,
        }
    }

    /// Range of the packed length determinant; `None` selects the general form
    fn range(&self) -> Option<u128> {
        match self.ub {
            Some(ub) if ub >= self.lb && ub <= MAX_FIXED_SIZE => {
                Some((ub - self.lb) as u128 + 1)
            }
            _ => None,
        }
    }
}

fn decode_size_bounds(cursor: &mut BitCursor<'_>, constraint: &Constraint) -> CdrResult<SizeBounds> {
    if constraint.extensible && cursor.read_bit()? {
        return Ok(SizeBounds::unconstrained());
    }
    Ok(SizeBounds::root(constraint))
}

fn encode_size_bounds(writer: &mut BitWriter, constraint: &Constraint, size: usize) -> CdrResult<SizeBounds> {
    let in_root = constraint.contains(size as i128);
    if constraint.extensible {
        writer.write_bit(!in_root);
        if !in_root {
            return Ok(SizeBounds::unconstrained());
        }
    } else if !in_root {
        return Err(CdrError::ValueOutOfRange(format!(
            "size {} outside {}",
            size, constraint
        )));
    }
    Ok(SizeBounds::root(constraint))
}

/// Read the item counts of a length-prefixed block, calling `read` per fragment
///
/// Shared by strings and SEQUENCE OF: a packed length carries the offset
/// from `lb`, the general form carries the count itself.
fn for_each_fragment<F>(
    cursor: &mut BitCursor<'_>,
    bounds_lb: i64,
    range: Option<u128>,
    mut read: F,
) -> CdrResult<()>
where
    F: FnMut(&mut BitCursor<'_>, u64) -> CdrResult<()>,
{
    loop {
        let length = decode_length(cursor, range)?;
        let count = if range.is_some() {
            length.value + bounds_lb as u64
        } else {
            length.value
        };
        read(cursor, count)?;
        if !length.repeat {
            return Ok(());
        }
    }
}

/// Write a length-prefixed block of `total` items, calling `write` per fragment
fn write_fragments<F>(
    writer: &mut BitWriter,
    bounds_lb: i64,
    range: Option<u128>,
    total: u64,
    mut write: F,
) -> CdrResult<()>
where
    F: FnMut(&mut BitWriter, u64, u64) -> CdrResult<()>,
{
    if range.is_some() {
        encode_length(writer, range, total - bounds_lb as u64)?;
        return write(writer, 0, total);
    }
    let mut offset = 0;
    loop {
        let length = encode_length(writer, None, total - offset)?;
        write(writer, offset, length.value)?;
        offset += length.value;
        if !length.repeat {
            return Ok(());
        }
    }
}

/// Decode a BIT STRING with the given size constraint
pub fn decode_bit_string(cursor: &mut BitCursor<'_>, constraint: &Constraint) -> CdrResult<BitString> {
    let bounds = decode_size_bounds(cursor, constraint)?;

    if let Some(size) = bounds.fixed() {
        if size > UNALIGNED_FIXED_BITS {
            cursor.align()?;
        }
        let bits = cursor.read_bit_string(size)?;
        log::trace!("decoded fixed BIT STRING of {} bits", size);
        return BitString::new(bits, size);
    }

    let mut value = BitString::empty();
    for_each_fragment(cursor, bounds.lb, bounds.range(), |cursor, count| {
        if count > 0 {
            cursor.align()?;
            let bits = cursor.read_bit_string(count as usize)?;
            value.extend(&BitString::new(bits, count as usize)?);
        }
        Ok(())
    })?;
    log::trace!("decoded BIT STRING of {} bits", value.num_bits());
    Ok(value)
}

/// Encode a BIT STRING with the given size constraint
pub fn encode_bit_string(writer: &mut BitWriter, constraint: &Constraint, value: &BitString) -> CdrResult<()> {
    let bounds = encode_size_bounds(writer, constraint, value.num_bits())?;

    if let Some(size) = bounds.fixed() {
        if size > UNALIGNED_FIXED_BITS {
            writer.align();
        }
        writer.write_bit_string(value.as_bytes(), size);
        return Ok(());
    }

    let bytes = value.as_bytes();
    write_fragments(
        writer,
        bounds.lb,
        bounds.range(),
        value.num_bits() as u64,
        |writer, offset, count| {
            if count > 0 {
                writer.align();
                let start = (offset / 8) as usize;
                writer.write_bit_string(&bytes[start..], count as usize);
            }
            Ok(())
        },
    )
}

/// Decode an OCTET STRING with the given size constraint
pub fn decode_octet_string(cursor: &mut BitCursor<'_>, constraint: &Constraint) -> CdrResult<Vec<u8>> {
    let bounds = decode_size_bounds(cursor, constraint)?;

    if let Some(size) = bounds.fixed() {
        let octets = if size * 8 > UNALIGNED_FIXED_BITS {
            cursor.read_octets(size)?.to_vec()
        } else {
            cursor.read_bit_string(size * 8)?
        };
        log::trace!("decoded fixed OCTET STRING {:02x?}", octets);
        return Ok(octets);
    }

    let mut value = Vec::new();
    for_each_fragment(cursor, bounds.lb, bounds.range(), |cursor, count| {
        if count > 0 {
            value.extend_from_slice(cursor.read_octets(count as usize)?);
        }
        Ok(())
    })?;
    log::trace!("decoded OCTET STRING {:02x?}", value);
    Ok(value)
}

/// Encode an OCTET STRING with the given size constraint
pub fn encode_octet_string(writer: &mut BitWriter, constraint: &Constraint, value: &[u8]) -> CdrResult<()> {
    let bounds = encode_size_bounds(writer, constraint, value.len())?;

    if let Some(size) = bounds.fixed() {
        if size * 8 > UNALIGNED_FIXED_BITS {
            writer.align();
        }
        writer.write_bytes(value);
        return Ok(());
    }

    write_fragments(
        writer,
        bounds.lb,
        bounds.range(),
        value.len() as u64,
        |writer, offset, count| {
            if count > 0 {
                writer.align();
                writer.write_bytes(&value[offset as usize..(offset + count) as usize]);
            }
            Ok(())
        },
    )
}

/// Decode a character string; the size constraint counts octets
pub fn decode_char_string(cursor: &mut BitCursor<'_>, constraint: &Constraint) -> CdrResult<String> {
    let octets = decode_octet_string(cursor, constraint)?;
    String::from_utf8(octets)
        .map_err(|err| CdrError::InvalidData(format!("character string is not UTF-8: {}", err)))
}

pub fn encode_char_string(writer: &mut BitWriter, constraint: &Constraint, value: &str) -> CdrResult<()> {
    encode_octet_string(writer, constraint, value.as_bytes())
}

/// Size bounds of a SEQUENCE OF after its extension bit
pub(crate) fn decode_count_bounds(
    cursor: &mut BitCursor<'_>,
    constraint: &Constraint,
) -> CdrResult<(i64, Option<usize>, Option<u128>)> {
    let bounds = decode_size_bounds(cursor, constraint)?;
    Ok((bounds.lb, bounds.fixed(), bounds.range()))
}

pub(crate) fn encode_count_bounds(
    writer: &mut BitWriter,
    constraint: &Constraint,
    count: usize,
) -> CdrResult<(i64, Option<usize>, Option<u128>)> {
    let bounds = encode_size_bounds(writer, constraint, count)?;
    Ok((bounds.lb, bounds.fixed(), bounds.range()))
}

/// Read the index of a CHOICE with `alternatives` alternatives
///
/// Returns the 1-based index.
pub fn decode_choice_index(
    cursor: &mut BitCursor<'_>,
    constraint: &Constraint,
    alternatives: usize,
) -> CdrResult<usize> {
    if constraint.extensible && cursor.read_bit()? {
        return Err(CdrError::UnsupportedType(
            "CHOICE alternative outside the extension root".to_string(),
        ));
    }
    let ub = choice_upper(constraint, alternatives)?;
    let raw = read_constrained_raw(cursor, ub as u128 + 1)?;
    let index = raw.saturating_add(1);
    if index as usize > alternatives || raw > ub as u64 {
        return Err(CdrError::InvalidChoiceIndex {
            index,
            alternatives,
        });
    }
    log::trace!("decoded CHOICE index {}", index);
    Ok(index as usize)
}

/// Write the 1-based index of a CHOICE alternative
pub fn encode_choice_index(
    writer: &mut BitWriter,
    constraint: &Constraint,
    alternatives: usize,
    index: usize,
) -> CdrResult<()> {
    let ub = choice_upper(constraint, alternatives)?;
    if index == 0 || index > alternatives || index as u64 - 1 > ub as u64 {
        return Err(CdrError::InvalidChoiceIndex {
            index: index as u64,
            alternatives,
        });
    }
    if constraint.extensible {
        writer.write_bit(false);
    }
    write_constrained_raw(writer, ub as u128 + 1, index as u64 - 1)
}

fn choice_upper(constraint: &Constraint, alternatives: usize) -> CdrResult<i64> {
    let ub = constraint
        .upper
        .unwrap_or(alternatives as i64 - 1);
    if ub < 0 {
        return Err(CdrError::UnexportedOrMalformedSchema(
            "CHOICE without alternatives".to_string(),
        ));
    }
    Ok(ub)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<F: FnOnce(&mut BitWriter) -> CdrResult<()>>(f: F) -> Vec<u8> {
        let mut writer = BitWriter::new();
        f(&mut writer).unwrap();
        writer.into_bytes()
    }

    #[test]
    fn test_integer_fixed_range_uses_no_bits() {
        let constraint = Constraint::range(5, 5);
        let mut writer = BitWriter::new();
        encode_integer(&mut writer, &constraint, 5).unwrap();
        assert_eq!(writer.bit_len(), 0);
        let mut cursor = BitCursor::new(&[]);
        assert_eq!(decode_integer(&mut cursor, &constraint).unwrap(), 5);
    }

    #[test]
    fn test_integer_upper_bound_only() {
        let constraint = Constraint {
            upper: Some(10),
            ..Constraint::unconstrained()
        };
        let bytes = encode(|w| encode_integer(w, &constraint, -5));
        assert_eq!(bytes, vec![0x01, 0xFB]);
        let mut cursor = BitCursor::new(&bytes);
        assert_eq!(decode_integer(&mut cursor, &constraint).unwrap(), -5);

        let mut writer = BitWriter::new();
        assert!(matches!(
            encode_integer(&mut writer, &constraint, 11),
            Err(CdrError::ValueOutOfRange(_))
        ));
        // 11 written unconstrained
        let mut cursor = BitCursor::new(&[0x01, 0x0B]);
        assert!(matches!(
            decode_integer(&mut cursor, &constraint),
            Err(CdrError::ValueOutOfRange(_))
        ));

        let extensible = Constraint {
            extensible: true,
            ..constraint
        };
        let bytes = encode(|w| encode_integer(w, &extensible, 11));
        let mut cursor = BitCursor::new(&bytes);
        assert_eq!(decode_integer(&mut cursor, &extensible).unwrap(), 11);
    }

    #[test]
    fn test_integer_unconstrained() {
        let bytes = encode(|w| encode_integer(w, &Constraint::unconstrained(), -129));
        assert_eq!(bytes, vec![0x02, 0xFF, 0x7F]);
        let mut cursor = BitCursor::new(&bytes);
        assert_eq!(
            decode_integer(&mut cursor, &Constraint::unconstrained()).unwrap(),
            -129
        );
    }

    #[test]
    fn test_integer_semi_constrained() {
        let constraint = Constraint {
            lower: Some(10),
            upper: None,
            extensible: false,
        };
        let bytes = encode(|w| encode_integer(w, &constraint, 300));
        assert_eq!(bytes, vec![0x02, 0x01, 0x22]);
        let mut cursor = BitCursor::new(&bytes);
        assert_eq!(decode_integer(&mut cursor, &constraint).unwrap(), 300);
    }

    #[test]
    fn test_integer_large_range() {
        let constraint = Constraint::range(0, 4_294_967_295);
        let bytes = encode(|w| encode_integer(w, &constraint, 0x0102));
        // 2-bit octet count (1 = two octets), padding, then the octets
        assert_eq!(bytes, vec![0x40, 0x01, 0x02]);
        let mut cursor = BitCursor::new(&bytes);
        assert_eq!(decode_integer(&mut cursor, &constraint).unwrap(), 0x0102);
    }

    #[test]
    fn test_integer_extensible() {
        let constraint = Constraint {
            extensible: true,
            ..Constraint::range(0, 7)
        };
        let bytes = encode(|w| encode_integer(w, &constraint, 3));
        assert_eq!(bytes, vec![0b0011_0000]);
        let bytes = encode(|w| encode_integer(w, &constraint, 100));
        assert_eq!(bytes, vec![0x80, 0x01, 100]);
        let mut cursor = BitCursor::new(&bytes);
        assert_eq!(decode_integer(&mut cursor, &constraint).unwrap(), 100);
    }

    #[test]
    fn test_integer_out_of_range() {
        let mut writer = BitWriter::new();
        assert!(matches!(
            encode_integer(&mut writer, &Constraint::range(0, 7), 8),
            Err(CdrError::ValueOutOfRange(_))
        ));
    }

    #[test]
    fn test_enumerated_requires_bounds() {
        let mut cursor = BitCursor::new(&[0]);
        let constraint = Constraint {
            lower: Some(0),
            upper: None,
            extensible: false,
        };
        assert!(matches!(
            decode_enumerated(&mut cursor, &constraint),
            Err(CdrError::UnexportedOrMalformedSchema(_))
        ));
        assert!(matches!(
            decode_enumerated(&mut cursor, &Constraint::range(-1, 3)),
            Err(CdrError::UnexportedOrMalformedSchema(_))
        ));
    }

    #[test]
    fn test_enumerated_root_and_extension() {
        let constraint = Constraint {
            extensible: true,
            ..Constraint::range(0, 3)
        };
        let bytes = encode(|w| encode_enumerated(w, &constraint, 2));
        assert_eq!(bytes, vec![0b0100_0000]);
        // extension value 5 is the second value after ub
        let bytes = encode(|w| encode_enumerated(w, &constraint, 5));
        assert_eq!(bytes, vec![0b1000_0001]);
        let mut cursor = BitCursor::new(&bytes);
        assert_eq!(decode_enumerated(&mut cursor, &constraint).unwrap(), 5);
    }

    #[test]
    fn test_normally_small_large_value() {
        let bytes = encode(|w| encode_normally_small(w, 300));
        assert_eq!(bytes, vec![0x80, 0x02, 0x01, 0x2C]);
        let mut cursor = BitCursor::new(&bytes);
        assert_eq!(decode_normally_small(&mut cursor).unwrap(), 300);
    }

    #[test]
    fn test_fixed_size_octet_string() {
        let constraint = Constraint::range(2, 2);
        let bytes = encode(|w| {
            w.write_bit(true);
            encode_octet_string(w, &constraint, &[0xAB, 0xCD])
        });
        // two octets stay unaligned
        assert_eq!(bytes, vec![0xD5, 0xE6, 0x80]);

        let constraint = Constraint::range(3, 3);
        let bytes = encode(|w| {
            w.write_bit(true);
            encode_octet_string(w, &constraint, &[1, 2, 3])
        });
        assert_eq!(bytes, vec![0x80, 1, 2, 3]);
        let mut cursor = BitCursor::new(&bytes);
        assert!(cursor.read_bit().unwrap());
        assert_eq!(decode_octet_string(&mut cursor, &constraint).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_constrained_octet_string_adds_lower_bound() {
        let constraint = Constraint::range(1, 8);
        let bytes = encode(|w| encode_octet_string(w, &constraint, &[0x11, 0x22]));
        // length offset 1 in 3 bits, padding, octets
        assert_eq!(bytes, vec![0x20, 0x11, 0x22]);
        let mut cursor = BitCursor::new(&bytes);
        assert_eq!(
            decode_octet_string(&mut cursor, &constraint).unwrap(),
            vec![0x11, 0x22]
        );
    }

    #[test]
    fn test_fragmented_octet_string() {
        let value: Vec<u8> = (0..20000u32).map(|i| i as u8).collect();
        let bytes = encode(|w| encode_octet_string(w, &Constraint::unconstrained(), &value));
        assert_eq!(bytes[0], 0xC1);
        assert_eq!(&bytes[16385..16387], &[0x8E, 0x20]);
        let mut cursor = BitCursor::new(&bytes);
        assert_eq!(
            decode_octet_string(&mut cursor, &Constraint::unconstrained()).unwrap(),
            value
        );
        assert_eq!(cursor.remaining_bits(), 0);
    }

    #[test]
    fn test_bit_string_unconstrained() {
        let value = BitString::new(vec![0x81, 0xF0], 12).unwrap();
        let bytes = encode(|w| encode_bit_string(w, &Constraint::unconstrained(), &value));
        assert_eq!(bytes, vec![0x0C, 0x81, 0xF0]);
        let mut cursor = BitCursor::new(&bytes);
        assert_eq!(
            decode_bit_string(&mut cursor, &Constraint::unconstrained()).unwrap(),
            value
        );
    }

    #[test]
    fn test_fixed_bit_string_unaligned() {
        let constraint = Constraint::range(4, 4);
        let value = BitString::new(vec![0xA0], 4).unwrap();
        let bytes = encode(|w| {
            w.write_bit(true);
            encode_bit_string(w, &constraint, &value)
        });
        assert_eq!(bytes, vec![0b1101_0000]);
    }

    #[test]
    fn test_char_string_rejects_invalid_utf8() {
        let bytes = [0x02, 0xC3, 0x28];
        let mut cursor = BitCursor::new(&bytes);
        assert!(matches!(
            decode_char_string(&mut cursor, &Constraint::unconstrained()),
            Err(CdrError::InvalidData(_))
        ));
    }

    #[test]
    fn test_choice_index() {
        let bytes = encode(|w| encode_choice_index(w, &Constraint::unconstrained(), 3, 3));
        assert_eq!(bytes, vec![0b1000_0000]);
        let mut cursor = BitCursor::new(&bytes);
        assert_eq!(
            decode_choice_index(&mut cursor, &Constraint::unconstrained(), 3).unwrap(),
            3
        );

        // 2 bits can name a fourth alternative that does not exist
        let bytes = [0b1100_0000];
        let mut cursor = BitCursor::new(&bytes);
        assert!(matches!(
            decode_choice_index(&mut cursor, &Constraint::unconstrained(), 3),
            Err(CdrError::InvalidChoiceIndex { index: 4, alternatives: 3 })
        ));
    }

    #[test]
    fn test_choice_extension_is_unsupported() {
        let constraint = Constraint {
            extensible: true,
            ..Constraint::unconstrained()
        };
        let mut cursor = BitCursor::new(&[0x80]);
        assert!(matches!(
            decode_choice_index(&mut cursor, &constraint, 2),
            Err(CdrError::UnsupportedType(_))
        ));
    }
}

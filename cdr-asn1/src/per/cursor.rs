//! Bit-level read and write cursors
//!
//! Bits are numbered MSB first inside each octet and octets are consumed in
//! buffer order, so multi-bit fields are big-endian.

use cdr_core::{CdrError, CdrResult};

/// Read cursor over a byte buffer with bit granularity
///
/// # Error Handling
///
/// Every read checks the remaining bits first and fails with `OutOfData`
/// instead of reading past the end of the buffer.
#[derive(Debug, Clone)]
pub struct BitCursor<'a> {
    buffer: &'a [u8],
    bit_position: usize,
}

impl<'a> BitCursor<'a> {
    /// Create a new cursor positioned at the first bit of `buffer`
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            bit_position: 0,
        }
    }

    /// Absolute position in bits
    pub fn bit_position(&self) -> usize {
        self.bit_position
    }

    /// Offset of the octet holding the next bit
    pub fn byte_offset(&self) -> u64 {
        (self.bit_position / 8) as u64
    }

    /// Bit offset inside the current octet (0-7)
    pub fn bit_offset(&self) -> u8 {
        (self.bit_position % 8) as u8
    }

    pub fn is_aligned(&self) -> bool {
        self.bit_position % 8 == 0
    }

    pub fn remaining_bits(&self) -> usize {
        self.buffer.len() * 8 - self.bit_position
    }

    fn ensure(&self, bits: usize) -> CdrResult<()> {
        let remaining = self.remaining_bits();
        if bits > remaining {
            return Err(CdrError::out_of_data(bits as u64, remaining as u64));
        }
        Ok(())
    }

    /// Read `num_bits` (at most 64) as an unsigned big-endian number
    pub fn read_bits(&mut self, num_bits: u32) -> CdrResult<u64> {
        if num_bits > 64 {
            return Err(CdrError::InvalidData(format!(
                "cannot read {} bits into a 64-bit value",
                num_bits
            )));
        }
        self.ensure(num_bits as usize)?;

        let mut value = 0u64;
        let mut left = num_bits as usize;
        while left > 0 {
            let byte = self.buffer[self.bit_position / 8];
            let offset = self.bit_position % 8;
            let take = left.min(8 - offset);
            let chunk = (byte << offset) >> (8 - take);
            value = (value << take) | chunk as u64;
            self.bit_position += take;
            left -= take;
        }

        log::trace!(
            "read {:2} bits, byte offset {}, bit offset {}, value 0x{:x}",
            num_bits,
            self.byte_offset(),
            self.bit_offset(),
            value
        );
        Ok(value)
    }

    /// Read one bit
    pub fn read_bit(&mut self) -> CdrResult<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Read `num_bits` as a left-aligned byte vector
    ///
    /// The result holds `ceil(num_bits / 8)` octets and the unused trailing
    /// bits of the last octet are zero.
    pub fn read_bit_string(&mut self, num_bits: usize) -> CdrResult<Vec<u8>> {
        self.ensure(num_bits)?;

        let mut out = Vec::with_capacity(num_bits.div_ceil(8));
        if self.is_aligned() {
            let start = self.bit_position / 8;
            out.extend_from_slice(&self.buffer[start..start + num_bits.div_ceil(8)]);
            if num_bits % 8 != 0 {
                if let Some(last) = out.last_mut() {
                    *last &= 0xFFu8 << (8 - num_bits % 8);
                }
            }
            self.bit_position += num_bits;
        } else {
            let mut left = num_bits;
            while left >= 8 {
                out.push(self.read_bits(8)? as u8);
                left -= 8;
            }
            if left > 0 {
                out.push((self.read_bits(left as u32)? as u8) << (8 - left));
            }
        }

        log::trace!(
            "read {:2} bits, byte offset {}, bit offset {}, bytes {:02x?}",
            num_bits,
            self.byte_offset(),
            self.bit_offset(),
            out
        );
        Ok(out)
    }

    /// Read `count` whole octets starting at an octet boundary
    pub fn read_octets(&mut self, count: usize) -> CdrResult<&'a [u8]> {
        self.align()?;
        self.ensure(count.saturating_mul(8))?;
        let start = self.bit_position / 8;
        self.bit_position += count * 8;
        Ok(&self.buffer[start..start + count])
    }

    /// Skip to the next octet boundary; the skipped bits must be zero
    pub fn align(&mut self) -> CdrResult<()> {
        let offset = self.bit_position % 8;
        if offset == 0 {
            return Ok(());
        }
        let padding = 8 - offset;
        log::trace!("aligning {} bits", padding);
        if self.read_bits(padding as u32)? != 0 {
            return Err(CdrError::NonZeroPadding);
        }
        Ok(())
    }
}

/// Write cursor producing a byte vector with bit granularity
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    buffer: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits written so far
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn is_aligned(&self) -> bool {
        self.bit_len % 8 == 0
    }

    /// Write the low `num_bits` (at most 64) of `value`, MSB first
    pub fn write_bits(&mut self, num_bits: u32, value: u64) {
        let mut left = num_bits.min(64) as usize;
        while left > 0 {
            let offset = self.bit_len % 8;
            if offset == 0 {
                self.buffer.push(0);
            }
            let take = left.min(8 - offset);
            let chunk = ((value >> (left - take)) & ((1u64 << take) - 1)) as u8;
            if let Some(last) = self.buffer.last_mut() {
                *last |= chunk << (8 - offset - take);
            }
            self.bit_len += take;
            left -= take;
        }
        log::trace!("wrote {:2} bits, bit length {}, value 0x{:x}", num_bits, self.bit_len, value);
    }

    pub fn write_bit(&mut self, bit: bool) {
        self.write_bits(1, bit as u64);
    }

    /// Write the first `num_bits` of a left-aligned byte slice
    pub fn write_bit_string(&mut self, bytes: &[u8], num_bits: usize) {
        let mut left = num_bits;
        for &byte in bytes {
            if left == 0 {
                break;
            }
            let take = left.min(8);
            self.write_bits(take as u32, (byte >> (8 - take)) as u64);
            left -= take;
        }
    }

    /// Write whole octets, starting at the current bit position
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.is_aligned() {
            self.buffer.extend_from_slice(bytes);
            self.bit_len += bytes.len() * 8;
        } else {
            for &byte in bytes {
                self.write_bits(8, byte as u64);
            }
        }
    }

    /// Pad with zero bits up to the next octet boundary
    pub fn align(&mut self) {
        let offset = self.bit_len % 8;
        if offset != 0 {
            self.bit_len += 8 - offset;
        }
    }

    /// Finish writing; the last partial octet is zero padded
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_across_octets() {
        let data = [0b1010_1100, 0b0101_0000];
        let mut cursor = BitCursor::new(&data);
        assert_eq!(cursor.read_bits(3).unwrap(), 0b101);
        assert_eq!(cursor.read_bits(7).unwrap(), 0b01100_01);
        assert_eq!(cursor.bit_position(), 10);
        assert_eq!(cursor.byte_offset(), 1);
        assert_eq!(cursor.remaining_bits(), 6);
    }

    #[test]
    fn test_read_64_bits() {
        let data = [0xFF; 9];
        let mut cursor = BitCursor::new(&data);
        cursor.read_bits(4).unwrap();
        assert_eq!(cursor.read_bits(64).unwrap(), u64::MAX);
        assert!(cursor.read_bits(65).is_err());
    }

    #[test]
    fn test_read_past_end() {
        let data = [0x00];
        let mut cursor = BitCursor::new(&data);
        cursor.read_bits(5).unwrap();
        let err = cursor.read_bits(4).unwrap_err();
        assert!(matches!(err, CdrError::OutOfData { needed: 4, remaining: 3 }));
    }

    #[test]
    fn test_read_bit_string_unaligned() {
        let data = [0b0110_0111, 0b1000_0000];
        let mut cursor = BitCursor::new(&data);
        cursor.read_bit().unwrap();
        let bits = cursor.read_bit_string(10).unwrap();
        assert_eq!(bits, vec![0b1100_1111, 0b0000_0000]);
        assert_eq!(cursor.bit_position(), 11);
    }

    #[test]
    fn test_align_checks_padding() {
        let data = [0b1000_0000, 0xAA];
        let mut cursor = BitCursor::new(&data);
        cursor.read_bit().unwrap();
        cursor.align().unwrap();
        assert_eq!(cursor.read_octets(1).unwrap(), &[0xAA]);

        let data = [0b1000_0100];
        let mut cursor = BitCursor::new(&data);
        cursor.read_bit().unwrap();
        assert!(matches!(cursor.align(), Err(CdrError::NonZeroPadding)));
    }

    #[test]
    fn test_writer_packs_bits() {
        let mut writer = BitWriter::new();
        writer.write_bits(3, 0b101);
        writer.write_bits(7, 0b0110001);
        writer.write_bit(true);
        assert_eq!(writer.bit_len(), 11);
        assert_eq!(writer.into_bytes(), vec![0b1010_1100, 0b0110_0000]);
    }

    #[test]
    fn test_writer_align_and_bytes() {
        let mut writer = BitWriter::new();
        writer.write_bit(true);
        writer.align();
        writer.write_bytes(&[0x12, 0x34]);
        writer.write_bits(4, 0xF);
        writer.write_bytes(&[0xAB]);
        assert_eq!(writer.into_bytes(), vec![0x80, 0x12, 0x34, 0xFA, 0xB0]);
    }

    #[test]
    fn test_writer_bit_string() {
        let mut writer = BitWriter::new();
        writer.write_bit(false);
        writer.write_bit_string(&[0xFF, 0xC0], 10);
        assert_eq!(writer.bit_len(), 11);
        assert_eq!(writer.into_bytes(), vec![0x7F, 0xE0]);
    }
}

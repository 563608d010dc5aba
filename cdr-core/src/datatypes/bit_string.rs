//! Bit string type for CDR records

use crate::error::{CdrError, CdrResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arbitrary string of bits (zeros and ones). A bit string value can have any length including zero.
///
/// The byte vector always holds exactly `ceil(num_bits / 8)` bytes and the
/// bits after `num_bits` in the last byte are zero, so two bit strings with
/// the same bits compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBitString")]
pub struct BitString {
    #[serde(with = "serde_bytes")]
    bytes: Vec<u8>,
    num_bits: usize,
}

/// Serialized form of a [`BitString`], checked by [`BitString::new`] on the way in
#[derive(Deserialize)]
struct RawBitString {
    #[serde(with = "serde_bytes")]
    bytes: Vec<u8>,
    num_bits: usize,
}

impl TryFrom<RawBitString> for BitString {
    type Error = CdrError;

    fn try_from(raw: RawBitString) -> CdrResult<Self> {
        BitString::new(raw.bytes, raw.num_bits)
    }
}

impl BitString {
    /// Construct a new bit string object.
    ///
    /// # Arguments
    ///
    /// * `bit_string` - The bit string as a byte array, MSB first
    /// * `num_bits` - The number of bits
    ///
    /// Surplus bytes are dropped and unused trailing bits are cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if `num_bits > bit_string.len() * 8`.
    pub fn new(mut bit_string: Vec<u8>, num_bits: usize) -> CdrResult<Self> {
        if num_bits > bit_string.len() * 8 {
            return Err(CdrError::InvalidData(format!(
                "bit_string is too short to hold all bits. Need {} bytes for {} bits",
                num_bits.div_ceil(8),
                num_bits
            )));
        }

        bit_string.truncate(num_bits.div_ceil(8));
        let partial = num_bits % 8;
        if partial != 0 {
            if let Some(last) = bit_string.last_mut() {
                *last &= 0xFFu8 << (8 - partial);
            }
        }

        Ok(Self {
            bytes: bit_string,
            num_bits,
        })
    }

    /// An empty bit string
    pub fn empty() -> Self {
        Self {
            bytes: Vec::new(),
            num_bits: 0,
        }
    }

    /// Get the bit string as byte array.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The number of bits in the byte array.
    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    /// Number of unused bits in the last byte (0-7)
    pub fn unused_bits(&self) -> u8 {
        ((8 - self.num_bits % 8) % 8) as u8
    }

    /// Get a copy of the bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Consume the bit string, returning its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Append the bits of another bit string
    pub fn extend(&mut self, other: &BitString) {
        if self.num_bits % 8 == 0 {
            self.bytes.extend_from_slice(&other.bytes);
            self.num_bits += other.num_bits;
            return;
        }
        for index in 0..other.num_bits {
            let bit = (other.bytes[index / 8] >> (7 - index % 8)) & 1 == 1;
            if self.num_bits % 8 == 0 {
                self.bytes.push(0);
            }
            if bit {
                let last = self.bytes.len() - 1;
                self.bytes[last] |= 1 << (7 - self.num_bits % 8);
            }
            self.num_bits += 1;
        }
    }

    /// Get the bit at a specific position
    ///
    /// # Arguments
    /// * `index` - The bit index (0-based, MSB first)
    pub fn get_bit(&self, index: usize) -> CdrResult<bool> {
        if index >= self.num_bits {
            return Err(CdrError::InvalidData(format!(
                "Bit index {} out of bounds (num_bits: {})",
                index, self.num_bits
            )));
        }
        let byte_index = index / 8;
        let bit_index = 7 - (index % 8); // MSB first
        Ok((self.bytes[byte_index] >> bit_index) & 1 == 1)
    }

    /// Set the bit at a specific position
    pub fn set_bit(&mut self, index: usize, value: bool) -> CdrResult<()> {
        if index >= self.num_bits {
            return Err(CdrError::InvalidData(format!(
                "Bit index {} out of bounds (num_bits: {})",
                index, self.num_bits
            )));
        }
        let byte_index = index / 8;
        let bit_index = 7 - (index % 8); // MSB first
        if value {
            self.bytes[byte_index] |= 1 << bit_index;
        } else {
            self.bytes[byte_index] &= !(1 << bit_index);
        }
        Ok(())
    }
}

impl Default for BitString {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for index in 0..self.num_bits {
            let bit = (self.bytes[index / 8] >> (7 - index % 8)) & 1;
            write!(f, "{}", bit)?;
        }
        Ok(())
    }
}

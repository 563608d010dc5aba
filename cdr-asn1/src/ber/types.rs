//! BER encoding types (Tag, Length)

use cdr_core::{CdrError, CdrResult};
use std::fmt;

/// Universal tag numbers used by the engine
pub mod universal {
    pub const END_OF_CONTENTS: u32 = 0;
    pub const BOOLEAN: u32 = 1;
    pub const INTEGER: u32 = 2;
    pub const BIT_STRING: u32 = 3;
    pub const OCTET_STRING: u32 = 4;
    pub const NULL: u32 = 5;
    pub const ENUMERATED: u32 = 10;
    pub const UTF8_STRING: u32 = 12;
    pub const SEQUENCE: u32 = 16;
    pub const SET: u32 = 17;
    pub const IA5_STRING: u32 = 22;
    pub const GRAPHIC_STRING: u32 = 25;
}

/// BER Tag Class
///
/// ASN.1 defines four tag classes:
/// - **Universal**: Standard ASN.1 types (INTEGER, OCTET STRING, etc.)
/// - **Application**: Application-specific types
/// - **Context-specific**: Context-dependent types (the `[n]` tags of CDR fields)
/// - **Private**: Private/implementation-specific types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BerTagClass {
    /// Universal class (00)
    Universal = 0,
    /// Application class (01)
    Application = 1,
    /// Context-specific class (10)
    ContextSpecific = 2,
    /// Private class (11)
    Private = 3,
}

impl BerTagClass {
    /// Get tag class from bits (bits 8-7 of the identifier octet)
    pub fn from_bits(bits: u8) -> Self {
        match (bits >> 6) & 0x03 {
            0 => BerTagClass::Universal,
            1 => BerTagClass::Application,
            2 => BerTagClass::ContextSpecific,
            _ => BerTagClass::Private,
        }
    }

    /// Convert tag class to bits (for encoding)
    pub fn to_bits(self) -> u8 {
        (self as u8) << 6
    }
}

/// BER Tag (identifier octets)
///
/// # Encoding Format
///
/// Short form (tag number 0-30):
/// ```text
/// Bits: 8 7 6 5 4 3 2 1
///       C C P T T T T T
/// ```
///
/// High tag number form (tag number >= 31):
/// ```text
/// First byte:      C C P 1 1 1 1 1
/// Following bytes: 1 T T T T T T T ... 0 T T T T T T T
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BerTag {
    class: BerTagClass,
    constructed: bool,
    number: u32,
}

impl BerTag {
    /// Create a new BER tag
    ///
    /// # Arguments
    /// * `class` - Tag class
    /// * `constructed` - Whether the contents are themselves TLVs
    /// * `number` - Tag number
    pub fn new(class: BerTagClass, constructed: bool, number: u32) -> Self {
        Self {
            class,
            constructed,
            number,
        }
    }

    /// Create a Universal class tag
    pub fn universal(constructed: bool, number: u32) -> Self {
        Self::new(BerTagClass::Universal, constructed, number)
    }

    /// Create a Context-specific class tag
    pub fn context_specific(constructed: bool, number: u32) -> Self {
        Self::new(BerTagClass::ContextSpecific, constructed, number)
    }

    /// Get tag class
    pub fn class(&self) -> BerTagClass {
        self.class
    }

    /// Check if tag is constructed
    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    /// Get tag number
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Same class and number, ignoring the constructed bit
    pub fn same_identity(&self, other: &BerTag) -> bool {
        self.class == other.class && self.number == other.number
    }

    /// Whether this is the first octet of an end-of-contents marker
    pub fn is_end_of_contents(&self) -> bool {
        self.class == BerTagClass::Universal
            && !self.constructed
            && self.number == universal::END_OF_CONTENTS
    }

    /// Append the identifier octets to `out`
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        let class_bits = self.class.to_bits();
        let constructed_bit = if self.constructed { 0x20 } else { 0x00 };

        if self.number <= 30 {
            out.push(class_bits | constructed_bit | (self.number as u8 & 0x1F));
            return;
        }

        out.push(class_bits | constructed_bit | 0x1F);
        let mut groups = Vec::with_capacity(5);
        let mut remaining = self.number;
        while remaining > 0 {
            groups.push((remaining & 0x7F) as u8);
            remaining >>= 7;
        }
        for (i, &group) in groups.iter().rev().enumerate() {
            if i < groups.len() - 1 {
                out.push(group | 0x80);
            } else {
                out.push(group);
            }
        }
    }

    /// Encode tag to bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2);
        self.encode_into(&mut out);
        out
    }

    /// Decode tag from bytes
    ///
    /// # Returns
    /// Returns `Ok((BerTag, bytes_consumed))` if successful
    ///
    /// # Error Handling
    /// Returns `OutOfData` if the buffer ends inside the identifier, and
    /// `InvalidData` if a high tag number does not fit in 32 bits.
    pub fn decode(data: &[u8]) -> CdrResult<(Self, usize)> {
        let first_byte = *data
            .first()
            .ok_or_else(|| CdrError::out_of_data(8, 0))?;
        let class = BerTagClass::from_bits(first_byte);
        let constructed = (first_byte & 0x20) != 0;
        let tag_bits = first_byte & 0x1F;

        if tag_bits < 31 {
            return Ok((Self::new(class, constructed, tag_bits as u32), 1));
        }

        let mut tag_number = 0u32;
        let mut pos = 1;
        loop {
            let byte = *data
                .get(pos)
                .ok_or_else(|| CdrError::out_of_data(8, 0))?;
            if tag_number > (u32::MAX >> 7) {
                return Err(CdrError::InvalidData(
                    "Tag number does not fit in 32 bits".to_string(),
                ));
            }
            tag_number = (tag_number << 7) | (byte & 0x7F) as u32;
            pos += 1;
            if byte & 0x80 == 0 {
                break;
            }
        }

        Ok((Self::new(class, constructed, tag_number), pos))
    }
}

impl fmt::Display for BerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match self.class {
            BerTagClass::Universal => "UNIVERSAL ",
            BerTagClass::Application => "APPLICATION ",
            BerTagClass::ContextSpecific => "",
            BerTagClass::Private => "PRIVATE ",
        };
        let form = if self.constructed { "constructed" } else { "primitive" };
        write!(f, "[{}{}] {}", class, self.number, form)
    }
}

/// BER Length octets
///
/// Short form (0-127) is a single octet, long form is `0x80 | k` followed by
/// `k` big-endian octets, and the indefinite form is the single octet `0x80`
/// with the contents closed by an end-of-contents marker `00 00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BerLength {
    /// Short form: length 0-127
    Short(u8),
    /// Long form: length > 127, encoded with length-of-length
    Long(usize),
    /// Indefinite form, contents end with `00 00`
    Indefinite,
}

/// Largest number of length octets accepted on decode
pub const MAX_LENGTH_OCTETS: usize = 8;

impl BerLength {
    /// Create a definite length, choosing short or long form
    pub fn new(length: usize) -> Self {
        if length < 128 {
            BerLength::Short(length as u8)
        } else {
            BerLength::Long(length)
        }
    }

    /// Definite length value, `None` for the indefinite form
    pub fn value(&self) -> Option<usize> {
        match self {
            BerLength::Short(l) => Some(*l as usize),
            BerLength::Long(l) => Some(*l),
            BerLength::Indefinite => None,
        }
    }

    /// Append the length octets to `out`
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            BerLength::Short(length) => out.push(*length),
            BerLength::Long(length) => {
                let num_bytes = (usize::BITS - length.leading_zeros()).div_ceil(8).max(1) as usize;
                out.push(0x80 | num_bytes as u8);
                for i in (0..num_bytes).rev() {
                    out.push(((*length >> (i * 8)) & 0xFF) as u8);
                }
            }
            BerLength::Indefinite => out.push(0x80),
        }
    }

    /// Encode length to bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(3);
        self.encode_into(&mut out);
        out
    }

    /// Decode length from bytes
    ///
    /// # Returns
    /// Returns `Ok((BerLength, bytes_consumed))` if successful
    ///
    /// # Error Handling
    /// Returns error if:
    /// - Buffer is too short (`OutOfData`)
    /// - First octet is the reserved `0xFF` or the long form needs more than
    ///   eight octets (`InvalidLengthEncoding`)
    pub fn decode(data: &[u8]) -> CdrResult<(Self, usize)> {
        let first_byte = *data
            .first()
            .ok_or_else(|| CdrError::out_of_data(8, 0))?;

        if (first_byte & 0x80) == 0 {
            return Ok((BerLength::Short(first_byte), 1));
        }
        if first_byte == 0x80 {
            return Ok((BerLength::Indefinite, 1));
        }
        if first_byte == 0xFF {
            return Err(CdrError::InvalidLengthEncoding(
                "reserved length octet 0xFF".to_string(),
            ));
        }

        let num_bytes = (first_byte & 0x7F) as usize;
        if num_bytes > MAX_LENGTH_OCTETS {
            return Err(CdrError::InvalidLengthEncoding(format!(
                "{} length octets (max {})",
                num_bytes, MAX_LENGTH_OCTETS
            )));
        }
        let available = data.len() - 1;
        if available < num_bytes {
            return Err(CdrError::out_of_data(
                (num_bytes * 8) as u64,
                (available * 8) as u64,
            ));
        }

        let mut length = 0u64;
        for &byte in &data[1..1 + num_bytes] {
            length = (length << 8) | byte as u64;
        }
        let length = usize::try_from(length).map_err(|_| {
            CdrError::InvalidLengthEncoding(format!("length {} does not fit in memory", length))
        })?;

        Ok((BerLength::Long(length), 1 + num_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ber_tag_short_form() {
        let tag = BerTag::universal(false, universal::INTEGER);
        assert_eq!(tag.encode(), vec![0x02]);
    }

    #[test]
    fn test_ber_tag_constructed_context() {
        let tag = BerTag::context_specific(true, 1);
        assert_eq!(tag.encode(), vec![0xA1]);
    }

    #[test]
    fn test_ber_tag_high_number() {
        assert_eq!(BerTag::context_specific(false, 32).encode(), vec![0x9F, 0x20]);
        assert_eq!(
            BerTag::context_specific(false, 128).encode(),
            vec![0x9F, 0x81, 0x00]
        );
        let (tag, consumed) = BerTag::decode(&[0x9F, 0x81, 0x00, 0x01]).unwrap();
        assert_eq!(consumed, 3);
        assert_eq!(tag.number(), 128);
        assert_eq!(tag.class(), BerTagClass::ContextSpecific);
        assert!(!tag.is_constructed());
    }

    #[test]
    fn test_ber_tag_decode_truncated() {
        assert!(matches!(BerTag::decode(&[]), Err(CdrError::OutOfData { .. })));
        assert!(matches!(
            BerTag::decode(&[0x9F, 0x81]),
            Err(CdrError::OutOfData { .. })
        ));
    }

    #[test]
    fn test_ber_tag_display() {
        assert_eq!(BerTag::context_specific(true, 3).to_string(), "[3] constructed");
        assert_eq!(
            BerTag::universal(false, 2).to_string(),
            "[UNIVERSAL 2] primitive"
        );
    }

    #[test]
    fn test_ber_length_forms() {
        assert_eq!(BerLength::new(127).encode(), vec![0x7F]);
        assert_eq!(BerLength::new(128).encode(), vec![0x81, 0x80]);
        assert_eq!(BerLength::new(1000).encode(), vec![0x82, 0x03, 0xE8]);
        assert_eq!(BerLength::Indefinite.encode(), vec![0x80]);
    }

    #[test]
    fn test_ber_length_decode() {
        assert_eq!(BerLength::decode(&[100]).unwrap(), (BerLength::Short(100), 1));
        assert_eq!(
            BerLength::decode(&[0x82, 0x01, 0x00]).unwrap(),
            (BerLength::Long(256), 3)
        );
        assert_eq!(BerLength::decode(&[0x80]).unwrap(), (BerLength::Indefinite, 1));
    }

    #[test]
    fn test_ber_length_decode_invalid() {
        assert!(matches!(
            BerLength::decode(&[0xFF]),
            Err(CdrError::InvalidLengthEncoding(_))
        ));
        assert!(matches!(
            BerLength::decode(&[0x89, 0, 0, 0, 0, 0, 0, 0, 0, 1]),
            Err(CdrError::InvalidLengthEncoding(_))
        ));
        assert!(matches!(
            BerLength::decode(&[0x82, 0x01]),
            Err(CdrError::OutOfData { .. })
        ));
    }
}

//! CDR header and record payload

use crate::header::{ensure_remaining, release_version_octet, split_release_version, ReleaseIdentifier};
use bytes::{Buf, BufMut};
use cdr_asn1::{decode_with, encode_with, EncodingRules, Schema, Value};
use cdr_core::{CdrError, CdrResult};
use serde::{Deserialize, Serialize};

/// Size of a [`CdrHeader`] on the wire
pub const CDR_HEADER_LENGTH: usize = 5;

/// Encoding of the record payload, bits 8-6 of the fourth header octet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataRecordFormat {
    #[default]
    Ber = 1,
    UnalignedPer = 2,
    AlignedPer = 3,
    Xer = 4,
}

impl DataRecordFormat {
    /// Get format from its 3-bit value
    pub fn from_u8(value: u8) -> CdrResult<Self> {
        match value {
            1 => Ok(DataRecordFormat::Ber),
            2 => Ok(DataRecordFormat::UnalignedPer),
            3 => Ok(DataRecordFormat::AlignedPer),
            4 => Ok(DataRecordFormat::Xer),
            _ => Err(CdrError::InvalidData(format!(
                "Unknown data record format: {}",
                value
            ))),
        }
    }

    pub fn value(&self) -> u8 {
        *self as u8
    }

    /// Encoding rules of the engine that read and write this format
    pub fn rules(&self) -> CdrResult<EncodingRules> {
        match self {
            DataRecordFormat::Ber => Ok(EncodingRules::Ber),
            DataRecordFormat::AlignedPer => Ok(EncodingRules::Per),
            other => Err(CdrError::UnsupportedType(format!(
                "data record format {:?} is not implemented",
                other
            ))),
        }
    }
}

impl From<EncodingRules> for DataRecordFormat {
    fn from(rules: EncodingRules) -> Self {
        match rules {
            EncodingRules::Ber => DataRecordFormat::Ber,
            EncodingRules::Per => DataRecordFormat::AlignedPer,
        }
    }
}

/// Technical specification defining the record, bits 5-1 of the fourth header octet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TsNumber {
    Ts32005 = 0,
    Ts32015 = 1,
    Ts32205 = 2,
    Ts32215 = 3,
    Ts32225 = 4,
    Ts32235 = 5,
    Ts32250 = 6,
    Ts32251 = 7,
    Ts32260 = 9,
    Ts32270 = 10,
    Ts32271 = 11,
    Ts32272 = 12,
    Ts32273 = 13,
    Ts32275 = 14,
    Ts32274 = 15,
    Ts32277 = 16,
    Ts32296 = 17,
    Ts32278 = 18,
    Ts32253 = 19,
    #[default]
    Ts32255 = 20,
    Ts32254 = 21,
    Ts32256 = 22,
    Ts28201 = 23,
    Ts28202 = 24,
}

impl TsNumber {
    /// Get TS number from its 5-bit value
    pub fn from_u8(value: u8) -> CdrResult<Self> {
        match value {
            0 => Ok(TsNumber::Ts32005),
            1 => Ok(TsNumber::Ts32015),
            2 => Ok(TsNumber::Ts32205),
            3 => Ok(TsNumber::Ts32215),
            4 => Ok(TsNumber::Ts32225),
            5 => Ok(TsNumber::Ts32235),
            6 => Ok(TsNumber::Ts32250),
            7 => Ok(TsNumber::Ts32251),
            9 => Ok(TsNumber::Ts32260),
            10 => Ok(TsNumber::Ts32270),
            11 => Ok(TsNumber::Ts32271),
            12 => Ok(TsNumber::Ts32272),
            13 => Ok(TsNumber::Ts32273),
            14 => Ok(TsNumber::Ts32275),
            15 => Ok(TsNumber::Ts32274),
            16 => Ok(TsNumber::Ts32277),
            17 => Ok(TsNumber::Ts32296),
            18 => Ok(TsNumber::Ts32278),
            19 => Ok(TsNumber::Ts32253),
            20 => Ok(TsNumber::Ts32255),
            21 => Ok(TsNumber::Ts32254),
            22 => Ok(TsNumber::Ts32256),
            23 => Ok(TsNumber::Ts28201),
            24 => Ok(TsNumber::Ts28202),
            _ => Err(CdrError::InvalidData(format!("Unknown TS number: {}", value))),
        }
    }

    pub fn value(&self) -> u8 {
        *self as u8
    }
}

/// Header in front of every record
///
/// # Structure
///
/// ```text
/// octets  field
/// 1-2     CDR length (payload only)
/// 3       release identifier (bits 8-6) / version identifier (bits 5-1)
/// 4       data record format (bits 8-6) / TS number (bits 5-1)
/// 5       release identifier extension
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdrHeader {
    pub cdr_length: u16,
    pub release: ReleaseIdentifier,
    pub version: u8,
    pub data_record_format: DataRecordFormat,
    pub ts_number: TsNumber,
    pub release_extension: u8,
}

impl CdrHeader {
    pub fn new(data_record_format: DataRecordFormat, ts_number: TsNumber) -> Self {
        Self {
            data_record_format,
            ts_number,
            ..Self::default()
        }
    }

    /// Append the five header octets to `buf`
    pub fn encode(&self, buf: &mut impl BufMut) -> CdrResult<()> {
        buf.put_u16(self.cdr_length);
        buf.put_u8(release_version_octet(self.release, self.version)?);
        buf.put_u8(self.data_record_format.value() << 5 | self.ts_number.value());
        buf.put_u8(self.release_extension);
        Ok(())
    }

    /// Read five header octets from `buf`
    pub fn decode(buf: &mut impl Buf) -> CdrResult<Self> {
        ensure_remaining(buf, CDR_HEADER_LENGTH)?;
        let cdr_length = buf.get_u16();
        let (release, version) = split_release_version(buf.get_u8())?;
        let format = buf.get_u8();
        let data_record_format = DataRecordFormat::from_u8(format >> 5)?;
        let ts_number = TsNumber::from_u8(format & 0x1F)?;
        let release_extension = buf.get_u8();
        Ok(Self {
            cdr_length,
            release,
            version,
            data_record_format,
            ts_number,
            release_extension,
        })
    }
}

/// One record of a CDR file: header plus encoded payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdrRecord {
    pub header: CdrHeader,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

impl CdrRecord {
    /// Create a record; the header's CDR length is set from `data`
    pub fn new(mut header: CdrHeader, data: Vec<u8>) -> CdrResult<Self> {
        header.cdr_length = payload_length(&data)?;
        Ok(Self { header, data })
    }

    /// Encode `value` with `rules` into a new record
    pub fn encode_value(schema: &Schema, value: &Value, rules: EncodingRules) -> CdrResult<Self> {
        let data = encode_with(rules, schema, value)?;
        Self::new(CdrHeader::new(rules.into(), TsNumber::default()), data)
    }

    /// Decode the payload with the rules named by the header
    ///
    /// # Error Handling
    /// Returns `UnsupportedType` for unaligned PER and XER payloads.
    pub fn decode_value(&self, schema: &Schema) -> CdrResult<Value> {
        let rules = self.header.data_record_format.rules()?;
        decode_with(rules, schema, &self.data)
    }

    /// Size of the record on the wire
    pub fn encoded_len(&self) -> usize {
        CDR_HEADER_LENGTH + self.data.len()
    }

    /// Append header and payload to `buf`; the CDR length is taken from the payload
    pub fn encode(&self, buf: &mut impl BufMut) -> CdrResult<()> {
        let mut header = self.header;
        header.cdr_length = payload_length(&self.data)?;
        header.encode(buf)?;
        buf.put_slice(&self.data);
        Ok(())
    }

    /// Read one record from `buf`
    pub fn decode(buf: &mut impl Buf) -> CdrResult<Self> {
        let header = CdrHeader::decode(buf)?;
        let length = header.cdr_length as usize;
        ensure_remaining(buf, length)?;
        let mut data = vec![0u8; length];
        buf.copy_to_slice(&mut data);
        log::trace!(
            "read {:?} record of {} octets",
            header.data_record_format,
            length
        );
        Ok(Self { header, data })
    }
}

fn payload_length(data: &[u8]) -> CdrResult<u16> {
    u16::try_from(data.len())
        .map_err(|_| CdrError::ValueOutOfRange(format!("CDR of {} octets", data.len())))
}

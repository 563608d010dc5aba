//! CDR file header
//!
//! # Structure
//!
//! ```text
//! octets  field
//! 1-4     file length
//! 5-8     header length
//! 9       high release identifier (bits 8-6) / high version identifier (bits 5-1)
//! 10      low release identifier / low version identifier
//! 11-14   file opening timestamp
//! 15-18   timestamp when last CDR was appended
//! 19-22   number of CDRs in file
//! 23-26   file sequence number
//! 27      file closure trigger reason
//! 28-47   IP address of the node that generated the file
//! 48      lost CDR indicator
//! 49-50   length of CDR routeing filter, followed by the filter
//! ..      length of private extension, followed by the extension
//! ..      high release identifier extension
//! ..      low release identifier extension
//! ```

use crate::timestamp::CdrTimestamp;
use bytes::{Buf, BufMut};
use cdr_core::{CdrError, CdrResult};
use serde::{Deserialize, Serialize};

/// Size of the header without routeing filter and private extension
pub const FIXED_HEADER_LENGTH: usize = 54;

/// Size of the node address field (IPv4 addresses are mapped into IPv6 form)
pub const NODE_ADDRESS_LENGTH: usize = 20;

/// Fail with `OutOfData` unless `buf` holds `needed` more octets
pub(crate) fn ensure_remaining(buf: &impl Buf, needed: usize) -> CdrResult<()> {
    if buf.remaining() < needed {
        return Err(CdrError::out_of_data(
            (needed as u64).saturating_mul(8),
            (buf.remaining() * 8) as u64,
        ));
    }
    Ok(())
}

/// Release identifier in bits 8-6 of a release/version octet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReleaseIdentifier {
    Rel99 = 0,
    Rel4 = 1,
    Rel5 = 2,
    Rel6 = 3,
    Rel7 = 4,
    Rel8 = 5,
    Rel9 = 6,
    /// Release 10 or later; the release identifier extension holds the rest
    #[default]
    BeyondRel9 = 7,
}

impl ReleaseIdentifier {
    /// Get identifier from its 3-bit value
    pub fn from_u8(value: u8) -> CdrResult<Self> {
        match value {
            0 => Ok(ReleaseIdentifier::Rel99),
            1 => Ok(ReleaseIdentifier::Rel4),
            2 => Ok(ReleaseIdentifier::Rel5),
            3 => Ok(ReleaseIdentifier::Rel6),
            4 => Ok(ReleaseIdentifier::Rel7),
            5 => Ok(ReleaseIdentifier::Rel8),
            6 => Ok(ReleaseIdentifier::Rel9),
            7 => Ok(ReleaseIdentifier::BeyondRel9),
            _ => Err(CdrError::InvalidData(format!(
                "Unknown release identifier: {}",
                value
            ))),
        }
    }

    pub fn value(&self) -> u8 {
        *self as u8
    }

    /// 3GPP release number, using `extension` beyond Release 9
    ///
    /// Release 99 is reported as 3.
    pub fn release_number(&self, extension: u8) -> u16 {
        match self {
            ReleaseIdentifier::Rel99 => 3,
            ReleaseIdentifier::BeyondRel9 => 10 + extension as u16,
            other => other.value() as u16 + 3,
        }
    }
}

/// Pack a release identifier and a 5-bit version into one octet
pub(crate) fn release_version_octet(release: ReleaseIdentifier, version: u8) -> CdrResult<u8> {
    if version > 0x1F {
        return Err(CdrError::ValueOutOfRange(format!(
            "version identifier {} does not fit in 5 bits",
            version
        )));
    }
    Ok(release.value() << 5 | version)
}

pub(crate) fn split_release_version(octet: u8) -> CdrResult<(ReleaseIdentifier, u8)> {
    Ok((ReleaseIdentifier::from_u8(octet >> 5)?, octet & 0x1F))
}

/// Why a CDR file was closed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileClosureTriggerReason {
    #[default]
    NormalClosure = 0,
    FileSizeLimitReached = 1,
    FileOpenTimeLimitReached = 2,
    MaximumNumberOfCdrsReached = 3,
    ManualIntervention = 4,
    ReleaseVersionOrEncodingChange = 5,
    AbnormalClosure = 128,
    FileSystemError = 129,
    FileSystemStorageExhausted = 130,
    FileIntegrityError = 131,
}

impl FileClosureTriggerReason {
    /// Get reason from u8 value
    pub fn from_u8(value: u8) -> CdrResult<Self> {
        match value {
            0 => Ok(FileClosureTriggerReason::NormalClosure),
            1 => Ok(FileClosureTriggerReason::FileSizeLimitReached),
            2 => Ok(FileClosureTriggerReason::FileOpenTimeLimitReached),
            3 => Ok(FileClosureTriggerReason::MaximumNumberOfCdrsReached),
            4 => Ok(FileClosureTriggerReason::ManualIntervention),
            5 => Ok(FileClosureTriggerReason::ReleaseVersionOrEncodingChange),
            128 => Ok(FileClosureTriggerReason::AbnormalClosure),
            129 => Ok(FileClosureTriggerReason::FileSystemError),
            130 => Ok(FileClosureTriggerReason::FileSystemStorageExhausted),
            131 => Ok(FileClosureTriggerReason::FileIntegrityError),
            _ => Err(CdrError::InvalidData(format!(
                "Unknown file closure trigger reason: {}",
                value
            ))),
        }
    }

    pub fn value(&self) -> u8 {
        *self as u8
    }

    /// Reasons 128 and up report an abnormal closure
    pub fn is_abnormal(&self) -> bool {
        self.value() >= 128
    }
}

/// CDR file header
///
/// `file_length`, `header_length` and `number_of_cdrs` are recomputed by
/// [`CdrFile::encode`](crate::CdrFile::encode); the header encoder itself
/// writes them as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdrFileHeader {
    pub file_length: u32,
    pub header_length: u32,
    pub high_release: ReleaseIdentifier,
    pub high_version: u8,
    pub low_release: ReleaseIdentifier,
    pub low_version: u8,
    pub file_opening_timestamp: CdrTimestamp,
    pub last_cdr_append_timestamp: CdrTimestamp,
    pub number_of_cdrs: u32,
    pub file_sequence_number: u32,
    pub file_closure_trigger_reason: FileClosureTriggerReason,
    pub node_address: [u8; NODE_ADDRESS_LENGTH],
    pub lost_cdr_indicator: u8,
    #[serde(with = "serde_bytes")]
    pub cdr_routeing_filter: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub private_extension: Vec<u8>,
    pub high_release_extension: u8,
    pub low_release_extension: u8,
}

impl Default for CdrFileHeader {
    fn default() -> Self {
        Self {
            file_length: FIXED_HEADER_LENGTH as u32,
            header_length: FIXED_HEADER_LENGTH as u32,
            high_release: ReleaseIdentifier::default(),
            high_version: 0,
            low_release: ReleaseIdentifier::default(),
            low_version: 0,
            file_opening_timestamp: CdrTimestamp::default(),
            last_cdr_append_timestamp: CdrTimestamp::default(),
            number_of_cdrs: 0,
            file_sequence_number: 0,
            file_closure_trigger_reason: FileClosureTriggerReason::default(),
            node_address: [0; NODE_ADDRESS_LENGTH],
            lost_cdr_indicator: 0,
            cdr_routeing_filter: Vec::new(),
            private_extension: Vec::new(),
            high_release_extension: 0,
            low_release_extension: 0,
        }
    }
}

impl CdrFileHeader {
    /// Start building a header from defaults
    pub fn builder() -> CdrFileHeaderBuilder {
        CdrFileHeaderBuilder::default()
    }

    /// Size of this header on the wire
    pub fn encoded_len(&self) -> usize {
        FIXED_HEADER_LENGTH + self.cdr_routeing_filter.len() + self.private_extension.len()
    }

    /// Append the header to `buf`
    ///
    /// # Error Handling
    /// Returns `ValueOutOfRange` when a version does not fit in 5 bits, a
    /// timestamp field is out of range or a variable part is longer than
    /// 65535 octets.
    pub fn encode(&self, buf: &mut impl BufMut) -> CdrResult<()> {
        let filter_length = variable_length("CDR routeing filter", &self.cdr_routeing_filter)?;
        let extension_length = variable_length("private extension", &self.private_extension)?;

        buf.put_u32(self.file_length);
        buf.put_u32(self.header_length);
        buf.put_u8(release_version_octet(self.high_release, self.high_version)?);
        buf.put_u8(release_version_octet(self.low_release, self.low_version)?);
        self.file_opening_timestamp.encode(buf)?;
        self.last_cdr_append_timestamp.encode(buf)?;
        buf.put_u32(self.number_of_cdrs);
        buf.put_u32(self.file_sequence_number);
        buf.put_u8(self.file_closure_trigger_reason.value());
        buf.put_slice(&self.node_address);
        buf.put_u8(self.lost_cdr_indicator);
        buf.put_u16(filter_length);
        buf.put_slice(&self.cdr_routeing_filter);
        buf.put_u16(extension_length);
        buf.put_slice(&self.private_extension);
        buf.put_u8(self.high_release_extension);
        buf.put_u8(self.low_release_extension);
        Ok(())
    }

    /// Read a header from `buf`
    ///
    /// Octets between the parsed fields and `header_length` are skipped.
    ///
    /// # Error Handling
    /// Returns `OutOfData` when the input ends early and `InvalidData` for
    /// unknown enumeration values or a header length shorter than the
    /// fields it must contain.
    pub fn decode(buf: &mut impl Buf) -> CdrResult<Self> {
        ensure_remaining(buf, 8)?;
        let file_length = buf.get_u32();
        let header_length = buf.get_u32();
        if (header_length as usize) < FIXED_HEADER_LENGTH {
            return Err(CdrError::InvalidData(format!(
                "header length {} is shorter than the fixed {} octets",
                header_length, FIXED_HEADER_LENGTH
            )));
        }

        // up to the routeing filter length
        ensure_remaining(buf, FIXED_HEADER_LENGTH - 8 - 6)?;
        let (high_release, high_version) = split_release_version(buf.get_u8())?;
        let (low_release, low_version) = split_release_version(buf.get_u8())?;
        let file_opening_timestamp = CdrTimestamp::decode(buf)?;
        let last_cdr_append_timestamp = CdrTimestamp::decode(buf)?;
        let number_of_cdrs = buf.get_u32();
        let file_sequence_number = buf.get_u32();
        let file_closure_trigger_reason = FileClosureTriggerReason::from_u8(buf.get_u8())?;
        let mut node_address = [0u8; NODE_ADDRESS_LENGTH];
        buf.copy_to_slice(&mut node_address);
        let lost_cdr_indicator = buf.get_u8();
        let cdr_routeing_filter = read_variable(buf)?;
        let private_extension = read_variable(buf)?;
        ensure_remaining(buf, 2)?;
        let high_release_extension = buf.get_u8();
        let low_release_extension = buf.get_u8();

        let header = Self {
            file_length,
            header_length,
            high_release,
            high_version,
            low_release,
            low_version,
            file_opening_timestamp,
            last_cdr_append_timestamp,
            number_of_cdrs,
            file_sequence_number,
            file_closure_trigger_reason,
            node_address,
            lost_cdr_indicator,
            cdr_routeing_filter,
            private_extension,
            high_release_extension,
            low_release_extension,
        };

        let parsed = header.encoded_len();
        let declared = header_length as usize;
        if parsed > declared {
            return Err(CdrError::InvalidData(format!(
                "header length {} is shorter than its {} octets of fields",
                declared, parsed
            )));
        }
        if declared > parsed {
            log::debug!("skipping {} unknown header octets", declared - parsed);
            ensure_remaining(buf, declared - parsed)?;
            buf.advance(declared - parsed);
        }
        Ok(header)
    }
}

fn variable_length(what: &str, bytes: &[u8]) -> CdrResult<u16> {
    u16::try_from(bytes.len()).map_err(|_| {
        CdrError::ValueOutOfRange(format!("{} of {} octets", what, bytes.len()))
    })
}

/// Read a u16 length followed by that many octets
fn read_variable(buf: &mut impl Buf) -> CdrResult<Vec<u8>> {
    ensure_remaining(buf, 2)?;
    let length = buf.get_u16() as usize;
    ensure_remaining(buf, length)?;
    let mut bytes = vec![0u8; length];
    buf.copy_to_slice(&mut bytes);
    Ok(bytes)
}

/// Builder for [`CdrFileHeader`]
#[derive(Debug, Clone, Default)]
pub struct CdrFileHeaderBuilder {
    header: CdrFileHeader,
}

impl CdrFileHeaderBuilder {
    pub fn high_release(mut self, release: ReleaseIdentifier, version: u8, extension: u8) -> Self {
        self.header.high_release = release;
        self.header.high_version = version;
        self.header.high_release_extension = extension;
        self
    }

    pub fn low_release(mut self, release: ReleaseIdentifier, version: u8, extension: u8) -> Self {
        self.header.low_release = release;
        self.header.low_version = version;
        self.header.low_release_extension = extension;
        self
    }

    pub fn file_opening_timestamp(mut self, timestamp: CdrTimestamp) -> Self {
        self.header.file_opening_timestamp = timestamp;
        self
    }

    pub fn last_cdr_append_timestamp(mut self, timestamp: CdrTimestamp) -> Self {
        self.header.last_cdr_append_timestamp = timestamp;
        self
    }

    pub fn file_sequence_number(mut self, number: u32) -> Self {
        self.header.file_sequence_number = number;
        self
    }

    pub fn file_closure_trigger_reason(mut self, reason: FileClosureTriggerReason) -> Self {
        self.header.file_closure_trigger_reason = reason;
        self
    }

    /// IPv4 addresses take the last four octets, IPv6 the last sixteen
    pub fn node_address(mut self, address: std::net::IpAddr) -> Self {
        let mut octets = [0u8; NODE_ADDRESS_LENGTH];
        match address {
            std::net::IpAddr::V4(v4) => octets[16..].copy_from_slice(&v4.octets()),
            std::net::IpAddr::V6(v6) => octets[4..].copy_from_slice(&v6.octets()),
        }
        self.header.node_address = octets;
        self
    }

    pub fn lost_cdr_indicator(mut self, indicator: u8) -> Self {
        self.header.lost_cdr_indicator = indicator;
        self
    }

    pub fn cdr_routeing_filter(mut self, filter: impl Into<Vec<u8>>) -> Self {
        self.header.cdr_routeing_filter = filter.into();
        self
    }

    pub fn private_extension(mut self, extension: impl Into<Vec<u8>>) -> Self {
        self.header.private_extension = extension.into();
        self
    }

    /// Finish the header; lengths are set for a file without records
    pub fn build(mut self) -> CdrFileHeader {
        let length = self.header.encoded_len() as u32;
        self.header.header_length = length;
        self.header.file_length = length;
        self.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::OffsetSign;

    fn sample() -> CdrFileHeader {
        CdrFileHeader::builder()
            .high_release(ReleaseIdentifier::Rel5, 3, 2)
            .low_release(ReleaseIdentifier::Rel7, 5, 3)
            .file_opening_timestamp(
                CdrTimestamp::new(4, 28, 17, 18).with_offset(OffsetSign::Minus, 8, 0),
            )
            .last_cdr_append_timestamp(
                CdrTimestamp::new(1, 2, 3, 4).with_offset(OffsetSign::Minus, 6, 30),
            )
            .file_sequence_number(11)
            .file_closure_trigger_reason(FileClosureTriggerReason::ManualIntervention)
            .lost_cdr_indicator(4)
            .cdr_routeing_filter(&b"abcd"[..])
            .private_extension(&b"fghjk"[..])
            .build()
    }

    #[test]
    fn test_header_layout() {
        let header = sample();
        assert_eq!(header.header_length, 63);

        let mut out = Vec::new();
        header.encode(&mut out).unwrap();
        assert_eq!(out.len(), 63);
        assert_eq!(hex::encode(&out[..10]), "0000003f0000003f4385");
        assert_eq!(hex::encode(&out[10..18]), "4e452a00110c499e");
        assert_eq!(out[26], 4);
        assert_eq!(&out[48..54], &[0x00, 0x04, b'a', b'b', b'c', b'd']);
        assert_eq!(&out[61..], &[2, 3]);

        assert_eq!(CdrFileHeader::decode(&mut out.as_slice()).unwrap(), header);
    }

    #[test]
    fn test_header_skips_unknown_octets() {
        let mut header = sample();
        header.header_length += 2;
        let mut out = Vec::new();
        header.encode(&mut out).unwrap();
        out.extend_from_slice(&[0xEE, 0xEE, 0x42]);

        let mut input = out.as_slice();
        assert_eq!(CdrFileHeader::decode(&mut input).unwrap(), header);
        assert_eq!(input, &[0x42]);
    }

    #[test]
    fn test_header_rejects_bad_input() {
        let mut out = Vec::new();
        sample().encode(&mut out).unwrap();

        assert!(matches!(
            CdrFileHeader::decode(&mut &out[..40]),
            Err(CdrError::OutOfData { .. })
        ));

        let mut short = out.clone();
        short[7] = 10;
        assert!(matches!(
            CdrFileHeader::decode(&mut short.as_slice()),
            Err(CdrError::InvalidData(_))
        ));

        let mut reason = out.clone();
        reason[26] = 77;
        assert!(matches!(
            CdrFileHeader::decode(&mut reason.as_slice()),
            Err(CdrError::InvalidData(_))
        ));
    }

    #[test]
    fn test_release_numbers() {
        assert_eq!(ReleaseIdentifier::Rel99.release_number(0), 3);
        assert_eq!(ReleaseIdentifier::Rel6.release_number(0), 6);
        assert_eq!(ReleaseIdentifier::BeyondRel9.release_number(7), 17);
        assert!(release_version_octet(ReleaseIdentifier::Rel4, 32).is_err());
        assert!(FileClosureTriggerReason::FileSystemError.is_abnormal());
    }

    #[test]
    fn test_node_address() {
        let header = CdrFileHeader::builder()
            .node_address("10.0.0.1".parse().unwrap())
            .build();
        assert_eq!(&header.node_address[16..], &[10, 0, 0, 1]);
        assert!(header.node_address[..16].iter().all(|&octet| octet == 0));
    }
}

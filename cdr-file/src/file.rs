//! Whole CDR files

use crate::header::CdrFileHeader;
use crate::record::CdrRecord;
use bytes::{BufMut, BytesMut};
use cdr_core::{CdrError, CdrResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A CDR file: one header followed by its records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdrFile {
    pub header: CdrFileHeader,
    pub records: Vec<CdrRecord>,
}

impl CdrFile {
    pub fn new(header: CdrFileHeader) -> Self {
        Self {
            header,
            records: Vec::new(),
        }
    }

    /// Append a record
    pub fn push(&mut self, record: CdrRecord) {
        self.records.push(record);
    }

    /// Encode the file
    ///
    /// File length, header length and number of CDRs are recomputed from
    /// the header's variable parts and the records; `self` is left as is.
    pub fn encode(&self) -> CdrResult<Vec<u8>> {
        let header_length = self.header.encoded_len();
        let file_length = header_length
            + self
                .records
                .iter()
                .map(CdrRecord::encoded_len)
                .sum::<usize>();

        let mut header = self.header.clone();
        header.header_length = to_u32("header length", header_length)?;
        header.file_length = to_u32("file length", file_length)?;
        header.number_of_cdrs = to_u32("number of CDRs", self.records.len())?;

        let mut buf = BytesMut::with_capacity(file_length);
        header.encode(&mut buf)?;
        for record in &self.records {
            record.encode(&mut buf)?;
        }
        log::debug!(
            "encoded CDR file of {} octets with {} records",
            buf.len(),
            self.records.len()
        );
        Ok(buf.to_vec())
    }

    /// Decode a file
    ///
    /// Records are read until the input is exhausted. A file that holds
    /// fewer records than its header declares is accepted with a warning.
    pub fn decode(bytes: &[u8]) -> CdrResult<Self> {
        let mut buf = bytes;
        let header = CdrFileHeader::decode(&mut buf)?;
        if header.file_length as usize != bytes.len() {
            log::warn!(
                "CDR file declares {} octets but holds {}",
                header.file_length,
                bytes.len()
            );
        }

        let mut records = Vec::new();
        while !buf.is_empty() {
            let offset = (bytes.len() - buf.len()) as u64;
            let record = CdrRecord::decode(&mut buf)
                .map_err(|err| err.with_context(&records.len().to_string(), offset))?;
            records.push(record);
        }

        if header.number_of_cdrs as usize != records.len() {
            log::warn!(
                "CDR file declares {} records but holds {}",
                header.number_of_cdrs,
                records.len()
            );
        }
        log::debug!("decoded CDR file with {} records", records.len());
        Ok(Self { header, records })
    }

    /// Encode the file and write it to `path`
    pub fn write_to(&self, path: impl AsRef<Path>) -> CdrResult<()> {
        let bytes = self.encode()?;
        std::fs::write(path.as_ref(), bytes)?;
        log::info!("wrote CDR file {}", path.as_ref().display());
        Ok(())
    }

    /// Read and decode the file at `path`
    pub fn read_from(path: impl AsRef<Path>) -> CdrResult<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        log::info!("read CDR file {} ({} octets)", path.as_ref().display(), bytes.len());
        Self::decode(&bytes)
    }
}

fn to_u32(what: &str, value: usize) -> CdrResult<u32> {
    u32::try_from(value).map_err(|_| CdrError::ValueOutOfRange(format!("{} {}", what, value)))
}

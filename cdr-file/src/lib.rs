//! 3GPP TS 32.297 CDR file container
//!
//! A CDR file is a file header followed by records, each made of a short
//! CDR header and the encoded record. All numbers are big-endian.
//!
//! ```text
//! [file header][CDR header][record][CDR header][record]...
//! ```
//!
//! The payload of a record is opaque to this crate;
//! [`CdrRecord::encode_value`] and [`CdrRecord::decode_value`] hand it to
//! the `cdr-asn1` engine with the rules named by the CDR header.
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use cdr_file::{CdrFile, CdrFileHeader, CdrRecord};
//! use cdr_asn1::{EncodingRules, Schema, Value};
//!
//! let schema = Schema::integer().explicit();
//! let mut file = CdrFile::new(CdrFileHeader::builder().file_sequence_number(1).build());
//! file.push(CdrRecord::encode_value(&schema, &Value::Int(10), EncodingRules::Ber)?);
//! file.write_to("records.cdr")?;
//! # Ok::<(), cdr_core::CdrError>(())
//! ```

pub mod file;
pub mod header;
pub mod record;
pub mod timestamp;

pub use file::CdrFile;
pub use header::{
    CdrFileHeader, CdrFileHeaderBuilder, FileClosureTriggerReason, ReleaseIdentifier,
    FIXED_HEADER_LENGTH,
};
pub use record::{CdrHeader, CdrRecord, DataRecordFormat, TsNumber, CDR_HEADER_LENGTH};
pub use timestamp::{CdrTimestamp, OffsetSign};

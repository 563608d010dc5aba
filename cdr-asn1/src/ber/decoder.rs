//! BER decoder walking a schema tree
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use cdr_asn1::{BerDecoder, Schema, Value};
//!
//! let mut decoder = BerDecoder::new(&[0x02, 0x01, 0x0A]);
//! let value = decoder.decode(&Schema::integer().explicit())?;
//! decoder.finish()?;
//! assert_eq!(value, Value::Int(10));
//! # Ok::<(), cdr_asn1::CdrError>(())
//! ```

use super::types::{BerLength, BerTag};
use super::{framing, starts_with, Framing};
use crate::integer::{signed_from_octets, unsigned_from_octets};
use crate::open_type::resolve_reference;
use crate::schema::{Field, OpenTypeSchema, Schema, SchemaKind};
use crate::value::{ChoiceValue, OpenTypeValue, SequenceValue, Value};
use cdr_core::{BitString, CdrError, CdrResult};

/// Where the contents of a constructed value end
#[derive(Debug, Clone, Copy)]
enum ContentsEnd {
    Definite(usize),
    Indefinite,
}

/// BER decoder for CDR records
///
/// This decoder follows the BER decoding rules as specified in ITU-T X.690.
/// It reads TLV (Tag-Length-Value) triplets from a byte buffer.
///
/// # Position Tracking
///
/// The decoder maintains a position pointer that advances as data is decoded.
/// This allows sequential decoding of multiple values from the same buffer.
///
/// # Error Handling
///
/// All decoding operations return `Result` types. Errors can occur due to:
/// - Buffer underflow (`OutOfData`)
/// - Invalid length octets (`InvalidLengthEncoding`)
/// - Identifiers that fit no schema node (`UnexpectedTag`)
/// - Contents that break the schema's constraints (`ValueOutOfRange`)
pub struct BerDecoder<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> BerDecoder<'a> {
    /// Create a new BER decoder
    ///
    /// # Arguments
    /// * `buffer` - Buffer containing BER-encoded data
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Get current position in buffer
    pub fn position(&self) -> usize {
        self.position
    }

    /// Get remaining bytes
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Check if there are remaining bytes
    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    /// Decode one value described by `schema`
    pub fn decode(&mut self, schema: &Schema) -> CdrResult<Value> {
        self.decode_node(schema, None)
    }

    /// Check that the input is fully consumed
    pub fn finish(self) -> CdrResult<()> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(CdrError::TrailingData(remaining as u64)),
        }
    }

    /// Read the next identifier without consuming it
    pub fn peek_tag(&self) -> CdrResult<BerTag> {
        let (tag, _) = BerTag::decode(&self.buffer[self.position..])?;
        Ok(tag)
    }

    /// Read and consume the next identifier
    pub fn read_tag(&mut self) -> CdrResult<BerTag> {
        let (tag, consumed) = BerTag::decode(&self.buffer[self.position..])?;
        self.position += consumed;
        Ok(tag)
    }

    /// Read and consume length octets
    pub fn read_length(&mut self) -> CdrResult<BerLength> {
        let (length, consumed) = BerLength::decode(&self.buffer[self.position..])?;
        self.position += consumed;
        Ok(length)
    }

    /// Read `count` bytes
    ///
    /// # Error Handling
    /// Returns `OutOfData` without moving the position when fewer than
    /// `count` bytes remain.
    pub fn read_bytes(&mut self, count: usize) -> CdrResult<&'a [u8]> {
        let remaining = self.remaining();
        if count > remaining {
            return Err(CdrError::out_of_data(
                (count as u64).saturating_mul(8),
                (remaining * 8) as u64,
            ));
        }
        let bytes = &self.buffer[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    fn expect_tag(&mut self, expected: &BerTag) -> CdrResult<()> {
        let found = self.read_tag()?;
        if !found.same_identity(expected) {
            return Err(CdrError::UnexpectedTag {
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    /// Read the length of a constructed value and work out where it ends
    fn open_contents(&mut self) -> CdrResult<ContentsEnd> {
        match self.read_length()? {
            BerLength::Indefinite => Ok(ContentsEnd::Indefinite),
            length => {
                let length = length.value().unwrap_or(0);
                let remaining = self.remaining();
                if length > remaining {
                    return Err(CdrError::out_of_data(
                        (length as u64).saturating_mul(8),
                        (remaining * 8) as u64,
                    ));
                }
                Ok(ContentsEnd::Definite(self.position + length))
            }
        }
    }

    /// Identifier octet 0x00 only ever starts an end-of-contents marker
    fn at_contents_end(&self, end: ContentsEnd) -> bool {
        match end {
            ContentsEnd::Definite(end) => self.position >= end,
            ContentsEnd::Indefinite => self.buffer.get(self.position) == Some(&0x00),
        }
    }

    fn close_contents(&mut self, end: ContentsEnd) -> CdrResult<()> {
        match end {
            ContentsEnd::Definite(end) if self.position == end => Ok(()),
            ContentsEnd::Definite(end) => Err(CdrError::InvalidLengthEncoding(format!(
                "constructed contents end at {} but decoding stopped at {}",
                end, self.position
            ))),
            ContentsEnd::Indefinite => match self.read_bytes(2)? {
                [0x00, 0x00] => Ok(()),
                other => Err(CdrError::InvalidLengthEncoding(format!(
                    "expected end-of-contents, found {:02X?}",
                    other
                ))),
            },
        }
    }

    fn decode_node(&mut self, schema: &Schema, reference: Option<i64>) -> CdrResult<Value> {
        if let SchemaKind::Unsupported(kind) = schema.kind() {
            return Err(Schema::unsupported_error(*kind));
        }

        match framing(schema) {
            Framing::Wrapped { outer, inner } => {
                self.expect_tag(&outer)?;
                let end = self.open_contents()?;
                if let Some(inner) = inner {
                    self.expect_tag(&inner)?;
                }
                let value = self.decode_body(schema, reference)?;
                self.close_contents(end)?;
                Ok(value)
            }
            Framing::Identified(tag) => {
                self.expect_tag(&tag)?;
                self.decode_body(schema, reference)
            }
            Framing::Bare => self.decode_body(schema, reference),
        }
    }

    /// Length and contents, or the alternative of a CHOICE / OPEN TYPE
    fn decode_body(&mut self, schema: &Schema, reference: Option<i64>) -> CdrResult<Value> {
        match schema.kind() {
            SchemaKind::Sequence(fields) | SchemaKind::Set(fields) => {
                let end = self.open_contents()?;
                let record = self.decode_sequence(fields, end)?;
                self.close_contents(end)?;
                Ok(Value::Sequence(record))
            }
            SchemaKind::SequenceOf(element) | SchemaKind::SetOf(element) => {
                let end = self.open_contents()?;
                let items = self.decode_elements(element, end)?;
                self.close_contents(end)?;
                schema.size().check("SEQUENCE OF size", items.len() as i128)?;
                Ok(Value::SequenceOf(items))
            }
            SchemaKind::Choice(alternatives) => self.decode_choice(alternatives),
            SchemaKind::OpenType(open) => {
                let reference = reference.ok_or_else(|| {
                    CdrError::UnexportedOrMalformedSchema(
                        "open type outside a SEQUENCE has no reference field".to_string(),
                    )
                })?;
                self.decode_open_type(open, reference)
            }
            _ => {
                let contents = match self.read_length()? {
                    BerLength::Indefinite => {
                        return Err(CdrError::InvalidLengthEncoding(format!(
                            "indefinite length on primitive {}",
                            schema.kind().name()
                        )));
                    }
                    length => self.read_bytes(length.value().unwrap_or(0))?,
                };
                log::trace!("BER {} contents {:02X?}", schema.kind().name(), contents);
                primitive_value(schema, contents)
            }
        }
    }

    fn decode_sequence(&mut self, fields: &[Field], end: ContentsEnd) -> CdrResult<SequenceValue> {
        let mut record = SequenceValue::new();
        for (position, field) in fields.iter().enumerate() {
            let offset = self.position as u64;
            if field.schema.is_optional() {
                if self.at_contents_end(end) {
                    continue;
                }
                let tag = self
                    .peek_tag()
                    .map_err(|err| err.with_context(&field.name, offset))?;
                if !starts_with(&field.schema, &tag) {
                    log::trace!("field `{}` is OPTIONAL and not present", field.name);
                    continue;
                }
            }

            let reference = match field.schema.kind() {
                SchemaKind::OpenType(open) => {
                    Some(resolve_reference(fields, position, &record, open.reference_field()))
                }
                _ => None,
            };
            let value = reference
                .transpose()
                .and_then(|reference| self.decode_node(&field.schema, reference))
                .map_err(|err| err.with_context(&field.name, offset))?;
            record.push(field.name.clone(), value);
        }
        log::debug!("decoded SEQUENCE with {} present fields", record.len());
        Ok(record)
    }

    fn decode_elements(&mut self, element: &Schema, end: ContentsEnd) -> CdrResult<Vec<Value>> {
        let mut items = Vec::new();
        while !self.at_contents_end(end) {
            let offset = self.position as u64;
            let index = items.len();
            let value = self
                .decode_node(element, None)
                .map_err(|err| err.with_context(&index.to_string(), offset))?;
            items.push(value);
        }
        log::debug!("decoded SEQUENCE OF with {} elements", items.len());
        Ok(items)
    }

    fn decode_choice(&mut self, alternatives: &[Field]) -> CdrResult<Value> {
        let tag = self.peek_tag()?;
        let (position, alternative) = alternatives
            .iter()
            .enumerate()
            .find(|(_, alternative)| starts_with(&alternative.schema, &tag))
            .ok_or_else(|| CdrError::UnexpectedTag {
                expected: format!("one of {} CHOICE alternatives", alternatives.len()),
                found: tag.to_string(),
            })?;
        log::debug!("decoding CHOICE alternative {} `{}`", position + 1, alternative.name);

        let offset = self.position as u64;
        let value = self
            .decode_node(&alternative.schema, None)
            .map_err(|err| err.with_context(&alternative.name, offset))?;
        Ok(Value::Choice(ChoiceValue::new(position + 1, value)))
    }

    fn decode_open_type(&mut self, open: &OpenTypeSchema, reference: i64) -> CdrResult<Value> {
        let alternative = open.case_for(reference)?;
        log::debug!("decoding open type alternative `{}`", alternative.name);

        let offset = self.position as u64;
        let value = self
            .decode_node(&alternative.schema, None)
            .map_err(|err| err.with_context(&alternative.name, offset))?;
        Ok(Value::OpenType(OpenTypeValue::new(reference, value)))
    }
}

/// Interpret the contents octets of a primitive
fn primitive_value(schema: &Schema, contents: &[u8]) -> CdrResult<Value> {
    match schema.kind() {
        SchemaKind::Boolean => match contents {
            [byte] => Ok(Value::Bool(*byte != 0)),
            _ => Err(CdrError::InvalidLengthEncoding(format!(
                "BOOLEAN of {} octets",
                contents.len()
            ))),
        },
        SchemaKind::Integer => {
            let value = signed_from_octets(contents)?;
            schema.value_constraint().check("INTEGER", value as i128)?;
            Ok(Value::Int(value))
        }
        SchemaKind::Enumerated => {
            let value = unsigned_from_octets(contents)?;
            schema.value_constraint().check("ENUMERATED", value as i128)?;
            Ok(Value::Enumerated(value))
        }
        SchemaKind::BitString => {
            let (unused, bytes) = contents.split_first().ok_or_else(|| {
                CdrError::InvalidLengthEncoding("BIT STRING without unused-bits octet".to_string())
            })?;
            if *unused > 7 || (bytes.is_empty() && *unused != 0) {
                return Err(CdrError::InvalidData(format!(
                    "BIT STRING with {} unused bits in {} octets",
                    unused,
                    bytes.len()
                )));
            }
            let num_bits = bytes.len() * 8 - *unused as usize;
            schema.size().check("BIT STRING size", num_bits as i128)?;
            Ok(Value::BitString(BitString::new(bytes.to_vec(), num_bits)?))
        }
        SchemaKind::OctetString => {
            schema.size().check("OCTET STRING size", contents.len() as i128)?;
            Ok(Value::OctetString(contents.to_vec()))
        }
        SchemaKind::CharString(_) => {
            schema.size().check("character string size", contents.len() as i128)?;
            let text = String::from_utf8(contents.to_vec())
                .map_err(|err| CdrError::InvalidData(format!("character string: {}", err)))?;
            Ok(Value::CharString(text))
        }
        SchemaKind::Null if contents.is_empty() => Ok(Value::Null),
        SchemaKind::Null => Err(CdrError::InvalidLengthEncoding(format!(
            "NULL of {} octets",
            contents.len()
        ))),
        kind => Err(CdrError::UnexportedOrMalformedSchema(format!(
            "{} is not a primitive",
            kind.name()
        ))),
    }
}

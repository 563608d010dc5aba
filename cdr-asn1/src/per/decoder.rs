//! PER decoder walking a schema tree
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use cdr_asn1::{PerDecoder, Schema};
//!
//! let schema = Schema::integer().value_range(0, 127);
//! let mut decoder = PerDecoder::new(&[0xFE]);
//! let value = decoder.decode(&schema)?;
//! decoder.finish()?;
//! # Ok::<(), cdr_asn1::CdrError>(())
//! ```

use super::cursor::BitCursor;
use super::MAX_EMPTY_ELEMENT_RUN;
use super::length::decode_length;
use super::primitives::{
    decode_bit_string, decode_boolean, decode_char_string, decode_choice_index,
    decode_count_bounds, decode_enumerated, decode_integer, decode_octet_string,
};
use crate::open_type::resolve_reference;
use crate::schema::{Field, OpenTypeSchema, Schema, SchemaKind};
use crate::value::{ChoiceValue, OpenTypeValue, SequenceValue, Value};
use cdr_core::{CdrError, CdrResult};

/// PER decoder for CDR records
///
/// The decoder owns a [`BitCursor`] over the input. A failure anywhere in
/// the tree aborts the decode; the error carries the dotted path of the
/// failing field and the byte offset where that field started.
pub struct PerDecoder<'a> {
    cursor: BitCursor<'a>,
}

impl<'a> PerDecoder<'a> {
    /// Create a new PER decoder
    ///
    /// # Arguments
    /// * `buffer` - Buffer containing PER-encoded data
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            cursor: BitCursor::new(buffer),
        }
    }

    /// Cursor position, for callers that decode several values in a row
    pub fn cursor(&self) -> &BitCursor<'a> {
        &self.cursor
    }

    /// Decode one value described by `schema`
    pub fn decode(&mut self, schema: &Schema) -> CdrResult<Value> {
        self.decode_node(schema, None)
    }

    /// Check that the input is fully consumed
    ///
    /// Padding bits of the last partial octet must be zero and no whole
    /// octet may remain.
    pub fn finish(mut self) -> CdrResult<()> {
        self.cursor.align()?;
        let remaining = (self.cursor.remaining_bits() / 8) as u64;
        if remaining > 0 {
            return Err(CdrError::TrailingData(remaining));
        }
        Ok(())
    }

    /// Like [`PerDecoder::finish`] for an open type payload, which carries
    /// an empty encoding as a single zero octet
    fn finish_payload(mut self) -> CdrResult<()> {
        if self.cursor.bit_position() == 0 && self.cursor.remaining_bits() == 8 {
            return match self.cursor.read_bits(8)? {
                0 => Ok(()),
                _ => Err(CdrError::TrailingData(1)),
            };
        }
        self.finish()
    }

    fn decode_node(&mut self, schema: &Schema, reference: Option<i64>) -> CdrResult<Value> {
        let cursor = &mut self.cursor;
        match schema.kind() {
            SchemaKind::Boolean => Ok(Value::Bool(decode_boolean(cursor)?)),
            SchemaKind::Integer => Ok(Value::Int(decode_integer(
                cursor,
                schema.value_constraint(),
            )?)),
            SchemaKind::Enumerated => Ok(Value::Enumerated(decode_enumerated(
                cursor,
                schema.value_constraint(),
            )?)),
            SchemaKind::BitString => Ok(Value::BitString(decode_bit_string(cursor, schema.size())?)),
            SchemaKind::OctetString => Ok(Value::OctetString(decode_octet_string(
                cursor,
                schema.size(),
            )?)),
            SchemaKind::CharString(_) => Ok(Value::CharString(decode_char_string(
                cursor,
                schema.size(),
            )?)),
            SchemaKind::Null => Ok(Value::Null),
            SchemaKind::Sequence(fields) | SchemaKind::Set(fields) => self.decode_sequence(fields),
            SchemaKind::SequenceOf(element) | SchemaKind::SetOf(element) => {
                self.decode_sequence_of(element, schema)
            }
            SchemaKind::Choice(alternatives) => self.decode_choice(alternatives, schema),
            SchemaKind::OpenType(open) => {
                let reference = reference.ok_or_else(|| {
                    CdrError::UnexportedOrMalformedSchema(
                        "open type outside a SEQUENCE has no reference field".to_string(),
                    )
                })?;
                self.decode_open_type(open, reference)
            }
            SchemaKind::Unsupported(kind) => Err(Schema::unsupported_error(*kind)),
        }
    }

    fn decode_sequence(&mut self, fields: &[Field]) -> CdrResult<Value> {
        let optional_count = fields.iter().filter(|field| field.schema.is_optional()).count();
        let mut presence = Vec::with_capacity(optional_count);
        for _ in 0..optional_count {
            presence.push(self.cursor.read_bit()?);
        }
        log::debug!(
            "decoding SEQUENCE of {} fields, presence {:?}",
            fields.len(),
            presence
        );

        let mut presence = presence.into_iter();
        let mut record = SequenceValue::new();
        for (position, field) in fields.iter().enumerate() {
            if field.schema.is_optional() && !presence.next().unwrap_or(false) {
                log::trace!("field `{}` is OPTIONAL and not present", field.name);
                continue;
            }
            let offset = self.cursor.byte_offset();
            let value = self
                .decode_field(fields, position, &record)
                .map_err(|err| err.with_context(&field.name, offset))?;
            record.push(field.name.clone(), value);
        }
        log::debug!("decoded SEQUENCE with {} present fields", record.len());
        Ok(Value::Sequence(record))
    }

    fn decode_field(
        &mut self,
        fields: &[Field],
        position: usize,
        record: &SequenceValue,
    ) -> CdrResult<Value> {
        let schema = &fields[position].schema;
        let reference = match schema.kind() {
            SchemaKind::OpenType(open) => Some(resolve_reference(
                fields,
                position,
                record,
                open.reference_field(),
            )?),
            _ => None,
        };
        self.decode_node(schema, reference)
    }

    fn decode_sequence_of(&mut self, element: &Schema, schema: &Schema) -> CdrResult<Value> {
        let (lb, fixed, range) = decode_count_bounds(&mut self.cursor, schema.size())?;
        let mut items = Vec::new();
        let mut empty_run = 0;

        if let Some(count) = fixed {
            self.decode_elements(element, count as u64, &mut items, &mut empty_run)?;
        } else {
            loop {
                let length = decode_length(&mut self.cursor, range)?;
                let count = if range.is_some() {
                    length.value + lb as u64
                } else {
                    length.value
                };
                self.decode_elements(element, count, &mut items, &mut empty_run)?;
                if !length.repeat {
                    break;
                }
            }
        }
        log::debug!("decoded SEQUENCE OF with {} elements", items.len());
        Ok(Value::SequenceOf(items))
    }

    fn decode_elements(
        &mut self,
        element: &Schema,
        count: u64,
        items: &mut Vec<Value>,
        empty_run: &mut usize,
    ) -> CdrResult<()> {
        // never trust a count beyond what the input could hold
        let capacity = count.min(self.cursor.remaining_bits() as u64) as usize;
        items.reserve(capacity);
        for decoded in 0..count {
            let offset = self.cursor.byte_offset();
            let start = self.cursor.bit_position();
            let index = items.len();
            let value = self
                .decode_node(element, None)
                .map_err(|err| err.with_context(&index.to_string(), offset))?;

            if self.cursor.bit_position() == start {
                *empty_run += 1;
                if *empty_run > MAX_EMPTY_ELEMENT_RUN {
                    let err = CdrError::out_of_data(
                        count - decoded,
                        self.cursor.remaining_bits() as u64,
                    );
                    return Err(err.with_context(&index.to_string(), offset));
                }
            } else {
                *empty_run = 0;
            }
            items.push(value);
        }
        Ok(())
    }

    fn decode_choice(&mut self, alternatives: &[Field], schema: &Schema) -> CdrResult<Value> {
        let index = decode_choice_index(&mut self.cursor, schema.value_constraint(), alternatives.len())?;
        let alternative = &alternatives[index - 1];
        log::debug!("decoding CHOICE alternative {} `{}`", index, alternative.name);

        let offset = self.cursor.byte_offset();
        let value = self
            .decode_node(&alternative.schema, None)
            .map_err(|err| err.with_context(&alternative.name, offset))?;
        Ok(Value::Choice(ChoiceValue::new(index, value)))
    }

    fn decode_open_type(&mut self, open: &OpenTypeSchema, reference: i64) -> CdrResult<Value> {
        let alternative = open.case_for(reference)?;

        let mut payload = Vec::new();
        loop {
            let length = decode_length(&mut self.cursor, None)?;
            if length.value > 0 {
                payload.extend_from_slice(self.cursor.read_octets(length.value as usize)?);
            }
            if !length.repeat {
                break;
            }
        }
        log::debug!(
            "decoding open type alternative `{}` from {} octets",
            alternative.name,
            payload.len()
        );

        let mut inner = PerDecoder::new(&payload);
        let value = inner
            .decode_node(&alternative.schema, None)
            .and_then(|value| inner.finish_payload().map(|_| value))
            .map_err(|err| err.with_context(&alternative.name, 0))?;
        Ok(Value::OpenType(OpenTypeValue::new(reference, value)))
    }
}

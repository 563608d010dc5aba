//! PER encoder walking a schema tree

use super::cursor::BitWriter;
use super::length::encode_length;
use super::MAX_EMPTY_ELEMENT_RUN;
use super::primitives::{
    encode_bit_string, encode_boolean, encode_char_string, encode_choice_index,
    encode_count_bounds, encode_enumerated, encode_integer, encode_octet_string,
};
use crate::open_type::resolve_reference;
use crate::schema::{Field, OpenTypeSchema, Schema, SchemaKind};
use crate::value::{check_record, mismatch, ChoiceValue, OpenTypeValue, SequenceValue, Value};
use cdr_core::{CdrError, CdrResult};

/// PER encoder for CDR records
///
/// The mirror of [`PerDecoder`](super::PerDecoder): every value written here
/// decodes back to an equal value with the same schema.
#[derive(Debug, Default)]
pub struct PerEncoder {
    writer: BitWriter,
}

impl PerEncoder {
    /// Create a new PER encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode one value described by `schema`
    pub fn encode(&mut self, schema: &Schema, value: &Value) -> CdrResult<()> {
        self.encode_node(schema, value, None)
    }

    /// Get the encoded bytes; the last octet is zero padded
    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.into_bytes()
    }

    fn byte_offset(&self) -> u64 {
        (self.writer.bit_len() / 8) as u64
    }

    fn encode_node(&mut self, schema: &Schema, value: &Value, reference: Option<i64>) -> CdrResult<()> {
        let writer = &mut self.writer;
        match (schema.kind(), value) {
            (SchemaKind::Unsupported(kind), _) => Err(Schema::unsupported_error(*kind)),
            (SchemaKind::Boolean, Value::Bool(value)) => {
                encode_boolean(writer, *value);
                Ok(())
            }
            (SchemaKind::Integer, Value::Int(value)) => {
                encode_integer(writer, schema.value_constraint(), *value)
            }
            (SchemaKind::Enumerated, Value::Enumerated(value)) => {
                encode_enumerated(writer, schema.value_constraint(), *value)
            }
            (SchemaKind::BitString, Value::BitString(value)) => {
                encode_bit_string(writer, schema.size(), value)
            }
            (SchemaKind::OctetString, Value::OctetString(value)) => {
                encode_octet_string(writer, schema.size(), value)
            }
            (SchemaKind::CharString(_), Value::CharString(value)) => {
                encode_char_string(writer, schema.size(), value)
            }
            (SchemaKind::Null, Value::Null) => Ok(()),
            (SchemaKind::Sequence(fields) | SchemaKind::Set(fields), Value::Sequence(record)) => {
                self.encode_sequence(fields, record)
            }
            (SchemaKind::SequenceOf(element) | SchemaKind::SetOf(element), Value::SequenceOf(items)) => {
                self.encode_sequence_of(element, schema, items)
            }
            (SchemaKind::Choice(alternatives), Value::Choice(choice)) => {
                self.encode_choice(alternatives, schema, choice)
            }
            (SchemaKind::OpenType(open), Value::OpenType(open_value)) => {
                let reference = reference.ok_or_else(|| {
                    CdrError::UnexportedOrMalformedSchema(
                        "open type outside a SEQUENCE has no reference field".to_string(),
                    )
                })?;
                self.encode_open_type(open, reference, open_value)
            }
            (kind, value) => Err(mismatch(kind.name(), value)),
        }
    }

    fn encode_sequence(&mut self, fields: &[Field], record: &SequenceValue) -> CdrResult<()> {
        check_record(fields, record)?;
        log::debug!("encoding SEQUENCE with {} present fields", record.len());

        for field in fields.iter().filter(|field| field.schema.is_optional()) {
            self.writer.write_bit(record.contains(&field.name));
        }

        for (position, field) in fields.iter().enumerate() {
            let Some(value) = record.get(&field.name) else {
                continue;
            };
            let offset = self.byte_offset();
            self.encode_field(fields, position, record, value)
                .map_err(|err| err.with_context(&field.name, offset))?;
        }
        Ok(())
    }

    fn encode_field(
        &mut self,
        fields: &[Field],
        position: usize,
        record: &SequenceValue,
        value: &Value,
    ) -> CdrResult<()> {
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
        self.encode_node(schema, value, reference)
    }

    fn encode_sequence_of(&mut self, element: &Schema, schema: &Schema, items: &[Value]) -> CdrResult<()> {
        log::debug!("encoding SEQUENCE OF with {} elements", items.len());
        let (lb, fixed, range) = encode_count_bounds(&mut self.writer, schema.size(), items.len())?;
        let mut empty_run = 0;

        if fixed.is_some() {
            return self.encode_elements(element, items, 0, &mut empty_run);
        }
        if range.is_some() {
            encode_length(&mut self.writer, range, (items.len() as i64 - lb) as u64)?;
            return self.encode_elements(element, items, 0, &mut empty_run);
        }

        let mut offset = 0;
        loop {
            let length = encode_length(&mut self.writer, None, (items.len() - offset) as u64)?;
            let end = offset + length.value as usize;
            self.encode_elements(element, &items[offset..end], offset, &mut empty_run)?;
            offset = end;
            if !length.repeat {
                return Ok(());
            }
        }
    }

    fn encode_elements(
        &mut self,
        element: &Schema,
        items: &[Value],
        first_index: usize,
        empty_run: &mut usize,
    ) -> CdrResult<()> {
        for (index, item) in items.iter().enumerate() {
            let offset = self.byte_offset();
            let start = self.writer.bit_len();
            let path = (first_index + index).to_string();
            self.encode_node(element, item, None)
                .map_err(|err| err.with_context(&path, offset))?;

            if self.writer.bit_len() == start {
                *empty_run += 1;
                if *empty_run > MAX_EMPTY_ELEMENT_RUN {
                    let err = CdrError::ValueOutOfRange(format!(
                        "more than {} consecutive SEQUENCE OF elements without content",
                        MAX_EMPTY_ELEMENT_RUN
                    ));
                    return Err(err.with_context(&path, offset));
                }
            } else {
                *empty_run = 0;
            }
        }
        Ok(())
    }

    fn encode_choice(&mut self, alternatives: &[Field], schema: &Schema, choice: &ChoiceValue) -> CdrResult<()> {
        encode_choice_index(
            &mut self.writer,
            schema.value_constraint(),
            alternatives.len(),
            choice.index,
        )?;
        let alternative = &alternatives[choice.index - 1];
        log::debug!("encoding CHOICE alternative {} `{}`", choice.index, alternative.name);

        let offset = self.byte_offset();
        self.encode_node(&alternative.schema, &choice.value, None)
            .map_err(|err| err.with_context(&alternative.name, offset))
    }

    fn encode_open_type(
        &mut self,
        open: &OpenTypeSchema,
        reference: i64,
        value: &OpenTypeValue,
    ) -> CdrResult<()> {
        let alternative = open.case_for(value.reference)?;
        if value.reference != reference {
            return Err(CdrError::ValueMismatch(format!(
                "open type value carries reference {} but `{}` is {}",
                value.reference,
                open.reference_field(),
                reference
            )));
        }

        let mut inner = PerEncoder::new();
        inner
            .encode_node(&alternative.schema, &value.value, None)
            .map_err(|err| err.with_context(&alternative.name, 0))?;
        let mut payload = inner.into_bytes();
        if payload.is_empty() {
            payload.push(0);
        }
        log::debug!(
            "encoding open type alternative `{}` as {} octets",
            alternative.name,
            payload.len()
        );

        let mut offset = 0;
        loop {
            let length = encode_length(&mut self.writer, None, (payload.len() - offset) as u64)?;
            let end = offset + length.value as usize;
            self.writer.write_bytes(&payload[offset..end]);
            offset = end;
            if !length.repeat {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::per::PerDecoder;
    use crate::schema::field;
    use cdr_core::BitString;

    fn encode(schema: &Schema, value: &Value) -> CdrResult<Vec<u8>> {
        let mut encoder = PerEncoder::new();
        encoder.encode(schema, value)?;
        Ok(encoder.into_bytes())
    }

    fn round_trip(schema: &Schema, value: &Value) -> Vec<u8> {
        let bytes = encode(schema, value).unwrap();
        let mut decoder = PerDecoder::new(&bytes);
        assert_eq!(&decoder.decode(schema).unwrap(), value);
        decoder.finish().unwrap();
        bytes
    }

    #[test]
    fn test_encode_sequence_presence_bitmap() {
        let schema = Schema::sequence(vec![
            field("a", Schema::integer().value_range(0, 7).optional()),
            field("b", Schema::boolean()),
            field("c", Schema::integer().value_range(0, 7).optional()),
        ]);
        let value = Value::Sequence(SequenceValue::new().with("a", 5i64).with("b", true));
        assert_eq!(round_trip(&schema, &value), vec![0b1010_1100]);
    }

    #[test]
    fn test_encode_missing_mandatory_field() {
        let schema = Schema::sequence(vec![field("b", Schema::boolean())]);
        let err = encode(&schema, &Value::Sequence(SequenceValue::new())).unwrap_err();
        assert!(matches!(err, CdrError::ValueMismatch(_)));
    }

    #[test]
    fn test_encode_shape_mismatch() {
        let schema = Schema::sequence(vec![field("b", Schema::boolean())]);
        let value = Value::Sequence(SequenceValue::new().with("b", 3i64));
        let err = encode(&schema, &value).unwrap_err();
        assert_eq!(err.path(), Some("b"));
        assert!(matches!(err.root(), CdrError::ValueMismatch(_)));
    }

    #[test]
    fn test_encode_sequence_of_with_size_range() {
        let schema = Schema::sequence_of(Schema::integer().value_range(0, 3)).size_range(1, 4);
        let value = Value::SequenceOf(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        // count offset 2 in 2 bits, then three 2-bit values
        assert_eq!(round_trip(&schema, &value), vec![0b1001_1011]);

        let empty = Value::SequenceOf(vec![]);
        assert!(matches!(
            encode(&schema, &empty),
            Err(CdrError::ValueOutOfRange(_))
        ));
    }

    #[test]
    fn test_encode_choice_and_bit_string() {
        let schema = Schema::choice(vec![
            field("flag", Schema::boolean()),
            field("bits", Schema::bit_string()),
        ]);
        let bits = BitString::new(vec![0xA0], 3).unwrap();
        let value = Value::choice(2, Value::BitString(bits));
        assert_eq!(round_trip(&schema, &value), vec![0x80, 0x03, 0xA0]);

        assert!(matches!(
            encode(&schema, &Value::choice(3, Value::Null)),
            Err(CdrError::InvalidChoiceIndex { index: 3, alternatives: 2 })
        ));
    }

    #[test]
    fn test_encode_open_type() {
        let schema = Schema::sequence(vec![
            field("id", Schema::integer().value_range(0, 255)),
            field(
                "payload",
                Schema::open_type(
                    "id",
                    vec![
                        field("nothing", Schema::null().with_reference_value(1)),
                        field("small", Schema::integer().value_range(0, 15).with_reference_value(2)),
                    ],
                )
                .unwrap(),
            ),
        ]);
        let value = Value::Sequence(
            SequenceValue::new()
                .with("id", 2i64)
                .with("payload", Value::open_type(2, Value::Int(9))),
        );
        assert_eq!(round_trip(&schema, &value), vec![0x02, 0x01, 0x90]);

        // an empty alternative still occupies one octet
        let value = Value::Sequence(
            SequenceValue::new()
                .with("id", 1i64)
                .with("payload", Value::open_type(1, Value::Null)),
        );
        assert_eq!(round_trip(&schema, &value), vec![0x01, 0x01, 0x00]);

        let wrong = Value::Sequence(
            SequenceValue::new()
                .with("id", 1i64)
                .with("payload", Value::open_type(2, Value::Int(9))),
        );
        assert!(matches!(
            encode(&schema, &wrong).unwrap_err().root(),
            CdrError::ValueMismatch(_)
        ));
    }

    #[test]
    fn test_encode_large_sequence_of_fragments() {
        let schema = Schema::sequence_of(Schema::boolean());
        let value = Value::SequenceOf((0..16400).map(|i| Value::Bool(i % 3 == 0)).collect());
        let bytes = round_trip(&schema, &value);
        assert_eq!(bytes[0], 0xC1);
    }

    #[test]
    fn test_encode_empty_elements_are_capped() {
        let schema = Schema::sequence_of(Schema::null());
        let value = Value::SequenceOf(vec![Value::Null; MAX_EMPTY_ELEMENT_RUN]);
        round_trip(&schema, &value);

        let value = Value::SequenceOf(vec![Value::Null; MAX_EMPTY_ELEMENT_RUN + 1]);
        let err = encode(&schema, &value).unwrap_err();
        assert!(matches!(err.root(), CdrError::ValueOutOfRange(_)));
    }
}

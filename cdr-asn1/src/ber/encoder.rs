//! BER encoder walking a schema tree
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use cdr_asn1::{BerEncoder, Schema, Value};
//!
//! let mut encoder = BerEncoder::new();
//! encoder.encode(&Schema::integer().explicit(), &Value::Int(10))?;
//! assert_eq!(encoder.into_bytes(), [0x02, 0x01, 0x0A]);
//! # Ok::<(), cdr_asn1::CdrError>(())
//! ```

use super::types::{BerLength, BerTag};
use super::{framing, is_transparent, Framing};
use crate::integer::{guarded_unsigned_octets, signed_octets};
use crate::open_type::resolve_reference;
use crate::schema::{Field, OpenTypeSchema, Schema, SchemaKind};
use crate::value::{check_record, mismatch, ChoiceValue, OpenTypeValue, SequenceValue, Value};
use cdr_core::{CdrError, CdrResult};

/// End-of-contents octets closing an indefinite length
const END_OF_CONTENTS: [u8; 2] = [0x00, 0x00];

/// BER encoder for CDR records
///
/// Each encoded value is a TLV (Tag-Length-Value) triplet as specified in
/// ITU-T X.690, framed according to the tagging of its schema node.
///
/// # Memory Management
///
/// The encoder accumulates everything in one `Vec<u8>`. Constructed values
/// use the indefinite length form, so nothing is encoded twice to learn a
/// length. Use `with_capacity()` when the record size is roughly known.
///
/// # Error Handling
///
/// Encoding fails with `ValueMismatch` when the value tree does not have
/// the shape of the schema, `ValueOutOfRange` when a value or size breaks a
/// non-extensible constraint, and `UnsupportedType` for unimplemented
/// kinds. Errors carry the dotted path of the failing field.
#[derive(Debug, Default)]
pub struct BerEncoder {
    buffer: Vec<u8>,
}

impl BerEncoder {
    /// Create a new BER encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new BER encoder with initial capacity
    ///
    /// # Arguments
    /// * `capacity` - Initial buffer capacity in bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Encode a TLV (Tag-Length-Value) triplet with a definite length
    ///
    /// # Arguments
    /// * `tag` - BER tag
    /// * `value` - Contents octets (already encoded)
    pub fn encode_tlv(&mut self, tag: &BerTag, value: &[u8]) {
        tag.encode_into(&mut self.buffer);
        self.encode_primitive_contents(value);
    }

    /// Encode one value described by `schema`
    pub fn encode(&mut self, schema: &Schema, value: &Value) -> CdrResult<()> {
        self.encode_node(schema, value, None)
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Get the encoded bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    fn offset(&self) -> u64 {
        self.buffer.len() as u64
    }

    fn encode_primitive_contents(&mut self, contents: &[u8]) {
        BerLength::new(contents.len()).encode_into(&mut self.buffer);
        self.buffer.extend_from_slice(contents);
    }

    fn open_indefinite(&mut self) {
        BerLength::Indefinite.encode_into(&mut self.buffer);
    }

    fn close_indefinite(&mut self) {
        self.buffer.extend_from_slice(&END_OF_CONTENTS);
    }

    fn encode_node(&mut self, schema: &Schema, value: &Value, reference: Option<i64>) -> CdrResult<()> {
        if let SchemaKind::Unsupported(kind) = schema.kind() {
            return Err(Schema::unsupported_error(*kind));
        }

        match framing(schema) {
            Framing::Wrapped { outer, inner } => {
                log::trace!("BER wrapper {} around {}", outer, schema.kind().name());
                outer.encode_into(&mut self.buffer);
                self.open_indefinite();
                if let Some(inner) = inner {
                    inner.encode_into(&mut self.buffer);
                }
                self.encode_body(schema, value, reference)?;
                self.close_indefinite();
                Ok(())
            }
            Framing::Identified(tag) => {
                tag.encode_into(&mut self.buffer);
                self.encode_body(schema, value, reference)
            }
            Framing::Bare => self.encode_body(schema, value, reference),
        }
    }

    /// Length and contents, or the alternative of a CHOICE / OPEN TYPE
    fn encode_body(&mut self, schema: &Schema, value: &Value, reference: Option<i64>) -> CdrResult<()> {
        match (schema.kind(), value) {
            (SchemaKind::Sequence(fields) | SchemaKind::Set(fields), Value::Sequence(record)) => {
                self.open_indefinite();
                self.encode_sequence(fields, record)?;
                self.close_indefinite();
                Ok(())
            }
            (SchemaKind::SequenceOf(element) | SchemaKind::SetOf(element), Value::SequenceOf(items)) => {
                schema.size().check("SEQUENCE OF size", items.len() as i128)?;
                self.open_indefinite();
                self.encode_elements(element, items)?;
                self.close_indefinite();
                Ok(())
            }
            (SchemaKind::Choice(alternatives), Value::Choice(choice)) => {
                self.encode_choice(alternatives, choice)
            }
            (SchemaKind::OpenType(open), Value::OpenType(open_value)) => {
                let reference = reference.ok_or_else(|| {
                    CdrError::UnexportedOrMalformedSchema(
                        "open type outside a SEQUENCE has no reference field".to_string(),
                    )
                })?;
                self.encode_open_type(open, reference, open_value)
            }
            _ if schema.is_constructed() || is_transparent(schema) => {
                Err(mismatch(schema.kind().name(), value))
            }
            _ => {
                let contents = primitive_contents(schema, value)?;
                log::trace!(
                    "BER {} contents {:02X?}",
                    schema.kind().name(),
                    contents
                );
                self.encode_primitive_contents(&contents);
                Ok(())
            }
        }
    }

    fn encode_sequence(&mut self, fields: &[Field], record: &SequenceValue) -> CdrResult<()> {
        check_record(fields, record)?;
        log::debug!("encoding SEQUENCE with {} present fields", record.len());

        for (position, field) in fields.iter().enumerate() {
            let Some(value) = record.get(&field.name) else {
                continue;
            };
            let offset = self.offset();
            let reference = match field.schema.kind() {
                SchemaKind::OpenType(open) => {
                    Some(resolve_reference(fields, position, record, open.reference_field()))
                }
                _ => None,
            };
            reference
                .transpose()
                .and_then(|reference| self.encode_node(&field.schema, value, reference))
                .map_err(|err| err.with_context(&field.name, offset))?;
        }
        Ok(())
    }

    fn encode_elements(&mut self, element: &Schema, items: &[Value]) -> CdrResult<()> {
        log::debug!("encoding SEQUENCE OF with {} elements", items.len());
        for (index, item) in items.iter().enumerate() {
            let offset = self.offset();
            self.encode_node(element, item, None)
                .map_err(|err| err.with_context(&index.to_string(), offset))?;
        }
        Ok(())
    }

    fn encode_choice(&mut self, alternatives: &[Field], choice: &ChoiceValue) -> CdrResult<()> {
        let alternative = choice
            .index
            .checked_sub(1)
            .and_then(|position| alternatives.get(position))
            .ok_or(CdrError::InvalidChoiceIndex {
                index: choice.index as u64,
                alternatives: alternatives.len(),
            })?;
        log::debug!("encoding CHOICE alternative {} `{}`", choice.index, alternative.name);

        let offset = self.offset();
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
        log::debug!("encoding open type alternative `{}`", alternative.name);

        let offset = self.offset();
        self.encode_node(&alternative.schema, &value.value, None)
            .map_err(|err| err.with_context(&alternative.name, offset))
    }
}

/// Contents octets of a primitive value, after its constraint checks
fn primitive_contents(schema: &Schema, value: &Value) -> CdrResult<Vec<u8>> {
    match (schema.kind(), value) {
        (SchemaKind::Boolean, Value::Bool(value)) => Ok(vec![if *value { 0xFF } else { 0x00 }]),
        (SchemaKind::Integer, Value::Int(value)) => {
            schema.value_constraint().check("INTEGER", *value as i128)?;
            Ok(signed_octets(*value))
        }
        (SchemaKind::Enumerated, Value::Enumerated(value)) => {
            schema.value_constraint().check("ENUMERATED", *value as i128)?;
            Ok(guarded_unsigned_octets(*value))
        }
        (SchemaKind::BitString, Value::BitString(bits)) => {
            schema.size().check("BIT STRING size", bits.num_bits() as i128)?;
            let mut contents = Vec::with_capacity(bits.as_bytes().len() + 1);
            contents.push(bits.unused_bits());
            contents.extend_from_slice(bits.as_bytes());
            Ok(contents)
        }
        (SchemaKind::OctetString, Value::OctetString(bytes)) => {
            schema.size().check("OCTET STRING size", bytes.len() as i128)?;
            Ok(bytes.clone())
        }
        (SchemaKind::CharString(_), Value::CharString(text)) => {
            schema.size().check("character string size", text.len() as i128)?;
            Ok(text.as_bytes().to_vec())
        }
        (SchemaKind::Null, Value::Null) => Ok(Vec::new()),
        (kind, value) => Err(mismatch(kind.name(), value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field;
    use cdr_core::BitString;

    fn encode(schema: &Schema, value: &Value) -> CdrResult<Vec<u8>> {
        let mut encoder = BerEncoder::new();
        encoder.encode(schema, value)?;
        Ok(encoder.into_bytes())
    }

    #[test]
    fn test_encode_tlv() {
        let mut encoder = BerEncoder::with_capacity(8);
        encoder.encode_tlv(&BerTag::context_specific(false, 2), &[0x01, 0x02]);
        assert_eq!(encoder.len(), 4);
        assert_eq!(encoder.into_bytes(), vec![0x82, 0x02, 0x01, 0x02]);
    }

    #[test]
    fn test_encode_integers() {
        let schema = Schema::integer().explicit();
        let cases: [(i64, &[u8]); 6] = [
            (10, &[0x02, 0x01, 0x0A]),
            (127, &[0x02, 0x01, 0x7F]),
            (128, &[0x02, 0x02, 0x00, 0x80]),
            (-128, &[0x02, 0x01, 0x80]),
            (-129, &[0x02, 0x02, 0xFF, 0x7F]),
            (0, &[0x02, 0x01, 0x00]),
        ];
        for (value, expected) in cases {
            assert_eq!(encode(&schema, &Value::Int(value)).unwrap(), expected, "{}", value);
        }
    }

    #[test]
    fn test_encode_boolean_and_enumerated() {
        let schema = Schema::boolean().explicit();
        assert_eq!(encode(&schema, &Value::Bool(true)).unwrap(), vec![0x01, 0x01, 0xFF]);
        assert_eq!(encode(&schema, &Value::Bool(false)).unwrap(), vec![0x01, 0x01, 0x00]);

        let schema = Schema::enumerated(0, 200).explicit();
        assert_eq!(encode(&schema, &Value::Enumerated(127)).unwrap(), vec![0x0A, 0x01, 0x7F]);
        assert_eq!(
            encode(&schema, &Value::Enumerated(128)).unwrap(),
            vec![0x0A, 0x02, 0x00, 0x80]
        );
        assert!(matches!(
            encode(&schema, &Value::Enumerated(201)),
            Err(CdrError::ValueOutOfRange(_))
        ));
    }

    #[test]
    fn test_encode_strings() {
        let bits = BitString::new(vec![0x81, 0xF0], 12).unwrap();
        assert_eq!(
            encode(&Schema::bit_string().explicit(), &Value::BitString(bits)).unwrap(),
            vec![0x03, 0x03, 0x04, 0x81, 0xF0]
        );
        assert_eq!(
            encode(&Schema::octet_string().explicit(), &Value::OctetString(vec![1, 2, 3])).unwrap(),
            vec![0x04, 0x03, 0x01, 0x02, 0x03]
        );

        let long = "x".repeat(128);
        let bytes = encode(&Schema::utf8_string().explicit(), &Value::from(long.as_str())).unwrap();
        assert_eq!(&bytes[..3], &[0x0C, 0x81, 0x80]);
        assert_eq!(bytes.len(), 131);

        let bytes = encode(&Schema::ia5_string().tagged(3), &Value::from("ab")).unwrap();
        assert_eq!(bytes, vec![0x83, 0x02, b'a', b'b']);
    }

    #[test]
    fn test_encode_sequences() {
        let schema = Schema::sequence(vec![
            field("a", Schema::integer().tagged(0)),
            field("b", Schema::integer().tagged(1).optional()),
        ])
        .explicit();
        let value = Value::Sequence(SequenceValue::new().with("a", 64i64).with("b", 65i64));
        assert_eq!(
            encode(&schema, &value).unwrap(),
            vec![0x30, 0x80, 0x80, 0x01, 0x40, 0x81, 0x01, 0x41, 0x00, 0x00]
        );

        let nested = Schema::sequence(vec![
            field("x", Schema::set(vec![field("a", Schema::integer().tagged(0))]).tagged(0)),
            field("y", Schema::sequence(vec![field("a", Schema::integer().tagged(0))]).tagged(1)),
        ])
        .explicit();
        let value = Value::Sequence(
            SequenceValue::new()
                .with("x", SequenceValue::new().with("a", 64i64))
                .with("y", SequenceValue::new().with("a", 65i64)),
        );
        assert_eq!(
            encode(&nested, &value).unwrap(),
            vec![
                0x30, 0x80, 0xA0, 0x80, 0x80, 0x01, 0x40, 0x00, 0x00, 0xA1, 0x80, 0x80, 0x01,
                0x41, 0x00, 0x00, 0x00, 0x00
            ]
        );
    }

    #[test]
    fn test_encode_choices() {
        let schema = Schema::choice(vec![
            field("int", Schema::integer().tagged(0)),
            field("bits", Schema::bit_string().tagged(1)),
            field(
                "seq",
                Schema::sequence(vec![field("a", Schema::integer().tagged(0))]).tagged(2),
            ),
            field("far", Schema::integer().tagged(32)),
        ]);
        assert_eq!(
            encode(&schema, &Value::choice(1, Value::Int(0))).unwrap(),
            vec![0x80, 0x01, 0x00]
        );
        let bits = BitString::new(vec![0x80], 1).unwrap();
        assert_eq!(
            encode(&schema, &Value::choice(2, Value::BitString(bits))).unwrap(),
            vec![0x81, 0x02, 0x07, 0x80]
        );
        let record = SequenceValue::new().with("a", 64i64);
        assert_eq!(
            encode(&schema, &Value::choice(3, Value::Sequence(record))).unwrap(),
            vec![0xA2, 0x80, 0x80, 0x01, 0x40, 0x00, 0x00]
        );
        assert_eq!(
            encode(&schema, &Value::choice(4, Value::Int(0))).unwrap(),
            vec![0x9F, 0x20, 0x01, 0x00]
        );
        assert!(matches!(
            encode(&schema, &Value::choice(0, Value::Int(0))),
            Err(CdrError::InvalidChoiceIndex { index: 0, alternatives: 4 })
        ));
    }

    #[test]
    fn test_encode_tagged_choice_in_sequence() {
        let schema = Schema::sequence(vec![
            field("a", Schema::integer().tagged(0)),
            field(
                "b",
                Schema::choice(vec![
                    field("x", Schema::integer().tagged(0)),
                    field("y", Schema::boolean().tagged(1)),
                ])
                .tagged(1),
            ),
        ])
        .explicit();
        let value = Value::Sequence(
            SequenceValue::new()
                .with("a", 1i64)
                .with("b", Value::choice(1, Value::Int(0))),
        );
        assert_eq!(
            encode(&schema, &value).unwrap(),
            vec![
                0x30, 0x80, 0x80, 0x01, 0x01, 0xA1, 0x80, 0x80, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00
            ]
        );
    }

    #[test]
    fn test_encode_explicit_tag_wraps_universal() {
        let schema = Schema::integer().tagged(5).explicit();
        assert_eq!(
            encode(&schema, &Value::Int(1)).unwrap(),
            vec![0xA5, 0x80, 0x02, 0x01, 0x01, 0x00, 0x00]
        );
    }

    #[test]
    fn test_encode_errors_carry_path() {
        let schema = Schema::sequence(vec![field(
            "list",
            Schema::sequence_of(Schema::integer().value_range(0, 9).tagged(0)),
        )]);
        let value = Value::Sequence(SequenceValue::new().with(
            "list",
            Value::SequenceOf(vec![Value::Int(1), Value::Int(10)]),
        ));
        let err = encode(&schema, &value).unwrap_err();
        assert_eq!(err.path(), Some("list.1"));
        assert!(matches!(err.root(), CdrError::ValueOutOfRange(_)));

        let err = encode(&Schema::boolean(), &Value::Int(1)).unwrap_err();
        assert!(matches!(err, CdrError::ValueMismatch(_)));
    }
}

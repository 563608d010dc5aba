//! Decoded record values
//!
//! A [`Value`] tree runs parallel to the [`Schema`](crate::Schema) tree it
//! was decoded with (or is about to be encoded with).

use crate::schema::Field;
use cdr_core::{BitString, CdrError, CdrResult};
use serde::{Deserialize, Serialize};

/// One value of a record tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Enumerated(u64),
    BitString(BitString),
    OctetString(#[serde(with = "serde_bytes")] Vec<u8>),
    CharString(String),
    Null,
    Sequence(SequenceValue),
    SequenceOf(Vec<Value>),
    Choice(ChoiceValue),
    OpenType(OpenTypeValue),
}

impl Value {
    /// Short name of the variant, used in mismatch diagnostics
    pub fn variant_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Enumerated(_) => "Enumerated",
            Value::BitString(_) => "BitString",
            Value::OctetString(_) => "OctetString",
            Value::CharString(_) => "CharString",
            Value::Null => "Null",
            Value::Sequence(_) => "Sequence",
            Value::SequenceOf(_) => "SequenceOf",
            Value::Choice(_) => "Choice",
            Value::OpenType(_) => "OpenType",
        }
    }

    /// Build a CHOICE value selecting the 1-based alternative `index`
    pub fn choice(index: usize, value: Value) -> Self {
        Value::Choice(ChoiceValue::new(index, value))
    }

    /// Build an OPEN TYPE value for discriminant `reference`
    pub fn open_type(reference: i64, value: Value) -> Self {
        Value::OpenType(OpenTypeValue::new(reference, value))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&SequenceValue> {
        match self {
            Value::Sequence(sequence) => Some(sequence),
            _ => None,
        }
    }
}

/// Error for a value whose shape differs from its schema node
pub(crate) fn mismatch(expected: &str, value: &Value) -> CdrError {
    CdrError::ValueMismatch(format!(
        "expected {}, found {}",
        expected,
        value.variant_name()
    ))
}

/// Check that a record only names declared fields and has every mandatory one
pub(crate) fn check_record(fields: &[Field], record: &SequenceValue) -> CdrResult<()> {
    for (position, (name, _)) in record.iter().enumerate() {
        if !fields.iter().any(|field| field.name == name) {
            return Err(CdrError::ValueMismatch(format!("undeclared field `{}`", name)));
        }
        if record.iter().take(position).any(|(earlier, _)| earlier == name) {
            return Err(CdrError::ValueMismatch(format!("field `{}` given twice", name)));
        }
    }
    for field in fields {
        if !field.schema.is_optional() && !record.contains(&field.name) {
            return Err(CdrError::ValueMismatch(format!(
                "mandatory field `{}` is missing",
                field.name
            )));
        }
    }
    Ok(())
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::CharString(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::CharString(value.to_string())
    }
}

impl From<BitString> for Value {
    fn from(value: BitString) -> Self {
        Value::BitString(value)
    }
}

impl From<SequenceValue> for Value {
    fn from(value: SequenceValue) -> Self {
        Value::Sequence(value)
    }
}

/// Present fields of a SEQUENCE or SET, in schema order
///
/// Absent OPTIONAL fields have no entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceValue {
    fields: Vec<(String, Value)>,
}

impl SequenceValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`SequenceValue::push`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Selected CHOICE alternative; `index` is 1-based
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceValue {
    pub index: usize,
    pub value: Box<Value>,
}

impl ChoiceValue {
    pub fn new(index: usize, value: Value) -> Self {
        Self {
            index,
            value: Box::new(value),
        }
    }
}

/// OPEN TYPE payload with the discriminant that selected its alternative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenTypeValue {
    pub reference: i64,
    pub value: Box<Value>,
}

impl OpenTypeValue {
    pub fn new(reference: i64, value: Value) -> Self {
        Self {
            reference,
            value: Box::new(value),
        }
    }
}

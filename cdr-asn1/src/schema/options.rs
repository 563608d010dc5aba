//! Schema option strings
//!
//! Record definitions describe their fields with comma separated option
//! strings such as `tagNum:3,optional,sizeLB:1,sizeUB:8`. [`FieldOptions`]
//! parses such a string and [`Schema::with_options`] applies it to a node.

use super::{Schema, SchemaKind, StringKind, Tag, TagClass};
use cdr_core::{CdrError, CdrResult};
use std::str::FromStr;

/// Structure flavour requested by `seq`, `set` or `choice`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureKind {
    Sequence,
    Set,
    Choice,
}

/// Parsed option string of one field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldOptions {
    pub tag_number: Option<u32>,
    pub tag_class: Option<TagClass>,
    pub structure: Option<StructureKind>,
    pub optional: bool,
    pub explicit: bool,
    pub size_lower: Option<i64>,
    pub size_upper: Option<i64>,
    pub size_extensible: bool,
    pub value_lower: Option<i64>,
    pub value_upper: Option<i64>,
    pub value_extensible: bool,
    pub open_type: bool,
    pub reference_field_name: Option<String>,
    pub reference_field_value: Option<i64>,
    pub string_kind: Option<StringKind>,
}

fn malformed(message: String) -> CdrError {
    CdrError::UnexportedOrMalformedSchema(message)
}

fn parse_number<T: FromStr>(key: &str, value: Option<&str>) -> CdrResult<T> {
    let value = value.ok_or_else(|| malformed(format!("option `{}` needs a value", key)))?;
    value
        .trim()
        .parse()
        .map_err(|_| malformed(format!("option `{}` has invalid value `{}`", key, value)))
}

fn set_once<T>(slot: &mut Option<T>, key: &str, value: T) -> CdrResult<()> {
    if slot.is_some() {
        return Err(malformed(format!("option `{}` given twice", key)));
    }
    *slot = Some(value);
    Ok(())
}

impl FromStr for FieldOptions {
    type Err = CdrError;

    fn from_str(text: &str) -> CdrResult<Self> {
        let mut options = FieldOptions::default();

        for item in text.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            let (key, value) = match item.split_once(':') {
                Some((key, value)) => (key.trim(), Some(value)),
                None => (item, None),
            };

            match key {
                "tagNum" => {
                    let number = parse_number(key, value)?;
                    set_once(&mut options.tag_number, key, number)?;
                }
                "application" => set_once(&mut options.tag_class, key, TagClass::Application)?,
                "private" => set_once(&mut options.tag_class, key, TagClass::Private)?,
                "universal" => set_once(&mut options.tag_class, key, TagClass::Universal)?,
                "seq" => set_once(&mut options.structure, key, StructureKind::Sequence)?,
                "set" => set_once(&mut options.structure, key, StructureKind::Set)?,
                "choice" => set_once(&mut options.structure, key, StructureKind::Choice)?,
                "optional" => options.optional = true,
                "explicit" => options.explicit = true,
                "sizeLB" => {
                    let bound = parse_number(key, value)?;
                    set_once(&mut options.size_lower, key, bound)?;
                }
                "sizeUB" => {
                    let bound = parse_number(key, value)?;
                    set_once(&mut options.size_upper, key, bound)?;
                }
                "valueLB" => {
                    let bound = parse_number(key, value)?;
                    set_once(&mut options.value_lower, key, bound)?;
                }
                "valueUB" => {
                    let bound = parse_number(key, value)?;
                    set_once(&mut options.value_upper, key, bound)?;
                }
                "sizeExt" => options.size_extensible = true,
                "valueExt" => options.value_extensible = true,
                "openType" => options.open_type = true,
                "referenceFieldName" => {
                    let name = value
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .ok_or_else(|| malformed(format!("option `{}` needs a value", key)))?;
                    set_once(&mut options.reference_field_name, key, name.to_string())?;
                }
                "referenceFieldValue" => {
                    let reference = parse_number(key, value)?;
                    set_once(&mut options.reference_field_value, key, reference)?;
                }
                "utf8" => set_once(&mut options.string_kind, key, StringKind::Utf8)?,
                "ia5" => set_once(&mut options.string_kind, key, StringKind::Ia5)?,
                "graphic" => set_once(&mut options.string_kind, key, StringKind::Graphic)?,
                unknown => return Err(malformed(format!("unknown option `{}`", unknown))),
            }
        }

        Ok(options)
    }
}

impl FieldOptions {
    /// Apply the options to a schema node
    ///
    /// # Errors
    /// Returns `UnexportedOrMalformedSchema` when an option does not fit the
    /// node kind (e.g. `ia5` on an INTEGER or `choice` on a SEQUENCE OF).
    pub fn apply(&self, schema: &mut Schema) -> CdrResult<()> {
        match (self.tag_number, self.tag_class) {
            (Some(number), class) => {
                schema.tag = Some(Tag {
                    class: class.unwrap_or(TagClass::ContextSpecific),
                    number,
                });
            }
            (None, Some(_)) => {
                return Err(malformed("tag class given without tagNum".to_string()));
            }
            (None, None) => {}
        }

        schema.optional |= self.optional;
        schema.explicit |= self.explicit;

        if self.size_lower.is_some() {
            schema.size.lower = self.size_lower;
        }
        if self.size_upper.is_some() {
            schema.size.upper = self.size_upper;
        }
        schema.size.extensible |= self.size_extensible;
        if self.value_lower.is_some() {
            schema.value.lower = self.value_lower;
        }
        if self.value_upper.is_some() {
            schema.value.upper = self.value_upper;
        }
        schema.value.extensible |= self.value_extensible;

        if let Some(kind) = self.string_kind {
            match &mut schema.kind {
                SchemaKind::CharString(current) => *current = kind,
                other => {
                    return Err(malformed(format!(
                        "string option on {} field",
                        other.name()
                    )));
                }
            }
        }

        if let Some(structure) = self.structure {
            let kind = std::mem::replace(&mut schema.kind, SchemaKind::Null);
            schema.kind = restructure(kind, structure)?;
        }

        if self.open_type || self.reference_field_name.is_some() {
            match &mut schema.kind {
                SchemaKind::OpenType(open) => {
                    if let Some(name) = &self.reference_field_name {
                        open.reference_field = name.clone();
                    }
                }
                other => {
                    return Err(malformed(format!(
                        "open type option on {} field",
                        other.name()
                    )));
                }
            }
        }

        if let Some(reference) = self.reference_field_value {
            schema.reference_value = Some(reference);
        }

        Ok(())
    }
}

fn restructure(kind: SchemaKind, structure: StructureKind) -> CdrResult<SchemaKind> {
    Ok(match (structure, kind) {
        (StructureKind::Sequence, SchemaKind::Sequence(fields) | SchemaKind::Set(fields)) => {
            SchemaKind::Sequence(fields)
        }
        (StructureKind::Sequence, SchemaKind::SequenceOf(element) | SchemaKind::SetOf(element)) => {
            SchemaKind::SequenceOf(element)
        }
        (StructureKind::Set, SchemaKind::Sequence(fields) | SchemaKind::Set(fields)) => {
            SchemaKind::Set(fields)
        }
        (StructureKind::Set, SchemaKind::SequenceOf(element) | SchemaKind::SetOf(element)) => {
            SchemaKind::SetOf(element)
        }
        (
            StructureKind::Choice,
            SchemaKind::Choice(fields) | SchemaKind::Sequence(fields) | SchemaKind::Set(fields),
        ) => SchemaKind::Choice(fields),
        (structure, other) => {
            return Err(malformed(format!(
                "{:?} option on {} field",
                structure,
                other.name()
            )));
        }
    })
}

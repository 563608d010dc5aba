//! Schema tree describing the layout of a record
//!
//! A [`Schema`] node is built once (usually into a static) and shared
//! read-only by every encode and decode call. Each node carries the ASN.1
//! type kind, its tag, OPTIONAL flag and size/value constraints. Compound
//! kinds own their children as named [`Field`]s in declaration order.
//!
//! Nodes are constructed with the kind constructors and refined with the
//! builder methods:
//!
//! ```rust,no_run
//! use cdr_asn1::{field, Schema};
//!
//! let used_units = Schema::sequence(vec![
//!     field("localSequenceNumber", Schema::integer().tagged(1).optional()),
//!     field("serviceSpecificUnits", Schema::integer().tagged(4).optional()),
//! ]);
//! ```

mod options;

pub use options::{FieldOptions, StructureKind};

use crate::ber::types::{universal, BerTag};
use cdr_core::{CdrError, CdrResult};
use std::collections::BTreeMap;

pub use crate::ber::types::BerTagClass as TagClass;

/// Tag of a schema node (class and number)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    pub class: TagClass,
    pub number: u32,
}

impl Tag {
    /// Context-specific tag `[number]`
    pub fn context(number: u32) -> Self {
        Self {
            class: TagClass::ContextSpecific,
            number,
        }
    }
}

/// Size or value constraint `(lower..upper, ...)`
///
/// Missing bounds mean the corresponding side is unconstrained. An
/// extensible constraint (`...`) admits values outside the root range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Constraint {
    pub lower: Option<i64>,
    pub upper: Option<i64>,
    pub extensible: bool,
}

impl Constraint {
    /// No bounds at all
    pub const fn unconstrained() -> Self {
        Self {
            lower: None,
            upper: None,
            extensible: false,
        }
    }

    /// Both bounds known
    pub const fn range(lower: i64, upper: i64) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
            extensible: false,
        }
    }

    /// Number of values in the root range, when both bounds are known
    pub fn span(&self) -> Option<u128> {
        match (self.lower, self.upper) {
            (Some(lower), Some(upper)) if upper >= lower => {
                Some((upper as i128 - lower as i128 + 1) as u128)
            }
            _ => None,
        }
    }

    /// Whether `value` lies inside the root range
    pub fn contains(&self, value: i128) -> bool {
        self.lower.is_none_or(|lower| value >= lower as i128)
            && self.upper.is_none_or(|upper| value <= upper as i128)
    }

    /// Check a value against the constraint, honouring extensibility
    pub fn check(&self, what: &str, value: i128) -> CdrResult<()> {
        if self.extensible || self.contains(value) {
            Ok(())
        } else {
            Err(CdrError::ValueOutOfRange(format!(
                "{} {} outside {}",
                what, value, self
            )))
        }
    }
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.lower {
            Some(lower) => write!(f, "({}..", lower)?,
            None => write!(f, "(MIN..")?,
        }
        match self.upper {
            Some(upper) => write!(f, "{}", upper)?,
            None => write!(f, "MAX")?,
        }
        if self.extensible {
            write!(f, ", ...")?;
        }
        write!(f, ")")
    }
}

/// Character string flavours; they differ only in their universal tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StringKind {
    #[default]
    Utf8,
    Ia5,
    Graphic,
}

impl StringKind {
    pub fn universal_tag(self) -> u32 {
        match self {
            StringKind::Utf8 => universal::UTF8_STRING,
            StringKind::Ia5 => universal::IA5_STRING,
            StringKind::Graphic => universal::GRAPHIC_STRING,
        }
    }
}

/// ASN.1 types the engine knows by name but does not encode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnsupportedKind {
    Real,
    ObjectIdentifier,
    RelativeOid,
    GeneralizedTime,
    UtcTime,
    Time,
    Date,
    TimeOfDay,
    DateTime,
    Duration,
    NumericString,
    PrintableString,
    TeletexString,
    VideotexString,
    VisibleString,
    GeneralString,
    BmpString,
    CharacterString,
    InstanceOf,
    EmbeddedPdv,
    External,
}

impl UnsupportedKind {
    pub fn name(self) -> &'static str {
        match self {
            UnsupportedKind::Real => "REAL",
            UnsupportedKind::ObjectIdentifier => "OBJECT IDENTIFIER",
            UnsupportedKind::RelativeOid => "RELATIVE-OID",
            UnsupportedKind::GeneralizedTime => "GeneralizedTime",
            UnsupportedKind::UtcTime => "UTCTime",
            UnsupportedKind::Time => "TIME",
            UnsupportedKind::Date => "DATE",
            UnsupportedKind::TimeOfDay => "TIME-OF-DAY",
            UnsupportedKind::DateTime => "DATE-TIME",
            UnsupportedKind::Duration => "DURATION",
            UnsupportedKind::NumericString => "NumericString",
            UnsupportedKind::PrintableString => "PrintableString",
            UnsupportedKind::TeletexString => "TeletexString",
            UnsupportedKind::VideotexString => "VideotexString",
            UnsupportedKind::VisibleString => "VisibleString",
            UnsupportedKind::GeneralString => "GeneralString",
            UnsupportedKind::BmpString => "BMPString",
            UnsupportedKind::CharacterString => "CHARACTER STRING",
            UnsupportedKind::InstanceOf => "INSTANCE OF",
            UnsupportedKind::EmbeddedPdv => "EMBEDDED PDV",
            UnsupportedKind::External => "EXTERNAL",
        }
    }
}

/// Named child of a SEQUENCE, SET, CHOICE or OPEN TYPE
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// Shorthand for [`Field::new`]
pub fn field(name: impl Into<String>, schema: Schema) -> Field {
    Field::new(name, schema)
}

/// OPEN TYPE: the actual type is chosen by the value of a sibling field
///
/// Every alternative declares its discriminant with
/// [`Schema::reference_value`]. The discriminant → alternative map is built
/// once here, so resolving an alternative is a single lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenTypeSchema {
    reference_field: String,
    alternatives: Vec<Field>,
    cases: BTreeMap<i64, usize>,
}

impl OpenTypeSchema {
    /// Build the open type and its case map
    ///
    /// # Errors
    /// Returns `UnexportedOrMalformedSchema` if an alternative has no
    /// discriminant or two alternatives share one.
    pub fn new(reference_field: impl Into<String>, alternatives: Vec<Field>) -> CdrResult<Self> {
        let mut cases = BTreeMap::new();
        for (index, alternative) in alternatives.iter().enumerate() {
            let discriminant = alternative.schema.reference_value().ok_or_else(|| {
                CdrError::UnexportedOrMalformedSchema(format!(
                    "open type alternative `{}` has no reference value",
                    alternative.name
                ))
            })?;
            if cases.insert(discriminant, index).is_some() {
                return Err(CdrError::UnexportedOrMalformedSchema(format!(
                    "open type reference value {} declared twice",
                    discriminant
                )));
            }
        }
        Ok(Self {
            reference_field: reference_field.into(),
            alternatives,
            cases,
        })
    }

    pub fn reference_field(&self) -> &str {
        &self.reference_field
    }

    pub fn alternatives(&self) -> &[Field] {
        &self.alternatives
    }

    /// Alternative selected by a discriminant
    pub fn case_for(&self, reference: i64) -> CdrResult<&Field> {
        self.cases
            .get(&reference)
            .map(|&index| &self.alternatives[index])
            .ok_or(CdrError::OpenTypeReferenceMismatch(reference))
    }
}

/// Type kind of a schema node
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Boolean,
    Integer,
    Enumerated,
    BitString,
    OctetString,
    CharString(StringKind),
    Null,
    Sequence(Vec<Field>),
    Set(Vec<Field>),
    SequenceOf(Box<Schema>),
    SetOf(Box<Schema>),
    Choice(Vec<Field>),
    OpenType(OpenTypeSchema),
    Unsupported(UnsupportedKind),
}

impl SchemaKind {
    /// ASN.1 name of the kind, used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            SchemaKind::Boolean => "BOOLEAN",
            SchemaKind::Integer => "INTEGER",
            SchemaKind::Enumerated => "ENUMERATED",
            SchemaKind::BitString => "BIT STRING",
            SchemaKind::OctetString => "OCTET STRING",
            SchemaKind::CharString(StringKind::Utf8) => "UTF8String",
            SchemaKind::CharString(StringKind::Ia5) => "IA5String",
            SchemaKind::CharString(StringKind::Graphic) => "GraphicString",
            SchemaKind::Null => "NULL",
            SchemaKind::Sequence(_) => "SEQUENCE",
            SchemaKind::Set(_) => "SET",
            SchemaKind::SequenceOf(_) => "SEQUENCE OF",
            SchemaKind::SetOf(_) => "SET OF",
            SchemaKind::Choice(_) => "CHOICE",
            SchemaKind::OpenType(_) => "OPEN TYPE",
            SchemaKind::Unsupported(kind) => kind.name(),
        }
    }
}

/// One node of a record schema
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    kind: SchemaKind,
    tag: Option<Tag>,
    explicit: bool,
    optional: bool,
    size: Constraint,
    value: Constraint,
    reference_value: Option<i64>,
}

impl Schema {
    fn of(kind: SchemaKind) -> Self {
        Self {
            kind,
            tag: None,
            explicit: false,
            optional: false,
            size: Constraint::unconstrained(),
            value: Constraint::unconstrained(),
            reference_value: None,
        }
    }

    pub fn boolean() -> Self {
        Self::of(SchemaKind::Boolean)
    }

    pub fn integer() -> Self {
        Self::of(SchemaKind::Integer)
    }

    /// ENUMERATED with its root values `lower..=upper`
    pub fn enumerated(lower: i64, upper: i64) -> Self {
        Self::of(SchemaKind::Enumerated).value_range(lower, upper)
    }

    pub fn bit_string() -> Self {
        Self::of(SchemaKind::BitString)
    }

    pub fn octet_string() -> Self {
        Self::of(SchemaKind::OctetString)
    }

    pub fn char_string(kind: StringKind) -> Self {
        Self::of(SchemaKind::CharString(kind))
    }

    pub fn utf8_string() -> Self {
        Self::char_string(StringKind::Utf8)
    }

    pub fn ia5_string() -> Self {
        Self::char_string(StringKind::Ia5)
    }

    pub fn graphic_string() -> Self {
        Self::char_string(StringKind::Graphic)
    }

    pub fn null() -> Self {
        Self::of(SchemaKind::Null)
    }

    pub fn sequence(fields: Vec<Field>) -> Self {
        Self::of(SchemaKind::Sequence(fields))
    }

    pub fn set(fields: Vec<Field>) -> Self {
        Self::of(SchemaKind::Set(fields))
    }

    pub fn sequence_of(element: Schema) -> Self {
        Self::of(SchemaKind::SequenceOf(Box::new(element)))
    }

    pub fn set_of(element: Schema) -> Self {
        Self::of(SchemaKind::SetOf(Box::new(element)))
    }

    pub fn choice(alternatives: Vec<Field>) -> Self {
        Self::of(SchemaKind::Choice(alternatives))
    }

    /// OPEN TYPE whose alternative is selected by the sibling `reference_field`
    pub fn open_type(reference_field: impl Into<String>, alternatives: Vec<Field>) -> CdrResult<Self> {
        Ok(Self::of(SchemaKind::OpenType(OpenTypeSchema::new(
            reference_field,
            alternatives,
        )?)))
    }

    /// A type the engine refuses to encode or decode
    pub fn unsupported(kind: UnsupportedKind) -> Self {
        Self::of(SchemaKind::Unsupported(kind))
    }

    /// Context-specific tag `[number]`
    pub fn tagged(self, number: u32) -> Self {
        self.tagged_with(TagClass::ContextSpecific, number)
    }

    pub fn tagged_with(mut self, class: TagClass, number: u32) -> Self {
        self.tag = Some(Tag { class, number });
        self
    }

    /// Tagged nodes get an EXPLICIT wrapper; untagged nodes carry their universal identifier
    pub fn explicit(mut self) -> Self {
        self.explicit = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn size_range(mut self, lower: i64, upper: i64) -> Self {
        self.size.lower = Some(lower);
        self.size.upper = Some(upper);
        self
    }

    pub fn size_lower(mut self, lower: i64) -> Self {
        self.size.lower = Some(lower);
        self
    }

    pub fn size_extensible(mut self) -> Self {
        self.size.extensible = true;
        self
    }

    pub fn value_range(mut self, lower: i64, upper: i64) -> Self {
        self.value.lower = Some(lower);
        self.value.upper = Some(upper);
        self
    }

    pub fn value_lower(mut self, lower: i64) -> Self {
        self.value.lower = Some(lower);
        self
    }

    pub fn value_extensible(mut self) -> Self {
        self.value.extensible = true;
        self
    }

    /// Discriminant of this node when it is an OPEN TYPE alternative
    pub fn with_reference_value(mut self, reference: i64) -> Self {
        self.reference_value = Some(reference);
        self
    }

    /// Apply a parsed option string (`tagNum:1,optional,...`)
    pub fn with_options(mut self, options: &FieldOptions) -> CdrResult<Self> {
        options.apply(&mut self)?;
        Ok(self)
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    pub fn tag(&self) -> Option<Tag> {
        self.tag
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn size(&self) -> &Constraint {
        &self.size
    }

    pub fn value_constraint(&self) -> &Constraint {
        &self.value
    }

    pub fn reference_value(&self) -> Option<i64> {
        self.reference_value
    }

    /// Whether the contents of this node are themselves TLVs
    pub fn is_constructed(&self) -> bool {
        matches!(
            self.kind,
            SchemaKind::Sequence(_)
                | SchemaKind::Set(_)
                | SchemaKind::SequenceOf(_)
                | SchemaKind::SetOf(_)
                | SchemaKind::Choice(_)
                | SchemaKind::OpenType(_)
        )
    }

    /// Universal identifier of the kind, if it has one
    pub fn universal_tag(&self) -> Option<BerTag> {
        let number = match &self.kind {
            SchemaKind::Boolean => universal::BOOLEAN,
            SchemaKind::Integer => universal::INTEGER,
            SchemaKind::Enumerated => universal::ENUMERATED,
            SchemaKind::BitString => universal::BIT_STRING,
            SchemaKind::OctetString => universal::OCTET_STRING,
            SchemaKind::CharString(kind) => kind.universal_tag(),
            SchemaKind::Null => universal::NULL,
            SchemaKind::Sequence(_) | SchemaKind::SequenceOf(_) => universal::SEQUENCE,
            SchemaKind::Set(_) | SchemaKind::SetOf(_) => universal::SET,
            SchemaKind::Choice(_) | SchemaKind::OpenType(_) | SchemaKind::Unsupported(_) => {
                return None;
            }
        };
        Some(BerTag::universal(self.is_constructed(), number))
    }

    /// Fail fast on kinds the engine does not implement
    pub(crate) fn unsupported_error(kind: UnsupportedKind) -> CdrError {
        CdrError::UnsupportedType(format!("{} is not implemented", kind.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_span() {
        assert_eq!(Constraint::range(0, 127).span(), Some(128));
        assert_eq!(Constraint::range(-5, 5).span(), Some(11));
        assert_eq!(Constraint::range(i64::MIN, i64::MAX).span(), Some(1u128 << 64));
        assert_eq!(Constraint::unconstrained().span(), None);
        assert_eq!(Constraint::range(3, 1).span(), None);
    }

    #[test]
    fn test_constraint_check() {
        let constraint = Constraint::range(1, 10);
        assert!(constraint.check("value", 10).is_ok());
        assert!(matches!(
            constraint.check("value", 11),
            Err(CdrError::ValueOutOfRange(_))
        ));
        let extensible = Constraint {
            extensible: true,
            ..constraint
        };
        assert!(extensible.check("value", 11).is_ok());
        assert_eq!(extensible.to_string(), "(1..10, ...)");
    }

    #[test]
    fn test_universal_tags() {
        assert_eq!(Schema::integer().universal_tag(), Some(BerTag::universal(false, 2)));
        assert_eq!(
            Schema::sequence(vec![]).universal_tag(),
            Some(BerTag::universal(true, 16))
        );
        assert_eq!(
            Schema::set_of(Schema::integer()).universal_tag(),
            Some(BerTag::universal(true, 17))
        );
        assert_eq!(Schema::ia5_string().universal_tag(), Some(BerTag::universal(false, 22)));
        assert_eq!(Schema::choice(vec![]).universal_tag(), None);
    }

    #[test]
    fn test_open_type_case_map() {
        let open = OpenTypeSchema::new(
            "id",
            vec![
                field("a", Schema::integer().with_reference_value(1)),
                field("b", Schema::boolean().with_reference_value(7)),
            ],
        )
        .unwrap();
        assert_eq!(open.case_for(7).unwrap().name, "b");
        assert!(matches!(
            open.case_for(3),
            Err(CdrError::OpenTypeReferenceMismatch(3))
        ));
    }

    #[test]
    fn test_open_type_rejects_duplicate_discriminant() {
        let result = OpenTypeSchema::new(
            "id",
            vec![
                field("a", Schema::integer().with_reference_value(1)),
                field("b", Schema::boolean().with_reference_value(1)),
            ],
        );
        assert!(matches!(
            result,
            Err(CdrError::UnexportedOrMalformedSchema(_))
        ));
    }

    #[test]
    fn test_open_type_requires_discriminant() {
        let result = Schema::open_type("id", vec![field("a", Schema::integer())]);
        assert!(matches!(
            result,
            Err(CdrError::UnexportedOrMalformedSchema(_))
        ));
    }
}

//! BER (Basic Encoding Rules) encoder and decoder for CDR schemas
//!
//! Charging data records in CDR files are BER encoded. Each value is an
//! identifier/length/contents triplet:
//!
//! ```text
//! [Identifier] [Length] [Contents]
//! ```
//!
//! ## Identifier Encoding
//!
//! ```text
//! Bits: 8 7 6 5 4 3 2 1
//!       C C P T T T T T
//! ```
//! Where:
//! - CC = Class (00=Universal, 01=Application, 10=Context, 11=Private)
//! - P = Primitive (0) or Constructed (1)
//! - TTTTT = Tag number (0-30), or 11111 followed by base-128 octets
//!
//! ## Length Encoding
//!
//! - **Short form**: one octet for lengths 0-127
//! - **Long form**: `0x80 | k` followed by k big-endian length octets
//! - **Indefinite form**: `0x80`, contents closed by the end-of-contents
//!   octets `00 00`
//!
//! Constructed values are always written with the indefinite form. The
//! decoder accepts both definite and indefinite lengths on constructed
//! values; primitives must use a definite length.
//!
//! ## Tagging
//!
//! How a schema node is framed depends on its tag and `explicit` flag:
//!
//! | tag | explicit | framing |
//! |-----|----------|---------|
//! | `[n]` | no | `[n]` replaces the universal identifier |
//! | `[n]` | yes | `[n] 80` + universal TLV + `00 00` |
//! | none | yes | universal identifier |
//! | none | no | length and contents only |
//!
//! CHOICE and OPEN TYPE nodes have no identifier of their own: the selected
//! alternative carries its own framing. A tagged CHOICE or OPEN TYPE is
//! wrapped as `[n] 80` + alternative + `00 00`.

pub mod decoder;
pub mod encoder;
pub mod types;

pub use decoder::BerDecoder;
pub use encoder::BerEncoder;
pub use types::{BerLength, BerTag, BerTagClass};

use crate::schema::{Schema, SchemaKind};

/// Framing of one schema node on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Framing {
    /// Constructed wrapper with indefinite length around the node's body,
    /// itself preceded by `inner` when the node has a universal identifier
    Wrapped { outer: BerTag, inner: Option<BerTag> },
    /// One identifier in front of the body
    Identified(BerTag),
    /// Body only
    Bare,
}

/// CHOICE and OPEN TYPE bodies are the alternative's own encoding
pub(crate) fn is_transparent(schema: &Schema) -> bool {
    matches!(schema.kind(), SchemaKind::Choice(_) | SchemaKind::OpenType(_))
}

pub(crate) fn framing(schema: &Schema) -> Framing {
    let transparent = is_transparent(schema);
    match (schema.tag(), schema.is_explicit()) {
        (Some(tag), explicit) if explicit || transparent => Framing::Wrapped {
            outer: BerTag::new(tag.class, true, tag.number),
            inner: schema.universal_tag(),
        },
        (Some(tag), _) => {
            Framing::Identified(BerTag::new(tag.class, schema.is_constructed(), tag.number))
        }
        (None, true) => match schema.universal_tag() {
            Some(tag) => Framing::Identified(tag),
            None => Framing::Bare,
        },
        (None, false) => Framing::Bare,
    }
}

/// Identifiers a present encoding of `schema` can start with
///
/// `None` means the node cannot be recognised by its first identifier
/// (an untagged primitive, or an OPEN TYPE whose alternative depends on a
/// sibling) and matches anything.
pub(crate) fn leading_tags(schema: &Schema) -> Option<Vec<BerTag>> {
    match framing(schema) {
        Framing::Wrapped { outer, .. } => Some(vec![outer]),
        Framing::Identified(tag) => Some(vec![tag]),
        Framing::Bare => match schema.kind() {
            SchemaKind::Choice(alternatives) => {
                let mut tags = Vec::new();
                for alternative in alternatives {
                    tags.extend(leading_tags(&alternative.schema)?);
                }
                Some(tags)
            }
            _ => None,
        },
    }
}

/// Whether an encoding starting with `tag` may be one of `schema`
pub(crate) fn starts_with(schema: &Schema, tag: &BerTag) -> bool {
    match leading_tags(schema) {
        Some(tags) => tags.iter().any(|candidate| candidate.same_identity(tag)),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{field, TagClass};

    #[test]
    fn test_framing_rules() {
        assert_eq!(framing(&Schema::integer()), Framing::Bare);
        assert_eq!(
            framing(&Schema::integer().explicit()),
            Framing::Identified(BerTag::universal(false, 2))
        );
        assert_eq!(
            framing(&Schema::integer().tagged(3)),
            Framing::Identified(BerTag::context_specific(false, 3))
        );
        assert_eq!(
            framing(&Schema::sequence(vec![]).tagged(1)),
            Framing::Identified(BerTag::context_specific(true, 1))
        );
        assert_eq!(
            framing(&Schema::integer().tagged(3).explicit()),
            Framing::Wrapped {
                outer: BerTag::context_specific(true, 3),
                inner: Some(BerTag::universal(false, 2)),
            }
        );
        assert_eq!(
            framing(&Schema::choice(vec![]).tagged_with(TagClass::Application, 4)),
            Framing::Wrapped {
                outer: BerTag::new(TagClass::Application, true, 4),
                inner: None,
            }
        );
        assert_eq!(framing(&Schema::choice(vec![]).explicit()), Framing::Bare);
    }

    #[test]
    fn test_leading_tags_of_untagged_choice() {
        let schema = Schema::choice(vec![
            field("a", Schema::integer().tagged(0)),
            field(
                "b",
                Schema::choice(vec![field("c", Schema::boolean().tagged(1))]),
            ),
        ]);
        assert_eq!(
            leading_tags(&schema),
            Some(vec![
                BerTag::context_specific(false, 0),
                BerTag::context_specific(false, 1)
            ])
        );
        assert!(starts_with(&schema, &BerTag::context_specific(true, 1)));
        assert!(!starts_with(&schema, &BerTag::context_specific(false, 2)));

        let open = Schema::choice(vec![field("a", Schema::integer())]);
        assert_eq!(leading_tags(&open), None);
        assert!(starts_with(&open, &BerTag::universal(false, 5)));
    }
}

//! ASN.1 encoding engine for 3GPP Charging Data Records
//!
//! This crate converts between a [`Value`] tree and its binary form under
//! the control of an immutable [`Schema`] tree. Two encoding schemes are
//! provided:
//!
//! - **BER** (`ber`): identifier/length/contents framing as used in CDR
//!   files. Constructed values always use the indefinite length form and
//!   are closed with an end-of-contents marker.
//! - **PER** (`per`): bit-packed encoding driven by the size and value
//!   constraints of the schema.
//!
//! Each scheme is the inverse of itself. The top-level [`encode`] and
//! [`decode`] functions use BER; [`encode_with`] and [`decode_with`] take
//! the scheme explicitly.
//!
//! ```rust,no_run
//! use cdr_asn1::{decode, encode, field, Schema, SequenceValue, Value};
//!
//! let schema = Schema::sequence(vec![field("a", Schema::integer().tagged(0))]).explicit();
//! let value = Value::Sequence(SequenceValue::new().with("a", Value::Int(64)));
//! let bytes = encode(&schema, &value)?;
//! assert_eq!(bytes, [0x30, 0x80, 0x80, 0x01, 0x40, 0x00, 0x00]);
//! assert_eq!(decode(&schema, &bytes)?, value);
//! # Ok::<(), cdr_asn1::CdrError>(())
//! ```

pub mod ber;
pub mod engine;
pub mod per;
pub mod schema;
pub mod value;

mod integer;
mod open_type;

pub use cdr_core::{BitString, CdrError, CdrResult};
pub use ber::{BerDecoder, BerEncoder, BerLength, BerTag, BerTagClass};
pub use engine::{decode, decode_with, encode, encode_with, EncodingRules};
pub use per::{BitCursor, BitWriter, PerDecoder, PerEncoder};
pub use schema::{
    field, Constraint, Field, FieldOptions, OpenTypeSchema, Schema, SchemaKind, StringKind, Tag,
    TagClass, UnsupportedKind,
};
pub use value::{ChoiceValue, OpenTypeValue, SequenceValue, Value};

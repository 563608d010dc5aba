//! Packed Encoding Rules (PER)
//!
//! Values are bit packed against their constraints: a field constrained to
//! `(0..127)` takes seven bits, OPTIONAL fields are announced by a presence
//! bitmap in front of the SEQUENCE, and lengths are either constrained whole
//! numbers or octet-aligned length determinants.
//!
//! # Module Structure
//!
//! - `cursor`: bit-level read/write cursors
//! - `constrained`: constrained whole numbers
//! - `length`: length determinants with fragmentation
//! - `primitives`: BOOLEAN, INTEGER, ENUMERATED and string types
//! - `decoder`/`encoder`: recursive walk over the schema tree

pub mod constrained;
pub mod cursor;
pub mod decoder;
pub mod encoder;
pub mod length;
pub mod primitives;

/// Longest run of SEQUENCE OF elements that may take no bits at all
///
/// Elements such as NULL or a single-valued INTEGER encode to nothing, so
/// only this cap ties the number of decoded values to the input size.
/// Encoding a longer run fails with `ValueOutOfRange`, decoding one with
/// `OutOfData`.
pub const MAX_EMPTY_ELEMENT_RUN: usize = 1024;

pub use cursor::{BitCursor, BitWriter};
pub use decoder::PerDecoder;
pub use encoder::PerEncoder;
pub use length::Length;

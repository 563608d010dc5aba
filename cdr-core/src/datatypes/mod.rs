//! Data types used by CDR records

pub mod bit_string;

pub use bit_string::BitString;

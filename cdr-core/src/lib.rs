//! Core types and utilities for the CDR codec
//!
//! This crate provides the error type and the fundamental datatypes shared
//! by the encoding engine, the file container and the schema catalog.

pub mod error;
pub mod datatypes;

pub use error::{CdrError, CdrResult};
pub use datatypes::BitString;

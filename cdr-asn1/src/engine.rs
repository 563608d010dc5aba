//! One-shot encode/decode entry points
//!
//! BER is the scheme CDR files carry, so [`encode`] and [`decode`] use it.
//! [`encode_with`] and [`decode_with`] select the scheme explicitly. A
//! decode must consume the whole input.

use crate::ber::{BerDecoder, BerEncoder};
use crate::per::{PerDecoder, PerEncoder};
use crate::schema::Schema;
use crate::value::Value;
use cdr_core::CdrResult;
use serde::{Deserialize, Serialize};

/// Wire encoding of a record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncodingRules {
    /// Basic Encoding Rules, indefinite lengths on constructed values
    #[default]
    Ber,
    /// Packed Encoding Rules, aligned variant
    Per,
}

impl std::fmt::Display for EncodingRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodingRules::Ber => write!(f, "BER"),
            EncodingRules::Per => write!(f, "PER"),
        }
    }
}

/// Encode `value` with BER
pub fn encode(schema: &Schema, value: &Value) -> CdrResult<Vec<u8>> {
    encode_with(EncodingRules::Ber, schema, value)
}

/// Decode a complete BER encoding of `schema`
pub fn decode(schema: &Schema, bytes: &[u8]) -> CdrResult<Value> {
    decode_with(EncodingRules::Ber, schema, bytes)
}

/// Encode `value` with the given rules
pub fn encode_with(rules: EncodingRules, schema: &Schema, value: &Value) -> CdrResult<Vec<u8>> {
    let bytes = match rules {
        EncodingRules::Ber => {
            let mut encoder = BerEncoder::new();
            encoder.encode(schema, value)?;
            encoder.into_bytes()
        }
        EncodingRules::Per => {
            let mut encoder = PerEncoder::new();
            encoder.encode(schema, value)?;
            encoder.into_bytes()
        }
    };
    log::debug!("{} encoded {} into {} octets", rules, schema.kind().name(), bytes.len());
    Ok(bytes)
}

/// Decode a complete encoding with the given rules
///
/// # Error Handling
/// Returns `TrailingData` when octets remain after the value.
pub fn decode_with(rules: EncodingRules, schema: &Schema, bytes: &[u8]) -> CdrResult<Value> {
    log::debug!("{} decoding {} from {} octets", rules, schema.kind().name(), bytes.len());
    match rules {
        EncodingRules::Ber => {
            let mut decoder = BerDecoder::new(bytes);
            let value = decoder.decode(schema)?;
            decoder.finish()?;
            Ok(value)
        }
        EncodingRules::Per => {
            let mut decoder = PerDecoder::new(bytes);
            let value = decoder.decode(schema)?;
            decoder.finish()?;
            Ok(value)
        }
    }
}

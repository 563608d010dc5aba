//! Minimal big-endian integer contents shared by both encoding schemes

use cdr_core::{CdrError, CdrResult};

/// Minimal two's complement octets of `value` (at least one)
pub(crate) fn signed_octets(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

/// Minimal unsigned octets of `value` (at least one)
pub(crate) fn unsigned_octets(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let start = bytes
        .iter()
        .position(|&byte| byte != 0)
        .unwrap_or(bytes.len() - 1);
    bytes[start..].to_vec()
}

/// Unsigned octets with a leading zero when the high bit is set
pub(crate) fn guarded_unsigned_octets(value: u64) -> Vec<u8> {
    let mut octets = unsigned_octets(value);
    if octets[0] & 0x80 != 0 {
        octets.insert(0, 0x00);
    }
    octets
}

/// Interpret 1-8 octets as a two's complement number
pub(crate) fn signed_from_octets(octets: &[u8]) -> CdrResult<i64> {
    if octets.is_empty() || octets.len() > 8 {
        return Err(CdrError::InvalidLengthEncoding(format!(
            "integer of {} octets",
            octets.len()
        )));
    }
    let mut value: i64 = if octets[0] & 0x80 != 0 { -1 } else { 0 };
    for &byte in octets {
        value = (value << 8) | byte as i64;
    }
    Ok(value)
}

/// Interpret octets as an unsigned number; a single leading sign-guard zero is accepted
pub(crate) fn unsigned_from_octets(octets: &[u8]) -> CdrResult<u64> {
    let digits = match octets {
        [0x00, rest @ ..] if rest.len() == 8 => rest,
        _ => octets,
    };
    if digits.is_empty() || digits.len() > 8 {
        return Err(CdrError::InvalidLengthEncoding(format!(
            "unsigned integer of {} octets",
            octets.len()
        )));
    }
    Ok(digits.iter().fold(0u64, |value, &byte| (value << 8) | byte as u64))
}

//! Basic types shared by the charging records
//!
//! # Types
//!
//! ```text
//! TimeStamp                  ::= OCTET STRING (SIZE(9))
//! LocalSequenceNumber        ::= INTEGER (0..4294967295)
//! RatingGroupId              ::= INTEGER (0..4294967295)
//! ServiceIdentifier          ::= INTEGER (0..4294967295)
//! DataVolumeOctets           ::= INTEGER
//! CallDuration               ::= INTEGER
//! NetworkFunctionName        ::= IA5String
//! PLMN-Id                    ::= OCTET STRING (SIZE (3))
//! MAPDUSteeringFunctionality ::= ENUMERATED { mPTCP (0), aTSSS-LL (1) }
//!
//! SMAddressDomain ::= SEQUENCE
//! {
//!     sMDomainName        [0] GraphicString OPTIONAL,
//!     threeGPPIMSIMCCMNC  [1] PLMN-Id OPTIONAL
//! }
//! ```
//!
//! The statics carry no tag; a record field tags its own copy.

use cdr_asn1::{field, Schema};
use once_cell::sync::Lazy;

/// Length of an encoded [`TIME_STAMP`]
pub const TIME_STAMP_LENGTH: i64 = 9;

/// Octets of a [`PLMN_ID`]: MCC and MNC digits in semi-octets
pub const PLMN_ID_LENGTH: i64 = 3;

pub static TIME_STAMP: Lazy<Schema> =
    Lazy::new(|| Schema::octet_string().size_range(TIME_STAMP_LENGTH, TIME_STAMP_LENGTH));

pub static LOCAL_SEQUENCE_NUMBER: Lazy<Schema> =
    Lazy::new(|| Schema::integer().value_range(0, u32::MAX as i64));

pub static RATING_GROUP_ID: Lazy<Schema> =
    Lazy::new(|| Schema::integer().value_range(0, u32::MAX as i64));

pub static SERVICE_IDENTIFIER: Lazy<Schema> =
    Lazy::new(|| Schema::integer().value_range(0, u32::MAX as i64));

pub static DATA_VOLUME_OCTETS: Lazy<Schema> = Lazy::new(Schema::integer);

pub static CALL_DURATION: Lazy<Schema> = Lazy::new(Schema::integer);

pub static NETWORK_FUNCTION_NAME: Lazy<Schema> = Lazy::new(Schema::ia5_string);

pub static PLMN_ID: Lazy<Schema> =
    Lazy::new(|| Schema::octet_string().size_range(PLMN_ID_LENGTH, PLMN_ID_LENGTH));

/// Steering functionality of a multi-access PDU session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapduSteeringFunctionality {
    Mptcp = 0,
    AtsssLl = 1,
}

impl MapduSteeringFunctionality {
    pub fn value(self) -> u64 {
        self as u64
    }
}

pub static MAPDU_STEERING_FUNCTIONALITY: Lazy<Schema> = Lazy::new(|| Schema::enumerated(0, 1));

pub static SM_ADDRESS_DOMAIN: Lazy<Schema> = Lazy::new(|| {
    Schema::sequence(vec![
        field(
            "sMDomainName",
            Schema::graphic_string().tagged(0).optional(),
        ),
        field(
            "threeGPPIMSIMCCMNC",
            PLMN_ID.clone().tagged(1).optional(),
        ),
    ])
});

#[cfg(test)]
mod tests {
    use super::*;
    use cdr_asn1::{encode_with, decode_with, CdrError, EncodingRules, SequenceValue, Value};

    #[test]
    fn test_time_stamp_size_is_fixed() {
        let schema = TIME_STAMP.clone().explicit();
        let short = Value::OctetString(vec![0x25; 8]);
        for rules in [EncodingRules::Ber, EncodingRules::Per] {
            assert!(matches!(
                encode_with(rules, &schema, &short),
                Err(CdrError::ValueOutOfRange(_))
            ));
        }
        // fixed size: no length determinant in PER
        let stamp = Value::OctetString(vec![0x25, 0x10, 0x19, 0x12, 0x00, 0x00, b'+', 0x02, 0x00]);
        let bytes = encode_with(EncodingRules::Per, &schema, &stamp).unwrap();
        assert_eq!(bytes.len(), 9);
    }

    #[test]
    fn test_sm_address_domain() {
        let schema = SM_ADDRESS_DOMAIN.clone().explicit();
        let value = Value::Sequence(
            SequenceValue::new()
                .with("sMDomainName", "ims.example")
                .with("threeGPPIMSIMCCMNC", Value::OctetString(vec![0x64, 0xF0, 0x10])),
        );
        let bytes = encode_with(EncodingRules::Ber, &schema, &value).unwrap();
        assert_eq!(
            hex::encode(&bytes),
            "3080800b696d732e6578616d706c65810364f0100000"
        );
        assert_eq!(decode_with(EncodingRules::Ber, &schema, &bytes).unwrap(), value);

        let empty = Value::Sequence(SequenceValue::new());
        let bytes = encode_with(EncodingRules::Per, &schema, &empty).unwrap();
        assert_eq!(bytes, vec![0x00]);
    }

    #[test]
    fn test_steering_functionality_values() {
        let schema = MAPDU_STEERING_FUNCTIONALITY.clone().explicit();
        let bytes = encode_with(
            EncodingRules::Ber,
            &schema,
            &Value::Enumerated(MapduSteeringFunctionality::AtsssLl.value()),
        )
        .unwrap();
        assert_eq!(bytes, vec![0x0A, 0x01, 0x01]);
        assert!(encode_with(EncodingRules::Ber, &schema, &Value::Enumerated(2)).is_err());
    }
}

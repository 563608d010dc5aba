//! Top-level charging function record
//!
//! # Types
//!
//! ```text
//! CHFRecord ::= CHOICE
//! {
//!     chargingFunctionRecord        [200] ChargingRecord
//! }
//!
//! ChargingRecord ::= SET
//! {
//!     recordType                    [0] RecordType,
//!     recordingNetworkFunctionID    [1] NetworkFunctionName,
//!     triggers                      [4] SEQUENCE OF Trigger OPTIONAL,
//!     listOfMultipleUnitUsage       [5] SEQUENCE OF MultipleUnitUsage OPTIONAL,
//!     recordOpeningTime             [6] TimeStamp,
//!     duration                      [7] CallDuration,
//!     recordSequenceNumber          [8] INTEGER OPTIONAL,
//!     causeForRecClosing            [9] CauseForRecClosing,
//!     localRecordSequenceNumber     [11] LocalSequenceNumber OPTIONAL,
//!     recordExtensions              [12] SEQUENCE OF ManagementExtension OPTIONAL,
//!     pDUSessionChargingInformation [13] PDUSessionChargingInformation OPTIONAL,
//!     sMSChargingInformation        [14] SMSChargingInformation OPTIONAL
//! }
//!
//! PDUSessionChargingInformation ::= SEQUENCE
//! {
//!     pDUSessionChargingID          [0] INTEGER (0..4294967295),
//!     dataNetworkNameIdentifier     [1] IA5String OPTIONAL,
//!     mAPDUSteeringFunctionality    [2] MAPDUSteeringFunctionality OPTIONAL
//! }
//!
//! SMSChargingInformation ::= SEQUENCE
//! {
//!     originatorInfo                [0] SMAddressInfo OPTIONAL,
//!     recipientInfo                 [1] SEQUENCE OF SMAddressInfo OPTIONAL
//! }
//!
//! SMAddressInfo ::= SEQUENCE
//! {
//!     sMAddressData                 [0] UTF8String OPTIONAL,
//!     sMAddressDomain               [1] SMAddressDomain OPTIONAL
//! }
//!
//! ManagementExtension ::= SEQUENCE
//! {
//!     identifier                    INTEGER,
//!     significance                  [1] BOOLEAN OPTIONAL,
//!     information                   [2] ANY DEFINED BY identifier
//! }
//! ```
//!
//! The extension identifier is a local INTEGER rather than an OBJECT
//! IDENTIFIER. Known identifiers are listed in [`ExtensionIdentifier`].

use crate::common::{
    CALL_DURATION, LOCAL_SEQUENCE_NUMBER, MAPDU_STEERING_FUNCTIONALITY, NETWORK_FUNCTION_NAME,
    SM_ADDRESS_DOMAIN, TIME_STAMP,
};
use crate::usage::{MULTIPLE_UNIT_USAGE, TRIGGER};
use cdr_asn1::{field, CdrResult, Schema};
use once_cell::sync::{Lazy, OnceCell};

/// `recordType` of a charging function record
pub const CHARGING_FUNCTION_RECORD_TYPE: i64 = 200;

/// Alternative index of `chargingFunctionRecord` in [`chf_record`]
pub const CHARGING_FUNCTION_RECORD: usize = 1;

/// Reason for closing a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CauseForRecClosing {
    NormalRelease = 0,
    AbnormalRelease = 4,
    VolumeLimit = 16,
    TimeLimit = 17,
    ServingNodeChange = 18,
    MaxChangeCond = 19,
    ManagementIntervention = 20,
    RatChange = 22,
    MsTimeZoneChange = 23,
    PlmnChange = 24,
}

impl CauseForRecClosing {
    pub fn value(self) -> i64 {
        self as i64
    }
}

/// Identifiers of the extensions carried in `recordExtensions`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionIdentifier {
    /// Opaque vendor data, `OCTET STRING`
    VendorData = 1,
    /// Free text, `IA5String`
    Label = 2,
    /// An `SMAddressDomain`
    AddressDomain = 3,
}

impl ExtensionIdentifier {
    pub fn value(self) -> i64 {
        self as i64
    }
}

pub static PDU_SESSION_CHARGING_INFORMATION: Lazy<Schema> = Lazy::new(|| {
    Schema::sequence(vec![
        field(
            "pDUSessionChargingID",
            Schema::integer().value_range(0, u32::MAX as i64).tagged(0),
        ),
        field(
            "dataNetworkNameIdentifier",
            Schema::ia5_string().size_range(1, 63).tagged(1).optional(),
        ),
        field(
            "mAPDUSteeringFunctionality",
            MAPDU_STEERING_FUNCTIONALITY.clone().tagged(2).optional(),
        ),
    ])
});

pub static SM_ADDRESS_INFO: Lazy<Schema> = Lazy::new(|| {
    Schema::sequence(vec![
        field("sMAddressData", Schema::utf8_string().tagged(0).optional()),
        field("sMAddressDomain", SM_ADDRESS_DOMAIN.clone().tagged(1).optional()),
    ])
});

pub static SMS_CHARGING_INFORMATION: Lazy<Schema> = Lazy::new(|| {
    Schema::sequence(vec![
        field("originatorInfo", SM_ADDRESS_INFO.clone().tagged(0).optional()),
        field(
            "recipientInfo",
            Schema::sequence_of(SM_ADDRESS_INFO.clone().explicit())
                .tagged(1)
                .optional(),
        ),
    ])
});

/// `ManagementExtension`, built on every call
///
/// # Errors
/// Fails only if two extension alternatives share an identifier.
pub fn management_extension() -> CdrResult<Schema> {
    let information = Schema::open_type(
        "identifier",
        vec![
            field(
                "vendorData",
                Schema::octet_string()
                    .explicit()
                    .with_reference_value(ExtensionIdentifier::VendorData.value()),
            ),
            field(
                "label",
                Schema::ia5_string()
                    .explicit()
                    .with_reference_value(ExtensionIdentifier::Label.value()),
            ),
            field(
                "addressDomain",
                SM_ADDRESS_DOMAIN
                    .clone()
                    .explicit()
                    .with_reference_value(ExtensionIdentifier::AddressDomain.value()),
            ),
        ],
    )?;
    Ok(Schema::sequence(vec![
        field("identifier", Schema::integer().explicit()),
        field("significance", Schema::boolean().tagged(1).optional()),
        field("information", information.tagged(2)),
    ]))
}

/// `ChargingRecord`, the body of a charging function record
pub fn charging_record() -> CdrResult<&'static Schema> {
    static CHARGING_RECORD: OnceCell<Schema> = OnceCell::new();
    CHARGING_RECORD.get_or_try_init(|| {
        Ok(Schema::set(vec![
            field("recordType", Schema::integer().tagged(0)),
            field(
                "recordingNetworkFunctionID",
                NETWORK_FUNCTION_NAME.clone().tagged(1),
            ),
            field(
                "triggers",
                Schema::sequence_of(TRIGGER.clone()).tagged(4).optional(),
            ),
            field(
                "listOfMultipleUnitUsage",
                Schema::sequence_of(MULTIPLE_UNIT_USAGE.clone().explicit())
                    .tagged(5)
                    .optional(),
            ),
            field("recordOpeningTime", TIME_STAMP.clone().tagged(6)),
            field("duration", CALL_DURATION.clone().tagged(7)),
            field("recordSequenceNumber", Schema::integer().tagged(8).optional()),
            field("causeForRecClosing", Schema::integer().tagged(9)),
            field(
                "localRecordSequenceNumber",
                LOCAL_SEQUENCE_NUMBER.clone().tagged(11).optional(),
            ),
            field(
                "recordExtensions",
                Schema::sequence_of(management_extension()?.explicit())
                    .tagged(12)
                    .optional(),
            ),
            field(
                "pDUSessionChargingInformation",
                PDU_SESSION_CHARGING_INFORMATION.clone().tagged(13).optional(),
            ),
            field(
                "sMSChargingInformation",
                SMS_CHARGING_INFORMATION.clone().tagged(14).optional(),
            ),
        ]))
    })
}

/// `CHFRecord`, the schema of one record in a charging function CDR file
pub fn chf_record() -> CdrResult<&'static Schema> {
    static CHF_RECORD: OnceCell<Schema> = OnceCell::new();
    CHF_RECORD.get_or_try_init(|| {
        log::debug!("building CHFRecord schema");
        Ok(Schema::choice(vec![field(
            "chargingFunctionRecord",
            charging_record()?.clone().tagged(200),
        )]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdr_asn1::{decode_with, encode_with, CdrError, EncodingRules, SequenceValue, Value};

    fn opening_time() -> Value {
        Value::OctetString(vec![0x25, 0x10, 0x19, 0x08, 0x30, 0x00, b'+', 0x02, 0x00])
    }

    fn minimal_record() -> SequenceValue {
        SequenceValue::new()
            .with("recordType", CHARGING_FUNCTION_RECORD_TYPE)
            .with("recordingNetworkFunctionID", "CHF")
            .with("recordOpeningTime", opening_time())
            .with("duration", 60i64)
            .with("causeForRecClosing", CauseForRecClosing::NormalRelease.value())
    }

    fn extension(identifier: ExtensionIdentifier, information: Value) -> Value {
        Value::Sequence(
            SequenceValue::new()
                .with("identifier", identifier.value())
                .with("information", Value::open_type(identifier.value(), information)),
        )
    }

    #[test]
    fn test_minimal_chf_record_ber() {
        let schema = chf_record().unwrap();
        let value = Value::choice(CHARGING_FUNCTION_RECORD, minimal_record().into());
        let bytes = encode_with(EncodingRules::Ber, schema, &value).unwrap();
        assert_eq!(
            hex::encode(&bytes),
            "bf814880800200c8810343484686092510190830002b02008701\
             3c8901000000"
        );
        assert_eq!(decode_with(EncodingRules::Ber, schema, &bytes).unwrap(), value);
    }

    #[test]
    fn test_record_extensions_open_type() {
        let schema = chf_record().unwrap();
        let domain = SequenceValue::new().with("sMDomainName", "ims");
        let record = minimal_record().with(
            "recordExtensions",
            Value::SequenceOf(vec![
                extension(ExtensionIdentifier::VendorData, Value::OctetString(vec![0xCA, 0xFE])),
                extension(ExtensionIdentifier::Label, "gold".into()),
                extension(ExtensionIdentifier::AddressDomain, domain.into()),
            ]),
        );
        let value = Value::choice(CHARGING_FUNCTION_RECORD, record.into());

        for rules in [EncodingRules::Ber, EncodingRules::Per] {
            let bytes = encode_with(rules, schema, &value).unwrap();
            assert_eq!(decode_with(rules, schema, &bytes).unwrap(), value, "{}", rules);
        }
    }

    #[test]
    fn test_unknown_extension_identifier() {
        let schema = chf_record().unwrap();
        let record = minimal_record().with(
            "recordExtensions",
            Value::SequenceOf(vec![Value::Sequence(
                SequenceValue::new()
                    .with("identifier", 9i64)
                    .with("information", Value::open_type(9, Value::Null)),
            )]),
        );
        let err = encode_with(
            EncodingRules::Ber,
            schema,
            &Value::choice(CHARGING_FUNCTION_RECORD, record.into()),
        )
        .unwrap_err();
        assert!(matches!(err.root(), CdrError::OpenTypeReferenceMismatch(9)));
    }

    #[test]
    fn test_pdu_session_information() {
        let schema = PDU_SESSION_CHARGING_INFORMATION.clone().explicit();
        let value = Value::Sequence(
            SequenceValue::new()
                .with("pDUSessionChargingID", 7i64)
                .with("dataNetworkNameIdentifier", "internet")
                .with("mAPDUSteeringFunctionality", Value::Enumerated(0)),
        );
        for rules in [EncodingRules::Ber, EncodingRules::Per] {
            let bytes = encode_with(rules, &schema, &value).unwrap();
            assert_eq!(decode_with(rules, &schema, &bytes).unwrap(), value, "{}", rules);
        }

        let too_long = Value::Sequence(
            SequenceValue::new()
                .with("pDUSessionChargingID", 7i64)
                .with("dataNetworkNameIdentifier", "x".repeat(64)),
        );
        assert!(encode_with(EncodingRules::Per, &schema, &too_long).is_err());
    }
}

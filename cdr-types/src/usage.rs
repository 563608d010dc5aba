//! Usage reporting: unit containers, rating groups and their triggers
//!
//! # Types
//!
//! ```text
//! MultipleUnitUsage ::= SEQUENCE
//! {
//!     ratingGroup              [0] RatingGroupId,
//!     usedUnitContainers       [1] SEQUENCE OF UsedUnitContainer OPTIONAL,
//!     uPFID                    [2] NetworkFunctionName OPTIONAL
//! }
//!
//! UsedUnitContainer ::= SEQUENCE
//! {
//!     serviceIdentifier        [0] ServiceIdentifier OPTIONAL,
//!     quotaManagementIndicator [1] BOOLEAN OPTIONAL,
//!     triggers                 [2] SEQUENCE OF Trigger OPTIONAL,
//!     triggerTimeStamp         [3] TimeStamp OPTIONAL,
//!     time                     [4] CallDuration OPTIONAL,
//!     dataTotalVolume          [5] DataVolumeOctets OPTIONAL,
//!     dataVolumeUplink         [6] DataVolumeOctets OPTIONAL,
//!     dataVolumeDownlink       [7] DataVolumeOctets OPTIONAL,
//!     serviceSpecificUnits     [8] INTEGER OPTIONAL,
//!     eventTimeStamps          [9] SEQUENCE OF TimeStamp OPTIONAL,
//!     localSequenceNumber      [10] LocalSequenceNumber OPTIONAL
//! }
//!
//! Trigger ::= CHOICE
//! {
//!     sMFTrigger               [1] SMFTrigger
//! }
//!
//! SMFTrigger ::= SEQUENCE
//! {
//!     sMFTriggerType           [0] SMFTriggerType,
//!     triggerCategory          [1] TriggerCategory OPTIONAL,
//!     timeLimit                [2] CallDuration OPTIONAL,
//!     volumeLimit              [3] DataVolumeOctets OPTIONAL
//! }
//!
//! SMFTriggerType  ::= ENUMERATED { qoSChange (0), ... (0..37, ...) }
//! TriggerCategory ::= ENUMERATED { immediateReport (0), deferredReport (1) }
//! ```

use crate::common::{
    CALL_DURATION, DATA_VOLUME_OCTETS, LOCAL_SEQUENCE_NUMBER, NETWORK_FUNCTION_NAME,
    RATING_GROUP_ID, SERVICE_IDENTIFIER, TIME_STAMP,
};
use cdr_asn1::{field, Schema};
use once_cell::sync::Lazy;

/// Highest root value of `SMFTriggerType`
pub const SMF_TRIGGER_TYPE_MAX: i64 = 37;

/// Alternative index of `sMFTrigger` in [`TRIGGER`]
pub const SMF_TRIGGER: usize = 1;

pub static SMF_TRIGGER_TYPE: Lazy<Schema> =
    Lazy::new(|| Schema::enumerated(0, SMF_TRIGGER_TYPE_MAX).value_extensible());

pub static TRIGGER_CATEGORY: Lazy<Schema> = Lazy::new(|| Schema::enumerated(0, 1));

pub static SMF_TRIGGER_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::sequence(vec![
        field("sMFTriggerType", SMF_TRIGGER_TYPE.clone().tagged(0)),
        field("triggerCategory", TRIGGER_CATEGORY.clone().tagged(1).optional()),
        field("timeLimit", CALL_DURATION.clone().tagged(2).optional()),
        field("volumeLimit", DATA_VOLUME_OCTETS.clone().tagged(3).optional()),
    ])
});

pub static TRIGGER: Lazy<Schema> =
    Lazy::new(|| Schema::choice(vec![field("sMFTrigger", SMF_TRIGGER_SCHEMA.clone().tagged(1))]));

pub static USED_UNIT_CONTAINER: Lazy<Schema> = Lazy::new(|| {
    Schema::sequence(vec![
        field("serviceIdentifier", SERVICE_IDENTIFIER.clone().tagged(0).optional()),
        field("quotaManagementIndicator", Schema::boolean().tagged(1).optional()),
        field(
            "triggers",
            Schema::sequence_of(TRIGGER.clone()).tagged(2).optional(),
        ),
        field("triggerTimeStamp", TIME_STAMP.clone().tagged(3).optional()),
        field("time", CALL_DURATION.clone().tagged(4).optional()),
        field("dataTotalVolume", DATA_VOLUME_OCTETS.clone().tagged(5).optional()),
        field("dataVolumeUplink", DATA_VOLUME_OCTETS.clone().tagged(6).optional()),
        field("dataVolumeDownlink", DATA_VOLUME_OCTETS.clone().tagged(7).optional()),
        field("serviceSpecificUnits", Schema::integer().tagged(8).optional()),
        field(
            "eventTimeStamps",
            Schema::sequence_of(TIME_STAMP.clone().explicit())
                .tagged(9)
                .optional(),
        ),
        field(
            "localSequenceNumber",
            LOCAL_SEQUENCE_NUMBER.clone().tagged(10).optional(),
        ),
    ])
});

pub static MULTIPLE_UNIT_USAGE: Lazy<Schema> = Lazy::new(|| {
    Schema::sequence(vec![
        field("ratingGroup", RATING_GROUP_ID.clone().tagged(0)),
        field(
            "usedUnitContainers",
            Schema::sequence_of(USED_UNIT_CONTAINER.clone().explicit())
                .tagged(1)
                .optional(),
        ),
        field("uPFID", NETWORK_FUNCTION_NAME.clone().tagged(2).optional()),
    ])
});

#[cfg(test)]
mod tests {
    use super::*;
    use cdr_asn1::{decode_with, encode_with, EncodingRules, SequenceValue, Value};

    fn smf_trigger(trigger_type: u64) -> Value {
        Value::choice(
            SMF_TRIGGER,
            Value::Sequence(SequenceValue::new().with("sMFTriggerType", Value::Enumerated(trigger_type))),
        )
    }

    #[test]
    fn test_used_unit_container_ber() {
        let schema = USED_UNIT_CONTAINER.clone().explicit();
        let value = Value::Sequence(
            SequenceValue::new()
                .with("dataVolumeUplink", 1000i64)
                .with("localSequenceNumber", 1i64),
        );
        let bytes = encode_with(EncodingRules::Ber, &schema, &value).unwrap();
        assert_eq!(hex::encode(&bytes), "3080860203e88a01010000");
        assert_eq!(decode_with(EncodingRules::Ber, &schema, &bytes).unwrap(), value);
    }

    #[test]
    fn test_triggers_are_untagged_choices() {
        let schema = USED_UNIT_CONTAINER.clone().explicit();
        let value = Value::Sequence(
            SequenceValue::new().with("triggers", Value::SequenceOf(vec![smf_trigger(1)])),
        );
        let bytes = encode_with(EncodingRules::Ber, &schema, &value).unwrap();
        assert_eq!(hex::encode(&bytes), "3080a280a1808001010000000000");
        assert_eq!(decode_with(EncodingRules::Ber, &schema, &bytes).unwrap(), value);
    }

    #[test]
    fn test_multiple_unit_usage_both_rules() {
        let schema = MULTIPLE_UNIT_USAGE.clone().explicit();
        let container = SequenceValue::new()
            .with("quotaManagementIndicator", true)
            .with("triggers", Value::SequenceOf(vec![smf_trigger(3), smf_trigger(60)]))
            .with("dataTotalVolume", 1_500_000_000_000i64)
            .with(
                "eventTimeStamps",
                Value::SequenceOf(vec![Value::OctetString(vec![
                    0x25, 0x10, 0x19, 0x08, 0x30, 0x00, b'+', 0x02, 0x00,
                ])]),
            );
        let value = Value::Sequence(
            SequenceValue::new()
                .with("ratingGroup", 4_294_967_295i64)
                .with("usedUnitContainers", Value::SequenceOf(vec![container.into()]))
                .with("uPFID", "upf-01"),
        );

        for rules in [EncodingRules::Ber, EncodingRules::Per] {
            let bytes = encode_with(rules, &schema, &value).unwrap();
            assert_eq!(decode_with(rules, &schema, &bytes).unwrap(), value, "{}", rules);
        }
    }

    #[test]
    fn test_rating_group_is_mandatory() {
        let schema = MULTIPLE_UNIT_USAGE.clone().explicit();
        let value = Value::Sequence(SequenceValue::new().with("uPFID", "upf-01"));
        assert!(encode_with(EncodingRules::Ber, &schema, &value).is_err());
    }
}

//! TS 32.298 record schemas for the CDR engine
//!
//! This crate holds an excerpt of the charging function record definitions
//! as [`Schema`](cdr_asn1::Schema) trees, built once on first use, and
//! helpers that turn charging data into matching [`Value`](cdr_asn1::Value)
//! trees.
//!
//! # Modules
//!
//! - [`common`]: basic types (`TimeStamp`, `RatingGroupId`, `SMAddressDomain`, ...)
//! - [`usage`]: `MultipleUnitUsage`, `UsedUnitContainer`, `Trigger`
//! - [`record`]: `CHFRecord` / `ChargingRecord` and their sub-records
//! - [`convert`]: timestamps and usage reports to values
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use cdr_asn1::{encode_with, EncodingRules, SequenceValue, Value};
//! use cdr_types::{chf_record, multiple_unit_usage_to_cdr, MultipleUnitUsageInput};
//!
//! let usage = multiple_unit_usage_to_cdr(&[MultipleUnitUsageInput {
//!     rating_group: 10,
//!     ..Default::default()
//! }])?;
//! let record = SequenceValue::new()
//!     .with("recordType", 200i64)
//!     .with("recordingNetworkFunctionID", "CHF")
//!     .with("listOfMultipleUnitUsage", usage)
//!     .with("recordOpeningTime", Value::OctetString(vec![0x25, 0x10, 0x19, 0x08, 0, 0, b'+', 0, 0]))
//!     .with("duration", 60i64)
//!     .with("causeForRecClosing", 0i64);
//! let bytes = encode_with(EncodingRules::Ber, chf_record()?, &Value::choice(1, record.into()))?;
//! # Ok::<(), cdr_core::CdrError>(())
//! ```

pub mod common;
pub mod convert;
pub mod record;
pub mod usage;

pub use common::{
    MapduSteeringFunctionality, CALL_DURATION, DATA_VOLUME_OCTETS, LOCAL_SEQUENCE_NUMBER,
    MAPDU_STEERING_FUNCTIONALITY, NETWORK_FUNCTION_NAME, PLMN_ID, RATING_GROUP_ID,
    SERVICE_IDENTIFIER, SM_ADDRESS_DOMAIN, TIME_STAMP,
};
pub use convert::{
    multiple_unit_usage_to_cdr, time_stamp_from_cdr, time_stamp_to_cdr, MultipleUnitUsageInput,
    TriggerCategory, TriggerInput, UsedUnitContainerInput,
};
pub use record::{
    charging_record, chf_record, management_extension, CauseForRecClosing, ExtensionIdentifier,
    CHARGING_FUNCTION_RECORD, CHARGING_FUNCTION_RECORD_TYPE,
};
pub use usage::{MULTIPLE_UNIT_USAGE, TRIGGER, USED_UNIT_CONTAINER};

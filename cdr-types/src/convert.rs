//! Conversion of charging data into record values
//!
//! The input models mirror the usage reports a charging function receives
//! and map onto the schemas of [`crate::usage`]. Field names of the produced
//! [`Value`] trees are the ASN.1 component names.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone, Timelike};
use cdr_asn1::{SequenceValue, Value};
use cdr_core::{CdrError, CdrResult};
use serde::{Deserialize, Serialize};

use crate::common::TIME_STAMP_LENGTH;
use crate::usage::SMF_TRIGGER;

/// Encode a point in time as a `TimeStamp`
///
/// # Encoding Format
///
/// ```text
/// octet 1-6  YY MM DD hh mm ss, BCD
/// octet 7    '+' or '-' (ASCII)
/// octet 8-9  hh mm of the UTC offset, BCD
/// ```
///
/// Date and time are local to the offset.
pub fn time_stamp_to_cdr(time: &DateTime<FixedOffset>) -> Value {
    let offset = time.offset().local_minus_utc();
    let sign = if offset < 0 { b'-' } else { b'+' };
    let offset = offset.unsigned_abs();

    Value::OctetString(vec![
        bcd(time.year().rem_euclid(100) as u32),
        bcd(time.month()),
        bcd(time.day()),
        bcd(time.hour()),
        bcd(time.minute()),
        bcd(time.second()),
        sign,
        bcd(offset / 3600),
        bcd(offset % 3600 / 60),
    ])
}

/// Decode a `TimeStamp`; two-digit years are taken as 20YY
///
/// # Error Handling
/// Returns `ValueMismatch` for anything but a 9-octet OCTET STRING and
/// `InvalidData` for bad digits, sign or calendar values.
pub fn time_stamp_from_cdr(value: &Value) -> CdrResult<DateTime<FixedOffset>> {
    let octets = match value {
        Value::OctetString(octets) if octets.len() == TIME_STAMP_LENGTH as usize => octets,
        Value::OctetString(octets) => {
            return Err(CdrError::ValueMismatch(format!(
                "TimeStamp of {} octets",
                octets.len()
            )));
        }
        other => {
            return Err(CdrError::ValueMismatch(format!(
                "expected TimeStamp, found {}",
                other.variant_name()
            )));
        }
    };

    let digits = octets[..6]
        .iter()
        .chain(&octets[7..])
        .map(|&octet| from_bcd(octet))
        .collect::<CdrResult<Vec<u32>>>()?;
    let sign = match octets[6] {
        b'+' => 1,
        b'-' => -1,
        other => {
            return Err(CdrError::InvalidData(format!(
                "TimeStamp offset sign {:#04x}",
                other
            )));
        }
    };

    let invalid = || CdrError::InvalidData(format!("TimeStamp {:02x?}", octets));
    let offset = FixedOffset::east_opt(sign * (digits[6] * 3600 + digits[7] * 60) as i32)
        .ok_or_else(invalid)?;
    let local = NaiveDate::from_ymd_opt(2000 + digits[0] as i32, digits[1], digits[2])
        .and_then(|date| date.and_hms_opt(digits[3], digits[4], digits[5]))
        .ok_or_else(invalid)?;
    offset.from_local_datetime(&local).single().ok_or_else(invalid)
}

fn bcd(value: u32) -> u8 {
    ((value / 10 % 10) << 4 | value % 10) as u8
}

fn from_bcd(octet: u8) -> CdrResult<u32> {
    let (high, low) = (octet >> 4, octet & 0x0F);
    if high > 9 || low > 9 {
        return Err(CdrError::InvalidData(format!("BCD octet {:#04x}", octet)));
    }
    Ok((high * 10 + low) as u32)
}

fn volume(name: &str, value: u64) -> CdrResult<i64> {
    i64::try_from(value).map_err(|_| CdrError::ValueOutOfRange(format!("{} {}", name, value)))
}

/// When a triggered report is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerCategory {
    ImmediateReport = 0,
    DeferredReport = 1,
}

/// One reporting trigger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriggerInput {
    /// `SMFTriggerType` value
    pub trigger_type: u64,
    pub category: Option<TriggerCategory>,
    /// Seconds
    pub time_limit: Option<u32>,
    /// Octets
    pub volume_limit: Option<u64>,
}

impl TriggerInput {
    /// Build the `Trigger` CHOICE value
    pub fn to_value(&self) -> CdrResult<Value> {
        let mut trigger = SequenceValue::new();
        trigger.push("sMFTriggerType", Value::Enumerated(self.trigger_type));
        if let Some(category) = self.category {
            trigger.push("triggerCategory", Value::Enumerated(category as u64));
        }
        if let Some(limit) = self.time_limit {
            trigger.push("timeLimit", limit as i64);
        }
        if let Some(limit) = self.volume_limit {
            trigger.push("volumeLimit", volume("volume limit", limit)?);
        }
        Ok(Value::choice(SMF_TRIGGER, trigger.into()))
    }
}

/// Usage reported for one container of a rating group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsedUnitContainerInput {
    pub service_id: Option<u32>,
    pub quota_management_indicator: Option<bool>,
    pub triggers: Vec<TriggerInput>,
    pub trigger_timestamp: Option<DateTime<FixedOffset>>,
    /// Seconds
    pub time: Option<u32>,
    pub total_volume: Option<u64>,
    pub uplink_volume: Option<u64>,
    pub downlink_volume: Option<u64>,
    pub service_specific_units: Option<u64>,
    pub event_time_stamps: Vec<DateTime<FixedOffset>>,
    pub local_sequence_number: Option<u32>,
}

impl UsedUnitContainerInput {
    /// Build the `UsedUnitContainer` value; absent inputs leave their field out
    ///
    /// # Error Handling
    /// Returns `ValueOutOfRange` for a volume that does not fit an `i64`.
    pub fn to_value(&self) -> CdrResult<Value> {
        let mut container = SequenceValue::new();
        if let Some(id) = self.service_id {
            container.push("serviceIdentifier", id as i64);
        }
        if let Some(indicator) = self.quota_management_indicator {
            container.push("quotaManagementIndicator", indicator);
        }
        if !self.triggers.is_empty() {
            let triggers = self
                .triggers
                .iter()
                .map(TriggerInput::to_value)
                .collect::<CdrResult<Vec<_>>>()?;
            container.push("triggers", Value::SequenceOf(triggers));
        }
        if let Some(time) = &self.trigger_timestamp {
            container.push("triggerTimeStamp", time_stamp_to_cdr(time));
        }
        if let Some(time) = self.time {
            container.push("time", time as i64);
        }
        let volumes = [
            ("dataTotalVolume", self.total_volume),
            ("dataVolumeUplink", self.uplink_volume),
            ("dataVolumeDownlink", self.downlink_volume),
            ("serviceSpecificUnits", self.service_specific_units),
        ];
        for (name, value) in volumes {
            if let Some(value) = value {
                container.push(name, volume(name, value)?);
            }
        }
        if !self.event_time_stamps.is_empty() {
            let stamps = self.event_time_stamps.iter().map(time_stamp_to_cdr).collect();
            container.push("eventTimeStamps", Value::SequenceOf(stamps));
        }
        if let Some(number) = self.local_sequence_number {
            container.push("localSequenceNumber", number as i64);
        }
        Ok(container.into())
    }
}

/// Usage of one rating group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MultipleUnitUsageInput {
    pub rating_group: u32,
    pub used_unit_containers: Vec<UsedUnitContainerInput>,
    /// Name of the user plane function that measured the usage
    pub upf_id: Option<String>,
}

impl MultipleUnitUsageInput {
    /// Build the `MultipleUnitUsage` value
    pub fn to_value(&self) -> CdrResult<Value> {
        let mut usage = SequenceValue::new();
        usage.push("ratingGroup", self.rating_group as i64);
        if !self.used_unit_containers.is_empty() {
            let containers = self
                .used_unit_containers
                .iter()
                .map(UsedUnitContainerInput::to_value)
                .collect::<CdrResult<Vec<_>>>()?;
            usage.push("usedUnitContainers", Value::SequenceOf(containers));
        }
        if let Some(upf_id) = &self.upf_id {
            usage.push("uPFID", upf_id.as_str());
        }
        Ok(usage.into())
    }
}

/// Build a `listOfMultipleUnitUsage` value
pub fn multiple_unit_usage_to_cdr(usages: &[MultipleUnitUsageInput]) -> CdrResult<Value> {
    let values = usages
        .iter()
        .enumerate()
        .map(|(index, usage)| {
            usage
                .to_value()
                .map_err(|err| err.with_context(&index.to_string(), 0))
        })
        .collect::<CdrResult<Vec<_>>>()?;
    log::debug!("converted {} rating groups", values.len());
    Ok(Value::SequenceOf(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::MULTIPLE_UNIT_USAGE;
    use cdr_asn1::{decode_with, encode_with, EncodingRules, Schema};

    fn at(offset_seconds: i32, hour: u32, minute: u32, second: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(offset_seconds)
            .unwrap()
            .with_ymd_and_hms(2025, 10, 19, hour, minute, second)
            .unwrap()
    }

    #[test]
    fn test_time_stamp_layout() {
        let value = time_stamp_to_cdr(&at(2 * 3600, 8, 30, 5));
        assert_eq!(
            value,
            Value::OctetString(vec![0x25, 0x10, 0x19, 0x08, 0x30, 0x05, b'+', 0x02, 0x00])
        );

        let time = at(-(3 * 3600 + 30 * 60), 23, 59, 59);
        let value = time_stamp_to_cdr(&time);
        assert_eq!(
            value,
            Value::OctetString(vec![0x25, 0x10, 0x19, 0x23, 0x59, 0x59, b'-', 0x03, 0x30])
        );
        assert_eq!(time_stamp_from_cdr(&value).unwrap(), time);
    }

    #[test]
    fn test_time_stamp_rejects() {
        let mut octets = vec![0x25, 0x10, 0x19, 0x08, 0x30, 0x05, b'+', 0x02, 0x00];
        octets[1] = 0x1A;
        assert!(matches!(
            time_stamp_from_cdr(&Value::OctetString(octets.clone())),
            Err(CdrError::InvalidData(_))
        ));
        // month 13
        octets[1] = 0x13;
        assert!(matches!(
            time_stamp_from_cdr(&Value::OctetString(octets.clone())),
            Err(CdrError::InvalidData(_))
        ));
        octets[1] = 0x10;
        octets[6] = b'*';
        assert!(matches!(
            time_stamp_from_cdr(&Value::OctetString(octets)),
            Err(CdrError::InvalidData(_))
        ));
        assert!(matches!(
            time_stamp_from_cdr(&Value::Int(1)),
            Err(CdrError::ValueMismatch(_))
        ));
    }

    #[test]
    fn test_used_unit_container_fields() {
        let container = UsedUnitContainerInput {
            uplink_volume: Some(1000),
            local_sequence_number: Some(1),
            ..Default::default()
        };
        assert_eq!(
            container.to_value().unwrap(),
            Value::Sequence(
                SequenceValue::new()
                    .with("dataVolumeUplink", 1000i64)
                    .with("localSequenceNumber", 1i64)
            )
        );

        let overflow = UsedUnitContainerInput {
            total_volume: Some(u64::MAX),
            ..Default::default()
        };
        assert!(matches!(
            overflow.to_value(),
            Err(CdrError::ValueOutOfRange(_))
        ));
    }

    #[test]
    fn test_usage_list_encodes_with_catalog_schema() {
        let usages = vec![
            MultipleUnitUsageInput {
                rating_group: 10,
                used_unit_containers: vec![UsedUnitContainerInput {
                    service_id: Some(7),
                    triggers: vec![TriggerInput {
                        trigger_type: 2,
                        category: Some(TriggerCategory::DeferredReport),
                        volume_limit: Some(1 << 20),
                        ..Default::default()
                    }],
                    trigger_timestamp: Some(at(0, 12, 0, 0)),
                    total_volume: Some(3000),
                    uplink_volume: Some(1000),
                    downlink_volume: Some(2000),
                    event_time_stamps: vec![at(3600, 12, 0, 1), at(3600, 12, 0, 2)],
                    local_sequence_number: Some(5),
                    ..Default::default()
                }],
                upf_id: Some("upf-01".to_string()),
            },
            MultipleUnitUsageInput {
                rating_group: 20,
                ..Default::default()
            },
        ];
        let value = multiple_unit_usage_to_cdr(&usages).unwrap();
        let schema = Schema::sequence_of(MULTIPLE_UNIT_USAGE.clone().explicit()).explicit();

        for rules in [EncodingRules::Ber, EncodingRules::Per] {
            let bytes = encode_with(rules, &schema, &value).unwrap();
            assert_eq!(decode_with(rules, &schema, &bytes).unwrap(), value, "{}", rules);
        }
    }

    #[test]
    fn test_usage_error_names_the_rating_group() {
        let usages = vec![
            MultipleUnitUsageInput::default(),
            MultipleUnitUsageInput {
                used_unit_containers: vec![UsedUnitContainerInput {
                    downlink_volume: Some(u64::MAX),
                    ..Default::default()
                }],
                ..Default::default()
            },
        ];
        let err = multiple_unit_usage_to_cdr(&usages).unwrap_err();
        assert_eq!(err.path(), Some("1"));
        assert!(matches!(err.root(), CdrError::ValueOutOfRange(_)));
    }
}

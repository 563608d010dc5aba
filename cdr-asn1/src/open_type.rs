//! OPEN TYPE discriminant resolution

use crate::schema::Field;
use crate::value::{SequenceValue, Value};
use cdr_core::{CdrError, CdrResult};

/// Discriminant carried by a decoded (or to be encoded) field value
///
/// INTEGER and ENUMERATED values are used directly. A CHOICE (or a nested
/// OPEN TYPE) yields the discriminant of its selected alternative and a
/// SEQUENCE the discriminant of its first field.
pub(crate) fn reference_of(value: &Value) -> CdrResult<i64> {
    match value {
        Value::Int(value) => Ok(*value),
        Value::Enumerated(value) => i64::try_from(*value).map_err(|_| {
            CdrError::ValueOutOfRange(format!("ENUMERATED {} as open type reference", value))
        }),
        Value::Choice(choice) => reference_of(&choice.value),
        Value::OpenType(open) => reference_of(&open.value),
        Value::Sequence(sequence) => match sequence.iter().next() {
            Some((_, first)) => reference_of(first),
            None => Err(CdrError::UnexportedOrMalformedSchema(
                "open type reference is an empty SEQUENCE".to_string(),
            )),
        },
        other => Err(CdrError::UnexportedOrMalformedSchema(format!(
            "open type reference cannot be a {}",
            other.variant_name()
        ))),
    }
}

/// Resolve the discriminant of the OPEN TYPE field at `position`
///
/// `name` must be a field declared before `position` in the same SEQUENCE
/// and present in `record`.
pub(crate) fn resolve_reference(
    fields: &[Field],
    position: usize,
    record: &SequenceValue,
    name: &str,
) -> CdrResult<i64> {
    if !fields[..position].iter().any(|field| field.name == name) {
        return Err(CdrError::UnexportedOrMalformedSchema(format!(
            "open type refers to `{}`, which is not an earlier field",
            name
        )));
    }
    let value = record.get(name).ok_or_else(|| {
        CdrError::UnexportedOrMalformedSchema(format!(
            "open type reference field `{}` is absent",
            name
        ))
    })?;
    let reference = reference_of(value)?;
    log::debug!("open type reference `{}` = {}", name, reference);
    Ok(reference)
}

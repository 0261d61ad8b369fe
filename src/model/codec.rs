// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Encoding of model values to and from their structured representation, dispatching tagged unions by
//! discriminant.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::{utxo::UnlockCondition, DecodeError, UnknownVariantError, ValidationError};

/// A closed family of variants that is discriminated by a tag in its structured representation.
pub trait TaggedUnion: Serialize + DeserializeOwned {
    /// The name of the family, used in error reports.
    const FAMILY: &'static str;
    /// Every discriminant this version understands.
    const KINDS: &'static [&'static str];

    /// Extracts the discriminant from a structured value. Defaults to an internal `kind` field.
    fn tag_of(value: &Value) -> Option<&str> {
        value.get("kind").and_then(Value::as_str)
    }

    /// Checks invariants that the structured representation can not express.
    fn verify(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Encodes a value into its structured representation.
pub fn encode<T: Serialize>(value: &T) -> Value {
    // Unwrap: Cannot fail as all model types are well defined.
    serde_json::to_value(value).unwrap()
}

/// Decodes a top-level value of a tagged family. An unrecognized tag fails with [`UnknownVariantError`], and so
/// does an unrecognized unlock condition anywhere inside the value.
pub fn decode<T: TaggedUnion>(value: Value) -> Result<T, DecodeError> {
    if let Some(error) = unknown_tag::<T>(&value).or_else(|| unknown_unlock_condition(&value)) {
        return Err(error.into());
    }
    let decoded = serde_json::from_value::<T>(value)?;
    decoded.verify()?;
    Ok(decoded)
}

/// Decodes a value from JSON text.
pub fn decode_str<T: TaggedUnion>(json: &str) -> Result<T, DecodeError> {
    decode(serde_json::from_str::<Value>(json)?)
}

fn unknown_tag<T: TaggedUnion>(value: &Value) -> Option<UnknownVariantError> {
    T::tag_of(value)
        .filter(|kind| !T::KINDS.contains(kind))
        .map(|kind| UnknownVariantError {
            family: T::FAMILY,
            kind: kind.to_owned(),
        })
}

// Unlock conditions decide who can spend an output, so an unknown one is never skipped.
fn unknown_unlock_condition(value: &Value) -> Option<UnknownVariantError> {
    match value {
        Value::Object(fields) => fields.iter().find_map(|(key, value)| match (key.as_str(), value) {
            ("unlock_conditions", Value::Array(conditions)) => {
                conditions.iter().find_map(unknown_tag::<UnlockCondition>)
            }
            _ => unknown_unlock_condition(value),
        }),
        Value::Array(values) => values.iter().find_map(unknown_unlock_condition),
        _ => None,
    }
}

/// Decodes the elements of a container, skipping elements whose tag is unknown. Elements with a known tag must
/// decode successfully.
pub(crate) fn decode_skipping_unknown<T: TaggedUnion>(values: Vec<Value>) -> Result<Vec<T>, serde_json::Error> {
    let mut decoded = Vec::with_capacity(values.len());
    for value in values {
        let kind = T::tag_of(&value).map(ToOwned::to_owned);
        match kind {
            Some(kind) if !T::KINDS.contains(&kind.as_str()) => {
                tracing::warn!(family = T::FAMILY, %kind, "skipping unknown variant");
            }
            _ => decoded.push(serde_json::from_value(value)?),
        }
    }
    Ok(decoded)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::utxo::{Address, AddressUnlockCondition, BasicOutputBuilder, Ed25519Address, Output};

    fn output_value() -> Value {
        let output = BasicOutputBuilder::new_with_amount(100_000)
            .add_unlock_condition(AddressUnlockCondition::new(Address::from(Ed25519Address::new([1; 32]))))
            .finish_output()
            .unwrap();
        encode(&output)
    }

    #[test]
    fn unknown_nested_unlock_condition_fails_as_unknown_variant() {
        let mut value = output_value();
        value["unlock_conditions"]
            .as_array_mut()
            .unwrap()
            .push(serde_json::json!({ "kind": "quorum" }));
        let result = decode::<Output>(value);
        assert!(
            matches!(
                &result,
                Err(DecodeError::UnknownVariant(e)) if e.family == "unlock condition" && e.kind == "quorum"
            ),
            "{result:?}"
        );
    }

    #[test]
    fn unknown_top_level_kind_wins_over_nested_ones() {
        let mut value = output_value();
        value["kind"] = serde_json::json!("delegation");
        let result = decode::<Output>(value);
        assert!(
            matches!(&result, Err(DecodeError::UnknownVariant(e)) if e.family == "output" && e.kind == "delegation"),
            "{result:?}"
        );
    }
}

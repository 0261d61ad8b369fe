// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Module containing the [`BasicOutput`].

use serde::{Deserialize, Serialize};

use super::{
    feature::{Feature, Features, MetadataFeature, SenderFeature, TagFeature},
    unlock_condition::{
        required, AddressUnlockCondition, ExpirationUnlockCondition, StorageDepositReturnUnlockCondition,
        TimelockUnlockCondition, UnlockCondition, UnlockConditionSlots,
    },
    Address, NativeToken, Output, OutputBuilderAmount, RentStructure,
};
use crate::model::{util::stringify, ValidationError};

/// Represents a basic output in the UTXO model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BasicOutputRepr", into = "BasicOutputRepr")]
pub struct BasicOutput {
    /// Amount of base tokens held by the output.
    pub amount: u64,
    /// Amount of mana held by the output.
    pub mana: u64,
    /// The address unlock condition.
    pub address_unlock_condition: AddressUnlockCondition,
    /// The storage deposit return unlock condition (SDRUC).
    pub storage_deposit_return_unlock_condition: Option<StorageDepositReturnUnlockCondition>,
    /// The timelock unlock condition.
    pub timelock_unlock_condition: Option<TimelockUnlockCondition>,
    /// The expiration unlock condition.
    pub expiration_unlock_condition: Option<ExpirationUnlockCondition>,
    /// The corresponding list of [`Feature`]s.
    pub features: Features,
}

impl BasicOutput {
    /// A `&str` representation of the type.
    pub const KIND: &'static str = "basic";

    const ALLOWED_UNLOCK_CONDITIONS: &'static [u8] = &[
        AddressUnlockCondition::KIND,
        StorageDepositReturnUnlockCondition::KIND,
        TimelockUnlockCondition::KIND,
        ExpirationUnlockCondition::KIND,
    ];
    const ALLOWED_FEATURES: &'static [u8] = &[
        SenderFeature::KIND,
        MetadataFeature::KIND,
        TagFeature::KIND,
        NativeToken::KIND,
    ];

    /// The smallest possible basic output owned by an address. Used to size storage deposits.
    pub fn minimal(address: Address) -> Self {
        Self {
            amount: 0,
            mana: 0,
            address_unlock_condition: AddressUnlockCondition::new(address),
            storage_deposit_return_unlock_condition: None,
            timelock_unlock_condition: None,
            expiration_unlock_condition: None,
            features: Features::default(),
        }
    }

    /// The address the output is locked to.
    pub fn address(&self) -> &Address {
        &self.address_unlock_condition.address
    }

    /// Returns the unlock conditions ordered by kind.
    pub fn unlock_conditions(&self) -> Vec<UnlockCondition> {
        let mut conditions = vec![UnlockCondition::Address(self.address_unlock_condition)];
        conditions.extend(self.storage_deposit_return_unlock_condition.map(UnlockCondition::from));
        conditions.extend(self.timelock_unlock_condition.map(UnlockCondition::from));
        conditions.extend(self.expiration_unlock_condition.map(UnlockCondition::from));
        conditions
    }

    /// Whether the output only carries an address unlock condition and no native token, which makes it usable as a
    /// plain base coin holder.
    pub fn is_simple(&self) -> bool {
        self.storage_deposit_return_unlock_condition.is_none()
            && self.timelock_unlock_condition.is_none()
            && self.expiration_unlock_condition.is_none()
            && self.features.native_token().is_none()
    }

    pub(crate) fn verify(&self) -> Result<(), ValidationError> {
        if let Some(sdr) = &self.storage_deposit_return_unlock_condition {
            sdr.verify_amount(self.amount)?;
        }
        self.features
            .verify_allowed(Self::KIND, Self::ALLOWED_FEATURES, false)
    }
}

/// Builder for a [`BasicOutput`].
#[derive(Clone, Debug)]
#[must_use]
pub struct BasicOutputBuilder {
    amount: OutputBuilderAmount,
    mana: u64,
    unlock_conditions: Vec<UnlockCondition>,
    features: Vec<Feature>,
}

impl BasicOutputBuilder {
    /// Creates a builder for an output holding a fixed amount.
    pub fn new_with_amount(amount: u64) -> Self {
        Self::new(OutputBuilderAmount::Amount(amount))
    }

    /// Creates a builder for an output holding exactly its storage deposit.
    pub fn new_with_minimum_amount(rent: RentStructure) -> Self {
        Self::new(OutputBuilderAmount::MinimumAmount(rent))
    }

    fn new(amount: OutputBuilderAmount) -> Self {
        Self {
            amount,
            mana: 0,
            unlock_conditions: Vec::new(),
            features: Vec::new(),
        }
    }

    /// Replaces the amount with a fixed one.
    pub fn with_amount(mut self, amount: u64) -> Self {
        self.amount = OutputBuilderAmount::Amount(amount);
        self
    }

    /// Sets the stored mana.
    pub fn with_mana(mut self, mana: u64) -> Self {
        self.mana = mana;
        self
    }

    /// Adds an unlock condition.
    pub fn add_unlock_condition(mut self, condition: impl Into<UnlockCondition>) -> Self {
        self.unlock_conditions.push(condition.into());
        self
    }

    /// Adds several unlock conditions.
    pub fn with_unlock_conditions(mut self, conditions: impl IntoIterator<Item = impl Into<UnlockCondition>>) -> Self {
        self.unlock_conditions.extend(conditions.into_iter().map(Into::into));
        self
    }

    /// Adds a feature.
    pub fn add_feature(mut self, feature: impl Into<Feature>) -> Self {
        self.features.push(feature.into());
        self
    }

    /// Adds several features.
    pub fn with_features(mut self, features: impl IntoIterator<Item = impl Into<Feature>>) -> Self {
        self.features.extend(features.into_iter().map(Into::into));
        self
    }

    /// Sets the native token held by the output.
    pub fn with_native_token(self, native_token: NativeToken) -> Self {
        self.add_feature(native_token)
    }

    /// Validates and builds the output.
    pub fn finish(self) -> Result<BasicOutput, ValidationError> {
        let mut slots = UnlockConditionSlots::collect(
            self.unlock_conditions,
            BasicOutput::KIND,
            BasicOutput::ALLOWED_UNLOCK_CONDITIONS,
        )?;
        let mut output = BasicOutput {
            amount: 0,
            mana: self.mana,
            address_unlock_condition: required(slots.address.take(), AddressUnlockCondition::KIND, BasicOutput::KIND)?,
            storage_deposit_return_unlock_condition: slots.storage_deposit_return,
            timelock_unlock_condition: slots.timelock,
            expiration_unlock_condition: slots.expiration,
            features: Features::from_vec(self.features)?,
        };
        output.amount = self.amount.resolve(&output.clone().into());
        output.verify()?;
        Ok(output)
    }

    /// Validates and builds the output as an [`Output`].
    pub fn finish_output(self) -> Result<Output, ValidationError> {
        Ok(Output::Basic(self.finish()?))
    }
}

#[derive(Serialize, Deserialize)]
struct BasicOutputRepr {
    #[serde(with = "stringify")]
    amount: u64,
    #[serde(with = "stringify", default)]
    mana: u64,
    unlock_conditions: Vec<UnlockCondition>,
    #[serde(default, skip_serializing_if = "Features::is_empty")]
    features: Features,
}

impl From<BasicOutput> for BasicOutputRepr {
    fn from(value: BasicOutput) -> Self {
        Self {
            amount: value.amount,
            mana: value.mana,
            unlock_conditions: value.unlock_conditions(),
            features: value.features,
        }
    }
}

impl TryFrom<BasicOutputRepr> for BasicOutput {
    type Error = ValidationError;

    fn try_from(value: BasicOutputRepr) -> Result<Self, Self::Error> {
        BasicOutputBuilder::new_with_amount(value.amount)
            .with_mana(value.mana)
            .with_unlock_conditions(value.unlock_conditions)
            .with_features(value.features)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{
        codec::{decode, encode},
        utxo::{Ed25519Address, IssuerFeature, RentCalculator},
        SlotIndex,
    };

    fn address() -> Address {
        Address::Ed25519(Ed25519Address::new([1; 32]))
    }

    #[test]
    fn two_address_conditions_fail() {
        let result = BasicOutputBuilder::new_with_amount(1_000_000)
            .add_unlock_condition(AddressUnlockCondition::new(address()))
            .add_unlock_condition(AddressUnlockCondition::new(address()))
            .finish();
        assert_eq!(result, Err(ValidationError::DuplicateUnlockCondition("address")));
    }

    #[test]
    fn missing_address_condition_fails() {
        let result = BasicOutputBuilder::new_with_amount(1_000_000)
            .add_unlock_condition(TimelockUnlockCondition::new(SlotIndex(5)))
            .finish();
        assert!(matches!(result, Err(ValidationError::MissingUnlockCondition { .. })));
    }

    #[test]
    fn disallowed_feature_fails() {
        let result = BasicOutputBuilder::new_with_amount(1_000_000)
            .add_unlock_condition(AddressUnlockCondition::new(address()))
            .add_feature(IssuerFeature { address: address() })
            .finish();
        assert!(matches!(result, Err(ValidationError::DisallowedFeature { kind: "issuer", .. })));
    }

    #[test]
    fn minimum_amount_covers_storage_deposit() {
        let rent = RentStructure::default();
        let output = BasicOutputBuilder::new_with_minimum_amount(rent)
            .add_unlock_condition(AddressUnlockCondition::new(address()))
            .add_feature(MetadataFeature::new(vec![0; 100]))
            .finish_output()
            .unwrap();
        assert_eq!(output.amount(), rent.rent_cost(&output));
        assert!(output.verify_storage_deposit(&rent).is_ok());
        let short = output.clone().with_amount(output.amount() - 1);
        assert!(matches!(
            short.verify_storage_deposit(&rent),
            Err(ValidationError::InsufficientStorageDeposit { .. })
        ));
    }

    #[test]
    fn round_trips_with_and_without_optional_fields() {
        let bare = BasicOutputBuilder::new_with_amount(42)
            .add_unlock_condition(AddressUnlockCondition::new(address()))
            .finish_output()
            .unwrap();
        let full = BasicOutputBuilder::new_with_amount(1_000_000)
            .with_mana(7)
            .add_unlock_condition(ExpirationUnlockCondition::new(address(), SlotIndex(9)))
            .add_unlock_condition(AddressUnlockCondition::new(address()))
            .add_unlock_condition(StorageDepositReturnUnlockCondition::new(address(), 50_000))
            .add_unlock_condition(TimelockUnlockCondition::new(SlotIndex(3)))
            .add_feature(TagFeature::new(b"t".to_vec()))
            .add_feature(SenderFeature { address: address() })
            .finish_output()
            .unwrap();
        for output in [bare, full] {
            assert_eq!(decode::<Output>(encode(&output)).unwrap(), output);
        }
    }

    #[test]
    fn decoding_rejects_duplicate_conditions() {
        let value = serde_json::json!({
            "kind": "basic",
            "amount": "100",
            "unlock_conditions": [
                { "kind": "address", "address": { "ed25519": Ed25519Address::new([1; 32]).to_hex() } },
                { "kind": "address", "address": { "ed25519": Ed25519Address::new([2; 32]).to_hex() } },
            ],
        });
        assert!(decode::<Output>(value).is_err());
    }

    #[test]
    fn returned_amount_above_the_output_amount_fails() {
        let result = BasicOutputBuilder::new_with_amount(100_000)
            .add_unlock_condition(AddressUnlockCondition::new(address()))
            .add_unlock_condition(StorageDepositReturnUnlockCondition::new(address(), 200_000))
            .finish();
        assert_eq!(
            result,
            Err(ValidationError::InvalidStorageDepositReturnAmount {
                amount: 200_000,
                minimum: 0,
                maximum: 100_000,
            })
        );

        let output = BasicOutputBuilder::new_with_amount(200_000)
            .add_unlock_condition(AddressUnlockCondition::new(address()))
            .add_unlock_condition(StorageDepositReturnUnlockCondition::new(address(), 200_000))
            .finish_output()
            .unwrap();
        let mut value = encode(&output);
        value["amount"] = serde_json::json!("100000");
        assert!(decode::<Output>(value).is_err());
    }
}

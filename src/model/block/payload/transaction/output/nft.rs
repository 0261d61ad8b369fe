// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Module containing the [`NftOutput`].

use serde::{Deserialize, Serialize};

use super::{
    feature::{Feature, Features, IssuerFeature, MetadataFeature, SenderFeature, TagFeature},
    unlock_condition::{
        required, AddressUnlockCondition, ExpirationUnlockCondition, StorageDepositReturnUnlockCondition,
        TimelockUnlockCondition, UnlockCondition, UnlockConditionSlots,
    },
    Address, Output, OutputBuilderAmount, OutputId, RentStructure,
};
use crate::model::{
    util::{impl_id, stringify},
    ValidationError,
};

impl_id!(
    /// Uniquely identifies an NFT.
    pub NftId,
    32
);

impl NftId {
    /// Returns the id itself, or the id derived from the creating output if it is still null.
    pub fn or_from_output_id(self, output_id: &OutputId) -> Self {
        if self.is_null() {
            Self(output_id.hash())
        } else {
            self
        }
    }
}

/// Represents an NFT in the UTXO model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NftOutputRepr", into = "NftOutputRepr")]
pub struct NftOutput {
    /// Amount of base tokens held by the output.
    pub amount: u64,
    /// Amount of mana held by the output.
    pub mana: u64,
    /// Unique identifier of the NFT.
    pub nft_id: NftId,
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
    /// The corresponding list of immutable [`Feature`]s.
    pub immutable_features: Features,
}

impl NftOutput {
    /// A `&str` representation of the type.
    pub const KIND: &'static str = "nft";

    const ALLOWED_UNLOCK_CONDITIONS: &'static [u8] = &[
        AddressUnlockCondition::KIND,
        StorageDepositReturnUnlockCondition::KIND,
        TimelockUnlockCondition::KIND,
        ExpirationUnlockCondition::KIND,
    ];
    const ALLOWED_FEATURES: &'static [u8] = &[SenderFeature::KIND, MetadataFeature::KIND, TagFeature::KIND];
    const ALLOWED_IMMUTABLE_FEATURES: &'static [u8] = &[IssuerFeature::KIND, MetadataFeature::KIND];

    /// The NFT id, derived from the creating output when the NFT is new.
    pub fn nft_id_non_null(&self, output_id: &OutputId) -> NftId {
        self.nft_id.or_from_output_id(output_id)
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

    pub(crate) fn verify(&self) -> Result<(), ValidationError> {
        if let Some(sdr) = &self.storage_deposit_return_unlock_condition {
            sdr.verify_amount(self.amount)?;
        }
        self.features
            .verify_allowed(Self::KIND, Self::ALLOWED_FEATURES, false)?;
        self.immutable_features
            .verify_allowed(Self::KIND, Self::ALLOWED_IMMUTABLE_FEATURES, true)
    }
}

/// Builder for an [`NftOutput`].
#[derive(Clone, Debug)]
#[must_use]
pub struct NftOutputBuilder {
    amount: OutputBuilderAmount,
    mana: u64,
    nft_id: NftId,
    unlock_conditions: Vec<UnlockCondition>,
    features: Vec<Feature>,
    immutable_features: Vec<Feature>,
}

impl NftOutputBuilder {
    /// Creates a builder for an NFT holding a fixed amount.
    pub fn new_with_amount(amount: u64, nft_id: NftId) -> Self {
        Self::new(OutputBuilderAmount::Amount(amount), nft_id)
    }

    /// Creates a builder for an NFT holding exactly its storage deposit.
    pub fn new_with_minimum_amount(rent: RentStructure, nft_id: NftId) -> Self {
        Self::new(OutputBuilderAmount::MinimumAmount(rent), nft_id)
    }

    fn new(amount: OutputBuilderAmount, nft_id: NftId) -> Self {
        Self {
            amount,
            mana: 0,
            nft_id,
            unlock_conditions: Vec::new(),
            features: Vec::new(),
            immutable_features: Vec::new(),
        }
    }

    /// Starts a transition of an existing NFT. Only the immutable features and the amount are kept.
    pub fn from_output(output: &NftOutput, output_id: &OutputId) -> Self {
        Self {
            amount: OutputBuilderAmount::Amount(output.amount),
            mana: output.mana,
            nft_id: output.nft_id_non_null(output_id),
            unlock_conditions: Vec::new(),
            features: Vec::new(),
            immutable_features: output.immutable_features.clone().into_vec(),
        }
    }

    /// Sets the amount to exactly the storage deposit of the finished output.
    pub fn with_minimum_amount(mut self, rent: RentStructure) -> Self {
        self.amount = OutputBuilderAmount::MinimumAmount(rent);
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

    /// Adds an immutable feature.
    pub fn add_immutable_feature(mut self, feature: impl Into<Feature>) -> Self {
        self.immutable_features.push(feature.into());
        self
    }

    /// Adds several immutable features.
    pub fn with_immutable_features(mut self, features: impl IntoIterator<Item = impl Into<Feature>>) -> Self {
        self.immutable_features.extend(features.into_iter().map(Into::into));
        self
    }

    /// Validates and builds the output.
    pub fn finish(self) -> Result<NftOutput, ValidationError> {
        let slots = UnlockConditionSlots::collect(
            self.unlock_conditions,
            NftOutput::KIND,
            NftOutput::ALLOWED_UNLOCK_CONDITIONS,
        )?;
        let mut output = NftOutput {
            amount: 0,
            mana: self.mana,
            nft_id: self.nft_id,
            address_unlock_condition: required(slots.address, AddressUnlockCondition::KIND, NftOutput::KIND)?,
            storage_deposit_return_unlock_condition: slots.storage_deposit_return,
            timelock_unlock_condition: slots.timelock,
            expiration_unlock_condition: slots.expiration,
            features: Features::from_vec(self.features)?,
            immutable_features: Features::from_vec(self.immutable_features)?,
        };
        output.amount = self.amount.resolve(&output.clone().into());
        output.verify()?;
        Ok(output)
    }

    /// Validates and builds the output as an [`Output`].
    pub fn finish_output(self) -> Result<Output, ValidationError> {
        Ok(Output::Nft(self.finish()?))
    }
}

#[derive(Serialize, Deserialize)]
struct NftOutputRepr {
    #[serde(with = "stringify")]
    amount: u64,
    #[serde(with = "stringify", default)]
    mana: u64,
    nft_id: NftId,
    unlock_conditions: Vec<UnlockCondition>,
    #[serde(default, skip_serializing_if = "Features::is_empty")]
    features: Features,
    #[serde(default, skip_serializing_if = "Features::is_empty")]
    immutable_features: Features,
}

impl From<NftOutput> for NftOutputRepr {
    fn from(value: NftOutput) -> Self {
        Self {
            amount: value.amount,
            mana: value.mana,
            nft_id: value.nft_id,
            unlock_conditions: value.unlock_conditions(),
            features: value.features,
            immutable_features: value.immutable_features,
        }
    }
}

impl TryFrom<NftOutputRepr> for NftOutput {
    type Error = ValidationError;

    fn try_from(value: NftOutputRepr) -> Result<Self, Self::Error> {
        NftOutputBuilder::new_with_amount(value.amount, value.nft_id)
            .with_mana(value.mana)
            .with_unlock_conditions(value.unlock_conditions)
            .with_features(value.features)
            .with_immutable_features(value.immutable_features)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{
        codec::{decode, encode},
        utxo::Ed25519Address,
        SlotIndex,
    };

    #[test]
    fn round_trips_with_optional_conditions() {
        let address = Address::Ed25519(Ed25519Address::new([4; 32]));
        let output = NftOutputBuilder::new_with_amount(60_000, NftId::new([8; 32]))
            .add_unlock_condition(AddressUnlockCondition::new(address))
            .add_unlock_condition(ExpirationUnlockCondition::new(address, SlotIndex(100)))
            .add_feature(TagFeature::new(b"nft".to_vec()))
            .add_immutable_feature(MetadataFeature::new(b"{\"standard\":\"IRC27\"}".to_vec()))
            .finish_output()
            .unwrap();
        assert_eq!(decode::<Output>(encode(&output)).unwrap(), output);
    }

    #[test]
    fn immutable_sender_is_not_allowed() {
        let address = Address::Ed25519(Ed25519Address::new([4; 32]));
        let result = NftOutputBuilder::new_with_amount(60_000, NftId::null())
            .add_unlock_condition(AddressUnlockCondition::new(address))
            .add_immutable_feature(SenderFeature { address })
            .finish();
        assert_eq!(
            result,
            Err(ValidationError::DisallowedFeature {
                kind: "sender",
                output: "nft",
                immutable: true,
            })
        );
    }
}

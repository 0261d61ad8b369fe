// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Module containing the [`AccountOutput`].

use serde::{Deserialize, Serialize};

use super::{
    feature::{
        BlockIssuerFeature, Feature, Features, IssuerFeature, MetadataFeature, SenderFeature, StakingFeature,
        StateMetadataFeature,
    },
    unlock_condition::{
        required, GovernorAddressUnlockCondition, StateControllerAddressUnlockCondition, UnlockCondition,
        UnlockConditionSlots,
    },
    Address, Output, OutputBuilderAmount, OutputId, RentStructure,
};
use crate::model::{
    util::{impl_id, stringify},
    ValidationError,
};

impl_id!(
    /// Uniquely identifies an account. Called alias on legacy networks.
    pub AccountId,
    32
);

impl AccountId {
    /// Returns the id itself, or the id derived from the creating output if it is still null.
    pub fn or_from_output_id(self, output_id: &OutputId) -> Self {
        if self.is_null() {
            Self(output_id.hash())
        } else {
            self
        }
    }
}

/// Represents an account in the UTXO model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AccountOutputRepr", into = "AccountOutputRepr")]
pub struct AccountOutput {
    /// Amount of base tokens held by the output.
    pub amount: u64,
    /// Amount of mana held by the output.
    pub mana: u64,
    /// Unique identifier of the account.
    pub account_id: AccountId,
    /// A counter that must increase by 1 every time the account is state transitioned.
    pub state_index: u32,
    /// A counter that denotes the number of foundries created by this account.
    pub foundry_counter: u32,
    /// The state controller unlock condition.
    pub state_controller_address_unlock_condition: StateControllerAddressUnlockCondition,
    /// The governor unlock condition.
    pub governor_address_unlock_condition: GovernorAddressUnlockCondition,
    /// The corresponding list of [`Feature`]s.
    pub features: Features,
    /// The corresponding list of immutable [`Feature`]s.
    pub immutable_features: Features,
}

impl AccountOutput {
    /// A `&str` representation of the type.
    pub const KIND: &'static str = "account";

    const ALLOWED_UNLOCK_CONDITIONS: &'static [u8] = &[
        StateControllerAddressUnlockCondition::KIND,
        GovernorAddressUnlockCondition::KIND,
    ];
    const ALLOWED_FEATURES: &'static [u8] = &[
        SenderFeature::KIND,
        MetadataFeature::KIND,
        StateMetadataFeature::KIND,
        BlockIssuerFeature::KIND,
        StakingFeature::KIND,
    ];
    const ALLOWED_IMMUTABLE_FEATURES: &'static [u8] = &[IssuerFeature::KIND, MetadataFeature::KIND];

    /// The account id, derived from the creating output when the account is new.
    pub fn account_id_non_null(&self, output_id: &OutputId) -> AccountId {
        self.account_id.or_from_output_id(output_id)
    }

    /// The state controller address.
    pub fn state_controller_address(&self) -> &Address {
        &self.state_controller_address_unlock_condition.address
    }

    /// The governor address.
    pub fn governor_address(&self) -> &Address {
        &self.governor_address_unlock_condition.address
    }

    /// Returns the unlock conditions ordered by kind.
    pub fn unlock_conditions(&self) -> Vec<UnlockCondition> {
        vec![
            self.state_controller_address_unlock_condition.into(),
            self.governor_address_unlock_condition.into(),
        ]
    }

    pub(crate) fn verify(&self) -> Result<(), ValidationError> {
        self.features
            .verify_allowed(Self::KIND, Self::ALLOWED_FEATURES, false)?;
        self.immutable_features
            .verify_allowed(Self::KIND, Self::ALLOWED_IMMUTABLE_FEATURES, true)
    }
}

/// Builder for an [`AccountOutput`].
#[derive(Clone, Debug)]
#[must_use]
pub struct AccountOutputBuilder {
    amount: OutputBuilderAmount,
    mana: u64,
    account_id: AccountId,
    state_index: u32,
    foundry_counter: u32,
    unlock_conditions: Vec<UnlockCondition>,
    features: Vec<Feature>,
    immutable_features: Vec<Feature>,
}

impl AccountOutputBuilder {
    /// Creates a builder for an account holding a fixed amount.
    pub fn new_with_amount(amount: u64, account_id: AccountId) -> Self {
        Self::new(OutputBuilderAmount::Amount(amount), account_id)
    }

    /// Creates a builder for an account holding exactly its storage deposit.
    pub fn new_with_minimum_amount(rent: RentStructure, account_id: AccountId) -> Self {
        Self::new(OutputBuilderAmount::MinimumAmount(rent), account_id)
    }

    fn new(amount: OutputBuilderAmount, account_id: AccountId) -> Self {
        Self {
            amount,
            mana: 0,
            account_id,
            state_index: 0,
            foundry_counter: 0,
            unlock_conditions: Vec::new(),
            features: Vec::new(),
            immutable_features: Vec::new(),
        }
    }

    /// Starts a transition of an existing account. A null account id is replaced by the derived one.
    pub fn from_output(output: &AccountOutput, output_id: &OutputId) -> Self {
        Self {
            amount: OutputBuilderAmount::Amount(output.amount),
            mana: output.mana,
            account_id: output.account_id_non_null(output_id),
            state_index: output.state_index,
            foundry_counter: output.foundry_counter,
            unlock_conditions: output.unlock_conditions(),
            features: output.features.clone().into_vec(),
            immutable_features: output.immutable_features.clone().into_vec(),
        }
    }

    /// Sets the amount.
    pub fn with_amount(mut self, amount: u64) -> Self {
        self.amount = OutputBuilderAmount::Amount(amount);
        self
    }

    /// Sets the stored mana.
    pub fn with_mana(mut self, mana: u64) -> Self {
        self.mana = mana;
        self
    }

    /// Sets the state index.
    pub fn with_state_index(mut self, state_index: u32) -> Self {
        self.state_index = state_index;
        self
    }

    /// Sets the foundry counter.
    pub fn with_foundry_counter(mut self, foundry_counter: u32) -> Self {
        self.foundry_counter = foundry_counter;
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
    pub fn finish(self) -> Result<AccountOutput, ValidationError> {
        let slots = UnlockConditionSlots::collect(
            self.unlock_conditions,
            AccountOutput::KIND,
            AccountOutput::ALLOWED_UNLOCK_CONDITIONS,
        )?;
        let output = AccountOutput {
            amount: 0,
            mana: self.mana,
            account_id: self.account_id,
            state_index: self.state_index,
            foundry_counter: self.foundry_counter,
            state_controller_address_unlock_condition: required(
                slots.state_controller_address,
                StateControllerAddressUnlockCondition::KIND,
                AccountOutput::KIND,
            )?,
            governor_address_unlock_condition: required(
                slots.governor_address,
                GovernorAddressUnlockCondition::KIND,
                AccountOutput::KIND,
            )?,
            features: Features::from_vec(self.features)?,
            immutable_features: Features::from_vec(self.immutable_features)?,
        };
        output.verify()?;
        let amount = self.amount.resolve(&output.clone().into());
        Ok(AccountOutput { amount, ..output })
    }

    /// Validates and builds the output as an [`Output`].
    pub fn finish_output(self) -> Result<Output, ValidationError> {
        Ok(Output::Account(self.finish()?))
    }
}

#[derive(Serialize, Deserialize)]
struct AccountOutputRepr {
    #[serde(with = "stringify")]
    amount: u64,
    #[serde(with = "stringify", default)]
    mana: u64,
    #[serde(alias = "alias_id")]
    account_id: AccountId,
    state_index: u32,
    foundry_counter: u32,
    unlock_conditions: Vec<UnlockCondition>,
    #[serde(default, skip_serializing_if = "Features::is_empty")]
    features: Features,
    #[serde(default, skip_serializing_if = "Features::is_empty")]
    immutable_features: Features,
}

impl From<AccountOutput> for AccountOutputRepr {
    fn from(value: AccountOutput) -> Self {
        Self {
            amount: value.amount,
            mana: value.mana,
            account_id: value.account_id,
            state_index: value.state_index,
            foundry_counter: value.foundry_counter,
            unlock_conditions: value.unlock_conditions(),
            features: value.features,
            immutable_features: value.immutable_features,
        }
    }
}

impl TryFrom<AccountOutputRepr> for AccountOutput {
    type Error = ValidationError;

    fn try_from(value: AccountOutputRepr) -> Result<Self, Self::Error> {
        AccountOutputBuilder::new_with_amount(value.amount, value.account_id)
            .with_mana(value.mana)
            .with_state_index(value.state_index)
            .with_foundry_counter(value.foundry_counter)
            .with_unlock_conditions(value.unlock_conditions)
            .with_features(value.features)
            .with_immutable_features(value.immutable_features)
            .finish()
    }
}

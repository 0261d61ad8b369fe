// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Module containing the foundry output.

use serde::{Deserialize, Serialize};

use super::{
    feature::{Feature, Features, MetadataFeature},
    unlock_condition::{required, ImmutableAccountAddressUnlockCondition, UnlockCondition, UnlockConditionSlots},
    AccountAddress, AccountId, NativeToken, Output, OutputBuilderAmount, RentStructure, TokenId, TokenScheme,
};
use crate::model::{
    util::{impl_id, stringify},
    ValidationError,
};

impl_id!(
    /// The identifier of a foundry: the controlling account address, the serial number and the token scheme kind.
    pub FoundryId,
    38
);

impl FoundryId {
    /// Computes the id of the foundry with the given serial number controlled by an account.
    pub fn build(account_address: &AccountAddress, serial_number: u32, token_scheme_kind: u8) -> Self {
        let mut bytes = [0; 38];
        bytes[0] = AccountAddress::KIND;
        bytes[1..33].copy_from_slice(account_address.account_id().as_ref());
        bytes[33..37].copy_from_slice(&serial_number.to_le_bytes());
        bytes[37] = token_scheme_kind;
        Self(bytes)
    }

    /// The account that controls the foundry.
    pub fn account_address(&self) -> AccountAddress {
        let mut id = [0; 32];
        id.copy_from_slice(&self.0[1..33]);
        AccountAddress(AccountId(id))
    }

    /// The serial number of the foundry within its account.
    pub fn serial_number(&self) -> u32 {
        u32::from_le_bytes([self.0[33], self.0[34], self.0[35], self.0[36]])
    }
}

/// Represents a foundry in the UTXO model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FoundryOutputRepr", into = "FoundryOutputRepr")]
pub struct FoundryOutput {
    /// Amount of base tokens held by the output.
    pub amount: u64,
    /// The serial number of the foundry.
    pub serial_number: u32,
    /// The [`TokenScheme`] of the underlying token.
    pub token_scheme: TokenScheme,
    /// The immutable account address unlock condition.
    pub immutable_account_address_unlock_condition: ImmutableAccountAddressUnlockCondition,
    /// The corresponding list of [`Feature`]s.
    pub features: Features,
    /// The corresponding list of immutable [`Feature`]s.
    pub immutable_features: Features,
}

impl FoundryOutput {
    /// A `&str` representation of the type.
    pub const KIND: &'static str = "foundry";

    const ALLOWED_UNLOCK_CONDITIONS: &'static [u8] = &[ImmutableAccountAddressUnlockCondition::KIND];
    const ALLOWED_FEATURES: &'static [u8] = &[MetadataFeature::KIND, NativeToken::KIND];
    const ALLOWED_IMMUTABLE_FEATURES: &'static [u8] = &[MetadataFeature::KIND];

    /// The associated id of the foundry.
    pub fn id(&self) -> FoundryId {
        FoundryId::build(self.account_address(), self.serial_number, self.token_scheme.kind())
    }

    /// The id of the native token whose supply the foundry controls.
    pub fn token_id(&self) -> TokenId {
        self.id().into()
    }

    /// The controlling account.
    pub fn account_address(&self) -> &AccountAddress {
        &self.immutable_account_address_unlock_condition.address
    }

    /// Returns the unlock conditions ordered by kind.
    pub fn unlock_conditions(&self) -> Vec<UnlockCondition> {
        vec![self.immutable_account_address_unlock_condition.into()]
    }

    pub(crate) fn verify(&self) -> Result<(), ValidationError> {
        self.features
            .verify_allowed(Self::KIND, Self::ALLOWED_FEATURES, false)?;
        self.immutable_features
            .verify_allowed(Self::KIND, Self::ALLOWED_IMMUTABLE_FEATURES, true)
    }
}

/// Builder for a [`FoundryOutput`].
#[derive(Clone, Debug)]
#[must_use]
pub struct FoundryOutputBuilder {
    amount: OutputBuilderAmount,
    serial_number: u32,
    token_scheme: TokenScheme,
    unlock_conditions: Vec<UnlockCondition>,
    features: Vec<Feature>,
    immutable_features: Vec<Feature>,
}

impl FoundryOutputBuilder {
    /// Creates a builder for a foundry holding a fixed amount.
    pub fn new_with_amount(amount: u64, serial_number: u32, token_scheme: TokenScheme) -> Self {
        Self::new(OutputBuilderAmount::Amount(amount), serial_number, token_scheme)
    }

    /// Creates a builder for a foundry holding exactly its storage deposit.
    pub fn new_with_minimum_amount(rent: RentStructure, serial_number: u32, token_scheme: TokenScheme) -> Self {
        Self::new(OutputBuilderAmount::MinimumAmount(rent), serial_number, token_scheme)
    }

    fn new(amount: OutputBuilderAmount, serial_number: u32, token_scheme: TokenScheme) -> Self {
        Self {
            amount,
            serial_number,
            token_scheme,
            unlock_conditions: Vec::new(),
            features: Vec::new(),
            immutable_features: Vec::new(),
        }
    }

    /// Starts a transition of an existing foundry.
    pub fn from_output(output: &FoundryOutput) -> Self {
        Self {
            amount: OutputBuilderAmount::Amount(output.amount),
            serial_number: output.serial_number,
            token_scheme: output.token_scheme,
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

    /// Sets the token scheme.
    pub fn with_token_scheme(mut self, token_scheme: TokenScheme) -> Self {
        self.token_scheme = token_scheme;
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

    /// Replaces the native token held by the foundry. `None` removes it.
    pub fn with_native_token(mut self, native_token: Option<NativeToken>) -> Self {
        self.features.retain(|f| f.kind() != NativeToken::KIND);
        self.features.extend(native_token.map(Feature::from));
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
    pub fn finish(self) -> Result<FoundryOutput, ValidationError> {
        let slots = UnlockConditionSlots::collect(
            self.unlock_conditions,
            FoundryOutput::KIND,
            FoundryOutput::ALLOWED_UNLOCK_CONDITIONS,
        )?;
        let output = FoundryOutput {
            amount: 0,
            serial_number: self.serial_number,
            token_scheme: self.token_scheme,
            immutable_account_address_unlock_condition: required(
                slots.immutable_account_address,
                ImmutableAccountAddressUnlockCondition::KIND,
                FoundryOutput::KIND,
            )?,
            features: Features::from_vec(self.features)?,
            immutable_features: Features::from_vec(self.immutable_features)?,
        };
        output.verify()?;
        let amount = self.amount.resolve(&output.clone().into());
        Ok(FoundryOutput { amount, ..output })
    }

    /// Validates and builds the output as an [`Output`].
    pub fn finish_output(self) -> Result<Output, ValidationError> {
        Ok(Output::Foundry(self.finish()?))
    }
}

#[derive(Serialize, Deserialize)]
struct FoundryOutputRepr {
    #[serde(with = "stringify")]
    amount: u64,
    serial_number: u32,
    token_scheme: TokenScheme,
    unlock_conditions: Vec<UnlockCondition>,
    #[serde(default, skip_serializing_if = "Features::is_empty")]
    features: Features,
    #[serde(default, skip_serializing_if = "Features::is_empty")]
    immutable_features: Features,
}

impl From<FoundryOutput> for FoundryOutputRepr {
    fn from(value: FoundryOutput) -> Self {
        Self {
            amount: value.amount,
            serial_number: value.serial_number,
            token_scheme: value.token_scheme,
            unlock_conditions: value.unlock_conditions(),
            features: value.features,
            immutable_features: value.immutable_features,
        }
    }
}

impl TryFrom<FoundryOutputRepr> for FoundryOutput {
    type Error = ValidationError;

    fn try_from(value: FoundryOutputRepr) -> Result<Self, Self::Error> {
        FoundryOutputBuilder::new_with_amount(value.amount, value.serial_number, value.token_scheme)
            .with_unlock_conditions(value.unlock_conditions)
            .with_features(value.features)
            .with_immutable_features(value.immutable_features)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use primitive_types::U256;

    use super::*;
    use crate::model::{
        codec::{decode, encode},
        utxo::SimpleTokenScheme,
    };

    fn scheme() -> TokenScheme {
        TokenScheme::Simple(SimpleTokenScheme::new(U256::from(100u64), U256::zero(), U256::from(1000u64)).unwrap())
    }

    #[test]
    fn id_encodes_account_serial_and_scheme() {
        let account = AccountAddress(AccountId::new([5; 32]));
        let id = FoundryId::build(&account, 3, 0);
        assert_eq!(id.account_address(), account);
        assert_eq!(id.serial_number(), 3);
        assert_eq!(id.0[0], AccountAddress::KIND);
        assert_eq!(TokenId::from(id).0, id.0);
    }

    #[test]
    fn round_trips_with_native_token() {
        let account = AccountAddress(AccountId::new([5; 32]));
        let token_id = FoundryId::build(&account, 1, 0).into();
        let output = FoundryOutputBuilder::new_with_amount(80_000, 1, scheme())
            .add_unlock_condition(ImmutableAccountAddressUnlockCondition::new(account))
            .with_native_token(Some(NativeToken::new(token_id, U256::from(100u64)).unwrap()))
            .add_immutable_feature(MetadataFeature::new(b"token".to_vec()))
            .finish_output()
            .unwrap();
        assert_eq!(output.chain_id(), Some(super::super::ChainId::Foundry(token_id.into())));
        assert_eq!(decode::<Output>(encode(&output)).unwrap(), output);
    }

    #[test]
    fn requires_account_condition() {
        let result = FoundryOutputBuilder::new_with_amount(80_000, 1, scheme()).finish();
        assert_eq!(
            result,
            Err(ValidationError::MissingUnlockCondition {
                kind: "immutable_account_address",
                output: "foundry",
            })
        );
    }
}

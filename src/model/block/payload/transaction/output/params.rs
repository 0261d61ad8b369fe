// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Parameter records from which outputs are built.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use super::{
    AccountId, AccountOutputBuilder, BasicOutputBuilder, Feature, FoundryOutputBuilder, NativeToken, NftId,
    NftOutputBuilder, Output, RentCalculator, TokenScheme, UnlockCondition,
};
use crate::model::{util::parse_amount, ValidationError};

/// Parameters of a basic output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicOutputParams {
    /// The amount as decimal or hex text. The minimum storage deposit is used if omitted.
    pub amount: Option<String>,
    pub unlock_conditions: Vec<UnlockCondition>,
    pub native_token: Option<NativeToken>,
    pub features: Vec<Feature>,
    /// Basic outputs have no immutable features, so this must stay empty.
    pub immutable_features: Vec<Feature>,
    #[serde(with = "crate::model::util::stringify")]
    pub mana: u64,
}

/// Parameters of an account output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountOutputParams {
    pub amount: Option<String>,
    pub unlock_conditions: Vec<UnlockCondition>,
    pub native_token: Option<NativeToken>,
    pub features: Vec<Feature>,
    pub immutable_features: Vec<Feature>,
    /// The account to transition. A new account is created if omitted.
    pub account_id: Option<AccountId>,
    pub state_index: u32,
    pub foundry_counter: u32,
}

/// Parameters of a foundry output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundryOutputParams {
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub unlock_conditions: Vec<UnlockCondition>,
    #[serde(default)]
    pub native_token: Option<NativeToken>,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub immutable_features: Vec<Feature>,
    pub serial_number: u32,
    pub token_scheme: TokenScheme,
}

/// Parameters of an NFT output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NftOutputParams {
    pub amount: Option<String>,
    pub unlock_conditions: Vec<UnlockCondition>,
    pub native_token: Option<NativeToken>,
    pub features: Vec<Feature>,
    pub immutable_features: Vec<Feature>,
    /// The NFT to transition. A new NFT is minted if omitted.
    pub nft_id: Option<NftId>,
}

/// Describes an output to be built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, derive_more::From)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum OutputParams {
    Basic(BasicOutputParams),
    #[serde(alias = "alias")]
    Account(AccountOutputParams),
    Foundry(FoundryOutputParams),
    Nft(NftOutputParams),
}

impl OutputParams {
    /// Builds the output. If no amount is given, the output holds exactly its storage deposit.
    pub fn build(self, rent: &impl RentCalculator) -> Result<Output, ValidationError> {
        let amount = match self.amount() {
            Some(amount) => Some(parse_amount(amount)?),
            None => None,
        };
        let output = match self {
            Self::Basic(p) => {
                if let Some(feature) = p.immutable_features.first() {
                    return Err(ValidationError::DisallowedFeature {
                        kind: feature.name(),
                        output: super::BasicOutput::KIND,
                        immutable: true,
                    });
                }
                BasicOutputBuilder::new_with_amount(0)
                    .with_mana(p.mana)
                    .with_unlock_conditions(p.unlock_conditions)
                    .with_features(p.features.into_iter().chain(p.native_token.map(Feature::from)))
                    .finish_output()?
            }
            Self::Account(p) => AccountOutputBuilder::new_with_amount(0, p.account_id.unwrap_or_else(AccountId::null))
                .with_state_index(p.state_index)
                .with_foundry_counter(p.foundry_counter)
                .with_unlock_conditions(p.unlock_conditions)
                .with_features(p.features.into_iter().chain(p.native_token.map(Feature::from)))
                .with_immutable_features(p.immutable_features)
                .finish_output()?,
            Self::Foundry(p) => FoundryOutputBuilder::new_with_amount(0, p.serial_number, p.token_scheme)
                .with_unlock_conditions(p.unlock_conditions)
                .with_features(p.features.into_iter().chain(p.native_token.map(Feature::from)))
                .with_immutable_features(p.immutable_features)
                .finish_output()?,
            Self::Nft(p) => NftOutputBuilder::new_with_amount(0, p.nft_id.unwrap_or_else(NftId::null))
                .with_unlock_conditions(p.unlock_conditions)
                .with_features(p.features.into_iter().chain(p.native_token.map(Feature::from)))
                .with_immutable_features(p.immutable_features)
                .finish_output()?,
        };
        let amount = amount.unwrap_or_else(|| rent.rent_cost(&output));
        let output = output.with_amount(amount);
        output.verify_storage_deposit(rent)?;
        Ok(output)
    }

    fn amount(&self) -> Option<&str> {
        match self {
            Self::Basic(p) => p.amount.as_deref(),
            Self::Account(p) => p.amount.as_deref(),
            Self::Foundry(p) => p.amount.as_deref(),
            Self::Nft(p) => p.amount.as_deref(),
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{
        utxo::{
            AddressUnlockCondition, Ed25519Address, GovernorAddressUnlockCondition, RentStructure,
            StateControllerAddressUnlockCondition, TimelockUnlockCondition,
        },
        SlotIndex,
    };

    fn owner() -> UnlockCondition {
        AddressUnlockCondition::new(Ed25519Address::new([6; 32])).into()
    }

    #[test]
    fn omitted_amount_is_the_storage_deposit() {
        let rent = RentStructure::default();
        let output = OutputParams::from(BasicOutputParams {
            unlock_conditions: vec![owner()],
            ..Default::default()
        })
        .build(&rent)
        .unwrap();
        assert_eq!(output.amount(), rent.rent_cost(&output));
    }

    #[test]
    fn explicit_amount_accepts_hex() {
        let output = OutputParams::from(BasicOutputParams {
            amount: Some("0xf4240".to_owned()),
            unlock_conditions: vec![owner()],
            ..Default::default()
        })
        .build(&RentStructure::default())
        .unwrap();
        assert_eq!(output.amount(), 1_000_000);
    }

    fn build_with_amount(amount: &str) -> Result<Output, ValidationError> {
        OutputParams::from(BasicOutputParams {
            amount: Some(amount.to_owned()),
            unlock_conditions: vec![owner()],
            ..Default::default()
        })
        .build(&RentStructure::default())
    }

    #[test]
    fn bad_amounts_are_rejected() {
        assert!(matches!(build_with_amount("-1"), Err(ValidationError::NegativeAmount(_))));
        assert!(matches!(build_with_amount("lots"), Err(ValidationError::InvalidAmount(_))));
        assert!(matches!(
            build_with_amount("99999999999999999999"),
            Err(ValidationError::AmountOverflow)
        ));
        assert!(matches!(
            build_with_amount("10"),
            Err(ValidationError::InsufficientStorageDeposit { .. })
        ));
    }

    #[test]
    fn bad_unlock_condition_sets_are_rejected() {
        let duplicate = OutputParams::from(BasicOutputParams {
            unlock_conditions: vec![owner(), owner()],
            ..Default::default()
        });
        assert!(matches!(
            duplicate.build(&RentStructure::default()),
            Err(ValidationError::DuplicateUnlockCondition("address"))
        ));
        let missing = OutputParams::from(BasicOutputParams {
            unlock_conditions: vec![TimelockUnlockCondition::new(SlotIndex(7)).into()],
            ..Default::default()
        });
        assert!(matches!(
            missing.build(&RentStructure::default()),
            Err(ValidationError::MissingUnlockCondition { .. })
        ));
    }

    #[test]
    fn account_params_build_a_new_account() {
        let address = Ed25519Address::new([6; 32]);
        let params: OutputParams = serde_json::from_value(serde_json::json!({
            "kind": "account",
            "unlock_conditions": [
                { "kind": "state_controller_address", "address": { "ed25519": address.to_hex() } },
                { "kind": "governor_address", "address": { "ed25519": address.to_hex() } },
            ],
        }))
        .unwrap();
        let output = params.build(&RentStructure::default()).unwrap();
        match output {
            Output::Account(account) => {
                assert!(account.account_id.is_null());
                assert_eq!(
                    account.unlock_conditions(),
                    vec![
                        StateControllerAddressUnlockCondition::new(address).into(),
                        GovernorAddressUnlockCondition::new(address).into(),
                    ]
                );
            }
            other => panic!("unexpected output {other:?}"),
        }
    }
}

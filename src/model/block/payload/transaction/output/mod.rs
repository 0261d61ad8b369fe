// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Module containing the [`Output`] types.

pub mod account;
pub mod address;
pub mod basic;
pub mod feature;
pub mod foundry;
pub mod native_token;
pub mod nft;
pub mod params;
pub mod rent;
pub mod treasury;
pub mod unlock_condition;

use core::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub use self::{
    account::{AccountId, AccountOutput, AccountOutputBuilder},
    address::{AccountAddress, Address, Bech32Address, Ed25519Address, NftAddress},
    basic::{BasicOutput, BasicOutputBuilder},
    feature::{Feature, Features},
    foundry::{FoundryId, FoundryOutput, FoundryOutputBuilder},
    native_token::{NativeToken, SimpleTokenScheme, TokenId, TokenScheme},
    nft::{NftId, NftOutput, NftOutputBuilder},
    params::OutputParams,
    rent::{PackedLen, RentCalculator, RentStructure},
    treasury::TreasuryOutput,
    unlock_condition::UnlockCondition,
};
use super::TransactionId;
use crate::model::{
    codec::TaggedUnion,
    util::{blake2b_256, decode_hex_array},
    SlotIndex, ValidationError,
};

/// The index of an output within a transaction.
pub type OutputIndex = u16;

/// An id which uniquely identifies an output. It is computed from the corresponding [`TransactionId`], as well as the
/// [`OutputIndex`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputId {
    /// The transaction id part of the [`OutputId`].
    pub transaction_id: TransactionId,
    /// The output index part of the [`OutputId`].
    pub index: OutputIndex,
}

impl OutputId {
    /// The length of the binary representation.
    pub const LENGTH: usize = 34;

    /// Creates a new output id.
    pub fn new(transaction_id: TransactionId, index: OutputIndex) -> Self {
        Self { transaction_id, index }
    }

    /// Converts the [`OutputId`] to its `0x`-prefixed hex representation.
    pub fn to_hex(&self) -> String {
        prefix_hex::encode(&self.as_bytes()[..])
    }

    /// Hash the [`OutputId`] with BLAKE2b-256.
    #[inline(always)]
    pub fn hash(&self) -> [u8; 32] {
        blake2b_256(self.as_bytes())
    }

    fn as_bytes(&self) -> [u8; 34] {
        let mut bytes = [0; 34];
        bytes[..TransactionId::LENGTH].copy_from_slice(self.transaction_id.as_ref());
        bytes[TransactionId::LENGTH..].copy_from_slice(&self.index.to_le_bytes());
        bytes
    }
}

impl From<(TransactionId, OutputIndex)> for OutputId {
    fn from((transaction_id, index): (TransactionId, OutputIndex)) -> Self {
        Self { transaction_id, index }
    }
}

impl FromStr for OutputId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_hex_array::<34>(s)?;
        let mut transaction_id = [0; 32];
        transaction_id.copy_from_slice(&bytes[..32]);
        Ok(Self {
            transaction_id: TransactionId(transaction_id),
            index: u16::from_le_bytes([bytes[32], bytes[33]]),
        })
    }
}

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputId({})", self.to_hex())
    }
}

impl Serialize for OutputId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OutputId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        crate::model::util::stringify::deserialize(deserializer)
    }
}

/// The amount of an output under construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OutputBuilderAmount {
    /// A fixed amount.
    Amount(u64),
    /// The minimum amount that covers the storage deposit of the output.
    MinimumAmount(RentStructure),
}

impl OutputBuilderAmount {
    pub(crate) fn resolve(self, output: &Output) -> u64 {
        match self {
            Self::Amount(amount) => amount,
            Self::MinimumAmount(rent) => rent.rent_cost(output),
        }
    }
}

/// The identifier of a chain output, which persists across state transitions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::From)]
#[serde(rename_all = "snake_case")]
pub enum ChainId {
    /// An account chain.
    Account(AccountId),
    /// A foundry chain.
    Foundry(FoundryId),
    /// An NFT chain.
    Nft(NftId),
}

impl ChainId {
    /// Whether the chain is created by this output.
    pub fn is_null(&self) -> bool {
        match self {
            Self::Account(id) => id.is_null(),
            Self::Foundry(id) => id.is_null(),
            Self::Nft(id) => id.is_null(),
        }
    }

    /// Replaces a null id with the one derived from the creating output.
    pub fn or_from_output_id(self, output_id: &OutputId) -> Self {
        match self {
            Self::Account(id) => Self::Account(id.or_from_output_id(output_id)),
            Self::Foundry(id) => Self::Foundry(id),
            Self::Nft(id) => Self::Nft(id.or_from_output_id(output_id)),
        }
    }

    /// The address controlled by the chain, if any.
    pub fn to_address(&self) -> Option<Address> {
        match self {
            Self::Account(id) => Some(Address::from(*id)),
            Self::Nft(id) => Some(Address::from(*id)),
            Self::Foundry(_) => None,
        }
    }

    /// A short name of the chain kind.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Account(_) => AccountOutput::KIND,
            Self::Foundry(_) => FoundryOutput::KIND,
            Self::Nft(_) => NftOutput::KIND,
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account(id) => write!(f, "account {id}"),
            Self::Foundry(id) => write!(f, "foundry {id}"),
            Self::Nft(id) => write!(f, "nft {id}"),
        }
    }
}

/// Represents the different output types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, derive_more::From)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Output {
    /// The [`TreasuryOutput`] variant. This is a leftover from the Chrysalis update.
    Treasury(TreasuryOutput),
    /// The [`BasicOutput`] variant.
    Basic(BasicOutput),
    /// The [`AccountOutput`] variant.
    #[serde(alias = "alias")]
    Account(AccountOutput),
    /// The [`FoundryOutput`] variant.
    Foundry(FoundryOutput),
    /// The [`NftOutput`] variant.
    Nft(NftOutput),
}

impl Output {
    /// Get the output kind as a string.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Treasury(_) => TreasuryOutput::KIND,
            Self::Basic(_) => BasicOutput::KIND,
            Self::Account(_) => AccountOutput::KIND,
            Self::Foundry(_) => FoundryOutput::KIND,
            Self::Nft(_) => NftOutput::KIND,
        }
    }

    /// Returns the amount of base tokens held by the output.
    pub fn amount(&self) -> u64 {
        match self {
            Self::Treasury(TreasuryOutput { amount, .. }) => *amount,
            Self::Basic(BasicOutput { amount, .. }) => *amount,
            Self::Account(AccountOutput { amount, .. }) => *amount,
            Self::Foundry(FoundryOutput { amount, .. }) => *amount,
            Self::Nft(NftOutput { amount, .. }) => *amount,
        }
    }

    /// Returns the amount of mana held by the output.
    pub fn mana(&self) -> u64 {
        match self {
            Self::Basic(BasicOutput { mana, .. }) => *mana,
            Self::Account(AccountOutput { mana, .. }) => *mana,
            Self::Nft(NftOutput { mana, .. }) => *mana,
            Self::Treasury(_) | Self::Foundry(_) => 0,
        }
    }

    /// Returns a copy of the output holding a different amount.
    pub fn with_amount(self, amount: u64) -> Self {
        match self {
            Self::Treasury(_) => Self::Treasury(TreasuryOutput { amount }),
            Self::Basic(o) => Self::Basic(BasicOutput { amount, ..o }),
            Self::Account(o) => Self::Account(AccountOutput { amount, ..o }),
            Self::Foundry(o) => Self::Foundry(FoundryOutput { amount, ..o }),
            Self::Nft(o) => Self::Nft(NftOutput { amount, ..o }),
        }
    }

    /// Returns the mutable features of the output.
    pub fn features(&self) -> Option<&Features> {
        match self {
            Self::Treasury(_) => None,
            Self::Basic(o) => Some(&o.features),
            Self::Account(o) => Some(&o.features),
            Self::Foundry(o) => Some(&o.features),
            Self::Nft(o) => Some(&o.features),
        }
    }

    /// Returns the immutable features of a chain output.
    pub fn immutable_features(&self) -> Option<&Features> {
        match self {
            Self::Account(o) => Some(&o.immutable_features),
            Self::Foundry(o) => Some(&o.immutable_features),
            Self::Nft(o) => Some(&o.immutable_features),
            Self::Treasury(_) | Self::Basic(_) => None,
        }
    }

    /// Returns the native token held by the output.
    pub fn native_token(&self) -> Option<&NativeToken> {
        self.features().and_then(Features::native_token)
    }

    /// Returns the chain id of the output, if it is a chain output. Chains created by this output have a null id.
    pub fn chain_id(&self) -> Option<ChainId> {
        match self {
            Self::Account(o) => Some(ChainId::Account(o.account_id)),
            Self::Foundry(o) => Some(ChainId::Foundry(o.id())),
            Self::Nft(o) => Some(ChainId::Nft(o.nft_id)),
            Self::Treasury(_) | Self::Basic(_) => None,
        }
    }

    /// Returns the unlock conditions of the output as an unordered list.
    pub fn unlock_conditions(&self) -> Vec<UnlockCondition> {
        match self {
            Self::Treasury(_) => Vec::new(),
            Self::Basic(o) => o.unlock_conditions(),
            Self::Account(o) => o.unlock_conditions(),
            Self::Foundry(o) => o.unlock_conditions(),
            Self::Nft(o) => o.unlock_conditions(),
        }
    }

    /// Returns the [`Address`] that is in control of the output, ignoring time based conditions.
    pub fn owning_address(&self) -> Option<Address> {
        Some(match self {
            Self::Treasury(_) => return None,
            Self::Basic(o) => o.address_unlock_condition.address,
            Self::Account(o) => o.state_controller_address_unlock_condition.address,
            Self::Foundry(o) => o.immutable_account_address_unlock_condition.address.into(),
            Self::Nft(o) => o.address_unlock_condition.address,
        })
    }

    /// Returns the storage deposit return condition of the output.
    pub fn storage_deposit_return(&self) -> Option<&unlock_condition::StorageDepositReturnUnlockCondition> {
        match self {
            Self::Basic(o) => o.storage_deposit_return_unlock_condition.as_ref(),
            Self::Nft(o) => o.storage_deposit_return_unlock_condition.as_ref(),
            _ => None,
        }
    }

    /// Returns the timelock condition of the output.
    pub fn timelock(&self) -> Option<&unlock_condition::TimelockUnlockCondition> {
        match self {
            Self::Basic(o) => o.timelock_unlock_condition.as_ref(),
            Self::Nft(o) => o.timelock_unlock_condition.as_ref(),
            _ => None,
        }
    }

    /// Returns the expiration condition of the output.
    pub fn expiration(&self) -> Option<&unlock_condition::ExpirationUnlockCondition> {
        match self {
            Self::Basic(o) => o.expiration_unlock_condition.as_ref(),
            Self::Nft(o) => o.expiration_unlock_condition.as_ref(),
            _ => None,
        }
    }

    /// Whether a timelock prevents unlocking the output at the given slot.
    pub fn is_time_locked(&self, slot_index: SlotIndex) -> bool {
        self.timelock().map_or(false, |t| t.is_locked(slot_index))
    }

    /// Resolves the address that must unlock the output at the given slot. Account outputs are unlocked by the state
    /// controller for state transitions and by the governor otherwise.
    pub fn unlock_address(&self, slot_index: SlotIndex, is_state_transition: bool) -> Option<Address> {
        Some(match self {
            Self::Treasury(_) => return None,
            Self::Account(o) => {
                if is_state_transition {
                    o.state_controller_address_unlock_condition.address
                } else {
                    o.governor_address_unlock_condition.address
                }
            }
            Self::Foundry(o) => o.immutable_account_address_unlock_condition.address.into(),
            Self::Basic(BasicOutput {
                address_unlock_condition,
                expiration_unlock_condition,
                ..
            })
            | Self::Nft(NftOutput {
                address_unlock_condition,
                expiration_unlock_condition,
                ..
            }) => match expiration_unlock_condition {
                Some(expiration) => *expiration.return_address_expired(&address_unlock_condition.address, slot_index),
                None => address_unlock_condition.address,
            },
        })
    }

    /// Checks if an output is trivially unlockable by only providing a signature.
    pub fn is_trivial_unlock(&self) -> bool {
        match self {
            Self::Treasury(_) => false,
            Self::Basic(_) | Self::Nft(_) => {
                self.storage_deposit_return().is_none() && self.timelock().is_none() && self.expiration().is_none()
            }
            Self::Account(_) | Self::Foundry(_) => true,
        }
    }

    /// Checks that the amount covers the storage deposit and that a storage deposit return is in bounds.
    pub fn verify_storage_deposit(&self, rent: &impl RentCalculator) -> Result<(), ValidationError> {
        let amount = self.amount();
        let required = rent.rent_cost(self);
        if amount < required {
            return Err(ValidationError::InsufficientStorageDeposit { amount, required });
        }
        if let Some(sdr) = self.storage_deposit_return() {
            let minimum = rent.rent_cost(&BasicOutput::minimal(sdr.return_address).into());
            if sdr.amount < minimum || sdr.amount > amount {
                return Err(ValidationError::InvalidStorageDepositReturnAmount {
                    amount: sdr.amount,
                    minimum,
                    maximum: amount,
                });
            }
        }
        Ok(())
    }

    /// Checks the structural invariants of the output.
    pub fn verify(&self) -> Result<(), ValidationError> {
        match self {
            Self::Treasury(_) => Ok(()),
            Self::Basic(o) => o.verify(),
            Self::Account(o) => o.verify(),
            Self::Foundry(o) => o.verify(),
            Self::Nft(o) => o.verify(),
        }
    }
}

impl TaggedUnion for Output {
    const FAMILY: &'static str = "output";
    const KINDS: &'static [&'static str] = &["treasury", "basic", "account", "alias", "foundry", "nft"];

    fn verify(&self) -> Result<(), ValidationError> {
        Output::verify(self)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn output_id_hex_round_trips() {
        let output_id = OutputId::new(TransactionId::new([0xab; 32]), 258);
        let hex = output_id.to_hex();
        assert_eq!(hex.len(), 2 + 2 * OutputId::LENGTH);
        assert!(hex.ends_with("0201"));
        assert_eq!(hex.parse::<OutputId>().unwrap(), output_id);
        assert_eq!(
            serde_json::from_value::<OutputId>(serde_json::to_value(output_id).unwrap()).unwrap(),
            output_id
        );
    }

    #[test]
    fn output_ids_order_by_transaction_then_index() {
        let a = OutputId::new(TransactionId::new([1; 32]), 5);
        let b = OutputId::new(TransactionId::new([1; 32]), 6);
        let c = OutputId::new(TransactionId::new([2; 32]), 0);
        let mut ids = vec![c, b, a];
        ids.sort();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[test]
    fn chain_ids_derive_from_the_creating_output() {
        let output_id = OutputId::new(TransactionId::new([7; 32]), 1);
        let chain = ChainId::Account(AccountId::null());
        assert!(chain.is_null());
        let derived = chain.or_from_output_id(&output_id);
        assert_eq!(derived, ChainId::Account(AccountId::new(output_id.hash())));
        assert_eq!(derived.or_from_output_id(&OutputId::new(TransactionId::null(), 0)), derived);
    }
}

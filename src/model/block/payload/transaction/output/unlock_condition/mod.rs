// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Module containing unlock condition types.

pub mod address;
pub mod expiration;
pub mod governor_address;
pub mod immutable_account_address;
pub mod state_controller_address;
pub mod storage_deposit_return;
pub mod timelock;

use serde::{Deserialize, Serialize};

pub use self::{
    address::AddressUnlockCondition, expiration::ExpirationUnlockCondition,
    governor_address::GovernorAddressUnlockCondition,
    immutable_account_address::ImmutableAccountAddressUnlockCondition,
    state_controller_address::StateControllerAddressUnlockCondition,
    storage_deposit_return::StorageDepositReturnUnlockCondition, timelock::TimelockUnlockCondition,
};
use crate::model::{codec::TaggedUnion, ValidationError};

/// The different unlock conditions an output can carry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, derive_more::From)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum UnlockCondition {
    /// An address unlock condition.
    Address(AddressUnlockCondition),
    /// A storage deposit return unlock condition.
    StorageDepositReturn(StorageDepositReturnUnlockCondition),
    /// A timelock unlock condition.
    Timelock(TimelockUnlockCondition),
    /// An expiration unlock condition.
    Expiration(ExpirationUnlockCondition),
    /// A state controller address unlock condition.
    StateControllerAddress(StateControllerAddressUnlockCondition),
    /// A governor address unlock condition.
    GovernorAddress(GovernorAddressUnlockCondition),
    /// An immutable account address unlock condition.
    #[serde(alias = "immutable_alias_address")]
    ImmutableAccountAddress(ImmutableAccountAddressUnlockCondition),
}

impl UnlockCondition {
    /// Returns the protocol kind of the unlock condition.
    pub fn kind(&self) -> u8 {
        match self {
            Self::Address(_) => AddressUnlockCondition::KIND,
            Self::StorageDepositReturn(_) => StorageDepositReturnUnlockCondition::KIND,
            Self::Timelock(_) => TimelockUnlockCondition::KIND,
            Self::Expiration(_) => ExpirationUnlockCondition::KIND,
            Self::StateControllerAddress(_) => StateControllerAddressUnlockCondition::KIND,
            Self::GovernorAddress(_) => GovernorAddressUnlockCondition::KIND,
            Self::ImmutableAccountAddress(_) => ImmutableAccountAddressUnlockCondition::KIND,
        }
    }

    /// Returns the name of the unlock condition.
    pub fn name(&self) -> &'static str {
        Self::name_of(self.kind())
    }

    pub(crate) fn name_of(kind: u8) -> &'static str {
        match kind {
            AddressUnlockCondition::KIND => "address",
            StorageDepositReturnUnlockCondition::KIND => "storage_deposit_return",
            TimelockUnlockCondition::KIND => "timelock",
            ExpirationUnlockCondition::KIND => "expiration",
            StateControllerAddressUnlockCondition::KIND => "state_controller_address",
            GovernorAddressUnlockCondition::KIND => "governor_address",
            _ => "immutable_account_address",
        }
    }
}

impl TaggedUnion for UnlockCondition {
    const FAMILY: &'static str = "unlock condition";
    const KINDS: &'static [&'static str] = &[
        "address",
        "storage_deposit_return",
        "timelock",
        "expiration",
        "state_controller_address",
        "governor_address",
        "immutable_account_address",
        "immutable_alias_address",
    ];
}

/// Typed storage for the unlock conditions of one output. Every kind has a single slot, so cardinality is enforced
/// when the slots are filled.
#[derive(Default)]
pub(crate) struct UnlockConditionSlots {
    pub(crate) address: Option<AddressUnlockCondition>,
    pub(crate) storage_deposit_return: Option<StorageDepositReturnUnlockCondition>,
    pub(crate) timelock: Option<TimelockUnlockCondition>,
    pub(crate) expiration: Option<ExpirationUnlockCondition>,
    pub(crate) state_controller_address: Option<StateControllerAddressUnlockCondition>,
    pub(crate) governor_address: Option<GovernorAddressUnlockCondition>,
    pub(crate) immutable_account_address: Option<ImmutableAccountAddressUnlockCondition>,
}

impl UnlockConditionSlots {
    /// Sorts an unordered list into slots, rejecting kinds the output does not allow and duplicates.
    pub(crate) fn collect(
        conditions: impl IntoIterator<Item = UnlockCondition>,
        output: &'static str,
        allowed: &[u8],
    ) -> Result<Self, ValidationError> {
        let mut slots = Self::default();
        for condition in conditions {
            let kind = condition.name();
            if !allowed.contains(&condition.kind()) {
                return Err(ValidationError::DisallowedUnlockCondition { kind, output });
            }
            let duplicate = match condition {
                UnlockCondition::Address(c) => slots.address.replace(c).is_some(),
                UnlockCondition::StorageDepositReturn(c) => slots.storage_deposit_return.replace(c).is_some(),
                UnlockCondition::Timelock(c) => slots.timelock.replace(c).is_some(),
                UnlockCondition::Expiration(c) => slots.expiration.replace(c).is_some(),
                UnlockCondition::StateControllerAddress(c) => slots.state_controller_address.replace(c).is_some(),
                UnlockCondition::GovernorAddress(c) => slots.governor_address.replace(c).is_some(),
                UnlockCondition::ImmutableAccountAddress(c) => slots.immutable_account_address.replace(c).is_some(),
            };
            if duplicate {
                return Err(ValidationError::DuplicateUnlockCondition(kind));
            }
        }
        Ok(slots)
    }
}

/// Unwraps a required slot.
pub(crate) fn required<T>(slot: Option<T>, kind: u8, output: &'static str) -> Result<T, ValidationError> {
    slot.ok_or(ValidationError::MissingUnlockCondition {
        kind: UnlockCondition::name_of(kind),
        output,
    })
}

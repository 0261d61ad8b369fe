// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::model::{utxo::Address, SlotIndex};

/// Defines a slot index until which only the Address, defined in the Address Unlock Condition, is allowed to unlock
/// the output. After or at the slot index, only the Return Address can unlock it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationUnlockCondition {
    pub return_address: Address,
    pub slot_index: SlotIndex,
}

impl ExpirationUnlockCondition {
    pub const KIND: u8 = 3;

    pub fn new(return_address: impl Into<Address>, slot_index: impl Into<SlotIndex>) -> Self {
        Self {
            return_address: return_address.into(),
            slot_index: slot_index.into(),
        }
    }

    /// Whether the expiration has passed at the given slot.
    pub fn is_expired(&self, slot_index: SlotIndex) -> bool {
        slot_index >= self.slot_index
    }

    /// Returns the address that may unlock the output at the given slot.
    pub fn return_address_expired<'a>(&'a self, address: &'a Address, slot_index: SlotIndex) -> &'a Address {
        if self.is_expired(slot_index) {
            &self.return_address
        } else {
            address
        }
    }
}

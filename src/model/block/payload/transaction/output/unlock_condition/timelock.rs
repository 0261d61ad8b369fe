// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::model::SlotIndex;

/// Defines a slot index until which the output can not be unlocked.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockUnlockCondition {
    pub slot_index: SlotIndex,
}

impl TimelockUnlockCondition {
    pub const KIND: u8 = 2;

    pub fn new(slot_index: impl Into<SlotIndex>) -> Self {
        Self {
            slot_index: slot_index.into(),
        }
    }

    /// Whether the output is still locked at the given slot.
    pub fn is_locked(&self, slot_index: SlotIndex) -> bool {
        slot_index < self.slot_index
    }
}

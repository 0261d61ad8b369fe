// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Module that contains slot types.

use serde::{Deserialize, Serialize};

use super::util::impl_id;

/// The index of a slot, the unit of time of the ledger.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::From,
    derive_more::Add,
    derive_more::AddAssign,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct SlotIndex(pub u32);

impl SlotIndex {
    /// Returns the epoch this slot belongs to.
    pub fn to_epoch_index(self, slots_per_epoch_exponent: u8) -> EpochIndex {
        EpochIndex(self.0 >> slots_per_epoch_exponent)
    }
}

/// The index of an epoch.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::From,
)]
#[serde(transparent)]
pub struct EpochIndex(pub u32);

impl_id!(
    /// The identifier of a slot commitment.
    pub SlotCommitmentId,
    36
);

impl SlotCommitmentId {
    /// The slot index encoded in the last four bytes of the identifier.
    pub fn slot_index(&self) -> SlotIndex {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(&self.0[32..]);
        SlotIndex(u32::from_le_bytes(bytes))
    }
}

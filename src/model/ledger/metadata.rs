// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use super::{ConflictReason, LedgerInclusionState};
use crate::model::{
    utxo::{Address, ChainId, Output, OutputId, TransactionId},
    BlockId, SlotIndex,
};

/// Block metadata.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMetadata {
    /// The id of the block.
    pub block_id: BlockId,
    /// The inclusion state of the block.
    pub inclusion_state: LedgerInclusionState,
    /// If the ledger inclusion state is conflicting, the reason for the conflict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_reason: Option<ConflictReason>,
}

/// Metadata for a spent (consumed) output.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpentMetadata {
    /// The transaction that consumed the output.
    pub transaction_id: TransactionId,
    /// Slot where the output was spent.
    pub slot_spent: SlotIndex,
}

/// Output metadata.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputMetadata {
    /// The id of the output.
    pub output_id: OutputId,
    /// The block that created the output.
    pub block_id: BlockId,
    /// Slot where the output was booked.
    pub booked: SlotIndex,
    /// Set once the output is consumed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spent: Option<SpentMetadata>,
}

impl OutputMetadata {
    /// Whether the output was consumed.
    pub fn is_spent(&self) -> bool {
        self.spent.is_some()
    }
}

/// An output together with its ledger metadata.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputWithMetadata {
    pub output: Output,
    pub metadata: OutputMetadata,
}

#[allow(missing_docs)]
impl OutputWithMetadata {
    pub fn output_id(&self) -> OutputId {
        self.metadata.output_id
    }

    pub fn amount(&self) -> u64 {
        self.output.amount()
    }

    pub fn owning_address(&self) -> Option<Address> {
        self.output.owning_address()
    }

    pub fn is_spent(&self) -> bool {
        self.metadata.is_spent()
    }

    /// The chain id of a chain output, derived from the output id if the output created the chain.
    pub fn chain_id(&self) -> Option<ChainId> {
        self.output
            .chain_id()
            .map(|chain_id| chain_id.or_from_output_id(&self.output_id()))
    }
}

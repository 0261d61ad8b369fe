// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Describes how a block relates to the ledger.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerInclusionState {
    /// The block is known but not yet referenced.
    Pending,
    /// A successful, included block.
    Included,
    /// A conflicting block, ex. a double spend.
    Conflicting,
    /// The node dropped the block before it was referenced. The payload may be issued again.
    Dropped,
}

impl LedgerInclusionState {
    /// Whether the state can not change anymore.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Included | Self::Conflicting)
    }
}

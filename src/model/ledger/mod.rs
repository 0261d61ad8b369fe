// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Ledger state types as reported by a node.

mod conflict_reason;
mod inclusion_state;
mod metadata;

pub use self::{
    conflict_reason::ConflictReason,
    inclusion_state::LedgerInclusionState,
    metadata::{BlockMetadata, OutputMetadata, OutputWithMetadata, SpentMetadata},
};

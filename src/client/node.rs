// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    ledger::{BlockMetadata, OutputWithMetadata},
    utxo::{Address, OutputId},
    Block, BlockId, ProtocolParameters, SlotIndex,
};

/// Failures reported by a node. Only [`NodeError::Unreachable`] is worth retrying.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum NodeError {
    #[error("node unreachable: {0}")]
    Unreachable(String),
    #[error("request rejected ({reason}): {message}")]
    Rejected { reason: String, message: String },
    #[error("{0} not found")]
    NotFound(String),
}

/// Selects outputs by the address that controls them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputQuery {
    /// The controlling address.
    pub address: Address,
    /// Whether spent outputs are returned as well.
    #[serde(default)]
    pub include_spent: bool,
}

impl OutputQuery {
    /// Queries the unspent outputs controlled by an address.
    pub fn unspent(address: impl Into<Address>) -> Self {
        Self {
            address: address.into(),
            include_spent: false,
        }
    }
}

/// Defines a type as a node that the wallet talks to.
#[async_trait]
pub trait Node: Send + Sync {
    /// The parameters of the network the node belongs to.
    async fn protocol_parameters(&self) -> Result<ProtocolParameters, NodeError>;

    /// The latest slot known to the node.
    async fn slot_index(&self) -> Result<SlotIndex, NodeError>;

    /// Submits a block and returns its id once the node accepted it.
    async fn submit_block(&self, block: Block) -> Result<BlockId, NodeError>;

    /// The inclusion state of a previously submitted block.
    async fn block_metadata(&self, block_id: &BlockId) -> Result<BlockMetadata, NodeError>;

    /// An output together with its metadata.
    async fn output(&self, output_id: &OutputId) -> Result<OutputWithMetadata, NodeError>;

    /// The ids of all outputs that match a query.
    async fn output_ids(&self, query: OutputQuery) -> Result<Vec<OutputId>, NodeError>;
}

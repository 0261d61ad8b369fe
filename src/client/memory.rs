// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{Node, NodeError, OutputQuery};
use crate::{
    model::{
        block::payload::Payload,
        ledger::{
            BlockMetadata, ConflictReason, LedgerInclusionState, OutputMetadata, OutputWithMetadata, SpentMetadata,
        },
        util::blake2b_256,
        utxo::{Address, BasicOutput, Output, OutputId, SignedTransactionPayload, TransactionId},
        Block, BlockId, ProtocolParameters, SlotIndex,
    },
    transaction::conservation::{verify_balance, verify_storage_deposit_returns},
};

/// A node that keeps its ledger in memory. Inclusion, reachability and dropped blocks are controlled by the caller,
/// which makes it suitable for simulations and tests.
#[derive(Clone, Debug)]
pub struct InMemoryNode {
    ledger: Arc<Mutex<InMemoryLedger>>,
}

#[derive(Debug)]
struct SubmittedBlock {
    block: Block,
    metadata: BlockMetadata,
    polls_until_included: Option<u32>,
}

#[derive(Debug)]
struct InMemoryLedger {
    params: ProtocolParameters,
    slot_index: SlotIndex,
    outputs: BTreeMap<OutputId, OutputWithMetadata>,
    blocks: HashMap<BlockId, SubmittedBlock>,
    submitted: Vec<BlockId>,
    genesis_count: u32,
    confirmation_polls: Option<u32>,
    reachable: bool,
    failures_remaining: u32,
    drops_remaining: u32,
    metadata_requests: usize,
}

impl Default for InMemoryNode {
    fn default() -> Self {
        Self::new(ProtocolParameters::default())
    }
}

impl InMemoryNode {
    /// Creates an empty ledger. Blocks are included on the first metadata request after their submission.
    pub fn new(params: ProtocolParameters) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(InMemoryLedger {
                params,
                slot_index: SlotIndex(1),
                outputs: BTreeMap::new(),
                blocks: HashMap::new(),
                submitted: Vec::new(),
                genesis_count: 0,
                confirmation_polls: Some(1),
                reachable: true,
                failures_remaining: 0,
                drops_remaining: 0,
                metadata_requests: 0,
            })),
        }
    }

    /// Creates a basic output holding `amount` for an address, outside of any transaction.
    pub async fn fund(&self, address: impl Into<Address>, amount: u64) -> OutputId {
        self.insert_output(BasicOutput { amount, ..BasicOutput::minimal(address.into()) }.into())
            .await
    }

    /// Adds an arbitrary unspent output to the ledger.
    pub async fn insert_output(&self, output: Output) -> OutputId {
        let mut ledger = self.ledger.lock().await;
        ledger.genesis_count += 1;
        let transaction_id = TransactionId::new(blake2b_256(ledger.genesis_count.to_le_bytes()));
        let output_id = OutputId::new(transaction_id, 0);
        let metadata = OutputMetadata {
            output_id,
            block_id: BlockId::null(),
            booked: ledger.slot_index,
            spent: None,
        };
        ledger
            .outputs
            .insert(output_id, OutputWithMetadata { output, metadata });
        output_id
    }

    /// Sets after how many metadata requests a submitted block gets included. `None` keeps blocks pending forever.
    pub async fn set_confirmation_polls(&self, polls: Option<u32>) {
        self.ledger.lock().await.confirmation_polls = polls;
    }

    /// Takes the node on- or offline.
    pub async fn set_reachable(&self, reachable: bool) {
        self.ledger.lock().await.reachable = reachable;
    }

    /// Lets the next `count` requests fail as if the node could not be reached.
    pub async fn fail_next_requests(&self, count: u32) {
        self.ledger.lock().await.failures_remaining = count;
    }

    /// Drops the next `count` submitted blocks instead of keeping them pending.
    pub async fn drop_next_blocks(&self, count: u32) {
        self.ledger.lock().await.drops_remaining = count;
    }

    /// Moves the ledger to a slot.
    pub async fn set_slot_index(&self, slot_index: SlotIndex) {
        self.ledger.lock().await.slot_index = slot_index;
    }

    /// Includes every pending block right away.
    pub async fn include_pending(&self) {
        let mut ledger = self.ledger.lock().await;
        let pending = ledger
            .submitted
            .iter()
            .filter(|id| ledger.blocks[*id].metadata.inclusion_state == LedgerInclusionState::Pending)
            .copied()
            .collect::<Vec<_>>();
        for block_id in pending {
            ledger.include(&block_id);
        }
    }

    /// All blocks submitted so far, in submission order.
    pub async fn submitted_blocks(&self) -> Vec<Block> {
        let ledger = self.ledger.lock().await;
        ledger
            .submitted
            .iter()
            .map(|id| ledger.blocks[id].block.clone())
            .collect()
    }

    /// The number of block metadata requests served so far, including failed ones.
    pub async fn metadata_requests(&self) -> usize {
        self.ledger.lock().await.metadata_requests
    }
}

impl InMemoryLedger {
    fn check_reachable(&mut self) -> Result<(), NodeError> {
        if self.failures_remaining > 0 {
            self.failures_remaining -= 1;
            return Err(NodeError::Unreachable("simulated connection failure".to_owned()));
        }
        if !self.reachable {
            return Err(NodeError::Unreachable("node is offline".to_owned()));
        }
        Ok(())
    }

    fn include(&mut self, block_id: &BlockId) {
        let payload = self.blocks[block_id]
            .block
            .payload
            .as_ref()
            .and_then(Payload::as_signed_transaction)
            .cloned();
        let result = match payload {
            Some(payload) => self.apply(&payload, block_id),
            None => Ok(()),
        };
        let metadata = match self.blocks.get_mut(block_id) {
            Some(entry) => &mut entry.metadata,
            None => return,
        };
        match result {
            Ok(()) => {
                debug!("Block {block_id} included.");
                metadata.inclusion_state = LedgerInclusionState::Included;
            }
            Err(reason) => {
                debug!("Block {block_id} conflicts: {reason}.");
                metadata.inclusion_state = LedgerInclusionState::Conflicting;
                metadata.conflict_reason = Some(reason);
            }
        }
    }

    fn apply(&mut self, payload: &SignedTransactionPayload, block_id: &BlockId) -> Result<(), ConflictReason> {
        let transaction = &payload.transaction;
        let mut inputs = Vec::with_capacity(transaction.inputs.len());
        for output_id in transaction.utxo_inputs() {
            let input = self.outputs.get(output_id).ok_or(ConflictReason::InputUtxoNotFound)?;
            if input.is_spent() {
                return Err(ConflictReason::InputUtxoAlreadySpent);
            }
            if input.output.is_time_locked(self.slot_index) {
                return Err(ConflictReason::TimelockNotExpired);
            }
            inputs.push(input.clone());
        }
        verify_storage_deposit_returns(&inputs, transaction)
            .map_err(|_| ConflictReason::StorageDepositReturnUnfulfilled)?;
        verify_balance(&inputs, transaction).map_err(|_| ConflictReason::CreatedConsumedAmountMismatch)?;

        let transaction_id = transaction.id();
        let spent = SpentMetadata {
            transaction_id,
            slot_spent: self.slot_index,
        };
        for output_id in transaction.utxo_inputs() {
            if let Some(input) = self.outputs.get_mut(output_id) {
                input.metadata.spent = Some(spent);
            }
        }
        for (index, output) in transaction.outputs.iter().enumerate() {
            let output_id = OutputId::new(transaction_id, index as u16);
            let metadata = OutputMetadata {
                output_id,
                block_id: *block_id,
                booked: self.slot_index,
                spent: None,
            };
            self.outputs.insert(
                output_id,
                OutputWithMetadata {
                    output: output.clone(),
                    metadata,
                },
            );
        }
        Ok(())
    }
}

#[async_trait]
impl Node for InMemoryNode {
    async fn protocol_parameters(&self) -> Result<ProtocolParameters, NodeError> {
        let mut ledger = self.ledger.lock().await;
        ledger.check_reachable()?;
        Ok(ledger.params.clone())
    }

    async fn slot_index(&self) -> Result<SlotIndex, NodeError> {
        let mut ledger = self.ledger.lock().await;
        ledger.check_reachable()?;
        Ok(ledger.slot_index)
    }

    async fn submit_block(&self, block: Block) -> Result<BlockId, NodeError> {
        let mut ledger = self.ledger.lock().await;
        ledger.check_reachable()?;
        if block.network_id != ledger.params.network_id() {
            return Err(NodeError::Rejected {
                reason: "invalid_network".to_owned(),
                message: format!("unexpected network id {}", block.network_id),
            });
        }
        if let Some(payload) = &block.payload {
            payload.verify().map_err(|e| NodeError::Rejected {
                reason: "invalid_payload".to_owned(),
                message: e.to_string(),
            })?;
        }
        let block_id = block.id();
        let inclusion_state = if ledger.drops_remaining > 0 {
            ledger.drops_remaining -= 1;
            LedgerInclusionState::Dropped
        } else {
            LedgerInclusionState::Pending
        };
        debug!("Block {block_id} submitted ({inclusion_state:?}).");
        let polls_until_included = ledger.confirmation_polls;
        ledger.blocks.insert(
            block_id,
            SubmittedBlock {
                block,
                metadata: BlockMetadata {
                    block_id,
                    inclusion_state,
                    conflict_reason: None,
                },
                polls_until_included,
            },
        );
        ledger.submitted.push(block_id);
        Ok(block_id)
    }

    async fn block_metadata(&self, block_id: &BlockId) -> Result<BlockMetadata, NodeError> {
        let mut ledger = self.ledger.lock().await;
        ledger.metadata_requests += 1;
        ledger.check_reachable()?;
        let entry = ledger
            .blocks
            .get_mut(block_id)
            .ok_or_else(|| NodeError::NotFound(format!("block {block_id}")))?;
        let include = match (entry.metadata.inclusion_state, entry.polls_until_included.as_mut()) {
            (LedgerInclusionState::Pending, Some(polls)) if *polls <= 1 => true,
            (LedgerInclusionState::Pending, Some(polls)) => {
                *polls -= 1;
                false
            }
            _ => false,
        };
        if include {
            ledger.include(block_id);
        }
        Ok(ledger.blocks[block_id].metadata)
    }

    async fn output(&self, output_id: &OutputId) -> Result<OutputWithMetadata, NodeError> {
        let mut ledger = self.ledger.lock().await;
        ledger.check_reachable()?;
        ledger
            .outputs
            .get(output_id)
            .cloned()
            .ok_or_else(|| NodeError::NotFound(format!("output {output_id}")))
    }

    async fn output_ids(&self, query: OutputQuery) -> Result<Vec<OutputId>, NodeError> {
        let mut ledger = self.ledger.lock().await;
        ledger.check_reachable()?;
        Ok(ledger
            .outputs
            .values()
            .filter(|o| query.include_spent || !o.is_spent())
            .filter(|o| o.owning_address() == Some(query.address))
            .map(OutputWithMetadata::output_id)
            .collect())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::utxo::{Ed25519Address, TaggedDataPayload};

    fn tagged_block(node_params: &ProtocolParameters, tag: &[u8]) -> Block {
        let payload = TaggedDataPayload::new(tag.to_vec(), Vec::new()).unwrap();
        Block::new(node_params, Vec::new(), Some(payload.into()))
    }

    #[tokio::test]
    async fn funded_outputs_are_queryable() {
        let node = InMemoryNode::default();
        let address = Ed25519Address::new([3; 32]);
        let output_id = node.fund(address, 1_000_000).await;
        assert_eq!(node.output_ids(OutputQuery::unspent(address)).await.unwrap(), vec![output_id]);
        assert_eq!(node.output(&output_id).await.unwrap().amount(), 1_000_000);
        let other = node.output_ids(OutputQuery::unspent(Ed25519Address::new([4; 32]))).await;
        assert_eq!(other.unwrap(), Vec::new());
    }

    #[tokio::test]
    async fn blocks_are_included_after_the_configured_polls() {
        let node = InMemoryNode::default();
        node.set_confirmation_polls(Some(2)).await;
        let params = node.protocol_parameters().await.unwrap();
        let block_id = node.submit_block(tagged_block(&params, b"a")).await.unwrap();
        let first = node.block_metadata(&block_id).await.unwrap();
        assert_eq!(first.inclusion_state, LedgerInclusionState::Pending);
        let second = node.block_metadata(&block_id).await.unwrap();
        assert_eq!(second.inclusion_state, LedgerInclusionState::Included);
        assert_eq!(node.metadata_requests().await, 2);
    }

    #[tokio::test]
    async fn dropped_and_unreachable() {
        let node = InMemoryNode::default();
        let params = node.protocol_parameters().await.unwrap();
        node.drop_next_blocks(1).await;
        let block_id = node.submit_block(tagged_block(&params, b"b")).await.unwrap();
        let metadata = node.block_metadata(&block_id).await.unwrap();
        assert_eq!(metadata.inclusion_state, LedgerInclusionState::Dropped);

        node.fail_next_requests(1).await;
        assert!(matches!(node.slot_index().await, Err(NodeError::Unreachable(_))));
        assert!(node.slot_index().await.is_ok());
        node.set_reachable(false).await;
        assert!(matches!(node.slot_index().await, Err(NodeError::Unreachable(_))));
    }

    #[tokio::test]
    async fn foreign_network_is_rejected() {
        let node = InMemoryNode::default();
        let other = ProtocolParameters {
            network_name: "elsewhere".to_owned(),
            ..ProtocolParameters::default()
        };
        assert!(matches!(
            node.submit_block(tagged_block(&other, b"c")).await,
            Err(NodeError::Rejected { .. })
        ));
    }
}

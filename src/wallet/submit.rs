// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::{future::Future, time::Duration};

use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::{CancellationHandle, TransactionState, TransactionWithMetadata, Wallet};
use crate::{
    client::NodeError,
    config::{ReissueConfig, RetryConfig},
    model::{
        ledger::{ConflictReason, LedgerInclusionState, OutputMetadata, OutputWithMetadata},
        utxo::{OutputId, SignedTransactionPayload, TransactionId},
        Block, BlockId, ProtocolParameters,
    },
    transaction::{build_unlocks, InputSigningData, PreparedTransactionData},
    Error,
};

/// How node requests are retried when the node can not be reached.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RetryOptions {
    /// The number of attempts, including the first one.
    pub max_attempts: u32,
    /// The wait before the first retry. It doubles with every further retry.
    pub initial_backoff: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        (&RetryConfig::default()).into()
    }
}

impl From<&RetryConfig> for RetryOptions {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: config.initial_backoff,
        }
    }
}

/// How long to wait for a submitted transaction to be included.
#[derive(Clone, Debug)]
pub struct ReissueOptions {
    /// The time between two inclusion checks.
    pub interval: Duration,
    /// The number of inclusion checks before giving up.
    pub max_attempts: u32,
    /// Stops waiting once cancelled.
    pub cancel: Option<CancellationHandle>,
    /// Stops waiting once reached.
    pub deadline: Option<Instant>,
}

impl Default for ReissueOptions {
    fn default() -> Self {
        (&ReissueConfig::default()).into()
    }
}

impl From<&ReissueConfig> for ReissueOptions {
    fn from(config: &ReissueConfig) -> Self {
        Self {
            interval: config.interval,
            max_attempts: config.max_attempts,
            cancel: None,
            deadline: None,
        }
    }
}

#[allow(missing_docs)]
impl ReissueOptions {
    pub fn with_cancellation(mut self, cancel: CancellationHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }
}

/// Runs a node request, retrying with exponential backoff while the node is unreachable.
pub(crate) async fn with_retry<T, F, Fut>(options: &RetryOptions, what: &str, mut request: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, NodeError>>,
{
    let max_attempts = options.max_attempts.max(1);
    let mut backoff = options.initial_backoff;
    let mut attempt = 1;
    loop {
        match request().await {
            Err(NodeError::Unreachable(message)) if attempt < max_attempts => {
                warn!(
                    "Could not {what}: {message}. Retrying in {}s. {} retries remaining.",
                    backoff.as_secs_f32(),
                    max_attempts - attempt
                );
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
                attempt += 1;
            }
            res => return res.map_err(Error::from),
        }
    }
}

async fn cancelled(cancel: Option<&CancellationHandle>) {
    match cancel {
        Some(handle) => handle.clone().await,
        None => std::future::pending().await,
    }
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn unix_millis() -> u64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).max(0) as u64
}

impl Wallet {
    pub(crate) async fn with_retry_on<T, F, Fut>(&self, what: &str, request: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, NodeError>>,
    {
        with_retry(&self.retry, what, request).await
    }

    pub(crate) async fn protocol_parameters(&self) -> Result<ProtocolParameters, Error> {
        let node = &self.node;
        self.with_retry_on("fetch protocol parameters", move || node.protocol_parameters())
            .await
    }

    async fn submit_block(&self, block: Block) -> Result<BlockId, Error> {
        let node = &self.node;
        let block = &block;
        self.with_retry_on("submit block", move || node.submit_block(block.clone()))
            .await
    }

    /// Signs a prepared transaction and submits it to the node. A failed submission releases the inputs.
    ///
    /// This also replays transaction data that was prepared earlier and stored.
    #[instrument(skip_all, fields(transaction_id = %prepared.transaction_id()), err, level = "debug")]
    pub async fn sign_and_submit_transaction(
        &self,
        prepared: PreparedTransactionData,
        note: Option<String>,
    ) -> Result<TransactionWithMetadata, Error> {
        let input_ids = prepared
            .inputs
            .iter()
            .map(InputSigningData::output_id)
            .collect::<Vec<_>>();
        let transaction = match self.submit(prepared, note).await {
            Ok(transaction) => transaction,
            Err(e) => {
                warn!("Submission failed, releasing {} inputs: {e}", input_ids.len());
                self.data.write().await.release(&input_ids);
                return Err(e);
            }
        };
        self.persist().await?;
        Ok(transaction)
    }

    async fn submit(
        &self,
        prepared: PreparedTransactionData,
        note: Option<String>,
    ) -> Result<TransactionWithMetadata, Error> {
        let mut state = TransactionState::Prepared;
        prepared.verify()?;
        let params = self.protocol_parameters().await?;
        let node = &self.node;
        let slot_index = self.with_retry_on("fetch the latest slot", move || node.slot_index()).await?;

        state.transition(TransactionState::Submitting)?;
        let unlocks = build_unlocks(&prepared, self.secret_manager.as_ref(), slot_index).await?;
        let payload = SignedTransactionPayload::new(prepared.transaction.clone(), unlocks)?;
        let transaction_id = payload.transaction_id();
        let block_id = self
            .submit_block(Block::new(&params, Vec::new(), Some(payload.clone().into())))
            .await?;
        state.transition(TransactionState::Submitted)?;
        info!("Submitted transaction {transaction_id} in block {block_id}.");

        let transaction = TransactionWithMetadata {
            payload,
            block_id: Some(block_id),
            state,
            inputs: prepared.consumed_outputs(),
            timestamp: unix_millis(),
            note,
            conflict_reason: None,
        };
        let mut data = self.data.write().await;
        data.transactions.insert(transaction_id, transaction.clone());
        data.pending_transactions.insert(transaction_id);
        Ok(transaction)
    }

    /// Polls the node until the transaction is included and returns the including block.
    ///
    /// A block the node dropped is issued again with the same payload. Gives up with [`Error::NotIncluded`] after
    /// `max_attempts` checks, leaving the transaction expired.
    #[instrument(skip(self, options), err, level = "debug")]
    pub async fn reissue_until_included(
        &self,
        transaction_id: &TransactionId,
        options: ReissueOptions,
    ) -> Result<BlockId, Error> {
        let (payload, block_id) = {
            let data = self.data.read().await;
            let transaction = data
                .transactions
                .get(transaction_id)
                .ok_or(Error::TransactionNotFound(*transaction_id))?;
            match (transaction.state, transaction.block_id) {
                (TransactionState::Included, Some(block_id)) => return Ok(block_id),
                (TransactionState::Conflicting, _) => {
                    return Err(Error::Conflict {
                        transaction_id: *transaction_id,
                        reason: transaction.conflict_reason.unwrap_or(ConflictReason::None),
                    });
                }
                _ => (),
            }
            (transaction.payload.clone(), transaction.block_id)
        };
        let params = self.protocol_parameters().await?;
        let mut block_id = match block_id {
            Some(block_id) => block_id,
            None => self.reattach(transaction_id, &params, &payload, None).await?,
        };

        let node = &self.node;
        for attempt in 1..=options.max_attempts {
            tokio::select! {
                biased;
                _ = cancelled(options.cancel.as_ref()) => {
                    debug!("Waiting for {transaction_id} was cancelled.");
                    return Err(Error::Cancelled);
                }
                _ = deadline_reached(options.deadline) => {
                    debug!("Deadline reached while waiting for {transaction_id}.");
                    return Err(Error::Cancelled);
                }
                _ = tokio::time::sleep(options.interval) => (),
            }

            let current = &block_id;
            let metadata = self
                .with_retry_on("fetch block metadata", move || node.block_metadata(current))
                .await?;
            match metadata.inclusion_state {
                LedgerInclusionState::Included => {
                    self.mark_included(transaction_id, block_id).await?;
                    return Ok(block_id);
                }
                LedgerInclusionState::Conflicting => {
                    let reason = metadata.conflict_reason.unwrap_or(ConflictReason::None);
                    self.mark_conflicting(transaction_id, reason).await?;
                    return Err(Error::Conflict {
                        transaction_id: *transaction_id,
                        reason,
                    });
                }
                LedgerInclusionState::Dropped => {
                    debug!("Block {block_id} was dropped, reissuing {transaction_id}.");
                    block_id = self
                        .reattach(transaction_id, &params, &payload, Some(block_id))
                        .await?;
                }
                LedgerInclusionState::Pending => {
                    debug!(
                        "Transaction {transaction_id} still pending ({attempt}/{}).",
                        options.max_attempts
                    );
                }
            }
        }

        self.mark_expired(transaction_id).await?;
        Err(Error::NotIncluded {
            transaction_id: *transaction_id,
            attempts: options.max_attempts,
        })
    }

    async fn reattach(
        &self,
        transaction_id: &TransactionId,
        params: &ProtocolParameters,
        payload: &SignedTransactionPayload,
        parent: Option<BlockId>,
    ) -> Result<BlockId, Error> {
        let block = Block::new(params, parent.into_iter().collect(), Some(payload.clone().into()));
        let block_id = self.submit_block(block).await?;
        if let Some(transaction) = self.data.write().await.transactions.get_mut(transaction_id) {
            transaction.block_id = Some(block_id);
        }
        Ok(block_id)
    }

    async fn mark_included(&self, transaction_id: &TransactionId, block_id: BlockId) -> Result<(), Error> {
        {
            let mut guard = self.data.write().await;
            let data = &mut *guard;
            let transaction = data
                .transactions
                .get_mut(transaction_id)
                .ok_or(Error::TransactionNotFound(*transaction_id))?;
            transaction.state.transition(TransactionState::Included)?;
            transaction.block_id = Some(block_id);
            let essence = transaction.payload.transaction.clone();

            let inputs = essence.utxo_inputs().copied().collect::<Vec<_>>();
            for output_id in &inputs {
                data.unspent_outputs.remove(output_id);
            }
            data.release(&inputs);

            // A transaction has at most 128 outputs.
            let created = essence
                .outputs
                .iter()
                .enumerate()
                .map(|(index, output)| (OutputId::new(*transaction_id, index as u16), output))
                .collect::<Vec<_>>();
            let mut owned = data.owned_addresses();
            for (output_id, output) in &created {
                if output.owning_address().map_or(false, |address| owned.contains(&address)) {
                    owned.extend(
                        output
                            .chain_id()
                            .and_then(|chain_id| chain_id.or_from_output_id(output_id).to_address()),
                    );
                }
            }
            for (output_id, output) in created {
                if !output.owning_address().map_or(false, |address| owned.contains(&address)) {
                    continue;
                }
                data.unspent_outputs.insert(
                    output_id,
                    OutputWithMetadata {
                        output: output.clone(),
                        metadata: OutputMetadata {
                            output_id,
                            block_id,
                            booked: essence.creation_slot,
                            spent: None,
                        },
                    },
                );
            }
            data.pending_transactions.remove(transaction_id);
        }
        info!("Transaction {transaction_id} included in block {block_id}.");
        self.persist().await
    }

    async fn mark_conflicting(&self, transaction_id: &TransactionId, reason: ConflictReason) -> Result<(), Error> {
        {
            let mut guard = self.data.write().await;
            let data = &mut *guard;
            let transaction = data
                .transactions
                .get_mut(transaction_id)
                .ok_or(Error::TransactionNotFound(*transaction_id))?;
            transaction.state.transition(TransactionState::Conflicting)?;
            transaction.conflict_reason = Some(reason);
            let inputs = transaction.payload.transaction.utxo_inputs().copied().collect::<Vec<_>>();
            data.release(&inputs);
            data.pending_transactions.remove(transaction_id);
        }
        warn!("Transaction {transaction_id} conflicts: {reason}.");
        self.persist().await
    }

    async fn mark_expired(&self, transaction_id: &TransactionId) -> Result<(), Error> {
        {
            let mut data = self.data.write().await;
            if let Some(transaction) = data.transactions.get_mut(transaction_id) {
                if transaction.state == TransactionState::Submitted {
                    transaction.state.transition(TransactionState::Expired)?;
                }
            }
        }
        warn!("Transaction {transaction_id} was not included in time.");
        self.persist().await
    }
}

// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::{Balance, TransactionState, Wallet};
use crate::{
    client::{NodeError, OutputQuery},
    model::{
        ledger::{ConflictReason, OutputWithMetadata},
        utxo::{Address, OutputId, TransactionId},
    },
    Error,
};

/// What a sync looks at.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Also collect the outputs owned by the accounts and NFTs the wallet controls.
    pub sync_owned_chains: bool,
}

enum Resolution {
    Included,
    Conflicting,
}

impl Wallet {
    /// Refreshes the unspent outputs from the node and resolves pending transactions.
    #[instrument(skip(self), err, level = "debug")]
    pub async fn sync(&self, options: SyncOptions) -> Result<Balance, Error> {
        let params = self.protocol_parameters().await?;
        let node = &self.node;
        let slot_index = self.with_retry_on("fetch the latest slot", move || node.slot_index()).await?;
        let (address, pending) = {
            let data = self.data.read().await;
            let pending = data
                .pending_transactions
                .iter()
                .filter_map(|id| data.transactions.get(id))
                .map(|t| (t.transaction_id(), t.payload.transaction.utxo_inputs().copied().collect::<Vec<_>>()))
                .collect::<Vec<_>>();
            (*data.address.inner(), pending)
        };

        let unspent_outputs = self.collect_outputs(address, options).await?;

        let mut resolved = BTreeMap::new();
        for (transaction_id, inputs) in pending {
            if let Some(resolution) = self.resolve(&transaction_id, &inputs).await? {
                resolved.insert(transaction_id, resolution);
            }
        }

        let balance = {
            let mut guard = self.data.write().await;
            let data = &mut *guard;
            for (transaction_id, resolution) in &resolved {
                let transaction = match data.transactions.get_mut(transaction_id) {
                    Some(transaction) => transaction,
                    None => continue,
                };
                match resolution {
                    Resolution::Included => transaction.state.transition(TransactionState::Included)?,
                    Resolution::Conflicting => {
                        transaction.state.transition(TransactionState::Conflicting)?;
                        transaction.conflict_reason = Some(ConflictReason::InputUtxoAlreadySpent);
                        let inputs = transaction.payload.transaction.utxo_inputs().copied().collect::<Vec<_>>();
                        data.release(&inputs);
                    }
                }
                data.pending_transactions.remove(transaction_id);
            }
            data.locked_outputs.retain(|output_id| unspent_outputs.contains_key(output_id));
            data.unspent_outputs = unspent_outputs;
            data.balance(slot_index, &params.rent_structure)
        };
        self.persist().await?;

        info!(
            "Synced {}: {} available, {} pending, {} transactions resolved.",
            address.to_hex(),
            balance.base_coin.available,
            balance.base_coin.pending,
            resolved.len()
        );
        Ok(balance)
    }

    /// Collects the unspent outputs of the wallet address and, if requested, of the chains it controls.
    async fn collect_outputs(
        &self,
        address: Address,
        options: SyncOptions,
    ) -> Result<BTreeMap<OutputId, OutputWithMetadata>, Error> {
        let node = &self.node;
        let mut outputs = BTreeMap::new();
        let mut queue = vec![address];
        let mut visited = BTreeSet::new();
        while let Some(address) = queue.pop() {
            if !visited.insert(address) {
                continue;
            }
            let output_ids = self
                .with_retry_on("query outputs", move || node.output_ids(OutputQuery::unspent(address)))
                .await?;
            for output_id in output_ids {
                let id = &output_id;
                let output = self.with_retry_on("fetch output", move || node.output(id)).await?;
                if options.sync_owned_chains {
                    queue.extend(output.chain_id().and_then(|chain_id| chain_id.to_address()));
                }
                outputs.insert(output_id, output);
            }
        }
        debug!("Found {} unspent outputs.", outputs.len());
        Ok(outputs)
    }

    /// Decides a pending transaction from the spent state of its inputs.
    async fn resolve(&self, transaction_id: &TransactionId, inputs: &[OutputId]) -> Result<Option<Resolution>, Error> {
        let node = &self.node;
        for output_id in inputs {
            let output = match self.with_retry_on("fetch output", move || node.output(output_id)).await {
                Ok(output) => output,
                Err(Error::Node(NodeError::NotFound(_))) => continue,
                Err(e) => return Err(e),
            };
            if let Some(spent) = output.metadata.spent {
                return Ok(Some(if spent.transaction_id == *transaction_id {
                    Resolution::Included
                } else {
                    Resolution::Conflicting
                }));
            }
        }
        Ok(None)
    }
}

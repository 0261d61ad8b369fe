// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{TransactionState, TransactionWithMetadata, Wallet};
use crate::{
    model::{
        block::payload::TaggedDataPayload,
        utxo::{Address, Input, ManaAllotment, Output, OutputId, Transaction, TransactionId},
    },
    transaction::{Burn, InputSelection, InputSigningData, PreparedTransactionData},
    Error,
};

/// Options shared by every operation that builds a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionOptions {
    /// Where surplus funds go. Defaults to the wallet address.
    pub remainder_address: Option<Address>,
    /// Consume exactly these inputs instead of selecting them.
    pub custom_inputs: Option<Vec<OutputId>>,
    /// Inputs that are consumed in addition to the selected ones.
    pub mandatory_inputs: Vec<OutputId>,
    /// What the transaction destroys.
    pub burn: Burn,
    /// Data attached to the transaction.
    pub tagged_data_payload: Option<TaggedDataPayload>,
    /// Mana allotted to accounts.
    pub mana_allotments: Vec<ManaAllotment>,
    /// A note kept with the transaction record.
    pub note: Option<String>,
}

/// A balanced transaction whose inputs are reserved for it.
///
/// Dropping it without calling [`PreparedTransaction::send`], [`PreparedTransaction::finish`] or
/// [`PreparedTransaction::abandon`] keeps the inputs reserved until the next sync.
#[must_use = "a prepared transaction keeps its inputs reserved until it is sent or abandoned"]
#[derive(Debug)]
pub struct PreparedTransaction {
    wallet: Wallet,
    data: PreparedTransactionData,
    note: Option<String>,
    state: TransactionState,
}

impl PreparedTransaction {
    /// The unsigned transaction and its inputs.
    pub fn data(&self) -> &PreparedTransactionData {
        &self.data
    }

    /// The id the transaction will have.
    pub fn transaction_id(&self) -> TransactionId {
        self.data.transaction_id()
    }

    #[allow(missing_docs)]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Takes the transaction data out, e.g. to store it and submit it later with
    /// [`Wallet::sign_and_submit_transaction`]. The inputs stay reserved.
    pub fn into_data(self) -> PreparedTransactionData {
        self.data
    }

    /// Signs and submits the transaction.
    pub async fn send(mut self) -> Result<TransactionWithMetadata, Error> {
        self.state.transition(TransactionState::Submitting)?;
        self.wallet.sign_and_submit_transaction(self.data, self.note).await
    }

    /// Signs and submits the transaction, then waits until it is included.
    pub async fn finish(self) -> Result<TransactionWithMetadata, Error> {
        let wallet = self.wallet.clone();
        let transaction_id = self.send().await?.transaction_id();
        wallet
            .reissue_until_included(&transaction_id, wallet.reissue.clone())
            .await?;
        wallet
            .transaction(&transaction_id)
            .await
            .ok_or(Error::TransactionNotFound(transaction_id))
    }

    /// Drops the transaction and releases its inputs.
    pub async fn abandon(self) {
        let input_ids = self
            .data
            .inputs
            .iter()
            .map(InputSigningData::output_id)
            .collect::<Vec<_>>();
        self.wallet.data.write().await.release(&input_ids);
        debug!("Abandoned transaction {}.", self.data.transaction_id());
    }
}

impl Wallet {
    /// Builds a transaction that creates `outputs` and reserves the inputs it consumes.
    ///
    /// The selection runs under the wallet write lock, so two concurrent calls never pick the same input.
    #[instrument(skip_all, err, level = "debug")]
    pub async fn prepare_transaction(
        &self,
        outputs: Vec<Output>,
        options: TransactionOptions,
    ) -> Result<PreparedTransaction, Error> {
        let params = self.protocol_parameters().await?;
        let node = &self.node;
        let slot_index = self.with_retry_on("fetch the latest slot", move || node.slot_index()).await?;
        let mut state = TransactionState::Preparing;

        let mut data = self.data.write().await;
        for output_id in options.custom_inputs.iter().flatten().chain(&options.mandatory_inputs) {
            if data.locked_outputs.contains(output_id) || !data.unspent_outputs.contains_key(output_id) {
                return Err(Error::OutputNotAvailable(*output_id));
            }
        }

        let remainder_address = options.remainder_address.unwrap_or(*data.address.inner());
        let mut selection = InputSelection::new(
            data.available_inputs(),
            outputs,
            remainder_address,
            params.rent_structure,
            slot_index,
        )
        .with_required_inputs(options.mandatory_inputs.iter().copied())
        .with_burn(options.burn.clone())
        .with_mana_allotments(options.mana_allotments.iter().copied());
        if let Some(custom_inputs) = &options.custom_inputs {
            selection = selection.with_custom_inputs(custom_inputs.iter().copied());
        }
        let selected = selection.select()?;

        let mut allotments = options.mana_allotments;
        allotments.sort_by_key(|allotment| allotment.account_id);
        let transaction = Transaction {
            network_id: params.network_id(),
            creation_slot: slot_index,
            context_inputs: Vec::new(),
            inputs: selected.inputs.iter().map(|i| Input::from(i.output_id())).collect(),
            allotments,
            capabilities: options.burn.capabilities(),
            payload: options.tagged_data_payload,
            outputs: selected.outputs,
        };
        let prepared = PreparedTransactionData {
            transaction,
            inputs: selected.inputs,
            remainders: selected.remainders,
        };
        prepared.verify()?;

        data.reserve(prepared.inputs.iter().map(InputSigningData::output_id));
        drop(data);
        state.transition(TransactionState::Prepared)?;
        debug!(
            "Prepared transaction {} with {} inputs.",
            prepared.transaction_id(),
            prepared.inputs.len()
        );

        Ok(PreparedTransaction {
            wallet: self.clone(),
            data: prepared,
            note: options.note,
            state,
        })
    }
}

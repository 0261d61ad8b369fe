// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The transaction assembler. Selects inputs for a set of outputs, balances them with remainder outputs, checks that
//! value is conserved across the transaction and builds the unlocks.

pub mod conservation;
mod selection;
pub mod transition;
mod unlocks;

use serde::{Deserialize, Serialize};

pub use self::{
    selection::{Burn, InputSelection, Selected, SelectionError},
    unlocks::build_unlocks,
};
use crate::{
    client::Bip44Chain,
    model::{
        ledger::OutputWithMetadata,
        utxo::{Address, ChainId, Output, OutputId, Transaction, TransactionId},
        ValidationError,
    },
};

/// An output that can be consumed, together with the key that unlocks it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSigningData {
    /// The consumed output.
    pub output: OutputWithMetadata,
    /// The derivation path of the key that signs for the output. Chain-owned outputs do not need one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<Bip44Chain>,
}

impl InputSigningData {
    /// The id of the consumed output.
    pub fn output_id(&self) -> OutputId {
        self.output.output_id()
    }

    /// The chain id of the consumed output, if it is a chain output.
    pub fn chain_id(&self) -> Option<ChainId> {
        self.output.chain_id()
    }
}

/// A remainder output and the address it returns to.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemainderData {
    pub output: Output,
    pub address: Address,
}

/// An unsigned, balanced transaction together with everything needed to sign it. It can be stored and replayed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedTransactionData {
    /// The transaction to sign.
    pub transaction: Transaction,
    /// The consumed outputs, in input order.
    pub inputs: Vec<InputSigningData>,
    /// The remainder outputs contained in the transaction outputs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remainders: Vec<RemainderData>,
}

impl PreparedTransactionData {
    /// The id of the transaction.
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction.id()
    }

    /// The consumed outputs with their metadata.
    pub fn consumed_outputs(&self) -> Vec<OutputWithMetadata> {
        self.inputs.iter().map(|i| i.output.clone()).collect()
    }

    /// Checks that the inputs match the transaction and that the transaction is balanced.
    pub fn verify(&self) -> Result<(), ValidationError> {
        self.transaction.verify()?;
        let input_ids = self.transaction.utxo_inputs().copied().collect::<Vec<_>>();
        let data_ids = self.inputs.iter().map(InputSigningData::output_id).collect::<Vec<_>>();
        if input_ids != data_ids {
            let missing = input_ids
                .into_iter()
                .zip(data_ids.into_iter().map(Some).chain(std::iter::repeat(None)))
                .find(|(expected, found)| Some(*expected) != *found)
                .map(|(expected, _)| expected);
            return Err(match missing {
                Some(output_id) => ValidationError::MissingInput(output_id),
                None => ValidationError::InvalidInputCount(self.inputs.len()),
            });
        }
        conservation::verify_balance(&self.consumed_outputs(), &self.transaction)
    }
}

// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use tracing::instrument;

use super::{transition::required_address, PreparedTransactionData};
use crate::{
    client::{SecretError, SecretManager},
    model::{
        utxo::{Address, Ed25519Address, Unlock, Unlocks},
        SlotIndex, ValidationError,
    },
};

/// Builds one unlock per input of a prepared transaction.
///
/// The first input of every Ed25519 address is signed; later inputs of the same address reference that signature.
/// Inputs owned by an account or an NFT point to the input that carries the chain.
#[instrument(skip_all, err, level = "trace")]
pub async fn build_unlocks(
    prepared: &PreparedTransactionData,
    secret_manager: &dyn SecretManager,
    slot_index: SlotIndex,
) -> Result<Unlocks, crate::Error> {
    let transaction = &prepared.transaction;
    let signing_hash = transaction.signing_hash();
    let mut unlocked = HashMap::<Address, u16>::new();
    let mut unlocks = Vec::with_capacity(prepared.inputs.len());

    for (index, input) in prepared.inputs.iter().enumerate() {
        // A verified transaction has at most 128 inputs.
        let index = index as u16;
        let address = required_address(&input.output, &transaction.outputs, slot_index).ok_or(
            ValidationError::InvalidUnlock {
                index: index as usize,
                reason: "input can not be unlocked",
            },
        )?;

        let unlock = match unlocked.get(&address) {
            Some(&first) => match address {
                Address::Ed25519(_) => Unlock::Reference { index: first },
                Address::Account(_) => Unlock::Account { index: first },
                Address::Nft(_) => Unlock::Nft { index: first },
            },
            None => match address {
                Address::Ed25519(expected) => {
                    let chain = input
                        .chain
                        .ok_or_else(|| SecretError::MissingChain(input.output_id().to_hex()))?;
                    let signature = secret_manager.sign_ed25519(&signing_hash, chain).await?;
                    if Ed25519Address::from_public_key(signature.public_key()) != expected {
                        return Err(SecretError::AddressMismatch(address).into());
                    }
                    unlocked.insert(address, index);
                    Unlock::Signature { signature }
                }
                _ => {
                    return Err(ValidationError::InvalidUnlock {
                        index: index as usize,
                        reason: "owning chain is not an earlier input",
                    }
                    .into());
                }
            },
        };

        // Later inputs owned by this chain unlock through it.
        if let Some(chain_address) = input.chain_id().and_then(|chain_id| chain_id.to_address()) {
            unlocked.entry(chain_address).or_insert(index);
        }
        unlocks.push(unlock);
    }

    let unlocks = Unlocks::new(unlocks, transaction.inputs.len())?;
    unlocks.verify_signatures(&signing_hash)?;
    Ok(unlocks)
}

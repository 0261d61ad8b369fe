// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Rules for chain outputs (accounts, foundries and NFTs) that are carried from the inputs to the outputs of a
//! transaction.

use std::collections::BTreeMap;

use crate::model::{
    ledger::OutputWithMetadata,
    utxo::{AccountId, AccountOutput, Address, Capabilities, ChainId, FoundryId, FoundryOutput, Output, Transaction},
    SlotIndex, ValidationError,
};

fn invalid(chain: ChainId, reason: &'static str) -> ValidationError {
    ValidationError::InvalidChainTransition {
        chain: chain.to_string(),
        reason,
    }
}

/// Whether the outputs transition the state of an account, as opposed to a governance transition or destruction.
pub fn is_state_transition(account_id: AccountId, current: &AccountOutput, outputs: &[Output]) -> bool {
    outputs.iter().any(|output| match output {
        Output::Account(next) => {
            next.account_id == account_id && next.state_index == current.state_index.wrapping_add(1)
        }
        _ => false,
    })
}

/// The address that must unlock an input, given the outputs of the transaction it is consumed by.
pub fn required_address(input: &OutputWithMetadata, outputs: &[Output], slot_index: SlotIndex) -> Option<Address> {
    let is_state_transition = match (&input.output, input.chain_id()) {
        (Output::Account(current), Some(ChainId::Account(account_id))) => {
            is_state_transition(account_id, current, outputs)
        }
        _ => false,
    };
    input.output.unlock_address(slot_index, is_state_transition)
}

/// Verifies every chain that is created, transitioned or destroyed by a transaction.
pub fn verify_transitions(inputs: &[OutputWithMetadata], transaction: &Transaction) -> Result<(), ValidationError> {
    let input_chains = inputs
        .iter()
        .filter_map(|i| i.chain_id().map(|chain_id| (chain_id, &i.output)))
        .collect::<BTreeMap<_, _>>();

    let mut output_chains = BTreeMap::new();
    for output in &transaction.outputs {
        if let Some(chain_id) = output.chain_id() {
            if chain_id.is_null() {
                continue;
            }
            if output_chains.insert(chain_id, output).is_some() {
                return Err(invalid(chain_id, "chain appears in more than one output"));
            }
        }
    }

    let mut created_foundries = BTreeMap::<AccountId, u32>::new();
    for (chain_id, next) in &output_chains {
        match (input_chains.get(chain_id), next) {
            (Some(current), _) => verify_transition(*chain_id, current, next)?,
            (None, Output::Foundry(foundry)) => {
                verify_foundry_creation(foundry, &input_chains, &output_chains)?;
                *created_foundries
                    .entry(*foundry.account_address().account_id())
                    .or_default() += 1;
            }
            (None, _) => return Err(invalid(*chain_id, "chain input is missing")),
        }
    }

    for (chain_id, current) in &input_chains {
        if let (ChainId::Account(account_id), Output::Account(current)) = (chain_id, current) {
            if let Some(Output::Account(next)) = output_chains.get(chain_id) {
                let created = created_foundries.get(account_id).copied().unwrap_or_default();
                if next.foundry_counter - current.foundry_counter != created {
                    return Err(invalid(*chain_id, "foundry counter does not match the created foundries"));
                }
            }
        }
        if !output_chains.contains_key(chain_id) {
            verify_destruction(*chain_id, current, transaction.capabilities)?;
        }
    }
    Ok(())
}

fn verify_transition(chain_id: ChainId, current: &Output, next: &Output) -> Result<(), ValidationError> {
    if current.immutable_features() != next.immutable_features() {
        return Err(invalid(chain_id, "immutable features changed"));
    }
    match (current, next) {
        (Output::Account(current), Output::Account(next)) => {
            if next.state_index == current.state_index.wrapping_add(1) {
                if next.foundry_counter < current.foundry_counter {
                    return Err(invalid(chain_id, "foundry counter decreased"));
                }
            } else if next.state_index == current.state_index {
                if next.foundry_counter != current.foundry_counter {
                    return Err(invalid(chain_id, "governance transition changed the foundry counter"));
                }
            } else {
                return Err(invalid(chain_id, "state index must stay or grow by one"));
            }
        }
        (Output::Foundry(current), Output::Foundry(next)) => {
            current
                .token_scheme
                .verify_transition(&next.token_scheme)?;
        }
        (Output::Nft(_), Output::Nft(_)) => (),
        _ => return Err(invalid(chain_id, "output kind changed")),
    }
    Ok(())
}

fn verify_foundry_creation(
    foundry: &FoundryOutput,
    input_chains: &BTreeMap<ChainId, &Output>,
    output_chains: &BTreeMap<ChainId, &Output>,
) -> Result<(), ValidationError> {
    let chain_id = ChainId::Foundry(foundry.id());
    let account = ChainId::Account(*foundry.account_address().account_id());
    match (input_chains.get(&account), output_chains.get(&account)) {
        (Some(Output::Account(current)), Some(Output::Account(next))) => {
            if foundry.serial_number <= current.foundry_counter || foundry.serial_number > next.foundry_counter {
                return Err(invalid(chain_id, "serial number does not match the foundry counter"));
            }
        }
        _ => return Err(invalid(chain_id, "controlling account is not transitioned")),
    }
    if !foundry.token_scheme.as_simple().melted_tokens().is_zero() {
        return Err(invalid(chain_id, "new foundry can not have melted tokens"));
    }
    Ok(())
}

fn verify_destruction(chain_id: ChainId, current: &Output, capabilities: Capabilities) -> Result<(), ValidationError> {
    match chain_id {
        ChainId::Account(_) if !capabilities.has(Capabilities::DESTROY_ACCOUNT_OUTPUTS) => {
            Err(ValidationError::MissingCapability("destroy_account_outputs"))
        }
        ChainId::Nft(_) if !capabilities.has(Capabilities::DESTROY_NFT_OUTPUTS) => {
            Err(ValidationError::MissingCapability("destroy_nft_outputs"))
        }
        ChainId::Foundry(foundry_id) => {
            if !capabilities.has(Capabilities::DESTROY_FOUNDRY_OUTPUTS) {
                return Err(ValidationError::MissingCapability("destroy_foundry_outputs"));
            }
            if let Output::Foundry(foundry) = current {
                verify_zero_supply(foundry_id, foundry)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn verify_zero_supply(foundry_id: FoundryId, foundry: &FoundryOutput) -> Result<(), ValidationError> {
    let circulating = foundry.token_scheme.as_simple().circulating_supply();
    if !circulating.is_zero() {
        return Err(ValidationError::NonZeroCirculatingSupply {
            foundry_id,
            circulating,
        });
    }
    Ok(())
}

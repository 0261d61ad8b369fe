// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Checks that a transaction neither creates nor destroys value it is not allowed to.

use std::collections::BTreeMap;

use primitive_types::U256;

use super::transition::verify_transitions;
use crate::model::{
    ledger::OutputWithMetadata,
    utxo::{Address, Capabilities, Output, TokenId, Transaction},
    ValidationError,
};

/// The amounts of a native token that foundry transitions mint and melt.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SupplyChange {
    /// Newly minted tokens.
    pub minted: U256,
    /// Newly melted tokens.
    pub melted: U256,
}

/// Sums the native tokens held by some outputs.
pub fn native_token_sums<'a>(
    outputs: impl IntoIterator<Item = &'a Output>,
) -> Result<BTreeMap<TokenId, U256>, ValidationError> {
    let mut sums = BTreeMap::<TokenId, U256>::new();
    for token in outputs.into_iter().filter_map(Output::native_token) {
        let sum = sums.entry(token.token_id).or_default();
        *sum = sum.checked_add(token.amount).ok_or(ValidationError::AmountOverflow)?;
    }
    Ok(sums)
}

/// Computes what the foundry outputs mint and melt compared to the consumed foundries.
pub fn supply_changes(inputs: &[OutputWithMetadata], outputs: &[Output]) -> BTreeMap<TokenId, SupplyChange> {
    let mut changes = BTreeMap::new();
    for output in outputs {
        if let Output::Foundry(next) = output {
            let next_scheme = next.token_scheme.as_simple();
            let current = inputs.iter().find_map(|i| match &i.output {
                Output::Foundry(current) if current.id() == next.id() => Some(current.token_scheme.as_simple()),
                _ => None,
            });
            let change = match current {
                Some(current) => SupplyChange {
                    minted: next_scheme.minted_tokens().saturating_sub(current.minted_tokens()),
                    melted: next_scheme.melted_tokens().saturating_sub(current.melted_tokens()),
                },
                None => SupplyChange {
                    minted: next_scheme.minted_tokens(),
                    melted: next_scheme.melted_tokens(),
                },
            };
            if change != SupplyChange::default() {
                changes.insert(next.token_id(), change);
            }
        }
    }
    changes
}

fn sum_amounts(amounts: impl IntoIterator<Item = u64>) -> Result<u64, ValidationError> {
    amounts
        .into_iter()
        .try_fold(0u64, |sum, amount| sum.checked_add(amount).ok_or(ValidationError::AmountOverflow))
}

fn unbalanced(what: impl Into<String>, consumed: impl ToString, created: impl ToString) -> ValidationError {
    ValidationError::Unbalanced {
        what: what.into(),
        consumed: consumed.to_string(),
        created: created.to_string(),
    }
}

/// Verifies that every consumed output with an unexpired storage deposit return gives the deposit back.
///
/// The returns owed to an address add up. Only basic outputs without further conditions or native tokens count as
/// returned.
pub fn verify_storage_deposit_returns(
    inputs: &[OutputWithMetadata],
    transaction: &Transaction,
) -> Result<(), ValidationError> {
    let mut required = BTreeMap::<Address, u64>::new();
    let owed = inputs.iter().map(|input| &input.output).filter(|output| {
        !output
            .expiration()
            .map_or(false, |e| e.is_expired(transaction.creation_slot))
    });
    for sdr in owed.filter_map(Output::storage_deposit_return) {
        let sum = required.entry(sdr.return_address).or_default();
        *sum = sum.checked_add(sdr.amount).ok_or(ValidationError::AmountOverflow)?;
    }

    for (address, required) in required {
        let returned = sum_amounts(transaction.outputs.iter().filter_map(|output| match output {
            Output::Basic(basic) if basic.is_simple() && *basic.address() == address => Some(basic.amount),
            _ => None,
        }))?;
        if returned < required {
            return Err(ValidationError::UnfulfilledStorageDepositReturn { required, returned });
        }
    }
    Ok(())
}

/// Verifies that base coin, mana and native tokens are conserved, and that every chain transition is valid.
///
/// Base coin must balance exactly and storage deposits must be returned. Mana may only be burned with
/// [`Capabilities::BURN_MANA`]. For every native token, `consumed + minted == created + melted + burned`, where
/// burning requires [`Capabilities::BURN_NATIVE_TOKENS`].
pub fn verify_balance(inputs: &[OutputWithMetadata], transaction: &Transaction) -> Result<(), ValidationError> {
    for output_id in transaction.utxo_inputs() {
        if !inputs.iter().any(|i| i.output_id() == *output_id) {
            return Err(ValidationError::MissingInput(*output_id));
        }
    }

    verify_transitions(inputs, transaction)?;
    verify_storage_deposit_returns(inputs, transaction)?;

    let consumed = sum_amounts(inputs.iter().map(OutputWithMetadata::amount))?;
    let created = transaction.output_amount()?;
    if consumed != created {
        return Err(unbalanced("base coin", consumed, created));
    }

    let consumed_mana = sum_amounts(inputs.iter().map(|i| i.output.mana()))?;
    let created_mana = sum_amounts(transaction.outputs.iter().map(Output::mana))?
        .checked_add(transaction.allotted_mana()?)
        .ok_or(ValidationError::AmountOverflow)?;
    if created_mana > consumed_mana {
        return Err(unbalanced("mana", consumed_mana, created_mana));
    }
    if created_mana < consumed_mana && !transaction.capabilities.has(Capabilities::BURN_MANA) {
        return Err(ValidationError::MissingCapability("burn_mana"));
    }

    let consumed_tokens = native_token_sums(inputs.iter().map(|i| &i.output))?;
    let created_tokens = native_token_sums(&transaction.outputs)?;
    let changes = supply_changes(inputs, &transaction.outputs);
    let token_ids = consumed_tokens
        .keys()
        .chain(created_tokens.keys())
        .chain(changes.keys())
        .copied()
        .collect::<std::collections::BTreeSet<_>>();
    for token_id in token_ids {
        let change = changes.get(&token_id).copied().unwrap_or_default();
        let available = consumed_tokens
            .get(&token_id)
            .copied()
            .unwrap_or_default()
            .checked_add(change.minted)
            .ok_or(ValidationError::AmountOverflow)?;
        let used = created_tokens
            .get(&token_id)
            .copied()
            .unwrap_or_default()
            .checked_add(change.melted)
            .ok_or(ValidationError::AmountOverflow)?;
        if used > available {
            return Err(unbalanced(format!("native token {token_id}"), available, used));
        }
        if used < available && !transaction.capabilities.has(Capabilities::BURN_NATIVE_TOKENS) {
            return Err(ValidationError::MissingCapability("burn_native_tokens"));
        }
    }
    Ok(())
}

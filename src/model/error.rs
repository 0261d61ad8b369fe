// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Errors raised by the ledger object model.

use primitive_types::U256;
use thiserror::Error;

use super::utxo::{AccountId, FoundryId, OutputId};

/// Malformed or invariant-violating model data. Never retried.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("invalid length: expected {expected} bytes, found {found}")]
    InvalidLength { expected: usize, found: usize },
    #[error("invalid bech32 address: {0}")]
    InvalidBech32(String),
    #[error("invalid bech32 human readable part: expected `{expected}`, found `{found}`")]
    Bech32HrpMismatch { expected: String, found: String },
    #[error("invalid address kind {0}")]
    InvalidAddressKind(u8),
    #[error("invalid amount `{0}`: not a number")]
    InvalidAmount(String),
    #[error("invalid amount `{0}`: amounts can not be negative")]
    NegativeAmount(String),
    #[error("amount overflow")]
    AmountOverflow,
    #[error("duplicate {0} unlock condition")]
    DuplicateUnlockCondition(&'static str),
    #[error("missing {kind} unlock condition on {output} output")]
    MissingUnlockCondition { kind: &'static str, output: &'static str },
    #[error("{kind} unlock condition is not allowed on {output} outputs")]
    DisallowedUnlockCondition { kind: &'static str, output: &'static str },
    #[error("duplicate {0} feature")]
    DuplicateFeature(&'static str),
    #[error("{kind} feature is not allowed on {output} outputs (immutable: {immutable})")]
    DisallowedFeature {
        kind: &'static str,
        output: &'static str,
        immutable: bool,
    },
    #[error("invalid {kind} feature length {len}")]
    InvalidFeatureLength { kind: &'static str, len: usize },
    #[error("invalid native token amount: must not be zero")]
    ZeroNativeTokenAmount,
    #[error("insufficient storage deposit: amount {amount} is below the required {required}")]
    InsufficientStorageDeposit { amount: u64, required: u64 },
    #[error("invalid storage deposit return amount {amount}: must be between {minimum} and {maximum}")]
    InvalidStorageDepositReturnAmount { amount: u64, minimum: u64, maximum: u64 },
    #[error("unfulfilled storage deposit return: {returned} of {required} returned")]
    UnfulfilledStorageDepositReturn { required: u64, returned: u64 },
    #[error("invalid token supply: minted {minted}, melted {melted}, maximum {maximum}")]
    InvalidTokenSupply { minted: U256, melted: U256, maximum: U256 },
    #[error("invalid token scheme transition: {0}")]
    InvalidTokenSchemeTransition(&'static str),
    #[error("foundry {foundry_id} still has a circulating supply of {circulating}")]
    NonZeroCirculatingSupply { foundry_id: FoundryId, circulating: U256 },
    #[error("invalid input count {0}")]
    InvalidInputCount(usize),
    #[error("invalid output count {0}")]
    InvalidOutputCount(usize),
    #[error("duplicate input {0}")]
    DuplicateInput(OutputId),
    #[error("missing data for input {0}")]
    MissingInput(OutputId),
    #[error("duplicate mana allotment for account {0}")]
    DuplicateAllotment(AccountId),
    #[error("unlock count {unlocks} does not match input count {inputs}")]
    UnlockCountMismatch { unlocks: usize, inputs: usize },
    #[error("invalid unlock at index {index}: {reason}")]
    InvalidUnlock { index: usize, reason: &'static str },
    #[error("invalid signature for input {0}")]
    InvalidSignature(usize),
    #[error("unbalanced {what}: consumed {consumed}, created {created}")]
    Unbalanced {
        what: String,
        consumed: String,
        created: String,
    },
    #[error("missing transaction capability `{0}`")]
    MissingCapability(&'static str),
    #[error("invalid {chain} transition: {reason}")]
    InvalidChainTransition { chain: String, reason: &'static str },
    #[error("tagged data payload too large: {0} bytes")]
    TaggedDataTooLarge(usize),
}

/// An unrecognized tagged-union discriminant.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown {family} variant `{kind}`")]
pub struct UnknownVariantError {
    /// The variant family, e.g. `feature`.
    pub family: &'static str,
    /// The unrecognized discriminant.
    pub kind: String,
}

/// Failure to decode a model value from its structured representation.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    UnknownVariant(#[from] UnknownVariantError),
    #[error("malformed value: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Module containing the [`Payload`] types.

use serde::{Deserialize, Serialize};

use crate::model::{codec::TaggedUnion, ValidationError};

pub mod tagged_data;
pub mod transaction;

pub use self::{
    tagged_data::TaggedDataPayload,
    transaction::{SignedTransactionPayload, TransactionId},
};

/// The different payloads of a [`Block`](crate::model::Block).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, derive_more::From)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Payload {
    /// Signals a transaction of tokens.
    SignedTransaction(Box<SignedTransactionPayload>),
    /// Signals arbitrary data as a key-value pair.
    TaggedData(Box<TaggedDataPayload>),
}

impl Payload {
    /// Returns the signed transaction, if this is a transaction payload.
    pub fn as_signed_transaction(&self) -> Option<&SignedTransactionPayload> {
        match self {
            Self::SignedTransaction(p) => Some(p),
            Self::TaggedData(_) => None,
        }
    }

    /// Checks the invariants of the payload.
    pub fn verify(&self) -> Result<(), ValidationError> {
        match self {
            Self::SignedTransaction(p) => p.verify(),
            Self::TaggedData(p) => p.verify(),
        }
    }
}

impl From<SignedTransactionPayload> for Payload {
    fn from(value: SignedTransactionPayload) -> Self {
        Self::SignedTransaction(Box::new(value))
    }
}

impl From<TaggedDataPayload> for Payload {
    fn from(value: TaggedDataPayload) -> Self {
        Self::TaggedData(Box::new(value))
    }
}

impl TaggedUnion for Payload {
    const FAMILY: &'static str = "payload";
    const KINDS: &'static [&'static str] = &[SignedTransactionPayload::KIND, TaggedDataPayload::KIND];

    fn verify(&self) -> Result<(), ValidationError> {
        Payload::verify(self)
    }
}

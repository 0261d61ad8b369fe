// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

use crate::{
    client::{NodeError, SecretError},
    model::{
        ledger::ConflictReason,
        utxo::{OutputId, TransactionId},
        UnknownVariantError, ValidationError,
    },
    storage::StorageError,
    transaction::SelectionError,
    wallet::TransactionState,
};

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("insufficient {asset}: found {found}, required {required}")]
    InsufficientFunds {
        asset: String,
        found: String,
        required: String,
    },
    #[error(transparent)]
    UnknownVariant(#[from] UnknownVariantError),
    #[error("network error: {0}")]
    Network(String),
    #[error("transaction {transaction_id} was not included after {attempts} attempts")]
    NotIncluded {
        transaction_id: TransactionId,
        attempts: u32,
    },
    #[error("transaction {transaction_id} is conflicting: {reason}")]
    Conflict {
        transaction_id: TransactionId,
        reason: ConflictReason,
    },
    #[error("node error: {0}")]
    Node(NodeError),
    #[error(transparent)]
    Secret(#[from] SecretError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("transaction {0} not found")]
    TransactionNotFound(TransactionId),
    #[error("output {0} is not available")]
    OutputNotAvailable(OutputId),
    #[error("no {0} output found in the wallet")]
    ChainNotFound(String),
    #[error("cancelled")]
    Cancelled,
    #[error("invalid transaction state transition from {from} to {to}")]
    InvalidStateTransition {
        from: TransactionState,
        to: TransactionState,
    },
}

impl Error {
    /// Create an insufficient funds error for an asset.
    pub fn insufficient(asset: impl Into<String>, found: impl ToString, required: impl ToString) -> Self {
        Self::InsufficientFunds {
            asset: asset.into(),
            found: found.to_string(),
            required: required.to_string(),
        }
    }

    /// The stable machine-readable kind of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::UnknownVariant(_) => ErrorKind::UnknownVariant,
            Self::Network(_) => ErrorKind::Network,
            Self::NotIncluded { .. } => ErrorKind::NotIncluded,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Node(_) => ErrorKind::Node,
            Self::Secret(_) => ErrorKind::Secret,
            Self::Storage(_) => ErrorKind::Storage,
            Self::TransactionNotFound(_) => ErrorKind::TransactionNotFound,
            Self::OutputNotAvailable(_) => ErrorKind::OutputNotAvailable,
            Self::ChainNotFound(_) => ErrorKind::ChainNotFound,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
        }
    }
}

impl From<NodeError> for Error {
    fn from(value: NodeError) -> Self {
        match value {
            NodeError::Unreachable(message) => Self::Network(message),
            other => Self::Node(other),
        }
    }
}

impl From<SelectionError> for Error {
    fn from(value: SelectionError) -> Self {
        match value {
            SelectionError::InsufficientFunds { asset, found, required } => {
                Self::InsufficientFunds { asset, found, required }
            }
            SelectionError::Validation(e) => Self::Validation(e),
        }
    }
}

/// The machine-readable kind of an [`Error`].
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    InsufficientFunds,
    UnknownVariant,
    Network,
    NotIncluded,
    Conflict,
    Node,
    Secret,
    Storage,
    TransactionNotFound,
    OutputNotAvailable,
    ChainNotFound,
    Cancelled,
    InvalidStateTransition,
}

impl ErrorKind {
    /// A stable string code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::InsufficientFunds => "insufficient_funds",
            Self::UnknownVariant => "unknown_variant",
            Self::Network => "network",
            Self::NotIncluded => "not_included",
            Self::Conflict => "conflict",
            Self::Node => "node",
            Self::Secret => "secret",
            Self::Storage => "storage",
            Self::TransactionNotFound => "transaction_not_found",
            Self::OutputNotAvailable => "output_not_available",
            Self::ChainNotFound => "chain_not_found",
            Self::Cancelled => "cancelled",
            Self::InvalidStateTransition => "invalid_state_transition",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn unreachable_node_is_a_network_error() {
        let error = Error::from(NodeError::Unreachable("connection refused".to_owned()));
        assert_eq!(error.kind(), ErrorKind::Network);
        let error = Error::from(NodeError::NotFound("block".to_owned()));
        assert_eq!(error.kind().as_str(), "node");
    }

    #[test]
    fn selection_errors_keep_their_kind() {
        let error = Error::from(SelectionError::InsufficientFunds {
            asset: "base coin".to_owned(),
            found: "1".to_owned(),
            required: "2".to_owned(),
        });
        assert_eq!(error.kind(), ErrorKind::InsufficientFunds);
        assert_eq!(error.to_string(), "insufficient base coin: found 1, required 2");
        let error = Error::from(SelectionError::Validation(ValidationError::AmountOverflow));
        assert_eq!(error.kind(), ErrorKind::Validation);
    }
}

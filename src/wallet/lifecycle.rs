// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The states a submitted transaction goes through and the record the wallet keeps of it.

use serde::{Deserialize, Serialize};

use crate::{
    model::{
        ledger::{ConflictReason, OutputWithMetadata},
        util::stringify,
        utxo::{SignedTransactionPayload, TransactionId},
        BlockId,
    },
    Error,
};

/// The stages of a wallet transaction.
///
/// `Preparing → Prepared → Submitting → Submitted → {Included | Conflicting | Expired}`. An expired transaction can
/// still be resolved by a later sync.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    Preparing,
    Prepared,
    Submitting,
    Submitted,
    Included,
    Conflicting,
    Expired,
}

impl TransactionState {
    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: Self) -> bool {
        use TransactionState::*;
        matches!(
            (self, next),
            (Preparing, Prepared)
                | (Prepared, Submitting)
                | (Submitting, Submitted)
                | (Submitted, Included | Conflicting | Expired)
                | (Expired, Included | Conflicting)
        )
    }

    /// Moves to `next`, rejecting edges the state machine does not have.
    pub fn transition(&mut self, next: Self) -> Result<(), Error> {
        if !self.can_transition_to(next) {
            return Err(Error::InvalidStateTransition { from: *self, to: next });
        }
        *self = next;
        Ok(())
    }

    /// Whether the ledger decided about the transaction.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Included | Self::Conflicting)
    }

    #[allow(missing_docs)]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preparing => "preparing",
            Self::Prepared => "prepared",
            Self::Submitting => "submitting",
            Self::Submitted => "submitted",
            Self::Included => "included",
            Self::Conflicting => "conflicting",
            Self::Expired => "expired",
        }
    }
}

impl core::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted transaction as the wallet remembers it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionWithMetadata {
    /// The signed transaction.
    pub payload: SignedTransactionPayload,
    /// The latest block that carries the payload.
    pub block_id: Option<BlockId>,
    /// The lifecycle stage.
    pub state: TransactionState,
    /// The consumed outputs, in input order.
    pub inputs: Vec<OutputWithMetadata>,
    /// Unix time of submission in milliseconds.
    #[serde(with = "stringify")]
    pub timestamp: u64,
    /// A free text attached by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Why the ledger rejected the transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_reason: Option<ConflictReason>,
}

impl TransactionWithMetadata {
    /// The id of the transaction.
    pub fn transaction_id(&self) -> TransactionId {
        self.payload.transaction_id()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn follows_the_lifecycle() {
        let mut state = TransactionState::Preparing;
        for next in [
            TransactionState::Prepared,
            TransactionState::Submitting,
            TransactionState::Submitted,
            TransactionState::Expired,
            TransactionState::Included,
        ] {
            state.transition(next).unwrap();
        }
        assert_eq!(state, TransactionState::Included);
        assert!(state.is_final());
    }

    #[test]
    fn rejects_skipped_and_backward_edges() {
        let mut state = TransactionState::Prepared;
        let err = state.transition(TransactionState::Included).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidStateTransition);
        assert_eq!(state, TransactionState::Prepared);

        let mut state = TransactionState::Included;
        assert!(state.transition(TransactionState::Submitted).is_err());
        assert!(!TransactionState::Conflicting.can_transition_to(TransactionState::Included));
    }

    #[test]
    fn serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_value(TransactionState::Submitted).unwrap(),
            serde_json::json!("submitted")
        );
        assert_eq!(TransactionState::Expired.to_string(), "expired");
    }
}

// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Module containing the [`Input`] type.

use serde::{Deserialize, Serialize};

use super::output::OutputId;
use crate::model::{codec::TaggedUnion, util::impl_id, utxo::AccountId, SlotCommitmentId};

impl_id!(
    /// The id of a legacy milestone.
    pub MilestoneId,
    32
);

/// The type for [`Inputs`](Input) in the UTXO model.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Input {
    /// The id of the corresponding output.
    Utxo {
        /// The consumed output.
        output_id: OutputId,
    },
    /// A legacy treasury that is consumed by a treasury transaction.
    Treasury {
        /// The milestone that created the treasury.
        milestone_id: MilestoneId,
    },
}

impl Input {
    /// The consumed output, if this is a UTXO input.
    pub fn output_id(&self) -> Option<&OutputId> {
        match self {
            Self::Utxo { output_id } => Some(output_id),
            Self::Treasury { .. } => None,
        }
    }
}

impl From<OutputId> for Input {
    fn from(output_id: OutputId) -> Self {
        Self::Utxo { output_id }
    }
}

impl TaggedUnion for Input {
    const FAMILY: &'static str = "input";
    const KINDS: &'static [&'static str] = &["utxo", "treasury"];
}

/// Inputs that provide context to a transaction without being consumed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ContextInput {
    /// References a slot commitment.
    Commitment {
        /// The referenced commitment.
        commitment_id: SlotCommitmentId,
    },
    /// References the block issuance credit of an account.
    BlockIssuanceCredit {
        /// The referenced account.
        account_id: AccountId,
    },
    /// Claims the reward of the input at the given index.
    Reward {
        /// The index of the input.
        index: u16,
    },
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{
        codec::{decode, encode},
        utxo::TransactionId,
        DecodeError,
    };

    #[test]
    fn inputs_round_trip() {
        let utxo = Input::from(OutputId::new(TransactionId::new([1; 32]), 3));
        let treasury = Input::Treasury {
            milestone_id: MilestoneId::new([2; 32]),
        };
        for input in [utxo, treasury] {
            assert_eq!(decode::<Input>(encode(&input)).unwrap(), input);
        }
        assert_eq!(encode(&utxo)["kind"], "utxo");
    }

    #[test]
    fn unknown_input_kind_is_reported() {
        let result = decode::<Input>(serde_json::json!({ "kind": "anchor", "index": 0 }));
        assert!(matches!(result, Err(DecodeError::UnknownVariant(e)) if e.family == "input" && e.kind == "anchor"));
    }
}

// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Module containing types related to transactions.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use self::{
    input::{ContextInput, Input},
    output::{AccountId, Output, OutputId},
    unlock::Unlocks,
};
use super::TaggedDataPayload;
use crate::model::{
    util::{hash_of, impl_id, stringify},
    SlotIndex, ValidationError,
};

pub mod input;
pub mod output;
pub mod unlock;

impl_id!(
    /// Uniquely identifies a transaction.
    pub TransactionId,
    32
);

/// Permissions a transaction grants itself to deviate from strict balance rules.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(u8);

impl Capabilities {
    /// Native tokens may be burned.
    pub const BURN_NATIVE_TOKENS: u8 = 1 << 0;
    /// Mana may be burned.
    pub const BURN_MANA: u8 = 1 << 1;
    /// Account outputs may be destroyed.
    pub const DESTROY_ACCOUNT_OUTPUTS: u8 = 1 << 2;
    /// Foundry outputs may be destroyed.
    pub const DESTROY_FOUNDRY_OUTPUTS: u8 = 1 << 3;
    /// NFT outputs may be destroyed.
    pub const DESTROY_NFT_OUTPUTS: u8 = 1 << 4;

    /// Creates capabilities from raw flags.
    pub fn new(flags: u8) -> Self {
        Self(flags)
    }

    /// Returns the capabilities with an additional flag set.
    #[must_use]
    pub fn with(self, flag: u8) -> Self {
        Self(self.0 | flag)
    }

    /// Whether a flag is set.
    pub fn has(&self, flag: u8) -> bool {
        self.0 & flag == flag
    }

    /// Whether no flag is set.
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// The raw flags.
    pub fn flags(&self) -> u8 {
        self.0
    }
}

/// Mana that a transaction allots to an account.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ManaAllotment {
    pub account_id: AccountId,
    #[serde(with = "stringify")]
    pub mana: u64,
}

/// Represents the essence of a transaction.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(with = "stringify")]
    pub network_id: u64,
    pub creation_slot: SlotIndex,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_inputs: Vec<ContextInput>,
    pub inputs: Vec<Input>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allotments: Vec<ManaAllotment>,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<TaggedDataPayload>,
    pub outputs: Vec<Output>,
}

impl Transaction {
    /// The maximum number of inputs and of outputs.
    pub const MAX_INPUTS_OUTPUTS: usize = 128;

    /// Computes the identifier of the transaction.
    pub fn id(&self) -> TransactionId {
        TransactionId(hash_of(self))
    }

    /// The message that the unlock signatures commit to.
    pub fn signing_hash(&self) -> [u8; 32] {
        hash_of(self)
    }

    /// Returns the id of the created output at the given index.
    pub fn output_id(&self, index: u16) -> OutputId {
        OutputId::new(self.id(), index)
    }

    /// Iterates over the consumed outputs.
    pub fn utxo_inputs(&self) -> impl Iterator<Item = &OutputId> {
        self.inputs.iter().filter_map(Input::output_id)
    }

    /// The sum of all created base tokens.
    pub fn output_amount(&self) -> Result<u64, ValidationError> {
        self.outputs.iter().try_fold(0u64, |sum, output| {
            sum.checked_add(output.amount()).ok_or(ValidationError::AmountOverflow)
        })
    }

    /// The sum of all allotted mana.
    pub fn allotted_mana(&self) -> Result<u64, ValidationError> {
        self.allotments.iter().try_fold(0u64, |sum, allotment| {
            sum.checked_add(allotment.mana).ok_or(ValidationError::AmountOverflow)
        })
    }

    /// Checks the syntactic rules of the transaction.
    pub fn verify(&self) -> Result<(), ValidationError> {
        if !(1..=Self::MAX_INPUTS_OUTPUTS).contains(&self.inputs.len()) {
            return Err(ValidationError::InvalidInputCount(self.inputs.len()));
        }
        if !(1..=Self::MAX_INPUTS_OUTPUTS).contains(&self.outputs.len()) {
            return Err(ValidationError::InvalidOutputCount(self.outputs.len()));
        }
        // A legacy treasury input can only be consumed on its own.
        if self.inputs.len() > 1 && self.inputs.iter().any(|i| matches!(i, Input::Treasury { .. })) {
            return Err(ValidationError::InvalidInputCount(self.inputs.len()));
        }
        let mut seen = HashSet::new();
        for output_id in self.utxo_inputs() {
            if !seen.insert(output_id) {
                return Err(ValidationError::DuplicateInput(*output_id));
            }
        }
        for pair in self.allotments.windows(2) {
            if pair[0].account_id >= pair[1].account_id {
                return Err(ValidationError::DuplicateAllotment(pair[1].account_id));
            }
        }
        for output in &self.outputs {
            output.verify()?;
        }
        self.output_amount()?;
        self.allotted_mana()?;
        if let Some(payload) = &self.payload {
            payload.verify()?;
        }
        Ok(())
    }
}

/// Represents the transaction payload.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransactionPayload {
    pub transaction: Transaction,
    pub unlocks: Unlocks,
}

impl SignedTransactionPayload {
    /// A `&str` representation of the type.
    pub const KIND: &'static str = "signed_transaction";

    /// Pairs a transaction with its unlocks, checking that there is exactly one unlock per input.
    pub fn new(transaction: Transaction, unlocks: Unlocks) -> Result<Self, ValidationError> {
        let payload = Self { transaction, unlocks };
        payload.verify()?;
        Ok(payload)
    }

    /// The id of the contained transaction.
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction.id()
    }

    /// Checks the transaction, the unlock references and every signature.
    pub fn verify(&self) -> Result<(), ValidationError> {
        self.transaction.verify()?;
        let unlocks = Unlocks::new(self.unlocks.iter().cloned().collect(), self.transaction.inputs.len())?;
        unlocks.verify_signatures(&self.transaction.signing_hash())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::utxo::{AddressUnlockCondition, BasicOutputBuilder, Ed25519Address};

    fn transaction(inputs: Vec<Input>) -> Transaction {
        Transaction {
            network_id: 1,
            creation_slot: SlotIndex(10),
            context_inputs: Vec::new(),
            inputs,
            allotments: Vec::new(),
            capabilities: Capabilities::default(),
            payload: None,
            outputs: vec![BasicOutputBuilder::new_with_amount(100)
                .add_unlock_condition(AddressUnlockCondition::new(Ed25519Address::new([1; 32])))
                .finish_output()
                .unwrap()],
        }
    }

    fn input(index: u16) -> Input {
        OutputId::new(TransactionId::new([4; 32]), index).into()
    }

    #[test]
    fn id_depends_on_content() {
        let a = transaction(vec![input(0)]);
        let b = transaction(vec![input(1)]);
        assert_eq!(a.id(), a.clone().id());
        assert_ne!(a.id(), b.id());
        assert_eq!(a.output_id(1), OutputId::new(a.id(), 1));
    }

    #[test]
    fn input_rules() {
        assert!(transaction(vec![input(0), input(1)]).verify().is_ok());
        assert_eq!(
            transaction(Vec::new()).verify(),
            Err(ValidationError::InvalidInputCount(0))
        );
        assert!(matches!(
            transaction(vec![input(0), input(0)]).verify(),
            Err(ValidationError::DuplicateInput(_))
        ));
        assert_eq!(
            transaction((0..129).map(input).collect()).verify(),
            Err(ValidationError::InvalidInputCount(129))
        );
    }

    #[test]
    fn allotments_must_be_sorted_and_unique() {
        let mut tx = transaction(vec![input(0)]);
        let allotment = |b| ManaAllotment {
            account_id: AccountId::new([b; 32]),
            mana: 1,
        };
        tx.allotments = vec![allotment(1), allotment(2)];
        assert!(tx.verify().is_ok());
        tx.allotments = vec![allotment(2), allotment(2)];
        assert!(matches!(tx.verify(), Err(ValidationError::DuplicateAllotment(_))));
    }

    #[test]
    fn capabilities_flags() {
        let caps = Capabilities::default().with(Capabilities::BURN_MANA);
        assert!(caps.has(Capabilities::BURN_MANA));
        assert!(!caps.has(Capabilities::BURN_NATIVE_TOKENS));
        assert!(Capabilities::default().is_none());
    }
}

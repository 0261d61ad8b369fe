// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::model::{util::stringify, utxo::Address, ValidationError};

/// Defines the amount of tokens used as storage deposit that have to be returned to the return address.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDepositReturnUnlockCondition {
    pub return_address: Address,
    #[serde(with = "stringify")]
    pub amount: u64,
}

impl StorageDepositReturnUnlockCondition {
    pub const KIND: u8 = 1;

    pub fn new(return_address: impl Into<Address>, amount: u64) -> Self {
        Self {
            return_address: return_address.into(),
            amount,
        }
    }

    /// The returned amount can not exceed the amount of the output holding the condition.
    pub(crate) fn verify_amount(&self, output_amount: u64) -> Result<(), ValidationError> {
        if self.amount > output_amount {
            return Err(ValidationError::InvalidStorageDepositReturnAmount {
                amount: self.amount,
                minimum: 0,
                maximum: output_amount,
            });
        }
        Ok(())
    }
}

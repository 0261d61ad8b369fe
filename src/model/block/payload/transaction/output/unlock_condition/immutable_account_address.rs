// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::model::utxo::AccountAddress;

/// Defines the permanent account address that owns a foundry output.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmutableAccountAddressUnlockCondition {
    pub address: AccountAddress,
}

impl ImmutableAccountAddressUnlockCondition {
    pub const KIND: u8 = 6;

    pub fn new(address: impl Into<AccountAddress>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

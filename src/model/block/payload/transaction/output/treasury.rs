// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Module containing the [`TreasuryOutput`].

use serde::{Deserialize, Serialize};

use crate::model::util::stringify;

/// Represents a treasury in the UTXO model. This is a leftover of the legacy migration and can not be created by
/// wallets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryOutput {
    /// The output amount.
    #[serde(with = "stringify")]
    pub amount: u64,
}

impl TreasuryOutput {
    /// A `&str` representation of the type.
    pub const KIND: &'static str = "treasury";
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{
        codec::{decode, encode},
        utxo::Output,
    };

    #[test]
    fn treasury_output_round_trips() {
        let output = Output::from(TreasuryOutput { amount: 1_000 });
        let value = encode(&output);
        assert_eq!(value, serde_json::json!({ "kind": "treasury", "amount": "1000" }));
        assert_eq!(decode::<Output>(value).unwrap(), output);
    }
}

// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Module that contains protocol types.

use serde::{Deserialize, Serialize};

use super::{
    util::{blake2b_256, stringify},
    utxo::RentStructure,
};

/// The parameters of the network a wallet operates on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParameters {
    /// The protocol version.
    pub version: u8,
    /// The name of the network.
    pub network_name: String,
    /// The human readable part of bech32 addresses on this network.
    pub bech32_hrp: String,
    /// The total supply of base tokens.
    #[serde(with = "stringify")]
    pub token_supply: u64,
    /// The exponent that defines the amount of slots in an epoch.
    pub slots_per_epoch_exponent: u8,
    /// The storage deposit parameters.
    pub rent_structure: RentStructure,
}

impl ProtocolParameters {
    /// The network id, derived from the network name.
    pub fn network_id(&self) -> u64 {
        let hash = blake2b_256(self.network_name.as_bytes());
        // Panic: the hash is always 32 bytes.
        u64::from_le_bytes(hash[..8].try_into().unwrap())
    }
}

impl Default for ProtocolParameters {
    fn default() -> Self {
        Self {
            version: 3,
            network_name: "testnet".to_owned(),
            bech32_hrp: "rms".to_owned(),
            token_supply: 1_813_620_509_061_365,
            slots_per_epoch_exponent: 13,
            rent_structure: RentStructure::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn network_id_depends_on_name() {
        let params = ProtocolParameters::default();
        let other = ProtocolParameters {
            network_name: "mainnet".to_owned(),
            ..params.clone()
        };
        assert_eq!(params.network_id(), ProtocolParameters::default().network_id());
        assert_ne!(params.network_id(), other.network_id());
    }
}

// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Storage deposit computation.

use serde::{Deserialize, Serialize};

use super::{feature::Feature, Address, Features, Output, TokenScheme, UnlockCondition};

/// The byte length of an output id, which is weighted as key bytes.
const OUTPUT_ID_LEN: u64 = 34;
/// The byte length of the output metadata a node stores alongside every output.
const METADATA_LEN: u64 = 40;

/// Parameters relevant to byte cost calculations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentStructure {
    /// The cost of a single virtual byte.
    pub v_byte_cost: u32,
    /// The weight of data bytes.
    pub v_byte_factor_data: u8,
    /// The weight of key bytes.
    pub v_byte_factor_key: u8,
}

impl Default for RentStructure {
    fn default() -> Self {
        Self {
            v_byte_cost: 100,
            v_byte_factor_data: 1,
            v_byte_factor_key: 10,
        }
    }
}

/// Computes the storage deposit an output must hold.
pub trait RentCalculator {
    /// The minimum amount of base tokens the output has to hold.
    fn rent_cost(&self, output: &Output) -> u64;
}

impl RentCalculator for RentStructure {
    fn rent_cost(&self, output: &Output) -> u64 {
        // The treasury output does not have an associated byte cost.
        if let Output::Treasury(_) = output {
            return 0;
        }
        let key = self.v_byte_factor_key as u64 * OUTPUT_ID_LEN;
        let data = self.v_byte_factor_data as u64 * (METADATA_LEN + output.packed_len() as u64);
        self.v_byte_cost as u64 * (key + data)
    }
}

/// The length of a value in the binary layout of the ledger.
pub trait PackedLen {
    /// The number of bytes the value occupies.
    fn packed_len(&self) -> usize;
}

impl PackedLen for Address {
    fn packed_len(&self) -> usize {
        Address::LENGTH
    }
}

impl PackedLen for UnlockCondition {
    fn packed_len(&self) -> usize {
        1 + match self {
            Self::Address(c) => c.address.packed_len(),
            Self::StorageDepositReturn(c) => c.return_address.packed_len() + 8,
            Self::Timelock(_) => 4,
            Self::Expiration(c) => c.return_address.packed_len() + 4,
            Self::StateControllerAddress(c) => c.address.packed_len(),
            Self::GovernorAddress(c) => c.address.packed_len(),
            Self::ImmutableAccountAddress(_) => Address::LENGTH,
        }
    }
}

impl PackedLen for Feature {
    fn packed_len(&self) -> usize {
        1 + match self {
            Self::Sender(f) => f.address.packed_len(),
            Self::Issuer(f) => f.address.packed_len(),
            Self::Metadata(f) => 2 + f.data.len(),
            Self::StateMetadata(f) => 2 + f.data.len(),
            Self::Tag(f) => 1 + f.tag.len(),
            Self::NativeToken(_) => 38 + 32,
            Self::BlockIssuer(f) => 4 + 1 + 32 * f.block_issuer_keys.len(),
            Self::Staking(_) => 8 + 8 + 4 + 4,
        }
    }
}

impl PackedLen for Features {
    fn packed_len(&self) -> usize {
        1 + self.iter().map(PackedLen::packed_len).sum::<usize>()
    }
}

impl PackedLen for TokenScheme {
    fn packed_len(&self) -> usize {
        // Kind byte followed by three 256 bit integers.
        1 + 3 * 32
    }
}

fn unlock_conditions_len(conditions: &[UnlockCondition]) -> usize {
    1 + conditions.iter().map(PackedLen::packed_len).sum::<usize>()
}

impl PackedLen for Output {
    fn packed_len(&self) -> usize {
        1 + match self {
            Self::Treasury(_) => 8,
            Self::Basic(o) => 8 + 8 + unlock_conditions_len(&o.unlock_conditions()) + o.features.packed_len(),
            Self::Account(o) => {
                8 + 8
                    + 32
                    + 4
                    + 4
                    + unlock_conditions_len(&o.unlock_conditions())
                    + o.features.packed_len()
                    + o.immutable_features.packed_len()
            }
            Self::Foundry(o) => {
                8 + 4
                    + o.token_scheme.packed_len()
                    + unlock_conditions_len(&o.unlock_conditions())
                    + o.features.packed_len()
                    + o.immutable_features.packed_len()
            }
            Self::Nft(o) => {
                8 + 8
                    + 32
                    + unlock_conditions_len(&o.unlock_conditions())
                    + o.features.packed_len()
                    + o.immutable_features.packed_len()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::utxo::{
        AddressUnlockCondition, BasicOutputBuilder, Ed25519Address, MetadataFeature, TreasuryOutput,
    };

    fn basic(features: Vec<Feature>) -> Output {
        BasicOutputBuilder::new_with_amount(0)
            .add_unlock_condition(AddressUnlockCondition::new(Ed25519Address::new([1; 32])))
            .with_features(features)
            .finish_output()
            .unwrap()
    }

    #[test]
    fn minimal_basic_output_cost() {
        let output = basic(Vec::new());
        assert_eq!(output.packed_len(), 53);
        assert_eq!(RentStructure::default().rent_cost(&output), 100 * (10 * 34 + 40 + 53));
    }

    #[test]
    fn cost_grows_with_data() {
        let rent = RentStructure::default();
        let small = basic(vec![MetadataFeature::new(vec![0; 10]).into()]);
        let large = basic(vec![MetadataFeature::new(vec![0; 110]).into()]);
        assert_eq!(rent.rent_cost(&large) - rent.rent_cost(&small), 100 * 100);
    }

    #[test]
    fn treasury_has_no_cost() {
        let output = Output::Treasury(TreasuryOutput { amount: 5 });
        assert_eq!(RentStructure::default().rent_cost(&output), 0);
    }
}

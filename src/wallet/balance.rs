// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use super::WalletData;
use crate::model::{
    util::stringify,
    utxo::{AccountId, ChainId, FoundryId, NftId, OutputId, RentCalculator, RentStructure, TokenId},
    SlotIndex,
};

/// Base coin held by the wallet.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseCoinBalance {
    /// Everything in unspent outputs.
    #[serde(with = "stringify")]
    pub total: u64,
    /// What a new transaction can spend right now.
    #[serde(with = "stringify")]
    pub available: u64,
    /// What in-flight transactions have reserved.
    #[serde(with = "stringify")]
    pub pending: u64,
}

#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeTokensBalance {
    pub total: U256,
    pub available: U256,
}

/// The balance of a wallet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    #[allow(missing_docs)]
    pub base_coin: BaseCoinBalance,
    /// Mana stored in unspent outputs.
    #[serde(with = "stringify")]
    pub mana: u64,
    /// The storage deposit all unspent outputs hold.
    #[serde(with = "stringify")]
    pub required_storage_deposit: u64,
    #[allow(missing_docs)]
    pub native_tokens: BTreeMap<TokenId, NativeTokensBalance>,
    /// Accounts the wallet controls.
    pub accounts: Vec<AccountId>,
    /// Foundries of the accounts the wallet controls.
    pub foundries: Vec<FoundryId>,
    /// NFTs the wallet holds.
    pub nfts: Vec<NftId>,
    /// Outputs with time or return conditions, mapped to whether the wallet can unlock them now.
    pub potentially_locked_outputs: BTreeMap<OutputId, bool>,
}

impl WalletData {
    /// Computes the balance of the unspent outputs at a slot.
    pub fn balance(&self, slot_index: SlotIndex, rent: &RentStructure) -> Balance {
        let owned = self.owned_addresses();

        let mut balance = Balance::default();
        for (output_id, output) in &self.unspent_outputs {
            let amount = output.amount();
            balance.base_coin.total = balance.base_coin.total.saturating_add(amount);
            balance.mana = balance.mana.saturating_add(output.output.mana());
            balance.required_storage_deposit = balance
                .required_storage_deposit
                .saturating_add(rent.rent_cost(&output.output));
            match output.chain_id() {
                Some(ChainId::Account(account_id)) => balance.accounts.push(account_id),
                Some(ChainId::Foundry(foundry_id)) => balance.foundries.push(foundry_id),
                Some(ChainId::Nft(nft_id)) => balance.nfts.push(nft_id),
                None => (),
            }
            let token = output.output.native_token();
            if let Some(token) = token {
                let entry = balance.native_tokens.entry(token.token_id).or_default();
                entry.total = entry.total.saturating_add(token.amount);
            }

            if self.locked_outputs.contains(output_id) {
                balance.base_coin.pending = balance.base_coin.pending.saturating_add(amount);
                continue;
            }
            let unlockable = !output.output.is_time_locked(slot_index)
                && output
                    .output
                    .unlock_address(slot_index, true)
                    .map_or(false, |address| owned.contains(&address));
            if !output.output.is_trivial_unlock() {
                balance.potentially_locked_outputs.insert(*output_id, unlockable);
            }
            if unlockable {
                let returned = output.output.storage_deposit_return().map_or(0, |sdr| sdr.amount);
                balance.base_coin.available = balance
                    .base_coin
                    .available
                    .saturating_add(amount.saturating_sub(returned));
                if let Some(token) = token {
                    let entry = balance.native_tokens.entry(token.token_id).or_default();
                    entry.available = entry.available.saturating_add(token.amount);
                }
            }
        }
        balance
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        client::Bip44Chain,
        model::{
            ledger::{OutputMetadata, OutputWithMetadata},
            utxo::{
                Address, AddressUnlockCondition, BasicOutputBuilder, Bech32Address, Ed25519Address,
                StorageDepositReturnUnlockCondition, TimelockUnlockCondition, TransactionId,
            },
            BlockId,
        },
    };

    fn insert(data: &mut WalletData, index: u16, builder: BasicOutputBuilder) -> OutputId {
        let output_id = OutputId::new(TransactionId::new([9; 32]), index);
        let address = *data.address.inner();
        data.unspent_outputs.insert(
            output_id,
            OutputWithMetadata {
                output: builder
                    .add_unlock_condition(AddressUnlockCondition::new(address))
                    .finish_output()
                    .unwrap(),
                metadata: OutputMetadata {
                    output_id,
                    block_id: BlockId::null(),
                    booked: SlotIndex(1),
                    spent: None,
                },
            },
        );
        output_id
    }

    #[test]
    fn reserved_and_locked_outputs_are_not_available() {
        let address = Address::from(Ed25519Address::new([1; 32]));
        let mut data = WalletData::new(
            Bip44Chain::new(Bip44Chain::SHIMMER_COIN_TYPE),
            Bech32Address::new("rms", address).unwrap(),
        );
        let sender = Address::from(Ed25519Address::new([2; 32]));

        insert(&mut data, 0, BasicOutputBuilder::new_with_amount(600_000));
        let reserved = insert(&mut data, 1, BasicOutputBuilder::new_with_amount(400_000));
        let locked = insert(
            &mut data,
            2,
            BasicOutputBuilder::new_with_amount(100_000)
                .add_unlock_condition(TimelockUnlockCondition::new(SlotIndex(50))),
        );
        let with_return = insert(
            &mut data,
            3,
            BasicOutputBuilder::new_with_amount(100_000)
                .add_unlock_condition(StorageDepositReturnUnlockCondition::new(sender, 43_300)),
        );
        data.reserve([reserved]);

        let balance = data.balance(SlotIndex(10), &RentStructure::default());
        assert_eq!(
            balance.base_coin,
            BaseCoinBalance {
                total: 1_200_000,
                available: 600_000 + 100_000 - 43_300,
                pending: 400_000,
            }
        );
        assert_eq!(
            balance.potentially_locked_outputs,
            BTreeMap::from([(locked, false), (with_return, true)])
        );

        let later = data.balance(SlotIndex(50), &RentStructure::default());
        assert_eq!(later.base_coin.available, 600_000 + 100_000 + 100_000 - 43_300);
    }

    #[test]
    fn return_above_the_amount_counts_as_nothing_available() {
        let address = Address::from(Ed25519Address::new([1; 32]));
        let mut data = WalletData::new(
            Bip44Chain::new(Bip44Chain::SHIMMER_COIN_TYPE),
            Bech32Address::new("rms", address).unwrap(),
        );
        let sender = Address::from(Ed25519Address::new([2; 32]));
        let output_id = insert(
            &mut data,
            0,
            BasicOutputBuilder::new_with_amount(200_000)
                .add_unlock_condition(StorageDepositReturnUnlockCondition::new(sender, 200_000)),
        );
        // Stored state written before returned amounts were bounded.
        let stored = data.unspent_outputs.get_mut(&output_id).unwrap();
        stored.output = stored.output.clone().with_amount(100_000);

        let balance = data.balance(SlotIndex(10), &RentStructure::default());
        assert_eq!(balance.base_coin.total, 100_000);
        assert_eq!(balance.base_coin.available, 0);
    }
}

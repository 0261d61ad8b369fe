// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    model::{
        ledger::OutputWithMetadata,
        utxo::{AddressUnlockCondition, BasicOutputBuilder, NftOutputBuilder, Output, OutputId},
        SlotIndex,
    },
    wallet::{PreparedTransaction, TransactionOptions, TransactionWithMetadata, Wallet, WalletData},
    Error,
};

/// Which outputs with return or time conditions to claim.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputsToClaim {
    /// Outputs that carry a storage deposit return, where the wallet keeps less than the whole amount.
    MicroTransactions,
    /// Outputs that hold a native token.
    NativeTokens,
    /// NFT outputs.
    Nfts,
    /// Outputs that leave base coin to the wallet once the deposit is returned.
    Amount,
    /// Every claimable output.
    All,
}

/// The amount the owner keeps from an output once an unexpired storage deposit return is paid.
fn kept_amount(output: &Output, slot_index: SlotIndex) -> u64 {
    match output.storage_deposit_return() {
        Some(sdr) if !is_expired(output, slot_index) => output.amount().saturating_sub(sdr.amount),
        _ => output.amount(),
    }
}

fn is_expired(output: &Output, slot_index: SlotIndex) -> bool {
    output.expiration().map_or(false, |e| e.is_expired(slot_index))
}

impl WalletData {
    /// Whether the wallet can claim the output at the given slot: a basic or NFT output with return or time
    /// conditions that is no longer time locked and unlocks to an address the wallet owns.
    fn is_claimable(&self, output: &OutputWithMetadata, slot_index: SlotIndex) -> bool {
        matches!(output.output, Output::Basic(_) | Output::Nft(_))
            && !output.output.is_trivial_unlock()
            && !self.locked_outputs.contains(&output.output_id())
            && !output.output.is_time_locked(slot_index)
            && output
                .output
                .unlock_address(slot_index, false)
                .map_or(false, |address| self.owned_addresses().contains(&address))
    }

    /// The unspent outputs of the given category that the wallet can claim at the given slot.
    pub fn claimable_outputs(&self, outputs_to_claim: OutputsToClaim, slot_index: SlotIndex) -> Vec<OutputId> {
        self.unspent_outputs
            .values()
            .filter(|output| self.is_claimable(output, slot_index))
            .filter(|output| {
                let output = &output.output;
                match outputs_to_claim {
                    OutputsToClaim::MicroTransactions => output.storage_deposit_return().map_or(false, |sdr| {
                        !is_expired(output, slot_index) && sdr.amount != output.amount()
                    }),
                    OutputsToClaim::NativeTokens => output.native_token().is_some(),
                    OutputsToClaim::Nfts => matches!(output, Output::Nft(_)),
                    OutputsToClaim::Amount => kept_amount(output, slot_index) > 0,
                    OutputsToClaim::All => true,
                }
            })
            .map(OutputWithMetadata::output_id)
            .collect()
    }
}

impl Wallet {
    /// The outputs of the given category the wallet can claim now.
    pub async fn claimable_outputs(&self, outputs_to_claim: OutputsToClaim) -> Result<Vec<OutputId>, Error> {
        let node = &self.node;
        let slot_index = self.with_retry_on("fetch the latest slot", move || node.slot_index()).await?;
        Ok(self.data.read().await.claimable_outputs(outputs_to_claim, slot_index))
    }

    /// Prepares a transaction that consumes the given claimable outputs.
    ///
    /// Unexpired storage deposits go back to their return address. Claimed NFTs move to the wallet address with
    /// their storage deposit, and everything else ends up in the remainder.
    #[instrument(skip_all, err, level = "debug")]
    pub async fn prepare_claim_outputs(
        &self,
        output_ids: Vec<OutputId>,
        mut options: TransactionOptions,
    ) -> Result<PreparedTransaction, Error> {
        let protocol = self.protocol_parameters().await?;
        let node = &self.node;
        let slot_index = self.with_retry_on("fetch the latest slot", move || node.slot_index()).await?;

        let mut outputs = Vec::new();
        {
            let data = self.data.read().await;
            let own = *data.address.inner();
            for output_id in &output_ids {
                let claimed = data
                    .unspent_outputs
                    .get(output_id)
                    .filter(|output| data.is_claimable(output, slot_index))
                    .ok_or(Error::OutputNotAvailable(*output_id))?;
                if let Some(sdr) = claimed.output.storage_deposit_return() {
                    if !is_expired(&claimed.output, slot_index) {
                        outputs.push(
                            BasicOutputBuilder::new_with_amount(sdr.amount)
                                .add_unlock_condition(AddressUnlockCondition::new(sdr.return_address))
                                .finish_output()?,
                        );
                    }
                }
                if let Output::Nft(nft) = &claimed.output {
                    outputs.push(
                        NftOutputBuilder::from_output(nft, output_id)
                            .with_minimum_amount(protocol.rent_structure)
                            .add_unlock_condition(AddressUnlockCondition::new(own))
                            .with_features(nft.features.clone())
                            .finish_output()?,
                    );
                }
            }
        }
        debug!("Claiming {} outputs.", output_ids.len());

        options.mandatory_inputs.extend(output_ids);
        self.prepare_transaction(outputs, options).await
    }

    /// Claims the given outputs. Returns once the node accepted the transaction.
    pub async fn claim_outputs(
        &self,
        output_ids: Vec<OutputId>,
        options: TransactionOptions,
    ) -> Result<TransactionWithMetadata, Error> {
        self.prepare_claim_outputs(output_ids, options).await?.send().await
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        client::Bip44Chain,
        model::{
            ledger::OutputMetadata,
            utxo::{
                Address, Bech32Address, Ed25519Address, ExpirationUnlockCondition, NftId,
                StorageDepositReturnUnlockCondition, TimelockUnlockCondition, TransactionId,
            },
            BlockId,
        },
    };

    const OWN: [u8; 32] = [2; 32];
    const SENDER: [u8; 32] = [6; 32];

    fn stored(index: u16, output: Output) -> OutputWithMetadata {
        OutputWithMetadata {
            output,
            metadata: OutputMetadata {
                output_id: OutputId::new(TransactionId::new([1; 32]), index),
                block_id: BlockId::null(),
                booked: SlotIndex(1),
                spent: None,
            },
        }
    }

    fn returnable(amount: u64, returned: u64) -> BasicOutputBuilder {
        BasicOutputBuilder::new_with_amount(amount)
            .add_unlock_condition(AddressUnlockCondition::new(Ed25519Address::new(OWN)))
            .add_unlock_condition(StorageDepositReturnUnlockCondition::new(
                Ed25519Address::new(SENDER),
                returned,
            ))
            .add_unlock_condition(ExpirationUnlockCondition::new(Ed25519Address::new(SENDER), SlotIndex(100)))
    }

    fn wallet_data(outputs: Vec<Output>) -> (WalletData, Vec<OutputId>) {
        let address = Address::from(Ed25519Address::new(OWN));
        let mut data = WalletData::new(
            Bip44Chain::new(Bip44Chain::SHIMMER_COIN_TYPE),
            Bech32Address::new("rms", address).unwrap(),
        );
        let mut ids = Vec::new();
        for (index, output) in outputs.into_iter().enumerate() {
            let output = stored(index as u16, output);
            ids.push(output.output_id());
            data.unspent_outputs.insert(output.output_id(), output);
        }
        (data, ids)
    }

    #[test]
    fn claimable_outputs_are_filtered_by_category() {
        let micro = returnable(150_000, 100_000).finish_output().unwrap();
        let full_return = returnable(100_000, 100_000).finish_output().unwrap();
        let nft = NftOutputBuilder::new_with_amount(100_000, NftId::new([4; 32]))
            .add_unlock_condition(AddressUnlockCondition::new(Ed25519Address::new(OWN)))
            .add_unlock_condition(ExpirationUnlockCondition::new(Ed25519Address::new(SENDER), SlotIndex(100)))
            .finish_output()
            .unwrap();
        let plain = BasicOutputBuilder::new_with_amount(100_000)
            .add_unlock_condition(AddressUnlockCondition::new(Ed25519Address::new(OWN)))
            .finish_output()
            .unwrap();
        let (data, ids) = wallet_data(vec![micro, full_return, nft, plain]);
        let slot = SlotIndex(10);

        assert_eq!(data.claimable_outputs(OutputsToClaim::All, slot), ids[..3].to_vec());
        assert_eq!(data.claimable_outputs(OutputsToClaim::MicroTransactions, slot), vec![ids[0]]);
        assert_eq!(data.claimable_outputs(OutputsToClaim::Amount, slot), vec![ids[0], ids[2]]);
        assert_eq!(data.claimable_outputs(OutputsToClaim::Nfts, slot), vec![ids[2]]);
        assert!(data.claimable_outputs(OutputsToClaim::NativeTokens, slot).is_empty());
    }

    #[test]
    fn expired_and_time_locked_outputs_are_not_claimable() {
        let timelocked = returnable(150_000, 100_000)
            .add_unlock_condition(TimelockUnlockCondition::new(SlotIndex(50)))
            .finish_output()
            .unwrap();
        let expiring = returnable(150_000, 100_000).finish_output().unwrap();
        let (mut data, ids) = wallet_data(vec![timelocked, expiring]);

        assert_eq!(data.claimable_outputs(OutputsToClaim::All, SlotIndex(10)), vec![ids[1]]);
        assert_eq!(data.claimable_outputs(OutputsToClaim::All, SlotIndex(60)), ids);
        // From the expiration on, only the sender can unlock them.
        assert!(data.claimable_outputs(OutputsToClaim::All, SlotIndex(100)).is_empty());

        data.reserve([ids[1]]);
        assert_eq!(data.claimable_outputs(OutputsToClaim::All, SlotIndex(60)), vec![ids[0]]);
    }
}

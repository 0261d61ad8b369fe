// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::network_address;
use crate::{
    model::{
        util::stringify,
        utxo::{
            AddressUnlockCondition, BasicOutput, BasicOutputBuilder, Bech32Address, ExpirationUnlockCondition,
            MetadataFeature, NativeToken, Output, RentCalculator, StorageDepositReturnUnlockCondition, TagFeature,
            TimelockUnlockCondition,
        },
        SlotIndex,
    },
    wallet::{PreparedTransaction, TransactionOptions, TransactionWithMetadata, Wallet},
    Error,
};

/// How many slots a recipient has to claim an output before it returns to the sender.
pub const DEFAULT_EXPIRATION_SLOTS: u32 = 8640;

/// What happens when the amount sent is below the storage deposit of the output.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStrategy {
    /// The sender adds the missing deposit and gets it back through a storage deposit return condition.
    #[default]
    Return,
    /// The sender adds the missing deposit as a gift.
    Gift,
}

/// Describes a basic output to a recipient.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputOptions {
    pub recipient_address: Bech32Address,
    pub amount: u64,
    pub native_token: Option<NativeToken>,
    pub tag: Option<Vec<u8>>,
    pub metadata: Option<Vec<u8>>,
    /// The slot from which on the output returns to the sender.
    pub expiration: Option<SlotIndex>,
    /// The slot until which the output can not be unlocked.
    pub timelock: Option<SlotIndex>,
    /// Where returned deposits go. Defaults to the wallet address.
    pub return_address: Option<Bech32Address>,
    pub return_strategy: ReturnStrategy,
}

impl OutputOptions {
    /// Sends `amount` to `recipient_address` without further conditions.
    pub fn new(recipient_address: Bech32Address, amount: u64) -> Self {
        Self {
            recipient_address,
            amount,
            native_token: None,
            tag: None,
            metadata: None,
            expiration: None,
            timelock: None,
            return_address: None,
            return_strategy: ReturnStrategy::default(),
        }
    }
}

/// An amount of base coin to send.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendParams {
    /// The recipient.
    pub address: Bech32Address,
    /// The amount of base coin.
    #[serde(with = "stringify")]
    pub amount: u64,
    /// Where a storage deposit goes back to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_address: Option<Bech32Address>,
    /// The slot from which on the output returns to the sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<SlotIndex>,
}

impl SendParams {
    #[allow(missing_docs)]
    pub fn new(address: Bech32Address, amount: u64) -> Self {
        Self {
            address,
            amount,
            return_address: None,
            expiration: None,
        }
    }
}

impl From<SendParams> for OutputOptions {
    fn from(params: SendParams) -> Self {
        Self {
            return_address: params.return_address,
            expiration: params.expiration,
            ..Self::new(params.address, params.amount)
        }
    }
}

impl Wallet {
    /// Builds a basic output for a recipient.
    ///
    /// If the amount does not cover the storage deposit, the wallet adds the missing part. With
    /// [`ReturnStrategy::Return`] the recipient has to give it back, and an expiration makes sure the output returns
    /// when it is not claimed.
    pub async fn prepare_output(&self, options: OutputOptions) -> Result<Output, Error> {
        let params = self.protocol_parameters().await?;
        let rent = params.rent_structure;
        let recipient = network_address(&options.recipient_address, &params.bech32_hrp)?;
        let return_address = self
            .address_or_own(options.return_address.as_ref(), &params.bech32_hrp)
            .await?;

        let mut builder = BasicOutputBuilder::new_with_amount(options.amount)
            .add_unlock_condition(AddressUnlockCondition::new(recipient));
        if let Some(native_token) = options.native_token {
            builder = builder.with_native_token(native_token);
        }
        if let Some(tag) = options.tag {
            builder = builder.add_feature(TagFeature::new(tag));
        }
        if let Some(metadata) = options.metadata {
            builder = builder.add_feature(MetadataFeature::new(metadata));
        }
        if let Some(timelock) = options.timelock {
            builder = builder.add_unlock_condition(TimelockUnlockCondition::new(timelock));
        }
        if let Some(expiration) = options.expiration {
            builder = builder.add_unlock_condition(ExpirationUnlockCondition::new(return_address, expiration));
        }

        let output = builder.clone().finish_output()?;
        let minimum = rent.rent_cost(&output);
        if options.amount >= minimum {
            return Ok(output);
        }

        match options.return_strategy {
            ReturnStrategy::Gift => Ok(output.with_amount(minimum)),
            ReturnStrategy::Return => {
                if options.expiration.is_none() {
                    let node = &self.node;
                    let slot_index = self.with_retry_on("fetch the latest slot", move || node.slot_index()).await?;
                    builder = builder.add_unlock_condition(ExpirationUnlockCondition::new(
                        return_address,
                        slot_index + SlotIndex(DEFAULT_EXPIRATION_SLOTS),
                    ));
                }
                let with_return = |amount| {
                    builder
                        .clone()
                        .with_amount(options.amount + amount)
                        .add_unlock_condition(StorageDepositReturnUnlockCondition::new(return_address, amount))
                        .finish_output()
                };
                let minimum = rent.rent_cost(&with_return(0)?);
                let return_minimum = rent.rent_cost(&BasicOutput::minimal(return_address).into());
                let returned = minimum.saturating_sub(options.amount).max(return_minimum);
                Ok(with_return(returned)?)
            }
        }
    }

    /// Prepares a transaction that sends base coin to each recipient.
    #[instrument(skip_all, err, level = "debug")]
    pub async fn prepare_send(
        &self,
        params: Vec<SendParams>,
        options: TransactionOptions,
    ) -> Result<PreparedTransaction, Error> {
        let mut outputs = Vec::with_capacity(params.len());
        for params in params {
            outputs.push(self.prepare_output(params.into()).await?);
        }
        self.prepare_transaction(outputs, options).await
    }

    /// Sends base coin to each recipient. Returns once the node accepted the transaction.
    pub async fn send(
        &self,
        params: Vec<SendParams>,
        options: TransactionOptions,
    ) -> Result<TransactionWithMetadata, Error> {
        self.prepare_send(params, options).await?.send().await
    }

    /// Prepares a transaction that creates the given outputs.
    pub async fn prepare_send_outputs(
        &self,
        outputs: Vec<Output>,
        options: TransactionOptions,
    ) -> Result<PreparedTransaction, Error> {
        self.prepare_transaction(outputs, options).await
    }

    /// Creates the given outputs. Returns once the node accepted the transaction.
    pub async fn send_outputs(
        &self,
        outputs: Vec<Output>,
        options: TransactionOptions,
    ) -> Result<TransactionWithMetadata, Error> {
        self.prepare_send_outputs(outputs, options).await?.send().await
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        client::{Bip44Chain, InMemoryNode, InMemorySecretManager},
        model::utxo::{Address, Ed25519Address, RentStructure},
        storage::MemoryStorage,
    };

    async fn wallet() -> Wallet {
        Wallet::new(
            Arc::new(InMemoryNode::default()),
            Arc::new(InMemorySecretManager::from_seed([3; 32])),
            Arc::new(MemoryStorage::new()),
            Bip44Chain::new(Bip44Chain::SHIMMER_COIN_TYPE),
        )
        .await
        .unwrap()
    }

    fn recipient() -> Bech32Address {
        Bech32Address::new("rms", Ed25519Address::new([8; 32]).into()).unwrap()
    }

    #[tokio::test]
    async fn sufficient_amount_is_sent_as_is() {
        let wallet = wallet().await;
        let output = wallet.prepare_output(OutputOptions::new(recipient(), 400_000)).await.unwrap();
        assert_eq!(output.amount(), 400_000);
        assert_eq!(output.owning_address(), Some(*recipient().inner()));
        assert!(output.storage_deposit_return().is_none());
    }

    #[tokio::test]
    async fn small_amount_is_gifted() {
        let wallet = wallet().await;
        let output = wallet
            .prepare_output(OutputOptions {
                return_strategy: ReturnStrategy::Gift,
                ..OutputOptions::new(recipient(), 1)
            })
            .await
            .unwrap();
        assert_eq!(output.amount(), RentStructure::default().rent_cost(&output));
        assert!(output.storage_deposit_return().is_none());
    }

    #[tokio::test]
    async fn small_amount_is_returned() {
        let wallet = wallet().await;
        let own = *wallet.address().await.inner();
        let output = wallet.prepare_output(OutputOptions::new(recipient(), 1_000)).await.unwrap();
        let sdr = output.storage_deposit_return().unwrap();
        assert_eq!(sdr.return_address, own);
        assert_eq!(output.amount(), 1_000 + sdr.amount);
        assert_eq!(
            output.expiration().map(|e| e.slot_index),
            Some(SlotIndex(1 + DEFAULT_EXPIRATION_SLOTS))
        );
        output.verify_storage_deposit(&RentStructure::default()).unwrap();
    }

    #[tokio::test]
    async fn recipient_must_be_on_the_network() {
        let wallet = wallet().await;
        let foreign = Bech32Address::new("smr", Address::from(Ed25519Address::new([8; 32]))).unwrap();
        let err = wallet.prepare_output(OutputOptions::new(foreign, 400_000)).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }
}

// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::mem;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::network_address;
use crate::{
    model::utxo::{
        AddressUnlockCondition, Bech32Address, IssuerFeature, MetadataFeature, NftId, NftOutputBuilder, Output,
    },
    wallet::{PreparedTransaction, TransactionOptions, TransactionWithMetadata, Wallet},
    Error,
};

/// A new NFT.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MintNftParams {
    /// The owner of the NFT. Defaults to the wallet address.
    pub address: Option<Bech32Address>,
    #[allow(missing_docs)]
    pub metadata: Option<Vec<u8>>,
    #[allow(missing_docs)]
    pub immutable_metadata: Option<Vec<u8>>,
    /// Records the issuer as an immutable feature. The wallet has to unlock an output of the issuer.
    pub issuer: Option<Bech32Address>,
}

/// An NFT to hand over.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendNftParams {
    pub address: Bech32Address,
    pub nft_id: NftId,
}

impl Wallet {
    /// Prepares a transaction that mints NFTs, each holding its storage deposit.
    #[instrument(skip_all, err, level = "debug")]
    pub async fn prepare_mint_nfts(
        &self,
        params: Vec<MintNftParams>,
        options: TransactionOptions,
    ) -> Result<PreparedTransaction, Error> {
        let protocol = self.protocol_parameters().await?;
        let mut outputs = Vec::with_capacity(params.len());
        for params in params {
            let owner = self.address_or_own(params.address.as_ref(), &protocol.bech32_hrp).await?;
            let mut nft = NftOutputBuilder::new_with_minimum_amount(protocol.rent_structure, NftId::null())
                .add_unlock_condition(AddressUnlockCondition::new(owner));
            if let Some(metadata) = params.metadata {
                nft = nft.add_feature(MetadataFeature::new(metadata));
            }
            if let Some(metadata) = params.immutable_metadata {
                nft = nft.add_immutable_feature(MetadataFeature::new(metadata));
            }
            if let Some(issuer) = params.issuer {
                nft = nft.add_immutable_feature(IssuerFeature {
                    address: network_address(&issuer, &protocol.bech32_hrp)?,
                });
            }
            outputs.push(nft.finish_output()?);
        }
        self.prepare_transaction(outputs, options).await
    }

    #[allow(missing_docs)]
    pub async fn mint_nfts(
        &self,
        params: Vec<MintNftParams>,
        options: TransactionOptions,
    ) -> Result<TransactionWithMetadata, Error> {
        self.prepare_mint_nfts(params, options).await?.send().await
    }

    /// Prepares a transaction that moves NFTs to new owners. Mutable features move along.
    #[instrument(skip_all, err, level = "debug")]
    pub async fn prepare_send_nft(
        &self,
        params: Vec<SendNftParams>,
        mut options: TransactionOptions,
    ) -> Result<PreparedTransaction, Error> {
        let protocol = self.protocol_parameters().await?;
        let mut outputs = Vec::with_capacity(params.len());
        for params in params {
            let recipient = network_address(&params.address, &protocol.bech32_hrp)?;
            let current = self.unreserved_chain_output(params.nft_id.into()).await?;
            let nft = match &current.output {
                Output::Nft(nft) => nft,
                _ => return Err(Error::ChainNotFound(params.nft_id.to_string())),
            };
            outputs.push(
                NftOutputBuilder::from_output(nft, &current.output_id())
                    .add_unlock_condition(AddressUnlockCondition::new(recipient))
                    .with_features(nft.features.clone())
                    .finish_output()?,
            );
            options.mandatory_inputs.push(current.output_id());
        }
        self.prepare_transaction(outputs, options).await
    }

    #[allow(missing_docs)]
    pub async fn send_nft(
        &self,
        params: Vec<SendNftParams>,
        options: TransactionOptions,
    ) -> Result<TransactionWithMetadata, Error> {
        self.prepare_send_nft(params, options).await?.send().await
    }

    /// Prepares burning an NFT. Its deposit goes to the remainder.
    pub async fn prepare_burn_nft(
        &self,
        nft_id: NftId,
        mut options: TransactionOptions,
    ) -> Result<PreparedTransaction, Error> {
        let nft = self.unreserved_chain_output(nft_id.into()).await?;
        options.burn = mem::take(&mut options.burn).add_nft(nft_id);
        options.mandatory_inputs.push(nft.output_id());
        self.prepare_transaction(Vec::new(), options).await
    }

    #[allow(missing_docs)]
    pub async fn burn_nft(&self, nft_id: NftId, options: TransactionOptions) -> Result<TransactionWithMetadata, Error> {
        self.prepare_burn_nft(nft_id, options).await?.send().await
    }
}

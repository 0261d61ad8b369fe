// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::mem;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    model::utxo::{
        AccountId, AccountOutputBuilder, Bech32Address, GovernorAddressUnlockCondition, MetadataFeature,
        StateControllerAddressUnlockCondition,
    },
    wallet::{PreparedTransaction, TransactionOptions, TransactionWithMetadata, Wallet},
    Error,
};

/// A new account output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateAccountParams {
    /// Controls the state and the governance of the account. Defaults to the wallet address.
    pub address: Option<Bech32Address>,
    #[allow(missing_docs)]
    pub metadata: Option<Vec<u8>>,
    #[allow(missing_docs)]
    pub immutable_metadata: Option<Vec<u8>>,
}

impl Wallet {
    /// Prepares a transaction that creates an account holding its storage deposit.
    #[instrument(skip(self, options), err, level = "debug")]
    pub async fn prepare_create_account(
        &self,
        params: CreateAccountParams,
        options: TransactionOptions,
    ) -> Result<PreparedTransaction, Error> {
        let protocol = self.protocol_parameters().await?;
        let controller = self.address_or_own(params.address.as_ref(), &protocol.bech32_hrp).await?;

        let mut account = AccountOutputBuilder::new_with_minimum_amount(protocol.rent_structure, AccountId::null())
            .add_unlock_condition(StateControllerAddressUnlockCondition::new(controller))
            .add_unlock_condition(GovernorAddressUnlockCondition::new(controller));
        if let Some(metadata) = params.metadata {
            account = account.add_feature(MetadataFeature::new(metadata));
        }
        if let Some(metadata) = params.immutable_metadata {
            account = account.add_immutable_feature(MetadataFeature::new(metadata));
        }
        self.prepare_transaction(vec![account.finish_output()?], options).await
    }

    #[allow(missing_docs)]
    pub async fn create_account(
        &self,
        params: CreateAccountParams,
        options: TransactionOptions,
    ) -> Result<TransactionWithMetadata, Error> {
        self.prepare_create_account(params, options).await?.send().await
    }

    /// Prepares destroying an account. Its deposit goes to the remainder.
    pub async fn prepare_destroy_account(
        &self,
        account_id: AccountId,
        mut options: TransactionOptions,
    ) -> Result<PreparedTransaction, Error> {
        let account = self.unreserved_chain_output(account_id.into()).await?;
        options.burn = mem::take(&mut options.burn).add_account(account_id);
        options.mandatory_inputs.push(account.output_id());
        self.prepare_transaction(Vec::new(), options).await
    }

    #[allow(missing_docs)]
    pub async fn destroy_account(
        &self,
        account_id: AccountId,
        options: TransactionOptions,
    ) -> Result<TransactionWithMetadata, Error> {
        self.prepare_destroy_account(account_id, options).await?.send().await
    }
}

// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::mem;

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    model::{
        ledger::OutputWithMetadata,
        utxo::{
            AccountAddress, AccountId, AccountOutputBuilder, AddressUnlockCondition, BasicOutputBuilder,
            Bech32Address, ChainId, FoundryId, FoundryOutputBuilder, ImmutableAccountAddressUnlockCondition,
            MetadataFeature, NativeToken, Output, SimpleTokenScheme, TokenId, TokenScheme,
        },
        ProtocolParameters, SlotIndex, ValidationError,
    },
    wallet::{operations::OutputOptions, PreparedTransaction, TransactionOptions, TransactionWithMetadata, Wallet},
    Error,
};

/// An amount of a native token to send.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendNativeTokenParams {
    pub address: Bech32Address,
    pub token_id: TokenId,
    pub amount: U256,
    /// Where the storage deposit of the new output goes back to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_address: Option<Bech32Address>,
    /// The slot from which on the output returns to the sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<SlotIndex>,
}

/// A new foundry and its native token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNativeTokenParams {
    /// The account that controls the foundry. Defaults to the first account of the wallet.
    #[serde(default)]
    pub account_id: Option<AccountId>,
    /// The amount minted right away.
    pub circulating_supply: U256,
    #[allow(missing_docs)]
    pub maximum_supply: U256,
    /// Immutable metadata of the foundry.
    #[serde(default)]
    pub foundry_metadata: Option<Vec<u8>>,
}

/// A prepared foundry creation together with the id of the token it creates.
#[derive(Debug)]
pub struct PreparedCreateNativeToken {
    #[allow(missing_docs)]
    pub token_id: TokenId,
    #[allow(missing_docs)]
    pub transaction: PreparedTransaction,
}

/// Starts a state transition of an account. Also returns the current foundry counter.
fn account_transition(
    account: &OutputWithMetadata,
    account_id: AccountId,
) -> Result<(AccountOutputBuilder, u32), ValidationError> {
    match &account.output {
        Output::Account(output) => Ok((
            AccountOutputBuilder::from_output(output, &account.output_id()).with_state_index(output.state_index + 1),
            output.foundry_counter,
        )),
        _ => Err(ValidationError::InvalidChainTransition {
            chain: ChainId::from(account_id).to_string(),
            reason: "not an account output",
        }),
    }
}

fn next_account_state(account: &OutputWithMetadata, account_id: AccountId) -> Result<Output, ValidationError> {
    account_transition(account, account_id)?.0.finish_output()
}

fn foundry_state(foundry: &OutputWithMetadata) -> Result<(FoundryOutputBuilder, SimpleTokenScheme), Error> {
    match &foundry.output {
        Output::Foundry(output) => Ok((
            FoundryOutputBuilder::from_output(output),
            *output.token_scheme.as_simple(),
        )),
        _ => Err(Error::ChainNotFound(foundry.output_id().to_string())),
    }
}

impl Wallet {
    /// Prepares a transaction that sends native tokens, each in its own output.
    pub async fn prepare_send_native_tokens(
        &self,
        params: Vec<SendNativeTokenParams>,
        options: TransactionOptions,
    ) -> Result<PreparedTransaction, Error> {
        let mut outputs = Vec::with_capacity(params.len());
        for params in params {
            let options = OutputOptions {
                native_token: Some(NativeToken::new(params.token_id, params.amount)?),
                return_address: params.return_address,
                expiration: params.expiration,
                ..OutputOptions::new(params.address, 0)
            };
            outputs.push(self.prepare_output(options).await?);
        }
        self.prepare_transaction(outputs, options).await
    }

    #[allow(missing_docs)]
    pub async fn send_native_tokens(
        &self,
        params: Vec<SendNativeTokenParams>,
        options: TransactionOptions,
    ) -> Result<TransactionWithMetadata, Error> {
        self.prepare_send_native_tokens(params, options).await?.send().await
    }

    /// Prepares the creation of a foundry by an account of the wallet.
    ///
    /// The account bumps its foundry counter and the new foundry takes the counter as its serial number. The
    /// circulating supply is minted into a basic output owned by the wallet.
    #[instrument(skip(self, options), err, level = "debug")]
    pub async fn prepare_create_native_token(
        &self,
        params: CreateNativeTokenParams,
        mut options: TransactionOptions,
    ) -> Result<PreparedCreateNativeToken, Error> {
        let protocol = self.protocol_parameters().await?;
        let (account_id, account) = self.controlled_account(params.account_id).await?;
        let (next_account, foundry_counter) = account_transition(&account, account_id)?;
        let serial_number = foundry_counter + 1;

        let scheme = TokenScheme::Simple(SimpleTokenScheme::new(
            params.circulating_supply,
            U256::zero(),
            params.maximum_supply,
        )?);
        let foundry_id = FoundryId::build(&AccountAddress(account_id), serial_number, scheme.kind());
        let token_id = TokenId::from(foundry_id);

        let mut foundry = FoundryOutputBuilder::new_with_minimum_amount(protocol.rent_structure, serial_number, scheme)
            .add_unlock_condition(ImmutableAccountAddressUnlockCondition::new(AccountAddress(account_id)));
        if let Some(metadata) = params.foundry_metadata {
            foundry = foundry.add_immutable_feature(MetadataFeature::new(metadata));
        }

        let mut outputs = vec![
            next_account.with_foundry_counter(serial_number).finish_output()?,
            foundry.finish_output()?,
        ];
        if !params.circulating_supply.is_zero() {
            outputs.push(self.token_output(&protocol, token_id, params.circulating_supply).await?);
        }
        options.mandatory_inputs.push(account.output_id());

        debug!("Creating native token {token_id} in foundry {serial_number} of account {account_id}.");
        let transaction = self.prepare_transaction(outputs, options).await?;
        Ok(PreparedCreateNativeToken { token_id, transaction })
    }

    /// Creates a foundry and returns the id of its token once the transaction was accepted.
    pub async fn create_native_token(
        &self,
        params: CreateNativeTokenParams,
        options: TransactionOptions,
    ) -> Result<(TokenId, TransactionWithMetadata), Error> {
        let prepared = self.prepare_create_native_token(params, options).await?;
        Ok((prepared.token_id, prepared.transaction.send().await?))
    }

    /// Prepares minting more of a native token into a basic output owned by the wallet.
    #[instrument(skip(self, options), err, level = "debug")]
    pub async fn prepare_mint_native_token(
        &self,
        token_id: TokenId,
        amount: U256,
        mut options: TransactionOptions,
    ) -> Result<PreparedTransaction, Error> {
        let protocol = self.protocol_parameters().await?;
        let (foundry_builder, scheme, account_id) = self.foundry_and_account(token_id, &mut options).await?;
        let account = self.unreserved_chain_output(account_id.into()).await?;

        let outputs = vec![
            next_account_state(&account, account_id)?,
            foundry_builder
                .with_token_scheme(TokenScheme::Simple(scheme.mint(amount)?))
                .finish_output()?,
            self.token_output(&protocol, token_id, amount).await?,
        ];
        options.mandatory_inputs.push(account.output_id());
        self.prepare_transaction(outputs, options).await
    }

    #[allow(missing_docs)]
    pub async fn mint_native_token(
        &self,
        token_id: TokenId,
        amount: U256,
        options: TransactionOptions,
    ) -> Result<TransactionWithMetadata, Error> {
        self.prepare_mint_native_token(token_id, amount, options).await?.send().await
    }

    /// Prepares melting tokens the wallet holds in their foundry, which lowers the circulating supply.
    #[instrument(skip(self, options), err, level = "debug")]
    pub async fn prepare_melt_native_token(
        &self,
        token_id: TokenId,
        amount: U256,
        mut options: TransactionOptions,
    ) -> Result<PreparedTransaction, Error> {
        let (foundry_builder, scheme, account_id) = self.foundry_and_account(token_id, &mut options).await?;
        let account = self.unreserved_chain_output(account_id.into()).await?;

        let outputs = vec![
            next_account_state(&account, account_id)?,
            foundry_builder
                .with_token_scheme(TokenScheme::Simple(scheme.melt(amount)?))
                .finish_output()?,
        ];
        options.mandatory_inputs.push(account.output_id());
        self.prepare_transaction(outputs, options).await
    }

    #[allow(missing_docs)]
    pub async fn melt_native_token(
        &self,
        token_id: TokenId,
        amount: U256,
        options: TransactionOptions,
    ) -> Result<TransactionWithMetadata, Error> {
        self.prepare_melt_native_token(token_id, amount, options).await?.send().await
    }

    /// Prepares destroying a foundry. Its whole supply must have been melted.
    #[instrument(skip(self, options), err, level = "debug")]
    pub async fn prepare_destroy_foundry(
        &self,
        foundry_id: FoundryId,
        mut options: TransactionOptions,
    ) -> Result<PreparedTransaction, Error> {
        let foundry = self.unreserved_chain_output(foundry_id.into()).await?;
        let (_, scheme) = foundry_state(&foundry)?;
        let circulating = scheme.circulating_supply();
        if !circulating.is_zero() {
            return Err(ValidationError::NonZeroCirculatingSupply {
                foundry_id,
                circulating,
            }
            .into());
        }
        let account_id = *foundry_id.account_address().account_id();
        let account = self.unreserved_chain_output(account_id.into()).await?;

        options.burn = mem::take(&mut options.burn).add_foundry(foundry_id);
        options.mandatory_inputs.extend([account.output_id(), foundry.output_id()]);
        let outputs = vec![next_account_state(&account, account_id)?];
        self.prepare_transaction(outputs, options).await
    }

    #[allow(missing_docs)]
    pub async fn destroy_foundry(
        &self,
        foundry_id: FoundryId,
        options: TransactionOptions,
    ) -> Result<TransactionWithMetadata, Error> {
        self.prepare_destroy_foundry(foundry_id, options).await?.send().await
    }

    /// Prepares burning native tokens without touching their foundry.
    pub async fn prepare_burn_native_token(
        &self,
        token_id: TokenId,
        amount: U256,
        mut options: TransactionOptions,
    ) -> Result<PreparedTransaction, Error> {
        options.burn = mem::take(&mut options.burn).add_native_token(token_id, amount);
        self.prepare_transaction(Vec::new(), options).await
    }

    #[allow(missing_docs)]
    pub async fn burn_native_token(
        &self,
        token_id: TokenId,
        amount: U256,
        options: TransactionOptions,
    ) -> Result<TransactionWithMetadata, Error> {
        self.prepare_burn_native_token(token_id, amount, options).await?.send().await
    }

    /// Looks up the foundry of a token, adds it to the mandatory inputs and returns it with its controlling account.
    async fn foundry_and_account(
        &self,
        token_id: TokenId,
        options: &mut TransactionOptions,
    ) -> Result<(FoundryOutputBuilder, SimpleTokenScheme, AccountId), Error> {
        let foundry_id = FoundryId::from(token_id);
        let foundry = self.unreserved_chain_output(foundry_id.into()).await?;
        let (builder, scheme) = foundry_state(&foundry)?;
        options.mandatory_inputs.push(foundry.output_id());
        Ok((builder, scheme, *foundry_id.account_address().account_id()))
    }

    /// A basic output of the wallet holding only its storage deposit and the given tokens.
    async fn token_output(
        &self,
        protocol: &ProtocolParameters,
        token_id: TokenId,
        amount: U256,
    ) -> Result<Output, Error> {
        let address = *self.data.read().await.address.inner();
        Ok(BasicOutputBuilder::new_with_minimum_amount(protocol.rent_structure)
            .add_unlock_condition(AddressUnlockCondition::new(address))
            .with_native_token(NativeToken::new(token_id, amount)?)
            .finish_output()?)
    }
}

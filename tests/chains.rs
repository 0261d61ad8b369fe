// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use primitive_types::U256;
use stardust_wallet::{
    client::InMemoryNode,
    model::utxo::{FoundryId, TokenId},
    wallet::{
        operations::{CreateAccountParams, CreateNativeTokenParams, MintNftParams, SendNftParams},
        Balance, SyncOptions, TransactionOptions, TransactionState, Wallet,
    },
    ErrorKind,
};

use self::common::{foreign_address, funded_wallet};

const OWNED_CHAINS: SyncOptions = SyncOptions { sync_owned_chains: true };

fn token_total(balance: &Balance, token_id: &TokenId) -> U256 {
    balance.native_tokens.get(token_id).map_or(U256::zero(), |b| b.total)
}

/// A funded wallet that controls one account.
async fn wallet_with_account() -> (Arc<InMemoryNode>, Wallet) {
    let (node, wallet) = funded_wallet(&[1_000_000]).await;
    let transaction = wallet
        .prepare_create_account(CreateAccountParams::default(), TransactionOptions::default())
        .await
        .unwrap()
        .finish()
        .await
        .unwrap();
    assert_eq!(transaction.state, TransactionState::Included);
    (node, wallet)
}

async fn create_token(wallet: &Wallet, circulating_supply: u64) -> TokenId {
    let prepared = wallet
        .prepare_create_native_token(
            CreateNativeTokenParams {
                account_id: None,
                circulating_supply: circulating_supply.into(),
                maximum_supply: 1_000.into(),
                foundry_metadata: Some(b"a token".to_vec()),
            },
            TransactionOptions::default(),
        )
        .await
        .unwrap();
    let token_id = prepared.token_id;
    prepared.transaction.finish().await.unwrap();
    token_id
}

#[tokio::test(start_paused = true)]
async fn account_is_created_and_synced() {
    let (_node, wallet) = wallet_with_account().await;
    let balance = wallet.balance().await.unwrap();
    assert_eq!(balance.accounts.len(), 1);
    assert_eq!(balance.base_coin.total, 1_000_000);

    let synced = wallet.sync(OWNED_CHAINS).await.unwrap();
    assert_eq!(synced.accounts, balance.accounts);
    assert_eq!(synced.base_coin, balance.base_coin);
}

#[tokio::test(start_paused = true)]
async fn native_token_lifecycle() {
    let (_node, wallet) = wallet_with_account().await;
    let token_id = create_token(&wallet, 100).await;
    let foundry_id = FoundryId::from(token_id);

    let balance = wallet.sync(OWNED_CHAINS).await.unwrap();
    assert_eq!(balance.foundries, vec![foundry_id]);
    assert_eq!(token_total(&balance, &token_id), U256::from(100));

    let err = wallet
        .prepare_destroy_foundry(foundry_id, TransactionOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    wallet
        .prepare_mint_native_token(token_id, 50.into(), TransactionOptions::default())
        .await
        .unwrap()
        .finish()
        .await
        .unwrap();
    assert_eq!(token_total(&wallet.balance().await.unwrap(), &token_id), U256::from(150));

    wallet
        .prepare_melt_native_token(token_id, 150.into(), TransactionOptions::default())
        .await
        .unwrap()
        .finish()
        .await
        .unwrap();
    assert_eq!(token_total(&wallet.balance().await.unwrap(), &token_id), U256::zero());

    wallet
        .prepare_destroy_foundry(foundry_id, TransactionOptions::default())
        .await
        .unwrap()
        .finish()
        .await
        .unwrap();
    let balance = wallet.sync(OWNED_CHAINS).await.unwrap();
    assert!(balance.foundries.is_empty());
    assert_eq!(balance.accounts.len(), 1);
    assert_eq!(balance.base_coin.total, 1_000_000);
}

#[tokio::test(start_paused = true)]
async fn burned_tokens_stay_in_circulation() {
    let (_node, wallet) = wallet_with_account().await;
    let token_id = create_token(&wallet, 100).await;

    wallet
        .prepare_burn_native_token(token_id, U256::from(30), TransactionOptions::default())
        .await
        .unwrap()
        .finish()
        .await
        .unwrap();
    let balance = wallet.sync(OWNED_CHAINS).await.unwrap();
    assert_eq!(token_total(&balance, &token_id), U256::from(70));

    let err = wallet
        .prepare_destroy_foundry(FoundryId::from(token_id), TransactionOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test(start_paused = true)]
async fn creating_a_token_needs_an_account() {
    let (_node, wallet) = funded_wallet(&[1_000_000]).await;
    let err = wallet
        .prepare_create_native_token(
            CreateNativeTokenParams {
                account_id: None,
                circulating_supply: 10.into(),
                maximum_supply: 10.into(),
                foundry_metadata: None,
            },
            TransactionOptions::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChainNotFound);
}

#[tokio::test(start_paused = true)]
async fn nft_is_minted_and_sent() {
    let (_node, wallet) = funded_wallet(&[1_000_000]).await;
    wallet
        .prepare_mint_nfts(
            vec![MintNftParams {
                immutable_metadata: Some(b"artwork".to_vec()),
                ..Default::default()
            }],
            TransactionOptions::default(),
        )
        .await
        .unwrap()
        .finish()
        .await
        .unwrap();
    let balance = wallet.sync(SyncOptions::default()).await.unwrap();
    assert_eq!(balance.nfts.len(), 1);

    let transaction = wallet
        .prepare_send_nft(
            vec![SendNftParams {
                address: foreign_address(9),
                nft_id: balance.nfts[0],
            }],
            TransactionOptions::default(),
        )
        .await
        .unwrap()
        .finish()
        .await
        .unwrap();
    assert_eq!(transaction.state, TransactionState::Included);

    let balance = wallet.sync(SyncOptions::default()).await.unwrap();
    assert!(balance.nfts.is_empty());
    assert!(balance.base_coin.total < 1_000_000);
}

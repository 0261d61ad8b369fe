// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::{sync::Arc, time::Duration};

use stardust_wallet::{
    client::{Bip44Chain, InMemoryNode, InMemorySecretManager},
    model::utxo::{Bech32Address, Ed25519Address},
    storage::{MemoryStorage, WalletStorage},
    wallet::{ReissueOptions, SyncOptions, Wallet},
};

pub const SEED: [u8; 32] = [42; 32];

#[allow(unused)]
pub fn chain() -> Bip44Chain {
    Bip44Chain::new(Bip44Chain::SHIMMER_COIN_TYPE)
}

/// An address no test wallet controls.
#[allow(unused)]
pub fn foreign_address(byte: u8) -> Bech32Address {
    Bech32Address::new("rms", Ed25519Address::new([byte; 32]).into()).unwrap()
}

/// Quick inclusion checks, so that tests with paused time stay short.
#[allow(unused)]
pub fn fast_reissue(max_attempts: u32) -> ReissueOptions {
    ReissueOptions {
        interval: Duration::from_millis(10),
        max_attempts,
        cancel: None,
        deadline: None,
    }
}

#[allow(unused)]
pub async fn wallet_with_storage(node: &Arc<InMemoryNode>, storage: Arc<dyn WalletStorage>) -> Wallet {
    Wallet::new(
        node.clone(),
        Arc::new(InMemorySecretManager::from_seed(SEED)),
        storage,
        chain(),
    )
    .await
    .unwrap()
    .with_reissue(fast_reissue(10))
}

/// A synced wallet with its own key on an existing ledger, funded with one output.
#[allow(unused)]
pub async fn second_wallet(node: &Arc<InMemoryNode>, seed: [u8; 32], amount: u64) -> Wallet {
    let wallet = Wallet::new(
        node.clone(),
        Arc::new(InMemorySecretManager::from_seed(seed)),
        Arc::new(MemoryStorage::new()),
        chain(),
    )
    .await
    .unwrap()
    .with_reissue(fast_reissue(10));
    node.fund(*wallet.address().await.inner(), amount).await;
    wallet.sync(SyncOptions::default()).await.unwrap();
    wallet
}

/// A wallet on a fresh in-memory ledger that holds one output per given amount, already synced.
#[allow(unused)]
pub async fn funded_wallet(amounts: &[u64]) -> (Arc<InMemoryNode>, Wallet) {
    let node = Arc::new(InMemoryNode::default());
    let wallet = wallet_with_storage(&node, Arc::new(MemoryStorage::new())).await;
    let address = *wallet.address().await.inner();
    for amount in amounts {
        node.fund(address, *amount).await;
    }
    wallet.sync(SyncOptions::default()).await.unwrap();
    (node, wallet)
}

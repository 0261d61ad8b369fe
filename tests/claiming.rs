// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

mod common;

use pretty_assertions::assert_eq;
use stardust_wallet::{
    wallet::{
        operations::{OutputsToClaim, SendParams},
        SyncOptions, TransactionOptions, TransactionState,
    },
    ErrorKind,
};

use self::common::{funded_wallet, second_wallet};

#[tokio::test(start_paused = true)]
async fn claiming_a_micro_transaction_returns_the_deposit() {
    let (node, sender) = funded_wallet(&[1_000_000]).await;
    let recipient = second_wallet(&node, [7; 32], 500_000).await;

    sender
        .prepare_send(
            vec![SendParams::new(recipient.address().await, 1_000)],
            TransactionOptions::default(),
        )
        .await
        .unwrap()
        .finish()
        .await
        .unwrap();

    let balance = recipient.sync(SyncOptions::default()).await.unwrap();
    let data = recipient.data().await;
    let (output_id, output) = data
        .unspent_outputs
        .iter()
        .find(|(_, output)| output.output.storage_deposit_return().is_some())
        .unwrap();
    let returned = output.output.storage_deposit_return().unwrap().amount;
    assert_eq!(output.output.amount(), 1_000 + returned);
    assert_eq!(balance.potentially_locked_outputs.get(output_id), Some(&true));
    // Only what the recipient keeps after the return counts as available.
    assert_eq!(balance.base_coin.available, 501_000);
    assert_eq!(balance.base_coin.total, 501_000 + returned);
    assert_eq!(
        recipient.claimable_outputs(OutputsToClaim::MicroTransactions).await.unwrap(),
        vec![*output_id]
    );

    let transaction = recipient
        .prepare_claim_outputs(vec![*output_id], TransactionOptions::default())
        .await
        .unwrap()
        .finish()
        .await
        .unwrap();
    assert_eq!(transaction.state, TransactionState::Included);

    let balance = recipient.sync(SyncOptions::default()).await.unwrap();
    assert_eq!(balance.base_coin.available, 501_000);
    assert!(balance.potentially_locked_outputs.is_empty());
    assert!(recipient
        .claimable_outputs(OutputsToClaim::All)
        .await
        .unwrap()
        .is_empty());

    let balance = sender.sync(SyncOptions::default()).await.unwrap();
    assert_eq!(balance.base_coin.available, 999_000);
}

#[tokio::test(start_paused = true)]
async fn only_claimable_outputs_can_be_claimed() {
    let (_node, wallet) = funded_wallet(&[1_000_000]).await;
    let output_id = *wallet.data().await.unspent_outputs.keys().next().unwrap();

    let error = wallet
        .prepare_claim_outputs(vec![output_id], TransactionOptions::default())
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::OutputNotAvailable);
    assert!(wallet.data().await.locked_outputs.is_empty());
}

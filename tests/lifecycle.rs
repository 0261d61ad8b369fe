// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

mod common;

use std::{collections::BTreeSet, time::Duration};

use pretty_assertions::assert_eq;
use stardust_wallet::{
    model::utxo::OutputId,
    transaction::InputSigningData,
    wallet::{
        operations::SendParams, BaseCoinBalance, CancellationHandle, ReissueOptions, SyncOptions, TransactionOptions,
        TransactionState,
    },
    Error, ErrorKind,
};

use self::common::{fast_reissue, foreign_address, funded_wallet};

fn send(amount: u64) -> Vec<SendParams> {
    vec![SendParams::new(foreign_address(7), amount)]
}

#[tokio::test(start_paused = true)]
async fn send_leaves_the_remainder_available() {
    let (_node, wallet) = funded_wallet(&[1_000_000]).await;

    let prepared = wallet
        .prepare_send(send(400_000), TransactionOptions::default())
        .await
        .unwrap();
    assert_eq!(prepared.state(), TransactionState::Prepared);
    assert_eq!(prepared.data().remainders.len(), 1);
    assert_eq!(prepared.data().remainders[0].output.amount(), 600_000);

    let balance = wallet.balance().await.unwrap();
    assert_eq!(
        balance.base_coin,
        BaseCoinBalance {
            total: 1_000_000,
            available: 0,
            pending: 1_000_000,
        }
    );

    let transaction = prepared.finish().await.unwrap();
    assert_eq!(transaction.state, TransactionState::Included);
    assert!(transaction.block_id.is_some());

    let balance = wallet.sync(SyncOptions::default()).await.unwrap();
    assert_eq!(
        balance.base_coin,
        BaseCoinBalance {
            total: 600_000,
            available: 600_000,
            pending: 0,
        }
    );
    assert!(wallet.data().await.pending_transactions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrent_prepares_pick_disjoint_inputs() {
    let (_node, wallet) = funded_wallet(&[500_000, 500_000]).await;

    let (first, second) = tokio::join!(
        wallet.prepare_send(send(300_000), TransactionOptions::default()),
        wallet.prepare_send(send(300_000), TransactionOptions::default()),
    );
    let (first, second) = (first.unwrap(), second.unwrap());
    let inputs = |data: &stardust_wallet::transaction::PreparedTransactionData| {
        data.inputs
            .iter()
            .map(InputSigningData::output_id)
            .collect::<BTreeSet<OutputId>>()
    };
    assert_eq!(inputs(first.data()).len(), 1);
    assert_eq!(inputs(second.data()).len(), 1);
    assert!(inputs(first.data()).is_disjoint(&inputs(second.data())));

    let third = wallet.prepare_send(send(300_000), TransactionOptions::default()).await;
    assert_eq!(third.unwrap_err().kind(), ErrorKind::InsufficientFunds);

    first.abandon().await;
    let fourth = wallet
        .prepare_send(send(300_000), TransactionOptions::default())
        .await
        .unwrap();
    assert!(inputs(fourth.data()).is_disjoint(&inputs(second.data())));
}

#[tokio::test(start_paused = true)]
async fn concurrent_prepares_that_each_need_most_funds_conflict() {
    let (_node, wallet) = funded_wallet(&[400_000, 400_000, 400_000]).await;

    let (first, second) = tokio::join!(
        wallet.prepare_send(send(700_000), TransactionOptions::default()),
        wallet.prepare_send(send(700_000), TransactionOptions::default()),
    );
    let (prepared, failed) = match (first, second) {
        (Ok(prepared), Err(error)) | (Err(error), Ok(prepared)) => (prepared, error),
        (first, second) => panic!("expected exactly one prepared transaction, got {first:?} and {second:?}"),
    };
    assert_eq!(failed.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(prepared.data().inputs.len(), 2);
    assert_eq!(wallet.data().await.locked_outputs.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn abandoning_releases_the_inputs() {
    let (_node, wallet) = funded_wallet(&[1_000_000]).await;
    let prepared = wallet
        .prepare_send(send(400_000), TransactionOptions::default())
        .await
        .unwrap();
    assert_eq!(wallet.data().await.locked_outputs.len(), 1);

    prepared.abandon().await;
    assert!(wallet.data().await.locked_outputs.is_empty());
    assert_eq!(wallet.balance().await.unwrap().base_coin.available, 1_000_000);
}

#[tokio::test(start_paused = true)]
async fn waiting_gives_up_after_max_attempts() {
    let (node, wallet) = funded_wallet(&[1_000_000]).await;
    node.set_confirmation_polls(None).await;
    let wallet = wallet.with_reissue(fast_reissue(3));

    let prepared = wallet
        .prepare_send(send(400_000), TransactionOptions::default())
        .await
        .unwrap();
    let transaction_id = prepared.transaction_id();
    let err = prepared.finish().await.unwrap_err();

    assert!(matches!(err, Error::NotIncluded { attempts: 3, .. }), "{err}");
    assert_eq!(node.metadata_requests().await, 3);
    assert_eq!(
        wallet.transaction(&transaction_id).await.unwrap().state,
        TransactionState::Expired
    );
}

#[tokio::test(start_paused = true)]
async fn waiting_can_be_cancelled() {
    let (node, wallet) = funded_wallet(&[1_000_000]).await;
    node.set_confirmation_polls(None).await;

    let transaction = wallet
        .prepare_send(send(400_000), TransactionOptions::default())
        .await
        .unwrap()
        .send()
        .await
        .unwrap();
    assert_eq!(transaction.state, TransactionState::Submitted);

    let handle = CancellationHandle::new();
    handle.cancel();
    let err = wallet
        .reissue_until_included(
            &transaction.transaction_id(),
            ReissueOptions::default().with_cancellation(handle),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(node.metadata_requests().await, 0);

    let err = wallet
        .reissue_until_included(
            &transaction.transaction_id(),
            ReissueOptions::default().with_timeout(Duration::from_secs(2)),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(
        wallet.transaction(&transaction.transaction_id()).await.unwrap().state,
        TransactionState::Submitted
    );

    node.include_pending().await;
    wallet
        .reissue_until_included(&transaction.transaction_id(), fast_reissue(3))
        .await
        .unwrap();
    assert_eq!(
        wallet.transaction(&transaction.transaction_id()).await.unwrap().state,
        TransactionState::Included
    );
}

#[tokio::test(start_paused = true)]
async fn dropped_blocks_are_reissued() {
    let (node, wallet) = funded_wallet(&[1_000_000]).await;
    node.drop_next_blocks(1).await;

    let transaction = wallet
        .prepare_send(send(400_000), TransactionOptions::default())
        .await
        .unwrap()
        .finish()
        .await
        .unwrap();

    let blocks = node.submitted_blocks().await;
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[1].parents, vec![blocks[0].id()]);
    assert_eq!(transaction.block_id, Some(blocks[1].id()));
    assert_eq!(transaction.state, TransactionState::Included);
}

#[tokio::test(start_paused = true)]
async fn unreachable_node_is_retried() {
    let (node, wallet) = funded_wallet(&[1_000_000]).await;

    node.fail_next_requests(2).await;
    let balance = wallet.sync(SyncOptions::default()).await.unwrap();
    assert_eq!(balance.base_coin.available, 1_000_000);

    node.set_reachable(false).await;
    let err = wallet.sync(SyncOptions::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}

#[tokio::test(start_paused = true)]
async fn conflicting_transaction_is_resolved_by_sync() {
    let (node, wallet) = funded_wallet(&[1_000_000]).await;
    node.set_confirmation_polls(None).await;

    let first = wallet
        .prepare_send(send(400_000), TransactionOptions::default())
        .await
        .unwrap();
    let data = first.data().clone();
    let first = first.send().await.unwrap();

    // A second transaction spending the same input.
    let mut other = data;
    other.transaction.outputs[0] = other.transaction.outputs[0].clone().with_amount(300_000);
    let last = other.transaction.outputs.len() - 1;
    other.transaction.outputs[last] = other.transaction.outputs[last].clone().with_amount(700_000);
    let other = wallet.sign_and_submit_transaction(other, None).await.unwrap();
    node.include_pending().await;

    wallet.sync(SyncOptions::default()).await.unwrap();
    let first = wallet.transaction(&first.transaction_id()).await.unwrap();
    let other = wallet.transaction(&other.transaction_id()).await.unwrap();
    let mut states = [first.state, other.state];
    states.sort_by_key(|state| state.as_str());
    assert_eq!(states, [TransactionState::Conflicting, TransactionState::Included]);
    assert!(wallet.data().await.locked_outputs.is_empty());
}

// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Simulates a wallet sending funds on an in-memory ledger.

mod cli;

use std::sync::Arc;

use clap::Parser;
use stardust_wallet::{
    client::{InMemoryNode, InMemorySecretManager},
    config::WalletConfig,
    storage::MemoryStorage,
    wallet::{operations::SendParams, SyncOptions, TransactionOptions, Wallet},
};
use tracing::{error, info};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

use self::cli::ClArgs;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    set_up_logging();

    std::panic::set_hook(Box::new(|p| {
        error!("{}", p);
    }));

    let cl_args = ClArgs::parse();
    let config = match cl_args.get_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    tokio::select! {
        res = simulate(&config, cl_args.fund, cl_args.amount) => {
            if let Err(e) = res {
                error!("{}", e);
            }
        }
        _ = shutdown_signal_listener() => {
            info!("Simulation interrupted.");
        }
    }
}

fn set_up_logging() {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}

async fn simulate(config: &WalletConfig, fund: u64, amount: u64) -> Result<(), stardust_wallet::Error> {
    let node = Arc::new(InMemoryNode::default());
    let sender = Wallet::from_config(config, node.clone(), Arc::new(InMemorySecretManager::generate())).await?;
    let recipient = Wallet::new(
        node.clone(),
        Arc::new(InMemorySecretManager::generate()),
        Arc::new(MemoryStorage::new()),
        config.wallet.chain(),
    )
    .await?;

    node.fund(*sender.address().await.inner(), fund).await;
    let balance = sender.sync(SyncOptions::default()).await?;
    info!("Sender {} holds {}.", sender.address().await, balance.base_coin.available);

    let transaction = sender
        .prepare_send(
            vec![SendParams::new(recipient.address().await, amount)],
            TransactionOptions::default(),
        )
        .await?
        .finish()
        .await?;
    info!(
        "Transaction {} is {} in block {:?}.",
        transaction.transaction_id(),
        transaction.state,
        transaction.block_id
    );

    let sender_balance = sender.sync(SyncOptions::default()).await?;
    let recipient_balance = recipient.sync(SyncOptions::default()).await?;
    info!(
        "Sender has {} available, recipient has {} available.",
        sender_balance.base_coin.available, recipient_balance.base_coin.available
    );
    Ok(())
}

async fn shutdown_signal_listener() {
    #[cfg(unix)]
    {
        use futures::future;
        use tokio::signal::unix::{signal, Signal, SignalKind};

        // Panic: none of the possible error conditions should happen.
        let mut signals = vec![SignalKind::interrupt(), SignalKind::terminate()]
            .iter()
            .map(|kind| signal(*kind).unwrap())
            .collect::<Vec<Signal>>();
        let signal_futs = signals.iter_mut().map(|signal| Box::pin(signal.recv()));
        let (signal_event, _, _) = future::select_all(signal_futs).await;

        if signal_event.is_none() {
            panic!("Shutdown signal stream failed, channel may have closed.");
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            panic!("Failed to intercept CTRL-C: {:?}.", e);
        }
    }
}

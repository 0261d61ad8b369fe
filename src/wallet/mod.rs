// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The wallet: tracks the outputs of one address, prepares transactions from them, signs and submits them, and
//! waits until the ledger includes them.

mod balance;
mod cancel;
pub mod lifecycle;
pub mod operations;
mod prepare;
mod submit;
mod sync;

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

pub use self::{
    balance::{Balance, BaseCoinBalance, NativeTokensBalance},
    cancel::CancellationHandle,
    lifecycle::{TransactionState, TransactionWithMetadata},
    prepare::{PreparedTransaction, TransactionOptions},
    submit::{ReissueOptions, RetryOptions},
    sync::SyncOptions,
};
use crate::{
    client::{Bip44Chain, Node, SecretManager},
    config::WalletConfig,
    model::{
        ledger::OutputWithMetadata,
        utxo::{Address, Bech32Address, ChainId, OutputId, TransactionId},
    },
    storage::{JsonFileStorage, MemoryStorage, WalletStorage},
    transaction::InputSigningData,
    Error,
};

/// The persisted state of a wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletData {
    /// The derivation path of the wallet key.
    pub chain: Bip44Chain,
    /// The address of the wallet key.
    pub address: Bech32Address,
    /// The unspent outputs the wallet controls, as of the last sync.
    #[serde(default)]
    pub unspent_outputs: BTreeMap<OutputId, OutputWithMetadata>,
    /// Outputs reserved by a prepared or in-flight transaction.
    #[serde(default)]
    pub locked_outputs: BTreeSet<OutputId>,
    /// Every transaction the wallet submitted.
    #[serde(default)]
    pub transactions: BTreeMap<TransactionId, TransactionWithMetadata>,
    /// Submitted transactions whose inclusion is not decided yet.
    #[serde(default)]
    pub pending_transactions: BTreeSet<TransactionId>,
}

impl WalletData {
    /// Creates the state of a wallet that has not seen any output yet.
    pub fn new(chain: Bip44Chain, address: Bech32Address) -> Self {
        Self {
            chain,
            address,
            unspent_outputs: BTreeMap::new(),
            locked_outputs: BTreeSet::new(),
            transactions: BTreeMap::new(),
            pending_transactions: BTreeSet::new(),
        }
    }

    /// The unspent outputs that no transaction has reserved, ready to be consumed.
    pub fn available_inputs(&self) -> Vec<InputSigningData> {
        self.unspent_outputs
            .values()
            .filter(|output| !self.locked_outputs.contains(&output.output_id()))
            .map(|output| self.signing_data(output.clone()))
            .collect()
    }

    /// Pairs an output with the key that signs for it.
    pub fn signing_data(&self, output: OutputWithMetadata) -> InputSigningData {
        let chain = output
            .owning_address()
            .filter(Address::is_ed25519)
            .map(|_| self.chain);
        InputSigningData { output, chain }
    }

    /// The wallet address and the addresses of the chains among the unspent outputs.
    pub fn owned_addresses(&self) -> BTreeSet<Address> {
        let mut owned = BTreeSet::from([*self.address.inner()]);
        owned.extend(
            self.unspent_outputs
                .values()
                .filter_map(|output| output.chain_id())
                .filter_map(|chain_id| chain_id.to_address()),
        );
        owned
    }

    /// Finds the unspent output of a chain.
    pub fn chain_output(&self, chain_id: ChainId) -> Option<&OutputWithMetadata> {
        self.unspent_outputs
            .values()
            .find(|output| output.chain_id() == Some(chain_id))
    }

    /// Marks outputs as reserved.
    pub fn reserve(&mut self, output_ids: impl IntoIterator<Item = OutputId>) {
        self.locked_outputs.extend(output_ids);
    }

    /// Releases a reservation.
    pub fn release<'a>(&mut self, output_ids: impl IntoIterator<Item = &'a OutputId>) {
        for output_id in output_ids {
            self.locked_outputs.remove(output_id);
        }
    }
}

/// A wallet bound to one key. Clones share the same state.
#[derive(Clone)]
pub struct Wallet {
    node: Arc<dyn Node>,
    secret_manager: Arc<dyn SecretManager>,
    storage: Arc<dyn WalletStorage>,
    data: Arc<RwLock<WalletData>>,
    retry: RetryOptions,
    reissue: ReissueOptions,
}

impl core::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Wallet")
            .field("retry", &self.retry)
            .field("reissue", &self.reissue)
            .finish_non_exhaustive()
    }
}

impl Wallet {
    /// Opens the wallet stored in `storage`, or creates a new one for the key at `chain`.
    pub async fn new(
        node: Arc<dyn Node>,
        secret_manager: Arc<dyn SecretManager>,
        storage: Arc<dyn WalletStorage>,
        chain: Bip44Chain,
    ) -> Result<Self, Error> {
        Self::open(node, secret_manager, storage, chain, RetryOptions::default()).await
    }

    /// Opens a wallet as described by the config.
    pub async fn from_config(
        config: &WalletConfig,
        node: Arc<dyn Node>,
        secret_manager: Arc<dyn SecretManager>,
    ) -> Result<Self, Error> {
        let storage: Arc<dyn WalletStorage> = match &config.wallet.storage_path {
            Some(path) => Arc::new(JsonFileStorage::new(path)),
            None => Arc::new(MemoryStorage::new()),
        };
        Ok(
            Self::open(node, secret_manager, storage, config.wallet.chain(), (&config.retry).into())
                .await?
                .with_reissue((&config.reissue).into()),
        )
    }

    async fn open(
        node: Arc<dyn Node>,
        secret_manager: Arc<dyn SecretManager>,
        storage: Arc<dyn WalletStorage>,
        chain: Bip44Chain,
        retry: RetryOptions,
    ) -> Result<Self, Error> {
        let data = match storage.load().await? {
            Some(data) => {
                if data.chain != chain {
                    info!("Stored wallet uses {} instead of {chain}, keeping the stored key.", data.chain);
                }
                debug!("Loaded wallet {} from storage.", data.address);
                data
            }
            None => {
                let params = submit::with_retry(&retry, "fetch protocol parameters", || node.protocol_parameters())
                    .await?;
                let address = secret_manager.address(chain).await?;
                let address = Bech32Address::new(params.bech32_hrp, address.into())?;
                info!("Created wallet {address} at {chain}.");
                WalletData::new(chain, address)
            }
        };
        Ok(Self {
            node,
            secret_manager,
            storage,
            data: Arc::new(RwLock::new(data)),
            retry,
            reissue: ReissueOptions::default(),
        })
    }

    /// Sets how node requests are retried when the node can not be reached.
    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    /// Sets how [`PreparedTransaction::finish`] waits for inclusion.
    pub fn with_reissue(mut self, reissue: ReissueOptions) -> Self {
        self.reissue = reissue;
        self
    }

    /// The wallet address.
    pub async fn address(&self) -> Bech32Address {
        self.data.read().await.address.clone()
    }

    /// A snapshot of the wallet state.
    pub async fn data(&self) -> WalletData {
        self.data.read().await.clone()
    }

    /// A transaction the wallet submitted.
    pub async fn transaction(&self, transaction_id: &TransactionId) -> Option<TransactionWithMetadata> {
        self.data.read().await.transactions.get(transaction_id).cloned()
    }

    /// Writes the wallet state to storage.
    pub async fn persist(&self) -> Result<(), Error> {
        let data = self.data.read().await;
        self.storage.save(&data).await?;
        Ok(())
    }

    /// The balance as of the last sync, evaluated at the current slot.
    pub async fn balance(&self) -> Result<Balance, Error> {
        let node = &self.node;
        let params = self.with_retry_on("fetch protocol parameters", move || node.protocol_parameters()).await?;
        let slot_index = self.with_retry_on("fetch the latest slot", move || node.slot_index()).await?;
        let data = self.data.read().await;
        Ok(data.balance(slot_index, &params.rent_structure))
    }
}

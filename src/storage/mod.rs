// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Local persistence of the wallet state.

mod file;
mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use self::{file::JsonFileStorage, memory::MemoryStorage};
use crate::wallet::WalletData;

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to (de)serialize wallet data: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Stores the wallet state between runs.
#[async_trait]
pub trait WalletStorage: Send + Sync {
    /// Loads the stored wallet state, if there is one.
    async fn load(&self) -> Result<Option<WalletData>, StorageError>;

    /// Replaces the stored wallet state.
    async fn save(&self, data: &WalletData) -> Result<(), StorageError>;
}

// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{StorageError, WalletStorage};
use crate::wallet::WalletData;

/// Keeps the serialized wallet state in memory. The state goes through the same serialization as the file storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Mutex<Option<String>>,
}

impl MemoryStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStorage for MemoryStorage {
    async fn load(&self) -> Result<Option<WalletData>, StorageError> {
        Ok(match self.data.lock().await.as_deref() {
            Some(json) => Some(serde_json::from_str(json)?),
            None => None,
        })
    }

    async fn save(&self, data: &WalletData) -> Result<(), StorageError> {
        let json = serde_json::to_string(data)?;
        *self.data.lock().await = Some(json);
        Ok(())
    }
}

// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Wallet configuration, read from TOML.

#![allow(missing_docs)]

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::client::Bip44Chain;

pub const DEFAULT_COIN_TYPE: u32 = Bip44Chain::SHIMMER_COIN_TYPE;
pub const DEFAULT_NODE_URL: &str = "http://localhost:14265";
pub const DEFAULT_REISSUE_INTERVAL: &str = "500ms";
pub const DEFAULT_REISSUE_MAX_ATTEMPTS: u32 = 80;
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_INITIAL_BACKOFF: &str = "200ms";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config at '{0}': {1}")]
    FileRead(String, std::io::Error),
    #[error("toml deserialization failed: {0}")]
    TomlDeserialization(toml::de::Error),
}

/// Configuration of a wallet.
#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WalletConfig {
    pub wallet: AccountConfig,
    pub node: NodeConfig,
    pub reissue: ReissueConfig,
    pub retry: RetryConfig,
}

impl WalletConfig {
    /// Reads the config from the file located at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        fs::read_to_string(&path)
            .map_err(|e| ConfigError::FileRead(path.as_ref().display().to_string(), e))
            .and_then(|contents| toml::from_str::<Self>(&contents).map_err(ConfigError::TomlDeserialization))
    }
}

/// The keys and local state of the wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccountConfig {
    /// The BIP-44 coin type.
    pub coin_type: u32,
    /// The BIP-44 account index.
    pub account_index: u32,
    /// The BIP-44 address index of the wallet address.
    pub address_index: u32,
    /// Where the wallet state is stored. It is kept in memory if omitted.
    pub storage_path: Option<PathBuf>,
}

impl AccountConfig {
    /// The derivation path of the wallet address.
    pub fn chain(&self) -> Bip44Chain {
        Bip44Chain::new(self.coin_type)
            .with_account(self.account_index)
            .with_address_index(self.address_index)
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            coin_type: DEFAULT_COIN_TYPE,
            account_index: 0,
            address_index: 0,
            storage_path: None,
        }
    }
}

/// The node the wallet talks to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    /// The url of the node API.
    pub url: Url,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Unwrap: the default url is valid.
            url: DEFAULT_NODE_URL.parse().unwrap(),
        }
    }
}

/// How long to wait for a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReissueConfig {
    /// The time between two inclusion checks.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// The number of inclusion checks before giving up.
    pub max_attempts: u32,
}

impl Default for ReissueConfig {
    fn default() -> Self {
        Self {
            // Unwrap: the default interval is valid.
            interval: DEFAULT_REISSUE_INTERVAL.parse::<humantime::Duration>().unwrap().into(),
            max_attempts: DEFAULT_REISSUE_MAX_ATTEMPTS,
        }
    }
}

/// Retries of node requests that fail because the node can not be reached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// The number of attempts, including the first one.
    pub max_attempts: u32,
    /// The wait before the first retry. It doubles with every further retry.
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            // Unwrap: the default backoff is valid.
            initial_backoff: DEFAULT_RETRY_INITIAL_BACKOFF.parse::<humantime::Duration>().unwrap().into(),
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn config_file_conformity() -> Result<(), ConfigError> {
        let config = WalletConfig::from_file(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/bin/wallet-sim/config.template.toml"
        ))?;
        assert_eq!(config, WalletConfig::default());

        Ok(())
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config = toml::from_str::<WalletConfig>(
            r#"
            [reissue]
            interval = "2s"
            "#,
        )
        .unwrap();
        assert_eq!(config.reissue.interval, Duration::from_secs(2));
        assert_eq!(config.reissue.max_attempts, DEFAULT_REISSUE_MAX_ATTEMPTS);
        assert_eq!(config.wallet.chain(), Bip44Chain::new(Bip44Chain::SHIMMER_COIN_TYPE));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(toml::from_str::<WalletConfig>("[node]\nport = 1").is_err());
    }
}

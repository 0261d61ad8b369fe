// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use stardust_wallet::config::{ConfigError, WalletConfig};

/// Runs a wallet against an in-memory node: funds it, sends to a second wallet and waits for inclusion.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct ClArgs {
    /// The location of the configuration file.
    #[clap(short, long, env = "CONFIG_PATH")]
    pub config: Option<String>,
    /// Where the wallet state is stored.
    #[clap(long = "wallet.storage-path", env = "WALLET_STORAGE_PATH")]
    pub storage_path: Option<String>,
    /// The BIP-44 account index of the wallet keys.
    #[clap(long = "wallet.account-index")]
    pub account_index: Option<u32>,
    /// The number of inclusion checks before a transaction expires.
    #[clap(long = "reissue.max-attempts", env = "REISSUE_MAX_ATTEMPTS")]
    pub reissue_max_attempts: Option<u32>,
    /// The base coin the sending wallet starts with.
    #[clap(long, default_value = "1000000")]
    pub fund: u64,
    /// The base coin sent to the second wallet.
    #[clap(long, default_value = "400000")]
    pub amount: u64,
}

impl ClArgs {
    /// Get a config file with CLI args applied.
    pub fn get_config(&self) -> Result<WalletConfig, ConfigError> {
        let mut config = self
            .config
            .as_ref()
            .map(WalletConfig::from_file)
            .transpose()?
            .unwrap_or_default();

        if let Some(path) = &self.storage_path {
            config.wallet.storage_path.replace(path.into());
        }
        if let Some(account_index) = self.account_index {
            config.wallet.account_index = account_index;
        }
        if let Some(max_attempts) = self.reissue_max_attempts {
            config.reissue.max_attempts = max_attempts;
        }

        Ok(config)
    }
}

// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::model::{
    util::blake2b_256,
    utxo::{Address, Ed25519Address},
    Signature,
};

#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SecretError {
    #[error("no key for input {0}")]
    MissingChain(String),
    #[error("signature does not belong to {0:?}")]
    AddressMismatch(Address),
    #[error("secret manager unavailable: {0}")]
    Unavailable(String),
}

/// A BIP-44 derivation path `m/44'/coin_type'/account'/change'/address_index'`.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bip44Chain {
    pub coin_type: u32,
    pub account: u32,
    pub change: u32,
    pub address_index: u32,
}

#[allow(missing_docs)]
impl Bip44Chain {
    pub const IOTA_COIN_TYPE: u32 = 4218;
    pub const SHIMMER_COIN_TYPE: u32 = 4219;

    pub fn new(coin_type: u32) -> Self {
        Self {
            coin_type,
            account: 0,
            change: 0,
            address_index: 0,
        }
    }

    pub fn with_account(mut self, account: u32) -> Self {
        self.account = account;
        self
    }

    pub fn with_change(mut self, change: u32) -> Self {
        self.change = change;
        self
    }

    pub fn with_address_index(mut self, address_index: u32) -> Self {
        self.address_index = address_index;
        self
    }

    fn to_bytes(self) -> [u8; 16] {
        let mut bytes = [0; 16];
        bytes[..4].copy_from_slice(&self.coin_type.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.account.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.change.to_le_bytes());
        bytes[12..].copy_from_slice(&self.address_index.to_le_bytes());
        bytes
    }
}

impl core::fmt::Display for Bip44Chain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "m/44'/{}'/{}'/{}'/{}'",
            self.coin_type, self.account, self.change, self.address_index
        )
    }
}

/// Holds the secrets of a wallet and signs on its behalf.
#[async_trait]
pub trait SecretManager: Send + Sync {
    /// The Ed25519 public key at a derivation path.
    async fn public_key(&self, chain: Bip44Chain) -> Result<[u8; 32], SecretError>;

    /// Signs a message with the key at a derivation path.
    async fn sign_ed25519(&self, message: &[u8], chain: Bip44Chain) -> Result<Signature, SecretError>;

    /// The address of the key at a derivation path.
    async fn address(&self, chain: Bip44Chain) -> Result<Ed25519Address, SecretError> {
        Ok(Ed25519Address::from_public_key(&self.public_key(chain).await?))
    }
}

/// Derives keys from a seed that is kept in memory. Meant for development and tests, not for real funds.
pub struct InMemorySecretManager {
    seed: Zeroizing<[u8; 32]>,
}

impl core::fmt::Debug for InMemorySecretManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemorySecretManager").finish_non_exhaustive()
    }
}

impl InMemorySecretManager {
    /// Uses a known seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            seed: Zeroizing::new(seed),
        }
    }

    /// Generates a random seed.
    pub fn generate() -> Self {
        Self::from_seed(rand::random())
    }

    fn signing_key(&self, chain: Bip44Chain) -> SigningKey {
        let mut material = Zeroizing::new([0; 48]);
        material[..32].copy_from_slice(&self.seed[..]);
        material[32..].copy_from_slice(&chain.to_bytes());
        let secret = Zeroizing::new(blake2b_256(&material[..]));
        SigningKey::from_bytes(&secret)
    }
}

#[async_trait]
impl SecretManager for InMemorySecretManager {
    async fn public_key(&self, chain: Bip44Chain) -> Result<[u8; 32], SecretError> {
        Ok(self.signing_key(chain).verifying_key().to_bytes())
    }

    async fn sign_ed25519(&self, message: &[u8], chain: Bip44Chain) -> Result<Signature, SecretError> {
        let key = self.signing_key(chain);
        Ok(Signature::Ed25519 {
            public_key: key.verifying_key().to_bytes(),
            signature: key.sign(message).to_bytes(),
        })
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn keys_are_deterministic_per_chain() {
        let secret_manager = InMemorySecretManager::from_seed([9; 32]);
        let chain = Bip44Chain::new(Bip44Chain::SHIMMER_COIN_TYPE);
        let first = secret_manager.address(chain).await.unwrap();
        assert_eq!(first, secret_manager.address(chain).await.unwrap());
        let other = secret_manager.address(chain.with_address_index(1)).await.unwrap();
        assert_ne!(first, other);
        assert_eq!(chain.to_string(), "m/44'/4219'/0'/0'/0'");
    }

    #[tokio::test]
    async fn signatures_verify() {
        let secret_manager = InMemorySecretManager::generate();
        let chain = Bip44Chain::new(Bip44Chain::IOTA_COIN_TYPE);
        let signature = secret_manager.sign_ed25519(b"message", chain).await.unwrap();
        assert!(signature.verify(b"message"));
        assert!(!signature.verify(b"other"));
        assert_eq!(
            Ed25519Address::from_public_key(signature.public_key()),
            secret_manager.address(chain).await.unwrap()
        );
    }
}

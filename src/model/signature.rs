// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Module containing the [`Signature`] type.

use ed25519_dalek::Verifier;
use serde::{Deserialize, Serialize};

use super::util::bytify;

/// Represents a signature used to unlock an output.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Signature {
    /// An [`Ed25519`](https://en.wikipedia.org/wiki/EdDSA) signature.
    Ed25519 {
        /// The public key as bytes.
        #[serde(with = "bytify")]
        public_key: [u8; 32],
        /// The signature as bytes.
        #[serde(with = "bytify")]
        signature: [u8; 64],
    },
}

impl Signature {
    /// The length of an Ed25519 public key.
    pub const PUBLIC_KEY_LENGTH: usize = ed25519_dalek::PUBLIC_KEY_LENGTH;
    /// The length of an Ed25519 signature.
    pub const SIGNATURE_LENGTH: usize = ed25519_dalek::SIGNATURE_LENGTH;

    /// The public key that produced the signature.
    pub fn public_key(&self) -> &[u8; Self::PUBLIC_KEY_LENGTH] {
        match self {
            Self::Ed25519 { public_key, .. } => public_key,
        }
    }

    /// Checks the signature against a message.
    pub fn verify(&self, message: &[u8]) -> bool {
        match self {
            Self::Ed25519 { public_key, signature } => ed25519_dalek::VerifyingKey::from_bytes(public_key)
                .map(|key| {
                    key.verify(message, &ed25519_dalek::Signature::from_bytes(signature))
                        .is_ok()
                })
                .unwrap_or(false),
        }
    }
}

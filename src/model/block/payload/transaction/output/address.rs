// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Module containing the [`Address`] types.

use core::{fmt, str::FromStr};

use bech32::{FromBase32, ToBase32, Variant};
use serde::{Deserialize, Serialize};

use super::{AccountId, NftId};
use crate::model::{
    codec::TaggedUnion,
    util::{blake2b_256, decode_hex_array, impl_id},
    ValidationError,
};

impl_id!(
    /// The BLAKE2b-256 hash of an Ed25519 public key.
    pub Ed25519Address,
    32
);

impl Ed25519Address {
    /// The [`Address`] kind of an [`Ed25519Address`].
    pub const KIND: u8 = 0;

    /// Derives the address of an Ed25519 public key.
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        Self(blake2b_256(public_key))
    }
}

/// An address controlled by an account output.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::From)]
#[serde(transparent)]
pub struct AccountAddress(pub AccountId);

impl AccountAddress {
    /// The [`Address`] kind of an [`AccountAddress`].
    pub const KIND: u8 = 8;

    /// The controlling account.
    pub fn account_id(&self) -> &AccountId {
        &self.0
    }
}

/// An address controlled by an NFT output.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::From)]
#[serde(transparent)]
pub struct NftAddress(pub NftId);

impl NftAddress {
    /// The [`Address`] kind of an [`NftAddress`].
    pub const KIND: u8 = 16;

    /// The controlling NFT.
    pub fn nft_id(&self) -> &NftId {
        &self.0
    }
}

/// The different [`Address`] types supported by the network.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::From)]
#[serde(rename_all = "snake_case")]
pub enum Address {
    /// An Ed25519 address.
    Ed25519(Ed25519Address),
    /// An account address.
    #[serde(alias = "alias")]
    Account(AccountAddress),
    /// An NFT address.
    Nft(NftAddress),
}

impl Address {
    /// The length of the binary representation.
    pub const LENGTH: usize = 33;

    /// Returns the address kind.
    pub fn kind(&self) -> u8 {
        match self {
            Self::Ed25519(_) => Ed25519Address::KIND,
            Self::Account(_) => AccountAddress::KIND,
            Self::Nft(_) => NftAddress::KIND,
        }
    }

    /// Whether the address is controlled by a signature.
    pub fn is_ed25519(&self) -> bool {
        matches!(self, Self::Ed25519(_))
    }

    /// The binary representation `kind ‖ payload`.
    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        let mut bytes = [0; Self::LENGTH];
        bytes[0] = self.kind();
        bytes[1..].copy_from_slice(match self {
            Self::Ed25519(a) => a.as_ref(),
            Self::Account(a) => a.0.as_ref(),
            Self::Nft(a) => a.0.as_ref(),
        });
        bytes
    }

    /// Parses the binary representation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ValidationError> {
        if bytes.len() != Self::LENGTH {
            return Err(ValidationError::InvalidLength {
                expected: Self::LENGTH,
                found: bytes.len(),
            });
        }
        let mut payload = [0; 32];
        payload.copy_from_slice(&bytes[1..]);
        Ok(match bytes[0] {
            Ed25519Address::KIND => Self::Ed25519(Ed25519Address(payload)),
            AccountAddress::KIND => Self::Account(AccountAddress(AccountId(payload))),
            NftAddress::KIND => Self::Nft(NftAddress(NftId(payload))),
            kind => return Err(ValidationError::InvalidAddressKind(kind)),
        })
    }

    /// Converts the address to its `0x`-prefixed hex representation.
    pub fn to_hex(&self) -> String {
        prefix_hex::encode(&self.to_bytes()[..])
    }

    /// Parses the `0x`-prefixed hex representation.
    pub fn from_hex(hex: &str) -> Result<Self, ValidationError> {
        Self::from_bytes(&decode_hex_array::<33>(hex)?)
    }

    /// Encodes the address with the human readable part of a network.
    pub fn to_bech32(self, hrp: impl Into<String>) -> Result<Bech32Address, ValidationError> {
        Bech32Address::new(hrp, self)
    }
}

impl FromStr for Address {
    type Err = ValidationError;

    /// Accepts both the bech32 and the `0x`-prefixed hex form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("0x") {
            Self::from_hex(s)
        } else {
            Ok(s.parse::<Bech32Address>()?.inner)
        }
    }
}

impl From<AccountId> for Address {
    fn from(value: AccountId) -> Self {
        Self::Account(AccountAddress(value))
    }
}

impl From<NftId> for Address {
    fn from(value: NftId) -> Self {
        Self::Nft(NftAddress(value))
    }
}

impl TaggedUnion for Address {
    const FAMILY: &'static str = "address";
    const KINDS: &'static [&'static str] = &["ed25519", "account", "alias", "nft"];

    fn tag_of(value: &serde_json::Value) -> Option<&str> {
        value.as_object().and_then(|o| o.keys().next()).map(String::as_str)
    }
}

/// An [`Address`] together with the human readable part of its network. This is the canonical text form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Bech32Address {
    hrp: String,
    inner: Address,
}

impl Bech32Address {
    /// Creates a new bech32 address, validating the human readable part.
    pub fn new(hrp: impl Into<String>, inner: Address) -> Result<Self, ValidationError> {
        let hrp = hrp.into();
        bech32::encode(&hrp, inner.to_bytes().to_base32(), Variant::Bech32)
            .map_err(|e| ValidationError::InvalidBech32(e.to_string()))?;
        Ok(Self { hrp, inner })
    }

    /// The human readable part.
    pub fn hrp(&self) -> &str {
        &self.hrp
    }

    /// The wrapped address.
    pub fn inner(&self) -> &Address {
        &self.inner
    }

    /// Parses a bech32 address and checks that it belongs to the expected network.
    pub fn parse_for_network(s: &str, expected_hrp: &str) -> Result<Self, ValidationError> {
        let address = s.parse::<Self>()?;
        if address.hrp != expected_hrp {
            return Err(ValidationError::Bech32HrpMismatch {
                expected: expected_hrp.to_owned(),
                found: address.hrp,
            });
        }
        Ok(address)
    }
}

impl fmt::Display for Bech32Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Unwrap: Cannot fail as the human readable part is validated on construction.
        let encoded = bech32::encode(&self.hrp, self.inner.to_bytes().to_base32(), Variant::Bech32).unwrap();
        f.write_str(&encoded)
    }
}

impl FromStr for Bech32Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hrp, data, variant) = bech32::decode(s).map_err(|e| ValidationError::InvalidBech32(e.to_string()))?;
        if variant != Variant::Bech32 {
            return Err(ValidationError::InvalidBech32(format!("{s}: unexpected bech32m variant")));
        }
        let bytes = Vec::<u8>::from_base32(&data).map_err(|e| ValidationError::InvalidBech32(e.to_string()))?;
        Ok(Self {
            hrp,
            inner: Address::from_bytes(&bytes)?,
        })
    }
}

impl TryFrom<String> for Bech32Address {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Bech32Address> for String {
    fn from(value: Bech32Address) -> Self {
        value.to_string()
    }
}

impl From<Bech32Address> for Address {
    fn from(value: Bech32Address) -> Self {
        value.inner
    }
}

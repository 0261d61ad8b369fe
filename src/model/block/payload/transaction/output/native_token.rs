// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Module containing [`NativeToken`] types.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use super::FoundryId;
use crate::model::{util::impl_id, ValidationError};

impl_id!(
    /// The identifier of a native token. It has the same bytes as the id of the foundry that controls its supply.
    pub TokenId,
    38
);

impl From<FoundryId> for TokenId {
    fn from(value: FoundryId) -> Self {
        Self(value.0)
    }
}

impl From<TokenId> for FoundryId {
    fn from(value: TokenId) -> Self {
        Self(value.0)
    }
}

/// Represents a native token.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeToken {
    /// The corresponding token id.
    pub token_id: TokenId,
    /// The amount of native tokens.
    pub amount: U256,
}

impl NativeToken {
    /// The [`Feature`](super::Feature) kind of a [`NativeToken`].
    pub const KIND: u8 = 5;

    /// Creates a new native token. The amount must not be zero.
    pub fn new(token_id: TokenId, amount: U256) -> Result<Self, ValidationError> {
        let token = Self { token_id, amount };
        token.verify()?;
        Ok(token)
    }

    pub(crate) fn verify(&self) -> Result<(), ValidationError> {
        if self.amount.is_zero() {
            return Err(ValidationError::ZeroNativeTokenAmount);
        }
        Ok(())
    }
}

/// The supply control rules of a native token.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TokenScheme {
    /// The simple token scheme.
    Simple(SimpleTokenScheme),
}

impl TokenScheme {
    /// Returns the protocol kind of the token scheme.
    pub fn kind(&self) -> u8 {
        match self {
            Self::Simple(_) => SimpleTokenScheme::KIND,
        }
    }

    /// Returns the simple token scheme.
    pub fn as_simple(&self) -> &SimpleTokenScheme {
        match self {
            Self::Simple(scheme) => scheme,
        }
    }

    /// Checks a transition of the scheme between two foundry states.
    pub fn verify_transition(&self, next: &Self) -> Result<(), ValidationError> {
        match (self, next) {
            (Self::Simple(current), Self::Simple(next)) => current.verify_transition(next),
        }
    }
}

/// A token scheme with a fixed maximum supply.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SimpleTokenSchemeRepr")]
pub struct SimpleTokenScheme {
    minted_tokens: U256,
    melted_tokens: U256,
    maximum_supply: U256,
}

#[derive(Deserialize)]
struct SimpleTokenSchemeRepr {
    minted_tokens: U256,
    melted_tokens: U256,
    maximum_supply: U256,
}

impl TryFrom<SimpleTokenSchemeRepr> for SimpleTokenScheme {
    type Error = ValidationError;

    fn try_from(value: SimpleTokenSchemeRepr) -> Result<Self, Self::Error> {
        Self::new(value.minted_tokens, value.melted_tokens, value.maximum_supply)
    }
}

impl SimpleTokenScheme {
    /// The kind of a [`SimpleTokenScheme`].
    pub const KIND: u8 = 0;

    /// Creates a new scheme, checking `0 < maximum_supply` and `melted ≤ minted ≤ maximum_supply`.
    pub fn new(minted_tokens: U256, melted_tokens: U256, maximum_supply: U256) -> Result<Self, ValidationError> {
        if maximum_supply.is_zero() || melted_tokens > minted_tokens || minted_tokens > maximum_supply {
            return Err(ValidationError::InvalidTokenSupply {
                minted: minted_tokens,
                melted: melted_tokens,
                maximum: maximum_supply,
            });
        }
        Ok(Self {
            minted_tokens,
            melted_tokens,
            maximum_supply,
        })
    }

    /// The amount of minted tokens.
    pub fn minted_tokens(&self) -> U256 {
        self.minted_tokens
    }

    /// The amount of melted tokens.
    pub fn melted_tokens(&self) -> U256 {
        self.melted_tokens
    }

    /// The maximum supply.
    pub fn maximum_supply(&self) -> U256 {
        self.maximum_supply
    }

    /// The amount of tokens currently in circulation.
    pub fn circulating_supply(&self) -> U256 {
        self.minted_tokens - self.melted_tokens
    }

    /// Returns the scheme after minting `amount` more tokens.
    pub fn mint(&self, amount: U256) -> Result<Self, ValidationError> {
        let minted = self
            .minted_tokens
            .checked_add(amount)
            .ok_or(ValidationError::AmountOverflow)?;
        Self::new(minted, self.melted_tokens, self.maximum_supply)
    }

    /// Returns the scheme after melting `amount` tokens.
    pub fn melt(&self, amount: U256) -> Result<Self, ValidationError> {
        let melted = self
            .melted_tokens
            .checked_add(amount)
            .ok_or(ValidationError::AmountOverflow)?;
        Self::new(self.minted_tokens, melted, self.maximum_supply)
    }

    /// Checks that minted and melted only grow and the maximum supply does not change.
    pub fn verify_transition(&self, next: &Self) -> Result<(), ValidationError> {
        if next.maximum_supply != self.maximum_supply {
            return Err(ValidationError::InvalidTokenSchemeTransition("maximum supply changed"));
        }
        if next.minted_tokens < self.minted_tokens {
            return Err(ValidationError::InvalidTokenSchemeTransition("minted tokens decreased"));
        }
        if next.melted_tokens < self.melted_tokens {
            return Err(ValidationError::InvalidTokenSchemeTransition("melted tokens decreased"));
        }
        Ok(())
    }
}

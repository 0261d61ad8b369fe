// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Model utilities

pub mod serde;

use blake2::{digest::consts::U32, Blake2b, Digest};

pub use self::serde::*;
use super::ValidationError;

type Blake2b256 = Blake2b<U32>;

/// Hash some bytes with BLAKE2b-256.
#[inline(always)]
pub fn blake2b_256(bytes: impl AsRef<[u8]>) -> [u8; 32] {
    Blake2b256::digest(bytes.as_ref()).into()
}

/// Hash the canonical encoding of a value with BLAKE2b-256.
pub fn hash_of<T: ::serde::Serialize>(value: &T) -> [u8; 32] {
    // Unwrap: Cannot fail as all model types are well defined and contain no non-string map keys.
    blake2b_256(serde_json::to_vec(value).unwrap())
}

/// Decodes a `0x`-prefixed hex string into a fixed size byte array.
pub fn decode_hex_array<const N: usize>(hex: &str) -> Result<[u8; N], ValidationError> {
    let bytes = decode_hex(hex)?;
    let found = bytes.len();
    bytes
        .try_into()
        .map_err(|_| ValidationError::InvalidLength { expected: N, found })
}

/// Decodes a `0x`-prefixed hex string into bytes.
pub fn decode_hex(hex: &str) -> Result<Vec<u8>, ValidationError> {
    prefix_hex::decode::<Vec<u8>>(hex).map_err(|e| ValidationError::InvalidHex(format!("{hex}: {e:?}")))
}

/// Parses a base coin amount given as decimal or `0x`-prefixed hex text.
pub fn parse_amount(amount: &str) -> Result<u64, ValidationError> {
    let (digits, radix) = split_radix(amount)?;
    u64::from_str_radix(digits, radix).map_err(|e| match e.kind() {
        std::num::IntErrorKind::PosOverflow => ValidationError::AmountOverflow,
        _ => ValidationError::InvalidAmount(amount.to_owned()),
    })
}

/// Parses a native token amount given as decimal or `0x`-prefixed hex text.
pub fn parse_token_amount(amount: &str) -> Result<primitive_types::U256, ValidationError> {
    let (digits, radix) = split_radix(amount)?;
    if !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(ValidationError::InvalidAmount(amount.to_owned()));
    }
    primitive_types::U256::from_str_radix(digits, radix).map_err(|_| ValidationError::AmountOverflow)
}

fn split_radix(amount: &str) -> Result<(&str, u32), ValidationError> {
    let trimmed = amount.trim();
    if trimmed.starts_with('-') {
        return Err(ValidationError::NegativeAmount(amount.to_owned()));
    }
    let (digits, radix) = match trimmed.strip_prefix("0x") {
        Some(hex) => (hex, 16),
        None => (trimmed, 10),
    };
    // `from_str_radix` accepts a leading `+`, which is not a valid amount.
    if digits.is_empty() || digits.starts_with('+') {
        return Err(ValidationError::InvalidAmount(amount.to_owned()));
    }
    Ok((digits, radix))
}

/// Implements a fixed-size identifier with a canonical `0x`-prefixed hex representation.
macro_rules! impl_id {
    ($(#[$meta:meta])* $vis:vis $name:ident, $len:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis struct $name(pub [u8; $len]);

        impl $name {
            /// The length of the identifier in bytes.
            pub const LENGTH: usize = $len;

            /// Creates a new identifier from its bytes.
            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Creates the null identifier.
            pub const fn null() -> Self {
                Self([0; $len])
            }

            /// Whether every byte of the identifier is zero.
            pub fn is_null(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            /// Converts the identifier to its `0x`-prefixed hex representation.
            pub fn to_hex(&self) -> String {
                prefix_hex::encode(&self.0[..])
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl core::str::FromStr for $name {
            type Err = $crate::model::ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self($crate::model::util::decode_hex_array::<$len>(s)?))
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                $crate::model::util::stringify::deserialize(deserializer)
            }
        }
    };
}

pub(crate) use impl_id;

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn amounts_parse_decimal_and_hex() {
        assert_eq!(parse_amount("1000000").unwrap(), 1_000_000);
        assert_eq!(parse_amount("0x0f4240").unwrap(), 1_000_000);
        assert_eq!(
            parse_token_amount("0xff").unwrap(),
            primitive_types::U256::from(255u8)
        );
    }

    #[test]
    fn invalid_amounts_are_rejected() {
        assert!(matches!(parse_amount("-5"), Err(ValidationError::NegativeAmount(_))));
        assert!(matches!(parse_amount("ten"), Err(ValidationError::InvalidAmount(_))));
        assert!(matches!(parse_amount(""), Err(ValidationError::InvalidAmount(_))));
        assert!(matches!(parse_amount("+5"), Err(ValidationError::InvalidAmount(_))));
        assert!(matches!(
            parse_amount("18446744073709551616"),
            Err(ValidationError::AmountOverflow)
        ));
        assert!(matches!(parse_token_amount("12a"), Err(ValidationError::InvalidAmount(_))));
        assert!(matches!(
            parse_token_amount(&format!("0x1{}", "0".repeat(64))),
            Err(ValidationError::AmountOverflow)
        ));
    }

    #[test]
    fn hex_arrays_check_length() {
        assert_eq!(decode_hex_array::<2>("0x0102").unwrap(), [1, 2]);
        assert_eq!(
            decode_hex_array::<3>("0x0102"),
            Err(ValidationError::InvalidLength { expected: 3, found: 2 })
        );
        assert!(matches!(decode_hex("0102"), Err(ValidationError::InvalidHex(_))));
    }
}

// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use core::fmt;

use serde::{Deserialize, Serialize};

/// The reason why a node rejected a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum ConflictReason {
    None = 0,
    InputUtxoAlreadySpent = 1,
    InputUtxoAlreadySpentInThisMilestone = 2,
    InputUtxoNotFound = 3,
    CreatedConsumedAmountMismatch = 4,
    InvalidSignature = 5,
    TimelockNotExpired = 6,
    InvalidNativeTokens = 7,
    StorageDepositReturnUnfulfilled = 8,
    InvalidUnlock = 9,
    InputsCommitmentsMismatch = 10,
    UnverifiedSender = 11,
    InvalidChainStateTransition = 12,
    SemanticValidationFailed = 255,
}

impl From<ConflictReason> for u8 {
    fn from(value: ConflictReason) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for ConflictReason {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::None,
            1 => Self::InputUtxoAlreadySpent,
            2 => Self::InputUtxoAlreadySpentInThisMilestone,
            3 => Self::InputUtxoNotFound,
            4 => Self::CreatedConsumedAmountMismatch,
            5 => Self::InvalidSignature,
            6 => Self::TimelockNotExpired,
            7 => Self::InvalidNativeTokens,
            8 => Self::StorageDepositReturnUnfulfilled,
            9 => Self::InvalidUnlock,
            10 => Self::InputsCommitmentsMismatch,
            11 => Self::UnverifiedSender,
            12 => Self::InvalidChainStateTransition,
            255 => Self::SemanticValidationFailed,
            other => return Err(other),
        })
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::InputUtxoAlreadySpent => "input already spent",
            Self::InputUtxoAlreadySpentInThisMilestone => "input already spent in the same milestone",
            Self::InputUtxoNotFound => "input not found",
            Self::CreatedConsumedAmountMismatch => "created and consumed amounts do not match",
            Self::InvalidSignature => "invalid signature",
            Self::TimelockNotExpired => "timelock not expired",
            Self::InvalidNativeTokens => "invalid native tokens",
            Self::StorageDepositReturnUnfulfilled => "storage deposit return unfulfilled",
            Self::InvalidUnlock => "invalid unlock",
            Self::InputsCommitmentsMismatch => "inputs commitment mismatch",
            Self::UnverifiedSender => "unverified sender",
            Self::InvalidChainStateTransition => "invalid chain state transition",
            Self::SemanticValidationFailed => "semantic validation failed",
        };
        write!(f, "{s} ({})", *self as u8)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn codes_round_trip() {
        for code in (0..=12).chain([255]) {
            assert_eq!(u8::from(ConflictReason::try_from(code).unwrap()), code);
        }
        assert_eq!(ConflictReason::try_from(13), Err(13));
        assert_eq!(ConflictReason::InputUtxoAlreadySpent.to_string(), "input already spent (1)");
    }
}

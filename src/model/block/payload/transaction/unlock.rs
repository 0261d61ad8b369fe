// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Module containing the [`Unlock`] types.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{codec::TaggedUnion, Signature, ValidationError};

/// The different types of [`Unlock`]s.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Unlock {
    /// A signature unlock.
    Signature {
        /// The [`Signature`] of the unlock.
        signature: Signature,
    },
    /// A reference unlock.
    Reference {
        /// The index of the referenced signature unlock.
        index: u16,
    },
    /// An account unlock.
    #[serde(alias = "alias")]
    Account {
        /// The index of the input that holds the account.
        index: u16,
    },
    /// An NFT unlock.
    Nft {
        /// The index of the input that holds the NFT.
        index: u16,
    },
    /// Unlocks an input owned by a multi address.
    Multi {
        /// One unlock per member of the multi address.
        unlocks: Vec<Unlock>,
    },
    /// A placeholder inside a [`Unlock::Multi`] for members that do not sign.
    Empty,
}

impl Unlock {
    /// The signature of a signature unlock.
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            Self::Signature { signature } => Some(signature),
            _ => None,
        }
    }
}

impl TaggedUnion for Unlock {
    const FAMILY: &'static str = "unlock";
    const KINDS: &'static [&'static str] = &["signature", "reference", "account", "alias", "nft", "multi", "empty"];
}

/// The unlocks of a transaction, one per input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Unlocks(Vec<Unlock>);

impl Unlocks {
    /// Validates the references between unlocks. Every reference-style unlock must point to an earlier index, a
    /// reference unlock must point to a signature unlock, and a public key may only sign once.
    pub fn new(unlocks: Vec<Unlock>, input_count: usize) -> Result<Self, ValidationError> {
        if unlocks.len() != input_count {
            return Err(ValidationError::UnlockCountMismatch {
                unlocks: unlocks.len(),
                inputs: input_count,
            });
        }
        let mut public_keys = HashSet::new();
        for (index, unlock) in unlocks.iter().enumerate() {
            match unlock {
                Unlock::Empty => {
                    return Err(ValidationError::InvalidUnlock {
                        index,
                        reason: "empty unlock outside of a multi unlock",
                    });
                }
                Unlock::Multi { unlocks: members } => {
                    for member in members {
                        if let Unlock::Multi { .. } = member {
                            return Err(ValidationError::InvalidUnlock {
                                index,
                                reason: "nested multi unlock",
                            });
                        }
                        verify_unlock(&unlocks, index, member, &mut public_keys)?;
                    }
                }
                _ => verify_unlock(&unlocks, index, unlock, &mut public_keys)?,
            }
        }
        Ok(Self(unlocks))
    }

    /// The number of unlocks.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no unlocks.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the unlocks in input order.
    pub fn iter(&self) -> impl Iterator<Item = &Unlock> {
        self.0.iter()
    }

    /// Returns the unlock of the input at the given index.
    pub fn get(&self, index: usize) -> Option<&Unlock> {
        self.0.get(index)
    }

    /// Checks every signature, including those inside multi unlocks, against the signing hash.
    pub fn verify_signatures(&self, message: &[u8]) -> Result<(), ValidationError> {
        for (index, unlock) in self.0.iter().enumerate() {
            let signatures: Vec<&Signature> = match unlock {
                Unlock::Multi { unlocks } => unlocks.iter().filter_map(Unlock::signature).collect(),
                unlock => unlock.signature().into_iter().collect(),
            };
            if signatures.into_iter().any(|s| !s.verify(message)) {
                return Err(ValidationError::InvalidSignature(index));
            }
        }
        Ok(())
    }
}

impl IntoIterator for Unlocks {
    type Item = Unlock;
    type IntoIter = std::vec::IntoIter<Unlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

fn verify_unlock(
    unlocks: &[Unlock],
    index: usize,
    unlock: &Unlock,
    public_keys: &mut HashSet<[u8; 32]>,
) -> Result<(), ValidationError> {
    match unlock {
        Unlock::Signature { signature } => {
            if !public_keys.insert(*signature.public_key()) {
                return Err(ValidationError::InvalidUnlock {
                    index,
                    reason: "duplicate signature",
                });
            }
        }
        Unlock::Reference { index: target } => {
            let target = *target as usize;
            if target >= index || !matches!(unlocks[target], Unlock::Signature { .. }) {
                return Err(ValidationError::InvalidUnlock {
                    index,
                    reason: "reference unlock must point to an earlier signature unlock",
                });
            }
        }
        Unlock::Account { index: target } | Unlock::Nft { index: target } => {
            if *target as usize >= index {
                return Err(ValidationError::InvalidUnlock {
                    index,
                    reason: "chain unlock must point to an earlier input",
                });
            }
        }
        Unlock::Multi { .. } | Unlock::Empty => (),
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use ed25519_dalek::{Signer, SigningKey};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::codec::{decode, encode};

    fn signature(seed: u8, message: &[u8]) -> Signature {
        let key = SigningKey::from_bytes(&[seed; 32]);
        Signature::Ed25519 {
            public_key: key.verifying_key().to_bytes(),
            signature: key.sign(message).to_bytes(),
        }
    }

    #[test]
    fn references_must_point_backwards_to_signatures() {
        let sig = Unlock::Signature {
            signature: signature(1, b"m"),
        };
        assert!(Unlocks::new(vec![sig.clone(), Unlock::Reference { index: 0 }], 2).is_ok());
        assert!(matches!(
            Unlocks::new(vec![Unlock::Reference { index: 1 }, sig.clone()], 2),
            Err(ValidationError::InvalidUnlock { index: 0, .. })
        ));
        assert!(matches!(
            Unlocks::new(
                vec![sig.clone(), Unlock::Account { index: 0 }, Unlock::Reference { index: 1 }],
                3
            ),
            Err(ValidationError::InvalidUnlock { index: 2, .. })
        ));
        assert!(matches!(
            Unlocks::new(vec![sig.clone(), Unlock::Nft { index: 1 }], 2),
            Err(ValidationError::InvalidUnlock { index: 1, .. })
        ));
    }

    #[test]
    fn count_must_match_inputs() {
        let sig = Unlock::Signature {
            signature: signature(1, b"m"),
        };
        assert_eq!(
            Unlocks::new(vec![sig], 2),
            Err(ValidationError::UnlockCountMismatch { unlocks: 1, inputs: 2 })
        );
    }

    #[test]
    fn duplicate_signatures_and_stray_empty_unlocks_fail() {
        let sig = Unlock::Signature {
            signature: signature(1, b"m"),
        };
        assert!(Unlocks::new(vec![sig.clone(), sig.clone()], 2).is_err());
        assert!(Unlocks::new(vec![Unlock::Empty], 1).is_err());
        let multi = Unlock::Multi {
            unlocks: vec![sig, Unlock::Empty],
        };
        assert!(Unlocks::new(vec![multi], 1).is_ok());
    }

    #[test]
    fn signatures_are_verified() {
        let unlocks = Unlocks::new(
            vec![Unlock::Signature {
                signature: signature(3, b"hash"),
            }],
            1,
        )
        .unwrap();
        assert!(unlocks.verify_signatures(b"hash").is_ok());
        assert_eq!(
            unlocks.verify_signatures(b"other"),
            Err(ValidationError::InvalidSignature(0))
        );
    }

    #[test]
    fn unlocks_round_trip() {
        for unlock in [
            Unlock::Signature {
                signature: signature(2, b"m"),
            },
            Unlock::Reference { index: 1 },
            Unlock::Account { index: 2 },
            Unlock::Nft { index: 3 },
            Unlock::Multi {
                unlocks: vec![Unlock::Empty, Unlock::Reference { index: 0 }],
            },
            Unlock::Empty,
        ] {
            assert_eq!(decode::<Unlock>(encode(&unlock)).unwrap(), unlock);
        }
    }
}

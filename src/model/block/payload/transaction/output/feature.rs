// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Module containing the [`Feature`] type.

use serde::{Deserialize, Deserializer, Serialize};

use super::{Address, NativeToken};
use crate::model::{
    codec::{decode_skipping_unknown, TaggedUnion},
    util::{bytify, impl_id, stringify},
    EpochIndex, SlotIndex, ValidationError,
};

/// Identifies the validated sender of an output.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderFeature {
    /// The sender address.
    pub address: Address,
}

impl SenderFeature {
    /// The [`Feature`] kind of a [`SenderFeature`].
    pub const KIND: u8 = 0;
}

/// Identifies the validated issuer of a chain output.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerFeature {
    /// The issuer address.
    pub address: Address,
}

impl IssuerFeature {
    /// The [`Feature`] kind of an [`IssuerFeature`].
    pub const KIND: u8 = 1;
}

/// Arbitrary binary data attached to an output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFeature {
    /// The data.
    #[serde(with = "bytify")]
    pub data: Box<[u8]>,
}

impl MetadataFeature {
    /// The [`Feature`] kind of a [`MetadataFeature`].
    pub const KIND: u8 = 2;
    /// The maximum length of the data.
    pub const LENGTH_MAX: usize = 8192;

    /// Creates a new metadata feature.
    pub fn new(data: impl Into<Box<[u8]>>) -> Self {
        Self { data: data.into() }
    }
}

/// Metadata of an account output that can only be changed by the state controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMetadataFeature {
    /// The data.
    #[serde(with = "bytify")]
    pub data: Box<[u8]>,
}

impl StateMetadataFeature {
    /// The [`Feature`] kind of a [`StateMetadataFeature`].
    pub const KIND: u8 = 3;
    /// The maximum length of the data.
    pub const LENGTH_MAX: usize = 8192;

    /// Creates a new state metadata feature.
    pub fn new(data: impl Into<Box<[u8]>>) -> Self {
        Self { data: data.into() }
    }
}

/// A tag used to index an output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFeature {
    /// The tag.
    #[serde(with = "bytify")]
    pub tag: Box<[u8]>,
}

impl TagFeature {
    /// The [`Feature`] kind of a [`TagFeature`].
    pub const KIND: u8 = 4;
    /// The maximum length of the tag.
    pub const LENGTH_MAX: usize = 64;

    /// Creates a new tag feature.
    pub fn new(tag: impl Into<Box<[u8]>>) -> Self {
        Self { tag: tag.into() }
    }
}

impl_id!(
    /// An Ed25519 public key allowed to issue blocks for an account.
    pub BlockIssuerKey,
    32
);

/// Marks an account as a block issuer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockIssuerFeature {
    /// The slot after which the feature may be removed.
    pub expiry_slot: SlotIndex,
    /// The keys that may sign blocks on behalf of the account.
    pub block_issuer_keys: Vec<BlockIssuerKey>,
}

impl BlockIssuerFeature {
    /// The [`Feature`] kind of a [`BlockIssuerFeature`].
    pub const KIND: u8 = 6;
}

/// Locks base tokens of an account for staking.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingFeature {
    /// The amount of staked base tokens.
    #[serde(with = "stringify")]
    pub staked_amount: u64,
    /// The fixed cost of the validator.
    #[serde(with = "stringify")]
    pub fixed_cost: u64,
    /// The first epoch of staking.
    pub start_epoch: EpochIndex,
    /// The last epoch of staking.
    pub end_epoch: EpochIndex,
}

impl StakingFeature {
    /// The [`Feature`] kind of a [`StakingFeature`].
    pub const KIND: u8 = 7;
}

/// The different feature variants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, derive_more::From)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Feature {
    /// The sender feature.
    Sender(SenderFeature),
    /// The issuer feature.
    Issuer(IssuerFeature),
    /// The metadata feature.
    Metadata(MetadataFeature),
    /// The state metadata feature.
    StateMetadata(StateMetadataFeature),
    /// The tag feature.
    Tag(TagFeature),
    /// The native token feature.
    NativeToken(NativeToken),
    /// The block issuer feature.
    BlockIssuer(BlockIssuerFeature),
    /// The staking feature.
    Staking(StakingFeature),
}

impl Feature {
    /// Returns the protocol kind of the feature.
    pub fn kind(&self) -> u8 {
        match self {
            Self::Sender(_) => SenderFeature::KIND,
            Self::Issuer(_) => IssuerFeature::KIND,
            Self::Metadata(_) => MetadataFeature::KIND,
            Self::StateMetadata(_) => StateMetadataFeature::KIND,
            Self::Tag(_) => TagFeature::KIND,
            Self::NativeToken(_) => NativeToken::KIND,
            Self::BlockIssuer(_) => BlockIssuerFeature::KIND,
            Self::Staking(_) => StakingFeature::KIND,
        }
    }

    /// Returns the name of the feature.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sender(_) => "sender",
            Self::Issuer(_) => "issuer",
            Self::Metadata(_) => "metadata",
            Self::StateMetadata(_) => "state_metadata",
            Self::Tag(_) => "tag",
            Self::NativeToken(_) => "native_token",
            Self::BlockIssuer(_) => "block_issuer",
            Self::Staking(_) => "staking",
        }
    }
}

fn verify_length(kind: &'static str, len: usize, max: usize) -> Result<(), ValidationError> {
    if len == 0 || len > max {
        return Err(ValidationError::InvalidFeatureLength { kind, len });
    }
    Ok(())
}

impl TaggedUnion for Feature {
    const FAMILY: &'static str = "feature";
    const KINDS: &'static [&'static str] = &[
        "sender",
        "issuer",
        "metadata",
        "state_metadata",
        "tag",
        "native_token",
        "block_issuer",
        "staking",
    ];

    fn verify(&self) -> Result<(), ValidationError> {
        match self {
            Self::Metadata(f) => verify_length(self.name(), f.data.len(), MetadataFeature::LENGTH_MAX),
            Self::StateMetadata(f) => verify_length(self.name(), f.data.len(), StateMetadataFeature::LENGTH_MAX),
            Self::Tag(f) => verify_length(self.name(), f.tag.len(), TagFeature::LENGTH_MAX),
            Self::NativeToken(token) => token.verify(),
            Self::BlockIssuer(f) => verify_length(self.name(), f.block_issuer_keys.len(), 128),
            _ => Ok(()),
        }
    }
}

/// A list of features, sorted by kind and free of duplicates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Features(Vec<Feature>);

impl Features {
    /// Sorts and validates a list of features.
    pub fn from_vec(mut features: Vec<Feature>) -> Result<Self, ValidationError> {
        features.sort_by_key(Feature::kind);
        for pair in features.windows(2) {
            if pair[0].kind() == pair[1].kind() {
                return Err(ValidationError::DuplicateFeature(pair[0].name()));
            }
        }
        for feature in &features {
            feature.verify()?;
        }
        Ok(Self(features))
    }

    /// Checks that only the allowed kinds are present.
    pub(crate) fn verify_allowed(
        &self,
        output: &'static str,
        allowed: &[u8],
        immutable: bool,
    ) -> Result<(), ValidationError> {
        match self.0.iter().find(|f| !allowed.contains(&f.kind())) {
            Some(feature) => Err(ValidationError::DisallowedFeature {
                kind: feature.name(),
                output,
                immutable,
            }),
            None => Ok(()),
        }
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the features.
    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.0.iter()
    }

    /// Converts the list back into a vector.
    pub fn into_vec(self) -> Vec<Feature> {
        self.0
    }

    fn get(&self, kind: u8) -> Option<&Feature> {
        self.0.iter().find(|f| f.kind() == kind)
    }

    /// The sender feature, if present.
    pub fn sender(&self) -> Option<&SenderFeature> {
        match self.get(SenderFeature::KIND) {
            Some(Feature::Sender(f)) => Some(f),
            _ => None,
        }
    }

    /// The issuer feature, if present.
    pub fn issuer(&self) -> Option<&IssuerFeature> {
        match self.get(IssuerFeature::KIND) {
            Some(Feature::Issuer(f)) => Some(f),
            _ => None,
        }
    }

    /// The metadata feature, if present.
    pub fn metadata(&self) -> Option<&MetadataFeature> {
        match self.get(MetadataFeature::KIND) {
            Some(Feature::Metadata(f)) => Some(f),
            _ => None,
        }
    }

    /// The state metadata feature, if present.
    pub fn state_metadata(&self) -> Option<&StateMetadataFeature> {
        match self.get(StateMetadataFeature::KIND) {
            Some(Feature::StateMetadata(f)) => Some(f),
            _ => None,
        }
    }

    /// The tag feature, if present.
    pub fn tag(&self) -> Option<&TagFeature> {
        match self.get(TagFeature::KIND) {
            Some(Feature::Tag(f)) => Some(f),
            _ => None,
        }
    }

    /// The native token feature, if present.
    pub fn native_token(&self) -> Option<&NativeToken> {
        match self.get(NativeToken::KIND) {
            Some(Feature::NativeToken(f)) => Some(f),
            _ => None,
        }
    }

    /// The block issuer feature, if present.
    pub fn block_issuer(&self) -> Option<&BlockIssuerFeature> {
        match self.get(BlockIssuerFeature::KIND) {
            Some(Feature::BlockIssuer(f)) => Some(f),
            _ => None,
        }
    }

    /// The staking feature, if present.
    pub fn staking(&self) -> Option<&StakingFeature> {
        match self.get(StakingFeature::KIND) {
            Some(Feature::Staking(f)) => Some(f),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Features {
    /// Features of a kind this version does not know are dropped instead of failing the whole output.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let values = Vec::<serde_json::Value>::deserialize(deserializer)?;
        let features = decode_skipping_unknown::<Feature>(values).map_err(D::Error::custom)?;
        Self::from_vec(features).map_err(D::Error::custom)
    }
}

impl TryFrom<Vec<Feature>> for Features {
    type Error = ValidationError;

    fn try_from(value: Vec<Feature>) -> Result<Self, Self::Error> {
        Self::from_vec(value)
    }
}

impl IntoIterator for Features {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use primitive_types::U256;

    use super::*;
    use crate::model::{
        codec::{decode, encode},
        utxo::{Ed25519Address, TokenId},
    };

    fn address() -> Address {
        Address::Ed25519(Ed25519Address::new([5; 32]))
    }

    fn all() -> Vec<Feature> {
        vec![
            SenderFeature { address: address() }.into(),
            IssuerFeature { address: address() }.into(),
            MetadataFeature::new(b"hello".to_vec()).into(),
            StateMetadataFeature::new(vec![1, 2, 3]).into(),
            TagFeature::new(b"tag".to_vec()).into(),
            NativeToken::new(TokenId::new([4; 38]), U256::from(1000u64)).unwrap().into(),
            BlockIssuerFeature {
                expiry_slot: SlotIndex(100),
                block_issuer_keys: vec![BlockIssuerKey::new([6; 32])],
            }
            .into(),
            StakingFeature {
                staked_amount: 500,
                fixed_cost: 1,
                start_epoch: EpochIndex(1),
                end_epoch: EpochIndex(10),
            }
            .into(),
        ]
    }

    #[test]
    fn every_variant_round_trips() {
        for feature in all() {
            assert_eq!(decode::<Feature>(encode(&feature)).unwrap(), feature);
        }
        let features = Features::from_vec(all()).unwrap();
        let decoded = serde_json::from_value::<Features>(encode(&features)).unwrap();
        assert_eq!(decoded, features);
    }

    #[test]
    fn features_are_sorted_and_unique() {
        let mut reversed = all();
        reversed.reverse();
        let features = Features::from_vec(reversed).unwrap();
        assert_eq!(features.iter().map(Feature::kind).collect::<Vec<_>>(), (0..8).collect::<Vec<_>>());

        let duplicate = vec![TagFeature::new(vec![1]).into(), TagFeature::new(vec![2]).into()];
        assert_eq!(
            Features::from_vec(duplicate),
            Err(ValidationError::DuplicateFeature("tag"))
        );
    }

    #[test]
    fn lengths_are_bounded() {
        assert!(Features::from_vec(vec![TagFeature::new(vec![0; 65]).into()]).is_err());
        assert!(Features::from_vec(vec![MetadataFeature::new(Vec::new()).into()]).is_err());
        assert!(Features::from_vec(vec![MetadataFeature::new(vec![0; 8192]).into()]).is_ok());
    }

    #[test]
    fn unknown_features_in_a_list_are_dropped() {
        let value = serde_json::json!([
            { "kind": "tag", "tag": "0x0102" },
            { "kind": "hologram", "data": "0xff" },
        ]);
        let features = serde_json::from_value::<Features>(value).unwrap();
        assert_eq!(features, Features::from_vec(vec![TagFeature::new(vec![1, 2]).into()]).unwrap());
    }

    #[test]
    fn unknown_top_level_feature_fails() {
        let value = serde_json::json!({ "kind": "hologram", "data": "0xff" });
        assert!(matches!(
            decode::<Feature>(value),
            Err(crate::model::DecodeError::UnknownVariant(_))
        ));
    }
}

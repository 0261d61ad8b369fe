// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Module containing [`Block`] types.

use serde::{Deserialize, Serialize};

use self::payload::Payload;
use super::{
    protocol::ProtocolParameters,
    util::{hash_of, impl_id, stringify},
};

pub mod payload;

impl_id!(
    /// Uniquely identifies a block.
    pub BlockId,
    32
);

/// The Block type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// The protocol version the block was issued for.
    pub protocol_version: u8,
    /// The network the block was issued on.
    #[serde(with = "stringify")]
    pub network_id: u64,
    /// Unix time of issuance in nanoseconds.
    #[serde(with = "stringify")]
    pub issuing_time: u64,
    /// The blocks this block approves.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<BlockId>,
    /// The payload of the block.
    pub payload: Option<Payload>,
}

impl Block {
    /// Creates a block for the given network that is issued now.
    pub fn new(params: &ProtocolParameters, parents: Vec<BlockId>, payload: Option<Payload>) -> Self {
        let issuing_time = time::OffsetDateTime::now_utc().unix_timestamp_nanos().max(0) as u64;
        Self {
            protocol_version: params.version,
            network_id: params.network_id(),
            issuing_time,
            parents,
            payload,
        }
    }

    /// Computes the identifier of the block.
    pub fn id(&self) -> BlockId {
        BlockId(hash_of(self))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::block::payload::TaggedDataPayload;

    #[test]
    fn reattached_block_has_a_new_id() {
        let params = ProtocolParameters::default();
        let payload = Payload::from(TaggedDataPayload::new(b"t".to_vec(), Vec::new()).unwrap());
        let block = Block::new(&params, Vec::new(), Some(payload.clone()));
        let reattached = Block::new(&params, vec![block.id()], Some(payload));
        assert_ne!(block.id(), reattached.id());
        assert_eq!(reattached.network_id, params.network_id());
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(serde_json::from_value::<Block>(value).unwrap(), block);
    }
}

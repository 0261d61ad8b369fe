// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Module that contains the ledger object model.

pub mod block;
pub mod codec;
mod error;
pub mod ledger;
pub mod protocol;
pub mod signature;
pub mod slot;
pub mod util;

pub use self::{
    block::{Block, BlockId},
    error::{DecodeError, UnknownVariantError, ValidationError},
    protocol::ProtocolParameters,
    signature::Signature,
    slot::{EpochIndex, SlotCommitmentId, SlotIndex},
};

pub mod utxo {
    //! A logical grouping of UTXO types for convenience.
    #![allow(ambiguous_glob_reexports)]
    pub use super::block::payload::{
        transaction::{
            input::*,
            output::{address::*, feature::*, native_token::*, params::*, rent::*, unlock_condition::*, *},
            unlock::*,
            *,
        },
        *,
    };
}

// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! The UTXO ledger object model of IOTA Stardust networks and a wallet that builds, signs, submits and tracks
//! transactions over it.

pub mod client;
pub mod config;
mod error;
pub mod model;
pub mod storage;
pub mod transaction;
pub mod wallet;

pub use self::error::{Error, ErrorKind};

// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Interfaces to the collaborators of a wallet: the node it talks to and the secret manager that signs for it.

mod memory;
mod node;
mod secret;

pub use self::{
    memory::InMemoryNode,
    node::{Node, NodeError, OutputQuery},
    secret::{Bip44Chain, InMemorySecretManager, SecretError, SecretManager},
};

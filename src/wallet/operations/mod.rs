// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! High level operations that build the outputs of common transactions and prepare them.

mod account;
mod claim;
mod native_tokens;
mod nft;
mod send;

pub use self::{
    account::CreateAccountParams,
    claim::OutputsToClaim,
    native_tokens::{CreateNativeTokenParams, PreparedCreateNativeToken, SendNativeTokenParams},
    nft::{MintNftParams, SendNftParams},
    send::{OutputOptions, ReturnStrategy, SendParams, DEFAULT_EXPIRATION_SLOTS},
};
use super::Wallet;
use crate::{
    model::{
        ledger::OutputWithMetadata,
        utxo::{AccountId, Address, Bech32Address, ChainId, Output},
        ValidationError,
    },
    Error,
};

/// Checks that an address belongs to the network the wallet is on.
fn network_address(address: &Bech32Address, hrp: &str) -> Result<Address, ValidationError> {
    if address.hrp() != hrp {
        return Err(ValidationError::Bech32HrpMismatch {
            expected: hrp.to_owned(),
            found: address.hrp().to_owned(),
        });
    }
    Ok(*address.inner())
}

impl Wallet {
    /// The unspent, unreserved output of a chain.
    async fn unreserved_chain_output(&self, chain_id: ChainId) -> Result<OutputWithMetadata, Error> {
        let data = self.data.read().await;
        let output = data
            .chain_output(chain_id)
            .ok_or_else(|| Error::ChainNotFound(chain_id.to_string()))?;
        if data.locked_outputs.contains(&output.output_id()) {
            return Err(Error::OutputNotAvailable(output.output_id()));
        }
        Ok(output.clone())
    }

    /// The output of the given account, or of the first account the wallet controls.
    async fn controlled_account(
        &self,
        account_id: Option<AccountId>,
    ) -> Result<(AccountId, OutputWithMetadata), Error> {
        if let Some(account_id) = account_id {
            return Ok((account_id, self.unreserved_chain_output(account_id.into()).await?));
        }
        let data = self.data.read().await;
        let own = *data.address.inner();
        data.unspent_outputs
            .values()
            .filter(|output| !data.locked_outputs.contains(&output.output_id()))
            .find_map(|output| match (&output.output, output.chain_id()) {
                (Output::Account(account), Some(ChainId::Account(account_id)))
                    if *account.state_controller_address() == own =>
                {
                    Some((account_id, output.clone()))
                }
                _ => None,
            })
            .ok_or_else(|| Error::ChainNotFound("account".to_owned()))
    }

    /// Resolves an optional address, falling back to the wallet address.
    async fn address_or_own(&self, address: Option<&Bech32Address>, hrp: &str) -> Result<Address, Error> {
        match address {
            Some(address) => Ok(network_address(address, hrp)?),
            None => Ok(*self.data.read().await.address.inner()),
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::utxo::Ed25519Address;

    #[test]
    fn foreign_network_addresses_are_rejected() {
        let address = Address::from(Ed25519Address::new([5; 32]));
        assert_eq!(
            network_address(&Bech32Address::new("rms", address).unwrap(), "rms").unwrap(),
            address
        );
        assert_eq!(
            network_address(&Bech32Address::new("smr", address).unwrap(), "rms"),
            Err(ValidationError::Bech32HrpMismatch {
                expected: "rms".to_owned(),
                found: "smr".to_owned(),
            })
        );
    }
}

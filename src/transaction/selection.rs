// Copyright 2023 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::{
    cmp::Reverse,
    collections::{BTreeMap, BTreeSet},
};

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::{
    conservation::{native_token_sums, supply_changes},
    transition::required_address,
    InputSigningData, RemainderData,
};
use crate::model::{
    ledger::OutputWithMetadata,
    utxo::{
        AccountId, Address, AddressUnlockCondition, BasicOutputBuilder, Capabilities, ChainId, FoundryId,
        ManaAllotment, NativeToken, NftId, Output, OutputId, RentCalculator, RentStructure, TokenId,
    },
    SlotIndex, ValidationError,
};

#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("insufficient {asset}: found {found}, required {required}")]
    InsufficientFunds {
        asset: String,
        found: String,
        required: String,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl SelectionError {
    fn insufficient(asset: impl Into<String>, found: impl ToString, required: impl ToString) -> Self {
        Self::InsufficientFunds {
            asset: asset.into(),
            found: found.to_string(),
            required: required.to_string(),
        }
    }
}

/// What a transaction deliberately destroys.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Burn {
    /// Native tokens to burn, without melting them in their foundry.
    pub native_tokens: BTreeMap<TokenId, U256>,
    /// Accounts to destroy.
    pub accounts: BTreeSet<AccountId>,
    /// Foundries to destroy.
    pub foundries: BTreeSet<FoundryId>,
    /// NFTs to destroy.
    pub nfts: BTreeSet<NftId>,
}

#[allow(missing_docs)]
impl Burn {
    pub fn add_native_token(mut self, token_id: TokenId, amount: impl Into<U256>) -> Self {
        let entry = self.native_tokens.entry(token_id).or_default();
        *entry = entry.saturating_add(amount.into());
        self
    }

    pub fn add_account(mut self, account_id: AccountId) -> Self {
        self.accounts.insert(account_id);
        self
    }

    pub fn add_foundry(mut self, foundry_id: FoundryId) -> Self {
        self.foundries.insert(foundry_id);
        self
    }

    pub fn add_nft(mut self, nft_id: NftId) -> Self {
        self.nfts.insert(nft_id);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.native_tokens.is_empty() && self.accounts.is_empty() && self.foundries.is_empty() && self.nfts.is_empty()
    }

    /// The transaction capabilities the burn needs.
    pub fn capabilities(&self) -> Capabilities {
        let mut capabilities = Capabilities::default();
        if !self.native_tokens.is_empty() {
            capabilities = capabilities.with(Capabilities::BURN_NATIVE_TOKENS);
        }
        if !self.accounts.is_empty() {
            capabilities = capabilities.with(Capabilities::DESTROY_ACCOUNT_OUTPUTS);
        }
        if !self.foundries.is_empty() {
            capabilities = capabilities.with(Capabilities::DESTROY_FOUNDRY_OUTPUTS);
        }
        if !self.nfts.is_empty() {
            capabilities = capabilities.with(Capabilities::DESTROY_NFT_OUTPUTS);
        }
        capabilities
    }

    fn chains(&self) -> impl Iterator<Item = ChainId> + '_ {
        self.accounts
            .iter()
            .copied()
            .map(ChainId::from)
            .chain(self.foundries.iter().copied().map(ChainId::from))
            .chain(self.nfts.iter().copied().map(ChainId::from))
    }
}

/// The result of an input selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selected {
    /// The consumed outputs, ordered so that chain-owned inputs follow the chain input that unlocks them.
    pub inputs: Vec<InputSigningData>,
    /// The requested outputs followed by the remainder outputs.
    pub outputs: Vec<Output>,
    /// The remainder outputs.
    pub remainders: Vec<RemainderData>,
}

/// Chooses the inputs that fund a set of outputs and creates remainder outputs for the surplus.
///
/// Required inputs are always consumed. Then the chains touched by the outputs or the burn are pulled in, followed
/// by inputs holding a missing native token (largest token amount first) and finally inputs for the base coin
/// (largest amount first, ties by ascending output id). Only basic outputs that a plain signature unlocks are picked
/// automatically.
#[derive(Clone, Debug)]
pub struct InputSelection {
    available: Vec<InputSigningData>,
    outputs: Vec<Output>,
    remainder_address: Address,
    rent: RentStructure,
    slot_index: SlotIndex,
    required_inputs: BTreeSet<OutputId>,
    forbidden_inputs: BTreeSet<OutputId>,
    custom_inputs: Option<BTreeSet<OutputId>>,
    burn: Burn,
    mana_allotments: Vec<ManaAllotment>,
}

#[derive(Default)]
struct Totals {
    base_in: u64,
    base_out: u64,
    mana_in: u64,
    mana_out: u64,
    tokens_in: BTreeMap<TokenId, U256>,
    tokens_out: BTreeMap<TokenId, U256>,
}

impl Totals {
    fn token_surplus(&self) -> BTreeMap<TokenId, U256> {
        self.tokens_in
            .iter()
            .filter_map(|(token_id, available)| {
                let used = self.tokens_out.get(token_id).copied().unwrap_or_default();
                (*available > used).then(|| (*token_id, *available - used))
            })
            .collect()
    }

    fn token_deficit(&self) -> Option<(TokenId, U256, U256)> {
        self.tokens_out.iter().find_map(|(token_id, used)| {
            let available = self.tokens_in.get(token_id).copied().unwrap_or_default();
            (*used > available).then_some((*token_id, available, *used))
        })
    }
}

fn add(a: u64, b: u64) -> Result<u64, ValidationError> {
    a.checked_add(b).ok_or(ValidationError::AmountOverflow)
}

fn add_tokens(sums: &mut BTreeMap<TokenId, U256>, token_id: TokenId, amount: U256) -> Result<(), ValidationError> {
    let sum = sums.entry(token_id).or_default();
    *sum = sum.checked_add(amount).ok_or(ValidationError::AmountOverflow)?;
    Ok(())
}

#[allow(missing_docs)]
impl InputSelection {
    pub fn new(
        available: Vec<InputSigningData>,
        outputs: Vec<Output>,
        remainder_address: Address,
        rent: RentStructure,
        slot_index: SlotIndex,
    ) -> Self {
        Self {
            available,
            outputs,
            remainder_address,
            rent,
            slot_index,
            required_inputs: BTreeSet::new(),
            forbidden_inputs: BTreeSet::new(),
            custom_inputs: None,
            burn: Burn::default(),
            mana_allotments: Vec::new(),
        }
    }

    pub fn with_required_inputs(mut self, inputs: impl IntoIterator<Item = OutputId>) -> Self {
        self.required_inputs.extend(inputs);
        self
    }

    pub fn with_forbidden_inputs(mut self, inputs: impl IntoIterator<Item = OutputId>) -> Self {
        self.forbidden_inputs.extend(inputs);
        self
    }

    /// Consumes exactly these inputs (plus the required ones) and nothing else.
    pub fn with_custom_inputs(mut self, inputs: impl IntoIterator<Item = OutputId>) -> Self {
        self.custom_inputs = Some(inputs.into_iter().collect());
        self
    }

    pub fn with_burn(mut self, burn: Burn) -> Self {
        self.burn = burn;
        self
    }

    pub fn with_mana_allotments(mut self, allotments: impl IntoIterator<Item = ManaAllotment>) -> Self {
        self.mana_allotments.extend(allotments);
        self
    }

    /// Runs the selection.
    pub fn select(self) -> Result<Selected, SelectionError> {
        for output in &self.outputs {
            output.verify_storage_deposit(&self.rent)?;
        }

        let mut selected = Vec::new();
        match &self.custom_inputs {
            Some(custom) => {
                for output_id in custom.iter().chain(&self.required_inputs) {
                    self.select_by_id(&mut selected, *output_id)?;
                }
            }
            None => {
                for output_id in &self.required_inputs {
                    self.select_by_id(&mut selected, *output_id)?;
                }
                for chain_id in self.required_chains() {
                    if let Some(input) = self.available.iter().find(|i| i.chain_id() == Some(chain_id)) {
                        Self::push(&mut selected, input);
                    }
                }
            }
        }

        loop {
            let totals = self.totals(&selected)?;

            if let Some((token_id, found, required)) = totals.token_deficit() {
                match self.token_candidate(&selected, token_id) {
                    Some(input) => Self::push(&mut selected, &input),
                    None => {
                        return Err(SelectionError::insufficient(
                            format!("native token {token_id}"),
                            found,
                            required,
                        ));
                    }
                }
                continue;
            }

            if totals.mana_out > totals.mana_in {
                match self.mana_candidate(&selected) {
                    Some(input) => Self::push(&mut selected, &input),
                    None => return Err(SelectionError::insufficient("mana", totals.mana_in, totals.mana_out)),
                }
                continue;
            }

            let token_surplus = totals.token_surplus();
            let needs_remainder =
                !token_surplus.is_empty() || totals.mana_in > totals.mana_out || totals.base_in > totals.base_out;
            let deposit = if !token_surplus.is_empty() {
                token_surplus.iter().try_fold(0, |sum, (token_id, amount)| {
                    add(sum, self.rent.rent_cost(&self.remainder(0, Some((*token_id, *amount)), 0)?))
                })?
            } else if needs_remainder {
                self.rent.rent_cost(&self.remainder(0, None, 0)?)
            } else {
                0
            };
            let required = add(totals.base_out, deposit)?;
            if totals.base_in < required {
                match self.base_candidate(&selected) {
                    Some(input) => Self::push(&mut selected, &input),
                    None => return Err(SelectionError::insufficient("base coin", totals.base_in, required)),
                }
                continue;
            }

            let remainders = self.remainders(&totals, token_surplus)?;
            let mut outputs = self.outputs.clone();
            outputs.extend(remainders.iter().map(|r| r.output.clone()));
            let inputs = self.order_inputs(selected, &outputs);
            debug!(
                "Selected {} inputs for {} outputs with {} remainders.",
                inputs.len(),
                self.outputs.len(),
                remainders.len()
            );
            return Ok(Selected {
                inputs,
                outputs,
                remainders,
            });
        }
    }

    fn push(selected: &mut Vec<InputSigningData>, input: &InputSigningData) {
        if !selected.iter().any(|s| s.output_id() == input.output_id()) {
            selected.push(input.clone());
        }
    }

    fn select_by_id(&self, selected: &mut Vec<InputSigningData>, output_id: OutputId) -> Result<(), SelectionError> {
        let input = self
            .available
            .iter()
            .find(|i| i.output_id() == output_id)
            .ok_or(ValidationError::MissingInput(output_id))?;
        Self::push(selected, input);
        Ok(())
    }

    /// Chains whose current state has to be consumed.
    fn required_chains(&self) -> Vec<ChainId> {
        let mut chains = Vec::new();
        for output in &self.outputs {
            match output.chain_id() {
                Some(ChainId::Foundry(foundry_id)) => {
                    if let Output::Foundry(foundry) = output {
                        chains.push(ChainId::Account(*foundry.account_address().account_id()));
                    }
                    chains.push(ChainId::Foundry(foundry_id));
                }
                Some(chain_id) if !chain_id.is_null() => chains.push(chain_id),
                _ => (),
            }
        }
        for chain_id in self.burn.chains() {
            if let ChainId::Foundry(foundry_id) = chain_id {
                chains.push(ChainId::Account(*foundry_id.account_address().account_id()));
            }
            chains.push(chain_id);
        }
        chains
    }

    fn is_selectable(&self, selected: &[InputSigningData], input: &InputSigningData) -> bool {
        let output = &input.output.output;
        self.custom_inputs.is_none()
            && matches!(output, Output::Basic(_))
            && output.storage_deposit_return().is_none()
            && output.expiration().is_none()
            && !output.is_time_locked(self.slot_index)
            && output.owning_address().map_or(false, |a| a.is_ed25519())
            && !self.forbidden_inputs.contains(&input.output_id())
            && !selected.iter().any(|s| s.output_id() == input.output_id())
    }

    fn candidates<'a>(&'a self, selected: &'a [InputSigningData]) -> impl Iterator<Item = &'a InputSigningData> + 'a {
        self.available.iter().filter(move |i| self.is_selectable(selected, i))
    }

    fn base_candidate(&self, selected: &[InputSigningData]) -> Option<InputSigningData> {
        self.candidates(selected)
            .min_by_key(|i| (Reverse(i.output.amount()), i.output_id()))
            .cloned()
    }

    fn token_candidate(&self, selected: &[InputSigningData], token_id: TokenId) -> Option<InputSigningData> {
        self.candidates(selected)
            .filter_map(|i| match i.output.output.native_token() {
                Some(token) if token.token_id == token_id => Some((token.amount, i)),
                _ => None,
            })
            .min_by_key(|(amount, i)| (Reverse(*amount), i.output_id()))
            .map(|(_, i)| i.clone())
    }

    fn mana_candidate(&self, selected: &[InputSigningData]) -> Option<InputSigningData> {
        self.candidates(selected)
            .filter(|i| i.output.output.mana() > 0)
            .min_by_key(|i| (Reverse(i.output.output.mana()), i.output_id()))
            .cloned()
    }

    fn totals(&self, selected: &[InputSigningData]) -> Result<Totals, ValidationError> {
        let consumed = selected.iter().map(|i| i.output.clone()).collect::<Vec<OutputWithMetadata>>();
        let mut totals = Totals::default();
        for input in &consumed {
            totals.base_in = add(totals.base_in, input.amount())?;
            totals.mana_in = add(totals.mana_in, input.output.mana())?;
        }
        for output in &self.outputs {
            totals.base_out = add(totals.base_out, output.amount())?;
            totals.mana_out = add(totals.mana_out, output.mana())?;
        }
        for allotment in &self.mana_allotments {
            totals.mana_out = add(totals.mana_out, allotment.mana)?;
        }
        totals.tokens_in = native_token_sums(consumed.iter().map(|i| &i.output))?;
        totals.tokens_out = native_token_sums(&self.outputs)?;
        for (token_id, change) in supply_changes(&consumed, &self.outputs) {
            add_tokens(&mut totals.tokens_in, token_id, change.minted)?;
            add_tokens(&mut totals.tokens_out, token_id, change.melted)?;
        }
        for (token_id, amount) in &self.burn.native_tokens {
            add_tokens(&mut totals.tokens_out, *token_id, *amount)?;
        }
        Ok(totals)
    }

    fn remainder(&self, amount: u64, token: Option<(TokenId, U256)>, mana: u64) -> Result<Output, ValidationError> {
        let builder = BasicOutputBuilder::new_with_amount(amount)
            .with_mana(mana)
            .add_unlock_condition(AddressUnlockCondition::new(self.remainder_address));
        let builder = match token {
            Some((token_id, amount)) => builder.with_native_token(NativeToken::new(token_id, amount)?),
            None => builder,
        };
        builder.finish_output()
    }

    fn remainders(
        &self,
        totals: &Totals,
        token_surplus: BTreeMap<TokenId, U256>,
    ) -> Result<Vec<RemainderData>, ValidationError> {
        let mut base_surplus = totals.base_in - totals.base_out;
        let mana_surplus = totals.mana_in - totals.mana_out;
        let mut outputs = Vec::new();
        if token_surplus.is_empty() {
            if base_surplus > 0 || mana_surplus > 0 {
                outputs.push(self.remainder(base_surplus, None, mana_surplus)?);
            }
        } else {
            for (token_id, amount) in &token_surplus {
                let output = self.remainder(0, Some((*token_id, *amount)), 0)?;
                let deposit = self.rent.rent_cost(&output);
                base_surplus -= deposit;
                outputs.push(output.with_amount(deposit));
            }
            // The leftover base coin and mana go on the first remainder.
            if let Some((token_id, amount)) = token_surplus.into_iter().next() {
                let first = outputs[0].amount() + base_surplus;
                outputs[0] = self.remainder(first, Some((token_id, amount)), mana_surplus)?;
            }
        }
        Ok(outputs
            .into_iter()
            .map(|output| RemainderData {
                output,
                address: self.remainder_address,
            })
            .collect())
    }

    /// Places every input owned by an account or NFT after the input that carries the chain.
    fn order_inputs(&self, selected: Vec<InputSigningData>, outputs: &[Output]) -> Vec<InputSigningData> {
        let chain_addresses = selected
            .iter()
            .filter_map(|i| i.chain_id().and_then(|c| c.to_address()).map(|a| (a, i.output_id())))
            .collect::<BTreeMap<_, _>>();
        let mut pending = selected;
        let mut ordered = Vec::<InputSigningData>::with_capacity(pending.len());
        while !pending.is_empty() {
            let (ready, blocked): (Vec<_>, Vec<_>) = pending.into_iter().partition(|input| {
                match required_address(&input.output, outputs, self.slot_index)
                    .and_then(|address| chain_addresses.get(&address))
                {
                    Some(owner) => *owner == input.output_id() || ordered.iter().any(|i| i.output_id() == *owner),
                    None => true,
                }
            });
            if ready.is_empty() {
                // Ownership cycle, which the ledger rejects anyway.
                ordered.extend(blocked);
                break;
            }
            ordered.extend(ready);
            pending = blocked;
        }
        ordered
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        client::Bip44Chain,
        model::{
            ledger::OutputMetadata,
            utxo::{
                AccountAddress, Ed25519Address, NftAddress, NftOutputBuilder, TimelockUnlockCondition, TransactionId,
            },
            BlockId,
        },
    };

    fn owner() -> Address {
        Ed25519Address::new([1; 32]).into()
    }

    fn output_id(index: u16) -> OutputId {
        OutputId::new(TransactionId::new([5; 32]), index)
    }

    fn input(index: u16, output: Output) -> InputSigningData {
        InputSigningData {
            output: OutputWithMetadata {
                output,
                metadata: OutputMetadata {
                    output_id: output_id(index),
                    block_id: BlockId::null(),
                    booked: SlotIndex(1),
                    spent: None,
                },
            },
            chain: Some(Bip44Chain::new(Bip44Chain::SHIMMER_COIN_TYPE)),
        }
    }

    fn basic(amount: u64) -> Output {
        BasicOutputBuilder::new_with_amount(amount)
            .add_unlock_condition(AddressUnlockCondition::new(owner()))
            .finish_output()
            .unwrap()
    }

    fn token_id() -> TokenId {
        FoundryId::build(&AccountAddress(AccountId::new([2; 32])), 1, 0).into()
    }

    fn with_token(amount: u64, tokens: u64) -> Output {
        BasicOutputBuilder::new_with_amount(amount)
            .add_unlock_condition(AddressUnlockCondition::new(owner()))
            .with_native_token(NativeToken::new(token_id(), U256::from(tokens)).unwrap())
            .finish_output()
            .unwrap()
    }

    fn selection(available: Vec<InputSigningData>, outputs: Vec<Output>) -> InputSelection {
        InputSelection::new(available, outputs, owner(), RentStructure::default(), SlotIndex(10))
    }

    fn ids(selected: &Selected) -> Vec<OutputId> {
        selected.inputs.iter().map(InputSigningData::output_id).collect()
    }

    #[test]
    fn largest_input_first_with_remainder() {
        let available = vec![input(0, basic(100_000)), input(1, basic(1_000_000)), input(2, basic(500_000))];
        let selected = selection(available, vec![basic(400_000)]).select().unwrap();
        assert_eq!(ids(&selected), vec![output_id(1)]);
        assert_eq!(selected.remainders.len(), 1);
        assert_eq!(selected.remainders[0].output.amount(), 600_000);
        assert_eq!(selected.outputs.len(), 2);
    }

    #[test]
    fn ties_prefer_the_lower_output_id() {
        let available = vec![input(3, basic(500_000)), input(1, basic(500_000))];
        let selected = selection(available, vec![basic(500_000)]).select().unwrap();
        assert_eq!(ids(&selected), vec![output_id(1)]);
        assert!(selected.remainders.is_empty());
    }

    #[test]
    fn small_surplus_pulls_another_input() {
        let available = vec![input(0, basic(450_000)), input(1, basic(100_000))];
        let selected = selection(available, vec![basic(430_000)]).select().unwrap();
        assert_eq!(ids(&selected), vec![output_id(0), output_id(1)]);
        assert_eq!(selected.remainders[0].output.amount(), 120_000);
    }

    #[test]
    fn reports_insufficient_funds() {
        let available = vec![input(0, basic(100_000)), input(1, basic(200_000))];
        let err = selection(available, vec![basic(400_000)]).select().unwrap_err();
        assert_eq!(
            err,
            SelectionError::InsufficientFunds {
                asset: "base coin".to_owned(),
                found: "300000".to_owned(),
                required: "400000".to_owned(),
            }
        );
    }

    #[test]
    fn skips_locked_and_forbidden_inputs() {
        let locked = BasicOutputBuilder::new_with_amount(2_000_000)
            .add_unlock_condition(AddressUnlockCondition::new(owner()))
            .add_unlock_condition(TimelockUnlockCondition::new(SlotIndex(100)))
            .finish_output()
            .unwrap();
        let available = vec![input(0, locked), input(1, basic(1_500_000)), input(2, basic(1_000_000))];
        let selected = selection(available, vec![basic(400_000)])
            .with_forbidden_inputs([output_id(1)])
            .select()
            .unwrap();
        assert_eq!(ids(&selected), vec![output_id(2)]);
    }

    #[test]
    fn token_surplus_gets_its_own_remainder() {
        let available = vec![input(0, basic(1_000_000)), input(1, with_token(100_000, 70))];
        let selected = selection(available, vec![with_token(100_000, 30)]).select().unwrap();
        assert_eq!(ids(&selected), vec![output_id(1), output_id(0)]);
        assert_eq!(selected.remainders.len(), 1);
        let remainder = &selected.remainders[0].output;
        assert_eq!(remainder.native_token().map(|t| t.amount), Some(U256::from(40u64)));
        assert_eq!(remainder.amount(), 1_000_000);
    }

    #[test]
    fn missing_tokens_are_insufficient() {
        let available = vec![input(0, basic(1_000_000)), input(1, with_token(100_000, 20))];
        let err = selection(available, vec![with_token(100_000, 30)]).select().unwrap_err();
        assert!(matches!(
            err,
            SelectionError::InsufficientFunds { found, required, .. } if found == "20" && required == "30"
        ));
    }

    #[test]
    fn custom_inputs_disable_automatic_selection() {
        let available = vec![input(0, basic(100_000)), input(1, basic(1_000_000))];
        let err = selection(available, vec![basic(400_000)])
            .with_custom_inputs([output_id(0)])
            .select()
            .unwrap_err();
        assert!(matches!(err, SelectionError::InsufficientFunds { .. }));
    }

    #[test]
    fn chain_owned_inputs_follow_their_chain() {
        let nft_id = NftId::new([4; 32]);
        let nft = NftOutputBuilder::new_with_amount(100_000, nft_id)
            .add_unlock_condition(AddressUnlockCondition::new(owner()))
            .finish_output()
            .unwrap();
        let owned_by_nft = BasicOutputBuilder::new_with_amount(200_000)
            .add_unlock_condition(AddressUnlockCondition::new(NftAddress(nft_id)))
            .finish_output()
            .unwrap();
        let available = vec![input(0, owned_by_nft), input(1, nft.clone())];
        let selected = selection(available, vec![nft, basic(200_000)])
            .with_required_inputs([output_id(0)])
            .select()
            .unwrap();
        assert_eq!(ids(&selected), vec![output_id(1), output_id(0)]);
    }

    #[test]
    fn burn_requests_capabilities() {
        let burn = Burn::default().add_native_token(token_id(), 5u64);
        assert!(burn.capabilities().has(Capabilities::BURN_NATIVE_TOKENS));
        assert!(!burn.capabilities().has(Capabilities::DESTROY_NFT_OUTPUTS));
        assert!(Burn::default().is_empty());
    }
}

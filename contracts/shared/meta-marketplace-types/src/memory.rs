//! In-memory settlement host.
//!
//! Holds ticket ownership, any number of fungible assets and a set of contract wallets. Assets
//! registered with a signing domain also accept meta-transfers and meta-approvals, checking the
//! embedded signature and nonce the way a meta-transfer capable token does.

use std::collections::{HashMap, HashSet};

use alloy_primitives::{Address, B256, U256};

use crate::crypto::ecrecover_address;
use crate::eip712::{meta_approve_digest, meta_transfer_digest, SignedDomain};
use crate::ledger::{AssetLedger, HostTransaction, LedgerError, TicketLedger, WalletValidator};
use crate::offer::{MetaApproval, MetaTransfer};

#[derive(Clone, Debug, Default)]
struct AssetState {
    /// Set for meta-transfer capable assets.
    domain: Option<SignedDomain>,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    consumed: HashSet<(Address, U256)>,
}

impl AssetState {
    fn balance(&self, owner: Address) -> U256 {
        self.balances.get(&owner).copied().unwrap_or_default()
    }

    fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances.get(&(owner, spender)).copied().unwrap_or_default()
    }

    fn debit(&mut self, owner: Address, amount: U256) -> Result<(), LedgerError> {
        let available = self.balance(owner);
        if available < amount {
            return Err(LedgerError::InsufficientBalance { needed: amount, available });
        }
        self.balances.insert(owner, available - amount);
        Ok(())
    }

    fn credit(&mut self, owner: Address, amount: U256) {
        let entry = self.balances.entry(owner).or_default();
        *entry = entry.saturating_add(amount);
    }

    fn domain(&self) -> Result<&SignedDomain, LedgerError> {
        self.domain.as_ref().ok_or(LedgerError::NotImplemented)
    }

    fn check_relay(
        &self,
        relayer: Address,
        actor_relayer: Address,
        signer: Address,
        digest: B256,
        signature: &[u8],
        nonce: U256,
        needed: U256,
    ) -> Result<(), LedgerError> {
        if actor_relayer != relayer {
            return Err(LedgerError::Rejected(format!("relayer {relayer} is not {actor_relayer}")));
        }
        match ecrecover_address(digest, signature) {
            Ok(recovered) if recovered == signer => {}
            _ => return Err(LedgerError::InvalidSignature),
        }
        if self.consumed.contains(&(signer, nonce)) {
            return Err(LedgerError::NonceConsumed { signer, nonce });
        }
        let available = self.balance(signer);
        if available < needed {
            return Err(LedgerError::InsufficientBalance { needed, available });
        }
        Ok(())
    }
}

/// Reference [`SettlementHost`](crate::ledger::SettlementHost) backed by hash maps.
#[derive(Clone, Debug, Default)]
pub struct MemoryLedger {
    owners: HashMap<U256, Address>,
    frozen: HashSet<U256>,
    assets: HashMap<Address, AssetState>,
    wallets: HashMap<Address, Address>,
    /// State saved by `begin`.
    checkpoint: Option<Box<MemoryLedger>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint_ticket(&mut self, ticket: U256, owner: Address) {
        self.owners.insert(ticket, owner);
    }

    /// Make `transfer` of `ticket` fail while `check_transfer` still passes.
    pub fn freeze_ticket(&mut self, ticket: U256) {
        self.frozen.insert(ticket);
    }

    pub fn add_asset(&mut self, asset: Address) {
        self.assets.entry(asset).or_default();
    }

    /// Register an asset that accepts meta-operations signed under `domain`.
    pub fn add_relayed_asset(&mut self, asset: Address, domain: SignedDomain) {
        self.assets.entry(asset).or_default().domain = Some(domain);
    }

    pub fn mint(&mut self, asset: Address, owner: Address, amount: U256) {
        self.assets.entry(asset).or_default().credit(owner, amount);
    }

    pub fn approve(&mut self, asset: Address, owner: Address, spender: Address, amount: U256) {
        self.assets
            .entry(asset)
            .or_default()
            .allowances
            .insert((owner, spender), amount);
    }

    /// Register a contract wallet whose signatures are made by `controller`.
    pub fn register_smart_wallet(&mut self, wallet: Address, controller: Address) {
        self.wallets.insert(wallet, controller);
    }

    pub fn balance(&self, asset: Address, owner: Address) -> U256 {
        self.assets.get(&asset).map(|a| a.balance(owner)).unwrap_or_default()
    }

    pub fn owner(&self, ticket: U256) -> Option<Address> {
        self.owners.get(&ticket).copied()
    }

    pub fn relay_nonce_consumed(&self, asset: Address, signer: Address, nonce: U256) -> bool {
        self.assets
            .get(&asset)
            .is_some_and(|a| a.consumed.contains(&(signer, nonce)))
    }

    fn asset(&self, asset: Address) -> Result<&AssetState, LedgerError> {
        self.assets.get(&asset).ok_or(LedgerError::UnknownAsset(asset))
    }

    fn asset_mut(&mut self, asset: Address) -> Result<&mut AssetState, LedgerError> {
        self.assets.get_mut(&asset).ok_or(LedgerError::UnknownAsset(asset))
    }
}

impl TicketLedger for MemoryLedger {
    fn owner_of(&self, ticket: U256) -> Result<Address, LedgerError> {
        self.owner(ticket).ok_or(LedgerError::UnknownTicket(ticket))
    }

    fn transfer(&mut self, ticket: U256, from: Address, to: Address) -> Result<(), LedgerError> {
        self.check_transfer(ticket, from, to)?;
        if self.frozen.contains(&ticket) {
            return Err(LedgerError::Rejected(format!("ticket {ticket} is frozen")));
        }
        self.owners.insert(ticket, to);
        Ok(())
    }
}

impl AssetLedger for MemoryLedger {
    fn allowance(&self, asset: Address, owner: Address, spender: Address) -> Result<U256, LedgerError> {
        Ok(self.asset(asset)?.allowance(owner, spender))
    }

    fn balance_of(&self, asset: Address, owner: Address) -> Result<U256, LedgerError> {
        Ok(self.asset(asset)?.balance(owner))
    }

    fn transfer_from(
        &mut self,
        asset: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        let state = self.asset_mut(asset)?;
        if spender != from {
            let available = state.allowance(from, spender);
            if available < amount {
                return Err(LedgerError::InsufficientAllowance { needed: amount, available });
            }
            state.debit(from, amount)?;
            if available != U256::MAX {
                state.allowances.insert((from, spender), available - amount);
            }
        } else {
            state.debit(from, amount)?;
        }
        state.credit(to, amount);
        Ok(())
    }

    fn verify_meta_transfer(
        &self,
        asset: Address,
        relayer: Address,
        transfer: &MetaTransfer,
    ) -> Result<(), LedgerError> {
        let state = self.asset(asset)?;
        let digest = meta_transfer_digest(state.domain()?, transfer)
            .map_err(|e| LedgerError::Rejected(e.to_string()))?;
        let needed = transfer
            .amount
            .checked_add(transfer.params.reward)
            .ok_or_else(|| LedgerError::Rejected("amount overflow".into()))?;
        state.check_relay(
            relayer,
            transfer.relayer,
            transfer.signer,
            digest,
            &transfer.signature,
            transfer.params.nonce,
            needed,
        )
    }

    fn accept_meta_transfer(
        &mut self,
        asset: Address,
        relayer: Address,
        transfer: &MetaTransfer,
    ) -> Result<(), LedgerError> {
        self.verify_meta_transfer(asset, relayer, transfer)?;
        let state = self.asset_mut(asset)?;
        state.consumed.insert((transfer.signer, transfer.params.nonce));
        state.debit(transfer.signer, transfer.amount + transfer.params.reward)?;
        state.credit(transfer.recipient, transfer.amount);
        state.credit(relayer, transfer.params.reward);
        Ok(())
    }

    fn verify_meta_approve(
        &self,
        asset: Address,
        relayer: Address,
        approval: &MetaApproval,
    ) -> Result<(), LedgerError> {
        let state = self.asset(asset)?;
        let digest = meta_approve_digest(state.domain()?, approval)
            .map_err(|e| LedgerError::Rejected(e.to_string()))?;
        state.check_relay(
            relayer,
            approval.relayer,
            approval.signer,
            digest,
            &approval.signature,
            approval.params.nonce,
            approval.params.reward,
        )
    }

    fn accept_meta_approve(
        &mut self,
        asset: Address,
        relayer: Address,
        approval: &MetaApproval,
    ) -> Result<(), LedgerError> {
        self.verify_meta_approve(asset, relayer, approval)?;
        let state = self.asset_mut(asset)?;
        state.consumed.insert((approval.signer, approval.params.nonce));
        state.debit(approval.signer, approval.params.reward)?;
        state.credit(relayer, approval.params.reward);
        state
            .allowances
            .insert((approval.signer, approval.spender), approval.amount);
        Ok(())
    }
}

impl HostTransaction for MemoryLedger {
    fn begin(&mut self) {
        let mut saved = self.clone();
        saved.checkpoint = None;
        self.checkpoint = Some(Box::new(saved));
    }

    fn rollback(&mut self) {
        if let Some(saved) = self.checkpoint.take() {
            *self = *saved;
        }
    }

    fn release(&mut self) {
        self.checkpoint = None;
    }
}

impl WalletValidator for MemoryLedger {
    fn is_valid_signature(&self, wallet: Address, digest: B256, signature: &[u8]) -> bool {
        match self.wallets.get(&wallet) {
            Some(controller) => ecrecover_address(digest, signature).is_ok_and(|s| s == *controller),
            None => false,
        }
    }
}

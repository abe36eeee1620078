//! Staged execution of fund movements.
//!
//! A [`StagedLedger`] reads through to the host but never writes to it. Every movement is
//! checked against host state adjusted by what the same settlement has already staged, then
//! recorded as an [`Effect`]. Committing replays the effects onto the host in order.

use std::collections::{HashMap, HashSet};

use alloy_primitives::{Address, U256};
use meta_marketplace_types::{LedgerError, MetaApproval, MetaTransfer, SettlementHost};
use serde::Serialize;

/// A host mutation planned by a settlement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Effect {
    /// `transfer_from` with the engine as spender.
    Pull {
        asset: Address,
        from: Address,
        to: Address,
        amount: U256,
    },
    MetaTransfer {
        asset: Address,
        transfer: MetaTransfer,
    },
    MetaApprove {
        asset: Address,
        approval: MetaApproval,
    },
}

pub struct StagedLedger<'a, H: SettlementHost + ?Sized> {
    host: &'a H,
    engine: Address,
    /// Allowances overwritten by staged meta-approvals, keyed by (asset, owner, spender).
    approved: HashMap<(Address, Address, Address), U256>,
    spent: HashMap<(Address, Address, Address), U256>,
    debits: HashMap<(Address, Address), U256>,
    credits: HashMap<(Address, Address), U256>,
    relay_nonces: HashSet<(Address, Address, U256)>,
    effects: Vec<Effect>,
}

impl<'a, H: SettlementHost + ?Sized> StagedLedger<'a, H> {
    /// `engine` is the spender of direct pulls and the relayer of meta-operations.
    pub fn new(host: &'a H, engine: Address) -> Self {
        Self {
            host,
            engine,
            approved: HashMap::new(),
            spent: HashMap::new(),
            debits: HashMap::new(),
            credits: HashMap::new(),
            relay_nonces: HashSet::new(),
            effects: Vec::new(),
        }
    }

    pub fn engine(&self) -> Address {
        self.engine
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn into_effects(self) -> Vec<Effect> {
        self.effects
    }

    pub fn allowance(&self, asset: Address, owner: Address, spender: Address) -> Result<U256, LedgerError> {
        let key = (asset, owner, spender);
        let base = match self.approved.get(&key) {
            Some(amount) => *amount,
            None => self.host.allowance(asset, owner, spender)?,
        };
        let spent = self.spent.get(&key).copied().unwrap_or_default();
        Ok(base.saturating_sub(spent))
    }

    pub fn balance(&self, asset: Address, owner: Address) -> Result<U256, LedgerError> {
        let key = (asset, owner);
        let base = self.host.balance_of(asset, owner)?;
        let credit = self.credits.get(&key).copied().unwrap_or_default();
        let debit = self.debits.get(&key).copied().unwrap_or_default();
        Ok(base.saturating_add(credit).saturating_sub(debit))
    }

    /// Stage an allowance pull of `amount` from `from` to `to`.
    pub fn pull(&mut self, asset: Address, from: Address, to: Address, amount: U256) -> Result<(), LedgerError> {
        let allowance = self.allowance(asset, from, self.engine)?;
        if allowance < amount {
            return Err(LedgerError::InsufficientAllowance { needed: amount, available: allowance });
        }
        self.ensure_balance(asset, from, amount)?;

        *self.spent.entry((asset, from, self.engine)).or_default() += amount;
        self.move_funds(asset, from, to, amount);
        self.effects.push(Effect::Pull { asset, from, to, amount });
        Ok(())
    }

    /// Stage a buyer-signed meta-transfer relayed by the engine.
    pub fn meta_transfer(&mut self, asset: Address, transfer: MetaTransfer) -> Result<(), LedgerError> {
        self.host.verify_meta_transfer(asset, self.engine, &transfer)?;
        self.check_relay_nonce(asset, transfer.signer, transfer.params.nonce)?;
        let needed = transfer
            .amount
            .checked_add(transfer.params.reward)
            .ok_or_else(|| LedgerError::Rejected("amount overflow".into()))?;
        self.ensure_balance(asset, transfer.signer, needed)?;

        self.relay_nonces.insert((asset, transfer.signer, transfer.params.nonce));
        self.move_funds(asset, transfer.signer, transfer.recipient, transfer.amount);
        self.move_funds(asset, transfer.signer, self.engine, transfer.params.reward);
        self.effects.push(Effect::MetaTransfer { asset, transfer });
        Ok(())
    }

    /// Stage a buyer-signed meta-approval relayed by the engine. Overwrites the allowance.
    pub fn meta_approve(&mut self, asset: Address, approval: MetaApproval) -> Result<(), LedgerError> {
        self.host.verify_meta_approve(asset, self.engine, &approval)?;
        self.check_relay_nonce(asset, approval.signer, approval.params.nonce)?;
        self.ensure_balance(asset, approval.signer, approval.params.reward)?;

        let key = (asset, approval.signer, approval.spender);
        self.relay_nonces.insert((asset, approval.signer, approval.params.nonce));
        self.approved.insert(key, approval.amount);
        self.spent.remove(&key);
        self.move_funds(asset, approval.signer, self.engine, approval.params.reward);
        self.effects.push(Effect::MetaApprove { asset, approval });
        Ok(())
    }

    fn check_relay_nonce(&self, asset: Address, signer: Address, nonce: U256) -> Result<(), LedgerError> {
        if self.relay_nonces.contains(&(asset, signer, nonce)) {
            return Err(LedgerError::NonceConsumed { signer, nonce });
        }
        Ok(())
    }

    fn ensure_balance(&self, asset: Address, owner: Address, needed: U256) -> Result<(), LedgerError> {
        let available = self.balance(asset, owner)?;
        if available < needed {
            return Err(LedgerError::InsufficientBalance { needed, available });
        }
        Ok(())
    }

    fn move_funds(&mut self, asset: Address, from: Address, to: Address, amount: U256) {
        if amount.is_zero() {
            return;
        }
        *self.debits.entry((asset, from)).or_default() += amount;
        *self.credits.entry((asset, to)).or_default() += amount;
    }
}

/// Replay staged effects onto the host, in order.
pub fn apply_effects<H: SettlementHost + ?Sized>(
    host: &mut H,
    engine: Address,
    effects: &[Effect],
) -> Result<(), LedgerError> {
    for effect in effects {
        match effect {
            Effect::Pull { asset, from, to, amount } => host.transfer_from(*asset, engine, *from, *to, *amount)?,
            Effect::MetaTransfer { asset, transfer } => host.accept_meta_transfer(*asset, engine, transfer)?,
            Effect::MetaApprove { asset, approval } => host.accept_meta_approve(*asset, engine, approval)?,
        }
    }
    Ok(())
}

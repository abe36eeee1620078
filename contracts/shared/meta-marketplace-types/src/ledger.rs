use alloy_primitives::{Address, B256, U256};
use thiserror::Error;

use crate::offer::{MetaApproval, MetaTransfer};

/// Errors reported by the external ledgers.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("unknown ticket {0}")]
    UnknownTicket(U256),
    #[error("{from} does not own ticket {ticket}")]
    NotTicketOwner { ticket: U256, from: Address },
    #[error("unknown asset {0}")]
    UnknownAsset(Address),
    #[error("insufficient allowance: need {needed}, have {available}")]
    InsufficientAllowance { needed: U256, available: U256 },
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: U256, available: U256 },
    /// A meta-operation signature did not verify.
    #[error("invalid signer")]
    InvalidSignature,
    #[error("nonce {nonce} already consumed for {signer}")]
    NonceConsumed { signer: Address, nonce: U256 },
    /// Used by hosts that only carry part of the interface.
    #[error("operation not implemented by this ledger")]
    NotImplemented,
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Ticket ownership ledger.
pub trait TicketLedger {
    fn owner_of(&self, ticket: U256) -> Result<Address, LedgerError>;

    /// Read-only pre-check that `transfer` would succeed.
    fn check_transfer(&self, ticket: U256, from: Address, _to: Address) -> Result<(), LedgerError> {
        if self.owner_of(ticket)? != from {
            return Err(LedgerError::NotTicketOwner { ticket, from });
        }
        Ok(())
    }

    fn transfer(&mut self, ticket: U256, from: Address, to: Address) -> Result<(), LedgerError>;
}

/// Fungible asset ledgers, keyed by asset address.
///
/// Plain tokens implement the allowance methods only; meta-transfer capable tokens also
/// implement the `*_meta_*` family, which validates the embedded signature and nonce itself.
pub trait AssetLedger {
    fn allowance(&self, asset: Address, owner: Address, spender: Address) -> Result<U256, LedgerError>;

    fn balance_of(&self, asset: Address, owner: Address) -> Result<U256, LedgerError>;

    fn transfer_from(
        &mut self,
        asset: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError>;

    /// Validate a meta-transfer without applying it.
    fn verify_meta_transfer(
        &self,
        _asset: Address,
        _relayer: Address,
        _transfer: &MetaTransfer,
    ) -> Result<(), LedgerError> {
        Err(LedgerError::NotImplemented)
    }

    fn accept_meta_transfer(
        &mut self,
        _asset: Address,
        _relayer: Address,
        _transfer: &MetaTransfer,
    ) -> Result<(), LedgerError> {
        Err(LedgerError::NotImplemented)
    }

    /// Validate a meta-approval without applying it.
    fn verify_meta_approve(
        &self,
        _asset: Address,
        _relayer: Address,
        _approval: &MetaApproval,
    ) -> Result<(), LedgerError> {
        Err(LedgerError::NotImplemented)
    }

    fn accept_meta_approve(
        &mut self,
        _asset: Address,
        _relayer: Address,
        _approval: &MetaApproval,
    ) -> Result<(), LedgerError> {
        Err(LedgerError::NotImplemented)
    }
}

/// Signature checking capability of contract wallets.
pub trait WalletValidator {
    fn is_valid_signature(&self, wallet: Address, digest: B256, signature: &[u8]) -> bool;
}

/// Undo scope around a commit.
///
/// The engine calls `begin` before replaying a plan, then `release` once every mutation landed
/// or `rollback` to restore the ledgers to their state at `begin`.
pub trait HostTransaction {
    fn begin(&mut self);

    fn rollback(&mut self);

    fn release(&mut self);
}

/// Everything the settlement engine needs from its host.
pub trait SettlementHost: TicketLedger + AssetLedger + WalletValidator + HostTransaction {}

impl<T: TicketLedger + AssetLedger + WalletValidator + HostTransaction> SettlementHost for T {}

//! Shared types for the ticket settlement engine and its off-chain tooling.

pub mod crypto;
pub mod eip712;
pub mod ledger;
#[cfg(feature = "test-helpers")]
pub mod memory;
pub mod offer;

pub use crypto::{address_of, ecrecover_address, RecoverError};
pub use eip712::{SignedDomain, TypedDataError};
pub use ledger::{
    AssetLedger, HostTransaction, LedgerError, SettlementHost, TicketLedger, WalletValidator,
};
#[cfg(feature = "test-helpers")]
pub use memory::MemoryLedger;
pub use offer::{
    Auction, MetaApproval, MetaTransfer, Offer, PaymentLeg, PaymentMode, RelayParams, RelayPayload,
    RestrictedOffer, RestrictedRail, ApprovalPayload, WalletMode,
};

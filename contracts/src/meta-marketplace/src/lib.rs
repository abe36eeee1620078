//! Offer verification and atomic settlement for a signed-offer ticket marketplace.
//!
//! A seller and a buyer sign an offer off-chain; a relayer submits it as
//! `(addr[], nums[], bdata)`. [`MetaMarketplace`] decodes it, checks ownership, replay and both
//! signatures, stages every payment leg against the host's ledgers and only then commits the
//! fund movements, the ticket transfer and the nonce increment together.

pub mod config;
pub mod decoder;
pub mod engine;
pub mod errors;
pub mod nonce;
pub mod payments;
pub mod restricted;
pub mod signer;
pub mod staging;
pub mod utils;

pub use config::{ConfigError, MarketplaceConfig, RestrictedCurrencies};
pub use engine::{MetaMarketplace, SettlementPlan};
pub use errors::{ErrorKind, SettlementError};
pub use nonce::NonceRegistry;
pub use staging::Effect;

pub use meta_marketplace_types as types;

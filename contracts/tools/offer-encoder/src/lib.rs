//! Off-chain tooling for the marketplace: builds wire arguments and signs offers.

pub mod encoder;
pub mod types;


pub use encoder::{
    currencies_and_prices, encode_offer, encode_restricted_offer, sign_digest, sign_marketplace_offer,
    sign_meta_approve, sign_meta_transfer, sign_offer, sign_relay_leg, sign_restricted_approval,
    sign_restricted_offer, signer_address, SignError,
};
pub use types::{LegDraft, OfferDraft, RestrictedWire, WireOffer};

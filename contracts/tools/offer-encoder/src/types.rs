use alloy_primitives::{Address, Bytes, U256};
use meta_marketplace_types::{
    Offer, PaymentLeg, PaymentMode, RelayParams, RelayPayload, RestrictedRail, SignedDomain,
    WalletMode,
};
use serde::{Deserialize, Serialize};

fn external_account() -> WalletMode {
    WalletMode::ExternalAccount
}

/// One payment leg as authored off-chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegDraft {
    pub mode: PaymentMode,
    pub asset: Address,
    pub price: U256,
    /// Meta-transfer parameters; relayed legs only.
    #[serde(default)]
    pub relay: Option<RelayParams>,
    /// Signing domain of the asset, needed to sign a relayed leg.
    #[serde(default)]
    pub asset_domain: Option<SignedDomain>,
    /// Buyer's meta-transfer signature; relayed legs only.
    #[serde(default)]
    pub relay_signature: Bytes,
}

impl LegDraft {
    pub fn direct(asset: Address, price: U256) -> Self {
        Self {
            mode: PaymentMode::Direct,
            asset,
            price,
            relay: None,
            asset_domain: None,
            relay_signature: Bytes::new(),
        }
    }

    pub fn relayed(asset: Address, price: U256, params: RelayParams, asset_domain: SignedDomain) -> Self {
        Self {
            mode: PaymentMode::Relayed,
            asset,
            price,
            relay: Some(params),
            asset_domain: Some(asset_domain),
            relay_signature: Bytes::new(),
        }
    }
}

/// A marketplace offer being assembled by seller and buyer tooling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferDraft {
    pub seller: Address,
    pub buyer: Address,
    pub ticket: U256,
    pub nonce: u64,
    #[serde(default = "external_account")]
    pub buyer_mode: WalletMode,
    #[serde(default = "external_account")]
    pub seller_mode: WalletMode,
    pub legs: Vec<LegDraft>,
    #[serde(default)]
    pub buyer_signature: Bytes,
    #[serde(default)]
    pub seller_signature: Bytes,
}

impl OfferDraft {
    pub fn new(seller: Address, buyer: Address, ticket: U256, nonce: u64, legs: Vec<LegDraft>) -> Self {
        Self {
            seller,
            buyer,
            ticket,
            nonce,
            buyer_mode: WalletMode::ExternalAccount,
            seller_mode: WalletMode::ExternalAccount,
            legs,
            buyer_signature: Bytes::new(),
            seller_signature: Bytes::new(),
        }
    }

    /// The offer as the engine decodes it.
    pub fn to_offer(&self) -> Offer {
        let payments = self
            .legs
            .iter()
            .map(|leg| PaymentLeg {
                mode: leg.mode,
                asset: leg.asset,
                price: leg.price,
                relay: match leg.mode {
                    PaymentMode::Direct => None,
                    PaymentMode::Relayed => Some(RelayPayload {
                        params: leg.relay.unwrap_or_default(),
                        signature: leg.relay_signature.clone(),
                    }),
                },
            })
            .collect();
        Offer {
            seller: self.seller,
            buyer: self.buyer,
            ticket: self.ticket,
            nonce: self.nonce,
            buyer_mode: self.buyer_mode,
            seller_mode: self.seller_mode,
            payments,
            buyer_signature: self.buyer_signature.clone(),
            seller_signature: self.seller_signature.clone(),
        }
    }
}

/// `(addr, nums, bdata)` as submitted to `verify` and `seal`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireOffer {
    pub addr: Vec<Address>,
    pub nums: Vec<U256>,
    pub bdata: Bytes,
}

/// Arguments of `check_restricted_offer` and `seal_restricted_offer`, caller excluded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictedWire {
    pub rail: RestrictedRail,
    pub actors: Vec<Address>,
    pub nums: Vec<U256>,
    pub relay_nums: Vec<U256>,
    pub bdata: Bytes,
}

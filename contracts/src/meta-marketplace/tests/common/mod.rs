#![allow(dead_code)]

use alloy_primitives::{Address, U256};
use k256::ecdsa::SigningKey;
use meta_marketplace::{MarketplaceConfig, MetaMarketplace, RestrictedCurrencies};
use meta_marketplace_types::{MemoryLedger, RelayParams, SignedDomain};
use offer_encoder::{encode_offer, sign_offer, signer_address, LegDraft, OfferDraft, WireOffer};

pub const CHAIN_ID: u64 = 31337;

pub struct Party {
    pub key: SigningKey,
    pub address: Address,
}

pub fn party(seed: u8) -> Party {
    let key = SigningKey::from_slice(&[seed; 32]).unwrap();
    let address = signer_address(&key);
    Party { key, address }
}

pub fn engine_address() -> Address {
    Address::repeat_byte(0xee)
}

pub fn token_a() -> Address {
    Address::repeat_byte(0xa1)
}

pub fn token_d() -> Address {
    Address::repeat_byte(0xd1)
}

pub fn relayed_token() -> Address {
    Address::repeat_byte(0xd2)
}

pub fn relayed_domain() -> SignedDomain {
    SignedDomain::new("ERC2280Mock", "1", CHAIN_ID, relayed_token())
}

pub fn domain() -> SignedDomain {
    SignedDomain::marketplace(CHAIN_ID, engine_address())
}

pub fn u(v: u64) -> U256 {
    U256::from(v)
}

pub fn relay_params(nonce: u64) -> RelayParams {
    RelayParams { nonce: u(nonce), ..RelayParams::default() }
}

pub struct Scenario {
    pub host: MemoryLedger,
    pub engine: MetaMarketplace,
    pub seller: Party,
    pub buyer: Party,
    pub ticket: U256,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl Scenario {
    /// Ticket #1 owned by the seller; plain tokens A and D, relayed token registered, nothing funded.
    pub fn new() -> Self {
        init_tracing();
        let seller = party(1);
        let buyer = party(2);
        let ticket = u(1);

        let mut host = MemoryLedger::new();
        host.mint_ticket(ticket, seller.address);
        host.add_asset(token_a());
        host.add_asset(token_d());
        host.add_relayed_asset(relayed_token(), relayed_domain());

        let config = MarketplaceConfig::new(domain()).with_restricted(RestrictedCurrencies {
            direct: token_d(),
            relayed: relayed_token(),
        });
        let engine = MetaMarketplace::new(config).unwrap();
        Self { host, engine, seller, buyer, ticket }
    }

    /// Mint `amount` of `asset` to the buyer and approve the engine for `allowance`.
    pub fn fund(&mut self, asset: Address, amount: u64, allowance: u64) {
        self.host.mint(asset, self.buyer.address, u(amount));
        self.host.approve(asset, self.buyer.address, engine_address(), u(allowance));
    }

    pub fn draft(&self, legs: Vec<LegDraft>) -> OfferDraft {
        OfferDraft::new(self.seller.address, self.buyer.address, self.ticket, self.engine.current_nonce(self.ticket), legs)
    }

    /// Sign with both parties and encode.
    pub fn signed(&self, mut draft: OfferDraft) -> WireOffer {
        sign_offer(&domain(), &mut draft, &self.buyer.key, &self.seller.key).unwrap();
        encode_offer(&draft)
    }

    pub fn two_direct_legs(&self) -> WireOffer {
        self.signed(self.draft(vec![
            LegDraft::direct(token_a(), u(100)),
            LegDraft::direct(token_d(), u(100)),
        ]))
    }

    pub fn balance(&self, asset: Address, who: Address) -> U256 {
        self.host.balance(asset, who)
    }
}

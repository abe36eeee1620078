//! Hand-built digests against alloy's `sol!` EIP-712 implementation.

mod common;

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{eip712_domain, sol, Eip712Domain, SolStruct};
use common::*;
use meta_marketplace::types::{
    eip712::{marketplace_offer_digest, meta_approve_digest, meta_transfer_digest, restricted_offer_digest},
    MetaApproval, MetaTransfer, RestrictedRail,
};
use offer_encoder::LegDraft;

sol! {
    struct MarketplaceOffer {
        address buyer;
        address seller;
        uint256 ticket;
        uint256 nonce;
        bytes currencies;
        bytes prices;
    }

    struct Auction {
        address seller;
        address buyer;
        address relayer;
        uint256 ticket;
        uint256 nonce;
    }

    struct DaiOffer {
        Auction auction;
        uint256 amount;
        uint256 reward;
    }

    struct DaiPlusOffer {
        Auction auction;
        uint256 amount;
        uint256 reward;
    }

    struct Actors {
        address signer;
        address relayer;
    }

    struct TxParams {
        uint256 nonce;
        uint256 gasLimit;
        uint256 gasPrice;
        uint256 reward;
    }

    struct Transfer {
        address recipient;
        uint256 amount;
        Actors actors;
        TxParams txparams;
    }

    struct Approve {
        address spender;
        uint256 amount;
        Actors actors;
        TxParams txparams;
    }
}

fn marketplace_domain() -> Eip712Domain {
    eip712_domain! {
        name: "MetaMarketplace",
        version: "0",
        chain_id: CHAIN_ID,
        verifying_contract: engine_address(),
    }
}

fn asset_domain() -> Eip712Domain {
    eip712_domain! {
        name: "ERC2280Mock",
        version: "1",
        chain_id: CHAIN_ID,
        verifying_contract: relayed_token(),
    }
}

fn sol_auction(s: &Scenario, relayer: Address) -> Auction {
    Auction {
        seller: s.seller.address,
        buyer: s.buyer.address,
        relayer,
        ticket: s.ticket,
        nonce: u(4),
    }
}

fn params() -> meta_marketplace::types::RelayParams {
    meta_marketplace::types::RelayParams { nonce: u(7), gas_limit: u(50_000), gas_price: u(3), reward: u(2) }
}

fn sol_params() -> TxParams {
    let p = params();
    TxParams { nonce: p.nonce, gasLimit: p.gas_limit, gasPrice: p.gas_price, reward: p.reward }
}

#[test]
fn test_domain_separator() {
    assert_eq!(domain().separator().unwrap(), marketplace_domain().separator());
    assert_eq!(relayed_domain().separator().unwrap(), asset_domain().separator());
}

#[test]
fn test_marketplace_offer_digest() {
    let s = Scenario::new();
    let offer = s
        .draft(vec![
            LegDraft::direct(token_a(), u(100)),
            LegDraft::relayed(relayed_token(), u(25), params(), relayed_domain()),
        ])
        .to_offer();

    let expected = MarketplaceOffer {
        buyer: offer.buyer,
        seller: offer.seller,
        ticket: offer.ticket,
        nonce: u(offer.nonce),
        currencies: Bytes::from(offer.currencies()),
        prices: Bytes::from(offer.prices()),
    }
    .eip712_signing_hash(&marketplace_domain());
    assert_eq!(marketplace_offer_digest(&domain(), &offer).unwrap(), expected);
}

#[test]
fn test_restricted_offer_digests() {
    let s = Scenario::new();
    let relayer = party(3).address;
    let auction = meta_marketplace::types::Auction {
        seller: s.seller.address,
        buyer: s.buyer.address,
        relayer,
        ticket: s.ticket,
        nonce: 4,
    };

    let direct = DaiOffer { auction: sol_auction(&s, relayer), amount: u(100), reward: u(10) }
        .eip712_signing_hash(&marketplace_domain());
    assert_eq!(
        restricted_offer_digest(&domain(), RestrictedRail::Direct, &auction, u(100), u(10)).unwrap(),
        direct
    );

    let relayed = DaiPlusOffer { auction: sol_auction(&s, relayer), amount: u(100), reward: u(10) }
        .eip712_signing_hash(&marketplace_domain());
    assert_eq!(
        restricted_offer_digest(&domain(), RestrictedRail::Relayed, &auction, u(100), u(10)).unwrap(),
        relayed
    );
    assert_ne!(direct, relayed);
}

#[test]
fn test_meta_operation_digests() {
    let s = Scenario::new();
    let transfer = MetaTransfer {
        signer: s.buyer.address,
        relayer: engine_address(),
        recipient: s.seller.address,
        amount: u(100),
        params: params(),
        signature: Bytes::new(),
    };
    let expected = Transfer {
        recipient: transfer.recipient,
        amount: transfer.amount,
        actors: Actors { signer: transfer.signer, relayer: transfer.relayer },
        txparams: sol_params(),
    }
    .eip712_signing_hash(&asset_domain());
    assert_eq!(meta_transfer_digest(&relayed_domain(), &transfer).unwrap(), expected);

    let approval = MetaApproval {
        signer: s.buyer.address,
        relayer: engine_address(),
        spender: engine_address(),
        amount: u(110),
        params: params(),
        signature: Bytes::new(),
    };
    let expected = Approve {
        spender: approval.spender,
        amount: approval.amount,
        actors: Actors { signer: approval.signer, relayer: approval.relayer },
        txparams: sol_params(),
    }
    .eip712_signing_hash(&asset_domain());
    assert_eq!(meta_approve_digest(&relayed_domain(), &approval).unwrap(), expected);
}

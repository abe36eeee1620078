use alloy_primitives::{Address, Bytes, B256, U256};
use k256::ecdsa::SigningKey;
use meta_marketplace_types::{
    address_of,
    eip712::{
        marketplace_offer_digest, meta_approve_digest, meta_transfer_digest, restricted_offer_digest,
    },
    offer::{pack_currencies, pack_prices},
    Auction, MetaApproval, MetaTransfer, PaymentMode, RelayParams, RestrictedOffer, RestrictedRail,
    SignedDomain, TypedDataError,
};
use thiserror::Error;

use crate::types::{LegDraft, OfferDraft, RestrictedWire, WireOffer};

#[derive(Debug, Error)]
pub enum SignError {
    #[error(transparent)]
    TypedData(#[from] TypedDataError),
    #[error("ecdsa: {0}")]
    Ecdsa(#[from] k256::ecdsa::Error),
    #[error("leg {0} is not relayed or has no asset domain")]
    NotSignable(usize),
}

/// Build `(addr, nums, bdata)` from a draft. Signatures are copied as they are.
pub fn encode_offer(draft: &OfferDraft) -> WireOffer {
    let mut addr = vec![draft.buyer, draft.seller];
    addr.extend(draft.legs.iter().filter(|l| l.mode.carries_asset()).map(|l| l.asset));

    let mut nums = Vec::with_capacity(5 + 2 * draft.legs.len());
    nums.push(draft.ticket);
    nums.push(U256::from(draft.nonce));
    nums.push(draft.buyer_mode.into());
    nums.push(draft.seller_mode.into());
    nums.push(U256::from(draft.legs.len()));
    for leg in &draft.legs {
        nums.push(leg.mode.into());
        nums.push(leg.price);
    }

    let mut bdata = Vec::with_capacity(130);
    bdata.extend_from_slice(&draft.buyer_signature);
    bdata.extend_from_slice(&draft.seller_signature);
    for leg in draft.legs.iter().filter(|l| l.mode == PaymentMode::Relayed) {
        let params = leg.relay.unwrap_or_default();
        for word in [params.nonce, params.gas_limit, params.gas_price, params.reward] {
            bdata.extend_from_slice(&word.to_be_bytes::<32>());
        }
        bdata.extend_from_slice(&leg.relay_signature);
    }

    WireOffer { addr, nums, bdata: bdata.into() }
}

/// Build restricted-offer arguments.
pub fn encode_restricted_offer(offer: &RestrictedOffer) -> RestrictedWire {
    let auction = &offer.auction;
    let mut bdata = Vec::with_capacity(195);
    bdata.extend_from_slice(&offer.seller_signature);
    bdata.extend_from_slice(&offer.buyer_signature);

    let relay_nums = match &offer.approval {
        Some(approval) => {
            bdata.extend_from_slice(&approval.signature);
            vec![approval.params.nonce, approval.params.gas_limit, approval.params.gas_price]
        }
        None => Vec::new(),
    };

    RestrictedWire {
        rail: offer.rail,
        actors: vec![auction.seller, auction.buyer, auction.relayer],
        nums: vec![auction.ticket, U256::from(auction.nonce), offer.amount, offer.reward],
        relay_nums,
        bdata: bdata.into(),
    }
}

/// The packed `currencies` and `prices` fields both parties sign.
pub fn currencies_and_prices(legs: &[LegDraft]) -> (Bytes, Bytes) {
    let offer = OfferDraft::new(Address::ZERO, Address::ZERO, U256::ZERO, 0, legs.to_vec()).to_offer();
    (pack_currencies(&offer.payments).into(), pack_prices(&offer.payments).into())
}

pub fn signer_address(key: &SigningKey) -> Address {
    address_of(key.verifying_key())
}

/// 65-byte `r || s || v` signature over a prehashed digest, `v` in {27, 28}.
pub fn sign_digest(key: &SigningKey, digest: B256) -> Result<Bytes, SignError> {
    let (signature, recovery_id) = key.sign_prehash_recoverable(digest.as_slice())?;
    let mut out = Vec::with_capacity(65);
    out.extend_from_slice(&signature.to_bytes());
    out.push(27 + recovery_id.to_byte());
    Ok(out.into())
}

pub fn sign_marketplace_offer(
    domain: &SignedDomain,
    draft: &OfferDraft,
    key: &SigningKey,
) -> Result<Bytes, SignError> {
    sign_digest(key, marketplace_offer_digest(domain, &draft.to_offer())?)
}

pub fn sign_restricted_offer(
    domain: &SignedDomain,
    rail: RestrictedRail,
    auction: &Auction,
    amount: U256,
    reward: U256,
    key: &SigningKey,
) -> Result<Bytes, SignError> {
    sign_digest(key, restricted_offer_digest(domain, rail, auction, amount, reward)?)
}

pub fn sign_meta_transfer(
    asset_domain: &SignedDomain,
    transfer: &MetaTransfer,
    key: &SigningKey,
) -> Result<Bytes, SignError> {
    sign_digest(key, meta_transfer_digest(asset_domain, transfer)?)
}

pub fn sign_meta_approve(
    asset_domain: &SignedDomain,
    approval: &MetaApproval,
    key: &SigningKey,
) -> Result<Bytes, SignError> {
    sign_digest(key, meta_approve_digest(asset_domain, approval)?)
}

/// Buyer's meta-approval for a relayed restricted offer: `amount + reward` to the engine, no
/// relayer fee.
pub fn sign_restricted_approval(
    asset_domain: &SignedDomain,
    engine: Address,
    auction: &Auction,
    total: U256,
    params: RelayParams,
    key: &SigningKey,
) -> Result<Bytes, SignError> {
    let approval = MetaApproval {
        signer: auction.buyer,
        relayer: engine,
        spender: engine,
        amount: total,
        params: RelayParams { reward: U256::ZERO, ..params },
        signature: Bytes::new(),
    };
    sign_meta_approve(asset_domain, &approval, key)
}

/// Sign the meta-transfer of relayed leg `index`: `price` from buyer to seller, relayed by `engine`.
pub fn sign_relay_leg(
    draft: &mut OfferDraft,
    index: usize,
    engine: Address,
    buyer_key: &SigningKey,
) -> Result<(), SignError> {
    let (buyer, seller) = (draft.buyer, draft.seller);
    let leg = draft.legs.get_mut(index).ok_or(SignError::NotSignable(index))?;
    let asset_domain = match (&leg.asset_domain, leg.mode) {
        (Some(domain), PaymentMode::Relayed) => domain.clone(),
        _ => return Err(SignError::NotSignable(index)),
    };
    let transfer = MetaTransfer {
        signer: buyer,
        relayer: engine,
        recipient: seller,
        amount: leg.price,
        params: leg.relay.unwrap_or_default(),
        signature: Bytes::new(),
    };
    leg.relay_signature = sign_meta_transfer(&asset_domain, &transfer, buyer_key)?;
    Ok(())
}

/// Fill in every signature a draft needs: relayed legs, then buyer and seller.
///
/// Relayed legs without an asset domain keep whatever signature they carry.
pub fn sign_offer(
    domain: &SignedDomain,
    draft: &mut OfferDraft,
    buyer_key: &SigningKey,
    seller_key: &SigningKey,
) -> Result<(), SignError> {
    for index in 0..draft.legs.len() {
        let leg = &draft.legs[index];
        if leg.mode == PaymentMode::Relayed && leg.asset_domain.is_some() {
            sign_relay_leg(draft, index, domain.verifying_contract, buyer_key)?;
        }
    }
    draft.buyer_signature = sign_marketplace_offer(domain, draft, buyer_key)?;
    draft.seller_signature = sign_marketplace_offer(domain, draft, seller_key)?;
    tracing::debug!(ticket = %draft.ticket, nonce = draft.nonce, legs = draft.legs.len(), "Offer signed");
    Ok(())
}

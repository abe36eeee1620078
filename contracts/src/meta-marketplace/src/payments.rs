//! Payment leg processing.
//!
//! Each leg moves `price` of its asset from buyer to seller on the rail named by its mode. Legs
//! are staged in order; the first failure aborts the settlement with that leg's error.

use alloy_primitives::{Address, U256};
use meta_marketplace_types::{
    MetaApproval, MetaTransfer, Offer, PaymentLeg, PaymentMode, RelayParams, RestrictedOffer,
    SettlementHost,
};

use crate::{errors::SettlementError, staging::StagedLedger};

/// Stage every leg of `offer`, in order.
pub fn stage_legs<H: SettlementHost + ?Sized>(
    staged: &mut StagedLedger<'_, H>,
    offer: &Offer,
) -> Result<(), SettlementError> {
    for (index, leg) in offer.payments.iter().enumerate() {
        tracing::debug!(
            leg = index,
            mode = ?leg.mode,
            asset = %leg.asset,
            price = %leg.price,
            "Staging payment leg"
        );
        stage_leg(staged, offer, index, leg)?;
    }
    Ok(())
}

pub fn stage_leg<H: SettlementHost + ?Sized>(
    staged: &mut StagedLedger<'_, H>,
    offer: &Offer,
    index: usize,
    leg: &PaymentLeg,
) -> Result<(), SettlementError> {
    let staged_result = match leg.mode {
        PaymentMode::Direct => staged.pull(leg.asset, offer.buyer, offer.seller, leg.price),
        PaymentMode::Relayed => {
            let payload = leg
                .relay
                .as_ref()
                .ok_or(SettlementError::TruncatedRelayPayload { leg: index })?;
            let transfer = MetaTransfer {
                signer: offer.buyer,
                relayer: staged.engine(),
                recipient: offer.seller,
                amount: leg.price,
                params: payload.params,
                signature: payload.signature.clone(),
            };
            staged.meta_transfer(leg.asset, transfer)
        }
    };
    staged_result.map_err(|err| SettlementError::from_leg(leg.asset, err))
}

/// Stage the funding of a restricted offer on `asset`: the optional meta-approval, `amount` to
/// the seller and `reward` to the relayer.
pub fn stage_restricted_funding<H: SettlementHost + ?Sized>(
    staged: &mut StagedLedger<'_, H>,
    offer: &RestrictedOffer,
    asset: Address,
) -> Result<(), SettlementError> {
    let auction = &offer.auction;
    let total = offer
        .amount
        .checked_add(offer.reward)
        .ok_or(SettlementError::ValueOverflow("amount"))?;
    let engine = staged.engine();

    if let Some(payload) = &offer.approval {
        // The buyer approves exactly what is pulled, relayed for free.
        let approval = MetaApproval {
            signer: auction.buyer,
            relayer: engine,
            spender: engine,
            amount: total,
            params: RelayParams { reward: U256::ZERO, ..payload.params },
            signature: payload.signature.clone(),
        };
        tracing::debug!(%asset, nonce = %approval.params.nonce, "Staging meta-approval");
        staged
            .meta_approve(asset, approval)
            .map_err(|err| SettlementError::from_leg(asset, err))?;
    }

    let available = staged
        .allowance(asset, auction.buyer, engine)
        .map_err(|err| SettlementError::from_leg(asset, err))?;
    if available < total {
        return Err(SettlementError::AllowanceError { asset, needed: total, available });
    }

    staged
        .pull(asset, auction.buyer, auction.seller, offer.amount)
        .map_err(|err| SettlementError::from_leg(asset, err))?;
    if !offer.reward.is_zero() {
        staged
            .pull(asset, auction.buyer, auction.relayer, offer.reward)
            .map_err(|err| SettlementError::from_leg(asset, err))?;
    }
    Ok(())
}

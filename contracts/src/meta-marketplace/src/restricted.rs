//! Relayer-restricted single-currency offers.
//!
//! Same shape as a marketplace settlement, with two differences: only the relayer named in the
//! signed auction may execute it, and the buyer may pay that relayer a reward on top of the price.

use alloy_primitives::{Address, U256};
use meta_marketplace_types::{
    eip712::restricted_offer_digest, RestrictedOffer, RestrictedRail, SettlementHost, WalletMode,
};

use crate::{
    decoder::decode_restricted_offer,
    engine::{MetaMarketplace, SettlementPlan},
    errors::SettlementError,
    payments::stage_restricted_funding,
    signer::validate,
    staging::StagedLedger,
};

impl MetaMarketplace {
    /// Run every step of a restricted settlement, funding included, without committing.
    #[allow(clippy::too_many_arguments)]
    pub fn check_restricted_offer<H: SettlementHost + ?Sized>(
        &self,
        host: &H,
        caller: Address,
        rail: RestrictedRail,
        actors: &[Address],
        nums: &[U256],
        relay_nums: &[U256],
        bdata: &[u8],
    ) -> Result<SettlementPlan, SettlementError> {
        let asset = self.restricted_asset(rail)?;
        let offer = decode_restricted_offer(rail, actors, nums, relay_nums, bdata)?;
        self.authorize_restricted(host, caller, &offer)?;

        let mut staged = StagedLedger::new(host, self.address());
        stage_restricted_funding(&mut staged, &offer, asset)?;
        let auction = &offer.auction;
        self.finish_plan(host, staged, auction.ticket, auction.seller, auction.buyer)
    }

    /// Check and commit a restricted offer: funds, ticket, nonce.
    #[allow(clippy::too_many_arguments)]
    pub fn seal_restricted_offer<H: SettlementHost + ?Sized>(
        &mut self,
        host: &mut H,
        caller: Address,
        rail: RestrictedRail,
        actors: &[Address],
        nums: &[U256],
        relay_nums: &[U256],
        bdata: &[u8],
    ) -> Result<(), SettlementError> {
        let plan = self
            .check_restricted_offer(host, caller, rail, actors, nums, relay_nums, bdata)
            .inspect_err(|err| {
                tracing::warn!(code = err.code(), kind = ?err.kind(), %caller, %err, "Restricted settlement rejected");
            })?;
        self.commit(host, plan)
    }

    fn restricted_asset(&self, rail: RestrictedRail) -> Result<Address, SettlementError> {
        let currencies = self
            .config()
            .restricted
            .ok_or(SettlementError::RestrictedOffersDisabled)?;
        Ok(match rail {
            RestrictedRail::Direct => currencies.direct,
            RestrictedRail::Relayed => currencies.relayed,
        })
    }

    fn authorize_restricted<H: SettlementHost + ?Sized>(
        &self,
        host: &H,
        caller: Address,
        offer: &RestrictedOffer,
    ) -> Result<(), SettlementError> {
        let auction = &offer.auction;
        if caller != auction.relayer {
            return Err(SettlementError::UnauthorizedRelayer(caller));
        }
        self.check_ownership(host, auction.ticket, auction.seller)?;
        if auction.seller == auction.buyer {
            return Err(SettlementError::SellerIsBuyer);
        }
        self.check_nonce(auction.ticket, auction.nonce)?;

        let digest = restricted_offer_digest(self.domain(), offer.rail, auction, offer.amount, offer.reward)?;
        tracing::debug!(ticket = %auction.ticket, rail = ?offer.rail, %digest, "Restricted offer digest built");

        if !validate(host, auction.seller, WalletMode::ExternalAccount, digest, &offer.seller_signature) {
            return Err(SettlementError::InvalidSellerSignature);
        }
        if !validate(host, auction.buyer, WalletMode::ExternalAccount, digest, &offer.buyer_signature) {
            return Err(SettlementError::InvalidBuyerSignature);
        }
        Ok(())
    }
}

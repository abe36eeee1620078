//! Settlement engine.
//!
//! Checks run in a fixed order and the first failure wins. Nothing reaches the host until every
//! check and every staged leg has passed; the commit then replays the staged legs, moves the
//! ticket and advances the nonce.

use alloy_primitives::{Address, U256};
use meta_marketplace_types::{
    eip712::marketplace_offer_digest, HostTransaction, LedgerError, Offer, SettlementHost,
    SignedDomain, TicketLedger,
};
use serde::Serialize;

use crate::{
    config::{ConfigError, MarketplaceConfig},
    decoder::decode_offer,
    errors::SettlementError,
    nonce::NonceRegistry,
    payments::stage_legs,
    signer::validate,
    staging::{apply_effects, Effect, StagedLedger},
};

/// Everything a seal would do, computed without touching the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SettlementPlan {
    pub ticket: U256,
    pub seller: Address,
    pub buyer: Address,
    /// Host mutations, in commit order, before the ticket transfer.
    pub effects: Vec<Effect>,
    /// Ticket nonce once committed.
    pub next_nonce: u64,
}

/// The marketplace settlement engine: configuration plus the per-ticket nonce registry.
///
/// Hosts are passed into each call; the engine keeps no ledger state between calls.
#[derive(Clone, Debug)]
pub struct MetaMarketplace {
    config: MarketplaceConfig,
    nonces: NonceRegistry,
}

impl MetaMarketplace {
    pub fn new(config: MarketplaceConfig) -> Result<Self, ConfigError> {
        Self::with_nonces(config, NonceRegistry::new())
    }

    /// Resume from a persisted nonce registry.
    pub fn with_nonces(config: MarketplaceConfig, nonces: NonceRegistry) -> Result<Self, ConfigError> {
        config.validate()?;
        tracing::debug!(
            domain = %config.domain.name,
            chain_id = config.domain.chain_id,
            engine = %config.domain.verifying_contract,
            "Marketplace engine configured"
        );
        Ok(Self { config, nonces })
    }

    pub fn config(&self) -> &MarketplaceConfig {
        &self.config
    }

    pub fn domain(&self) -> &SignedDomain {
        &self.config.domain
    }

    /// Spender of direct-rail allowances and relayer of meta-transfers.
    pub fn address(&self) -> Address {
        self.config.domain.verifying_contract
    }

    pub fn nonces(&self) -> &NonceRegistry {
        &self.nonces
    }

    pub fn current_nonce(&self, ticket: U256) -> u64 {
        self.nonces.current(ticket)
    }

    /// Decode and authorize an offer without staging its legs or mutating anything.
    pub fn verify<H: SettlementHost + ?Sized>(
        &self,
        host: &H,
        addr: &[Address],
        nums: &[U256],
        bdata: &[u8],
    ) -> Result<Offer, SettlementError> {
        let offer = decode_offer(addr, nums, bdata)?;
        self.authorize(host, &offer)?;
        Ok(offer)
    }

    /// Run every seal step against a staged view of `host` and return the plan.
    pub fn dry_run<H: SettlementHost + ?Sized>(
        &self,
        host: &H,
        addr: &[Address],
        nums: &[U256],
        bdata: &[u8],
    ) -> Result<SettlementPlan, SettlementError> {
        let offer = self.verify(host, addr, nums, bdata)?;
        self.plan(host, &offer)
    }

    /// Verify, stage and commit an offer.
    pub fn seal<H: SettlementHost + ?Sized>(
        &mut self,
        host: &mut H,
        addr: &[Address],
        nums: &[U256],
        bdata: &[u8],
    ) -> Result<(), SettlementError> {
        let plan = self.dry_run(host, addr, nums, bdata).inspect_err(|err| {
            tracing::warn!(code = err.code(), kind = ?err.kind(), %err, "Settlement rejected");
        })?;
        self.commit(host, plan)
    }

    /// Checks 2 to 7: ownership, self-trade, nonce, digest, both signatures.
    fn authorize<H: SettlementHost + ?Sized>(&self, host: &H, offer: &Offer) -> Result<(), SettlementError> {
        self.check_ownership(host, offer.ticket, offer.seller)?;
        if offer.seller == offer.buyer {
            return Err(SettlementError::SellerIsBuyer);
        }
        self.check_nonce(offer.ticket, offer.nonce)?;

        let digest = marketplace_offer_digest(&self.config.domain, offer)?;
        tracing::debug!(ticket = %offer.ticket, %digest, "Offer digest built");

        if !validate(host, offer.buyer, offer.buyer_mode, digest, &offer.buyer_signature) {
            return Err(SettlementError::InvalidBuyerSignature);
        }
        if !validate(host, offer.seller, offer.seller_mode, digest, &offer.seller_signature) {
            return Err(SettlementError::InvalidSellerSignature);
        }
        Ok(())
    }

    fn plan<H: SettlementHost + ?Sized>(&self, host: &H, offer: &Offer) -> Result<SettlementPlan, SettlementError> {
        let mut staged = StagedLedger::new(host, self.address());
        stage_legs(&mut staged, offer)?;
        self.finish_plan(host, staged, offer.ticket, offer.seller, offer.buyer)
    }

    pub(crate) fn finish_plan<H: SettlementHost + ?Sized>(
        &self,
        host: &H,
        staged: StagedLedger<'_, H>,
        ticket: U256,
        seller: Address,
        buyer: Address,
    ) -> Result<SettlementPlan, SettlementError> {
        host.check_transfer(ticket, seller, buyer).map_err(|err| ticket_error(ticket, seller, err))?;
        let next_nonce = self.nonces.next(ticket)?;
        Ok(SettlementPlan {
            ticket,
            seller,
            buyer,
            effects: staged.into_effects(),
            next_nonce,
        })
    }

    pub(crate) fn check_ownership<H: SettlementHost + ?Sized>(
        &self,
        host: &H,
        ticket: U256,
        seller: Address,
    ) -> Result<(), SettlementError> {
        let owner = host.owner_of(ticket).map_err(|err| ticket_error(ticket, seller, err))?;
        if owner != seller {
            return Err(SettlementError::InvalidTicketOwner { ticket, seller });
        }
        Ok(())
    }

    pub(crate) fn check_nonce(&self, ticket: U256, nonce: u64) -> Result<(), SettlementError> {
        let expected = self.nonces.current(ticket);
        if nonce != expected {
            return Err(SettlementError::InvalidNonce { expected, actual: nonce });
        }
        Ok(())
    }

    /// Apply a plan to the host inside a host transaction. Only fails if the host rejects a
    /// movement it already allowed, in which case every applied effect is rolled back.
    pub(crate) fn commit<H: SettlementHost + ?Sized>(
        &mut self,
        host: &mut H,
        plan: SettlementPlan,
    ) -> Result<(), SettlementError> {
        let engine = self.address();
        host.begin();
        let committed = apply_effects(host, engine, &plan.effects)
            .and_then(|()| host.transfer(plan.ticket, plan.seller, plan.buyer));
        if let Err(err) = committed {
            host.rollback();
            tracing::error!(ticket = %plan.ticket, %err, "Host rejected a staged settlement during commit, rolled back");
            return Err(SettlementError::Ledger(err));
        }
        host.release();

        self.nonces.store(plan.ticket, plan.next_nonce);
        tracing::info!(
            ticket = %plan.ticket,
            seller = %plan.seller,
            buyer = %plan.buyer,
            effects = plan.effects.len(),
            nonce = plan.next_nonce,
            "Settlement sealed"
        );
        Ok(())
    }
}

fn ticket_error(ticket: U256, seller: Address, err: LedgerError) -> SettlementError {
    match err {
        LedgerError::UnknownTicket(_) | LedgerError::NotTicketOwner { .. } => {
            SettlementError::InvalidTicketOwner { ticket, seller }
        }
        other => SettlementError::Ledger(other),
    }
}

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Length of an `r || s || v` signature as carried on the wire.
pub const SIGNATURE_LEN: usize = 65;

/// Length of a relayed leg's meta-transfer authorization:
/// `nonce || gas_limit || gas_price || reward` (u256 each) followed by a signature.
pub const RELAY_PAYLOAD_LEN: usize = 4 * 32 + SIGNATURE_LEN;

/// How a signature is checked for an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum WalletMode {
    /// Key-controlled account: the signer is recovered from the signature.
    ExternalAccount = 1,
    /// Contract wallet: the wallet itself decides whether the signature is valid.
    SmartContractWallet = 2,
}

/// Payment rail used by one leg of an offer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PaymentMode {
    /// Allowance pull through the asset's `transferFrom`.
    Direct = 1,
    /// Buyer-signed meta-transfer forwarded to the asset by the engine.
    Relayed = 2,
}

impl PaymentMode {
    /// Whether legs on this rail name an asset in the address array.
    pub fn carries_asset(self) -> bool {
        match self {
            PaymentMode::Direct | PaymentMode::Relayed => true,
        }
    }

    /// Bytes this rail consumes from the opaque blob.
    pub fn payload_len(self) -> usize {
        match self {
            PaymentMode::Direct => 0,
            PaymentMode::Relayed => RELAY_PAYLOAD_LEN,
        }
    }
}

impl TryFrom<U256> for WalletMode {
    type Error = ();

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        use WalletMode::*;
        let mode = match u8::try_from(value).map_err(|_| ())? {
            1 => ExternalAccount,
            2 => SmartContractWallet,
            _ => return Err(()),
        };
        Ok(mode)
    }
}

impl TryFrom<U256> for PaymentMode {
    type Error = ();

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        use PaymentMode::*;
        let mode = match u8::try_from(value).map_err(|_| ())? {
            1 => Direct,
            2 => Relayed,
            _ => return Err(()),
        };
        Ok(mode)
    }
}

impl From<WalletMode> for U256 {
    fn from(mode: WalletMode) -> Self {
        U256::from(mode as u8)
    }
}

impl From<PaymentMode> for U256 {
    fn from(mode: PaymentMode) -> Self {
        U256::from(mode as u8)
    }
}

/// Transaction parameters embedded in a meta-transfer or meta-approval.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayParams {
    pub nonce: U256,
    pub gas_limit: U256,
    pub gas_price: U256,
    /// Paid by the signer to the relayer on top of the moved amount.
    pub reward: U256,
}

/// Wire payload of a relayed leg: the buyer's parameters and signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayPayload {
    pub params: RelayParams,
    pub signature: Bytes,
}

/// A single payment instruction inside an offer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLeg {
    pub mode: PaymentMode,
    pub asset: Address,
    pub price: U256,
    /// Present iff `mode == Relayed`.
    pub relay: Option<RelayPayload>,
}

/// A decoded, dual-signed marketplace offer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub seller: Address,
    pub buyer: Address,
    pub ticket: U256,
    pub nonce: u64,
    pub buyer_mode: WalletMode,
    pub seller_mode: WalletMode,
    pub payments: Vec<PaymentLeg>,
    pub buyer_signature: Bytes,
    pub seller_signature: Bytes,
}

impl Offer {
    /// Packed asset addresses, in leg order, as both parties sign them.
    pub fn currencies(&self) -> Vec<u8> {
        pack_currencies(&self.payments)
    }

    /// Packed 32-byte prices, in leg order, as both parties sign them.
    pub fn prices(&self) -> Vec<u8> {
        pack_prices(&self.payments)
    }
}

pub fn pack_currencies(legs: &[PaymentLeg]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(20 * legs.len());
    for leg in legs {
        buf.extend_from_slice(leg.asset.as_slice());
    }
    buf
}

pub fn pack_prices(legs: &[PaymentLeg]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32 * legs.len());
    for leg in legs {
        buf.extend_from_slice(&leg.price.to_be_bytes::<32>());
    }
    buf
}

/// Buyer-signed asset movement submitted by a relayer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTransfer {
    pub signer: Address,
    pub relayer: Address,
    pub recipient: Address,
    pub amount: U256,
    pub params: RelayParams,
    pub signature: Bytes,
}

/// Buyer-signed allowance grant submitted by a relayer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaApproval {
    pub signer: Address,
    pub relayer: Address,
    pub spender: Address,
    pub amount: U256,
    pub params: RelayParams,
    pub signature: Bytes,
}

/// Narrow offer shape executed only by a named relayer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub seller: Address,
    pub buyer: Address,
    pub relayer: Address,
    pub ticket: U256,
    pub nonce: u64,
}

/// Currency rail of a restricted offer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RestrictedRail {
    /// Buyer pre-approved the engine on the direct currency.
    Direct,
    /// Buyer ships a signed meta-approval for the relayed currency.
    Relayed,
}

/// Meta-approval parameters carried by a relayed restricted offer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPayload {
    pub params: RelayParams,
    pub signature: Bytes,
}

/// Single-currency offer with a designated relayer and an optional relayer reward.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictedOffer {
    pub auction: Auction,
    pub amount: U256,
    pub reward: U256,
    pub rail: RestrictedRail,
    pub seller_signature: Bytes,
    pub buyer_signature: Bytes,
    /// Present iff `rail == Relayed`.
    pub approval: Option<ApprovalPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(asset: u8, price: u64) -> PaymentLeg {
        PaymentLeg {
            mode: PaymentMode::Direct,
            asset: Address::repeat_byte(asset),
            price: U256::from(price),
            relay: None,
        }
    }

    #[test]
    fn wire_modes_round_trip() {
        assert_eq!(WalletMode::try_from(U256::from(1u8)), Ok(WalletMode::ExternalAccount));
        assert_eq!(WalletMode::try_from(U256::from(2u8)), Ok(WalletMode::SmartContractWallet));
        assert_eq!(PaymentMode::try_from(U256::from(2u8)), Ok(PaymentMode::Relayed));
        assert_eq!(<U256 as From<PaymentMode>>::from(PaymentMode::Direct), U256::from(1u8));
    }

    #[test]
    fn unknown_modes_rejected() {
        assert!(WalletMode::try_from(U256::ZERO).is_err());
        assert!(WalletMode::try_from(U256::from(3u8)).is_err());
        assert!(PaymentMode::try_from(U256::from(257u16)).is_err());
        assert!(PaymentMode::try_from(U256::MAX).is_err());
    }

    #[test]
    fn packing_follows_leg_order() {
        let legs = vec![leg(0xaa, 100), leg(0xbb, 7)];
        let currencies = pack_currencies(&legs);
        assert_eq!(currencies.len(), 40);
        assert_eq!(&currencies[..20], Address::repeat_byte(0xaa).as_slice());
        assert_eq!(&currencies[20..], Address::repeat_byte(0xbb).as_slice());

        let prices = pack_prices(&legs);
        assert_eq!(prices.len(), 64);
        assert_eq!(prices[31], 100);
        assert_eq!(prices[63], 7);
    }

    #[test]
    fn relay_payload_is_four_words_and_a_signature() {
        assert_eq!(PaymentMode::Relayed.payload_len(), 193);
        assert_eq!(PaymentMode::Direct.payload_len(), 0);
    }
}

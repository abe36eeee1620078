//! Wire decoding for marketplace and restricted offers.
//!
//! Every length is checked before any byte is interpreted as a signature or an address.

use alloy_primitives::{Address, Bytes, U256};
use meta_marketplace_types::offer::{
    ApprovalPayload, Auction, Offer, PaymentLeg, PaymentMode, RelayParams, RelayPayload,
    RestrictedOffer, RestrictedRail, WalletMode, SIGNATURE_LEN,
};

use crate::{
    errors::SettlementError,
    utils::bytes::{read_slice, read_u256_be, remaining},
};

/// `[ticket, nonce, buyer_mode, seller_mode, leg_count]`
const HEADER_WORDS: usize = 5;
const PARTY_SIGNATURES_LEN: usize = 2 * SIGNATURE_LEN;

/// Decode `(addr, nums, bdata)` into an [`Offer`].
///
/// - `addr = [buyer, seller, leg assets...]`
/// - `nums = [ticket, nonce, buyer_mode, seller_mode, leg_count, (mode, price) x leg_count]`
/// - `bdata = buyer_sig || seller_sig || relay payload per relayed leg`
pub fn decode_offer(addr: &[Address], nums: &[U256], bdata: &[u8]) -> Result<Offer, SettlementError> {
    if nums.len() < HEADER_WORDS {
        return Err(SettlementError::NumsTooShort(nums.len()));
    }
    if nums[4].is_zero() {
        return Err(SettlementError::EmptyCurrencies);
    }
    let leg_count = usize::try_from(nums[4]).map_err(|_| SettlementError::ValueOverflow("leg_count"))?;
    let expected_nums = leg_count
        .checked_mul(2)
        .and_then(|n| n.checked_add(HEADER_WORDS))
        .ok_or(SettlementError::ValueOverflow("leg_count"))?;
    if nums.len() != expected_nums {
        return Err(SettlementError::LengthMismatch {
            field: "nums",
            expected: expected_nums,
            actual: nums.len(),
        });
    }

    let buyer_mode = wallet_mode(nums[2])?;
    let seller_mode = wallet_mode(nums[3])?;
    let mut modes = Vec::with_capacity(leg_count);
    for leg in 0..leg_count {
        let raw = nums[HEADER_WORDS + 2 * leg];
        let mode = PaymentMode::try_from(raw).map_err(|_| SettlementError::UnknownPaymentMode { leg, mode: raw })?;
        modes.push(mode);
    }

    let expected_addr = 2 + modes.iter().filter(|m| m.carries_asset()).count();
    if addr.len() != expected_addr {
        return Err(SettlementError::LengthMismatch {
            field: "addr",
            expected: expected_addr,
            actual: addr.len(),
        });
    }

    let ticket = nums[0];
    let nonce = u64::try_from(nums[1]).map_err(|_| SettlementError::ValueOverflow("nonce"))?;

    if bdata.len() < PARTY_SIGNATURES_LEN {
        return Err(SettlementError::SignatureDataTooShort {
            expected: PARTY_SIGNATURES_LEN,
            actual: bdata.len(),
        });
    }
    let buyer_signature = Bytes::copy_from_slice(&bdata[..SIGNATURE_LEN]);
    let seller_signature = Bytes::copy_from_slice(&bdata[SIGNATURE_LEN..PARTY_SIGNATURES_LEN]);

    let mut cursor = PARTY_SIGNATURES_LEN;
    let mut next_asset = 2;
    let mut payments = Vec::with_capacity(leg_count);
    for (leg, mode) in modes.into_iter().enumerate() {
        let asset = if mode.carries_asset() {
            next_asset += 1;
            addr[next_asset - 1]
        } else {
            Address::ZERO
        };
        let relay = match mode {
            PaymentMode::Direct => None,
            PaymentMode::Relayed => {
                if remaining(bdata, cursor) < mode.payload_len() {
                    return Err(SettlementError::TruncatedRelayPayload { leg });
                }
                Some(read_relay_payload(bdata, &mut cursor).map_err(|_| SettlementError::TruncatedRelayPayload { leg })?)
            }
        };
        payments.push(PaymentLeg {
            mode,
            asset,
            price: nums[HEADER_WORDS + 2 * leg + 1],
            relay,
        });
    }

    let trailing = remaining(bdata, cursor);
    if trailing != 0 {
        return Err(SettlementError::TrailingBytes(trailing));
    }

    Ok(Offer {
        seller: addr[1],
        buyer: addr[0],
        ticket,
        nonce,
        buyer_mode,
        seller_mode,
        payments,
        buyer_signature,
        seller_signature,
    })
}

/// Decode a relayer-restricted offer.
///
/// - `actors = [seller, buyer, relayer]`
/// - `nums = [ticket, nonce, amount, reward]`
/// - `relay_nums = []` on the direct rail, `[approve_nonce, gas_limit, gas_price]` on the relayed rail
/// - `bdata = seller_sig || buyer_sig (|| approve_sig)`
pub fn decode_restricted_offer(
    rail: RestrictedRail,
    actors: &[Address],
    nums: &[U256],
    relay_nums: &[U256],
    bdata: &[u8],
) -> Result<RestrictedOffer, SettlementError> {
    expect_len("actors", actors.len(), 3)?;
    expect_len("nums", nums.len(), 4)?;
    let (relay_words, blob_len) = match rail {
        RestrictedRail::Direct => (0, PARTY_SIGNATURES_LEN),
        RestrictedRail::Relayed => (3, PARTY_SIGNATURES_LEN + SIGNATURE_LEN),
    };
    expect_len("relay_nums", relay_nums.len(), relay_words)?;

    let nonce = u64::try_from(nums[1]).map_err(|_| SettlementError::ValueOverflow("nonce"))?;

    if bdata.len() < blob_len {
        return Err(SettlementError::SignatureDataTooShort {
            expected: blob_len,
            actual: bdata.len(),
        });
    }
    if bdata.len() > blob_len {
        return Err(SettlementError::TrailingBytes(bdata.len() - blob_len));
    }

    let approval = match rail {
        RestrictedRail::Direct => None,
        RestrictedRail::Relayed => Some(ApprovalPayload {
            params: RelayParams {
                nonce: relay_nums[0],
                gas_limit: relay_nums[1],
                gas_price: relay_nums[2],
                reward: U256::ZERO,
            },
            signature: Bytes::copy_from_slice(&bdata[PARTY_SIGNATURES_LEN..]),
        }),
    };

    Ok(RestrictedOffer {
        auction: Auction {
            seller: actors[0],
            buyer: actors[1],
            relayer: actors[2],
            ticket: nums[0],
            nonce,
        },
        amount: nums[2],
        reward: nums[3],
        rail,
        seller_signature: Bytes::copy_from_slice(&bdata[..SIGNATURE_LEN]),
        buyer_signature: Bytes::copy_from_slice(&bdata[SIGNATURE_LEN..PARTY_SIGNATURES_LEN]),
        approval,
    })
}

fn wallet_mode(raw: U256) -> Result<WalletMode, SettlementError> {
    WalletMode::try_from(raw).map_err(|_| SettlementError::UnknownWalletMode(raw))
}

fn expect_len(field: &'static str, actual: usize, expected: usize) -> Result<(), SettlementError> {
    if actual != expected {
        return Err(SettlementError::LengthMismatch { field, expected, actual });
    }
    Ok(())
}

fn read_relay_payload(bytes: &[u8], i: &mut usize) -> Result<RelayPayload, ()> {
    let params = RelayParams {
        nonce: read_u256_be(bytes, i)?,
        gas_limit: read_u256_be(bytes, i)?,
        gas_price: read_u256_be(bytes, i)?,
        reward: read_u256_be(bytes, i)?,
    };
    let signature = Bytes::copy_from_slice(read_slice(bytes, i, SIGNATURE_LEN)?);
    Ok(RelayPayload { params, signature })
}

#[cfg(test)]
mod tests {
    use super::*;
    use meta_marketplace_types::offer::RELAY_PAYLOAD_LEN;

    fn buyer() -> Address {
        Address::repeat_byte(0xb0)
    }

    fn seller() -> Address {
        Address::repeat_byte(0x5e)
    }

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    fn two_direct_legs() -> (Vec<Address>, Vec<U256>, Vec<u8>) {
        let addr = vec![buyer(), seller(), Address::repeat_byte(0xa1), Address::repeat_byte(0xd1)];
        let nums = vec![u(1), u(0), u(1), u(1), u(2), u(1), u(100), u(1), u(100)];
        (addr, nums, vec![0x11; 130])
    }

    #[test]
    fn decodes_direct_legs_in_order() {
        let (addr, nums, mut bdata) = two_direct_legs();
        bdata[..65].fill(0xbb);
        let offer = decode_offer(&addr, &nums, &bdata).unwrap();

        assert_eq!(offer.buyer, buyer());
        assert_eq!(offer.seller, seller());
        assert_eq!(offer.ticket, u(1));
        assert_eq!(offer.nonce, 0);
        assert_eq!(offer.buyer_mode, WalletMode::ExternalAccount);
        assert_eq!(offer.payments.len(), 2);
        assert_eq!(offer.payments[0].asset, Address::repeat_byte(0xa1));
        assert_eq!(offer.payments[1].asset, Address::repeat_byte(0xd1));
        assert!(offer.payments.iter().all(|l| l.relay.is_none()));
        assert_eq!(offer.buyer_signature[0], 0xbb);
        assert_eq!(offer.seller_signature[0], 0x11);
    }

    #[test]
    fn decodes_relay_payload() {
        let addr = vec![buyer(), seller(), Address::repeat_byte(0xd2)];
        let nums = vec![u(9), u(3), u(1), u(2), u(1), u(2), u(50)];
        let mut bdata = vec![0u8; 130];
        for word in [7u64, 100_000, 2, 1] {
            bdata.extend_from_slice(&u(word).to_be_bytes::<32>());
        }
        bdata.extend_from_slice(&[0x44; 65]);

        let offer = decode_offer(&addr, &nums, &bdata).unwrap();
        assert_eq!(offer.seller_mode, WalletMode::SmartContractWallet);
        let relay = offer.payments[0].relay.as_ref().unwrap();
        assert_eq!(relay.params.nonce, u(7));
        assert_eq!(relay.params.gas_limit, u(100_000));
        assert_eq!(relay.params.gas_price, u(2));
        assert_eq!(relay.params.reward, u(1));
        assert_eq!(relay.signature.len(), 65);
    }

    #[test]
    fn zero_legs_rejected_before_lengths() {
        let nums = vec![u(1), u(0), u(1), u(1), u(0)];
        assert_eq!(
            decode_offer(&[buyer(), seller()], &nums, &[0u8; 130]),
            Err(SettlementError::EmptyCurrencies)
        );
    }

    #[test]
    fn nums_shape_is_exact() {
        let (addr, mut nums, bdata) = two_direct_legs();
        assert_eq!(decode_offer(&addr, &nums[..4], &bdata), Err(SettlementError::NumsTooShort(4)));

        nums.pop();
        assert_eq!(
            decode_offer(&addr, &nums, &bdata),
            Err(SettlementError::LengthMismatch { field: "nums", expected: 9, actual: 8 })
        );

        nums.extend([u(100), u(0)]);
        assert!(matches!(
            decode_offer(&addr, &nums, &bdata),
            Err(SettlementError::LengthMismatch { field: "nums", .. })
        ));
    }

    #[test]
    fn addr_shape_is_exact() {
        let (mut addr, nums, bdata) = two_direct_legs();
        addr.pop();
        assert_eq!(
            decode_offer(&addr, &nums, &bdata),
            Err(SettlementError::LengthMismatch { field: "addr", expected: 4, actual: 3 })
        );
    }

    #[test]
    fn unknown_modes_rejected() {
        let (addr, mut nums, bdata) = two_direct_legs();
        nums[2] = u(3);
        assert_eq!(decode_offer(&addr, &nums, &bdata), Err(SettlementError::UnknownWalletMode(u(3))));

        let (addr, mut nums, bdata) = two_direct_legs();
        nums[7] = u(0);
        assert_eq!(
            decode_offer(&addr, &nums, &bdata),
            Err(SettlementError::UnknownPaymentMode { leg: 1, mode: u(0) })
        );
    }

    #[test]
    fn oversized_nonce_rejected() {
        let (addr, mut nums, bdata) = two_direct_legs();
        nums[1] = U256::from(u64::MAX) + u(1);
        assert_eq!(decode_offer(&addr, &nums, &bdata), Err(SettlementError::ValueOverflow("nonce")));
    }

    #[test]
    fn blob_must_be_exact() {
        let (addr, nums, _) = two_direct_legs();
        assert_eq!(
            decode_offer(&addr, &nums, &[0u8; 129]),
            Err(SettlementError::SignatureDataTooShort { expected: 130, actual: 129 })
        );
        assert_eq!(decode_offer(&addr, &nums, &[0u8; 131]), Err(SettlementError::TrailingBytes(1)));

        let addr = vec![buyer(), seller(), Address::repeat_byte(0xa1), Address::repeat_byte(0xd2)];
        let nums = vec![u(1), u(0), u(1), u(1), u(2), u(1), u(10), u(2), u(10)];
        let bdata = vec![0u8; 130 + RELAY_PAYLOAD_LEN - 1];
        assert_eq!(
            decode_offer(&addr, &nums, &bdata),
            Err(SettlementError::TruncatedRelayPayload { leg: 1 })
        );
    }

    #[test]
    fn restricted_offer_shapes() {
        let actors = [seller(), buyer(), Address::repeat_byte(0x77)];
        let nums = [u(4), u(0), u(100), u(5)];

        let offer = decode_restricted_offer(RestrictedRail::Direct, &actors, &nums, &[], &[0u8; 130]).unwrap();
        assert_eq!(offer.auction.relayer, Address::repeat_byte(0x77));
        assert_eq!(offer.amount, u(100));
        assert_eq!(offer.reward, u(5));
        assert!(offer.approval.is_none());

        let relay_nums = [u(8), u(60_000), u(1)];
        let offer =
            decode_restricted_offer(RestrictedRail::Relayed, &actors, &nums, &relay_nums, &[0u8; 195]).unwrap();
        let approval = offer.approval.unwrap();
        assert_eq!(approval.params.nonce, u(8));
        assert_eq!(approval.params.reward, U256::ZERO);

        assert_eq!(
            decode_restricted_offer(RestrictedRail::Relayed, &actors, &nums, &[], &[0u8; 195]),
            Err(SettlementError::LengthMismatch { field: "relay_nums", expected: 3, actual: 0 })
        );
        assert_eq!(
            decode_restricted_offer(RestrictedRail::Direct, &actors[..2], &nums, &[], &[0u8; 130]),
            Err(SettlementError::LengthMismatch { field: "actors", expected: 3, actual: 2 })
        );
        assert_eq!(
            decode_restricted_offer(RestrictedRail::Direct, &actors, &nums, &[], &[0u8; 131]),
            Err(SettlementError::TrailingBytes(1))
        );
    }
}

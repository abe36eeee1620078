//! Signer recovery for key-controlled accounts.

use alloy_primitives::{keccak256, Address, B256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RecoverError {
    #[error("signature must be 64 or 65 bytes, got {0}")]
    BadLength(usize),
    #[error("unsupported recovery byte {0}")]
    BadRecoveryByte(u8),
    #[error("malformed or non-canonical signature")]
    Malformed,
    #[error("public key recovery failed")]
    RecoveryFailed,
}

/// Recover the address that signed `digest`.
///
/// Accepts `r || s || v` with `v` in {0, 1, 27, 28}, or the 64-byte compact form where the
/// y-parity lives in the top bit of `s`. High-`s` signatures are rejected.
pub fn ecrecover_address(digest: B256, sig: &[u8]) -> Result<Address, RecoverError> {
    let (rs, parity) = split_signature(sig)?;

    let signature = Signature::from_slice(&rs).map_err(|_| RecoverError::Malformed)?;
    if signature.normalize_s().is_some() {
        return Err(RecoverError::Malformed);
    }
    let recovery_id = RecoveryId::from_byte(parity).ok_or(RecoverError::Malformed)?;

    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery_id)
        .map_err(|_| RecoverError::RecoveryFailed)?;
    let recovered = address_of(&key);
    if recovered == Address::ZERO {
        return Err(RecoverError::RecoveryFailed);
    }
    Ok(recovered)
}

/// Account address of a secp256k1 public key.
pub fn address_of(key: &VerifyingKey) -> Address {
    let uncompressed = key.to_encoded_point(false);
    let hash = keccak256(&uncompressed.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

fn split_signature(sig: &[u8]) -> Result<([u8; 64], u8), RecoverError> {
    let mut rs = [0u8; 64];
    match sig.len() {
        65 => {
            rs.copy_from_slice(&sig[..64]);
            let parity = match sig[64] {
                0 | 27 => 0,
                1 | 28 => 1,
                other => return Err(RecoverError::BadRecoveryByte(other)),
            };
            Ok((rs, parity))
        }
        64 => {
            rs.copy_from_slice(sig);
            let parity = rs[32] >> 7;
            rs[32] &= 0x7f;
            Ok((rs, parity))
        }
        other => Err(RecoverError::BadLength(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    fn key() -> SigningKey {
        SigningKey::from_slice(&[7u8; 32]).unwrap()
    }

    fn sign(digest: B256) -> [u8; 65] {
        let (sig, rid) = key().sign_prehash_recoverable(digest.as_slice()).unwrap();
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = 27 + rid.to_byte();
        out
    }

    #[test]
    fn recovers_signer() {
        let digest = keccak256(b"ticket");
        let expected = address_of(key().verifying_key());
        assert_eq!(ecrecover_address(digest, &sign(digest)), Ok(expected));

        let mut raw = sign(digest);
        raw[64] -= 27;
        assert_eq!(ecrecover_address(digest, &raw), Ok(expected));
    }

    #[test]
    fn compact_form_recovers_signer() {
        let digest = keccak256(b"compact");
        let full = sign(digest);
        let mut compact = [0u8; 64];
        compact.copy_from_slice(&full[..64]);
        if full[64] == 28 {
            compact[32] |= 0x80;
        }
        assert_eq!(ecrecover_address(digest, &compact), Ok(address_of(key().verifying_key())));
    }

    #[test]
    fn flipped_parity_does_not_recover_signer() {
        let digest = keccak256(b"parity");
        let mut sig = sign(digest);
        sig[64] = if sig[64] == 27 { 28 } else { 27 };
        let expected = address_of(key().verifying_key());
        assert_ne!(ecrecover_address(digest, &sig).ok(), Some(expected));
    }

    #[test]
    fn rejects_bad_shapes() {
        let digest = keccak256(b"x");
        assert_eq!(ecrecover_address(digest, &[0u8; 10]), Err(RecoverError::BadLength(10)));

        let mut sig = sign(digest);
        sig[64] = 29;
        assert_eq!(ecrecover_address(digest, &sig), Err(RecoverError::BadRecoveryByte(29)));

        assert_eq!(ecrecover_address(digest, &[0u8; 65]), Err(RecoverError::Malformed));
    }
}

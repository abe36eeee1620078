//! Signature validation for both wallet modes.

use alloy_primitives::{Address, B256};
use meta_marketplace_types::{ecrecover_address, WalletMode, WalletValidator};

/// Whether `signature` over `digest` authorizes `account`.
///
/// Key-controlled accounts are recovered and compared; contract wallets are asked directly and
/// their answer is trusted. Signatures that are neither 64 nor 65 bytes never reach either path.
pub fn validate<W: WalletValidator + ?Sized>(
    wallets: &W,
    account: Address,
    mode: WalletMode,
    digest: B256,
    signature: &[u8],
) -> bool {
    if !matches!(signature.len(), 64 | 65) {
        tracing::debug!(%account, len = signature.len(), "Signature has unsupported length");
        return false;
    }
    match mode {
        WalletMode::ExternalAccount => match ecrecover_address(digest, signature) {
            Ok(recovered) => recovered == account,
            Err(err) => {
                tracing::debug!(%account, %err, "Signer recovery failed");
                false
            }
        },
        WalletMode::SmartContractWallet => wallets.is_valid_signature(account, digest, signature),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::keccak256;
    use k256::ecdsa::SigningKey;
    use meta_marketplace_types::address_of;

    struct Wallets {
        wallet: Address,
        accepts: bool,
    }

    impl WalletValidator for Wallets {
        fn is_valid_signature(&self, wallet: Address, _digest: B256, _signature: &[u8]) -> bool {
            self.accepts && wallet == self.wallet
        }
    }

    fn no_wallets() -> Wallets {
        Wallets { wallet: Address::ZERO, accepts: false }
    }

    fn signed(digest: B256) -> (Address, Vec<u8>) {
        let key = SigningKey::from_slice(&[3u8; 32]).unwrap();
        let (sig, rid) = key.sign_prehash_recoverable(digest.as_slice()).unwrap();
        let mut out = sig.to_bytes().to_vec();
        out.push(27 + rid.to_byte());
        (address_of(key.verifying_key()), out)
    }

    #[test]
    fn external_account_must_match_recovered_signer() {
        let digest = keccak256(b"offer");
        let (signer, sig) = signed(digest);
        assert!(validate(&no_wallets(), signer, WalletMode::ExternalAccount, digest, &sig));
        assert!(!validate(&no_wallets(), Address::repeat_byte(1), WalletMode::ExternalAccount, digest, &sig));
        assert!(!validate(&no_wallets(), signer, WalletMode::ExternalAccount, keccak256(b"other"), &sig));
    }

    #[test]
    fn contract_wallet_answer_is_trusted() {
        let wallet = Address::repeat_byte(0x5c);
        let digest = keccak256(b"offer");
        let sig = [9u8; 65];
        let yes = Wallets { wallet, accepts: true };
        let no = Wallets { wallet, accepts: false };
        assert!(validate(&yes, wallet, WalletMode::SmartContractWallet, digest, &sig));
        assert!(!validate(&no, wallet, WalletMode::SmartContractWallet, digest, &sig));
    }

    #[test]
    fn length_checked_before_either_path() {
        let wallet = Address::repeat_byte(0x5c);
        let yes = Wallets { wallet, accepts: true };
        assert!(!validate(&yes, wallet, WalletMode::SmartContractWallet, B256::ZERO, &[0u8; 66]));
        assert!(!validate(&yes, wallet, WalletMode::ExternalAccount, B256::ZERO, &[]));
    }
}

use alloy_primitives::{Address, U256};
use meta_marketplace_types::{LedgerError, TypedDataError};
use serde::Serialize;
use thiserror::Error;

/// Taxonomy bucket of a [`SettlementError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Malformed wire arguments. Fatal for this offer.
    Structural,
    /// A party or the caller is not who the offer says. Fatal for this offer.
    Authorization,
    /// Stale or reused nonce. Resubmit with fresh state.
    Replay,
    /// Buyer is underfunded or under-approved.
    Funds,
    /// The host broke its contract.
    Ledger,
}

/// Every way a settlement attempt is rejected.
///
/// Display strings start with a stable `MM_ERR_<code>` prefix.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SettlementError {
    // Structural
    #[error("MM_ERR_100: numeric arguments hold {0} words, need at least 5")]
    NumsTooShort(usize),
    #[error("MM_ERR_101: offer has no payment legs")]
    EmptyCurrencies,
    #[error("MM_ERR_102: {field} holds {actual} entries, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("MM_ERR_103: unknown wallet mode {0}")]
    UnknownWalletMode(U256),
    #[error("MM_ERR_104: leg {leg}: unknown payment mode {mode}")]
    UnknownPaymentMode { leg: usize, mode: U256 },
    #[error("MM_ERR_105: {0} does not fit its native width")]
    ValueOverflow(&'static str),
    #[error("MM_ERR_106: signature data holds {actual} bytes, need {expected}")]
    SignatureDataTooShort { expected: usize, actual: usize },
    #[error("MM_ERR_107: leg {leg}: relay payload truncated")]
    TruncatedRelayPayload { leg: usize },
    #[error("MM_ERR_108: {0} trailing bytes after signature data")]
    TrailingBytes(usize),
    #[error("MM_ERR_109: restricted offers are not configured")]
    RestrictedOffersDisabled,

    // Authorization
    #[error("MM_ERR_200: seller {seller} does not own ticket {ticket}")]
    InvalidTicketOwner { ticket: U256, seller: Address },
    #[error("MM_ERR_201: seller is buyer")]
    SellerIsBuyer,
    #[error("MM_ERR_202: invalid buyer signature")]
    InvalidBuyerSignature,
    #[error("MM_ERR_203: invalid seller signature")]
    InvalidSellerSignature,
    #[error("MM_ERR_204: invalid relay signature")]
    InvalidRelaySignature,
    #[error("MM_ERR_205: {0} is not the designated relayer")]
    UnauthorizedRelayer(Address),

    // Replay
    #[error("MM_ERR_300: invalid nonce: expected {expected}, got {actual}")]
    InvalidNonce { expected: u64, actual: u64 },
    #[error("MM_ERR_301: relay nonce {nonce} already used by {signer}")]
    RelayNonceError { signer: Address, nonce: U256 },

    // Funds
    #[error("MM_ERR_400: allowance on {asset} is {available}, need {needed}")]
    AllowanceError {
        asset: Address,
        needed: U256,
        available: U256,
    },
    #[error("MM_ERR_401: balance on {asset} is {available}, need {needed}")]
    BalanceError {
        asset: Address,
        needed: U256,
        available: U256,
    },

    // Host
    #[error("MM_ERR_900: ledger error: {0}")]
    Ledger(LedgerError),
    #[error("MM_ERR_901: typed data error: {0}")]
    TypedData(#[from] TypedDataError),
}

impl SettlementError {
    pub fn kind(&self) -> ErrorKind {
        use SettlementError::*;
        match self {
            NumsTooShort(_)
            | EmptyCurrencies
            | LengthMismatch { .. }
            | UnknownWalletMode(_)
            | UnknownPaymentMode { .. }
            | ValueOverflow(_)
            | SignatureDataTooShort { .. }
            | TruncatedRelayPayload { .. }
            | TrailingBytes(_)
            | RestrictedOffersDisabled => ErrorKind::Structural,
            InvalidTicketOwner { .. }
            | SellerIsBuyer
            | InvalidBuyerSignature
            | InvalidSellerSignature
            | InvalidRelaySignature
            | UnauthorizedRelayer(_) => ErrorKind::Authorization,
            InvalidNonce { .. } | RelayNonceError { .. } => ErrorKind::Replay,
            AllowanceError { .. } | BalanceError { .. } => ErrorKind::Funds,
            Ledger(_) | TypedData(_) => ErrorKind::Ledger,
        }
    }

    /// Numeric part of the `MM_ERR_<code>` prefix.
    pub fn code(&self) -> u16 {
        use SettlementError::*;
        match self {
            NumsTooShort(_) => 100,
            EmptyCurrencies => 101,
            LengthMismatch { .. } => 102,
            UnknownWalletMode(_) => 103,
            UnknownPaymentMode { .. } => 104,
            ValueOverflow(_) => 105,
            SignatureDataTooShort { .. } => 106,
            TruncatedRelayPayload { .. } => 107,
            TrailingBytes(_) => 108,
            RestrictedOffersDisabled => 109,
            InvalidTicketOwner { .. } => 200,
            SellerIsBuyer => 201,
            InvalidBuyerSignature => 202,
            InvalidSellerSignature => 203,
            InvalidRelaySignature => 204,
            UnauthorizedRelayer(_) => 205,
            InvalidNonce { .. } => 300,
            RelayNonceError { .. } => 301,
            AllowanceError { .. } => 400,
            BalanceError { .. } => 401,
            Ledger(_) => 900,
            TypedData(_) => 901,
        }
    }

    /// Map a ledger failure raised while funding a leg on `asset`.
    pub(crate) fn from_leg(asset: Address, err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientAllowance { needed, available } => {
                SettlementError::AllowanceError { asset, needed, available }
            }
            LedgerError::InsufficientBalance { needed, available } => {
                SettlementError::BalanceError { asset, needed, available }
            }
            LedgerError::InvalidSignature => SettlementError::InvalidRelaySignature,
            LedgerError::NonceConsumed { signer, nonce } => SettlementError::RelayNonceError { signer, nonce },
            other => SettlementError::Ledger(other),
        }
    }
}

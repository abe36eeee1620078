//! Typed structured-data digests (EIP-712).
//!
//! Buyer and seller sign independently and asynchronously, so every digest here is a pure
//! function of the domain and the typed fields.

use std::collections::BTreeMap;

use alloy_primitives::{keccak256, Address, B256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::offer::{Auction, MetaApproval, MetaTransfer, Offer, RelayParams, RestrictedRail};

pub const DEFAULT_DOMAIN_NAME: &str = "MetaMarketplace";
pub const DEFAULT_DOMAIN_VERSION: &str = "0";

/// Binds a signature to one deployment on one chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl SignedDomain {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        chain_id: u64,
        verifying_contract: Address,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            chain_id,
            verifying_contract,
        }
    }

    /// Marketplace domain with the default name and version.
    pub fn marketplace(chain_id: u64, verifying_contract: Address) -> Self {
        Self::new(DEFAULT_DOMAIN_NAME, DEFAULT_DOMAIN_VERSION, chain_id, verifying_contract)
    }

    pub fn separator(&self) -> Result<B256, TypedDataError> {
        EIP712_DOMAIN.hash_struct(&[
            FieldValue::String(self.name.clone()),
            FieldValue::String(self.version.clone()),
            FieldValue::Uint(U256::from(self.chain_id)),
            FieldValue::Address(self.verifying_contract),
        ])
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TypedDataError {
    #[error("{type_name}: expected {expected} fields, got {actual}")]
    ArityMismatch {
        type_name: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{type_name}.{field}: value is not a {expected}")]
    KindMismatch {
        type_name: &'static str,
        field: &'static str,
        expected: &'static str,
    },
}

/// Declared type of a typed-data field.
#[derive(Clone, Copy, Debug)]
pub enum FieldKind {
    Address,
    Uint256,
    Bytes,
    String,
    Struct(&'static TypeSchema),
}

impl FieldKind {
    fn type_name(self) -> &'static str {
        match self {
            FieldKind::Address => "address",
            FieldKind::Uint256 => "uint256",
            FieldKind::Bytes => "bytes",
            FieldKind::String => "string",
            FieldKind::Struct(schema) => schema.name,
        }
    }
}

#[derive(Debug)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// A named record type: its fields in signing order.
#[derive(Debug)]
pub struct TypeSchema {
    pub name: &'static str,
    pub fields: &'static [FieldDef],
}

/// Value of one field, matched positionally against a [`TypeSchema`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Address(Address),
    Uint(U256),
    Bytes(Vec<u8>),
    String(String),
    Struct(Vec<FieldValue>),
}

impl TypeSchema {
    /// `Name(type1 name1,type2 name2)`
    pub fn definition(&self) -> String {
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|f| format!("{} {}", f.kind.type_name(), f.name))
            .collect();
        format!("{}({})", self.name, fields.join(","))
    }

    /// Own definition followed by every referenced type, sorted by name.
    pub fn encode_type(&self) -> String {
        let mut deps = BTreeMap::new();
        self.collect_dependencies(&mut deps);
        deps.remove(self.name);

        let mut out = self.definition();
        for dep in deps.values() {
            out.push_str(&dep.definition());
        }
        out
    }

    fn collect_dependencies(&self, deps: &mut BTreeMap<&'static str, &'static TypeSchema>) {
        for field in self.fields {
            if let FieldKind::Struct(schema) = field.kind {
                if deps.insert(schema.name, schema).is_none() {
                    schema.collect_dependencies(deps);
                }
            }
        }
    }

    pub fn type_hash(&self) -> B256 {
        keccak256(self.encode_type().as_bytes())
    }

    pub fn hash_struct(&self, values: &[FieldValue]) -> Result<B256, TypedDataError> {
        if values.len() != self.fields.len() {
            return Err(TypedDataError::ArityMismatch {
                type_name: self.name,
                expected: self.fields.len(),
                actual: values.len(),
            });
        }

        let mut buf = Vec::with_capacity(32 * (values.len() + 1));
        buf.extend_from_slice(self.type_hash().as_slice());
        for (field, value) in self.fields.iter().zip(values) {
            let word: [u8; 32] = match (field.kind, value) {
                (FieldKind::Address, FieldValue::Address(addr)) => pad_address(*addr),
                (FieldKind::Uint256, FieldValue::Uint(v)) => v.to_be_bytes::<32>(),
                (FieldKind::Bytes, FieldValue::Bytes(b)) => keccak256(b).0,
                (FieldKind::String, FieldValue::String(s)) => keccak256(s.as_bytes()).0,
                (FieldKind::Struct(schema), FieldValue::Struct(inner)) => schema.hash_struct(inner)?.0,
                (kind, _) => {
                    return Err(TypedDataError::KindMismatch {
                        type_name: self.name,
                        field: field.name,
                        expected: kind.type_name(),
                    })
                }
            };
            buf.extend_from_slice(&word);
        }
        Ok(keccak256(buf))
    }
}

/// `keccak256("\x19\x01" || domainSeparator || hashStruct(values))`
pub fn build_digest(
    domain: &SignedDomain,
    schema: &TypeSchema,
    values: &[FieldValue],
) -> Result<B256, TypedDataError> {
    let struct_hash = schema.hash_struct(values)?;

    let mut buf = Vec::with_capacity(2 + 32 + 32);
    buf.extend_from_slice(b"\x19\x01");
    buf.extend_from_slice(domain.separator()?.as_slice());
    buf.extend_from_slice(struct_hash.as_slice());
    Ok(keccak256(buf))
}

fn pad_address(addr: Address) -> [u8; 32] {
    let mut padded = [0u8; 32];
    padded[12..32].copy_from_slice(addr.as_slice());
    padded
}

// --- Schemas ---------------------------------------------------------------------------------

static EIP712_DOMAIN_FIELDS: [FieldDef; 4] = [
    FieldDef { name: "name", kind: FieldKind::String },
    FieldDef { name: "version", kind: FieldKind::String },
    FieldDef { name: "chainId", kind: FieldKind::Uint256 },
    FieldDef { name: "verifyingContract", kind: FieldKind::Address },
];

pub static EIP712_DOMAIN: TypeSchema = TypeSchema {
    name: "EIP712Domain",
    fields: &EIP712_DOMAIN_FIELDS,
};

static MARKETPLACE_OFFER_FIELDS: [FieldDef; 6] = [
    FieldDef { name: "buyer", kind: FieldKind::Address },
    FieldDef { name: "seller", kind: FieldKind::Address },
    FieldDef { name: "ticket", kind: FieldKind::Uint256 },
    FieldDef { name: "nonce", kind: FieldKind::Uint256 },
    FieldDef { name: "currencies", kind: FieldKind::Bytes },
    FieldDef { name: "prices", kind: FieldKind::Bytes },
];

pub static MARKETPLACE_OFFER: TypeSchema = TypeSchema {
    name: "MarketplaceOffer",
    fields: &MARKETPLACE_OFFER_FIELDS,
};

static AUCTION_FIELDS: [FieldDef; 5] = [
    FieldDef { name: "seller", kind: FieldKind::Address },
    FieldDef { name: "buyer", kind: FieldKind::Address },
    FieldDef { name: "relayer", kind: FieldKind::Address },
    FieldDef { name: "ticket", kind: FieldKind::Uint256 },
    FieldDef { name: "nonce", kind: FieldKind::Uint256 },
];

pub static AUCTION: TypeSchema = TypeSchema {
    name: "Auction",
    fields: &AUCTION_FIELDS,
};

static AUCTION_OFFER_FIELDS: [FieldDef; 3] = [
    FieldDef { name: "auction", kind: FieldKind::Struct(&AUCTION) },
    FieldDef { name: "amount", kind: FieldKind::Uint256 },
    FieldDef { name: "reward", kind: FieldKind::Uint256 },
];

/// Restricted offer settled on the direct currency.
pub static DIRECT_AUCTION_OFFER: TypeSchema = TypeSchema {
    name: "DaiOffer",
    fields: &AUCTION_OFFER_FIELDS,
};

/// Restricted offer settled on the relayed currency.
pub static RELAYED_AUCTION_OFFER: TypeSchema = TypeSchema {
    name: "DaiPlusOffer",
    fields: &AUCTION_OFFER_FIELDS,
};

static ACTORS_FIELDS: [FieldDef; 2] = [
    FieldDef { name: "signer", kind: FieldKind::Address },
    FieldDef { name: "relayer", kind: FieldKind::Address },
];

pub static ACTORS: TypeSchema = TypeSchema {
    name: "Actors",
    fields: &ACTORS_FIELDS,
};

static TX_PARAMS_FIELDS: [FieldDef; 4] = [
    FieldDef { name: "nonce", kind: FieldKind::Uint256 },
    FieldDef { name: "gasLimit", kind: FieldKind::Uint256 },
    FieldDef { name: "gasPrice", kind: FieldKind::Uint256 },
    FieldDef { name: "reward", kind: FieldKind::Uint256 },
];

pub static TX_PARAMS: TypeSchema = TypeSchema {
    name: "TxParams",
    fields: &TX_PARAMS_FIELDS,
};

static META_TRANSFER_FIELDS: [FieldDef; 4] = [
    FieldDef { name: "recipient", kind: FieldKind::Address },
    FieldDef { name: "amount", kind: FieldKind::Uint256 },
    FieldDef { name: "actors", kind: FieldKind::Struct(&ACTORS) },
    FieldDef { name: "txparams", kind: FieldKind::Struct(&TX_PARAMS) },
];

pub static META_TRANSFER: TypeSchema = TypeSchema {
    name: "Transfer",
    fields: &META_TRANSFER_FIELDS,
};

static META_APPROVE_FIELDS: [FieldDef; 4] = [
    FieldDef { name: "spender", kind: FieldKind::Address },
    FieldDef { name: "amount", kind: FieldKind::Uint256 },
    FieldDef { name: "actors", kind: FieldKind::Struct(&ACTORS) },
    FieldDef { name: "txparams", kind: FieldKind::Struct(&TX_PARAMS) },
];

pub static META_APPROVE: TypeSchema = TypeSchema {
    name: "Approve",
    fields: &META_APPROVE_FIELDS,
};

// --- Record digests --------------------------------------------------------------------------

/// Digest both parties sign for a marketplace offer. Only the signed fields of `offer` are read.
pub fn marketplace_offer_digest(domain: &SignedDomain, offer: &Offer) -> Result<B256, TypedDataError> {
    build_digest(
        domain,
        &MARKETPLACE_OFFER,
        &[
            FieldValue::Address(offer.buyer),
            FieldValue::Address(offer.seller),
            FieldValue::Uint(offer.ticket),
            FieldValue::Uint(U256::from(offer.nonce)),
            FieldValue::Bytes(offer.currencies()),
            FieldValue::Bytes(offer.prices()),
        ],
    )
}

pub fn restricted_offer_digest(
    domain: &SignedDomain,
    rail: RestrictedRail,
    auction: &Auction,
    amount: U256,
    reward: U256,
) -> Result<B256, TypedDataError> {
    let schema = match rail {
        RestrictedRail::Direct => &DIRECT_AUCTION_OFFER,
        RestrictedRail::Relayed => &RELAYED_AUCTION_OFFER,
    };
    build_digest(
        domain,
        schema,
        &[
            FieldValue::Struct(vec![
                FieldValue::Address(auction.seller),
                FieldValue::Address(auction.buyer),
                FieldValue::Address(auction.relayer),
                FieldValue::Uint(auction.ticket),
                FieldValue::Uint(U256::from(auction.nonce)),
            ]),
            FieldValue::Uint(amount),
            FieldValue::Uint(reward),
        ],
    )
}

/// Digest of a meta-transfer, under the asset's own domain.
pub fn meta_transfer_digest(
    asset_domain: &SignedDomain,
    transfer: &MetaTransfer,
) -> Result<B256, TypedDataError> {
    build_digest(
        asset_domain,
        &META_TRANSFER,
        &[
            FieldValue::Address(transfer.recipient),
            FieldValue::Uint(transfer.amount),
            actors_value(transfer.signer, transfer.relayer),
            tx_params_value(&transfer.params),
        ],
    )
}

/// Digest of a meta-approval, under the asset's own domain.
pub fn meta_approve_digest(
    asset_domain: &SignedDomain,
    approval: &MetaApproval,
) -> Result<B256, TypedDataError> {
    build_digest(
        asset_domain,
        &META_APPROVE,
        &[
            FieldValue::Address(approval.spender),
            FieldValue::Uint(approval.amount),
            actors_value(approval.signer, approval.relayer),
            tx_params_value(&approval.params),
        ],
    )
}

fn actors_value(signer: Address, relayer: Address) -> FieldValue {
    FieldValue::Struct(vec![FieldValue::Address(signer), FieldValue::Address(relayer)])
}

fn tx_params_value(params: &RelayParams) -> FieldValue {
    FieldValue::Struct(vec![
        FieldValue::Uint(params.nonce),
        FieldValue::Uint(params.gas_limit),
        FieldValue::Uint(params.gas_price),
        FieldValue::Uint(params.reward),
    ])
}

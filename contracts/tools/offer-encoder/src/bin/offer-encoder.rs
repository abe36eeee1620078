use std::{fs, path::PathBuf};

use alloy_primitives::Address;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use k256::ecdsa::SigningKey;
use meta_marketplace_types::{eip712::marketplace_offer_digest, SignedDomain};
use offer_encoder::{encode_offer, sign_offer, signer_address, OfferDraft};
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Sign a marketplace offer draft and print its wire arguments as JSON.
///
/// Relayed legs that carry an `asset_domain` get their meta-transfer signed by the buyer key.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Offer draft JSON (seller, buyer, ticket, nonce, legs).
    #[arg(long)]
    draft: PathBuf,

    /// Chain id of the marketplace deployment.
    #[arg(long, env = "CHAIN_ID")]
    chain_id: u64,

    /// Marketplace engine address (the domain's verifying contract).
    #[arg(long, env = "MARKETPLACE_ADDRESS")]
    marketplace: Address,

    #[arg(long, env = "DOMAIN_NAME", default_value = "MetaMarketplace")]
    domain_name: String,

    #[arg(long, env = "DOMAIN_VERSION", default_value = "0")]
    domain_version: String,

    /// Buyer private key (hex string, 0x...).
    #[arg(long, env = "BUYER_KEY")]
    buyer_key: String,

    /// Seller private key (hex string, 0x...).
    #[arg(long, env = "SELLER_KEY")]
    seller_key: String,

    /// Pretty-print the output.
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let raw = fs::read_to_string(&cli.draft).with_context(|| format!("failed reading {}", cli.draft.display()))?;
    let mut draft: OfferDraft =
        serde_json::from_str(&raw).with_context(|| format!("failed parsing offer draft in {}", cli.draft.display()))?;

    let buyer_key = parse_key(&cli.buyer_key).context("invalid buyer key")?;
    let seller_key = parse_key(&cli.seller_key).context("invalid seller key")?;
    if signer_address(&buyer_key) != draft.buyer {
        tracing::warn!(buyer = %draft.buyer, key = %signer_address(&buyer_key), "Buyer key does not match draft buyer");
    }
    if signer_address(&seller_key) != draft.seller {
        tracing::warn!(seller = %draft.seller, key = %signer_address(&seller_key), "Seller key does not match draft seller");
    }

    let domain = SignedDomain::new(cli.domain_name, cli.domain_version, cli.chain_id, cli.marketplace);
    sign_offer(&domain, &mut draft, &buyer_key, &seller_key).context("failed signing offer")?;
    let digest = marketplace_offer_digest(&domain, &draft.to_offer()).context("failed building offer digest")?;
    let wire = encode_offer(&draft);
    tracing::info!(ticket = %draft.ticket, %digest, legs = draft.legs.len(), "Offer encoded");

    let output = json!({
        "digest": digest,
        "addr": wire.addr,
        "nums": wire.nums,
        "bdata": wire.bdata,
    });
    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }
    .context("failed serialising output")?;
    println!("{rendered}");
    Ok(())
}

fn parse_key(raw: &str) -> Result<SigningKey> {
    let bytes = hex::decode(raw.trim().trim_start_matches("0x")).map_err(|e| anyhow!("key is not hex: {e}"))?;
    SigningKey::from_slice(&bytes).map_err(|e| anyhow!("key is not a valid secp256k1 scalar: {e}"))
}

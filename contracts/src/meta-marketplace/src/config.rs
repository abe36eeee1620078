use std::path::{Path, PathBuf};

use alloy_primitives::Address;
use meta_marketplace_types::SignedDomain;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Currencies accepted by relayer-restricted offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictedCurrencies {
    /// Settled by allowance pull.
    pub direct: Address,
    /// Settled after a relayed meta-approval.
    pub relayed: Address,
}

/// Deployment parameters of one marketplace instance.
///
/// ```json
/// {
///   "domain": {
///     "name": "MetaMarketplace",
///     "version": "0",
///     "chain_id": 1,
///     "verifying_contract": "0x00000000000000000000000000000000000000ee"
///   },
///   "restricted": null
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    /// Its `verifying_contract` is the engine's own address.
    pub domain: SignedDomain,
    #[serde(default)]
    pub restricted: Option<RestrictedCurrencies>,
}

impl MarketplaceConfig {
    pub fn new(domain: SignedDomain) -> Self {
        Self { domain, restricted: None }
    }

    pub fn with_restricted(mut self, currencies: RestrictedCurrencies) -> Self {
        self.restricted = Some(currencies);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domain.name.is_empty() {
            return Err(ConfigError::Invalid("domain name is empty"));
        }
        if self.domain.verifying_contract == Address::ZERO {
            return Err(ConfigError::Invalid("verifying contract is the zero address"));
        }
        if let Some(currencies) = &self.restricted {
            if currencies.direct == Address::ZERO || currencies.relayed == Address::ZERO {
                return Err(ConfigError::Invalid("restricted currency is the zero address"));
            }
            if currencies.direct == currencies.relayed {
                return Err(ConfigError::Invalid("restricted currencies must differ"));
            }
        }
        Ok(())
    }
}

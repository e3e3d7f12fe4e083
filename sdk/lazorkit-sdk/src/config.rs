//! SDK configuration
//!
//! ```ignore
//! let config = LazorkitConfig::default()
//!     .with_url("https://dialog.example.com")
//!     .with_mode(DialogMode::Window)
//!     .with_timeout_ms(10_000);
//! config.validate()?;
//! ```

use crate::core::constants::{
    DEFAULT_COMPUTE_UNIT_LIMIT, DEFAULT_DIALOG_URL, DEFAULT_PAYMASTER_URL, DEFAULT_RPC_URL,
    DEFAULT_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {field} URL: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("Timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Invalid lookup table address: {0}")]
    InvalidLookupTable(String),

    #[error("Invalid config JSON: {0}")]
    Json(String),
}

/// Where the signer surface is hosted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogMode {
    /// Embedded frame inside the host page
    #[serde(alias = "dialog", alias = "iframe")]
    Embedded,
    /// Separate top-level window
    #[serde(alias = "popup")]
    Window,
    /// Embedded when the host supports it, popup otherwise
    #[default]
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LazorkitConfig {
    /// Signer surface URL; its origin is always trusted
    pub url: String,
    pub mode: DialogMode,
    /// Retry as a popup when an embedded frame is unavailable
    pub fallback_to_popup: bool,
    pub rpc_url: String,
    pub paymaster_url: String,
    /// Default per-request timeout
    pub timeout_ms: u64,
    /// Address lookup table used for v0 transactions, base58
    pub lookup_table_address: Option<String>,
    /// Prepended as a compute budget instruction when set
    pub compute_unit_limit: Option<u32>,
}

impl Default for LazorkitConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DIALOG_URL.to_string(),
            mode: DialogMode::Auto,
            fallback_to_popup: true,
            rpc_url: DEFAULT_RPC_URL.to_string(),
            paymaster_url: DEFAULT_PAYMASTER_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            lookup_table_address: None,
            compute_unit_limit: Some(DEFAULT_COMPUTE_UNIT_LIMIT),
        }
    }
}

impl LazorkitConfig {
    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("dialog", &self.url),
            ("rpc", &self.rpc_url),
            ("paymaster", &self.paymaster_url),
        ] {
            Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
                field,
                reason: e.to_string(),
            })?;
        }

        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        self.lookup_table()?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Origin (scheme, host, port) of the signer surface URL
    pub fn dialog_origin(&self) -> Result<String, ConfigError> {
        let url = Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl {
            field: "dialog",
            reason: e.to_string(),
        })?;
        Ok(url.origin().ascii_serialization())
    }

    pub fn lookup_table(&self) -> Result<Option<Pubkey>, ConfigError> {
        self.lookup_table_address
            .as_deref()
            .map(|address| {
                Pubkey::from_str(address)
                    .map_err(|_| ConfigError::InvalidLookupTable(address.to_string()))
            })
            .transpose()
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_mode(mut self, mode: DialogMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_fallback_to_popup(mut self, fallback: bool) -> Self {
        self.fallback_to_popup = fallback;
        self
    }

    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    pub fn with_paymaster_url(mut self, paymaster_url: impl Into<String>) -> Self {
        self.paymaster_url = paymaster_url.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_lookup_table(mut self, address: Pubkey) -> Self {
        self.lookup_table_address = Some(address.to_string());
        self
    }

    pub fn with_compute_unit_limit(mut self, limit: Option<u32>) -> Self {
        self.compute_unit_limit = limit;
        self
    }
}

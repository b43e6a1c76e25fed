//! Server configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 4402
//! rpc_url = "https://sepolia.base.org"
//! signer_private_key = "$SIGNER_PRIVATE_KEY"
//! registry_url = "https://services.example.com/api"
//!
//! [facilitator]
//! url = "https://x402.org/facilitator"
//! network = "base-sepolia"
//! chain_id = 84532
//! asset = "0x036CbD53842c5426634e7929541eC2318f3dCF7e"
//! name = "USDC"
//! version = "2"
//! ```
//!
//! Services may be listed inline as `[[services]]` tables instead of a
//! `registry_url`; their keys use the registry's camelCase JSON names.
//!
//! # Environment Variables
//!
//! - `HOST` - Override server bind address
//! - `PORT` - Override server port
//! - Any variable referenced by `$VAR` in the config file

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use r402x::descriptor::ServiceDescriptor;
use r402x_evm::HeldKeySigner;
use r402x_evm::orchestrator::ExecutorConfig;
use r402x_evm::params::{DEFAULT_VALID_AFTER_SKEW_SECS, DEFAULT_VALIDITY_SECS};
use r402x_http::constants::DEFAULT_FACILITATOR_URL;
use r402x_http::facilitator::FacilitatorSettings;
use serde::Deserialize;
use url::Url;

/// Errors raised while loading or interpreting the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for [`ServerConfig`].
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// A required key is empty or still references an unset variable.
    #[error("`{0}` is not set (missing environment variable?)")]
    Missing(&'static str),
    /// A key holds an unusable value.
    #[error("invalid `{key}`: {reason}")]
    Invalid {
        /// Offending key.
        key: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (default: `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Server port (default: `4402`).
    #[serde(default = "default_port")]
    pub port: u16,

    /// HTTP RPC endpoint of the settlement chain.
    #[serde(default)]
    pub rpc_url: String,

    /// Private key of the paying account (hex, with or without `0x`).
    #[serde(default)]
    pub signer_private_key: String,

    /// Base URL of a remote service registry.
    #[serde(default)]
    pub registry_url: Option<String>,

    /// Seconds the remote service list is cached.
    #[serde(default = "default_registry_cache_secs")]
    pub registry_cache_secs: u64,

    /// Inline services, used when no `registry_url` is set.
    #[serde(default)]
    pub services: Vec<ServiceDescriptor>,

    /// Seconds a signed authorization stays valid.
    #[serde(default = "default_validity_seconds")]
    pub validity_seconds: u64,

    /// Seconds `validAfter` is back-dated.
    #[serde(default = "default_valid_after_skew_seconds")]
    pub valid_after_skew_seconds: u64,

    /// Seconds to wait for a settlement receipt.
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,

    /// Confirmations required before a settlement counts as mined.
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,

    /// Remote facilitator for hook-less payments.
    #[serde(default)]
    pub facilitator: Option<FacilitatorConfig>,
}

/// `[facilitator]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct FacilitatorConfig {
    /// Facilitator base URL.
    #[serde(default = "default_facilitator_url")]
    pub url: String,

    /// Token and network the facilitator settles in.
    #[serde(flatten)]
    pub settings: FacilitatorSettings,
}

const fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

const fn default_port() -> u16 {
    4402
}

const fn default_registry_cache_secs() -> u64 {
    60
}

const fn default_validity_seconds() -> u64 {
    DEFAULT_VALIDITY_SECS
}

const fn default_valid_after_skew_seconds() -> u64 {
    DEFAULT_VALID_AFTER_SKEW_SECS
}

const fn default_receipt_timeout_secs() -> u64 {
    60
}

const fn default_confirmations() -> u64 {
    1
}

fn default_facilitator_url() -> String {
    DEFAULT_FACILITATOR_URL.to_owned()
}

impl ServerConfig {
    /// Loads configuration from `path`.
    ///
    /// A missing file yields the defaults. After loading, `$VAR` / `${VAR}`
    /// references are expanded from the process environment and `HOST` /
    /// `PORT` override the file values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = if path.exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_owned(),
                source,
            })?
        } else {
            String::new()
        };

        let mut config = Self::parse(&content, |name| std::env::var(name).ok())?;

        if let Ok(host) = std::env::var("HOST")
            && let Ok(addr) = host.parse()
        {
            config.host = addr;
        }
        if let Ok(port) = std::env::var("PORT")
            && let Ok(port) = port.parse()
        {
            config.port = port;
        }

        Ok(config)
    }

    /// Parses TOML `content`, resolving variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on invalid TOML.
    pub fn parse(
        content: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        Ok(toml::from_str(&expand_vars(content, lookup))?)
    }

    /// Parsed RPC endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `rpc_url` is unset or not a URL.
    pub fn rpc_url(&self) -> Result<Url, ConfigError> {
        let raw = resolved("rpc_url", &self.rpc_url)?;
        Url::parse(raw).map_err(|e| ConfigError::Invalid {
            key: "rpc_url",
            reason: e.to_string(),
        })
    }

    /// The held-key signer for server-driven executions.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the key is unset or malformed.
    pub fn signer(&self) -> Result<HeldKeySigner, ConfigError> {
        let raw = resolved("signer_private_key", &self.signer_private_key)?;
        HeldKeySigner::from_str(raw).map_err(|e| ConfigError::Invalid {
            key: "signer_private_key",
            reason: e.to_string(),
        })
    }

    /// Pipeline tunables.
    #[must_use]
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            validity_seconds: self.validity_seconds,
            valid_after_skew_seconds: self.valid_after_skew_seconds,
            ..ExecutorConfig::default()
        }
    }

    /// How long to wait for a settlement receipt.
    #[must_use]
    pub const fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    /// How long the remote service list is cached.
    #[must_use]
    pub const fn registry_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.registry_cache_secs)
    }
}

/// Returns `value` trimmed, rejecting empty values and unresolved variables.
fn resolved<'a>(key: &'static str, value: &'a str) -> Result<&'a str, ConfigError> {
    let value = value.trim();
    if value.is_empty() || value.starts_with('$') {
        return Err(ConfigError::Missing(key));
    }
    Ok(value)
}

/// Expands `$VAR` and `${VAR}` patterns in `input` using `lookup`.
///
/// Unresolved variables are left as-is.
fn expand_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut var_name = String::new();
        while let Some(&c) = chars.peek() {
            if braced {
                if c == '}' {
                    chars.next();
                    break;
                }
            } else if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            var_name.push(c);
            chars.next();
        }

        if var_name.is_empty() {
            result.push('$');
            if braced {
                result.push('{');
            }
        } else if let Some(val) = lookup(&var_name) {
            result.push_str(&val);
        } else {
            result.push('$');
            if braced {
                result.push('{');
            }
            result.push_str(&var_name);
            if braced {
                result.push('}');
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_expand_plain_and_braced() {
        let lookup = env(&[("KEY", "abc"), ("RPC", "https://rpc")]);
        assert_eq!(expand_vars("k=$KEY;", &lookup), "k=abc;");
        assert_eq!(expand_vars("${RPC}/v1", &lookup), "https://rpc/v1");
    }

    #[test]
    fn test_unresolved_variables_are_kept() {
        let lookup = env(&[]);
        assert_eq!(expand_vars("$MISSING", &lookup), "$MISSING");
        assert_eq!(expand_vars("${MISSING}", &lookup), "${MISSING}");
        assert_eq!(expand_vars("cost $ 5", &lookup), "cost $ 5");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ServerConfig::parse("", env(&[])).unwrap();
        assert_eq!(config.port, 4402);
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.validity_seconds, 3600);
        assert_eq!(config.confirmations, 1);
        assert!(config.facilitator.is_none());
        assert!(config.services.is_empty());
        assert!(matches!(config.signer(), Err(ConfigError::Missing("signer_private_key"))));
        assert!(matches!(config.rpc_url(), Err(ConfigError::Missing("rpc_url"))));
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
            port = 8080
            rpc_url = "$RPC_URL"
            signer_private_key = "${SIGNER_KEY}"
            validity_seconds = 900

            [[services]]
            id = "mint-badge"
            title = "Mint a badge"
            hookType = "nft-mint"
            hookAddress = "0x1111111111111111111111111111111111111111"
            network = "base-sepolia"
            chainId = 84532
            settlementRouterAddress = "0x817e4f0ee2fbdaac426f1178e149f7dc98873ecb"
            stablecoinAddress = "0x036CbD53842c5426634e7929541eC2318f3dCF7e"
            supportingContracts = { nftContract = "0x2222222222222222222222222222222222222222" }
            defaults = { paymentAmount = "0.1", payTo = "0x3333333333333333333333333333333333333333" }

            [facilitator]
            network = "base-sepolia"
            chain_id = 84532
            asset = "0x036CbD53842c5426634e7929541eC2318f3dCF7e"
            name = "USDC"
            version = "2"
        "#;
        let lookup = env(&[
            ("RPC_URL", "https://sepolia.base.org"),
            (
                "SIGNER_KEY",
                "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318",
            ),
        ]);
        let config = ServerConfig::parse(toml, lookup).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rpc_url().unwrap().as_str(), "https://sepolia.base.org/");
        assert!(config.signer().is_ok());
        assert_eq!(config.executor_config().validity_seconds, 900);
        assert_eq!(config.services.len(), 1);
        assert_eq!(config.services[0].id, "mint-badge");

        let facilitator = config.facilitator.unwrap();
        assert_eq!(facilitator.url, DEFAULT_FACILITATOR_URL);
        assert_eq!(facilitator.settings.chain_id, 84532);
        assert_eq!(facilitator.settings.decimals, 6);
        assert_eq!(facilitator.settings.max_timeout_seconds, 300);
    }

    #[test]
    fn test_malformed_key_is_invalid() {
        let config = ServerConfig::parse(r#"signer_private_key = "0xnothex""#, env(&[])).unwrap();
        assert!(matches!(
            config.signer(),
            Err(ConfigError::Invalid { key: "signer_private_key", .. })
        ));
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        assert!(matches!(
            ServerConfig::parse("port = \"not a port\"", env(&[])),
            Err(ConfigError::Parse(_))
        ));
    }
}

//! Configuration module for the contract invoker.
//!
//! This module provides the structures for configuring the invoker: which
//! network to talk to, which account signs, where the default contract ABI
//! lives and how chains map to signing conventions. Configuration is loaded
//! from TOML, with `${VAR}` and `${VAR:-default}` placeholders resolved from the
//! environment before parsing, and validated once parsed.

use invoker_types::{
	parse_address, parse_chain_id, Address, ChainId, SecretString, SigningConvention,
	SigningConventions, MULTICALL3_ADDRESS,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// ABI used when no default ABI file is configured.
pub const EMPTY_ABI: &str = "[]";

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the invoker.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// The network the invoker talks to.
	pub network: NetworkConfig,
	/// The signing account. Without it only read operations work.
	pub account: Option<AccountConfig>,
	/// Contract defaults.
	#[serde(default)]
	pub contracts: ContractsConfig,
	/// Overrides of the built-in signing convention table.
	#[serde(default)]
	pub signing: SigningConfig,
}

/// Network connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// Chain id the account signs for.
	pub chain_id: ChainId,
	/// HTTP(S) JSON-RPC endpoint.
	pub rpc_url: String,
	/// How long to wait for a transaction receipt.
	/// Defaults to 120 seconds if not specified.
	#[serde(default = "default_receipt_timeout_seconds")]
	pub receipt_timeout_seconds: u64,
	/// Delay between receipt polls.
	/// Defaults to 2 seconds if not specified.
	#[serde(default = "default_poll_interval_seconds")]
	pub poll_interval_seconds: u64,
}

fn default_receipt_timeout_seconds() -> u64 {
	120
}

fn default_poll_interval_seconds() -> u64 {
	2
}

impl NetworkConfig {
	pub fn receipt_timeout(&self) -> Duration {
		Duration::from_secs(self.receipt_timeout_seconds)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_seconds)
	}
}

/// The signing account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Hex private key, usually supplied through an environment placeholder.
	pub private_key: SecretString,
}

/// Contract defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContractsConfig {
	/// JSON ABI used for contracts looked up without an explicit ABI.
	/// Relative paths are resolved against the configuration file's directory.
	pub default_abi_path: Option<String>,
	/// Multicall3 deployment; the canonical address when absent.
	pub multicall_address: Option<String>,
}

/// Signing convention overrides keyed by chain id.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SigningConfig {
	#[serde(default)]
	pub conventions: HashMap<String, SigningConvention>,
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let var_name = var_name.as_str();

		let value = match (std::env::var(var_name), cap.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name
				)))
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

fn is_private_key(key: &str) -> bool {
	let digits = key.trim().trim_start_matches("0x");
	digits.len() == 64 && digits.chars().all(|c| c.is_ascii_hexdigit())
}

impl Config {
	/// Loads configuration from a file with environment variable resolution.
	///
	/// A relative `default_abi_path` is rewritten to be relative to the
	/// directory holding the configuration file.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let contents = tokio::fs::read_to_string(path).await?;
		let mut config: Config = contents.parse()?;

		let base_dir = Path::new(path).parent().unwrap_or_else(|| Path::new("."));
		if let Some(abi_path) = config.contracts.default_abi_path.as_mut() {
			if Path::new(abi_path.as_str()).is_relative() {
				*abi_path = base_dir.join(abi_path.as_str()).to_string_lossy().into_owned();
			}
		}

		tracing::debug!(path, chain_id = config.network.chain_id, "Loaded configuration");
		Ok(config)
	}

	/// Reads the default ABI, or returns the empty ABI if none is configured.
	pub async fn default_abi(&self) -> Result<String, ConfigError> {
		match &self.contracts.default_abi_path {
			Some(path) => Ok(tokio::fs::read_to_string(path).await?),
			None => Ok(EMPTY_ABI.to_string()),
		}
	}

	/// The Multicall3 contract address.
	pub fn multicall_address(&self) -> Result<Address, ConfigError> {
		match &self.contracts.multicall_address {
			Some(address) => {
				parse_address(address).map_err(|e| ConfigError::Validation(e.to_string()))
			},
			None => Ok(MULTICALL3_ADDRESS),
		}
	}

	/// The built-in signing convention table with configured overrides applied.
	pub fn signing_conventions(&self) -> Result<SigningConventions, ConfigError> {
		let mut conventions = SigningConventions::default();
		for (chain_id, convention) in &self.signing.conventions {
			let chain_id = parse_chain_id(chain_id).map_err(|e| {
				ConfigError::Validation(format!("Invalid signing convention key: {}", e))
			})?;
			conventions.extend([(chain_id, *convention)]);
		}
		Ok(conventions)
	}

	/// Validates the configuration to ensure all values are usable.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.network.chain_id == 0 {
			return Err(ConfigError::Validation("Chain id must be positive".into()));
		}

		let rpc_url = self.network.rpc_url.trim();
		if !(rpc_url.starts_with("http://") || rpc_url.starts_with("https://")) {
			return Err(ConfigError::Validation(format!(
				"RPC URL must use http or https: '{}'",
				self.network.rpc_url
			)));
		}

		if self.network.receipt_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"receipt_timeout_seconds must be greater than 0".into(),
			));
		}
		if self.network.poll_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"poll_interval_seconds must be greater than 0".into(),
			));
		}
		if self.network.poll_interval_seconds > self.network.receipt_timeout_seconds {
			return Err(ConfigError::Validation(format!(
				"poll_interval_seconds ({}) cannot exceed receipt_timeout_seconds ({})",
				self.network.poll_interval_seconds, self.network.receipt_timeout_seconds
			)));
		}

		if let Some(account) = &self.account {
			if !account.private_key.with_exposed(is_private_key) {
				return Err(ConfigError::Validation(
					"account.private_key must be 32 bytes of hex".into(),
				));
			}
		}

		self.multicall_address()?;
		self.signing_conventions()?;

		Ok(())
	}
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved first and the configuration is
/// validated after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

//! Chain identifiers and signing conventions.
//!
//! Most EVM chains expect raw transaction signatures to carry the EIP-155
//! replay-protected `v`. A handful of networks validate against the bare
//! y-parity bit instead. Which chains fall into which group is a lookup table,
//! not a rule, so it is modelled as data that configuration can extend.

use crate::{without_0x_prefix, ParseError};
use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Numeric identifier of an EVM network.
pub type ChainId = u64;

/// Chains whose raw transaction signatures use the y-parity convention.
///
/// Each entry pairs the chain id with a human readable network name.
pub const Y_PARITY_CHAINS: [(ChainId, &str); 10] = [
	(137, "polygon"),
	(80001, "polygon-mumbai"),
	(1666600000, "harmony"),
	(1666700000, "harmony-testnet"),
	(25, "cronos"),
	(338, "cronos-testnet"),
	(250, "fantom"),
	(0xfa2, "fantom-testnet"),
	(43114, "avalanche"),
	(43113, "avalanche-fuji"),
];

/// Address Multicall3 is deployed at on most EVM networks.
pub const MULTICALL3_ADDRESS: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

/// Parses a chain id from a decimal or `0x`-prefixed hex string.
///
/// Zero is rejected since no network uses it.
pub fn parse_chain_id(value: &str) -> Result<ChainId, ParseError> {
	let trimmed = value.trim();
	let is_hex = trimmed
		.get(..2)
		.is_some_and(|prefix| prefix.eq_ignore_ascii_case("0x"));
	let parsed = if is_hex {
		u64::from_str_radix(without_0x_prefix(trimmed), 16)
	} else {
		trimmed.parse::<u64>()
	};

	match parsed {
		Ok(chain_id) if chain_id > 0 => Ok(chain_id),
		_ => Err(ParseError::InvalidChainId(value.to_string())),
	}
}

/// How the recovery id is folded into `v` when signing a raw transaction hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningConvention {
	/// `v` is the bare recovery id (0 or 1).
	YParity,
	/// `v = recovery_id + chain_id * 2 + 35`.
	Eip155,
}

impl SigningConvention {
	/// Encodes `v` for the given recovery id and chain, big-endian and minimal.
	pub fn encode_v(&self, recovery_id: u8, chain_id: ChainId) -> Vec<u8> {
		match self {
			SigningConvention::YParity => vec![recovery_id],
			SigningConvention::Eip155 => {
				let v = u128::from(recovery_id) + u128::from(chain_id) * 2 + 35;
				let bytes = v.to_be_bytes();
				let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
				bytes[first..].to_vec()
			},
		}
	}
}

/// Lookup table from chain id to signing convention.
///
/// Chains absent from the table use [`SigningConvention::Eip155`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningConventions {
	table: HashMap<ChainId, SigningConvention>,
}

impl SigningConventions {
	/// Creates a table with no special cases: every chain uses EIP-155.
	pub fn empty() -> Self {
		Self {
			table: HashMap::new(),
		}
	}

	/// Returns the convention for a chain.
	pub fn convention_for(&self, chain_id: ChainId) -> SigningConvention {
		self.table
			.get(&chain_id)
			.copied()
			.unwrap_or(SigningConvention::Eip155)
	}

	/// Returns a copy of this table with one entry added or replaced.
	pub fn with_convention(mut self, chain_id: ChainId, convention: SigningConvention) -> Self {
		self.table.insert(chain_id, convention);
		self
	}

	/// Adds or replaces entries, later entries winning.
	pub fn extend<I>(&mut self, entries: I)
	where
		I: IntoIterator<Item = (ChainId, SigningConvention)>,
	{
		self.table.extend(entries);
	}

	/// Chains that use the y-parity convention, in ascending order.
	pub fn y_parity_chains(&self) -> Vec<ChainId> {
		let mut chains: Vec<ChainId> = self
			.table
			.iter()
			.filter(|(_, convention)| **convention == SigningConvention::YParity)
			.map(|(chain_id, _)| *chain_id)
			.collect();
		chains.sort_unstable();
		chains
	}
}

impl Default for SigningConventions {
	fn default() -> Self {
		Self {
			table: Y_PARITY_CHAINS
				.iter()
				.map(|(chain_id, _)| (*chain_id, SigningConvention::YParity))
				.collect(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_table_matches_y_parity_whitelist() {
		let conventions = SigningConventions::default();

		assert_eq!(
			conventions.y_parity_chains(),
			vec![25, 137, 250, 338, 4002, 43113, 43114, 80001, 1666600000, 1666700000]
		);
		assert_eq!(conventions.convention_for(137), SigningConvention::YParity);
		assert_eq!(conventions.convention_for(4002), SigningConvention::YParity);
		assert_eq!(conventions.convention_for(1), SigningConvention::Eip155);
		assert_eq!(conventions.convention_for(56), SigningConvention::Eip155);
		assert_eq!(conventions.convention_for(10), SigningConvention::Eip155);
	}

	#[test]
	fn test_table_overrides() {
		let conventions = SigningConventions::default()
			.with_convention(56, SigningConvention::YParity)
			.with_convention(137, SigningConvention::Eip155);

		assert_eq!(conventions.convention_for(56), SigningConvention::YParity);
		assert_eq!(conventions.convention_for(137), SigningConvention::Eip155);
		assert_eq!(
			SigningConventions::empty().convention_for(137),
			SigningConvention::Eip155
		);
	}

	#[test]
	fn test_encode_v() {
		assert_eq!(SigningConvention::YParity.encode_v(0, 137), vec![0x00]);
		assert_eq!(SigningConvention::YParity.encode_v(1, 137), vec![0x01]);
		assert_eq!(SigningConvention::Eip155.encode_v(0, 1), vec![37]);
		assert_eq!(SigningConvention::Eip155.encode_v(1, 1), vec![38]);
		// 11155111 * 2 + 35 = 22310257 = 0x01546d71
		assert_eq!(
			SigningConvention::Eip155.encode_v(0, 11155111),
			vec![0x01, 0x54, 0x6d, 0x71]
		);
	}

	#[test]
	fn test_parse_chain_id() {
		assert_eq!(parse_chain_id("1").unwrap(), 1);
		assert_eq!(parse_chain_id(" 137 ").unwrap(), 137);
		assert_eq!(parse_chain_id("0xfa2").unwrap(), 4002);
		assert!(parse_chain_id("0").is_err());
		assert!(parse_chain_id("-1").is_err());
		assert!(parse_chain_id("mainnet").is_err());
		assert!(parse_chain_id("").is_err());
	}

	#[test]
	fn test_convention_serde_names() {
		let parsed: HashMap<String, SigningConvention> =
			serde_json::from_str(r#"{"a": "y_parity", "b": "eip155"}"#).unwrap();

		assert_eq!(parsed["a"], SigningConvention::YParity);
		assert_eq!(parsed["b"], SigningConvention::Eip155);
	}
}

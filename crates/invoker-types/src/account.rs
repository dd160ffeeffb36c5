//! Account types: address parsing and the signature byte layout.

use crate::{without_0x_prefix, ParseError};
use alloy::primitives::Address;
use std::fmt;
use std::str::FromStr;

/// Parses a hex address, accepting any letter case and an optional `0x` prefix.
///
/// Checksums are not enforced: two spellings of the same 20 bytes parse to the
/// same `Address`, which is what makes address comparison case-insensitive.
pub fn parse_address(value: &str) -> Result<Address, ParseError> {
	let trimmed = value.trim();
	let digits = without_0x_prefix(trimmed);
	if digits.len() != 40 {
		return Err(ParseError::InvalidAddress(value.to_string()));
	}
	Address::from_str(digits).map_err(|_| ParseError::InvalidAddress(value.to_string()))
}

/// Returns the EIP-55 checksummed form of an address.
pub fn checksum(address: &Address) -> String {
	address.to_checksum(None)
}

/// An ECDSA signature laid out as `r || s || v`.
///
/// `r` and `s` are always 32 bytes each. `v` is one byte for the usual
/// `27/28` and y-parity encodings, and may be longer when it carries an
/// EIP-155 value for a large chain id. Every constructor guarantees at least
/// 65 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(Vec<u8>);

impl Signature {
	/// Assembles a signature from its components. `v` must not be empty.
	pub fn from_parts(r: [u8; 32], s: [u8; 32], v: &[u8]) -> Result<Self, ParseError> {
		if v.is_empty() {
			return Err(ParseError::InvalidSignature("empty v component".into()));
		}
		let mut bytes = Vec::with_capacity(64 + v.len());
		bytes.extend_from_slice(&r);
		bytes.extend_from_slice(&s);
		bytes.extend_from_slice(v);
		Ok(Self(bytes))
	}

	/// Wraps raw `r || s || v` bytes.
	pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ParseError> {
		if bytes.len() < 65 {
			return Err(ParseError::InvalidSignature(format!(
				"expected at least 65 bytes, got {}",
				bytes.len()
			)));
		}
		Ok(Self(bytes))
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	/// The 32-byte `r` component.
	pub fn r(&self) -> &[u8] {
		&self.0[..32]
	}

	/// The 32-byte `s` component.
	pub fn s(&self) -> &[u8] {
		&self.0[32..64]
	}

	/// The big-endian `v` component.
	pub fn v_bytes(&self) -> &[u8] {
		&self.0[64..]
	}

	/// Interprets `v` as an integer.
	///
	/// Fails when `v` is wider than 16 bytes, which no chain produces.
	pub fn v(&self) -> Result<u128, ParseError> {
		let v = self.v_bytes();
		if v.len() > 16 {
			return Err(ParseError::InvalidSignature(format!(
				"v component is {} bytes long",
				v.len()
			)));
		}
		Ok(v.iter().fold(0u128, |acc, byte| (acc << 8) | u128::from(*byte)))
	}

	/// Recovers the y-parity bit from `v`, whichever encoding it uses.
	///
	/// Accepts raw recovery ids (0/1), the legacy offsets (27/28) and EIP-155
	/// values (`recovery_id + chain_id * 2 + 35`).
	pub fn y_parity(&self) -> Result<bool, ParseError> {
		match self.v()? {
			0 | 27 => Ok(false),
			1 | 28 => Ok(true),
			v if v >= 35 => Ok((v - 35) % 2 == 1),
			v => Err(ParseError::InvalidSignature(format!("unsupported v value {}", v))),
		}
	}
}

impl fmt::Display for Signature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(&self.0))
	}
}

impl FromStr for Signature {
	type Err = ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let bytes = hex::decode(without_0x_prefix(s.trim()))
			.map_err(|e| ParseError::InvalidSignature(e.to_string()))?;
		Self::from_bytes(bytes)
	}
}

/// The 65-byte form with `v` as 27 or 28.
impl From<alloy::primitives::Signature> for Signature {
	fn from(signature: alloy::primitives::Signature) -> Self {
		Self(signature.as_bytes().to_vec())
	}
}

//! JSON-RPC quantity parsing.
//!
//! Nodes and ABI decoders report integers as `0x` hex strings, decimal strings
//! or plain JSON numbers depending on where they come from. Everything here
//! normalises those spellings into `U256` and rejects anything negative,
//! fractional or non-numeric.

use crate::{without_0x_prefix, ParseError};
use alloy::primitives::U256;
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

/// Parses a quantity string: `0x`-prefixed hex or plain decimal.
pub fn parse_quantity_str(value: &str) -> Result<U256, ParseError> {
	let trimmed = value.trim();
	let is_hex = trimmed
		.get(..2)
		.is_some_and(|prefix| prefix.eq_ignore_ascii_case("0x"));
	let (digits, radix) = if is_hex {
		(without_0x_prefix(trimmed), 16)
	} else {
		(trimmed, 10)
	};

	if digits.is_empty() {
		return Err(ParseError::InvalidQuantity(value.to_string()));
	}

	U256::from_str_radix(digits, radix).map_err(|_| ParseError::InvalidQuantity(value.to_string()))
}

/// Parses a quantity from a JSON value.
///
/// Strings go through [`parse_quantity_str`]; numbers must be non-negative
/// integers that fit in a `u64`.
pub fn parse_quantity(value: &Value) -> Result<U256, ParseError> {
	match value {
		Value::String(s) => parse_quantity_str(s),
		Value::Number(n) => n
			.as_u64()
			.map(U256::from)
			.ok_or_else(|| ParseError::InvalidQuantity(n.to_string())),
		other => Err(ParseError::InvalidQuantity(other.to_string())),
	}
}

/// Narrows a quantity to `u64`.
pub fn quantity_to_u64(value: U256) -> Result<u64, ParseError> {
	u64::try_from(value).map_err(|_| ParseError::InvalidQuantity(value.to_string()))
}

/// Serializes a quantity as a `0x` hex string.
pub fn serialize_quantity<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	serializer.serialize_str(&format!("0x{:x}", value))
}

/// Serializes an optional quantity; `None` is normally skipped by the caller.
pub fn serialize_opt_quantity<S>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	match value {
		Some(v) => serialize_quantity(v, serializer),
		None => serializer.serialize_none(),
	}
}

/// Deserializes a quantity in any accepted spelling.
pub fn deserialize_quantity<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Value::deserialize(deserializer)?;
	parse_quantity(&value).map_err(serde::de::Error::custom)
}

/// Deserializes an optional quantity; JSON `null` maps to `None`.
pub fn deserialize_opt_quantity<'de, D>(deserializer: D) -> Result<Option<U256>, D::Error>
where
	D: Deserializer<'de>,
{
	match Value::deserialize(deserializer)? {
		Value::Null => Ok(None),
		value => parse_quantity(&value)
			.map(Some)
			.map_err(serde::de::Error::custom),
	}
}

/// Deserializes a quantity that must fit in a `u64`.
pub fn deserialize_u64_quantity<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
	D: Deserializer<'de>,
{
	let value = deserialize_quantity(deserializer)?;
	quantity_to_u64(value).map_err(serde::de::Error::custom)
}

/// Deserializes a receipt status: `0x1` (or `true`) is success.
pub fn deserialize_status<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
	D: Deserializer<'de>,
{
	match Value::deserialize(deserializer)? {
		Value::Bool(b) => Ok(b),
		value => parse_quantity(&value)
			.map(|status| status == U256::from(1u8))
			.map_err(serde::de::Error::custom),
	}
}

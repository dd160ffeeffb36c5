//! Errors raised while parsing caller-supplied values.

use thiserror::Error;

/// Errors that can occur when a string or JSON value does not describe a valid
/// address, hex blob, quantity, chain id or signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
	/// The value is not a 20-byte hex address.
	#[error("Invalid address '{0}'")]
	InvalidAddress(String),
	/// The value is not valid hex, or has the wrong length.
	#[error("Invalid hex: {0}")]
	InvalidHex(String),
	/// The value is not a non-negative integer quantity.
	#[error("Invalid quantity: {0}")]
	InvalidQuantity(String),
	/// The value is not a positive chain id.
	#[error("Invalid chain id '{0}'")]
	InvalidChainId(String),
	/// The value is not an r || s || v signature.
	#[error("Invalid signature: {0}")]
	InvalidSignature(String),
}

//! Signer abstraction for the contract invoker.
//!
//! This module defines the interface the invoker uses to learn the account
//! address and to obtain message signatures, plus a local private-key
//! implementation. Signing is asynchronous because real signers may wait on an
//! external confirmation (a hardware device, a wallet popup) for an unbounded
//! time; callers cancel by dropping the future.

use async_trait::async_trait;
use invoker_types::{Address, Signature};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during signer operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a private key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// The holder of the key declined to sign.
	#[error("Signing request rejected: {0}")]
	Rejected(String),
}

/// Trait defining the interface for signer implementations.
///
/// A signer is shared between every invoker that needs it, so implementations
/// must be `Send + Sync` and are held behind an `Arc`.
#[async_trait]
pub trait SignerInterface: Send + Sync {
	/// The account address this signer signs for.
	fn address(&self) -> Address;

	/// Signs `message` with the personal-message scheme.
	///
	/// The message is prefixed with `"\x19Ethereum Signed Message:\n"` and its
	/// length before hashing. The returned signature is `r || s || v` with
	/// `v` in `{27, 28}`.
	async fn sign_message(&self, message: &[u8]) -> Result<Signature, AccountError>;
}

//! Local private-key signer.
//!
//! Holds the key in process memory and signs without any external
//! confirmation step.

use crate::{AccountError, SignerInterface};
use alloy::primitives::hex;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer as _;
use async_trait::async_trait;
use invoker_types::{without_0x_prefix, Address, SecretString, Signature};

/// Parses a 32-byte hex private key, with or without `0x`.
pub fn parse_private_key(key: &str) -> Result<PrivateKeySigner, AccountError> {
	let digits = without_0x_prefix(key.trim());
	if digits.len() != 64 {
		return Err(AccountError::InvalidKey(format!(
			"expected 64 hex characters, got {}",
			digits.len()
		)));
	}

	let bytes = hex::decode(digits).map_err(|e| AccountError::InvalidKey(e.to_string()))?;
	PrivateKeySigner::from_slice(&bytes).map_err(|e| AccountError::InvalidKey(e.to_string()))
}

/// Signer backed by a private key held in memory.
#[derive(Debug, Clone)]
pub struct LocalSigner {
	signer: PrivateKeySigner,
}

impl LocalSigner {
	/// Creates a signer from a secret private key string.
	pub fn from_private_key(private_key: &SecretString) -> Result<Self, AccountError> {
		let signer = private_key.with_exposed(parse_private_key)?;
		Ok(Self { signer })
	}

	/// The underlying alloy signer, for transports that sign transactions.
	pub fn inner(&self) -> &PrivateKeySigner {
		&self.signer
	}
}

#[async_trait]
impl SignerInterface for LocalSigner {
	fn address(&self) -> Address {
		self.signer.address()
	}

	async fn sign_message(&self, message: &[u8]) -> Result<Signature, AccountError> {
		let signature = self
			.signer
			.sign_message(message)
			.await
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;

		tracing::debug!(address = %self.signer.address(), "Signed personal message");
		Ok(Signature::from(signature))
	}
}

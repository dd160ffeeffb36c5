//! Error type for invoker operations.

use invoker_account::AccountError;
use invoker_config::ConfigError;
use invoker_transport::TransportError;
use invoker_types::ParseError;
use thiserror::Error;

/// Errors that can occur while invoking contracts or signing.
///
/// Precondition failures (`NoSignerConfigured`, `MalformedInput`) are raised
/// before any network access. Transport failures pass through unchanged and
/// are never retried here.
#[derive(Debug, Error)]
pub enum InvokerError {
	/// The operation needs a signer and the invoker has none.
	#[error("No signer configured")]
	NoSignerConfigured,
	/// An argument could not be parsed: hex, address, integer, chain id or key.
	#[error("Malformed input: {0}")]
	MalformedInput(String),
	/// The transport failed.
	#[error("Remote call failed: {0}")]
	RemoteCallFailed(#[from] TransportError),
	/// The signer failed or refused to sign.
	#[error("Signing failed: {0}")]
	SigningFailed(#[from] AccountError),
	/// The transport answered with a value of the wrong shape.
	#[error("Unexpected response: {0}")]
	UnexpectedResponse(String),
	/// The invoker could not be assembled from configuration.
	#[error("Configuration error: {0}")]
	Configuration(#[from] ConfigError),
}

impl From<ParseError> for InvokerError {
	fn from(err: ParseError) -> Self {
		InvokerError::MalformedInput(err.to_string())
	}
}

//! Contract transport module for the contract invoker.
//!
//! This module defines how the invoker talks to a chain: a `ContractProxy`
//! exposes one contract (ABI + address) as a uniform "invoke method, get JSON
//! results" surface, and a `ContractBuilder` produces proxies from an ABI and
//! an address. Arguments and results travel as `serde_json::Value` so the
//! invoker stays independent of any particular ABI codec.
//!
//! Retries, timeouts and connection management belong to implementations of
//! these traits, never to their callers.

use async_trait::async_trait;
use invoker_types::{Address, TransactionRequest};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

/// JSON-RPC method names the invoker sends through [`ContractProxy::send_single`].
pub mod methods {
	pub const BLOCK_NUMBER: &str = "eth_blockNumber";
	pub const GAS_PRICE: &str = "eth_gasPrice";
	pub const SEND_TRANSACTION: &str = "eth_sendTransaction";
	pub const GET_TRANSACTION_RECEIPT: &str = "eth_getTransactionReceipt";
	pub const FEE_HISTORY: &str = "eth_feeHistory";
}

/// Errors that can occur while building proxies or talking to a node.
#[derive(Debug, Error)]
pub enum TransportError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// The node answered with a JSON-RPC error.
	#[error("Node error: {0}")]
	Node(String),
	/// The request did not complete within the transport's deadline.
	#[error("Timed out: {0}")]
	Timeout(String),
	/// The ABI could not be parsed or does not describe the requested method.
	#[error("ABI error: {0}")]
	Abi(String),
	/// Arguments or results could not be encoded or decoded.
	#[error("Encoding error: {0}")]
	Encoding(String),
	/// The operation needs a wallet and none was configured.
	#[error("No wallet configured for sending transactions")]
	NoWallet,
}

/// One contract, bound to an ABI and address, reachable over a transport.
///
/// `call_*` methods are read-only contract invocations. `send_many` submits a
/// signed contract transaction. `send_single` issues a raw JSON-RPC request,
/// which the invoker uses for chain metadata (`eth_blockNumber`, fees, ...).
#[async_trait]
pub trait ContractProxy: Send + Sync {
	/// The contract address this proxy targets.
	fn address(&self) -> Address;

	/// Calls a read-only method and returns its outputs packed into one JSON
	/// array, even when the method has a single output.
	async fn call_single(&self, method: &str, args: Vec<Value>) -> Result<Value, TransportError>;

	/// Calls a read-only method and returns every output.
	async fn call_many(&self, method: &str, args: Vec<Value>) -> Result<Vec<Value>, TransportError>;

	/// Issues a raw JSON-RPC request.
	async fn send_single(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError>;

	/// Sends a signed transaction invoking `method`.
	///
	/// `overwrite` supplies fields (value, fees, calldata) that take precedence
	/// over what the transport would otherwise fill in.
	async fn send_many(
		&self,
		method: &str,
		args: Vec<Value>,
		overwrite: Option<TransactionRequest>,
	) -> Result<Vec<Value>, TransportError>;

	/// Estimates the gas a method invocation would use.
	///
	/// Returns one estimate per node or per item the transport queried.
	async fn estimate_gas(&self, method: &str, args: Vec<Value>) -> Result<Vec<Value>, TransportError>;
}

/// Produces contract proxies from an ABI and an address.
#[async_trait]
pub trait ContractBuilder: Send + Sync {
	/// Builds a proxy for the contract at `address` described by `abi`.
	async fn build(&self, abi: &str, address: Address) -> Result<Arc<dyn ContractProxy>, TransportError>;
}

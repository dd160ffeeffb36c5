//! Contract invoker.
//!
//! A [`ContractInvoker`] binds one contract proxy to an optional signer and
//! exposes typed operations over it: contract calls and sends, chain metadata
//! queries, probe transactions and the signing helpers. Operations that need
//! the signer check for it before touching the network.

use crate::signing;
use crate::InvokerError;
use invoker_account::SignerInterface;
use invoker_transport::{methods, ContractProxy};
use invoker_types::{
	checksum, parse_address, parse_quantity, quantity_to_u64, Address, ChainId, FeeData,
	SigningConventions, TransactionReceipt, TransactionRequest, TransactionResponse, U256,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Value sent by [`ContractInvoker::probe_nonce`].
pub const NONCE_PROBE_VALUE: u64 = 100_000;
/// Value sent by [`ContractInvoker::probe_transaction_status`].
pub const STATUS_PROBE_VALUE: u64 = 10_000_000;

/// A contract proxy bound to an optional signer.
///
/// The signer is shared: one signer typically backs every invoker of a
/// registry.
pub struct ContractInvoker {
	proxy: Arc<dyn ContractProxy>,
	signer: Option<Arc<dyn SignerInterface>>,
	conventions: Arc<SigningConventions>,
}

impl ContractInvoker {
	/// Creates an invoker using the built-in signing convention table.
	pub fn new(proxy: Arc<dyn ContractProxy>, signer: Option<Arc<dyn SignerInterface>>) -> Self {
		Self {
			proxy,
			signer,
			conventions: Arc::new(SigningConventions::default()),
		}
	}

	pub fn with_conventions(mut self, conventions: Arc<SigningConventions>) -> Self {
		self.conventions = conventions;
		self
	}

	/// Address of the contract this invoker targets.
	pub fn address(&self) -> Address {
		self.proxy.address()
	}

	/// Address of the bound signer, if any.
	pub fn signer_address(&self) -> Option<Address> {
		self.signer.as_ref().map(|signer| signer.address())
	}

	fn ensure_signer(&self) -> Result<&Arc<dyn SignerInterface>, InvokerError> {
		self.signer.as_ref().ok_or(InvokerError::NoSignerConfigured)
	}

	/// Calls a read-only method and returns its packed result.
	///
	/// Requires a signer even though nothing is signed.
	pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, InvokerError> {
		self.ensure_signer()?;
		tracing::debug!(contract = %self.address(), method, "Calling contract");
		Ok(self.proxy.call_single(method, args).await?)
	}

	/// Calls a read-only method and returns every output.
	///
	/// Requires a signer even though nothing is signed.
	pub async fn get_array(&self, method: &str, args: Vec<Value>) -> Result<Vec<Value>, InvokerError> {
		self.ensure_signer()?;
		tracing::debug!(contract = %self.address(), method, "Calling contract");
		Ok(self.proxy.call_many(method, args).await?)
	}

	/// Read-only call for helpers that never need the signer.
	pub(crate) async fn query(&self, method: &str, args: Vec<Value>) -> Result<Vec<Value>, InvokerError> {
		Ok(self.proxy.call_many(method, args).await?)
	}

	/// Sends a transaction invoking `method`.
	///
	/// The value overwrite is only attached when `value` is given.
	pub async fn send(
		&self,
		method: &str,
		args: Vec<Value>,
		value: Option<U256>,
	) -> Result<Vec<Value>, InvokerError> {
		self.ensure_signer()?;
		let overwrite = value.map(TransactionRequest::with_value_only);

		let result = self.proxy.send_many(method, args, overwrite).await?;
		tracing::info!(contract = %self.address(), method, ?value, "Sent contract transaction");
		Ok(result)
	}

	/// Current block number.
	pub async fn block_number(&self) -> Result<u64, InvokerError> {
		let response = self.proxy.send_single(methods::BLOCK_NUMBER, Vec::new()).await?;
		quantity_to_u64(quantity(&response, methods::BLOCK_NUMBER)?)
			.map_err(|e| InvokerError::UnexpectedResponse(e.to_string()))
	}

	/// Current gas price in wei.
	pub async fn gas_price(&self) -> Result<U256, InvokerError> {
		let response = self.proxy.send_single(methods::GAS_PRICE, Vec::new()).await?;
		quantity(&response, methods::GAS_PRICE)
	}

	/// Gas estimates for invoking `method`, one per item the transport returns.
	pub async fn gas_limit(&self, method: &str, args: Vec<Value>) -> Result<Vec<U256>, InvokerError> {
		let estimates = self.proxy.estimate_gas(method, args).await?;
		estimates
			.iter()
			.map(|estimate| quantity(estimate, "gas estimate"))
			.collect()
	}

	/// Sends [`NONCE_PROBE_VALUE`] wei from the signer to itself and returns
	/// the nonce the node used.
	///
	/// This broadcasts a real transaction and spends gas.
	pub async fn probe_nonce(&self) -> Result<u64, InvokerError> {
		let response = self.self_transfer(NONCE_PROBE_VALUE).await?;
		Ok(response.nonce)
	}

	/// Sends [`STATUS_PROBE_VALUE`] wei from the signer to itself and returns
	/// the receipt of that transfer.
	///
	/// This broadcasts a real transaction and spends gas.
	pub async fn probe_transaction_status(&self) -> Result<TransactionReceipt, InvokerError> {
		let response = self.self_transfer(STATUS_PROBE_VALUE).await?;
		let receipt = self
			.proxy
			.send_single(
				methods::GET_TRANSACTION_RECEIPT,
				vec![Value::String(response.hash)],
			)
			.await?;
		decode(receipt, methods::GET_TRANSACTION_RECEIPT)
	}

	async fn self_transfer(&self, value: u64) -> Result<TransactionResponse, InvokerError> {
		let signer = self.ensure_signer()?;
		let own_address = signer.address();
		tracing::warn!(
			address = %own_address,
			value,
			"Sending probe transaction to own address, this spends gas"
		);

		let request = TransactionRequest::transfer(own_address, U256::from(value));
		self.broadcast(request).await
	}

	/// Transfers `value` wei to `to` and returns the transaction hash.
	///
	/// The fee cap and tip come from the node's current fee data.
	pub async fn send_transaction(&self, to: &str, value: U256) -> Result<String, InvokerError> {
		self.ensure_signer()?;
		let to = parse_address(to)?;

		let fees = self.proxy.send_single(methods::FEE_HISTORY, Vec::new()).await?;
		let fees: FeeData = decode(fees, methods::FEE_HISTORY)?;

		let request = TransactionRequest::transfer(to, value).with_fees(&fees);
		let response = self.broadcast(request).await?;

		tracing::info!(tx_hash = %response.hash, to = %to, %value, "Sent transaction");
		Ok(response.hash)
	}

	async fn broadcast(&self, request: TransactionRequest) -> Result<TransactionResponse, InvokerError> {
		let request = serde_json::to_value(&request)
			.map_err(|e| InvokerError::MalformedInput(e.to_string()))?;
		let response = self
			.proxy
			.send_single(methods::SEND_TRANSACTION, vec![request])
			.await?;
		decode(response, methods::SEND_TRANSACTION)
	}

	/// Keccak-256 of the message, lowercase hex without `0x`.
	pub fn hash(&self, message: &str) -> String {
		signing::keccak_hex(message)
	}

	/// Has the bound signer personal-sign the message.
	pub async fn sign_message(&self, message: &str) -> Result<String, InvokerError> {
		let signer = self.ensure_signer()?;
		let signature = signer.sign_message(message.as_bytes()).await?;
		Ok(signature.to_string())
	}

	/// Has the bound signer sign the message and checks that the signature
	/// recovers to the signer's address.
	///
	/// A mismatch or an unrecoverable signature yields `false`.
	pub async fn verify_signature(&self, message: &str) -> Result<bool, InvokerError> {
		let signer = self.ensure_signer()?;
		let signature = signer.sign_message(message.as_bytes()).await?;
		let hash = signing::personal_message_hash(message.as_bytes());

		match signing::recover_signer(&signature, &hash) {
			Ok(recovered) => Ok(recovered == signer.address()),
			Err(e) => {
				tracing::debug!(error = %e, "Signature did not recover");
				Ok(false)
			},
		}
	}

	/// Signs a transaction hash with a raw private key for `chain_id`.
	pub fn sign_raw_transaction(
		&self,
		private_key: &str,
		tx_hash: &str,
		chain_id: ChainId,
	) -> Result<String, InvokerError> {
		signing::sign_raw_transaction(private_key, tx_hash, chain_id, &self.conventions)
			.map(|signature| signature.to_string())
	}

	/// Checksummed address of a private key.
	pub fn derive_address(&self, private_key: &str) -> Result<String, InvokerError> {
		signing::derive_address(private_key).map(|address| checksum(&address))
	}

	/// Personal-signs a message with a raw private key.
	pub fn sign_with_private_key(&self, private_key: &str, message: &str) -> Result<String, InvokerError> {
		signing::sign_with_private_key(private_key, message).map(|signature| signature.to_string())
	}

	/// Calls `method(contract_name)` and reads a single unsigned integer back.
	pub async fn read_registered_uint(&self, contract_name: &str, method: &str) -> Result<U256, InvokerError> {
		let result = self
			.proxy
			.call_single(method, vec![Value::String(contract_name.to_string())])
			.await?;

		match result {
			Value::Array(items) if items.len() == 1 => quantity(&items[0], method),
			other => Err(InvokerError::UnexpectedResponse(format!(
				"{} returned {}, expected one integer",
				method, other
			))),
		}
	}
}

fn quantity(value: &Value, what: &str) -> Result<U256, InvokerError> {
	parse_quantity(value)
		.map_err(|e| InvokerError::UnexpectedResponse(format!("{}: {}", what, e)))
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, InvokerError> {
	serde_json::from_value(value)
		.map_err(|e| InvokerError::UnexpectedResponse(format!("{}: {}", what, e)))
}

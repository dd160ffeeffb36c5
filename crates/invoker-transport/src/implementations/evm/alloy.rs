//! Alloy-backed contract transport.
//!
//! Contract methods are resolved from a JSON ABI, arguments are coerced from
//! JSON into dynamic Solidity values, and calls go out over an HTTP provider.
//! When a wallet is configured the provider signs transactions locally before
//! broadcasting them.

use crate::{methods, ContractBuilder, ContractProxy, TransportError};
use alloy::dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy::json_abi::{Function, JsonAbi};
use alloy::network::EthereumWallet;
use alloy::primitives::{hex, Address, Bytes, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{BlockNumberOrTag, TransactionRequest as RpcTransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer as _;
use alloy::transports::{RpcError, TransportError as RpcTransportError};
use async_trait::async_trait;
use invoker_types::{ChainId, TransactionRequest};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Connection settings for the alloy transport.
#[derive(Debug, Clone)]
pub struct AlloyTransportConfig {
	/// HTTP(S) JSON-RPC endpoint.
	pub rpc_url: String,
	/// Chain the wallet signs for.
	pub chain_id: ChainId,
	/// How long `eth_getTransactionReceipt` waits for a transaction to be mined.
	pub receipt_timeout: Duration,
	/// Delay between receipt polls.
	pub poll_interval: Duration,
}

/// Builds [`AlloyContract`] proxies that share one HTTP provider.
pub struct AlloyContractBuilder {
	provider: DynProvider,
	/// Address of the configured wallet, if any.
	sender: Option<Address>,
	receipt_timeout: Duration,
	poll_interval: Duration,
}

impl AlloyContractBuilder {
	/// Creates a builder for the configured endpoint.
	///
	/// Without a signer the resulting proxies can read but every transaction
	/// fails with [`TransportError::NoWallet`].
	pub fn new(
		config: &AlloyTransportConfig,
		signer: Option<PrivateKeySigner>,
	) -> Result<Self, TransportError> {
		let url: reqwest::Url = config.rpc_url.parse().map_err(|e| {
			TransportError::Network(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
		})?;

		let sender = signer.as_ref().map(|signer| signer.address());
		let provider = match signer {
			Some(signer) => {
				let wallet = EthereumWallet::from(signer.with_chain_id(Some(config.chain_id)));
				ProviderBuilder::new()
					.wallet(wallet)
					.connect_http(url)
					.erased()
			},
			None => ProviderBuilder::new().connect_http(url).erased(),
		};

		tracing::debug!(
			rpc_url = %config.rpc_url,
			chain_id = config.chain_id,
			wallet = sender.is_some(),
			"Configured alloy transport"
		);

		Ok(Self {
			provider,
			sender,
			receipt_timeout: config.receipt_timeout,
			poll_interval: config.poll_interval,
		})
	}
}

#[async_trait]
impl ContractBuilder for AlloyContractBuilder {
	async fn build(
		&self,
		abi: &str,
		address: Address,
	) -> Result<Arc<dyn ContractProxy>, TransportError> {
		let abi: JsonAbi =
			serde_json::from_str(abi).map_err(|e| TransportError::Abi(format!("Invalid ABI: {}", e)))?;

		tracing::debug!(%address, functions = abi.functions.len(), "Built contract proxy");

		Ok(Arc::new(AlloyContract {
			abi,
			address,
			provider: self.provider.clone(),
			sender: self.sender,
			receipt_timeout: self.receipt_timeout,
			poll_interval: self.poll_interval,
		}))
	}
}

/// A contract reachable through an alloy provider.
pub struct AlloyContract {
	abi: JsonAbi,
	address: Address,
	provider: DynProvider,
	sender: Option<Address>,
	receipt_timeout: Duration,
	poll_interval: Duration,
}

impl AlloyContract {
	/// Finds the overload of `method` taking `arg_count` arguments.
	fn resolve_function(&self, method: &str, arg_count: usize) -> Result<&Function, TransportError> {
		let overloads = self
			.abi
			.function(method)
			.ok_or_else(|| TransportError::Abi(format!("Method '{}' not found in ABI", method)))?;

		overloads
			.iter()
			.find(|function| function.inputs.len() == arg_count)
			.ok_or_else(|| {
				TransportError::Abi(format!(
					"Method '{}' has no overload taking {} arguments",
					method, arg_count
				))
			})
	}

	/// Answers `eth_feeHistory` with EIP-1559 fee suggestions.
	///
	/// The fee cap is twice the next block's base fee plus the suggested tip.
	async fn fee_data(&self) -> Result<Value, TransportError> {
		let history = self
			.provider
			.get_fee_history(1, BlockNumberOrTag::Latest, &[])
			.await
			.map_err(rpc_error)?;
		let priority_fee = self
			.provider
			.get_max_priority_fee_per_gas()
			.await
			.map_err(rpc_error)?;

		let base_fee = history.next_block_base_fee().unwrap_or_default();
		let max_fee = base_fee.saturating_mul(2).saturating_add(priority_fee);

		Ok(json!({
			"maxFeePerGas": format!("0x{:x}", max_fee),
			"maxPriorityFeePerGas": format!("0x{:x}", priority_fee),
		}))
	}

	/// Signs and broadcasts the transaction object in `params[0]`.
	async fn submit(&self, params: Vec<Value>) -> Result<Value, TransportError> {
		let sender = self.sender.ok_or(TransportError::NoWallet)?;
		let request: TransactionRequest = params
			.into_iter()
			.next()
			.ok_or_else(|| {
				TransportError::Encoding("eth_sendTransaction expects a transaction object".into())
			})
			.and_then(|value| {
				serde_json::from_value(value).map_err(|e| TransportError::Encoding(e.to_string()))
			})?;

		// Pending, so a transaction still in the mempool is not replaced.
		let nonce = self
			.provider
			.get_transaction_count(sender)
			.pending()
			.await
			.map_err(rpc_error)?;

		let mut rpc_request = to_rpc_request(&request)?;
		rpc_request.nonce = Some(nonce);
		if let (Some(max_fee), None) = (rpc_request.max_fee_per_gas, rpc_request.max_priority_fee_per_gas) {
			let suggested = self
				.provider
				.get_max_priority_fee_per_gas()
				.await
				.map_err(rpc_error)?;
			rpc_request.max_priority_fee_per_gas = Some(suggested.min(max_fee));
		}

		let hash = self.broadcast(rpc_request).await?;
		Ok(json!({
			"hash": hash,
			"nonce": format!("0x{:x}", nonce),
		}))
	}

	async fn broadcast(&self, request: RpcTransactionRequest) -> Result<String, TransportError> {
		let pending = self
			.provider
			.send_transaction(request)
			.await
			.map_err(rpc_error)?;

		let hash = format!("0x{}", hex::encode(pending.tx_hash()));
		tracing::info!(tx_hash = %hash, contract = %self.address, "Submitted transaction");
		Ok(hash)
	}

	/// Polls for the receipt of the transaction named in `params[0]`.
	///
	/// `params[0]` is either the hash string or a response object carrying a
	/// `hash` field.
	async fn wait_for_receipt(&self, params: Vec<Value>) -> Result<Value, TransportError> {
		let hash_text = match params.first() {
			Some(Value::String(hash)) => hash.clone(),
			Some(Value::Object(object)) => object
				.get("hash")
				.and_then(Value::as_str)
				.map(str::to_string)
				.ok_or_else(|| TransportError::Encoding("Response object has no hash".into()))?,
			_ => {
				return Err(TransportError::Encoding(
					"eth_getTransactionReceipt expects a transaction hash".into(),
				))
			},
		};
		let hash = B256::from_str(&hash_text)
			.map_err(|e| TransportError::Encoding(format!("Invalid transaction hash: {}", e)))?;

		let started = tokio::time::Instant::now();
		loop {
			if let Some(receipt) = self
				.provider
				.get_transaction_receipt(hash)
				.await
				.map_err(rpc_error)?
			{
				return Ok(json!({
					"transactionHash": format!("0x{}", hex::encode(receipt.transaction_hash)),
					"blockNumber": receipt.block_number.unwrap_or(0),
					"status": receipt.status(),
					"gasUsed": format!("0x{:x}", receipt.gas_used),
				}));
			}

			if started.elapsed() >= self.receipt_timeout {
				return Err(TransportError::Timeout(format!(
					"No receipt for {} after {} seconds",
					hash_text,
					self.receipt_timeout.as_secs()
				)));
			}

			tracing::debug!(tx_hash = %hash_text, "Transaction not mined yet");
			tokio::time::sleep(self.poll_interval).await;
		}
	}
}

#[async_trait]
impl ContractProxy for AlloyContract {
	fn address(&self) -> Address {
		self.address
	}

	async fn call_single(&self, method: &str, args: Vec<Value>) -> Result<Value, TransportError> {
		self.call_many(method, args).await.map(Value::Array)
	}

	async fn call_many(&self, method: &str, args: Vec<Value>) -> Result<Vec<Value>, TransportError> {
		let function = self.resolve_function(method, args.len())?;
		let calldata = encode_call(function, &args)?;

		tracing::trace!(contract = %self.address, method, "eth_call");
		let request = RpcTransactionRequest::default()
			.to(self.address)
			.input(calldata.into());
		let output = self.provider.call(request).await.map_err(rpc_error)?;

		decode_outputs(function, &output)
	}

	async fn send_single(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
		match method {
			methods::BLOCK_NUMBER => {
				let block = self.provider.get_block_number().await.map_err(rpc_error)?;
				Ok(Value::String(format!("0x{:x}", block)))
			},
			methods::GAS_PRICE => {
				let price = self.provider.get_gas_price().await.map_err(rpc_error)?;
				Ok(Value::String(format!("0x{:x}", price)))
			},
			methods::FEE_HISTORY => self.fee_data().await,
			methods::SEND_TRANSACTION => self.submit(params).await,
			methods::GET_TRANSACTION_RECEIPT => self.wait_for_receipt(params).await,
			_ => {
				tracing::trace!(method, "Forwarding raw request");
				self.provider
					.raw_request::<_, Value>(method.to_string().into(), params)
					.await
					.map_err(rpc_error)
			},
		}
	}

	async fn send_many(
		&self,
		method: &str,
		args: Vec<Value>,
		overwrite: Option<TransactionRequest>,
	) -> Result<Vec<Value>, TransportError> {
		if self.sender.is_none() {
			return Err(TransportError::NoWallet);
		}

		let function = self.resolve_function(method, args.len())?;
		let calldata = encode_call(function, &args)?;

		let overwrite = overwrite.unwrap_or_default();
		let to = overwrite.to.unwrap_or(self.address);
		let data = overwrite.data.clone().unwrap_or(calldata);
		let request = TransactionRequest {
			to: Some(to),
			data: Some(data),
			..overwrite
		};

		let hash = self.broadcast(to_rpc_request(&request)?).await?;
		Ok(vec![Value::String(hash)])
	}

	async fn estimate_gas(&self, method: &str, args: Vec<Value>) -> Result<Vec<Value>, TransportError> {
		let function = self.resolve_function(method, args.len())?;
		let calldata = encode_call(function, &args)?;

		let mut request = RpcTransactionRequest::default()
			.to(self.address)
			.input(calldata.into());
		if let Some(sender) = self.sender {
			request = request.from(sender);
		}

		let gas = self.provider.estimate_gas(request).await.map_err(rpc_error)?;
		Ok(vec![Value::String(format!("0x{:x}", gas))])
	}
}

/// Factory function to create a shared alloy contract builder.
pub fn create_contract_builder(
	config: &AlloyTransportConfig,
	signer: Option<PrivateKeySigner>,
) -> Result<Arc<dyn ContractBuilder>, TransportError> {
	Ok(Arc::new(AlloyContractBuilder::new(config, signer)?))
}

fn rpc_error(error: RpcTransportError) -> TransportError {
	match error {
		RpcError::ErrorResp(payload) => TransportError::Node(payload.to_string()),
		other => TransportError::Network(other.to_string()),
	}
}

fn to_rpc_request(request: &TransactionRequest) -> Result<RpcTransactionRequest, TransportError> {
	let mut rpc_request = RpcTransactionRequest::default();
	if let Some(to) = request.to {
		rpc_request = rpc_request.to(to);
	}
	if let Some(value) = request.value {
		rpc_request = rpc_request.value(value);
	}
	// The gas filler keeps caller fees only when both are set.
	rpc_request.max_fee_per_gas = request
		.max_fee_per_gas
		.map(|fee| fee_to_u128("maxFeePerGas", fee))
		.transpose()?;
	rpc_request.max_priority_fee_per_gas = request
		.max_priority_fee_per_gas
		.map(|fee| fee_to_u128("maxPriorityFeePerGas", fee))
		.transpose()?;
	if let Some(data) = &request.data {
		rpc_request = rpc_request.input(data.clone().into());
	}
	Ok(rpc_request)
}

fn fee_to_u128(name: &str, fee: U256) -> Result<u128, TransportError> {
	u128::try_from(fee).map_err(|_| TransportError::Encoding(format!("{} {} out of range", name, fee)))
}

/// Encodes a method call: selector followed by the ABI-encoded arguments.
pub fn encode_call(function: &Function, args: &[Value]) -> Result<Bytes, TransportError> {
	let mut values = Vec::with_capacity(args.len());
	for (param, arg) in function.inputs.iter().zip(args) {
		let ty: DynSolType = param
			.resolve()
			.map_err(|e| TransportError::Abi(format!("Parameter '{}': {}", param.name, e)))?;
		values.push(json_to_sol(&ty, arg)?);
	}

	let mut calldata = function.selector().to_vec();
	calldata.extend_from_slice(&DynSolValue::Tuple(values).abi_encode_params());
	Ok(Bytes::from(calldata))
}

/// Decodes a method's return data into JSON values, one per output.
pub fn decode_outputs(function: &Function, data: &[u8]) -> Result<Vec<Value>, TransportError> {
	if function.outputs.is_empty() {
		return Ok(Vec::new());
	}

	let types = function
		.outputs
		.iter()
		.map(|param| param.resolve())
		.collect::<Result<Vec<DynSolType>, _>>()
		.map_err(|e| TransportError::Abi(e.to_string()))?;

	let decoded = DynSolType::Tuple(types)
		.abi_decode_params(data)
		.map_err(|e| TransportError::Encoding(format!("Failed to decode outputs: {}", e)))?;

	match decoded {
		DynSolValue::Tuple(values) => Ok(values.iter().map(sol_to_json).collect()),
		other => Ok(vec![sol_to_json(&other)]),
	}
}

/// Coerces a JSON argument into a value of the given Solidity type.
///
/// Arrays and tuples are matched structurally; scalars go through alloy's
/// string coercion, so numbers may be given as JSON integers, decimal strings
/// or hex strings. Non-integral JSON numbers are rejected.
pub fn json_to_sol(ty: &DynSolType, value: &Value) -> Result<DynSolValue, TransportError> {
	let mismatch = || {
		TransportError::Encoding(format!("Cannot encode {} as {}", value, ty.sol_type_name()))
	};

	match (ty, value) {
		(DynSolType::Array(inner), Value::Array(items)) => items
			.iter()
			.map(|item| json_to_sol(inner, item))
			.collect::<Result<Vec<_>, _>>()
			.map(DynSolValue::Array),
		(DynSolType::FixedArray(inner, len), Value::Array(items)) => {
			if items.len() != *len {
				return Err(mismatch());
			}
			items
				.iter()
				.map(|item| json_to_sol(inner, item))
				.collect::<Result<Vec<_>, _>>()
				.map(DynSolValue::FixedArray)
		},
		(DynSolType::Tuple(types), Value::Array(items)) => {
			if items.len() != types.len() {
				return Err(mismatch());
			}
			types
				.iter()
				.zip(items)
				.map(|(ty, item)| json_to_sol(ty, item))
				.collect::<Result<Vec<_>, _>>()
				.map(DynSolValue::Tuple)
		},
		(_, Value::String(text)) => ty.coerce_str(text).map_err(|_| mismatch()),
		(_, Value::Bool(flag)) => ty.coerce_str(&flag.to_string()).map_err(|_| mismatch()),
		// Floats cannot hold every integer exactly; large amounts go as strings.
		(_, Value::Number(number)) if number.is_f64() => Err(mismatch()),
		(_, Value::Number(number)) => ty.coerce_str(&number.to_string()).map_err(|_| mismatch()),
		_ => Err(mismatch()),
	}
}

/// Renders a decoded Solidity value as JSON.
///
/// Addresses are checksummed, integers become decimal strings so they never
/// lose precision, and byte strings become `0x` hex.
pub fn sol_to_json(value: &DynSolValue) -> Value {
	match value {
		DynSolValue::Address(address) => Value::String(address.to_checksum(None)),
		DynSolValue::Bool(flag) => Value::Bool(*flag),
		DynSolValue::Int(int, _) => Value::String(int.to_string()),
		DynSolValue::Uint(uint, _) => Value::String(uint.to_string()),
		DynSolValue::FixedBytes(word, size) => {
			Value::String(format!("0x{}", hex::encode(&word[..*size])))
		},
		DynSolValue::Bytes(bytes) => Value::String(format!("0x{}", hex::encode(bytes))),
		DynSolValue::String(text) => Value::String(text.clone()),
		DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
			Value::Array(items.iter().map(sol_to_json).collect())
		},
		other => Value::String(format!("{:?}", other)),
	}
}

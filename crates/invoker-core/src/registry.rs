//! Contract registry.
//!
//! Caches one [`ContractInvoker`] per `(address, abi)` pair and builds them
//! lazily on first use. Each key owns its own `OnceCell`, so concurrent first
//! lookups of a key run exactly one build while lookups of other keys proceed
//! untouched. A build that fails or is cancelled leaves its cell empty and the
//! next lookup builds again.

use crate::{ContractInvoker, InvokerError};
use dashmap::DashMap;
use invoker_account::SignerInterface;
use invoker_transport::ContractBuilder;
use invoker_types::{
	parse_address, parse_quantity, Address, ChainId, SigningConventions, TransactionReceipt, B256,
	MULTICALL3_ADDRESS, U256,
};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// ABI subset of the Multicall3 contract used for chain reads.
pub const MULTICALL3_ABI: &str = include_str!("../resources/multicall3.json");

type CacheKey = (Address, String);
type CacheSlot = Arc<OnceCell<Arc<ContractInvoker>>>;

/// Registry of contract invokers keyed by address and ABI.
///
/// Requesting a known address with a different ABI builds a separate invoker.
/// Operations that are not tied to a contract run through the invoker for the
/// zero address with the default ABI.
pub struct ContractRegistry {
	builder: Arc<dyn ContractBuilder>,
	signer: Option<Arc<dyn SignerInterface>>,
	conventions: Arc<SigningConventions>,
	default_abi: String,
	multicall_address: Address,
	cache: DashMap<CacheKey, CacheSlot>,
}

impl ContractRegistry {
	pub fn new(
		builder: Arc<dyn ContractBuilder>,
		signer: Option<Arc<dyn SignerInterface>>,
		default_abi: impl Into<String>,
	) -> Self {
		Self {
			builder,
			signer,
			conventions: Arc::new(SigningConventions::default()),
			default_abi: default_abi.into(),
			multicall_address: MULTICALL3_ADDRESS,
			cache: DashMap::new(),
		}
	}

	pub fn with_conventions(mut self, conventions: SigningConventions) -> Self {
		self.conventions = Arc::new(conventions);
		self
	}

	pub fn with_multicall_address(mut self, address: Address) -> Self {
		self.multicall_address = address;
		self
	}

	/// Returns the invoker for `address` built with the default ABI.
	pub async fn get_or_build(&self, address: &str) -> Result<Arc<ContractInvoker>, InvokerError> {
		let address = parse_address(address)?;
		self.invoker_for(address, &self.default_abi).await
	}

	/// Returns the invoker for `address` built with `abi`.
	pub async fn get_or_build_with_abi(
		&self,
		address: &str,
		abi: &str,
	) -> Result<Arc<ContractInvoker>, InvokerError> {
		let address = parse_address(address)?;
		self.invoker_for(address, abi).await
	}

	async fn invoker_for(&self, address: Address, abi: &str) -> Result<Arc<ContractInvoker>, InvokerError> {
		// The map guard is released before awaiting; only the key's cell is shared.
		let slot: CacheSlot = Arc::clone(&self.cache.entry((address, abi.to_string())).or_default());

		let invoker = slot
			.get_or_try_init(|| async {
				tracing::debug!(%address, "Building contract invoker");
				let proxy = self.builder.build(abi, address).await?;
				let invoker = ContractInvoker::new(proxy, self.signer.clone())
					.with_conventions(Arc::clone(&self.conventions));
				Ok::<_, InvokerError>(Arc::new(invoker))
			})
			.await?;

		Ok(Arc::clone(invoker))
	}

	async fn default_invoker(&self) -> Result<Arc<ContractInvoker>, InvokerError> {
		self.invoker_for(Address::ZERO, &self.default_abi).await
	}

	async fn multicall(&self) -> Result<Arc<ContractInvoker>, InvokerError> {
		self.invoker_for(self.multicall_address, MULTICALL3_ABI).await
	}

	/// Number of built invokers.
	pub fn len(&self) -> usize {
		self.cache.iter().filter(|slot| slot.value().initialized()).count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub async fn call(&self, address: &str, method: &str, args: Vec<Value>) -> Result<Value, InvokerError> {
		self.get_or_build(address).await?.call(method, args).await
	}

	pub async fn get_array(
		&self,
		address: &str,
		method: &str,
		args: Vec<Value>,
	) -> Result<Vec<Value>, InvokerError> {
		self.get_or_build(address).await?.get_array(method, args).await
	}

	pub async fn send(
		&self,
		address: &str,
		method: &str,
		args: Vec<Value>,
		value: Option<U256>,
	) -> Result<Vec<Value>, InvokerError> {
		self.get_or_build(address).await?.send(method, args, value).await
	}

	pub async fn gas_limit(
		&self,
		address: &str,
		method: &str,
		args: Vec<Value>,
	) -> Result<Vec<U256>, InvokerError> {
		self.get_or_build(address).await?.gas_limit(method, args).await
	}

	/// Reads an unsigned integer registered under `contract_name`.
	///
	/// The contract is named rather than addressed, so the call runs through
	/// the default invoker and its ABI.
	pub async fn read_registered_uint(&self, contract_name: &str, method: &str) -> Result<U256, InvokerError> {
		self.default_invoker()
			.await?
			.read_registered_uint(contract_name, method)
			.await
	}

	pub async fn block_number(&self) -> Result<u64, InvokerError> {
		self.default_invoker().await?.block_number().await
	}

	pub async fn gas_price(&self) -> Result<U256, InvokerError> {
		self.default_invoker().await?.gas_price().await
	}

	/// See [`ContractInvoker::probe_nonce`]; spends gas.
	pub async fn probe_nonce(&self) -> Result<u64, InvokerError> {
		self.default_invoker().await?.probe_nonce().await
	}

	/// See [`ContractInvoker::probe_transaction_status`]; spends gas.
	pub async fn probe_transaction_status(&self) -> Result<TransactionReceipt, InvokerError> {
		self.default_invoker().await?.probe_transaction_status().await
	}

	pub async fn send_transaction(&self, to: &str, value: U256) -> Result<String, InvokerError> {
		self.default_invoker().await?.send_transaction(to, value).await
	}

	pub async fn hash(&self, message: &str) -> Result<String, InvokerError> {
		Ok(self.default_invoker().await?.hash(message))
	}

	pub async fn sign_message(&self, message: &str) -> Result<String, InvokerError> {
		self.default_invoker().await?.sign_message(message).await
	}

	pub async fn verify_signature(&self, message: &str) -> Result<bool, InvokerError> {
		self.default_invoker().await?.verify_signature(message).await
	}

	pub async fn sign_raw_transaction(
		&self,
		private_key: &str,
		tx_hash: &str,
		chain_id: ChainId,
	) -> Result<String, InvokerError> {
		self.default_invoker()
			.await?
			.sign_raw_transaction(private_key, tx_hash, chain_id)
	}

	pub async fn derive_address(&self, private_key: &str) -> Result<String, InvokerError> {
		self.default_invoker().await?.derive_address(private_key)
	}

	pub async fn sign_with_private_key(&self, private_key: &str, message: &str) -> Result<String, InvokerError> {
		self.default_invoker()
			.await?
			.sign_with_private_key(private_key, message)
	}

	/// Ether balance of `account` in wei, read through Multicall3.
	pub async fn eth_balance(&self, account: &str) -> Result<U256, InvokerError> {
		let account = parse_address(account)?;
		let outputs = self
			.multicall()
			.await?
			.query("getEthBalance", vec![Value::String(account.to_string())])
			.await?;

		match outputs.as_slice() {
			[balance] => parse_quantity(balance)
				.map_err(|e| InvokerError::UnexpectedResponse(format!("getEthBalance: {}", e))),
			_ => Err(InvokerError::UnexpectedResponse(format!(
				"getEthBalance returned {} values",
				outputs.len()
			))),
		}
	}

	/// Hash of block `number`, read through Multicall3.
	///
	/// Only the most recent 256 blocks have a hash on chain; older blocks read
	/// as zero.
	pub async fn block_hash(&self, number: u64) -> Result<B256, InvokerError> {
		let outputs = self
			.multicall()
			.await?
			.query("getBlockHash", vec![Value::String(number.to_string())])
			.await?;

		match outputs.as_slice() {
			[Value::String(hash)] => B256::from_str(hash)
				.map_err(|e| InvokerError::UnexpectedResponse(format!("getBlockHash: {}", e))),
			_ => Err(InvokerError::UnexpectedResponse(format!(
				"getBlockHash returned {:?}",
				outputs
			))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{local_signer, MockBuilder, KEY, SIGNER_ADDRESS};
	use invoker_transport::{methods, TransportError};
	use serde_json::json;
	use std::time::Duration;
	use tokio::sync::Semaphore;

	const TOKEN: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
	const TOKEN_ABI: &str = r#"[{"type":"function","name":"balanceOf"}]"#;

	fn registry(builder: Arc<MockBuilder>) -> ContractRegistry {
		ContractRegistry::new(builder, Some(local_signer()), "[]")
	}

	#[tokio::test]
	async fn test_get_or_build_returns_cached_invoker() {
		let builder = Arc::new(MockBuilder::new());
		let registry = registry(builder.clone());

		let first = registry.get_or_build(TOKEN).await.unwrap();
		let second = registry.get_or_build(&TOKEN.to_lowercase()).await.unwrap();

		assert!(Arc::ptr_eq(&first, &second));
		assert_eq!(builder.builds(), 1);
		assert_eq!(registry.len(), 1);
		assert_eq!(first.address(), parse_address(TOKEN).unwrap());
	}

	#[tokio::test]
	async fn test_different_abi_builds_separate_invoker() {
		let builder = Arc::new(MockBuilder::new());
		let registry = registry(builder.clone());

		let default = registry.get_or_build(TOKEN).await.unwrap();
		let typed = registry.get_or_build_with_abi(TOKEN, TOKEN_ABI).await.unwrap();
		let typed_again = registry.get_or_build_with_abi(TOKEN, TOKEN_ABI).await.unwrap();

		assert!(!Arc::ptr_eq(&default, &typed));
		assert!(Arc::ptr_eq(&typed, &typed_again));
		assert_eq!(builder.abis(), vec!["[]".to_string(), TOKEN_ABI.to_string()]);
		assert_eq!(registry.len(), 2);
	}

	#[tokio::test]
	async fn test_malformed_address_never_builds() {
		let builder = Arc::new(MockBuilder::new());
		let registry = registry(builder.clone());

		assert!(matches!(
			registry.get_or_build("0x1234").await,
			Err(InvokerError::MalformedInput(_))
		));
		assert!(matches!(
			registry.eth_balance("not an address").await,
			Err(InvokerError::MalformedInput(_))
		));
		assert_eq!(builder.builds(), 0);
		assert!(registry.is_empty());
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_concurrent_first_access_builds_once() {
		let builder = Arc::new(MockBuilder::new().with_delay(Duration::from_millis(50)));
		let registry = Arc::new(registry(builder.clone()));

		let tasks: Vec<_> = (0..16)
			.map(|_| {
				let registry = registry.clone();
				tokio::spawn(async move { registry.get_or_build(TOKEN).await.unwrap() })
			})
			.collect();
		let invokers: Vec<_> = futures::future::join_all(tasks)
			.await
			.into_iter()
			.map(Result::unwrap)
			.collect();

		assert_eq!(builder.builds(), 1);
		assert!(invokers.iter().all(|invoker| Arc::ptr_eq(invoker, &invokers[0])));
	}

	#[tokio::test]
	async fn test_pending_build_does_not_block_other_keys() {
		let gate = Arc::new(Semaphore::new(1));
		let builder = Arc::new(MockBuilder::new().with_gate(gate.clone()));
		let registry = Arc::new(registry(builder.clone()));

		let built = registry.get_or_build_with_abi(TOKEN, TOKEN_ABI).await.unwrap();

		let blocked = {
			let registry = registry.clone();
			tokio::spawn(async move { registry.get_or_build(TOKEN).await })
		};
		tokio::time::sleep(Duration::from_millis(10)).await;

		let cached = tokio::time::timeout(
			Duration::from_millis(100),
			registry.get_or_build_with_abi(TOKEN, TOKEN_ABI),
		)
		.await
		.expect("lookup of a built key waited on another key")
		.unwrap();
		assert!(Arc::ptr_eq(&built, &cached));
		assert!(!blocked.is_finished());

		gate.add_permits(1);
		assert!(blocked.await.unwrap().is_ok());
		assert_eq!(builder.builds(), 2);
		assert_eq!(registry.len(), 2);
	}

	#[tokio::test]
	async fn test_cancelled_build_does_not_poison_key() {
		let gate = Arc::new(Semaphore::new(0));
		let builder = Arc::new(MockBuilder::new().with_gate(gate.clone()));
		let registry = registry(builder.clone());

		let cancelled = tokio::time::timeout(Duration::from_millis(20), registry.get_or_build(TOKEN)).await;
		assert!(cancelled.is_err());
		assert!(registry.is_empty());

		gate.add_permits(1);
		let invoker = registry.get_or_build(TOKEN).await.unwrap();
		assert_eq!(invoker.address(), parse_address(TOKEN).unwrap());
		assert_eq!(builder.builds(), 2);
		assert_eq!(registry.len(), 1);
	}

	#[tokio::test]
	async fn test_failed_build_is_not_cached() {
		let builder = Arc::new(MockBuilder::new().with_failures(1));
		let registry = registry(builder.clone());

		assert!(matches!(
			registry.get_or_build(TOKEN).await,
			Err(InvokerError::RemoteCallFailed(TransportError::Abi(_)))
		));
		assert!(registry.is_empty());

		assert!(registry.get_or_build(TOKEN).await.is_ok());
		assert_eq!(builder.builds(), 2);
	}

	#[tokio::test]
	async fn test_address_free_operations_share_default_invoker() {
		let builder = Arc::new(
			MockBuilder::new()
				.with_response(methods::BLOCK_NUMBER, json!("0x10"))
				.with_response(methods::GAS_PRICE, json!("0x2")),
		);
		let registry = registry(builder.clone());

		assert_eq!(registry.block_number().await.unwrap(), 16);
		assert_eq!(registry.gas_price().await.unwrap(), U256::from(2u8));
		assert_eq!(registry.hash("").await.unwrap().len(), 64);
		assert_eq!(
			registry.derive_address(KEY).await.unwrap(),
			SIGNER_ADDRESS
		);
		assert!(registry.verify_signature("registry").await.unwrap());

		assert_eq!(builder.builds(), 1);
		assert_eq!(
			registry.get_or_build(&Address::ZERO.to_string()).await.unwrap().address(),
			Address::ZERO
		);
		assert_eq!(builder.builds(), 1);
	}

	#[tokio::test]
	async fn test_contract_operations_delegate() {
		let builder = Arc::new(
			MockBuilder::new().with_response("balanceOf", json!(["7"])),
		);
		let registry = registry(builder);

		assert_eq!(
			registry.get_array(TOKEN, "balanceOf", vec![json!(SIGNER_ADDRESS)]).await.unwrap(),
			vec![json!("7")]
		);
	}

	#[tokio::test]
	async fn test_read_registered_uint_uses_default_invoker() {
		let builder = Arc::new(MockBuilder::new().with_response("getUint", json!(["99"])));
		let registry = registry(builder.clone());

		assert_eq!(
			registry.read_registered_uint("Vault", "getUint").await.unwrap(),
			U256::from(99u8)
		);
		assert_eq!(builder.abis(), vec!["[]".to_string()]);

		let default = registry.get_or_build(&Address::ZERO.to_string()).await.unwrap();
		assert_eq!(default.address(), Address::ZERO);
		assert_eq!(builder.builds(), 1);
	}

	#[tokio::test]
	async fn test_multicall_reads() {
		let hash = format!("0x{}", "ab".repeat(32));
		let builder = Arc::new(
			MockBuilder::new()
				.with_response("getEthBalance", json!(["1000000000000000000"]))
				.with_response("getBlockHash", json!([hash.clone()])),
		);
		let registry = ContractRegistry::new(builder.clone(), None, "[]");

		assert_eq!(
			registry.eth_balance(SIGNER_ADDRESS).await.unwrap(),
			U256::from(10u64).pow(U256::from(18u8))
		);
		assert_eq!(
			registry.block_hash(100).await.unwrap(),
			B256::repeat_byte(0xab)
		);
		assert_eq!(builder.abis(), vec![MULTICALL3_ABI.to_string()]);
	}

	#[tokio::test]
	async fn test_signer_checks_pass_through_registry() {
		let registry = ContractRegistry::new(Arc::new(MockBuilder::new()), None, "[]");

		assert!(matches!(
			registry.sign_message("hello").await,
			Err(InvokerError::NoSignerConfigured)
		));
		assert!(matches!(
			registry.send(TOKEN, "transfer", vec![], None).await,
			Err(InvokerError::NoSignerConfigured)
		));
	}

	#[tokio::test]
	async fn test_registry_conventions_reach_invokers() {
		let registry = ContractRegistry::new(Arc::new(MockBuilder::new()), None, "[]")
			.with_conventions(SigningConventions::empty());
		let tx_hash = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

		let signature = registry.sign_raw_transaction(KEY, tx_hash, 137).await.unwrap();
		// 137 * 2 + 35 needs two bytes once the y-parity special case is gone
		assert_eq!(signature.len(), 2 + 2 * 66);
	}
}

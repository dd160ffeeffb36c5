//! Test doubles for the transport and signer seams.

use async_trait::async_trait;
use invoker_account::implementations::local::LocalSigner;
use invoker_account::{AccountError, SignerInterface};
use invoker_transport::{ContractBuilder, ContractProxy, TransportError};
use invoker_types::{Address, SecretString, Signature, TransactionRequest};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

pub const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const SIGNER_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
const OTHER_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

pub fn local_signer() -> Arc<dyn SignerInterface> {
	Arc::new(LocalSigner::from_private_key(&SecretString::from(KEY)).unwrap())
}

/// A call the mock proxy received.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
	CallSingle(String, Vec<Value>),
	CallMany(String, Vec<Value>),
	SendSingle(String, Vec<Value>),
	SendMany(String, Vec<Value>, Option<TransactionRequest>),
	EstimateGas(String, Vec<Value>),
}

/// Proxy answering every method from a canned response table.
///
/// `*_many` methods expect the canned value to be an array.
pub struct MockProxy {
	address: Address,
	responses: HashMap<String, Value>,
	failing: bool,
	calls: Mutex<Vec<RecordedCall>>,
}

impl MockProxy {
	pub fn new(address: Address) -> Self {
		Self {
			address,
			responses: HashMap::new(),
			failing: false,
			calls: Mutex::new(Vec::new()),
		}
	}

	/// A proxy whose every call fails with a network error.
	pub fn failing(address: Address) -> Self {
		Self {
			failing: true,
			..Self::new(address)
		}
	}

	pub fn with_response(mut self, method: &str, response: Value) -> Self {
		self.responses.insert(method.to_string(), response);
		self
	}

	pub fn calls(&self) -> Vec<RecordedCall> {
		self.calls.lock().unwrap().clone()
	}

	fn answer(&self, call: RecordedCall, method: &str) -> Result<Value, TransportError> {
		self.calls.lock().unwrap().push(call);
		if self.failing {
			return Err(TransportError::Network("connection refused".into()));
		}
		self.responses
			.get(method)
			.cloned()
			.ok_or_else(|| TransportError::Node(format!("no response for {}", method)))
	}

	fn answer_many(&self, call: RecordedCall, method: &str) -> Result<Vec<Value>, TransportError> {
		match self.answer(call, method)? {
			Value::Array(items) => Ok(items),
			other => Ok(vec![other]),
		}
	}
}

#[async_trait]
impl ContractProxy for MockProxy {
	fn address(&self) -> Address {
		self.address
	}

	async fn call_single(&self, method: &str, args: Vec<Value>) -> Result<Value, TransportError> {
		self.answer(RecordedCall::CallSingle(method.into(), args), method)
	}

	async fn call_many(&self, method: &str, args: Vec<Value>) -> Result<Vec<Value>, TransportError> {
		self.answer_many(RecordedCall::CallMany(method.into(), args), method)
	}

	async fn send_single(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
		self.answer(RecordedCall::SendSingle(method.into(), params), method)
	}

	async fn send_many(
		&self,
		method: &str,
		args: Vec<Value>,
		overwrite: Option<TransactionRequest>,
	) -> Result<Vec<Value>, TransportError> {
		self.answer_many(RecordedCall::SendMany(method.into(), args, overwrite), method)
	}

	async fn estimate_gas(&self, method: &str, args: Vec<Value>) -> Result<Vec<Value>, TransportError> {
		self.answer_many(RecordedCall::EstimateGas(method.into(), args), method)
	}
}

/// Builder producing [`MockProxy`] instances and counting builds.
///
/// With a gate, each build consumes one permit before completing. The first
/// `failures` builds fail.
#[derive(Default)]
pub struct MockBuilder {
	responses: HashMap<String, Value>,
	builds: AtomicUsize,
	delay: Option<Duration>,
	gate: Option<Arc<Semaphore>>,
	failures: AtomicUsize,
	abis: Mutex<Vec<String>>,
}

impl MockBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_response(mut self, method: &str, response: Value) -> Self {
		self.responses.insert(method.to_string(), response);
		self
	}

	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);
		self
	}

	pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
		self.gate = Some(gate);
		self
	}

	pub fn with_failures(self, failures: usize) -> Self {
		self.failures.store(failures, Ordering::SeqCst);
		self
	}

	pub fn builds(&self) -> usize {
		self.builds.load(Ordering::SeqCst)
	}

	/// ABIs passed to `build`, in call order.
	pub fn abis(&self) -> Vec<String> {
		self.abis.lock().unwrap().clone()
	}
}

#[async_trait]
impl ContractBuilder for MockBuilder {
	async fn build(&self, abi: &str, address: Address) -> Result<Arc<dyn ContractProxy>, TransportError> {
		self.builds.fetch_add(1, Ordering::SeqCst);
		self.abis.lock().unwrap().push(abi.to_string());

		if let Some(delay) = self.delay {
			tokio::time::sleep(delay).await;
		}
		if let Some(gate) = &self.gate {
			gate.acquire().await.unwrap().forget();
		}

		let failed = self
			.failures
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
			.is_ok();
		if failed {
			return Err(TransportError::Abi("build failed".into()));
		}

		let mut proxy = MockProxy::new(address);
		proxy.responses = self.responses.clone();
		Ok(Arc::new(proxy))
	}
}

/// Signer whose signing never completes, like a wallet awaiting approval.
pub struct PendingSigner;

#[async_trait]
impl SignerInterface for PendingSigner {
	fn address(&self) -> Address {
		SIGNER_ADDRESS.parse().unwrap()
	}

	async fn sign_message(&self, _message: &[u8]) -> Result<Signature, AccountError> {
		std::future::pending().await
	}
}

/// Signer that refuses every request.
pub struct RefusingSigner;

#[async_trait]
impl SignerInterface for RefusingSigner {
	fn address(&self) -> Address {
		SIGNER_ADDRESS.parse().unwrap()
	}

	async fn sign_message(&self, _message: &[u8]) -> Result<Signature, AccountError> {
		Err(AccountError::Rejected("user declined".into()))
	}
}

/// Signer that reports one address but signs with another key.
pub struct MismatchedSigner {
	inner: LocalSigner,
}

impl Default for MismatchedSigner {
	fn default() -> Self {
		Self {
			inner: LocalSigner::from_private_key(&SecretString::from(OTHER_KEY)).unwrap(),
		}
	}
}

#[async_trait]
impl SignerInterface for MismatchedSigner {
	fn address(&self) -> Address {
		SIGNER_ADDRESS.parse().unwrap()
	}

	async fn sign_message(&self, message: &[u8]) -> Result<Signature, AccountError> {
		self.inner.sign_message(message).await
	}
}
